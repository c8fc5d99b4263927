use error_stack::Report;

use crate::error::IndicatorError;
use crate::indicator::{Indicator, check_period};
use crate::model::PriceArrays;
use crate::series::{IndicatorOutput, aligned};

/// RS used when the average loss is zero.
const SATURATED_RS: f64 = 100.0;

/// RSI (Relative Strength Index) using Wilder's smoothing method.
pub struct Rsi {
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }

    /// RSI values; the first value belongs to index `period`.
    pub fn calculate_prices(&self, prices: &[f64]) -> Vec<f64> {
        if prices.len() < self.required_candles() {
            return Vec::new();
        }

        let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();

        // Seed using simple average of first `period` gains/losses
        let mut avg_gain: f64 = deltas[..self.period]
            .iter()
            .map(|&d| d.max(0.0))
            .sum::<f64>()
            / self.period as f64;
        let mut avg_loss: f64 = deltas[..self.period]
            .iter()
            .map(|&d| (-d).max(0.0))
            .sum::<f64>()
            / self.period as f64;

        let mut results = vec![rsi_value(avg_gain, avg_loss)];

        for &delta in &deltas[self.period..] {
            let gain = delta.max(0.0);
            let loss = (-delta).max(0.0);
            avg_gain = (avg_gain * (self.period - 1) as f64 + gain) / self.period as f64;
            avg_loss = (avg_loss * (self.period - 1) as f64 + loss) / self.period as f64;
            results.push(rsi_value(avg_gain, avg_loss));
        }

        results
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        "rsi"
    }

    fn required_candles(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, prices: &PriceArrays) -> IndicatorOutput {
        let values = self.calculate_prices(&prices.closes);
        IndicatorOutput::line("value", aligned(&prices.times, self.period, values))
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    let rs = if avg_loss == 0.0 {
        SATURATED_RS
    } else {
        avg_gain / avg_loss
    };
    100.0 - 100.0 / (1.0 + rs)
}
