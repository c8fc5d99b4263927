use error_stack::Report;
use serde::{Deserialize, Serialize};

use crate::error::IndicatorError;
use crate::indicator::{Indicator, check_period};
use crate::model::PriceArrays;
use crate::series::{IndicatorOutput, aligned};

/// Parameters shared by every single-period indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PeriodParams {
    pub period: usize,
}

pub(crate) fn sma_values(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || prices.len() < period {
        return Vec::new();
    }
    prices
        .windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect()
}

pub(crate) fn ema_values(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || prices.len() < period {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);
    // Seed with SMA of first `period` values
    let mut ema = prices[..period].iter().sum::<f64>() / period as f64;
    let mut results = Vec::with_capacity(prices.len() - period + 1);
    results.push(ema);

    for &price in &prices[period..] {
        ema = price * k + ema * (1.0 - k);
        results.push(ema);
    }

    results
}

/// Simple Moving Average.
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }

    /// SMA values of `prices`; the first value belongs to index `period - 1`.
    pub fn calculate_prices(&self, prices: &[f64]) -> Vec<f64> {
        sma_values(prices, self.period)
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        "sma"
    }

    fn required_candles(&self) -> usize {
        self.period
    }

    fn calculate(&self, prices: &PriceArrays) -> IndicatorOutput {
        let values = self.calculate_prices(&prices.closes);
        IndicatorOutput::line("value", aligned(&prices.times, self.period - 1, values))
    }
}

/// Exponential Moving Average.
pub struct Ema {
    period: usize,
}

impl Ema {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }

    /// EMA values of `prices`; the first value belongs to index `period - 1`.
    pub fn calculate_prices(&self, prices: &[f64]) -> Vec<f64> {
        ema_values(prices, self.period)
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        "ema"
    }

    fn required_candles(&self) -> usize {
        self.period
    }

    fn calculate(&self, prices: &PriceArrays) -> IndicatorOutput {
        let values = self.calculate_prices(&prices.closes);
        IndicatorOutput::line("value", aligned(&prices.times, self.period - 1, values))
    }
}

/// Linearly Weighted Moving Average. The newest close weighs `period`, the
/// oldest weighs 1.
pub struct Wma {
    period: usize,
}

impl Wma {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }

    pub fn calculate_prices(&self, prices: &[f64]) -> Vec<f64> {
        if prices.len() < self.period {
            return Vec::new();
        }
        let divisor = (self.period * (self.period + 1)) as f64 / 2.0;
        prices
            .windows(self.period)
            .map(|w| {
                w.iter()
                    .enumerate()
                    .map(|(j, &p)| p * (j + 1) as f64)
                    .sum::<f64>()
                    / divisor
            })
            .collect()
    }
}

impl Indicator for Wma {
    fn name(&self) -> &str {
        "wma"
    }

    fn required_candles(&self) -> usize {
        self.period
    }

    fn calculate(&self, prices: &PriceArrays) -> IndicatorOutput {
        let values = self.calculate_prices(&prices.closes);
        IndicatorOutput::line("value", aligned(&prices.times, self.period - 1, values))
    }
}
