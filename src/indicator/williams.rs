use error_stack::Report;

use crate::error::IndicatorError;
use crate::indicator::{Indicator, check_period, window_range};
use crate::model::PriceArrays;
use crate::series::{IndicatorOutput, aligned};

/// Williams %R, in `[-100, 0]`.
pub struct WilliamsR {
    period: usize,
}

impl WilliamsR {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }
}

impl Indicator for WilliamsR {
    fn name(&self) -> &str {
        "williams"
    }

    fn required_candles(&self) -> usize {
        self.period
    }

    fn calculate(&self, prices: &PriceArrays) -> IndicatorOutput {
        if prices.len() < self.period {
            return IndicatorOutput::line("value", Vec::new());
        }
        let values = prices
            .highs
            .windows(self.period)
            .zip(prices.lows.windows(self.period))
            .zip(&prices.closes[self.period - 1..])
            .map(|((highs, lows), &close)| {
                let (highest, lowest) = window_range(highs, lows);
                let range = highest - lowest;
                if range == 0.0 {
                    -50.0
                } else {
                    ((highest - close) / range * -100.0).clamp(-100.0, 0.0)
                }
            })
            .collect();
        IndicatorOutput::line("value", aligned(&prices.times, self.period - 1, values))
    }
}
