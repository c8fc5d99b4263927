use error_stack::Report;
use serde::{Deserialize, Serialize};

use crate::error::IndicatorError;
use crate::indicator::ma::sma_values;
use crate::indicator::{Indicator, check_period, window_range};
use crate::model::PriceArrays;
use crate::series::{IndicatorOutput, SeriesValues, aligned};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StochasticParams {
    pub k_period: usize,
    pub d_period: usize,
    pub smooth: usize,
}

impl Default for StochasticParams {
    fn default() -> Self {
        Self {
            k_period: 14,
            d_period: 3,
            smooth: 3,
        }
    }
}

/// Slow stochastic: raw %K smoothed by SMA(`smooth`), %D = SMA(`d_period`)
/// of the smoothed %K.
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
    smooth: usize,
}

impl Stochastic {
    pub fn new(
        k_period: usize,
        d_period: usize,
        smooth: usize,
    ) -> Result<Self, Report<IndicatorError>> {
        check_period("kPeriod", k_period)?;
        check_period("dPeriod", d_period)?;
        check_period("smooth", smooth)?;
        Ok(Self {
            k_period,
            d_period,
            smooth,
        })
    }

    /// Raw %K; the first value belongs to index `k_period - 1`.
    fn raw_k(&self, prices: &PriceArrays) -> Vec<f64> {
        if prices.len() < self.k_period {
            return Vec::new();
        }
        prices
            .highs
            .windows(self.k_period)
            .zip(prices.lows.windows(self.k_period))
            .zip(&prices.closes[self.k_period - 1..])
            .map(|((highs, lows), &close)| {
                let (highest, lowest) = window_range(highs, lows);
                let range = highest - lowest;
                if range == 0.0 {
                    50.0
                } else {
                    ((close - lowest) / range * 100.0).clamp(0.0, 100.0)
                }
            })
            .collect()
    }
}

impl Indicator for Stochastic {
    fn name(&self) -> &str {
        "stochastic"
    }

    fn required_candles(&self) -> usize {
        self.k_period + self.smooth - 1
    }

    fn calculate(&self, prices: &PriceArrays) -> IndicatorOutput {
        let k = sma_values(&self.raw_k(prices), self.smooth);
        let d = sma_values(&k, self.d_period);
        let k_offset = self.k_period - 1 + self.smooth - 1;
        let d_offset = k_offset + self.d_period - 1;
        IndicatorOutput::new()
            .with("k", SeriesValues::Line(aligned(&prices.times, k_offset, k)))
            .with("d", SeriesValues::Line(aligned(&prices.times, d_offset, d)))
    }
}
