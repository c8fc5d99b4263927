use error_stack::{Report, bail};
use serde::{Deserialize, Serialize};

use crate::error::IndicatorError;
use crate::indicator::ma::sma_values;
use crate::indicator::{Indicator, check_period};
use crate::model::PriceArrays;
use crate::series::{IndicatorOutput, SeriesValues, aligned};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BollingerParams {
    pub period: usize,
    pub std_dev: f64,
}

impl Default for BollingerParams {
    fn default() -> Self {
        Self {
            period: 20,
            std_dev: 2.0,
        }
    }
}

pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl BollingerBands {
    pub fn new(period: usize, std_dev_multiplier: f64) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        if !std_dev_multiplier.is_finite() || std_dev_multiplier < 0.0 {
            bail!(IndicatorError::InvalidParameter {
                name: "stdDev must be >= 0".into(),
            });
        }
        Ok(Self {
            period,
            std_dev_multiplier,
        })
    }

    /// Returns (upper, middle, lower) band values.
    pub fn calculate_bands(&self, prices: &[f64]) -> Vec<(f64, f64, f64)> {
        let sma = sma_values(prices, self.period);

        prices
            .windows(self.period)
            .zip(sma.iter())
            .map(|(window, &middle)| {
                // population variance
                let variance =
                    window.iter().map(|&p| (p - middle).powi(2)).sum::<f64>() / self.period as f64;
                let width = self.std_dev_multiplier * variance.sqrt();
                (middle + width, middle, middle - width)
            })
            .collect()
    }
}

impl Indicator for BollingerBands {
    fn name(&self) -> &str {
        "bollinger"
    }

    fn required_candles(&self) -> usize {
        self.period
    }

    fn calculate(&self, prices: &PriceArrays) -> IndicatorOutput {
        let bands = self.calculate_bands(&prices.closes);
        let offset = self.period - 1;
        let upper = bands.iter().map(|b| b.0).collect();
        let middle = bands.iter().map(|b| b.1).collect();
        let lower = bands.iter().map(|b| b.2).collect();
        IndicatorOutput::new()
            .with("upper", SeriesValues::Line(aligned(&prices.times, offset, upper)))
            .with("middle", SeriesValues::Line(aligned(&prices.times, offset, middle)))
            .with("lower", SeriesValues::Line(aligned(&prices.times, offset, lower)))
    }
}
