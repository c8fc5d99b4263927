use error_stack::Report;

use crate::error::IndicatorError;
use crate::indicator::{Indicator, check_period};
use crate::model::PriceArrays;
use crate::series::{IndicatorOutput, aligned};

const LAMBERT_CONSTANT: f64 = 0.015;

/// Commodity Channel Index over the typical price (H+L+C)/3.
pub struct Cci {
    period: usize,
}

impl Cci {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }
}

impl Indicator for Cci {
    fn name(&self) -> &str {
        "cci"
    }

    fn required_candles(&self) -> usize {
        self.period
    }

    fn calculate(&self, prices: &PriceArrays) -> IndicatorOutput {
        let typical: Vec<f64> = prices
            .highs
            .iter()
            .zip(&prices.lows)
            .zip(&prices.closes)
            .map(|((h, l), c)| (h + l + c) / 3.0)
            .collect();
        if typical.len() < self.period {
            return IndicatorOutput::line("value", Vec::new());
        }

        let values = typical
            .windows(self.period)
            .map(|window| {
                let mean = window.iter().sum::<f64>() / self.period as f64;
                let mean_deviation =
                    window.iter().map(|tp| (tp - mean).abs()).sum::<f64>() / self.period as f64;
                if mean_deviation == 0.0 {
                    return 0.0;
                }
                let current = window[self.period - 1];
                (current - mean) / (LAMBERT_CONSTANT * mean_deviation)
            })
            .collect();

        IndicatorOutput::line("value", aligned(&prices.times, self.period - 1, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::test_util::prices_from_closes;

    #[test]
    fn cci_zero_deviation_is_zero() {
        let output = Cci::new(4).unwrap().calculate(&prices_from_closes(&[7.0; 8]));
        let points = output.line_points("value").unwrap();
        assert_eq!(points.len(), 5);
        assert!(points.iter().all(|p| p.value == 0.0));
    }

    #[test]
    fn cci_known_value() {
        // typical prices 1, 2, 3 -> mean 2, mean deviation 2/3
        let output = Cci::new(3)
            .unwrap()
            .calculate(&prices_from_closes(&[1.0, 2.0, 3.0]));
        let value = output.line_points("value").unwrap()[0].value;
        assert!((value - 1.0 / (0.015 * (2.0 / 3.0))).abs() < 1e-9);
    }

    #[test]
    fn cci_insufficient_data() {
        let output = Cci::new(20).unwrap().calculate(&prices_from_closes(&[1.0; 19]));
        assert!(output.is_empty());
    }
}
