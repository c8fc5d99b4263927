use error_stack::Report;
use serde::{Deserialize, Serialize};

use crate::error::IndicatorError;
use crate::indicator::{Indicator, check_bound};
use crate::indicator::ma::sma_values;
use crate::model::PriceArrays;
use crate::series::{Direction, DirectionalPoint, IndicatorOutput, SeriesValues, aligned};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VolumeParams {
    /// Period of the optional volume moving average; 0 disables it.
    pub ma_period: usize,
}

/// Per-bar volume tagged up/down by the bar's own close vs open.
pub struct Volume {
    ma_period: usize,
}

impl Volume {
    pub fn new(ma_period: usize) -> Result<Self, Report<IndicatorError>> {
        check_bound("maPeriod", ma_period)?;
        Ok(Self { ma_period })
    }
}

impl Indicator for Volume {
    fn name(&self) -> &str {
        "volume"
    }

    fn required_candles(&self) -> usize {
        1
    }

    fn calculate(&self, prices: &PriceArrays) -> IndicatorOutput {
        let bars = prices
            .times
            .iter()
            .zip(&prices.opens)
            .zip(&prices.closes)
            .zip(&prices.volumes)
            .map(|(((&time, &open), &close), &volume)| DirectionalPoint {
                time,
                value: volume,
                direction: if close >= open {
                    Direction::Up
                } else {
                    Direction::Down
                },
            })
            .collect();

        let output = IndicatorOutput::new().with("volume", SeriesValues::Directional(bars));
        if self.ma_period == 0 {
            return output;
        }
        let ma = sma_values(&prices.volumes, self.ma_period);
        output.with(
            "ma",
            SeriesValues::Line(aligned(&prices.times, self.ma_period - 1, ma)),
        )
    }
}
