use std::collections::HashMap;

use error_stack::{Report, bail};
use serde::{Deserialize, Serialize};

use crate::error::IndicatorError;
use crate::indicator::ma::ema_values;
use crate::indicator::{Indicator, check_period};
use crate::model::PriceArrays;
use crate::series::{Direction, DirectionalPoint, IndicatorOutput, LinePoint, SeriesValues, aligned};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MacdParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }
}

pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Macd {
    pub fn new(
        fast_period: usize,
        slow_period: usize,
        signal_period: usize,
    ) -> Result<Self, Report<IndicatorError>> {
        check_period("fastPeriod", fast_period)?;
        check_period("slowPeriod", slow_period)?;
        check_period("signalPeriod", signal_period)?;
        if fast_period >= slow_period {
            bail!(IndicatorError::InvalidParameter {
                name: "fastPeriod must be < slowPeriod".into(),
            });
        }
        Ok(Self {
            fast_period,
            slow_period,
            signal_period,
        })
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        "macd"
    }

    fn required_candles(&self) -> usize {
        self.slow_period
    }

    /// MACD line, signal line and histogram. The two EMAs start at different
    /// offsets, so every combination is joined on timestamp.
    fn calculate(&self, prices: &PriceArrays) -> IndicatorOutput {
        let fast = aligned(
            &prices.times,
            self.fast_period - 1,
            ema_values(&prices.closes, self.fast_period),
        );
        let slow = aligned(
            &prices.times,
            self.slow_period - 1,
            ema_values(&prices.closes, self.slow_period),
        );

        let fast_by_time: HashMap<i64, f64> = fast.iter().map(|p| (p.time, p.value)).collect();
        let macd_line: Vec<LinePoint> = slow
            .iter()
            .filter_map(|s| {
                fast_by_time.get(&s.time).map(|f| LinePoint {
                    time: s.time,
                    value: f - s.value,
                })
            })
            .collect();

        let macd_times: Vec<i64> = macd_line.iter().map(|p| p.time).collect();
        let macd_values: Vec<f64> = macd_line.iter().map(|p| p.value).collect();
        let signal_line = aligned(
            &macd_times,
            self.signal_period - 1,
            ema_values(&macd_values, self.signal_period),
        );

        let signal_by_time: HashMap<i64, f64> =
            signal_line.iter().map(|p| (p.time, p.value)).collect();
        let histogram: Vec<DirectionalPoint> = macd_line
            .iter()
            .filter_map(|m| {
                signal_by_time.get(&m.time).map(|s| {
                    let value = m.value - s;
                    DirectionalPoint {
                        time: m.time,
                        value,
                        direction: if value >= 0.0 {
                            Direction::Up
                        } else {
                            Direction::Down
                        },
                    }
                })
            })
            .collect();

        IndicatorOutput::new()
            .with("macd", SeriesValues::Line(macd_line))
            .with("signal", SeriesValues::Line(signal_line))
            .with("histogram", SeriesValues::Directional(histogram))
    }
}
