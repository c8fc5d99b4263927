use error_stack::{Report, bail};
use serde::{Deserialize, Serialize};

use crate::error::IndicatorError;
use crate::indicator::Indicator;
use crate::model::PriceArrays;
use crate::series::{Direction, DirectionalPoint, IndicatorOutput, SeriesValues};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SarParams {
    pub start: f64,
    pub increment: f64,
    pub maximum: f64,
}

impl Default for SarParams {
    fn default() -> Self {
        Self {
            start: 0.02,
            increment: 0.02,
            maximum: 0.2,
        }
    }
}

/// Parabolic stop-and-reverse.
pub struct ParabolicSar {
    start: f64,
    increment: f64,
    maximum: f64,
}

impl ParabolicSar {
    pub fn new(start: f64, increment: f64, maximum: f64) -> Result<Self, Report<IndicatorError>> {
        if !(start > 0.0 && start.is_finite()) {
            bail!(IndicatorError::InvalidParameter {
                name: "start must be > 0".into(),
            });
        }
        if !(increment > 0.0 && increment.is_finite()) {
            bail!(IndicatorError::InvalidParameter {
                name: "increment must be > 0".into(),
            });
        }
        if !(maximum >= start && maximum.is_finite()) {
            bail!(IndicatorError::InvalidParameter {
                name: "maximum must be >= start".into(),
            });
        }
        Ok(Self {
            start,
            increment,
            maximum,
        })
    }
}

/// Running state between bars.
#[derive(Debug, Clone, Copy)]
struct SarState {
    trend: Direction,
    sar: f64,
    /// Extreme point since the last flip.
    ep: f64,
    af: f64,
}

impl SarState {
    /// Uptrend when the second high exceeds the first.
    fn initial(prices: &PriceArrays, start: f64) -> Self {
        if prices.highs[1] > prices.highs[0] {
            Self {
                trend: Direction::Up,
                sar: prices.lows[0],
                ep: prices.highs[0],
                af: start,
            }
        } else {
            Self {
                trend: Direction::Down,
                sar: prices.highs[0],
                ep: prices.lows[0],
                af: start,
            }
        }
    }
}

impl ParabolicSar {
    fn step(&self, state: &mut SarState, prices: &PriceArrays, i: usize) {
        let high = prices.highs[i];
        let low = prices.lows[i];
        let mut candidate = state.sar + state.af * (state.ep - state.sar);

        match state.trend {
            Direction::Up => {
                candidate = candidate.min(prices.lows[i - 1]);
                if i >= 2 {
                    candidate = candidate.min(prices.lows[i - 2]);
                }
                if low < candidate {
                    *state = SarState {
                        trend: Direction::Down,
                        sar: state.ep,
                        ep: low,
                        af: self.start,
                    };
                    return;
                }
                state.sar = candidate;
                if high > state.ep {
                    state.ep = high;
                    state.af = (state.af + self.increment).min(self.maximum);
                }
            }
            Direction::Down => {
                candidate = candidate.max(prices.highs[i - 1]);
                if i >= 2 {
                    candidate = candidate.max(prices.highs[i - 2]);
                }
                if high > candidate {
                    *state = SarState {
                        trend: Direction::Up,
                        sar: state.ep,
                        ep: high,
                        af: self.start,
                    };
                    return;
                }
                state.sar = candidate;
                if low < state.ep {
                    state.ep = low;
                    state.af = (state.af + self.increment).min(self.maximum);
                }
            }
        }
    }
}

impl Indicator for ParabolicSar {
    fn name(&self) -> &str {
        "sar"
    }

    fn required_candles(&self) -> usize {
        2
    }

    fn calculate(&self, prices: &PriceArrays) -> IndicatorOutput {
        if prices.len() < self.required_candles() {
            return IndicatorOutput::new().with("sar", SeriesValues::Directional(Vec::new()));
        }

        let mut state = SarState::initial(prices, self.start);
        let mut points = Vec::with_capacity(prices.len());
        points.push(DirectionalPoint {
            time: prices.times[0],
            value: state.sar,
            direction: state.trend,
        });
        for i in 1..prices.len() {
            self.step(&mut state, prices, i);
            points.push(DirectionalPoint {
                time: prices.times[i],
                value: state.sar,
                direction: state.trend,
            });
        }

        IndicatorOutput::new().with("sar", SeriesValues::Directional(points))
    }
}
