pub mod atr;
pub mod bollinger;
pub mod cci;
pub mod ichimoku;
pub mod kind;
pub mod ma;
pub mod macd;
pub mod rsi;
pub mod sar;
pub mod stochastic;
pub mod volume;
pub mod vwap;
pub mod williams;

pub use kind::{IndicatorKind, IndicatorParams};

use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::model::PriceArrays;
use crate::series::IndicatorOutput;

/// A technical analysis indicator over index-aligned price arrays.
///
/// Implementations are pure and deterministic. When the input is shorter
/// than the lookback, `calculate` returns an empty output rather than an
/// error: warm-up is a steady state, not a failure.
pub trait Indicator: Send {
    /// Unique name of this indicator (e.g., "rsi", "sma").
    fn name(&self) -> &str;

    /// Minimum number of candles required to produce at least one output value.
    fn required_candles(&self) -> usize;

    fn calculate(&self, prices: &PriceArrays) -> IndicatorOutput;
}

/// Upper bound for any lookback, smoothing or shift length.
pub(crate) const MAX_PERIOD: usize = 10_000;

pub(crate) fn check_period(name: &str, period: usize) -> Result<(), Report<IndicatorError>> {
    if period == 0 {
        bail!(IndicatorError::InvalidParameter {
            name: format!("{name} must be > 0"),
        });
    }
    check_bound(name, period)
}

/// Rejects lengths above `MAX_PERIOD`; zero is allowed.
pub(crate) fn check_bound(name: &str, value: usize) -> Result<(), Report<IndicatorError>> {
    if value > MAX_PERIOD {
        bail!(IndicatorError::InvalidParameter {
            name: format!("{name} must be <= {MAX_PERIOD}"),
        });
    }
    Ok(())
}

/// Highest high and lowest low of a window.
pub(crate) fn window_range(highs: &[f64], lows: &[f64]) -> (f64, f64) {
    let highest = highs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let lowest = lows.iter().copied().fold(f64::INFINITY, f64::min);
    (highest, lowest)
}
