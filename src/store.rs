use error_stack::{Report, bail};

use crate::error::CandleError;
use crate::model::{Candle, PriceArrays};

/// Outcome of a trailing-candle update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// The last bar was replaced (same time).
    Updated,
    /// A new bar was appended.
    Appended,
}

/// Candle series with strictly increasing times.
#[derive(Debug, Clone, Default)]
pub struct CandleStore {
    candles: Vec<Candle>,
}

impl CandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole series. Rejected if times are not strictly
    /// increasing; the previous series is kept in that case.
    pub fn replace(&mut self, candles: Vec<Candle>) -> Result<(), Report<CandleError>> {
        if let Some(index) = candles.windows(2).position(|w| w[1].time <= w[0].time) {
            bail!(CandleError::NotIncreasing { index: index + 1 });
        }

        let inconsistent = candles.iter().filter(|c| !c.is_consistent()).count();
        if inconsistent > 0 {
            tracing::warn!(
                count = inconsistent,
                "Candles with high/low outside open/close"
            );
        }

        self.candles = candles;
        Ok(())
    }

    /// Replaces the last bar when `candle.time` matches it, appends when newer.
    pub fn upsert_last(&mut self, candle: Candle) -> Result<Upsert, Report<CandleError>> {
        if !candle.is_consistent() {
            tracing::warn!(time = candle.time, "Candle with high/low outside open/close");
        }

        match self.candles.last_mut() {
            Some(last) if last.time == candle.time => {
                *last = candle;
                Ok(Upsert::Updated)
            }
            Some(last) if last.time > candle.time => {
                bail!(CandleError::Stale {
                    time: candle.time,
                    last: last.time,
                })
            }
            _ => {
                self.candles.push(candle);
                Ok(Upsert::Appended)
            }
        }
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn prices(&self) -> PriceArrays {
        PriceArrays::from_candles(&self.candles)
    }
}
