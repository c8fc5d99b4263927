use serde::{Deserialize, Serialize};

/// One OHLCV bar. `time` is the bar's open time in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    /// Checks `low <= min(open, close) <= max(open, close) <= high` and a
    /// non-negative volume.
    pub fn is_consistent(&self) -> bool {
        self.low <= self.open.min(self.close)
            && self.open.max(self.close) <= self.high
            && self.volume >= 0.0
    }
}

/// Column view over a candle slice. All vectors are index-aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceArrays {
    pub times: Vec<i64>,
    pub opens: Vec<f64>,
    pub highs: Vec<f64>,
    pub lows: Vec<f64>,
    pub closes: Vec<f64>,
    pub volumes: Vec<f64>,
}

impl PriceArrays {
    pub fn from_candles(candles: &[Candle]) -> Self {
        let mut arrays = Self {
            times: Vec::with_capacity(candles.len()),
            opens: Vec::with_capacity(candles.len()),
            highs: Vec::with_capacity(candles.len()),
            lows: Vec::with_capacity(candles.len()),
            closes: Vec::with_capacity(candles.len()),
            volumes: Vec::with_capacity(candles.len()),
        };
        for c in candles {
            arrays.times.push(c.time);
            arrays.opens.push(c.open);
            arrays.highs.push(c.high);
            arrays.lows.push(c.low);
            arrays.closes.push(c.close);
            arrays.volumes.push(c.volume);
        }
        arrays
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}
