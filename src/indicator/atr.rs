use error_stack::Report;

use crate::error::IndicatorError;
use crate::indicator::{Indicator, check_period};
use crate::model::PriceArrays;
use crate::series::{IndicatorOutput, aligned};

/// Average True Range with Wilder smoothing: ATR = (prev_ATR * (n-1) + TR) / n.
pub struct Atr {
    period: usize,
}

impl Atr {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }
}

/// True range per bar. The first bar has no previous close, so its range is H-L.
fn true_ranges(prices: &PriceArrays) -> Vec<f64> {
    (0..prices.len())
        .map(|i| {
            let hl = prices.highs[i] - prices.lows[i];
            if i == 0 {
                return hl;
            }
            let prev_close = prices.closes[i - 1];
            let hc = (prices.highs[i] - prev_close).abs();
            let lc = (prices.lows[i] - prev_close).abs();
            hl.max(hc).max(lc)
        })
        .collect()
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        "atr"
    }

    fn required_candles(&self) -> usize {
        self.period
    }

    fn calculate(&self, prices: &PriceArrays) -> IndicatorOutput {
        let tr = true_ranges(prices);
        if tr.len() < self.period {
            return IndicatorOutput::line("value", Vec::new());
        }

        let mut atr = tr[..self.period].iter().sum::<f64>() / self.period as f64;
        let mut values = Vec::with_capacity(tr.len() - self.period + 1);
        values.push(atr);
        for &range in &tr[self.period..] {
            atr = (atr * (self.period - 1) as f64 + range) / self.period as f64;
            values.push(atr);
        }

        IndicatorOutput::line("value", aligned(&prices.times, self.period - 1, values))
    }
}
