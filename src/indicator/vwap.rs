use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::indicator::Indicator;
use crate::model::PriceArrays;
use crate::series::{IndicatorOutput, LinePoint};

/// Calendar bucket (UTC) at whose boundary VWAP's running sums reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorPeriod {
    #[default]
    Session,
    Week,
    Month,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VwapParams {
    pub anchor_period: AnchorPeriod,
}

impl AnchorPeriod {
    /// Bucket key of a unix timestamp. Weeks are ISO weeks (Monday start).
    fn bucket(self, time: i64) -> Option<(i32, u32)> {
        let dt = DateTime::<Utc>::from_timestamp(time, 0)?;
        Some(match self {
            Self::Session => (dt.year(), dt.ordinal()),
            Self::Week => {
                let week = dt.iso_week();
                (week.year(), week.week())
            }
            Self::Month => (dt.year(), dt.month()),
        })
    }
}

/// Anchored volume-weighted average price of the typical price (H+L+C)/3.
pub struct Vwap {
    anchor: AnchorPeriod,
}

impl Vwap {
    pub fn new(anchor: AnchorPeriod) -> Self {
        Self { anchor }
    }
}

impl Indicator for Vwap {
    fn name(&self) -> &str {
        "vwap"
    }

    fn required_candles(&self) -> usize {
        1
    }

    fn calculate(&self, prices: &PriceArrays) -> IndicatorOutput {
        let mut cum_pv = 0.0_f64;
        let mut cum_volume = 0.0_f64;
        let mut current_bucket = None;
        let mut points = Vec::with_capacity(prices.len());

        for i in 0..prices.len() {
            let bucket = self.anchor.bucket(prices.times[i]);
            if bucket.is_some() && bucket != current_bucket {
                cum_pv = 0.0;
                cum_volume = 0.0;
                current_bucket = bucket;
            }

            let typical = (prices.highs[i] + prices.lows[i] + prices.closes[i]) / 3.0;
            cum_pv += typical * prices.volumes[i];
            cum_volume += prices.volumes[i];

            let value = if cum_volume == 0.0 {
                typical
            } else {
                cum_pv / cum_volume
            };
            points.push(LinePoint {
                time: prices.times[i],
                value,
            });
        }

        IndicatorOutput::line("value", points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Candle;

    const DAY: i64 = 86_400;

    fn flat(time: i64, price: f64, volume: f64) -> Candle {
        Candle {
            time,
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
        }
    }

    fn vwap_values(anchor: AnchorPeriod, candles: &[Candle]) -> Vec<f64> {
        Vwap::new(anchor)
            .calculate(&PriceArrays::from_candles(candles))
            .line_points("value")
            .unwrap()
            .iter()
            .map(|p| p.value)
            .collect()
    }

    #[test]
    fn cumulative_within_session() {
        let candles = vec![flat(0, 10.0, 1.0), flat(3_600, 20.0, 3.0)];
        let values = vwap_values(AnchorPeriod::Session, &candles);
        assert!((values[0] - 10.0).abs() < 1e-9);
        // (10 + 60) / 4
        assert!((values[1] - 17.5).abs() < 1e-9);
    }

    #[test]
    fn session_resets_at_utc_midnight() {
        let candles = vec![
            flat(DAY - 3_600, 10.0, 5.0),
            flat(DAY - 60, 20.0, 5.0),
            flat(DAY, 100.0, 1.0),
            flat(DAY + 60, 200.0, 1.0),
        ];
        let values = vwap_values(AnchorPeriod::Session, &candles);
        assert!((values[1] - 15.0).abs() < 1e-9);
        // first bar of the new day starts from zero sums
        assert!((values[2] - 100.0).abs() < 1e-9);
        assert!((values[3] - 150.0).abs() < 1e-9);
    }

    #[test]
    fn week_anchor_spans_days() {
        // 1970-01-05 was a Monday
        let monday = 4 * DAY;
        let candles = vec![
            flat(monday, 10.0, 1.0),
            flat(monday + DAY, 20.0, 1.0),
            flat(monday + 7 * DAY, 40.0, 1.0),
        ];
        let values = vwap_values(AnchorPeriod::Week, &candles);
        assert!((values[1] - 15.0).abs() < 1e-9);
        assert!((values[2] - 40.0).abs() < 1e-9);
    }

    #[test]
    fn month_anchor_resets_on_first_of_month() {
        // 1970-01-30, 1970-01-31 and 1970-02-01
        let candles = vec![
            flat(29 * DAY, 10.0, 1.0),
            flat(30 * DAY, 20.0, 1.0),
            flat(31 * DAY, 50.0, 1.0),
        ];
        let values = vwap_values(AnchorPeriod::Month, &candles);
        assert!((values[1] - 15.0).abs() < 1e-9);
        assert!((values[2] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn zero_volume_falls_back_to_typical_price() {
        let values = vwap_values(AnchorPeriod::Session, &[flat(0, 12.0, 0.0)]);
        assert_eq!(values, vec![12.0]);
    }

    #[test]
    fn anchor_period_parses_lowercase() {
        let params: VwapParams = serde_json::from_str(r#"{"anchorPeriod":"week"}"#).unwrap();
        assert_eq!(params.anchor_period, AnchorPeriod::Week);
    }
}
