use error_stack::Report;
use serde::{Deserialize, Serialize};

use crate::error::IndicatorError;
use crate::indicator::{Indicator, check_bound, check_period, window_range};
use crate::model::PriceArrays;
use crate::series::{IndicatorOutput, LinePoint, SeriesValues, aligned};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IchimokuParams {
    pub conversion_period: usize,
    pub base_period: usize,
    pub span_period: usize,
    pub displacement: usize,
}

impl Default for IchimokuParams {
    fn default() -> Self {
        Self {
            conversion_period: 9,
            base_period: 26,
            span_period: 52,
            displacement: 26,
        }
    }
}

pub struct Ichimoku {
    params: IchimokuParams,
}

impl Ichimoku {
    pub fn new(params: IchimokuParams) -> Result<Self, Report<IndicatorError>> {
        check_period("conversionPeriod", params.conversion_period)?;
        check_period("basePeriod", params.base_period)?;
        check_period("spanPeriod", params.span_period)?;
        check_bound("displacement", params.displacement)?;
        Ok(Self { params })
    }
}

/// Midpoint of the rolling high/low window; the first value belongs to
/// index `period - 1`.
fn midpoints(prices: &PriceArrays, period: usize) -> Vec<f64> {
    if prices.len() < period {
        return Vec::new();
    }
    prices
        .highs
        .windows(period)
        .zip(prices.lows.windows(period))
        .map(|(highs, lows)| {
            let (highest, lowest) = window_range(highs, lows);
            (highest + lowest) / 2.0
        })
        .collect()
}

/// Timestamp of bar `index`, extrapolated past the last bar with the last
/// observed bar interval. `None` when fewer than two bars exist or the
/// projection leaves the `i64` range.
fn projected_time(times: &[i64], index: usize) -> Option<i64> {
    if let Some(&time) = times.get(index) {
        return Some(time);
    }
    if times.len() < 2 {
        return None;
    }
    let last = times.len() - 1;
    let interval = times[last].checked_sub(times[last - 1])?;
    let steps = i64::try_from(index - last).ok()?;
    times[last].checked_add(interval.checked_mul(steps)?)
}

/// Shift `values` (first value at `offset`) forward by `displacement` bars.
fn displaced(times: &[i64], offset: usize, displacement: usize, values: &[f64]) -> Vec<LinePoint> {
    values
        .iter()
        .enumerate()
        .filter_map(|(i, &value)| {
            let index = offset.checked_add(i)?.checked_add(displacement)?;
            projected_time(times, index).map(|time| LinePoint { time, value })
        })
        .collect()
}

impl Indicator for Ichimoku {
    fn name(&self) -> &str {
        "ichimoku"
    }

    fn required_candles(&self) -> usize {
        self.params.conversion_period.min(self.params.base_period)
    }

    fn calculate(&self, prices: &PriceArrays) -> IndicatorOutput {
        let p = &self.params;
        let times = &prices.times;
        let conversion = midpoints(prices, p.conversion_period);
        let base = midpoints(prices, p.base_period);

        // span A needs both lines; align them on the later start
        let span_a_offset = p.conversion_period.max(p.base_period) - 1;
        let span_a: Vec<f64> = (span_a_offset..prices.len())
            .map(|i| {
                let c = conversion[i + 1 - p.conversion_period];
                let b = base[i + 1 - p.base_period];
                (c + b) / 2.0
            })
            .collect();
        let span_b = midpoints(prices, p.span_period);

        let lagging: Vec<LinePoint> = prices
            .closes
            .iter()
            .enumerate()
            .skip(p.displacement)
            .map(|(i, &value)| LinePoint {
                time: times[i - p.displacement],
                value,
            })
            .collect();

        IndicatorOutput::new()
            .with(
                "conversion",
                SeriesValues::Line(aligned(times, p.conversion_period - 1, conversion)),
            )
            .with(
                "base",
                SeriesValues::Line(aligned(times, p.base_period - 1, base)),
            )
            .with(
                "spanA",
                SeriesValues::Line(displaced(times, span_a_offset, p.displacement, &span_a)),
            )
            .with(
                "spanB",
                SeriesValues::Line(displaced(
                    times,
                    p.span_period - 1,
                    p.displacement,
                    &span_b,
                )),
            )
            .with("lagging", SeriesValues::Line(lagging))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::test_util::{prices_from_closes, wavy_candles};

    fn small() -> Ichimoku {
        Ichimoku::new(IchimokuParams {
            conversion_period: 2,
            base_period: 3,
            span_period: 4,
            displacement: 2,
        })
        .unwrap()
    }

    #[test]
    fn zero_period_rejected() {
        let params = IchimokuParams {
            base_period: 0,
            ..IchimokuParams::default()
        };
        assert!(Ichimoku::new(params).is_err());
    }

    #[test]
    fn huge_displacement_rejected() {
        let params = IchimokuParams {
            displacement: usize::MAX,
            ..IchimokuParams::default()
        };
        assert!(Ichimoku::new(params).is_err());
    }

    #[test]
    fn zero_displacement_keeps_spans_on_existing_bars() {
        let params = IchimokuParams {
            conversion_period: 2,
            base_period: 3,
            span_period: 4,
            displacement: 0,
        };
        let prices = prices_from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let output = Ichimoku::new(params).unwrap().calculate(&prices);
        let span_a = output.line_points("spanA").unwrap();
        assert_eq!(span_a[0].time, prices.times[2]);
        assert_eq!(span_a.last().unwrap().time, prices.times[4]);
        assert_eq!(output.line_points("lagging").unwrap().len(), 5);
    }

    #[test]
    fn overflowing_projection_is_dropped() {
        let times = [100, 160, 220];
        assert_eq!(projected_time(&times, usize::MAX), None);
        assert_eq!(projected_time(&[0, i64::MAX], 3), None);
        assert!(displaced(&times, usize::MAX, 1, &[1.0]).is_empty());
    }

    #[test]
    fn projected_time_extrapolates_last_interval() {
        let times = [100, 160, 220];
        assert_eq!(projected_time(&times, 1), Some(160));
        assert_eq!(projected_time(&times, 3), Some(280));
        assert_eq!(projected_time(&times, 5), Some(400));
        assert_eq!(projected_time(&[100], 2), None);
    }

    #[test]
    fn spans_are_shifted_into_the_future() {
        let prices = prices_from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let output = small().calculate(&prices);

        let span_a = output.line_points("spanA").unwrap();
        // first span A value at index 2, displaced by 2 -> index 4
        assert_eq!(span_a.len(), 4);
        assert_eq!(span_a[0].time, prices.times[4]);
        // conversion(2) at idx 2 = 2.5, base(3) at idx 2 = 2.0
        assert!((span_a[0].value - 2.25).abs() < 1e-9);
        // last point lands beyond the data with a one-minute step
        assert_eq!(span_a[3].time, prices.times[5] + 2 * 60);

        let span_b = output.line_points("spanB").unwrap();
        assert_eq!(span_b[0].time, prices.times[5]);
        assert!((span_b[0].value - 2.5).abs() < 1e-9);
    }

    #[test]
    fn lagging_span_is_shifted_back() {
        let prices = prices_from_closes(&[1.0, 2.0, 3.0, 4.0]);
        let output = small().calculate(&prices);
        let lagging = output.line_points("lagging").unwrap();
        assert_eq!(lagging.len(), 2);
        assert_eq!(lagging[0].time, prices.times[0]);
        assert_eq!(lagging[0].value, 3.0);
    }

    #[test]
    fn default_params_produce_all_lines() {
        let prices = PriceArrays::from_candles(&wavy_candles(120));
        let output = Ichimoku::new(IchimokuParams::default())
            .unwrap()
            .calculate(&prices);
        assert_eq!(output.line_points("conversion").unwrap().len(), 112);
        assert_eq!(output.line_points("base").unwrap().len(), 95);
        assert_eq!(output.line_points("spanB").unwrap().len(), 69);
        let span_a = output.line_points("spanA").unwrap();
        assert_eq!(span_a.len(), 95);
        assert!(span_a.last().unwrap().time > *prices.times.last().unwrap());
    }

    #[test]
    fn too_short_is_empty() {
        let output = small().calculate(&prices_from_closes(&[1.0]));
        assert!(output.is_empty());
    }
}
