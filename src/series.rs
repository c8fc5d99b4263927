use serde::{Deserialize, Serialize};

use crate::registry::Style;

const DEFAULT_UP_COLOR: &str = "#26a69a";
const DEFAULT_DOWN_COLOR: &str = "#ef5350";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinePoint {
    pub time: i64,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// A value tagged with the direction a renderer should colour it by.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalPoint {
    pub time: i64,
    pub value: f64,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColoredPoint {
    pub time: i64,
    pub value: f64,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcPoint {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Raw values of one calculator output series.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesValues {
    Line(Vec<LinePoint>),
    Directional(Vec<DirectionalPoint>),
}

impl SeriesValues {
    pub fn len(&self) -> usize {
        match self {
            Self::Line(points) => points.len(),
            Self::Directional(points) => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(time, value)` pairs regardless of point shape.
    pub fn values(&self) -> Vec<LinePoint> {
        match self {
            Self::Line(points) => points.clone(),
            Self::Directional(points) => points
                .iter()
                .map(|p| LinePoint {
                    time: p.time,
                    value: p.value,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedSeries {
    pub name: &'static str,
    pub values: SeriesValues,
}

/// Fully materialised output of one indicator computation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorOutput {
    series: Vec<NamedSeries>,
}

impl IndicatorOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(name: &'static str, points: Vec<LinePoint>) -> Self {
        Self::new().with(name, SeriesValues::Line(points))
    }

    pub fn with(mut self, name: &'static str, values: SeriesValues) -> Self {
        self.series.push(NamedSeries { name, values });
        self
    }

    pub fn series(&self) -> &[NamedSeries] {
        &self.series
    }

    pub fn get(&self, name: &str) -> Option<&SeriesValues> {
        self.series.iter().find(|s| s.name == name).map(|s| &s.values)
    }

    /// Points of a line series, `None` if absent or not line-shaped.
    pub fn line_points(&self, name: &str) -> Option<&[LinePoint]> {
        match self.get(name)? {
            SeriesValues::Line(points) => Some(points),
            SeriesValues::Directional(_) => None,
        }
    }

    pub fn directional_points(&self, name: &str) -> Option<&[DirectionalPoint]> {
        match self.get(name)? {
            SeriesValues::Directional(points) => Some(points),
            SeriesValues::Line(_) => None,
        }
    }

    /// `true` when no series has a single point (warm-up).
    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.values.is_empty())
    }

    /// Convert into renderer-facing series, colouring directional points
    /// with the style's `upColor` / `downColor`.
    pub fn render(&self, style: &Style) -> Vec<RenderSeries> {
        let up = style.get_str("upColor").unwrap_or(DEFAULT_UP_COLOR);
        let down = style.get_str("downColor").unwrap_or(DEFAULT_DOWN_COLOR);
        self.series
            .iter()
            .map(|s| {
                let data = match &s.values {
                    SeriesValues::Line(points) => SeriesData::Line(points.clone()),
                    SeriesValues::Directional(points) => SeriesData::Colored(
                        points
                            .iter()
                            .map(|p| ColoredPoint {
                                time: p.time,
                                value: p.value,
                                color: match p.direction {
                                    Direction::Up => up.to_string(),
                                    Direction::Down => down.to_string(),
                                },
                            })
                            .collect(),
                    ),
                };
                RenderSeries {
                    name: s.name.to_string(),
                    data,
                }
            })
            .collect()
    }
}

/// Series shapes a rendering adapter has to support.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "points", rename_all = "lowercase")]
pub enum SeriesData {
    Line(Vec<LinePoint>),
    Colored(Vec<ColoredPoint>),
    Ohlc(Vec<OhlcPoint>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSeries {
    pub name: String,
    pub data: SeriesData,
}

/// Constant horizontal level drawn in a panel (e.g. RSI 70/30).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLine {
    pub value: f64,
    pub color: String,
}

impl ReferenceLine {
    pub fn new(value: f64, color: impl Into<String>) -> Self {
        Self {
            value,
            color: color.into(),
        }
    }

    /// The level as a line spanning `times`.
    pub fn series(&self, times: &[i64]) -> Vec<LinePoint> {
        times
            .iter()
            .map(|&time| LinePoint {
                time,
                value: self.value,
            })
            .collect()
    }
}

/// Pair `values` with `times`, the first value landing at `times[offset]`.
pub(crate) fn aligned(times: &[i64], offset: usize, values: Vec<f64>) -> Vec<LinePoint> {
    times
        .iter()
        .skip(offset)
        .zip(values)
        .map(|(&time, value)| LinePoint { time, value })
        .collect()
}
