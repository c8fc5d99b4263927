use std::fmt;

use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::IndicatorError;
use crate::indicator::Indicator;
use crate::indicator::atr::Atr;
use crate::indicator::bollinger::{BollingerBands, BollingerParams};
use crate::indicator::cci::Cci;
use crate::indicator::ichimoku::{Ichimoku, IchimokuParams};
use crate::indicator::ma::{Ema, PeriodParams, Sma, Wma};
use crate::indicator::macd::{Macd, MacdParams};
use crate::indicator::rsi::Rsi;
use crate::indicator::sar::{ParabolicSar, SarParams};
use crate::indicator::stochastic::{Stochastic, StochasticParams};
use crate::indicator::volume::{Volume, VolumeParams};
use crate::indicator::vwap::{Vwap, VwapParams};
use crate::indicator::williams::WilliamsR;
use crate::model::PriceArrays;
use crate::series::IndicatorOutput;

/// Every indicator family the engine can compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    Sma,
    Ema,
    Wma,
    BollingerBands,
    ParabolicSar,
    Ichimoku,
    Vwap,
    Volume,
    Rsi,
    Macd,
    Stochastic,
    Cci,
    WilliamsR,
    Atr,
}

impl IndicatorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sma => "sma",
            Self::Ema => "ema",
            Self::Wma => "wma",
            Self::BollingerBands => "bollinger_bands",
            Self::ParabolicSar => "parabolic_sar",
            Self::Ichimoku => "ichimoku",
            Self::Vwap => "vwap",
            Self::Volume => "volume",
            Self::Rsi => "rsi",
            Self::Macd => "macd",
            Self::Stochastic => "stochastic",
            Self::Cci => "cci",
            Self::WilliamsR => "williams_r",
            Self::Atr => "atr",
        }
    }

    pub fn default_params(self) -> IndicatorParams {
        let period = |period| PeriodParams { period };
        match self {
            Self::Sma => IndicatorParams::Sma(period(20)),
            Self::Ema => IndicatorParams::Ema(period(20)),
            Self::Wma => IndicatorParams::Wma(period(20)),
            Self::BollingerBands => IndicatorParams::BollingerBands(BollingerParams::default()),
            Self::ParabolicSar => IndicatorParams::ParabolicSar(SarParams::default()),
            Self::Ichimoku => IndicatorParams::Ichimoku(IchimokuParams::default()),
            Self::Vwap => IndicatorParams::Vwap(VwapParams::default()),
            Self::Volume => IndicatorParams::Volume(VolumeParams::default()),
            Self::Rsi => IndicatorParams::Rsi(period(14)),
            Self::Macd => IndicatorParams::Macd(MacdParams::default()),
            Self::Stochastic => IndicatorParams::Stochastic(StochasticParams::default()),
            Self::Cci => IndicatorParams::Cci(period(20)),
            Self::WilliamsR => IndicatorParams::WilliamsR(period(14)),
            Self::Atr => IndicatorParams::Atr(period(14)),
        }
    }

    /// Parse a complete parameter object for this kind and validate it.
    pub fn parse_params(self, value: Value) -> Result<IndicatorParams, Report<IndicatorError>> {
        let context = || IndicatorError::InvalidParameter {
            name: format!("{self} parameters"),
        };
        let params = match self {
            Self::Sma => serde_json::from_value(value).map(IndicatorParams::Sma),
            Self::Ema => serde_json::from_value(value).map(IndicatorParams::Ema),
            Self::Wma => serde_json::from_value(value).map(IndicatorParams::Wma),
            Self::BollingerBands => {
                serde_json::from_value(value).map(IndicatorParams::BollingerBands)
            }
            Self::ParabolicSar => serde_json::from_value(value).map(IndicatorParams::ParabolicSar),
            Self::Ichimoku => serde_json::from_value(value).map(IndicatorParams::Ichimoku),
            Self::Vwap => serde_json::from_value(value).map(IndicatorParams::Vwap),
            Self::Volume => serde_json::from_value(value).map(IndicatorParams::Volume),
            Self::Rsi => serde_json::from_value(value).map(IndicatorParams::Rsi),
            Self::Macd => serde_json::from_value(value).map(IndicatorParams::Macd),
            Self::Stochastic => serde_json::from_value(value).map(IndicatorParams::Stochastic),
            Self::Cci => serde_json::from_value(value).map(IndicatorParams::Cci),
            Self::WilliamsR => serde_json::from_value(value).map(IndicatorParams::WilliamsR),
            Self::Atr => serde_json::from_value(value).map(IndicatorParams::Atr),
        }
        .change_context_lazy(context)?;

        params.build().change_context_lazy(context)?;
        Ok(params)
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed parameters of one indicator; the variant fixes the indicator kind.
///
/// Serializes as the bare parameter object (e.g. `{"period": 14}`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IndicatorParams {
    Sma(PeriodParams),
    Ema(PeriodParams),
    Wma(PeriodParams),
    BollingerBands(BollingerParams),
    ParabolicSar(SarParams),
    Ichimoku(IchimokuParams),
    Vwap(VwapParams),
    Volume(VolumeParams),
    Rsi(PeriodParams),
    Macd(MacdParams),
    Stochastic(StochasticParams),
    Cci(PeriodParams),
    WilliamsR(PeriodParams),
    Atr(PeriodParams),
}

impl IndicatorParams {
    pub fn kind(&self) -> IndicatorKind {
        match self {
            Self::Sma(_) => IndicatorKind::Sma,
            Self::Ema(_) => IndicatorKind::Ema,
            Self::Wma(_) => IndicatorKind::Wma,
            Self::BollingerBands(_) => IndicatorKind::BollingerBands,
            Self::ParabolicSar(_) => IndicatorKind::ParabolicSar,
            Self::Ichimoku(_) => IndicatorKind::Ichimoku,
            Self::Vwap(_) => IndicatorKind::Vwap,
            Self::Volume(_) => IndicatorKind::Volume,
            Self::Rsi(_) => IndicatorKind::Rsi,
            Self::Macd(_) => IndicatorKind::Macd,
            Self::Stochastic(_) => IndicatorKind::Stochastic,
            Self::Cci(_) => IndicatorKind::Cci,
            Self::WilliamsR(_) => IndicatorKind::WilliamsR,
            Self::Atr(_) => IndicatorKind::Atr,
        }
    }

    /// Construct the calculator, validating parameter ranges.
    pub fn build(&self) -> Result<Box<dyn Indicator>, Report<IndicatorError>> {
        Ok(match *self {
            Self::Sma(p) => Box::new(Sma::new(p.period)?),
            Self::Ema(p) => Box::new(Ema::new(p.period)?),
            Self::Wma(p) => Box::new(Wma::new(p.period)?),
            Self::BollingerBands(p) => Box::new(BollingerBands::new(p.period, p.std_dev)?),
            Self::ParabolicSar(p) => Box::new(ParabolicSar::new(p.start, p.increment, p.maximum)?),
            Self::Ichimoku(p) => Box::new(Ichimoku::new(p)?),
            Self::Vwap(p) => Box::new(Vwap::new(p.anchor_period)),
            Self::Volume(p) => Box::new(Volume::new(p.ma_period)?),
            Self::Rsi(p) => Box::new(Rsi::new(p.period)?),
            Self::Macd(p) => Box::new(Macd::new(p.fast_period, p.slow_period, p.signal_period)?),
            Self::Stochastic(p) => Box::new(Stochastic::new(p.k_period, p.d_period, p.smooth)?),
            Self::Cci(p) => Box::new(Cci::new(p.period)?),
            Self::WilliamsR(p) => Box::new(WilliamsR::new(p.period)?),
            Self::Atr(p) => Box::new(Atr::new(p.period)?),
        })
    }

    pub fn compute(&self, prices: &PriceArrays) -> Result<IndicatorOutput, Report<IndicatorError>> {
        Ok(self.build()?.calculate(prices))
    }

    /// Shallow-merge `partial` over the current fields and re-validate.
    /// Unknown field names are rejected.
    pub fn merged(&self, partial: &Map<String, Value>) -> Result<Self, Report<IndicatorError>> {
        let current = serde_json::to_value(self).change_context_lazy(|| {
            IndicatorError::InvalidParameter {
                name: format!("{} parameters", self.kind()),
            }
        })?;
        let mut fields = match current {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        for (key, value) in partial {
            fields.insert(key.clone(), value.clone());
        }
        self.kind().parse_params(Value::Object(fields))
    }
}
