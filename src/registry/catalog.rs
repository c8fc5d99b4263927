use serde_json::json;

use crate::indicator::IndicatorKind;
use crate::registry::{Category, IndicatorDefinition, IndicatorRegistry};

/// Panel capacity used when nothing else is configured.
pub const DEFAULT_MAX_PANELS: usize = 3;

const PANEL_HEIGHT: u32 = 120;
const VOLUME_PANEL_HEIGHT: u32 = 100;

const UP_COLOR: &str = "#26a69a";
const DOWN_COLOR: &str = "#ef5350";
const LEVEL_COLOR: &str = "#787b86";

fn overlay(id: &str, name: &str, kind: IndicatorKind) -> IndicatorDefinition {
    IndicatorDefinition::new(id, name, Category::Overlay, kind.default_params())
}

fn panel(id: &str, name: &str, kind: IndicatorKind) -> IndicatorDefinition {
    IndicatorDefinition::new(id, name, Category::Panel, kind.default_params())
        .with_panel_height(PANEL_HEIGHT)
}

/// Registers the built-in indicators and their aliases.
pub fn populate(registry: &mut IndicatorRegistry) {
    // overlays
    registry.register(
        overlay("sma", "Simple Moving Average", IndicatorKind::Sma)
            .with_style(json!({"color": "#2962ff", "lineWidth": 2})),
    );
    registry.register(
        overlay("ema", "Exponential Moving Average", IndicatorKind::Ema)
            .with_style(json!({"color": "#ff6d00", "lineWidth": 2})),
    );
    registry.register(
        overlay("wma", "Weighted Moving Average", IndicatorKind::Wma)
            .with_style(json!({"color": "#ab47bc", "lineWidth": 2})),
    );
    registry.register(
        overlay("bollinger", "Bollinger Bands", IndicatorKind::BollingerBands).with_style(json!({
            "upperColor": "#2196f3",
            "middleColor": "#ff9800",
            "lowerColor": "#2196f3",
            "lineWidth": 1,
        })),
    );
    registry.register(
        overlay("sar", "Parabolic SAR", IndicatorKind::ParabolicSar).with_style(json!({
            "upColor": UP_COLOR,
            "downColor": DOWN_COLOR,
            "markerSize": 2,
        })),
    );
    registry.register(
        overlay("ichimoku", "Ichimoku Cloud", IndicatorKind::Ichimoku).with_style(json!({
            "conversionColor": "#2962ff",
            "baseColor": "#b71c1c",
            "spanAColor": "#43a047",
            "spanBColor": "#e53935",
            "laggingColor": "#9c27b0",
        })),
    );
    registry.register(
        overlay("vwap", "VWAP", IndicatorKind::Vwap)
            .with_style(json!({"color": "#00bcd4", "lineWidth": 2})),
    );

    // panels
    registry.register(
        panel("volume", "Volume", IndicatorKind::Volume)
            .with_panel_height(VOLUME_PANEL_HEIGHT)
            .with_style(json!({
                "upColor": UP_COLOR,
                "downColor": DOWN_COLOR,
                "maColor": "#ff9800",
            })),
    );
    registry.register(
        panel("rsi", "RSI", IndicatorKind::Rsi)
            .with_style(json!({"color": "#7e57c2", "lineWidth": 2}))
            .with_reference_line(70.0, DOWN_COLOR)
            .with_reference_line(30.0, UP_COLOR),
    );
    registry.register(
        panel("macd", "MACD", IndicatorKind::Macd)
            .with_style(json!({
                "macdColor": "#2962ff",
                "signalColor": "#ff6d00",
                "upColor": UP_COLOR,
                "downColor": DOWN_COLOR,
            }))
            .with_reference_line(0.0, LEVEL_COLOR),
    );
    registry.register(
        panel("stochastic", "Stochastic", IndicatorKind::Stochastic)
            .with_style(json!({"kColor": "#2962ff", "dColor": "#ff6d00"}))
            .with_reference_line(80.0, DOWN_COLOR)
            .with_reference_line(20.0, UP_COLOR),
    );
    registry.register(
        panel("cci", "CCI", IndicatorKind::Cci)
            .with_style(json!({"color": "#00897b", "lineWidth": 2}))
            .with_reference_line(100.0, DOWN_COLOR)
            .with_reference_line(-100.0, UP_COLOR),
    );
    registry.register(
        panel("williams", "Williams %R", IndicatorKind::WilliamsR)
            .with_style(json!({"color": "#f06292", "lineWidth": 2}))
            .with_reference_line(-20.0, DOWN_COLOR)
            .with_reference_line(-80.0, UP_COLOR),
    );
    registry.register(
        panel("atr", "ATR", IndicatorKind::Atr)
            .with_style(json!({"color": "#8d6e63", "lineWidth": 2})),
    );

    for (alias, id) in [
        ("lwma", "wma"),
        ("bb", "bollinger"),
        ("bbands", "bollinger"),
        ("psar", "sar"),
        ("parabolic_sar", "sar"),
        ("stoch", "stochastic"),
        ("willr", "williams"),
        ("williamsR", "williams"),
        ("wr", "williams"),
    ] {
        registry.alias(alias, id);
    }
}
