use std::path::Path;

use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::registry::IndicatorRegistry;
use crate::registry::catalog::DEFAULT_MAX_PANELS;

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

fn default_max_panels() -> usize {
    DEFAULT_MAX_PANELS
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    #[serde(default)]
    pub chart: ChartConfig,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Accepted values: `"text"` | `"json"`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

#[derive(Debug, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_max_panels")]
    pub max_panels: usize,
    /// Indicator ids (aliases allowed) enabled at startup.
    #[serde(default)]
    pub indicators: Vec<String>,
    /// Persisted indicator configuration blob (JSON).
    pub state_file: Option<String>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            max_panels: default_max_panels(),
            indicators: Vec::new(),
            state_file: None,
        }
    }
}

/// Load and validate an `AppConfig` from a TOML file at `path`.
pub fn load(path: &Path) -> Result<AppConfig, Report<ConfigError>> {
    let content = std::fs::read_to_string(path)
        .change_context(ConfigError::ReadFile)
        .attach_with(|| format!("path: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&content).change_context(ConfigError::Parse {
        reason: "invalid TOML syntax or schema mismatch".into(),
    })?;

    validate(&config)?;

    Ok(config)
}

const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

fn validate(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    validate_log_format(config)?;
    validate_max_panels(config)?;
    validate_indicator_ids(config)?;
    Ok(())
}

fn validate_log_format(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if !VALID_LOG_FORMATS.contains(&config.general.log_format.as_str()) {
        return Err(Report::new(ConfigError::Validation {
            field: format!(
                "general.log_format \"{}\" is not valid",
                config.general.log_format
            ),
        }));
    }
    Ok(())
}

fn validate_max_panels(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if config.chart.max_panels == 0 {
        return Err(Report::new(ConfigError::Validation {
            field: "chart.max_panels must be at least 1".into(),
        }));
    }
    Ok(())
}

fn validate_indicator_ids(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let registry = IndicatorRegistry::with_defaults();
    let mut panels = std::collections::HashSet::new();

    for id in &config.chart.indicators {
        let Some(definition) = registry.get(id) else {
            return Err(Report::new(ConfigError::Validation {
                field: format!("chart.indicators: unknown indicator \"{id}\""),
            }));
        };
        if definition.is_panel() {
            panels.insert(definition.id.as_str());
        }
    }

    if panels.len() > config.chart.max_panels {
        return Err(Report::new(ConfigError::Validation {
            field: format!(
                "chart.indicators: {} panel indicators exceed max_panels = {}",
                panels.len(),
                config.chart.max_panels
            ),
        }));
    }
    Ok(())
}
