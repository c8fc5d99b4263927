use std::collections::BTreeMap;

use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigError, RegistryError};
use crate::indicator::IndicatorParams;
use crate::registry::{Category, IndicatorRegistry, Style};

/// Persisted per-indicator state. Computed series are never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSettings {
    pub enabled: bool,
    pub parameters: Map<String, Value>,
    pub style: Style,
}

/// Configuration blob: `{ overlay: { id: settings }, panel: { id: settings } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub overlay: BTreeMap<String, IndicatorSettings>,
    pub panel: BTreeMap<String, IndicatorSettings>,
}

impl IndicatorConfig {
    pub fn from_json(json: &str) -> Result<Self, Report<ConfigError>> {
        serde_json::from_str(json).change_context(ConfigError::Parse {
            reason: "indicator configuration is not a valid blob".into(),
        })
    }

    pub fn to_json(&self) -> Result<String, Report<ConfigError>> {
        serde_json::to_string_pretty(self).change_context(ConfigError::Serialize)
    }

    fn entries(&self) -> impl Iterator<Item = (&String, &IndicatorSettings)> {
        self.overlay.iter().chain(self.panel.iter())
    }
}

/// Staged change for one registry entry.
struct Pending {
    id: String,
    enabled: bool,
    params: IndicatorParams,
    style: Style,
}

impl IndicatorRegistry {
    /// Snapshot of `{enabled, parameters, style}` for every entry.
    pub fn to_config(&self) -> Result<IndicatorConfig, Report<ConfigError>> {
        let mut config = IndicatorConfig::default();
        for entry in &self.entries {
            let definition = &entry.definition;
            let parameters = match serde_json::to_value(&definition.params)
                .change_context(ConfigError::Serialize)
                .attach_with(|| format!("indicator: {}", definition.id))?
            {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            let settings = IndicatorSettings {
                enabled: entry.enabled,
                parameters,
                style: definition.style.clone(),
            };
            let section = match definition.category {
                Category::Overlay => &mut config.overlay,
                Category::Panel => &mut config.panel,
            };
            section.insert(definition.id.clone(), settings);
        }
        Ok(config)
    }

    pub fn export_json(&self) -> Result<String, Report<ConfigError>> {
        self.to_config()?.to_json()
    }

    /// Applies a configuration blob. Unknown ids are skipped with a warning.
    /// Every parameter set is validated before anything is written, so a bad
    /// entry leaves the registry untouched. Returns the number of entries
    /// applied.
    pub fn apply_config(&mut self, config: &IndicatorConfig) -> Result<usize, Report<RegistryError>> {
        let mut pending = Vec::new();
        for (id, settings) in config.entries() {
            let Some(definition) = self.get(id) else {
                tracing::warn!(id = %id, "Skipping unknown indicator in configuration");
                continue;
            };
            let params = definition
                .params
                .merged(&settings.parameters)
                .change_context_lazy(|| RegistryError::InvalidParameters { id: id.clone() })?;
            let mut style = definition.style.clone();
            style.merge(settings.style.as_map());
            pending.push(Pending {
                id: definition.id.clone(),
                enabled: settings.enabled,
                params,
                style,
            });
        }

        let applied = pending.len();
        for change in pending {
            let entry = self.entry_mut(&change.id)?;
            entry.enabled = change.enabled;
            entry.definition.params = change.params;
            entry.definition.style = change.style;
        }
        Ok(applied)
    }
}
