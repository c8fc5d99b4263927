pub mod catalog;
pub mod persist;

use std::collections::HashMap;

use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RegistryError;
use crate::indicator::{IndicatorKind, IndicatorParams};
use crate::series::ReferenceLine;

/// Where an indicator is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// On top of the price series.
    Overlay,
    /// In its own sub-chart.
    Panel,
}

/// Cosmetic settings, opaque to computation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Style(Map<String, Value>);

impl Style {
    /// Any non-object value yields an empty style.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Shallow merge: keys in `partial` overwrite, all others are kept.
    pub fn merge(&mut self, partial: &Map<String, Value>) {
        for (key, value) in partial {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Registry template of one indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorDefinition {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub params: IndicatorParams,
    pub style: Style,
    pub panel_height: Option<u32>,
    pub reference_lines: Vec<ReferenceLine>,
}

impl IndicatorDefinition {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: Category,
        params: IndicatorParams,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            params,
            style: Style::default(),
            panel_height: None,
            reference_lines: Vec::new(),
        }
    }

    pub fn with_style(mut self, style: Value) -> Self {
        self.style = Style::from_value(style);
        self
    }

    pub fn with_panel_height(mut self, height: u32) -> Self {
        self.panel_height = Some(height);
        self
    }

    pub fn with_reference_line(mut self, value: f64, color: &str) -> Self {
        self.reference_lines.push(ReferenceLine::new(value, color));
        self
    }

    pub fn kind(&self) -> IndicatorKind {
        self.params.kind()
    }

    pub fn is_panel(&self) -> bool {
        self.category == Category::Panel
    }
}

#[derive(Debug, Clone)]
struct RegistryEntry {
    definition: IndicatorDefinition,
    enabled: bool,
}

/// Catalog of known indicators with their current parameters, style and
/// enabled flag. Entries keep registration order.
#[derive(Debug, Clone, Default)]
pub struct IndicatorRegistry {
    entries: Vec<RegistryEntry>,
    aliases: HashMap<String, String>,
}

impl IndicatorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in catalog.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        catalog::populate(&mut registry);
        registry
    }

    /// Registers a definition, replacing any entry with the same id.
    pub fn register(&mut self, definition: IndicatorDefinition) {
        match self.index_of(&definition.id) {
            Some(index) => self.entries[index].definition = definition,
            None => self.entries.push(RegistryEntry {
                definition,
                enabled: false,
            }),
        }
    }

    /// Registers `alias` as a secondary lookup id for `id`.
    pub fn alias(&mut self, alias: &str, id: &str) {
        self.aliases.insert(alias.to_string(), id.to_string());
    }

    /// Canonical id for `id`; identity when no alias matches.
    pub fn resolve<'a>(&'a self, id: &'a str) -> &'a str {
        self.aliases.get(id).map(String::as_str).unwrap_or(id)
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        let id = self.resolve(id);
        self.entries.iter().position(|e| e.definition.id == id)
    }

    fn entry_mut(&mut self, id: &str) -> Result<&mut RegistryEntry, Report<RegistryError>> {
        let index = self.index_of(id).ok_or_else(|| {
            Report::new(RegistryError::UnknownIndicator { id: id.to_string() })
        })?;
        Ok(&mut self.entries[index])
    }

    /// Looks up a definition; aliases are resolved first.
    pub fn get(&self, id: &str) -> Option<&IndicatorDefinition> {
        self.index_of(id).map(|i| &self.entries[i].definition)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        self.index_of(id).is_some_and(|i| self.entries[i].enabled)
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<(), Report<RegistryError>> {
        self.entry_mut(id)?.enabled = enabled;
        Ok(())
    }

    /// Clears every enabled flag.
    pub fn reset_enabled(&mut self) {
        for entry in &mut self.entries {
            entry.enabled = false;
        }
    }

    /// Enabled definitions in registration order.
    pub fn enabled(&self) -> Vec<&IndicatorDefinition> {
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .map(|e| &e.definition)
            .collect()
    }

    pub fn enabled_panel_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.enabled && e.definition.is_panel())
            .count()
    }

    pub fn definitions(&self) -> impl Iterator<Item = &IndicatorDefinition> {
        self.entries.iter().map(|e| &e.definition)
    }

    /// Merges `partial` into the stored parameters. Invalid results leave
    /// the stored parameters untouched.
    pub fn update_parameters(
        &mut self,
        id: &str,
        partial: &Map<String, Value>,
    ) -> Result<&IndicatorDefinition, Report<RegistryError>> {
        let entry = self.entry_mut(id)?;
        let params = entry
            .definition
            .params
            .merged(partial)
            .change_context_lazy(|| RegistryError::InvalidParameters {
                id: entry.definition.id.clone(),
            })?;
        entry.definition.params = params;
        Ok(&entry.definition)
    }

    /// Merges `partial` into the stored style.
    pub fn update_style(
        &mut self,
        id: &str,
        partial: &Map<String, Value>,
    ) -> Result<&IndicatorDefinition, Report<RegistryError>> {
        let entry = self.entry_mut(id)?;
        entry.definition.style.merge(partial);
        Ok(&entry.definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::indicator::ma::PeriodParams;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn registry() -> IndicatorRegistry {
        let mut registry = IndicatorRegistry::new();
        registry.register(
            IndicatorDefinition::new(
                "sma",
                "SMA",
                Category::Overlay,
                IndicatorKind::Sma.default_params(),
            )
            .with_style(json!({"color": "#2962ff", "lineWidth": 2})),
        );
        registry.register(IndicatorDefinition::new(
            "rsi",
            "RSI",
            Category::Panel,
            IndicatorKind::Rsi.default_params(),
        ));
        registry.alias("ma", "sma");
        registry
    }

    #[test]
    fn resolve_is_identity_without_alias() {
        let registry = registry();
        assert_eq!(registry.resolve("ma"), "sma");
        assert_eq!(registry.resolve("rsi"), "rsi");
        assert_eq!(registry.resolve("nope"), "nope");
    }

    #[test]
    fn get_resolves_aliases() {
        let registry = registry();
        assert_eq!(registry.get("ma").unwrap().id, "sma");
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn enabled_flags_and_panel_count() {
        let mut registry = registry();
        registry.set_enabled("ma", true).unwrap();
        registry.set_enabled("rsi", true).unwrap();
        assert!(registry.is_enabled("sma"));
        assert_eq!(registry.enabled().len(), 2);
        assert_eq!(registry.enabled_panel_count(), 1);

        registry.reset_enabled();
        assert!(registry.enabled().is_empty());
        assert!(registry.set_enabled("nope", true).is_err());
    }

    #[test]
    fn parameter_update_is_shallow_merge() {
        let mut registry = registry();
        let definition = registry
            .update_parameters("sma", &object(json!({"period": 50})))
            .unwrap();
        assert_eq!(
            definition.params,
            IndicatorParams::Sma(PeriodParams { period: 50 })
        );
    }

    #[test]
    fn invalid_parameter_update_leaves_definition() {
        let mut registry = registry();
        let err = registry
            .update_parameters("sma", &object(json!({"period": 0})))
            .unwrap_err();
        assert!(matches!(
            err.current_context(),
            RegistryError::InvalidParameters { .. }
        ));
        assert_eq!(
            registry.get("sma").unwrap().params,
            IndicatorKind::Sma.default_params()
        );
    }

    #[test]
    fn style_update_keeps_unspecified_fields() {
        let mut registry = registry();
        registry
            .update_style("sma", &object(json!({"color": "#000"})))
            .unwrap();
        let style = &registry.get("sma").unwrap().style;
        assert_eq!(style.get_str("color"), Some("#000"));
        assert_eq!(style.get("lineWidth"), Some(&json!(2)));
    }

    #[test]
    fn register_replaces_existing_id() {
        let mut registry = registry();
        registry.register(IndicatorDefinition::new(
            "sma",
            "Slow SMA",
            Category::Overlay,
            IndicatorParams::Sma(PeriodParams { period: 200 }),
        ));
        assert_eq!(registry.definitions().count(), 2);
        assert_eq!(registry.get("sma").unwrap().name, "Slow SMA");
    }

    #[test]
    fn defaults_contain_every_kind() {
        let registry = IndicatorRegistry::with_defaults();
        assert_eq!(registry.definitions().count(), 14);
        assert!(registry.enabled().is_empty());
    }
}
