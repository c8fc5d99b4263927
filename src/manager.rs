use std::fmt;
use std::sync::Arc;

use error_stack::{Report, ResultExt, bail};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ConfigError, LifecycleError};
use crate::indicator::Indicator;
use crate::model::{Candle, PriceArrays};
use crate::registry::catalog::DEFAULT_MAX_PANELS;
use crate::registry::persist::IndicatorConfig;
use crate::registry::{Category, IndicatorDefinition, IndicatorRegistry};
use crate::series::{IndicatorOutput, ReferenceLine, RenderSeries};
use crate::sink::SeriesSink;
use crate::store::{CandleStore, Upsert};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerSettings {
    /// Maximum number of panel indicators enabled at once.
    pub max_panels: usize,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            max_panels: DEFAULT_MAX_PANELS,
        }
    }
}

/// An enabled indicator and its latest output.
pub struct ActiveIndicator {
    definition: IndicatorDefinition,
    calculator: Box<dyn Indicator>,
    output: IndicatorOutput,
}

impl ActiveIndicator {
    fn new(definition: IndicatorDefinition) -> Result<Self, Report<LifecycleError>> {
        let calculator = definition.params.build().change_context_lazy(|| {
            LifecycleError::InvalidParameters {
                id: definition.id.clone(),
            }
        })?;
        Ok(Self {
            definition,
            calculator,
            output: IndicatorOutput::new(),
        })
    }

    fn recompute(&mut self, prices: &PriceArrays) {
        let required = self.calculator.required_candles();
        if prices.len() < required {
            tracing::debug!(
                id = %self.definition.id,
                indicator = self.calculator.name(),
                required,
                available = prices.len(),
                "Insufficient candles, output is empty"
            );
        }
        self.output = self.calculator.calculate(prices);
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn category(&self) -> Category {
        self.definition.category
    }

    pub fn definition(&self) -> &IndicatorDefinition {
        &self.definition
    }

    pub fn output(&self) -> &IndicatorOutput {
        &self.output
    }

    pub fn reference_lines(&self) -> &[ReferenceLine] {
        &self.definition.reference_lines
    }

    /// Output series coloured with the indicator's style.
    pub fn render(&self) -> Vec<RenderSeries> {
        self.output.render(&self.definition.style)
    }

    pub fn snapshot(&self) -> IndicatorSnapshot {
        IndicatorSnapshot {
            id: self.definition.id.clone(),
            name: self.definition.name.clone(),
            category: self.definition.category,
            panel_height: self.definition.panel_height,
            series: self.render(),
            reference_lines: self.definition.reference_lines.clone(),
        }
    }
}

impl fmt::Debug for ActiveIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveIndicator")
            .field("definition", &self.definition)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

/// Serializable view of one active indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSnapshot {
    pub id: String,
    pub name: String,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panel_height: Option<u32>,
    pub series: Vec<RenderSeries>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reference_lines: Vec<ReferenceLine>,
}

/// Owns the active indicators of one chart and keeps them in sync with the
/// candle data and the registry.
///
/// Unknown ids and capacity overflows never change state; they come back
/// as `LifecycleError` reports.
pub struct IndicatorManager {
    registry: IndicatorRegistry,
    store: CandleStore,
    instances: Vec<ActiveIndicator>,
    settings: ManagerSettings,
    sink: Arc<dyn SeriesSink>,
}

impl IndicatorManager {
    /// Creates a manager and activates whatever `registry` has enabled, in
    /// registry order and within the panel capacity.
    pub fn new(
        registry: IndicatorRegistry,
        settings: ManagerSettings,
        sink: Arc<dyn SeriesSink>,
    ) -> Self {
        let mut manager = Self {
            registry,
            store: CandleStore::new(),
            instances: Vec::new(),
            settings,
            sink,
        };
        manager.restore_enabled();
        manager
    }

    fn restore_enabled(&mut self) {
        let ids: Vec<String> = self
            .registry
            .enabled()
            .iter()
            .map(|d| d.id.clone())
            .collect();
        self.registry.reset_enabled();
        for id in ids {
            if let Err(report) = self.add(&id) {
                tracing::debug!(id = %id, error = %report, "Indicator not restored");
            }
        }
    }

    fn definition(&self, id: &str) -> Result<&IndicatorDefinition, Report<LifecycleError>> {
        self.registry.get(id).ok_or_else(|| {
            tracing::warn!(id = %id, "Unknown indicator");
            Report::new(LifecycleError::UnknownIndicator { id: id.to_string() })
        })
    }

    fn position(&self, canonical_id: &str) -> Option<usize> {
        self.instances.iter().position(|i| i.id() == canonical_id)
    }

    fn mark_enabled(&mut self, id: &str, enabled: bool) -> Result<(), Report<LifecycleError>> {
        self.registry
            .set_enabled(id, enabled)
            .change_context_lazy(|| LifecycleError::UnknownIndicator { id: id.to_string() })
    }

    /// Enables an indicator and computes it against the current candles.
    /// Adding an already active indicator returns the existing instance.
    pub fn add(&mut self, id: &str) -> Result<&ActiveIndicator, Report<LifecycleError>> {
        let definition = self.definition(id)?.clone();
        if let Some(index) = self.position(&definition.id) {
            return Ok(&self.instances[index]);
        }

        let max = self.settings.max_panels;
        if definition.is_panel() && self.active_panel_count() >= max {
            tracing::warn!(id = %definition.id, max, "Panel capacity reached, indicator not enabled");
            bail!(LifecycleError::CapacityExceeded { max });
        }

        let mut instance = ActiveIndicator::new(definition)?;
        instance.recompute(&self.store.prices());
        self.mark_enabled(instance.id(), true)?;
        self.sink.publish(&instance);
        tracing::debug!(id = %instance.id(), "Indicator enabled");

        let index = self.instances.len();
        self.instances.push(instance);
        Ok(&self.instances[index])
    }

    /// Disables an indicator and discards its output. Removing an inactive
    /// indicator is a no-op.
    pub fn remove(&mut self, id: &str) -> Result<(), Report<LifecycleError>> {
        let canonical = self.definition(id)?.id.clone();
        if let Some(index) = self.position(&canonical) {
            self.instances.remove(index);
            self.sink.clear(&canonical);
            tracing::debug!(id = %canonical, "Indicator disabled");
        }
        self.mark_enabled(&canonical, false)
    }

    /// Flips the enabled state and returns the new one.
    pub fn toggle(&mut self, id: &str) -> Result<bool, Report<LifecycleError>> {
        let canonical = self.definition(id)?.id.clone();
        if self.position(&canonical).is_some() {
            self.remove(&canonical)?;
            Ok(false)
        } else {
            self.add(&canonical)?;
            Ok(true)
        }
    }

    /// Drops every active indicator and clears the registry's enabled flags.
    pub fn remove_all(&mut self) {
        self.clear_instances();
        self.registry.reset_enabled();
    }

    fn clear_instances(&mut self) {
        for instance in self.instances.drain(..) {
            self.sink.clear(instance.id());
        }
    }

    /// Replaces the candle series and recomputes every active indicator.
    pub fn update_candle_data(&mut self, candles: Vec<Candle>) -> Result<(), Report<LifecycleError>> {
        self.store
            .replace(candles)
            .change_context(LifecycleError::InvalidCandles)?;
        self.recalculate_all();
        Ok(())
    }

    /// Updates or appends the trailing candle. Only overlays are recomputed;
    /// panel indicators keep their output until the next full recompute.
    pub fn update_last_candle(&mut self, candle: Candle) -> Result<Upsert, Report<LifecycleError>> {
        let upsert = self
            .store
            .upsert_last(candle)
            .change_context(LifecycleError::InvalidCandles)?;
        self.recalculate_where(|instance| instance.category() == Category::Overlay);
        Ok(upsert)
    }

    /// Recomputes every active indicator. Returns how many were recomputed.
    pub fn recalculate_all(&mut self) -> usize {
        self.recalculate_where(|_| true)
    }

    fn recalculate_where(&mut self, filter: impl Fn(&ActiveIndicator) -> bool) -> usize {
        let prices = self.store.prices();
        let mut count = 0;
        for instance in &mut self.instances {
            if !filter(instance) {
                continue;
            }
            instance.recompute(&prices);
            self.sink.publish(instance);
            count += 1;
        }
        tracing::debug!(count, candles = prices.len(), "Recalculated indicators");
        count
    }

    /// Merges `partial` into the indicator's parameters. An active instance
    /// is rebuilt and recomputed; invalid parameters change nothing.
    pub fn set_parameters(
        &mut self,
        id: &str,
        partial: &Map<String, Value>,
    ) -> Result<(), Report<LifecycleError>> {
        let canonical = self.definition(id)?.id.clone();
        let definition = match self.registry.update_parameters(&canonical, partial) {
            Ok(definition) => definition.clone(),
            Err(report) => {
                tracing::warn!(id = %canonical, error = ?report, "Rejected parameter update");
                return Err(report.change_context(LifecycleError::InvalidParameters { id: canonical }));
            }
        };

        if let Some(index) = self.position(&canonical) {
            let mut instance = ActiveIndicator::new(definition)?;
            instance.recompute(&self.store.prices());
            self.sink.publish(&instance);
            self.instances[index] = instance;
        }
        Ok(())
    }

    /// Merges `partial` into the indicator's style and republishes it if active.
    pub fn set_style(
        &mut self,
        id: &str,
        partial: &Map<String, Value>,
    ) -> Result<(), Report<LifecycleError>> {
        let canonical = self.definition(id)?.id.clone();
        let style = self
            .registry
            .update_style(&canonical, partial)
            .change_context_lazy(|| LifecycleError::UnknownIndicator {
                id: canonical.clone(),
            })?
            .style
            .clone();

        if let Some(index) = self.position(&canonical) {
            let instance = &mut self.instances[index];
            instance.definition.style = style;
            self.sink.publish(instance);
        }
        Ok(())
    }

    /// Applies a persisted configuration blob and rebuilds the active set
    /// from it. A malformed blob leaves registry and instances untouched.
    pub fn load_config(&mut self, json: &str) -> Result<usize, Report<LifecycleError>> {
        let applied = IndicatorConfig::from_json(json)
            .change_context(LifecycleError::MalformedConfiguration)
            .and_then(|config| {
                self.registry
                    .apply_config(&config)
                    .change_context(LifecycleError::MalformedConfiguration)
            });
        let applied = match applied {
            Ok(applied) => applied,
            Err(report) => {
                tracing::warn!(error = ?report, "Ignoring malformed indicator configuration");
                return Err(report);
            }
        };

        self.clear_instances();
        self.restore_enabled();
        tracing::info!(
            applied,
            active = self.instances.len(),
            "Loaded indicator configuration"
        );
        Ok(applied)
    }

    pub fn export_config(&self) -> Result<String, Report<ConfigError>> {
        self.registry.export_json()
    }

    /// Number of active panel indicators, derived from the instance table.
    pub fn active_panel_count(&self) -> usize {
        self.instances
            .iter()
            .filter(|i| i.category() == Category::Panel)
            .count()
    }

    pub fn instance(&self, id: &str) -> Option<&ActiveIndicator> {
        let id = self.registry.resolve(id);
        self.instances.iter().find(|i| i.id() == id)
    }

    pub fn instances(&self) -> &[ActiveIndicator] {
        &self.instances
    }

    pub fn snapshots(&self) -> Vec<IndicatorSnapshot> {
        self.instances.iter().map(ActiveIndicator::snapshot).collect()
    }

    pub fn registry(&self) -> &IndicatorRegistry {
        &self.registry
    }

    pub fn candles(&self) -> &[Candle] {
        self.store.candles()
    }

    pub fn settings(&self) -> ManagerSettings {
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use serde_json::json;

    use crate::indicator::test_util::{candles_from_closes, wavy_candles};
    use crate::series::SeriesData;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }
    }

    impl SeriesSink for RecordingSink {
        fn publish(&self, indicator: &ActiveIndicator) {
            self.events
                .lock()
                .unwrap()
                .push(format!("publish:{}", indicator.id()));
        }

        fn clear(&self, id: &str) {
            self.events.lock().unwrap().push(format!("clear:{id}"));
        }
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn manager_with(registry: IndicatorRegistry) -> (IndicatorManager, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let manager = IndicatorManager::new(registry, ManagerSettings::default(), sink.clone());
        (manager, sink)
    }

    fn manager() -> (IndicatorManager, Arc<RecordingSink>) {
        manager_with(IndicatorRegistry::with_defaults())
    }

    fn lifecycle_error(report: &Report<LifecycleError>) -> &LifecycleError {
        report.current_context()
    }

    #[test]
    fn fourth_panel_is_rejected() {
        let (mut manager, _) = manager();
        for id in ["rsi", "macd", "cci"] {
            manager.add(id).unwrap();
        }
        let err = manager.add("atr").unwrap_err();
        assert!(matches!(
            lifecycle_error(&err),
            LifecycleError::CapacityExceeded { max: 3 }
        ));
        assert_eq!(manager.active_panel_count(), 3);
        assert_eq!(manager.registry().enabled_panel_count(), 3);
        assert!(!manager.registry().is_enabled("atr"));

        // overlays are not bounded by the panel capacity
        manager.add("sma").unwrap();
        assert_eq!(manager.instances().len(), 4);
    }

    #[test]
    fn unknown_id_changes_nothing() {
        let (mut manager, sink) = manager();
        for result in [
            manager.add("nope").map(|_| ()),
            manager.remove("nope"),
            manager.toggle("nope").map(|_| ()),
            manager.set_style("nope", &Map::new()),
        ] {
            let err = result.unwrap_err();
            assert!(matches!(
                lifecycle_error(&err),
                LifecycleError::UnknownIndicator { .. }
            ));
        }
        assert!(manager.instances().is_empty());
        assert!(sink.take().is_empty());
    }

    #[test]
    fn aliases_share_one_instance() {
        let (mut manager, _) = manager();
        manager.add("bb").unwrap();
        manager.add("bbands").unwrap();
        manager.add("bollinger").unwrap();
        assert_eq!(manager.instances().len(), 1);
        assert!(manager.instance("bb").is_some());
        assert_eq!(manager.instance("bb").unwrap().id(), "bollinger");
    }

    #[test]
    fn toggle_twice_matches_direct_add() {
        let candles = wavy_candles(60);
        let (mut toggled, _) = manager();
        toggled.update_candle_data(candles.clone()).unwrap();
        toggled.add("sma").unwrap();
        assert!(!toggled.toggle("sma").unwrap());
        assert!(toggled.instance("sma").is_none());
        assert!(toggled.toggle("sma").unwrap());

        let (mut direct, _) = manager();
        direct.update_candle_data(candles).unwrap();
        direct.add("sma").unwrap();

        assert_eq!(
            toggled.instance("sma").unwrap().output(),
            direct.instance("sma").unwrap().output()
        );
        assert!(toggled.registry().is_enabled("sma"));
    }

    #[test]
    fn short_series_gives_empty_output() {
        let (mut manager, _) = manager();
        manager
            .update_candle_data(candles_from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0]))
            .unwrap();
        let rsi = manager.add("rsi").unwrap();
        assert!(rsi.output().is_empty());
    }

    #[test]
    fn full_update_recomputes_everything() {
        let (mut manager, sink) = manager();
        manager.add("sma").unwrap();
        manager.add("rsi").unwrap();
        sink.take();

        manager.update_candle_data(wavy_candles(40)).unwrap();
        assert_eq!(sink.take(), vec!["publish:sma", "publish:rsi"]);
        assert!(!manager.instance("rsi").unwrap().output().is_empty());
    }

    #[test]
    fn last_candle_update_recomputes_overlays_only() {
        let (mut manager, sink) = manager();
        manager.update_candle_data(wavy_candles(40)).unwrap();
        manager.add("sma").unwrap();
        manager.add("rsi").unwrap();
        sink.take();

        let next = Candle {
            time: 40 * 60,
            open: 100.0,
            high: 102.0,
            low: 99.0,
            close: 101.0,
            volume: 5.0,
        };
        assert_eq!(manager.update_last_candle(next).unwrap(), Upsert::Appended);
        assert_eq!(sink.take(), vec!["publish:sma"]);

        fn last_time(manager: &IndicatorManager, id: &str) -> i64 {
            manager
                .instance(id)
                .unwrap()
                .output()
                .line_points("value")
                .unwrap()
                .last()
                .unwrap()
                .time
        }
        assert_eq!(last_time(&manager, "sma"), 40 * 60);
        assert_eq!(last_time(&manager, "rsi"), 39 * 60);

        manager.recalculate_all();
        assert_eq!(last_time(&manager, "rsi"), 40 * 60);
    }

    #[test]
    fn invalid_candles_are_rejected() {
        let (mut manager, _) = manager();
        manager.update_candle_data(wavy_candles(5)).unwrap();

        let mut bad = wavy_candles(3);
        bad.swap(0, 2);
        let err = manager.update_candle_data(bad).unwrap_err();
        assert!(matches!(lifecycle_error(&err), LifecycleError::InvalidCandles));
        assert_eq!(manager.candles().len(), 5);

        let mut stale = wavy_candles(1)[0];
        stale.time = -60;
        assert!(manager.update_last_candle(stale).is_err());
    }

    #[test]
    fn remove_all_clears_instances_and_flags() {
        let (mut manager, sink) = manager();
        manager.add("sma").unwrap();
        manager.add("macd").unwrap();
        sink.take();

        manager.remove_all();
        assert!(manager.instances().is_empty());
        assert!(manager.registry().enabled().is_empty());
        assert_eq!(sink.take(), vec!["clear:sma", "clear:macd"]);
    }

    #[test]
    fn parameter_update_recomputes_active_instance() {
        let (mut manager, _) = manager();
        manager
            .update_candle_data(candles_from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0]))
            .unwrap();
        manager.add("sma").unwrap();
        assert!(manager.instance("sma").unwrap().output().is_empty());

        manager
            .set_parameters("sma", &object(json!({"period": 3})))
            .unwrap();
        let values: Vec<(i64, f64)> = manager
            .instance("sma")
            .unwrap()
            .output()
            .line_points("value")
            .unwrap()
            .iter()
            .map(|p| (p.time, p.value))
            .collect();
        assert_eq!(values, vec![(120, 2.0), (180, 3.0), (240, 4.0)]);

        let err = manager
            .set_parameters("sma", &object(json!({"period": 0})))
            .unwrap_err();
        assert!(matches!(
            lifecycle_error(&err),
            LifecycleError::InvalidParameters { .. }
        ));
        assert_eq!(
            manager
                .instance("sma")
                .unwrap()
                .output()
                .line_points("value")
                .unwrap()
                .len(),
            3
        );
    }

    #[test]
    fn oversized_parameters_are_rejected_without_recompute() {
        let (mut manager, _) = manager();
        manager.update_candle_data(wavy_candles(120)).unwrap();
        for (id, field) in [
            ("ichimoku", "displacement"),
            ("rsi", "period"),
            ("stochastic", "kPeriod"),
            ("stochastic", "smooth"),
            ("volume", "maPeriod"),
        ] {
            manager.add(id).unwrap();
            let before = manager.instance(id).unwrap().output().clone();
            let err = manager
                .set_parameters(id, &object(json!({ field: u64::MAX })))
                .unwrap_err();
            assert!(matches!(
                lifecycle_error(&err),
                LifecycleError::InvalidParameters { .. }
            ));
            assert_eq!(manager.instance(id).unwrap().output(), &before);
        }
    }

    #[test]
    fn style_update_is_rendered() {
        let (mut manager, sink) = manager();
        manager.update_candle_data(wavy_candles(10)).unwrap();
        manager.add("volume").unwrap();
        sink.take();

        manager
            .set_style("volume", &object(json!({"upColor": "#00ff00", "downColor": "#ff0000"})))
            .unwrap();
        assert_eq!(sink.take(), vec!["publish:volume"]);

        let rendered = manager.instance("volume").unwrap().render();
        let SeriesData::Colored(points) = &rendered[0].data else {
            panic!("expected coloured volume");
        };
        assert!(
            points
                .iter()
                .all(|p| p.color == "#00ff00" || p.color == "#ff0000")
        );
    }

    #[test]
    fn restore_respects_capacity_in_registry_order() {
        let mut registry = IndicatorRegistry::with_defaults();
        for id in ["stochastic", "macd", "rsi", "volume", "ema"] {
            registry.set_enabled(id, true).unwrap();
        }
        let (manager, _) = manager_with(registry);
        let ids: Vec<&str> = manager.instances().iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec!["ema", "volume", "rsi", "macd"]);
        assert!(!manager.registry().is_enabled("stochastic"));
    }

    #[test]
    fn config_round_trip_between_managers() {
        let (mut source, _) = manager();
        source.add("sma").unwrap();
        source.add("rsi").unwrap();
        source
            .set_parameters("rsi", &object(json!({"period": 21})))
            .unwrap();
        let blob = source.export_config().unwrap();

        let (mut target, _) = manager();
        target.add("macd").unwrap();
        target.load_config(&blob).unwrap();

        let ids: Vec<&str> = target.instances().iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec!["sma", "rsi"]);
        assert_eq!(
            target.registry().to_config().unwrap(),
            source.registry().to_config().unwrap()
        );
    }

    #[test]
    fn malformed_config_keeps_state() {
        let (mut manager, _) = manager();
        manager.add("sma").unwrap();
        let before = manager.export_config().unwrap();

        for blob in [
            "not json",
            r#"{"panel": []}"#,
            r#"{"panel": {"rsi": {"parameters": {"period": "x"}}}}"#,
        ] {
            let err = manager.load_config(blob).unwrap_err();
            assert!(matches!(
                lifecycle_error(&err),
                LifecycleError::MalformedConfiguration
            ));
        }
        assert_eq!(manager.export_config().unwrap(), before);
        assert!(manager.instance("sma").is_some());
    }

    #[test]
    fn snapshot_carries_panel_layout() {
        let (mut manager, _) = manager();
        manager.update_candle_data(wavy_candles(30)).unwrap();
        manager.add("rsi").unwrap();
        let value = serde_json::to_value(manager.snapshots()).unwrap();
        let rsi = &value[0];
        assert_eq!(rsi["id"], "rsi");
        assert_eq!(rsi["category"], "panel");
        assert_eq!(rsi["panelHeight"], 120);
        assert_eq!(rsi["referenceLines"][0]["value"], 70.0);
        assert_eq!(rsi["series"][0]["data"]["type"], "line");
    }
}
