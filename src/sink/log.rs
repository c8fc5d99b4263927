use crate::manager::ActiveIndicator;
use crate::sink::SeriesSink;

/// Sink that reports every hand-off through `tracing`.
pub struct LogSink;

impl SeriesSink for LogSink {
    fn publish(&self, indicator: &ActiveIndicator) {
        let output = indicator.output();
        let last = output
            .series()
            .iter()
            .filter_map(|s| s.values.values().last().map(|p| (s.name, p.value)))
            .map(|(name, value)| format!("{name}={value:.4}"))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::info!(
            id = %indicator.id(),
            category = ?indicator.category(),
            series = output.series().len(),
            points = output.series().iter().map(|s| s.values.len()).sum::<usize>(),
            "Published {}",
            if last.is_empty() { "(warming up)" } else { last.as_str() },
        );
    }

    fn clear(&self, id: &str) {
        tracing::info!(id = %id, "Cleared indicator");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::test_util::candles_from_closes;
    use crate::manager::{IndicatorManager, ManagerSettings};
    use crate::registry::IndicatorRegistry;
    use std::sync::Arc;

    #[test]
    fn log_sink_does_not_panic() {
        let mut manager = IndicatorManager::new(
            IndicatorRegistry::with_defaults(),
            ManagerSettings::default(),
            Arc::new(LogSink),
        );
        manager
            .update_candle_data(candles_from_closes(&[1.0, 2.0, 3.0]))
            .unwrap();
        // Should not panic, with or without data
        manager.add("sma").unwrap();
        manager.add("rsi").unwrap();
        manager.remove("sma").unwrap();
    }
}
