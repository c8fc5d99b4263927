pub mod log;

use crate::manager::ActiveIndicator;

/// Receiver of computed indicator series, typically a chart renderer.
///
/// The manager calls `publish` after every (re)computation of an active
/// indicator and `clear` when the indicator is removed.
pub trait SeriesSink: Send + Sync {
    fn publish(&self, indicator: &ActiveIndicator);

    fn clear(&self, id: &str);
}
