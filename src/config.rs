//! Tunable windows for routing and counting.

use serde::Deserialize;

const DEFAULT_SWEEP_BATCH_SIZE: usize = 10;
const DEFAULT_COUNTING_WINDOW: usize = 100;

/// Bounded-window sizes used by the routing core.
///
/// Both windows trade exactness for a bounded amount of work per call: the
/// sweep routes at most `sweep_batch_size` conversations, and view counts
/// are an approximation over the `counting_window` most relevant open
/// conversations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Maximum conversations routed per unassigned sweep.
    pub sweep_batch_size: usize,
    /// Maximum open conversations loaded for view counting.
    pub counting_window: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            sweep_batch_size: DEFAULT_SWEEP_BATCH_SIZE,
            counting_window: DEFAULT_COUNTING_WINDOW,
        }
    }
}
