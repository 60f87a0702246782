//! Recording event sink for tests and local runs.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::routing::domain::Effect;
use crate::routing::ports::{EventSink, EventSinkError};

/// Sink that records every published effect and can be told to fail.
#[derive(Debug, Clone, Default)]
pub struct RecordingEventSink {
    published: Arc<Mutex<Vec<Effect>>>,
    fail: Arc<Mutex<bool>>,
}

impl RecordingEventSink {
    /// Creates an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent publishes fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut fail) = self.fail.lock() {
            *fail = failing;
        }
    }

    /// Returns the effects published so far.
    #[must_use]
    pub fn published(&self) -> Vec<Effect> {
        self.published
            .lock()
            .map(|effects| effects.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn publish(&self, effect: &Effect) -> Result<(), EventSinkError> {
        let failing = self.fail.lock().map(|fail| *fail).unwrap_or(false);
        if failing {
            return Err(EventSinkError("sink unavailable".into()));
        }
        self.published
            .lock()
            .map_err(|err| EventSinkError(err.to_string()))?
            .push(effect.clone());
        Ok(())
    }
}
