//! Event-sink port and the effect dispatcher.

use crate::routing::domain::Effect;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Delivery failure reported by an event sink.
#[derive(Debug, Clone, Error)]
#[error("event delivery failed: {0}")]
pub struct EventSinkError(pub String);

/// Destination for routing effects (notification bus, activity stream).
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers a single effect.
    async fn publish(&self, effect: &Effect) -> Result<(), EventSinkError>;
}

/// Forwards an outcome's effects to a sink.
///
/// Delivery failures are logged and swallowed: a notification that cannot
/// send must never roll back or block the mutation it describes.
#[derive(Clone)]
pub struct EffectDispatcher<S: EventSink> {
    sink: Arc<S>,
}

impl<S: EventSink> EffectDispatcher<S> {
    /// Creates a dispatcher over the given sink.
    pub const fn new(sink: Arc<S>) -> Self {
        Self { sink }
    }

    /// Publishes every effect in order, continuing past failures.
    ///
    /// Returns the number of effects delivered successfully.
    pub async fn dispatch(&self, effects: &[Effect]) -> usize {
        let mut delivered = 0;
        for effect in effects {
            match self.sink.publish(effect).await {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::warn!(error = %err, "dropping undeliverable routing effect");
                }
            }
        }
        delivered
    }
}
