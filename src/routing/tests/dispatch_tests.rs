//! Effect dispatcher tests.

use std::sync::Arc;

use super::fixtures::ticket;
use crate::routing::adapters::memory::RecordingEventSink;
use crate::routing::domain::{AgentId, Effect};
use crate::routing::ports::EffectDispatcher;
use rstest::rstest;

fn sample_effects() -> Vec<Effect> {
    let conversation = ticket();
    vec![
        Effect::ConversationsUpdated {
            before: vec![conversation.clone()],
            after: vec![conversation.clone()],
        },
        Effect::AssignedToAgent {
            agent_id: AgentId::new(),
            conversations: vec![conversation],
        },
    ]
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dispatch_delivers_effects_in_order() {
    let sink = Arc::new(RecordingEventSink::new());
    let dispatcher = EffectDispatcher::new(Arc::clone(&sink));
    let effects = sample_effects();

    let delivered = dispatcher.dispatch(&effects).await;

    assert_eq!(delivered, 2);
    assert_eq!(sink.published(), effects);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dispatch_swallows_sink_failures() {
    let sink = Arc::new(RecordingEventSink::new());
    sink.set_failing(true);
    let dispatcher = EffectDispatcher::new(Arc::clone(&sink));

    let delivered = dispatcher.dispatch(&sample_effects()).await;

    assert_eq!(delivered, 0);
    assert!(sink.published().is_empty());
}
