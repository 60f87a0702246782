//! Unassigned-sweep tests.

use std::sync::Arc;

use super::fixtures::ticket;
use crate::config::RoutingConfig;
use crate::routing::adapters::memory::{InMemoryConversationStore, InMemoryDirectory};
use crate::routing::domain::{Agent, AssignedTo, Group};
use crate::routing::ports::ConversationRepository;
use crate::routing::services::AssignmentEngine;
use mockable::DefaultClock;
use rstest::rstest;

fn sweep_engine(
    store: &InMemoryConversationStore,
    directory: &InMemoryDirectory,
    batch: usize,
) -> AssignmentEngine<InMemoryConversationStore, InMemoryDirectory, DefaultClock> {
    AssignmentEngine::with_config(
        Arc::new(store.clone()),
        Arc::new(directory.clone()),
        Arc::new(DefaultClock),
        RoutingConfig {
            sweep_batch_size: batch,
            ..RoutingConfig::default()
        },
    )
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sweep_routes_every_unassigned_conversation_in_the_batch() {
    let store = InMemoryConversationStore::new();
    let directory = InMemoryDirectory::new();
    let group = Group::new("general").as_default();
    directory.insert_group(group.clone());
    let agent = Agent::new("casey").in_group(group.id);
    directory.insert_agent(agent.clone());

    let first = ticket();
    let second = ticket();
    store.insert_conversation(first.clone());
    store.insert_conversation(second.clone());

    let outcomes = sweep_engine(&store, &directory, 10)
        .distribute_unassigned(false)
        .await
        .expect("sweep should succeed");

    assert_eq!(outcomes.len(), 2);
    for outcome in &outcomes {
        assert_eq!(
            outcome
                .conversations
                .first()
                .and_then(|conversation| conversation.assignee_id),
            Some(agent.id)
        );
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sweep_stops_at_the_configured_batch_size() {
    let store = InMemoryConversationStore::new();
    let directory = InMemoryDirectory::new();
    let group = Group::new("general").as_default();
    directory.insert_group(group.clone());
    let agent = Agent::new("casey").in_group(group.id);
    directory.insert_agent(agent);

    for _ in 0..3 {
        store.insert_conversation(ticket());
    }

    let outcomes = sweep_engine(&store, &directory, 1)
        .distribute_unassigned(false)
        .await
        .expect("sweep should succeed");

    assert_eq!(outcomes.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sweep_queues_conversations_when_no_candidate_exists() {
    let store = InMemoryConversationStore::new();
    let directory = InMemoryDirectory::new();
    let group = Group::new("general").as_default();
    directory.insert_group(group.clone());

    let conversation = ticket();
    store.insert_conversation(conversation.clone());

    let outcomes = sweep_engine(&store, &directory, 10)
        .distribute_unassigned(false)
        .await
        .expect("sweep should succeed");

    assert_eq!(outcomes.len(), 1);
    let queued = store
        .find_by_ids(&[conversation.id])
        .await
        .expect("lookup should succeed");
    assert_eq!(
        queued.first().map(|updated| updated.assigned_to),
        Some(AssignedTo::AgentQueue)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn queued_conversations_remain_in_the_sweep_population() {
    let store = InMemoryConversationStore::new();
    let directory = InMemoryDirectory::new();
    let group = Group::new("general").as_default();
    directory.insert_group(group);

    store.insert_conversation(ticket());
    let routing = sweep_engine(&store, &directory, 10);

    let first_pass = routing
        .distribute_unassigned(false)
        .await
        .expect("first sweep should succeed");
    assert_eq!(first_pass.len(), 1);

    let second_pass = routing
        .distribute_unassigned(false)
        .await
        .expect("second sweep should succeed");
    assert_eq!(second_pass.len(), 1);
}
