//! Behavioural integration tests for the routing services.
//!
//! These exercise the assignment engine and the maintenance service
//! end to end over the in-memory adapters, the way an API layer would
//! drive them: route, dispatch the resulting effects, merge, delete.

#![expect(
    clippy::expect_used,
    reason = "Test code uses expect for assertion clarity"
)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use mockable::DefaultClock;
use switchyard::routing::adapters::memory::{
    InMemoryConversationStore, InMemoryDirectory, MessageRecord, RecordingEventSink,
};
use switchyard::routing::domain::{
    Agent, AssignedTo, AssignmentMode, ContactId, Conversation, ConversationId, ConversationKind,
    ConversationMode, Group, MessageId, StatusCategory, TagId,
};
use switchyard::routing::ports::{ConversationRepository, EffectDispatcher};
use switchyard::routing::services::{
    AssignmentEngine, ConversationMaintenance, ConversationSelection,
};
use tokio::runtime::Runtime;

fn test_runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to create test runtime")
}

fn open_ticket() -> Conversation {
    let now = Utc::now();
    Conversation {
        id: ConversationId::new(),
        kind: ConversationKind::Ticket,
        channel: "email".to_owned(),
        subject: "Invoice discrepancy".to_owned(),
        status_id: 1,
        status_category: StatusCategory::Open,
        assigned_to: AssignedTo::Unassigned,
        assignee_id: None,
        group_id: None,
        contact_id: ContactId::new(),
        mode: ConversationMode::Normal,
        created_at: now - Duration::hours(2),
        updated_at: now,
        closed_at: None,
        assigned_at: None,
        tag_ids: Vec::new(),
        custom_attributes: Vec::new(),
        contact_country: None,
    }
}

fn engine(
    store: &InMemoryConversationStore,
    directory: &InMemoryDirectory,
) -> AssignmentEngine<InMemoryConversationStore, InMemoryDirectory, DefaultClock> {
    AssignmentEngine::new(
        Arc::new(store.clone()),
        Arc::new(directory.clone()),
        Arc::new(DefaultClock),
    )
}

/// Moves a conversation between groups, verifies the ineligible assignee
/// is cleared, and delivers every resulting effect through the sink.
#[test]
fn group_move_flows_through_to_the_event_sink() {
    let rt = test_runtime();
    let store = InMemoryConversationStore::new();
    let directory = InMemoryDirectory::new();

    let support = Group::new("Support");
    let billing = Group::new("Billing");
    let outsider = Agent::new("Noor").in_group(support.id);
    directory.insert_group(support.clone());
    directory.insert_group(billing.clone());
    directory.insert_agent(outsider.clone());

    let mut conversation = open_ticket();
    conversation.group_id = Some(support.id);
    conversation.assigned_to = AssignedTo::Agent;
    conversation.assignee_id = Some(outsider.id);
    let conversation_id = conversation.id;
    store.insert_conversation(conversation);

    let outcome = rt
        .block_on(engine(&store, &directory).assign_group(
            ConversationSelection::Ids(vec![conversation_id]),
            &billing,
            true,
        ))
        .expect("group assignment");

    let moved = outcome
        .conversations
        .first()
        .expect("the conversation should be returned");
    assert_eq!(moved.group_id, Some(billing.id));
    assert_eq!(moved.assignee_id, None, "non-member assignee is cleared");

    let sink = Arc::new(RecordingEventSink::new());
    let dispatcher = EffectDispatcher::new(Arc::clone(&sink));
    let delivered = rt.block_on(dispatcher.dispatch(&outcome.effects));
    assert_eq!(delivered, outcome.effects.len());
    assert_eq!(sink.published(), outcome.effects);
}

/// Routes an intake conversation to the default group's first available
/// agent, then verifies the sweep finds nothing left to route.
#[test]
fn intake_routing_drains_the_unassigned_sweep() {
    let rt = test_runtime();
    let store = InMemoryConversationStore::new();
    let directory = InMemoryDirectory::new();

    let inbound = Group::new("Inbound").as_default();
    let agent = Agent::new("Priya").in_group(inbound.id);
    directory.insert_group(inbound);
    directory.insert_agent(agent.clone());

    let conversation = open_ticket();
    store.insert_conversation(conversation.clone());

    let routing = engine(&store, &directory);
    let outcome = rt
        .block_on(routing.assign_first_available(&conversation, &[], true))
        .expect("first-available routing");
    let routed = outcome
        .conversations
        .first()
        .expect("the conversation should be routed");
    assert_eq!(routed.assignee_id, Some(agent.id));
    assert_eq!(routed.assigned_to, AssignedTo::Agent);

    let sweep = rt
        .block_on(routing.distribute_unassigned(false))
        .expect("sweep");
    assert!(sweep.is_empty(), "an assigned conversation is not re-routed");
}

/// Parks a conversation on a manual-mode group, then hands it to a member
/// explicitly, the way a queue pickup works.
#[test]
fn manual_queue_then_explicit_pickup() {
    let rt = test_runtime();
    let store = InMemoryConversationStore::new();
    let directory = InMemoryDirectory::new();

    let triage = Group::new("Triage")
        .with_mode(AssignmentMode::Manual)
        .as_default();
    let agent = Agent::new("Sam").in_group(triage.id);
    directory.insert_group(triage);
    directory.insert_agent(agent.clone());

    let conversation = open_ticket();
    let conversation_id = conversation.id;
    store.insert_conversation(conversation.clone());

    let routing = engine(&store, &directory);
    let queued = rt
        .block_on(routing.assign_first_available(&conversation, &[], true))
        .expect("queueing");
    let parked = queued
        .conversations
        .first()
        .expect("the conversation should be queued");
    assert_eq!(parked.assigned_to, AssignedTo::AgentQueue);
    assert_eq!(parked.assignee_id, None);

    let picked = rt
        .block_on(routing.assign_to_agent(
            ConversationSelection::Ids(vec![conversation_id]),
            agent.id,
            false,
        ))
        .expect("pickup");
    let assigned = picked
        .conversations
        .first()
        .expect("the conversation should be assigned");
    assert_eq!(assigned.assignee_id, Some(agent.id));
}

/// Merges a duplicate into a target and deletes the leftovers, verifying
/// messages, tags and the conversation rows end up consistent.
#[test]
fn merge_then_delete_leaves_a_consistent_store() {
    let rt = test_runtime();
    let store = InMemoryConversationStore::new();

    let mut target = open_ticket();
    target.tag_ids = vec![TagId::new(1)];
    let mut duplicate = open_ticket();
    duplicate.tag_ids = vec![TagId::new(1), TagId::new(2)];
    let target_id = target.id;
    let duplicate_id = duplicate.id;
    store.insert_conversation(target);
    store.insert_conversation(duplicate);
    store.insert_message(MessageRecord {
        id: MessageId::new(),
        conversation_id: duplicate_id,
    });

    let maintenance =
        ConversationMaintenance::new(Arc::new(store.clone()), Arc::new(store.clone()));
    let merged = rt
        .block_on(maintenance.merge(target_id, &[duplicate_id]))
        .expect("merge");
    assert_eq!(merged.id, target_id);

    assert!(
        store
            .message_rows()
            .iter()
            .all(|message| message.conversation_id == target_id),
        "messages follow the merge target"
    );
    assert_eq!(
        store.tag_rows(),
        vec![(target_id, TagId::new(1)), (target_id, TagId::new(2))],
        "tags are unioned without duplicates"
    );
    assert_eq!(store.conversation_count(), 1);

    rt.block_on(maintenance.delete_many(&[target_id]))
        .expect("delete");
    assert_eq!(store.conversation_count(), 0);
    assert!(store.message_rows().is_empty());
    assert!(
        rt.block_on(store.find_by_ids(&[target_id]))
            .expect("lookup")
            .is_empty()
    );
}
