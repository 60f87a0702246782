//! Behavioural integration tests for inbox view counting.
//!
//! Drives [`ViewCountingService`] over the in-memory adapters with a
//! realistic view set: built-in views, a stored filter view and the
//! native groups template.

use std::sync::Arc;

use chrono::{Duration, Utc};
use eyre::{OptionExt, Result};
use mockable::DefaultClock;
use serde_json::json;
use switchyard::inbox::counting::ViewCountingService;
use switchyard::inbox::domain::{
    ALL_VIEW_KEY, ConversationView, FilterCondition, FilterOperator, GROUPS_VIEW_KEY,
};
use switchyard::routing::adapters::memory::{InMemoryConversationStore, InMemoryDirectory};
use switchyard::routing::domain::{
    Agent, AgentId, AssignedTo, ContactId, Conversation, ConversationId, ConversationKind,
    ConversationMode, Group, StatusCategory,
};

fn open_conversation(channel: &str) -> Conversation {
    let now = Utc::now();
    Conversation {
        id: ConversationId::new(),
        kind: ConversationKind::Ticket,
        channel: channel.to_owned(),
        subject: "Where is my order".to_owned(),
        status_id: 1,
        status_category: StatusCategory::Open,
        assigned_to: AssignedTo::Unassigned,
        assignee_id: None,
        group_id: None,
        contact_id: ContactId::new(),
        mode: ConversationMode::Normal,
        created_at: now - Duration::hours(3),
        updated_at: now,
        closed_at: None,
        assigned_at: None,
        tag_ids: Vec::new(),
        custom_attributes: Vec::new(),
        contact_country: None,
    }
}

fn counting_service(
    store: &InMemoryConversationStore,
    directory: &InMemoryDirectory,
) -> ViewCountingService<InMemoryConversationStore, InMemoryDirectory, DefaultClock> {
    ViewCountingService::new(
        Arc::new(store.clone()),
        Arc::new(directory.clone()),
        Arc::new(DefaultClock),
    )
}

/// Counts a mixed view set for an agent with one group membership:
/// built-ins stay zero, the filter view tallies its matches and one
/// group view is synthesized and counted.
#[tokio::test(flavor = "multi_thread")]
async fn mixed_view_set_counts_for_an_agent_inbox() -> Result<()> {
    let store = InMemoryConversationStore::new();
    let directory = InMemoryDirectory::new();

    let billing = Group::new("Billing");
    let agent = Agent::new("Amara").in_group(billing.id);
    directory.insert_group(billing.clone());
    directory.insert_agent(agent.clone());

    store.insert_conversation(open_conversation("email"));
    store.insert_conversation(open_conversation("email"));
    store.insert_conversation(open_conversation("chat"));
    let mut grouped = open_conversation("email");
    grouped.group_id = Some(billing.id);
    store.insert_conversation(grouped);

    let all_view = ConversationView::new("All", Vec::new()).with_key(ALL_VIEW_KEY);
    let email_view = ConversationView::new(
        "Email",
        vec![FilterCondition::new(
            "channel",
            FilterOperator::Eq,
            json!("email"),
        )],
    );
    let groups_template = ConversationView::new("Groups", Vec::new()).with_key(GROUPS_VIEW_KEY);
    let views = vec![all_view.clone(), email_view.clone(), groups_template];

    let report = counting_service(&store, &directory)
        .counts_for(&views, agent.id)
        .await?;

    // Three stored views plus the synthesized billing view.
    assert_eq!(report.views.len(), 4);
    assert_eq!(report.counts.get(&all_view.id), Some(&0), "all is exempt");
    assert_eq!(report.counts.get(&email_view.id), Some(&3));

    let billing_key = format!("group-{}", billing.id);
    let billing_view = report
        .views
        .iter()
        .find(|view| view.key.as_deref() == Some(billing_key.as_str()))
        .ok_or_eyre("a group view should be synthesized per membership")?;
    assert_eq!(report.counts.get(&billing_view.id), Some(&1));
    Ok(())
}

/// Closed conversations never enter the counting window.
#[tokio::test(flavor = "multi_thread")]
async fn closed_conversations_are_outside_the_window() -> Result<()> {
    let store = InMemoryConversationStore::new();
    let directory = InMemoryDirectory::new();

    let mut closed = open_conversation("email");
    closed.status_category = StatusCategory::Closed;
    store.insert_conversation(closed);
    store.insert_conversation(open_conversation("email"));

    let view = ConversationView::new(
        "Email",
        vec![FilterCondition::new(
            "channel",
            FilterOperator::Eq,
            json!("email"),
        )],
    );

    let report = counting_service(&store, &directory)
        .counts_for(std::slice::from_ref(&view), AgentId::new())
        .await?;
    assert_eq!(report.counts.get(&view.id), Some(&1));
    Ok(())
}
