//! View counting tests: matching, exemptions and the bounded window.

use super::fixtures::{conversation, ctx};
use crate::config::RoutingConfig;
use crate::inbox::counting::{ViewCountingService, count_views, view_matches};
use crate::inbox::domain::{ConversationView, FilterCondition, FilterOperator, GROUPS_VIEW_KEY};
use crate::routing::adapters::memory::{InMemoryConversationStore, InMemoryDirectory};
use crate::routing::domain::{Agent, Group};
use mockable::DefaultClock;
use rstest::rstest;
use serde_json::json;
use std::sync::Arc;

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

#[rstest]
fn a_view_without_conditions_matches_everything() {
    let view = ConversationView::new("Everything", Vec::new());
    assert!(view_matches(&view, &conversation(), &ctx()));
}

#[rstest]
fn every_all_condition_must_hold() {
    let view = ConversationView::new(
        "Open email",
        vec![
            FilterCondition::new("channel", FilterOperator::Eq, json!("email")),
            FilterCondition::new("status_id", FilterOperator::Eq, json!(9)),
        ],
    );
    assert!(!view_matches(&view, &conversation(), &ctx()));
}

#[rstest]
fn one_any_condition_is_enough() {
    let view = ConversationView::new(
        "Email or chat",
        vec![
            FilterCondition::new("channel", FilterOperator::Eq, json!("phone")).any(),
            FilterCondition::new("channel", FilterOperator::Eq, json!("email")).any(),
        ],
    );
    assert!(view_matches(&view, &conversation(), &ctx()));
}

#[rstest]
#[case::all("all")]
#[case::closed("closed")]
fn built_in_views_keep_a_zero_count(#[case] key: &str) {
    let view = ConversationView::new("Built-in", Vec::new()).with_key(key);
    let window = vec![conversation(), conversation()];
    let counts = count_views(std::slice::from_ref(&view), &window, &ctx());
    assert_eq!(counts.get(&view.id), Some(&0));
}

#[rstest]
fn counts_tally_matching_window_conversations() {
    let mut ticket = conversation();
    ticket.status_id = 2;
    let window = vec![conversation(), conversation(), ticket];
    let view = ConversationView::new(
        "Status one",
        vec![FilterCondition::new("status_id", FilterOperator::Eq, json!(1))],
    );
    let counts = count_views(std::slice::from_ref(&view), &window, &ctx());
    assert_eq!(counts.get(&view.id), Some(&2));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn group_views_are_synthesized_per_membership_and_counted() {
    let store = InMemoryConversationStore::new();
    let directory = InMemoryDirectory::new();
    let billing = Group::new("Billing");
    let sales = Group::new("Sales");
    let agent = Agent::new("Imani").in_group(billing.id).in_group(sales.id);
    directory.insert_group(billing.clone());
    directory.insert_group(sales);
    directory.insert_agent(agent.clone());

    let mut in_billing = conversation();
    in_billing.group_id = Some(billing.id);
    store.insert_conversation(in_billing);
    store.insert_conversation(conversation());

    let template = ConversationView::new("Groups", Vec::new()).with_key(GROUPS_VIEW_KEY);
    let views = vec![template];

    let report = counting_service(&store, &directory)
        .counts_for(&views, agent.id)
        .await
        .expect("counting should succeed");

    // The template plus one synthesized view per membership.
    assert_eq!(report.views.len(), 3);
    let billing_key = format!("group-{}", billing.id);
    let billing_view = report
        .views
        .iter()
        .find(|view| view.key.as_deref() == Some(billing_key.as_str()))
        .expect("a billing group view should be synthesized");
    assert_eq!(report.counts.get(&billing_view.id), Some(&1));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn group_views_are_not_synthesized_without_the_template() {
    let store = InMemoryConversationStore::new();
    let directory = InMemoryDirectory::new();
    let group = Group::new("Billing");
    let agent = Agent::new("Imani").in_group(group.id);
    directory.insert_group(group);
    directory.insert_agent(agent.clone());

    let views = vec![ConversationView::new("Plain", Vec::new())];
    let report = counting_service(&store, &directory)
        .counts_for(&views, agent.id)
        .await
        .expect("counting should succeed");
    assert_eq!(report.views.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn the_window_keeps_the_most_recent_conversations() {
    let store = InMemoryConversationStore::new();
    let directory = InMemoryDirectory::new();
    let mut stale = conversation();
    stale.channel = "phone".to_owned();
    store.insert_conversation(stale);
    store.insert_conversation(conversation());
    store.insert_conversation(conversation());

    let service = ViewCountingService::with_config(
        Arc::new(store.clone()),
        Arc::new(directory.clone()),
        Arc::new(DefaultClock),
        RoutingConfig {
            counting_window: 2,
            ..RoutingConfig::default()
        },
    );
    let views = vec![ConversationView::new(
        "Phone",
        vec![FilterCondition::new(
            "channel",
            FilterOperator::Eq,
            json!("phone"),
        )],
    )];
    let report = service
        .counts_for(&views, crate::routing::domain::AgentId::new())
        .await
        .expect("counting should succeed");
    let only = report.views.first().expect("the view should be echoed back");
    assert_eq!(report.counts.get(&only.id), Some(&0));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn the_counting_window_bounds_the_tally() {
    let store = InMemoryConversationStore::new();
    let directory = InMemoryDirectory::new();
    store.insert_conversation(conversation());
    store.insert_conversation(conversation());
    store.insert_conversation(conversation());

    let service = ViewCountingService::with_config(
        Arc::new(store.clone()),
        Arc::new(directory.clone()),
        Arc::new(DefaultClock),
        RoutingConfig {
            counting_window: 2,
            ..RoutingConfig::default()
        },
    );
    let views = vec![ConversationView::new("Everything", Vec::new())];
    let report = service
        .counts_for(&views, crate::routing::domain::AgentId::new())
        .await
        .expect("counting should succeed");
    let only = report.views.first().expect("the view should be echoed back");
    assert_eq!(report.counts.get(&only.id), Some(&2));
}
