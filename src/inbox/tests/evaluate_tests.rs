//! In-memory condition evaluation tests.

use super::fixtures::{anchor, conversation, ctx};
use crate::inbox::domain::{FilterCondition, FilterOperator};
use crate::inbox::evaluate::condition_matches;
use crate::routing::domain::{CustomAttributeValue, TagId};
use chrono::Duration;
use rstest::rstest;
use serde_json::json;

#[rstest]
#[case::eq_hits("status_id", FilterOperator::Eq, json!(1), true)]
#[case::eq_misses("status_id", FilterOperator::Eq, json!(2), false)]
#[case::gte("status_id", FilterOperator::Gte, json!(1), true)]
#[case::numeric_string("status_id", FilterOperator::Eq, json!("1"), true)]
#[case::text_eq("kind", FilterOperator::Eq, json!("ticket"), true)]
#[case::text_ne("kind", FilterOperator::NotEq, json!("chat"), true)]
#[case::unknown_key("warp_factor", FilterOperator::Eq, json!(9), false)]
fn scalar_fields_compare_by_operator(
    #[case] key: &str,
    #[case] operator: FilterOperator,
    #[case] value: serde_json::Value,
    #[case] expected: bool,
) {
    let condition = FilterCondition::new(key, operator, value);
    assert_eq!(condition_matches(&conversation(), &condition, &ctx()), expected);
}

#[rstest]
fn null_sentinel_matches_unassigned_conversations() {
    let unassigned = conversation();
    let condition = FilterCondition::new("assignee_id", FilterOperator::Eq, json!("null"));
    assert!(condition_matches(&unassigned, &condition, &ctx()));

    let not_null = FilterCondition::new("assignee_id", FilterOperator::NotNull, json!(""));
    assert!(!condition_matches(&unassigned, &not_null, &ctx()));
}

#[rstest]
fn subject_supports_the_like_family() {
    let record = conversation();
    let evaluation = ctx();

    let contains = FilterCondition::new("subject", FilterOperator::Contains, json!("newal"));
    assert!(condition_matches(&record, &contains, &evaluation));

    let starts = FilterCondition::new("subject", FilterOperator::StartsWith, json!("Renewal"));
    assert!(condition_matches(&record, &starts, &evaluation));

    // Matching is case sensitive, like the SQL rendering.
    let wrong_case = FilterCondition::new("subject", FilterOperator::StartsWith, json!("renewal"));
    assert!(!condition_matches(&record, &wrong_case, &evaluation));

    let ends = FilterCondition::new("subject", FilterOperator::EndsWith, json!("question"));
    assert!(condition_matches(&record, &ends, &evaluation));
}

#[rstest]
fn older_than_filters_match_conversations_before_the_cutoff() {
    // created_at sits 5 hours before the anchor.
    let record = conversation();
    let evaluation = ctx();

    let older_than_two = FilterCondition::new("created_at_hours", FilterOperator::Gt, json!(2));
    assert!(condition_matches(&record, &older_than_two, &evaluation));

    let older_than_eight = FilterCondition::new("created_at_hours", FilterOperator::Gt, json!(8));
    assert!(!condition_matches(&record, &older_than_eight, &evaluation));
}

#[rstest]
fn within_the_last_filters_match_recent_conversations() {
    let record = conversation();
    let evaluation = ctx();

    let within_eight = FilterCondition::new("created_at_hours", FilterOperator::Lt, json!(8));
    assert!(condition_matches(&record, &within_eight, &evaluation));

    let within_two = FilterCondition::new("created_at_hours", FilterOperator::Lt, json!(2));
    assert!(!condition_matches(&record, &within_two, &evaluation));
}

#[rstest]
fn hour_filters_on_null_timestamps_never_match() {
    let record = conversation();
    let condition = FilterCondition::new("closed_at_hours", FilterOperator::Gt, json!(1));
    assert!(!condition_matches(&record, &condition, &ctx()));
}

#[rstest]
#[case::beyond_chrono(json!(9_000_000_000_000_i64))]
#[case::negative_overflow(json!(-9_000_000_000_000_i64))]
fn unrepresentable_hour_values_never_match(#[case] hours: serde_json::Value) {
    let record = conversation();
    let condition = FilterCondition::new("created_at_hours", FilterOperator::Gt, hours);
    assert!(!condition_matches(&record, &condition, &ctx()));
}

#[rstest]
fn tag_conditions_match_on_set_intersection() {
    let mut record = conversation();
    record.tag_ids = vec![TagId::new(1), TagId::new(2)];
    let evaluation = ctx();

    let has = FilterCondition::new("tags", FilterOperator::Has, json!([2, 5]));
    assert!(condition_matches(&record, &has, &evaluation));

    let doesnt = FilterCondition::new("tags", FilterOperator::DoesntHave, json!([5]));
    assert!(condition_matches(&record, &doesnt, &evaluation));

    let missing = FilterCondition::new("tags", FilterOperator::Has, json!([7]));
    assert!(!condition_matches(&record, &missing, &evaluation));

    let tagged_at_all = FilterCondition::new("tags", FilterOperator::NotNull, json!(""));
    assert!(condition_matches(&record, &tagged_at_all, &evaluation));
}

#[rstest]
fn custom_attribute_conditions_use_the_stripped_key() {
    let mut record = conversation();
    record.custom_attributes = vec![
        CustomAttributeValue::new("plan", json!("gold")),
        CustomAttributeValue::new("seats", json!(12)),
        CustomAttributeValue::new("regions", json!(["emea", "apac"])),
    ];
    let evaluation = ctx();

    let plan_eq = FilterCondition::new("ca_plan", FilterOperator::Eq, json!("gold"));
    assert!(condition_matches(&record, &plan_eq, &evaluation));

    let seats_gt = FilterCondition::new("ca_seats", FilterOperator::Gt, json!(10));
    assert!(condition_matches(&record, &seats_gt, &evaluation));

    let region_has = FilterCondition::new("ca_regions", FilterOperator::Has, json!("apac"));
    assert!(condition_matches(&record, &region_has, &evaluation));

    let unknown = FilterCondition::new("ca_tier", FilterOperator::Eq, json!("x"));
    assert!(!condition_matches(&record, &unknown, &evaluation));
}

#[rstest]
fn closed_at_comparisons_work_once_the_conversation_closes() {
    let mut record = conversation();
    record.closed_at = Some(anchor() - Duration::hours(3));
    let evaluation = ctx();

    let closed_recently = FilterCondition::new("closed_at_hours", FilterOperator::Lt, json!(4));
    assert!(condition_matches(&record, &closed_recently, &evaluation));

    let not_null = FilterCondition::new("closed_at", FilterOperator::NotNull, json!(""));
    assert!(condition_matches(&record, &not_null, &evaluation));
}
