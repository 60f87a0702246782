//! Planner tests: condition lists to typed query plans.

use super::fixtures::{anchor, conversation, ctx};
use crate::inbox::domain::{FilterCondition, FilterOperator};
use crate::inbox::evaluate::condition_matches;
use crate::inbox::plan::{CompareOp, FilterPlanner, Join, LikeKind, Predicate, TimestampField};
use crate::inbox::ports::{CustomAttributeDefinition, StaticCustomAttributeCatalog};
use crate::routing::domain::TagId;
use chrono::Duration;
use rstest::rstest;
use serde_json::json;

fn plan(conditions: &[FilterCondition]) -> crate::inbox::plan::QueryPlan {
    let catalog = StaticCustomAttributeCatalog::new().with_definition(CustomAttributeDefinition {
        id: 7,
        key: "plan".to_owned(),
    });
    FilterPlanner::new(&catalog).plan(conditions, &ctx())
}

#[rstest]
fn all_and_any_conditions_split_into_their_groups() {
    let conditions = vec![
        FilterCondition::new("status_id", FilterOperator::Eq, json!(1)),
        FilterCondition::new("channel", FilterOperator::Eq, json!("email")).any(),
        FilterCondition::new("channel", FilterOperator::Eq, json!("chat")).any(),
    ];
    let plan = plan(&conditions);
    assert_eq!(plan.all.len(), 1);
    assert_eq!(plan.any.len(), 2);
    assert!(!plan.is_empty());
}

#[rstest]
fn unknown_keys_are_skipped_without_failing_the_plan() {
    let conditions = vec![
        FilterCondition::new("warp_factor", FilterOperator::Eq, json!(9)),
        FilterCondition::new("status_id", FilterOperator::Eq, json!(1)),
    ];
    let plan = plan(&conditions);
    assert_eq!(
        plan.all,
        vec![Predicate::Field {
            key: "status_id".to_owned(),
            op: CompareOp::Eq,
            value: json!(1),
        }]
    );
}

#[rstest]
fn joins_are_collected_once_however_many_conditions_need_them() {
    let conditions = vec![
        FilterCondition::new("tags", FilterOperator::Has, json!([1])),
        FilterCondition::new("tags", FilterOperator::DoesntHave, json!([2])),
        FilterCondition::new("country", FilterOperator::Eq, json!("DE")),
    ];
    let plan = plan(&conditions);
    assert_eq!(plan.joins.len(), 2);
    assert!(plan.joins.contains(&Join::Tags));
    assert!(plan.joins.contains(&Join::Contacts));
}

#[rstest]
#[case::older_than(FilterOperator::Gt, CompareOp::Lt)]
#[case::within_the_last(FilterOperator::Lt, CompareOp::Gt)]
#[case::at_least(FilterOperator::Gte, CompareOp::Lte)]
#[case::at_most(FilterOperator::Lte, CompareOp::Gte)]
fn hour_filters_invert_onto_the_column_side(
    #[case] operator: FilterOperator,
    #[case] expected: CompareOp,
) {
    let conditions = vec![FilterCondition::new("updated_at_hours", operator, json!(6))];
    let plan = plan(&conditions);
    assert_eq!(
        plan.all,
        vec![Predicate::TimeCompare {
            field: TimestampField::UpdatedAt,
            op: expected,
            cutoff: anchor() - Duration::hours(6),
        }]
    );
}

#[rstest]
fn timestamp_keys_plan_as_inclusive_ranges() {
    let value = json!({"start": "2024-05-01T00:00:00Z", "end": "2024-05-31T00:00:00Z"});
    let conditions = vec![FilterCondition::new("created_at", FilterOperator::Eq, value)];
    let plan = plan(&conditions);
    let [Predicate::TimeRange { field, start, end }] = plan.all.as_slice() else {
        panic!("expected a time range, got {:?}", plan.all);
    };
    assert_eq!(*field, TimestampField::CreatedAt);
    assert!(start.is_some());
    assert!(end.is_some());
}

#[rstest]
fn an_unrepresentable_hour_value_is_dropped() {
    let conditions = vec![FilterCondition::new(
        "created_at_hours",
        FilterOperator::Gt,
        json!(9_000_000_000_000_i64),
    )];
    assert!(plan(&conditions).is_empty());
}

#[rstest]
fn a_range_without_bounds_is_dropped() {
    let conditions = vec![FilterCondition::new("created_at", FilterOperator::Eq, json!({}))];
    assert!(plan(&conditions).is_empty());
}

#[rstest]
#[case::exact(FilterOperator::Eq, LikeKind::Exact, false)]
#[case::negated_exact(FilterOperator::NotEq, LikeKind::Exact, true)]
#[case::contains(FilterOperator::Contains, LikeKind::Contains, false)]
#[case::not_contains(FilterOperator::NotContains, LikeKind::Contains, true)]
#[case::starts_with(FilterOperator::StartsWith, LikeKind::StartsWith, false)]
#[case::ends_with(FilterOperator::EndsWith, LikeKind::EndsWith, false)]
fn subject_operators_map_onto_the_like_family(
    #[case] operator: FilterOperator,
    #[case] kind: LikeKind,
    #[case] negated: bool,
) {
    let conditions = vec![FilterCondition::new("subject", operator, json!("renewal"))];
    let plan = plan(&conditions);
    assert_eq!(
        plan.all,
        vec![Predicate::Subject {
            kind,
            needle: "renewal".to_owned(),
            negated,
        }]
    );
}

#[rstest]
fn tag_conditions_normalize_object_shapes_into_ids() {
    let value = json!([{"id": 3, "name": "billing"}, "5"]);
    let conditions = vec![FilterCondition::new("tags", FilterOperator::Has, value)];
    let plan = plan(&conditions);
    assert_eq!(
        plan.all,
        vec![Predicate::TagEquals {
            tag_ids: vec![TagId::new(3), TagId::new(5)],
        }]
    );
}

#[rstest]
fn custom_attributes_resolve_through_the_catalog() {
    let conditions = vec![
        FilterCondition::new("ca_plan", FilterOperator::Eq, json!("gold")),
        FilterCondition::new("ca_tier", FilterOperator::Eq, json!("x")),
    ];
    let plan = plan(&conditions);
    let [Predicate::CustomAttribute { definition, op, value }] = plan.all.as_slice() else {
        panic!("expected one attribute predicate, got {:?}", plan.all);
    };
    assert_eq!(definition.id, 7);
    assert_eq!(definition.key, "plan");
    assert_eq!(*op, FilterOperator::Eq);
    assert_eq!(*value, json!("gold"));
}

#[rstest]
fn current_user_resolves_before_key_dispatch() {
    let evaluation = ctx();
    let catalog = StaticCustomAttributeCatalog::new();
    let conditions = vec![FilterCondition::new(
        "assignee_id",
        FilterOperator::Eq,
        json!("currentUser"),
    )];
    let plan = FilterPlanner::new(&catalog).plan(&conditions, &evaluation);
    assert_eq!(
        plan.all,
        vec![Predicate::Field {
            key: "assignee_id".to_owned(),
            op: CompareOp::Eq,
            value: json!(evaluation.actor_id.to_string()),
        }]
    );
}

/// The plan executor and the direct evaluator must classify identically,
/// in particular around the relative-hour inversion.
#[rstest]
#[case(FilterCondition::new("created_at_hours", FilterOperator::Gt, json!(2)))]
#[case(FilterCondition::new("created_at_hours", FilterOperator::Gt, json!(8)))]
#[case(FilterCondition::new("updated_at_hours", FilterOperator::Lt, json!(3)))]
#[case(FilterCondition::new("status_id", FilterOperator::Gte, json!(1)))]
#[case(FilterCondition::new("subject", FilterOperator::Contains, json!("Renewal")))]
#[case(FilterCondition::new("assignee_id", FilterOperator::Eq, json!("null")))]
fn plans_and_direct_evaluation_agree(#[case] condition: FilterCondition) {
    let record = conversation();
    let evaluation = ctx();
    let catalog = StaticCustomAttributeCatalog::new();
    let plan = FilterPlanner::new(&catalog).plan(std::slice::from_ref(&condition), &evaluation);
    assert_eq!(
        plan.matches(&record),
        condition_matches(&record, &condition, &evaluation),
    );
}
