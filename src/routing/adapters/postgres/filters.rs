//! SQL rendering of composed filter plans.
//!
//! Each plan predicate becomes a boxed diesel expression over the
//! conversations table; tag, country and custom-attribute predicates
//! render as correlated `EXISTS` subqueries so the outer statement shape
//! stays fixed. A predicate whose value cannot be rendered degrades to
//! `FALSE`, matching what the in-memory executor returns for it.

use super::schema::{contacts, conversation_custom_attributes, conversation_tags, conversations};
use crate::inbox::domain::FilterOperator;
use crate::inbox::evaluate;
use crate::inbox::plan::{CompareOp, LikeKind, Predicate, QueryPlan, TimestampField};
use diesel::dsl::sql;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Bool, Jsonb, Nullable, Text};

/// Boxed predicate over the conversations table.
pub type BoxedCondition =
    Box<dyn BoxableExpression<conversations::table, Pg, SqlType = Nullable<Bool>>>;

macro_rules! boxed {
    ($expression:expr) => {
        Box::new($expression.nullable()) as BoxedCondition
    };
}

macro_rules! ordered_compare {
    ($column:expr, $op:expr, $value:expr) => {
        match $op {
            CompareOp::Eq => boxed!($column.eq($value)),
            CompareOp::NotEq => boxed!($column.ne($value)),
            CompareOp::Gt => boxed!($column.gt($value)),
            CompareOp::Lt => boxed!($column.lt($value)),
            CompareOp::Gte => boxed!($column.ge($value)),
            CompareOp::Lte => boxed!($column.le($value)),
        }
    };
}

macro_rules! with_timestamp_column {
    ($field:expr, |$column:ident| $body:expr) => {
        match $field {
            TimestampField::CreatedAt => {
                let $column = conversations::created_at;
                $body
            }
            TimestampField::UpdatedAt => {
                let $column = conversations::updated_at;
                $body
            }
            TimestampField::ClosedAt => {
                let $column = conversations::closed_at;
                $body
            }
            TimestampField::AssignedAt => {
                let $column = conversations::assigned_at;
                $body
            }
        }
    };
}

macro_rules! text_compare {
    ($column:expr, $op:expr, $value:expr) => {
        match $value.as_str() {
            Some(text) => ordered_compare!($column, $op, text.to_owned()),
            None => never_matches(),
        }
    };
}

macro_rules! uuid_compare {
    ($column:expr, $op:expr, $value:expr) => {
        match ($op, parse_uuid($value)) {
            (CompareOp::Eq, None) if $value.is_null() => boxed!($column.is_null()),
            (CompareOp::NotEq, None) if $value.is_null() => boxed!($column.is_not_null()),
            (CompareOp::Eq, Some(id)) => boxed!($column.eq(id)),
            (CompareOp::NotEq, Some(id)) => boxed!($column.ne(id)),
            _ => never_matches(),
        }
    };
}

macro_rules! country_exists {
    ($comparison:expr) => {
        boxed!(diesel::dsl::exists(
            contacts::table
                .filter(contacts::id.eq(conversations::contact_id))
                .filter($comparison),
        ))
    };
}

macro_rules! attribute_exists {
    ($definition_id:expr) => {
        boxed!(diesel::dsl::exists(
            conversation_custom_attributes::table
                .filter(conversation_custom_attributes::conversation_id.eq(conversations::id))
                .filter(
                    conversation_custom_attributes::attribute_definition_id.eq($definition_id)
                ),
        ))
    };
    ($definition_id:expr, $value_filter:expr) => {
        boxed!(diesel::dsl::exists(
            conversation_custom_attributes::table
                .filter(conversation_custom_attributes::conversation_id.eq(conversations::id))
                .filter(
                    conversation_custom_attributes::attribute_definition_id.eq($definition_id)
                )
                .filter($value_filter),
        ))
    };
}

/// Applies every predicate of a plan to the boxed base query: `all`
/// predicates AND on directly, `any` predicates fold into one OR group.
pub fn apply_plan(
    mut query: conversations::BoxedQuery<'static, Pg>,
    plan: &QueryPlan,
) -> conversations::BoxedQuery<'static, Pg> {
    for predicate in &plan.all {
        query = query.filter(render(predicate));
    }
    if let Some(group) = or_group(&plan.any) {
        query = query.filter(group);
    }
    query
}

fn or_group(any: &[Predicate]) -> Option<BoxedCondition> {
    let mut predicates = any.iter();
    let first = render(predicates.next()?);
    Some(predicates.fold(first, |group, predicate| {
        Box::new(group.or(render(predicate)))
    }))
}

fn render(predicate: &Predicate) -> BoxedCondition {
    match predicate {
        Predicate::TimeRange { field, start, end } => {
            with_timestamp_column!(field, |column| match (start, end) {
                (Some(lower), Some(upper)) => {
                    boxed!(column.ge(*lower).and(column.le(*upper)))
                }
                (Some(lower), None) => boxed!(column.ge(*lower)),
                (None, Some(upper)) => boxed!(column.le(*upper)),
                (None, None) => never_matches(),
            })
        }
        Predicate::TimeCompare { field, op, cutoff } => {
            with_timestamp_column!(field, |column| {
                ordered_compare!(column, *op, *cutoff)
            })
        }
        Predicate::Subject {
            kind,
            negated,
            needle,
        } => render_subject(*kind, *negated, needle),
        Predicate::Field { key, op, value } => render_field(key, *op, value),
        Predicate::FieldNotNull { key } => render_not_null(key),
        Predicate::TagEquals { tag_ids } => {
            let ids: Vec<i64> = tag_ids.iter().map(|tag| tag.value()).collect();
            boxed!(diesel::dsl::exists(
                conversation_tags::table
                    .filter(conversation_tags::conversation_id.eq(conversations::id))
                    .filter(conversation_tags::tag_id.eq_any(ids)),
            ))
        }
        Predicate::Country { op, value } => render_country(*op, value),
        Predicate::CustomAttribute {
            definition,
            op,
            value,
        } => render_custom_attribute(definition.id, *op, value),
    }
}

fn render_subject(kind: LikeKind, negated: bool, needle: &str) -> BoxedCondition {
    let pattern = match kind {
        LikeKind::Exact => {
            return if negated {
                boxed!(conversations::subject.ne(needle.to_owned()))
            } else {
                boxed!(conversations::subject.eq(needle.to_owned()))
            };
        }
        LikeKind::Contains => format!("%{needle}%"),
        LikeKind::StartsWith => format!("{needle}%"),
        LikeKind::EndsWith => format!("%{needle}"),
    };
    if negated {
        boxed!(conversations::subject.not_like(pattern))
    } else {
        boxed!(conversations::subject.like(pattern))
    }
}

fn render_field(key: &str, op: CompareOp, value: &serde_json::Value) -> BoxedCondition {
    match key {
        "kind" => text_compare!(conversations::kind, op, value),
        "channel" => text_compare!(conversations::channel, op, value),
        "status_category" => text_compare!(conversations::status_category, op, value),
        "assigned_to" => text_compare!(conversations::assigned_to, op, value),
        "mode" => text_compare!(conversations::mode, op, value),
        "status_id" => {
            match evaluate::value_as_i64(value).and_then(|status| i32::try_from(status).ok()) {
                Some(status) => ordered_compare!(conversations::status_id, op, status),
                None => never_matches(),
            }
        }
        "assignee_id" => uuid_compare!(conversations::assignee_id, op, value),
        "group_id" => uuid_compare!(conversations::group_id, op, value),
        "contact_id" => uuid_compare!(conversations::contact_id, op, value),
        _ => never_matches(),
    }
}

fn render_not_null(key: &str) -> BoxedCondition {
    match key {
        "kind" => boxed!(conversations::kind.is_not_null()),
        "channel" => boxed!(conversations::channel.is_not_null()),
        "status_id" => boxed!(conversations::status_id.is_not_null()),
        "status_category" => boxed!(conversations::status_category.is_not_null()),
        "assigned_to" => boxed!(conversations::assigned_to.is_not_null()),
        "assignee_id" => boxed!(conversations::assignee_id.is_not_null()),
        "group_id" => boxed!(conversations::group_id.is_not_null()),
        "contact_id" => boxed!(conversations::contact_id.is_not_null()),
        "mode" => boxed!(conversations::mode.is_not_null()),
        _ => never_matches(),
    }
}

fn render_country(op: CompareOp, value: &serde_json::Value) -> BoxedCondition {
    match (op, value.as_str()) {
        (CompareOp::Eq, None) if value.is_null() => {
            country_exists!(contacts::country.is_null())
        }
        (CompareOp::NotEq, None) if value.is_null() => {
            country_exists!(contacts::country.is_not_null())
        }
        (CompareOp::Eq, Some(text)) => country_exists!(contacts::country.eq(text.to_owned())),
        (CompareOp::NotEq, Some(text)) => country_exists!(contacts::country.ne(text.to_owned())),
        (CompareOp::Gt, Some(text)) => country_exists!(contacts::country.gt(text.to_owned())),
        (CompareOp::Lt, Some(text)) => country_exists!(contacts::country.lt(text.to_owned())),
        (CompareOp::Gte, Some(text)) => country_exists!(contacts::country.ge(text.to_owned())),
        (CompareOp::Lte, Some(text)) => country_exists!(contacts::country.le(text.to_owned())),
        _ => never_matches(),
    }
}

fn render_custom_attribute(
    definition_id: i64,
    op: FilterOperator,
    value: &serde_json::Value,
) -> BoxedCondition {
    match op {
        FilterOperator::NotNull => attribute_exists!(definition_id),
        FilterOperator::Eq => attribute_exists!(
            definition_id,
            conversation_custom_attributes::value.eq(value.clone())
        ),
        FilterOperator::NotEq => attribute_exists!(
            definition_id,
            conversation_custom_attributes::value.ne(value.clone())
        ),
        FilterOperator::Contains
        | FilterOperator::NotContains
        | FilterOperator::StartsWith
        | FilterOperator::EndsWith => render_attribute_text(definition_id, op, value),
        FilterOperator::Has => {
            let wrapped = serde_json::Value::Array(vec![value.clone()]);
            attribute_exists!(
                definition_id,
                sql::<Bool>("conversation_custom_attributes.value @> ").bind::<Jsonb, _>(wrapped)
            )
        }
        FilterOperator::DoesntHave => {
            let wrapped = serde_json::Value::Array(vec![value.clone()]);
            attribute_exists!(
                definition_id,
                sql::<Bool>("NOT (conversation_custom_attributes.value @> ")
                    .bind::<Jsonb, _>(wrapped)
                    .sql(")")
            )
        }
        FilterOperator::Gt | FilterOperator::Lt | FilterOperator::Gte | FilterOperator::Lte => {
            render_attribute_number(definition_id, op, value)
        }
    }
}

fn render_attribute_text(
    definition_id: i64,
    op: FilterOperator,
    value: &serde_json::Value,
) -> BoxedCondition {
    let Some(needle) = value.as_str() else {
        return never_matches();
    };
    let (fragment, pattern) = match op {
        FilterOperator::Contains => (
            "(conversation_custom_attributes.value #>> '{}') LIKE ",
            format!("%{needle}%"),
        ),
        FilterOperator::NotContains => (
            "(conversation_custom_attributes.value #>> '{}') NOT LIKE ",
            format!("%{needle}%"),
        ),
        FilterOperator::StartsWith => (
            "(conversation_custom_attributes.value #>> '{}') LIKE ",
            format!("{needle}%"),
        ),
        FilterOperator::EndsWith => (
            "(conversation_custom_attributes.value #>> '{}') LIKE ",
            format!("%{needle}"),
        ),
        _ => return never_matches(),
    };
    attribute_exists!(definition_id, sql::<Bool>(fragment).bind::<Text, _>(pattern))
}

fn render_attribute_number(
    definition_id: i64,
    op: FilterOperator,
    value: &serde_json::Value,
) -> BoxedCondition {
    let Some(number) = evaluate::value_as_i64(value) else {
        return never_matches();
    };
    let fragment = match op {
        FilterOperator::Gt => "(conversation_custom_attributes.value #>> '{}')::numeric > ",
        FilterOperator::Lt => "(conversation_custom_attributes.value #>> '{}')::numeric < ",
        FilterOperator::Gte => "(conversation_custom_attributes.value #>> '{}')::numeric >= ",
        FilterOperator::Lte => "(conversation_custom_attributes.value #>> '{}')::numeric <= ",
        _ => return never_matches(),
    };
    attribute_exists!(definition_id, sql::<Bool>(fragment).bind::<BigInt, _>(number))
}

fn never_matches() -> BoxedCondition {
    Box::new(sql::<Nullable<Bool>>("FALSE"))
}

fn parse_uuid(value: &serde_json::Value) -> Option<uuid::Uuid> {
    value
        .as_str()
        .and_then(|text| uuid::Uuid::parse_str(text).ok())
}
