//! In-memory condition evaluation over hydrated conversation records.
//!
//! This is the boolean twin of the SQL-side planner: the same operator
//! vocabulary applied to loaded records instead of a query. Field lookup
//! goes through an explicit accessor map rather than reflection, and the
//! relative-time (`_hours`) classification must agree with the SQL
//! rendering for identical inputs.

use crate::inbox::domain::{FilterCondition, FilterContext, FilterOperator, normalize_tag_ids};
use crate::routing::domain::{Conversation, TagId};
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;
use std::collections::HashSet;

/// A conversation field resolved to a comparable value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Absent / SQL NULL.
    Null,
    /// Textual field (including identifiers rendered as text).
    Text(String),
    /// Numeric field.
    Int(i64),
    /// Timestamp field.
    Timestamp(DateTime<Utc>),
}

/// Resolves a directly-addressable field of a conversation.
///
/// Returns `None` for keys outside the accessor vocabulary; callers treat
/// that the same as an unknown filter key (skip, never fail).
#[must_use]
pub fn field_value(conversation: &Conversation, key: &str) -> Option<FieldValue> {
    let value = match key {
        "kind" => FieldValue::Text(conversation.kind.as_str().to_owned()),
        "channel" => FieldValue::Text(conversation.channel.clone()),
        "subject" => FieldValue::Text(conversation.subject.clone()),
        "status_id" => FieldValue::Int(i64::from(conversation.status_id)),
        "status_category" => FieldValue::Text(conversation.status_category.as_str().to_owned()),
        "assigned_to" => FieldValue::Text(conversation.assigned_to.as_str().to_owned()),
        "mode" => FieldValue::Text(conversation.mode.as_str().to_owned()),
        "assignee_id" => conversation
            .assignee_id
            .map_or(FieldValue::Null, |id| FieldValue::Text(id.to_string())),
        "group_id" => conversation
            .group_id
            .map_or(FieldValue::Null, |id| FieldValue::Text(id.to_string())),
        "contact_id" => FieldValue::Text(conversation.contact_id.to_string()),
        "created_at" => FieldValue::Timestamp(conversation.created_at),
        "updated_at" => FieldValue::Timestamp(conversation.updated_at),
        "closed_at" => conversation
            .closed_at
            .map_or(FieldValue::Null, FieldValue::Timestamp),
        "assigned_at" => conversation
            .assigned_at
            .map_or(FieldValue::Null, FieldValue::Timestamp),
        "country" => conversation
            .contact_country
            .clone()
            .map_or(FieldValue::Null, FieldValue::Text),
        _ => return None,
    };
    Some(value)
}

/// Evaluates a single condition against a hydrated conversation.
///
/// Unknown keys and operator/field combinations outside the vocabulary
/// evaluate to `false` (the condition simply does not match).
#[must_use]
pub fn condition_matches(
    conversation: &Conversation,
    condition: &FilterCondition,
    ctx: &FilterContext,
) -> bool {
    let value = condition.resolved_value(ctx);

    if let Some(base) = condition.key.strip_suffix("_hours") {
        return hours_matches(conversation, base, condition.operator, &value, ctx);
    }
    if let Some(stripped) = condition.key.strip_prefix("ca_") {
        let attribute = conversation
            .custom_attributes
            .iter()
            .find(|attribute| attribute.key == stripped);
        return attribute
            .is_some_and(|attribute| compare_attribute(&attribute.value, condition.operator, &value));
    }
    if condition.key == "tags" {
        return tags_match(&conversation.tag_ids, condition.operator, &value);
    }

    field_value(conversation, &condition.key)
        .is_some_and(|field| compare(&field, condition.operator, &value))
}

/// Relative-hour comparison.
///
/// `>` on an `_hours` filter means "older than N hours ago", so the field
/// timestamp must lie *before* `now - N hours`; `<` means "within the last
/// N hours". The comparison direction is the reverse of the SQL predicate
/// the planner emits, but the classification is identical.
fn hours_matches(
    conversation: &Conversation,
    base_key: &str,
    operator: FilterOperator,
    value: &serde_json::Value,
    ctx: &FilterContext,
) -> bool {
    let Some(FieldValue::Timestamp(at)) = field_value(conversation, base_key) else {
        return false;
    };
    let Some(cutoff) = value_as_i64(value)
        .and_then(Duration::try_hours)
        .and_then(|offset| ctx.now.checked_sub_signed(offset))
    else {
        return false;
    };
    match operator {
        FilterOperator::Gt => at < cutoff,
        FilterOperator::Lt => at > cutoff,
        FilterOperator::Gte => at <= cutoff,
        FilterOperator::Lte => at >= cutoff,
        _ => false,
    }
}

fn tags_match(tag_ids: &[TagId], operator: FilterOperator, value: &serde_json::Value) -> bool {
    let attached: HashSet<TagId> = tag_ids.iter().copied().collect();
    let wanted = normalize_tag_ids(value);
    let intersects = wanted.iter().any(|tag| attached.contains(tag));
    match operator {
        FilterOperator::Has | FilterOperator::Eq => intersects,
        FilterOperator::DoesntHave | FilterOperator::NotEq => !intersects,
        FilterOperator::NotNull => !tag_ids.is_empty(),
        _ => false,
    }
}

/// Applies an operator to a resolved field value and a condition value.
#[must_use]
pub fn compare(field: &FieldValue, operator: FilterOperator, value: &serde_json::Value) -> bool {
    match operator {
        FilterOperator::Eq | FilterOperator::Has => scalar_eq(field, value),
        FilterOperator::NotEq | FilterOperator::DoesntHave => !scalar_eq(field, value),
        FilterOperator::NotNull => !matches!(field, FieldValue::Null),
        FilterOperator::Gt => ordering(field, value) == Some(Ordering::Greater),
        FilterOperator::Lt => ordering(field, value) == Some(Ordering::Less),
        FilterOperator::Gte => {
            matches!(ordering(field, value), Some(Ordering::Greater | Ordering::Equal))
        }
        FilterOperator::Lte => {
            matches!(ordering(field, value), Some(Ordering::Less | Ordering::Equal))
        }
        FilterOperator::Contains => text_match(field, value, |haystack, needle| {
            haystack.contains(needle)
        }),
        FilterOperator::NotContains => !text_match(field, value, |haystack, needle| {
            haystack.contains(needle)
        }),
        FilterOperator::StartsWith => text_match(field, value, |haystack, needle| {
            haystack.starts_with(needle)
        }),
        FilterOperator::EndsWith => text_match(field, value, |haystack, needle| {
            haystack.ends_with(needle)
        }),
    }
}

fn scalar_eq(field: &FieldValue, value: &serde_json::Value) -> bool {
    match field {
        FieldValue::Null => value.is_null(),
        FieldValue::Text(text) => value.as_str() == Some(text.as_str()),
        FieldValue::Int(number) => value_as_i64(value) == Some(*number),
        FieldValue::Timestamp(at) => value_as_timestamp(value) == Some(*at),
    }
}

fn ordering(field: &FieldValue, value: &serde_json::Value) -> Option<Ordering> {
    match field {
        FieldValue::Int(number) => value_as_i64(value).map(|rhs| number.cmp(&rhs)),
        FieldValue::Timestamp(at) => value_as_timestamp(value).map(|rhs| at.cmp(&rhs)),
        FieldValue::Text(text) => value.as_str().map(|rhs| text.as_str().cmp(rhs)),
        FieldValue::Null => None,
    }
}

fn text_match(
    field: &FieldValue,
    value: &serde_json::Value,
    matcher: impl Fn(&str, &str) -> bool,
) -> bool {
    match (field, value.as_str()) {
        (FieldValue::Text(text), Some(needle)) => matcher(text, needle),
        _ => false,
    }
}

/// Compares a stored custom-attribute value against a condition value.
#[must_use]
pub fn compare_attribute(
    stored: &serde_json::Value,
    operator: FilterOperator,
    value: &serde_json::Value,
) -> bool {
    match operator {
        FilterOperator::Eq => json_eq(stored, value),
        FilterOperator::NotEq => !json_eq(stored, value),
        FilterOperator::NotNull => !stored.is_null(),
        FilterOperator::Has => stored
            .as_array()
            .is_some_and(|items| items.iter().any(|item| json_eq(item, value))),
        FilterOperator::DoesntHave => !stored
            .as_array()
            .is_some_and(|items| items.iter().any(|item| json_eq(item, value))),
        FilterOperator::Contains => match (stored.as_str(), value.as_str()) {
            (Some(haystack), Some(needle)) => haystack.contains(needle),
            _ => false,
        },
        FilterOperator::NotContains => match (stored.as_str(), value.as_str()) {
            (Some(haystack), Some(needle)) => !haystack.contains(needle),
            _ => false,
        },
        FilterOperator::StartsWith => match (stored.as_str(), value.as_str()) {
            (Some(haystack), Some(needle)) => haystack.starts_with(needle),
            _ => false,
        },
        FilterOperator::EndsWith => match (stored.as_str(), value.as_str()) {
            (Some(haystack), Some(needle)) => haystack.ends_with(needle),
            _ => false,
        },
        FilterOperator::Gt | FilterOperator::Lt | FilterOperator::Gte | FilterOperator::Lte => {
            match (stored.as_i64(), value_as_i64(value)) {
                (Some(lhs), Some(rhs)) => compare(&FieldValue::Int(lhs), operator, &rhs.into()),
                _ => false,
            }
        }
    }
}

fn json_eq(lhs: &serde_json::Value, rhs: &serde_json::Value) -> bool {
    if lhs == rhs {
        return true;
    }
    // Numeric strings and numbers are used interchangeably in stored
    // view definitions.
    match (value_as_i64(lhs), value_as_i64(rhs)) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

pub(crate) fn value_as_i64(value: &serde_json::Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|text| text.parse::<i64>().ok()))
}

pub(crate) fn value_as_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    value.as_str().and_then(|text| {
        DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|at| at.with_timezone(&Utc))
    })
}
