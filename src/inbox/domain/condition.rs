//! Filter conditions: the stable JSON shape saved views are built from.

use crate::routing::domain::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comparison or matching operator of a filter condition, serialized in
/// its wire form (`"="`, `"!="`, `"notNull"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    /// Exact equality.
    #[serde(rename = "=")]
    Eq,
    /// Inequality.
    #[serde(rename = "!=")]
    NotEq,
    /// Greater than.
    #[serde(rename = ">")]
    Gt,
    /// Less than.
    #[serde(rename = "<")]
    Lt,
    /// Less than or equal.
    #[serde(rename = "<=")]
    Lte,
    /// Greater than or equal.
    #[serde(rename = ">=")]
    Gte,
    /// Field is present (not null).
    #[serde(rename = "notNull")]
    NotNull,
    /// Substring match.
    #[serde(rename = "contains")]
    Contains,
    /// Negated substring match.
    #[serde(rename = "notContains")]
    NotContains,
    /// Prefix match.
    #[serde(rename = "startsWith")]
    StartsWith,
    /// Suffix match.
    #[serde(rename = "endsWith")]
    EndsWith,
    /// Set membership (tags).
    #[serde(rename = "has")]
    Has,
    /// Negated set membership (tags).
    #[serde(rename = "doesntHave")]
    DoesntHave,
}

/// How a condition combines with its siblings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// ANDed directly onto the base query.
    #[default]
    All,
    /// ORed together with the other `any` conditions in one nested group.
    Any,
}

/// A single typed condition against a conversation field.
///
/// `key` may be prefixed `ca_` for custom attributes or suffixed `_hours`
/// for relative-time comparison against a timestamp field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    /// Field name.
    pub key: String,
    /// Operator in wire form.
    pub operator: FilterOperator,
    /// Literal value, or the sentinels `"currentUser"` / `"null"`.
    #[serde(default)]
    pub value: serde_json::Value,
    /// Combination semantics; defaults to `all`.
    #[serde(default)]
    pub match_type: MatchType,
}

impl FilterCondition {
    /// Creates an `all` condition.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        operator: FilterOperator,
        value: serde_json::Value,
    ) -> Self {
        Self {
            key: key.into(),
            operator,
            value,
            match_type: MatchType::All,
        }
    }

    /// Switches the condition to `any` semantics.
    #[must_use]
    pub fn any(mut self) -> Self {
        self.match_type = MatchType::Any;
        self
    }

    /// Returns the value with sentinels substituted: `"currentUser"`
    /// becomes the acting agent's identifier, `"null"` a true null.
    /// Substitution happens before any dispatch on the key.
    #[must_use]
    pub fn resolved_value(&self, ctx: &FilterContext) -> serde_json::Value {
        match self.value.as_str() {
            Some("currentUser") => serde_json::Value::String(ctx.actor_id.to_string()),
            Some("null") => serde_json::Value::Null,
            _ => self.value.clone(),
        }
    }
}

/// Explicit evaluation context: the acting agent and the current instant.
///
/// There is deliberately no ambient "current user" state anywhere in the
/// core; the actor travels with every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterContext {
    /// The agent on whose behalf filters are evaluated.
    pub actor_id: AgentId,
    /// The instant `_hours` cutoffs are computed from.
    pub now: DateTime<Utc>,
}

impl FilterContext {
    /// Creates a context.
    #[must_use]
    pub const fn new(actor_id: AgentId, now: DateTime<Utc>) -> Self {
        Self { actor_id, now }
    }
}

/// Normalizes a tag condition value into tag identifiers.
///
/// Views store tags either as raw ids (`3`, `"3"`, `[1, 2]`) or as
/// `{id, name}` objects; both shapes collapse to the id list.
#[must_use]
pub fn normalize_tag_ids(value: &serde_json::Value) -> Vec<crate::routing::domain::TagId> {
    use crate::routing::domain::TagId;

    fn single(value: &serde_json::Value) -> Option<TagId> {
        if let Some(id) = value.as_i64() {
            return Some(TagId::new(id));
        }
        if let Some(text) = value.as_str() {
            return text.parse::<i64>().ok().map(TagId::new);
        }
        value.get("id").and_then(single)
    }

    match value {
        serde_json::Value::Array(items) => items.iter().filter_map(single).collect(),
        other => single(other).into_iter().collect(),
    }
}

/// Fields a condition may target directly (the allow-list). Unknown keys
/// are logged and skipped, never a hard failure.
pub const FILTERABLE_FIELDS: &[&str] = &[
    "kind",
    "channel",
    "subject",
    "status_id",
    "status_category",
    "assigned_to",
    "assignee_id",
    "group_id",
    "contact_id",
    "mode",
    "created_at",
    "updated_at",
    "closed_at",
    "assigned_at",
    "tags",
    "country",
];
