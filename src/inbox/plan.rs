//! Filter planning: turning condition lists into a composed query plan.
//!
//! The planner is the SQL-facing twin of [`crate::inbox::evaluate`]: it
//! translates `{key, operator, value, match_type}` conditions into typed
//! predicates a store adapter can render, splitting `all` conditions
//! (ANDed onto the base query) from `any` conditions (ORed inside one
//! nested group). Joins against the tag and contact tables are collected
//! in a set, so they are added at most once per plan however many
//! conditions need them.

use crate::inbox::domain::{
    FILTERABLE_FIELDS, FilterCondition, FilterContext, FilterOperator, MatchType,
    normalize_tag_ids,
};
use crate::inbox::evaluate::{self, FieldValue};
use crate::inbox::ports::{CustomAttributeCatalog, CustomAttributeDefinition};
use crate::routing::domain::{Conversation, TagId};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeSet, HashMap};

/// Timestamp columns addressable by range and `_hours` filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampField {
    /// `created_at`.
    CreatedAt,
    /// `updated_at`.
    UpdatedAt,
    /// `closed_at`.
    ClosedAt,
    /// `assigned_at`.
    AssignedAt,
}

impl TimestampField {
    /// Maps a condition key to a timestamp column.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "created_at" => Some(Self::CreatedAt),
            "updated_at" => Some(Self::UpdatedAt),
            "closed_at" => Some(Self::ClosedAt),
            "assigned_at" => Some(Self::AssignedAt),
            _ => None,
        }
    }

    /// Returns the column name.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::ClosedAt => "closed_at",
            Self::AssignedAt => "assigned_at",
        }
    }
}

/// Plain comparison operator usable in a rendered predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// Equality.
    Eq,
    /// Inequality.
    NotEq,
    /// Strictly greater.
    Gt,
    /// Strictly less.
    Lt,
    /// Greater or equal.
    Gte,
    /// Less or equal.
    Lte,
}

impl CompareOp {
    fn from_operator(operator: FilterOperator) -> Option<Self> {
        match operator {
            FilterOperator::Eq => Some(Self::Eq),
            FilterOperator::NotEq => Some(Self::NotEq),
            FilterOperator::Gt => Some(Self::Gt),
            FilterOperator::Lt => Some(Self::Lt),
            FilterOperator::Gte => Some(Self::Gte),
            FilterOperator::Lte => Some(Self::Lte),
            _ => None,
        }
    }
}

/// Wildcard placement for subject matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LikeKind {
    /// Exact comparison, no wildcards.
    Exact,
    /// `%needle%`.
    Contains,
    /// `needle%`.
    StartsWith,
    /// `%needle`.
    EndsWith,
}

/// A typed predicate in a query plan.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Inclusive timestamp range (`value.start` / `value.end`).
    TimeRange {
        /// Target column.
        field: TimestampField,
        /// Inclusive lower bound.
        start: Option<DateTime<Utc>>,
        /// Inclusive upper bound.
        end: Option<DateTime<Utc>>,
    },
    /// Timestamp comparison against an `_hours` cutoff. Note the operator
    /// here is already the *column* comparison: a `>` hours-filter arrives
    /// as `Lt` (column before cutoff).
    TimeCompare {
        /// Target column.
        field: TimestampField,
        /// Column-side comparison.
        op: CompareOp,
        /// `now - N hours` at plan time.
        cutoff: DateTime<Utc>,
    },
    /// LIKE-family match on the subject.
    Subject {
        /// Wildcard placement.
        kind: LikeKind,
        /// Needle text.
        needle: String,
        /// NOT LIKE / inequality.
        negated: bool,
    },
    /// Direct comparison on an allow-listed scalar column.
    Field {
        /// Column name (allow-listed).
        key: String,
        /// Comparison.
        op: CompareOp,
        /// Literal value (string, number or null).
        value: serde_json::Value,
    },
    /// NOT NULL check on an allow-listed column.
    FieldNotNull {
        /// Column name (allow-listed).
        key: String,
    },
    /// Tag attachment equality, via the deduplicated tag join.
    TagEquals {
        /// Tag identifiers the attachment may match.
        tag_ids: Vec<TagId>,
    },
    /// Contact country comparison, via the deduplicated contact join.
    Country {
        /// Comparison from the condition itself, not hardcoded equality.
        op: CompareOp,
        /// Country value.
        value: serde_json::Value,
    },
    /// Custom-attribute comparison, delegated to the attribute-value
    /// store.
    CustomAttribute {
        /// Resolved attribute definition.
        definition: CustomAttributeDefinition,
        /// Full operator vocabulary.
        op: FilterOperator,
        /// Condition value.
        value: serde_json::Value,
    },
}

/// Auxiliary tables a plan needs joined. Collected as a set: the same
/// join is never added twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Join {
    /// Tag attachment table.
    Tags,
    /// Contact table (country filtering).
    Contacts,
}

/// A composed query plan: `all` predicates AND directly onto the base
/// query; `any` predicates are ORed together inside one nested group,
/// which is then ANDed as a whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPlan {
    /// Conjunctive predicates.
    pub all: Vec<Predicate>,
    /// Disjunctive predicates (one nested OR group).
    pub any: Vec<Predicate>,
    /// Deduplicated join requirements.
    pub joins: BTreeSet<Join>,
}

impl QueryPlan {
    /// Returns true when the plan constrains nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all.is_empty() && self.any.is_empty()
    }

    /// Evaluates the plan against a hydrated record: the in-memory
    /// executor. Must classify identically to the SQL rendering for the
    /// same inputs.
    #[must_use]
    pub fn matches(&self, conversation: &Conversation) -> bool {
        self.all
            .iter()
            .all(|predicate| predicate_matches(predicate, conversation))
            && (self.any.is_empty()
                || self
                    .any
                    .iter()
                    .any(|predicate| predicate_matches(predicate, conversation)))
    }
}

fn predicate_matches(predicate: &Predicate, conversation: &Conversation) -> bool {
    match predicate {
        Predicate::TimeRange { field, start, end } => {
            let Some(FieldValue::Timestamp(at)) =
                evaluate::field_value(conversation, field.column())
            else {
                return false;
            };
            start.is_none_or(|lower| at >= lower) && end.is_none_or(|upper| at <= upper)
        }
        Predicate::TimeCompare { field, op, cutoff } => {
            let Some(FieldValue::Timestamp(at)) =
                evaluate::field_value(conversation, field.column())
            else {
                return false;
            };
            match op {
                CompareOp::Lt => at < *cutoff,
                CompareOp::Gt => at > *cutoff,
                CompareOp::Lte => at <= *cutoff,
                CompareOp::Gte => at >= *cutoff,
                CompareOp::Eq => at == *cutoff,
                CompareOp::NotEq => at != *cutoff,
            }
        }
        Predicate::Subject {
            kind,
            needle,
            negated,
        } => {
            let subject = conversation.subject.as_str();
            let hit = match kind {
                LikeKind::Exact => subject == needle,
                LikeKind::Contains => subject.contains(needle.as_str()),
                LikeKind::StartsWith => subject.starts_with(needle.as_str()),
                LikeKind::EndsWith => subject.ends_with(needle.as_str()),
            };
            hit != *negated
        }
        Predicate::Field { key, op, value } => evaluate::field_value(conversation, key)
            .is_some_and(|field| evaluate::compare(&field, compare_operator(*op), value)),
        Predicate::FieldNotNull { key } => evaluate::field_value(conversation, key)
            .is_some_and(|field| !matches!(field, FieldValue::Null)),
        Predicate::TagEquals { tag_ids } => tag_ids
            .iter()
            .any(|tag| conversation.tag_ids.contains(tag)),
        Predicate::Country { op, value } => {
            let field = conversation
                .contact_country
                .clone()
                .map_or(FieldValue::Null, FieldValue::Text);
            evaluate::compare(&field, compare_operator(*op), value)
        }
        Predicate::CustomAttribute {
            definition,
            op,
            value,
        } => conversation
            .custom_attributes
            .iter()
            .find(|attribute| attribute.key == definition.key)
            .is_some_and(|attribute| evaluate::compare_attribute(&attribute.value, *op, value)),
    }
}

const fn compare_operator(op: CompareOp) -> FilterOperator {
    match op {
        CompareOp::Eq => FilterOperator::Eq,
        CompareOp::NotEq => FilterOperator::NotEq,
        CompareOp::Gt => FilterOperator::Gt,
        CompareOp::Lt => FilterOperator::Lt,
        CompareOp::Gte => FilterOperator::Gte,
        CompareOp::Lte => FilterOperator::Lte,
    }
}

/// Builds query plans from condition lists.
///
/// Custom-attribute definitions are looked up through the catalog and
/// memoized per planner instance, so one request never reloads metadata
/// for a repeated key.
pub struct FilterPlanner<'a> {
    catalog: &'a dyn CustomAttributeCatalog,
    cache: HashMap<String, Option<CustomAttributeDefinition>>,
}

impl<'a> FilterPlanner<'a> {
    /// Creates a planner over the given catalog.
    #[must_use]
    pub fn new(catalog: &'a dyn CustomAttributeCatalog) -> Self {
        Self {
            catalog,
            cache: HashMap::new(),
        }
    }

    /// Translates conditions into a plan.
    ///
    /// Conditions with unknown keys, unsupported operators or malformed
    /// values are logged at error level and skipped; the rest of the
    /// filter set still applies.
    pub fn plan(&mut self, conditions: &[FilterCondition], ctx: &FilterContext) -> QueryPlan {
        let mut plan = QueryPlan::default();
        for condition in conditions {
            if let Some(predicate) = self.plan_condition(condition, ctx, &mut plan.joins) {
                match condition.match_type {
                    MatchType::All => plan.all.push(predicate),
                    MatchType::Any => plan.any.push(predicate),
                }
            }
        }
        plan
    }

    fn plan_condition(
        &mut self,
        condition: &FilterCondition,
        ctx: &FilterContext,
        joins: &mut BTreeSet<Join>,
    ) -> Option<Predicate> {
        let value = condition.resolved_value(ctx);

        if let Some(field) = TimestampField::from_key(&condition.key) {
            return plan_time_range(field, &value, condition);
        }
        if let Some(stripped) = condition.key.strip_prefix("ca_") {
            return self.plan_custom_attribute(stripped, condition, value);
        }
        if let Some(base) = condition.key.strip_suffix("_hours") {
            return plan_hours(base, condition, &value, ctx);
        }
        match condition.key.as_str() {
            "subject" => plan_subject(condition, &value),
            "tags" => {
                let tag_ids = normalize_tag_ids(&value);
                if tag_ids.is_empty() {
                    skip(condition, "tag condition carries no usable tag id");
                    return None;
                }
                joins.insert(Join::Tags);
                Some(Predicate::TagEquals { tag_ids })
            }
            "country" => match CompareOp::from_operator(condition.operator) {
                Some(op) => {
                    joins.insert(Join::Contacts);
                    Some(Predicate::Country { op, value })
                }
                None => {
                    skip(condition, "operator not usable for country");
                    None
                }
            },
            key if FILTERABLE_FIELDS.contains(&key) => plan_field(condition, value),
            _ => {
                tracing::error!(key = %condition.key, "skipping unknown filter key");
                None
            }
        }
    }

    fn plan_custom_attribute(
        &mut self,
        stripped: &str,
        condition: &FilterCondition,
        value: serde_json::Value,
    ) -> Option<Predicate> {
        let catalog = self.catalog;
        let definition = self
            .cache
            .entry(stripped.to_owned())
            .or_insert_with(|| catalog.definition(stripped))
            .clone();
        match definition {
            Some(definition) => Some(Predicate::CustomAttribute {
                definition,
                op: condition.operator,
                value,
            }),
            None => {
                tracing::error!(key = %condition.key, "skipping unknown custom attribute");
                None
            }
        }
    }
}

fn plan_time_range(
    field: TimestampField,
    value: &serde_json::Value,
    condition: &FilterCondition,
) -> Option<Predicate> {
    let start = value.get("start").and_then(evaluate::value_as_timestamp);
    let end = value.get("end").and_then(evaluate::value_as_timestamp);
    if start.is_none() && end.is_none() {
        skip(condition, "date range carries neither start nor end");
        return None;
    }
    Some(Predicate::TimeRange { field, start, end })
}

/// Relative-time planning. The inversion is deliberate and must be
/// preserved: `>` on the hours-filter means "older than N hours ago" and
/// renders as `column < now - N hours`; `<` means "within the last N
/// hours" and renders as `column > now - N hours`.
fn plan_hours(
    base: &str,
    condition: &FilterCondition,
    value: &serde_json::Value,
    ctx: &FilterContext,
) -> Option<Predicate> {
    let Some(field) = TimestampField::from_key(base) else {
        tracing::error!(key = %condition.key, "skipping unknown filter key");
        return None;
    };
    let Some(cutoff) = evaluate::value_as_i64(value)
        .and_then(Duration::try_hours)
        .and_then(|offset| ctx.now.checked_sub_signed(offset))
    else {
        skip(condition, "hours value is not a usable number");
        return None;
    };
    let op = match condition.operator {
        FilterOperator::Gt => CompareOp::Lt,
        FilterOperator::Lt => CompareOp::Gt,
        FilterOperator::Gte => CompareOp::Lte,
        FilterOperator::Lte => CompareOp::Gte,
        _ => {
            skip(condition, "operator not usable for an hours filter");
            return None;
        }
    };
    Some(Predicate::TimeCompare { field, op, cutoff })
}

fn plan_subject(condition: &FilterCondition, value: &serde_json::Value) -> Option<Predicate> {
    let Some(needle) = value.as_str() else {
        skip(condition, "subject value is not a string");
        return None;
    };
    let (kind, negated) = match condition.operator {
        FilterOperator::Eq => (LikeKind::Exact, false),
        FilterOperator::NotEq => (LikeKind::Exact, true),
        FilterOperator::Contains => (LikeKind::Contains, false),
        FilterOperator::NotContains => (LikeKind::Contains, true),
        FilterOperator::StartsWith => (LikeKind::StartsWith, false),
        FilterOperator::EndsWith => (LikeKind::EndsWith, false),
        _ => {
            skip(condition, "operator not usable for subject");
            return None;
        }
    };
    Some(Predicate::Subject {
        kind,
        needle: needle.to_owned(),
        negated,
    })
}

fn plan_field(condition: &FilterCondition, value: serde_json::Value) -> Option<Predicate> {
    if condition.operator == FilterOperator::NotNull {
        return Some(Predicate::FieldNotNull {
            key: condition.key.clone(),
        });
    }
    match CompareOp::from_operator(condition.operator) {
        Some(op) => Some(Predicate::Field {
            key: condition.key.clone(),
            op,
            value,
        }),
        None => {
            skip(condition, "operator not usable for this field");
            None
        }
    }
}

fn skip(condition: &FilterCondition, reason: &str) {
    tracing::error!(key = %condition.key, reason, "skipping filter condition");
}
