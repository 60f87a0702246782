//! Saved inbox views and dynamic group-view synthesis.

use super::condition::{FilterCondition, FilterOperator};
use crate::routing::domain::{AgentId, GroupId, ViewId};
use serde::{Deserialize, Serialize};

/// Stable key of the built-in "all conversations" view. Its count is never
/// computed.
pub const ALL_VIEW_KEY: &str = "all";
/// Stable key of the built-in "closed" view. Its count is never computed.
pub const CLOSED_VIEW_KEY: &str = "closed";
/// Stable key of the native template that group views are cloned from.
pub const GROUPS_VIEW_KEY: &str = "groups";

/// Who can see a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewAccess {
    /// Visible to every agent.
    Anyone,
    /// Visible to the owner's group.
    Group,
    /// Visible to the owner only.
    Owner,
}

/// A saved, named filter definition partitioning the inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationView {
    /// View identifier.
    pub id: ViewId,
    /// Stable slug for built-in views (`"all"`, `"closed"`, `"groups"`).
    #[serde(default)]
    pub key: Option<String>,
    /// Display name.
    pub name: String,
    /// Ordered filter conditions.
    #[serde(default)]
    pub conditions: Vec<FilterCondition>,
    /// Sort column, if any.
    #[serde(default)]
    pub order_by: Option<String>,
    /// Sort direction, if any.
    #[serde(default)]
    pub order_dir: Option<String>,
    /// Visible columns.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Visibility.
    pub access: ViewAccess,
    /// Owning agent for `group`/`owner` access.
    #[serde(default)]
    pub owner_id: Option<AgentId>,
    /// Display order.
    #[serde(default)]
    pub order: i32,
    /// Whether the view is pinned.
    #[serde(default)]
    pub pinned: bool,
}

impl ConversationView {
    /// Creates a minimal unkeyed view visible to anyone.
    #[must_use]
    pub fn new(name: impl Into<String>, conditions: Vec<FilterCondition>) -> Self {
        Self {
            id: ViewId::new(),
            key: None,
            name: name.into(),
            conditions,
            order_by: None,
            order_dir: None,
            columns: Vec::new(),
            access: ViewAccess::Anyone,
            owner_id: None,
            order: 0,
            pinned: false,
        }
    }

    /// Sets the stable key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Returns true for views whose counts are never computed.
    #[must_use]
    pub fn is_count_exempt(&self) -> bool {
        self.key
            .as_deref()
            .is_some_and(|key| key == ALL_VIEW_KEY || key == CLOSED_VIEW_KEY)
    }
}

/// Synthesizes one view per group from the native `groups` template.
///
/// Each synthesized view clones the template and prepends a
/// `group_id = <group>` condition ahead of the template's own conditions.
/// Group views are never stored as discrete rows; they exist only for the
/// duration of a counting or listing call.
#[must_use]
pub fn synthesize_group_views(
    template: &ConversationView,
    group_ids: &[GroupId],
) -> Vec<ConversationView> {
    group_ids
        .iter()
        .map(|group_id| {
            let mut view = template.clone();
            view.id = ViewId::new();
            view.key = Some(format!("group-{group_id}"));
            view.conditions.insert(
                0,
                FilterCondition::new(
                    "group_id",
                    FilterOperator::Eq,
                    serde_json::Value::String(group_id.to_string()),
                ),
            );
            view
        })
        .collect()
}
