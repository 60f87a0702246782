//! Support agent record as seen by the routing engine.

use super::{AgentId, GroupId};
use serde::{Deserialize, Serialize};

/// A support agent eligible (or not) to receive conversations.
///
/// `active_assigned_count` exists for candidate listing only; routing picks
/// the first eligible candidate and performs no least-loaded selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Agent identifier.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Whether the agent was active recently enough to take chats.
    pub recently_active: bool,
    /// Whether the agent currently accepts new conversations.
    pub accepts_conversations: bool,
    /// Groups the agent belongs to.
    pub group_ids: Vec<GroupId>,
    /// Number of open conversations currently assigned to the agent.
    pub active_assigned_count: usize,
}

impl Agent {
    /// Creates an active, accepting agent with no memberships.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: AgentId::new(),
            name: name.into(),
            recently_active: true,
            accepts_conversations: true,
            group_ids: Vec::new(),
            active_assigned_count: 0,
        }
    }

    /// Adds a group membership.
    #[must_use]
    pub fn in_group(mut self, group_id: GroupId) -> Self {
        self.group_ids.push(group_id);
        self
    }

    /// Sets the recent-activity flag.
    #[must_use]
    pub const fn with_recent_activity(mut self, recently_active: bool) -> Self {
        self.recently_active = recently_active;
        self
    }

    /// Sets the acceptance flag.
    #[must_use]
    pub const fn accepting(mut self, accepts: bool) -> Self {
        self.accepts_conversations = accepts;
        self
    }

    /// Returns true when the agent belongs to the given group.
    #[must_use]
    pub fn is_member_of(&self, group_id: GroupId) -> bool {
        self.group_ids.contains(&group_id)
    }
}
