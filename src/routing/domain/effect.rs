//! Outbox effects produced by routing operations.
//!
//! The assignment engine never fires notifications inline. Every mutating
//! operation returns the affected conversations together with the list of
//! effects a dispatcher should apply, keeping the engine pure and
//! unit-testable without mocking an event bus.

use super::{AgentId, Conversation, ConversationId, GroupId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a history entry records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryKind {
    /// The conversation moved to a different group.
    GroupChanged {
        /// Previous group, if any.
        from: Option<GroupId>,
        /// New group.
        to: GroupId,
    },
    /// The conversation was assigned to a different agent.
    AgentChanged {
        /// Previous assignee, if any.
        from: Option<AgentId>,
        /// New assignee.
        to: AgentId,
    },
    /// The conversation was parked on a group's agent queue.
    MovedToQueue {
        /// Queue group.
        group_id: GroupId,
    },
}

/// An activity-stream entry synthesized for a single conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Conversation the entry belongs to.
    pub conversation_id: ConversationId,
    /// What happened.
    pub kind: HistoryKind,
    /// When the entry was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Effect to be applied by the surrounding application after a routing
/// operation completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Effect {
    /// Batched "conversations updated" notification. `before` carries the
    /// pre-update snapshot for observers that diff; `after` the post-update
    /// set.
    ConversationsUpdated {
        /// Records as they were before the mutation.
        before: Vec<Conversation>,
        /// Records as re-read after the mutation.
        after: Vec<Conversation>,
    },
    /// Conversations were assigned to an agent. Fires on every
    /// `assign_to_agent` call, even when nothing changed; client
    /// notifications rely on it.
    AssignedToAgent {
        /// The receiving agent.
        agent_id: AgentId,
        /// Full result set, including unchanged records.
        conversations: Vec<Conversation>,
    },
    /// A per-conversation activity entry.
    History(HistoryEntry),
}

/// Result of a routing mutation: the affected records plus the effects to
/// dispatch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentOutcome {
    /// The affected (post-update) conversation set. Never echoes unaffected
    /// input records.
    pub conversations: Vec<Conversation>,
    /// Effects in emission order.
    pub effects: Vec<Effect>,
}

impl AssignmentOutcome {
    /// Returns the history entries among the effects.
    #[must_use]
    pub fn history_entries(&self) -> Vec<&HistoryEntry> {
        self.effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::History(entry) => Some(entry),
                _ => None,
            })
            .collect()
    }
}
