//! Conversation aggregate and the partial-update patch consumed by bulk
//! repository writes.

use super::{AgentId, ContactId, ConversationId, GroupId, ParseDomainValueError, TagId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conversation medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationKind {
    /// Asynchronous support ticket.
    Ticket,
    /// Live chat session.
    Chat,
}

impl ConversationKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ticket => "ticket",
            Self::Chat => "chat",
        }
    }
}

impl TryFrom<&str> for ConversationKind {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ticket" => Ok(Self::Ticket),
            "chat" => Ok(Self::Chat),
            _ => Err(ParseDomainValueError::new("kind", value)),
        }
    }
}

/// Denormalized open/closed classification used by inbox filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    /// Conversation is open and routable.
    Open,
    /// Conversation has been resolved or archived.
    Closed,
}

impl StatusCategory {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl TryFrom<&str> for StatusCategory {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(ParseDomainValueError::new("status_category", value)),
        }
    }
}

/// Assignment state of a conversation.
///
/// The queued state (`AgentQueue`) marks a conversation as assignable to a
/// human agent while no specific assignee has been chosen yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignedTo {
    /// Not yet routed anywhere.
    Unassigned,
    /// Waiting on a group's agent queue.
    AgentQueue,
    /// Assigned to a specific agent.
    Agent,
}

impl AssignedTo {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unassigned => "unassigned",
            Self::AgentQueue => "agent_queue",
            Self::Agent => "agent",
        }
    }
}

impl TryFrom<&str> for AssignedTo {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unassigned" => Ok(Self::Unassigned),
            "agent_queue" => Ok(Self::AgentQueue),
            "agent" => Ok(Self::Agent),
            _ => Err(ParseDomainValueError::new("assigned_to", value)),
        }
    }
}

/// Processing mode of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationMode {
    /// Regular customer conversation, eligible for routing.
    Normal,
    /// Anything outside the normal routing flow (drafts, spam holds).
    Other,
}

impl ConversationMode {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for ConversationMode {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "other" => Ok(Self::Other),
            _ => Err(ParseDomainValueError::new("mode", value)),
        }
    }
}

/// A custom attribute value attached to a conversation, keyed by the
/// stripped attribute key (no `ca_` prefix).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomAttributeValue {
    /// Stripped attribute key.
    pub key: String,
    /// Attribute value as stored.
    pub value: serde_json::Value,
}

impl CustomAttributeValue {
    /// Creates an attribute value.
    #[must_use]
    pub fn new(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Conversation record.
///
/// The relation fields (`tag_ids`, `custom_attributes`, `contact_country`)
/// are hydrated by the repository on read so that in-memory evaluation can
/// resolve tag, attribute and country conditions without further lookups.
///
/// Invariant: a non-null `assignee_id` implies the assignee is a member of
/// `group_id` when both are set. The assignment engine repairs violations
/// rather than rejecting them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation identifier.
    pub id: ConversationId,
    /// Ticket or chat.
    pub kind: ConversationKind,
    /// Originating channel (email, web widget, ...).
    pub channel: String,
    /// Subject line.
    pub subject: String,
    /// Workflow status identifier.
    pub status_id: i32,
    /// Denormalized open/closed classification.
    pub status_category: StatusCategory,
    /// Assignment state.
    pub assigned_to: AssignedTo,
    /// Assigned agent, if any.
    pub assignee_id: Option<AgentId>,
    /// Routing group, if any.
    pub group_id: Option<GroupId>,
    /// Requesting customer contact.
    pub contact_id: ContactId,
    /// Processing mode.
    pub mode: ConversationMode,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Close timestamp, if closed.
    pub closed_at: Option<DateTime<Utc>>,
    /// Timestamp of the last assignment change, if any.
    pub assigned_at: Option<DateTime<Utc>>,
    /// Hydrated tag attachments.
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
    /// Hydrated custom attribute values.
    #[serde(default)]
    pub custom_attributes: Vec<CustomAttributeValue>,
    /// Hydrated contact country, if known.
    #[serde(default)]
    pub contact_country: Option<String>,
}

impl Conversation {
    /// Returns true for ticket conversations.
    #[must_use]
    pub fn is_ticket(&self) -> bool {
        self.kind == ConversationKind::Ticket
    }

    /// Returns true when the conversation sits in a group's agent queue.
    #[must_use]
    pub fn is_queued(&self) -> bool {
        self.assigned_to == AssignedTo::AgentQueue && self.assignee_id.is_none()
    }

    /// Returns true when a specific agent is assigned.
    #[must_use]
    pub fn has_assignee(&self) -> bool {
        self.assignee_id.is_some()
    }

    /// Applies a patch in place, mirroring what a bulk repository update
    /// would persist.
    pub fn apply(&mut self, patch: &ConversationPatch) {
        if let Some(assigned_to) = patch.assigned_to {
            self.assigned_to = assigned_to;
        }
        if let Some(assignee_id) = patch.assignee_id {
            self.assignee_id = assignee_id;
        }
        if let Some(group_id) = patch.group_id {
            self.group_id = group_id;
        }
        if let Some(assigned_at) = patch.assigned_at {
            self.assigned_at = assigned_at;
        }
    }
}

/// Partial update over the assignment fields of a conversation.
///
/// Outer `None` leaves a column untouched; `Some(None)` writes NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationPatch {
    /// New assignment state, if changed.
    pub assigned_to: Option<AssignedTo>,
    /// New assignee, if changed.
    pub assignee_id: Option<Option<AgentId>>,
    /// New group, if changed.
    pub group_id: Option<Option<GroupId>>,
    /// New assignment timestamp, if changed.
    pub assigned_at: Option<Option<DateTime<Utc>>>,
}

impl ConversationPatch {
    /// Returns true when the patch would not touch any column.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.assigned_to.is_none()
            && self.assignee_id.is_none()
            && self.group_id.is_none()
            && self.assigned_at.is_none()
    }

    /// Clears the assignee while recording when the unassignment happened.
    #[must_use]
    pub const fn unassign_agent(now: DateTime<Utc>) -> Self {
        Self {
            assigned_to: None,
            assignee_id: Some(None),
            group_id: None,
            assigned_at: Some(Some(now)),
        }
    }

    /// Moves the conversation onto the given group.
    #[must_use]
    pub const fn set_group(group_id: GroupId) -> Self {
        Self {
            assigned_to: None,
            assignee_id: None,
            group_id: Some(Some(group_id)),
            assigned_at: None,
        }
    }

    /// Clears the group membership.
    #[must_use]
    pub const fn clear_group() -> Self {
        Self {
            assigned_to: None,
            assignee_id: None,
            group_id: Some(None),
            assigned_at: None,
        }
    }

    /// Assigns the conversation to a specific agent.
    #[must_use]
    pub const fn assign_agent(agent_id: AgentId, now: DateTime<Utc>) -> Self {
        Self {
            assigned_to: Some(AssignedTo::Agent),
            assignee_id: Some(Some(agent_id)),
            group_id: None,
            assigned_at: Some(Some(now)),
        }
    }

    /// Parks the conversation on the given group's agent queue.
    #[must_use]
    pub const fn queue_on(group_id: GroupId) -> Self {
        Self {
            assigned_to: Some(AssignedTo::AgentQueue),
            assignee_id: Some(None),
            group_id: Some(Some(group_id)),
            assigned_at: Some(None),
        }
    }
}
