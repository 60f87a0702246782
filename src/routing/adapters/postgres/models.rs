//! Diesel row models for conversation routing persistence.

use super::schema::conversations;
use crate::routing::domain::{
    AgentId, ContactId, Conversation, ConversationId, ConversationPatch, GroupId,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for conversation records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = conversations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ConversationRow {
    /// Conversation identifier.
    pub id: uuid::Uuid,
    /// Conversation medium.
    pub kind: String,
    /// Originating channel.
    pub channel: String,
    /// Subject line.
    pub subject: String,
    /// Workflow status identifier.
    pub status_id: i32,
    /// Denormalized open/closed classification.
    pub status_category: String,
    /// Assignment state.
    pub assigned_to: String,
    /// Assigned agent, if any.
    pub assignee_id: Option<uuid::Uuid>,
    /// Routing group, if any.
    pub group_id: Option<uuid::Uuid>,
    /// Requesting contact.
    pub contact_id: uuid::Uuid,
    /// Processing mode.
    pub mode: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Close timestamp, if closed.
    pub closed_at: Option<DateTime<Utc>>,
    /// Last assignment-change timestamp, if any.
    pub assigned_at: Option<DateTime<Utc>>,
}

impl ConversationRow {
    /// Converts the row into a domain conversation with empty relation
    /// fields; the repository hydrates those separately.
    pub fn into_conversation(self) -> Result<Conversation, crate::routing::domain::ParseDomainValueError> {
        Ok(Conversation {
            id: ConversationId::from_uuid(self.id),
            kind: self.kind.as_str().try_into()?,
            channel: self.channel,
            subject: self.subject,
            status_id: self.status_id,
            status_category: self.status_category.as_str().try_into()?,
            assigned_to: self.assigned_to.as_str().try_into()?,
            assignee_id: self.assignee_id.map(AgentId::from_uuid),
            group_id: self.group_id.map(GroupId::from_uuid),
            contact_id: ContactId::from_uuid(self.contact_id),
            mode: self.mode.as_str().try_into()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
            closed_at: self.closed_at,
            assigned_at: self.assigned_at,
            tag_ids: Vec::new(),
            custom_attributes: Vec::new(),
            contact_country: None,
        })
    }
}

/// Changeset for bulk assignment updates.
///
/// Outer `None` leaves a column untouched; `Some(None)` writes NULL.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = conversations)]
pub struct ConversationChangeset {
    /// New assignment state, if changed.
    pub assigned_to: Option<String>,
    /// New assignee, if changed.
    pub assignee_id: Option<Option<uuid::Uuid>>,
    /// New group, if changed.
    pub group_id: Option<Option<uuid::Uuid>>,
    /// New assignment timestamp, if changed.
    pub assigned_at: Option<Option<DateTime<Utc>>>,
}

impl From<&ConversationPatch> for ConversationChangeset {
    fn from(patch: &ConversationPatch) -> Self {
        Self {
            assigned_to: patch.assigned_to.map(|state| state.as_str().to_owned()),
            assignee_id: patch
                .assignee_id
                .map(|assignee| assignee.map(AgentId::into_inner)),
            group_id: patch.group_id.map(|group| group.map(GroupId::into_inner)),
            assigned_at: patch.assigned_at,
        }
    }
}
