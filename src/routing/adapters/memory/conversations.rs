//! In-memory conversation store used by tests and single-process
//! deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::inbox::plan::QueryPlan;
use crate::routing::domain::{
    AssignedTo, AttachmentId, ContactId, Conversation, ConversationId, ConversationMode,
    ConversationPatch, CustomAttributeValue, MessageId, StatusCategory, TagId,
};
use crate::routing::ports::{
    ContentRepositoryError, ContentRepositoryResult, ConversationContentRepository,
    ConversationRepository, ConversationRepositoryError, ConversationRepositoryResult,
};

/// A message row: enough structure for reassignment and cascade tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    /// Message identifier.
    pub id: MessageId,
    /// Owning conversation.
    pub conversation_id: ConversationId,
}

#[derive(Debug, Default)]
struct State {
    conversations: HashMap<ConversationId, Conversation>,
    order: Vec<ConversationId>,
    tag_rows: Vec<(ConversationId, TagId)>,
    attribute_rows: Vec<(ConversationId, CustomAttributeValue)>,
    messages: Vec<MessageRecord>,
    attachment_links: Vec<(AttachmentId, MessageId)>,
    contacts: HashMap<ContactId, Option<String>>,
    // None models a deployment without the optional table.
    ai_sessions: Option<Vec<ConversationId>>,
    summaries: Option<Vec<ConversationId>>,
}

/// Thread-safe in-memory conversation store.
///
/// Tag and custom-attribute attachments are held as join rows so that
/// duplicate-row behavior is observable the same way it is in SQL.
/// Default listing order is insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConversationStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryConversationStore {
    /// Creates an empty store with both optional tables present.
    #[must_use]
    pub fn new() -> Self {
        let store = Self::default();
        if let Ok(mut state) = store.state.write() {
            state.ai_sessions = Some(Vec::new());
            state.summaries = Some(Vec::new());
        }
        store
    }

    /// Creates a store whose deployment lacks the AI-session and summary
    /// tables.
    #[must_use]
    pub fn without_optional_tables() -> Self {
        Self::default()
    }

    /// Inserts a conversation, seeding join rows from its hydrated
    /// relation fields.
    pub fn insert_conversation(&self, conversation: Conversation) {
        let Ok(mut state) = self.state.write() else {
            return;
        };
        for tag in &conversation.tag_ids {
            state.tag_rows.push((conversation.id, *tag));
        }
        for attribute in &conversation.custom_attributes {
            state
                .attribute_rows
                .push((conversation.id, attribute.clone()));
        }
        state
            .contacts
            .entry(conversation.contact_id)
            .or_insert_with(|| conversation.contact_country.clone());
        state.order.push(conversation.id);
        state.conversations.insert(conversation.id, conversation);
    }

    /// Inserts a message row.
    pub fn insert_message(&self, message: MessageRecord) {
        if let Ok(mut state) = self.state.write() {
            state.messages.push(message);
        }
    }

    /// Links an attachment to a message.
    pub fn insert_attachment_link(&self, attachment_id: AttachmentId, message_id: MessageId) {
        if let Ok(mut state) = self.state.write() {
            state.attachment_links.push((attachment_id, message_id));
        }
    }

    /// Records a contact's country.
    pub fn set_contact_country(&self, contact_id: ContactId, country: Option<String>) {
        if let Ok(mut state) = self.state.write() {
            state.contacts.insert(contact_id, country);
        }
    }

    /// Marks a conversation as having an AI session, when the table
    /// exists.
    pub fn insert_ai_session(&self, id: ConversationId) {
        if let Ok(mut state) = self.state.write()
            && let Some(rows) = state.ai_sessions.as_mut()
        {
            rows.push(id);
        }
    }

    /// Marks a conversation as having a summary row, when the table
    /// exists.
    pub fn insert_summary(&self, id: ConversationId) {
        if let Ok(mut state) = self.state.write()
            && let Some(rows) = state.summaries.as_mut()
        {
            rows.push(id);
        }
    }

    /// Returns all tag join rows, for attachment-level assertions.
    #[must_use]
    pub fn tag_rows(&self) -> Vec<(ConversationId, TagId)> {
        self.state
            .read()
            .map(|state| state.tag_rows.clone())
            .unwrap_or_default()
    }

    /// Returns all message rows.
    #[must_use]
    pub fn message_rows(&self) -> Vec<MessageRecord> {
        self.state
            .read()
            .map(|state| state.messages.clone())
            .unwrap_or_default()
    }

    /// Returns all attachment link rows.
    #[must_use]
    pub fn attachment_link_rows(&self) -> Vec<(AttachmentId, MessageId)> {
        self.state
            .read()
            .map(|state| state.attachment_links.clone())
            .unwrap_or_default()
    }

    /// Returns the number of stored conversations.
    #[must_use]
    pub fn conversation_count(&self) -> usize {
        self.state
            .read()
            .map(|state| state.conversations.len())
            .unwrap_or_default()
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, State>, ConversationRepositoryError> {
        self.state.read().map_err(|err| {
            ConversationRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, State>, ConversationRepositoryError> {
        self.state.write().map_err(|err| {
            ConversationRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn read_content(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, State>, ContentRepositoryError> {
        self.state.read().map_err(|err| {
            ContentRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write_content(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, State>, ContentRepositoryError> {
        self.state.write().map_err(|err| {
            ContentRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

fn hydrate(state: &State, conversation: &Conversation) -> Conversation {
    let mut hydrated = conversation.clone();
    hydrated.tag_ids = state
        .tag_rows
        .iter()
        .filter(|(owner, _)| *owner == conversation.id)
        .map(|(_, tag)| *tag)
        .collect();
    hydrated.custom_attributes = state
        .attribute_rows
        .iter()
        .filter(|(owner, _)| *owner == conversation.id)
        .map(|(_, attribute)| attribute.clone())
        .collect();
    hydrated.contact_country = state
        .contacts
        .get(&conversation.contact_id)
        .cloned()
        .flatten();
    hydrated
}

fn is_routable(conversation: &Conversation) -> bool {
    conversation.status_category == StatusCategory::Open
        && conversation.mode == ConversationMode::Normal
}

#[async_trait]
impl ConversationRepository for InMemoryConversationStore {
    async fn find_by_ids(
        &self,
        ids: &[ConversationId],
    ) -> ConversationRepositoryResult<Vec<Conversation>> {
        let state = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.conversations.get(id))
            .map(|conversation| hydrate(&state, conversation))
            .collect())
    }

    async fn update_many(
        &self,
        ids: &[ConversationId],
        patch: &ConversationPatch,
    ) -> ConversationRepositoryResult<usize> {
        if ids.is_empty() || patch.is_empty() {
            return Ok(0);
        }
        let mut state = self.write()?;
        let mut touched = 0;
        for id in ids {
            if let Some(conversation) = state.conversations.get_mut(id) {
                conversation.apply(patch);
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn list_unassigned_open(
        &self,
        limit: usize,
    ) -> ConversationRepositoryResult<Vec<Conversation>> {
        let state = self.read()?;
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.conversations.get(id))
            .filter(|conversation| {
                is_routable(conversation)
                    && conversation.assignee_id.is_none()
                    && conversation.assigned_to != AssignedTo::Agent
            })
            .take(limit)
            .map(|conversation| hydrate(&state, conversation))
            .collect())
    }

    async fn list_open_window(
        &self,
        limit: usize,
    ) -> ConversationRepositoryResult<Vec<Conversation>> {
        let state = self.read()?;
        Ok(state
            .order
            .iter()
            .rev()
            .filter_map(|id| state.conversations.get(id))
            .filter(|conversation| is_routable(conversation))
            .take(limit)
            .map(|conversation| hydrate(&state, conversation))
            .collect())
    }

    async fn query(&self, plan: &QueryPlan) -> ConversationRepositoryResult<Vec<Conversation>> {
        let state = self.read()?;
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.conversations.get(id))
            .map(|conversation| hydrate(&state, conversation))
            .filter(|conversation| plan.matches(conversation))
            .collect())
    }
}

#[async_trait]
impl ConversationContentRepository for InMemoryConversationStore {
    async fn message_ids(
        &self,
        ids: &[ConversationId],
    ) -> ContentRepositoryResult<Vec<MessageId>> {
        let state = self.read_content()?;
        Ok(state
            .messages
            .iter()
            .filter(|message| ids.contains(&message.conversation_id))
            .map(|message| message.id)
            .collect())
    }

    async fn reassign_messages(
        &self,
        from: &[ConversationId],
        to: ConversationId,
    ) -> ContentRepositoryResult<usize> {
        let mut state = self.write_content()?;
        let mut moved = 0;
        for message in &mut state.messages {
            if from.contains(&message.conversation_id) {
                message.conversation_id = to;
                moved += 1;
            }
        }
        Ok(moved)
    }

    async fn delete_attachment_links(
        &self,
        message_ids: &[MessageId],
    ) -> ContentRepositoryResult<usize> {
        let mut state = self.write_content()?;
        let before = state.attachment_links.len();
        state
            .attachment_links
            .retain(|(_, message)| !message_ids.contains(message));
        Ok(before - state.attachment_links.len())
    }

    async fn detach_tags(&self, ids: &[ConversationId]) -> ContentRepositoryResult<usize> {
        let mut state = self.write_content()?;
        let before = state.tag_rows.len();
        state.tag_rows.retain(|(owner, _)| !ids.contains(owner));
        Ok(before - state.tag_rows.len())
    }

    async fn detach_custom_attributes(
        &self,
        ids: &[ConversationId],
    ) -> ContentRepositoryResult<usize> {
        let mut state = self.write_content()?;
        let before = state.attribute_rows.len();
        state
            .attribute_rows
            .retain(|(owner, _)| !ids.contains(owner));
        Ok(before - state.attribute_rows.len())
    }

    async fn delete_ai_sessions(&self, ids: &[ConversationId]) -> ContentRepositoryResult<usize> {
        let mut state = self.write_content()?;
        let Some(rows) = state.ai_sessions.as_mut() else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|owner| !ids.contains(owner));
        Ok(before - rows.len())
    }

    async fn delete_messages(&self, ids: &[ConversationId]) -> ContentRepositoryResult<usize> {
        let mut state = self.write_content()?;
        let before = state.messages.len();
        state
            .messages
            .retain(|message| !ids.contains(&message.conversation_id));
        Ok(before - state.messages.len())
    }

    async fn delete_summaries(&self, ids: &[ConversationId]) -> ContentRepositoryResult<usize> {
        let mut state = self.write_content()?;
        let Some(rows) = state.summaries.as_mut() else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|owner| !ids.contains(owner));
        Ok(before - rows.len())
    }

    async fn delete_conversations(&self, ids: &[ConversationId]) -> ContentRepositoryResult<usize> {
        let mut state = self.write_content()?;
        let before = state.conversations.len();
        state.conversations.retain(|id, _| !ids.contains(id));
        state.order.retain(|id| !ids.contains(id));
        Ok(before - state.conversations.len())
    }

    async fn tags_of(&self, id: ConversationId) -> ContentRepositoryResult<Vec<TagId>> {
        let state = self.read_content()?;
        Ok(state
            .tag_rows
            .iter()
            .filter(|(owner, _)| *owner == id)
            .map(|(_, tag)| *tag)
            .collect())
    }

    async fn custom_attributes_of(
        &self,
        id: ConversationId,
    ) -> ContentRepositoryResult<Vec<CustomAttributeValue>> {
        let state = self.read_content()?;
        Ok(state
            .attribute_rows
            .iter()
            .filter(|(owner, _)| *owner == id)
            .map(|(_, attribute)| attribute.clone())
            .collect())
    }

    async fn sync_tags(
        &self,
        id: ConversationId,
        tags: &[TagId],
    ) -> ContentRepositoryResult<()> {
        let mut state = self.write_content()?;
        state.tag_rows.retain(|(owner, _)| *owner != id);
        for tag in tags {
            state.tag_rows.push((id, *tag));
        }
        Ok(())
    }

    async fn sync_custom_attributes(
        &self,
        id: ConversationId,
        attributes: &[CustomAttributeValue],
    ) -> ContentRepositoryResult<()> {
        let mut state = self.write_content()?;
        state.attribute_rows.retain(|(owner, _)| *owner != id);
        for attribute in attributes {
            state.attribute_rows.push((id, attribute.clone()));
        }
        Ok(())
    }
}
