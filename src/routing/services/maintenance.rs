//! Bulk conversation mutators: cascading delete and merge.

use crate::routing::domain::{Conversation, ConversationId, CustomAttributeValue, TagId};
use crate::routing::ports::{
    ContentRepositoryError, ConversationContentRepository, ConversationRepository,
    ConversationRepositoryError,
};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Result type for maintenance operations.
pub type MaintenanceResult<T> = Result<T, MaintenanceError>;

/// Errors returned by the bulk mutators.
#[derive(Debug, Clone, Error)]
pub enum MaintenanceError {
    /// The merge target does not exist.
    #[error("merge target not found: {0}")]
    MergeTargetNotFound(ConversationId),

    /// Conversation store failure.
    #[error(transparent)]
    Repository(#[from] ConversationRepositoryError),

    /// Content store failure.
    #[error(transparent)]
    Content(#[from] ContentRepositoryError),
}

/// Merge and delete operations that keep tags, attributes and messages
/// consistent across conversations.
#[derive(Clone)]
pub struct ConversationMaintenance<R, C>
where
    R: ConversationRepository,
    C: ConversationContentRepository,
{
    conversations: Arc<R>,
    content: Arc<C>,
}

impl<R, C> ConversationMaintenance<R, C>
where
    R: ConversationRepository,
    C: ConversationContentRepository,
{
    /// Creates a maintenance service over the given stores.
    pub const fn new(conversations: Arc<R>, content: Arc<C>) -> Self {
        Self {
            conversations,
            content,
        }
    }

    /// Deletes conversations and all their child rows.
    ///
    /// Cascade order, children before parents: attachment links (matched
    /// by the conversations' message identifiers), tag attachments,
    /// custom-attribute attachments, optional AI-session rows, messages,
    /// optional summary rows, then the conversations themselves. Each step
    /// is an independent bulk delete; no single transaction spans them, so
    /// a crash mid-cascade leaves a partial deletion (known gap).
    ///
    /// # Errors
    ///
    /// Propagates the first content-store failure; earlier steps stand.
    pub async fn delete_many(&self, ids: &[ConversationId]) -> MaintenanceResult<()> {
        let message_ids = self.content.message_ids(ids).await?;
        self.content.delete_attachment_links(&message_ids).await?;
        self.content.detach_tags(ids).await?;
        self.content.detach_custom_attributes(ids).await?;
        self.content.delete_ai_sessions(ids).await?;
        self.content.delete_messages(ids).await?;
        self.content.delete_summaries(ids).await?;
        self.content.delete_conversations(ids).await?;
        Ok(())
    }

    /// Merges conversations into a target.
    ///
    /// Messages move onto the target with their original timestamps
    /// untouched. Tags and custom attributes are unioned with the
    /// target's existing set (deduplicated by tag id / attribute key) and
    /// re-synced; the merged conversations' own attachment rows are
    /// deleted first so the sync cannot hit duplicate keys. The merged
    /// conversations are then removed via [`Self::delete_many`].
    ///
    /// # Errors
    ///
    /// Returns [`MaintenanceError::MergeTargetNotFound`] when the target
    /// does not exist; store failures propagate.
    pub async fn merge(
        &self,
        target_id: ConversationId,
        merge_ids: &[ConversationId],
    ) -> MaintenanceResult<Conversation> {
        let targets = self.conversations.find_by_ids(&[target_id]).await?;
        if targets.is_empty() {
            return Err(MaintenanceError::MergeTargetNotFound(target_id));
        }

        self.content.reassign_messages(merge_ids, target_id).await?;

        let mut tags = self.content.tags_of(target_id).await?;
        let mut attributes = self.content.custom_attributes_of(target_id).await?;
        for merge_id in merge_ids {
            tags.extend(self.content.tags_of(*merge_id).await?);
            attributes.extend(self.content.custom_attributes_of(*merge_id).await?);
        }
        let merged_tags = dedup_tags(tags);
        let merged_attributes = dedup_attributes(attributes);

        self.content.detach_tags(merge_ids).await?;
        self.content.detach_custom_attributes(merge_ids).await?;
        self.content.sync_tags(target_id, &merged_tags).await?;
        self.content
            .sync_custom_attributes(target_id, &merged_attributes)
            .await?;

        self.delete_many(merge_ids).await?;

        self.conversations
            .find_by_ids(&[target_id])
            .await?
            .into_iter()
            .next()
            .ok_or(MaintenanceError::MergeTargetNotFound(target_id))
    }
}

fn dedup_tags(tags: Vec<TagId>) -> Vec<TagId> {
    let mut seen = HashSet::new();
    tags.into_iter().filter(|tag| seen.insert(*tag)).collect()
}

fn dedup_attributes(attributes: Vec<CustomAttributeValue>) -> Vec<CustomAttributeValue> {
    let mut seen = HashSet::new();
    attributes
        .into_iter()
        .filter(|attribute| seen.insert(attribute.key.clone()))
        .collect()
}
