//! Repository ports for conversation persistence and content cascades.

use crate::inbox::plan::QueryPlan;
use crate::routing::domain::{
    Conversation, ConversationId, ConversationPatch, CustomAttributeValue, MessageId, TagId,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for conversation repository operations.
pub type ConversationRepositoryResult<T> = Result<T, ConversationRepositoryError>;

/// Conversation persistence contract.
///
/// All mutations are last-write-wins bulk updates scoped by identifier
/// list; there is no optimistic locking or versioning. Concurrent callers
/// racing on overlapping identifier sets interleave freely.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Loads conversations by identifier, relations hydrated, in the order
    /// of the given identifiers. Missing identifiers are skipped.
    async fn find_by_ids(
        &self,
        ids: &[ConversationId],
    ) -> ConversationRepositoryResult<Vec<Conversation>>;

    /// Applies a partial update to every listed conversation.
    ///
    /// Returns the number of rows touched. An empty identifier list or an
    /// empty patch is a no-op returning zero.
    async fn update_many(
        &self,
        ids: &[ConversationId],
        patch: &ConversationPatch,
    ) -> ConversationRepositoryResult<usize>;

    /// Loads up to `limit` open, routable conversations with no assignee,
    /// oldest first, so the distribution sweep drains deterministically.
    async fn list_unassigned_open(
        &self,
        limit: usize,
    ) -> ConversationRepositoryResult<Vec<Conversation>>;

    /// Loads up to `limit` open, routable conversations with relations
    /// hydrated, most recently created first: the bounded window view
    /// counting runs over.
    async fn list_open_window(
        &self,
        limit: usize,
    ) -> ConversationRepositoryResult<Vec<Conversation>>;

    /// Executes a composed filter plan and returns the matching
    /// conversations in the store's default order.
    async fn query(&self, plan: &QueryPlan) -> ConversationRepositoryResult<Vec<Conversation>>;
}

/// Errors returned by conversation repository implementations.
#[derive(Debug, Clone, Error)]
pub enum ConversationRepositoryError {
    /// The conversation was not found.
    #[error("conversation not found: {0}")]
    NotFound(ConversationId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ConversationRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

/// Result type for conversation content operations.
pub type ContentRepositoryResult<T> = Result<T, ContentRepositoryError>;

/// Contract over the child rows of a conversation: messages, attachment
/// links, tag and custom-attribute attachments, and the optional auxiliary
/// tables.
///
/// Merge and delete cascades are issued step by step through this port;
/// no single transaction spans the steps.
#[async_trait]
pub trait ConversationContentRepository: Send + Sync {
    /// Returns the message identifiers belonging to the given
    /// conversations.
    async fn message_ids(
        &self,
        ids: &[ConversationId],
    ) -> ContentRepositoryResult<Vec<MessageId>>;

    /// Moves all messages of the given conversations onto the target.
    /// Message timestamps are left untouched.
    async fn reassign_messages(
        &self,
        from: &[ConversationId],
        to: ConversationId,
    ) -> ContentRepositoryResult<usize>;

    /// Deletes attachment links for the given messages.
    async fn delete_attachment_links(
        &self,
        message_ids: &[MessageId],
    ) -> ContentRepositoryResult<usize>;

    /// Deletes all tag attachment rows of the given conversations.
    async fn detach_tags(&self, ids: &[ConversationId]) -> ContentRepositoryResult<usize>;

    /// Deletes all custom-attribute attachment rows of the given
    /// conversations.
    async fn detach_custom_attributes(
        &self,
        ids: &[ConversationId],
    ) -> ContentRepositoryResult<usize>;

    /// Deletes AI-session rows where the deployment has that table;
    /// otherwise a no-op returning zero.
    async fn delete_ai_sessions(&self, ids: &[ConversationId]) -> ContentRepositoryResult<usize>;

    /// Deletes the messages of the given conversations.
    async fn delete_messages(&self, ids: &[ConversationId]) -> ContentRepositoryResult<usize>;

    /// Deletes summary rows where the deployment has that table; otherwise
    /// a no-op returning zero.
    async fn delete_summaries(&self, ids: &[ConversationId]) -> ContentRepositoryResult<usize>;

    /// Deletes the conversation records themselves.
    async fn delete_conversations(&self, ids: &[ConversationId]) -> ContentRepositoryResult<usize>;

    /// Returns the tag attachments of a conversation in row order.
    async fn tags_of(&self, id: ConversationId) -> ContentRepositoryResult<Vec<TagId>>;

    /// Returns the custom attribute values of a conversation in row order.
    async fn custom_attributes_of(
        &self,
        id: ConversationId,
    ) -> ContentRepositoryResult<Vec<CustomAttributeValue>>;

    /// Replaces a conversation's tag attachments with the given set.
    async fn sync_tags(
        &self,
        id: ConversationId,
        tags: &[TagId],
    ) -> ContentRepositoryResult<()>;

    /// Replaces a conversation's custom attribute values with the given
    /// set.
    async fn sync_custom_attributes(
        &self,
        id: ConversationId,
        attributes: &[CustomAttributeValue],
    ) -> ContentRepositoryResult<()>;
}

/// Errors returned by conversation content implementations.
#[derive(Debug, Clone, Error)]
pub enum ContentRepositoryError {
    /// The conversation was not found.
    #[error("conversation not found: {0}")]
    NotFound(ConversationId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ContentRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
