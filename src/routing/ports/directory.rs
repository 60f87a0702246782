//! Group and agent membership lookups.

use crate::routing::domain::{Agent, AgentId, Group, GroupId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Read-mostly lookup of groups, agents and their memberships.
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    /// Finds a group by identifier.
    async fn group(&self, id: GroupId) -> DirectoryResult<Option<Group>>;

    /// Returns the system default group, if one is configured.
    async fn default_group(&self) -> DirectoryResult<Option<Group>>;

    /// Returns the identifiers of all agents belonging to the group.
    async fn agents_in_group(&self, id: GroupId) -> DirectoryResult<Vec<AgentId>>;

    /// Returns the identifiers of all groups the agent belongs to.
    async fn groups_of_agent(&self, id: AgentId) -> DirectoryResult<Vec<GroupId>>;

    /// Loads all agents except the excluded ones, with membership,
    /// recent-activity and acceptance state, in the store's default order.
    async fn available_agents(&self, excluded: &[AgentId]) -> DirectoryResult<Vec<Agent>>;
}

/// Errors returned by directory implementations.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// The group was not found.
    #[error("group not found: {0}")]
    GroupNotFound(GroupId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl DirectoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
