//! Assignment engine: group/agent assignment, first-available routing and
//! the unassigned sweep.
//!
//! Ordering contract: within one call the "unassign ineligible" bulk
//! update is issued before the new assignment update. The two steps are
//! not wrapped in a single transaction; concurrent callers racing on the
//! same conversations interleave last-write-wins. Both are inherited
//! limitations, documented rather than fixed.

use crate::config::RoutingConfig;
use crate::routing::domain::{
    Agent, AgentId, AssignedTo, AssignmentMode, AssignmentOutcome, Conversation, ConversationId,
    ConversationPatch, Effect, Group, GroupId, HistoryEntry, HistoryKind,
};
use crate::routing::ports::{
    ConversationRepository, ConversationRepositoryError, DirectoryError, DirectoryRepository,
};
use mockable::Clock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// Result type for routing operations.
pub type RoutingResult<T> = Result<T, RoutingError>;

/// Errors returned by the assignment engine.
#[derive(Debug, Clone, Error)]
pub enum RoutingError {
    /// No default group is configured and the conversation carries none.
    /// This is a configuration error and always fatal; no fallback group
    /// is invented.
    #[error("no default group configured and conversation {0} has no group")]
    NoDefaultGroup(ConversationId),

    /// The conversation references a group that does not exist.
    #[error("group not found: {0}")]
    GroupNotFound(GroupId),

    /// Conversation store failure.
    #[error(transparent)]
    Repository(#[from] ConversationRepositoryError),

    /// Membership lookup failure.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Conversations handed to a routing operation: either raw identifiers
/// (resolved to records before any branching logic runs) or records the
/// caller already loaded.
#[derive(Debug, Clone)]
pub enum ConversationSelection {
    /// Identifiers to resolve through the repository.
    Ids(Vec<ConversationId>),
    /// Pre-loaded records, taken as the pre-update snapshot.
    Records(Vec<Conversation>),
}

impl From<Vec<ConversationId>> for ConversationSelection {
    fn from(ids: Vec<ConversationId>) -> Self {
        Self::Ids(ids)
    }
}

impl From<Vec<Conversation>> for ConversationSelection {
    fn from(records: Vec<Conversation>) -> Self {
        Self::Records(records)
    }
}

/// Agent/group assignment and routing over a conversation store and a
/// membership directory.
#[derive(Clone)]
pub struct AssignmentEngine<R, D, K>
where
    R: ConversationRepository,
    D: DirectoryRepository,
    K: Clock + Send + Sync,
{
    conversations: Arc<R>,
    directory: Arc<D>,
    clock: Arc<K>,
    config: RoutingConfig,
}

impl<R, D, K> AssignmentEngine<R, D, K>
where
    R: ConversationRepository,
    D: DirectoryRepository,
    K: Clock + Send + Sync,
{
    /// Creates an engine with default window sizes.
    pub fn new(conversations: Arc<R>, directory: Arc<D>, clock: Arc<K>) -> Self {
        Self::with_config(conversations, directory, clock, RoutingConfig::default())
    }

    /// Creates an engine with explicit window sizes.
    pub const fn with_config(
        conversations: Arc<R>,
        directory: Arc<D>,
        clock: Arc<K>,
        config: RoutingConfig,
    ) -> Self {
        Self {
            conversations,
            directory,
            clock,
            config,
        }
    }

    /// Moves conversations onto a group, unassigning agents that are not
    /// members of it.
    ///
    /// Conversations already on the group are excluded from every side
    /// effect and from the returned set. The ineligible-assignee bulk
    /// update runs before the group reassignment. The returned set is the
    /// post-update re-read of the affected rows only.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::Repository`] or [`RoutingError::Directory`]
    /// on store failures.
    pub async fn assign_group(
        &self,
        selection: ConversationSelection,
        group: &Group,
        emit_events: bool,
    ) -> RoutingResult<AssignmentOutcome> {
        let records = self.resolve(selection).await?;
        let to_move: Vec<Conversation> = records
            .into_iter()
            .filter(|conversation| conversation.group_id != Some(group.id))
            .collect();
        if to_move.is_empty() {
            return Ok(AssignmentOutcome::default());
        }

        let members: HashSet<AgentId> = self
            .directory
            .agents_in_group(group.id)
            .await?
            .into_iter()
            .collect();
        let now = self.clock.utc();

        // Unassign ineligible assignees before the group moves.
        let to_unassign: Vec<ConversationId> = to_move
            .iter()
            .filter(|conversation| {
                conversation
                    .assignee_id
                    .is_some_and(|assignee| !members.contains(&assignee))
            })
            .map(|conversation| conversation.id)
            .collect();
        if !to_unassign.is_empty() {
            self.conversations
                .update_many(&to_unassign, &ConversationPatch::unassign_agent(now))
                .await?;
        }

        let move_ids: Vec<ConversationId> =
            to_move.iter().map(|conversation| conversation.id).collect();
        self.conversations
            .update_many(&move_ids, &ConversationPatch::set_group(group.id))
            .await?;

        let updated = self.conversations.find_by_ids(&move_ids).await?;

        let mut effects = Vec::new();
        if emit_events {
            let previous_groups: HashMap<ConversationId, Option<GroupId>> = to_move
                .iter()
                .map(|conversation| (conversation.id, conversation.group_id))
                .collect();
            for conversation in &updated {
                effects.push(Effect::History(HistoryEntry {
                    conversation_id: conversation.id,
                    kind: HistoryKind::GroupChanged {
                        from: previous_groups.get(&conversation.id).copied().flatten(),
                        to: group.id,
                    },
                    recorded_at: now,
                }));
            }
        }
        effects.push(Effect::ConversationsUpdated {
            before: to_move,
            after: updated.clone(),
        });

        Ok(AssignmentOutcome {
            conversations: updated,
            effects,
        })
    }

    /// Assigns conversations to a specific agent, clearing groups the
    /// agent does not belong to.
    ///
    /// The foreign-group clear is issued before the assignment update.
    /// The `AssignedToAgent` effect fires on every call, over the full
    /// normalized input set, even when nothing changed; downstream client
    /// notifications rely on that.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::Repository`] or [`RoutingError::Directory`]
    /// on store failures.
    pub async fn assign_to_agent(
        &self,
        selection: ConversationSelection,
        agent_id: AgentId,
        emit_events: bool,
    ) -> RoutingResult<AssignmentOutcome> {
        let records = self.resolve(selection).await?;
        let (already, to_assign): (Vec<Conversation>, Vec<Conversation>) =
            records.into_iter().partition(|conversation| {
                conversation.assigned_to == AssignedTo::Agent
                    && conversation.assignee_id == Some(agent_id)
            });

        let mut effects = Vec::new();
        let mut updated = Vec::new();
        let now = self.clock.utc();

        if !to_assign.is_empty() {
            let agent_groups: HashSet<GroupId> = self
                .directory
                .groups_of_agent(agent_id)
                .await?
                .into_iter()
                .collect();

            // Clear foreign groups before the assignment lands so no
            // reader observes the agent on a group it does not belong to
            // beyond the update window.
            let to_clear: Vec<ConversationId> = to_assign
                .iter()
                .filter(|conversation| {
                    conversation
                        .group_id
                        .is_some_and(|group| !agent_groups.contains(&group))
                })
                .map(|conversation| conversation.id)
                .collect();
            if !to_clear.is_empty() {
                self.conversations
                    .update_many(&to_clear, &ConversationPatch::clear_group())
                    .await?;
            }

            let assign_ids: Vec<ConversationId> = to_assign
                .iter()
                .map(|conversation| conversation.id)
                .collect();
            self.conversations
                .update_many(&assign_ids, &ConversationPatch::assign_agent(agent_id, now))
                .await?;
            updated = self.conversations.find_by_ids(&assign_ids).await?;

            if emit_events {
                let previous_assignees: HashMap<ConversationId, Option<AgentId>> = to_assign
                    .iter()
                    .map(|conversation| (conversation.id, conversation.assignee_id))
                    .collect();
                for conversation in &updated {
                    effects.push(Effect::History(HistoryEntry {
                        conversation_id: conversation.id,
                        kind: HistoryKind::AgentChanged {
                            from: previous_assignees.get(&conversation.id).copied().flatten(),
                            to: agent_id,
                        },
                        recorded_at: now,
                    }));
                }
            }
            effects.push(Effect::ConversationsUpdated {
                before: to_assign,
                after: updated.clone(),
            });
        }

        let mut full_set = updated.clone();
        full_set.extend(already);
        effects.push(Effect::AssignedToAgent {
            agent_id,
            conversations: full_set,
        });

        Ok(AssignmentOutcome {
            conversations: updated,
            effects,
        })
    }

    /// Routes a single conversation to the first available agent of its
    /// group (or the default group), queueing it when no candidate exists.
    ///
    /// Manual-mode groups short-circuit straight to the queue without any
    /// candidate search. Candidate selection is first-match over the
    /// directory's default ordering; fairness is a documented non-goal.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::NoDefaultGroup`] when the conversation has
    /// no group and no default group is configured, and
    /// [`RoutingError::GroupNotFound`] when its group no longer exists.
    pub async fn assign_first_available(
        &self,
        conversation: &Conversation,
        excluded_agent_ids: &[AgentId],
        emit_events: bool,
    ) -> RoutingResult<AssignmentOutcome> {
        let group = self.resolve_target_group(conversation).await?;

        if group.assignment_mode == AssignmentMode::Manual {
            return self.queue_conversation(conversation, &group, false).await;
        }

        let candidates = self.directory.available_agents(excluded_agent_ids).await?;
        let candidate = candidates
            .iter()
            .find(|agent| Self::is_candidate(agent, conversation, group.id));

        match candidate {
            Some(agent) => {
                self.assign_to_agent(
                    ConversationSelection::Records(vec![conversation.clone()]),
                    agent.id,
                    emit_events,
                )
                .await
            }
            None => {
                // Queue notifications are suppressed when the conversation
                // was already unassigned.
                let with_history = emit_events && conversation.has_assignee();
                self.queue_conversation(conversation, &group, with_history)
                    .await
            }
        }
    }

    /// Routes up to the configured batch of open, unassigned conversations
    /// through [`Self::assign_first_available`], each independently.
    ///
    /// There is no cross-conversation atomicity: a failure partway through
    /// leaves earlier assignments standing, and the error propagates.
    ///
    /// # Errors
    ///
    /// Propagates the first routing error encountered.
    pub async fn distribute_unassigned(
        &self,
        emit_events: bool,
    ) -> RoutingResult<Vec<AssignmentOutcome>> {
        let batch = self
            .conversations
            .list_unassigned_open(self.config.sweep_batch_size)
            .await?;
        let mut outcomes = Vec::with_capacity(batch.len());
        for conversation in &batch {
            outcomes.push(
                self.assign_first_available(conversation, &[], emit_events)
                    .await?,
            );
        }
        Ok(outcomes)
    }

    async fn resolve(&self, selection: ConversationSelection) -> RoutingResult<Vec<Conversation>> {
        match selection {
            ConversationSelection::Ids(ids) => {
                Ok(self.conversations.find_by_ids(&ids).await?)
            }
            ConversationSelection::Records(records) => Ok(records),
        }
    }

    async fn resolve_target_group(&self, conversation: &Conversation) -> RoutingResult<Group> {
        match conversation.group_id {
            Some(group_id) => self
                .directory
                .group(group_id)
                .await?
                .ok_or(RoutingError::GroupNotFound(group_id)),
            None => self
                .directory
                .default_group()
                .await?
                .ok_or(RoutingError::NoDefaultGroup(conversation.id)),
        }
    }

    fn is_candidate(agent: &Agent, conversation: &Conversation, group_id: GroupId) -> bool {
        // Chats require recent activity; tickets do not.
        (conversation.is_ticket() || agent.recently_active)
            && agent.accepts_conversations
            && agent.is_member_of(group_id)
    }

    async fn queue_conversation(
        &self,
        conversation: &Conversation,
        group: &Group,
        with_history: bool,
    ) -> RoutingResult<AssignmentOutcome> {
        let ids = [conversation.id];
        self.conversations
            .update_many(&ids, &ConversationPatch::queue_on(group.id))
            .await?;
        let updated = self.conversations.find_by_ids(&ids).await?;

        let mut effects = Vec::new();
        if with_history {
            effects.push(Effect::History(HistoryEntry {
                conversation_id: conversation.id,
                kind: HistoryKind::MovedToQueue { group_id: group.id },
                recorded_at: self.clock.utc(),
            }));
        }
        effects.push(Effect::ConversationsUpdated {
            before: vec![conversation.clone()],
            after: updated.clone(),
        });

        Ok(AssignmentOutcome {
            conversations: updated,
            effects,
        })
    }
}
