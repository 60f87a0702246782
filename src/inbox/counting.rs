//! Per-view conversation counts over a bounded window.
//!
//! Counts are an approximation: they are tallied over the most relevant
//! open conversations the repository returns, not over the whole table.
//! That tradeoff is deliberate.

use crate::config::RoutingConfig;
use crate::inbox::domain::{
    ConversationView, FilterContext, GROUPS_VIEW_KEY, MatchType, synthesize_group_views,
};
use crate::inbox::evaluate::condition_matches;
use crate::routing::domain::{AgentId, Conversation, ViewId};
use crate::routing::ports::{
    ConversationRepository, ConversationRepositoryError, DirectoryError, DirectoryRepository,
};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned while counting views.
#[derive(Debug, Clone, Error)]
pub enum CountingError {
    /// Conversation store failure.
    #[error(transparent)]
    Repository(#[from] ConversationRepositoryError),

    /// Membership lookup failure.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Counting result: the expanded view list (stored views plus synthesized
/// group views) and the tally per view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewCountReport {
    /// All counted views, synthesized group views included, in display
    /// order.
    pub views: Vec<ConversationView>,
    /// Matching-conversation count per view. `all` and `closed` stay 0.
    pub counts: HashMap<ViewId, usize>,
}

/// Returns true when the conversation satisfies the view's filter set:
/// every `all` condition passes (vacuously true when there are none) and
/// at least one `any` condition passes (vacuously true when there are
/// none).
#[must_use]
pub fn view_matches(
    view: &ConversationView,
    conversation: &Conversation,
    ctx: &FilterContext,
) -> bool {
    let mut any_present = false;
    let mut any_hit = false;
    for condition in &view.conditions {
        match condition.match_type {
            MatchType::All => {
                if !condition_matches(conversation, condition, ctx) {
                    return false;
                }
            }
            MatchType::Any => {
                any_present = true;
                if condition_matches(conversation, condition, ctx) {
                    any_hit = true;
                }
            }
        }
    }
    !any_present || any_hit
}

/// Tallies how many window conversations each view matches.
///
/// Views whose key is `all` or `closed` are exempt and keep a count of
/// zero.
#[must_use]
pub fn count_views(
    views: &[ConversationView],
    window: &[Conversation],
    ctx: &FilterContext,
) -> HashMap<ViewId, usize> {
    views
        .iter()
        .map(|view| {
            let count = if view.is_count_exempt() {
                0
            } else {
                window
                    .iter()
                    .filter(|conversation| view_matches(view, conversation, ctx))
                    .count()
            };
            (view.id, count)
        })
        .collect()
}

/// Loads the bounded open-conversation window and counts an agent's
/// views, synthesizing one group view per group membership.
#[derive(Clone)]
pub struct ViewCountingService<R, D, K>
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

impl<R, D, K> ViewCountingService<R, D, K>
where
    R: ConversationRepository,
    D: DirectoryRepository,
    K: Clock + Send + Sync,
{
    /// Creates a counting service with default window sizes.
    pub fn new(conversations: Arc<R>, directory: Arc<D>, clock: Arc<K>) -> Self {
        Self::with_config(conversations, directory, clock, RoutingConfig::default())
    }

    /// Creates a counting service with explicit window sizes.
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

    /// Counts the given views for an agent's inbox.
    ///
    /// Group views are synthesized from the native `groups` template (one
    /// per group the agent belongs to, a `group_id` condition prepended)
    /// and appended to the counted list; they are never stored.
    ///
    /// # Errors
    ///
    /// Returns [`CountingError`] on store failures.
    pub async fn counts_for(
        &self,
        views: &[ConversationView],
        actor_id: AgentId,
    ) -> Result<ViewCountReport, CountingError> {
        let mut expanded: Vec<ConversationView> = views.to_vec();
        if let Some(template) = views
            .iter()
            .find(|view| view.key.as_deref() == Some(GROUPS_VIEW_KEY))
        {
            let group_ids = self.directory.groups_of_agent(actor_id).await?;
            expanded.extend(synthesize_group_views(template, &group_ids));
        }

        let window = self
            .conversations
            .list_open_window(self.config.counting_window)
            .await?;
        let ctx = FilterContext::new(actor_id, self.clock.utc());
        let counts = count_views(&expanded, &window, &ctx);

        Ok(ViewCountReport {
            views: expanded,
            counts,
        })
    }
}
