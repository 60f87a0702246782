//! In-memory group and agent directory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::routing::domain::{Agent, AgentId, Group, GroupId};
use crate::routing::ports::{DirectoryError, DirectoryRepository, DirectoryResult};

#[derive(Debug, Default)]
struct State {
    groups: HashMap<GroupId, Group>,
    agents: HashMap<AgentId, Agent>,
    agent_order: Vec<AgentId>,
}

/// Thread-safe in-memory directory. Agents list in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<RwLock<State>>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a group.
    pub fn insert_group(&self, group: Group) {
        if let Ok(mut state) = self.state.write() {
            state.groups.insert(group.id, group);
        }
    }

    /// Registers an agent.
    pub fn insert_agent(&self, agent: Agent) {
        if let Ok(mut state) = self.state.write() {
            state.agent_order.push(agent.id);
            state.agents.insert(agent.id, agent);
        }
    }

    fn read(&self) -> DirectoryResult<std::sync::RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|err| DirectoryError::persistence(std::io::Error::other(err.to_string())))
    }
}

#[async_trait]
impl DirectoryRepository for InMemoryDirectory {
    async fn group(&self, id: GroupId) -> DirectoryResult<Option<Group>> {
        let state = self.read()?;
        Ok(state.groups.get(&id).cloned())
    }

    async fn default_group(&self) -> DirectoryResult<Option<Group>> {
        let state = self.read()?;
        Ok(state.groups.values().find(|group| group.is_default).cloned())
    }

    async fn agents_in_group(&self, id: GroupId) -> DirectoryResult<Vec<AgentId>> {
        let state = self.read()?;
        Ok(state
            .agent_order
            .iter()
            .filter_map(|agent_id| state.agents.get(agent_id))
            .filter(|agent| agent.is_member_of(id))
            .map(|agent| agent.id)
            .collect())
    }

    async fn groups_of_agent(&self, id: AgentId) -> DirectoryResult<Vec<GroupId>> {
        let state = self.read()?;
        Ok(state
            .agents
            .get(&id)
            .map(|agent| agent.group_ids.clone())
            .unwrap_or_default())
    }

    async fn available_agents(&self, excluded: &[AgentId]) -> DirectoryResult<Vec<Agent>> {
        let state = self.read()?;
        Ok(state
            .agent_order
            .iter()
            .filter(|agent_id| !excluded.contains(agent_id))
            .filter_map(|agent_id| state.agents.get(agent_id))
            .cloned()
            .collect())
    }
}
