//! `PostgreSQL` group and agent directory.

use super::repository::RoutingPgPool;
use super::schema::{agents, group_members, groups};
use crate::routing::domain::{Agent, AgentId, AssignmentMode, Group, GroupId};
use crate::routing::ports::{DirectoryError, DirectoryRepository, DirectoryResult};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use std::collections::HashMap;

/// `PostgreSQL`-backed directory.
#[derive(Debug, Clone)]
pub struct PostgresDirectory {
    pool: RoutingPgPool,
}

/// Query result row for group records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = groups)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct GroupRow {
    id: uuid::Uuid,
    name: String,
    assignment_mode: String,
    is_default: bool,
}

impl GroupRow {
    fn into_group(self) -> DirectoryResult<Group> {
        Ok(Group {
            id: GroupId::from_uuid(self.id),
            name: self.name,
            assignment_mode: AssignmentMode::try_from(self.assignment_mode.as_str())
                .map_err(DirectoryError::persistence)?,
            is_default: self.is_default,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = agents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct AgentRow {
    id: uuid::Uuid,
    name: String,
    recently_active: bool,
    accepts_conversations: bool,
    active_assigned_count: i32,
}

impl AgentRow {
    fn into_agent(self, group_ids: Vec<GroupId>) -> Agent {
        Agent {
            id: AgentId::from_uuid(self.id),
            name: self.name,
            recently_active: self.recently_active,
            accepts_conversations: self.accepts_conversations,
            group_ids,
            active_assigned_count: usize::try_from(self.active_assigned_count)
                .unwrap_or_default(),
        }
    }
}

impl PostgresDirectory {
    /// Creates a new directory from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: RoutingPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> DirectoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> DirectoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(DirectoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(DirectoryError::persistence)?
    }
}

#[async_trait]
impl DirectoryRepository for PostgresDirectory {
    async fn group(&self, id: GroupId) -> DirectoryResult<Option<Group>> {
        self.run_blocking(move |connection| {
            let row = groups::table
                .find(id.into_inner())
                .select(GroupRow::as_select())
                .first::<GroupRow>(connection)
                .optional()
                .map_err(DirectoryError::persistence)?;
            row.map(GroupRow::into_group).transpose()
        })
        .await
    }

    async fn default_group(&self) -> DirectoryResult<Option<Group>> {
        self.run_blocking(move |connection| {
            let row = groups::table
                .filter(groups::is_default.eq(true))
                .select(GroupRow::as_select())
                .first::<GroupRow>(connection)
                .optional()
                .map_err(DirectoryError::persistence)?;
            row.map(GroupRow::into_group).transpose()
        })
        .await
    }

    async fn agents_in_group(&self, id: GroupId) -> DirectoryResult<Vec<AgentId>> {
        self.run_blocking(move |connection| {
            let members: Vec<uuid::Uuid> = group_members::table
                .filter(group_members::group_id.eq(id.into_inner()))
                .select(group_members::agent_id)
                .load(connection)
                .map_err(DirectoryError::persistence)?;
            Ok(members.into_iter().map(AgentId::from_uuid).collect())
        })
        .await
    }

    async fn groups_of_agent(&self, id: AgentId) -> DirectoryResult<Vec<GroupId>> {
        self.run_blocking(move |connection| {
            let memberships: Vec<uuid::Uuid> = group_members::table
                .filter(group_members::agent_id.eq(id.into_inner()))
                .select(group_members::group_id)
                .load(connection)
                .map_err(DirectoryError::persistence)?;
            Ok(memberships.into_iter().map(GroupId::from_uuid).collect())
        })
        .await
    }

    async fn available_agents(&self, excluded: &[AgentId]) -> DirectoryResult<Vec<Agent>> {
        let excluded_ids: Vec<uuid::Uuid> =
            excluded.iter().copied().map(AgentId::into_inner).collect();
        self.run_blocking(move |connection| {
            let rows = agents::table
                .filter(diesel::dsl::not(agents::id.eq_any(excluded_ids)))
                .order(agents::name.asc())
                .select(AgentRow::as_select())
                .load::<AgentRow>(connection)
                .map_err(DirectoryError::persistence)?;

            let agent_ids: Vec<uuid::Uuid> = rows.iter().map(|row| row.id).collect();
            let memberships: Vec<(uuid::Uuid, uuid::Uuid)> = group_members::table
                .filter(group_members::agent_id.eq_any(&agent_ids))
                .select((group_members::agent_id, group_members::group_id))
                .load(connection)
                .map_err(DirectoryError::persistence)?;
            let mut groups_by_agent: HashMap<uuid::Uuid, Vec<GroupId>> = HashMap::new();
            for (agent_id, group_id) in memberships {
                groups_by_agent
                    .entry(agent_id)
                    .or_default()
                    .push(GroupId::from_uuid(group_id));
            }

            Ok(rows
                .into_iter()
                .map(|row| {
                    let group_ids = groups_by_agent.remove(&row.id).unwrap_or_default();
                    row.into_agent(group_ids)
                })
                .collect())
        })
        .await
    }
}
