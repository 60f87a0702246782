//! `PostgreSQL` conversation store.

use super::filters;
use super::models::{ConversationChangeset, ConversationRow};
use super::schema::{
    attachment_links, contacts, conversation_custom_attributes, conversation_tags,
    conversations, custom_attribute_definitions, messages,
};
use crate::inbox::plan::QueryPlan;
use crate::routing::domain::{
    Conversation, ConversationId, ConversationPatch, CustomAttributeValue, MessageId, TagId,
};
use crate::routing::ports::{
    ContentRepositoryError, ContentRepositoryResult, ConversationContentRepository,
    ConversationRepository, ConversationRepositoryError, ConversationRepositoryResult,
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_types::{Array, Text, Uuid as SqlUuid};
use std::collections::HashMap;

/// `PostgreSQL` connection pool type used by routing adapters.
pub type RoutingPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed conversation store.
#[derive(Debug, Clone)]
pub struct PostgresConversationStore {
    pool: RoutingPgPool,
}

impl PostgresConversationStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: RoutingPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> ConversationRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> ConversationRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(ConversationRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(ConversationRepositoryError::persistence)?
    }

    async fn run_content<F, T>(&self, f: F) -> ContentRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> ContentRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(ContentRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(ContentRepositoryError::persistence)?
    }
}

fn hydrate_rows(
    connection: &mut PgConnection,
    rows: Vec<ConversationRow>,
) -> ConversationRepositoryResult<Vec<Conversation>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<uuid::Uuid> = rows.iter().map(|row| row.id).collect();
    let contact_ids: Vec<uuid::Uuid> = rows.iter().map(|row| row.contact_id).collect();

    let tag_rows: Vec<(uuid::Uuid, i64)> = conversation_tags::table
        .filter(conversation_tags::conversation_id.eq_any(&ids))
        .select((
            conversation_tags::conversation_id,
            conversation_tags::tag_id,
        ))
        .load(connection)
        .map_err(ConversationRepositoryError::persistence)?;

    let attribute_rows: Vec<(uuid::Uuid, String, serde_json::Value)> =
        conversation_custom_attributes::table
            .inner_join(custom_attribute_definitions::table)
            .filter(conversation_custom_attributes::conversation_id.eq_any(&ids))
            .select((
                conversation_custom_attributes::conversation_id,
                custom_attribute_definitions::key,
                conversation_custom_attributes::value,
            ))
            .load(connection)
            .map_err(ConversationRepositoryError::persistence)?;

    let country_rows: Vec<(uuid::Uuid, Option<String>)> = contacts::table
        .filter(contacts::id.eq_any(&contact_ids))
        .select((contacts::id, contacts::country))
        .load(connection)
        .map_err(ConversationRepositoryError::persistence)?;

    let mut tags_by_owner: HashMap<uuid::Uuid, Vec<TagId>> = HashMap::new();
    for (owner, tag) in tag_rows {
        tags_by_owner.entry(owner).or_default().push(TagId::new(tag));
    }
    let mut attributes_by_owner: HashMap<uuid::Uuid, Vec<CustomAttributeValue>> = HashMap::new();
    for (owner, key, value) in attribute_rows {
        attributes_by_owner
            .entry(owner)
            .or_default()
            .push(CustomAttributeValue::new(key, value));
    }
    let countries: HashMap<uuid::Uuid, Option<String>> = country_rows.into_iter().collect();

    rows.into_iter()
        .map(|row| {
            let row_id = row.id;
            let contact_id = row.contact_id;
            let mut conversation = row
                .into_conversation()
                .map_err(ConversationRepositoryError::persistence)?;
            conversation.tag_ids = tags_by_owner.remove(&row_id).unwrap_or_default();
            conversation.custom_attributes =
                attributes_by_owner.remove(&row_id).unwrap_or_default();
            conversation.contact_country = countries.get(&contact_id).cloned().flatten();
            Ok(conversation)
        })
        .collect()
}

fn as_limit(limit: usize) -> ConversationRepositoryResult<i64> {
    i64::try_from(limit).map_err(ConversationRepositoryError::persistence)
}

fn raw_ids(ids: &[ConversationId]) -> Vec<uuid::Uuid> {
    ids.iter().copied().map(ConversationId::into_inner).collect()
}

#[async_trait]
impl ConversationRepository for PostgresConversationStore {
    async fn find_by_ids(
        &self,
        ids: &[ConversationId],
    ) -> ConversationRepositoryResult<Vec<Conversation>> {
        let lookup = ids.to_vec();
        self.run_blocking(move |connection| {
            let rows = conversations::table
                .filter(conversations::id.eq_any(raw_ids(&lookup)))
                .load::<ConversationRow>(connection)
                .map_err(ConversationRepositoryError::persistence)?;
            let mut by_id: HashMap<ConversationId, Conversation> =
                hydrate_rows(connection, rows)?
                    .into_iter()
                    .map(|conversation| (conversation.id, conversation))
                    .collect();
            Ok(lookup
                .iter()
                .filter_map(|id| by_id.remove(id))
                .collect())
        })
        .await
    }

    async fn update_many(
        &self,
        ids: &[ConversationId],
        patch: &ConversationPatch,
    ) -> ConversationRepositoryResult<usize> {
        if ids.is_empty() || patch.is_empty() {
            return Ok(0);
        }
        let targets = raw_ids(ids);
        let changeset = ConversationChangeset::from(patch);
        self.run_blocking(move |connection| {
            diesel::update(conversations::table.filter(conversations::id.eq_any(targets)))
                .set(changeset)
                .execute(connection)
                .map_err(ConversationRepositoryError::persistence)
        })
        .await
    }

    async fn list_unassigned_open(
        &self,
        limit: usize,
    ) -> ConversationRepositoryResult<Vec<Conversation>> {
        let window = as_limit(limit)?;
        self.run_blocking(move |connection| {
            let rows = conversations::table
                .filter(conversations::status_category.eq("open"))
                .filter(conversations::mode.eq("normal"))
                .filter(conversations::assignee_id.is_null())
                .filter(conversations::assigned_to.ne("agent"))
                .order(conversations::created_at.asc())
                .limit(window)
                .load::<ConversationRow>(connection)
                .map_err(ConversationRepositoryError::persistence)?;
            hydrate_rows(connection, rows)
        })
        .await
    }

    async fn list_open_window(
        &self,
        limit: usize,
    ) -> ConversationRepositoryResult<Vec<Conversation>> {
        let window = as_limit(limit)?;
        self.run_blocking(move |connection| {
            let rows = conversations::table
                .filter(conversations::status_category.eq("open"))
                .filter(conversations::mode.eq("normal"))
                .order(conversations::created_at.desc())
                .limit(window)
                .load::<ConversationRow>(connection)
                .map_err(ConversationRepositoryError::persistence)?;
            hydrate_rows(connection, rows)
        })
        .await
    }

    async fn query(&self, plan: &QueryPlan) -> ConversationRepositoryResult<Vec<Conversation>> {
        let owned_plan = plan.clone();
        self.run_blocking(move |connection| {
            let query = filters::apply_plan(conversations::table.into_boxed(), &owned_plan);
            let rows = query
                .order(conversations::created_at.asc())
                .load::<ConversationRow>(connection)
                .map_err(ConversationRepositoryError::persistence)?;
            hydrate_rows(connection, rows)
        })
        .await
    }
}

#[derive(QueryableByName)]
struct RegclassRow {
    #[diesel(sql_type = diesel::sql_types::Nullable<Text>)]
    oid: Option<String>,
}

/// Probes for an optional table. Deployments without the AI or summary
/// features simply lack those tables.
fn table_exists(connection: &mut PgConnection, name: &str) -> QueryResult<bool> {
    let probe: RegclassRow = diesel::sql_query("SELECT to_regclass($1)::text AS oid")
        .bind::<Text, _>(name)
        .get_result(connection)?;
    Ok(probe.oid.is_some())
}

fn optional_table_delete(
    connection: &mut PgConnection,
    table: &str,
    ids: &[uuid::Uuid],
) -> QueryResult<usize> {
    if ids.is_empty() || !table_exists(connection, table)? {
        return Ok(0);
    }
    diesel::sql_query(format!(
        "DELETE FROM {table} WHERE conversation_id = ANY($1)"
    ))
    .bind::<Array<SqlUuid>, _>(ids.to_vec())
    .execute(connection)
}

#[async_trait]
impl ConversationContentRepository for PostgresConversationStore {
    async fn message_ids(
        &self,
        ids: &[ConversationId],
    ) -> ContentRepositoryResult<Vec<MessageId>> {
        let owners = raw_ids(ids);
        self.run_content(move |connection| {
            let found: Vec<uuid::Uuid> = messages::table
                .filter(messages::conversation_id.eq_any(owners))
                .select(messages::id)
                .load(connection)
                .map_err(ContentRepositoryError::persistence)?;
            Ok(found.into_iter().map(MessageId::from_uuid).collect())
        })
        .await
    }

    async fn reassign_messages(
        &self,
        from: &[ConversationId],
        to: ConversationId,
    ) -> ContentRepositoryResult<usize> {
        let sources = raw_ids(from);
        self.run_content(move |connection| {
            diesel::update(messages::table.filter(messages::conversation_id.eq_any(sources)))
                .set(messages::conversation_id.eq(to.into_inner()))
                .execute(connection)
                .map_err(ContentRepositoryError::persistence)
        })
        .await
    }

    async fn delete_attachment_links(
        &self,
        message_ids: &[MessageId],
    ) -> ContentRepositoryResult<usize> {
        let owners: Vec<uuid::Uuid> = message_ids
            .iter()
            .copied()
            .map(MessageId::into_inner)
            .collect();
        self.run_content(move |connection| {
            diesel::delete(
                attachment_links::table.filter(attachment_links::message_id.eq_any(owners)),
            )
            .execute(connection)
            .map_err(ContentRepositoryError::persistence)
        })
        .await
    }

    async fn detach_tags(&self, ids: &[ConversationId]) -> ContentRepositoryResult<usize> {
        let owners = raw_ids(ids);
        self.run_content(move |connection| {
            diesel::delete(
                conversation_tags::table
                    .filter(conversation_tags::conversation_id.eq_any(owners)),
            )
            .execute(connection)
            .map_err(ContentRepositoryError::persistence)
        })
        .await
    }

    async fn detach_custom_attributes(
        &self,
        ids: &[ConversationId],
    ) -> ContentRepositoryResult<usize> {
        let owners = raw_ids(ids);
        self.run_content(move |connection| {
            diesel::delete(
                conversation_custom_attributes::table
                    .filter(conversation_custom_attributes::conversation_id.eq_any(owners)),
            )
            .execute(connection)
            .map_err(ContentRepositoryError::persistence)
        })
        .await
    }

    async fn delete_ai_sessions(&self, ids: &[ConversationId]) -> ContentRepositoryResult<usize> {
        let owners = raw_ids(ids);
        self.run_content(move |connection| {
            optional_table_delete(connection, "ai_sessions", &owners)
                .map_err(ContentRepositoryError::persistence)
        })
        .await
    }

    async fn delete_messages(&self, ids: &[ConversationId]) -> ContentRepositoryResult<usize> {
        let owners = raw_ids(ids);
        self.run_content(move |connection| {
            diesel::delete(messages::table.filter(messages::conversation_id.eq_any(owners)))
                .execute(connection)
                .map_err(ContentRepositoryError::persistence)
        })
        .await
    }

    async fn delete_summaries(&self, ids: &[ConversationId]) -> ContentRepositoryResult<usize> {
        let owners = raw_ids(ids);
        self.run_content(move |connection| {
            optional_table_delete(connection, "conversation_summaries", &owners)
                .map_err(ContentRepositoryError::persistence)
        })
        .await
    }

    async fn delete_conversations(
        &self,
        ids: &[ConversationId],
    ) -> ContentRepositoryResult<usize> {
        let owners = raw_ids(ids);
        self.run_content(move |connection| {
            diesel::delete(conversations::table.filter(conversations::id.eq_any(owners)))
                .execute(connection)
                .map_err(ContentRepositoryError::persistence)
        })
        .await
    }

    async fn tags_of(&self, id: ConversationId) -> ContentRepositoryResult<Vec<TagId>> {
        self.run_content(move |connection| {
            let tags: Vec<i64> = conversation_tags::table
                .filter(conversation_tags::conversation_id.eq(id.into_inner()))
                .select(conversation_tags::tag_id)
                .load(connection)
                .map_err(ContentRepositoryError::persistence)?;
            Ok(tags.into_iter().map(TagId::new).collect())
        })
        .await
    }

    async fn custom_attributes_of(
        &self,
        id: ConversationId,
    ) -> ContentRepositoryResult<Vec<CustomAttributeValue>> {
        self.run_content(move |connection| {
            let values: Vec<(String, serde_json::Value)> = conversation_custom_attributes::table
                .inner_join(custom_attribute_definitions::table)
                .filter(conversation_custom_attributes::conversation_id.eq(id.into_inner()))
                .select((
                    custom_attribute_definitions::key,
                    conversation_custom_attributes::value,
                ))
                .load(connection)
                .map_err(ContentRepositoryError::persistence)?;
            Ok(values
                .into_iter()
                .map(|(key, value)| CustomAttributeValue::new(key, value))
                .collect())
        })
        .await
    }

    async fn sync_tags(
        &self,
        id: ConversationId,
        tags: &[TagId],
    ) -> ContentRepositoryResult<()> {
        let rows: Vec<_> = tags
            .iter()
            .map(|tag| {
                (
                    conversation_tags::conversation_id.eq(id.into_inner()),
                    conversation_tags::tag_id.eq(tag.value()),
                )
            })
            .collect();
        self.run_content(move |connection| {
            connection
                .transaction(|tx| {
                    diesel::delete(
                        conversation_tags::table
                            .filter(conversation_tags::conversation_id.eq(id.into_inner())),
                    )
                    .execute(tx)?;
                    diesel::insert_into(conversation_tags::table)
                        .values(&rows)
                        .execute(tx)
                })
                .map(|_| ())
                .map_err(ContentRepositoryError::persistence)
        })
        .await
    }

    async fn sync_custom_attributes(
        &self,
        id: ConversationId,
        attributes: &[CustomAttributeValue],
    ) -> ContentRepositoryResult<()> {
        let values = attributes.to_vec();
        self.run_content(move |connection| {
            let keys: Vec<&str> = values
                .iter()
                .map(|attribute| attribute.key.as_str())
                .collect();
            let definitions: HashMap<String, i64> = custom_attribute_definitions::table
                .filter(custom_attribute_definitions::key.eq_any(keys))
                .select((custom_attribute_definitions::key, custom_attribute_definitions::id))
                .load::<(String, i64)>(connection)
                .map_err(ContentRepositoryError::persistence)?
                .into_iter()
                .collect();
            let mut rows = Vec::with_capacity(values.len());
            for attribute in &values {
                let Some(definition_id) = definitions.get(&attribute.key) else {
                    tracing::warn!(key = %attribute.key, "dropping value for unknown custom attribute");
                    continue;
                };
                rows.push((
                    conversation_custom_attributes::conversation_id.eq(id.into_inner()),
                    conversation_custom_attributes::attribute_definition_id.eq(*definition_id),
                    conversation_custom_attributes::value.eq(attribute.value.clone()),
                ));
            }
            connection
                .transaction(|tx| {
                    diesel::delete(conversation_custom_attributes::table.filter(
                        conversation_custom_attributes::conversation_id.eq(id.into_inner()),
                    ))
                    .execute(tx)?;
                    diesel::insert_into(conversation_custom_attributes::table)
                        .values(&rows)
                        .execute(tx)
                })
                .map(|_| ())
                .map_err(ContentRepositoryError::persistence)
        })
        .await
    }
}
