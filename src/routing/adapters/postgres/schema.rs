//! Diesel schema for conversation routing persistence.

diesel::table! {
    /// Conversation records with denormalized assignment state.
    conversations (id) {
        /// Conversation identifier.
        id -> Uuid,
        /// Conversation medium (`ticket` or `chat`).
        #[max_length = 20]
        kind -> Varchar,
        /// Originating channel.
        #[max_length = 100]
        channel -> Varchar,
        /// Subject line.
        subject -> Varchar,
        /// Workflow status identifier.
        status_id -> Int4,
        /// Denormalized open/closed classification.
        #[max_length = 20]
        status_category -> Varchar,
        /// Assignment state (`unassigned`, `agent_queue`, `agent`).
        #[max_length = 20]
        assigned_to -> Varchar,
        /// Assigned agent, if any.
        assignee_id -> Nullable<Uuid>,
        /// Routing group, if any.
        group_id -> Nullable<Uuid>,
        /// Requesting contact.
        contact_id -> Uuid,
        /// Processing mode (`normal` or `other`).
        #[max_length = 20]
        mode -> Varchar,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
        /// Close timestamp, if closed.
        closed_at -> Nullable<Timestamptz>,
        /// Last assignment-change timestamp, if any.
        assigned_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Customer contacts, read here only for country filtering.
    contacts (id) {
        /// Contact identifier.
        id -> Uuid,
        /// ISO country code, if known.
        #[max_length = 10]
        country -> Nullable<Varchar>,
    }
}

diesel::table! {
    /// Tag attachments. Duplicate rows are possible and preserved.
    conversation_tags (conversation_id, tag_id) {
        /// Owning conversation.
        conversation_id -> Uuid,
        /// Attached tag.
        tag_id -> Int8,
    }
}

diesel::table! {
    /// Custom attribute values per conversation.
    conversation_custom_attributes (conversation_id, attribute_definition_id) {
        /// Owning conversation.
        conversation_id -> Uuid,
        /// Attribute definition this value instantiates.
        attribute_definition_id -> Int8,
        /// Stored value.
        value -> Jsonb,
    }
}

diesel::table! {
    /// Custom attribute metadata: maps stripped keys to definitions.
    custom_attribute_definitions (id) {
        /// Definition identifier.
        id -> Int8,
        /// Stripped attribute key (no `ca_` prefix).
        #[max_length = 100]
        key -> Varchar,
    }
}

diesel::table! {
    /// Conversation messages: only ownership matters to routing.
    messages (id) {
        /// Message identifier.
        id -> Uuid,
        /// Owning conversation.
        conversation_id -> Uuid,
    }
}

diesel::table! {
    /// Links between attachments and messages.
    attachment_links (attachment_id, message_id) {
        /// Attached file.
        attachment_id -> Uuid,
        /// Owning message.
        message_id -> Uuid,
    }
}

diesel::table! {
    /// Routing groups.
    groups (id) {
        /// Group identifier.
        id -> Uuid,
        /// Display name.
        name -> Varchar,
        /// `auto` or `manual` assignment.
        #[max_length = 20]
        assignment_mode -> Varchar,
        /// Whether this is the system default group.
        is_default -> Bool,
    }
}

diesel::table! {
    /// Group membership rows.
    group_members (group_id, agent_id) {
        /// Group.
        group_id -> Uuid,
        /// Member agent.
        agent_id -> Uuid,
    }
}

diesel::table! {
    /// Agents with the availability state routing reads.
    agents (id) {
        /// Agent identifier.
        id -> Uuid,
        /// Display name.
        name -> Varchar,
        /// Seen online recently.
        recently_active -> Bool,
        /// Currently accepting new conversations.
        accepts_conversations -> Bool,
        /// Open conversations currently assigned.
        active_assigned_count -> Int4,
    }
}

diesel::joinable!(conversation_custom_attributes -> custom_attribute_definitions (attribute_definition_id));

diesel::allow_tables_to_appear_in_same_query!(
    conversations,
    contacts,
    conversation_tags,
    conversation_custom_attributes,
    custom_attribute_definitions,
);

diesel::allow_tables_to_appear_in_same_query!(agents, group_members, groups);
