//! Domain model for conversation routing.
//!
//! Pure record and value types shared by the assignment engine, the inbox
//! filtering layer and the persistence adapters. No infrastructure concerns
//! cross this boundary.

mod agent;
mod conversation;
mod effect;
mod error;
mod group;
mod ids;

pub use agent::Agent;
pub use conversation::{
    AssignedTo, Conversation, ConversationKind, ConversationMode, ConversationPatch,
    CustomAttributeValue, StatusCategory,
};
pub use effect::{AssignmentOutcome, Effect, HistoryEntry, HistoryKind};
pub use error::ParseDomainValueError;
pub use group::{AssignmentMode, Group};
pub use ids::{
    AgentId, AttachmentId, ContactId, ConversationId, GroupId, MessageId, TagId, ViewId,
};
