//! Port contracts for conversation routing.
//!
//! Ports define infrastructure-agnostic interfaces used by the routing
//! services.

pub mod directory;
pub mod events;
pub mod repository;

pub use directory::{DirectoryError, DirectoryRepository, DirectoryResult};
pub use events::{EffectDispatcher, EventSink, EventSinkError};
pub use repository::{
    ContentRepositoryError, ContentRepositoryResult, ConversationContentRepository,
    ConversationRepository, ConversationRepositoryError, ConversationRepositoryResult,
};
