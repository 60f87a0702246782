//! In-memory adapter implementations.

mod conversations;
mod directory;
mod events;

pub use conversations::{InMemoryConversationStore, MessageRecord};
pub use directory::InMemoryDirectory;
pub use events::RecordingEventSink;
