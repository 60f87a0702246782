//! `PostgreSQL` adapter implementations.

mod directory;
mod filters;
mod models;
mod repository;
mod schema;

pub use directory::PostgresDirectory;
pub use repository::{PostgresConversationStore, RoutingPgPool};
