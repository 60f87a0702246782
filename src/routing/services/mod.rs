//! Orchestration services for conversation routing.

pub mod assignment;
pub mod maintenance;

pub use assignment::{AssignmentEngine, ConversationSelection, RoutingError, RoutingResult};
pub use maintenance::{ConversationMaintenance, MaintenanceError, MaintenanceResult};
