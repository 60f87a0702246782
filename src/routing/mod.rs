//! Conversation routing: assignment, distribution and bulk maintenance.
//!
//! This module owns how conversations reach groups and agents: direct
//! group moves, direct agent assignment with eligibility repair, routing
//! to the first available agent with queue fallback, and the periodic
//! sweep that distributes unassigned conversations. It also carries the
//! bulk mutators (cascaded delete, merge). The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
