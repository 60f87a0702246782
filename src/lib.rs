//! Switchyard: conversation routing and inbox filtering for a helpdesk
//! platform.
//!
//! This crate decides how customer conversations reach agents (group
//! moves, direct assignment, first-available routing with queue fallback,
//! and a periodic distribution sweep), how saved inbox views are compiled
//! into store queries, and how unread counts are computed over a bounded
//! window of open conversations.
//!
//! # Architecture
//!
//! Switchyard follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, APIs, etc.)
//!
//! # Modules
//!
//! - [`routing`]: Assignment engine, distribution sweep and bulk mutators
//! - [`inbox`]: Filter conditions, query planning and view counting
//! - [`config`]: Tunable routing and counting limits

pub mod config;
pub mod inbox;
pub mod routing;
