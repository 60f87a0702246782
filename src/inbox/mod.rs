//! Inbox filtering: conditions, saved views, query planning and counting.
//!
//! The same condition vocabulary is consumed twice: once at query-build
//! time by [`plan::FilterPlanner`] (producing a [`plan::QueryPlan`] a
//! store adapter renders) and once against in-memory records by
//! [`evaluate::condition_matches`] (used for view counting). A dedicated
//! test pins both paths to identical classification.

pub mod counting;
pub mod domain;
pub mod evaluate;
pub mod plan;
pub mod ports;

#[cfg(test)]
mod tests;
