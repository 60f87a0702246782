//! Adapter implementations of the routing ports.

pub mod memory;
pub mod postgres;
