//! Unit tests for conversation routing.

mod dispatch_tests;
mod distribution_tests;
