//! Unit tests for inbox filtering.

mod counting_tests;
mod evaluate_tests;
mod plan_tests;
