//! Integration test suite for aoc-race.
//!
//! These tests drive a `RaceService` end to end against a fake puzzle site
//! and a gated pipeline, so background runs advance only when a test lets
//! them.
//!
//! # Test Categories
//!
//! - `race_flow`: human and agent racing through both parts
//! - `lifecycle`: start validation, reset, and stale runners
//! - `http_api`: the axum router, exercised without a socket
//!
//! # CI Compatibility
//!
//! No test contacts the puzzle site or runs an agent CLI.

mod fixtures;

mod http_api;
mod lifecycle;
