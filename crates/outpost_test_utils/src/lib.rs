//! # Outpost Test Utilities
//!
//! Shared testing utilities for all crates:
//! - In-memory host world with box traces
//! - In-memory layout store
//! - Scenario fixtures
//! - Determinism test harness
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;
pub mod store;
pub mod world;

pub use store::MemoryLayoutStore;
pub use world::TestWorld;

/// Re-export proptest for convenience.
pub use proptest;
