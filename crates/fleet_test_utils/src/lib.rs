//! # Fleet Test Utilities
//!
//! Shared testing utilities for the fleet crates:
//! - Snapshot fixtures and scenario builders
//! - Determinism test harness
//! - A scripted in-memory transport
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;
pub mod strategies;
pub mod transport;

/// Re-export proptest for convenience.
pub use proptest;
