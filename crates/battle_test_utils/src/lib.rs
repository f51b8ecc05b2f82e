//! # Battle Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Fixture unit types and battle setups
//! - Scripted randomness and recording presentation sinks
//! - Determinism test harness
//! - Balance runs over many seeds
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod balance;
pub mod determinism;
pub mod fixtures;

/// Re-export proptest for convenience.
pub use proptest;
