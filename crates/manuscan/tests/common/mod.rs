//! Shared test utilities for manuscan integration tests.
//!
//! - `TestHarness` for isolated runs in a temp directory
//! - `ScriptedClient` and friends for driving the pipeline without a network

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
