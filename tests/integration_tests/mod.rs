//! Integration tests module
//!
//! End-to-end tests for the feedrelay pipeline:
//! - fetch → diff → persist → completion hook
//! - Poll and notification scheduling
//! - Failure isolation between sources and sinks

pub mod error_scenarios;
pub mod pipeline_test;
pub mod scheduler_test;
