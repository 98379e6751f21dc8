//! Core types and error definitions for reviewforge.
//!
//! This crate holds the data model shared by the classifier, ranker, team
//! composer, contract validator and aggregator in `reviewforge-orchestrator`.
//!
//! # Main types
//!
//! - [`ReviewForgeError`]: Unified error enum for all reviewforge subsystems.
//! - [`AgentContractViolation`]: Structured schema violation for one agent output.
//! - [`TaskProfile`]: Immutable classification of a unit of work.
//! - [`AgentDescriptor`]: Capability record supplied by the agent registry.
//! - [`Finding`] / [`AgentOutput`]: Validated reviewer output.
//! - [`AggregatedResults`]: Run-level merge of validated outputs.

/// Agent descriptors and ranking results.
pub mod agent;
/// Error types.
pub mod error;
/// Findings, agent outputs and aggregated results.
pub mod finding;
/// Task profile, task type and complexity.
pub mod profile;

pub use agent::{AgentDescriptor, AgentTier, RankedAgent};
pub use error::{AgentContractViolation, ReviewForgeError, ReviewForgeResult};
pub use finding::{AgentOutput, AggregatedResults, Finding, Severity};
pub use profile::{dimension, Complexity, TaskProfile, TaskType};
