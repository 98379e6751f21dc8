//! Task classification, agent ranking, team composition and run execution
//! for multi-agent code review.
//!
//! A task description flows through the [`TaskClassifier`] into a
//! [`TaskProfile`](reviewforge_core::TaskProfile), the [`AgentRanker`] scores
//! every registry entry against it, and the [`TeamComposer`] picks a bounded
//! team and its coordination topology. [`ReviewOrchestrator`] drives the
//! selected team through sequential phases, validating every agent record
//! before aggregation and reporting to [`Telemetry`].
//!
//! # Main types
//!
//! - [`ReviewOrchestrator`]: Plans and runs a review over an [`ExecutionSubstrate`].
//! - [`OutputValidator`]: Contract check for raw agent output, with
//!   [`SchemaValidator`] and [`FieldValidator`] implementations.
//! - [`Telemetry`]: Metrics, health and circuit-breaker state.
//! - [`AgentRegistry`]: Source of agent descriptors.

/// Run-level aggregation of validated outputs.
pub mod aggregator;
/// Circuit-breaker policies.
pub mod breaker;
/// Built-in reviewer catalog.
pub mod catalog;
/// Keyword and file-based task classification.
pub mod classifier;
/// Team composition and topology selection.
pub mod composer;
/// TOML configuration.
pub mod config;
/// Planning and phased execution.
pub mod engine;
/// Weighted agent scoring.
pub mod ranker;
/// Agent capability registries.
pub mod registry;
/// Declarative schema validator.
pub mod schema;
/// Metrics, spans and health.
pub mod telemetry;
/// Shared orchestration types (ReviewTeam, RunReport, MetricPoint, etc.).
pub mod types;
/// Output contract trait and field-by-field validator.
pub mod validator;

pub use aggregator::aggregate;
pub use breaker::{BreakerPolicy, FailureRatePolicy};
pub use catalog::default_catalog;
pub use classifier::{TaskClassifier, TaskContext};
pub use composer::{
    select_implementer, select_topology, TeamComposer, TeamRequest, HIERARCHICAL_MIN,
    PEER_TO_PEER_MAX,
};
pub use config::{BreakerConfig, ExecutionConfig, OrchestratorConfig, TopologyConfig};
pub use engine::{ExecutionSubstrate, PhaseTask, ReviewOrchestrator, RunPlan};
pub use ranker::{AgentRanker, RankingOptions, ScoreBreakdown};
pub use registry::{AgentRegistry, StaticRegistry};
pub use schema::SchemaValidator;
pub use telemetry::{
    HealthStatus, NoopSpanBackend, ServiceStatus, SpanBackend, SpanGuard, Telemetry,
    TracingSpanBackend,
};
pub use types::{
    AgentSummary, CircuitBreakerState, CoordinationPattern, ExcludedAgent, ExclusionReason,
    MetricPoint, PhaseReport, ReviewTeam, RunReport, TeamSlot,
};
pub use validator::{validate_batch, BatchOutcome, FieldValidator, OutputValidator};
