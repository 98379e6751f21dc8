use chrono::{DateTime, Utc};
use reviewforge_core::AggregatedResults;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Topology used to organise a selected team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoordinationPattern {
    #[default]
    PeerToPeer,
    MasterWorker,
    Hierarchical,
}

impl std::fmt::Display for CoordinationPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinationPattern::PeerToPeer => write!(f, "peer-to-peer"),
            CoordinationPattern::MasterWorker => write!(f, "master-worker"),
            CoordinationPattern::Hierarchical => write!(f, "hierarchical"),
        }
    }
}

/// Which list of a [`ReviewTeam`] an agent was placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamSlot {
    Core,
    Language,
    Domain,
}

/// Short description of a selected agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub agent_id: String,
    pub score: f64,
    /// Specialisation used for diversity counting: the dominant capability
    /// for core agents, the language or domain for specialists.
    pub category: String,
}

/// A bounded, deduplicated team and its coordination topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewTeam {
    pub core_agents: Vec<AgentSummary>,
    pub language_agents: Vec<AgentSummary>,
    pub domain_agents: Vec<AgentSummary>,
    pub coordinator: Option<String>,
    pub coordination_pattern: CoordinationPattern,
    pub total_agents: usize,
}

impl ReviewTeam {
    /// A team with no members.
    pub fn empty() -> Self {
        Self {
            core_agents: Vec::new(),
            language_agents: Vec::new(),
            domain_agents: Vec::new(),
            coordinator: None,
            coordination_pattern: CoordinationPattern::PeerToPeer,
            total_agents: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_agents == 0
    }

    /// Every member id in slot order: core, language, domain.
    pub fn agent_ids(&self) -> Vec<String> {
        self.members().map(|(_, a)| a.agent_id.clone()).collect()
    }

    pub fn members(&self) -> impl Iterator<Item = (TeamSlot, &AgentSummary)> {
        self.core_agents
            .iter()
            .map(|a| (TeamSlot::Core, a))
            .chain(self.language_agents.iter().map(|a| (TeamSlot::Language, a)))
            .chain(self.domain_agents.iter().map(|a| (TeamSlot::Domain, a)))
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.members().any(|(_, a)| a.agent_id == agent_id)
    }
}

/// Three-state guard over phase dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitBreakerState {
    #[default]
    Closed,
    Open,
    HalfOpen,
}

impl CircuitBreakerState {
    /// Whether a new phase may be dispatched in this state.
    pub fn allows_dispatch(self) -> bool {
        !matches!(self, CircuitBreakerState::Open)
    }

    /// Numeric encoding used for the breaker gauge metric.
    pub fn as_gauge(self) -> f64 {
        match self {
            CircuitBreakerState::Closed => 0.0,
            CircuitBreakerState::HalfOpen => 1.0,
            CircuitBreakerState::Open => 2.0,
        }
    }
}

impl std::fmt::Display for CircuitBreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitBreakerState::Closed => write!(f, "CLOSED"),
            CircuitBreakerState::Open => write!(f, "OPEN"),
            CircuitBreakerState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// One recorded measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl MetricPoint {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            timestamp: Utc::now(),
            labels: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Why an agent's output was left out of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExclusionReason {
    ContractViolation { field_path: String, detail: String },
    ExecutionFailed { error: String },
    TimedOut { timeout_ms: u64 },
}

/// An agent excluded from one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedAgent {
    pub agent_id: String,
    pub reason: ExclusionReason,
}

/// Outcome of one dispatched phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub phase: u32,
    pub dispatched: usize,
    pub accepted: usize,
    pub excluded: Vec<ExcludedAgent>,
    pub finding_count: usize,
    pub duration_ms: u64,
}

impl PhaseReport {
    pub fn failure_count(&self) -> usize {
        self.excluded.len()
    }
}

/// Everything an operator needs after a run: validated results plus
/// per-phase degradation.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub results: AggregatedResults,
    pub phases: Vec<PhaseReport>,
    pub cancelled: bool,
    pub halted_by_breaker: bool,
}

impl RunReport {
    pub fn total_findings(&self) -> usize {
        self.results.total_findings()
    }

    pub fn excluded_agents(&self) -> usize {
        self.phases.iter().map(PhaseReport::failure_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: &str) -> AgentSummary {
        AgentSummary {
            agent_id: id.to_string(),
            score: 0.5,
            category: "security".to_string(),
        }
    }

    #[test]
    fn test_empty_team() {
        let team = ReviewTeam::empty();
        assert!(team.is_empty());
        assert_eq!(team.coordination_pattern, CoordinationPattern::PeerToPeer);
        assert!(team.coordinator.is_none());
    }

    #[test]
    fn test_team_members_in_slot_order() {
        let mut team = ReviewTeam::empty();
        team.core_agents.push(summary("c"));
        team.language_agents.push(summary("l"));
        team.domain_agents.push(summary("d"));
        team.total_agents = 3;
        assert_eq!(team.agent_ids(), vec!["c", "l", "d"]);
        assert!(team.contains("l"));
        let slots: Vec<TeamSlot> = team.members().map(|(s, _)| s).collect();
        assert_eq!(slots, vec![TeamSlot::Core, TeamSlot::Language, TeamSlot::Domain]);
    }

    #[test]
    fn test_pattern_serialization() {
        let json = serde_json::to_string(&CoordinationPattern::PeerToPeer).unwrap();
        assert_eq!(json, "\"peer-to-peer\"");
        assert_eq!(CoordinationPattern::MasterWorker.to_string(), "master-worker");
    }

    #[test]
    fn test_breaker_state_wire_names() {
        let json = serde_json::to_string(&CircuitBreakerState::HalfOpen).unwrap();
        assert_eq!(json, "\"HALF_OPEN\"");
        assert!(!CircuitBreakerState::Open.allows_dispatch());
        assert!(CircuitBreakerState::HalfOpen.allows_dispatch());
    }

    #[test]
    fn test_exclusion_reason_tagged() {
        let reason = ExclusionReason::TimedOut { timeout_ms: 500 };
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["kind"], "timed_out");
        assert_eq!(json["timeout_ms"], 500);
    }
}
