use reviewforge_core::{AgentDescriptor, AgentTier, ReviewForgeError, ReviewForgeResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level engine configuration, usually read from `reviewforge.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Upper bound on the number of core agents picked by overall score.
    #[serde(default = "default_core_slots")]
    pub core_slots: usize,
    /// Default team cap when the caller does not pass one.
    #[serde(default = "default_max_agents")]
    pub max_agents: usize,
    #[serde(default)]
    pub preferred_tier: Option<AgentTier>,
    #[serde(default)]
    pub topology: TopologyConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub breaker: BreakerConfig,
    /// Optional catalog override; the built-in catalog is used when empty.
    #[serde(default)]
    pub agents: Vec<AgentDescriptor>,
}

/// Tuning for coordination pattern selection.
///
/// The size bounds themselves are fixed (see
/// [`composer::PEER_TO_PEER_MAX`](crate::composer::PEER_TO_PEER_MAX) and
/// [`composer::HIERARCHICAL_MIN`](crate::composer::HIERARCHICAL_MIN)); unknown
/// keys in this table are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopologyConfig {
    /// Mid-size teams spanning at least this many specialization
    /// categories use master-worker.
    #[serde(default = "default_master_worker_min_categories")]
    pub master_worker_min_categories: usize,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            master_worker_min_categories: default_master_worker_min_categories(),
        }
    }
}

/// Dispatch settings for the phase runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_agent_timeout_ms")]
    pub agent_timeout_ms: u64,
    #[serde(default = "default_phases")]
    pub phases: u32,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            agent_timeout_ms: default_agent_timeout_ms(),
            phases: default_phases(),
        }
    }
}

/// Parameters of the default failure-rate breaker policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakerConfig {
    #[serde(default = "default_failure_rate_threshold")]
    pub failure_rate_threshold: f64,
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    #[serde(default = "default_probation_successes")]
    pub probation_successes: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: default_failure_rate_threshold(),
            min_samples: default_min_samples(),
            probation_successes: default_probation_successes(),
        }
    }
}

fn default_service_name() -> String {
    "reviewforge".to_string()
}
fn default_core_slots() -> usize {
    3
}
fn default_max_agents() -> usize {
    5
}
fn default_master_worker_min_categories() -> usize {
    3
}
fn default_agent_timeout_ms() -> u64 {
    120_000
}
fn default_phases() -> u32 {
    1
}
fn default_failure_rate_threshold() -> f64 {
    0.5
}
fn default_min_samples() -> usize {
    4
}
fn default_probation_successes() -> u32 {
    1
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            core_slots: default_core_slots(),
            max_agents: default_max_agents(),
            preferred_tier: None,
            topology: TopologyConfig::default(),
            execution: ExecutionConfig::default(),
            breaker: BreakerConfig::default(),
            agents: Vec::new(),
        }
    }
}

impl OrchestratorConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> ReviewForgeResult<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| ReviewForgeError::Config(format!("Invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ReviewForgeResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ReviewForgeError::Config(format!(
                "Failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Reject values the engine cannot honour.
    pub fn validate(&self) -> ReviewForgeResult<()> {
        if !(0.0..=1.0).contains(&self.breaker.failure_rate_threshold) {
            return Err(ReviewForgeError::Config(format!(
                "breaker.failure_rate_threshold must be within [0, 1], got {}",
                self.breaker.failure_rate_threshold
            )));
        }
        if self.execution.agent_timeout_ms == 0 {
            return Err(ReviewForgeError::Config(
                "execution.agent_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
