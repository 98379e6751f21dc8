use thiserror::Error;

/// A convenience `Result` alias using [`ReviewForgeError`].
pub type ReviewForgeResult<T> = Result<T, ReviewForgeError>;

/// Top-level error type for the reviewforge engine.
///
/// Only contract violations are expected on the hot path; everything else
/// (empty teams, dropped agents, an open breaker) is represented as data.
#[derive(Error, Debug)]
pub enum ReviewForgeError {
    /// Configuration could not be parsed or is inconsistent.
    #[error("Config error: {0}")]
    Config(String),

    /// The capability registry could not be built or read.
    #[error("Registry error: {0}")]
    Registry(String),

    /// The execution substrate failed to run an agent.
    #[error("Execution error: {0}")]
    Execution(String),

    /// An agent output did not match the required schema.
    #[error(transparent)]
    Contract(#[from] AgentContractViolation),

    /// An error raised by the orchestration engine itself.
    #[error("Orchestrator error: {0}")]
    Orchestrator(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A structural mismatch between an agent's raw output and the
/// `AgentOutput`/`Finding` schema.
///
/// Carries enough context to locate the offending field without going back
/// to the logs: `field_path` uses `findings[0].severity` notation, `$` for the
/// record root.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "Contract violation by agent '{agent_id}' at '{field_path}': expected {expected_type}, got {received_value}"
)]
pub struct AgentContractViolation {
    /// Agent that produced the record, or `<unknown>` when the id itself is bad.
    pub agent_id: String,
    /// Path of the offending field.
    pub field_path: String,
    /// Human-readable description of what the schema requires.
    pub expected_type: String,
    /// The received value rendered as JSON (`<missing>` when absent).
    pub received_value: String,
}

impl AgentContractViolation {
    /// Placeholder used when the record does not carry a usable agent id.
    pub const UNKNOWN_AGENT: &'static str = "<unknown>";
    /// Placeholder used when the field is absent.
    pub const MISSING: &'static str = "<missing>";

    /// Creates a new violation.
    pub fn new(
        agent_id: impl Into<String>,
        field_path: impl Into<String>,
        expected_type: impl Into<String>,
        received_value: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            field_path: field_path.into(),
            expected_type: expected_type.into(),
            received_value: received_value.into(),
        }
    }

    /// Creates a violation for a field that is absent from the record.
    pub fn missing(
        agent_id: impl Into<String>,
        field_path: impl Into<String>,
        expected_type: impl Into<String>,
    ) -> Self {
        Self::new(agent_id, field_path, expected_type, Self::MISSING)
    }

    /// Returns `true` when the violation was caused by an absent field.
    pub fn is_missing_field(&self) -> bool {
        self.received_value == Self::MISSING
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_display_names_field() {
        let v = AgentContractViolation::new(
            "a1",
            "findings[0].severity",
            "one of critical|high|medium|low",
            "\"extreme\"",
        );
        let msg = v.to_string();
        assert!(msg.contains("a1"));
        assert!(msg.contains("findings[0].severity"));
        assert!(msg.contains("extreme"));
    }

    #[test]
    fn test_violation_converts_into_error() {
        let v = AgentContractViolation::missing("a1", "phase", "integer >= 0");
        assert!(v.is_missing_field());
        let err: ReviewForgeError = v.into();
        assert!(matches!(err, ReviewForgeError::Contract(_)));
        assert!(err.to_string().contains("phase"));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: ReviewForgeError = parse.unwrap_err().into();
        assert!(err.to_string().starts_with("JSON error"));
    }
}
