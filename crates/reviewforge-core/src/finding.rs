use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Severity level of a reviewer finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Every accepted severity, most severe first.
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Parses the exact lowercase wire name.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reviewer observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub finding_id: String,
    pub severity: Severity,
    pub location: String,
    pub description: String,
    pub recommendation: String,
    pub agent_id: String,
    /// Confidence in `[0.0, 1.0]`.
    pub confidence: f64,
}

/// Validated output of one agent for one phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    pub agent_id: String,
    pub phase: u32,
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl AgentOutput {
    pub fn new(agent_id: impl Into<String>, phase: u32, findings: Vec<Finding>) -> Self {
        Self {
            agent_id: agent_id.into(),
            phase,
            findings,
            metadata: HashMap::new(),
        }
    }
}

/// Run-level merge of every validated agent output.
///
/// Fields are private so `total_findings` can only come from the
/// constructor, which recomputes it from the flattened findings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedResults {
    run_id: String,
    findings: Vec<Finding>,
    agent_outputs: Vec<AgentOutput>,
    total_findings: usize,
}

impl AggregatedResults {
    /// Flattens findings in arrival order and counts them.
    pub fn new(run_id: impl Into<String>, agent_outputs: Vec<AgentOutput>) -> Self {
        let findings: Vec<Finding> = agent_outputs
            .iter()
            .flat_map(|o| o.findings.iter().cloned())
            .collect();
        let total_findings = findings.len();
        Self {
            run_id: run_id.into(),
            findings,
            agent_outputs,
            total_findings,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn agent_outputs(&self) -> &[AgentOutput] {
        &self.agent_outputs
    }

    pub fn total_findings(&self) -> usize {
        self.total_findings
    }

    /// Number of findings per severity; severities with no findings are omitted.
    pub fn severity_counts(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::new();
        for finding in &self.findings {
            *counts.entry(finding.severity).or_insert(0) += 1;
        }
        counts
    }

    pub fn findings_by_agent<'a>(&'a self, agent_id: &'a str) -> impl Iterator<Item = &'a Finding> {
        self.findings.iter().filter(move |f| f.agent_id == agent_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(id: &str, agent: &str, severity: Severity) -> Finding {
        Finding {
            finding_id: id.to_string(),
            severity,
            location: "src/lib.rs:10".to_string(),
            description: "desc".to_string(),
            recommendation: "fix".to_string(),
            agent_id: agent.to_string(),
            confidence: 0.8,
        }
    }

    #[test]
    fn test_severity_parse_is_exact() {
        assert_eq!(Severity::parse("high"), Some(Severity::High));
        assert_eq!(Severity::parse("HIGH"), None);
        assert_eq!(Severity::parse("extreme"), None);
    }

    #[test]
    fn test_aggregated_results_counts() {
        let outputs = vec![
            AgentOutput::new("a1", 0, vec![finding("f1", "a1", Severity::High)]),
            AgentOutput::new(
                "a2",
                0,
                vec![
                    finding("f2", "a2", Severity::Low),
                    finding("f3", "a2", Severity::High),
                ],
            ),
        ];
        let results = AggregatedResults::new("run-1", outputs);
        assert_eq!(results.total_findings(), 3);
        assert_eq!(results.findings()[0].finding_id, "f1");
        assert_eq!(results.severity_counts().get(&Severity::High), Some(&2));
        assert_eq!(results.findings_by_agent("a2").count(), 2);
    }

    #[test]
    fn test_aggregated_results_empty() {
        let results = AggregatedResults::new("run-empty", Vec::new());
        assert_eq!(results.total_findings(), 0);
        assert!(results.severity_counts().is_empty());
    }

    #[test]
    fn test_agent_output_metadata_defaults() {
        let json = r#"{"agent_id":"a1","phase":1,"findings":[]}"#;
        let output: AgentOutput = serde_json::from_str(json).unwrap();
        assert!(output.metadata.is_empty());
    }
}
