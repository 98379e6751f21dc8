use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Well-known review dimension names.
///
/// Dimensions are open-ended strings; these are the ones the classifier and
/// the built-in catalog agree on.
pub mod dimension {
    /// Vulnerabilities, authn/authz, injection.
    pub const SECURITY: &str = "security";
    /// Test coverage and test quality.
    pub const TESTING: &str = "testing";
    /// Latency, throughput, memory.
    pub const PERFORMANCE: &str = "performance";
    /// Docs, comments, READMEs.
    pub const DOCUMENTATION: &str = "documentation";
    /// Readability, maintainability, style.
    pub const CODE_QUALITY: &str = "code_quality";
    /// Regulatory and policy requirements.
    pub const COMPLIANCE: &str = "compliance";
    /// Module boundaries and design.
    pub const ARCHITECTURE: &str = "architecture";
    /// Deployment, CI, observability.
    pub const OPERATIONS: &str = "operations";
    /// Ability to coordinate other agents.
    pub const COORDINATION: &str = "coordination";
}

/// Kind of work a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    SecurityAudit,
    BugFix,
    FeatureDevelopment,
    Refactoring,
    Documentation,
    Testing,
    #[default]
    Unknown,
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskType::SecurityAudit => write!(f, "security_audit"),
            TaskType::BugFix => write!(f, "bug_fix"),
            TaskType::FeatureDevelopment => write!(f, "feature_development"),
            TaskType::Refactoring => write!(f, "refactoring"),
            TaskType::Documentation => write!(f, "documentation"),
            TaskType::Testing => write!(f, "testing"),
            TaskType::Unknown => write!(f, "unknown"),
        }
    }
}

/// Ordinal complexity estimate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Trivial,
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Complexity {
    /// One step up, saturating at [`Complexity::Critical`].
    pub fn raise(self) -> Self {
        match self {
            Complexity::Trivial => Complexity::Low,
            Complexity::Low => Complexity::Medium,
            Complexity::Medium => Complexity::High,
            Complexity::High | Complexity::Critical => Complexity::Critical,
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Complexity::Trivial => write!(f, "trivial"),
            Complexity::Low => write!(f, "low"),
            Complexity::Medium => write!(f, "medium"),
            Complexity::High => write!(f, "high"),
            Complexity::Critical => write!(f, "critical"),
        }
    }
}

/// Immutable classification of one unit of work.
///
/// Built once per run by the classifier and only read afterwards by the
/// ranker and the team composer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskProfile {
    pub task_type: TaskType,
    #[serde(default)]
    pub languages: BTreeSet<String>,
    #[serde(default)]
    pub frameworks: BTreeSet<String>,
    #[serde(default)]
    pub domains: BTreeSet<String>,
    /// Dimension name -> weight in `[0.0, 1.0]`.
    #[serde(default)]
    pub review_dimensions: BTreeMap<String, f64>,
    #[serde(default)]
    pub complexity: Complexity,
    #[serde(default)]
    pub keywords: BTreeSet<String>,
}

impl TaskProfile {
    /// The generic profile returned for empty or unrecognised input.
    pub fn unknown() -> Self {
        Self {
            task_type: TaskType::Unknown,
            complexity: Complexity::Trivial,
            ..Self::default()
        }
    }

    pub fn new(task_type: TaskType) -> Self {
        Self {
            task_type,
            ..Self::default()
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.languages.insert(language.into().to_lowercase());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domains.insert(domain.into().to_lowercase());
        self
    }

    pub fn with_framework(mut self, framework: impl Into<String>) -> Self {
        self.frameworks.insert(framework.into().to_lowercase());
        self
    }

    /// Sets a dimension weight, clamped to `[0.0, 1.0]`.
    pub fn with_dimension(mut self, name: impl Into<String>, weight: f64) -> Self {
        self.review_dimensions
            .insert(name.into(), weight.clamp(0.0, 1.0));
        self
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = complexity;
        self
    }

    /// Weight of a dimension, `0.0` when absent.
    pub fn dimension_weight(&self, name: &str) -> f64 {
        self.review_dimensions.get(name).copied().unwrap_or(0.0)
    }

    /// `true` when the profile carries no language, domain or dimension
    /// signal, i.e. the ranker has to fall back to neutral terms.
    pub fn has_no_signal(&self) -> bool {
        self.languages.is_empty() && self.domains.is_empty() && self.review_dimensions.is_empty()
    }
}
