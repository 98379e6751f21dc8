use crate::profile::dimension;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Cost/capability class of an agent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AgentTier {
    Economy,
    #[default]
    Standard,
    Premium,
}

impl AgentTier {
    /// Position on the cost ladder, used to measure tier distance.
    pub fn level(self) -> u8 {
        match self {
            AgentTier::Economy => 0,
            AgentTier::Standard => 1,
            AgentTier::Premium => 2,
        }
    }
}

impl std::fmt::Display for AgentTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentTier::Economy => write!(f, "economy"),
            AgentTier::Standard => write!(f, "standard"),
            AgentTier::Premium => write!(f, "premium"),
        }
    }
}

/// Capability descriptor supplied by the agent registry. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub id: String,
    /// Dimension name -> score in `[0.0, 1.0]`.
    #[serde(default)]
    pub capability_scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub languages: BTreeSet<String>,
    #[serde(default)]
    pub domains: BTreeSet<String>,
    #[serde(default)]
    pub can_implement: bool,
    #[serde(default)]
    pub tier: AgentTier,
}

impl AgentDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            capability_scores: BTreeMap::new(),
            languages: BTreeSet::new(),
            domains: BTreeSet::new(),
            can_implement: false,
            tier: AgentTier::Standard,
        }
    }

    /// Adds a capability score, clamped to `[0.0, 1.0]`.
    pub fn with_capability(mut self, dimension: impl Into<String>, score: f64) -> Self {
        self.capability_scores
            .insert(dimension.into(), score.clamp(0.0, 1.0));
        self
    }

    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages
            .extend(languages.into_iter().map(|l| l.into().to_lowercase()));
        self
    }

    pub fn with_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.domains
            .extend(domains.into_iter().map(|d| d.into().to_lowercase()));
        self
    }

    pub fn with_tier(mut self, tier: AgentTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn implementer(mut self) -> Self {
        self.can_implement = true;
        self
    }

    pub fn capability(&self, dimension: &str) -> f64 {
        self.capability_scores.get(dimension).copied().unwrap_or(0.0)
    }

    /// Whether this agent carries the coordinator capability tag, either in
    /// its id or as a non-zero `coordination` score.
    pub fn is_coordinator(&self) -> bool {
        self.id.to_lowercase().contains("coordinator")
            || self.capability(dimension::COORDINATION) > 0.0
    }

    /// The dimension this agent scores highest on, ties broken by name.
    /// `coordination` is ignored since it is a role, not a review area.
    pub fn primary_dimension(&self) -> Option<&str> {
        self.capability_scores
            .iter()
            .filter(|(name, score)| name.as_str() != dimension::COORDINATION && **score > 0.0)
            .fold(None::<(&str, f64)>, |best, (name, score)| match best {
                Some((_, best_score)) if best_score >= *score => best,
                _ => Some((name.as_str(), *score)),
            })
            .map(|(name, _)| name)
    }
}

/// One agent scored against a task profile. Produced per selection call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedAgent {
    pub agent_id: String,
    pub score: f64,
    pub rationale: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_builder() {
        let agent = AgentDescriptor::new("python-specialist")
            .with_capability(dimension::CODE_QUALITY, 0.8)
            .with_languages(["Python"])
            .with_domains(["web", "api"])
            .with_tier(AgentTier::Economy)
            .implementer();
        assert!(agent.languages.contains("python"));
        assert_eq!(agent.domains.len(), 2);
        assert!(agent.can_implement);
        assert_eq!(agent.tier, AgentTier::Economy);
        assert_eq!(agent.capability(dimension::SECURITY), 0.0);
    }

    #[test]
    fn test_coordinator_detection() {
        assert!(AgentDescriptor::new("review-coordinator").is_coordinator());
        assert!(AgentDescriptor::new("lead")
            .with_capability(dimension::COORDINATION, 0.9)
            .is_coordinator());
        assert!(!AgentDescriptor::new("security-auditor").is_coordinator());
    }

    #[test]
    fn test_primary_dimension_prefers_highest_score() {
        let agent = AgentDescriptor::new("a")
            .with_capability(dimension::COORDINATION, 1.0)
            .with_capability(dimension::SECURITY, 0.9)
            .with_capability(dimension::TESTING, 0.4);
        assert_eq!(agent.primary_dimension(), Some(dimension::SECURITY));
        assert_eq!(AgentDescriptor::new("empty").primary_dimension(), None);
    }

    #[test]
    fn test_descriptor_deserializes_with_defaults() {
        let agent: AgentDescriptor = serde_json::from_str(r#"{"id": "bare"}"#).unwrap();
        assert_eq!(agent.tier, AgentTier::Standard);
        assert!(!agent.can_implement);
        assert!(agent.capability_scores.is_empty());
    }

    #[test]
    fn test_tier_ordering() {
        assert!(AgentTier::Economy < AgentTier::Premium);
        assert_eq!(AgentTier::Premium.level() - AgentTier::Economy.level(), 2);
        assert_eq!(AgentTier::Standard.to_string(), "standard");
    }
}
