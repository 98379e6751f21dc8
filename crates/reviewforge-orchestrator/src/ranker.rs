use reviewforge_core::{dimension, AgentDescriptor, AgentTier, RankedAgent, TaskProfile};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Weight of the review-dimension term in the overall score.
pub const DIMENSION_WEIGHT: f64 = 0.40;
/// Weight of the language term.
pub const LANGUAGE_WEIGHT: f64 = 0.30;
/// Weight of the domain term.
pub const DOMAIN_WEIGHT: f64 = 0.20;
/// Weight of the tier-preference term.
pub const TIER_WEIGHT: f64 = 0.10;
/// Value used for a term the profile carries no signal for.
pub const NEUTRAL: f64 = 0.5;

/// Caller preferences that influence scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingOptions {
    pub preferred_tier: Option<AgentTier>,
}

/// Per-term contributions for one agent, each normalised to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub dimension_match: f64,
    pub language_match: f64,
    pub domain_match: f64,
    pub tier_preference: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        DIMENSION_WEIGHT * self.dimension_match
            + LANGUAGE_WEIGHT * self.language_match
            + DOMAIN_WEIGHT * self.domain_match
            + TIER_WEIGHT * self.tier_preference
    }

    fn rationale(&self) -> String {
        format!(
            "dimension {:.2} x {DIMENSION_WEIGHT}, language {:.2} x {LANGUAGE_WEIGHT}, domain {:.2} x {DOMAIN_WEIGHT}, tier {:.2} x {TIER_WEIGHT}",
            self.dimension_match, self.language_match, self.domain_match, self.tier_preference
        )
    }
}

/// Scores registry entries against a task profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgentRanker {
    options: RankingOptions,
}

impl AgentRanker {
    pub fn new(options: RankingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> RankingOptions {
        self.options
    }

    /// Score a single agent.
    ///
    /// A term the profile has no signal for (no languages, no domains, no
    /// dimensions) is neutral for every agent, so an `unknown` profile
    /// still yields a usable ordering.
    pub fn score(&self, profile: &TaskProfile, agent: &AgentDescriptor) -> ScoreBreakdown {
        let dimension_match = if profile.review_dimensions.is_empty() {
            NEUTRAL
        } else {
            dimension_overlap(profile, agent)
        };
        let language_match = tag_match(&profile.languages, &agent.languages);
        let domain_match = tag_match(&profile.domains, &agent.domains);
        let tier_preference = match self.options.preferred_tier {
            None => NEUTRAL,
            Some(preferred) => {
                let distance = preferred.level().abs_diff(agent.tier.level());
                (1.0 - 0.5 * f64::from(distance)).max(0.0)
            }
        };
        ScoreBreakdown {
            dimension_match,
            language_match,
            domain_match,
            tier_preference,
        }
    }

    /// Rank every agent, best first; equal scores are ordered by agent id.
    pub fn rank(&self, profile: &TaskProfile, agents: &[AgentDescriptor]) -> Vec<RankedAgent> {
        let mut ranked: Vec<RankedAgent> = agents
            .iter()
            .map(|agent| {
                let breakdown = self.score(profile, agent);
                let score = breakdown.total();
                debug!(agent_id = %agent.id, score, "Scored agent");
                RankedAgent {
                    agent_id: agent.id.clone(),
                    score,
                    rationale: breakdown.rationale(),
                }
            })
            .collect();
        ranked.sort_by(compare_ranked);
        ranked
    }
}

/// Descending score, then ascending id.
pub fn compare_ranked(a: &RankedAgent, b: &RankedAgent) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.agent_id.cmp(&b.agent_id))
}

fn tag_match(
    wanted: &std::collections::BTreeSet<String>,
    offered: &std::collections::BTreeSet<String>,
) -> f64 {
    if wanted.is_empty() {
        NEUTRAL
    } else if wanted.iter().any(|t| offered.contains(t)) {
        1.0
    } else {
        0.0
    }
}

/// Cosine-style overlap between the profile's dimension weights and the
/// agent's capability scores.
///
/// Plain cosine ignores magnitude (an agent scoring 0.3 on a single
/// dimension looks identical to one scoring 0.95), so it is averaged with
/// the weight-normalised capability over the profile's dimensions.
fn dimension_overlap(profile: &TaskProfile, agent: &AgentDescriptor) -> f64 {
    let capabilities: Vec<(&str, f64)> = agent
        .capability_scores
        .iter()
        .filter(|(name, _)| name.as_str() != dimension::COORDINATION)
        .map(|(name, score)| (name.as_str(), *score))
        .collect();

    let dot: f64 = profile
        .review_dimensions
        .iter()
        .map(|(name, weight)| weight * agent.capability(name))
        .sum();
    let profile_norm: f64 = profile
        .review_dimensions
        .values()
        .map(|w| w * w)
        .sum::<f64>()
        .sqrt();
    let agent_norm: f64 = capabilities
        .iter()
        .map(|(_, s)| s * s)
        .sum::<f64>()
        .sqrt();
    let weight_sum: f64 = profile.review_dimensions.values().sum();

    if dot <= 0.0 || profile_norm == 0.0 || agent_norm == 0.0 || weight_sum == 0.0 {
        return 0.0;
    }
    let cosine = dot / (profile_norm * agent_norm);
    let coverage = dot / weight_sum;
    (0.5 * cosine + 0.5 * coverage).clamp(0.0, 1.0)
}
