use crate::config::TopologyConfig;
use crate::ranker::{compare_ranked, AgentRanker};
use crate::types::{AgentSummary, CoordinationPattern, ReviewTeam};
use reviewforge_core::{AgentDescriptor, RankedAgent, TaskProfile};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Category assigned to agents with no capability scores.
const GENERAL_CATEGORY: &str = "general";

/// Teams up to this size are always peer-to-peer.
pub const PEER_TO_PEER_MAX: usize = 3;
/// Teams of at least this size are always hierarchical.
pub const HIERARCHICAL_MIN: usize = 7;

/// Caller-supplied bounds for one team selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRequest {
    /// Hard cap on team size; `0` yields an empty team.
    pub max_agents: usize,
    /// Budget for agents picked purely by overall score.
    pub core_slots: usize,
    /// Only consider agents that can implement changes.
    #[serde(default)]
    pub implementer_mode: bool,
}

impl TeamRequest {
    pub fn new(max_agents: usize, core_slots: usize) -> Self {
        Self {
            max_agents,
            core_slots,
            implementer_mode: false,
        }
    }

    pub fn implementers_only(mut self) -> Self {
        self.implementer_mode = true;
        self
    }
}

/// One placed member while the team is being assembled.
#[derive(Debug, Clone)]
struct Placed {
    summary: AgentSummary,
    list: usize,
}

const CORE: usize = 0;
const LANGUAGE: usize = 1;
const DOMAIN: usize = 2;

/// Assembles bounded, deduplicated review teams and picks their topology.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeamComposer {
    topology: TopologyConfig,
}

impl TeamComposer {
    pub fn new(topology: TopologyConfig) -> Self {
        Self { topology }
    }

    /// Build a team from an already ranked list.
    ///
    /// `ranked` must come from the same `agents` slice; ids the slice does
    /// not know are skipped.
    pub fn compose(
        &self,
        profile: &TaskProfile,
        ranked: &[RankedAgent],
        agents: &[AgentDescriptor],
        request: TeamRequest,
    ) -> ReviewTeam {
        if request.max_agents == 0 || ranked.is_empty() {
            debug!(max_agents = request.max_agents, "Returning empty team");
            return ReviewTeam::empty();
        }

        let by_id: HashMap<&str, &AgentDescriptor> =
            agents.iter().map(|a| (a.id.as_str(), a)).collect();
        let mut pool: Vec<(&RankedAgent, &AgentDescriptor)> = ranked
            .iter()
            .filter_map(|r| by_id.get(r.agent_id.as_str()).map(|d| (r, *d)))
            .filter(|(_, d)| !request.implementer_mode || d.can_implement)
            .collect();
        pool.sort_by(|a, b| compare_ranked(a.0, b.0));

        let mut placed: Vec<Placed> = Vec::new();
        let mut taken: HashSet<&str> = HashSet::new();

        let reserved = sole_providers(profile, &pool);
        let core_pool = pool
            .iter()
            .filter(|(r, _)| !reserved.contains(r.agent_id.as_str()));
        for (ranked_agent, descriptor) in core_pool.take(request.core_slots) {
            taken.insert(ranked_agent.agent_id.as_str());
            placed.push(Placed {
                summary: summarize(ranked_agent, descriptor),
                list: CORE,
            });
        }

        self.place_specialists(&profile.languages, LANGUAGE, &pool, &mut taken, &mut placed, |d| {
            &d.languages
        });
        self.place_specialists(&profile.domains, DOMAIN, &pool, &mut taken, &mut placed, |d| {
            &d.domains
        });

        if placed.len() > request.max_agents {
            debug!(
                unconstrained = placed.len(),
                max_agents = request.max_agents,
                "Truncating team to cap"
            );
            placed = truncate(placed, request.max_agents);
        }

        let team = self.finish(placed, &by_id);
        info!(
            total_agents = team.total_agents,
            pattern = %team.coordination_pattern,
            coordinator = ?team.coordinator,
            "Composed review team"
        );
        team
    }

    /// For each tag the profile wants, the best not-yet-placed agent offering it.
    fn place_specialists<'a>(
        &self,
        wanted: &BTreeSet<String>,
        list: usize,
        pool: &[(&'a RankedAgent, &'a AgentDescriptor)],
        taken: &mut HashSet<&'a str>,
        placed: &mut Vec<Placed>,
        tags: impl Fn(&AgentDescriptor) -> &BTreeSet<String>,
    ) {
        for tag in wanted {
            let candidate = pool
                .iter()
                .find(|(r, d)| !taken.contains(r.agent_id.as_str()) && tags(*d).contains(tag));
            match candidate {
                Some((ranked_agent, descriptor)) => {
                    taken.insert(ranked_agent.agent_id.as_str());
                    placed.push(Placed {
                        summary: summarize(ranked_agent, descriptor),
                        list,
                    });
                }
                None => debug!(tag = %tag, "No unplaced specialist for tag"),
            }
        }
    }

    fn finish(&self, placed: Vec<Placed>, by_id: &HashMap<&str, &AgentDescriptor>) -> ReviewTeam {
        let mut team = ReviewTeam::empty();
        for member in placed {
            match member.list {
                CORE => team.core_agents.push(member.summary),
                LANGUAGE => team.language_agents.push(member.summary),
                _ => team.domain_agents.push(member.summary),
            }
        }
        team.total_agents =
            team.core_agents.len() + team.language_agents.len() + team.domain_agents.len();

        let categories: HashSet<&str> = team.members().map(|(_, a)| a.category.as_str()).collect();
        team.coordination_pattern = select_topology(&self.topology, team.total_agents, categories.len());

        if team.coordination_pattern == CoordinationPattern::Hierarchical {
            team.coordinator = pick_coordinator(&team, by_id);
        }
        team
    }
}

/// Agents that are the only pool member offering a wanted language or
/// domain. Core placement skips them so the tag keeps its specialist.
fn sole_providers<'a>(
    profile: &TaskProfile,
    pool: &[(&'a RankedAgent, &'a AgentDescriptor)],
) -> HashSet<&'a str> {
    let wanted = profile
        .languages
        .iter()
        .map(|tag| (tag, LANGUAGE))
        .chain(profile.domains.iter().map(|tag| (tag, DOMAIN)));
    let mut reserved = HashSet::new();
    for (tag, list) in wanted {
        let mut providers = pool.iter().filter(|(_, d)| {
            if list == LANGUAGE {
                d.languages.contains(tag)
            } else {
                d.domains.contains(tag)
            }
        });
        if let (Some((r, _)), None) = (providers.next(), providers.next()) {
            reserved.insert(r.agent_id.as_str());
        }
    }
    reserved
}

/// Topology as a pure function of team size and category diversity.
///
/// Only the master-worker category threshold is tunable; the size bounds
/// are fixed.
pub fn select_topology(
    topology: &TopologyConfig,
    total_agents: usize,
    distinct_categories: usize,
) -> CoordinationPattern {
    if total_agents <= PEER_TO_PEER_MAX {
        CoordinationPattern::PeerToPeer
    } else if total_agents >= HIERARCHICAL_MIN {
        CoordinationPattern::Hierarchical
    } else if distinct_categories >= topology.master_worker_min_categories {
        CoordinationPattern::MasterWorker
    } else {
        CoordinationPattern::PeerToPeer
    }
}

/// Best core agent carrying the coordinator tag, else the best core agent,
/// else (no core slots configured) the best member overall.
fn pick_coordinator(
    team: &ReviewTeam,
    by_id: &HashMap<&str, &AgentDescriptor>,
) -> Option<String> {
    let tagged = team.core_agents.iter().filter(|a| {
        by_id
            .get(a.agent_id.as_str())
            .is_some_and(|d| d.is_coordinator())
    });
    highest_scoring(tagged)
        .or_else(|| highest_scoring(team.core_agents.iter()))
        .or_else(|| highest_scoring(team.members().map(|(_, a)| a)))
}

fn highest_scoring<'a>(members: impl Iterator<Item = &'a AgentSummary>) -> Option<String> {
    members
        .max_by(|a, b| {
            a.score
                .total_cmp(&b.score)
                .then_with(|| b.agent_id.cmp(&a.agent_id))
        })
        .map(|a| a.agent_id.clone())
}

/// Descending score, then ascending id.
fn by_score(a: &Placed, b: &Placed) -> Ordering {
    b.summary
        .score
        .total_cmp(&a.summary.score)
        .then_with(|| a.summary.agent_id.cmp(&b.summary.agent_id))
}

/// Drop lowest scorers until the cap holds, keeping the top core agent and
/// the best language and domain specialist while the cap allows.
fn truncate(placed: Vec<Placed>, max_agents: usize) -> Vec<Placed> {
    let mut keep: HashSet<String> = HashSet::new();
    for list in [CORE, LANGUAGE, DOMAIN] {
        if keep.len() >= max_agents {
            break;
        }
        if let Some(best) = placed
            .iter()
            .filter(|p| p.list == list)
            .min_by(|a, b| by_score(a, b))
        {
            keep.insert(best.summary.agent_id.clone());
        }
    }

    let mut rest: Vec<&Placed> = placed
        .iter()
        .filter(|p| !keep.contains(&p.summary.agent_id))
        .collect();
    rest.sort_by(|a, b| by_score(a, b));
    for member in rest {
        if keep.len() >= max_agents {
            break;
        }
        keep.insert(member.summary.agent_id.clone());
    }

    placed
        .into_iter()
        .filter(|p| keep.contains(&p.summary.agent_id))
        .collect()
}

fn summarize(ranked: &RankedAgent, descriptor: &AgentDescriptor) -> AgentSummary {
    AgentSummary {
        agent_id: ranked.agent_id.clone(),
        score: ranked.score,
        category: descriptor
            .primary_dimension()
            .unwrap_or(GENERAL_CATEGORY)
            .to_string(),
    }
}

/// Pick the single best agent able to implement a change.
///
/// Scoring matches team selection; equal scores prefer the stronger language
/// match, then the stronger domain match, then the lower id. When no agent
/// can implement, the best agent overall is returned instead, so `None`
/// means the registry is empty.
pub fn select_implementer(
    ranker: &AgentRanker,
    profile: &TaskProfile,
    agents: &[AgentDescriptor],
) -> Option<String> {
    let implementers: Vec<&AgentDescriptor> = agents.iter().filter(|a| a.can_implement).collect();
    let candidates: Vec<&AgentDescriptor> = if implementers.is_empty() {
        if !agents.is_empty() {
            warn!("No agent can implement; falling back to best overall agent");
        }
        agents.iter().collect()
    } else {
        implementers
    };

    candidates
        .into_iter()
        .map(|agent| (agent, ranker.score(profile, agent)))
        .max_by(|(a, sa), (b, sb)| {
            sa.total()
                .total_cmp(&sb.total())
                .then_with(|| sa.language_match.total_cmp(&sb.language_match))
                .then_with(|| sa.domain_match.total_cmp(&sb.domain_match))
                .then_with(|| b.id.cmp(&a.id))
        })
        .map(|(agent, _)| agent.id.clone())
}
