//! Selection, validation and aggregation properties checked across the
//! built-in catalog and a synthetic registry.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use reviewforge_core::{dimension, AgentDescriptor, AgentOutput, Finding, Severity, TaskProfile, TaskType};
use reviewforge_orchestrator::*;
use serde_json::json;
use std::collections::HashSet;

fn compose(profile: &TaskProfile, agents: &[AgentDescriptor], max_agents: usize) -> ReviewTeam {
    let ranked = AgentRanker::default().rank(profile, agents);
    TeamComposer::default().compose(profile, &ranked, agents, TeamRequest::new(max_agents, 3))
}

fn synthetic_registry() -> Vec<AgentDescriptor> {
    let dims = [
        dimension::SECURITY,
        dimension::TESTING,
        dimension::PERFORMANCE,
        dimension::DOCUMENTATION,
        dimension::CODE_QUALITY,
        dimension::COMPLIANCE,
    ];
    let languages = ["python", "rust", "go"];
    let domains = ["web", "api", "payments"];
    (0..18)
        .map(|i| {
            AgentDescriptor::new(format!("agent-{i:02}"))
                .with_capability(dims[i % dims.len()], 0.5 + (i % 5) as f64 * 0.1)
                .with_languages([languages[i % languages.len()]])
                .with_domains([domains[(i / 3) % domains.len()]])
        })
        .collect()
}

fn profiles() -> Vec<TaskProfile> {
    vec![
        TaskProfile::unknown(),
        TaskProfile::new(TaskType::SecurityAudit).with_dimension(dimension::SECURITY, 0.9),
        TaskProfile::new(TaskType::SecurityAudit)
            .with_language("python")
            .with_dimension(dimension::SECURITY, 0.9)
            .with_dimension(dimension::CODE_QUALITY, 0.5),
        TaskProfile::new(TaskType::FeatureDevelopment)
            .with_language("rust")
            .with_language("go")
            .with_language("python")
            .with_domain("web")
            .with_domain("api")
            .with_domain("payments")
            .with_dimension(dimension::TESTING, 0.7),
    ]
}

fn registries() -> Vec<Vec<AgentDescriptor>> {
    vec![default_catalog(), synthetic_registry(), Vec::new()]
}

// ---------------------------------------------------------------------------
// 1. Team invariants over every cap
// ---------------------------------------------------------------------------

#[test]
fn team_never_exceeds_cap_and_has_no_duplicates() {
    for agents in registries() {
        for profile in profiles() {
            for max_agents in 0..=20 {
                let team = compose(&profile, &agents, max_agents);
                assert!(team.total_agents <= max_agents);
                assert_eq!(
                    team.total_agents,
                    team.core_agents.len() + team.language_agents.len() + team.domain_agents.len()
                );
                let ids = team.agent_ids();
                let unique: HashSet<&String> = ids.iter().collect();
                assert_eq!(unique.len(), ids.len(), "duplicate ids in {ids:?}");
            }
        }
    }
}

#[test]
fn topology_invariants_hold() {
    for agents in registries() {
        for profile in profiles() {
            for max_agents in 0..=20 {
                let team = compose(&profile, &agents, max_agents);
                if max_agents <= 1 {
                    assert_eq!(team.coordination_pattern, CoordinationPattern::PeerToPeer);
                    assert!(team.coordinator.is_none());
                }
                if team.total_agents >= 7 {
                    assert_eq!(team.coordination_pattern, CoordinationPattern::Hierarchical);
                    assert!(team.coordinator.is_some());
                    assert!(team.contains(team.coordinator.as_deref().unwrap()));
                } else {
                    assert!(team.coordinator.is_none());
                }
            }
        }
    }
}

#[test]
fn zero_cap_is_empty_peer_to_peer() {
    let team = compose(&profiles()[2], &default_catalog(), 0);
    assert_eq!(team.total_agents, 0);
    assert_eq!(team.coordination_pattern, CoordinationPattern::PeerToPeer);
}

#[test]
fn every_accepted_config_keeps_topology_bounds() {
    let mut reached_hierarchical = false;
    for min_categories in [0, 1, 2, 3, 5, 100] {
        let raw = format!("[topology]\nmaster_worker_min_categories = {min_categories}\n");
        let mut config = OrchestratorConfig::from_toml_str(&raw).unwrap();
        config.agents = synthetic_registry();
        let engine = ReviewOrchestrator::from_config(config);
        for profile in profiles() {
            let single = engine.select_team(&profile, 1);
            assert_eq!(single.coordination_pattern, CoordinationPattern::PeerToPeer);
            assert!(single.coordinator.is_none());
            for max_agents in 0..=20 {
                let team = engine.select_team(&profile, max_agents);
                if team.total_agents >= HIERARCHICAL_MIN {
                    reached_hierarchical = true;
                    assert_eq!(team.coordination_pattern, CoordinationPattern::Hierarchical);
                    assert!(team.coordinator.is_some());
                }
                if team.total_agents <= PEER_TO_PEER_MAX {
                    assert_eq!(team.coordination_pattern, CoordinationPattern::PeerToPeer);
                }
            }
        }
    }
    assert!(reached_hierarchical);
}

#[test]
fn topology_size_overrides_are_rejected() {
    for raw in [
        "[topology]\npeer_to_peer_max = 0\nhierarchical_min = 1\n",
        "[topology]\nhierarchical_min = 20\n",
    ] {
        assert!(OrchestratorConfig::from_toml_str(raw).is_err());
    }
}

// ---------------------------------------------------------------------------
// 2. Ranking
// ---------------------------------------------------------------------------

#[test]
fn security_only_profile_puts_security_agent_first() {
    let profile = TaskProfile::new(TaskType::Unknown).with_dimension(dimension::SECURITY, 0.9);
    for agents in [default_catalog(), synthetic_registry()] {
        let team = compose(&profile, &agents, 5);
        let first = &team.core_agents[0].agent_id;
        let descriptor = agents.iter().find(|a| &a.id == first).unwrap();
        assert!(descriptor.capability(dimension::SECURITY) > 0.0, "{first} is not security-capable");
    }
}

#[test]
fn unknown_profile_still_ranks_everyone() {
    let catalog = default_catalog();
    let ranked = AgentRanker::default().rank(&TaskProfile::unknown(), &catalog);
    assert_eq!(ranked.len(), catalog.len());
    for pair in ranked.windows(2) {
        assert!(pair[0].score > pair[1].score || pair[0].agent_id < pair[1].agent_id);
    }
}

#[test]
fn ranking_is_deterministic() {
    let profile = &profiles()[3];
    let agents = synthetic_registry();
    let mut reversed = agents.clone();
    reversed.reverse();
    let a = AgentRanker::default().rank(profile, &agents);
    let b = AgentRanker::default().rank(profile, &reversed);
    assert_eq!(a, b);
}

// ---------------------------------------------------------------------------
// 3. Security audit of a python change
// ---------------------------------------------------------------------------

#[test]
fn python_security_audit_team() {
    let profile = TaskProfile::new(TaskType::SecurityAudit)
        .with_language("python")
        .with_dimension(dimension::SECURITY, 0.9)
        .with_dimension(dimension::CODE_QUALITY, 0.5);
    let catalog = default_catalog();
    let team = compose(&profile, &catalog, 5);

    let descriptor = |id: &str| catalog.iter().find(|a| a.id == id).unwrap();
    assert!(team
        .core_agents
        .iter()
        .any(|a| descriptor(a.agent_id.as_str()).capability(dimension::SECURITY) >= 0.5));
    assert!(team
        .language_agents
        .iter()
        .any(|a| descriptor(a.agent_id.as_str()).languages.contains("python")));
    assert!(team.total_agents <= 5);
    let ids = team.agent_ids();
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), ids.len());
}

#[test]
fn classified_python_audit_selects_python_specialist() {
    let profile = TaskClassifier::new().classify(
        "Security audit: check the Flask login view for SQL injection",
        &TaskContext::with_files(["app/views.py"]),
    );
    assert_eq!(profile.task_type, TaskType::SecurityAudit);
    assert!(profile.languages.contains("python"));
    let team = compose(&profile, &default_catalog(), 8);
    assert!(team.contains("python-specialist"));
    assert!(team.contains("security-auditor"));
}

// ---------------------------------------------------------------------------
// 4. Implementer selection
// ---------------------------------------------------------------------------

#[test]
fn implementer_is_always_able_to_implement() {
    let catalog = default_catalog();
    for profile in profiles() {
        let chosen = select_implementer(&AgentRanker::default(), &profile, &catalog).unwrap();
        let descriptor = catalog.iter().find(|a| a.id == chosen).unwrap();
        assert!(descriptor.can_implement);
    }
    assert!(select_implementer(&AgentRanker::default(), &profiles()[0], &[]).is_none());
}

#[test]
fn implementer_follows_language() {
    let profile = TaskProfile::new(TaskType::BugFix).with_language("go");
    let chosen = select_implementer(&AgentRanker::default(), &profile, &default_catalog());
    assert_eq!(chosen.as_deref(), Some("go-specialist"));
}

// ---------------------------------------------------------------------------
// 5. Contract validation
// ---------------------------------------------------------------------------

fn conforming_finding() -> serde_json::Value {
    json!({
        "finding_id": "f1",
        "severity": "critical",
        "location": "app/views.py:17",
        "description": "Query built with string formatting",
        "recommendation": "Use parameterised queries",
        "agent_id": "a1",
        "confidence": 0.9
    })
}

#[test]
fn extreme_severity_points_at_first_finding() {
    let mut finding = conforming_finding();
    finding["severity"] = json!("extreme");
    let raw = json!({"agent_id": "a1", "phase": 2, "findings": [finding]});
    let validators: [&dyn OutputValidator; 2] = [&SchemaValidator::new(), &FieldValidator::new()];
    for validator in validators {
        let violation = validator.validate(&raw).unwrap_err();
        assert_eq!(violation.field_path, "findings[0].severity");
        assert_eq!(violation.agent_id, "a1");
    }
}

#[test]
fn violation_raised_only_for_contract_breaches() {
    let validator = SchemaValidator::new();
    let good = json!({"agent_id": "a1", "phase": 0, "findings": [conforming_finding()]});
    assert!(validator.validate(&good).is_ok());

    for key in ["finding_id", "severity", "location", "description", "recommendation", "agent_id", "confidence"] {
        let mut finding = conforming_finding();
        finding.as_object_mut().unwrap().remove(key);
        let raw = json!({"agent_id": "a1", "phase": 0, "findings": [finding]});
        let violation = validator.validate(&raw).unwrap_err();
        assert_eq!(violation.field_path, format!("findings[0].{key}"));
    }
    for confidence in [-0.01, 1.01] {
        let mut finding = conforming_finding();
        finding["confidence"] = json!(confidence);
        let raw = json!({"agent_id": "a1", "phase": 0, "findings": [finding]});
        assert!(validator.validate(&raw).is_err());
    }
}

#[test]
fn batch_keeps_good_outputs() {
    let good = json!({"agent_id": "a1", "phase": 1, "findings": [conforming_finding()]});
    let bad = json!({"agent_id": "a2", "phase": "one", "findings": []});
    let outcome = validate_batch(&FieldValidator::new(), [&bad, &good]);
    assert_eq!(outcome.accepted.len(), 1);
    assert_eq!(outcome.accepted[0].agent_id, "a1");
    assert_eq!(outcome.violations[0].field_path, "phase");
}

// ---------------------------------------------------------------------------
// 6. Aggregation
// ---------------------------------------------------------------------------

fn output(agent: &str, count: usize) -> AgentOutput {
    let findings = (0..count)
        .map(|i| Finding {
            finding_id: format!("{agent}-{i}"),
            severity: Severity::Medium,
            location: "src/lib.rs".to_string(),
            description: "Issue".to_string(),
            recommendation: "Fix it".to_string(),
            agent_id: agent.to_string(),
            confidence: 0.5,
        })
        .collect();
    AgentOutput::new(agent, 1, findings)
}

#[test]
fn aggregate_counts_and_preserves_order() {
    let results = aggregate(None, vec![output("first", 2), output("second", 3)]);
    assert_eq!(results.total_findings(), 5);
    assert_eq!(results.findings()[0].agent_id, "first");
    assert_eq!(results.findings()[1].agent_id, "first");
    assert_eq!(results.findings()[2].agent_id, "second");

    let empty = aggregate(Some("run".into()), Vec::new());
    assert_eq!(empty.total_findings(), 0);
}

#[test]
fn aggregate_total_matches_sum_for_many_shapes() {
    for sizes in [vec![], vec![0], vec![1, 0, 4], vec![3; 10]] {
        let outputs: Vec<AgentOutput> = sizes
            .iter()
            .enumerate()
            .map(|(i, n)| output(&format!("agent-{i}"), *n))
            .collect();
        let expected: usize = outputs.iter().map(|o| o.findings.len()).sum();
        assert_eq!(aggregate(None, outputs).total_findings(), expected);
    }
}
