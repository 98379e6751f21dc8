use crate::aggregator::aggregate;
use crate::breaker::{BreakerPolicy, FailureRatePolicy};
use crate::classifier::{TaskClassifier, TaskContext};
use crate::composer::{select_implementer, TeamComposer, TeamRequest};
use crate::config::OrchestratorConfig;
use crate::ranker::{AgentRanker, RankingOptions};
use crate::registry::{AgentRegistry, StaticRegistry};
use crate::schema::SchemaValidator;
use crate::telemetry::Telemetry;
use crate::types::{ExcludedAgent, ExclusionReason, PhaseReport, ReviewTeam, RunReport};
use crate::validator::OutputValidator;
use async_trait::async_trait;
use futures_util::future::join_all;
use parking_lot::Mutex;
use reviewforge_core::{
    AgentContractViolation, AgentOutput, RankedAgent, ReviewForgeResult, TaskProfile,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

/// Runs one agent for one phase and returns its raw, unvalidated record.
///
/// Retries are the substrate's business; the engine applies its own
/// per-agent timeout on top.
#[async_trait]
pub trait ExecutionSubstrate: Send + Sync {
    async fn execute(
        &self,
        agent_id: &str,
        phase: u32,
        task: &PhaseTask,
    ) -> ReviewForgeResult<serde_json::Value>;
}

/// Context handed to every agent dispatched in a phase.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseTask {
    pub run_id: String,
    pub phase: u32,
    pub total_phases: u32,
    pub description: String,
    pub profile: TaskProfile,
    pub team: ReviewTeam,
}

/// Everything decided before dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct RunPlan {
    pub description: String,
    pub profile: TaskProfile,
    pub ranked: Vec<RankedAgent>,
    pub team: ReviewTeam,
}

/// Classifies work, selects a team, runs it phase by phase and folds the
/// validated outputs into one report.
pub struct ReviewOrchestrator {
    config: OrchestratorConfig,
    registry: Arc<dyn AgentRegistry>,
    classifier: TaskClassifier,
    ranker: AgentRanker,
    composer: TeamComposer,
    validator: Arc<dyn OutputValidator>,
    telemetry: Arc<Telemetry>,
    breaker: Mutex<Box<dyn BreakerPolicy>>,
}

impl ReviewOrchestrator {
    pub fn new(config: OrchestratorConfig, registry: Arc<dyn AgentRegistry>) -> Self {
        let ranker = AgentRanker::new(RankingOptions {
            preferred_tier: config.preferred_tier,
        });
        let composer = TeamComposer::new(config.topology);
        let telemetry = Arc::new(Telemetry::with_tracing(config.service_name.clone()));
        let breaker: Box<dyn BreakerPolicy> =
            Box::new(FailureRatePolicy::from_config(&config.breaker));
        Self {
            config,
            registry,
            classifier: TaskClassifier::new(),
            ranker,
            composer,
            validator: Arc::new(SchemaValidator::new()),
            telemetry,
            breaker: Mutex::new(breaker),
        }
    }

    /// Engine over the configured `[[agents]]`, or the built-in catalog when
    /// none are configured.
    pub fn from_config(config: OrchestratorConfig) -> Self {
        let registry = if config.agents.is_empty() {
            StaticRegistry::with_default_catalog()
        } else {
            StaticRegistry::from_descriptors(config.agents.clone())
        };
        Self::new(config, Arc::new(registry))
    }

    pub fn with_validator(mut self, validator: Arc<dyn OutputValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<Telemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_breaker_policy(mut self, policy: Box<dyn BreakerPolicy>) -> Self {
        self.breaker = Mutex::new(policy);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn telemetry(&self) -> &Arc<Telemetry> {
        &self.telemetry
    }

    pub fn classify(&self, description: &str, context: &TaskContext) -> TaskProfile {
        self.classifier.classify(description, context)
    }

    pub fn rank(&self, profile: &TaskProfile) -> Vec<RankedAgent> {
        self.ranker.rank(profile, &self.registry.descriptors())
    }

    /// Rank and compose a team capped at `max_agents`, recording each
    /// member's selection in telemetry.
    pub fn select_team(&self, profile: &TaskProfile, max_agents: usize) -> ReviewTeam {
        self.select(profile, max_agents).1
    }

    pub fn select_implementer(&self, profile: &TaskProfile) -> Option<String> {
        select_implementer(&self.ranker, profile, &self.registry.descriptors())
    }

    /// Classify, rank and compose with the configured team cap.
    pub fn plan(&self, description: &str, context: &TaskContext) -> RunPlan {
        let region = self.telemetry.span("plan", &[]);
        let _entered = region.enter();
        let profile = self.classify(description, context);
        let (ranked, team) = self.select(&profile, self.config.max_agents);
        info!(
            task_type = %profile.task_type,
            complexity = ?profile.complexity,
            ranked = ranked.len(),
            team = team.total_agents,
            "Planned review run"
        );
        RunPlan {
            description: description.to_string(),
            profile,
            ranked,
            team,
        }
    }

    /// Validate one raw record, counting a violation in telemetry.
    pub fn validate(&self, raw: &serde_json::Value) -> Result<AgentOutput, AgentContractViolation> {
        self.validator.validate(raw).inspect_err(|violation| {
            self.telemetry
                .record_contract_violation(&violation.agent_id, &violation.field_path);
        })
    }

    /// Move an open breaker into probation so the next run may dispatch.
    pub fn probe_breaker(&self) {
        let current = self.telemetry.circuit_breaker_state();
        let next = self.breaker.lock().on_probe(current);
        if next != current {
            self.telemetry.set_circuit_breaker_state(next);
        }
    }

    /// Execute the plan's team over the configured number of phases.
    ///
    /// Phases run one after another; a phase's agents run concurrently and
    /// each is bounded by `execution.agent_timeout_ms`. Failed, timed-out and
    /// non-conforming agents are dropped from the results and listed in the
    /// phase report. An open breaker or a cancelled token stops further
    /// phases without discarding what was already accepted.
    pub async fn run(
        &self,
        plan: &RunPlan,
        substrate: &dyn ExecutionSubstrate,
        cancel: &CancellationToken,
    ) -> RunReport {
        let run_id = Uuid::new_v4().to_string();
        let region = self.telemetry.span("run", &[("run_id", run_id.as_str())]);
        self.run_phases(run_id, plan, substrate, cancel)
            .instrument(region.tracing_span())
            .await
    }

    async fn run_phases(
        &self,
        run_id: String,
        plan: &RunPlan,
        substrate: &dyn ExecutionSubstrate,
        cancel: &CancellationToken,
    ) -> RunReport {
        let start = Instant::now();
        let total_phases = self.config.execution.phases;

        self.probe_breaker();
        self.telemetry.record_run_start();
        self.telemetry.set_active_agents(plan.team.agent_ids());
        info!(run_id = %run_id, agents = plan.team.total_agents, phases = total_phases, "Run started");

        let mut outputs: Vec<AgentOutput> = Vec::new();
        let mut phases: Vec<PhaseReport> = Vec::new();
        let mut cancelled = false;
        let mut halted_by_breaker = false;

        if plan.team.is_empty() {
            warn!(run_id = %run_id, "Empty team, nothing to dispatch");
        } else {
            for phase in 1..=total_phases {
                if cancel.is_cancelled() {
                    info!(run_id = %run_id, phase, "Run cancelled, skipping remaining phases");
                    cancelled = true;
                    break;
                }
                let state = self.telemetry.circuit_breaker_state();
                if !state.allows_dispatch() {
                    warn!(run_id = %run_id, phase, breaker = %state, "Breaker open, halting run");
                    halted_by_breaker = true;
                    break;
                }

                let task = PhaseTask {
                    run_id: run_id.clone(),
                    phase,
                    total_phases,
                    description: plan.description.clone(),
                    profile: plan.profile.clone(),
                    team: plan.team.clone(),
                };
                let (report, accepted) = self.run_phase(&task, substrate).await;
                self.update_breaker(&report);
                outputs.extend(accepted);
                phases.push(report);
            }
        }

        let results = aggregate(Some(run_id), outputs);
        let success = !cancelled && !halted_by_breaker;
        self.telemetry
            .record_run_complete(success, results.total_findings());
        self.telemetry.set_active_agents(Vec::new());

        let report = RunReport {
            results,
            phases,
            cancelled,
            halted_by_breaker,
        };
        info!(
            run_id = %report.results.run_id(),
            duration_ms = start.elapsed().as_millis() as u64,
            total_findings = report.total_findings(),
            excluded_agents = report.excluded_agents(),
            cancelled,
            halted_by_breaker,
            "Run complete"
        );
        report
    }

    fn select(&self, profile: &TaskProfile, max_agents: usize) -> (Vec<RankedAgent>, ReviewTeam) {
        let start = Instant::now();
        let agents = self.registry.descriptors();
        let ranked = self.ranker.rank(profile, &agents);
        let request = TeamRequest::new(max_agents, self.config.core_slots);
        let team = self.composer.compose(profile, &ranked, &agents, request);
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.telemetry.record_team_selection(
            team.members().map(|(_, m)| (m.agent_id.as_str(), m.score)),
            latency_ms,
        );
        (ranked, team)
    }

    async fn run_phase(
        &self,
        task: &PhaseTask,
        substrate: &dyn ExecutionSubstrate,
    ) -> (PhaseReport, Vec<AgentOutput>) {
        let phase = task.phase;
        let phase_label = phase.to_string();
        let region = self.telemetry.span("phase", &[("phase", phase_label.as_str())]);
        self.dispatch_phase(task, substrate)
            .instrument(region.tracing_span())
            .await
    }

    async fn dispatch_phase(
        &self,
        task: &PhaseTask,
        substrate: &dyn ExecutionSubstrate,
    ) -> (PhaseReport, Vec<AgentOutput>) {
        let phase = task.phase;
        let start = Instant::now();
        let timeout_ms = self.config.execution.agent_timeout_ms;
        let timeout = Duration::from_millis(timeout_ms);
        let agent_ids = task.team.agent_ids();

        info!(phase, agents = agent_ids.len(), "Dispatching phase");

        let dispatches = agent_ids.iter().map(|agent_id| async move {
            let result =
                tokio::time::timeout(timeout, substrate.execute(agent_id, phase, task)).await;
            (agent_id.as_str(), result)
        });
        let results = join_all(dispatches).await;

        let mut accepted: Vec<AgentOutput> = Vec::new();
        let mut excluded: Vec<ExcludedAgent> = Vec::new();
        for (agent_id, result) in results {
            let reason = match result {
                Err(_) => ExclusionReason::TimedOut { timeout_ms },
                Ok(Err(e)) => ExclusionReason::ExecutionFailed {
                    error: e.to_string(),
                },
                Ok(Ok(raw)) => match self.accept(agent_id, phase, &raw) {
                    Ok(output) => {
                        accepted.push(output);
                        continue;
                    }
                    Err(violation) => ExclusionReason::ContractViolation {
                        field_path: violation.field_path.clone(),
                        detail: violation.to_string(),
                    },
                },
            };
            warn!(phase, agent_id = %agent_id, reason = ?reason, "Excluding agent output");
            excluded.push(ExcludedAgent {
                agent_id: agent_id.to_string(),
                reason,
            });
        }

        let finding_count: usize = accepted.iter().map(|o| o.findings.len()).sum();
        let duration_ms = start.elapsed().as_millis() as u64;
        self.telemetry
            .record_phase_complete(phase, agent_ids.len(), duration_ms, finding_count);
        info!(
            phase,
            accepted = accepted.len(),
            excluded = excluded.len(),
            finding_count,
            duration_ms,
            "Phase complete"
        );

        let report = PhaseReport {
            phase,
            dispatched: agent_ids.len(),
            accepted: accepted.len(),
            excluded,
            finding_count,
            duration_ms,
        };
        (report, accepted)
    }

    /// Validate a record and check it belongs to the agent and phase that
    /// produced it.
    fn accept(
        &self,
        agent_id: &str,
        phase: u32,
        raw: &serde_json::Value,
    ) -> Result<AgentOutput, AgentContractViolation> {
        let output = self.validate(raw)?;
        let mismatch = if output.agent_id != agent_id {
            Some(AgentContractViolation::new(
                agent_id,
                "agent_id",
                format!("\"{agent_id}\""),
                format!("\"{}\"", output.agent_id),
            ))
        } else if output.phase != phase {
            Some(AgentContractViolation::new(
                agent_id,
                "phase",
                phase.to_string(),
                output.phase.to_string(),
            ))
        } else {
            None
        };
        match mismatch {
            Some(violation) => {
                self.telemetry
                    .record_contract_violation(agent_id, &violation.field_path);
                Err(violation)
            }
            None => Ok(output),
        }
    }

    fn update_breaker(&self, report: &PhaseReport) {
        let current = self.telemetry.circuit_breaker_state();
        let next =
            self.breaker
                .lock()
                .on_phase(current, report.dispatched, report.failure_count());
        if next != current {
            self.telemetry.set_circuit_breaker_state(next);
        }
    }
}
