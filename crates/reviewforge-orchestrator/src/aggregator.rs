use reviewforge_core::{AgentOutput, AggregatedResults};
use tracing::info;
use uuid::Uuid;

/// Fold validated outputs into one run-level result.
///
/// Findings keep arrival order across outputs and `total_findings` is
/// always recounted. A fresh v4 id is generated when `run_id` is `None`.
pub fn aggregate(run_id: Option<String>, outputs: Vec<AgentOutput>) -> AggregatedResults {
    let run_id = run_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let agent_count = outputs.len();
    let results = AggregatedResults::new(run_id, outputs);
    info!(
        run_id = %results.run_id(),
        agents = agent_count,
        total_findings = results.total_findings(),
        "Aggregated run results"
    );
    results
}
