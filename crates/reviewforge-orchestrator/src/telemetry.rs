use crate::types::{CircuitBreakerState, MetricPoint};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Metric names emitted by [`Telemetry`].
pub mod metric {
    pub const AGENT_SELECTION_SCORE: &str = "agent_selection_score";
    pub const AGENT_SELECTION_LATENCY_MS: &str = "agent_selection_latency_ms";
    pub const PHASE_DURATION_MS: &str = "phase_duration_ms";
    pub const PHASE_AGENT_COUNT: &str = "phase_agent_count";
    pub const PHASE_FINDING_COUNT: &str = "phase_finding_count";
    pub const RUN_STARTED: &str = "run_started";
    pub const RUN_COMPLETED: &str = "run_completed";
    pub const RUN_TOTAL_FINDINGS: &str = "run_total_findings";
    pub const CONTRACT_VIOLATION: &str = "contract_violation";
    pub const CIRCUIT_BREAKER_STATE: &str = "circuit_breaker_state";
}

/// Where scoped instrumentation regions go.
pub trait SpanBackend: Send + Sync {
    fn start(&self, name: &str, attributes: &[(&str, &str)]) -> SpanGuard;
}

/// Discards every span.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSpanBackend;

impl SpanBackend for NoopSpanBackend {
    fn start(&self, _name: &str, _attributes: &[(&str, &str)]) -> SpanGuard {
        SpanGuard::noop()
    }
}

/// Emits a `tracing` span per region and a debug event with its duration on
/// close. Events are parented to the region only while the caller holds
/// [`SpanGuard::enter`] or runs a future under [`SpanGuard::tracing_span`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSpanBackend;

impl SpanBackend for TracingSpanBackend {
    fn start(&self, name: &str, attributes: &[(&str, &str)]) -> SpanGuard {
        let rendered = attributes
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        let span = tracing::info_span!("reviewforge", region = %name, attributes = %rendered);
        SpanGuard {
            active: Some(ActiveSpan {
                span,
                started: Instant::now(),
            }),
        }
    }
}

#[derive(Debug)]
struct ActiveSpan {
    span: tracing::Span,
    started: Instant,
}

/// Closes its region when dropped.
#[derive(Debug)]
#[must_use = "the region closes as soon as the guard is dropped"]
pub struct SpanGuard {
    active: Option<ActiveSpan>,
}

impl SpanGuard {
    pub fn noop() -> Self {
        Self { active: None }
    }

    /// Whether a backend is recording this region.
    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Enter the region for the current synchronous scope.
    ///
    /// Not for use across `.await`; instrument the future with
    /// [`tracing_span`](Self::tracing_span) instead.
    pub fn enter(&self) -> Option<tracing::span::Entered<'_>> {
        self.active.as_ref().map(|active| active.span.enter())
    }

    /// The underlying `tracing` span, or a disabled one for no-op regions.
    pub fn tracing_span(&self) -> tracing::Span {
        self.active
            .as_ref()
            .map_or_else(tracing::Span::none, |active| active.span.clone())
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            let elapsed_ms = active.started.elapsed().as_millis() as u64;
            active.span.in_scope(|| debug!(elapsed_ms, "Span closed"));
        }
    }
}

/// Coarse service condition derived from the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Degraded,
    Unavailable,
}

impl From<CircuitBreakerState> for ServiceStatus {
    fn from(state: CircuitBreakerState) -> Self {
        match state {
            CircuitBreakerState::Closed => ServiceStatus::Healthy,
            CircuitBreakerState::HalfOpen => ServiceStatus::Degraded,
            CircuitBreakerState::Open => ServiceStatus::Unavailable,
        }
    }
}

/// Snapshot for a liveness/readiness endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub service: String,
    pub status: ServiceStatus,
    pub circuit_breaker_state: CircuitBreakerState,
    pub run_count: u64,
    pub last_run_timestamp: Option<DateTime<Utc>>,
    pub active_agents: Vec<String>,
    pub total_metrics: usize,
}

#[derive(Debug, Default)]
struct TelemetryState {
    metrics: Vec<MetricPoint>,
    breaker: CircuitBreakerState,
    run_count: u64,
    last_run: Option<DateTime<Utc>>,
    active_agents: Vec<String>,
}

/// Process-wide recorder for selection, phase and run metrics plus
/// circuit-breaker state.
///
/// All mutation happens under one lock; recording never fails.
pub struct Telemetry {
    service_name: String,
    backend: Arc<dyn SpanBackend>,
    state: Mutex<TelemetryState>,
}

impl Telemetry {
    /// Recorder with spans disabled.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self::with_backend(service_name, Arc::new(NoopSpanBackend))
    }

    /// Recorder that turns spans into `tracing` spans.
    pub fn with_tracing(service_name: impl Into<String>) -> Self {
        Self::with_backend(service_name, Arc::new(TracingSpanBackend))
    }

    pub fn with_backend(service_name: impl Into<String>, backend: Arc<dyn SpanBackend>) -> Self {
        Self {
            service_name: service_name.into(),
            backend,
            state: Mutex::new(TelemetryState::default()),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Open a scoped instrumentation region.
    pub fn span(&self, name: &str, attributes: &[(&str, &str)]) -> SpanGuard {
        self.backend.start(name, attributes)
    }

    pub fn record_agent_selection(&self, agent_id: &str, score: f64, latency_ms: f64) {
        self.push([
            MetricPoint::new(metric::AGENT_SELECTION_SCORE, score).with_label("agent_id", agent_id),
            MetricPoint::new(metric::AGENT_SELECTION_LATENCY_MS, latency_ms)
                .with_label("agent_id", agent_id),
        ]);
    }

    /// Record one composed team: a score point per member and a single
    /// latency point for the whole selection, labelled with the team size.
    pub fn record_team_selection<'a>(
        &self,
        members: impl IntoIterator<Item = (&'a str, f64)>,
        latency_ms: f64,
    ) {
        let mut points: Vec<MetricPoint> = members
            .into_iter()
            .map(|(agent_id, score)| {
                MetricPoint::new(metric::AGENT_SELECTION_SCORE, score)
                    .with_label("agent_id", agent_id)
            })
            .collect();
        let team_size = points.len().to_string();
        points.push(
            MetricPoint::new(metric::AGENT_SELECTION_LATENCY_MS, latency_ms)
                .with_label("scope", "team")
                .with_label("team_size", team_size),
        );
        self.push(points);
    }

    pub fn record_phase_complete(
        &self,
        phase: u32,
        agent_count: usize,
        duration_ms: u64,
        finding_count: usize,
    ) {
        let label = phase.to_string();
        self.push([
            MetricPoint::new(metric::PHASE_DURATION_MS, duration_ms as f64)
                .with_label("phase", &label),
            MetricPoint::new(metric::PHASE_AGENT_COUNT, agent_count as f64)
                .with_label("phase", &label),
            MetricPoint::new(metric::PHASE_FINDING_COUNT, finding_count as f64)
                .with_label("phase", &label),
        ]);
    }

    /// Count a run and stamp its start time.
    pub fn record_run_start(&self) {
        let mut state = self.state.lock();
        state.run_count += 1;
        state.last_run = Some(Utc::now());
        let point = MetricPoint::new(metric::RUN_STARTED, 1.0)
            .with_label("run", state.run_count.to_string());
        state.metrics.push(point);
    }

    pub fn record_run_complete(&self, success: bool, total_findings: usize) {
        let outcome = if success { "success" } else { "failure" };
        self.push([
            MetricPoint::new(metric::RUN_COMPLETED, if success { 1.0 } else { 0.0 })
                .with_label("outcome", outcome),
            MetricPoint::new(metric::RUN_TOTAL_FINDINGS, total_findings as f64),
        ]);
    }

    pub fn record_contract_violation(&self, agent_id: &str, field_path: &str) {
        self.push([MetricPoint::new(metric::CONTRACT_VIOLATION, 1.0)
            .with_label("agent_id", agent_id)
            .with_label("field_path", field_path)]);
    }

    pub fn set_circuit_breaker_state(&self, new_state: CircuitBreakerState) {
        let mut state = self.state.lock();
        if state.breaker != new_state {
            match new_state {
                CircuitBreakerState::Open => {
                    warn!(from = %state.breaker, to = %new_state, "Circuit breaker opened")
                }
                _ => info!(from = %state.breaker, to = %new_state, "Circuit breaker changed"),
            }
        }
        state.breaker = new_state;
        state.metrics.push(MetricPoint::new(
            metric::CIRCUIT_BREAKER_STATE,
            new_state.as_gauge(),
        ));
    }

    pub fn circuit_breaker_state(&self) -> CircuitBreakerState {
        self.state.lock().breaker
    }

    pub fn set_active_agents(&self, agent_ids: Vec<String>) {
        self.state.lock().active_agents = agent_ids;
    }

    pub fn health_status(&self) -> HealthStatus {
        let state = self.state.lock();
        HealthStatus {
            service: self.service_name.clone(),
            status: state.breaker.into(),
            circuit_breaker_state: state.breaker,
            run_count: state.run_count,
            last_run_timestamp: state.last_run,
            active_agents: state.active_agents.clone(),
            total_metrics: state.metrics.len(),
        }
    }

    /// Copy of every recorded point, oldest first.
    pub fn metrics(&self) -> Vec<MetricPoint> {
        self.state.lock().metrics.clone()
    }

    pub fn metrics_named(&self, name: &str) -> Vec<MetricPoint> {
        self.state
            .lock()
            .metrics
            .iter()
            .filter(|m| m.name == name)
            .cloned()
            .collect()
    }

    /// Health plus every metric, for a dashboard or debug endpoint.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "health": self.health_status(),
            "metrics": self.metrics(),
        })
    }

    /// Clear counters, metrics and breaker state.
    pub fn reset(&self) {
        *self.state.lock() = TelemetryState::default();
        debug!(service = %self.service_name, "Telemetry reset");
    }

    fn push(&self, points: impl IntoIterator<Item = MetricPoint>) {
        self.state.lock().metrics.extend(points);
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new("reviewforge")
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("service_name", &self.service_name)
            .field("health", &self.health_status())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_initial_health() {
        let telemetry = Telemetry::new("svc");
        let health = telemetry.health_status();
        assert_eq!(health.service, "svc");
        assert_eq!(health.status, ServiceStatus::Healthy);
        assert_eq!(health.circuit_breaker_state, CircuitBreakerState::Closed);
        assert_eq!(health.run_count, 0);
        assert!(health.last_run_timestamp.is_none());
        assert_eq!(health.total_metrics, 0);
    }

    #[test]
    fn test_run_lifecycle_metrics() {
        let telemetry = Telemetry::default();
        telemetry.record_run_start();
        telemetry.record_agent_selection("security-auditor", 0.82, 1.5);
        telemetry.record_phase_complete(1, 3, 120, 7);
        telemetry.record_run_complete(true, 7);

        let health = telemetry.health_status();
        assert_eq!(health.run_count, 1);
        assert!(health.last_run_timestamp.is_some());
        assert_eq!(health.total_metrics, 8);

        let scores = telemetry.metrics_named(metric::AGENT_SELECTION_SCORE);
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].labels["agent_id"], "security-auditor");
        let findings = telemetry.metrics_named(metric::RUN_TOTAL_FINDINGS);
        assert_eq!(findings[0].value, 7.0);
    }

    #[test]
    fn test_team_selection_records_latency_once() {
        let telemetry = Telemetry::default();
        telemetry.record_team_selection([("a", 0.9), ("b", 0.7), ("c", 0.5)], 2.5);
        assert_eq!(telemetry.metrics_named(metric::AGENT_SELECTION_SCORE).len(), 3);
        let latency = telemetry.metrics_named(metric::AGENT_SELECTION_LATENCY_MS);
        assert_eq!(latency.len(), 1);
        assert_eq!(latency[0].value, 2.5);
        assert_eq!(latency[0].labels["team_size"], "3");
        assert!(!latency[0].labels.contains_key("agent_id"));
    }

    #[test]
    fn test_breaker_state_drives_status() {
        let telemetry = Telemetry::default();
        telemetry.set_circuit_breaker_state(CircuitBreakerState::Open);
        assert_eq!(telemetry.health_status().status, ServiceStatus::Unavailable);
        telemetry.set_circuit_breaker_state(CircuitBreakerState::HalfOpen);
        assert_eq!(telemetry.health_status().status, ServiceStatus::Degraded);
        let gauge = telemetry.metrics_named(metric::CIRCUIT_BREAKER_STATE);
        assert_eq!(gauge.len(), 2);
        assert_eq!(gauge[0].value, 2.0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let telemetry = Telemetry::default();
        telemetry.record_run_start();
        telemetry.record_contract_violation("a1", "phase");
        telemetry.set_active_agents(vec!["a1".into()]);
        telemetry.set_circuit_breaker_state(CircuitBreakerState::Open);
        telemetry.reset();
        let health = telemetry.health_status();
        assert_eq!(health.run_count, 0);
        assert_eq!(health.total_metrics, 0);
        assert!(health.active_agents.is_empty());
        assert_eq!(health.circuit_breaker_state, CircuitBreakerState::Closed);
    }

    #[test]
    fn test_to_json_shape() {
        let telemetry = Telemetry::new("svc");
        telemetry.set_active_agents(vec!["a".into(), "b".into()]);
        telemetry.record_run_start();
        let json = telemetry.to_json();
        assert_eq!(json["health"]["service"], "svc");
        assert_eq!(json["health"]["status"], "healthy");
        assert_eq!(json["health"]["circuit_breaker_state"], "CLOSED");
        assert_eq!(json["health"]["active_agents"].as_array().unwrap().len(), 2);
        assert_eq!(json["metrics"][0]["name"], metric::RUN_STARTED);
    }

    #[test]
    fn test_noop_span_does_not_record() {
        let telemetry = Telemetry::default();
        let guard = telemetry.span("phase", &[("phase", "1")]);
        assert!(!guard.is_recording());
        drop(guard);
        assert!(telemetry.metrics().is_empty());
    }

    #[test]
    fn test_tracing_span_records() {
        let telemetry = Telemetry::with_tracing("svc");
        let guard = telemetry.span("select", &[("agents", "3")]);
        assert!(guard.is_recording());
    }

    #[test]
    fn test_entered_region_parents_events() {
        use futures_util::FutureExt;
        use tracing::Instrument;

        tracing::subscriber::with_default(tracing_subscriber::registry(), || {
            let guard = TracingSpanBackend.start("plan", &[]);
            let region_id = guard.tracing_span().id();
            assert!(region_id.is_some());
            {
                let _entered = guard.enter();
                assert_eq!(tracing::Span::current().id(), region_id);
            }
            assert_ne!(tracing::Span::current().id(), region_id);

            let inside = async { tracing::Span::current().id() }
                .instrument(guard.tracing_span())
                .now_or_never()
                .unwrap();
            assert_eq!(inside, region_id);
        });
    }

    #[test]
    fn test_noop_region_has_disabled_span() {
        let guard = SpanGuard::noop();
        assert!(guard.enter().is_none());
        assert!(guard.tracing_span().is_disabled());
    }

    #[test]
    fn test_custom_backend_receives_spans() {
        struct Counting(AtomicUsize);
        impl SpanBackend for Counting {
            fn start(&self, _name: &str, _attributes: &[(&str, &str)]) -> SpanGuard {
                self.0.fetch_add(1, Ordering::SeqCst);
                SpanGuard::noop()
            }
        }
        let backend = Arc::new(Counting(AtomicUsize::new(0)));
        let telemetry = Telemetry::with_backend("svc", backend.clone());
        let _a = telemetry.span("a", &[]);
        let _b = telemetry.span("b", &[]);
        assert_eq!(backend.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_recording() {
        let telemetry = Arc::new(Telemetry::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let t = Arc::clone(&telemetry);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        t.record_agent_selection(&format!("agent-{i}"), 0.5, 1.0);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(telemetry.metrics().len(), 8 * 50 * 2);
    }
}
