use reviewforge_core::{AgentContractViolation, AgentOutput, Finding, Severity};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Descriptions of what each field must hold, shared by every validator so
/// violations read the same whichever implementation produced them.
pub(crate) mod expected {
    pub const OBJECT: &str = "object";
    pub const ARRAY: &str = "array";
    pub const STRING: &str = "string";
    pub const NON_EMPTY_STRING: &str = "non-empty string";
    pub const PHASE: &str = "integer >= 0";
    pub const SEVERITY: &str = "one of critical|high|medium|low";
    pub const CONFIDENCE: &str = "number in [0.0, 1.0]";
}

/// Checks one raw agent record against the `AgentOutput` contract.
///
/// Implementations must agree on every rule and on the reported
/// `field_path`, so swapping one for another never changes which outputs a
/// run accepts.
pub trait OutputValidator: Send + Sync {
    /// Validate the whole record; any bad field rejects it as a unit.
    fn validate(&self, raw: &Value) -> Result<AgentOutput, AgentContractViolation>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Hand-written field-by-field validator with no schema table.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldValidator;

impl FieldValidator {
    pub fn new() -> Self {
        Self
    }
}

impl OutputValidator for FieldValidator {
    fn validate(&self, raw: &Value) -> Result<AgentOutput, AgentContractViolation> {
        let agent = reporting_agent(raw);
        let root = raw.as_object().ok_or_else(|| {
            AgentContractViolation::new(&agent, "$", expected::OBJECT, render(raw))
        })?;

        let agent_id = non_empty_string(root, "agent_id", "agent_id", &agent)?;
        let phase = phase(root, &agent)?;

        let raw_findings = match root.get("findings") {
            None => {
                return Err(AgentContractViolation::missing(
                    &agent,
                    "findings",
                    expected::ARRAY,
                ))
            }
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(AgentContractViolation::new(
                    &agent,
                    "findings",
                    expected::ARRAY,
                    render(other),
                ))
            }
        };
        let mut findings = Vec::with_capacity(raw_findings.len());
        for (index, item) in raw_findings.iter().enumerate() {
            findings.push(finding(item, &format!("findings[{index}]"), &agent)?);
        }

        let metadata = match root.get("metadata") {
            None => HashMap::new(),
            Some(Value::Object(map)) => map.clone().into_iter().collect(),
            Some(other) => {
                return Err(AgentContractViolation::new(
                    &agent,
                    "metadata",
                    expected::OBJECT,
                    render(other),
                ))
            }
        };

        Ok(AgentOutput {
            agent_id,
            phase,
            findings,
            metadata,
        })
    }

    fn name(&self) -> &'static str {
        "field"
    }
}

fn finding(item: &Value, path: &str, agent: &str) -> Result<Finding, AgentContractViolation> {
    let fields = item
        .as_object()
        .ok_or_else(|| AgentContractViolation::new(agent, path, expected::OBJECT, render(item)))?;

    let finding_id = string(fields, "finding_id", path, agent)?;

    let severity_path = format!("{path}.severity");
    let severity = match fields.get("severity") {
        None => {
            return Err(AgentContractViolation::missing(
                agent,
                severity_path,
                expected::SEVERITY,
            ))
        }
        Some(value) => value.as_str().and_then(Severity::parse).ok_or_else(|| {
            AgentContractViolation::new(agent, &severity_path, expected::SEVERITY, render(value))
        })?,
    };

    let location = string(fields, "location", path, agent)?;
    let description = string(fields, "description", path, agent)?;
    let recommendation = string(fields, "recommendation", path, agent)?;
    let finding_agent = string(fields, "agent_id", path, agent)?;

    let confidence_path = format!("{path}.confidence");
    let confidence = match fields.get("confidence") {
        None => {
            return Err(AgentContractViolation::missing(
                agent,
                confidence_path,
                expected::CONFIDENCE,
            ))
        }
        Some(value) => value
            .as_f64()
            .filter(|c| (0.0..=1.0).contains(c))
            .ok_or_else(|| {
                AgentContractViolation::new(
                    agent,
                    &confidence_path,
                    expected::CONFIDENCE,
                    render(value),
                )
            })?,
    };

    Ok(Finding {
        finding_id,
        severity,
        location,
        description,
        recommendation,
        agent_id: finding_agent,
        confidence,
    })
}

fn string(
    fields: &Map<String, Value>,
    key: &str,
    parent: &str,
    agent: &str,
) -> Result<String, AgentContractViolation> {
    let path = format!("{parent}.{key}");
    match fields.get(key) {
        None => Err(AgentContractViolation::missing(agent, path, expected::STRING)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(AgentContractViolation::new(
            agent,
            path,
            expected::STRING,
            render(other),
        )),
    }
}

fn non_empty_string(
    fields: &Map<String, Value>,
    key: &str,
    path: &str,
    agent: &str,
) -> Result<String, AgentContractViolation> {
    match fields.get(key) {
        None => Err(AgentContractViolation::missing(
            agent,
            path,
            expected::NON_EMPTY_STRING,
        )),
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(other) => Err(AgentContractViolation::new(
            agent,
            path,
            expected::NON_EMPTY_STRING,
            render(other),
        )),
    }
}

fn phase(fields: &Map<String, Value>, agent: &str) -> Result<u32, AgentContractViolation> {
    match fields.get("phase") {
        None => Err(AgentContractViolation::missing(agent, "phase", expected::PHASE)),
        Some(value) => value
            .as_u64()
            .and_then(|p| u32::try_from(p).ok())
            .ok_or_else(|| {
                AgentContractViolation::new(agent, "phase", expected::PHASE, render(value))
            }),
    }
}

/// Agent id to attach to a violation: the record's own id when usable.
pub(crate) fn reporting_agent(raw: &Value) -> String {
    raw.get("agent_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .unwrap_or(AgentContractViolation::UNKNOWN_AGENT)
        .to_string()
}

/// Compact JSON rendering of an offending value.
pub(crate) fn render(value: &Value) -> String {
    value.to_string()
}

/// Accepted outputs and rejected records from one batch, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub accepted: Vec<AgentOutput>,
    pub violations: Vec<AgentContractViolation>,
}

/// Validate every record, keeping the good ones and collecting the rest.
pub fn validate_batch<'a>(
    validator: &dyn OutputValidator,
    raws: impl IntoIterator<Item = &'a Value>,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for raw in raws {
        match validator.validate(raw) {
            Ok(output) => {
                debug!(agent_id = %output.agent_id, findings = output.findings.len(), "Accepted agent output");
                outcome.accepted.push(output);
            }
            Err(violation) => {
                warn!(
                    validator = validator.name(),
                    agent_id = %violation.agent_id,
                    field_path = %violation.field_path,
                    "Rejected agent output"
                );
                outcome.violations.push(violation);
            }
        }
    }
    outcome
}
