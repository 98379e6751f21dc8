use crate::validator::{expected, render, reporting_agent, OutputValidator};
use reviewforge_core::{AgentContractViolation, AgentOutput, Severity};
use serde_json::{Map, Value};

/// Shape a single field must have.
#[derive(Debug, Clone, Copy)]
enum Kind {
    String,
    NonEmptyString,
    UnsignedInt,
    UnitInterval,
    Severity,
    Object,
    /// Array whose every element is an object matching the nested table.
    ArrayOf(&'static [FieldSpec]),
}

impl Kind {
    fn expected(self) -> &'static str {
        match self {
            Kind::String => expected::STRING,
            Kind::NonEmptyString => expected::NON_EMPTY_STRING,
            Kind::UnsignedInt => expected::PHASE,
            Kind::UnitInterval => expected::CONFIDENCE,
            Kind::Severity => expected::SEVERITY,
            Kind::Object => expected::OBJECT,
            Kind::ArrayOf(_) => expected::ARRAY,
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Kind::String => value.is_string(),
            Kind::NonEmptyString => value.as_str().is_some_and(|s| !s.is_empty()),
            Kind::UnsignedInt => value.as_u64().is_some_and(|n| u32::try_from(n).is_ok()),
            Kind::UnitInterval => value.as_f64().is_some_and(|n| (0.0..=1.0).contains(&n)),
            Kind::Severity => value.as_str().and_then(Severity::parse).is_some(),
            Kind::Object => value.is_object(),
            Kind::ArrayOf(_) => value.is_array(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FieldSpec {
    name: &'static str,
    kind: Kind,
    required: bool,
}

const fn required(name: &'static str, kind: Kind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: true,
    }
}

const fn optional(name: &'static str, kind: Kind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: false,
    }
}

const FINDING_SCHEMA: &[FieldSpec] = &[
    required("finding_id", Kind::String),
    required("severity", Kind::Severity),
    required("location", Kind::String),
    required("description", Kind::String),
    required("recommendation", Kind::String),
    required("agent_id", Kind::String),
    required("confidence", Kind::UnitInterval),
];

const OUTPUT_SCHEMA: &[FieldSpec] = &[
    required("agent_id", Kind::NonEmptyString),
    required("phase", Kind::UnsignedInt),
    required("findings", Kind::ArrayOf(FINDING_SCHEMA)),
    optional("metadata", Kind::Object),
];

/// Validator driven by a declarative field table.
///
/// The table is walked generically and the checked record is then
/// deserialized with serde, so new fields only need a table entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }
}

impl OutputValidator for SchemaValidator {
    fn validate(&self, raw: &Value) -> Result<AgentOutput, AgentContractViolation> {
        let agent = reporting_agent(raw);
        let root = raw.as_object().ok_or_else(|| {
            AgentContractViolation::new(&agent, "$", expected::OBJECT, render(raw))
        })?;
        check_object(OUTPUT_SCHEMA, root, None, &agent)?;

        serde_json::from_value(raw.clone()).map_err(|e| {
            AgentContractViolation::new(&agent, "$", "AgentOutput", e.to_string())
        })
    }

    fn name(&self) -> &'static str {
        "schema"
    }
}

fn check_object(
    schema: &[FieldSpec],
    fields: &Map<String, Value>,
    parent: Option<&str>,
    agent: &str,
) -> Result<(), AgentContractViolation> {
    for field in schema {
        let path = match parent {
            Some(parent) => format!("{parent}.{}", field.name),
            None => field.name.to_string(),
        };
        let Some(value) = fields.get(field.name) else {
            if field.required {
                return Err(AgentContractViolation::missing(
                    agent,
                    path,
                    field.kind.expected(),
                ));
            }
            continue;
        };
        if !field.kind.accepts(value) {
            return Err(AgentContractViolation::new(
                agent,
                path,
                field.kind.expected(),
                render(value),
            ));
        }
        if let (Kind::ArrayOf(item_schema), Value::Array(items)) = (field.kind, value) {
            for (index, item) in items.iter().enumerate() {
                let item_path = format!("{path}[{index}]");
                let item_fields = item.as_object().ok_or_else(|| {
                    AgentContractViolation::new(agent, &item_path, expected::OBJECT, render(item))
                })?;
                check_object(item_schema, item_fields, Some(&item_path), agent)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::FieldValidator;
    use serde_json::json;

    fn finding() -> Value {
        json!({
            "finding_id": "f1",
            "severity": "medium",
            "location": "lib.rs:10",
            "description": "Unbounded retry loop",
            "recommendation": "Cap retries",
            "agent_id": "a1",
            "confidence": 0.6
        })
    }

    fn record(findings: Vec<Value>) -> Value {
        json!({"agent_id": "a1", "phase": 1, "findings": findings})
    }

    #[test]
    fn test_schema_accepts_conforming_record() {
        let output = SchemaValidator::new().validate(&record(vec![finding()])).unwrap();
        assert_eq!(output.findings.len(), 1);
        assert_eq!(output.findings[0].severity, Severity::Medium);
    }

    #[test]
    fn test_extreme_severity_rejected() {
        let mut bad = finding();
        bad["severity"] = json!("extreme");
        let raw = json!({"agent_id": "a1", "phase": 2, "findings": [bad]});
        let v = SchemaValidator::new().validate(&raw).unwrap_err();
        assert_eq!(v.field_path, "findings[0].severity");
        assert_eq!(v.expected_type, expected::SEVERITY);
    }

    #[test]
    fn test_second_finding_path() {
        let mut bad = finding();
        bad.as_object_mut().unwrap().remove("location");
        let v = SchemaValidator::new()
            .validate(&record(vec![finding(), bad]))
            .unwrap_err();
        assert_eq!(v.field_path, "findings[1].location");
        assert!(v.is_missing_field());
    }

    #[test]
    fn test_validators_agree() {
        let mut cases = vec![
            record(vec![finding()]),
            record(vec![]),
            json!("not an object"),
            json!({"phase": 1, "findings": []}),
            json!({"agent_id": 7, "phase": 1, "findings": []}),
            json!({"agent_id": "a1", "phase": -3, "findings": []}),
            json!({"agent_id": "a1", "phase": 1}),
            json!({"agent_id": "a1", "phase": 1, "findings": {}}),
            json!({"agent_id": "a1", "phase": 1, "findings": [42]}),
            json!({"agent_id": "a1", "phase": 1, "findings": [], "metadata": [1]}),
            json!({"agent_id": "a1", "phase": 1, "findings": [], "metadata": {"k": "v"}}),
        ];
        for (key, value) in [
            ("severity", json!("extreme")),
            ("severity", json!("HIGH")),
            ("confidence", json!(-0.1)),
            ("confidence", json!(null)),
            ("agent_id", json!(1)),
            ("finding_id", json!(["f"])),
        ] {
            let mut f = finding();
            f[key] = value;
            cases.push(record(vec![finding(), f]));
        }
        for key in ["finding_id", "description", "confidence"] {
            let mut f = finding();
            f.as_object_mut().unwrap().remove(key);
            cases.push(record(vec![f]));
        }

        let schema = SchemaValidator::new();
        let field = FieldValidator::new();
        for raw in &cases {
            assert_eq!(schema.validate(raw), field.validate(raw), "diverged on {raw}");
        }
    }
}
