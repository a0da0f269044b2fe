use quiesce_core::AutomationError;
use serde_json::{Value, json};
use tracing::warn;

/// One audit finding, axe-style: a rule id, its severity, and how many
/// nodes tripped it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub id: String,
    pub impact: String,
    pub description: String,
    pub nodes: usize,
}

pub(crate) fn parse_violations(value: &Value) -> Vec<Violation> {
    let Some(list) = value.as_array() else {
        return Vec::new();
    };
    list.iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            Some(Violation {
                id: obj.get("id")?.as_str()?.to_string(),
                impact: obj
                    .get("impact")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                description: obj
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                nodes: obj.get("nodes").and_then(Value::as_u64).unwrap_or(0) as usize,
            })
        })
        .collect()
}

/// Log each finding, then fail unless `skip_failures` is set.
pub fn enforce(violations: &[Violation], skip_failures: bool) -> Result<(), AutomationError> {
    if violations.is_empty() {
        return Ok(());
    }
    for v in violations {
        warn!(
            id = %v.id,
            impact = %v.impact,
            nodes = v.nodes,
            "accessibility violation: {}",
            v.description
        );
    }
    if skip_failures {
        return Ok(());
    }
    Err(AutomationError::accessibility(format!(
        "{} accessibility violation(s) detected",
        violations.len()
    ))
    .with_context(json!({
        "violations": violations
            .iter()
            .map(|v| json!({
                "id": v.id,
                "impact": v.impact,
                "description": v.description,
                "nodes": v.nodes,
            }))
            .collect::<Vec<_>>(),
    })))
}
