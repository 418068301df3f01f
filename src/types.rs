//! Plan and import result types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A change to one top-level attribute between prior and planned state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// Attribute name.
    pub path: String,
    /// Value before the change, `None` if it was unset.
    pub before: Option<Value>,
    /// Value after the change, `None` if it becomes unset.
    pub after: Option<Value>,
}

impl AttributeChange {
    /// Create a change.
    pub fn new(path: impl Into<String>, before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// Diff one attribute. Absent, null and zero values are the same thing.
    pub fn between(path: &str, before: Option<&Value>, after: Option<&Value>) -> Option<Self> {
        let before = non_zero(before);
        let after = non_zero(after);
        if before == after {
            None
        } else {
            Some(Self::new(path, before.cloned(), after.cloned()))
        }
    }
}

/// `value`, unless it is absent, null or a zero value (`false`, `""`, `[]`,
/// `{}`).
///
/// Stream fields are omitted from the wire at their zero value, so a zero in
/// state and an unset attribute in configuration describe the same stream.
pub fn non_zero(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Number(_) => true,
    })
}

/// The result of planning a resource change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// State the resource will have once applied.
    pub planned_state: Value,
    /// Attribute-level changes.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource has to be destroyed and recreated.
    pub requires_replace: bool,
}

impl PlanResult {
    /// A plan that changes nothing.
    pub fn no_change(state: Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// A plan with changes.
    pub fn with_changes(
        planned_state: Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }
}

/// A resource brought under management by import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// The imported state.
    pub state: Value,
}

impl ImportedResource {
    /// Create an imported resource.
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_between() {
        assert!(AttributeChange::between("type", Some(&json!("otlp")), Some(&json!("otlp"))).is_none());
        assert!(AttributeChange::between("type", None, Some(&Value::Null)).is_none());

        let change =
            AttributeChange::between("type", Some(&json!("otlp")), Some(&json!("splunk"))).unwrap();
        assert_eq!(change.before, Some(json!("otlp")));
        assert_eq!(change.after, Some(json!("splunk")));

        let added = AttributeChange::between("enabled", None, Some(&json!(true))).unwrap();
        assert!(added.before.is_none());
    }

    #[test]
    fn test_between_ignores_zero_values() {
        for zero in [json!(false), json!(""), json!([]), json!({})] {
            assert!(AttributeChange::between("x", Some(&zero), None).is_none());
            assert!(AttributeChange::between("x", None, Some(&zero)).is_none());
            assert!(AttributeChange::between("x", Some(&zero), Some(&Value::Null)).is_none());
        }

        let disabled =
            AttributeChange::between("enabled", Some(&json!(true)), Some(&json!(false))).unwrap();
        assert_eq!(disabled.before, Some(json!(true)));
        assert!(disabled.after.is_none());
    }

    #[test]
    fn test_non_zero() {
        assert_eq!(non_zero(Some(&json!(0))), Some(&json!(0)));
        assert_eq!(non_zero(Some(&json!("grpc"))), Some(&json!("grpc")));
        assert!(non_zero(Some(&json!(false))).is_none());
        assert!(non_zero(None).is_none());
    }

    #[test]
    fn test_plan_result() {
        let plan = PlanResult::no_change(json!({"id": "s-1"}));
        assert!(plan.changes.is_empty());
        assert!(!plan.requires_replace);
    }

    #[test]
    fn test_imported_resource() {
        let imported = ImportedResource::new("thousandeyes_stream", json!({"id": "s-1"}));
        assert_eq!(imported.state["id"], "s-1");
    }
}
