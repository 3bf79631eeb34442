use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Revision;
use crate::constants::REVISION_FIELD;

/// A firewall rule as stored by the manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    #[serde(rename = "_revision")]
    pub revision: Revision,
    /// Match/action fields, passed through untouched
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Rule {
    /// Spec that would recreate this rule (server-owned fields dropped)
    pub fn to_spec(&self) -> RuleSpec {
        RuleSpec {
            display_name: self.display_name.clone(),
            payload: self.payload.clone(),
        }
    }
}

/// Caller-supplied rule content for create/update
///
/// The revision is never part of the spec; repositories stamp it right before
/// the write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub display_name: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl RuleSpec {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            payload: Map::new(),
        }
    }

    /// Add a payload field
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// Request body with the given revision stamped in
    pub(crate) fn to_body(&self, revision: &Revision) -> Value {
        let mut body = self.payload.clone();
        body.remove("id");
        body.insert(
            "display_name".to_string(),
            Value::String(self.display_name.clone()),
        );
        body.insert(REVISION_FIELD.to_string(), revision.as_value().clone());
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_stamps_revision_over_payload() {
        let spec = RuleSpec::new("10 - web - 7 - one-7 - 5")
            .with("action", json!("ALLOW"))
            .with("_revision", json!(1));
        let body = spec.to_body(&Revision::new(42));
        assert_eq!(
            body,
            json!({
                "display_name": "10 - web - 7 - one-7 - 5",
                "action": "ALLOW",
                "_revision": 42
            })
        );
    }

    #[test]
    fn test_rule_payload_excludes_server_fields() {
        let rule: Rule = serde_json::from_value(json!({
            "id": "r1",
            "display_name": "x",
            "section_id": "s1",
            "_revision": 3,
            "action": "DROP",
            "direction": "IN_OUT"
        }))
        .unwrap();
        assert_eq!(rule.section_id.as_deref(), Some("s1"));
        assert_eq!(rule.payload.len(), 2);
        assert_eq!(rule.to_spec().payload["action"], "DROP");
    }
}
