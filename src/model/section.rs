use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Revision;

/// Section type as reported by the manager
///
/// Only LAYER3 sections are ever created here; other types are carried through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionType {
    #[default]
    Layer3,
    Layer2,
    #[serde(other)]
    Other,
}

/// A firewall rule container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub section_type: SectionType,
    #[serde(default)]
    pub stateful: bool,
    #[serde(rename = "_revision")]
    pub revision: Revision,
    /// Remaining manager fields (rule_count, timestamps, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Request body for section creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionSpec {
    pub display_name: String,
    pub section_type: SectionType,
    pub stateful: bool,
}

impl SectionSpec {
    /// The only kind of section this integration creates: stateful LAYER3
    pub fn layer3(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            section_type: SectionType::Layer3,
            stateful: true,
        }
    }
}

/// Handle to the section this integration owns
///
/// Only obtainable from `SectionRepository::ensure_managed_section`, so holding
/// one proves the section was resolved or created and confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ManagedSection {
    id: String,
    display_name: String,
}

impl ManagedSection {
    pub(crate) fn new(id: String, display_name: String) -> Self {
        Self { id, display_name }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_layer3_spec_body() {
        let body = serde_json::to_value(SectionSpec::layer3("OpenNebula")).unwrap();
        assert_eq!(
            body,
            json!({
                "display_name": "OpenNebula",
                "section_type": "LAYER3",
                "stateful": true
            })
        );
    }

    #[test]
    fn test_section_keeps_unknown_fields() {
        let section: Section = serde_json::from_value(json!({
            "id": "s1",
            "display_name": "OpenNebula",
            "section_type": "L3REDIRECT",
            "stateful": true,
            "rule_count": 4,
            "_revision": 9
        }))
        .unwrap();
        assert_eq!(section.section_type, SectionType::Other);
        assert_eq!(section.revision, Revision::new(9));
        assert_eq!(section.extra["rule_count"], 4);
    }
}
