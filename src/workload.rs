//! # Workload Description
//!
//! Identifiers of a VM that matter for firewall cleanup: its ids, its NICs with
//! their security-group memberships, and the security-group rule entries
//! attached to it.
//!
//! [`Workload::from_json`] reads the VM document exported by the cloud
//! manager:
//!
//! ```json
//! { "VM": { "ID": "7", "DEPLOY_ID": "vm-1042",
//!           "TEMPLATE": {
//!             "NIC": [{ "NETWORK_ID": "5", "SECURITY_GROUPS": "0,10" }],
//!             "SECURITY_GROUP_RULE": [{ "SECURITY_GROUP_ID": "10",
//!                                       "SECURITY_GROUP_NAME": "web" }] } } }
//! ```
//!
//! `NIC` and `SECURITY_GROUP_RULE` appear as a bare object when there is only one.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

/// A VM network interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nic {
    pub network_id: String,
    pub security_groups: Vec<String>,
}

/// A security-group rule entry as attached to the VM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroupRule {
    pub security_group_id: String,
    pub security_group_name: String,
}

/// Everything cleanup needs to know about a VM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    pub vm_id: String,
    pub deploy_id: String,
    pub nics: Vec<Nic>,
    pub security_group_rules: Vec<SecurityGroupRule>,
}

impl Workload {
    /// Parse the JSON VM document
    ///
    /// # Errors
    /// Returns an error if the document is not valid JSON or lacks `VM.ID`
    pub fn from_json(document: &str) -> Result<Self> {
        let doc: VmDocument =
            serde_json::from_str(document).context("Failed to parse VM document as JSON")?;
        Ok(doc.into())
    }

    /// Parse the YAML rendition of the same document
    ///
    /// # Errors
    /// Returns an error if the document is not valid YAML or lacks `VM.ID`
    pub fn from_yaml(document: &str) -> Result<Self> {
        let doc: VmDocument =
            serde_yaml::from_str(document).context("Failed to parse VM document as YAML")?;
        Ok(doc.into())
    }

    /// Rule entries belonging to one security group
    pub fn rules_for_group<'a>(
        &'a self,
        security_group_id: &'a str,
    ) -> impl Iterator<Item = &'a SecurityGroupRule> + 'a {
        self.security_group_rules
            .iter()
            .filter(move |rule| rule.security_group_id == security_group_id)
    }
}

/// Split a comma-separated id list, dropping blanks
fn split_ids(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Document shape
// ============================================================================

#[derive(Debug, Deserialize)]
struct VmDocument {
    #[serde(rename = "VM")]
    vm: VmBody,
}

#[derive(Debug, Deserialize)]
struct VmBody {
    #[serde(rename = "ID", deserialize_with = "scalar_string")]
    id: String,
    #[serde(rename = "DEPLOY_ID", default, deserialize_with = "scalar_string")]
    deploy_id: String,
    #[serde(rename = "TEMPLATE", default)]
    template: TemplateBody,
}

#[derive(Debug, Default, Deserialize)]
struct TemplateBody {
    #[serde(rename = "NIC", default)]
    nics: OneOrMany<NicBody>,
    #[serde(rename = "SECURITY_GROUP_RULE", default)]
    security_group_rules: OneOrMany<SecurityGroupRuleBody>,
}

#[derive(Debug, Deserialize)]
struct NicBody {
    #[serde(rename = "NETWORK_ID", default, deserialize_with = "scalar_string")]
    network_id: String,
    #[serde(rename = "SECURITY_GROUPS", default, deserialize_with = "scalar_string")]
    security_groups: String,
}

#[derive(Debug, Deserialize)]
struct SecurityGroupRuleBody {
    #[serde(rename = "SECURITY_GROUP_ID", default, deserialize_with = "scalar_string")]
    security_group_id: String,
    #[serde(rename = "SECURITY_GROUP_NAME", default, deserialize_with = "scalar_string")]
    security_group_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

/// Ids arrive as strings from the manager but as numbers from hand-written documents
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Str(String),
        Int(i64),
        UInt(u64),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Str(s) => s,
        Scalar::Int(i) => i.to_string(),
        Scalar::UInt(u) => u.to_string(),
    })
}

impl From<VmDocument> for Workload {
    fn from(doc: VmDocument) -> Self {
        let VmBody {
            id,
            deploy_id,
            template,
        } = doc.vm;

        Workload {
            vm_id: id,
            deploy_id,
            nics: template
                .nics
                .into_vec()
                .into_iter()
                .map(|nic| Nic {
                    network_id: nic.network_id,
                    security_groups: split_ids(&nic.security_groups),
                })
                .collect(),
            security_group_rules: template
                .security_group_rules
                .into_vec()
                .into_iter()
                .map(|rule| SecurityGroupRule {
                    security_group_id: rule.security_group_id,
                    security_group_name: rule.security_group_name,
                })
                .collect(),
        }
    }
}
