//! # Model
//!
//! Firewall objects as the NSX manager returns them.
//!
//! - `section`: rule containers and the managed-section handle
//! - `rule`: rules and the caller-supplied rule spec

mod rule;
mod section;

pub use rule::{Rule, RuleSpec};
pub use section::{ManagedSection, Section, SectionSpec, SectionType};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Optimistic-concurrency token issued by the store
///
/// Never interpreted locally: read it right before a write and hand it back
/// exactly as received. NSX issues integers, but any JSON value is carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(Value);

impl Revision {
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
