//! # Prelude
//!
//! ```rust
//! use nsx_dfw::prelude::*;
//! ```

pub use crate::config::{DfwConfig, DuplicateNamePolicy, LogFormat};
pub use crate::dfw::{
    clear_workload_rules, derive_rule_names, rule_name, ClearReport, NsxtDfw, RuleRepository,
    SectionRepository,
};
pub use crate::error::{DfwError, DfwResult, ObjectKind};
pub use crate::model::{ManagedSection, Revision, Rule, RuleSpec, Section, SectionSpec, SectionType};
pub use crate::transport::{MemoryPolicyStore, NsxRestClient, PolicyStoreClient, TransportError};
pub use crate::workload::{Nic, SecurityGroupRule, Workload};
