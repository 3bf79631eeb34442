//! # Distributed Firewall
//!
//! Section and rule lifecycle on the NSX-T manager.
//!
//! - [`SectionRepository`]: sections, and the find-or-create of the managed one
//! - [`RuleRepository`]: rules inside a section, with `_revision` compare-and-swap
//! - [`derive_rule_names`]: rule names this integration gives a workload's groups
//! - [`clear_workload_rules`]: removes every rule derived for a workload
//!
//! [`NsxtDfw`] ties them together around the [`ManagedSection`] handle it
//! resolves once on [`NsxtDfw::connect`].

mod cleanup;
mod identity;
mod rules;
mod sections;

pub use cleanup::{clear_workload_rules, ClearReport};
pub use identity::{derive_rule_names, rule_name};
pub use rules::RuleRepository;
pub use sections::SectionRepository;

use std::sync::Arc;

use dfw_paths::prelude::*;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::{DfwConfig, DuplicateNamePolicy};
use crate::error::{DfwError, DfwResult, ObjectKind};
use crate::model::{ManagedSection, Rule, RuleSpec, Section};
use crate::transport::{ListResponse, PolicyStoreClient};
use crate::workload::Workload;

/// Firewall driver bound to the managed section
///
/// Every operation without an explicit section runs against the section
/// resolved by [`NsxtDfw::connect`].
#[derive(Debug)]
pub struct NsxtDfw {
    sections: SectionRepository,
    rules: RuleRepository,
    managed: ManagedSection,
}

impl NsxtDfw {
    /// Resolve (or create) the managed section and return a driver bound to it
    ///
    /// # Errors
    /// Fails when the managed section cannot be found or created
    pub async fn connect(client: Arc<dyn PolicyStoreClient>, config: &DfwConfig) -> DfwResult<Self> {
        let sections = SectionRepository::new(Arc::clone(&client), config.duplicate_names);
        let rules = RuleRepository::new(client, config.duplicate_names, config.max_attempts());
        let managed = sections.ensure_managed_section(&config.section_name).await?;
        info!(
            "Using DFW section '{}' ({})",
            managed.display_name(),
            managed.id()
        );

        Ok(Self {
            sections,
            rules,
            managed,
        })
    }

    pub fn managed_section(&self) -> &ManagedSection {
        &self.managed
    }

    pub fn sections(&self) -> &SectionRepository {
        &self.sections
    }

    pub fn rules(&self) -> &RuleRepository {
        &self.rules
    }

    pub async fn list_sections(&self) -> DfwResult<Vec<Section>> {
        self.sections.list_sections().await
    }

    pub async fn find_section_by_name(&self, name: &str) -> DfwResult<Option<Section>> {
        self.sections.find_section_by_name(name).await
    }

    /// Look up a section, the managed one when `section_id` is `None`
    pub async fn find_section_by_id(&self, section_id: Option<&str>) -> DfwResult<Option<Section>> {
        self.sections
            .find_section_by_id(section_id.unwrap_or(self.managed.id()))
            .await
    }

    pub async fn list_rules(&self) -> DfwResult<Vec<Rule>> {
        self.rules.list_rules(self.managed.id()).await
    }

    pub async fn find_rule_by_id(&self, rule_id: &str) -> DfwResult<Option<Rule>> {
        self.rules.find_rule_by_id(rule_id).await
    }

    pub async fn find_rule_by_name(&self, name: &str) -> DfwResult<Option<Rule>> {
        self.rules
            .find_rule_by_name(name, Some(self.managed.id()))
            .await
    }

    pub async fn create_rule(&self, spec: &RuleSpec) -> DfwResult<Rule> {
        self.rules.create_rule(spec, self.managed.id()).await
    }

    pub async fn update_rule(&self, rule_id: &str, spec: &RuleSpec) -> DfwResult<Rule> {
        self.rules
            .update_rule(rule_id, spec, self.managed.id())
            .await
    }

    pub async fn delete_rule(&self, rule_id: &str) -> DfwResult<()> {
        self.rules.delete_rule(rule_id, self.managed.id()).await
    }

    pub async fn clear_workload_rules(&self, workload: &Workload) -> DfwResult<ClearReport> {
        clear_workload_rules(&self.rules, workload, self.managed.id()).await
    }

    /// Delete the managed section, consuming the driver
    pub async fn delete_section(self) -> DfwResult<()> {
        self.sections.delete_section(self.managed.id()).await
    }
}

/// Fetch every page of a list endpoint
///
/// Returns `None` when the first page answers 404. A later page that is
/// missing, or a cursor the manager hands back twice, fails the listing.
pub(crate) async fn list_all<T: DeserializeOwned>(
    client: &dyn PolicyStoreClient,
    operation: DfwOperation,
    section_id: Option<&str>,
) -> DfwResult<Option<Vec<T>>> {
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let mut builder = PathBuilder::new().operation(operation).cursor(cursor.clone());
        if let Some(section_id) = section_id {
            builder = builder.section(section_id);
        }
        let path = builder.build_http_path()?;
        debug!("{} {}", operation.method(), builder.build_relative_path()?);

        let Some(body) = client.get(&path).await? else {
            if cursor.is_none() {
                return Ok(None);
            }
            return Err(DfwError::Integrity(format!("Listing {path} ended early")));
        };

        let page: ListResponse<T> = serde_json::from_value(body)?;
        items.extend(page.results);

        match page.cursor {
            Some(next) if !next.is_empty() => {
                if cursor.as_deref() == Some(next.as_str()) {
                    return Err(DfwError::Integrity(format!(
                        "Listing {path} returned its own cursor again"
                    )));
                }
                cursor = Some(next);
            }
            _ => return Ok(Some(items)),
        }
    }
}

/// Pick the single object named `name`, applying the duplicate-name policy
pub(crate) fn pick_by_name<T>(
    items: Vec<T>,
    name: &str,
    kind: ObjectKind,
    policy: DuplicateNamePolicy,
    display_name: impl Fn(&T) -> &str,
) -> DfwResult<Option<T>> {
    let mut matches: Vec<T> = items
        .into_iter()
        .filter(|item| display_name(item) == name)
        .collect();

    match (matches.len(), policy) {
        (0 | 1, _) => Ok(matches.pop()),
        (count, DuplicateNamePolicy::LastMatch) => {
            warn!("Found {} {}s named '{}', using the last one", count, kind, name);
            Ok(matches.pop())
        }
        (count, DuplicateNamePolicy::Reject) => Err(DfwError::DuplicateName {
            kind,
            name: name.to_string(),
            count,
        }),
    }
}
