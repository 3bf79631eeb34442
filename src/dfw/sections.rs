use std::sync::Arc;

use dfw_paths::prelude::*;
use serde_json::Value;
use tracing::{debug, info, Instrument, Level};

use super::{list_all, pick_by_name};
use crate::config::DuplicateNamePolicy;
use crate::error::{DfwError, DfwResult, ObjectKind};
use crate::model::{ManagedSection, Section, SectionSpec};
use crate::observability::tracker::op_span;
use crate::observability::OperationTracker;
use crate::transport::PolicyStoreClient;

/// Firewall sections on the manager
pub struct SectionRepository {
    client: Arc<dyn PolicyStoreClient>,
    duplicate_names: DuplicateNamePolicy,
}

impl std::fmt::Debug for SectionRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionRepository")
            .field("duplicate_names", &self.duplicate_names)
            .finish_non_exhaustive()
    }
}

impl SectionRepository {
    pub fn new(client: Arc<dyn PolicyStoreClient>, duplicate_names: DuplicateNamePolicy) -> Self {
        Self {
            client,
            duplicate_names,
        }
    }

    /// Every section visible to the configured user
    ///
    /// An empty list is a valid answer.
    pub async fn list_sections(&self) -> DfwResult<Vec<Section>> {
        let span = op_span!(Level::DEBUG, "dfw.section.list", section.count = tracing::field::Empty);
        let tracker = OperationTracker::new(DfwOperation::ListSections.as_str(), span.clone());

        let result: DfwResult<Vec<Section>> = async {
            let sections = list_all::<Section>(self.client.as_ref(), DfwOperation::ListSections, None)
                .await?
                .unwrap_or_default();
            tracing::Span::current().record("section.count", sections.len());
            debug!("Listed {} DFW section(s)", sections.len());
            Ok(sections)
        }
        .instrument(span)
        .await;

        tracker.finish(result)
    }

    /// Section whose display name is exactly `name`
    ///
    /// # Errors
    /// `DuplicateName` when several sections carry the name and the policy is `Reject`
    pub async fn find_section_by_name(&self, name: &str) -> DfwResult<Option<Section>> {
        let sections = self.list_sections().await?;
        pick_by_name(
            sections,
            name,
            ObjectKind::Section,
            self.duplicate_names,
            |s: &Section| s.display_name.as_str(),
        )
    }

    pub async fn find_section_by_id(&self, section_id: &str) -> DfwResult<Option<Section>> {
        let path = PathBuilder::new()
            .operation(DfwOperation::GetSection)
            .section(section_id)
            .build_http_path()?;

        match self.client.get(&path).await? {
            Some(body) => Ok(Some(serde_json::from_value(body)?)),
            None => {
                debug!("DFW section {} not found", section_id);
                Ok(None)
            }
        }
    }

    /// Find the section named `name`, creating it when absent
    ///
    /// Safe to run on every start: an existing section is reused, never duplicated.
    /// A freshly created section is read back before its handle is returned.
    ///
    /// # Errors
    /// - `CreateError` when the manager rejects the creation
    /// - `OperationFailed` when the creation answer carries no id
    /// - `Integrity` when the created section cannot be read back
    pub async fn ensure_managed_section(&self, name: &str) -> DfwResult<ManagedSection> {
        let span = op_span!(
            Level::INFO,
            "dfw.section.ensure",
            section.name = %name,
            section.id = tracing::field::Empty
        );
        let tracker = OperationTracker::new(DfwOperation::CreateSection.as_str(), span.clone());
        let result = self.ensure_inner(name).instrument(span).await;
        tracker.finish(result)
    }

    async fn ensure_inner(&self, name: &str) -> DfwResult<ManagedSection> {
        if let Some(existing) = self.find_section_by_name(name).await? {
            tracing::Span::current().record("section.id", existing.id.as_str());
            debug!("DFW section '{}' already exists ({})", name, existing.id);
            return Ok(ManagedSection::new(existing.id, existing.display_name));
        }

        info!("Creating DFW section '{}'", name);
        let path = PathBuilder::new()
            .operation(DfwOperation::CreateSection)
            .build_http_path()?;
        let body = serde_json::to_value(SectionSpec::layer3(name))?;

        let created = self
            .client
            .post(&path, &body)
            .await
            .map_err(|source| DfwError::CreateError {
                name: name.to_string(),
                source,
            })?;

        let section_id = created
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                DfwError::OperationFailed(format!(
                    "Creating section {name} was not acknowledged with an id"
                ))
            })?;
        tracing::Span::current().record("section.id", section_id.as_str());

        match self.find_section_by_id(&section_id).await? {
            Some(section) => {
                info!("Created DFW section '{}' ({})", name, section.id);
                Ok(ManagedSection::new(section.id, section.display_name))
            }
            None => Err(DfwError::Integrity(format!(
                "Section {name} was created with id {section_id} but cannot be found"
            ))),
        }
    }

    /// Delete a section without checking it exists before or after
    pub async fn delete_section(&self, section_id: &str) -> DfwResult<()> {
        let span = op_span!(Level::INFO, "dfw.section.delete", section.id = %section_id);
        let tracker = OperationTracker::new(DfwOperation::DeleteSection.as_str(), span.clone());

        let result: DfwResult<()> = async {
            let path = PathBuilder::new()
                .operation(DfwOperation::DeleteSection)
                .section(section_id)
                .build_http_path()?;
            self.client.delete(&path).await?;
            info!("Deleted DFW section {}", section_id);
            Ok(())
        }
        .instrument(span)
        .await;

        tracker.finish(result)
    }
}
