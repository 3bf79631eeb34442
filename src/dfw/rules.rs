use std::sync::Arc;

use dfw_paths::prelude::*;
use serde_json::Value;
use tracing::{debug, info, warn, Instrument, Level};

use super::{list_all, pick_by_name};
use crate::config::DuplicateNamePolicy;
use crate::error::{DfwError, DfwResult, ObjectKind};
use crate::model::{Rule, RuleSpec, Section};
use crate::observability::metrics;
use crate::observability::tracker::op_span;
use crate::observability::OperationTracker;
use crate::transport::{PolicyStoreClient, TransportError};

/// Firewall rules inside a section
///
/// Writes present the `_revision` read immediately before them. When the
/// manager reports the revision stale, the revision is read again and the
/// write repeated, at most `max_attempts` times in total.
pub struct RuleRepository {
    client: Arc<dyn PolicyStoreClient>,
    duplicate_names: DuplicateNamePolicy,
    max_attempts: u32,
}

impl std::fmt::Debug for RuleRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRepository")
            .field("duplicate_names", &self.duplicate_names)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

/// Outcome of one write attempt
enum Attempt<T> {
    Done(T),
    Stale(TransportError),
}

impl RuleRepository {
    pub fn new(
        client: Arc<dyn PolicyStoreClient>,
        duplicate_names: DuplicateNamePolicy,
        max_attempts: u32,
    ) -> Self {
        Self {
            client,
            duplicate_names,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Rules of a section in manager order
    ///
    /// # Errors
    /// `ObjectNotFound` when the section does not exist
    pub async fn list_rules(&self, section_id: &str) -> DfwResult<Vec<Rule>> {
        let span = op_span!(
            Level::DEBUG,
            "dfw.rule.list",
            section.id = %section_id,
            rule.count = tracing::field::Empty
        );
        let tracker = OperationTracker::new(DfwOperation::ListRules.as_str(), span.clone());

        let result: DfwResult<Vec<Rule>> = async {
            let rules = list_all::<Rule>(self.client.as_ref(), DfwOperation::ListRules, Some(section_id))
                .await?
                .ok_or_else(|| DfwError::not_found(ObjectKind::Section, section_id))?;
            tracing::Span::current().record("rule.count", rules.len());
            debug!("Listed {} rule(s) in DFW section {}", rules.len(), section_id);
            Ok(rules)
        }
        .instrument(span)
        .await;

        tracker.finish(result)
    }

    pub async fn find_rule_by_id(&self, rule_id: &str) -> DfwResult<Option<Rule>> {
        let path = PathBuilder::new()
            .operation(DfwOperation::GetRule)
            .rule(rule_id)
            .build_http_path()?;

        match self.client.get(&path).await? {
            Some(body) => Ok(Some(serde_json::from_value(body)?)),
            None => Ok(None),
        }
    }

    /// Rule named `name` in the section
    ///
    /// Without a section there is nothing to search and no request is made.
    pub async fn find_rule_by_name(
        &self,
        name: &str,
        section_id: Option<&str>,
    ) -> DfwResult<Option<Rule>> {
        let Some(section_id) = section_id else {
            return Ok(None);
        };

        let rules = self.list_rules(section_id).await?;
        pick_by_name(
            rules,
            name,
            ObjectKind::Rule,
            self.duplicate_names,
            |r: &Rule| r.display_name.as_str(),
        )
    }

    /// Create a rule, stamped with the section's current revision
    ///
    /// # Errors
    /// - `ObjectNotFound` when the section does not exist
    /// - `OperationFailed` when the manager does not acknowledge the rule
    /// - `Conflict` when the section revision stayed stale for every attempt
    pub async fn create_rule(&self, spec: &RuleSpec, section_id: &str) -> DfwResult<Rule> {
        let span = op_span!(
            Level::INFO,
            "dfw.rule.create",
            section.id = %section_id,
            rule.name = %spec.display_name,
            rule.id = tracing::field::Empty
        );
        let tracker = OperationTracker::new(DfwOperation::CreateRule.as_str(), span.clone());

        let result: DfwResult<Rule> = async {
            let path = PathBuilder::new()
                .operation(DfwOperation::CreateRule)
                .section(section_id)
                .build_http_path()?;

            let mut last_conflict = None;
            for attempt in 1..=self.max_attempts {
                match self.try_create(spec, section_id, &path).await? {
                    Attempt::Done(rule) => {
                        tracing::Span::current().record("rule.id", rule.id.as_str());
                        info!(
                            "Created rule '{}' ({}) in DFW section {}",
                            rule.display_name, rule.id, section_id
                        );
                        return Ok(rule);
                    }
                    Attempt::Stale(err) => {
                        self.note_conflict(ObjectKind::Section, section_id, attempt, &err);
                        last_conflict = Some(err);
                    }
                }
            }

            Err(self.conflict_exhausted(ObjectKind::Section, section_id, last_conflict))
        }
        .instrument(span)
        .await;

        tracker.finish(result)
    }

    async fn try_create(&self, spec: &RuleSpec, section_id: &str, path: &str) -> DfwResult<Attempt<Rule>> {
        let section = self
            .fetch_section(section_id)
            .await?
            .ok_or_else(|| DfwError::not_found(ObjectKind::Section, section_id))?;
        debug!(
            "DFW section {} is at revision {}",
            section_id, section.revision
        );

        match self.client.post(path, &spec.to_body(&section.revision)).await {
            Ok(Value::Null) => Err(DfwError::OperationFailed(format!(
                "Creating rule {} in section {} was not acknowledged",
                spec.display_name, section_id
            ))),
            Ok(body) => Ok(Attempt::Done(serde_json::from_value(body)?)),
            Err(err) if err.is_conflict() => Ok(Attempt::Stale(err)),
            Err(err) => Err(err.into()),
        }
    }

    /// Replace a rule, stamped with the rule's current revision
    ///
    /// # Errors
    /// - `ObjectNotFound` when the rule does not exist
    /// - `OperationFailed` when the manager does not acknowledge the update
    /// - `Conflict` when the rule revision stayed stale for every attempt
    pub async fn update_rule(
        &self,
        rule_id: &str,
        spec: &RuleSpec,
        section_id: &str,
    ) -> DfwResult<Rule> {
        let span = op_span!(
            Level::INFO,
            "dfw.rule.update",
            section.id = %section_id,
            rule.id = %rule_id,
            rule.name = %spec.display_name
        );
        let tracker = OperationTracker::new(DfwOperation::UpdateRule.as_str(), span.clone());

        let result: DfwResult<Rule> = async {
            let path = PathBuilder::new()
                .operation(DfwOperation::UpdateRule)
                .section(section_id)
                .rule(rule_id)
                .build_http_path()?;

            let mut last_conflict = None;
            for attempt in 1..=self.max_attempts {
                match self.try_update(rule_id, spec, &path).await? {
                    Attempt::Done(rule) => {
                        info!("Updated rule '{}' ({})", rule.display_name, rule.id);
                        return Ok(rule);
                    }
                    Attempt::Stale(err) => {
                        self.note_conflict(ObjectKind::Rule, rule_id, attempt, &err);
                        last_conflict = Some(err);
                    }
                }
            }

            Err(self.conflict_exhausted(ObjectKind::Rule, rule_id, last_conflict))
        }
        .instrument(span)
        .await;

        tracker.finish(result)
    }

    async fn try_update(&self, rule_id: &str, spec: &RuleSpec, path: &str) -> DfwResult<Attempt<Rule>> {
        let current = self
            .find_rule_by_id(rule_id)
            .await?
            .ok_or_else(|| DfwError::not_found(ObjectKind::Rule, rule_id))?;
        debug!("Rule {} is at revision {}", rule_id, current.revision);

        match self.client.put(path, &spec.to_body(&current.revision)).await {
            Ok(Value::Null) => Err(DfwError::OperationFailed(format!(
                "Updating rule {rule_id} was not acknowledged"
            ))),
            Ok(body) => Ok(Attempt::Done(serde_json::from_value(body)?)),
            Err(err) if err.is_conflict() => Ok(Attempt::Stale(err)),
            Err(err) => Err(err.into()),
        }
    }

    /// Delete a rule and confirm it is gone
    ///
    /// The manager answers success for ids that never existed, so only a
    /// follow-up lookup proves the deletion. Deleting an absent rule succeeds.
    ///
    /// # Errors
    /// `Integrity` when the rule can still be read after the delete
    pub async fn delete_rule(&self, rule_id: &str, section_id: &str) -> DfwResult<()> {
        let span = op_span!(
            Level::INFO,
            "dfw.rule.delete",
            section.id = %section_id,
            rule.id = %rule_id
        );
        let tracker = OperationTracker::new(DfwOperation::DeleteRule.as_str(), span.clone());

        let result: DfwResult<()> = async {
            let path = PathBuilder::new()
                .operation(DfwOperation::DeleteRule)
                .section(section_id)
                .rule(rule_id)
                .build_http_path()?;
            self.client.delete(&path).await?;

            if self.find_rule_by_id(rule_id).await?.is_some() {
                return Err(DfwError::Integrity(format!(
                    "Error deleting rule {rule_id} in DFW"
                )));
            }
            info!("Deleted rule {} from DFW section {}", rule_id, section_id);
            Ok(())
        }
        .instrument(span)
        .await;

        tracker.finish(result)
    }

    async fn fetch_section(&self, section_id: &str) -> DfwResult<Option<Section>> {
        let path = PathBuilder::new()
            .operation(DfwOperation::GetSection)
            .section(section_id)
            .build_http_path()?;

        match self.client.get(&path).await? {
            Some(body) => Ok(Some(serde_json::from_value(body)?)),
            None => Ok(None),
        }
    }

    fn note_conflict(&self, kind: ObjectKind, id: &str, attempt: u32, err: &TransportError) {
        if attempt < self.max_attempts {
            warn!(
                "{} {} revision is stale (attempt {}/{}), re-reading: {}",
                kind, id, attempt, self.max_attempts, err
            );
            metrics::increment_conflict_retries();
        }
    }

    fn conflict_exhausted(
        &self,
        kind: ObjectKind,
        id: &str,
        last_conflict: Option<TransportError>,
    ) -> DfwError {
        if let Some(err) = last_conflict {
            warn!("Giving up on {} {}: {}", kind, id, err);
        }
        DfwError::Conflict {
            kind,
            id: id.to_string(),
            attempts: self.max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Revision;
    use crate::transport::MemoryPolicyStore;
    use serde_json::json;

    fn setup(max_attempts: u32) -> (Arc<MemoryPolicyStore>, RuleRepository, String) {
        let store = Arc::new(MemoryPolicyStore::new());
        let section_id = store.insert_section("OpenNebula");
        let rules = RuleRepository::new(
            Arc::clone(&store) as Arc<dyn PolicyStoreClient>,
            DuplicateNamePolicy::Reject,
            max_attempts,
        );
        (store, rules, section_id)
    }

    fn web_rule() -> RuleSpec {
        RuleSpec::new("10 - web - 7 - vm-1042 - 5")
            .with("action", json!("ALLOW"))
            .with("direction", json!("IN_OUT"))
    }

    #[tokio::test]
    async fn test_create_then_find_by_name() {
        let (_store, rules, section_id) = setup(1);
        let created = rules.create_rule(&web_rule(), &section_id).await.unwrap();

        let found = rules
            .find_rule_by_name(&web_rule().display_name, Some(&section_id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.payload["action"], "ALLOW");
        assert_eq!(found.payload["direction"], "IN_OUT");
    }

    #[tokio::test]
    async fn test_create_in_missing_section() {
        let (_store, rules, _) = setup(1);
        let err = rules.create_rule(&web_rule(), "missing").await.unwrap_err();
        assert!(matches!(
            err,
            DfwError::ObjectNotFound {
                kind: ObjectKind::Section,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_create_retries_after_conflict() {
        let (store, rules, section_id) = setup(3);
        store.inject_conflicts(2);

        rules.create_rule(&web_rule(), &section_id).await.unwrap();
        assert_eq!(store.rule_count(), 1);
        assert_eq!(store.request_count("POST"), 3);
    }

    #[tokio::test]
    async fn test_create_without_retries_fails_on_conflict() {
        let (store, rules, section_id) = setup(1);
        store.inject_conflicts(1);

        let err = rules.create_rule(&web_rule(), &section_id).await.unwrap_err();
        assert!(matches!(err, DfwError::Conflict { attempts: 1, .. }));
        assert_eq!(store.rule_count(), 0);
    }

    #[tokio::test]
    async fn test_update_uses_rule_revision() {
        let (store, rules, section_id) = setup(1);
        let created = rules.create_rule(&web_rule(), &section_id).await.unwrap();
        assert!(store.touch_rule(&created.id));

        let updated = rules
            .update_rule(
                &created.id,
                &web_rule().with("action", json!("DROP")),
                &section_id,
            )
            .await
            .unwrap();
        assert_eq!(updated.payload["action"], "DROP");
        assert_eq!(updated.revision, Revision::new(2));
    }

    #[tokio::test]
    async fn test_update_missing_rule() {
        let (_store, rules, section_id) = setup(1);
        let err = rules
            .update_rule("nope", &web_rule(), &section_id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DfwError::ObjectNotFound {
                kind: ObjectKind::Rule,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unacknowledged_create() {
        let (store, rules, section_id) = setup(1);
        store.unacknowledged_writes(true);
        let err = rules.create_rule(&web_rule(), &section_id).await.unwrap_err();
        assert!(matches!(err, DfwError::OperationFailed(_)));
    }

    #[tokio::test]
    async fn test_unacknowledged_update() {
        let (store, rules, section_id) = setup(1);
        let created = rules.create_rule(&web_rule(), &section_id).await.unwrap();

        store.unacknowledged_writes(true);
        let err = rules
            .update_rule(&created.id, &web_rule(), &section_id)
            .await
            .unwrap_err();
        assert!(matches!(err, DfwError::OperationFailed(ref msg) if msg.contains(&created.id)));
    }

    #[tokio::test]
    async fn test_delete_is_verified() {
        let (store, rules, section_id) = setup(1);
        let created = rules.create_rule(&web_rule(), &section_id).await.unwrap();

        store.swallow_rule_deletes(true);
        let err = rules.delete_rule(&created.id, &section_id).await.unwrap_err();
        assert!(matches!(err, DfwError::Integrity(_)));

        store.swallow_rule_deletes(false);
        rules.delete_rule(&created.id, &section_id).await.unwrap();
        rules.delete_rule(&created.id, &section_id).await.unwrap();
        assert!(rules.find_rule_by_id(&created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_name_without_section_makes_no_request() {
        let (store, rules, _) = setup(1);
        assert!(rules.find_rule_by_name("x", None).await.unwrap().is_none());
        assert!(store.requests().is_empty());
    }

    #[tokio::test]
    async fn test_list_rules_of_missing_section() {
        let (_store, rules, _) = setup(1);
        let err = rules.list_rules("missing").await.unwrap_err();
        assert!(matches!(err, DfwError::ObjectNotFound { .. }));
    }
}
