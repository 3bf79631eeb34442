//! In-memory policy store
//!
//! Implements the firewall REST surface in process, including the behaviours
//! the repositories have to cope with on a real manager:
//! - `_revision` compare-and-swap on rule create/update (HTTP 412 when stale)
//! - section revision bumps on every rule change
//! - DELETE answering success for ids that never existed
//! - cursor pagination on list endpoints
//!
//! Fault switches let tests provoke conflicts, swallowed deletes, refused
//! section creation and unacknowledged writes.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use dfw_paths::prelude::*;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{PolicyStoreClient, TransportError};
use crate::constants::{REVISION_FIELD, SECTION_TYPE_LAYER3};

#[derive(Debug, Default)]
struct StoreState {
    sections: Vec<Map<String, Value>>,
    rules: Vec<Map<String, Value>>,
    next_id: u64,
    page_size: Option<usize>,
    faults: StoreFaults,
    requests: Vec<(String, String)>,
}

#[derive(Debug, Default, Clone, Copy)]
struct StoreFaults {
    pending_conflicts: u32,
    swallow_rule_deletes: bool,
    hide_new_sections: bool,
    unacknowledged_writes: bool,
    reject_section_creates: bool,
}

/// In-process NSX firewall store
#[derive(Debug, Default)]
pub struct MemoryPolicyStore {
    state: Mutex<StoreState>,
}

impl MemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split list answers into pages of `size` with a cursor
    #[must_use]
    pub fn with_page_size(self, size: usize) -> Self {
        self.lock().page_size = Some(size.max(1));
        self
    }

    /// Reject the next `count` rule writes as if another actor had just changed the object
    pub fn inject_conflicts(&self, count: u32) {
        self.lock().faults.pending_conflicts = count;
    }

    /// Answer rule DELETEs with success without removing anything
    pub fn swallow_rule_deletes(&self, enabled: bool) {
        self.lock().faults.swallow_rule_deletes = enabled;
    }

    /// Accept section creation but never return the new section from GET
    pub fn hide_new_sections(&self, enabled: bool) {
        self.lock().faults.hide_new_sections = enabled;
    }

    /// Answer POST/PUT with an empty body and apply nothing
    pub fn unacknowledged_writes(&self, enabled: bool) {
        self.lock().faults.unacknowledged_writes = enabled;
    }

    /// Refuse section creation with HTTP 403, as a manager does for a read-only user
    pub fn reject_section_creates(&self, enabled: bool) {
        self.lock().faults.reject_section_creates = enabled;
    }

    /// Seed a section directly, bypassing the API (e.g. one created by another actor)
    pub fn insert_section(&self, display_name: &str) -> String {
        let mut state = self.lock();
        let id = state.allocate_id("section");
        let section = json!({
            "id": id,
            "display_name": display_name,
            "section_type": SECTION_TYPE_LAYER3,
            "stateful": true,
            "rule_count": 0,
            "_revision": 0,
        });
        if let Value::Object(map) = section {
            state.sections.push(map);
        }
        id
    }

    /// Bump a rule's revision as a concurrent writer would
    pub fn touch_rule(&self, rule_id: &str) -> bool {
        let mut state = self.lock();
        match state.rules.iter_mut().find(|r| id_of(r) == Some(rule_id)) {
            Some(rule) => {
                bump_revision(rule);
                true
            }
            None => false,
        }
    }

    /// Every request seen so far as `(method, path)`
    pub fn requests(&self) -> Vec<(String, String)> {
        self.lock().requests.clone()
    }

    /// Number of requests seen with the given method
    pub fn request_count(&self, method: &str) -> usize {
        self.lock().requests.iter().filter(|(m, _)| m == method).count()
    }

    pub fn section_count(&self) -> usize {
        self.lock().sections.len()
    }

    pub fn rule_count(&self) -> usize {
        self.lock().rules.len()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StoreState {
    fn allocate_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{:04}", self.next_id)
    }

    fn record(&mut self, method: &str, path: &str) {
        debug!("memory store {} {}", method, path);
        self.requests.push((method.to_string(), path.to_string()));
    }

    fn section_mut(&mut self, section_id: &str) -> Option<&mut Map<String, Value>> {
        self.sections
            .iter_mut()
            .find(|s| id_of(s) == Some(section_id))
    }

    fn take_conflict(&mut self) -> bool {
        if self.faults.pending_conflicts > 0 {
            self.faults.pending_conflicts -= 1;
            return true;
        }
        false
    }

    fn page(&self, items: Vec<Value>, path: &str) -> Value {
        let offset = cursor_of(path).unwrap_or(0);
        let total = items.len();
        let (results, cursor) = match self.page_size {
            Some(size) => {
                let end = (offset + size).min(total);
                let page: Vec<Value> = items.into_iter().skip(offset).take(size).collect();
                (page, (end < total).then(|| end.to_string()))
            }
            None => (items, None),
        };

        let mut body = json!({ "results": results, "result_count": total });
        if let (Some(cursor), Value::Object(map)) = (cursor, &mut body) {
            map.insert("cursor".to_string(), Value::String(cursor));
        }
        body
    }
}

fn id_of(object: &Map<String, Value>) -> Option<&str> {
    object.get("id").and_then(Value::as_str)
}

fn revision_of(object: &Map<String, Value>) -> Option<i64> {
    object.get(REVISION_FIELD).and_then(Value::as_i64)
}

fn bump_revision(object: &mut Map<String, Value>) {
    let next = revision_of(object).unwrap_or(0) + 1;
    object.insert(REVISION_FIELD.to_string(), Value::from(next));
}

fn cursor_of(path: &str) -> Option<usize> {
    let (_, query) = path.split_once('?')?;
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("cursor="))
        .and_then(|c| c.parse().ok())
}

fn not_found(what: &str) -> TransportError {
    TransportError::Status {
        status: 404,
        message: format!("{what} not found"),
    }
}

fn stale_revision(what: &str) -> TransportError {
    TransportError::Conflict {
        status: 412,
        message: format!("{what} was modified by somebody else"),
    }
}

fn unsupported(method: &str, path: &str) -> TransportError {
    TransportError::Status {
        status: 400,
        message: format!("unsupported request {method} {path}"),
    }
}

fn body_object(body: &Value) -> Result<Map<String, Value>, TransportError> {
    match body {
        Value::Object(map) => Ok(map.clone()),
        _ => Err(TransportError::Status {
            status: 400,
            message: "request body must be a JSON object".to_string(),
        }),
    }
}

#[async_trait]
impl PolicyStoreClient for MemoryPolicyStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, TransportError> {
        let mut state = self.lock();
        state.record("GET", path);

        match parse_path(path) {
            Some(FirewallResource::Sections) => {
                let items = state.sections.iter().cloned().map(Value::Object).collect();
                Ok(Some(state.page(items, path)))
            }
            Some(FirewallResource::Section { section_id }) => Ok(state
                .sections
                .iter()
                .find(|s| id_of(s) == Some(section_id.as_str()))
                .cloned()
                .map(Value::Object)),
            Some(FirewallResource::SectionRules { section_id }) => {
                if state.section_mut(&section_id).is_none() {
                    return Ok(None);
                }
                let items = state
                    .rules
                    .iter()
                    .filter(|r| {
                        r.get("section_id").and_then(Value::as_str) == Some(section_id.as_str())
                    })
                    .cloned()
                    .map(Value::Object)
                    .collect();
                Ok(Some(state.page(items, path)))
            }
            Some(FirewallResource::Rule { rule_id }) => Ok(state
                .rules
                .iter()
                .find(|r| id_of(r) == Some(rule_id.as_str()))
                .cloned()
                .map(Value::Object)),
            Some(FirewallResource::SectionRule { .. }) | None => Err(unsupported("GET", path)),
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, TransportError> {
        let mut state = self.lock();
        state.record("POST", path);
        let mut object = body_object(body)?;

        if state.faults.unacknowledged_writes {
            return Ok(Value::Null);
        }

        match parse_path(path) {
            Some(FirewallResource::Sections) => {
                if state.faults.reject_section_creates {
                    return Err(TransportError::Status {
                        status: 403,
                        message: "The user is not allowed to create sections".to_string(),
                    });
                }
                let id = state.allocate_id("section");
                object.insert("id".to_string(), Value::String(id));
                object.insert("rule_count".to_string(), Value::from(0));
                object.insert(REVISION_FIELD.to_string(), Value::from(0));
                if state.faults.hide_new_sections {
                    return Ok(Value::Object(object));
                }
                state.sections.push(object.clone());
                Ok(Value::Object(object))
            }
            Some(FirewallResource::SectionRules { section_id }) => {
                let conflict = state.take_conflict();
                let Some(section) = state.section_mut(&section_id) else {
                    return Err(not_found(&format!("Section {section_id}")));
                };
                if conflict {
                    bump_revision(section);
                    return Err(stale_revision(&format!("Section {section_id}")));
                }
                if object.get(REVISION_FIELD).and_then(Value::as_i64) != revision_of(section) {
                    return Err(stale_revision(&format!("Section {section_id}")));
                }
                bump_revision(section);
                let rule_count = section.get("rule_count").and_then(Value::as_u64).unwrap_or(0);
                section.insert("rule_count".to_string(), Value::from(rule_count + 1));

                let id = state.allocate_id("rule");
                object.insert("id".to_string(), Value::String(id));
                object.insert("section_id".to_string(), Value::String(section_id));
                object.insert(REVISION_FIELD.to_string(), Value::from(0));
                state.rules.push(object.clone());
                Ok(Value::Object(object))
            }
            _ => Err(unsupported("POST", path)),
        }
    }

    async fn put(&self, path: &str, body: &Value) -> Result<Value, TransportError> {
        let mut state = self.lock();
        state.record("PUT", path);
        let mut object = body_object(body)?;

        if state.faults.unacknowledged_writes {
            return Ok(Value::Null);
        }

        let Some(FirewallResource::SectionRule {
            section_id,
            rule_id,
        }) = parse_path(path)
        else {
            return Err(unsupported("PUT", path));
        };

        let conflict = state.take_conflict();
        let Some(position) = state.rules.iter().position(|r| {
            id_of(r) == Some(rule_id.as_str())
                && r.get("section_id").and_then(Value::as_str) == Some(section_id.as_str())
        }) else {
            return Err(not_found(&format!("Rule {rule_id}")));
        };

        let current = &mut state.rules[position];
        if conflict {
            bump_revision(current);
            return Err(stale_revision(&format!("Rule {rule_id}")));
        }
        let current_revision = revision_of(current);
        if object.get(REVISION_FIELD).and_then(Value::as_i64) != current_revision {
            return Err(stale_revision(&format!("Rule {rule_id}")));
        }

        object.insert("id".to_string(), Value::String(rule_id));
        object.insert("section_id".to_string(), Value::String(section_id.clone()));
        object.insert(
            REVISION_FIELD.to_string(),
            Value::from(current_revision.unwrap_or(0) + 1),
        );
        *current = object.clone();

        if let Some(section) = state.section_mut(&section_id) {
            bump_revision(section);
        }
        Ok(Value::Object(object))
    }

    async fn delete(&self, path: &str) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.record("DELETE", path);

        match parse_path(path) {
            Some(FirewallResource::Section { section_id }) => {
                state.sections.retain(|s| id_of(s) != Some(section_id.as_str()));
                state
                    .rules
                    .retain(|r| r.get("section_id").and_then(Value::as_str) != Some(section_id.as_str()));
                Ok(())
            }
            Some(FirewallResource::SectionRule {
                section_id,
                rule_id,
            }) => {
                if state.faults.swallow_rule_deletes {
                    return Ok(());
                }
                let before = state.rules.len();
                state.rules.retain(|r| id_of(r) != Some(rule_id.as_str()));
                if state.rules.len() < before {
                    if let Some(section) = state.section_mut(&section_id) {
                        bump_revision(section);
                    }
                }
                Ok(())
            }
            _ => Err(unsupported("DELETE", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECTIONS: &str = "/api/v1/firewall/sections";

    #[tokio::test]
    async fn test_create_rule_requires_current_section_revision() {
        let store = MemoryPolicyStore::new();
        let section_id = store.insert_section("OpenNebula");
        let rules_path = format!("{SECTIONS}/{section_id}/rules");

        let stale = store
            .post(&rules_path, &json!({"display_name": "r", "_revision": 7}))
            .await
            .unwrap_err();
        assert!(stale.is_conflict());

        let created = store
            .post(&rules_path, &json!({"display_name": "r", "_revision": 0}))
            .await
            .unwrap();
        assert_eq!(created["section_id"], section_id.as_str());

        let section = store
            .get(&format!("{SECTIONS}/{section_id}"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(section["_revision"], 1);
    }

    #[tokio::test]
    async fn test_delete_of_missing_rule_succeeds() {
        let store = MemoryPolicyStore::new();
        let section_id = store.insert_section("OpenNebula");
        store
            .delete(&format!("{SECTIONS}/{section_id}/rules/nope"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_rules_of_missing_section_is_absent() {
        let store = MemoryPolicyStore::new();
        let listed = store.get(&format!("{SECTIONS}/missing/rules")).await.unwrap();
        assert!(listed.is_none());
    }

    #[tokio::test]
    async fn test_pagination_cursor() {
        let store = MemoryPolicyStore::new().with_page_size(2);
        for name in ["a", "b", "c"] {
            store.insert_section(name);
        }

        let first = store.get(SECTIONS).await.unwrap().unwrap();
        assert_eq!(first["results"].as_array().unwrap().len(), 2);
        assert_eq!(first["cursor"], "2");

        let second = store
            .get(&format!("{SECTIONS}?cursor=2"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second["results"].as_array().unwrap().len(), 1);
        assert!(second.get("cursor").is_none());
    }

    #[tokio::test]
    async fn test_unacknowledged_write_returns_null() {
        let store = MemoryPolicyStore::new();
        store.unacknowledged_writes(true);
        let answer = store
            .post(SECTIONS, &json!({"display_name": "x"}))
            .await
            .unwrap();
        assert_eq!(answer, Value::Null);
        assert_eq!(store.section_count(), 0);
    }
}
