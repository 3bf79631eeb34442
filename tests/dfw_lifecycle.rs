//! Section and rule lifecycle against the in-memory policy store

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use common::{allow_rule, config, connect, memory_dfw, vm_document};
use nsx_dfw::prelude::*;
use serde_json::json;

#[tokio::test]
async fn test_connect_twice_reuses_managed_section() {
    let store = Arc::new(MemoryPolicyStore::new());
    let config = config("ONE-managed");

    let first = connect(&store, &config).await;
    let second = connect(&store, &config).await;

    assert_eq!(first.managed_section(), second.managed_section());
    assert_eq!(store.section_count(), 1);
    assert_eq!(store.request_count("POST"), 1);
}

#[tokio::test]
async fn test_managed_section_is_findable_by_name() {
    let (_store, dfw) = memory_dfw(&config("ONE-managed")).await;

    let section = dfw
        .find_section_by_name("ONE-managed")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(section.id, dfw.managed_section().id());
    assert_eq!(section.section_type, SectionType::Layer3);
    assert!(section.stateful);

    let by_id = dfw.find_section_by_id(None).await.unwrap().unwrap();
    assert_eq!(by_id.display_name, "ONE-managed");
}

#[tokio::test]
async fn test_created_rule_round_trips_by_name() {
    let (_store, dfw) = memory_dfw(&config("OpenNebula")).await;
    let spec = allow_rule("10 - web - 7 - vm-1042 - 5");

    let created = dfw.create_rule(&spec).await.unwrap();
    let found = dfw
        .find_rule_by_name(&spec.display_name)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(found.id, created.id);
    assert_eq!(found.section_id.as_deref(), Some(dfw.managed_section().id()));
    assert_eq!(found.to_spec(), spec);
}

#[tokio::test]
async fn test_deleted_rule_stays_deleted() {
    let (store, dfw) = memory_dfw(&config("OpenNebula")).await;
    let rule = dfw.create_rule(&allow_rule("r1")).await.unwrap();

    dfw.delete_rule(&rule.id).await.unwrap();
    assert!(dfw.find_rule_by_id(&rule.id).await.unwrap().is_none());

    dfw.delete_rule(&rule.id).await.unwrap();
    assert_eq!(store.rule_count(), 0);
}

#[tokio::test]
async fn test_swallowed_delete_is_an_integrity_error() {
    let (store, dfw) = memory_dfw(&config("OpenNebula")).await;
    let rule = dfw.create_rule(&allow_rule("r1")).await.unwrap();
    store.swallow_rule_deletes(true);

    let err = dfw.delete_rule(&rule.id).await.unwrap_err();
    assert!(matches!(err, DfwError::Integrity(_)));
    assert!(err.to_string().contains(&rule.id));
}

#[tokio::test]
async fn test_conflicting_update_fails_without_retries() {
    let config = DfwConfig {
        conflict_retries: 0,
        ..config("OpenNebula")
    };
    let (store, dfw) = memory_dfw(&config).await;
    let rule = dfw.create_rule(&allow_rule("r1")).await.unwrap();

    store.inject_conflicts(1);
    let err = dfw
        .update_rule(&rule.id, &allow_rule("r1").with("action", json!("DROP")))
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    let unchanged = dfw.find_rule_by_id(&rule.id).await.unwrap().unwrap();
    assert_eq!(unchanged.payload["action"], "ALLOW");
}

#[tokio::test]
async fn test_conflicting_update_succeeds_after_reread() {
    let (store, dfw) = memory_dfw(&config("OpenNebula")).await;
    let rule = dfw.create_rule(&allow_rule("r1")).await.unwrap();

    store.inject_conflicts(2);
    let updated = dfw
        .update_rule(&rule.id, &allow_rule("r1").with("action", json!("DROP")))
        .await
        .unwrap();
    assert_eq!(updated.payload["action"], "DROP");
    assert_eq!(store.request_count("PUT"), 3);
}

#[tokio::test]
async fn test_conflicts_beyond_budget_give_up() {
    let config = DfwConfig {
        conflict_retries: 1,
        ..config("OpenNebula")
    };
    let (store, dfw) = memory_dfw(&config).await;

    store.inject_conflicts(5);
    let err = dfw.create_rule(&allow_rule("r1")).await.unwrap_err();
    assert!(matches!(err, DfwError::Conflict { attempts: 2, .. }));
    assert_eq!(store.rule_count(), 0);
}

#[tokio::test]
async fn test_clear_workload_is_idempotent() {
    let (store, dfw) = memory_dfw(&config("OpenNebula")).await;
    let workload = Workload::from_json(&vm_document("7", "vm-1042", "5", "10", "web")).unwrap();
    for name in derive_rule_names(&workload) {
        dfw.create_rule(&allow_rule(&name)).await.unwrap();
    }
    dfw.create_rule(&allow_rule("unrelated")).await.unwrap();

    let first = dfw.clear_workload_rules(&workload).await.unwrap();
    assert_eq!(first.deleted_count(), 1);
    let deletes = store.request_count("DELETE");

    let second = dfw.clear_workload_rules(&workload).await.unwrap();
    assert_eq!(second.deleted_count(), 0);
    assert_eq!(second.absent.len(), 1);
    assert_eq!(store.request_count("DELETE"), deletes);

    let remaining: Vec<String> = dfw
        .list_rules()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.display_name)
        .collect();
    assert_eq!(remaining, vec!["unrelated"]);
}

#[tokio::test]
async fn test_clear_workload_without_rules_is_a_no_op() {
    let (store, dfw) = memory_dfw(&config("OpenNebula")).await;
    let workload = Workload::from_json(r#"{"VM": {"ID": "3", "DEPLOY_ID": "vm-3"}}"#).unwrap();

    let report = dfw.clear_workload_rules(&workload).await.unwrap();
    assert_eq!(report, ClearReport::default());
    assert_eq!(store.request_count("DELETE"), 0);
}

#[tokio::test]
async fn test_name_derivation_is_deterministic() {
    let document = vm_document("7", "vm-1042", "5", "10", "web");
    let first = derive_rule_names(&Workload::from_json(&document).unwrap());
    let second = derive_rule_names(&Workload::from_json(&document).unwrap());

    assert_eq!(first, second);
    assert_eq!(
        first,
        BTreeSet::from(["10 - web - 7 - vm-1042 - 5".to_string()])
    );
}

#[tokio::test]
async fn test_workload_teardown_scenario() {
    let (_store, dfw) = memory_dfw(&config("ONE-managed")).await;
    let section = dfw
        .find_section_by_name("ONE-managed")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(section.id, dfw.managed_section().id());

    let workload = Workload::from_json(&vm_document("42", "vm-0042", "5", "10", "web")).unwrap();
    let names = derive_rule_names(&workload);
    let expected = "10 - web - 42 - vm-0042 - 5";
    assert_eq!(names, BTreeSet::from([expected.to_string()]));

    dfw.create_rule(&allow_rule(expected)).await.unwrap();
    assert!(dfw.find_rule_by_name(expected).await.unwrap().is_some());

    dfw.clear_workload_rules(&workload).await.unwrap();
    assert!(dfw.find_rule_by_name(expected).await.unwrap().is_none());
}

#[tokio::test]
async fn test_lookup_across_pages() {
    let store = Arc::new(MemoryPolicyStore::new().with_page_size(2));
    let dfw = connect(&store, &config("OpenNebula")).await;
    for i in 0..5 {
        dfw.create_rule(&allow_rule(&format!("rule-{i}"))).await.unwrap();
    }

    assert_eq!(dfw.list_rules().await.unwrap().len(), 5);
    let last = dfw.find_rule_by_name("rule-4").await.unwrap();
    assert!(last.is_some());
}

#[tokio::test]
async fn test_duplicate_rule_names_follow_policy() {
    let store = Arc::new(MemoryPolicyStore::new());
    let strict = connect(&store, &config("OpenNebula")).await;
    strict.create_rule(&allow_rule("dup")).await.unwrap();
    let newest = strict.create_rule(&allow_rule("dup")).await.unwrap();

    let err = strict.find_rule_by_name("dup").await.unwrap_err();
    assert!(matches!(err, DfwError::DuplicateName { count: 2, .. }));

    let lenient = connect(
        &store,
        &DfwConfig {
            duplicate_names: DuplicateNamePolicy::LastMatch,
            ..config("OpenNebula")
        },
    )
    .await;
    let picked = lenient.find_rule_by_name("dup").await.unwrap().unwrap();
    assert_eq!(picked.id, newest.id);
}

#[tokio::test]
async fn test_rules_of_deleted_section_are_not_found() {
    let store = Arc::new(MemoryPolicyStore::new());
    let dfw = connect(&store, &config("OpenNebula")).await;
    let section_id = dfw.managed_section().id().to_string();
    dfw.delete_section().await.unwrap();

    let rules = RuleRepository::new(
        Arc::clone(&store) as Arc<dyn PolicyStoreClient>,
        DuplicateNamePolicy::Reject,
        1,
    );
    let err = rules.list_rules(&section_id).await.unwrap_err();
    assert!(matches!(
        err,
        DfwError::ObjectNotFound {
            kind: ObjectKind::Section,
            ..
        }
    ));
    let err = rules.create_rule(&allow_rule("r1"), &section_id).await.unwrap_err();
    assert!(matches!(err, DfwError::ObjectNotFound { .. }));
}
