//! Common test utilities for the firewall integration and Pact tests
//!
//! Provides rustls crypto provider setup and the fixtures shared by every
//! test file.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::sync::{Arc, Once};

use nsx_dfw::prelude::*;
use serde_json::json;

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Must run before the first reqwest client is built.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}

/// Configuration with a custom managed section name
pub fn config(section_name: &str) -> DfwConfig {
    DfwConfig {
        section_name: section_name.to_string(),
        ..DfwConfig::default()
    }
}

/// Driver over a fresh in-memory store
pub async fn memory_dfw(config: &DfwConfig) -> (Arc<MemoryPolicyStore>, NsxtDfw) {
    let store = Arc::new(MemoryPolicyStore::new());
    let dfw = connect(&store, config).await;
    (store, dfw)
}

pub async fn connect(store: &Arc<MemoryPolicyStore>, config: &DfwConfig) -> NsxtDfw {
    NsxtDfw::connect(Arc::clone(store) as Arc<dyn PolicyStoreClient>, config)
        .await
        .expect("Failed to connect to in-memory store")
}

/// VM document with one NIC in one security group
pub fn vm_document(vm_id: &str, deploy_id: &str, network_id: &str, group_id: &str, group_name: &str) -> String {
    json!({
        "VM": {
            "ID": vm_id,
            "DEPLOY_ID": deploy_id,
            "TEMPLATE": {
                "NIC": {
                    "NETWORK_ID": network_id,
                    "SECURITY_GROUPS": group_id
                },
                "SECURITY_GROUP_RULE": [
                    {
                        "SECURITY_GROUP_ID": group_id,
                        "SECURITY_GROUP_NAME": group_name,
                        "PROTOCOL": "TCP",
                        "RULE_TYPE": "inbound"
                    },
                    {
                        "SECURITY_GROUP_ID": group_id,
                        "SECURITY_GROUP_NAME": group_name,
                        "PROTOCOL": "ALL",
                        "RULE_TYPE": "outbound"
                    }
                ]
            }
        }
    })
    .to_string()
}

/// Rule body as a rule creator would send it
pub fn allow_rule(name: &str) -> RuleSpec {
    RuleSpec::new(name)
        .with("action", json!("ALLOW"))
        .with("direction", json!("IN_OUT"))
        .with("ip_protocol", json!("IPV4_IPV6"))
        .with("logged", json!(false))
}
