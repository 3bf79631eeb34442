//! # Transport
//!
//! Request/response primitives against the NSX manager.
//!
//! The firewall repositories only ever talk to a [`PolicyStoreClient`]:
//! - [`NsxRestClient`] speaks HTTP to a real NSX-T manager
//! - [`MemoryPolicyStore`] keeps the same surface in process (tests, dry runs)

mod memory;
mod responses;
mod rest;

pub use memory::MemoryPolicyStore;
pub use responses::{ListResponse, NsxErrorResponse};
pub use rest::NsxRestClient;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors raised by the transport layer
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The store rejected a write because the presented revision is stale
    #[error("Revision conflict (HTTP {status}): {message}")]
    Conflict { status: u16, message: String },

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl TransportError {
    /// Whether re-reading the revision and retrying could succeed
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, TransportError::Conflict { .. })
    }
}

/// Primitive REST verbs against the policy store
///
/// Paths are absolute API paths as produced by `dfw_paths::PathBuilder`.
#[async_trait]
pub trait PolicyStoreClient: Send + Sync {
    /// Fetch a resource; `Ok(None)` when the store answers 404
    async fn get(&self, path: &str) -> Result<Option<Value>, TransportError>;

    /// Create a resource; returns the response body (`Value::Null` when empty)
    async fn post(&self, path: &str, body: &Value) -> Result<Value, TransportError>;

    /// Replace a resource; returns the response body (`Value::Null` when empty)
    async fn put(&self, path: &str, body: &Value) -> Result<Value, TransportError>;

    /// Delete a resource
    ///
    /// NSX answers 200 even when the target never existed.
    async fn delete(&self, path: &str) -> Result<(), TransportError>;
}
