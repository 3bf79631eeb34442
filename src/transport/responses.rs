// ============================================================================
// NSX-T API Response Structures
// ============================================================================
// Wrappers shared by every firewall endpoint. Object payloads themselves are
// modelled in `crate::model`.
// ============================================================================

use serde::{Deserialize, Serialize};

/// Paginated list wrapper
///
/// Every NSX list endpoint answers `{ "results": [...], "cursor": "..." }`.
/// The cursor is absent on the last page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_count: Option<u64>,
}

/// NSX API error body
///
/// Returned with every non-2xx answer from the manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NsxErrorResponse {
    #[serde(rename = "httpStatus", default)]
    pub http_status: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub module_name: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl NsxErrorResponse {
    /// Render a one-line message, falling back to the raw body when it does not parse
    pub fn describe(body: &str) -> String {
        match serde_json::from_str::<NsxErrorResponse>(body) {
            Ok(err) if err.error_message.is_some() => format!(
                "NSX error code: {}, module: {}, details: {}",
                err.error_code.map_or_else(|| "?".to_string(), |c| c.to_string()),
                err.module_name.as_deref().unwrap_or("?"),
                err.error_message.as_deref().unwrap_or_default()
            ),
            _ => body.to_string(),
        }
    }
}
