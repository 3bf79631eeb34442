//! # Constants
//!
//! Shared constants used throughout the integration.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Display name of the section this integration owns on the NSX manager
pub const DEFAULT_SECTION_NAME: &str = "OpenNebula";

/// Section type used for the managed section
pub const SECTION_TYPE_LAYER3: &str = "LAYER3";

/// Field carrying the optimistic-concurrency token on NSX objects
pub const REVISION_FIELD: &str = "_revision";

/// Additional attempts after a revision conflict on create/update
pub const DEFAULT_CONFLICT_RETRIES: u32 = 3;

/// Default HTTP request timeout against the NSX manager (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default tracing filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "nsx_dfw=info";

/// Separator between the fields of a rule identity string
pub const RULE_NAME_SEPARATOR: &str = " - ";
