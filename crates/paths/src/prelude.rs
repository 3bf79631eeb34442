//! # Prelude
//!
//! Re-exports commonly used types for convenience.
//!
//! ```rust
//! use dfw_paths::prelude::*;
//! ```

pub use crate::builder::PathBuilder;
pub use crate::errors::PathBuilderError;
pub use crate::firewall::{parse_path, FirewallResource, NSXT_DFW_BASE};
pub use crate::formats::PathFormat;
pub use crate::operations::DfwOperation;
