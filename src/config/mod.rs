//! # Configuration
//!
//! Settings loaded from environment variables.
//!
//! - `dfw`: NSX manager connection and firewall behaviour

mod dfw;

pub use dfw::{DfwConfig, DuplicateNamePolicy, LogFormat};
