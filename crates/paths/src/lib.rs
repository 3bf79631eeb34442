//! Shared API path definitions for the NSX-T distributed firewall
//!
//! This crate centralizes all firewall API paths so the REST client, the
//! in-memory policy store and the contract tests agree on one surface.
//!
//! ## Quick Start
//!
//! ```rust
//! use dfw_paths::prelude::*;
//!
//! let path = PathBuilder::new()
//!     .operation(DfwOperation::CreateRule)
//!     .section("section-1")
//!     .build_http_path()
//!     .unwrap();
//! assert_eq!(path, "/api/v1/firewall/sections/section-1/rules");
//! ```
//!
//! ## Parsing
//!
//! [`firewall::parse_path`] is the inverse of the builder: it classifies an
//! incoming HTTP path into the resource it addresses.

pub mod builder;
pub mod errors;
pub mod firewall;
pub mod formats;
pub mod operations;
pub mod prelude;
