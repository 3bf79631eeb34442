//! NSX-T Distributed Firewall Library
//!
//! Keeps one firewall section per cloud installation on an NSX-T manager and
//! manages the rules inside it, including removal of every rule created for
//! a VM when it is torn down.
//!
//! ```no_run
//! use std::sync::Arc;
//! use nsx_dfw::prelude::*;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = DfwConfig::from_env()?;
//! let client = Arc::new(NsxRestClient::new(&config)?);
//! let dfw = NsxtDfw::connect(client, &config).await?;
//!
//! let workload = Workload::from_json(&std::fs::read_to_string("vm.json")?)?;
//! let report = dfw.clear_workload_rules(&workload).await?;
//! println!("cleared {} rule(s)", report.deleted_count());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod dfw;
pub mod error;
pub mod model;
pub mod observability;
pub mod prelude;
pub mod transport;
pub mod workload;

pub use dfw_paths as paths;
