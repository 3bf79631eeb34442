//! # nsx-dfw CLI
//!
//! Operator commands against the NSX-T distributed firewall.
//!
//! ## Usage
//!
//! ```bash
//! # Find or create the managed section
//! nsx-dfw init-section
//!
//! # List rules in the managed section
//! nsx-dfw rules
//!
//! # Show the rule names derived for a VM, then remove those rules
//! nsx-dfw derive-names --workload vm-7.json
//! nsx-dfw clear-workload --workload vm-7.json
//!
//! # Try any command against an empty in-memory store
//! nsx-dfw --dry-run init-section
//! ```

mod rules;
mod sections;
mod workload;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use nsx_dfw::config::DfwConfig;
use nsx_dfw::dfw::NsxtDfw;
use nsx_dfw::transport::{MemoryPolicyStore, NsxRestClient, PolicyStoreClient};

/// NSX-T distributed firewall section and rule manager
#[derive(Debug, Parser)]
#[command(name = "nsx-dfw", version)]
#[command(
    about = "Manage the cloud-owned NSX-T distributed firewall section and its rules",
    long_about = None,
    after_help = "\
Connection settings are read from the environment:
  NSX_MANAGER_URL, NSX_USER, NSX_PASSWORD, NSX_SECTION_NAME,
  NSX_CONFLICT_RETRIES, NSX_DUPLICATE_NAMES, NSX_VERIFY_TLS, NSX_TIMEOUT_SECS

Examples:
  nsx-dfw init-section
  nsx-dfw rule --name '10 - web - 7 - vm-1042 - 5'
  nsx-dfw clear-workload --workload vm-7.json
"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Run against an empty in-memory store instead of the NSX manager
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Managed section name (overrides NSX_SECTION_NAME)
    #[arg(long, global = true, value_name = "NAME")]
    pub section_name: Option<String>,

    /// Print Prometheus metrics to stderr when the command finishes
    #[arg(long, global = true)]
    pub metrics: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Find or create the managed section
    #[command(name = "init-section")]
    InitSection,

    /// List every section visible to the configured user
    Sections,

    /// Delete a section (the managed one unless --id is given)
    #[command(name = "delete-section")]
    DeleteSection {
        /// Section id
        #[arg(long, value_name = "ID")]
        id: Option<String>,
    },

    /// List rules of a section (the managed one unless --section is given)
    Rules {
        /// Section id
        #[arg(long, value_name = "ID")]
        section: Option<String>,
    },

    /// Show one rule of the managed section
    #[command(group(ArgGroup::new("lookup").required(true).args(["name", "id"])))]
    Rule {
        /// Rule display name
        #[arg(long, value_name = "NAME")]
        name: Option<String>,

        /// Rule id
        #[arg(long, value_name = "ID")]
        id: Option<String>,
    },

    /// Create a rule in the managed section from a JSON rule body
    #[command(name = "create-rule")]
    CreateRule {
        /// JSON file holding the rule (display_name plus NSX rule fields)
        #[arg(long, value_name = "FILE")]
        spec: PathBuf,
    },

    /// Replace a rule in the managed section with a JSON rule body
    #[command(name = "update-rule")]
    UpdateRule {
        /// Rule id
        #[arg(value_name = "ID")]
        id: String,

        /// JSON file holding the rule (display_name plus NSX rule fields)
        #[arg(long, value_name = "FILE")]
        spec: PathBuf,
    },

    /// Delete a rule from the managed section and confirm it is gone
    #[command(name = "delete-rule")]
    DeleteRule {
        /// Rule id
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Print the rule names derived for a VM document (no manager access)
    #[command(name = "derive-names")]
    DeriveNames {
        /// VM document (JSON, or YAML by .yaml/.yml extension)
        #[arg(long, value_name = "FILE")]
        workload: PathBuf,
    },

    /// Delete every rule derived for a VM document
    #[command(name = "clear-workload")]
    ClearWorkload {
        /// VM document (JSON, or YAML by .yaml/.yml extension)
        #[arg(long, value_name = "FILE")]
        workload: PathBuf,
    },
}

/// Policy store plus settings shared by every command
pub struct Session {
    pub client: Arc<dyn PolicyStoreClient>,
    pub config: DfwConfig,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(config: DfwConfig, dry_run: bool) -> Result<Self> {
        let client: Arc<dyn PolicyStoreClient> = if dry_run {
            info!("Dry run: using an empty in-memory policy store");
            Arc::new(MemoryPolicyStore::new())
        } else {
            Arc::new(NsxRestClient::new(&config)?)
        };
        Ok(Self { client, config })
    }

    /// Driver bound to the managed section
    pub async fn connect(&self) -> Result<NsxtDfw> {
        NsxtDfw::connect(Arc::clone(&self.client), &self.config)
            .await
            .with_context(|| {
                format!(
                    "Failed to resolve managed section '{}'",
                    self.config.section_name
                )
            })
    }
}

/// Run one command
pub async fn run(command: Commands, session: &Session) -> Result<()> {
    match command {
        Commands::InitSection => sections::init_section_command(session).await,
        Commands::Sections => sections::list_sections_command(session).await,
        Commands::DeleteSection { id } => sections::delete_section_command(session, id).await,
        Commands::Rules { section } => rules::list_rules_command(session, section).await,
        Commands::Rule { name, id } => rules::show_rule_command(session, name, id).await,
        Commands::CreateRule { spec } => rules::create_rule_command(session, &spec).await,
        Commands::UpdateRule { id, spec } => rules::update_rule_command(session, &id, &spec).await,
        Commands::DeleteRule { id } => rules::delete_rule_command(session, &id).await,
        Commands::DeriveNames { workload } => workload::derive_names_command(&workload),
        Commands::ClearWorkload { workload } => {
            workload::clear_workload_command(session, &workload).await
        }
    }
}

/// Write a value to stdout as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{text}");
    Ok(())
}
