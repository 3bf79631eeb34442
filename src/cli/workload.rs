//! # Workload Commands

use std::path::Path;

use anyhow::{Context, Result};

use super::{print_json, Session};
use nsx_dfw::dfw::derive_rule_names;
use nsx_dfw::workload::Workload;

pub fn derive_names_command(path: &Path) -> Result<()> {
    let workload = read_workload(path)?;
    print_json(&derive_rule_names(&workload))
}

/// Remove every rule derived for the VM and print what was done
pub async fn clear_workload_command(session: &Session, path: &Path) -> Result<()> {
    let workload = read_workload(path)?;
    let dfw = session.connect().await?;
    let report = dfw
        .clear_workload_rules(&workload)
        .await
        .with_context(|| format!("Failed to clear rules of VM {}", workload.vm_id))?;
    print_json(&report)
}

fn read_workload(path: &Path) -> Result<Workload> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read VM document {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml")
    );
    if is_yaml {
        Workload::from_yaml(&text)
    } else {
        Workload::from_json(&text)
    }
}
