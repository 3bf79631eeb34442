//! # Rule Commands

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::json;

use super::{print_json, Session};
use nsx_dfw::model::RuleSpec;

/// List rules of `section` or of the managed section
pub async fn list_rules_command(session: &Session, section: Option<String>) -> Result<()> {
    let dfw = session.connect().await?;
    let section_id = section.unwrap_or_else(|| dfw.managed_section().id().to_string());
    let rules = dfw
        .rules()
        .list_rules(&section_id)
        .await
        .with_context(|| format!("Failed to list rules of section {section_id}"))?;
    print_json(&rules)
}

/// Show a rule looked up by name or by id
pub async fn show_rule_command(
    session: &Session,
    name: Option<String>,
    id: Option<String>,
) -> Result<()> {
    let dfw = session.connect().await?;
    let rule = match (name, id) {
        (Some(name), _) => dfw.find_rule_by_name(&name).await?,
        (None, Some(id)) => dfw.find_rule_by_id(&id).await?,
        (None, None) => bail!("Either --name or --id is required"),
    };
    print_json(&rule)
}

pub async fn create_rule_command(session: &Session, spec_file: &Path) -> Result<()> {
    let spec = read_spec(spec_file)?;
    let dfw = session.connect().await?;
    let rule = dfw
        .create_rule(&spec)
        .await
        .with_context(|| format!("Failed to create rule '{}'", spec.display_name))?;
    print_json(&rule)
}

pub async fn update_rule_command(session: &Session, id: &str, spec_file: &Path) -> Result<()> {
    let spec = read_spec(spec_file)?;
    let dfw = session.connect().await?;
    let rule = dfw
        .update_rule(id, &spec)
        .await
        .with_context(|| format!("Failed to update rule {id}"))?;
    print_json(&rule)
}

pub async fn delete_rule_command(session: &Session, id: &str) -> Result<()> {
    let dfw = session.connect().await?;
    dfw.delete_rule(id)
        .await
        .with_context(|| format!("Failed to delete rule {id}"))?;
    print_json(&json!({ "deleted": id }))
}

fn read_spec(path: &Path) -> Result<RuleSpec> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read rule file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse rule file {}", path.display()))
}
