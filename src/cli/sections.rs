//! # Section Commands

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;

use super::{print_json, Session};
use nsx_dfw::dfw::SectionRepository;

/// Find or create the managed section and print its handle
pub async fn init_section_command(session: &Session) -> Result<()> {
    let dfw = session.connect().await?;
    print_json(dfw.managed_section())
}

pub async fn list_sections_command(session: &Session) -> Result<()> {
    let sections = repository(session)
        .list_sections()
        .await
        .context("Failed to list sections")?;
    print_json(&sections)
}

/// Delete the given section, or the managed one
pub async fn delete_section_command(session: &Session, id: Option<String>) -> Result<()> {
    let deleted = match id {
        Some(id) => {
            repository(session)
                .delete_section(&id)
                .await
                .with_context(|| format!("Failed to delete section {id}"))?;
            id
        }
        None => {
            let dfw = session.connect().await?;
            let id = dfw.managed_section().id().to_string();
            dfw.delete_section()
                .await
                .with_context(|| format!("Failed to delete section {id}"))?;
            id
        }
    };
    print_json(&json!({ "deleted": deleted }))
}

fn repository(session: &Session) -> SectionRepository {
    SectionRepository::new(Arc::clone(&session.client), session.config.duplicate_names)
}
