//! Themes command handler

use anyhow::{Context, Result};

use themesync_core::Config;

use crate::output::Output;

/// List the themes on the configured store
pub async fn list(config: &Config, output: &Output) -> Result<()> {
    let store = super::connect(config)?;
    let themes = store
        .list_themes()
        .await
        .context("Failed to list themes")?;

    output.print_themes(&themes);
    Ok(())
}
