//! Command handlers

pub mod config;
pub mod sync;
pub mod themes;

use std::sync::Arc;

use anyhow::{Context, Result};
use themesync_core::{AdminApiStore, Config, ThemeStore};

/// Build the Admin API client from configuration
pub fn connect(config: &Config) -> Result<Arc<dyn ThemeStore>> {
    let shop = config.store.as_deref().context(
        "No store configured. Set it with:\n  \
         themesync config set store your-shop.myshopify.com",
    )?;
    let token = config.access_token.as_deref().context(
        "No access token configured. Set it with:\n  \
         themesync config set access_token <token>\n\
         or export THEMESYNC_ACCESS_TOKEN",
    )?;

    let store = AdminApiStore::new(shop, token, &config.api_version)
        .context("Failed to create Admin API client")?;
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_requires_store_and_token() {
        let mut config = Config::default();
        let err = connect(&config).err().unwrap();
        assert!(err.to_string().contains("No store configured"));

        config.store = Some("test.myshopify.com".to_string());
        let err = connect(&config).err().unwrap();
        assert!(err.to_string().contains("No access token configured"));

        config.access_token = Some("shpat_test".to_string());
        assert!(connect(&config).is_ok());
    }
}
