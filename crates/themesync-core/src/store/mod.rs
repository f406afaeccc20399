//! Remote theme store
//!
//! The Syncer talks to the platform only through the [`ThemeStore`] trait.
//! Every call is fallible and idempotent per asset key, so a retried `put`
//! of the same content is safe.
//!
//! ## Implementations
//!
//! - [`AdminApiStore`]: the platform's Admin REST API over HTTP
//! - [`MemoryThemeStore`]: in-memory store with failure injection, for tests

mod admin_api;
mod error;
mod memory;

use async_trait::async_trait;

use crate::models::{Asset, AssetContent, Theme};

pub use admin_api::{AdminApiStore, DEFAULT_API_VERSION};
pub use error::{StoreError, StoreResult};
pub use memory::{MemoryThemeStore, StoreCall};

/// Asset operations against one shop's themes
#[async_trait]
pub trait ThemeStore: Send + Sync {
    /// List every theme on the shop
    async fn list_themes(&self) -> StoreResult<Vec<Theme>>;

    /// List asset metadata for a theme (no content)
    async fn list_assets(&self, theme: &Theme) -> StoreResult<Vec<Asset>>;

    /// Fetch one asset with its content
    async fn get_asset(&self, theme: &Theme, key: &str) -> StoreResult<Asset>;

    /// Create or replace an asset
    async fn put_asset(&self, theme: &Theme, key: &str, content: &AssetContent)
        -> StoreResult<Asset>;

    /// Remove an asset
    async fn delete_asset(&self, theme: &Theme, key: &str) -> StoreResult<()>;
}
