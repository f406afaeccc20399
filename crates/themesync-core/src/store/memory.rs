//! In-memory theme store
//!
//! Holds themes and assets in memory. Used by tests and for dry runs.
//! Supports failure injection per call and key, artificial latency, and
//! records how many calls were in flight for the same key at once.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{StoreError, StoreResult, ThemeStore};
use crate::models::{Asset, AssetContent, Theme};

/// Store call kinds, for failure injection and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreCall {
    List,
    Get,
    Put,
    Delete,
}

struct InjectedFailure {
    error: StoreError,
    /// Remaining failures; `None` fails forever
    remaining: Option<usize>,
}

#[derive(Default)]
struct State {
    themes: Vec<Theme>,
    assets: HashMap<u64, BTreeMap<String, AssetContent>>,
    failures: HashMap<(StoreCall, String), InjectedFailure>,
    calls: HashMap<(StoreCall, String), usize>,
    active: HashMap<String, usize>,
    max_active: usize,
}

/// In-memory [`ThemeStore`]
#[derive(Default)]
pub struct MemoryThemeStore {
    state: Mutex<State>,
    latency: Duration,
}

/// Decrements the per-key in-flight count when dropped
struct ActiveCall<'a> {
    store: &'a MemoryThemeStore,
    key: String,
}

impl Drop for ActiveCall<'_> {
    fn drop(&mut self) {
        let mut state = self.store.lock();
        if let Some(count) = state.active.get_mut(&self.key) {
            *count -= 1;
            if *count == 0 {
                state.active.remove(&self.key);
            }
        }
    }
}

impl MemoryThemeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every asset call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Register a theme
    pub fn add_theme(&self, theme: Theme) {
        let mut state = self.lock();
        state.assets.entry(theme.id).or_default();
        state.themes.push(theme);
    }

    /// Seed an asset directly
    pub fn insert_asset(&self, theme_id: u64, key: &str, content: AssetContent) {
        self.lock()
            .assets
            .entry(theme_id)
            .or_default()
            .insert(key.to_string(), content);
    }

    /// Current content of an asset
    pub fn asset(&self, theme_id: u64, key: &str) -> Option<AssetContent> {
        self.lock()
            .assets
            .get(&theme_id)
            .and_then(|assets| assets.get(key).cloned())
    }

    /// All asset keys of a theme, sorted
    pub fn keys(&self, theme_id: u64) -> Vec<String> {
        self.lock()
            .assets
            .get(&theme_id)
            .map(|assets| assets.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Make every `call` for `key` fail with `error`
    ///
    /// Use an empty key with [`StoreCall::List`] to fail listings.
    pub fn fail(&self, call: StoreCall, key: &str, error: StoreError) {
        self.lock().failures.insert(
            (call, key.to_string()),
            InjectedFailure {
                error,
                remaining: None,
            },
        );
    }

    /// Make the next `times` calls fail, then succeed
    pub fn fail_times(&self, call: StoreCall, key: &str, times: usize, error: StoreError) {
        self.lock().failures.insert(
            (call, key.to_string()),
            InjectedFailure {
                error,
                remaining: Some(times),
            },
        );
    }

    /// Number of calls made for a key
    pub fn call_count(&self, call: StoreCall, key: &str) -> usize {
        self.lock()
            .calls
            .get(&(call, key.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Highest number of calls ever in flight for one key at the same time
    pub fn max_concurrent_per_key(&self) -> usize {
        self.lock().max_active
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the call, mark it in flight, wait out the latency, then apply
    /// any injected failure
    async fn begin(&self, call: StoreCall, key: &str) -> StoreResult<ActiveCall<'_>> {
        {
            let mut state = self.lock();
            *state.calls.entry((call, key.to_string())).or_insert(0) += 1;
            let active = state.active.entry(key.to_string()).or_insert(0);
            *active += 1;
            let active = *active;
            state.max_active = state.max_active.max(active);
        }
        let guard = ActiveCall {
            store: self,
            key: key.to_string(),
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let injected = {
            let mut state = self.lock();
            match state.failures.get_mut(&(call, key.to_string())) {
                Some(failure) => match failure.remaining {
                    None => Some(failure.error.clone()),
                    Some(0) => None,
                    Some(n) => {
                        failure.remaining = Some(n - 1);
                        Some(failure.error.clone())
                    }
                },
                None => None,
            }
        };

        match injected {
            Some(error) => Err(error),
            None => Ok(guard),
        }
    }

    fn theme_exists(&self, theme: &Theme) -> StoreResult<()> {
        if self.lock().assets.contains_key(&theme.id) {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }
}

#[async_trait]
impl ThemeStore for MemoryThemeStore {
    async fn list_themes(&self) -> StoreResult<Vec<Theme>> {
        let _call = self.begin(StoreCall::List, "themes").await?;
        let themes = self.lock().themes.clone();
        Ok(themes)
    }

    async fn list_assets(&self, theme: &Theme) -> StoreResult<Vec<Asset>> {
        let _call = self.begin(StoreCall::List, "").await?;
        self.theme_exists(theme)?;

        let state = self.lock();
        let assets = state
            .assets
            .get(&theme.id)
            .map(|assets| {
                assets
                    .iter()
                    .map(|(key, content)| Asset {
                        size: Some(content.len() as u64),
                        ..Asset::new(key.clone())
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(assets)
    }

    async fn get_asset(&self, theme: &Theme, key: &str) -> StoreResult<Asset> {
        let _call = self.begin(StoreCall::Get, key).await?;
        self.theme_exists(theme)?;

        self.asset(theme.id, key)
            .map(|content| Asset::with_content(key, content))
            .ok_or(StoreError::NotFound)
    }

    async fn put_asset(
        &self,
        theme: &Theme,
        key: &str,
        content: &AssetContent,
    ) -> StoreResult<Asset> {
        let _call = self.begin(StoreCall::Put, key).await?;
        self.theme_exists(theme)?;

        self.insert_asset(theme.id, key, content.clone());
        Ok(Asset::with_content(key, content.clone()))
    }

    async fn delete_asset(&self, theme: &Theme, key: &str) -> StoreResult<()> {
        let _call = self.begin(StoreCall::Delete, key).await?;
        self.theme_exists(theme)?;

        let removed = self
            .lock()
            .assets
            .get_mut(&theme.id)
            .and_then(|assets| assets.remove(key));
        removed.map(|_| ()).ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ThemeRole;

    fn theme() -> Theme {
        Theme::new(7, "Dev", ThemeRole::Development, "test.myshopify.com")
    }

    fn store() -> MemoryThemeStore {
        let store = MemoryThemeStore::new();
        store.add_theme(theme());
        store.insert_asset(7, "layout/theme.liquid", AssetContent::Text("layout".into()));
        store
    }

    #[tokio::test]
    async fn test_list_and_get() {
        let store = store();
        let assets = store.list_assets(&theme()).await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].key, "layout/theme.liquid");
        assert!(assets[0].content.is_none());

        let asset = store.get_asset(&theme(), "layout/theme.liquid").await.unwrap();
        assert_eq!(asset.content, Some(AssetContent::Text("layout".into())));
    }

    #[tokio::test]
    async fn test_unknown_theme() {
        let store = store();
        let other = Theme::new(99, "Other", ThemeRole::Unpublished, "test.myshopify.com");
        assert_eq!(
            store.list_assets(&other).await.unwrap_err(),
            StoreError::NotFound
        );
    }

    #[tokio::test]
    async fn test_put_and_delete() {
        let store = store();
        store
            .put_asset(&theme(), "assets/a.css", &AssetContent::Text("a".into()))
            .await
            .unwrap();
        assert_eq!(store.keys(7), vec!["assets/a.css", "layout/theme.liquid"]);

        store.delete_asset(&theme(), "assets/a.css").await.unwrap();
        assert_eq!(
            store.delete_asset(&theme(), "assets/a.css").await.unwrap_err(),
            StoreError::NotFound
        );
    }

    #[tokio::test]
    async fn test_fail_times_then_succeed() {
        let store = store();
        store.fail_times(StoreCall::Get, "layout/theme.liquid", 2, StoreError::Timeout);

        assert!(store.get_asset(&theme(), "layout/theme.liquid").await.is_err());
        assert!(store.get_asset(&theme(), "layout/theme.liquid").await.is_err());
        assert!(store.get_asset(&theme(), "layout/theme.liquid").await.is_ok());
        assert_eq!(store.call_count(StoreCall::Get, "layout/theme.liquid"), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure() {
        let store = store();
        store.fail(StoreCall::Get, "layout/theme.liquid", StoreError::PayloadTooLarge);
        for _ in 0..3 {
            assert_eq!(
                store
                    .get_asset(&theme(), "layout/theme.liquid")
                    .await
                    .unwrap_err(),
                StoreError::PayloadTooLarge
            );
        }
    }

    #[tokio::test]
    async fn test_tracks_concurrent_calls_per_key() {
        let store = MemoryThemeStore::new().with_latency(Duration::from_millis(20));
        store.add_theme(theme());
        store.insert_asset(7, "a.liquid", AssetContent::Text("a".into()));

        let t = theme();
        let (a, b) = tokio::join!(store.get_asset(&t, "a.liquid"), store.get_asset(&t, "a.liquid"));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(store.max_concurrent_per_key(), 2);
    }
}
