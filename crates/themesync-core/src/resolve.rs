//! Theme resolution
//!
//! Turns a user's choice (an id, a name, "live", "development") into a
//! concrete [`Theme`]. The Syncer only ever sees the resolved value.

use std::fmt;

use tracing::debug;

use crate::models::{Theme, ThemeRole};
use crate::store::{StoreResult, ThemeStore};

/// How the user picked a theme
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeSelector {
    /// Numeric id or exact theme name
    Identifier(String),
    /// The published theme
    Live,
    /// The development theme, optionally pinned to a known id
    Development(Option<u64>),
}

impl fmt::Display for ThemeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThemeSelector::Identifier(identifier) => f.write_str(identifier),
            ThemeSelector::Live => f.write_str("live"),
            ThemeSelector::Development(_) => f.write_str("development"),
        }
    }
}

/// Find the theme a selector refers to
///
/// Returns `Ok(None)` when no theme matches.
pub async fn resolve_theme(
    store: &dyn ThemeStore,
    selector: &ThemeSelector,
) -> StoreResult<Option<Theme>> {
    let themes = store.list_themes().await?;
    debug!(count = themes.len(), %selector, "Resolving theme");
    Ok(select_theme(themes, selector))
}

/// Pick the matching theme out of a listing
pub fn select_theme(themes: Vec<Theme>, selector: &ThemeSelector) -> Option<Theme> {
    match selector {
        ThemeSelector::Identifier(identifier) => {
            let identifier = identifier.trim();
            let id = identifier.parse::<u64>().ok();
            themes
                .iter()
                .find(|t| Some(t.id) == id)
                .or_else(|| themes.iter().find(|t| t.name == identifier))
                .cloned()
        }
        ThemeSelector::Live => themes.into_iter().find(|t| t.role.is_live()),
        ThemeSelector::Development(Some(id)) => themes
            .into_iter()
            .find(|t| t.id == *id && t.role == ThemeRole::Development),
        ThemeSelector::Development(None) => themes
            .into_iter()
            .find(|t| t.role == ThemeRole::Development),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryThemeStore;

    fn themes() -> Vec<Theme> {
        vec![
            Theme::new(1, "Dawn", ThemeRole::Main, "test.myshopify.com"),
            Theme::new(2, "Test theme", ThemeRole::Unpublished, "test.myshopify.com"),
            Theme::new(3, "Development (abc)", ThemeRole::Development, "test.myshopify.com"),
            Theme::new(1234, "4", ThemeRole::Unpublished, "test.myshopify.com"),
        ]
    }

    #[test]
    fn test_select_by_id() {
        let theme = select_theme(themes(), &ThemeSelector::Identifier("1234".into())).unwrap();
        assert_eq!(theme.id, 1234);
    }

    #[test]
    fn test_select_by_name() {
        let theme =
            select_theme(themes(), &ThemeSelector::Identifier("Test theme".into())).unwrap();
        assert_eq!(theme.id, 2);
    }

    #[test]
    fn test_id_takes_precedence_over_name() {
        // "4" is both a (missing) id and a theme name
        let theme = select_theme(themes(), &ThemeSelector::Identifier("4".into())).unwrap();
        assert_eq!(theme.id, 1234);

        let theme = select_theme(themes(), &ThemeSelector::Identifier("1".into())).unwrap();
        assert_eq!(theme.name, "Dawn");
    }

    #[test]
    fn test_select_live() {
        let theme = select_theme(themes(), &ThemeSelector::Live).unwrap();
        assert_eq!(theme.name, "Dawn");
    }

    #[test]
    fn test_select_development() {
        let theme = select_theme(themes(), &ThemeSelector::Development(None)).unwrap();
        assert_eq!(theme.id, 3);

        assert!(select_theme(themes(), &ThemeSelector::Development(Some(3))).is_some());
        assert!(select_theme(themes(), &ThemeSelector::Development(Some(2))).is_none());
    }

    #[test]
    fn test_not_found() {
        assert!(select_theme(themes(), &ThemeSelector::Identifier("missing".into())).is_none());
        assert!(select_theme(Vec::new(), &ThemeSelector::Live).is_none());
    }

    #[tokio::test]
    async fn test_resolve_through_store() {
        let store = MemoryThemeStore::new();
        for theme in themes() {
            store.add_theme(theme);
        }

        let theme = resolve_theme(&store, &ThemeSelector::Live).await.unwrap();
        assert_eq!(theme.map(|t| t.id), Some(1));
    }

    #[test]
    fn test_selector_display() {
        assert_eq!(ThemeSelector::Live.to_string(), "live");
        assert_eq!(ThemeSelector::Development(Some(9)).to_string(), "development");
        assert_eq!(ThemeSelector::Identifier("Dawn".into()).to_string(), "Dawn");
    }
}
