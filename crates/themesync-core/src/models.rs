//! Data models for themesync
//!
//! Defines the core data structures: Theme, Asset, and AssetContent.
//! A `Theme` is resolved once per command and passed by reference into
//! the Syncer; `Asset` describes one file on either side of a sync.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a theme within a shop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeRole {
    /// The published theme customers see
    Main,
    /// A theme that is not published
    Unpublished,
    /// A temporary theme used while developing
    Development,
    /// A theme installed for preview from the theme store
    Demo,
    /// Any role this client does not know about
    #[serde(other)]
    Other,
}

impl ThemeRole {
    /// Whether this is the live (published) theme
    pub fn is_live(&self) -> bool {
        matches!(self, ThemeRole::Main)
    }
}

impl fmt::Display for ThemeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThemeRole::Main => "live",
            ThemeRole::Unpublished => "unpublished",
            ThemeRole::Development => "development",
            ThemeRole::Demo => "demo",
            ThemeRole::Other => "other",
        };
        f.write_str(name)
    }
}

/// A resolved remote theme
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    /// Numeric theme ID assigned by the platform
    pub id: u64,
    /// Display name
    pub name: String,
    /// Role (live, development, ...)
    pub role: ThemeRole,
    /// Shop domain the theme belongs to
    #[serde(default)]
    pub shop: String,
}

impl Theme {
    /// Create a theme value
    pub fn new(id: u64, name: impl Into<String>, role: ThemeRole, shop: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            shop: shop.into(),
        }
    }

    /// Preview URL on the storefront
    pub fn preview_url(&self) -> String {
        format!("https://{}/?preview_theme_id={}", self.shop, self.id)
    }

    /// Theme editor URL in the admin
    pub fn editor_url(&self) -> String {
        format!("https://{}/admin/themes/{}/editor", self.shop, self.id)
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} [{}]", self.id, self.name, self.role)
    }
}

/// File extensions transferred as text rather than base64 attachments
const TEXT_EXTENSIONS: &[&str] = &[
    "liquid", "json", "css", "scss", "js", "svg", "txt", "html", "md", "map", "csv",
];

/// Content of an asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetContent {
    /// UTF-8 text (templates, stylesheets, JSON)
    Text(String),
    /// Binary data (images, fonts)
    Binary(Vec<u8>),
}

impl AssetContent {
    /// Build content for a file read from disk
    ///
    /// Files with a text extension that decode as UTF-8 are sent as text;
    /// everything else is treated as binary.
    pub fn from_bytes(key: &str, bytes: Vec<u8>) -> Self {
        if !is_text_key(key) {
            return AssetContent::Binary(bytes);
        }
        match String::from_utf8(bytes) {
            Ok(text) => AssetContent::Text(text),
            Err(e) => AssetContent::Binary(e.into_bytes()),
        }
    }

    /// Decode a base64 attachment
    pub fn from_attachment(encoded: &str) -> Result<Self, base64::DecodeError> {
        BASE64.decode(encoded.trim()).map(AssetContent::Binary)
    }

    /// Raw bytes as they should appear on disk
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            AssetContent::Text(text) => text.as_bytes(),
            AssetContent::Binary(bytes) => bytes,
        }
    }

    /// Encode binary content for the wire
    pub fn to_attachment(&self) -> String {
        BASE64.encode(self.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// Whether a key's extension marks it as a text asset
pub fn is_text_key(key: &str) -> bool {
    key.rsplit_once('.')
        .map(|(_, ext)| TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// One file within a theme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Path relative to the theme root, `/`-separated
    pub key: String,
    /// Content, present for fetched assets, absent in listings
    pub content: Option<AssetContent>,
    /// Remote checksum, when the platform reports one
    pub checksum: Option<String>,
    /// Last remote modification
    pub updated_at: Option<DateTime<Utc>>,
    /// Size in bytes, when known
    pub size: Option<u64>,
}

impl Asset {
    /// Metadata-only asset
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content: None,
            checksum: None,
            updated_at: None,
            size: None,
        }
    }

    /// Asset carrying content
    pub fn with_content(key: impl Into<String>, content: AssetContent) -> Self {
        let size = content.len() as u64;
        Self {
            key: key.into(),
            content: Some(content),
            checksum: None,
            updated_at: None,
            size: Some(size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_role_deserialize() {
        let role: ThemeRole = serde_json::from_str("\"main\"").unwrap();
        assert_eq!(role, ThemeRole::Main);
        assert!(role.is_live());

        let role: ThemeRole = serde_json::from_str("\"development\"").unwrap();
        assert_eq!(role, ThemeRole::Development);

        let role: ThemeRole = serde_json::from_str("\"archived\"").unwrap();
        assert_eq!(role, ThemeRole::Other);
    }

    #[test]
    fn test_theme_display_and_urls() {
        let theme = Theme::new(1234, "Dawn", ThemeRole::Main, "test.myshopify.com");
        assert_eq!(theme.to_string(), "#1234 Dawn [live]");
        assert_eq!(
            theme.preview_url(),
            "https://test.myshopify.com/?preview_theme_id=1234"
        );
        assert!(theme.editor_url().ends_with("/admin/themes/1234/editor"));
    }

    #[test]
    fn test_content_from_bytes_text() {
        let content = AssetContent::from_bytes("sections/header.liquid", b"{{ shop }}".to_vec());
        assert_eq!(content, AssetContent::Text("{{ shop }}".to_string()));
    }

    #[test]
    fn test_content_from_bytes_binary_extension() {
        let content = AssetContent::from_bytes("assets/logo.png", vec![0x89, 0x50]);
        assert!(matches!(content, AssetContent::Binary(_)));
    }

    #[test]
    fn test_content_invalid_utf8_falls_back_to_binary() {
        let content = AssetContent::from_bytes("assets/broken.css", vec![0xff, 0xfe]);
        assert_eq!(content, AssetContent::Binary(vec![0xff, 0xfe]));
    }

    #[test]
    fn test_attachment_decoding() {
        let content = AssetContent::Binary(vec![1, 2, 3, 250]);
        let encoded = content.to_attachment();
        assert_eq!(AssetContent::from_attachment(&encoded).unwrap(), content);
        assert!(AssetContent::from_attachment("not base64!").is_err());
    }
}
