//! Admin REST API theme store
//!
//! HTTP client for the platform's theme asset endpoints:
//!
//! - `GET    /themes.json`
//! - `GET    /themes/{id}/assets.json`
//! - `GET    /themes/{id}/assets.json?asset[key]=…`
//! - `PUT    /themes/{id}/assets.json`
//! - `DELETE /themes/{id}/assets.json?asset[key]=…`
//!
//! Text assets travel as `value`, binary ones as base64 `attachment`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{StoreError, StoreResult, ThemeStore};
use crate::models::{Asset, AssetContent, Theme, ThemeRole};

/// API version used when none is configured
pub const DEFAULT_API_VERSION: &str = "2024-01";

/// Request timeout in seconds
const REQUEST_TIMEOUT: u64 = 30;

/// Connect timeout in seconds
const CONNECT_TIMEOUT: u64 = 10;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

#[derive(Debug, Deserialize)]
struct ThemesResponse {
    themes: Vec<ThemeRecord>,
}

#[derive(Debug, Deserialize)]
struct ThemeRecord {
    id: u64,
    name: String,
    role: ThemeRole,
}

#[derive(Debug, Deserialize)]
struct AssetsResponse {
    assets: Vec<AssetRecord>,
}

#[derive(Debug, Deserialize)]
struct AssetResponse {
    asset: AssetRecord,
}

#[derive(Debug, Deserialize)]
struct AssetRecord {
    key: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    attachment: Option<String>,
    #[serde(default)]
    checksum: Option<String>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Debug, Serialize)]
struct PutAssetRequest<'a> {
    asset: PutAsset<'a>,
}

#[derive(Debug, Serialize)]
struct PutAsset<'a> {
    key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachment: Option<String>,
}

impl AssetRecord {
    fn into_asset(self) -> StoreResult<Asset> {
        let content = match (self.value, self.attachment) {
            (Some(value), _) => Some(AssetContent::Text(value)),
            (None, Some(attachment)) => Some(
                AssetContent::from_attachment(&attachment)
                    .map_err(|e| StoreError::Decode(format!("{}: {}", self.key, e)))?,
            ),
            (None, None) => None,
        };

        Ok(Asset {
            key: self.key,
            content,
            checksum: self.checksum,
            updated_at: self.updated_at,
            size: self.size,
        })
    }
}

/// [`ThemeStore`] backed by the Admin REST API
pub struct AdminApiStore {
    http: Client,
    shop: String,
    base_url: String,
    access_token: String,
}

impl AdminApiStore {
    /// Create a client for `shop` (e.g. `example.myshopify.com`)
    pub fn new(shop: &str, access_token: &str, api_version: &str) -> StoreResult<Self> {
        let shop = normalize_shop(shop)?;
        let base_url = format!("https://{}/admin/api/{}", shop, api_version);
        Self::with_base_url(&shop, access_token, &base_url)
    }

    /// Create a client against an explicit base URL
    ///
    /// The base URL replaces `https://{shop}/admin/api/{version}`; used for
    /// proxies and mock servers.
    pub fn with_base_url(shop: &str, access_token: &str, base_url: &str) -> StoreResult<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(StoreError::Rejected {
                status: 0,
                message: "Base URL must start with http:// or https://".into(),
            });
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT))
            .user_agent(format!("themesync/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            shop: shop.to_string(),
            base_url,
            access_token: access_token.to_string(),
        })
    }

    /// Shop domain this client talks to
    pub fn shop(&self) -> &str {
        &self.shop
    }

    fn assets_url(&self, theme: &Theme) -> String {
        format!("{}/themes/{}/assets.json", self.base_url, theme.id)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(ACCESS_TOKEN_HEADER, &self.access_token)
    }

    /// Send a request and turn non-success statuses into `StoreError`
    async fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        trace!(status = status.as_u16(), url = %response.url(), "Admin API response");

        if status.is_success() {
            return Ok(response);
        }

        let retry_after = parse_retry_after(response.headers());
        let message = response.text().await.unwrap_or_default();
        Err(StoreError::from_status(
            status.as_u16(),
            error_message(&message),
            retry_after,
        ))
    }

    async fn json<T: for<'de> Deserialize<'de>>(response: Response) -> StoreResult<T> {
        response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ThemeStore for AdminApiStore {
    async fn list_themes(&self) -> StoreResult<Vec<Theme>> {
        let url = format!("{}/themes.json", self.base_url);
        debug!(url = %url, "Listing themes");

        let response = self.send(self.http.get(&url)).await?;
        let body: ThemesResponse = Self::json(response).await?;

        Ok(body
            .themes
            .into_iter()
            .map(|t| Theme::new(t.id, t.name, t.role, self.shop.clone()))
            .collect())
    }

    async fn list_assets(&self, theme: &Theme) -> StoreResult<Vec<Asset>> {
        debug!(theme_id = theme.id, "Listing assets");

        let request = self
            .http
            .get(self.assets_url(theme))
            .query(&[("fields", "key,checksum,updated_at,size")]);
        let response = self.send(request).await?;
        let body: AssetsResponse = Self::json(response).await?;

        body.assets
            .into_iter()
            .map(|record| {
                // Listings never carry content
                Ok(Asset {
                    content: None,
                    ..record.into_asset()?
                })
            })
            .collect()
    }

    async fn get_asset(&self, theme: &Theme, key: &str) -> StoreResult<Asset> {
        let request = self
            .http
            .get(self.assets_url(theme))
            .query(&[("asset[key]", key)]);
        let response = self.send(request).await?;
        let body: AssetResponse = Self::json(response).await?;
        body.asset.into_asset()
    }

    async fn put_asset(
        &self,
        theme: &Theme,
        key: &str,
        content: &AssetContent,
    ) -> StoreResult<Asset> {
        let asset = match content {
            AssetContent::Text(text) => PutAsset {
                key,
                value: Some(text),
                attachment: None,
            },
            AssetContent::Binary(_) => PutAsset {
                key,
                value: None,
                attachment: Some(content.to_attachment()),
            },
        };

        let request = self
            .http
            .put(self.assets_url(theme))
            .json(&PutAssetRequest { asset });
        let response = self.send(request).await?;
        let body: AssetResponse = Self::json(response).await?;
        body.asset.into_asset()
    }

    async fn delete_asset(&self, theme: &Theme, key: &str) -> StoreResult<()> {
        let request = self
            .http
            .delete(self.assets_url(theme))
            .query(&[("asset[key]", key)]);
        self.send(request).await?;
        Ok(())
    }
}

/// Strip scheme and trailing slashes from a shop domain
fn normalize_shop(shop: &str) -> StoreResult<String> {
    let shop = shop
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');

    if shop.is_empty() || shop.contains('/') {
        return Err(StoreError::Rejected {
            status: 0,
            message: format!("Invalid shop domain '{}'", shop),
        });
    }
    Ok(shop.to_string())
}

/// Parse a `Retry-After` header given in (possibly fractional) seconds
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let seconds: f64 = value.trim().parse().ok()?;
    // Rejects negative, NaN, infinite, and out-of-range values
    Duration::try_from_secs_f64(seconds).ok()
}

/// Pull a readable message out of an error body
///
/// The API answers with `{"errors": ...}` where the value is a string,
/// a list, or a map of field to messages.
fn error_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };

    match json.get("errors") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .collect::<Vec<_>>()
            .join(", "),
        Some(serde_json::Value::Object(fields)) => fields
            .iter()
            .map(|(field, messages)| {
                let messages = match messages {
                    serde_json::Value::Array(items) => items
                        .iter()
                        .filter_map(|v| v.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                    other => other.as_str().unwrap_or_default().to_string(),
                };
                format!("{}: {}", field, messages)
            })
            .collect::<Vec<_>>()
            .join("; "),
        _ => body.trim().to_string(),
    }
}
