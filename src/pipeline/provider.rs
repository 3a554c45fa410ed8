//! Stock-photo provider: search, download tracking, and rendition fetch.
//!
//! The three calls for one placement always run in this order:
//!
//! ```text
//! search(query) ──▶ record_usage(photo) ──▶ fetch_rendition(photo, dims)
//! ```
//!
//! `record_usage` is the provider's contractual download-tracking ping. It is
//! not telemetry; a failure there aborts the placement like any other.
//!
//! [`ImageProvider`] is the seam the orchestrator talks to. [`UnsplashClient`]
//! is the real implementation; tests plug in fakes through
//! [`crate::config::FillConfigBuilder::provider`].

use crate::error::ProviderError;
use crate::mapping::ResolvedDimensions;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Default API root for [`UnsplashClient`].
pub const DEFAULT_API_BASE: &str = "https://api.unsplash.com";

/// Rendition quality requested from the image CDN.
pub const RENDITION_QUALITY: u32 = 80;

/// Rendition encoding; also the file extension written to disk.
pub const RENDITION_FORMAT: &str = "webp";

/// A photo chosen by a search, flattened from the provider's JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoRecord {
    pub id: String,
    /// Untransformed image URL; rendition parameters are appended to it.
    pub raw_url: String,
    pub description: Option<String>,
    pub alt_description: Option<String>,
    pub author_name: Option<String>,
    pub author_handle: Option<String>,
    /// Human-facing photo page, recorded in the attribution ledger.
    pub page_url: Option<String>,
    /// Download-tracking endpoint hit by `record_usage`.
    pub download_location: String,
}

/// Where to bias a search.
///
/// Only wide photos are ever asked for; fixed-height placements are cropped
/// by the CDN and send no hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
        }
    }

    /// Placements with only a width lean towards wide photos.
    pub fn hint_for(dims: &ResolvedDimensions) -> Option<Orientation> {
        dims.height.is_none().then_some(Orientation::Landscape)
    }
}

/// Encoded image bytes plus the size that was requested.
#[derive(Debug, Clone)]
pub struct Rendition {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: Option<u32>,
    pub extension: String,
}

/// An image-search service.
///
/// Implementations must be `Send + Sync`; with `concurrency > 1` the
/// orchestrator calls them from several placements at once.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Relevance-ordered search; returns the best match.
    async fn search(
        &self,
        query: &str,
        orientation: Option<Orientation>,
    ) -> Result<PhotoRecord, ProviderError>;

    /// Provider-mandated usage tracking for `photo`.
    async fn record_usage(&self, photo: &PhotoRecord) -> Result<(), ProviderError>;

    /// Download a cropped or fitted rendition of `photo`.
    async fn fetch_rendition(
        &self,
        photo: &PhotoRecord,
        dims: ResolvedDimensions,
    ) -> Result<Rendition, ProviderError>;

    /// Name written into the ledger's `source` field.
    fn source_name(&self) -> &str {
        "Unsplash"
    }

    /// Licence written into the ledger's `license` field.
    fn license_name(&self) -> &str {
        "Unsplash License"
    }
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<ApiPhoto>,
}

#[derive(Debug, Deserialize)]
struct ApiPhoto {
    id: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    alt_description: Option<String>,
    urls: ApiUrls,
    #[serde(default)]
    user: Option<ApiUser>,
    links: ApiLinks,
}

#[derive(Debug, Deserialize)]
struct ApiUrls {
    raw: String,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiLinks {
    #[serde(default)]
    html: Option<String>,
    download_location: String,
}

impl From<ApiPhoto> for PhotoRecord {
    fn from(p: ApiPhoto) -> Self {
        let (author_name, author_handle) = p
            .user
            .map(|u| (u.name, u.username))
            .unwrap_or((None, None));
        PhotoRecord {
            id: p.id,
            raw_url: p.urls.raw,
            description: p.description,
            alt_description: p.alt_description,
            author_name,
            author_handle,
            page_url: p.links.html,
            download_location: p.links.download_location,
        }
    }
}

// ── Unsplash ─────────────────────────────────────────────────────────────────

/// [`ImageProvider`] backed by the Unsplash REST API.
#[derive(Clone)]
pub struct UnsplashClient {
    http: reqwest::Client,
    auth: HeaderMap,
    api_base: String,
    per_page: u32,
}

impl std::fmt::Debug for UnsplashClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnsplashClient")
            .field("api_base", &self.api_base)
            .field("per_page", &self.per_page)
            .finish_non_exhaustive()
    }
}

impl UnsplashClient {
    /// Build a client authenticated with `access_key`.
    ///
    /// API calls (search and tracking) carry `Authorization: Client-ID …`
    /// and `Accept-Version: v1`; rendition downloads go to the public image
    /// CDN and carry neither.
    pub fn new(
        access_key: &str,
        api_base: impl Into<String>,
        per_page: u32,
        timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        let mut auth = HeaderMap::new();
        let mut key = HeaderValue::from_str(&format!("Client-ID {access_key}"))
            .map_err(|e| ProviderError::Transport(format!("invalid access key: {e}")))?;
        key.set_sensitive(true);
        auth.insert(AUTHORIZATION, key);
        auth.insert(
            HeaderName::from_static("accept-version"),
            HeaderValue::from_static("v1"),
        );

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            http,
            auth,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            per_page: per_page.max(10),
        })
    }

    /// Search URL with relevance ordering and the strict content filter.
    pub fn search_url(&self, query: &str, orientation: Option<Orientation>) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&format!("{}/search/photos", self.api_base))
            .map_err(|e| ProviderError::Transport(format!("bad API base: {e}")))?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("query", query)
                .append_pair("per_page", &self.per_page.to_string())
                .append_pair("order_by", "relevant")
                .append_pair("content_filter", "high");
            if let Some(o) = orientation {
                qp.append_pair("orientation", o.as_str());
            }
        }
        Ok(url)
    }

    async fn get_ok(&self, url: &str, authed: bool) -> Result<reqwest::Response, ProviderError> {
        let mut request = self.http.get(url);
        if authed {
            request = request.headers(self.auth.clone());
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// Apply crop/fit, size, quality, and format parameters to a raw photo URL.
///
/// Parameters already present on the raw URL with the same name are
/// replaced; anything else (e.g. `ixid`) is kept.
pub fn rendition_url(raw_url: &str, dims: ResolvedDimensions) -> Result<Url, ProviderError> {
    let mut url =
        Url::parse(raw_url).map_err(|e| ProviderError::Decode(format!("bad raw URL '{raw_url}': {e}")))?;

    let mut params: Vec<(&str, String)> = Vec::with_capacity(7);
    match dims.height {
        Some(h) => {
            params.push(("fit", "crop".into()));
            params.push(("crop", "entropy".into()));
            params.push(("w", dims.width.to_string()));
            params.push(("h", h.to_string()));
        }
        None => {
            params.push(("fit", "max".into()));
            params.push(("w", dims.width.to_string()));
        }
    }
    params.push(("q", RENDITION_QUALITY.to_string()));
    params.push(("fm", RENDITION_FORMAT.into()));
    params.push(("auto", "format".into()));

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !params.iter().any(|(name, _)| k == name))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .extend_pairs(params);
    Ok(url)
}

#[async_trait]
impl ImageProvider for UnsplashClient {
    async fn search(
        &self,
        query: &str,
        orientation: Option<Orientation>,
    ) -> Result<PhotoRecord, ProviderError> {
        let url = self.search_url(query, orientation)?;
        debug!("Searching: {}", url);

        let body: SearchResponse = self.get_ok(url.as_str(), true).await?.json().await?;
        body.results
            .into_iter()
            .next()
            .map(PhotoRecord::from)
            .ok_or_else(|| ProviderError::NoResults {
                query: query.to_string(),
            })
    }

    async fn record_usage(&self, photo: &PhotoRecord) -> Result<(), ProviderError> {
        debug!("Recording download of {}", photo.id);
        self.get_ok(&photo.download_location, true).await?;
        Ok(())
    }

    async fn fetch_rendition(
        &self,
        photo: &PhotoRecord,
        dims: ResolvedDimensions,
    ) -> Result<Rendition, ProviderError> {
        let url = rendition_url(&photo.raw_url, dims)?;
        debug!("Fetching rendition: {}", url);

        let bytes = self.get_ok(url.as_str(), false).await?.bytes().await?;
        Ok(Rendition {
            bytes: bytes.to_vec(),
            width: dims.width,
            height: dims.height,
            extension: RENDITION_FORMAT.to_string(),
        })
    }
}
