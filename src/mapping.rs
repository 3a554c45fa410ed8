//! Placement mapping: which image goes into which slot.
//!
//! The mapping file is a JSON object keyed by placement key. Each value says
//! what to search for and how big the rendition must be:
//!
//! ```json
//! {
//!   "hero": { "query": "modern minimal workspace desk", "alt": "A modern workspace",
//!             "w": 1920, "h": 1080, "target": "bg" }
//! }
//! ```
//!
//! When the file does not exist a template with the site's well-known slots
//! is written first, so a fresh checkout works out of the box and the
//! operator has something to edit.
//!
//! Declaration order is kept (serde_json is built with `preserve_order`), so
//! placements are processed, and ledger entries appended, in the same order
//! on every run.

use crate::error::FillError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Rendition width used when a placement does not set `w`.
pub const DEFAULT_WIDTH: u32 = 1920;

/// What kind of tag a placement fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TargetKind {
    /// An `<img>` element; its `src` is rewritten.
    #[serde(rename = "img", alias = "image")]
    Image,
    /// Any element painted through inline `background-image`. (default)
    #[default]
    #[serde(rename = "bg", alias = "background")]
    BackgroundHolder,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Image => f.pad("img"),
            TargetKind::BackgroundHolder => f.pad("bg"),
        }
    }
}

/// Search and sizing settings for one placement.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Placement key; taken from the mapping object's key, not the body.
    #[serde(skip)]
    pub key: String,

    /// Free-text search query.
    #[serde(default)]
    pub query: String,

    /// Alt text for `<img>` targets. Falls back to the photo's own description.
    #[serde(rename = "alt", default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,

    /// Target width in pixels. Default: [`DEFAULT_WIDTH`].
    #[serde(rename = "w", default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    /// Target height in pixels. Wins over `aspect_ratio` when both are set.
    #[serde(rename = "h", default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// Aspect ratio as `"W:H"`, e.g. `"16:9"`.
    #[serde(rename = "ar", default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,

    /// Tag kind bound when the slot is first found by its `id`.
    #[serde(default)]
    pub target: TargetKind,
}

/// Width and (optional) height of the rendition to request.
///
/// `height == None` means "fit within width, keep the photo's aspect ratio".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedDimensions {
    pub width: u32,
    pub height: Option<u32>,
}

static RE_ASPECT_RATIO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\s*:\s*(\d+)$").unwrap());

/// Parse `"W:H"` into its two non-zero terms.
pub fn parse_aspect_ratio(ar: &str) -> Option<(u32, u32)> {
    let caps = RE_ASPECT_RATIO.captures(ar.trim())?;
    let w: u32 = caps[1].parse().ok()?;
    let h: u32 = caps[2].parse().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}

impl PlacementConfig {
    /// Build a placement in code (used for the default template and tests).
    pub fn new(key: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn alt(mut self, alt: impl Into<String>) -> Self {
        self.alt_text = Some(alt.into());
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn target(mut self, target: TargetKind) -> Self {
        self.target = target;
        self
    }

    /// Resolve the rendition size.
    ///
    /// A zero `w`/`h` counts as unset. Height comes from `h` if given,
    /// otherwise from `ar` and the width, otherwise stays unset.
    pub fn dimensions(&self) -> ResolvedDimensions {
        let width = self.width.filter(|w| *w > 0).unwrap_or(DEFAULT_WIDTH);
        let height = self.height.filter(|h| *h > 0).or_else(|| {
            let (aw, ah) = parse_aspect_ratio(self.aspect_ratio.as_deref()?)?;
            Some((f64::from(width) * f64::from(ah) / f64::from(aw)).round() as u32)
        });
        ResolvedDimensions { width, height }
    }
}

/// The template written when no mapping file exists yet.
pub fn default_template() -> Vec<PlacementConfig> {
    let bg = TargetKind::BackgroundHolder;
    vec![
        PlacementConfig::new("hero", "modern minimal workspace desk, light, wide")
            .alt("A modern, minimal workspace")
            .size(1920, 1080)
            .target(bg),
        PlacementConfig::new("concerns", "abstract minimal texture gray")
            .alt("Abstract textured background")
            .size(1600, 900)
            .target(bg),
        PlacementConfig::new("points", "abstract gradient shapes blue purple")
            .alt("Abstract gradient")
            .size(1600, 900)
            .target(bg),
        PlacementConfig::new("pricing", "geometric pattern light background")
            .alt("Geometric pattern background")
            .size(1600, 900)
            .target(bg),
        PlacementConfig::new("closing", "team collaboration minimal light")
            .alt("Team collaboration")
            .size(1600, 900)
            .target(bg),
        PlacementConfig::new("profile", "developer workspace laptop minimal")
            .alt("A developer's workspace")
            .size(1600, 900)
            .target(bg),
        PlacementConfig::new("faq", "question mark pattern minimal")
            .alt("Abstract question mark background")
            .size(1600, 900)
            .target(bg),
    ]
}

/// Serialise placements back into the on-disk mapping format.
pub fn to_json(placements: &[PlacementConfig]) -> Result<String, FillError> {
    let mut map = Map::new();
    for p in placements {
        let body = serde_json::to_value(p).map_err(|e| FillError::Internal(e.to_string()))?;
        map.insert(p.key.clone(), body);
    }
    serde_json::to_string_pretty(&Value::Object(map)).map_err(|e| FillError::Internal(e.to_string()))
}

/// Parse mapping text. Any error is fatal; there is no partial recovery.
pub fn parse_mapping(text: &str, path: &Path) -> Result<Vec<PlacementConfig>, FillError> {
    let parse_err = |detail: String| FillError::MappingParse {
        path: path.to_path_buf(),
        detail,
    };

    let root: Map<String, Value> = serde_json::from_str(text).map_err(|e| parse_err(e.to_string()))?;

    root.into_iter()
        .map(|(key, body)| {
            let mut placement: PlacementConfig = serde_json::from_value(body)
                .map_err(|e| parse_err(format!("placement '{key}': {e}")))?;
            placement.key = key;
            Ok(placement)
        })
        .collect()
}

/// Load the mapping at `path`, writing [`default_template`] there first if
/// the file is missing.
pub async fn load_or_scaffold(path: &Path) -> Result<Vec<PlacementConfig>, FillError> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        let write_err = |source| FillError::MappingWriteFailed {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        tokio::fs::write(path, to_json(&default_template())?)
            .await
            .map_err(write_err)?;
        info!("Wrote default placement mapping to {}", path.display());
    }

    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| FillError::MappingParse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
    let placements = parse_mapping(&text, path)?;
    debug!("Loaded {} placements from {}", placements.len(), path.display());
    Ok(placements)
}
