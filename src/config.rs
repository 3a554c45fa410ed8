//! Configuration for a fill run.
//!
//! Every path, the provider credential, and the network knobs live in one
//! [`FillConfig`], built via [`FillConfigBuilder`]. The library never reads
//! environment variables itself; the CLI maps env and flags onto this struct.

use crate::error::FillError;
use crate::pipeline::provider::{ImageProvider, DEFAULT_API_BASE};
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Environment variable the CLI reads the access key from.
pub const ACCESS_KEY_ENV: &str = "UNSPLASH_ACCESS_KEY";

/// Configuration for one fill run.
///
/// # Example
/// ```rust
/// use stockfill::FillConfig;
///
/// let config = FillConfig::builder()
///     .input_path("site/index.html")
///     .public_prefix("/site")
///     .access_key("my-key")
///     .build()
///     .unwrap();
/// assert_eq!(config.output_path, config.input_path);
/// ```
#[derive(Clone)]
pub struct FillConfig {
    /// HTML document to read. Default: `public/index.html`.
    pub input_path: PathBuf,

    /// Where the patched document is written. Default: same as `input_path`.
    pub output_path: PathBuf,

    /// Placement mapping; scaffolded if missing. Default: `scripts/image-mapping.json`.
    pub mapping_path: PathBuf,

    /// URL prefix for paths written into the document. Default: `/mypage/public`.
    pub public_prefix: String,

    /// Directory renditions are saved to. Default: `public/images`.
    pub images_dir: PathBuf,

    /// Attribution ledger. Default: `attribution.json`.
    pub ledger_path: PathBuf,

    /// Provider access key. Required unless `provider` is set.
    pub access_key: Option<String>,

    /// Provider API root. Default: `https://api.unsplash.com`.
    pub api_base: String,

    /// Search candidates requested per query. Default: 10 (minimum 10).
    pub per_page: u32,

    /// Per-request timeout in seconds. Default: 60.
    pub request_timeout_secs: u64,

    /// Placements whose provider calls may be in flight at once. Default: 1.
    ///
    /// Only search → usage → fetch is overlapped, and those three calls stay
    /// ordered within a placement. Patching always happens one placement at a
    /// time, in mapping order.
    pub concurrency: usize,

    /// Pre-constructed provider. Takes precedence over `access_key`.
    pub provider: Option<Arc<dyn ImageProvider>>,

    /// Optional progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for FillConfig {
    fn default() -> Self {
        let input = PathBuf::from("public/index.html");
        Self {
            output_path: input.clone(),
            input_path: input,
            mapping_path: PathBuf::from("scripts/image-mapping.json"),
            public_prefix: "/mypage/public".to_string(),
            images_dir: PathBuf::from("public/images"),
            ledger_path: PathBuf::from("attribution.json"),
            access_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            per_page: 10,
            request_timeout_secs: 60,
            concurrency: 1,
            provider: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for FillConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FillConfig")
            .field("input_path", &self.input_path)
            .field("output_path", &self.output_path)
            .field("mapping_path", &self.mapping_path)
            .field("public_prefix", &self.public_prefix)
            .field("images_dir", &self.images_dir)
            .field("ledger_path", &self.ledger_path)
            .field("access_key", &self.access_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("per_page", &self.per_page)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn ImageProvider>"))
            .finish()
    }
}

impl FillConfig {
    /// Create a new builder for `FillConfig`.
    pub fn builder() -> FillConfigBuilder {
        FillConfigBuilder {
            config: Self::default(),
            output_set: false,
        }
    }
}

/// Builder for [`FillConfig`].
pub struct FillConfigBuilder {
    config: FillConfig,
    output_set: bool,
}

impl FillConfigBuilder {
    /// Also moves the output path unless one was set explicitly.
    pub fn input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.input_path = path.into();
        if !self.output_set {
            self.config.output_path = self.config.input_path.clone();
        }
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = path.into();
        self.output_set = true;
        self
    }

    pub fn mapping_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.mapping_path = path.into();
        self
    }

    pub fn public_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.public_prefix = prefix.into();
        self
    }

    pub fn images_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.images_dir = dir.into();
        self
    }

    pub fn ledger_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ledger_path = path.into();
        self
    }

    pub fn access_key(mut self, key: impl Into<String>) -> Self {
        self.config.access_key = Some(key.into());
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = base.into();
        self
    }

    pub fn per_page(mut self, n: u32) -> Self {
        self.config.per_page = n.max(10);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn ImageProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// A missing credential is not checked here; [`crate::fill::fill`]
    /// reports it so that `list_placements` works without one.
    pub fn build(self) -> Result<FillConfig, FillError> {
        let c = &self.config;
        if c.request_timeout_secs == 0 {
            return Err(FillError::InvalidConfig(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }
        if c.input_path.as_os_str().is_empty() || c.output_path.as_os_str().is_empty() {
            return Err(FillError::InvalidConfig(
                "Input and output paths must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
