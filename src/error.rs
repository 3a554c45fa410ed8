//! Error types for the stockfill library.
//!
//! Two layers reflect two distinct failure sources:
//!
//! * [`ProviderError`] — what went wrong talking to the image provider
//!   (non-2xx status, empty search, transport failure, bad JSON). Returned by
//!   every [`crate::pipeline::provider::ImageProvider`] method.
//!
//! * [`FillError`] — **Fatal** for the whole run. Provider failures are
//!   wrapped in [`FillError::Placement`] together with the placement key and
//!   the [`Stage`] that failed, so an operator knows exactly what to retry.
//!
//! Nothing here is retried. The first error aborts the run before the output
//! document or the attribution ledger is written.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The provider call a placement was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Photo search.
    Search,
    /// Provider-mandated download tracking call.
    Usage,
    /// Rendition download.
    Fetch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Search => "search",
            Stage::Usage => "usage",
            Stage::Fetch => "fetch",
        };
        f.write_str(s)
    }
}

/// Failure of a single call against the image provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The endpoint answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The search succeeded but returned zero photos.
    #[error("no results for query '{query}'")]
    NoResults { query: String },

    /// Connection, TLS, or timeout failure before a status was received.
    #[error("request failed: {0}")]
    Transport(String),

    /// The response body was not the JSON shape we expect.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::Decode(e.to_string())
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

/// All fatal errors returned by the stockfill library.
#[derive(Debug, Error)]
pub enum FillError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// No provider credential was supplied.
    #[error("Image provider credential is missing.\nSet {var} before running.")]
    MissingCredential { var: String },

    /// The input HTML document does not exist.
    #[error("Input HTML not found: '{path}'")]
    InputNotFound { path: PathBuf },

    /// The input HTML exists but could not be read as UTF-8 text.
    #[error("Failed to read input HTML '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The placement mapping file is not valid.
    #[error("Invalid placement mapping '{path}': {detail}")]
    MappingParse { path: PathBuf, detail: String },

    /// The default mapping template could not be written.
    #[error("Failed to write mapping template '{path}': {source}")]
    MappingWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Per-placement errors ──────────────────────────────────────────────
    /// A placement failed; the run was aborted with nothing committed.
    #[error("Placement '{key}' failed during {stage}: {source}")]
    Placement {
        key: String,
        stage: Stage,
        #[source]
        source: ProviderError,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not write an image, the output document, or the ledger.
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FillError {
    /// True for the startup failures that happen before any mutation:
    /// missing credential, unreadable input, unparsable mapping, bad config.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            FillError::MissingCredential { .. }
                | FillError::InputNotFound { .. }
                | FillError::InputReadFailed { .. }
                | FillError::MappingParse { .. }
                | FillError::MappingWriteFailed { .. }
                | FillError::InvalidConfig(_)
        )
    }

    /// The placement key that caused the failure, if any.
    pub fn placement(&self) -> Option<&str> {
        match self {
            FillError::Placement { key, .. } => Some(key),
            _ => None,
        }
    }

    /// The failing stage for placement errors.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            FillError::Placement { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_display_names_key_and_stage() {
        let e = FillError::Placement {
            key: "hero".into(),
            stage: Stage::Usage,
            source: ProviderError::Status {
                status: 403,
                body: "Forbidden".into(),
            },
        };
        let msg = e.to_string();
        assert!(msg.contains("'hero'"), "got: {msg}");
        assert!(msg.contains("during usage"), "got: {msg}");
        assert!(msg.contains("HTTP 403"), "got: {msg}");
        assert_eq!(e.placement(), Some("hero"));
        assert_eq!(e.stage(), Some(Stage::Usage));
        assert!(!e.is_config());
    }

    #[test]
    fn no_results_display() {
        let e = ProviderError::NoResults {
            query: "desk".into(),
        };
        assert!(e.to_string().contains("'desk'"));
    }

    #[test]
    fn missing_credential_is_config() {
        let e = FillError::MissingCredential {
            var: "UNSPLASH_ACCESS_KEY".into(),
        };
        assert!(e.is_config());
        assert!(e.placement().is_none());
        assert!(e.to_string().contains("UNSPLASH_ACCESS_KEY"));
    }

    #[test]
    fn mapping_parse_is_config() {
        let e = FillError::MappingParse {
            path: "scripts/image-mapping.json".into(),
            detail: "expected value at line 1".into(),
        };
        assert!(e.is_config());
    }
}
