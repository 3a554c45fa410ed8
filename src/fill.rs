//! Fill run orchestration.
//!
//! One run reads the document once, processes every placement in mapping
//! order, and writes the document and ledger once at the end:
//!
//! ```text
//! mapping ─┬─▶ dims ─▶ search ─▶ record usage ─▶ fetch ─▶ save image ─┐
//!          │                 (per placement, up to `concurrency`)      │
//!          │                                                           ▼
//!          └──────────────────────────────── patch document (in order) ─▶ ledger entry
//!
//! all placements ok ─▶ write document ─▶ merge + write ledger
//! ```
//!
//! The first failure aborts the run. Renditions already saved stay on disk,
//! but neither the document nor the ledger is written, so the site never
//! references a half-finished set of images.

use crate::config::{FillConfig, ACCESS_KEY_ENV};
use crate::error::{FillError, Stage};
use crate::mapping::{self, PlacementConfig};
use crate::output::{FillReport, PlacementOutcome};
use crate::pipeline::ledger::{self, AttributionEntry};
use crate::pipeline::naming;
use crate::pipeline::patch::{self, PatchTarget};
use crate::pipeline::provider::{ImageProvider, Orientation, PhotoRecord, UnsplashClient};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// A placement whose rendition is saved and ready to be patched in.
struct Fetched<'a> {
    placement: &'a PlacementConfig,
    photo: PhotoRecord,
    file_path: PathBuf,
    web_path: String,
    width: u32,
    height: Option<u32>,
    bytes: usize,
}

/// Fill every placement in the mapping and write the results.
///
/// # Errors
/// - Config errors (missing credential, missing input, bad mapping) before
///   anything is written.
/// - [`FillError::Placement`] naming the key and stage of the first provider
///   failure; the document and ledger are left untouched.
pub async fn fill(config: &FillConfig) -> Result<FillReport, FillError> {
    let total_start = Instant::now();

    // ── Step 1: Provider (credential check before any I/O) ───────────────
    let provider = resolve_provider(config)?;

    // ── Step 2: Mapping ──────────────────────────────────────────────────
    let placements = mapping::load_or_scaffold(&config.mapping_path).await?;
    let total = placements.len();
    info!("Loaded {} placements from {}", total, config.mapping_path.display());

    // ── Step 3: Input document ───────────────────────────────────────────
    let mut html = read_input(&config.input_path).await?;

    tokio::fs::create_dir_all(&config.images_dir)
        .await
        .map_err(|source| FillError::OutputWriteFailed {
            path: config.images_dir.clone(),
            source,
        })?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total);
    }

    // ── Step 4: Fetch (ordered, optionally overlapped) and patch ─────────
    let mut fetches = stream::iter(placements.iter().enumerate().map(|(i, p)| {
        fetch_placement(provider.as_ref(), p, i + 1, total, config)
    }))
    .buffered(config.concurrency);

    let mut outcomes = Vec::with_capacity(total);
    let mut entries = Vec::with_capacity(total);
    let mut index = 0;

    while let Some(fetched) = fetches.next().await {
        let f = fetched?;
        index += 1;
        let p = f.placement;

        let alt_text = alt_text_for(p, &f.photo);
        let target = PatchTarget {
            key: &p.key,
            web_path: &f.web_path,
            alt_text: &alt_text,
            width: f.width,
            height: f.height,
            target: p.target,
        };
        let patched = patch::apply_placement(&mut html, &target);

        entries.push(AttributionEntry::new(
            &p.key,
            &f.photo,
            &f.web_path,
            &p.query,
            provider.source_name(),
            provider.license_name(),
        ));

        info!("{}: saved {} and applied", p.key, f.web_path);
        if let Some(ref cb) = config.progress_callback {
            cb.on_placement_complete(&p.key, index, total, &f.web_path);
        }

        outcomes.push(PlacementOutcome {
            key: p.key.clone(),
            target: p.target,
            photo_id: f.photo.id,
            file_path: f.file_path,
            web_path: f.web_path,
            width: f.width,
            height: f.height,
            bytes: f.bytes,
            patch: patched,
        });
    }

    // ── Step 5: Commit document and ledger ───────────────────────────────
    write_atomic(&config.output_path, html.as_bytes()).await?;

    let merged = ledger::merge(ledger::load(&config.ledger_path).await, &entries)?;
    write_atomic(&config.ledger_path, ledger::to_json(&merged)?.as_bytes()).await?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(total);
    }

    let report = FillReport {
        placements: outcomes,
        output_path: config.output_path.clone(),
        ledger_path: config.ledger_path.clone(),
        ledger_entries: merged.len(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Fill complete: {} placements, output {}, ledger {}, {}ms",
        report.placements.len(),
        report.output_path.display(),
        report.ledger_path.display(),
        report.total_duration_ms
    );
    Ok(report)
}

/// Synchronous wrapper around [`fill`].
///
/// Creates a temporary tokio runtime internally.
pub fn fill_sync(config: &FillConfig) -> Result<FillReport, FillError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| FillError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(fill(config))
}

/// Load (or scaffold) the mapping without touching the network.
///
/// Does not require a credential.
pub async fn list_placements(config: &FillConfig) -> Result<Vec<PlacementConfig>, FillError> {
    mapping::load_or_scaffold(&config.mapping_path).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve the provider: a pre-built one wins, then the access key.
fn resolve_provider(config: &FillConfig) -> Result<Arc<dyn ImageProvider>, FillError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let key = config
        .access_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| FillError::MissingCredential {
            var: ACCESS_KEY_ENV.to_string(),
        })?;

    let client = UnsplashClient::new(
        key,
        config.api_base.clone(),
        config.per_page,
        config.request_timeout_secs,
    )
    .map_err(|e| FillError::InvalidConfig(format!("Cannot build provider client: {e}")))?;
    Ok(Arc::new(client))
}

async fn read_input(path: &Path) -> Result<String, FillError> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(FillError::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FillError::InputReadFailed {
            path: path.to_path_buf(),
            source,
        })
}

/// Alt text for `<img>` targets: mapping, then the photo's descriptions.
fn alt_text_for(p: &PlacementConfig, photo: &PhotoRecord) -> String {
    [
        p.alt_text.as_deref(),
        photo.alt_description.as_deref(),
        photo.description.as_deref(),
    ]
    .into_iter()
    .flatten()
    .find(|s| !s.trim().is_empty())
    .unwrap_or("")
    .trim()
    .to_string()
}

/// Search, track, fetch, and save one placement's rendition.
async fn fetch_placement<'a>(
    provider: &dyn ImageProvider,
    p: &'a PlacementConfig,
    index: usize,
    total: usize,
    config: &FillConfig,
) -> Result<Fetched<'a>, FillError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_placement_start(&p.key, index, total);
    }

    let result = fetch_placement_inner(provider, p, config).await;

    if let (Err(e), Some(cb)) = (&result, &config.progress_callback) {
        cb.on_placement_error(&p.key, index, total, &e.to_string());
    }
    result
}

async fn fetch_placement_inner<'a>(
    provider: &dyn ImageProvider,
    p: &'a PlacementConfig,
    config: &FillConfig,
) -> Result<Fetched<'a>, FillError> {
    let at = move |stage: Stage| {
        move |source| FillError::Placement {
            key: p.key.clone(),
            stage,
            source,
        }
    };

    let dims = p.dimensions();
    debug!("{}: {:?}, query '{}'", p.key, dims, p.query);

    let photo = provider
        .search(&p.query, Orientation::hint_for(&dims))
        .await
        .map_err(at(Stage::Search))?;
    provider
        .record_usage(&photo)
        .await
        .map_err(at(Stage::Usage))?;
    let rendition = provider
        .fetch_rendition(&photo, dims)
        .await
        .map_err(at(Stage::Fetch))?;

    let filename = naming::image_filename(&p.key, &photo, &rendition);
    let file_path = config.images_dir.join(&filename);
    tokio::fs::write(&file_path, &rendition.bytes)
        .await
        .map_err(|source| FillError::OutputWriteFailed {
            path: file_path.clone(),
            source,
        })?;
    debug!("{}: wrote {} bytes to {}", p.key, rendition.bytes.len(), file_path.display());

    Ok(Fetched {
        placement: p,
        web_path: naming::web_path(&config.public_prefix, &filename),
        file_path,
        width: rendition.width,
        height: rendition.height,
        bytes: rendition.bytes.len(),
        photo,
    })
}

/// Write `contents` to `path` via a sibling temp file and a rename, so a
/// reader never sees a half-written document or ledger.
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), FillError> {
    let write_err = |source| FillError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    if let Err(e) = tokio::fs::write(&tmp_path, contents).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo() -> PhotoRecord {
        PhotoRecord {
            id: "p1".into(),
            raw_url: "https://images.example.com/p1".into(),
            description: Some("A desk by the window".into()),
            alt_description: Some("  white desk  ".into()),
            author_name: None,
            author_handle: None,
            page_url: None,
            download_location: String::new(),
        }
    }

    #[test]
    fn alt_text_fallback_chain() {
        let mut p = PlacementConfig::new("hero", "desk").alt("Our office");
        assert_eq!(alt_text_for(&p, &photo()), "Our office");

        p.alt_text = Some(String::new());
        assert_eq!(alt_text_for(&p, &photo()), "white desk");

        let mut bare = photo();
        bare.alt_description = None;
        assert_eq!(alt_text_for(&p, &bare), "A desk by the window");

        bare.description = None;
        assert_eq!(alt_text_for(&p, &bare), "");
    }

    #[test]
    fn missing_credential_is_reported_without_provider() {
        let config = FillConfig::default();
        let err = resolve_provider(&config).err().unwrap();
        assert!(matches!(err, FillError::MissingCredential { .. }));

        let config = FillConfig::builder().access_key("   ").build().unwrap();
        assert!(resolve_provider(&config).is_err());
    }

    #[test]
    fn fill_sync_runs_without_an_outer_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let config = FillConfig::builder()
            .input_path(dir.path().join("index.html"))
            .mapping_path(dir.path().join("image-mapping.json"))
            .build()
            .unwrap();

        let err = fill_sync(&config).unwrap_err();
        assert!(matches!(err, FillError::MissingCredential { .. }));

        let config = FillConfig::builder()
            .input_path(dir.path().join("missing.html"))
            .mapping_path(dir.path().join("image-mapping.json"))
            .access_key("k")
            .build()
            .unwrap();
        let err = fill_sync(&config).unwrap_err();
        assert!(matches!(err, FillError::InputNotFound { .. }));
        assert!(dir.path().join("image-mapping.json").exists());
    }

    #[tokio::test]
    async fn atomic_write_creates_parents_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("index.html");

        write_atomic(&path, b"<html></html>").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<html></html>");
        let names: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, ["index.html"]);
    }
}
