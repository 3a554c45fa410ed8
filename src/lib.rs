//! # stockfill
//!
//! Fill placeholder image slots in a static HTML page with stock photos,
//! and keep a ledger of who took them.
//!
//! ## Why this crate?
//!
//! A marketing page usually starts life with grey boxes. Picking, cropping,
//! and crediting a photo for each one by hand is tedious and easy to get
//! wrong, and re-running a full HTML formatter over hand-written markup
//! produces noisy diffs. This crate edits only the tags it owns, in place,
//! so a rerun is a no-op apart from the photos themselves.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image-mapping.json        index.html
//!  │                          │
//!  ├─ 1. Mapping   load or scaffold placement → query/size/target
//!  ├─ 2. Provider  search → record usage → fetch cropped WebP rendition
//!  ├─ 3. Naming    <key>-<author>-<id>-w<W>[x<H>].webp under images/
//!  ├─ 4. Patch     bind id="key", rewrite <img src> / inline background-image
//!  └─ 5. Ledger    merge attribution entries into attribution.json
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stockfill::{fill, FillConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FillConfig::builder()
//!         .input_path("public/index.html")
//!         .public_prefix("/mypage/public")
//!         .access_key(std::env::var("UNSPLASH_ACCESS_KEY")?)
//!         .build()?;
//!     let report = fill(&config).await?;
//!     for p in &report.placements {
//!         println!("{} -> {}", p.key, p.web_path);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Marking up a slot
//!
//! ```html
//! <!-- found by id on the first run, then bound by marker -->
//! <section id="hero"></section>
//!
//! <!-- bound explicitly -->
//! <img data-image-key="profile" alt="Our founder">
//! <div data-image-key="pricing" data-image-target="bg"></div>
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `stockfill` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod fill;
pub mod mapping;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{FillConfig, FillConfigBuilder, ACCESS_KEY_ENV};
pub use error::{FillError, ProviderError, Stage};
pub use fill::{fill, fill_sync, list_placements};
pub use mapping::{PlacementConfig, ResolvedDimensions, TargetKind};
pub use output::{FillReport, PlacementOutcome};
pub use pipeline::ledger::AttributionEntry;
pub use pipeline::patch::PatchOutcome;
pub use pipeline::provider::{ImageProvider, Orientation, PhotoRecord, Rendition, UnsplashClient};
pub use progress::{FillProgressCallback, NoopProgressCallback, ProgressCallback};
