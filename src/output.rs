//! Result types returned by a successful fill run.

use crate::mapping::TargetKind;
use crate::pipeline::patch::PatchOutcome;
use serde::Serialize;
use std::path::PathBuf;

/// What happened to one placement.
#[derive(Debug, Clone, Serialize)]
pub struct PlacementOutcome {
    pub key: String,
    pub target: TargetKind,
    pub photo_id: String,
    /// Where the rendition was written on disk.
    pub file_path: PathBuf,
    /// Path written into the document's `src` / `background-image`.
    pub web_path: String,
    pub width: u32,
    pub height: Option<u32>,
    pub bytes: usize,
    #[serde(flatten)]
    pub patch: PatchOutcome,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct FillReport {
    pub placements: Vec<PlacementOutcome>,
    pub output_path: PathBuf,
    pub ledger_path: PathBuf,
    /// Entries in the ledger after merging.
    pub ledger_entries: usize,
    pub total_duration_ms: u64,
}

impl FillReport {
    /// Placements whose image the document does not reference.
    pub fn unmatched(&self) -> impl Iterator<Item = &PlacementOutcome> {
        self.placements.iter().filter(|p| !p.patch.image_referenced())
    }
}
