//! Pipeline stages for filling image placements.
//!
//! Each submodule implements exactly one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! provider ──▶ naming ──▶ patch ──▶ ledger
//! (search,     (file &    (rewrite   (merge
//!  track,       web path)  tags)      credits)
//!  fetch)
//! ```
//!
//! 1. [`provider`] — the only stage with network I/O; three ordered calls
//!    per placement
//! 2. [`naming`]   — deterministic rendition file names and public paths
//! 3. [`patch`]    — rewrite the bound tags in the in-memory document, using
//!    the text-level primitives in [`attrs`]
//! 4. [`ledger`]   — merge attribution entries into the ledger on disk

pub mod attrs;
pub mod ledger;
pub mod naming;
pub mod patch;
pub mod provider;
