//! Progress-callback trait for per-placement fill events.
//!
//! Inject an [`Arc<dyn FillProgressCallback>`] via
//! [`crate::config::FillConfigBuilder::progress_callback`] to be told as each
//! placement is searched, downloaded, and patched.
//!
//! # Example
//!
//! ```rust
//! use stockfill::{FillConfig, FillProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl FillProgressCallback for CountingCallback {
//!     fn on_placement_complete(&self, key: &str, _index: usize, total: usize, web_path: &str) {
//!         let n = self.done.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{n}/{total} {key} -> {web_path}");
//!     }
//! }
//!
//! let config = FillConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the orchestrator as it processes each placement.
///
/// All methods default to no-ops. With `concurrency > 1`, `on_placement_start`
/// may fire for several placements before any of them completes.
pub trait FillProgressCallback: Send + Sync {
    /// Called once after the mapping is loaded.
    fn on_run_start(&self, total_placements: usize) {
        let _ = total_placements;
    }

    /// Called before the search request for a placement.
    ///
    /// `index` is 1-based in mapping order.
    fn on_placement_start(&self, key: &str, index: usize, total: usize) {
        let _ = (key, index, total);
    }

    /// Called after a placement's rendition is saved and the document patched.
    fn on_placement_complete(&self, key: &str, index: usize, total: usize, web_path: &str) {
        let _ = (key, index, total, web_path);
    }

    /// Called when a placement fails. The run aborts right after.
    fn on_placement_error(&self, key: &str, index: usize, total: usize, error: &str) {
        let _ = (key, index, total, error);
    }

    /// Called once after the document and ledger are written.
    fn on_run_complete(&self, total_placements: usize) {
        let _ = total_placements;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl FillProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::FillConfig`].
pub type ProgressCallback = Arc<dyn FillProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
    }

    impl FillProgressCallback for TrackingCallback {
        fn on_placement_start(&self, _key: &str, _index: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_placement_complete(&self, _key: &str, _index: usize, _total: usize, _web_path: &str) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_placement_error(&self, _key: &str, _index: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(2);
        cb.on_placement_start("hero", 1, 2);
        cb.on_placement_complete("hero", 1, 2, "/images/hero.webp");
        cb.on_placement_error("faq", 2, 2, "HTTP 500");
        cb.on_run_complete(2);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_placement_start("hero", 1, 2);
        tracker.on_placement_complete("hero", 1, 2, "/images/hero.webp");
        tracker.on_placement_start("faq", 2, 2);
        tracker.on_placement_error("faq", 2, 2, "no results");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }
}
