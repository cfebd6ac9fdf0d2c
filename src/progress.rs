//! Progress-callback trait for generation events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::GeneratorConfigBuilder::progress_callback`] to receive
//! events as each input document is extracted and analysed, and when the
//! briefing has been rendered.
//!
//! # Example
//!
//! ```rust
//! use edgequake_docgen::{GenerationProgressCallback, GeneratorConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl GenerationProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, index: usize, total: usize, analysis_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Document {}/{} analysed ({} bytes)", index, total, analysis_len);
//!     }
//! }
//!
//! let config = GeneratorConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by [`crate::generate`] as it works through the inputs.
///
/// Documents are analysed concurrently, so the per-document methods may be
/// called from several tasks at once. All methods default to no-ops.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called once before any document is read.
    fn on_generation_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called before a document is extracted. `index` is 1-based.
    fn on_document_start(&self, index: usize, total: usize, source: &str) {
        let _ = (index, total, source);
    }

    /// Called when a document's analysis has been received.
    fn on_document_complete(&self, index: usize, total: usize, analysis_len: usize) {
        let _ = (index, total, analysis_len);
    }

    /// Called when a document failed extraction or analysis.
    fn on_document_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called when several analyses are about to be consolidated.
    fn on_merge_start(&self, analyses: usize) {
        let _ = analyses;
    }

    /// Called after each artifact has been written.
    fn on_render_complete(&self, path: &Path) {
        let _ = path;
    }
}

/// A callback that ignores every event.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// The type stored in [`crate::config::GeneratorConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;
