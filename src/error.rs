//! Error types for the edgequake-docgen library.
//!
//! Failures fall into three tiers:
//!
//! * [`DocGenError`] is **fatal**: the generation cannot proceed at all
//!   (missing input, provider not configured, every document failed, the
//!   briefing could not be written). Returned as `Err(DocGenError)` from the
//!   top-level entry points.
//!
//! * [`RenderError`] means the assembler could not build or persist the rich
//!   document. Surfaced directly by [`crate::render::Renderer::render`] and
//!   wrapped in [`DocGenError::Render`] by the pipeline.
//!
//! * [`DocumentError`] is **non-fatal**: one input document failed (unreadable
//!   file, exhausted LLM retries) while the others are fine. Stored inside
//!   [`crate::output::DocumentResult`] so callers can inspect partial success.
//!
//! Secondary-format conversion never fails the request. Its degraded mode is
//! described by [`ConversionUnavailable`] and only ever logged.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-docgen library.
#[derive(Debug, Error)]
pub enum DocGenError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// The file is neither a PDF nor a DOCX document.
    #[error("Unsupported document '{path}': expected PDF or DOCX (first bytes: {magic:?})")]
    UnsupportedFormat { path: PathBuf, magic: [u8; 4] },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// `generate` was called without any input documents.
    #[error("No input documents were given")]
    NoInputs,

    /// Text could not be extracted from a single-document request.
    #[error("Failed to extract text from '{path}': {detail}")]
    ExtractionFailed { path: PathBuf, detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned a non-retryable error.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// Every input document failed; there is nothing to render.
    #[error("All {total} documents failed.\nFirst error: {first_error}")]
    AllDocumentsFailed { total: usize, first_error: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The briefing document could not be built or saved.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// A storage operation (list, delete, upload, clean) failed.
    #[error("Storage error on '{path}': {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `delete` was asked for a name that is not a plain file name.
    #[error("Refusing to touch '{name}': artifact names must not contain path separators")]
    InvalidArtifactName { name: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A style theme file could not be read or parsed.
    #[error("Invalid style theme '{path}': {detail}")]
    InvalidTheme { path: PathBuf, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure while building or saving the rendered document.
///
/// Every variant keeps the underlying cause as its `source`, so callers can
/// walk the chain instead of parsing messages.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The output directory could not be created.
    #[error("Failed to create output directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Existing artifacts could not be scanned for the next sequence number.
    #[error("Failed to scan output directory '{path}': {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The in-memory document could not be serialised.
    #[error("Failed to serialise document for '{path}': {source}")]
    Pack {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The serialised bytes could not be written.
    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every candidate file name was taken by concurrent writers.
    #[error("Could not reserve a file name for '{base}' after {attempts} attempts")]
    SequenceExhausted { base: String, attempts: u32 },

    /// The blocking render task was cancelled or panicked.
    #[error("Render task failed: {0}")]
    Task(String),
}

/// A non-fatal error for a single input document.
///
/// Stored alongside [`crate::output::DocumentResult`] when a document fails.
/// Generation continues unless ALL documents fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum DocumentError {
    /// The input could not be resolved or its text could not be extracted.
    #[error("{source_name}: text extraction failed: {detail}")]
    ExtractionFailed { source_name: String, detail: String },

    /// LLM call failed after retries.
    #[error("{source_name}: LLM call failed after {retries} retries: {detail}")]
    LlmFailed {
        source_name: String,
        retries: u8,
        detail: String,
    },

    /// LLM call timed out.
    #[error("{source_name}: LLM call timed out after {secs}s")]
    Timeout { source_name: String, secs: u64 },
}

/// Why a secondary format was not produced.
///
/// Never returned from public entry points; converted into `None` and logged.
#[derive(Debug, Clone, Error)]
#[error("{format} conversion unavailable: {reason}")]
pub struct ConversionUnavailable {
    pub format: String,
    pub reason: String,
}

impl ConversionUnavailable {
    pub fn new(format: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn all_documents_failed_display() {
        let e = DocGenError::AllDocumentsFailed {
            total: 3,
            first_error: "plan.pdf: text extraction failed: corrupt".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("All 3 documents"), "got: {msg}");
        assert!(msg.contains("plan.pdf"), "got: {msg}");
    }

    #[test]
    fn render_error_keeps_source() {
        let e = RenderError::Write {
            path: PathBuf::from("out/brief_1.docx"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        assert!(e.to_string().contains("brief_1.docx"));
        let source = e.source().expect("io error should be the source");
        assert!(source.to_string().contains("disk full"));
    }

    #[test]
    fn render_error_is_transparent_inside_docgen_error() {
        let e: DocGenError = RenderError::SequenceExhausted {
            base: "brief".into(),
            attempts: 64,
        }
        .into();
        assert!(e.to_string().contains("brief"));
        assert!(e.to_string().contains("64"));
    }

    #[test]
    fn document_error_display() {
        let e = DocumentError::LlmFailed {
            source_name: "shelter.docx".into(),
            retries: 3,
            detail: "503".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("shelter.docx"));
        assert!(msg.contains("3 retries"));
    }

    #[test]
    fn conversion_unavailable_display() {
        let e = ConversionUnavailable::new("pdf", "pdfium not found");
        assert_eq!(e.to_string(), "pdf conversion unavailable: pdfium not found");
    }
}
