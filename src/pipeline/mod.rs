//! Pipeline stages that turn source documents into analysis text.
//!
//! Each submodule implements one step; rendering lives in [`crate::render`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ llm ──▶ postprocess
//! (URL/path) (pdfium,   (analyse,  (cleanup)
//!            docx-rs)    merge)
//! ```
//!
//! 1. [`input`]: canonicalise the path or URL to a local PDF or DOCX
//! 2. [`extract`]: pull plain text out; runs in `spawn_blocking`
//! 3. [`llm`]: analyse each document, then consolidate. The only stage
//!    with network I/O besides downloads
//! 4. [`postprocess`]: bring the model's markdown back into the subset the
//!    renderer understands

pub mod extract;
pub mod input;
pub mod llm;
pub mod postprocess;
