//! # edgequake-docgen
//!
//! Summarise emergency-management documents (PDF or DOCX) with an LLM and
//! render the briefing as a styled Word document, plus a PDF when a pdfium
//! library is available.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / DOCX
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Extract   plain text via pdfium / docx-rs (spawn_blocking)
//!  ├─ 3. Analyse   one LLM call per document, concurrently
//!  ├─ 4. Merge     consolidate several analyses into one
//!  ├─ 5. Clean     post-processing into the `# `/`## `/`- ` subset
//!  ├─ 6. Render    segment → style → DOCX, named `{base}_{n}.docx`
//!  └─ 7. Convert   best-effort PDF sibling; skipped, not failed, when unavailable
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_docgen::{generate, DocumentType, GeneratorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / ...
//!     let config = GeneratorConfig::builder()
//!         .document_type(DocumentType::ShelterPlan)
//!         .build()?;
//!     let output = generate(&["plan_a.pdf", "plan_b.docx"], "shelter_brief", &config).await?;
//!     for artifact in output.files.values() {
//!         println!("{}", artifact.path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Rendering alone needs no provider:
//!
//! ```rust,no_run
//! use edgequake_docgen::Renderer;
//!
//! let renderer = Renderer::new("storage/outputs");
//! let artifact = renderer.render("# Scope\n- Dogs\n- Cats", "brief", "animal_boarding")?;
//! assert!(artifact.file_name().starts_with("brief_"));
//! # Ok::<(), edgequake_docgen::RenderError>(())
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docgen` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-docgen = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pdfium;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod render;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DocumentType, GeneratorConfig, GeneratorConfigBuilder, OutputFormat};
pub use error::{ConversionUnavailable, DocGenError, DocumentError, RenderError};
pub use generate::{
    analyze, convert_artifact, generate, generate_sync, preview, render_markdown,
    resolve_provider,
};
pub use output::{
    AnalysisOutput, ArtifactInfo, DocumentResult, GenerateOutput, GenerationStats, PreviewOutput,
    RenderedArtifact,
};
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback};
pub use render::{
    segment, Block, BlockKind, BlockStyle, Converter, DocumentModel, Renderer, StyleSheet,
};
pub use store::ArtifactStore;
