//! Analysis text → styled DOCX on disk, plus best-effort secondary formats.
//!
//! ## Data Flow
//!
//! ```text
//! analysis ──▶ segment ──▶ outline ──▶ docx ──▶ store ──▶ convert
//!  (&str)      (blocks)   (+title,    (bytes)  (X_n.docx)  (X_n.pdf,
//!                          timestamp)                      optional)
//! ```
//!
//! 1. [`segment`] splits the markdown subset into [`Block`]s.
//! 2. [`Renderer::outline`] prepends the title and timestamp and maps every
//!    block to its [`BlockKind`].
//! 3. [`docx`] encodes the outline with the [`StyleSheet`].
//! 4. [`crate::store::ArtifactStore`] allocates `{base}_{n}.docx` and writes it.
//! 5. [`convert`] re-reads that DOCX and emits another format, or gives up
//!    quietly.

pub mod convert;
pub mod docx;
pub mod segment;
pub mod style;

pub use convert::{Converter, FormatBackend, PdfiumBackend};
pub use docx::StyledBlock;
pub use segment::{segment, Block, DocumentModel};
pub use style::{Alignment, BlockKind, BlockStyle, StyleSheet};

use crate::config::{GeneratorConfig, OutputFormat};
use crate::error::RenderError;
use crate::output::RenderedArtifact;
use crate::store::{sanitize_base_name, ArtifactStore};
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Writes analyses as styled DOCX files into one output directory.
///
/// Cheap to clone; clones share the store, so sequence numbers stay unique
/// across threads.
#[derive(Debug, Clone)]
pub struct Renderer {
    store: Arc<ArtifactStore>,
    styles: StyleSheet,
}

impl Renderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self::with_store(Arc::new(ArtifactStore::new(output_dir)))
    }

    pub fn with_store(store: Arc<ArtifactStore>) -> Self {
        Self {
            store,
            styles: StyleSheet::default(),
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(&config.output_dir).with_styles(config.styles.clone())
    }

    pub fn with_styles(mut self, styles: StyleSheet) -> Self {
        self.styles = styles;
        self
    }

    pub fn styles(&self) -> &StyleSheet {
        &self.styles
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    /// Render `analysis` to `{output_dir}/{base}_{n}.docx`.
    ///
    /// `document_type` is a label such as `animal_boarding`; it becomes the
    /// upper-cased document title. Empty analysis text is fine and yields a
    /// document with only the title and timestamp.
    pub fn render(
        &self,
        analysis: &str,
        base_filename: &str,
        document_type: &str,
    ) -> Result<RenderedArtifact, RenderError> {
        self.render_at(analysis, base_filename, document_type, Local::now())
    }

    /// [`Renderer::render`] with an explicit generation time.
    pub fn render_at(
        &self,
        analysis: &str,
        base_filename: &str,
        document_type: &str,
        generated: DateTime<Local>,
    ) -> Result<RenderedArtifact, RenderError> {
        let base = sanitize_base_name(base_filename);
        let outline = self.outline(analysis, document_type, generated);
        debug!("Rendering {} blocks for '{}'", outline.len(), base);

        let bytes = docx::write_docx(&outline, &self.styles).map_err(|source| RenderError::Pack {
            path: self.store.dir().join(format!("{base}.docx")),
            source,
        })?;
        let path = self.store.persist(&base, OutputFormat::Docx.extension(), &bytes)?;

        info!("Rendered {} ({} bytes)", path.display(), bytes.len());
        Ok(RenderedArtifact {
            path,
            format: OutputFormat::Docx,
            created_at: generated,
        })
    }

    /// Async wrapper running [`Renderer::render`] on the blocking pool.
    pub async fn render_async(
        &self,
        analysis: String,
        base_filename: String,
        document_type: String,
    ) -> Result<RenderedArtifact, RenderError> {
        let renderer = self.clone();
        tokio::task::spawn_blocking(move || {
            renderer.render(&analysis, &base_filename, &document_type)
        })
        .await
        .map_err(|e| RenderError::Task(e.to_string()))?
    }

    /// The full block list that goes into the document: title, timestamp,
    /// then the segmented analysis.
    pub fn outline(
        &self,
        analysis: &str,
        document_type: &str,
        generated: DateTime<Local>,
    ) -> Vec<StyledBlock> {
        let model = segment(analysis);
        let mut out = Vec::with_capacity(model.len() + 2);
        out.push(StyledBlock::new(BlockKind::Title, document_title(document_type)));
        out.push(StyledBlock::new(BlockKind::Timestamp, timestamp_line(generated)));
        out.extend(model.into_iter().map(|block| {
            let kind = BlockKind::from(&block);
            StyledBlock::new(kind, block.text())
        }));
        out
    }
}

/// `animal_boarding` → `ANIMAL BOARDING`.
pub fn document_title(document_type: &str) -> String {
    let title = document_type.trim().replace('_', " ").to_uppercase();
    if title.is_empty() {
        "DOCUMENT".to_string()
    } else {
        title
    }
}

/// `Generated: March 04, 2025`.
pub fn timestamp_line(generated: DateTime<Local>) -> String {
    format!("Generated: {}", generated.format("%B %d, %Y"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 4, 10, 30, 0).unwrap()
    }

    #[test]
    fn title_from_label() {
        assert_eq!(document_title("animal_boarding"), "ANIMAL BOARDING");
        assert_eq!(document_title("shelter_plan"), "SHELTER PLAN");
        assert_eq!(document_title(""), "DOCUMENT");
    }

    #[test]
    fn timestamp_uses_long_month() {
        assert_eq!(timestamp_line(fixed_time()), "Generated: March 04, 2025");
    }

    #[test]
    fn output_path_that_is_a_file_fails_with_create_dir() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("outputs");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = Renderer::new(&blocker)
            .render("# Scope\n- Dogs", "brief", "general")
            .unwrap_err();
        match &err {
            RenderError::CreateDir { path, .. } => assert_eq!(path, &blocker),
            other => panic!("expected CreateDir, got {other:?}"),
        }
        let source = std::error::Error::source(&err).expect("io error is kept as source");
        assert!(source.downcast_ref::<std::io::Error>().is_some());
        assert!(err.to_string().contains("outputs"));
        // Nothing was written next to the blocking file.
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn outline_prepends_title_and_timestamp() {
        let r = Renderer::new("unused");
        let outline = r.outline("# Scope\n- Dogs\n- Cats", "animal_boarding", fixed_time());
        let kinds: Vec<_> = outline.iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::Title,
                BlockKind::Timestamp,
                BlockKind::Section,
                BlockKind::Bullet,
                BlockKind::Bullet,
            ]
        );
        assert_eq!(outline[0].text, "ANIMAL BOARDING");
        assert_eq!(outline[4].text, "Cats");
    }

    #[test]
    fn empty_analysis_still_renders() {
        let tmp = TempDir::new().unwrap();
        let r = Renderer::new(tmp.path());
        let artifact = r.render_at("", "brief", "general", fixed_time()).unwrap();
        assert_eq!(artifact.file_name(), "brief_1.docx");
        assert_eq!(artifact.format, OutputFormat::Docx);
        assert_eq!(artifact.created_at, fixed_time());

        let bytes = std::fs::read(&artifact.path).unwrap();
        let blocks = docx::read_blocks(&bytes, r.styles()).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "GENERAL");
    }

    #[test]
    fn base_name_is_sanitised() {
        let tmp = TempDir::new().unwrap();
        let r = Renderer::new(tmp.path());
        let artifact = r.render("x", "../county plan.docx", "general").unwrap();
        assert_eq!(artifact.file_name(), "county_plan_1.docx");
        assert!(artifact.path.starts_with(tmp.path()));
    }

    #[tokio::test]
    async fn async_render_uses_blocking_pool() {
        let tmp = TempDir::new().unwrap();
        let r = Renderer::new(tmp.path());
        let a = r
            .render_async("# A".into(), "brief".into(), "general".into())
            .await
            .unwrap();
        assert_eq!(a.file_name(), "brief_1.docx");
    }
}
