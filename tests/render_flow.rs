//! Offline integration tests: render, sequencing, conversion fallback and
//! storage management. No LLM or network access is needed.

use edgequake_docgen::error::ConversionUnavailable;
use edgequake_docgen::render::convert::{FormatBackend, PdfiumBackend};
use edgequake_docgen::render::docx::{extract_text, read_blocks, StyledBlock};
use edgequake_docgen::{
    render_markdown, segment, ArtifactStore, Block, BlockKind, Converter, GeneratorConfig,
    OutputFormat, Renderer, StyleSheet,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const ANALYSIS: &str = "\
Regional overview of temporary animal housing.

# Capacity
- 40 dog kennels
- 25 cat condos

# Contacts
## Intake desk
Staffed from 08:00 to 20:00.
";

/// Writes a fixed marker instead of a real PDF so conversion can succeed
/// without pdfium.
struct FakePdf;

impl FormatBackend for FakePdf {
    fn format(&self) -> OutputFormat {
        OutputFormat::Pdf
    }

    fn encode(
        &self,
        blocks: &[StyledBlock],
        _styles: &StyleSheet,
    ) -> Result<Vec<u8>, ConversionUnavailable> {
        Ok(format!("%PDF-fake {} blocks", blocks.len()).into_bytes())
    }
}

#[test]
fn rendered_docx_keeps_block_order_and_styles() {
    let tmp = TempDir::new().unwrap();
    let renderer = Renderer::new(tmp.path());
    let artifact = renderer.render(ANALYSIS, "overview", "animal_boarding").unwrap();

    assert_eq!(artifact.file_name(), "overview_1.docx");
    let bytes = std::fs::read(&artifact.path).unwrap();
    let blocks = read_blocks(&bytes, renderer.styles()).unwrap();
    let kinds: Vec<BlockKind> = blocks.iter().map(|b| b.kind).collect();
    assert_eq!(
        kinds,
        vec![
            BlockKind::Title,
            BlockKind::Timestamp,
            BlockKind::Body,
            BlockKind::Section,
            BlockKind::Bullet,
            BlockKind::Bullet,
            BlockKind::Section,
            BlockKind::Subsection,
            BlockKind::Body,
        ]
    );
    assert_eq!(blocks[0].text, "ANIMAL BOARDING");
    assert_eq!(blocks[4].text, "40 dog kennels");

    let text = extract_text(&bytes).unwrap();
    assert!(text.contains("Staffed from 08:00 to 20:00."));
}

#[test]
fn sequence_numbers_continue_after_the_highest() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("brief_3.docx"), b"x").unwrap();
    std::fs::write(tmp.path().join("brief_7.pdf"), b"x").unwrap();
    std::fs::write(tmp.path().join("other_99.docx"), b"x").unwrap();

    let renderer = Renderer::new(tmp.path());
    let a = renderer.render("body", "brief", "general").unwrap();
    let b = renderer.render("body", "brief", "general").unwrap();
    assert_eq!(a.file_name(), "brief_8.docx");
    assert_eq!(b.file_name(), "brief_9.docx");
}

#[test]
fn empty_analysis_still_renders_title_and_date() {
    let tmp = TempDir::new().unwrap();
    let renderer = Renderer::new(tmp.path());
    let artifact = renderer.render("", "empty", "").unwrap();
    let bytes = std::fs::read(&artifact.path).unwrap();
    let blocks = read_blocks(&bytes, renderer.styles()).unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].text, "DOCUMENT");
    assert!(blocks[1].text.starts_with("Generated: "));
}

#[test]
fn concurrent_renders_never_share_a_name() {
    let tmp = TempDir::new().unwrap();
    let renderer = Renderer::new(tmp.path());

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let r = renderer.clone();
            thread::spawn(move || {
                r.render(&format!("# Run {i}\n- item"), "shared", "general")
                    .unwrap()
            })
        })
        .collect();
    let names: HashSet<String> = handles
        .into_iter()
        .map(|h| h.join().unwrap().file_name())
        .collect();

    assert_eq!(names.len(), 12);
    for n in 1..=12 {
        assert!(names.contains(&format!("shared_{n}.docx")), "missing shared_{n}");
    }
}

#[test]
fn separate_stores_on_one_directory_still_get_unique_names() {
    let tmp = TempDir::new().unwrap();
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let dir = tmp.path().to_path_buf();
            thread::spawn(move || Renderer::new(dir).render("x", "multi", "general").unwrap())
        })
        .collect();
    let names: HashSet<String> = handles
        .into_iter()
        .map(|h| h.join().unwrap().file_name())
        .collect();
    assert_eq!(names.len(), 6);
}

#[test]
fn conversion_without_pdfium_leaves_docx_alone() {
    let tmp = TempDir::new().unwrap();
    let renderer = Renderer::new(tmp.path());
    let primary = renderer.render(ANALYSIS, "brief", "shelter_plan").unwrap();

    let converter = Converter::new(StyleSheet::default()).with_backend(Arc::new(
        PdfiumBackend::with_library(tmp.path().join("no_such_libpdfium.so")),
    ));
    assert!(converter.convert(&primary, OutputFormat::Pdf).is_none());
    assert!(primary.path.exists());
    assert!(!tmp.path().join("brief_1.pdf").exists());
}

#[test]
fn conversion_writes_sibling_with_same_stem() {
    let tmp = TempDir::new().unwrap();
    let renderer = Renderer::new(tmp.path());
    let primary = renderer.render(ANALYSIS, "brief", "general").unwrap();

    let converter = Converter::new(StyleSheet::default()).with_backend(Arc::new(FakePdf));
    let pdf = converter.convert(&primary, OutputFormat::Pdf).unwrap();
    assert_eq!(pdf.file_name(), "brief_1.pdf");
    assert_eq!(pdf.format, OutputFormat::Pdf);
    let bytes = std::fs::read(&pdf.path).unwrap();
    assert!(bytes.starts_with(b"%PDF-fake"));

    // The next render skips past the number the PDF occupies.
    let next = renderer.render("x", "brief", "general").unwrap();
    assert_eq!(next.file_name(), "brief_2.docx");
}

#[tokio::test]
async fn render_markdown_skips_unavailable_pdf() {
    let tmp = TempDir::new().unwrap();
    let config = GeneratorConfig::builder()
        .output_dir(tmp.path())
        .pdfium_library(tmp.path().join("missing_pdfium"))
        .build()
        .unwrap();
    assert!(config.wants(OutputFormat::Pdf));

    let files = render_markdown(ANALYSIS, "dual", &config).await.unwrap();
    assert!(files.contains_key(&OutputFormat::Docx));
    assert!(!files.contains_key(&OutputFormat::Pdf));
    assert_eq!(files[&OutputFormat::Docx].file_name(), "dual_1.docx");
}

#[test]
fn list_delete_and_clean() {
    let tmp = TempDir::new().unwrap();
    let renderer = Renderer::new(tmp.path());
    renderer.render("a", "alpha", "general").unwrap();
    renderer.render("b", "beta", "general").unwrap();

    let store = ArtifactStore::new(tmp.path());
    let names: Vec<String> = store.list().unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["alpha_1.docx", "beta_1.docx"]);

    assert!(store.delete("alpha_1.docx").unwrap());
    assert!(!store.delete("alpha_1.docx").unwrap());
    assert!(store.delete("../beta_1.docx").is_err());

    // Nothing is older than an hour yet.
    assert!(store.clean(Duration::from_secs(3600)).unwrap().is_empty());
    thread::sleep(Duration::from_millis(20));
    assert_eq!(store.clean(Duration::ZERO).unwrap(), vec!["beta_1.docx".to_string()]);
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn segmenter_properties() {
    // Blank and whitespace-only input yields nothing.
    assert!(segment("").is_empty());
    assert!(segment("  \n\t\n").is_empty());

    // Text without markers is one paragraph.
    let model = segment("Only prose here.");
    assert_eq!(model.blocks(), &[Block::paragraph("Only prose here.")]);

    // Non-blank content survives segmentation in order.
    let model = segment(ANALYSIS);
    let texts: Vec<&str> = model.iter().map(|b| b.text()).collect();
    let mut cursor = 0;
    for t in texts {
        let pos = ANALYSIS[cursor..]
            .find(t)
            .unwrap_or_else(|| panic!("'{t}' out of order"));
        cursor += pos + t.len();
    }
}
