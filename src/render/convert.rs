//! Secondary formats derived from a rendered DOCX.
//!
//! Conversion is best effort. [`Converter::convert`] returns `None` whenever
//! the target cannot be produced (no backend, pdfium missing, unreadable
//! DOCX, write failure) and logs the reason; the primary artifact is never
//! affected.
//!
//! The PDF backend lays the document out itself instead of printing the DOCX
//! through an office suite: the DOCX is read back into [`StyledBlock`]s,
//! [`layout`] breaks them into positioned lines on A4 pages, and pdfium draws
//! those lines with the standard Helvetica faces.

use crate::config::{GeneratorConfig, OutputFormat};
use crate::error::ConversionUnavailable;
use crate::output::RenderedArtifact;
use crate::render::docx::{self, StyledBlock};
use crate::render::style::{Alignment, BlockStyle, StyleSheet};
use pdfium_render::prelude::*;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Produces one output format from a styled outline.
pub trait FormatBackend: Send + Sync {
    /// The format this backend writes.
    fn format(&self) -> OutputFormat;

    /// Encode `blocks` as a complete file.
    fn encode(
        &self,
        blocks: &[StyledBlock],
        styles: &StyleSheet,
    ) -> Result<Vec<u8>, ConversionUnavailable>;
}

/// Turns primary DOCX artifacts into other formats.
#[derive(Clone)]
pub struct Converter {
    backends: Vec<Arc<dyn FormatBackend>>,
    styles: StyleSheet,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let formats: Vec<_> = self.backends.iter().map(|b| b.format()).collect();
        f.debug_struct("Converter")
            .field("backends", &formats)
            .finish()
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(StyleSheet::default()).with_backend(Arc::new(PdfiumBackend::default()))
    }
}

impl Converter {
    /// A converter with no backends; every conversion yields `None`.
    pub fn new(styles: StyleSheet) -> Self {
        Self {
            backends: Vec::new(),
            styles,
        }
    }

    /// The pdfium backend with the configured library and styles.
    pub fn from_config(config: &GeneratorConfig) -> Self {
        let backend = match &config.pdfium_library {
            Some(path) => PdfiumBackend::with_library(path.clone()),
            None => PdfiumBackend::default(),
        };
        Self::new(config.styles.clone()).with_backend(Arc::new(backend))
    }

    pub fn with_backend(mut self, backend: Arc<dyn FormatBackend>) -> Self {
        self.backends.push(backend);
        self
    }

    /// Convert `primary` to `target`, writing the result next to it with the
    /// same stem. Returns `None` when the format is unavailable.
    pub fn convert(&self, primary: &RenderedArtifact, target: OutputFormat) -> Option<RenderedArtifact> {
        match self.try_convert(primary, target) {
            Ok(artifact) => Some(artifact),
            Err(reason) => {
                warn!("{} (source {})", reason, primary.path.display());
                None
            }
        }
    }

    /// Like [`Converter::convert`] but reports why conversion was skipped.
    pub fn try_convert(
        &self,
        primary: &RenderedArtifact,
        target: OutputFormat,
    ) -> Result<RenderedArtifact, ConversionUnavailable> {
        if target == primary.format {
            return Ok(primary.clone());
        }
        let unavailable = |reason: String| ConversionUnavailable::new(target.extension(), reason);

        if primary.format != OutputFormat::Docx {
            return Err(unavailable(format!("cannot convert from {}", primary.format)));
        }
        let backend = self
            .backends
            .iter()
            .find(|b| b.format() == target)
            .ok_or_else(|| unavailable("no backend registered".into()))?;

        let bytes = fs::read(&primary.path)
            .map_err(|e| unavailable(format!("cannot read {}: {e}", primary.path.display())))?;
        let blocks = docx::read_blocks(&bytes, &self.styles)
            .map_err(|e| unavailable(format!("cannot parse DOCX: {e:?}")))?;
        debug!("Re-read {} blocks from {}", blocks.len(), primary.path.display());

        let encoded = backend.encode(&blocks, &self.styles)?;

        let path = primary.path.with_extension(target.extension());
        write_new(&path, &encoded)
            .map_err(|e| unavailable(format!("cannot write {}: {e}", path.display())))?;
        info!("Converted {} → {}", primary.file_name(), path.display());
        Ok(RenderedArtifact::new(path, target))
    }
}

fn write_new(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    if let Err(e) = file.write_all(bytes).and_then(|_| file.sync_all()) {
        let _ = fs::remove_file(path);
        return Err(e);
    }
    Ok(())
}

// ── Layout ───────────────────────────────────────────────────────────────────

/// A4 in points.
pub const PAGE_WIDTH_PT: f32 = 595.0;
pub const PAGE_HEIGHT_PT: f32 = 842.0;
pub const PAGE_MARGIN_PT: f32 = 56.0;

/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;
const LEADING: f32 = 1.2;

/// One line of text at a fixed position; `y` is the baseline measured from
/// the bottom of the page, as PDF expects.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub style: BlockStyle,
}

/// Break `blocks` into pages of positioned, word-wrapped lines.
pub fn layout(blocks: &[StyledBlock], styles: &StyleSheet) -> Vec<Vec<PlacedLine>> {
    let top = PAGE_HEIGHT_PT - PAGE_MARGIN_PT;
    let mut pages: Vec<Vec<PlacedLine>> = vec![Vec::new()];
    let mut y = top;

    for block in blocks {
        let style = styles.get(block.kind);
        let indent = style.indent_left_pt.max(0.0);
        let width = PAGE_WIDTH_PT - 2.0 * PAGE_MARGIN_PT - indent;
        let line_height = style.size_pt * LEADING * style.line_spacing.max(1.0);

        let text = match &style.marker {
            Some(marker) => format!("{marker} {}", block.text),
            None => block.text.clone(),
        };

        if y < top {
            y -= style.space_before_pt;
        }
        for line in wrap(&text, width, style.size_pt) {
            if y - line_height < PAGE_MARGIN_PT {
                pages.push(Vec::new());
                y = top;
            }
            y -= line_height;
            let line_width = text_width(&line, style.size_pt);
            let x = PAGE_MARGIN_PT
                + indent
                + match style.alignment {
                    Alignment::Center => ((width - line_width) / 2.0).max(0.0),
                    Alignment::Right => (width - line_width).max(0.0),
                    Alignment::Left | Alignment::Justified => 0.0,
                };
            if let Some(page) = pages.last_mut() {
                page.push(PlacedLine {
                    x,
                    y,
                    text: line,
                    style: style.clone(),
                });
            }
        }
        y -= style.space_after_pt;
    }
    pages
}

fn text_width(text: &str, size_pt: f32) -> f32 {
    text.chars().count() as f32 * size_pt * AVG_GLYPH_WIDTH
}

/// Greedy word wrap. Explicit newlines always break; a word longer than the
/// line is split by characters.
fn wrap(text: &str, width_pt: f32, size_pt: f32) -> Vec<String> {
    let max_chars = ((width_pt / (size_pt * AVG_GLYPH_WIDTH)).floor() as usize).max(1);
    let mut lines = Vec::new();

    for raw in text.split('\n') {
        let mut current = String::new();
        for word in raw.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let needed = current.chars().count() + usize::from(!current.is_empty()) + word.len();
            if needed > max_chars && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.extend(word);
        }
        lines.push(current);
    }
    lines
}

// ── pdfium backend ───────────────────────────────────────────────────────────

/// Writes PDF through pdfium. Binding happens per conversion, so a missing
/// library only disables PDF output.
#[derive(Debug, Clone, Default)]
pub struct PdfiumBackend {
    library: Option<PathBuf>,
}

impl PdfiumBackend {
    /// Use only the library at `path` (file or directory).
    pub fn with_library(path: impl Into<PathBuf>) -> Self {
        Self {
            library: Some(path.into()),
        }
    }
}

impl FormatBackend for PdfiumBackend {
    fn format(&self) -> OutputFormat {
        OutputFormat::Pdf
    }

    fn encode(
        &self,
        blocks: &[StyledBlock],
        styles: &StyleSheet,
    ) -> Result<Vec<u8>, ConversionUnavailable> {
        let pdfium = crate::pdfium::bind(self.library.as_deref())
            .map_err(|e| ConversionUnavailable::new("pdf", format!("pdfium not available: {e:?}")))?;
        draw_pdf(&pdfium, &layout(blocks, styles))
            .map_err(|e| ConversionUnavailable::new("pdf", format!("pdfium error: {e:?}")))
    }
}

fn draw_pdf(pdfium: &Pdfium, pages: &[Vec<PlacedLine>]) -> Result<Vec<u8>, PdfiumError> {
    let mut document = pdfium.create_new_pdf()?;
    let regular = document.fonts_mut().helvetica();
    let bold = document.fonts_mut().helvetica_bold();
    let italic = document.fonts_mut().helvetica_oblique();
    let bold_italic = document.fonts_mut().helvetica_bold_oblique();

    for lines in pages {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())?;
        for line in lines {
            if line.text.is_empty() {
                continue;
            }
            let font = match (line.style.bold, line.style.italic) {
                (true, true) => bold_italic,
                (true, false) => bold,
                (false, true) => italic,
                (false, false) => regular,
            };
            let mut object = page.objects_mut().create_text_object(
                PdfPoints::new(line.x),
                PdfPoints::new(line.y),
                &line.text,
                font,
                PdfPoints::new(line.style.size_pt),
            )?;
            if let Some((r, g, b)) = line.style.color.as_deref().and_then(parse_hex) {
                object.set_fill_color(PdfColor::new(r, g, b, 255))?;
            }
        }
    }

    document.save_to_bytes()
}

fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}
