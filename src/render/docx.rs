//! DOCX encoding and decoding via docx-rs.
//!
//! The writer emits one Word paragraph per block, tagged with the block's
//! paragraph style id. The reader walks `document → paragraph → run → text`
//! and uses those style ids to recover the block kinds, which is what lets
//! the PDF backend re-layout a DOCX it did not build itself.

use crate::render::style::{Alignment, BlockKind, BlockStyle, StyleSheet};
use docx_rs::{
    AlignmentType, BreakType, DocumentChild, Docx, LineSpacing, Paragraph, ParagraphChild,
    ReaderError, Run, RunChild, RunFonts, Style, StyleType,
};
use std::io::Cursor;

const TWIPS_PER_POINT: f32 = 20.0;
/// `w:spacing/@w:line` value for single spacing in auto mode.
const SINGLE_LINE: f32 = 240.0;

/// A paragraph of the rendered document: its kind and its plain text.
///
/// Multi-line text is kept with `\n` separators; the writer turns those into
/// line breaks inside one paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledBlock {
    pub kind: BlockKind,
    pub text: String,
}

impl StyledBlock {
    pub fn new(kind: BlockKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Build and pack a DOCX from `blocks`, styled with `styles`.
pub fn write_docx(
    blocks: &[StyledBlock],
    styles: &StyleSheet,
) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
    let mut docx = Docx::new();
    for (id, name) in [
        ("Title", "Title"),
        ("Heading1", "Heading 1"),
        ("Heading2", "Heading 2"),
        ("ListBullet", "List Bullet"),
        ("Date", "Date"),
    ] {
        docx = docx.add_style(Style::new(id, StyleType::Paragraph).name(name));
    }

    for block in blocks {
        docx = docx.add_paragraph(paragraph(block, styles.get(block.kind)));
    }

    let mut buf = Cursor::new(Vec::new());
    docx.build().pack(&mut buf)?;
    Ok(buf.into_inner())
}

fn paragraph(block: &StyledBlock, style: &BlockStyle) -> Paragraph {
    let mut para = Paragraph::new()
        .style(block.kind.style_id())
        .align(alignment(style.alignment))
        .line_spacing(
            LineSpacing::new()
                .before(twips(style.space_before_pt))
                .after(twips(style.space_after_pt))
                .line((SINGLE_LINE * style.line_spacing).round() as i32),
        );
    if style.indent_left_pt > 0.0 {
        para = para.indent(Some(twips(style.indent_left_pt) as i32), None, None, None);
    }

    let mut run = Run::new()
        .size((style.size_pt * 2.0).round() as usize)
        .fonts(RunFonts::new().ascii(&style.font).hi_ansi(&style.font));
    if style.bold {
        run = run.bold();
    }
    if style.italic {
        run = run.italic();
    }
    if let Some(color) = &style.color {
        run = run.color(color);
    }

    let mut text = String::new();
    if let Some(marker) = &style.marker {
        text.push_str(marker);
        text.push(' ');
    }
    text.push_str(&block.text);

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        run = run.add_text(line);
    }
    para.add_run(run)
}

fn alignment(a: Alignment) -> AlignmentType {
    match a {
        Alignment::Left => AlignmentType::Left,
        Alignment::Center => AlignmentType::Center,
        Alignment::Right => AlignmentType::Right,
        Alignment::Justified => AlignmentType::Both,
    }
}

fn twips(points: f32) -> u32 {
    (points.max(0.0) * TWIPS_PER_POINT).round() as u32
}

/// Read the paragraphs of a DOCX back as styled blocks.
///
/// Paragraphs without a style id are body text. Bullet markers written by
/// [`write_docx`] are stripped again using `styles`. Tables, images and
/// other non-paragraph content are skipped.
pub fn read_blocks(bytes: &[u8], styles: &StyleSheet) -> Result<Vec<StyledBlock>, ReaderError> {
    let docx = docx_rs::read_docx(bytes)?;
    let mut blocks = Vec::new();

    for child in &docx.document.children {
        let DocumentChild::Paragraph(para) = child else {
            continue;
        };
        let kind = para
            .property
            .style
            .as_ref()
            .map(|s| BlockKind::from_style_id(&s.val))
            .unwrap_or(BlockKind::Body);

        let mut text = paragraph_text(para);
        if let Some(marker) = &styles.get(kind).marker {
            if let Some(rest) = text.strip_prefix(marker.as_str()) {
                text = rest.trim_start_matches(' ').to_string();
            }
        }
        blocks.push(StyledBlock { kind, text });
    }
    Ok(blocks)
}

fn paragraph_text(para: &Paragraph) -> String {
    let mut text = String::new();
    for child in &para.children {
        if let ParagraphChild::Run(run) = child {
            for rc in &run.children {
                match rc {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Break(_) => text.push('\n'),
                    RunChild::Tab(_) => text.push('\t'),
                    _ => {}
                }
            }
        }
    }
    text
}

/// Plain text of a DOCX: one line per paragraph, empty paragraphs kept.
pub fn extract_text(bytes: &[u8]) -> Result<String, ReaderError> {
    let docx = docx_rs::read_docx(bytes)?;
    let lines: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(para) => Some(paragraph_text(para)),
            _ => None,
        })
        .collect();
    Ok(lines.join("\n"))
}
