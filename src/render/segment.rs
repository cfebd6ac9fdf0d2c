//! Markdown segmentation: analysis text → ordered [`Block`]s.
//!
//! The grammar is the narrow subset the summarisation prompts ask for:
//!
//! ```text
//! document   := body(level 1)
//! body(n)    := intro(n) section(n)*
//! section(n) := "#"×n " " title NL body(n + 1)      (n ≤ 2)
//! body(3)    := paragraph*                          (blank-line separated)
//! paragraph  := text-line* bullet*
//! bullet     := "- " text NL continuation-line*
//! ```
//!
//! Precedence is fixed: section boundary > sub-section boundary > paragraph
//! boundary > bullet boundary. Text before the first `# ` line (the preamble)
//! is parsed exactly like a section body, sub-sections included.
//!
//! Nothing here can fail. Input that follows none of the conventions comes out
//! as paragraphs. There is no escaping: a line that starts with `# `, `## ` or
//! `- ` is structure wherever it appears.

use serde::{Deserialize, Serialize};

const BULLET_MARKER: &str = "- ";
/// Deepest heading level the segmenter recognises.
const MAX_SECTION_LEVEL: u8 = 2;

/// One structural unit of a parsed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    /// Level 0 is the document title, 1 a section, 2 a sub-section.
    Heading { level: u8, text: String },
    Paragraph { text: String },
    BulletItem { text: String },
}

impl Block {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Block::Heading {
            level,
            text: text.into(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph { text: text.into() }
    }

    pub fn bullet(text: impl Into<String>) -> Self {
        Block::BulletItem { text: text.into() }
    }

    /// The block's text without any markers.
    pub fn text(&self) -> &str {
        match self {
            Block::Heading { text, .. } | Block::Paragraph { text } | Block::BulletItem { text } => {
                text
            }
        }
    }
}

/// An ordered sequence of blocks in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentModel {
    blocks: Vec<Block>,
}

impl DocumentModel {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    /// Re-join the blocks with the markers they were parsed from.
    ///
    /// Consecutive bullets share a paragraph; everything else is separated by
    /// a blank line. Segmenting the result yields the same blocks. Level 0
    /// headings are written as `# ` and therefore come back as level 1.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let mut prev_bullet = false;
        for block in &self.blocks {
            let is_bullet = matches!(block, Block::BulletItem { .. });
            if !out.is_empty() {
                out.push_str(if is_bullet && prev_bullet { "\n" } else { "\n\n" });
            }
            match block {
                Block::Heading { level, text } => {
                    out.push_str(&"#".repeat(usize::from((*level).max(1))));
                    out.push(' ');
                    out.push_str(text);
                }
                Block::Paragraph { text } => out.push_str(text),
                Block::BulletItem { text } => {
                    out.push_str(BULLET_MARKER);
                    out.push_str(text);
                }
            }
            prev_bullet = is_bullet;
        }
        out
    }
}

impl IntoIterator for DocumentModel {
    type Item = Block;
    type IntoIter = std::vec::IntoIter<Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.into_iter()
    }
}

impl<'a> IntoIterator for &'a DocumentModel {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

/// Split analysis text into blocks.
pub fn segment(text: &str) -> DocumentModel {
    let lines: Vec<&str> = text.lines().collect();
    let mut blocks = Vec::new();
    parse_sections(&lines, 1, &mut blocks);
    DocumentModel::new(blocks)
}

// ── Recursive descent ────────────────────────────────────────────────────────

/// `body(level)`: the intro before the first heading of `level`, then every
/// section at that level.
fn parse_sections(lines: &[&str], level: u8, out: &mut Vec<Block>) {
    let marker = heading_marker(level);
    let first = lines
        .iter()
        .position(|l| l.starts_with(&marker))
        .unwrap_or(lines.len());
    let (intro, rest) = lines.split_at(first);

    parse_below(intro, level, out);

    for chunk in chunks_starting_with(rest, &marker) {
        let Some((heading_line, body)) = chunk.split_first() else {
            continue;
        };
        let title = heading_line.trim_start_matches('#').trim();
        if title.is_empty() && is_blank(body) {
            continue;
        }
        out.push(Block::heading(level, title));
        parse_below(body, level, out);
    }
}

fn parse_below(lines: &[&str], level: u8, out: &mut Vec<Block>) {
    if level < MAX_SECTION_LEVEL {
        parse_sections(lines, level + 1, out);
    } else {
        parse_paragraphs(lines, out);
    }
}

/// Blank-line separated paragraph candidates.
fn parse_paragraphs(lines: &[&str], out: &mut Vec<Block>) {
    for candidate in lines.split(|l| l.trim().is_empty()) {
        if !candidate.is_empty() {
            parse_candidate(candidate, out);
        }
    }
}

/// One candidate: leading text lines become a paragraph, every `- ` line
/// (with its continuation lines) becomes a bullet.
fn parse_candidate(lines: &[&str], out: &mut Vec<Block>) {
    let first_bullet = lines
        .iter()
        .position(|l| l.starts_with(BULLET_MARKER))
        .unwrap_or(lines.len());
    let (lead, items) = lines.split_at(first_bullet);

    let lead = lead.join("\n");
    let lead = lead.trim_end();
    let unindented = lead.trim_start();
    if !unindented.is_empty() {
        // Indentation is the only thing keeping a marker-like line a paragraph.
        let text = if is_marker_line(unindented) {
            lead
        } else {
            unindented
        };
        out.push(Block::paragraph(text));
    }

    for item in chunks_starting_with(items, BULLET_MARKER) {
        let text = item.join("\n");
        out.push(Block::bullet(text[BULLET_MARKER.len()..].trim()));
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn heading_marker(level: u8) -> String {
    format!("{} ", "#".repeat(usize::from(level)))
}

/// Whether `line` would be read as a bullet or a recognised heading.
fn is_marker_line(line: &str) -> bool {
    line.starts_with(BULLET_MARKER)
        || (1..=MAX_SECTION_LEVEL).any(|level| line.starts_with(&heading_marker(level)))
}

fn is_blank(lines: &[&str]) -> bool {
    lines.iter().all(|l| l.trim().is_empty())
}

/// Split `lines` into runs that each begin with a line starting with `marker`.
///
/// The caller guarantees `lines` is empty or starts with a marker line.
fn chunks_starting_with<'a, 'b>(
    lines: &'a [&'b str],
    marker: &'a str,
) -> impl Iterator<Item = &'a [&'b str]> + 'a {
    let mut rest = lines;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let next = rest[1..]
            .iter()
            .position(|l| l.starts_with(marker))
            .map(|i| i + 1)
            .unwrap_or(rest.len());
        let (chunk, tail) = rest.split_at(next);
        rest = tail;
        Some(chunk)
    })
}
