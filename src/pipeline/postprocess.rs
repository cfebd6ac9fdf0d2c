//! Post-processing: deterministic cleanup of LLM-generated analyses.
//!
//! Models drift from the requested format in predictable ways: they wrap the
//! answer in a ```` ```markdown ```` fence, use `###` headings, `*` or `•`
//! bullets, nested lists and `**bold**` even when told not to. The renderer
//! only knows `# `, `## `, `- ` and plain paragraphs, so these rules bring
//! the text back into that subset without touching its wording.
//!
//! ## Rule Order
//!
//! Line endings are normalised before anything looks at lines; bullets are
//! rewritten before emphasis is stripped so a leading `* ` is never mistaken
//! for an emphasis marker.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all post-processing rules to a raw analysis.
///
/// Rules (applied in order):
/// 1. Strip outer markdown fences
/// 2. Normalise line endings (CRLF → LF)
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 4. Trim trailing whitespace per line
/// 5. Clamp headings deeper than `##` to `##`
/// 6. Rewrite `*`, `+`, `•` and indented bullets as top-level `- ` bullets
/// 7. Remove `**bold**`, `__bold__` and `*italic*` markers
/// 8. Collapse runs of blank lines to a single blank line
/// 9. Ensure the text ends with exactly one newline
pub fn clean_analysis(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = clamp_heading_depth(&s);
    let s = normalise_bullets(&s);
    let s = strip_emphasis(&s);
    let s = collapse_blank_lines(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Strip outer markdown fences ──────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\r?\n(.*)\r?\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Invisible characters ─────────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}' | '\u{00AD}'))
        .collect()
}

// ── Rule 4: Trailing whitespace ──────────────────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Heading depth ────────────────────────────────────────────────────

static RE_DEEP_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#{3,6} ").unwrap());

fn clamp_heading_depth(input: &str) -> String {
    RE_DEEP_HEADING.replace_all(input, "## ").into_owned()
}

// ── Rule 6: Bullets ──────────────────────────────────────────────────────────

static RE_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*[-*+•][ \t]+").unwrap());

fn normalise_bullets(input: &str) -> String {
    RE_BULLET.replace_all(input, "- ").into_owned()
}

// ── Rule 7: Emphasis ─────────────────────────────────────────────────────────

static RE_STRONG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\*\*|__)([^\n]+?)(\*\*|__)").unwrap());
static RE_EM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^\s*][^*\n]*?)\*").unwrap());

fn strip_emphasis(input: &str) -> String {
    let s = RE_STRONG.replace_all(input, "$2");
    RE_EM.replace_all(&s, "$1").into_owned()
}

// ── Rule 8: Blank lines ──────────────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").into_owned()
}

// ── Rule 9: Final newline ────────────────────────────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}\n", trimmed)
    }
}
