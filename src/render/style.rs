//! Style table: block kind → presentation attributes.
//!
//! The table is a plain value. Writers read from it and never mutate it, so
//! two documents rendered with different themes cannot leak styles into each
//! other. Themes are JSON files with the same shape as [`StyleSheet`];
//! missing keys fall back to the defaults.

use crate::error::DocGenError;
use crate::render::Block;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Accent colour shared by the title and heading styles.
pub const DEFAULT_ACCENT: &str = "1F4E79";

/// What a block looks like, independent of the output backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Title,
    Section,
    Subsection,
    Body,
    Bullet,
    Timestamp,
}

impl BlockKind {
    /// Word paragraph style id written into the DOCX and used to recover
    /// structure when the document is read back.
    pub fn style_id(&self) -> &'static str {
        match self {
            BlockKind::Title => "Title",
            BlockKind::Section => "Heading1",
            BlockKind::Subsection => "Heading2",
            BlockKind::Body => "Normal",
            BlockKind::Bullet => "ListBullet",
            BlockKind::Timestamp => "Date",
        }
    }

    /// Inverse of [`BlockKind::style_id`]. Unknown ids are body text.
    pub fn from_style_id(id: &str) -> Self {
        match id {
            "Title" => BlockKind::Title,
            "Heading1" => BlockKind::Section,
            "Heading2" => BlockKind::Subsection,
            "ListBullet" => BlockKind::Bullet,
            "Date" => BlockKind::Timestamp,
            _ => BlockKind::Body,
        }
    }
}

impl From<&Block> for BlockKind {
    fn from(block: &Block) -> Self {
        match block {
            Block::Heading { level: 0, .. } => BlockKind::Title,
            Block::Heading { level: 1, .. } => BlockKind::Section,
            Block::Heading { .. } => BlockKind::Subsection,
            Block::Paragraph { .. } => BlockKind::Body,
            Block::BulletItem { .. } => BlockKind::Bullet,
        }
    }
}

/// Horizontal alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justified,
}

/// Presentation attributes for one block kind.
///
/// Sizes are in points; spacing is in points and converted to twips by the
/// DOCX writer. `line_spacing` is a multiple of single spacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockStyle {
    pub font: String,
    pub size_pt: f32,
    pub bold: bool,
    pub italic: bool,
    /// Hex RGB without `#`, e.g. `1F4E79`.
    pub color: Option<String>,
    pub alignment: Alignment,
    pub space_before_pt: f32,
    pub space_after_pt: f32,
    pub line_spacing: f32,
    pub indent_left_pt: f32,
    /// Text drawn before the block, e.g. a bullet glyph.
    pub marker: Option<String>,
}

impl Default for BlockStyle {
    fn default() -> Self {
        Self {
            font: "Calibri".into(),
            size_pt: 11.0,
            bold: false,
            italic: false,
            color: None,
            alignment: Alignment::Left,
            space_before_pt: 0.0,
            space_after_pt: 6.0,
            line_spacing: 1.0,
            indent_left_pt: 0.0,
            marker: None,
        }
    }
}

/// The full theme: one [`BlockStyle`] per [`BlockKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleSheet {
    pub title: BlockStyle,
    pub section: BlockStyle,
    pub subsection: BlockStyle,
    pub body: BlockStyle,
    pub bullet: BlockStyle,
    pub timestamp: BlockStyle,
}

impl Default for StyleSheet {
    fn default() -> Self {
        let accent = Some(DEFAULT_ACCENT.to_string());
        Self {
            title: BlockStyle {
                size_pt: 26.0,
                bold: true,
                color: accent.clone(),
                alignment: Alignment::Center,
                space_after_pt: 12.0,
                ..BlockStyle::default()
            },
            section: BlockStyle {
                size_pt: 16.0,
                bold: true,
                color: accent.clone(),
                space_before_pt: 18.0,
                space_after_pt: 6.0,
                ..BlockStyle::default()
            },
            subsection: BlockStyle {
                size_pt: 13.0,
                bold: true,
                color: accent,
                space_before_pt: 12.0,
                space_after_pt: 4.0,
                ..BlockStyle::default()
            },
            body: BlockStyle {
                line_spacing: 1.5,
                space_after_pt: 6.0,
                ..BlockStyle::default()
            },
            bullet: BlockStyle {
                indent_left_pt: 36.0,
                space_after_pt: 3.0,
                marker: Some("•".into()),
                ..BlockStyle::default()
            },
            timestamp: BlockStyle {
                size_pt: 10.0,
                italic: true,
                color: Some("595959".into()),
                alignment: Alignment::Right,
                space_after_pt: 18.0,
                ..BlockStyle::default()
            },
        }
    }
}

impl StyleSheet {
    /// Look up the style for a block kind.
    pub fn get(&self, kind: BlockKind) -> &BlockStyle {
        match kind {
            BlockKind::Title => &self.title,
            BlockKind::Section => &self.section,
            BlockKind::Subsection => &self.subsection,
            BlockKind::Body => &self.body,
            BlockKind::Bullet => &self.bullet,
            BlockKind::Timestamp => &self.timestamp,
        }
    }

    /// Parse a JSON theme. Keys that are absent keep the default for their
    /// own block kind, so `{"section": {"color": "C00000"}}` still yields a
    /// bold 16pt section heading.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let overrides: Value = serde_json::from_str(json)?;
        let mut merged = serde_json::to_value(Self::default())?;
        merge_json(&mut merged, overrides);
        serde_json::from_value(merged)
    }

    /// Load a JSON theme from disk.
    pub fn from_file(path: &Path) -> Result<Self, DocGenError> {
        let raw = std::fs::read_to_string(path).map_err(|e| DocGenError::InvalidTheme {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        Self::from_json(&raw).map_err(|e| DocGenError::InvalidTheme {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }
}

/// Overlay `patch` onto `base`, recursing into objects present on both sides.
fn merge_json(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_levels_map_to_distinct_kinds() {
        let h = |level| Block::Heading {
            level,
            text: "x".into(),
        };
        assert_eq!(BlockKind::from(&h(0)), BlockKind::Title);
        assert_eq!(BlockKind::from(&h(1)), BlockKind::Section);
        assert_eq!(BlockKind::from(&h(2)), BlockKind::Subsection);
        assert_eq!(
            BlockKind::from(&Block::BulletItem { text: "x".into() }),
            BlockKind::Bullet
        );
    }

    #[test]
    fn default_theme_matches_layout_rules() {
        let s = StyleSheet::default();
        assert!(s.title.bold);
        assert_eq!(s.title.alignment, Alignment::Center);
        assert_eq!(s.title.color.as_deref(), Some(DEFAULT_ACCENT));
        assert!(s.subsection.size_pt < s.section.size_pt);
        assert_eq!(s.subsection.color, s.section.color);
        assert_eq!(s.body.line_spacing, 1.5);
        assert_eq!(s.body.size_pt, 11.0);
        assert!(s.bullet.indent_left_pt > 0.0);
    }

    #[test]
    fn style_ids_round_trip() {
        for kind in [
            BlockKind::Title,
            BlockKind::Section,
            BlockKind::Subsection,
            BlockKind::Body,
            BlockKind::Bullet,
            BlockKind::Timestamp,
        ] {
            assert_eq!(BlockKind::from_style_id(kind.style_id()), kind);
        }
        assert_eq!(BlockKind::from_style_id("Heading7"), BlockKind::Body);
    }

    #[test]
    fn partial_theme_keeps_defaults() {
        let s = StyleSheet::from_json(r#"{ "section": { "color": "C00000", "size_pt": 18 } }"#)
            .unwrap();
        assert_eq!(s.section.color.as_deref(), Some("C00000"));
        assert_eq!(s.section.size_pt, 18.0);
        // Fields absent from the theme keep the section defaults.
        assert!(s.section.bold);
        assert_eq!(s.section.space_before_pt, 18.0);
        assert_eq!(s.section.font, "Calibri");
        assert_eq!(s.body, StyleSheet::default().body);
    }

    #[test]
    fn colour_only_override_keeps_each_kind_default() {
        let defaults = StyleSheet::default();
        let s = StyleSheet::from_json(
            r#"{ "section": { "color": "C00000" }, "bullet": { "font": "Arial" } }"#,
        )
        .unwrap();
        assert_eq!(
            s.section,
            BlockStyle {
                color: Some("C00000".into()),
                ..defaults.section.clone()
            }
        );
        assert_eq!(s.section.size_pt, 16.0);
        assert_eq!(s.bullet.marker.as_deref(), Some("•"));
        assert_eq!(s.bullet.indent_left_pt, 36.0);
        assert_eq!(s.bullet.font, "Arial");
        assert_eq!(s.title, defaults.title);
    }

    #[test]
    fn theme_can_clear_an_optional_field() {
        let s = StyleSheet::from_json(r#"{ "title": { "color": null } }"#).unwrap();
        assert_eq!(s.title.color, None);
        assert!(s.title.bold);
    }

    #[test]
    fn malformed_theme_is_rejected() {
        assert!(StyleSheet::from_json(r#"{ "section": { "size_pt": "big" } }"#).is_err());
        assert!(StyleSheet::from_json("not json").is_err());
    }

    #[test]
    fn theme_file_errors_name_the_path() {
        let err = StyleSheet::from_file(Path::new("/nonexistent/theme.json")).unwrap_err();
        assert!(err.to_string().contains("theme.json"));
    }
}
