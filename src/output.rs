//! Result types returned by the generation, rendering and storage APIs.
//!
//! Everything here is `Serialize` so the CLI can print it with `--json`.

use crate::config::{DocumentType, OutputFormat};
use crate::error::DocumentError;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A persisted rendered file. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedArtifact {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub created_at: DateTime<Local>,
}

impl RenderedArtifact {
    pub fn new(path: PathBuf, format: OutputFormat) -> Self {
        Self {
            path,
            format,
            created_at: Local::now(),
        }
    }

    /// File name without directories, e.g. `master_document_3.docx`.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// One entry of a storage directory listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    /// Lower-case extension without the dot, if any.
    pub kind: Option<String>,
    pub modified: Option<DateTime<Local>>,
}

/// Outcome for one input document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    /// The input as given (path or URL).
    pub source: String,
    /// Characters of text extracted from the document.
    pub extracted_chars: usize,
    /// The LLM analysis; empty when `error` is set.
    pub analysis: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    pub retries: u8,
    pub error: Option<DocumentError>,
}

impl DocumentResult {
    pub(crate) fn failed(source: impl Into<String>, error: DocumentError) -> Self {
        Self {
            source: source.into(),
            extracted_chars: 0,
            analysis: String::new(),
            input_tokens: 0,
            output_tokens: 0,
            duration_ms: 0,
            retries: 0,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate numbers for a generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    pub total_documents: usize,
    pub analysed_documents: usize,
    pub failed_documents: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub render_duration_ms: u64,
}

/// Everything `generate` produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOutput {
    pub document_type: DocumentType,
    /// The cleaned markdown that was rendered.
    pub analysis: String,
    /// One artifact per produced format. A requested secondary format that
    /// could not be produced is simply absent.
    pub files: BTreeMap<OutputFormat, RenderedArtifact>,
    pub documents: Vec<DocumentResult>,
    pub stats: GenerationStats,
}

/// Result of analysing a single document without rendering it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub file: String,
    pub document_type: DocumentType,
    pub analysis: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// The beginning of a document's extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewOutput {
    pub filename: String,
    pub preview: String,
    pub has_more: bool,
    /// Length of the full extracted text in characters.
    pub total_length: usize,
}

impl PreviewOutput {
    /// Cut `text` to at most `max_chars` characters on a char boundary.
    pub fn from_text(filename: impl Into<String>, text: &str, max_chars: usize) -> Self {
        let total_length = text.chars().count();
        let preview: String = text.chars().take(max_chars).collect();
        Self {
            filename: filename.into(),
            preview,
            has_more: total_length > max_chars,
            total_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_on_char_boundary() {
        let p = PreviewOutput::from_text("plan.pdf", "héllo wörld", 4);
        assert_eq!(p.preview, "héll");
        assert!(p.has_more);
        assert_eq!(p.total_length, 11);
    }

    #[test]
    fn preview_of_short_text_has_no_more() {
        let p = PreviewOutput::from_text("a.docx", "short", 100);
        assert_eq!(p.preview, "short");
        assert!(!p.has_more);
    }

    #[test]
    fn artifact_file_name() {
        let a = RenderedArtifact::new(PathBuf::from("out/brief_2.pdf"), OutputFormat::Pdf);
        assert_eq!(a.file_name(), "brief_2.pdf");
    }

    #[test]
    fn generate_output_serialises_files_by_format() {
        let mut files = BTreeMap::new();
        files.insert(
            OutputFormat::Docx,
            RenderedArtifact::new(PathBuf::from("out/x_1.docx"), OutputFormat::Docx),
        );
        let out = GenerateOutput {
            document_type: DocumentType::General,
            analysis: "# A".into(),
            files,
            documents: vec![],
            stats: GenerationStats::default(),
        };
        let json = serde_json::to_value(&out).unwrap();
        assert!(json["files"]["docx"]["path"].as_str().unwrap().ends_with("x_1.docx"));
        assert_eq!(json["document_type"], "general");
    }
}
