//! Configuration types for document briefing generation.
//!
//! Every knob lives in [`GeneratorConfig`], built via its
//! [`GeneratorConfigBuilder`]. Components receive the config (or the parts
//! they need) at construction; nothing reads process-wide state after that.

use crate::error::DocGenError;
use crate::progress::ProgressCallback;
use crate::render::style::StyleSheet;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Configuration for a generation run.
///
/// Built via [`GeneratorConfig::builder()`] or using
/// [`GeneratorConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_docgen::{DocumentType, GeneratorConfig, OutputFormat};
///
/// let config = GeneratorConfig::builder()
///     .output_dir("storage/outputs")
///     .document_type(DocumentType::ShelterPlan)
///     .formats(vec![OutputFormat::Docx])
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct GeneratorConfig {
    /// Directory rendered artifacts are written to. Default: `storage/outputs`.
    pub output_dir: PathBuf,

    /// Directory uploaded source documents are copied to. Default: `storage/uploads`.
    pub upload_dir: PathBuf,

    /// Which prompt family and title to use. Default: [`DocumentType::AnimalBoarding`].
    pub document_type: DocumentType,

    /// Formats to produce. DOCX is always produced when any format is requested;
    /// PDF is derived from it. Default: DOCX + PDF.
    pub formats: Vec<OutputFormat>,

    /// LLM model identifier, e.g. "gpt-4.1-mini". If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, uses `ProviderFactory::from_env()`.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for per-document analysis. Default: 0.2.
    pub temperature: f32,

    /// Sampling temperature for the multi-document merge. Default: 0.3.
    pub merge_temperature: f32,

    /// Maximum tokens the LLM may generate per call. Default: 4000.
    pub max_tokens: usize,

    /// Characters of extracted text sent to the LLM per document. Default: 8000.
    ///
    /// Longer documents are truncated; the tail is not summarised.
    pub max_input_chars: usize,

    /// Maximum retry attempts on a failed LLM call. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-LLM-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Documents analysed at once. Default: 4.
    pub concurrency: usize,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Custom system prompt. If None, the built-in prompt for `document_type` is used.
    pub system_prompt: Option<String>,

    /// Style table applied by the DOCX writer and the PDF backend.
    pub styles: StyleSheet,

    /// Explicit pdfium shared library. If None: `PDFIUM_LIB_PATH`, `./`, then system.
    pub pdfium_library: Option<PathBuf>,

    /// Optional progress events for each document.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("storage/outputs"),
            upload_dir: PathBuf::from("storage/uploads"),
            document_type: DocumentType::default(),
            formats: vec![OutputFormat::Docx, OutputFormat::Pdf],
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            merge_temperature: 0.3,
            max_tokens: 4000,
            max_input_chars: 8000,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            concurrency: 4,
            download_timeout_secs: 120,
            system_prompt: None,
            styles: StyleSheet::default(),
            pdfium_library: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("output_dir", &self.output_dir)
            .field("upload_dir", &self.upload_dir)
            .field("document_type", &self.document_type)
            .field("formats", &self.formats)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_input_chars", &self.max_input_chars)
            .field("max_retries", &self.max_retries)
            .field("concurrency", &self.concurrency)
            .field("pdfium_library", &self.pdfium_library)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn GenerationProgressCallback>"),
            )
            .finish()
    }
}

impl GeneratorConfig {
    /// Create a new builder for `GeneratorConfig`.
    pub fn builder() -> GeneratorConfigBuilder {
        GeneratorConfigBuilder {
            config: Self::default(),
        }
    }

    /// True when `format` was requested.
    pub fn wants(&self, format: OutputFormat) -> bool {
        self.formats.contains(&format)
    }
}

/// Builder for [`GeneratorConfig`].
#[derive(Debug)]
pub struct GeneratorConfigBuilder {
    config: GeneratorConfig,
}

impl GeneratorConfigBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload_dir = dir.into();
        self
    }

    pub fn document_type(mut self, kind: DocumentType) -> Self {
        self.config.document_type = kind;
        self
    }

    pub fn formats(mut self, formats: Vec<OutputFormat>) -> Self {
        let mut formats = formats;
        formats.sort();
        formats.dedup();
        self.config.formats = formats;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn merge_temperature(mut self, t: f32) -> Self {
        self.config.merge_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_input_chars(mut self, n: usize) -> Self {
        self.config.max_input_chars = n.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn styles(mut self, styles: StyleSheet) -> Self {
        self.config.styles = styles;
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GeneratorConfig, DocGenError> {
        let c = &self.config;
        if c.formats.is_empty() {
            return Err(DocGenError::InvalidConfig(
                "At least one output format is required".into(),
            ));
        }
        if c.output_dir.as_os_str().is_empty() {
            return Err(DocGenError::InvalidConfig(
                "Output directory must not be empty".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(DocGenError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// The kind of briefing to produce. Selects the system prompt and the
/// document title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Emergency animal boarding programme (default).
    #[default]
    AnimalBoarding,
    /// Multi-community shelter plan.
    ShelterPlan,
    /// Any other emergency-management document.
    General,
}

impl DocumentType {
    /// The snake_case label, e.g. `animal_boarding`.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::AnimalBoarding => "animal_boarding",
            DocumentType::ShelterPlan => "shelter_plan",
            DocumentType::General => "general",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = DocGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "animal_boarding" => Ok(DocumentType::AnimalBoarding),
            "shelter_plan" => Ok(DocumentType::ShelterPlan),
            "general" => Ok(DocumentType::General),
            other => Err(DocGenError::InvalidConfig(format!(
                "Unknown document type '{other}' (expected animal_boarding, shelter_plan or general)"
            ))),
        }
    }
}

/// A rendered artifact format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Word-processor document, always the primary artifact.
    Docx,
    /// Fixed-layout document derived from the DOCX.
    Pdf,
}

impl OutputFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Docx => "docx",
            OutputFormat::Pdf => "pdf",
        }
    }

    /// Guess the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "docx" => Some(OutputFormat::Docx),
            "pdf" => Some(OutputFormat::Pdf),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = DocGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim().trim_start_matches('.')).ok_or_else(|| {
            DocGenError::InvalidConfig(format!("Unknown output format '{s}' (expected docx or pdf)"))
        })
    }
}
