//! End-to-end entry points: documents in, briefing files out.
//!
//! [`generate`] runs the whole pipeline. The other functions expose single
//! stages for callers (and CLI subcommands) that need only one of them:
//! [`analyze`] stops after the LLM, [`render_markdown`] skips it,
//! [`preview`] only extracts, and [`convert_artifact`] only converts.

use crate::config::{GeneratorConfig, OutputFormat};
use crate::error::{DocGenError, DocumentError};
use crate::output::{
    AnalysisOutput, DocumentResult, GenerateOutput, GenerationStats, PreviewOutput,
    RenderedArtifact,
};
use crate::pipeline::{extract, input, llm, postprocess};
use crate::render::{Converter, Renderer};
use edgequake_llm::{LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Model used when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Analyse every input, consolidate the analyses and render the briefing.
///
/// # Arguments
/// * `inputs`: local paths or HTTP/HTTPS URLs of PDF or DOCX documents
/// * `base_filename`: output name; sanitised and numbered by the store
/// * `config`: generation configuration
///
/// # Errors
/// Only fatal problems are errors: no inputs, no provider, every document
/// failed, the merge call failed, or the DOCX could not be written. A single
/// failing document is recorded in `output.documents` and skipped; a PDF
/// that cannot be produced is simply absent from `output.files`.
pub async fn generate<S: AsRef<str>>(
    inputs: &[S],
    base_filename: &str,
    config: &GeneratorConfig,
) -> Result<GenerateOutput, DocGenError> {
    let total_start = Instant::now();
    if inputs.is_empty() {
        return Err(DocGenError::NoInputs);
    }
    let inputs: Vec<String> = inputs.iter().map(|s| s.as_ref().to_string()).collect();
    info!(
        "Generating {} briefing from {} documents",
        config.document_type,
        inputs.len()
    );

    // ── Step 1: Provider ─────────────────────────────────────────────────
    let provider = resolve_provider(config)?;

    // ── Step 2: Extract and analyse every document ───────────────────────
    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_start(inputs.len());
    }
    let llm_start = Instant::now();
    let documents = process_documents(&provider, &inputs, config).await;

    let analyses: Vec<String> = documents
        .iter()
        .filter(|d| d.is_ok())
        .map(|d| d.analysis.clone())
        .collect();

    if analyses.is_empty() {
        let first_error = documents
            .iter()
            .find_map(|d| d.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(DocGenError::AllDocumentsFailed {
            total: documents.len(),
            first_error,
        });
    }

    // ── Step 3: Consolidate ──────────────────────────────────────────────
    let mut merge_tokens = (0u64, 0u64);
    let analysis = if analyses.len() == 1 {
        analyses.into_iter().next().unwrap_or_default()
    } else {
        if let Some(ref cb) = config.progress_callback {
            cb.on_merge_start(analyses.len());
        }
        info!("Merging {} analyses", analyses.len());
        let reply = llm::merge_analyses(&provider, &analyses, config).await?;
        merge_tokens = (reply.input_tokens as u64, reply.output_tokens as u64);
        postprocess::clean_analysis(&reply.content)
    };
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    // ── Step 4: Render ───────────────────────────────────────────────────
    let render_start = Instant::now();
    let files = produce_files(&analysis, base_filename, config).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    // ── Step 5: Stats ────────────────────────────────────────────────────
    let analysed = documents.iter().filter(|d| d.is_ok()).count();
    let stats = GenerationStats {
        total_documents: documents.len(),
        analysed_documents: analysed,
        failed_documents: documents.len() - analysed,
        total_input_tokens: documents.iter().map(|d| d.input_tokens as u64).sum::<u64>()
            + merge_tokens.0,
        total_output_tokens: documents.iter().map(|d| d.output_tokens as u64).sum::<u64>()
            + merge_tokens.1,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        llm_duration_ms,
        render_duration_ms,
    };

    info!(
        "Generation complete: {}/{} documents, {} files, {}ms total",
        analysed,
        stats.total_documents,
        files.len(),
        stats.total_duration_ms
    );

    Ok(GenerateOutput {
        document_type: config.document_type,
        analysis,
        files,
        documents,
        stats,
    })
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync<S: AsRef<str>>(
    inputs: &[S],
    base_filename: &str,
    config: &GeneratorConfig,
) -> Result<GenerateOutput, DocGenError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DocGenError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(inputs, base_filename, config))
}

/// Analyse a single document without rendering anything.
pub async fn analyze(input_str: &str, config: &GeneratorConfig) -> Result<AnalysisOutput, DocGenError> {
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let text = extract::extract_text(&resolved, config.pdfium_library.as_deref()).await?;
    if text.trim().is_empty() {
        return Err(DocGenError::ExtractionFailed {
            path: resolved.path().to_path_buf(),
            detail: "no extractable text".into(),
        });
    }

    let provider = resolve_provider(config)?;
    let result = llm::analyze_document(&provider, input_str, &text, config).await;
    if let Some(err) = result.error {
        return Err(DocGenError::LlmApiError {
            message: err.to_string(),
        });
    }

    Ok(AnalysisOutput {
        file: display_name(input_str),
        document_type: config.document_type,
        analysis: postprocess::clean_analysis(&result.analysis),
        input_tokens: result.input_tokens,
        output_tokens: result.output_tokens,
    })
}

/// The first `max_chars` characters of a document's text.
///
/// Does not require an LLM provider.
pub async fn preview(
    input_str: &str,
    max_chars: usize,
    config: &GeneratorConfig,
) -> Result<PreviewOutput, DocGenError> {
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let text = extract::extract_text(&resolved, config.pdfium_library.as_deref()).await?;
    Ok(PreviewOutput::from_text(display_name(input_str), &text, max_chars))
}

/// Render ready-made analysis text into the configured formats.
///
/// Does not require an LLM provider.
pub async fn render_markdown(
    markdown: &str,
    base_filename: &str,
    config: &GeneratorConfig,
) -> Result<BTreeMap<OutputFormat, RenderedArtifact>, DocGenError> {
    produce_files(markdown, base_filename, config).await
}

/// Convert an existing DOCX artifact to `target`.
///
/// Returns `None` when the format cannot be produced; the reason is logged.
pub async fn convert_artifact(
    docx_path: &Path,
    target: OutputFormat,
    config: &GeneratorConfig,
) -> Result<Option<RenderedArtifact>, DocGenError> {
    if !docx_path.is_file() {
        return Err(DocGenError::FileNotFound {
            path: docx_path.to_path_buf(),
        });
    }
    let primary = RenderedArtifact::new(docx_path.to_path_buf(), OutputFormat::Docx);
    let converter = Converter::from_config(config);
    tokio::task::spawn_blocking(move || converter.convert(&primary, target))
        .await
        .map_err(|e| DocGenError::Internal(format!("Conversion task panicked: {}", e)))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Render the DOCX, then every other requested format from it.
async fn produce_files(
    analysis: &str,
    base_filename: &str,
    config: &GeneratorConfig,
) -> Result<BTreeMap<OutputFormat, RenderedArtifact>, DocGenError> {
    let renderer = Renderer::from_config(config);
    let primary = renderer
        .render_async(
            analysis.to_string(),
            base_filename.to_string(),
            config.document_type.as_str().to_string(),
        )
        .await?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_render_complete(&primary.path);
    }

    let mut files = BTreeMap::new();
    let secondary: Vec<OutputFormat> = config
        .formats
        .iter()
        .copied()
        .filter(|f| *f != OutputFormat::Docx)
        .collect();
    if !secondary.is_empty() {
        let converter = Converter::from_config(config);
        let source = primary.clone();
        let converted = tokio::task::spawn_blocking(move || {
            secondary
                .into_iter()
                .filter_map(|target| converter.convert(&source, target))
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| DocGenError::Internal(format!("Conversion task panicked: {}", e)))?;

        for artifact in converted {
            if let Some(ref cb) = config.progress_callback {
                cb.on_render_complete(&artifact.path);
            }
            files.insert(artifact.format, artifact);
        }
    }
    files.insert(OutputFormat::Docx, primary);
    Ok(files)
}

/// Extract and analyse every input concurrently, returning results in input
/// order.
async fn process_documents(
    provider: &Arc<dyn LLMProvider>,
    inputs: &[String],
    config: &GeneratorConfig,
) -> Vec<DocumentResult> {
    let total = inputs.len();
    let mut indexed: Vec<(usize, DocumentResult)> =
        stream::iter(inputs.iter().enumerate().map(|(idx, source)| {
            let provider = Arc::clone(provider);
            let config = config.clone();
            let source = source.clone();
            async move {
                let index = idx + 1;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_document_start(index, total, &source);
                }
                let result = process_document(&provider, &source, &config).await;
                if let Some(ref cb) = config.progress_callback {
                    match &result.error {
                        None => cb.on_document_complete(index, total, result.analysis.len()),
                        Some(e) => cb.on_document_error(index, total, &e.to_string()),
                    }
                }
                (idx, result)
            }
        }))
        .buffer_unordered(config.concurrency)
        .collect()
        .await;

    indexed.sort_by_key(|(idx, _)| *idx);
    indexed.into_iter().map(|(_, result)| result).collect()
}

async fn process_document(
    provider: &Arc<dyn LLMProvider>,
    source: &str,
    config: &GeneratorConfig,
) -> DocumentResult {
    let extraction_failed = |detail: String| {
        DocumentResult::failed(
            source,
            DocumentError::ExtractionFailed {
                source_name: display_name(source),
                detail,
            },
        )
    };

    let resolved = match input::resolve_input(source, config.download_timeout_secs).await {
        Ok(r) => r,
        Err(e) => return extraction_failed(e.to_string()),
    };
    let text = match extract::extract_text(&resolved, config.pdfium_library.as_deref()).await {
        Ok(t) => t,
        Err(e) => return extraction_failed(e.to_string()),
    };
    if text.trim().is_empty() {
        warn!("{}: no extractable text", source);
        return extraction_failed("no extractable text".into());
    }
    debug!("{}: {} chars extracted", source, text.chars().count());

    let mut result = llm::analyze_document(provider, &display_name(source), &text, config).await;
    result.source = source.to_string();
    if result.is_ok() {
        result.analysis = postprocess::clean_analysis(&result.analysis);
    }
    result
}

/// Last path or URL segment, for messages.
fn display_name(source: &str) -> String {
    source
        .trim_end_matches('/')
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(source)
        .to_string()
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, DocGenError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        DocGenError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. `config.provider`, used as-is
/// 2. `config.provider_name` with `config.model` (or [`DEFAULT_MODEL`])
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` when both are set
/// 4. OpenAI when `OPENAI_API_KEY` is set
/// 5. `ProviderFactory::from_env` auto-detection
pub fn resolve_provider(config: &GeneratorConfig) -> Result<Arc<dyn LLMProvider>, DocGenError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| DocGenError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn display_name_takes_last_segment() {
        assert_eq!(display_name("storage/uploads/plan.pdf"), "plan.pdf");
        assert_eq!(display_name("https://example.com/a/b.docx"), "b.docx");
        assert_eq!(display_name("plain.pdf"), "plain.pdf");
        assert_eq!(display_name("https://example.com/dir/"), "dir");
    }

    #[tokio::test]
    async fn generate_without_inputs_is_an_error() {
        let config = GeneratorConfig::default();
        let err = generate::<&str>(&[], "brief", &config).await.unwrap_err();
        assert!(matches!(err, DocGenError::NoInputs));
    }

    #[tokio::test]
    async fn render_markdown_writes_docx_only_when_asked() {
        let tmp = TempDir::new().unwrap();
        let config = GeneratorConfig::builder()
            .output_dir(tmp.path())
            .formats(vec![OutputFormat::Docx])
            .build()
            .unwrap();
        let files = render_markdown("# Plan\n- Water", "brief", &config).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[&OutputFormat::Docx].file_name(), "brief_1.docx");
    }

    #[tokio::test]
    async fn convert_missing_file_is_an_error() {
        let config = GeneratorConfig::default();
        let err = convert_artifact(Path::new("/nonexistent/x_1.docx"), OutputFormat::Pdf, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, DocGenError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn preview_of_docx_needs_no_provider() {
        let tmp = TempDir::new().unwrap();
        let config = GeneratorConfig::builder()
            .output_dir(tmp.path())
            .formats(vec![OutputFormat::Docx])
            .build()
            .unwrap();
        let files = render_markdown("Kennel capacity is forty dogs.", "src", &config)
            .await
            .unwrap();
        let path = files[&OutputFormat::Docx].path.to_str().unwrap().to_string();

        let p = preview(&path, 10, &config).await.unwrap();
        assert_eq!(p.filename, "src_1.docx");
        assert_eq!(p.preview.chars().count(), 10);
        assert!(p.total_length > 10);
        assert!(p.has_more);
    }
}
