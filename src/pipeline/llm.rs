//! LLM interaction: per-document analysis and multi-document consolidation.
//!
//! Prompt text lives in [`crate::prompts`]; this module only builds messages,
//! drives retries and maps failures.
//!
//! ## Retry Strategy
//!
//! Each attempt is bounded by `api_timeout_secs`. Failed or timed-out
//! attempts are retried with exponential backoff
//! (`retry_backoff_ms * 2^(attempt - 1)`): with 500 ms base and 3 retries the
//! waits are 500 ms → 1 s → 2 s.

use crate::config::GeneratorConfig;
use crate::error::{DocGenError, DocumentError};
use crate::output::DocumentResult;
use crate::prompts;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// A successful completion.
#[derive(Debug, Clone)]
pub struct LlmReply {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub retries: u8,
}

/// Why every attempt failed.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmFailure {
    /// The last attempt hit the per-call timeout.
    Timeout { secs: u64 },
    /// The last attempt returned an error.
    Failed { retries: u8, detail: String },
}

impl LlmFailure {
    fn into_document_error(self, source_name: &str) -> DocumentError {
        match self {
            LlmFailure::Timeout { secs } => DocumentError::Timeout {
                source_name: source_name.to_string(),
                secs,
            },
            LlmFailure::Failed { retries, detail } => DocumentError::LlmFailed {
                source_name: source_name.to_string(),
                retries,
                detail,
            },
        }
    }
}

/// Analyse one document's extracted text.
///
/// Never returns an error: failures are recorded in the result so one bad
/// document does not abort the others.
pub async fn analyze_document(
    provider: &Arc<dyn LLMProvider>,
    source: &str,
    text: &str,
    config: &GeneratorConfig,
) -> DocumentResult {
    let start = Instant::now();
    let system_prompt = config
        .system_prompt
        .clone()
        .unwrap_or_else(|| prompts::system_prompt(config.document_type));
    let input = prompts::truncate_chars(text, config.max_input_chars);
    if input.len() < text.len() {
        debug!(
            "{}: truncated input to {} of {} chars",
            source,
            config.max_input_chars,
            text.chars().count()
        );
    }

    let messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(prompts::analysis_prompt(input)),
    ];
    let options = build_options(config.temperature, config.max_tokens);

    let extracted_chars = text.chars().count();
    match chat_with_retry(provider, &messages, &options, config, source).await {
        Ok(reply) => DocumentResult {
            source: source.to_string(),
            extracted_chars,
            analysis: reply.content,
            input_tokens: reply.input_tokens,
            output_tokens: reply.output_tokens,
            duration_ms: start.elapsed().as_millis() as u64,
            retries: reply.retries,
            error: None,
        },
        Err(failure) => {
            let mut result =
                DocumentResult::failed(source, failure.into_document_error(source));
            result.extracted_chars = extracted_chars;
            result.retries = config.max_retries.min(u8::MAX as u32) as u8;
            result.duration_ms = start.elapsed().as_millis() as u64;
            result
        }
    }
}

/// Consolidate several analyses into one document.
pub async fn merge_analyses(
    provider: &Arc<dyn LLMProvider>,
    analyses: &[String],
    config: &GeneratorConfig,
) -> Result<LlmReply, DocGenError> {
    let messages = vec![
        ChatMessage::system(prompts::MERGE_SYSTEM_PROMPT),
        ChatMessage::user(prompts::merge_prompt(analyses, config.document_type)),
    ];
    let options = build_options(config.merge_temperature, config.max_tokens);

    chat_with_retry(provider, &messages, &options, config, "merge")
        .await
        .map_err(|failure| DocGenError::LlmApiError {
            message: match failure {
                LlmFailure::Timeout { secs } => format!("merge timed out after {secs}s"),
                LlmFailure::Failed { detail, .. } => format!("merge failed: {detail}"),
            },
        })
}

/// Send `messages`, retrying with exponential backoff.
async fn chat_with_retry(
    provider: &Arc<dyn LLMProvider>,
    messages: &[ChatMessage],
    options: &CompletionOptions,
    config: &GeneratorConfig,
    label: &str,
) -> Result<LlmReply, LlmFailure> {
    let mut last = LlmFailure::Failed {
        retries: 0,
        detail: "no attempt made".to_string(),
    };
    let per_call = Duration::from_secs(config.api_timeout_secs.max(1));

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "{}: retry {}/{} after {}ms",
                label, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        let retries = attempt.min(u8::MAX as u32) as u8;
        match timeout(per_call, provider.chat(messages, Some(options))).await {
            Ok(Ok(response)) => {
                debug!(
                    "{}: {} input tokens, {} output tokens",
                    label, response.prompt_tokens, response.completion_tokens
                );
                return Ok(LlmReply {
                    content: response.content,
                    input_tokens: response.prompt_tokens,
                    output_tokens: response.completion_tokens,
                    retries,
                });
            }
            Ok(Err(e)) => {
                warn!("{}: attempt {} failed: {}", label, attempt + 1, e);
                last = LlmFailure::Failed {
                    retries,
                    detail: e.to_string(),
                };
            }
            Err(_) => {
                warn!(
                    "{}: attempt {} timed out after {}s",
                    label,
                    attempt + 1,
                    per_call.as_secs()
                );
                last = LlmFailure::Timeout {
                    secs: per_call.as_secs(),
                };
            }
        }
    }

    Err(last)
}

/// Delay before retry number `attempt` (1-based).
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

fn build_options(temperature: f32, max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}
