//! CLI binary for edgequake-docgen.
//!
//! A thin shim over the library crate that maps subcommands and flags to
//! `GeneratorConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_docgen::{
    analyze, convert_artifact, generate, preview, render_markdown, ArtifactInfo, ArtifactStore,
    DocumentType, GenerationProgressCallback, GeneratorConfig, OutputFormat, ProgressCallback,
    StyleSheet,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a bar over the input documents plus one log line per
/// document. Documents may finish out of order.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Resolving provider…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&index))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_generation_start(&self, total_documents: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_length(total_documents as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Analysing");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Analysing {total_documents} documents…"))
        ));
    }

    fn on_document_start(&self, index: usize, _total: usize, source: &str) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(index, Instant::now());
        }
        self.bar.set_message(source.to_string());
    }

    fn on_document_complete(&self, index: usize, total: usize, analysis_len: usize) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} Document {:>2}/{:<2}  {:<8}  {}",
            green("✓"),
            index,
            total,
            dim(&format!("{analysis_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(index);
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Document {:>2}/{:<2}  {}  {}",
            red("✗"),
            index,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_merge_start(&self, analyses: usize) {
        self.bar.set_prefix("Merging");
        self.bar.set_message(format!("{analyses} analyses"));
    }

    fn on_render_complete(&self, path: &Path) {
        self.bar.set_prefix("Rendering");
        self.bar.println(format!("  {} {}", green("✓"), path.display()));
    }
}

impl CliProgressCallback {
    fn finish(&self) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed > 0 {
            eprintln!("{} {} documents failed", cyan("⚠"), red(&failed.to_string()));
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarise two documents into storage/outputs/master_document_N.docx (+ .pdf)
  docgen generate plan_a.pdf plan_b.docx

  # Shelter-plan briefing, DOCX only, custom name
  docgen generate --type shelter-plan --format docx -n county_shelters plan.pdf

  # Analyse one document and print the markdown
  docgen analyze https://example.org/boarding.pdf

  # Render an existing analysis without calling an LLM
  docgen render notes.md -n briefing

  # Add a PDF next to an existing DOCX
  docgen convert storage/outputs/briefing_2.docx

  # Manage stored files
  docgen upload plan.pdf
  docgen list --json
  docgen delete briefing_1.pdf
  docgen clean --days 30

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         pdfium shared library (or directory containing it)
  DOCGEN_*                Every flag, e.g. DOCGEN_OUTPUT_DIR, DOCGEN_TYPE

  A .env file in the working directory is loaded on startup.
"#;

/// Summarise PDF and DOCX documents with an LLM and render the briefing.
#[derive(Parser, Debug)]
#[command(
    name = "docgen",
    version,
    about = "Summarise PDF/DOCX documents with an LLM and render a DOCX/PDF briefing",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCGEN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOCGEN_QUIET")]
    quiet: bool,

    /// Print structured JSON results.
    #[arg(long, global = true, env = "DOCGEN_JSON")]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse documents, merge the analyses and render the briefing.
    Generate {
        /// Local PDF/DOCX paths or HTTP/HTTPS URLs.
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Base name of the output files; a `_N` sequence suffix is added.
        #[arg(short = 'n', long, env = "DOCGEN_NAME", default_value = "master_document")]
        name: String,

        /// Disable the progress bar.
        #[arg(long, env = "DOCGEN_NO_PROGRESS")]
        no_progress: bool,

        #[command(flatten)]
        llm: LlmArgs,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Analyse a single document and print the cleaned markdown.
    Analyze {
        input: String,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Render a markdown analysis file without calling an LLM.
    Render {
        /// Markdown file in the `# `, `## `, `- ` subset.
        markdown: PathBuf,

        /// Base name of the output files.
        #[arg(short = 'n', long, env = "DOCGEN_NAME", default_value = "master_document")]
        name: String,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Produce a PDF (or other format) from an existing DOCX artifact.
    Convert {
        docx: PathBuf,

        /// Target format.
        #[arg(long, env = "DOCGEN_TARGET", default_value = "pdf")]
        to: OutputFormat,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Print the beginning of a document's extracted text.
    Preview {
        input: String,

        /// Characters to show.
        #[arg(long, env = "DOCGEN_PREVIEW_CHARS", default_value_t = 1000)]
        chars: usize,

        #[arg(long, env = "PDFIUM_LIB_PATH")]
        pdfium_lib: Option<PathBuf>,
    },

    /// Copy a document into the upload directory.
    Upload {
        file: PathBuf,

        #[arg(long, env = "DOCGEN_UPLOAD_DIR", default_value = "storage/uploads")]
        upload_dir: PathBuf,
    },

    /// List stored artifacts.
    List {
        #[command(flatten)]
        dir: StoreArgs,
    },

    /// Delete a stored artifact by file name.
    Delete {
        name: String,

        #[command(flatten)]
        dir: StoreArgs,
    },

    /// Delete stored artifacts older than a number of days.
    Clean {
        #[arg(long, env = "DOCGEN_CLEAN_DAYS", default_value_t = 30)]
        days: u64,

        #[command(flatten)]
        dir: StoreArgs,
    },
}

#[derive(Args, Debug, Clone)]
struct LlmArgs {
    /// Briefing type: animal-boarding, shelter-plan or general.
    #[arg(short = 't', long = "type", env = "DOCGEN_TYPE", default_value = "animal_boarding")]
    document_type: DocumentType,

    /// LLM model ID (e.g. gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Documents analysed at once.
    #[arg(short, long, env = "DOCGEN_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Characters of each document sent to the LLM.
    #[arg(long, env = "DOCGEN_MAX_INPUT_CHARS", default_value_t = 8000)]
    max_input_chars: usize,

    /// Max LLM output tokens per call.
    #[arg(long, env = "DOCGEN_MAX_TOKENS", default_value_t = 4000)]
    max_tokens: usize,

    /// LLM temperature for per-document analysis (0.0-2.0).
    #[arg(long, env = "DOCGEN_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Retries per LLM call.
    #[arg(long, env = "DOCGEN_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "DOCGEN_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "DOCGEN_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "DOCGEN_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// pdfium shared library (file or directory).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct RenderArgs {
    /// Output directory.
    #[arg(short, long, env = "DOCGEN_OUTPUT_DIR", default_value = "storage/outputs")]
    output_dir: PathBuf,

    /// Output formats; may be repeated. DOCX is always written.
    #[arg(short, long = "format", env = "DOCGEN_FORMATS", value_delimiter = ',',
          default_values_t = [OutputFormat::Docx, OutputFormat::Pdf])]
    formats: Vec<OutputFormat>,

    /// JSON style theme overriding the built-in style table.
    #[arg(long, env = "DOCGEN_THEME")]
    theme: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct StoreArgs {
    /// Directory to operate on.
    #[arg(long, env = "DOCGEN_OUTPUT_DIR", default_value = "storage/outputs")]
    dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs are hidden while the progress bar is active.
    let show_progress = !cli.quiet
        && !cli.json
        && matches!(cli.command, Command::Generate { no_progress: false, .. });
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Generate {
            inputs,
            name,
            llm,
            render,
            ..
        } => {
            let progress = show_progress.then(CliProgressCallback::new);
            let mut builder = llm_builder(llm).await?;
            builder = apply_render_args(builder, render)?;
            if let Some(ref cb) = progress {
                builder = builder.progress_callback(Arc::clone(cb) as ProgressCallback);
            }
            let config = builder.build().context("Invalid configuration")?;

            let result = generate(inputs.as_slice(), name, &config).await;
            if let Some(ref cb) = progress {
                cb.finish();
            }
            let output = result.context("Generation failed")?;

            if cli.json {
                print_json(&output)?;
            } else {
                for artifact in output.files.values() {
                    println!("{}", artifact.path.display());
                }
                if !cli.quiet {
                    if !config.formats.iter().all(|f| output.files.contains_key(f)) {
                        eprintln!("{} some formats were not produced (see logs)", cyan("⚠"));
                    }
                    eprintln!(
                        "{}  {}/{} documents  {}ms",
                        if output.stats.failed_documents == 0 {
                            green("✔")
                        } else {
                            cyan("⚠")
                        },
                        output.stats.analysed_documents,
                        output.stats.total_documents,
                        output.stats.total_duration_ms,
                    );
                    eprintln!(
                        "   {} tokens in  /  {} tokens out",
                        dim(&output.stats.total_input_tokens.to_string()),
                        dim(&output.stats.total_output_tokens.to_string()),
                    );
                }
            }
        }

        Command::Analyze { input, llm } => {
            let config = llm_builder(llm)
                .await?
                .build()
                .context("Invalid configuration")?;
            let output = analyze(input, &config).await.context("Analysis failed")?;
            if cli.json {
                print_json(&output)?;
            } else {
                print!("{}", output.analysis);
            }
        }

        Command::Render {
            markdown,
            name,
            render,
        } => {
            let text = tokio::fs::read_to_string(markdown)
                .await
                .with_context(|| format!("Failed to read markdown from {:?}", markdown))?;
            let config = apply_render_args(GeneratorConfig::builder(), render)?
                .build()
                .context("Invalid configuration")?;
            let files = render_markdown(&text, name, &config)
                .await
                .context("Rendering failed")?;
            if cli.json {
                print_json(&files)?;
            } else {
                for artifact in files.values() {
                    println!("{}", artifact.path.display());
                }
            }
        }

        Command::Convert { docx, to, render } => {
            let config = apply_render_args(GeneratorConfig::builder(), render)?
                .build()
                .context("Invalid configuration")?;
            match convert_artifact(docx, *to, &config)
                .await
                .context("Conversion failed")?
            {
                Some(artifact) if cli.json => print_json(&artifact)?,
                Some(artifact) => println!("{}", artifact.path.display()),
                None => anyhow::bail!("{} output is not available (see logs)", to),
            }
        }

        Command::Preview {
            input,
            chars,
            pdfium_lib,
        } => {
            let mut builder = GeneratorConfig::builder();
            if let Some(ref lib) = pdfium_lib {
                builder = builder.pdfium_library(lib);
            }
            let config = builder.build().context("Invalid configuration")?;
            let output = preview(input, *chars, &config)
                .await
                .context("Preview failed")?;
            if cli.json {
                print_json(&output)?;
            } else {
                println!("{}", output.preview);
                if output.has_more && !cli.quiet {
                    eprintln!(
                        "{}",
                        dim(&format!("… {} characters total", output.total_length))
                    );
                }
            }
        }

        Command::Upload { file, upload_dir } => {
            let info = ArtifactStore::new(upload_dir)
                .save_upload(file)
                .context("Upload failed")?;
            if cli.json {
                print_json(&info)?;
            } else {
                println!("{}", info.path.display());
            }
        }

        Command::List { dir } => {
            let entries = ArtifactStore::new(&dir.dir)
                .list()
                .context("Listing failed")?;
            if cli.json {
                print_json(&entries)?;
            } else {
                print_listing(&entries);
            }
        }

        Command::Delete { name, dir } => {
            let removed = ArtifactStore::new(&dir.dir)
                .delete(name)
                .context("Delete failed")?;
            if cli.json {
                print_json(&serde_json::json!({ "name": name, "deleted": removed }))?;
            } else if removed {
                println!("{} deleted {}", green("✔"), name);
            } else {
                anyhow::bail!("No stored file named '{}'", name);
            }
        }

        Command::Clean { days, dir } => {
            let removed = ArtifactStore::new(&dir.dir)
                .clean(Duration::from_secs(days.saturating_mul(86_400)))
                .context("Clean failed")?;
            if cli.json {
                print_json(&removed)?;
            } else if !cli.quiet {
                for name in &removed {
                    println!("{name}");
                }
                eprintln!("{} removed {} files", green("✔"), removed.len());
            }
        }
    }

    Ok(())
}

/// Map LLM flags to a config builder.
async fn llm_builder(args: &LlmArgs) -> Result<edgequake_docgen::GeneratorConfigBuilder> {
    let mut builder = GeneratorConfig::builder()
        .document_type(args.document_type)
        .concurrency(args.concurrency)
        .max_input_chars(args.max_input_chars)
        .max_tokens(args.max_tokens)
        .temperature(args.temperature)
        .max_retries(args.max_retries)
        .download_timeout_secs(args.download_timeout)
        .api_timeout_secs(args.api_timeout);

    if let Some(ref path) = args.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref lib) = args.pdfium_lib {
        builder = builder.pdfium_library(lib);
    }
    Ok(builder)
}

/// Map output flags onto a config builder.
fn apply_render_args(
    builder: edgequake_docgen::GeneratorConfigBuilder,
    args: &RenderArgs,
) -> Result<edgequake_docgen::GeneratorConfigBuilder> {
    let mut builder = builder
        .output_dir(&args.output_dir)
        .formats(args.formats.clone());
    if let Some(ref theme) = args.theme {
        let styles = StyleSheet::from_file(theme).context("Failed to load style theme")?;
        builder = builder.styles(styles);
    }
    Ok(builder)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise output")?;
    println!("{json}");
    Ok(())
}

fn print_listing(entries: &[ArtifactInfo]) {
    if entries.is_empty() {
        eprintln!("{}", dim("(no files)"));
        return;
    }
    for e in entries {
        let modified = e
            .modified
            .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!("{:<40} {:>10}  {}", e.name, e.size, dim(&modified));
    }
}
