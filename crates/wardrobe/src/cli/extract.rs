//! The `wardrobe extract` command: prepare photos and extract attributes.

use clap::{Args, ValueEnum};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use wardrobe_core::llm::prompt;
use wardrobe_core::{
    AttributeExtractor, Config, ExtractOptions, ExtractOutcome, GarmentAttributes, ImagePreparer,
    LlmProviderFactory, OutputFormat, OutputWriter,
};

/// Arguments for the `extract` command.
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Photo file or directory to process
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output file for the attribute JSON (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for letterboxed copies (defaults to "resized" beside the input)
    #[arg(long)]
    pub resized_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormatArg,

    /// LLM provider for attribute extraction
    #[arg(long, value_enum, default_value = "openai")]
    pub llm: LlmProviderArg,

    /// LLM model name (provider-specific)
    #[arg(long)]
    pub llm_model: Option<String>,

    /// Concurrent LLM calls (1 walks the photos sequentially)
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Custom prompt file overriding the generated prompt
    #[arg(long)]
    pub prompt: Option<PathBuf>,
}

/// Output format choices.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormatArg {
    Json,
    Jsonl,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Jsonl => OutputFormat::JsonLines,
        }
    }
}

/// Supported provider choices.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LlmProviderArg {
    Openai,
    Anthropic,
    Ollama,
}

impl LlmProviderArg {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }
}

/// Execute the extract command.
pub async fn execute(args: ExtractArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let start_time = std::time::Instant::now();

    let provider =
        LlmProviderFactory::create(args.llm.as_str(), &config.llm, args.llm_model.as_deref())?;
    let prompt_text = prompt::load_prompt(args.prompt.as_deref())?;
    let mut options = ExtractOptions::from_config(&config, prompt_text);
    if let Some(parallel) = args.parallel {
        options.parallel = parallel;
    }

    let preparer = ImagePreparer::new(&config);
    let files = preparer.discover(&args.input);
    if files.is_empty() {
        tracing::warn!("No supported photos found at {:?}", args.input);
        return Ok(());
    }
    tracing::info!("Found {} photo(s) to process", files.len());

    let resized_dir = args
        .resized_dir
        .clone()
        .unwrap_or_else(|| default_resized_dir(&args.input));

    // ── Preparation: letterbox every photo onto the white square ──
    let progress = create_progress_bar(files.len() as u64, "resizing");
    let mut prepared = Vec::with_capacity(files.len());
    let mut prepare_failed = 0u64;

    for file in &files {
        match preparer.prepare(&file.path, &resized_dir).await {
            Ok(image) => prepared.push(image),
            Err(e) => {
                prepare_failed += 1;
                tracing::error!("Failed: {:?} - {}", file.path, e);
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    // ── Extraction: run the vision model over the prepared photos ──
    let progress = create_progress_bar(prepared.len() as u64, "extracting");
    // Unbounded so callbacks never block while the batch is still running
    let (tx, rx) = std::sync::mpsc::channel::<GarmentAttributes>();

    let extractor = AttributeExtractor::new(provider, options);
    let progress_cb = progress.clone();
    let (succeeded, failed) = extractor
        .extract_batch(&prepared, move |outcome| {
            match outcome {
                ExtractOutcome::Success(attrs) => {
                    let _ = tx.send(attrs);
                }
                ExtractOutcome::Failure(path, msg) => {
                    tracing::error!("Extraction failed: {path:?} - {msg}");
                }
            }
            progress_cb.inc(1);
        })
        .await;
    progress.finish_and_clear();

    let mut attributes: Vec<GarmentAttributes> = rx.try_iter().collect();
    // Deterministic output regardless of completion order
    attributes.sort_by(|a, b| a.id.cmp(&b.id));

    // ── Output ──
    let format = OutputFormat::from(args.format);
    if let Some(ref output_path) = args.output {
        let file = File::create(output_path)?;
        let mut writer = OutputWriter::new(BufWriter::new(file), format, config.output.pretty);
        writer.write_all(&attributes)?;
        writer.flush()?;
        tracing::info!("Attributes written to {:?}", output_path);
    } else {
        let stdout = std::io::stdout();
        let mut writer = OutputWriter::new(stdout.lock(), format, config.output.pretty);
        writer.write_all(&attributes)?;
        writer.flush()?;
    }

    print_summary(
        succeeded as u64,
        failed as u64,
        prepare_failed,
        start_time.elapsed(),
    );

    Ok(())
}

/// The original photos' sibling directory for letterboxed copies
/// (`data/images` → `data/resized`).
fn default_resized_dir(input: &Path) -> PathBuf {
    input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join("resized")
}

/// Create a progress bar for batch processing.
fn create_progress_bar(total: u64, message: &'static str) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )
            .unwrap()
            .progress_chars("##-"),
    );
    pb.set_message(message);
    pb
}

/// Print a formatted summary after the batch.
fn print_summary(succeeded: u64, failed: u64, prepare_failed: u64, elapsed: std::time::Duration) {
    let total = succeeded + failed + prepare_failed;
    let rate = if elapsed.as_secs_f64() > 0.0 {
        succeeded as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Extracted:    {:>8}", succeeded);
    if failed > 0 {
        eprintln!("    LLM failed:   {:>8}", failed);
    }
    if prepare_failed > 0 {
        eprintln!("    Unreadable:   {:>8}", prepare_failed);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", total);
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("    Rate:         {:>7.1} img/sec", rate);
    eprintln!("  ====================================");
}
