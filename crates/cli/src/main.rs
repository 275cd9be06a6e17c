//! CLI tool for turning PDF documents into slide decks.

use anyhow::{Context, Result};
use clap::Parser;
use slides_core::{
    DirImageStore, DocumentReader, Pipeline, SentenceSummarizer, Summarizer, ThresholdPolicy,
};
use slides_ollama::OllamaSummarizer;
use slides_pdf::PdfReader;
use slides_pptx::{DeckReader, PptxDeckWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name for extracted images, created next to the output deck.
const IMAGE_DIR_NAME: &str = "extracted_images";

/// Convert a PDF into a PowerPoint deck, one section per heading.
#[derive(Parser, Debug)]
#[command(name = "pdf2slides")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input PDF file
    #[arg(required_unless_present = "inspect")]
    input: Option<PathBuf>,

    /// Output .pptx file (default: <title or input stem>.pptx next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for extracted images (default: extracted_images next to the output)
    #[arg(long)]
    image_dir: Option<PathBuf>,

    /// Font applied to all slide text
    #[arg(short, long, default_value = "Calibri")]
    font: String,

    /// Presentation name, shown on a leading title slide
    #[arg(short, long)]
    title: Option<String>,

    /// Existing .pptx whose theme is reused
    #[arg(long)]
    template: Option<PathBuf>,

    /// When to compute the heading threshold: first-page or per-page
    #[arg(long, default_value = "first-page")]
    threshold_policy: ThresholdPolicy,

    /// Base URL of the Ollama server
    #[arg(long, env = "OLLAMA_URL", default_value = slides_ollama::DEFAULT_URL)]
    ollama_url: String,

    /// Model used for summaries
    #[arg(long, env = "OLLAMA_MODEL", default_value = slides_ollama::DEFAULT_MODEL)]
    model: String,

    /// Sampling temperature
    #[arg(long, default_value = "0.3")]
    temperature: f32,

    /// Maximum tokens per summary
    #[arg(long, default_value = "1000")]
    max_tokens: u32,

    /// Request timeout in seconds
    #[arg(long, default_value = "120")]
    timeout_secs: u64,

    /// Use leading sentences of each section instead of the LLM
    #[arg(long)]
    no_summarize: bool,

    /// Print slide plans as JSON instead of writing a deck
    #[arg(long)]
    plan_json: bool,

    /// Print the text of an existing deck and exit
    #[arg(long, value_name = "DECK")]
    inspect: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    if let Some(deck) = &args.inspect {
        return inspect(deck);
    }

    let input = args
        .input
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("No input file given"))?;

    let output = get_output_path(input, args.output.as_deref(), args.title.as_deref());
    let image_dir = args
        .image_dir
        .clone()
        .unwrap_or_else(|| sibling_dir(&output, IMAGE_DIR_NAME));
    log::debug!(
        "Output: {}, images: {}",
        output.display(),
        image_dir.display()
    );

    let summarizer: Box<dyn Summarizer> = if args.no_summarize {
        Box::new(SentenceSummarizer::new())
    } else {
        Box::new(
            OllamaSummarizer::new(&args.ollama_url)
                .with_model(&args.model)
                .with_temperature(args.temperature)
                .with_max_tokens(args.max_tokens)
                .with_timeout(Duration::from_secs(args.timeout_secs)),
        )
    };

    let pipeline = Pipeline::new(&args.font).with_policy(args.threshold_policy);
    let reader = PdfReader::new();
    let mut store = DirImageStore::new(&image_dir);

    if args.plan_json {
        let pages = reader
            .read_pages(input)
            .with_context(|| format!("Failed to read {}", input.display()))?;
        let report = pipeline.plan(&pages, summarizer.as_ref(), &mut store)?;
        println!("{}", serde_json::to_string_pretty(&report.plans)?);
        return Ok(());
    }

    let mut writer = PptxDeckWriter::new();
    if let Some(title) = &args.title {
        writer = writer.with_title(title);
    }
    if let Some(template) = &args.template {
        writer = writer
            .with_template(template)
            .with_context(|| format!("Failed to load template {}", template.display()))?;
    }

    if args.verbose {
        eprintln!("Processing: {}", input.display());
    }

    let report = pipeline
        .run(input, &reader, summarizer.as_ref(), &mut store, &writer, &output)
        .with_context(|| format!("Failed to convert {}", input.display()))?;

    if report.summary_failures > 0 {
        eprintln!(
            "Warning: summarizer failed for {} of {} sections",
            report.summary_failures, report.sections
        );
    }
    if args.verbose {
        eprintln!(
            "  {} sections, {} slides",
            report.sections,
            report.plans.len()
        );
        eprintln!("Written to: {}", output.display());
    }

    Ok(())
}

/// Print slide text of an existing deck.
fn inspect(path: &Path) -> Result<()> {
    let deck = DeckReader::new()
        .read(path)
        .with_context(|| format!("Failed to read deck {}", path.display()))?;

    for slide in &deck.slides {
        println!("--- Slide {} ({} pictures) ---", slide.number, slide.pictures);
        for line in &slide.lines {
            println!("{}", line);
        }
    }
    Ok(())
}

/// Determine the output path for a converted file.
///
/// Without an explicit output, the deck is named after the presentation
/// title, or else the input file.
fn get_output_path(input_path: &Path, output: Option<&Path>, title: Option<&str>) -> PathBuf {
    if let Some(path) = output {
        return path.to_path_buf();
    }

    let title_stem = title
        .map(|t| t.trim().replace(['/', '\\'], "_"))
        .filter(|t| !t.is_empty() && t != "." && t != "..");
    let stem = title_stem.unwrap_or_else(|| {
        input_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output")
            .to_string()
    });
    let output_filename = format!("{}.pptx", stem);

    match input_path.parent() {
        Some(parent) => parent.join(output_filename),
        None => PathBuf::from(output_filename),
    }
}

/// A directory next to `file`.
fn sibling_dir(file: &Path, name: &str) -> PathBuf {
    match file.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}
