use anyhow::Context;
use clap::Parser;
use log::info;
use std::io;
use std::path::PathBuf;

use voclabel::capture::TerminalSurface;
use voclabel::config::{self, AppConfig, EngineKind};
use voclabel::prompt::TerminalPrompter;
use voclabel::{AnnotationWriter, CandidateRanker, RegionProposalAdapter, Session, Vocabulary, dataset, logging};

#[derive(Parser)]
#[command(name = "voclabel")]
#[command(about = "Curate proposed regions into Pascal VOC annotations, reusing labels across images")]
struct Cli {
    /// Directory of images to annotate
    #[arg(long, value_name = "DIR")]
    input_dir: Option<PathBuf>,

    /// Directory the XML files are written to
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of largest candidates offered per image
    #[arg(long, value_name = "K")]
    max_candidates: Option<usize>,

    /// Region proposal engine
    #[arg(long, value_enum)]
    engine: Option<EngineKind>,

    /// Program run as the external segmenter (implies --engine command)
    #[arg(long, value_name = "PROGRAM")]
    engine_command: Option<String>,

    /// Model checkpoint for the external segmenter
    #[arg(long, value_name = "FILE")]
    checkpoint: Option<PathBuf>,

    /// Manual labeling tool opened when nothing is accepted
    #[arg(long, value_name = "PROGRAM")]
    fallback_tool: Option<String>,

    /// Never open a manual labeling tool
    #[arg(long)]
    no_fallback_tool: bool,

    /// Do not offer a hand-drawn box when candidates are declined
    #[arg(long)]
    no_manual_capture: bool,

    /// Leave existing XML files alone instead of overwriting them
    #[arg(long)]
    skip_existing: bool,

    /// Directory for candidate overlay images
    #[arg(long, value_name = "DIR")]
    review_dir: Option<PathBuf>,

    /// Font file used to number the candidate overlays
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,

    /// Image file extension to pick up (repeatable)
    #[arg(long = "extension", value_name = "EXT")]
    extensions: Vec<String>,

    /// Save built-in segmenter step images to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn apply_cli(config: &mut AppConfig, args: &Cli) {
    if let Some(dir) = &args.input_dir {
        config.input.dir = dir.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output.dir = dir.clone();
    }
    if let Some(k) = args.max_candidates {
        config.review.max_candidates = k;
    }
    if let Some(kind) = args.engine {
        config.engine.kind = kind;
    }
    if let Some(program) = &args.engine_command {
        config.engine.command = Some(program.clone());
        if args.engine.is_none() {
            config.engine.kind = EngineKind::Command;
        }
    }
    if let Some(checkpoint) = &args.checkpoint {
        config.engine.checkpoint = checkpoint.clone();
    }
    if let Some(tool) = &args.fallback_tool {
        config.fallback.tool = Some(tool.clone());
    }
    if args.no_fallback_tool {
        config.fallback.tool = None;
    }
    if args.no_manual_capture {
        config.review.manual_capture = false;
    }
    if args.skip_existing {
        config.output.skip_existing = true;
    }
    if let Some(dir) = &args.review_dir {
        config.review.overlay_dir = dir.clone();
    }
    if let Some(font) = &args.font {
        config.review.font = Some(font.clone());
    }
    if !args.extensions.is_empty() {
        config.input.extensions = args.extensions.clone();
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    logging::init(args.verbose);

    let mut config = config::load_config(args.config.as_deref())?;
    apply_cli(&mut config, &args);
    config.validate().context("invalid configuration")?;

    let images = dataset::list_images(&config.input.dir, &config.input.extensions)?;
    info!("Found {} images in {}", images.len(), config.input.dir.display());

    let engine = config.engine.build(args.debug_out.clone())?;
    let adapter = RegionProposalAdapter::new(engine);
    info!("Using {} for region proposals", adapter.engine_name());

    let writer = AnnotationWriter::new(&config.output.dir, config.overwrite_policy());
    std::fs::create_dir_all(writer.output_dir())
        .with_context(|| format!("Failed to create output directory {}", writer.output_dir().display()))?;

    let stdin = io::stdin();
    let mut prompter = TerminalPrompter::new(stdin.lock(), io::stdout());
    let mut surface = TerminalSurface::new(config.review.overlay_dir.clone());
    if let Some(font) = &config.review.font {
        surface = surface.with_font(font)?;
    }
    let mut fallback = config.fallback.build();

    let mut vocabulary = Vocabulary::new();
    let mut session = Session::new(&adapter, &writer, &mut prompter, &mut surface, fallback.as_mut())
        .with_ranker(CandidateRanker::new(config.review.max_candidates))
        .with_folder(dataset::folder_name(&config.input.dir))
        .with_manual_capture(config.review.manual_capture);

    let summary = session.run(&images, &mut vocabulary)?;

    info!(
        "Done: {} annotations written, {} images skipped",
        summary.written(),
        summary.skipped()
    );
    let labels: Vec<&str> = vocabulary.list_labels().iter().map(|l| l.as_str()).collect();
    info!("Labels used this session: {}", labels.join(", "));

    Ok(())
}
