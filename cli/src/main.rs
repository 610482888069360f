//! bioreport - command-line front end for the report pipeline.
//!
//! `render` builds a PDF from local files, `report` builds one from
//! file-system stores, `normalize` dumps normalized channels as CSV.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use report::assessment::AssessmentResult;
use report::charts::{ChartArtifact, ChartRenderer};
use report::export::{Delivery, DirectorySink, DocumentExporter};
use report::layout::PageComposer;
use report::pipeline::{default_filename, PageBuilder, ReportPipeline, ReportRequest};
use report::render::RasterImage;
use report::signal::spectrum::SpectrumConfig;
use report::signal::{normalize, RawSignalRecord, SignalIngestor};
use report::sources::{FsAssessmentStore, FsSignalStore};
use report::ReportConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "bioreport")]
#[command(about = "Bioelectric signal reports")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, env = "BIOREPORT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a report from an assessment JSON file and an optional signal dump
    Render(RenderArgs),
    /// Render a report from assessment and signal stores
    Report(ReportArgs),
    /// Print normalized channels of a signal dump as CSV
    Normalize {
        /// Raw signal dump
        signal: PathBuf,
    },
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Directory the PDF is written to (defaults to the platform data dir)
    #[arg(short, long, env = "BIOREPORT_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Output file name
    #[arg(long)]
    filename: Option<String>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Assessment result (JSON)
    #[arg(short, long)]
    assessment: PathBuf,

    /// Raw signal dump
    #[arg(short, long)]
    signal: Option<PathBuf>,

    /// PNG images to attach to the last page
    #[arg(long = "attach")]
    attachments: Vec<PathBuf>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Assessment id (`<assessments>/<id>.json`)
    id: String,

    /// Folder holding assessment records
    #[arg(long, env = "BIOREPORT_ASSESSMENTS")]
    assessments: PathBuf,

    /// Folder holding `<subject>/<file>` signal dumps
    #[arg(long, env = "BIOREPORT_SIGNALS")]
    signals: PathBuf,

    /// PNG images to attach to the last page
    #[arg(long = "attach")]
    attachments: Vec<PathBuf>,

    #[command(flatten)]
    output: OutputArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bioreport=info,report=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ReportConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ReportConfig::default(),
    };

    match cli.command {
        Command::Render(args) => render(&config, args).await,
        Command::Report(args) => report_from_stores(config, args).await,
        Command::Normalize { signal } => print_normalized(&config, &signal).await,
    }
}

async fn render(config: &ReportConfig, args: RenderArgs) -> Result<()> {
    let raw = tokio::fs::read_to_string(&args.assessment)
        .await
        .with_context(|| format!("Failed to read {}", args.assessment.display()))?;
    let assessment = AssessmentResult::from_json(&raw)?;

    let signal = match &args.signal {
        Some(path) => {
            let payload = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Some(RawSignalRecord::new(
                assessment.subject_id.clone(),
                display_name(path),
                payload,
            ))
        }
        None => None,
    };
    let attachments = load_attachments(&args.attachments).await?;

    let charts = ChartRenderer::default();
    let pages = PageBuilder {
        config,
        charts: &charts,
        spectrum: SpectrumConfig::default(),
    }
    .build(&assessment, signal.as_ref(), attachments)?;
    let rendered = PageComposer::new(config.page).compose(&pages);

    let sink = sink(&args.output)?;
    let filename = args
        .output
        .filename
        .clone()
        .unwrap_or_else(|| default_filename(&assessment));
    let exporter = DocumentExporter::new(&config.export).with_cancellation(ctrl_c_token());
    let delivery = exporter.export(&rendered, &filename, &sink).await?;
    report_delivery(&delivery);
    Ok(())
}

async fn report_from_stores(config: ReportConfig, args: ReportArgs) -> Result<()> {
    let pipeline = ReportPipeline::new(
        FsAssessmentStore::new(&args.assessments),
        FsSignalStore::new(&args.signals),
        config,
    );
    let request = ReportRequest {
        assessment_id: args.id.clone(),
        signal: None,
        attachments: load_attachments(&args.attachments).await?,
        filename: args.output.filename.clone(),
    };
    let sink = sink(&args.output)?;
    let delivery = pipeline
        .generate(request, &sink, ctrl_c_token())
        .await
        .with_context(|| format!("Failed to generate report for {}", args.id))?;
    report_delivery(&delivery);
    Ok(())
}

async fn print_normalized(config: &ReportConfig, path: &Path) -> Result<()> {
    let payload = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let parsed = SignalIngestor::new(config.ingest.clone()).parse_bytes(&payload)?;
    if !parsed.is_aligned() {
        warn!(
            omitted = parsed.stats.omitted_values,
            "some channel values were dropped; short channels leave trailing cells empty"
        );
    }
    let normalized = normalize(&parsed.channels);

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    let header: Vec<String> = (1..=normalized.len()).map(|n| format!("ch{n}")).collect();
    writeln!(out, "index,{}", header.join(","))?;
    for (row, index) in parsed.time_index.iter().enumerate() {
        let cells: Vec<String> = normalized
            .iter()
            .map(|channel| channel.get(row).map(|v| format!("{v:.6}")).unwrap_or_default())
            .collect();
        writeln!(out, "{index},{}", cells.join(","))?;
    }
    out.flush()?;
    info!(
        samples = parsed.sample_count(),
        channels = parsed.channel_count(),
        quality = %parsed.stats.summary(),
        "normalized"
    );
    Ok(())
}

async fn load_attachments(paths: &[PathBuf]) -> Result<Vec<ChartArtifact>> {
    let mut attachments = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let image = RasterImage::from_png(&bytes)
            .with_context(|| format!("{} is not a readable PNG", path.display()))?;
        attachments.push(ChartArtifact::external(display_name(path), image));
    }
    Ok(attachments)
}

fn sink(output: &OutputArgs) -> Result<DirectorySink> {
    match &output.out_dir {
        Some(dir) => Ok(DirectorySink::new(dir)),
        None => Ok(DirectorySink::platform_default()?),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Cancelled on Ctrl+C; export stops at the next page boundary.
fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping after the current page");
            trigger.cancel();
        }
    });
    token
}

fn report_delivery(delivery: &Delivery) {
    match &delivery.path {
        Some(path) => println!("{}", path.display()),
        None => println!("{}", delivery.filename),
    }
}
