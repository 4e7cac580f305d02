//! vidupe - find and resolve duplicate video files.
//!
//! Usage:
//!   vidupe <DIR>                         Duration + frame detection (default)
//!   vidupe <DIR> --method all            Run every method
//!   vidupe <DIR> --method hash --delete  Remove byte-identical copies
//!   vidupe <DIR> --delete --dry-run      Show what would be removed
//!   vidupe --help                        Show help

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use serde::Deserialize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use vidupe_analyze::{DetectionMethod, DuplicateDetector, DuplicateReport, format_size};
use vidupe_core::{
    ConfigError, DetectionConfig, DetectionEvent, InventoryConfig, Reporter, TracingReporter,
    normalize_extension,
};
use vidupe_media::{FFMPEG, FFPROBE, FfmpegSampler, FfprobeProber, tool_available};
use vidupe_ops::{DuplicateResolver, RemovalMode, ResolutionOutcome, select_for_resolution};
use vidupe_scan::InventoryScanner;

#[derive(Parser)]
#[command(
    name = "vidupe",
    version,
    about = "Find duplicate videos by size, content hash, name, duration and picture",
    long_about = "vidupe walks a directory for video files and groups duplicates with one \
                  or more detection methods. With --delete it keeps the largest file of \
                  each group and removes the rest, preferring hash groups over \
                  frame-confirmed groups over duration groups."
)]
struct Cli {
    /// Directory to search
    directory: PathBuf,

    /// Detection method
    #[arg(short, long, value_enum, default_value = "frames")]
    method: MethodArg,

    /// Video extensions to include, comma separated (e.g. ".mp4,.mkv")
    #[arg(short, long, value_delimiter = ',')]
    extensions: Option<Vec<String>>,

    /// Name similarity threshold (0-1)
    #[arg(long)]
    similarity: Option<f64>,

    /// Duration tolerance in seconds
    #[arg(long)]
    duration_tolerance: Option<f64>,

    /// Frame similarity threshold (0-1)
    #[arg(long)]
    frame_similarity: Option<f64>,

    /// Seconds of video to sample from the midpoint
    #[arg(long)]
    extract_seconds: Option<f64>,

    /// Remove duplicates, keeping the largest file of each group
    #[arg(long)]
    delete: bool,

    /// With --delete, only show what would be removed
    #[arg(long, requires = "delete")]
    dry_run: bool,

    /// With --delete, move files to the trash instead of removing them
    #[arg(long, requires = "delete", conflicts_with = "dry_run")]
    trash: bool,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// TOML file with [detection] and [inventory] settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MethodArg {
    Size,
    Hash,
    Name,
    Duration,
    Frames,
    All,
}

impl MethodArg {
    fn methods(self) -> Vec<DetectionMethod> {
        match self {
            Self::Size => vec![DetectionMethod::Size],
            Self::Hash => vec![DetectionMethod::Hash],
            Self::Name => vec![DetectionMethod::Name],
            Self::Duration => vec![DetectionMethod::Duration],
            Self::Frames => vec![DetectionMethod::Frames],
            Self::All => vec![
                DetectionMethod::Size,
                DetectionMethod::Hash,
                DetectionMethod::Name,
                DetectionMethod::Duration,
                DetectionMethod::Frames,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Settings file layout.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    detection: DetectionConfig,
    inventory: InventorySection,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct InventorySection {
    extensions: Option<Vec<String>>,
    follow_symlinks: bool,
    include_hidden: bool,
    threads: usize,
}

impl Default for InventorySection {
    fn default() -> Self {
        Self {
            extensions: None,
            follow_symlinks: false,
            include_hidden: true,
            threads: 0,
        }
    }
}

/// Prints stage boundaries to stderr and forwards everything to `tracing`.
struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&self, event: DetectionEvent) {
        match &event {
            DetectionEvent::StageStarted { stage, total } if *total > 0 => {
                eprintln!("{stage} ({total} items)...");
            }
            DetectionEvent::StageFinished { stage, skipped, .. } if *skipped > 0 => {
                eprintln!("{stage}: {skipped} skipped");
            }
            _ => {}
        }
        TracingReporter.report(event);
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let file_config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ConfigFile::default(),
    };
    let (inventory_config, detection_config) = build_configs(&cli, file_config)?;

    run(&cli, &inventory_config, detection_config)
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: &Path) -> Result<ConfigFile> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

/// Merge the settings file with command-line overrides.
fn build_configs(cli: &Cli, file: ConfigFile) -> Result<(InventoryConfig, DetectionConfig)> {
    let root = cli.directory.canonicalize().context("Invalid path")?;
    if !root.is_dir() {
        bail!("Not a directory: {}", root.display());
    }

    let mut inventory = InventoryConfig::new(&root);
    inventory.follow_symlinks = file.inventory.follow_symlinks;
    inventory.include_hidden = file.inventory.include_hidden;
    inventory.threads = file.inventory.threads;
    if let Some(extensions) = cli.extensions.as_ref().or(file.inventory.extensions.as_ref()) {
        inventory = inventory.with_extensions(extensions);
    }
    if inventory.extensions.is_empty() {
        return Err(ConfigError::NoExtensions.into());
    }

    let mut detection = file.detection;
    if let Some(v) = cli.similarity {
        detection.name_similarity = v;
    }
    if let Some(v) = cli.duration_tolerance {
        detection.duration_tolerance = v;
    }
    if let Some(v) = cli.frame_similarity {
        detection.frame_similarity = v;
    }
    if let Some(v) = cli.extract_seconds {
        detection.extract_seconds = v;
    }
    detection.validate()?;

    Ok((inventory, detection))
}

fn run(cli: &Cli, inventory_config: &InventoryConfig, config: DetectionConfig) -> Result<()> {
    let reporter: Arc<dyn Reporter> = Arc::new(ConsoleReporter);

    eprintln!("Scanning {}...", inventory_config.root.display());
    eprintln!(
        "Extensions: {}",
        inventory_config
            .extensions
            .iter()
            .map(|e| normalize_extension(e))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let inventory = InventoryScanner::with_reporter(reporter.clone())
        .scan(inventory_config)
        .context("Scan failed")?;

    if inventory.is_empty() {
        println!("No video files found in {}", inventory.root.display());
        return Ok(());
    }
    eprintln!(
        "Found {} video files ({})",
        inventory.len(),
        format_size(inventory.total_size())
    );

    let methods = available_methods(cli.method.methods());
    if methods.is_empty() {
        bail!("None of the selected methods can run; install ffmpeg/ffprobe or pick another method");
    }

    let mut detector = DuplicateDetector::new(config.clone()).with_reporter(reporter.clone());
    if methods
        .iter()
        .any(|m| matches!(m, DetectionMethod::Duration | DetectionMethod::Frames))
    {
        detector = detector.with_prober(Arc::new(FfprobeProber::new()?));
    }
    if methods.contains(&DetectionMethod::Frames) {
        detector = detector.with_sampler(Arc::new(FfmpegSampler::new(config.thumbnail_size)?));
    }

    let report = detector.detect(&inventory, &methods)?;
    emit_report(&report, cli.format, cli.output.as_deref())?;

    if cli.delete {
        let mode = if cli.dry_run {
            RemovalMode::DryRun
        } else if cli.trash {
            RemovalMode::Trash
        } else {
            RemovalMode::Delete
        };
        resolve(&report, mode, reporter);
    }

    Ok(())
}

/// Drop methods whose external tools are missing.
fn available_methods(requested: Vec<DetectionMethod>) -> Vec<DetectionMethod> {
    let needs_probe = requested
        .iter()
        .any(|m| matches!(m, DetectionMethod::Duration | DetectionMethod::Frames));
    let has_probe = !needs_probe || tool_available(FFPROBE);
    let has_ffmpeg = !requested.contains(&DetectionMethod::Frames) || tool_available(FFMPEG);

    requested
        .into_iter()
        .filter(|method| {
            let usable = match method {
                DetectionMethod::Duration => has_probe,
                DetectionMethod::Frames => has_probe && has_ffmpeg,
                _ => true,
            };
            if !usable {
                warn!(%method, "skipping method: ffprobe/ffmpeg not found");
                eprintln!("Skipping {method}: ffprobe/ffmpeg not found");
            }
            usable
        })
        .collect()
}

fn emit_report(report: &DuplicateReport, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    let rendered = match format {
        OutputFormat::Text => report.render_text(),
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
    };

    match output {
        Some(path) => {
            fs::write(path, &rendered)
                .with_context(|| format!("Failed to write report {}", path.display()))?;
            eprintln!("Report written to {}", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

fn resolve(report: &DuplicateReport, mode: RemovalMode, reporter: Arc<dyn Reporter>) {
    let Some((method, groups)) = select_for_resolution(report) else {
        println!();
        println!("No hash, frames or duration groups to resolve.");
        println!("Use --method hash, --method frames or --method duration for reliable results.");
        return;
    };

    println!();
    println!("{}", "─".repeat(70));
    println!(" Resolving {} groups from the {} method ({mode})", groups.len(), method);
    println!("{}", "─".repeat(70));

    let resolver = DuplicateResolver::with_reporter(reporter);
    let outcome = resolver.resolve(groups, mode);
    print_outcome(&outcome);
}

fn print_outcome(outcome: &ResolutionOutcome) {
    for entry in outcome.plan.entries() {
        if entry.remove.is_empty() {
            continue;
        }
        println!(" [KEEP] {}", entry.keep.path.display());
        for file in &entry.remove {
            let failed = outcome.errors.iter().any(|e| e.path == file.path);
            let marker = if failed { "[FAIL]" } else { "[DUP ]" };
            println!(" {marker} {}", file.path.display());
        }
        println!();
    }

    for error in &outcome.errors {
        println!(" Error: {error}");
    }
    println!(
        " {} ({} {})",
        outcome.summary(),
        format_size(outcome.bytes_freed),
        if outcome.mode.is_dry_run() { "reclaimable" } else { "freed" }
    );
}
