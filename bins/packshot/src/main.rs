//! packshot: batch post-processing of product cutouts.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use packshot_cli::output::{format_budget, format_count, format_duration, status_line, Badge, Status};
use packshot_cli::progress::file_progress;
use packshot_image::{
    list_images, open_input, BackgroundRemover, BatchDriver, BatchReport, ExistingAlpha,
    ItemOutcome, Pipeline, PipelineConfig,
};
use packshot_telemetry::{
    metrics, TelemetryConfig, Timer, BATCH_DURATION_MS, IMAGES_FAILED, IMAGES_PROCESSED,
    IMAGES_SKIPPED, PIPELINE_DURATION_MS,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "packshot")]
#[command(about = "Clean, crop, orient and WebP-encode product cutouts")]
#[command(version)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every image directly inside a directory
    Process(ProcessArgs),
    /// Show how one image would be cropped and oriented, without encoding
    Inspect {
        /// Path to image file
        file: PathBuf,
        /// Config file (default: packshot.toml, .packshot.toml, .config/packshot.toml)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct ProcessArgs {
    /// Directory of input images
    input_dir: PathBuf,

    /// Output directory (created if missing)
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Config file (default: packshot.toml, .packshot.toml, .config/packshot.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Alpha below this is treated as background
    #[arg(long)]
    low_threshold: Option<u8>,

    /// Alpha above this becomes opaque after erosion
    #[arg(long)]
    cutoff: Option<u8>,

    /// Erosion passes over the matte
    #[arg(long)]
    erosion_radius: Option<u32>,

    /// Rotate portrait images counter-clockwise instead of clockwise
    #[arg(long)]
    counter_clockwise: bool,

    /// First quality tried
    #[arg(long)]
    start_quality: Option<u8>,

    /// Lowest quality tried
    #[arg(long)]
    min_quality: Option<u8>,

    /// Quality decrement between trials
    #[arg(long)]
    step: Option<u8>,

    /// Encoder effort, 0 (fast) to 6 (smallest)
    #[arg(long)]
    effort: Option<u8>,

    /// Do not cap output size at the input file size
    #[arg(long)]
    no_size_cap: bool,

    /// Explicit output byte budget
    #[arg(long, env = "PACKSHOT_MAX_BYTES")]
    max_bytes: Option<u64>,

    /// Reprocess images whose output already exists
    #[arg(long)]
    overwrite: bool,

    /// Print the batch report as JSON
    #[arg(long)]
    json: bool,

    /// Print run metrics as JSON
    #[arg(long)]
    metrics: bool,
}

impl ProcessArgs {
    fn apply_overrides(&self, config: &mut PipelineConfig) {
        if let Some(v) = self.low_threshold {
            config.alpha.low_threshold = v;
        }
        if let Some(v) = self.cutoff {
            config.alpha.cutoff = v;
        }
        if let Some(v) = self.erosion_radius {
            config.alpha.erosion_radius = v;
        }
        if self.counter_clockwise {
            config.orientation.rotate_clockwise = false;
        }
        if let Some(v) = self.start_quality {
            config.encode.start_quality = v;
        }
        if let Some(v) = self.min_quality {
            config.encode.min_quality = v;
        }
        if let Some(v) = self.step {
            config.encode.step = v;
        }
        if let Some(v) = self.effort {
            config.encode.effort = v;
        }
        if self.no_size_cap {
            config.encode.cap_to_input_size = false;
        }
        if self.max_bytes.is_some() {
            config.encode.size_budget = self.max_bytes;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let telemetry = TelemetryConfig {
        json: cli.log_json,
        ..TelemetryConfig::for_verbosity(cli.verbose)
    };
    packshot_telemetry::init_with_config(telemetry)?;

    match cli.command {
        Commands::Process(args) => {
            let report = process(&args)?;
            if !report.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Inspect { file, config, json } => inspect(&file, config.as_deref(), json)?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let (config, used) = PipelineConfig::load(path)?;
    if let Some(used) = used {
        tracing::info!(path = %used.display(), "Loaded config");
    }
    Ok(config)
}

fn process(args: &ProcessArgs) -> anyhow::Result<BatchReport> {
    let mut config = load_config(args.config.as_deref())?;
    args.apply_overrides(&mut config);
    config.validate()?;

    let inputs = list_images(&args.input_dir)
        .with_context(|| format!("Failed to list {}", args.input_dir.display()))?;
    if inputs.is_empty() && !args.json {
        Status::warning(&format!("No images found in {}", args.input_dir.display()));
    }

    let driver = BatchDriver::new(config, &ExistingAlpha, &args.output)
        .with_context(|| format!("Failed to prepare {}", args.output.display()))?
        .overwrite(args.overwrite);

    let timer = Timer::start(BATCH_DURATION_MS);
    let pb = file_progress(inputs.len() as u64, !args.json);
    let report = driver.run(&inputs, |item| {
        record(item);
        if !args.json {
            let line = describe(item);
            pb.suspend(|| println!("{}", line));
        }
        pb.inc(1);
    });

    pb.finish_and_clear();
    let elapsed = timer.stop();

    let summary = format!(
        "{}: {} processed, {} skipped, {} failed in {}",
        format_count(report.items.len(), "image", "images"),
        report.processed(),
        report.skipped(),
        report.failed(),
        format_duration(elapsed)
    );
    if args.json {
        let mut value = serde_json::to_value(&report)?;
        if args.metrics {
            value["metrics"] = metrics().export_json();
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        if report.is_success() {
            Status::success(&summary);
        } else {
            Status::error(&summary);
        }
        if args.metrics {
            println!("{}", serde_json::to_string_pretty(&metrics().export_json())?);
        }
    }

    Ok(report)
}

fn record(item: &ItemOutcome) {
    match item {
        ItemOutcome::Processed { duration_ms, .. } => {
            metrics().increment(IMAGES_PROCESSED);
            metrics().histogram(PIPELINE_DURATION_MS, *duration_ms as f64);
        }
        ItemOutcome::Skipped { .. } => metrics().increment(IMAGES_SKIPPED),
        ItemOutcome::Failed { .. } => metrics().increment(IMAGES_FAILED),
    }
}

fn describe(item: &ItemOutcome) -> String {
    match item {
        ItemOutcome::Processed {
            input,
            output,
            width,
            height,
            quality,
            size,
            budget,
            met_budget,
            rotated,
            ..
        } => {
            let mut line = format!(
                "{} -> {} {}x{} q{} {}",
                input.display(),
                output.display(),
                width,
                height,
                quality,
                format_budget(*size, *budget)
            );
            if !met_budget {
                line.push_str(" (over budget)");
            }
            if !rotated {
                line.push_str(" (not rotated, already landscape)");
            }
            status_line(Badge::Ok, &line)
        }
        ItemOutcome::Skipped { input, output } => status_line(
            Badge::Skip,
            &format!("{} ({} exists)", input.display(), output.display()),
        ),
        ItemOutcome::Failed { input, error } => {
            status_line(Badge::Error, &format!("{}: {}", input.display(), error))
        }
    }
}

fn inspect(file: &Path, config_path: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let pipeline = Pipeline::new(&config)?;

    let decoded = open_input(file).with_context(|| format!("Failed to decode {}", file.display()))?;
    let grid = ExistingAlpha.remove(decoded)?;
    let (width, height) = grid.dimensions();
    let t = pipeline.transform(grid)?;
    let (out_width, out_height) = t.grid.dimensions();

    if json {
        let value = serde_json::json!({
            "path": file,
            "width": width,
            "height": height,
            "bbox": t.bbox,
            "rotated": t.rotated,
            "output_width": out_width,
            "output_height": out_height,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    Status::header(&file.display().to_string());
    Status::field("size", format!("{}x{}", width, height));
    match t.bbox {
        Some(b) => Status::field(
            "bbox",
            format!(
                "x {}..{}, y {}..{} ({}x{})",
                b.left,
                b.right,
                b.top,
                b.bottom,
                b.width(),
                b.height()
            ),
        ),
        None => Status::field("bbox", "none"),
    }
    Status::field("rotated", if t.rotated { "yes" } else { "no, already landscape" });
    Status::field("output", format!("{}x{}", out_width, out_height));

    Ok(())
}
