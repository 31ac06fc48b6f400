//! Batch driver: discover inputs, run the pipeline per file, collect outcomes.
//!
//! A failing image never aborts the batch; it becomes an
//! [`ItemOutcome::Failed`] and the driver moves on.

use crate::config::PipelineConfig;
use crate::detect::{detect_format, InputFormat};
use crate::error::{ImageError, Result};
use crate::grid::PixelGrid;
use crate::pipeline::Pipeline;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use walkdir::WalkDir;

/// Extension given to every output file.
pub const OUTPUT_EXTENSION: &str = "webp";

/// Produces an RGBA grid whose alpha separates subject from background.
pub trait BackgroundRemover: Send + Sync {
    /// Remove the background of `image`.
    fn remove(&self, image: DynamicImage) -> Result<PixelGrid>;
}

/// Uses the matte already present in the input (e.g. a cutout PNG written by
/// an external matting tool). Inputs without alpha come out fully opaque.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExistingAlpha;

impl BackgroundRemover for ExistingAlpha {
    fn remove(&self, image: DynamicImage) -> Result<PixelGrid> {
        Ok(image.into_rgba8())
    }
}

/// What happened to one input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ItemOutcome {
    /// Written to `output`
    Processed {
        /// Input file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Final width
        width: u32,
        /// Final height
        height: u32,
        /// Chosen quality
        quality: u8,
        /// Output size in bytes
        size: u64,
        /// Byte budget, if any
        budget: Option<u64>,
        /// Whether the output fits the budget
        met_budget: bool,
        /// Whether the image was rotated to landscape
        rotated: bool,
        /// Wall time spent on this image
        duration_ms: u64,
    },
    /// Output already existed
    Skipped {
        /// Input file
        input: PathBuf,
        /// Existing output file
        output: PathBuf,
    },
    /// Processing failed
    Failed {
        /// Input file
        input: PathBuf,
        /// Error message
        error: String,
    },
}

impl ItemOutcome {
    /// Input path of this item.
    pub fn input(&self) -> &Path {
        match self {
            ItemOutcome::Processed { input, .. }
            | ItemOutcome::Skipped { input, .. }
            | ItemOutcome::Failed { input, .. } => input,
        }
    }

    /// Whether this item failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, ItemOutcome::Failed { .. })
    }
}

/// Outcomes of a whole batch, in input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// One entry per input
    pub items: Vec<ItemOutcome>,
}

impl BatchReport {
    /// Number of written outputs.
    pub fn processed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Processed { .. }))
    }

    /// Number of inputs skipped because the output existed.
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Skipped { .. }))
    }

    /// Number of failed inputs.
    pub fn failed(&self) -> usize {
        self.count(ItemOutcome::is_failure)
    }

    /// True when nothing failed.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|&o| pred(o)).count()
    }
}

/// Image files directly inside `dir`, sorted by path.
///
/// Subdirectories are not descended into; files are matched by extension.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            ImageError::IoError(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            )
        })?;
        if entry.file_type().is_file() && InputFormat::from_path(entry.path()).is_some() {
            images.push(entry.into_path());
        }
    }

    images.sort();
    Ok(images)
}

/// `<out_dir>/<stem>.webp` for `input`.
pub fn output_path_for(input: &Path, out_dir: &Path) -> PathBuf {
    let mut name = input.file_stem().unwrap_or(input.as_os_str()).to_os_string();
    name.push(".");
    name.push(OUTPUT_EXTENSION);
    out_dir.join(name)
}

/// Decode `data` read from `path`.
///
/// Magic bytes pick the decoder; the extension is only a fallback, so a PNG
/// saved as `.jpg` still decodes.
pub fn decode_input(data: &[u8], path: &Path) -> Result<DynamicImage> {
    let decoded = match detect_format(data).or_else(|| InputFormat::from_path(path)) {
        Some(fmt) => image::load_from_memory_with_format(data, fmt.image_format())?,
        None => image::load_from_memory(data)?,
    };
    Ok(decoded)
}

/// Read and decode the image at `path`.
pub fn open_input(path: &Path) -> Result<DynamicImage> {
    let data = std::fs::read(path)?;
    decode_input(&data, path)
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// For each input, whether an earlier input already maps to the same output.
fn shadowed_outputs(inputs: &[PathBuf], out_dir: &Path) -> Vec<bool> {
    let mut claimed = HashSet::new();
    inputs
        .iter()
        .map(|input| !claimed.insert(output_path_for(input, out_dir)))
        .collect()
}

/// Drives the pipeline over files.
pub struct BatchDriver<'a, R: BackgroundRemover> {
    pipeline: Pipeline,
    config: PipelineConfig,
    remover: &'a R,
    out_dir: PathBuf,
    overwrite: bool,
}

impl<'a, R: BackgroundRemover> BatchDriver<'a, R> {
    /// Create a driver writing into `out_dir` (created if missing).
    pub fn new(config: PipelineConfig, remover: &'a R, out_dir: impl Into<PathBuf>) -> Result<Self> {
        let out_dir = out_dir.into();
        std::fs::create_dir_all(&out_dir)?;
        Ok(Self {
            pipeline: Pipeline::new(&config)?,
            config,
            remover,
            out_dir,
            overwrite: false,
        })
    }

    /// Reprocess inputs whose output already exists.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Output directory.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Process one file, turning any error into [`ItemOutcome::Failed`].
    pub fn process_file(&self, input: &Path) -> ItemOutcome {
        let output = output_path_for(input, &self.out_dir);

        if !self.overwrite && output.exists() {
            info!(input = %input.display(), "Skipping, output already exists");
            return ItemOutcome::Skipped {
                input: input.to_path_buf(),
                output,
            };
        }

        match self.try_process(input, &output) {
            Ok(outcome) => outcome,
            Err(e) => {
                if e.is_input_error() {
                    warn!(input = %input.display(), error = %e, "Unreadable input");
                } else {
                    error!(input = %input.display(), error = %e, "Processing failed");
                }
                ItemOutcome::Failed {
                    input: input.to_path_buf(),
                    error: e.to_string(),
                }
            }
        }
    }

    fn try_process(&self, input: &Path, output: &Path) -> Result<ItemOutcome> {
        let started = Instant::now();
        let data = std::fs::read(input)?;
        let input_size = data.len() as u64;

        let decoded = decode_input(&data, input)?;
        let grid = self.remover.remove(decoded)?;

        let budget = self.config.encode.budget_for(input_size);
        let out = self.pipeline.run_to_path(grid, output, budget)?;
        let (width, height) = out.dimensions;

        if !out.rotated {
            info!(input = %input.display(), "Not rotated, already landscape");
        }
        info!(
            input = %input.display(),
            output = %output.display(),
            quality = out.encoded.quality,
            size = out.encoded.size(),
            "Processed"
        );

        Ok(ItemOutcome::Processed {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            width,
            height,
            quality: out.encoded.quality,
            size: out.encoded.size(),
            budget,
            met_budget: out.encoded.met_budget(),
            rotated: out.rotated,
            duration_ms: saturating_millis(started.elapsed()),
        })
    }

    /// Process every input, in parallel when the `parallel` feature is on.
    ///
    /// Outcomes keep the order of `inputs`. `on_item` runs once per finished
    /// item (from worker threads when parallel). Inputs sharing a stem share an
    /// output; the first one in `inputs` owns it and the rest are skipped, so
    /// the result never depends on thread timing.
    pub fn run<F>(&self, inputs: &[PathBuf], on_item: F) -> BatchReport
    where
        F: Fn(&ItemOutcome) + Send + Sync,
    {
        let shadowed = shadowed_outputs(inputs, &self.out_dir);

        let process = |(input, &shadowed): (&PathBuf, &bool)| {
            let outcome = if shadowed {
                let output = output_path_for(input, &self.out_dir);
                info!(
                    input = %input.display(),
                    output = %output.display(),
                    "Skipping, output belongs to an earlier input"
                );
                ItemOutcome::Skipped {
                    input: input.clone(),
                    output,
                }
            } else {
                self.process_file(input)
            };
            on_item(&outcome);
            outcome
        };

        #[cfg(feature = "parallel")]
        let items = {
            use rayon::prelude::*;
            inputs.par_iter().zip(shadowed.par_iter()).map(process).collect()
        };

        #[cfg(not(feature = "parallel"))]
        let items = inputs.iter().zip(shadowed.iter()).map(process).collect();

        BatchReport { items }
    }
}
