//! Size-budgeted lossy WebP encoding.
//!
//! With a byte budget the encoder walks quality down in fixed steps until the
//! output fits or the quality floor has been tried. The floor result is kept
//! even when it is still over budget.

use crate::error::{ImageError, Result};
use crate::grid::PixelGrid;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Highest libwebp `method` value (slowest, smallest output).
pub const MAX_EFFORT: u8 = 6;

/// Options for WebP encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// First quality tried (0-100)
    pub start_quality: u8,
    /// Quality floor, always tried once when the budget is not met earlier
    pub min_quality: u8,
    /// Quality decrement between trials
    pub step: u8,
    /// libwebp compression method (0-6)
    pub effort: u8,
    /// Use the input file size as the byte budget
    pub cap_to_input_size: bool,
    /// Explicit byte budget, takes precedence over `cap_to_input_size`
    pub size_budget: Option<u64>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            start_quality: 88,
            min_quality: 60,
            step: 4,
            effort: MAX_EFFORT,
            cap_to_input_size: true,
            size_budget: None,
        }
    }
}

impl EncodeOptions {
    /// Check ranges.
    pub fn validate(&self) -> Result<()> {
        if self.start_quality > 100 || self.min_quality > 100 {
            return Err(ImageError::InvalidConfig(format!(
                "quality must be within 0-100 (start {}, min {})",
                self.start_quality, self.min_quality
            )));
        }
        if self.step == 0 {
            return Err(ImageError::InvalidConfig("quality step must be at least 1".into()));
        }
        if self.effort > MAX_EFFORT {
            return Err(ImageError::InvalidConfig(format!(
                "effort must be within 0-{}, got {}",
                MAX_EFFORT, self.effort
            )));
        }
        Ok(())
    }

    /// Byte budget for an input of `input_size` bytes.
    pub fn budget_for(&self, input_size: u64) -> Option<u64> {
        self.size_budget
            .or(self.cap_to_input_size.then_some(input_size))
    }
}

/// One encoding trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingAttempt {
    /// Quality used
    pub quality: u8,
    /// Encoded size in bytes
    pub size: u64,
}

/// Result of a (possibly searched) encode.
#[derive(Debug, Clone)]
pub struct EncodeOutcome {
    /// Encoded WebP bytes of the chosen trial
    pub bytes: Vec<u8>,
    /// Quality of the chosen trial
    pub quality: u8,
    /// Every trial, in the order attempted
    pub attempts: Vec<EncodingAttempt>,
    /// Budget the search ran against
    pub budget: Option<u64>,
}

impl EncodeOutcome {
    /// Size of the chosen trial.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Whether the output fits the budget (always true without one).
    pub fn met_budget(&self) -> bool {
        self.budget.is_none_or(|max| self.size() <= max)
    }
}

/// Qualities tried, in order, when every trial misses the budget.
///
/// Descends from `start` by `step` and always ends exactly on `min`. When
/// `start <= min` (or `step` is 0) only `start` is tried.
pub fn quality_schedule(start: u8, min: u8, step: u8) -> Vec<u8> {
    let mut schedule = vec![start];
    if step == 0 {
        return schedule;
    }

    let mut quality = start;
    while quality > min {
        quality = quality.saturating_sub(step).max(min);
        schedule.push(quality);
    }
    schedule
}

/// Encode `grid` once as lossy WebP with alpha.
pub fn encode_webp(grid: &PixelGrid, quality: u8, effort: u8) -> Result<Vec<u8>> {
    let (width, height) = grid.dimensions();
    if width == 0 || height == 0 {
        return Err(ImageError::EncodingFailure(format!(
            "cannot encode a {}x{} image",
            width, height
        )));
    }

    let encoder = webp::Encoder::from_rgba(grid.as_raw(), width, height);

    let mut config = webp::WebPConfig::new()
        .map_err(|_| ImageError::EncodingFailure("failed to create WebPConfig".into()))?;
    config.lossless = 0;
    config.quality = f32::from(quality.min(100));
    config.method = i32::from(effort.min(MAX_EFFORT));

    let mem = encoder
        .encode_advanced(&config)
        .map_err(|e| ImageError::EncodingFailure(format!("WebP encode failed: {e:?}")))?;

    Ok(mem.to_vec())
}

/// Scratch file builder for trials that may be persisted as the output.
///
/// tempfile creates owner-only files; on unix the mode is widened to 0666 so
/// the umask applies the same way it does for `File::create`.
fn scratch_builder() -> tempfile::Builder<'static, 'static> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".packshot-").suffix(".tmp.webp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    builder
}

/// WebP encoder that searches quality against an optional byte budget.
#[derive(Debug, Clone, Copy)]
pub struct SizeConstrainedEncoder {
    options: EncodeOptions,
}

impl SizeConstrainedEncoder {
    /// Create an encoder, rejecting out-of-range options.
    pub fn new(options: EncodeOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    /// Options in use.
    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Qualities this encoder would try for `budget`.
    pub fn schedule(&self, budget: Option<u64>) -> Vec<u8> {
        match budget {
            None => vec![self.options.start_quality],
            Some(_) => quality_schedule(
                self.options.start_quality,
                self.options.min_quality,
                self.options.step,
            ),
        }
    }

    /// Encode in memory.
    pub fn encode(&self, grid: &PixelGrid, budget: Option<u64>) -> Result<EncodeOutcome> {
        let mut last = Vec::new();
        let attempts = run_search(&self.schedule(budget), budget, |quality| {
            last = encode_webp(grid, quality, self.options.effort)?;
            Ok(last.len() as u64)
        })?;

        self.finish(last, attempts, budget)
    }

    /// Encode to `out_path`.
    ///
    /// Each trial lands in its own scratch file next to `out_path`; only the
    /// chosen trial is renamed over `out_path`, so an interrupted search never
    /// leaves a partial result at the final path.
    pub fn encode_to_path(
        &self,
        grid: &PixelGrid,
        out_path: &Path,
        budget: Option<u64>,
    ) -> Result<EncodeOutcome> {
        let dir = match out_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut staged: Option<(NamedTempFile, Vec<u8>)> = None;
        let attempts = run_search(&self.schedule(budget), budget, |quality| {
            let bytes = encode_webp(grid, quality, self.options.effort)?;

            let mut scratch = scratch_builder().tempfile_in(dir)?;
            scratch.write_all(&bytes)?;
            scratch.as_file().sync_all()?;
            let size = scratch.as_file().metadata()?.len();

            // Replacing the previous trial drops (and deletes) its scratch file.
            staged = Some((scratch, bytes));
            Ok(size)
        })?;

        let (scratch, bytes) = staged
            .ok_or_else(|| ImageError::EncodingFailure("no encoding trial ran".into()))?;
        scratch.persist(out_path).map_err(|e| e.error)?;

        self.finish(bytes, attempts, budget)
    }

    fn finish(
        &self,
        bytes: Vec<u8>,
        attempts: Vec<EncodingAttempt>,
        budget: Option<u64>,
    ) -> Result<EncodeOutcome> {
        let last = attempts
            .last()
            .copied()
            .ok_or_else(|| ImageError::EncodingFailure("no encoding trial ran".into()))?;

        let outcome = EncodeOutcome {
            bytes,
            quality: last.quality,
            attempts,
            budget,
        };

        if !outcome.met_budget() {
            warn!(
                quality = outcome.quality,
                size = outcome.size(),
                budget = ?budget,
                "Quality floor reached, output still over budget"
            );
        }
        Ok(outcome)
    }
}

/// Run trials in `schedule` order until one fits `budget`.
fn run_search<F>(schedule: &[u8], budget: Option<u64>, mut trial: F) -> Result<Vec<EncodingAttempt>>
where
    F: FnMut(u8) -> Result<u64>,
{
    let mut attempts = Vec::with_capacity(schedule.len());

    for &quality in schedule {
        let size = trial(quality)?;
        debug!(quality, size, budget = ?budget, "Encoding trial");
        attempts.push(EncodingAttempt { quality, size });

        if budget.is_none_or(|max| size <= max) {
            break;
        }
    }

    Ok(attempts)
}

/// Encode with explicit parameters.
///
/// Without a budget this is a single encode at `start_quality`.
pub fn encode(
    grid: &PixelGrid,
    budget: Option<u64>,
    start_quality: u8,
    min_quality: u8,
    step: u8,
    effort: u8,
) -> Result<EncodeOutcome> {
    SizeConstrainedEncoder::new(EncodeOptions {
        start_quality,
        min_quality,
        step,
        effort,
        cap_to_input_size: false,
        size_budget: budget,
    })?
    .encode(grid, budget)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::is_webp;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn noisy(width: u32, height: u32) -> RgbaImage {
        // Deterministic xorshift noise; hard to compress so quality matters.
        let mut state: u32 = 0x9E37_79B9;
        RgbaImage::from_fn(width, height, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            Rgba([r, g, b, 255])
        })
    }

    #[test]
    fn test_quality_schedule_even_steps() {
        assert_eq!(
            quality_schedule(88, 60, 4),
            vec![88, 84, 80, 76, 72, 68, 64, 60]
        );
    }

    #[test]
    fn test_quality_schedule_lands_on_floor() {
        assert_eq!(quality_schedule(88, 60, 5), vec![88, 83, 78, 73, 68, 63, 60]);
        assert_eq!(quality_schedule(10, 0, 4), vec![10, 6, 2, 0]);
    }

    #[test]
    fn test_quality_schedule_single_trial() {
        assert_eq!(quality_schedule(60, 60, 4), vec![60]);
        assert_eq!(quality_schedule(50, 60, 4), vec![50]);
        assert_eq!(quality_schedule(88, 60, 0), vec![88]);
    }

    #[test]
    fn test_quality_schedule_bound() {
        for step in 1..=30u8 {
            let schedule = quality_schedule(88, 60, step);
            let bound = (88 - 60 + step as usize - 1) / step as usize + 1;
            assert_eq!(schedule.len(), bound, "step {step}");
            assert_eq!(*schedule.last().unwrap(), 60);
        }
    }

    #[test]
    fn test_encode_options_validate() {
        assert!(EncodeOptions::default().validate().is_ok());
        let bad_step = EncodeOptions { step: 0, ..Default::default() };
        assert!(bad_step.validate().is_err());
        let bad_quality = EncodeOptions { start_quality: 101, ..Default::default() };
        assert!(bad_quality.validate().is_err());
        let bad_effort = EncodeOptions { effort: 7, ..Default::default() };
        assert!(bad_effort.validate().is_err());
    }

    #[test]
    fn test_budget_for() {
        let opts = EncodeOptions::default();
        assert_eq!(opts.budget_for(1234), Some(1234));

        let uncapped = EncodeOptions { cap_to_input_size: false, ..Default::default() };
        assert_eq!(uncapped.budget_for(1234), None);

        let explicit = EncodeOptions { size_budget: Some(99), ..Default::default() };
        assert_eq!(explicit.budget_for(1234), Some(99));
    }

    #[test]
    fn test_encode_webp_produces_webp() {
        let img = RgbaImage::from_pixel(16, 8, Rgba([200, 100, 50, 255]));
        let bytes = encode_webp(&img, 80, 4).unwrap();
        assert!(is_webp(&bytes));
    }

    #[test]
    fn test_encode_empty_grid_fails() {
        let err = encode_webp(&RgbaImage::new(0, 0), 80, 4).unwrap_err();
        assert!(matches!(err, ImageError::EncodingFailure(_)));
    }

    #[test]
    fn test_no_budget_single_trial() {
        let out = encode(&noisy(32, 32), None, 88, 60, 4, 4).unwrap();
        assert_eq!(out.quality, 88);
        assert_eq!(out.attempts.len(), 1);
        assert!(out.met_budget());
    }

    #[test]
    fn test_generous_budget_stops_immediately() {
        let out = encode(&noisy(32, 32), Some(10_000_000), 88, 60, 4, 4).unwrap();
        assert_eq!(out.attempts.len(), 1);
        assert_eq!(out.quality, 88);
    }

    #[test]
    fn test_impossible_budget_returns_floor() {
        let out = encode(&noisy(64, 64), Some(1), 88, 60, 4, 4).unwrap();
        let qualities: Vec<u8> = out.attempts.iter().map(|a| a.quality).collect();
        assert_eq!(qualities, quality_schedule(88, 60, 4));
        assert_eq!(out.quality, 60);
        assert!(!out.met_budget());
        assert_eq!(out.size(), out.attempts.last().unwrap().size);
    }

    #[test]
    fn test_budget_met_at_floor() {
        let img = noisy(64, 64);
        let floor = encode_webp(&img, 60, 4).unwrap().len() as u64;

        let out = encode(&img, Some(floor), 88, 60, 4, 4).unwrap();
        assert!(out.size() <= floor);
        assert!(out.met_budget());
    }

    #[test]
    fn test_search_is_deterministic() {
        let img = noisy(48, 48);
        let budget = encode_webp(&img, 70, 4).unwrap().len() as u64;

        let a = encode(&img, Some(budget), 88, 60, 4, 4).unwrap();
        let b = encode(&img, Some(budget), 88, 60, 4, 4).unwrap();
        assert_eq!(a.attempts, b.attempts);
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn test_encode_to_path_leaves_no_scratch() {
        let dir = TempDir::new().unwrap();
        let out_path = dir.path().join("bottle.webp");
        let encoder = SizeConstrainedEncoder::new(EncodeOptions {
            effort: 4,
            ..Default::default()
        })
        .unwrap();

        let outcome = encoder.encode_to_path(&noisy(48, 48), &out_path, Some(1)).unwrap();

        let written = std::fs::read(&out_path).unwrap();
        assert_eq!(written, outcome.bytes);
        assert_eq!(outcome.quality, 60);

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_encode_to_path_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let out_path = dir.path().join("bottle.webp");
        std::fs::write(&out_path, b"stale").unwrap();

        let encoder = SizeConstrainedEncoder::new(EncodeOptions::default()).unwrap();
        encoder
            .encode_to_path(&RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255])), &out_path, None)
            .unwrap();

        assert!(is_webp(&std::fs::read(&out_path).unwrap()));
    }

    #[cfg(unix)]
    #[test]
    fn test_encode_to_path_mode_matches_plain_create() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let out_path = dir.path().join("bottle.webp");
        let plain = dir.path().join("plain.bin");
        std::fs::File::create(&plain).unwrap();

        let encoder = SizeConstrainedEncoder::new(EncodeOptions::default()).unwrap();
        encoder
            .encode_to_path(&RgbaImage::from_pixel(16, 8, Rgba([9, 9, 9, 255])), &out_path, None)
            .unwrap();

        let mode = |p: &Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&out_path), mode(&plain));
    }

    #[test]
    fn test_encode_to_path_failure_keeps_existing() {
        let dir = TempDir::new().unwrap();
        let out_path = dir.path().join("bottle.webp");
        std::fs::write(&out_path, b"previous").unwrap();

        let encoder = SizeConstrainedEncoder::new(EncodeOptions::default()).unwrap();
        let result = encoder.encode_to_path(&RgbaImage::new(0, 0), &out_path, Some(10));

        assert!(result.is_err());
        assert_eq!(std::fs::read(&out_path).unwrap(), b"previous");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
