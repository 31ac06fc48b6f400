//! Progress indicators for batch runs.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const FILE_TEMPLATE: &str = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} images ({eta})";

/// Progress bar over `total` images.
///
/// Hidden when `visible` is false (e.g. `--json` output). indicatif also hides
/// it on its own when stderr is not a terminal.
pub fn file_progress(total: u64, visible: bool) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if !visible {
        pb.set_draw_target(ProgressDrawTarget::hidden());
        return pb;
    }

    let style = ProgressStyle::default_bar()
        .template(FILE_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░");
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
