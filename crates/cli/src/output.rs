//! Terminal output utilities
//!
//! Consistent status lines and number formatting for the packshot CLI.

use owo_colors::{OwoColorize, Stream};
use std::fmt;

/// Outcome tag printed at the start of a per-image line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    /// Output written
    Ok,
    /// Output already existed
    Skip,
    /// Image failed
    Error,
}

impl Badge {
    fn label(self) -> &'static str {
        match self {
            Badge::Ok => "OK",
            Badge::Skip => "SKIP",
            Badge::Error => "ERROR",
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Pad before colouring so escape codes don't break alignment.
        let label = format!("{:<5}", self.label());
        match self {
            Badge::Ok => write!(f, "{}", label.if_supports_color(Stream::Stdout, |t| t.green())),
            Badge::Skip => write!(f, "{}", label.if_supports_color(Stream::Stdout, |t| t.yellow())),
            Badge::Error => write!(f, "{}", label.if_supports_color(Stream::Stdout, |t| t.red())),
        }
    }
}

/// `<BADGE> <message>`
pub fn status_line(badge: Badge, message: &str) -> String {
    format!("{} {}", badge, message)
}

/// Status message helpers
pub struct Status;

impl Status {
    /// Print a success message
    pub fn success(message: &str) {
        println!("{} {}", "✓".if_supports_color(Stream::Stdout, |t| t.green()), message);
    }

    /// Print an error message
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".if_supports_color(Stream::Stderr, |t| t.red()), message);
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".if_supports_color(Stream::Stderr, |t| t.yellow()), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".if_supports_color(Stream::Stdout, |t| t.blue()), message);
    }

    /// Print a header
    pub fn header(message: &str) {
        println!();
        println!("{}", message.if_supports_color(Stream::Stdout, |t| t.bold()));
        println!("{}", "─".repeat(message.chars().count()));
    }

    /// Print an aligned `key: value` line
    pub fn field(key: &str, value: impl fmt::Display) {
        println!("  {:<10} {}", key.if_supports_color(Stream::Stdout, |t| t.dimmed()), value);
    }
}

/// Format a duration for display
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs_f32();
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let mins = (secs / 60.0).floor();
        let remaining_secs = secs % 60.0;
        format!("{}m {:.0}s", mins, remaining_secs)
    }
}

/// Format a file size for display
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// `size` relative to `budget`, e.g. `41.2 KB / 50.0 KB`
pub fn format_budget(size: u64, budget: Option<u64>) -> String {
    match budget {
        Some(budget) => format!("{} / {}", format_size(size), format_size(budget)),
        None => format_size(size),
    }
}

/// Format a count with singular/plural
pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}
