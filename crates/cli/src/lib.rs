//! Terminal helpers for the packshot CLI
//!
//! - Status lines for per-image outcomes
//! - Size and duration formatting
//! - Batch progress bar

#![warn(missing_docs)]

pub mod output;
pub mod progress;
