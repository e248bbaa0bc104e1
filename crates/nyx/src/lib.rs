//! Nyx - terminal logging for the Morpheus dream journal
//!
//! ## Features
//!
//! - Standard logging levels (info, warn, error, debug, success, verbose)
//! - Multi-line message support with consistent formatting
//! - Banner display for completed interpretations (`announce`)
//! - `tracing` subscriber bootstrap shared by every Morpheus binary
//! - All output to stderr so stdout stays clean for rendered journal entries
//!
//! The durable JSONL event log lives in [`event_log`] behind the `event-log` feature.

use colored::*;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[cfg(feature = "event-log")]
pub mod event_log;

/// Default filter when `--verbose` is off and `RUST_LOG` is unset
pub const QUIET_FILTER: &str = "morpheus=info,nyx=info,warn";
/// Default filter when `--verbose` is on and `RUST_LOG` is unset
pub const VERBOSE_FILTER: &str = "morpheus=debug,nyx=debug,reqwest=info,info";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the built-in filters. Returns `false` when a subscriber
/// was already installed (tests call this more than once).
pub fn init_tracing(verbose: bool) -> bool {
  let fallback = if verbose { VERBOSE_FILTER } else { QUIET_FILTER };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr).with_target(verbose))
    .with(filter)
    .try_init()
    .is_ok()
}

/// Core logging function that handles the actual output
pub fn log(message: &str) {
  for line in message.lines() {
    eprintln!("{line}");
  }
}

/// Format a colored prefix for log messages
fn format_prefix(color: Color, prefix: &str) -> String {
  format!("[{}]{:<width$}", prefix.color(color).bold(), "", width = 7 - prefix.len() - 2)
}

fn log_prefixed(color: Color, prefix: &str, message: &str) {
  let prefix = format_prefix(color, prefix);
  for line in message.lines() {
    log(&format!("{prefix} {line}"));
  }
}

/// Create a banner line of the specified length and character
pub fn banner_line(length: usize, char: char) -> String {
  char.to_string().repeat(length)
}

/// Display a message with a banner around it
pub fn as_banner<F>(log_fn: F, message: &str, width: Option<usize>, border_char: Option<char>)
where
  F: Fn(&str),
{
  let banner = banner_line(width.unwrap_or(50), border_char.unwrap_or('='));

  log_fn(&banner);
  log_fn(message);
  log_fn(&banner);
}

pub fn verbose(message: &str) {
  log_prefixed(Color::Cyan, "verb", message);
}

/// General information
pub fn info(message: &str) {
  log_prefixed(Color::Blue, "info", message);
}

/// Something needs attention, e.g. the device is offline
pub fn warn(message: &str) {
  log_prefixed(Color::Yellow, "warn", message);
}

/// Something went wrong and the current action was abandoned
pub fn error(message: &str) {
  log_prefixed(Color::Red, "error", message);
}

pub fn debug(message: &str) {
  log_prefixed(Color::Magenta, "debug", message);
}

/// Something completed successfully
pub fn success(message: &str) {
  log_prefixed(Color::Green, "sccs", message);
}

/// Banner for a finished interpretation or a completed backup
pub fn announce(message: &str) {
  as_banner(|msg| log(&msg.blue().bold().to_string()), message, Some(50), Some('~'));
}

/// Macros for coverage-excluded logging - these expand with LCOV_EXCL_LINE at call sites
#[macro_export]
macro_rules! info {
  ($msg:expr) => {
    $crate::info($msg); // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! warn {
  ($msg:expr) => {
    $crate::warn($msg); // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! error {
  ($msg:expr) => {
    $crate::error($msg); // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! verbose {
  ($msg:expr) => {
    $crate::verbose($msg); // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! debug {
  ($msg:expr) => {
    $crate::debug($msg); // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! success {
  ($msg:expr) => {
    $crate::success($msg); // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! announce {
  ($msg:expr) => {
    $crate::announce($msg); // LCOV_EXCL_LINE
  };
}
