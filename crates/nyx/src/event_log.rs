//! Durable event log for Morpheus
//!
//! Append-only JSONL file of interpretation and persistence events:
//! - every failure that ends a user action is recorded, not just printed
//! - async access is serialized through an internal mutex
//! - console echo through the nyx macros unless the log is silent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Extra detail attached to an event
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct EventContext {
  /// Dream record the event refers to
  #[serde(skip_serializing_if = "Option::is_none")]
  pub dream_id: Option<String>,

  /// Which interpretation path produced the result (local, remote, fallback)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub outcome: Option<String>,

  /// Wall time of the action in milliseconds
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration_ms: Option<f64>,
}

/// A single line of the event log
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EventEntry {
  pub timestamp: DateTime<Utc>,
  pub level: String,
  pub message: String,
  pub component: String,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub context: Option<EventContext>,
}

struct EventLogInner {
  path: PathBuf,
  silent: bool,
}

/// Thread-safe JSONL event log
#[derive(Clone)]
pub struct EventLog {
  inner: Arc<Mutex<EventLogInner>>,
}

impl EventLogInner {
  fn open(path: &Path, silent: bool) -> std::io::Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }

    // Create but never truncate
    if !path.exists() {
      std::fs::File::create(path)?;
    }

    Ok(Self { path: path.to_path_buf(), silent })
  }

  fn append(&mut self, entry: &EventEntry) -> std::io::Result<()> {
    use std::fs::OpenOptions;
    use std::io::Write;

    let json_line = serde_json::to_string(entry)
      .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
    writeln!(file, "{json_line}")?;
    file.flush()
  }

  /// Most recent `limit` entries, returned oldest first
  fn read(&self, limit: Option<usize>, level_filter: Option<&str>) -> std::io::Result<Vec<EventEntry>> {
    use std::io::{BufRead, BufReader};

    if !self.path.exists() {
      return Ok(Vec::new());
    }

    let reader = BufReader::new(std::fs::File::open(&self.path)?);
    let mut entries = Vec::new();

    for line in reader.lines() {
      let line = line?;
      if line.trim().is_empty() {
        continue;
      }

      // Malformed lines are skipped
      let Ok(entry) = serde_json::from_str::<EventEntry>(&line) else {
        continue;
      };

      if level_filter.is_none_or(|filter| filter == "all" || entry.level == filter) {
        entries.push(entry);
      }
    }

    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    if let Some(limit) = limit {
      entries.truncate(limit);
    }
    entries.reverse();

    Ok(entries)
  }
}

impl EventLog {
  /// Open (or create) the log at `path`; `silent` turns off console echo
  pub fn open_with_silent<P: AsRef<Path>>(path: P, silent: bool) -> std::io::Result<Self> {
    let inner = EventLogInner::open(path.as_ref(), silent)?;
    Ok(Self { inner: Arc::new(Mutex::new(inner)) })
  }

  /// Append an event
  pub async fn record(
    &self,
    level: &str,
    message: &str,
    component: &str,
    context: Option<EventContext>,
  ) -> std::io::Result<()> {
    let entry = EventEntry {
      timestamp: Utc::now(),
      level: level.to_string(),
      message: message.to_string(),
      component: component.to_string(),
      context,
    };

    let mut guard = self.inner.lock().await;
    guard.append(&entry)
  }

  /// Append an event, ignoring I/O errors
  pub async fn log(&self, level: &str, message: &str, component: &str, context: Option<EventContext>) {
    if let Err(e) = self.record(level, message, component, context).await {
      tracing::warn!(error = %e, "failed to append to event log");
    }
  }

  /// Query the log with optional level filter ("all" disables filtering)
  pub async fn get_logs(
    &self,
    limit: Option<usize>,
    level_filter: Option<&str>,
  ) -> std::io::Result<Vec<EventEntry>> {
    let guard = self.inner.lock().await;
    guard.read(limit, level_filter)
  }

  async fn is_silent(&self) -> bool {
    self.inner.lock().await.silent
  }

  pub async fn info(&self, message: &str, component: &str, context: Option<EventContext>) {
    self.log("info", message, component, context).await;
    if !self.is_silent().await {
      crate::info!(message);
    }
  }

  pub async fn warn(&self, message: &str, component: &str, context: Option<EventContext>) {
    self.log("warn", message, component, context).await;
    if !self.is_silent().await {
      crate::warn!(message);
    }
  }

  pub async fn error(&self, message: &str, component: &str, context: Option<EventContext>) {
    self.log("error", message, component, context).await;
    if !self.is_silent().await {
      crate::error!(message);
    }
  }
}
