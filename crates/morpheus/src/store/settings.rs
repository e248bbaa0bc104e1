//! User preferences: colour theme, reminder time, last backup date

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::{LAST_BACKUP_KEY, NOTIFICATIONS_KEY, THEME_KEY};
use crate::error::{MorpheusError, Result};
use crate::kv::KeyValueStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
  #[default]
  Light,
  Dark,
}

impl fmt::Display for Theme {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Theme::Light => f.write_str("light"),
      Theme::Dark => f.write_str("dark"),
    }
  }
}

impl FromStr for Theme {
  type Err = MorpheusError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_lowercase().as_str() {
      "light" => Ok(Theme::Light),
      "dark" => Ok(Theme::Dark),
      other => Err(MorpheusError::InvalidInput(format!("unknown theme '{other}'"))),
    }
  }
}

/// Daily reminder preference; delivery is handled elsewhere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
  pub enabled: bool,
  pub hour: u8,
  pub minute: u8,
}

impl Default for NotificationSettings {
  fn default() -> Self {
    Self { enabled: false, hour: 22, minute: 0 }
  }
}

impl NotificationSettings {
  pub fn validate(&self) -> Result<()> {
    if self.hour > 23 || self.minute > 59 {
      return Err(MorpheusError::InvalidInput(format!(
        "invalid reminder time {:02}:{:02}",
        self.hour, self.minute
      )));
    }
    Ok(())
  }
}

/// Scalar slots are JSON strings; bare strings from older writers are accepted
fn unquote(raw: &str) -> String {
  serde_json::from_str::<String>(raw).unwrap_or_else(|_| raw.trim().to_string())
}

#[derive(Clone)]
pub struct SettingsStore {
  kv: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
  pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
    Self { kv }
  }

  /// Stored theme, `light` when unset or unrecognised
  pub async fn theme(&self) -> Result<Theme> {
    Ok(
      self
        .kv
        .get(THEME_KEY)
        .await?
        .and_then(|raw| unquote(&raw).parse().ok())
        .unwrap_or_default(),
    )
  }

  pub async fn set_theme(&self, theme: Theme) -> Result<()> {
    let raw = serde_json::to_string(&theme).map_err(|e| MorpheusError::serialization(THEME_KEY, e))?;
    self.kv.set(THEME_KEY, &raw).await
  }

  pub async fn notifications(&self) -> Result<NotificationSettings> {
    match self.kv.get(NOTIFICATIONS_KEY).await? {
      Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)
        .map_err(|e| MorpheusError::serialization(NOTIFICATIONS_KEY, e)),
      _ => Ok(NotificationSettings::default()),
    }
  }

  pub async fn set_notifications(&self, settings: NotificationSettings) -> Result<()> {
    settings.validate()?;
    let raw = serde_json::to_string(&settings)
      .map_err(|e| MorpheusError::serialization(NOTIFICATIONS_KEY, e))?;
    self.kv.set(NOTIFICATIONS_KEY, &raw).await
  }

  pub async fn last_backup_date(&self) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = self.kv.get(LAST_BACKUP_KEY).await? else {
      return Ok(None);
    };

    match DateTime::parse_from_rfc3339(&unquote(&raw)) {
      Ok(date) => Ok(Some(date.with_timezone(&Utc))),
      Err(e) => {
        tracing::warn!(error = %e, "ignoring unreadable last backup date");
        Ok(None)
      }
    }
  }

  pub async fn set_last_backup_date(&self, when: DateTime<Utc>) -> Result<()> {
    let raw = serde_json::to_string(&when.to_rfc3339())
      .map_err(|e| MorpheusError::serialization(LAST_BACKUP_KEY, e))?;
    self.kv.set(LAST_BACKUP_KEY, &raw).await
  }
}
