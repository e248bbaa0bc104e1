//! Journal export and import
//!
//! Exports write `dream_backup_YYYY-MM-DD.{json,html}` into the export
//! directory. Import replaces the journal with a backup's content; if any write
//! fails the previous content is put back before the error is returned.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MorpheusError, Result};
use crate::record::{DreamRecord, Feedback};
use crate::store::{DreamStore, FeedbackStore, NotificationSettings, SettingsStore, Theme};

pub const BACKUP_VERSION: &str = "1.0.0";
const INVALID_BACKUP_NOTICE: &str = "잘못된 백업 파일 형식입니다.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
  #[default]
  Json,
  Html,
}

impl ExportFormat {
  fn extension(&self) -> &'static str {
    match self {
      ExportFormat::Json => "json",
      ExportFormat::Html => "html",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BackupSettings {
  #[serde(default)]
  pub theme: Theme,
  #[serde(default)]
  pub notifications: NotificationSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupData {
  pub dreams: Vec<DreamRecord>,
  pub feedback: Vec<Feedback>,
  pub settings: BackupSettings,
  pub export_date: DateTime<Utc>,
  pub version: String,
}

/// What import accepts: only `dreams` is required
#[derive(Debug, Deserialize)]
struct ImportPayload {
  dreams: Vec<DreamRecord>,
  #[serde(default)]
  feedback: Vec<Feedback>,
  #[serde(default)]
  settings: Option<BackupSettings>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
  pub dreams: usize,
  pub feedback: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupInfo {
  pub total_dreams: usize,
  pub total_feedback: usize,
  pub last_backup_date: Option<DateTime<Utc>>,
  /// Size of the compact JSON backup, e.g. `"1.25 KB"`
  pub backup_size: String,
}

/// Journal content captured before an import overwrites it
struct Snapshot {
  dreams: Vec<DreamRecord>,
  feedback: Vec<Feedback>,
  theme: Theme,
  notifications: NotificationSettings,
}

pub struct BackupService {
  dreams: DreamStore,
  feedback: FeedbackStore,
  settings: SettingsStore,
  export_dir: PathBuf,
}

impl BackupService {
  pub fn new(
    dreams: DreamStore,
    feedback: FeedbackStore,
    settings: SettingsStore,
    export_dir: impl Into<PathBuf>,
  ) -> Self {
    Self { dreams, feedback, settings, export_dir: export_dir.into() }
  }

  pub async fn create_backup(&self, now: DateTime<Utc>) -> Result<BackupData> {
    Ok(BackupData {
      dreams: self.dreams.list().await?,
      feedback: self.feedback.list().await?,
      settings: BackupSettings {
        theme: self.settings.theme().await?,
        notifications: self.settings.notifications().await?,
      },
      export_date: now,
      version: BACKUP_VERSION.to_string(),
    })
  }

  pub fn file_name(format: ExportFormat, day: NaiveDate) -> String {
    format!("dream_backup_{}.{}", day.format("%Y-%m-%d"), format.extension())
  }

  /// Write a backup file and remember when it was taken
  pub async fn export(&self, format: ExportFormat, now: DateTime<Utc>) -> Result<PathBuf> {
    let backup = self.create_backup(now).await?;
    let content = match format {
      ExportFormat::Json => serde_json::to_string_pretty(&backup)
        .map_err(|e| MorpheusError::serialization("backup", e))?,
      ExportFormat::Html => render_html(&backup),
    };

    tokio::fs::create_dir_all(&self.export_dir).await?;
    let path = self.export_dir.join(Self::file_name(format, now.date_naive()));
    tokio::fs::write(&path, content).await?;

    self.settings.set_last_backup_date(now).await?;
    tracing::info!(path = %path.display(), dreams = backup.dreams.len(), "backup exported");
    Ok(path)
  }

  pub async fn import_from_file(&self, path: &Path) -> Result<ImportSummary> {
    let raw = tokio::fs::read_to_string(path).await?;
    self.import_from_str(&raw).await
  }

  pub async fn import_from_str(&self, raw: &str) -> Result<ImportSummary> {
    let payload = parse_backup(raw)?;
    let snapshot = Snapshot {
      dreams: self.dreams.list().await?,
      feedback: self.feedback.list().await?,
      theme: self.settings.theme().await?,
      notifications: self.settings.notifications().await?,
    };

    if let Err(e) = self.write_payload(&payload).await {
      tracing::warn!(error = %e, "import failed, restoring previous journal");
      self.restore(&snapshot).await;
      return Err(e);
    }

    let summary = ImportSummary { dreams: payload.dreams.len(), feedback: payload.feedback.len() };
    tracing::info!(dreams = summary.dreams, feedback = summary.feedback, "backup imported");
    Ok(summary)
  }

  async fn write_payload(&self, payload: &ImportPayload) -> Result<()> {
    self.dreams.replace_all(&payload.dreams).await?;
    self.feedback.replace_all(&payload.feedback).await?;
    if let Some(settings) = &payload.settings {
      self.settings.set_theme(settings.theme).await?;
      self.settings.set_notifications(settings.notifications).await?;
    }
    Ok(())
  }

  /// Best effort: each failed restore is logged, the import error still wins
  async fn restore(&self, snapshot: &Snapshot) {
    if let Err(e) = self.dreams.replace_all(&snapshot.dreams).await {
      tracing::error!(error = %e, "failed to restore dream records");
    }
    if let Err(e) = self.feedback.replace_all(&snapshot.feedback).await {
      tracing::error!(error = %e, "failed to restore feedback");
    }
    if let Err(e) = self.settings.set_theme(snapshot.theme).await {
      tracing::error!(error = %e, "failed to restore theme");
    }
    if let Err(e) = self.settings.set_notifications(snapshot.notifications).await {
      tracing::error!(error = %e, "failed to restore notification settings");
    }
  }

  pub async fn backup_info(&self, now: DateTime<Utc>) -> Result<BackupInfo> {
    let backup = self.create_backup(now).await?;
    let compact =
      serde_json::to_string(&backup).map_err(|e| MorpheusError::serialization("backup", e))?;

    Ok(BackupInfo {
      total_dreams: backup.dreams.len(),
      total_feedback: backup.feedback.len(),
      last_backup_date: self.settings.last_backup_date().await?,
      backup_size: format!("{:.2} KB", compact.len() as f64 / 1024.0),
    })
  }
}

fn parse_backup(raw: &str) -> Result<ImportPayload> {
  let value: serde_json::Value = serde_json::from_str(raw)
    .map_err(|e| MorpheusError::InvalidBackup(format!("{INVALID_BACKUP_NOTICE} ({e})")))?;

  if !value.get("dreams").is_some_and(|d| d.is_array()) {
    return Err(MorpheusError::InvalidBackup(INVALID_BACKUP_NOTICE.to_string()));
  }

  serde_json::from_value(value)
    .map_err(|e| MorpheusError::InvalidBackup(format!("{INVALID_BACKUP_NOTICE} ({e})")))
}

fn escape_html(text: &str) -> String {
  let mut escaped = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '&' => escaped.push_str("&amp;"),
      '<' => escaped.push_str("&lt;"),
      '>' => escaped.push_str("&gt;"),
      '"' => escaped.push_str("&quot;"),
      '\'' => escaped.push_str("&#39;"),
      _ => escaped.push(c),
    }
  }
  escaped
}

fn korean_date(date: NaiveDate) -> String {
  date.format("%Y. %-m. %-d.").to_string()
}

pub fn render_html(backup: &BackupData) -> String {
  let mut html = format!(
    r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <title>꿈 기록 백업</title>
  <style>
    body {{ font-family: Arial, sans-serif; margin: 20px; }}
    .header {{ text-align: center; margin-bottom: 30px; }}
    .dream {{ margin-bottom: 20px; padding: 15px; border: 1px solid #ddd; border-radius: 8px; }}
    .dream-date {{ font-weight: bold; color: #666; }}
    .dream-content {{ margin: 10px 0; }}
    .dream-emotion {{ color: #007bff; }}
    .dream-interpretation {{ background-color: #f8f9fa; padding: 10px; border-radius: 4px; margin-top: 10px; }}
  </style>
</head>
<body>
  <div class="header">
    <h1>🌙 꿈 기록 백업</h1>
    <p>내보내기 날짜: {}</p>
    <p>총 꿈 기록: {}개</p>
  </div>
"#,
    korean_date(backup.export_date.date_naive()),
    backup.dreams.len()
  );

  for dream in &backup.dreams {
    html.push_str(&format!(
      r#"  <div class="dream">
    <div class="dream-date">{}</div>
    <div class="dream-content"><strong>꿈 내용:</strong> {}</div>
    <div class="dream-emotion"><strong>감정:</strong> {}</div>
    <div class="dream-interpretation"><strong>해석:</strong> {}</div>
"#,
      korean_date(dream.date),
      escape_html(&dream.content),
      dream.emotion.map(|e| e.label()).unwrap_or(""),
      escape_html(&dream.interpretation),
    ));
    if !dream.recommendations.is_empty() {
      html.push_str(&format!(
        "    <div><strong>추천사항:</strong> {}</div>\n",
        escape_html(&dream.recommendations.join(", "))
      ));
    }
    html.push_str("  </div>\n");
  }

  html.push_str("</body>\n</html>\n");
  html
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_file_name() {
    let day = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
    assert_eq!(BackupService::file_name(ExportFormat::Json, day), "dream_backup_2024-01-05.json");
    assert_eq!(BackupService::file_name(ExportFormat::Html, day), "dream_backup_2024-01-05.html");
  }

  #[test]
  fn test_escape_html() {
    assert_eq!(escape_html(r#"<b>"꿈" & 'dream'</b>"#), "&lt;b&gt;&quot;꿈&quot; &amp; &#39;dream&#39;&lt;/b&gt;");
  }

  #[test]
  fn test_parse_requires_dreams_array() {
    assert!(matches!(parse_backup("not json"), Err(MorpheusError::InvalidBackup(_))));
    assert!(matches!(parse_backup(r#"{"feedback": []}"#), Err(MorpheusError::InvalidBackup(_))));
    assert!(matches!(parse_backup(r#"{"dreams": {}}"#), Err(MorpheusError::InvalidBackup(_))));

    let payload = parse_backup(r#"{"dreams": []}"#).unwrap();
    assert!(payload.dreams.is_empty());
    assert!(payload.feedback.is_empty());
    assert!(payload.settings.is_none());
  }

  #[test]
  fn test_html_escapes_record_text() {
    let dream: DreamRecord = serde_json::from_value(serde_json::json!({
      "id": "1",
      "content": "<script>alert(1)</script>",
      "emotion": "fear",
      "interpretation": "A & B",
      "date": "2024-03-09",
      "confidence": 0.3,
      "recommendations": ["쉬기", "<걷기>"],
    }))
    .unwrap();
    let backup = BackupData {
      dreams: vec![dream],
      feedback: vec![],
      settings: BackupSettings::default(),
      export_date: DateTime::parse_from_rfc3339("2024-03-10T08:00:00Z").unwrap().with_timezone(&Utc),
      version: BACKUP_VERSION.to_string(),
    };

    let html = render_html(&backup);
    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(!html.contains("<script>"));
    assert!(html.contains("A &amp; B"));
    assert!(html.contains("쉬기, &lt;걷기&gt;"));
    assert!(html.contains("<strong>감정:</strong> 두려움"));
    assert!(html.contains("내보내기 날짜: 2024. 3. 10."));
    assert!(html.contains("총 꿈 기록: 1개"));
  }
}
