use chrono::{TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;

use morpheus::backup::{BackupData, BackupService, ExportFormat};
use morpheus::interpret::RuleBasedInterpreter;
use morpheus::kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
use morpheus::record::{DreamRecord, Emotion, Feedback};
use morpheus::store::{
  DreamStore, FeedbackStore, NotificationSettings, SettingsStore, Theme, FEEDBACK_KEY,
};
use morpheus::MorpheusError;

struct Journal {
  dreams: DreamStore,
  feedback: FeedbackStore,
  settings: SettingsStore,
  service: BackupService,
}

fn journal(kv: Arc<dyn KeyValueStore>, export_dir: &std::path::Path) -> Journal {
  let dreams = DreamStore::new(kv.clone());
  let feedback = FeedbackStore::new(kv.clone());
  let settings = SettingsStore::new(kv);
  let service = BackupService::new(dreams.clone(), feedback.clone(), settings.clone(), export_dir);
  Journal { dreams, feedback, settings, service }
}

fn dream(millis: i64, content: &str, emotion: Option<Emotion>) -> DreamRecord {
  let now = Utc.timestamp_millis_opt(millis).unwrap();
  let interpretation = RuleBasedInterpreter::new().analyze(content, emotion);
  DreamRecord::from_interpretation(now, content, emotion, &interpretation)
}

async fn seed(journal: &Journal) -> DreamRecord {
  let stored = journal
    .dreams
    .append(dream(1_710_000_000_000, "친구에게 쫓기다가 <숨는> 꿈", Some(Emotion::Fear)))
    .await
    .unwrap();
  journal.feedback.append(Feedback::new(&stored.id, false, 2, Some("너무 짧아요".into())).unwrap()).await.unwrap();
  journal.settings.set_theme(Theme::Dark).await.unwrap();
  journal
    .settings
    .set_notifications(NotificationSettings { enabled: true, hour: 22, minute: 15 })
    .await
    .unwrap();
  stored
}

#[tokio::test]
async fn test_json_export_restores_into_fresh_journal() {
  let temp = TempDir::new().unwrap();
  let source = journal(Arc::new(FileKeyValueStore::new(temp.path().join("a"))), temp.path());
  let stored = seed(&source).await;

  let now = Utc.with_ymd_and_hms(2024, 3, 12, 9, 0, 0).unwrap();
  let path = source.service.export(ExportFormat::Json, now).await.unwrap();
  assert_eq!(path.file_name().unwrap(), "dream_backup_2024-03-12.json");
  assert_eq!(source.settings.last_backup_date().await.unwrap(), Some(now));

  let raw = std::fs::read_to_string(&path).unwrap();
  let parsed: BackupData = serde_json::from_str(&raw).unwrap();
  assert_eq!(parsed.version, "1.0.0");
  assert_eq!(parsed.dreams, vec![stored.clone()]);

  let target = journal(Arc::new(MemoryKeyValueStore::new()), temp.path());
  let summary = target.service.import_from_file(&path).await.unwrap();
  assert_eq!((summary.dreams, summary.feedback), (1, 1));

  assert_eq!(target.dreams.list().await.unwrap(), vec![stored]);
  assert_eq!(target.feedback.list().await.unwrap(), source.feedback.list().await.unwrap());
  assert_eq!(target.settings.theme().await.unwrap(), Theme::Dark);
  assert_eq!(target.settings.notifications().await.unwrap().hour, 22);
}

#[tokio::test]
async fn test_html_export_escapes_content() {
  let temp = TempDir::new().unwrap();
  let source = journal(Arc::new(MemoryKeyValueStore::new()), temp.path());
  seed(&source).await;

  let now = Utc.with_ymd_and_hms(2024, 3, 12, 9, 0, 0).unwrap();
  let path = source.service.export(ExportFormat::Html, now).await.unwrap();
  assert_eq!(path.file_name().unwrap(), "dream_backup_2024-03-12.html");

  let html = std::fs::read_to_string(&path).unwrap();
  assert!(html.contains("&lt;숨는&gt;"));
  assert!(!html.contains("<숨는>"));
}

#[tokio::test]
async fn test_import_without_dreams_array_is_rejected() {
  let temp = TempDir::new().unwrap();
  let target = journal(Arc::new(MemoryKeyValueStore::new()), temp.path());
  let existing = seed(&target).await;

  for raw in [r#"{"feedback": []}"#, r#"{"dreams": "none"}"#, "not json"] {
    let err = target.service.import_from_str(raw).await.unwrap_err();
    assert!(matches!(err, MorpheusError::InvalidBackup(_)), "{raw}: {err}");
  }

  assert_eq!(target.dreams.list().await.unwrap(), vec![existing]);
}

#[tokio::test]
async fn test_failed_import_restores_previous_dreams() {
  let temp = TempDir::new().unwrap();
  let kv = Arc::new(MemoryKeyValueStore::new());
  let target = journal(kv.clone(), temp.path());
  let existing = seed(&target).await;

  let incoming = dream(1_720_000_000_000, "하늘을 나는 꿈", None);
  let backup = serde_json::json!({
    "dreams": [incoming],
    "feedback": [Feedback::quick(&incoming.id, true)],
  });

  kv.fail_writes_to(FEEDBACK_KEY);
  let result = target.service.import_from_str(&backup.to_string()).await;
  assert!(matches!(result, Err(MorpheusError::Storage { .. })));

  kv.heal();
  assert_eq!(target.dreams.list().await.unwrap(), vec![existing]);
  assert_eq!(target.feedback.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_backup_info_reports_counts() {
  let temp = TempDir::new().unwrap();
  let target = journal(Arc::new(MemoryKeyValueStore::new()), temp.path());

  let now = Utc.with_ymd_and_hms(2024, 3, 12, 9, 0, 0).unwrap();
  let empty = target.service.backup_info(now).await.unwrap();
  assert_eq!((empty.total_dreams, empty.total_feedback), (0, 0));
  assert_eq!(empty.last_backup_date, None);

  seed(&target).await;
  let info = target.service.backup_info(now).await.unwrap();
  assert_eq!((info.total_dreams, info.total_feedback), (1, 1));
  assert!(info.backup_size.ends_with(" KB"));
}
