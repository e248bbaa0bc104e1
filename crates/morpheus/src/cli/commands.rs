use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, Utc};
use colored::*;
use std::path::Path;
use std::sync::Arc;

use crate::app::App;
use crate::backup::ExportFormat;
use crate::cli::display::{
  confirm, print_interpretation, print_memory, print_record, print_record_line, read_line,
  StdinConfirmation, TerminalProgress,
};
use crate::memory_recovery::session_record;
use crate::orchestrator::{FixedConfirmation, FlowOutcome, OfflineConfirmation, Submission};
use crate::record::{Emotion, Feedback};
use crate::stats::{DreamStats, StatsPeriod};
use crate::store::{NotificationSettings, Theme};

fn today() -> NaiveDate {
  Utc::now().date_naive()
}

/// Interpret a dream and store the result
pub async fn interpret(
  app: &App,
  text: &str,
  emotion: Option<Emotion>,
  offline: bool,
  yes: bool,
) -> Result<()> {
  let confirmation: Arc<dyn OfflineConfirmation> =
    if yes { Arc::new(FixedConfirmation(true)) } else { Arc::new(StdinConfirmation) };

  let orchestrator =
    app.orchestrator(offline, confirmation)?.with_observer(Arc::new(TerminalProgress::new()));

  match orchestrator.submit(Submission::new(text, emotion)).await {
    FlowOutcome::Completed { record, interpretation, offline } => {
      let title = if offline { "꿈 해석 완료 (오프라인)" } else { "꿈 해석 완료" };
      nyx::announce!(title);
      print_interpretation(&interpretation);
      println!();
      println!("{} 기록에 저장되었습니다 {}", "✓".green(), record.id.dimmed());
      println!(
        "   Rate it with: {}",
        format!("morpheus feedback {} --accurate", record.id).cyan()
      );
      Ok(())
    }
    FlowOutcome::Rejected(notice) => Err(anyhow!(notice)),
    FlowOutcome::Cancelled => {
      println!("Interpretation cancelled.");
      Ok(())
    }
    FlowOutcome::Failed { notice, error } => Err(anyhow::Error::new(error).context(notice)),
  }
}

pub async fn list_dreams(app: &App, verbose: bool) -> Result<()> {
  let dreams = app.dreams.list().await?;
  if dreams.is_empty() {
    println!("No dreams recorded yet.");
    return Ok(());
  }

  let today = today();
  for dream in &dreams {
    print_record_line(dream, today, verbose);
  }
  println!();
  println!("{} {} dreams", "🌙".cyan(), dreams.len());
  Ok(())
}

pub async fn show_dream(app: &App, id: &str) -> Result<()> {
  let dream = app.dreams.get(id).await?.ok_or_else(|| anyhow!("Dream {} not found", id))?;
  print_record(&dream, today());

  if let Some(feedback) = app.feedback.for_dream(id).await? {
    println!();
    let verdict = if feedback.is_accurate { "정확함".green() } else { "부정확함".red() };
    println!("{} {} ({}/5)", "피드백:".dimmed(), verdict, feedback.helpfulness);
    if let Some(suggestions) = &feedback.suggestions {
      println!("  {} {}", "└─".white().dimmed(), suggestions);
    }
  }
  Ok(())
}

pub async fn delete_dream(app: &App, id: &str, force: bool) -> Result<()> {
  if app.dreams.get(id).await?.is_none() {
    return Err(anyhow!("Dream {} not found", id));
  }

  if !force && !confirm(&format!("Are you sure you want to delete dream {}?", id.yellow()))? {
    println!("Delete operation cancelled.");
    return Ok(());
  }

  app.dreams.delete_by_id(id).await?;
  println!("{} Deleted dream {}", "✓".green(), id.yellow());
  Ok(())
}

pub async fn clear_dreams(app: &App, force: bool) -> Result<()> {
  let count = app.dreams.list().await?.len();
  if count == 0 {
    println!("No dreams recorded yet.");
    return Ok(());
  }

  if !force && !confirm(&format!("Delete all {count} dreams? This cannot be undone."))? {
    println!("Clear operation cancelled.");
    return Ok(());
  }

  app.dreams.clear().await?;
  println!("{} Cleared {} dreams", "✓".green(), count);
  Ok(())
}

pub async fn give_feedback(
  app: &App,
  id: &str,
  accurate: bool,
  helpfulness: Option<u8>,
  suggestion: Option<String>,
) -> Result<()> {
  if app.dreams.get(id).await?.is_none() {
    nyx::warn!(&format!("No dream with id {id}; feedback is stored anyway"));
  }

  let feedback = match helpfulness {
    Some(score) => Feedback::new(id, accurate, score, suggestion)?,
    None if suggestion.is_some() => Feedback::new(id, accurate, if accurate { 5 } else { 1 }, suggestion)?,
    None => Feedback::quick(id, accurate),
  };

  app.feedback.append(feedback).await?;
  println!("{} 피드백이 저장되었습니다", "✓".green());
  Ok(())
}

pub async fn show_stats(app: &App, period: StatsPeriod) -> Result<()> {
  let dreams = app.dreams.list().await?;
  let stats = DreamStats::compute(&dreams, period, today());
  let feedback = app.feedback.stats().await?;

  println!("{} {}", "📊".cyan(), "꿈 통계".bold());
  println!("  총 꿈 기록: {}", stats.total_dreams.to_string().bold());
  println!("  평균 신뢰도: {:.1}%", stats.average_confidence * 100.0);
  println!("  주간 꿈 빈도: {:.1}개", stats.dream_frequency);

  if !stats.emotion_counts.is_empty() {
    println!();
    println!("{}", "감정 분포".bold());
    for (emotion, count) in &stats.emotion_counts {
      let share = *count as f64 / stats.total_dreams as f64 * 100.0;
      println!("  {:<10} {} ({:.1}%)", emotion, count, share);
    }
  }

  if !stats.monthly_counts.is_empty() {
    println!();
    println!("{}", "월별 기록".bold());
    for (month, count) in &stats.monthly_counts {
      println!("  {} {}", month.cyan(), count);
    }
  }

  if !stats.most_common_words.is_empty() {
    println!();
    println!("{}", "자주 나타나는 단어".bold());
    for word in &stats.most_common_words {
      println!("  {} {}", word.word.yellow(), word.count);
    }
  }

  if feedback.total_feedback > 0 {
    println!();
    println!("{}", "피드백".bold());
    println!("  총 피드백: {}", feedback.total_feedback);
    println!("  정확도: {:.1}%", feedback.accuracy_rate);
    println!("  평균 도움 정도: {:.1}/5", feedback.average_helpfulness);
  }
  Ok(())
}

pub async fn export(app: &App, format: ExportFormat) -> Result<()> {
  let path = app.backup().export(format, Utc::now()).await.context("failed to export journal")?;
  nyx::success!(&format!("Exported journal to {}", path.display()));
  Ok(())
}

pub async fn import(app: &App, file: &Path) -> Result<()> {
  let summary = app
    .backup()
    .import_from_file(file)
    .await
    .with_context(|| format!("failed to import {}", file.display()))?;

  println!(
    "{} Restored {} dreams and {} feedback entries",
    "✓".green(),
    summary.dreams,
    summary.feedback
  );
  Ok(())
}

pub async fn backup_info(app: &App) -> Result<()> {
  let info = app.backup().backup_info(Utc::now()).await?;

  println!("{} {}", "💾".cyan(), "백업 정보".bold());
  println!("  총 꿈 기록: {}", info.total_dreams);
  println!("  총 피드백: {}", info.total_feedback);
  match info.last_backup_date {
    Some(date) => println!("  마지막 백업: {}", date.format("%Y-%m-%d %H:%M").to_string().cyan()),
    None => println!("  마지막 백업: {}", "없음".dimmed()),
  }
  println!("  예상 크기: {}", info.backup_size);
  Ok(())
}

pub async fn set_theme(app: &App, theme: Theme) -> Result<()> {
  app.settings.set_theme(theme).await?;
  println!("{} Theme set to {}", "✓".green(), theme.to_string().cyan());
  Ok(())
}

pub async fn set_notifications(
  app: &App,
  enable: bool,
  disable: bool,
  hour: Option<u8>,
  minute: Option<u8>,
) -> Result<()> {
  let mut settings = app.settings.notifications().await?;
  if enable {
    settings.enabled = true;
  }
  if disable {
    settings.enabled = false;
  }
  settings.hour = hour.unwrap_or(settings.hour);
  settings.minute = minute.unwrap_or(settings.minute);

  app.settings.set_notifications(settings).await?;
  println!("{} Reminders {}", "✓".green(), describe_notifications(&settings));
  Ok(())
}

fn describe_notifications(settings: &NotificationSettings) -> String {
  if settings.enabled {
    format!("on at {:02}:{:02}", settings.hour, settings.minute)
  } else {
    "off".to_string()
  }
}

pub async fn show_settings(app: &App) -> Result<()> {
  let theme = app.settings.theme().await?;
  let notifications = app.settings.notifications().await?;

  println!("{} {}", "⚙".cyan(), "설정".bold());
  println!("  theme: {}", theme.to_string().cyan());
  println!("  reminders: {}", describe_notifications(&notifications));
  println!("  data: {}", app.config.data_dir.display());
  println!("  model: {}", app.config.remote.model);
  Ok(())
}

/// Interactive recovery: five questions, answers from stdin, then analysis
pub async fn recall_memory(app: &App, description: &str) -> Result<()> {
  if description.trim().is_empty() {
    return Err(anyhow!("기억하고 싶은 상황을 설명해주세요."));
  }

  let recovery = app.memory_recovery();
  println!("{} 질문을 준비하고 있습니다...", "🧠".cyan());
  let questions = recovery.generate_questions(description).await;

  let mut clues = Vec::with_capacity(questions.len());
  for (index, question) in questions.iter().enumerate() {
    println!();
    println!("{} {}", format!("[{}/{}]", index + 1, questions.len()).dimmed(), question.bold());
    loop {
      match read_line("> ")? {
        Some(answer) if !answer.is_empty() => {
          clues.push(answer);
          break;
        }
        Some(_) => println!("답변을 입력해주세요."),
        None => return Err(anyhow!("Input ended before all questions were answered")),
      }
    }
  }

  println!();
  println!("{} 단서를 분석하고 있습니다...", "🧠".cyan());
  let analysis = recovery.analyze(description, &clues).await;
  let record = app.memories.append(session_record(Utc::now(), description, clues, analysis)).await?;

  println!();
  println!("{}", "기억 분석".bold());
  println!("{}", record.analysis.as_deref().unwrap_or_default());
  println!();
  println!("{}", "복원된 기억".bold());
  println!("{}", record.recovered_memory.as_deref().unwrap_or_default());
  println!();
  println!("{} 기억 복원 기록이 저장되었습니다 {}", "✓".green(), record.id.dimmed());
  Ok(())
}

pub async fn list_memories(app: &App) -> Result<()> {
  let memories = app.memories.list().await?;
  if memories.is_empty() {
    println!("No memory sessions yet.");
    return Ok(());
  }

  let today = today();
  for memory in &memories {
    print_memory(memory, today);
  }
  Ok(())
}

pub async fn delete_memory(app: &App, id: &str, force: bool) -> Result<()> {
  if !force && !confirm(&format!("Are you sure you want to delete memory session {}?", id.yellow()))? {
    println!("Delete operation cancelled.");
    return Ok(());
  }

  if app.memories.delete_by_id(id).await? {
    println!("{} Deleted memory session {}", "✓".green(), id.yellow());
    Ok(())
  } else {
    Err(anyhow!("Memory session {} not found", id))
  }
}

/// Query the event log
pub async fn logs(app: &App, limit: usize, level: &str) -> Result<()> {
  let entries = app.events.get_logs(Some(limit), Some(level)).await?;

  if entries.is_empty() {
    println!("No logs found.");
    return Ok(());
  }

  for entry in entries {
    let level_colored = match entry.level.as_str() {
      "error" => entry.level.red().bold(),
      "warn" => entry.level.yellow().bold(),
      "info" => entry.level.blue().bold(),
      "debug" => entry.level.green(),
      "success" => entry.level.bright_green().bold(),
      _ => entry.level.normal(),
    };

    println!(
      "{} [{}] {} {}",
      entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().cyan(),
      level_colored,
      entry.component.dimmed(),
      entry.message
    );

    if let Some(context) = &entry.context {
      let mut parts = Vec::new();
      if let Some(dream_id) = &context.dream_id {
        parts.push(format!("dream: {}", dream_id.bright_blue()));
      }
      if let Some(outcome) = &context.outcome {
        parts.push(format!("outcome: {}", outcome.magenta()));
      }
      if let Some(duration) = context.duration_ms {
        parts.push(format!("duration: {}", format!("{duration:.0}ms").yellow()));
      }
      for part in parts {
        println!("  {} {}", "└─".white().dimmed(), part);
      }
    }
  }
  Ok(())
}
