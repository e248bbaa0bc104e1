//! Display formatting utilities for CLI output

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use colored::*;
use std::io::{IsTerminal, Write};

use crate::interpret::{Interpretation, InterpretationOutcome};
use crate::orchestrator::{FlowObserver, FlowState, OfflineConfirmation, PROGRESS_DONE};
use crate::record::{DreamRecord, MemoryRecord, MemoryStatus};

/// "오늘", "어제", otherwise `M월 D일`
pub fn relative_day_label(date: NaiveDate, today: NaiveDate) -> String {
  match (today - date).num_days() {
    0 => "오늘".to_string(),
    1 => "어제".to_string(),
    _ => format!("{}월 {}일", date.month(), date.day()),
  }
}

pub fn emotion_badge(record: &DreamRecord) -> String {
  match record.emotion {
    Some(emotion) => format!("{} {}", emotion.emoji(), emotion.label()),
    None => String::new(),
  }
}

/// Shorten to `max` characters, appending an ellipsis
pub fn truncate(text: &str, max: usize) -> String {
  let flat = text.replace('\n', " ");
  if flat.chars().count() <= max {
    flat
  } else {
    format!("{}…", flat.chars().take(max).collect::<String>())
  }
}

fn confidence_label(confidence: f64) -> ColoredString {
  let text = format!("{:.0}%", confidence * 100.0);
  if confidence >= 0.7 {
    text.green()
  } else if confidence >= 0.4 {
    text.yellow()
  } else {
    text.red()
  }
}

pub fn print_interpretation(result: &Interpretation) {
  let source = match result.outcome {
    InterpretationOutcome::Remote => "AI 해석".cyan(),
    InterpretationOutcome::Local => "기본 해석 (오프라인)".yellow(),
    InterpretationOutcome::Fallback => "AI 서비스 응답 없음".red(),
  };

  println!("{} {}", "🔮".cyan(), source.bold());
  if !result.themes.is_empty() {
    println!("  {} {}", "테마:".dimmed(), result.themes.join(", ").blue());
  }
  println!("  {} {}", "신뢰도:".dimmed(), confidence_label(result.confidence));
  println!();
  println!("{}", result.interpretation);
  println!();
  println!("{}", "추천사항".bold());
  for recommendation in &result.recommendations {
    println!("  {} {}", "•".green(), recommendation);
  }
}

pub fn print_record_line(record: &DreamRecord, today: NaiveDate, verbose: bool) {
  println!(
    "{} {} {} {}",
    record.id.dimmed(),
    relative_day_label(record.date, today).cyan(),
    emotion_badge(record),
    truncate(&record.content, 40).bold()
  );
  if verbose {
    println!("  {} {}", "└─".white().dimmed(), truncate(&record.interpretation, 80));
  }
}

pub fn print_record(record: &DreamRecord, today: NaiveDate) {
  println!("{} {}", "📅".cyan(), relative_day_label(record.date, today).bold());
  println!("{} {}", "id:".dimmed(), record.id);
  let badge = emotion_badge(record);
  if !badge.is_empty() {
    println!("{} {}", "감정:".dimmed(), badge);
  }
  println!("{} {}", "신뢰도:".dimmed(), confidence_label(record.confidence));
  println!();
  println!("{}", "꿈 내용".bold());
  println!("{}", record.content);
  println!();
  println!("{}", "해석".bold());
  println!("{}", record.interpretation);
  if !record.recommendations.is_empty() {
    println!();
    println!("{}", "추천사항".bold());
    for recommendation in &record.recommendations {
      println!("  {} {}", "•".green(), recommendation);
    }
  }
}

pub fn memory_status_label(status: MemoryStatus) -> ColoredString {
  match status {
    MemoryStatus::Completed => "완료".green(),
    MemoryStatus::InProgress => "진행중".yellow(),
    MemoryStatus::Failed => "실패".red(),
  }
}

pub fn print_memory(record: &MemoryRecord, today: NaiveDate) {
  println!(
    "{} {} [{}] {}",
    record.id.dimmed(),
    relative_day_label(record.date, today).cyan(),
    memory_status_label(record.status),
    truncate(&record.description, 40).bold()
  );
  if let Some(recovered) = &record.recovered_memory {
    println!("  {} {}", "└─".white().dimmed(), truncate(recovered, 80));
  }
}

/// Read a line from stdin; `None` on end of input
pub fn read_line(prompt: &str) -> std::io::Result<Option<String>> {
  print!("{prompt}");
  std::io::stdout().flush()?;

  let mut input = String::new();
  if std::io::stdin().read_line(&mut input)? == 0 {
    return Ok(None);
  }
  Ok(Some(input.trim().to_string()))
}

/// y/N prompt on stdin
pub fn confirm(prompt: &str) -> std::io::Result<bool> {
  let answer = read_line(&format!("{prompt} (y/N): "))?.unwrap_or_default().to_lowercase();
  Ok(answer == "y" || answer == "yes")
}

/// Asks on stdin before interpreting offline
pub struct StdinConfirmation;

#[async_trait]
impl OfflineConfirmation for StdinConfirmation {
  async fn confirm_offline(&self) -> bool {
    println!("{} {}", "⚠".yellow(), "오프라인 상태입니다. 오프라인에서는 기본 해석만 제공됩니다.".yellow());
    confirm("계속하시겠습니까?").unwrap_or(false)
  }
}

/// Progress line on stderr, drawn only when stderr is a terminal
pub struct TerminalProgress {
  enabled: bool,
}

impl TerminalProgress {
  pub fn new() -> Self {
    Self { enabled: std::io::stderr().is_terminal() }
  }
}

impl Default for TerminalProgress {
  fn default() -> Self {
    Self::new()
  }
}

impl FlowObserver for TerminalProgress {
  fn on_state(&self, state: FlowState) {
    if !self.enabled {
      return;
    }
    match state {
      FlowState::CheckingConnectivity => eprintln!("{} 네트워크 확인 중...", "🌐".cyan()),
      FlowState::Done | FlowState::Failed => eprintln!(),
      _ => {}
    }
  }

  fn on_progress(&self, percent: u8) {
    if !self.enabled {
      return;
    }
    let filled = usize::from(percent.min(PROGRESS_DONE)) / 5;
    eprint!("\r{} [{}{}] {:>3}%", "🌙 해석 중".cyan(), "█".repeat(filled), " ".repeat(20 - filled), percent);
    let _ = std::io::stderr().flush();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_relative_day_label() {
    let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();

    assert_eq!(relative_day_label(today, today), "오늘");
    assert_eq!(relative_day_label(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(), today), "어제");
    assert_eq!(relative_day_label(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), today), "2월 1일");
  }

  #[test]
  fn test_truncate_counts_characters() {
    assert_eq!(truncate("꿈속에서", 10), "꿈속에서");
    assert_eq!(truncate("가나다라마", 3), "가나다…");
    assert_eq!(truncate("한 줄\n두 줄", 10), "한 줄 두 줄");
  }
}
