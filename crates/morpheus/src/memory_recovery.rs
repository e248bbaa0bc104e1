//! Guided memory recovery
//!
//! Asks the model for five recall questions about a half-remembered situation,
//! then turns the user's answers into an analysis and a reconstructed memory.
//! Both calls degrade to fixed text when the model is unreachable.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::config::RemoteConfig;
use crate::interpret::{CompletionClient, CompletionRequest};
use crate::record::{time_token, MemoryRecord, MemoryStatus};

const QUESTION_SYSTEM_PROMPT: &str = "당신은 기억 복원 전문가입니다. 사람들이 잊어버린 기억을 되찾을 수 있도록 도와주는 구체적이고 유용한 질문을 만듭니다.";
const ANALYSIS_SYSTEM_PROMPT: &str = "당신은 기억 복원 전문가입니다. 단편적인 기억들을 연결하여 완전한 기억으로 재구성하고, 그 의미를 분석합니다.";

const QUESTION_MAX_TOKENS: u32 = 500;
const ANALYSIS_MAX_TOKENS: u32 = 800;
pub const QUESTION_COUNT: usize = 5;

pub const FALLBACK_QUESTIONS: [&str; QUESTION_COUNT] = [
  "그때 누구와 함께 있었나요?",
  "어떤 계절이었나요?",
  "어디서 일어난 일인가요?",
  "그때 어떤 소리가 들렸나요?",
  "그때 어떤 기분이었나요?",
];

const FALLBACK_ANALYSIS: &str =
  "AI 분석 중 오류가 발생했습니다. 수집된 단서들을 바탕으로 스스로 기억을 연결해보세요.";
const FALLBACK_RECOVERED: &str = "기억 복원을 위해 더 많은 단서가 필요할 수 있습니다.";
const DEFAULT_RECOVERED: &str = "기억 복원이 완료되었습니다.";

const ANALYSIS_LABELS: [&str; 2] = ["기억 분석:", "분석:"];
const RECOVERED_LABELS: [&str; 2] = ["복원된 기억:", "복원:"];

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryAnalysis {
  pub analysis: String,
  pub recovered_memory: String,
  /// True when the model could not be reached and fixed text was returned
  pub is_fallback: bool,
}

impl MemoryAnalysis {
  fn fallback() -> Self {
    Self {
      analysis: FALLBACK_ANALYSIS.to_string(),
      recovered_memory: FALLBACK_RECOVERED.to_string(),
      is_fallback: true,
    }
  }
}

pub struct MemoryRecovery {
  client: Arc<dyn CompletionClient>,
  temperature: f64,
  timeout: Duration,
}

impl MemoryRecovery {
  pub fn new(client: Arc<dyn CompletionClient>, config: &RemoteConfig) -> Self {
    Self {
      client,
      temperature: config.temperature,
      timeout: Duration::from_secs(config.timeout_secs),
    }
  }

  async fn ask(&self, system: &str, user: String, max_tokens: u32) -> Option<String> {
    let request =
      CompletionRequest { system: system.to_string(), user, temperature: self.temperature, max_tokens };

    match tokio::time::timeout(self.timeout, self.client.complete(&request)).await {
      Ok(Ok(reply)) => Some(reply),
      Ok(Err(e)) => {
        tracing::warn!(error = %e, "memory recovery request failed");
        None
      }
      Err(_) => {
        tracing::warn!("memory recovery request timed out");
        None
      }
    }
  }

  /// Up to five recall questions
  pub async fn generate_questions(&self, description: &str) -> Vec<String> {
    let prompt = format!(
      "다음 상황에 대해 기억을 복원하기 위한 구체적이고 도움이 되는 질문 5개를 생성해주세요:

상황: {description}

다음과 같은 요소들을 고려한 질문을 만들어주세요:
- 감각적 기억 (시각, 청각, 촉각, 후각, 미각)
- 시간적 맥락 (언제, 계절, 시간대)
- 공간적 맥락 (어디서, 어떤 환경)
- 감정적 상태 (기분, 감정)
- 사회적 맥락 (누구와, 어떤 관계)

각 질문을 한 줄씩 작성해주세요."
    );

    let questions: Vec<String> = self
      .ask(QUESTION_SYSTEM_PROMPT, prompt, QUESTION_MAX_TOKENS)
      .await
      .map(|reply| {
        reply
          .lines()
          .filter(|l| !l.trim().is_empty())
          .take(QUESTION_COUNT)
          .map(str::to_string)
          .collect()
      })
      .unwrap_or_default();

    if questions.is_empty() {
      return FALLBACK_QUESTIONS.iter().map(|q| q.to_string()).collect();
    }
    questions
  }

  pub async fn analyze(&self, description: &str, clues: &[String]) -> MemoryAnalysis {
    let numbered: Vec<String> =
      clues.iter().enumerate().map(|(i, clue)| format!("{}. {}", i + 1, clue)).collect();
    let prompt = format!(
      "다음 정보를 바탕으로 기억을 복원하고 분석해주세요:

원래 상황: {description}

수집된 단서들:
{}

다음 형식으로 답변해주세요:
1. 기억 분석: 수집된 단서들을 바탕으로 이 기억이 어떤 의미인지 분석
2. 복원된 기억: 단서들을 연결하여 더 완전한 기억으로 재구성

한국어로 답변해주세요.",
      numbered.join("\n")
    );

    match self.ask(ANALYSIS_SYSTEM_PROMPT, prompt, ANALYSIS_MAX_TOKENS).await {
      Some(reply) => parse_memory_response(&reply),
      None => MemoryAnalysis::fallback(),
    }
  }
}

fn label_value(line: &str) -> String {
  line.split(':').nth(1).unwrap_or("").trim().to_string()
}

pub fn parse_memory_response(response: &str) -> MemoryAnalysis {
  let mut analysis = String::new();
  let mut recovered = String::new();

  for line in response.lines().filter(|l| !l.trim().is_empty()) {
    if ANALYSIS_LABELS.iter().any(|label| line.contains(label)) {
      analysis = label_value(line);
    } else if RECOVERED_LABELS.iter().any(|label| line.contains(label)) {
      recovered = label_value(line);
    }
  }

  if analysis.is_empty() && recovered.is_empty() {
    let mut parts = response.split("\n\n");
    analysis = parts.next().filter(|p| !p.is_empty()).unwrap_or(response).to_string();
    recovered = parts.next().filter(|p| !p.is_empty()).unwrap_or(DEFAULT_RECOVERED).to_string();
  }

  MemoryAnalysis { analysis, recovered_memory: recovered, is_fallback: false }
}

/// Record for a finished session; a fallback analysis marks it failed
pub fn session_record(
  now: DateTime<Utc>,
  description: &str,
  clues: Vec<String>,
  result: MemoryAnalysis,
) -> MemoryRecord {
  MemoryRecord {
    id: time_token(now),
    description: description.to_string(),
    clues,
    status: if result.is_fallback { MemoryStatus::Failed } else { MemoryStatus::Completed },
    date: now.date_naive(),
    analysis: Some(result.analysis),
    recovered_memory: Some(result.recovered_memory),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::MorpheusError;
  use crate::interpret::completion::MockCompletionClient;
  use chrono::TimeZone;

  fn recovery(client: MockCompletionClient) -> MemoryRecovery {
    MemoryRecovery::new(Arc::new(client), &RemoteConfig::default())
  }

  #[tokio::test]
  async fn test_questions_take_first_five_non_blank_lines() {
    let mut client = MockCompletionClient::new();
    client
      .expect_complete()
      .withf(|req: &CompletionRequest| req.max_tokens == 500 && req.user.contains("상황: 졸업식"))
      .returning(|_| Ok("1. 누구?\n\n2. 어디?\n3. 언제?\n4. 무엇?\n5. 왜?\n6. 어떻게?".to_string()));

    let questions = recovery(client).generate_questions("졸업식").await;
    assert_eq!(questions, vec!["1. 누구?", "2. 어디?", "3. 언제?", "4. 무엇?", "5. 왜?"]);
  }

  #[tokio::test]
  async fn test_questions_fall_back_on_error() {
    let mut client = MockCompletionClient::new();
    client.expect_complete().returning(|_| Err(MorpheusError::Remote("offline".to_string())));

    let questions = recovery(client).generate_questions("졸업식").await;
    assert_eq!(questions, FALLBACK_QUESTIONS);
  }

  #[tokio::test]
  async fn test_analyze_numbers_clues_and_parses_labels() {
    let mut client = MockCompletionClient::new();
    client
      .expect_complete()
      .withf(|req: &CompletionRequest| req.user.contains("1. 바닷가\n2. 여름"))
      .returning(|_| Ok("1. 기억 분석: 행복했던 가족 여행\n2. 복원된 기억: 여름 바닷가에서 놀았다".to_string()));

    let result =
      recovery(client).analyze("어릴 적 여행", &["바닷가".to_string(), "여름".to_string()]).await;
    assert_eq!(result.analysis, "행복했던 가족 여행");
    assert_eq!(result.recovered_memory, "여름 바닷가에서 놀았다");
    assert!(!result.is_fallback);
  }

  #[tokio::test]
  async fn test_analyze_error_gives_fallback_pair() {
    let mut client = MockCompletionClient::new();
    client.expect_complete().returning(|_| Err(MorpheusError::Remote("HTTP 429".to_string())));

    let result = recovery(client).analyze("기억", &[]).await;
    assert_eq!(result, MemoryAnalysis::fallback());
  }

  #[test]
  fn test_unlabelled_reply_splits_on_blank_line() {
    let result = parse_memory_response("첫 번째 문단\n\n두 번째 문단");
    assert_eq!(result.analysis, "첫 번째 문단");
    assert_eq!(result.recovered_memory, "두 번째 문단");

    let single = parse_memory_response("한 문단뿐");
    assert_eq!(single.analysis, "한 문단뿐");
    assert_eq!(single.recovered_memory, DEFAULT_RECOVERED);
  }

  #[test]
  fn test_session_record_status() {
    let now = Utc.with_ymd_and_hms(2024, 8, 15, 9, 0, 0).unwrap();
    let ok = session_record(now, "설명", vec!["단서".to_string()], parse_memory_response("분석: 의미"));
    assert_eq!(ok.status, MemoryStatus::Completed);
    assert_eq!(ok.analysis.as_deref(), Some("의미"));

    let failed = session_record(now, "설명", vec![], MemoryAnalysis::fallback());
    assert_eq!(failed.status, MemoryStatus::Failed);
    assert_eq!(failed.id, now.timestamp_millis().to_string());
  }
}
