use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use morpheus::config::RemoteConfig;
use morpheus::interpret::{
  CompletionClient, CompletionRequest, InterpretationOutcome, Interpreter, RemoteInterpreter,
  RuleBasedInterpreter, DEFAULT_RECOMMENDATIONS,
};
use morpheus::memory_recovery::{MemoryRecovery, FALLBACK_QUESTIONS};
use morpheus::record::Emotion;
use morpheus::{MorpheusError, Result};

/// Replays one canned reply (or failure) and remembers the requests it saw
struct ScriptedClient {
  reply: Option<String>,
  seen: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
  fn replying(reply: &str) -> Arc<Self> {
    Arc::new(Self { reply: Some(reply.to_string()), seen: Mutex::new(Vec::new()) })
  }

  fn failing() -> Arc<Self> {
    Arc::new(Self { reply: None, seen: Mutex::new(Vec::new()) })
  }

  fn requests(&self) -> Vec<CompletionRequest> {
    self.seen.lock().unwrap().clone()
  }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
  async fn complete(&self, request: &CompletionRequest) -> Result<String> {
    self.seen.lock().unwrap().push(request.clone());
    self.reply.clone().ok_or_else(|| MorpheusError::Remote("HTTP 500: upstream down".to_string()))
  }
}

#[tokio::test]
async fn test_local_engine_matches_falling_dream() {
  let engine = RuleBasedInterpreter::new();
  let result = engine.interpret("높은 곳에서 떨어지는 꿈을 꿨어요", Some(Emotion::Fear)).await;

  assert_eq!(result.themes, vec!["falling"]);
  assert_eq!(result.outcome, InterpretationOutcome::Local);
  assert!((result.confidence - 0.2).abs() < f64::EPSILON);
  assert!(result.interpretation.starts_with("추락하는 꿈은"));
  assert!(result.interpretation.ends_with(" 현재 불안하고 두려운 상태로 보입니다."));
  assert_eq!(result.recommendations.len(), 3);
}

#[tokio::test]
async fn test_local_engine_without_keywords_is_general() {
  let result = RuleBasedInterpreter::new().interpret("아무 일도 없었다", None).await;

  assert!(result.themes.is_empty());
  assert_eq!(result.primary_theme(), "general");
  assert!((result.confidence - 0.3).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_remote_engine_parses_labelled_reply() {
  let client = ScriptedClient::replying(
    "주요 테마: 자유, 해방\n해석: 새로운 가능성을 찾고 있습니다.\n신뢰도: 85%\n조언: 새로운 취미를 시작해보세요, 산책을 해보세요",
  );
  let engine = RemoteInterpreter::new(client.clone(), &RemoteConfig::default());

  let result = engine.interpret("하늘을 나는 꿈", Some(Emotion::Joy)).await;

  assert_eq!(result.outcome, InterpretationOutcome::Remote);
  assert_eq!(result.themes, vec!["자유", "해방"]);
  assert_eq!(result.interpretation, "새로운 가능성을 찾고 있습니다.");
  assert!((result.confidence - 0.85).abs() < 1e-9);
  assert_eq!(result.recommendations, vec!["새로운 취미를 시작해보세요", "산책을 해보세요"]);

  let requests = client.requests();
  assert_eq!(requests.len(), 1);
  assert!(requests[0].user.contains("하늘을 나는 꿈"));
  assert!(requests[0].user.contains("기쁨"));
  assert_eq!(requests[0].max_tokens, RemoteConfig::default().max_tokens);
}

#[tokio::test]
async fn test_remote_engine_falls_back_on_error() {
  let engine = RemoteInterpreter::new(ScriptedClient::failing(), &RemoteConfig::default());

  let result = engine.interpret("바다에서 수영하는 꿈", None).await;

  assert!(result.is_fallback());
  assert_eq!(result.themes, vec!["general"]);
  assert!((result.confidence - 0.3).abs() < f64::EPSILON);
  assert_eq!(result.recommendations, DEFAULT_RECOMMENDATIONS.to_vec());
}

#[tokio::test]
async fn test_memory_recovery_uses_fixed_questions_when_remote_fails() {
  let recovery = MemoryRecovery::new(ScriptedClient::failing(), &RemoteConfig::default());

  let questions = recovery.generate_questions("어릴 적 살던 집").await;
  assert_eq!(questions, FALLBACK_QUESTIONS.to_vec());

  let analysis = recovery.analyze("어릴 적 살던 집", &["마당이 있었다".to_string()]).await;
  assert!(analysis.is_fallback);
}

#[tokio::test]
async fn test_memory_recovery_keeps_at_most_five_questions() {
  let client = ScriptedClient::replying("질문 1\n\n질문 2\n질문 3\n질문 4\n질문 5\n질문 6");
  let recovery = MemoryRecovery::new(client.clone(), &RemoteConfig::default());

  let questions = recovery.generate_questions("졸업식 날").await;

  assert_eq!(questions, vec!["질문 1", "질문 2", "질문 3", "질문 4", "질문 5"]);
  assert_eq!(client.requests()[0].max_tokens, 500);
}
