//! Interpretation flow
//!
//! One submission runs `Idle → CheckingConnectivity → Interpreting → Persisting
//! → Done`, ending in `Failed` when the record cannot be stored. The engine is
//! chosen by connectivity; going offline needs the user's consent. While the
//! engine runs, a ticker reports simulated progress to the observer. The ticker
//! belongs to the call and is stopped on every exit path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nyx::event_log::{EventContext, EventLog};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::connectivity::ConnectivityCheck;
use crate::error::MorpheusError;
use crate::interpret::{Interpretation, Interpreter};
use crate::record::{DreamRecord, Emotion};
use crate::store::DreamStore;

pub const EMPTY_INPUT_NOTICE: &str = "꿈 내용을 입력해주세요.";
pub const FAILURE_NOTICE: &str = "꿈 해석 중 오류가 발생했습니다.";

/// Progress never passes this value before the result arrives
pub const PROGRESS_CEILING: u8 = 90;
pub const PROGRESS_DONE: u8 = 100;

const COMPONENT: &str = "orchestrator";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
  Idle,
  CheckingConnectivity,
  Interpreting,
  Persisting,
  Done,
  Failed,
}

/// Tick cadence for the simulated progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressPlan {
  pub interval: Duration,
  pub step: u8,
}

impl ProgressPlan {
  pub const ONLINE: ProgressPlan = ProgressPlan { interval: Duration::from_millis(200), step: 15 };
  pub const OFFLINE: ProgressPlan = ProgressPlan { interval: Duration::from_millis(300), step: 20 };
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
  pub content: String,
  pub emotion: Option<Emotion>,
}

impl Submission {
  pub fn new(content: impl Into<String>, emotion: Option<Emotion>) -> Self {
    Self { content: content.into(), emotion }
  }
}

#[derive(Debug)]
pub enum FlowOutcome {
  /// Interpreted and stored
  Completed { record: DreamRecord, interpretation: Interpretation, offline: bool },
  /// Input failed validation; nothing happened
  Rejected(String),
  /// User declined the offline interpretation
  Cancelled,
  /// Interpretation produced but could not be stored
  Failed { notice: String, error: MorpheusError },
}

/// Asked before falling back to the keyword engine
#[async_trait]
pub trait OfflineConfirmation: Send + Sync {
  async fn confirm_offline(&self) -> bool;
}

/// Pre-decided answer, for `--yes` and tests
#[derive(Debug, Clone, Copy)]
pub struct FixedConfirmation(pub bool);

#[async_trait]
impl OfflineConfirmation for FixedConfirmation {
  async fn confirm_offline(&self) -> bool {
    self.0
  }
}

/// Receives state transitions and progress; both default to no-ops
pub trait FlowObserver: Send + Sync {
  fn on_state(&self, _state: FlowState) {}
  fn on_progress(&self, _percent: u8) {}
}

pub struct NoopObserver;

impl FlowObserver for NoopObserver {}

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Spawned progress task; aborted when stopped or dropped
struct ProgressTicker {
  handle: Option<JoinHandle<()>>,
}

impl ProgressTicker {
  fn start(observer: Arc<dyn FlowObserver>, plan: ProgressPlan) -> Self {
    let handle = tokio::spawn(async move {
      let mut progress = 0u8;
      let mut interval = tokio::time::interval(plan.interval);
      // first tick completes immediately
      interval.tick().await;

      while progress < PROGRESS_CEILING {
        interval.tick().await;
        progress = progress.saturating_add(plan.step).min(PROGRESS_CEILING);
        observer.on_progress(progress);
      }
    });

    Self { handle: Some(handle) }
  }

  /// Abort and wait, so no tick can land after this returns
  async fn stop(mut self) {
    if let Some(handle) = self.handle.take() {
      handle.abort();
      let _ = handle.await;
    }
  }
}

impl Drop for ProgressTicker {
  fn drop(&mut self) {
    if let Some(handle) = self.handle.take() {
      handle.abort();
    }
  }
}

pub struct Orchestrator {
  connectivity: Arc<dyn ConnectivityCheck>,
  local: Arc<dyn Interpreter>,
  remote: Arc<dyn Interpreter>,
  store: DreamStore,
  confirmation: Arc<dyn OfflineConfirmation>,
  observer: Arc<dyn FlowObserver>,
  clock: Arc<dyn Clock>,
  events: Option<EventLog>,
  online_plan: ProgressPlan,
  offline_plan: ProgressPlan,
}

impl Orchestrator {
  pub fn new(
    connectivity: Arc<dyn ConnectivityCheck>,
    local: Arc<dyn Interpreter>,
    remote: Arc<dyn Interpreter>,
    store: DreamStore,
    confirmation: Arc<dyn OfflineConfirmation>,
  ) -> Self {
    Self {
      connectivity,
      local,
      remote,
      store,
      confirmation,
      observer: Arc::new(NoopObserver),
      clock: Arc::new(SystemClock),
      events: None,
      online_plan: ProgressPlan::ONLINE,
      offline_plan: ProgressPlan::OFFLINE,
    }
  }

  pub fn with_observer(mut self, observer: Arc<dyn FlowObserver>) -> Self {
    self.observer = observer;
    self
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn with_event_log(mut self, events: EventLog) -> Self {
    self.events = Some(events);
    self
  }

  /// Override tick cadence (online, offline)
  pub fn with_progress_plans(mut self, online: ProgressPlan, offline: ProgressPlan) -> Self {
    self.online_plan = online;
    self.offline_plan = offline;
    self
  }

  fn enter(&self, state: FlowState) {
    tracing::debug!(?state, "flow state");
    self.observer.on_state(state);
  }

  pub async fn submit(&self, submission: Submission) -> FlowOutcome {
    if submission.content.trim().is_empty() {
      return FlowOutcome::Rejected(EMPTY_INPUT_NOTICE.to_string());
    }

    let started = Instant::now();

    self.enter(FlowState::CheckingConnectivity);
    let network = self.connectivity.check().await;
    let offline = !network.is_connected;

    if offline && !self.confirmation.confirm_offline().await {
      tracing::info!("offline interpretation declined");
      self.enter(FlowState::Idle);
      return FlowOutcome::Cancelled;
    }

    let (engine, plan) =
      if offline { (&self.local, self.offline_plan) } else { (&self.remote, self.online_plan) };
    tracing::info!(engine = engine.name(), "interpreting dream");

    self.enter(FlowState::Interpreting);
    self.observer.on_progress(0);
    let ticker = ProgressTicker::start(self.observer.clone(), plan);
    let interpretation = engine.interpret(&submission.content, submission.emotion).await;
    ticker.stop().await;
    self.observer.on_progress(PROGRESS_DONE);

    self.enter(FlowState::Persisting);
    let record = DreamRecord::from_interpretation(
      self.clock.now(),
      &submission.content,
      submission.emotion,
      &interpretation,
    );

    let context = |dream_id: Option<String>| EventContext {
      dream_id,
      outcome: Some(interpretation.outcome.as_str().to_string()),
      duration_ms: Some(started.elapsed().as_secs_f64() * 1000.0),
    };

    match self.store.append(record).await {
      Ok(record) => {
        if let Some(events) = &self.events {
          let ctx = Some(context(Some(record.id.clone())));
          if interpretation.is_fallback() {
            events.warn("remote interpretation unavailable, fallback stored", COMPONENT, ctx).await;
          } else {
            events.info("dream interpreted", COMPONENT, ctx).await;
          }
        }

        self.enter(FlowState::Done);
        FlowOutcome::Completed { record, interpretation, offline }
      }
      Err(error) => {
        tracing::warn!(error = %error, "failed to persist dream record");
        if let Some(events) = &self.events {
          events.error(&format!("failed to persist dream: {error}"), COMPONENT, Some(context(None))).await;
        }

        self.observer.on_progress(0);
        self.enter(FlowState::Failed);
        FlowOutcome::Failed { notice: FAILURE_NOTICE.to_string(), error }
      }
    }
  }
}
