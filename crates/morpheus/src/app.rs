//! Wiring: one place that builds stores, engines and services from a [`Config`]

use nyx::event_log::EventLog;
use std::sync::Arc;

use crate::backup::BackupService;
use crate::config::Config;
use crate::connectivity::{ConnectivityCheck, FixedConnectivity, HttpProbe};
use crate::error::Result;
use crate::interpret::{CompletionClient, OpenAiCompletionClient, RemoteInterpreter, RuleBasedInterpreter};
use crate::kv::{FileKeyValueStore, KeyValueStore};
use crate::memory_recovery::MemoryRecovery;
use crate::orchestrator::{OfflineConfirmation, Orchestrator};
use crate::store::{DreamStore, FeedbackStore, MemoryStore, SettingsStore};

/// Shared handles for one process; stores are created once so their locks are shared
pub struct App {
  pub config: Config,
  pub dreams: DreamStore,
  pub feedback: FeedbackStore,
  pub memories: MemoryStore,
  pub settings: SettingsStore,
  pub events: EventLog,
  completion: Arc<dyn CompletionClient>,
}

impl App {
  /// File-backed stores under `config.data_dir`, real HTTP completion client
  pub fn open(config: Config) -> Result<Self> {
    let kv: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::new(&config.data_dir));
    let completion: Arc<dyn CompletionClient> = Arc::new(OpenAiCompletionClient::new(&config.remote)?);
    let events = EventLog::open_with_silent(config.event_log_path(), true)?;
    Ok(Self::with_parts(config, kv, completion, events))
  }

  pub fn with_parts(
    config: Config,
    kv: Arc<dyn KeyValueStore>,
    completion: Arc<dyn CompletionClient>,
    events: EventLog,
  ) -> Self {
    Self {
      dreams: DreamStore::new(kv.clone()),
      feedback: FeedbackStore::new(kv.clone()),
      memories: MemoryStore::new(kv.clone()),
      settings: SettingsStore::new(kv),
      config,
      events,
      completion,
    }
  }

  /// `offline` skips the probe and goes straight to the keyword engine (after confirmation)
  pub fn orchestrator(
    &self,
    offline: bool,
    confirmation: Arc<dyn OfflineConfirmation>,
  ) -> Result<Orchestrator> {
    let connectivity: Arc<dyn ConnectivityCheck> = if offline {
      Arc::new(FixedConnectivity::offline())
    } else {
      Arc::new(HttpProbe::new(&self.config.connectivity)?)
    };

    let remote = RemoteInterpreter::new(self.completion.clone(), &self.config.remote);
    Ok(
      Orchestrator::new(
        connectivity,
        Arc::new(RuleBasedInterpreter::new()),
        Arc::new(remote),
        self.dreams.clone(),
        confirmation,
      )
      .with_event_log(self.events.clone()),
    )
  }

  pub fn backup(&self) -> BackupService {
    BackupService::new(
      self.dreams.clone(),
      self.feedback.clone(),
      self.settings.clone(),
      self.config.export_dir(),
    )
  }

  pub fn memory_recovery(&self) -> MemoryRecovery {
    MemoryRecovery::new(self.completion.clone(), &self.config.remote)
  }
}
