use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

use morpheus::app::App;
use morpheus::backup::ExportFormat;
use morpheus::cli::commands;
use morpheus::config::Config;
use morpheus::record::Emotion;
use morpheus::stats::StatsPeriod;
use morpheus::store::Theme;

#[derive(Parser)]
#[command(name = "morpheus")]
#[command(about = "Morpheus - dream journal\nRecord dreams, get interpretations, and look back over your nights")]
#[command(version)]
struct Cli {
  /// Path to a config file (defaults to ~/.morpheus/config.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Debug-level logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Interpret a dream and save it to the journal
  Interpret {
    /// Dream narrative
    text: String,
    /// Emotion felt in the dream (joy, sadness, fear, anger, surprise, neutral)
    #[arg(short, long)]
    emotion: Option<Emotion>,
    /// Skip the connectivity probe and use the keyword engine
    #[arg(long)]
    offline: bool,
    /// Don't ask before interpreting offline
    #[arg(short, long)]
    yes: bool,
  },
  /// List recorded dreams, newest first
  List {
    /// Show the start of each interpretation
    #[arg(short, long)]
    detailed: bool,
  },
  /// Show one dream in full
  Show { id: String },
  /// Delete a dream
  Delete {
    id: String,
    /// Skip confirmation prompt
    #[arg(short, long)]
    force: bool,
  },
  /// Delete every dream
  Clear {
    /// Skip confirmation prompt
    #[arg(short, long)]
    force: bool,
  },
  /// Rate an interpretation
  #[command(group(ArgGroup::new("verdict").required(true).args(["accurate", "inaccurate"])))]
  Feedback {
    id: String,
    #[arg(long)]
    accurate: bool,
    #[arg(long)]
    inaccurate: bool,
    /// How helpful the interpretation was (1-5)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    helpfulness: Option<u8>,
    #[arg(long)]
    suggestion: Option<String>,
  },
  /// Journal statistics
  Stats {
    #[arg(short, long, value_enum, default_value_t = StatsPeriod::Month)]
    period: StatsPeriod,
  },
  /// Write a backup file to the export directory
  Export {
    #[arg(short, long, value_enum, default_value_t = ExportFormat::Json)]
    format: ExportFormat,
  },
  /// Replace the journal with a JSON backup
  Import { file: PathBuf },
  /// Counts, last backup date and backup size
  BackupInfo,
  /// Preferences
  Settings {
    #[command(subcommand)]
    command: SettingsCommand,
  },
  /// Guided memory recovery
  Memory {
    #[command(subcommand)]
    command: MemoryCommand,
  },
  /// Query the event log
  Logs {
    /// Maximum number of log entries to return
    #[arg(short, long, default_value = "50")]
    limit: usize,
    /// Filter by log level (info, warn, error, all)
    #[arg(long, default_value = "all")]
    level: String,
  },
}

#[derive(Subcommand)]
enum SettingsCommand {
  /// Set the colour theme
  Theme {
    #[arg(value_enum)]
    theme: Theme,
  },
  /// Daily reminder preference
  Notifications {
    #[arg(long, conflicts_with = "disable")]
    enable: bool,
    #[arg(long)]
    disable: bool,
    #[arg(long)]
    hour: Option<u8>,
    #[arg(long)]
    minute: Option<u8>,
  },
  /// Print current preferences
  Show,
}

#[derive(Subcommand)]
enum MemoryCommand {
  /// Answer five questions and reconstruct a memory
  Recall { description: String },
  /// List recovery sessions
  List,
  /// Delete a recovery session
  Delete {
    id: String,
    /// Skip confirmation prompt
    #[arg(short, long)]
    force: bool,
  },
}

async fn handle(app: &App, command: Command) -> Result<()> {
  match command {
    Command::Interpret { text, emotion, offline, yes } => {
      commands::interpret(app, &text, emotion, offline, yes).await
    }
    Command::List { detailed } => commands::list_dreams(app, detailed).await,
    Command::Show { id } => commands::show_dream(app, &id).await,
    Command::Delete { id, force } => commands::delete_dream(app, &id, force).await,
    Command::Clear { force } => commands::clear_dreams(app, force).await,
    Command::Feedback { id, accurate, inaccurate: _, helpfulness, suggestion } => {
      commands::give_feedback(app, &id, accurate, helpfulness, suggestion).await
    }
    Command::Stats { period } => commands::show_stats(app, period).await,
    Command::Export { format } => commands::export(app, format).await,
    Command::Import { file } => commands::import(app, &file).await,
    Command::BackupInfo => commands::backup_info(app).await,
    Command::Settings { command } => match command {
      SettingsCommand::Theme { theme } => commands::set_theme(app, theme).await,
      SettingsCommand::Notifications { enable, disable, hour, minute } => {
        commands::set_notifications(app, enable, disable, hour, minute).await
      }
      SettingsCommand::Show => commands::show_settings(app).await,
    },
    Command::Memory { command } => match command {
      MemoryCommand::Recall { description } => commands::recall_memory(app, &description).await,
      MemoryCommand::List => commands::list_memories(app).await,
      MemoryCommand::Delete { id, force } => commands::delete_memory(app, &id, force).await,
    },
    Command::Logs { limit, level } => commands::logs(app, limit, &level).await,
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  nyx::init_tracing(cli.verbose);

  let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
  let app = App::open(config).context("failed to open journal")?;

  handle(&app, cli.command).await
}
