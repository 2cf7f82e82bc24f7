//! `riskcheck` — terminal front end for the risk assessment panel.
//!
//! # Usage
//!
//! ```
//! riskcheck --url http://localhost:5232 --subject 003Ab000001
//! riskcheck --config ~/.config/riskcheck.toml --once
//! ```
//!
//! Without `--once` a prompt accepts `check`, `sort <field> [asc|desc]`,
//! `refresh`, `subject <id>`, `show`, `json`, `help` and `quit`.

mod client;
mod notifier;
mod render;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use client::{ApiClient, ApiConfig};
use notifier::TerminalNotifier;
use riskcheck_core::subject::SubjectRef;
use riskcheck_view::{
  CycleOutcome, PanelConfig, Phase, RiskPanel, Snapshot, SortDirection, SortField,
};
use serde::Deserialize;
use strum::IntoEnumIterator;
use tokio::{
  io::{AsyncBufReadExt, BufReader},
  task::{JoinError, JoinHandle},
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

type Panel = RiskPanel<ApiClient, ApiClient, TerminalNotifier>;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "riskcheck", version, about = "Run and review risk checks for a subject")]
struct Args {
  /// Path to a TOML config file.
  #[arg(short, long, value_name = "FILE", default_value = "riskcheck.toml")]
  config: PathBuf,

  /// Base URL of the assessment backend.
  #[arg(long, env = "RISKCHECK_URL")]
  url: Option<String>,

  /// API username.
  #[arg(long, env = "RISKCHECK_USER")]
  user: Option<String>,

  /// API password (plaintext).
  #[arg(long, env = "RISKCHECK_PASSWORD")]
  password: Option<String>,

  /// Subject whose risk is assessed.
  #[arg(short, long)]
  subject: Option<String>,

  /// Run a single check, print the panel and exit.
  #[arg(long)]
  once: bool,
}

// ─── Config file ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Settings {
  base_url:     String,
  username:     String,
  password:     String,
  timeout_secs: u64,
  subject:      Option<String>,
  panel:        PanelConfig,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      base_url:     "http://localhost:5232".into(),
      username:     String::new(),
      password:     String::new(),
      timeout_secs: 30,
      subject:      None,
      panel:        PanelConfig::default(),
    }
  }
}

fn load_settings(path: PathBuf) -> Result<Settings> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("RISKCHECK"))
    .build()
    .context("failed to read config file")?
    .try_deserialize()
    .context("failed to deserialise settings")
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  let settings = load_settings(args.config)?;

  // CLI flags override env, which overrides the config file.
  let api_config = ApiConfig {
    base_url: args.url.unwrap_or(settings.base_url),
    username: args.user.unwrap_or(settings.username),
    password: args.password.unwrap_or(settings.password),
    timeout:  Duration::from_secs(settings.timeout_secs),
  };
  let subject: SubjectRef = args
    .subject
    .or(settings.subject)
    .context("no subject given; pass --subject or set `subject` in the config file")?
    .parse()
    .context("invalid subject")?;

  tracing::info!(base_url = %api_config.base_url, subject = %subject, "starting");
  let client = ApiClient::new(api_config)?;
  let panel = RiskPanel::new(
    subject,
    client.clone(),
    client,
    TerminalNotifier,
    settings.panel,
  );

  wait_for_history(&panel).await;

  if args.once {
    if let Some(handle) = panel.trigger_assessment() {
      report(&panel, handle.await);
    }
    return Ok(());
  }

  repl(&panel).await
}

/// Block until the current history fetch has delivered something.
async fn wait_for_history(panel: &Panel) {
  let mut snapshots = panel.history().subscribe();
  let _ = snapshots
    .wait_for(|snapshot| !matches!(snapshot, Snapshot::Pending))
    .await;
}

fn print_panel(panel: &Panel) {
  print!("{}", render::render(&panel.subject(), panel.phase(), &panel.view()));
}

fn report(panel: &Panel, finished: Result<CycleOutcome, JoinError>) {
  match finished {
    Ok(outcome) => tracing::debug!(?outcome, "risk check finished"),
    Err(e) => tracing::error!(error = %e, "risk check task failed"),
  }
  print_panel(panel);
}

// ─── Prompt ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
  Check,
  Sort {
    field:     String,
    direction: Option<SortDirection>,
  },
  Refresh,
  Subject(String),
  Show,
  Json,
  Help,
  Quit,
}

fn parse_command(line: &str) -> Result<Option<Command>, String> {
  let mut words = line.split_whitespace();
  let Some(verb) = words.next() else {
    return Ok(None);
  };
  let command = match verb.to_ascii_lowercase().as_str() {
    "check" | "c" => Command::Check,
    "sort" | "s" => {
      let field = words
        .next()
        .ok_or_else(|| "usage: sort <field> [asc|desc]".to_string())?
        .to_string();
      let direction = match words.next() {
        Some(word) => Some(
          SortDirection::parse(word)
            .ok_or_else(|| format!("unknown direction {word:?}; use asc or desc"))?,
        ),
        None => None,
      };
      Command::Sort { field, direction }
    }
    "refresh" | "r" => Command::Refresh,
    "subject" => Command::Subject(
      words
        .next()
        .ok_or_else(|| "usage: subject <id>".to_string())?
        .to_string(),
    ),
    "show" | "ls" => Command::Show,
    "json" => Command::Json,
    "help" | "?" => Command::Help,
    "quit" | "exit" | "q" => Command::Quit,
    other => return Err(format!("unknown command {other:?}; try `help`")),
  };
  Ok(Some(command))
}

/// Without an explicit direction, sorting the current column flips it and
/// a new column starts ascending.
fn resolve_direction(panel: &Panel, field: &str, direction: Option<SortDirection>) -> SortDirection {
  if let Some(direction) = direction {
    return direction;
  }
  let current = panel.view().sort;
  match (current.field(), SortField::parse(field)) {
    (Some(a), Some(b)) if a == b => current.direction.reversed(),
    _ => SortDirection::Ascending,
  }
}

fn print_help() {
  let fields = SortField::iter()
    .map(|field| field.to_string())
    .collect::<Vec<_>>()
    .join(", ");
  println!(
    "commands:\n  check                     run a risk check\n  sort <field> [asc|desc]   order the history ({fields})\n  refresh                   reload the history\n  subject <id>              switch subject\n  show                      print the panel\n  json                      print the view state as JSON\n  quit"
  );
}

/// Resolves with the running check's result, or never when none is running.
async fn settle(running: &mut Option<JoinHandle<CycleOutcome>>) -> Result<CycleOutcome, JoinError> {
  match running {
    Some(handle) => handle.await,
    None => std::future::pending().await,
  }
}

async fn repl(panel: &Panel) -> Result<()> {
  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  let mut running: Option<JoinHandle<CycleOutcome>> = None;
  print_panel(panel);

  loop {
    tokio::select! {
      line = lines.next_line() => {
        let Some(line) = line.context("failed to read stdin")? else {
          break;
        };
        let command = match parse_command(&line) {
          Ok(Some(command)) => command,
          Ok(None) => continue,
          Err(msg) => {
            eprintln!("{msg}");
            continue;
          }
        };
        if !execute(panel, command, &mut running).await? {
          break;
        }
      }
      finished = settle(&mut running) => {
        running = None;
        report(panel, finished);
      }
    }
  }

  // Let a check started just before end of input finish.
  if let Some(handle) = running {
    report(panel, handle.await);
  }
  Ok(())
}

/// Returns `false` when the prompt should exit.
async fn execute(
  panel: &Panel,
  command: Command,
  running: &mut Option<JoinHandle<CycleOutcome>>,
) -> Result<bool> {
  match command {
    Command::Check => match panel.trigger_assessment() {
      Some(handle) => {
        *running = Some(handle);
        println!("checking…");
      }
      None => println!("a risk check is already running"),
    },
    Command::Sort { field, direction } => {
      let direction = resolve_direction(panel, &field, direction);
      panel.request_sort(&field, direction);
      print_panel(panel);
    }
    Command::Refresh => {
      if let Err(e) = panel.history().invalidate().await {
        tracing::debug!(error = %e, "manual history refresh failed");
      }
      print_panel(panel);
    }
    Command::Subject(id) => match id.parse::<SubjectRef>() {
      Ok(subject) => {
        match panel.set_subject(subject) {
          Some(refresh) => {
            let _ = refresh.await;
            print_panel(panel);
          }
          None if panel.phase() != Phase::Idle => {
            println!("a risk check is running; try again once it settles");
          }
          None => print_panel(panel),
        }
      }
      Err(e) => eprintln!("{e}"),
    },
    Command::Show => print_panel(panel),
    Command::Json => {
      println!(
        "{}",
        serde_json::to_string_pretty(&panel.view()).context("failed to serialise view")?
      );
    }
    Command::Help => print_help(),
    Command::Quit => return Ok(false),
  }
  Ok(true)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blank_lines_are_ignored() {
    assert_eq!(parse_command("   "), Ok(None));
  }

  #[test]
  fn sort_accepts_optional_direction() {
    assert_eq!(
      parse_command("sort risk desc"),
      Ok(Some(Command::Sort {
        field:     "risk".into(),
        direction: Some(SortDirection::Descending),
      }))
    );
    assert_eq!(
      parse_command("SORT http_status"),
      Ok(Some(Command::Sort {
        field:     "http_status".into(),
        direction: None,
      }))
    );
    assert!(parse_command("sort risk sideways").is_err());
    assert!(parse_command("sort").is_err());
  }

  #[test]
  fn unknown_commands_are_rejected() {
    assert!(parse_command("launch").is_err());
    assert_eq!(parse_command("q"), Ok(Some(Command::Quit)));
    assert_eq!(
      parse_command("subject 003XY"),
      Ok(Some(Command::Subject("003XY".into())))
    );
  }

  #[test]
  fn settings_default_to_local_backend() {
    let settings = Settings::default();
    assert_eq!(settings.base_url, "http://localhost:5232");
    assert_eq!(settings.timeout_secs, 30);
    assert!(settings.subject.is_none());
  }
}
