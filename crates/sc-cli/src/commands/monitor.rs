//! Monitor command: drives the session recorder from lifecycle events.
//!
//! Reads one command per line:
//!
//! - `foreground [APP]`: the tracked context came to the foreground
//! - `background`: it went to the background
//! - `terminate`: the tracked process exits; ends the monitor
//! - `start` / `stop`: turn monitoring on or off
//! - `refresh`: recompute and print the aggregates
//!
//! Unknown lines are dropped with a warning. Every change to the aggregates
//! is printed as one status line. Only one monitor may run per database.

use std::fs::File;
use std::io::{BufRead, Write};
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use fs2::FileExt;
use sc_core::{AggregateState, AppName, Engine, LifecycleEvent};
use sc_db::Database;

use super::open_engine;
use crate::Config;

/// One line of monitor input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorCommand {
    Lifecycle(LifecycleEvent),
    Start,
    Stop,
    Refresh,
}

impl FromStr for MonitorCommand {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let command = match word.to_ascii_lowercase().as_str() {
            "foreground" => {
                let app = if rest.is_empty() {
                    None
                } else {
                    Some(AppName::new(rest)?)
                };
                Self::Lifecycle(LifecycleEvent::Foreground { app })
            }
            "background" => Self::Lifecycle(LifecycleEvent::Background),
            "terminate" => Self::Lifecycle(LifecycleEvent::Terminate),
            "start" => Self::Start,
            "stop" => Self::Stop,
            "refresh" => Self::Refresh,
            _ => bail!("unknown monitor command: {line}"),
        };
        if !rest.is_empty() && !matches!(command, Self::Lifecycle(LifecycleEvent::Foreground { .. })) {
            bail!("unexpected argument for {word}: {rest}");
        }
        Ok(command)
    }
}

pub fn run<R: BufRead, W: Write>(reader: R, writer: &mut W, config: &Config) -> Result<()> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    let lock_file = File::create(config.lock_path()).context("failed to create lock file")?;
    lock_file
        .try_lock_exclusive()
        .context("another monitor is already running for this database")?;

    let mut engine = open_engine(config)?;
    tracing::info!(database = %config.database_path.display(), "monitor started");
    let result = process(reader, writer, &mut engine);
    lock_file.unlock().context("failed to release lock")?;
    result
}

/// Tracks whether the monitored context is in the foreground, and as which app.
#[derive(Debug, Default)]
pub struct Monitor {
    foreground: Option<Option<AppName>>,
}

impl Monitor {
    /// Applies one command. Returns `true` when the monitor should exit.
    pub fn apply(&mut self, engine: &mut Engine<Database>, command: MonitorCommand) -> bool {
        match command {
            MonitorCommand::Lifecycle(event) => {
                let exit = event == LifecycleEvent::Terminate;
                self.foreground = match &event {
                    LifecycleEvent::Foreground { app } => Some(app.clone()),
                    LifecycleEvent::Background | LifecycleEvent::Terminate => None,
                };
                engine.handle(event);
                return exit;
            }
            MonitorCommand::Start => {
                let was_monitoring = engine.is_monitoring();
                engine.start_monitoring(false);
                if let (false, Some(app)) = (was_monitoring, self.foreground.clone()) {
                    engine.handle(LifecycleEvent::Foreground { app });
                }
                save_settings(engine);
            }
            MonitorCommand::Stop => {
                engine.stop_monitoring();
                save_settings(engine);
            }
            MonitorCommand::Refresh => {
                engine.refresh();
            }
        }
        false
    }
}

fn save_settings(engine: &mut Engine<Database>) {
    let settings = *engine.settings();
    if let Err(e) = engine.store_mut().save_settings(&settings) {
        tracing::warn!(error = %e, "failed to save monitoring setting");
    }
}

/// Runs the monitor loop until input ends or a terminate event arrives.
pub fn process<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    engine: &mut Engine<Database>,
) -> Result<()> {
    let updates = engine.subscribe();
    let mut monitor = Monitor::default();

    for line in reader.lines() {
        let line = line.context("failed to read monitor input")?;
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<MonitorCommand>() {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(error = %e, "dropping monitor input");
                continue;
            }
        };
        let is_refresh = command == MonitorCommand::Refresh;
        let exit = monitor.apply(engine, command);
        engine.refresh_if_due();

        let latest = updates.try_iter().last();
        if is_refresh {
            write_state(writer, engine.state())?;
        } else if let Some(state) = latest {
            write_state(writer, &state)?;
        }
        if exit {
            return Ok(());
        }
    }

    if engine.session_open() {
        tracing::debug!("input closed, closing open session");
        engine.handle(LifecycleEvent::Terminate);
        if let Some(state) = updates.try_iter().last() {
            write_state(writer, &state)?;
        }
    }
    Ok(())
}

fn write_state<W: Write>(writer: &mut W, state: &AggregateState) -> Result<()> {
    let kind = state.kind;
    let top = state
        .top_apps
        .first()
        .map_or_else(String::new, |a| format!(" | top: {} {}", a.name, kind.format(a.total)));
    writeln!(
        writer,
        "{} today: {} | monitoring: {} | session: {}{top}",
        state.today,
        kind.format(state.today_total),
        if state.monitoring { "on" } else { "off" },
        if state.session_open { "open" } else { "idle" },
    )?;
    Ok(())
}
