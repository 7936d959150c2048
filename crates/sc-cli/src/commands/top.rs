//! Top command for the current and all-time leaderboards.

use std::io::Write;

use anyhow::Result;
use sc_core::aggregate::rank_label;
use sc_core::{AppAggregate, Engine, EventStore};

use super::open_engine;
use crate::{Config, TopArgs};

pub fn run<W: Write>(writer: &mut W, args: &TopArgs, config: &Config) -> Result<()> {
    let engine = open_engine(config)?;
    render(writer, &engine, args)
}

pub fn render<W: Write, S: EventStore>(
    writer: &mut W,
    engine: &Engine<S>,
    args: &TopArgs,
) -> Result<()> {
    let config = engine.config();
    let apps = if args.all_time {
        engine.all_time_top_apps(args.limit.unwrap_or(config.all_time_top_n))
    } else {
        engine.current_top_apps(args.limit.unwrap_or(config.current_top_n))
    };

    if args.json {
        serde_json::to_writer_pretty(&mut *writer, &apps)?;
        writeln!(writer)?;
        return Ok(());
    }

    if args.all_time {
        writeln!(writer, "Top apps since {}", engine.app_start_date())?;
    } else {
        writeln!(writer, "Top apps today")?;
    }
    write_ranking(writer, engine, &apps)
}

fn write_ranking<W: Write, S: EventStore>(
    writer: &mut W,
    engine: &Engine<S>,
    apps: &[AppAggregate],
) -> Result<()> {
    if apps.is_empty() {
        writeln!(writer, "No app usage recorded.")?;
        return Ok(());
    }
    let kind = engine.config().kind;
    let width = apps.iter().map(|a| a.name.chars().count()).max().unwrap_or(0);
    for (i, app) in apps.iter().enumerate() {
        writeln!(
            writer,
            "{} {:<width$}  {}",
            rank_label(i + 1),
            app.name,
            kind.format(app.total)
        )?;
    }
    Ok(())
}
