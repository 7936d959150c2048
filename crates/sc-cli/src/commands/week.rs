//! Week command for the daily series with statistics and trend.

use std::io::Write;

use anyhow::Result;
use sc_core::aggregate::MONTH_LENGTH;
use sc_core::{Engine, EventStore, MeasurementKind, WeeklySummary};

use super::open_engine;
use crate::Config;

const BAR_WIDTH: f64 = 20.0;

pub fn run<W: Write>(writer: &mut W, config: &Config, month: bool, json: bool) -> Result<()> {
    let engine = open_engine(config)?;
    render(writer, &engine, month, json)
}

/// Writes the configured week, or the last 30 days when `month` is set.
pub fn render<W: Write, S: EventStore>(
    writer: &mut W,
    engine: &Engine<S>,
    month: bool,
    json: bool,
) -> Result<()> {
    let summary = if month {
        engine.summary_for(MONTH_LENGTH)
    } else {
        engine.weekly_summary()
    };
    if json {
        serde_json::to_writer_pretty(&mut *writer, &summary)?;
        writeln!(writer)?;
        return Ok(());
    }
    write_summary(writer, engine.config().kind, &summary)
}

fn write_summary<W: Write>(
    writer: &mut W,
    kind: MeasurementKind,
    summary: &WeeklySummary,
) -> Result<()> {
    writeln!(writer, "Last {} days ({kind})", summary.series.len())?;
    for point in &summary.series {
        writeln!(
            writer,
            "{:>5} {:<20} {}",
            point.label,
            bar(point.total, summary.stats.max),
            kind.format_short(point.total)
        )?;
    }
    writeln!(
        writer,
        "Total: {}  Average: {}  Peak: {}",
        kind.format(summary.stats.total),
        kind.format(summary.stats.average),
        kind.format(summary.stats.max)
    )?;
    writeln!(writer, "{}", summary.trend)?;
    if !summary.advice.is_empty() {
        writeln!(writer, "{}", summary.advice)?;
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let cells = ((value / max) * BAR_WIDTH).round().max(1.0) as usize;
    "█".repeat(cells)
}
