//! Status command for showing today's totals and tracking state.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use sc_core::aggregate::rank_label;
use sc_core::{Engine, EventStore};

use super::open_engine;
use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config, json: bool) -> Result<()> {
    let mut engine = open_engine(config)?;
    if json {
        let state = engine.refresh();
        serde_json::to_writer_pretty(&mut *writer, state)?;
        writeln!(writer)?;
        return Ok(());
    }
    render(writer, &mut engine, &config.database_path)
}

/// Writes the human-readable status report.
pub fn render<W: Write, S: EventStore>(
    writer: &mut W,
    engine: &mut Engine<S>,
    database: &Path,
) -> Result<()> {
    let state = engine.refresh().clone();
    let kind = state.kind;

    writeln!(writer, "Scrollcount status")?;
    writeln!(writer, "Database: {}", database.display())?;
    writeln!(writer, "Measuring: {kind}")?;
    writeln!(writer, "Today ({}): {}", state.today, kind.format(state.today_total))?;
    writeln!(writer, "Yesterday: {}", kind.format(state.yesterday_total))?;
    writeln!(writer, "Tracking since: {}", state.app_start_date)?;
    writeln!(
        writer,
        "Monitoring: {}",
        if state.monitoring { "on" } else { "off" }
    )?;
    if state.session_open {
        writeln!(writer, "Session: open")?;
    }
    writeln!(
        writer,
        "Usage permission: {}",
        if state.has_permission { "granted" } else { "not granted" }
    )?;
    match engine.notification_schedule() {
        Some(time) => writeln!(writer, "Daily notification: {}", time.format("%H:%M"))?,
        None => writeln!(writer, "Daily notification: off")?,
    }

    if state.top_apps.is_empty() {
        writeln!(writer, "No app usage recorded today.")?;
        return Ok(());
    }
    writeln!(writer, "Top apps today:")?;
    for (i, app) in state.top_apps.iter().enumerate() {
        writeln!(writer, "{} {}: {}", rank_label(i + 1), app.name, kind.format(app.total))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    use chrono::Duration;
    use insta::assert_snapshot;
    use sc_core::{MeasurementKind, Settings};

    use crate::commands::test_support::engine_at;

    #[test]
    fn status_reports_totals_and_top_apps() {
        let (mut engine, clock) = engine_at(MeasurementKind::Distance);
        engine.record_amount("Twitter", 1200.0);
        clock.advance(Duration::days(1));
        engine.record_amount("Twitter", 1200.0);
        engine.record_amount("Instagram", 800.0);
        engine.record_amount("Safari", 35.0);

        let mut output = Vec::new();
        render(&mut output, &mut engine, &PathBuf::from("[TEMP]/scrollcount.db")).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r"
        Scrollcount status
        Database: [TEMP]/scrollcount.db
        Measuring: distance
        Today (2025-01-16): 2.0km
        Yesterday: 1.2km
        Tracking since: 2025-01-15
        Monitoring: off
        Usage permission: granted
        Daily notification: 21:00
        Top apps today:
        🥇 Twitter: 1.2km
        🥈 Instagram: 800m
        🥉 Safari: 35m
        ");
    }

    #[test]
    fn status_shows_open_session_and_disabled_notification() {
        let (engine, clock) = engine_at(MeasurementKind::Duration);
        let mut engine = engine.with_settings(Settings {
            notifications_enabled: false,
            ..Settings::default()
        });
        engine.start_monitoring(true);
        clock.advance(Duration::minutes(65));

        let mut output = Vec::new();
        render(&mut output, &mut engine, &PathBuf::from("[TEMP]/scrollcount.db")).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r"
        Scrollcount status
        Database: [TEMP]/scrollcount.db
        Measuring: duration
        Today (2025-01-15): 1h 5m
        Yesterday: <1m
        Tracking since: 2025-01-15
        Monitoring: on
        Session: open
        Usage permission: granted
        Daily notification: off
        No app usage recorded today.
        ");
    }
}
