//! Record command for adding a usage amount to today's counters.

use std::io::Write;

use anyhow::{Result, bail};
use sc_core::{Engine, EventStore};

use super::open_engine;
use crate::{Config, RecordArgs};

pub fn run<W: Write>(writer: &mut W, args: &RecordArgs, config: &Config) -> Result<()> {
    let mut engine = open_engine(config)?;
    apply(writer, &mut engine, args)
}

/// Records the amount and reports the new totals.
pub fn apply<W: Write, S: EventStore>(
    writer: &mut W,
    engine: &mut Engine<S>,
    args: &RecordArgs,
) -> Result<()> {
    if !engine.record_amount(&args.app, args.amount) {
        bail!(
            "invalid usage amount {} for app {:?}: app must be non-blank and amount a non-negative number",
            args.amount,
            args.app
        );
    }
    if engine.unpersisted_rows() > 0 {
        bail!("failed to save usage for {}", args.app.trim());
    }

    let kind = engine.config().kind;
    let app_total = engine
        .current_top_apps(usize::MAX)
        .into_iter()
        .find(|a| a.name == args.app.trim())
        .map_or(0.0, |a| a.total);
    writeln!(
        writer,
        "Recorded {} for {} ({} today, {} across all apps)",
        kind.format(args.amount),
        args.app.trim(),
        kind.format(app_total),
        kind.format(engine.today_total())
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use sc_core::{AppFilter, Clock, DayRange, MeasurementKind};

    use crate::commands::test_support::engine_at;

    fn args(app: &str, amount: f64) -> RecordArgs {
        RecordArgs {
            app: app.to_string(),
            amount,
        }
    }

    #[test]
    fn record_accumulates_app_and_total() {
        let (mut engine, clock) = engine_at(MeasurementKind::Distance);
        let mut output = Vec::new();
        apply(&mut output, &mut engine, &args("Twitter", 1200.0)).unwrap();
        apply(&mut output, &mut engine, &args(" Twitter ", 300.0)).unwrap();
        apply(&mut output, &mut engine, &args("LINE", 45.0)).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r"
        Recorded 1.2km for Twitter (1.2km today, 1.2km across all apps)
        Recorded 300m for Twitter (1.5km today, 1.5km across all apps)
        Recorded 45m for LINE (45m today, 1.5km across all apps)
        ");

        let rows = engine
            .store()
            .query(DayRange::single(clock.today()), AppFilter::TotalsOnly)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!((rows[0].amount - 1545.0).abs() < f64::EPSILON);
    }

    #[test]
    fn record_rejects_negative_amount() {
        let (mut engine, _clock) = engine_at(MeasurementKind::Distance);
        let mut output = Vec::new();
        let err = apply(&mut output, &mut engine, &args("Twitter", -5.0)).unwrap_err();
        assert!(err.to_string().contains("invalid usage amount"));
        assert!(output.is_empty());
        assert_eq!(engine.store().event_count().unwrap(), 0);
    }

    #[test]
    fn record_rejects_blank_app() {
        let (mut engine, _clock) = engine_at(MeasurementKind::Duration);
        let mut output = Vec::new();
        assert!(apply(&mut output, &mut engine, &args("   ", 5.0)).is_err());
    }
}
