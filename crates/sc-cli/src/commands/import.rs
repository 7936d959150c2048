//! Import command for loading usage rows from a JSON Lines file.
//!
//! Each line is one usage row:
//!
//! ```text
//! {"day":"2025-01-15","app_name":"Safari","amount":320.0,"timestamp":"2025-01-15T21:00:00Z"}
//! ```
//!
//! Rows without `app_name` are day totals. Rows overwrite existing rows with
//! the same `(day, app)` key.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use sc_core::{Engine, EventStore, JsonlSource};

use super::open_engine;
use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config, file: &Path) -> Result<()> {
    let reader = File::open(file)
        .map(BufReader::new)
        .with_context(|| format!("failed to open {}", file.display()))?;
    let source = JsonlSource::from_reader(reader)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let mut engine = open_engine(config)?;
    import(writer, &mut engine, source)
}

/// Copies every row of `source` into the engine's store.
pub fn import<W: Write, S: EventStore>(
    writer: &mut W,
    engine: &mut Engine<S>,
    mut source: JsonlSource,
) -> Result<()> {
    let skipped = source.skipped();
    let Some(span) = source.span() else {
        writeln!(writer, "No usage rows to import ({skipped} skipped).")?;
        return Ok(());
    };
    let imported = engine
        .sync_from(&mut source, span)
        .context("failed to read usage rows")?;
    if engine.unpersisted_rows() > 0 {
        bail!(
            "{} of {imported} usage rows could not be saved",
            engine.unpersisted_rows()
        );
    }
    if imported == 0 && !engine.has_permission() {
        writeln!(writer, "Usage permission not granted; nothing imported.")?;
        return Ok(());
    }
    writeln!(writer, "Imported {imported} usage rows ({skipped} skipped).")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use sc_core::{MeasurementKind, StaticPermission};

    use crate::commands::test_support::engine_at;

    const ROWS: &str = r#"{"day":"2025-01-12","amount":2500.0,"timestamp":"2025-01-12T21:00:00Z"}
{"day":"2025-01-12","app_name":"Twitter","amount":1200.0,"timestamp":"2025-01-12T21:00:00Z"}
{"day":"2025-01-13","app_name":"Instagram","amount":-1.0,"timestamp":"2025-01-13T21:00:00Z"}
{broken
{"day":"2025-01-14","app_name":"Instagram","amount":800.0,"timestamp":"2025-01-14T21:00:00Z"}
"#;

    #[test]
    fn import_stores_rows_and_extends_history() {
        let (mut engine, _clock) = engine_at(MeasurementKind::Distance);
        let source = JsonlSource::from_reader(ROWS.as_bytes()).unwrap();

        let mut output = Vec::new();
        import(&mut output, &mut engine, source).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @"Imported 3 usage rows (2 skipped).");

        assert_eq!(engine.store().event_count().unwrap(), 3);
        assert_eq!(engine.app_start_date().to_string(), "2025-01-12");
        let top = engine.all_time_top_apps(10);
        assert_eq!(top[0].name, "Twitter");
        assert_eq!(top[1].name, "Instagram");
        let week = engine.weekly_series();
        assert!((week[3].total - 2500.0).abs() < f64::EPSILON);
        // Instagram's day has no total row, so the app rows are summed.
        assert!((week[5].total - 800.0).abs() < f64::EPSILON);
    }

    #[test]
    fn import_is_skipped_without_permission() {
        let (engine, _clock) = engine_at(MeasurementKind::Distance);
        let mut engine = engine.with_permission(StaticPermission(false));
        let source = JsonlSource::from_reader(ROWS.as_bytes()).unwrap();

        let mut output = Vec::new();
        import(&mut output, &mut engine, source).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @"Usage permission not granted; nothing imported.");
        assert_eq!(engine.store().event_count().unwrap(), 0);
    }

    #[test]
    fn import_of_empty_file_reports_nothing() {
        let (mut engine, _clock) = engine_at(MeasurementKind::Duration);
        let source = JsonlSource::from_reader("\n\n".as_bytes()).unwrap();
        let mut output = Vec::new();
        import(&mut output, &mut engine, source).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @"No usage rows to import (0 skipped).");
    }
}
