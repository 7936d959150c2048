//! Settings command for showing and changing user settings.

use std::io::Write;

use anyhow::{Context, Result};
use sc_core::SettingKey;
use sc_db::Database;

use super::open_database;
use crate::Config;

pub fn show<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let db = open_database(config)?;
    write_settings(writer, &db)
}

pub fn set<W: Write>(writer: &mut W, config: &Config, key: &str, value: &str) -> Result<()> {
    let mut db = open_database(config)?;
    apply(writer, &mut db, key, value)
}

fn write_settings<W: Write>(writer: &mut W, db: &Database) -> Result<()> {
    let settings = db.load_settings().context("failed to load settings")?;
    for (key, value) in settings.to_pairs() {
        writeln!(writer, "{key} = {value}")?;
    }
    Ok(())
}

/// Validates and stores one setting.
fn apply<W: Write>(writer: &mut W, db: &mut Database, key: &str, value: &str) -> Result<()> {
    let key: SettingKey = key.parse()?;
    let mut settings = db.load_settings().context("failed to load settings")?;
    settings.set(key, value)?;
    let stored = settings.get(key);
    db.set_setting(key, &stored)
        .with_context(|| format!("failed to save {key}"))?;
    tracing::debug!(%key, value = %stored, "setting updated");
    writeln!(writer, "{key} = {stored}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    #[test]
    fn show_lists_defaults() {
        let db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        write_settings(&mut output, &db).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        monitoring_enabled = false
        notifications_enabled = true
        detox_messages_enabled = true
        humor_messages_enabled = true
        notification_time = 21:00
        ");
    }

    #[test]
    fn set_normalizes_and_persists_value() {
        let mut db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        apply(&mut output, &mut db, "monitoring_enabled", "ON").unwrap();
        apply(&mut output, &mut db, "notification_time", " 07:05 ").unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        monitoring_enabled = true
        notification_time = 07:05
        ");

        let settings = db.load_settings().unwrap();
        assert!(settings.monitoring_enabled);
        assert_eq!(settings.get(SettingKey::NotificationTime), "07:05");
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_value() {
        let mut db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        assert!(apply(&mut output, &mut db, "theme", "dark").is_err());
        assert!(apply(&mut output, &mut db, "notifications_enabled", "sometimes").is_err());
        assert!(output.is_empty());
        assert_eq!(db.get_setting(SettingKey::NotificationsEnabled).unwrap(), None);
    }
}
