//! CLI subcommand implementations.

pub mod advise;
pub mod import;
pub mod monitor;
pub mod record;
pub mod settings;
pub mod status;
pub mod top;
pub mod week;

use anyhow::{Context, Result};
use sc_core::{Engine, SystemClock};
use sc_db::Database;

use crate::Config;

/// Opens the configured database, creating its directory if necessary.
pub fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}

/// Opens the database and builds an engine with the stored settings.
pub fn open_engine(config: &Config) -> Result<Engine<Database>> {
    let db = open_database(config)?;
    let settings = db.load_settings().context("failed to load settings")?;
    tracing::debug!(?settings, "loaded settings");
    Ok(Engine::new(db, config.engine_config(), SystemClock).with_settings(settings))
}
