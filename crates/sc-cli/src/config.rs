//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Duration;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use sc_core::aggregate::{ALL_TIME_TOP_N, CURRENT_TOP_N, WEEK_LENGTH};
use sc_core::{AdvisoryTables, EngineConfig, MeasurementKind};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// What the counters measure.
    pub measurement: MeasurementKind,
    /// Seconds between periodic refreshes while monitoring.
    pub refresh_interval_secs: u64,
    /// Number of days in the chart series.
    pub week_length: usize,
    pub current_top_n: usize,
    pub all_time_top_n: usize,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("measurement", &self.measurement)
            .field("refresh_interval_secs", &self.refresh_interval_secs)
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("scrollcount.db"),
            measurement: MeasurementKind::default(),
            refresh_interval_secs: 3600,
            week_length: WEEK_LENGTH,
            current_top_n: CURRENT_TOP_N,
            all_time_top_n: ALL_TIME_TOP_N,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (SC_*)
        figment = figment.merge(Env::prefixed("SC_"));

        figment.extract()
    }

    /// Engine tuning derived from this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            kind: self.measurement,
            week_length: self.week_length.max(1),
            current_top_n: self.current_top_n,
            all_time_top_n: self.all_time_top_n,
            refresh_interval: Duration::seconds(
                i64::try_from(self.refresh_interval_secs)
                    .unwrap_or(i64::MAX)
                    .min(i64::MAX / 1000),
            ),
            tables: AdvisoryTables::defaults_for(self.measurement),
        }
    }

    /// Lock file guarding the database against concurrent monitors.
    pub fn lock_path(&self) -> PathBuf {
        self.database_path.with_extension("lock")
    }
}

/// Returns the platform-specific config directory for scrollcount.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("scrollcount"))
}

/// Returns the platform-specific data directory for scrollcount.
///
/// On Linux: `~/.local/share/scrollcount`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("scrollcount"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn test_dirs_data_path_ends_with_scrollcount() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "scrollcount");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("scrollcount.db"));
        assert_eq!(config.measurement, MeasurementKind::Duration);
        assert_eq!(config.refresh_interval_secs, 3600);
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "database_path = \"/tmp/sc.db\"\nmeasurement = \"distance\"\nweek_length = 14"
        )
        .unwrap();
        file.flush().unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/sc.db"));
        assert_eq!(config.measurement, MeasurementKind::Distance);
        assert_eq!(config.week_length, 14);
        assert_eq!(config.current_top_n, CURRENT_TOP_N);
    }

    #[test]
    fn test_engine_config_follows_measurement() {
        let config = Config {
            measurement: MeasurementKind::Distance,
            refresh_interval_secs: 300,
            week_length: 0,
            ..Config::default()
        };
        let engine = config.engine_config();
        assert_eq!(engine.kind, MeasurementKind::Distance);
        assert_eq!(engine.refresh_interval, Duration::minutes(5));
        assert_eq!(engine.week_length, 1);
        assert_eq!(engine.tables, AdvisoryTables::defaults_for(MeasurementKind::Distance));
    }

    #[test]
    fn test_lock_path_sits_next_to_database() {
        let config = Config {
            database_path: PathBuf::from("/data/scrollcount.db"),
            ..Config::default()
        };
        assert_eq!(config.lock_path(), PathBuf::from("/data/scrollcount.lock"));
    }
}
