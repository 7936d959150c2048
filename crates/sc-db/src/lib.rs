//! Storage layer for scrollcount.
//!
//! Provides persistence for usage rows, the app start date, and user settings
//! using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! The engine owns a single `Database` and serializes every access through it.
//!
//! # Schema
//!
//! ## Row Keys
//!
//! Usage rows are unique per `(day, app)`. The total row for a day has no app
//! name. SQLite treats NULLs as distinct inside a `UNIQUE` constraint, so the
//! key column `app_key` stores the app name for per-app rows and an empty
//! string for the total row; `app_name` keeps the nullable form.
//!
//! ## Date Format
//!
//! Days are stored as TEXT in `YYYY-MM-DD` form and timestamps as ISO 8601
//! UTC (e.g., `2025-01-15T10:30:00.000Z`). Both sort lexicographically in
//! chronological order.

use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use sc_core::store::{AppFilter, EventStore, StoreError};
use sc_core::types::{AppName, DayRange, UsageEvent, ValidationError};
use sc_core::{SettingKey, Settings};
use thiserror::Error;

const APP_START_DATE_KEY: &str = "app_start_date";
const DAY_FORMAT: &str = "%Y-%m-%d";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored day could not be parsed.
    #[error("invalid day in database: {day}")]
    DayParse {
        day: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored timestamp could not be parsed.
    #[error("invalid timestamp in database: {timestamp}")]
    TimestampParse {
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row violates a domain invariant.
    #[error("invalid row in database: {0}")]
    Invalid(#[from] ValidationError),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Invalid(e) => Self::Invalid(e),
            other => Self::Backend(other.to_string()),
        }
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A usage row as read from SQLite, before parsing.
struct RawUsageRow {
    day: String,
    app_name: Option<String>,
    amount: f64,
    session_amount: f64,
    total_for_day: f64,
    timestamp: String,
}

impl RawUsageRow {
    fn into_event(self) -> Result<UsageEvent, DbError> {
        let app_name = self.app_name.map(AppName::new).transpose()?;
        Ok(UsageEvent {
            day: parse_day(&self.day)?,
            app_name,
            amount: self.amount,
            session_amount: self.session_amount,
            total_for_day: self.total_for_day,
            timestamp: parse_timestamp(&self.timestamp)?,
        })
    }
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Usage rows: one per (day, app); app_key = '' marks the day's total
            -- day: 'YYYY-MM-DD'
            -- timestamp: ISO 8601 of the last write
            CREATE TABLE IF NOT EXISTS usage_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                day TEXT NOT NULL,
                app_key TEXT NOT NULL,
                app_name TEXT,
                amount REAL NOT NULL CHECK (amount >= 0),
                session_amount REAL NOT NULL DEFAULT 0,
                total_for_day REAL NOT NULL DEFAULT 0,
                timestamp TEXT NOT NULL,
                UNIQUE (day, app_key)
            );

            CREATE INDEX IF NOT EXISTS idx_usage_events_day ON usage_events(day);
            CREATE INDEX IF NOT EXISTS idx_usage_events_app ON usage_events(app_name);

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Inserts or overwrites the row for the event's `(day, app)` key.
    pub fn upsert_event(&mut self, event: &UsageEvent) -> Result<(), DbError> {
        let app_key = event.app_name.as_ref().map_or("", AppName::as_str);
        self.conn.execute(
            "
            INSERT INTO usage_events
            (day, app_key, app_name, amount, session_amount, total_for_day, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (day, app_key) DO UPDATE SET
                app_name = excluded.app_name,
                amount = excluded.amount,
                session_amount = excluded.session_amount,
                total_for_day = excluded.total_for_day,
                timestamp = excluded.timestamp
            ",
            params![
                format_day(event.day),
                app_key,
                event.app_name.as_ref().map(AppName::as_str),
                event.amount,
                event.session_amount,
                event.total_for_day,
                format_timestamp(event.timestamp),
            ],
        )?;
        Ok(())
    }

    /// Lists rows in `range` matching `filter`, ordered by day then first insert.
    pub fn list_events(
        &self,
        range: DayRange,
        filter: AppFilter<'_>,
    ) -> Result<Vec<UsageEvent>, DbError> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let mut args = vec![format_day(range.start), format_day(range.end)];
        let app_clause = match filter {
            AppFilter::All => "",
            AppFilter::TotalsOnly => "AND app_key = ''",
            AppFilter::AppsOnly => "AND app_key <> ''",
            AppFilter::App(app) => {
                args.push(app.as_str().to_string());
                "AND app_key = ?"
            }
        };
        let sql = format!(
            "
            SELECT day, app_name, amount, session_amount, total_for_day, timestamp
            FROM usage_events
            WHERE day >= ? AND day < ? {app_clause}
            ORDER BY day ASC, id ASC
            "
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args), |row| {
            Ok(RawUsageRow {
                day: row.get(0)?,
                app_name: row.get(1)?,
                amount: row.get(2)?,
                session_amount: row.get(3)?,
                total_for_day: row.get(4)?,
                timestamp: row.get(5)?,
            })
        })?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?.into_event()?);
        }
        Ok(events)
    }

    /// Number of stored usage rows.
    pub fn event_count(&self) -> Result<usize, DbError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM usage_events", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn metadata(&self, key: &str) -> Result<Option<String>, DbError> {
        Ok(self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?)
    }

    fn set_metadata(&mut self, key: &str, value: &str) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO metadata (key, value) VALUES (?, ?)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// The recorded first-run day, if any.
    pub fn load_app_start_date(&self) -> Result<Option<NaiveDate>, DbError> {
        self.metadata(APP_START_DATE_KEY)?
            .map(|day| parse_day(&day))
            .transpose()
    }

    pub fn save_app_start_date(&mut self, day: NaiveDate) -> Result<(), DbError> {
        self.set_metadata(APP_START_DATE_KEY, &format_day(day))
    }

    /// Raw value of a stored setting.
    pub fn get_setting(&self, key: SettingKey) -> Result<Option<String>, DbError> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                [key.as_str()],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Stores a setting value as given.
    ///
    /// Callers validate values through [`Settings::set`] first.
    pub fn set_setting(&mut self, key: SettingKey, value: &str) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key.as_str(), value, format_timestamp(Utc::now())],
        )?;
        Ok(())
    }

    /// Loads settings, falling back to defaults for missing or invalid entries.
    pub fn load_settings(&self) -> Result<Settings, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM settings ORDER BY key ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut pairs = Vec::new();
        for row in rows {
            pairs.push(row?);
        }
        Ok(Settings::from_pairs(pairs))
    }

    /// Stores every setting in one transaction.
    pub fn save_settings(&mut self, settings: &Settings) -> Result<(), DbError> {
        let now = format_timestamp(Utc::now());
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
                 ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            )?;
            for (key, value) in settings.to_pairs() {
                stmt.execute(params![key.as_str(), value, now])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

impl EventStore for Database {
    fn upsert(&mut self, event: UsageEvent) -> Result<(), StoreError> {
        event.validate()?;
        self.upsert_event(&event)?;
        Ok(())
    }

    fn query(&self, range: DayRange, filter: AppFilter<'_>) -> Result<Vec<UsageEvent>, StoreError> {
        Ok(self.list_events(range, filter)?)
    }

    fn app_start_date(&self) -> Result<Option<NaiveDate>, StoreError> {
        Ok(self.load_app_start_date()?)
    }

    fn set_app_start_date(&mut self, day: NaiveDate) -> Result<(), StoreError> {
        Ok(self.save_app_start_date(day)?)
    }
}

fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

fn parse_day(day: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(day, DAY_FORMAT).map_err(|source| DbError::DayParse {
        day: day.to_string(),
        source,
    })
}

fn parse_timestamp(timestamp: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
