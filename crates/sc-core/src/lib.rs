//! Core domain logic for scrollcount.
//!
//! This crate contains the fundamental types and logic for:
//! - Usage rows: daily totals and per-app amounts keyed by `(day, app)`
//! - Aggregation: today/yesterday totals, chart series, and app rankings
//! - Sessions: turning foreground/background transitions into recorded time
//! - Advisory: threshold tables that map a total to a health or humor message
//!
//! Storage is behind the [`EventStore`] trait; `sc-db` provides the SQLite
//! implementation and [`MemoryStore`] is used for tests and fallbacks.

pub mod advisory;
pub mod aggregate;
pub mod clock;
pub mod engine;
pub mod measure;
pub mod session;
pub mod settings;
pub mod source;
pub mod store;
pub mod types;

pub use advisory::{AdvisoryTables, Threshold, ThresholdTable, advisory_tier};
pub use aggregate::{SeriesStats, Trend};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{AggregateState, Engine, EngineConfig, WeeklySummary};
pub use measure::MeasurementKind;
pub use session::{LifecycleEvent, SessionRecorder};
pub use settings::{SettingKey, Settings};
pub use source::{JsonlSource, PermissionGate, SourceError, StaticPermission, UsageSource};
pub use store::{AppFilter, EventStore, MemoryStore, StoreError};
pub use types::{
    AppAggregate, AppName, DailySeriesPoint, DayRange, RowKey, UsageEvent, ValidationError,
};
