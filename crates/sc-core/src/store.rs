//! Event store contract and an in-process implementation.
//!
//! The store holds [`UsageEvent`] rows keyed by `(day, app_name)`. Writes are
//! upserts: an existing row for the key is overwritten, otherwise a row is
//! inserted. There is no delete in normal operation.
//!
//! Query results are ordered by day ascending, then by the order in which each
//! key was first inserted. Ranking relies on this order to break ties.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use thiserror::Error;

use crate::types::{AppName, DayRange, RowKey, UsageEvent, ValidationError};

/// Errors reported by an [`EventStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),
    /// The row violated an invariant.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Which rows a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppFilter<'a> {
    /// Total rows and per-app rows.
    All,
    /// Only rows without an app name.
    TotalsOnly,
    /// Only rows with an app name.
    AppsOnly,
    /// Only rows for one app.
    App(&'a AppName),
}

impl AppFilter<'_> {
    pub fn matches(&self, event: &UsageEvent) -> bool {
        match self {
            Self::All => true,
            Self::TotalsOnly => event.app_name.is_none(),
            Self::AppsOnly => event.app_name.is_some(),
            Self::App(app) => event.app_name.as_ref() == Some(*app),
        }
    }
}

/// Persistence for usage rows and the app start date.
///
/// Implementations are driven from a single owner; none of the methods need
/// to be safe against interleaved callers.
pub trait EventStore {
    /// Inserts or overwrites the row with the event's key.
    fn upsert(&mut self, event: UsageEvent) -> Result<(), StoreError>;

    /// Returns rows whose day is in `range` and that match `filter`.
    fn query(&self, range: DayRange, filter: AppFilter<'_>) -> Result<Vec<UsageEvent>, StoreError>;

    /// The day tracking started, if it was ever recorded.
    fn app_start_date(&self) -> Result<Option<NaiveDate>, StoreError>;

    /// Records the day tracking started.
    fn set_app_start_date(&mut self, day: NaiveDate) -> Result<(), StoreError>;

    /// Overwrites the total row for `day`.
    fn upsert_daily_total(&mut self, day: NaiveDate, amount: f64) -> Result<(), StoreError> {
        self.upsert(UsageEvent::total(day, amount, Utc::now()))
    }

    /// Overwrites the per-app row for `(day, app)`.
    fn upsert_app_amount(
        &mut self,
        day: NaiveDate,
        app: &AppName,
        amount: f64,
    ) -> Result<(), StoreError> {
        self.upsert(UsageEvent::for_app(day, app.clone(), amount, Utc::now()))
    }

    /// Returns the row stored under `key`, if any.
    fn get(&self, key: &RowKey) -> Result<Option<UsageEvent>, StoreError> {
        let filter = key.app.as_ref().map_or(AppFilter::TotalsOnly, AppFilter::App);
        Ok(self
            .query(DayRange::single(key.day), filter)?
            .into_iter()
            .next())
    }
}

/// An [`EventStore`] kept entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: Vec<UsageEvent>,
    index: HashMap<RowKey, usize>,
    app_start: Option<NaiveDate>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Drops the row stored under `key`, returning it.
    pub fn remove(&mut self, key: &RowKey) -> Option<UsageEvent> {
        let position = self.index.remove(key)?;
        let removed = self.rows.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    /// Iterates over all rows in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &UsageEvent> {
        self.rows.iter()
    }
}

impl EventStore for MemoryStore {
    fn upsert(&mut self, event: UsageEvent) -> Result<(), StoreError> {
        event.validate()?;
        let key = event.key();
        if let Some(&position) = self.index.get(&key) {
            self.rows[position] = event;
        } else {
            self.index.insert(key, self.rows.len());
            self.rows.push(event);
        }
        Ok(())
    }

    fn query(&self, range: DayRange, filter: AppFilter<'_>) -> Result<Vec<UsageEvent>, StoreError> {
        let mut rows: Vec<UsageEvent> = self
            .rows
            .iter()
            .filter(|r| range.contains(r.day) && filter.matches(r))
            .cloned()
            .collect();
        // Stable: rows on the same day keep insertion order.
        rows.sort_by_key(|r| r.day);
        Ok(rows)
    }

    fn app_start_date(&self) -> Result<Option<NaiveDate>, StoreError> {
        Ok(self.app_start)
    }

    fn set_app_start_date(&mut self, day: NaiveDate) -> Result<(), StoreError> {
        self.app_start = Some(day);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn app(name: &str) -> AppName {
        AppName::new(name).unwrap()
    }

    #[test]
    fn repeated_upserts_keep_last_amount() {
        let mut store = MemoryStore::new();
        let twitter = app("Twitter");
        for amount in [10.0, 30.0, 20.0] {
            store.upsert_app_amount(day(1), &twitter, amount).unwrap();
        }
        let rows = store
            .query(DayRange::single(day(1)), AppFilter::All)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!((rows[0].amount - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn total_and_app_rows_are_distinct_keys() {
        let mut store = MemoryStore::new();
        store.upsert_daily_total(day(1), 100.0).unwrap();
        store.upsert_app_amount(day(1), &app("Safari"), 40.0).unwrap();
        store.upsert_daily_total(day(1), 120.0).unwrap();

        let totals = store
            .query(DayRange::single(day(1)), AppFilter::TotalsOnly)
            .unwrap();
        assert_eq!(totals.len(), 1);
        assert!((totals[0].amount - 120.0).abs() < f64::EPSILON);

        let apps = store
            .query(DayRange::single(day(1)), AppFilter::AppsOnly)
            .unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].app_name, Some(app("Safari")));
    }

    #[test]
    fn query_orders_by_day_then_first_insert() {
        let mut store = MemoryStore::new();
        store.upsert_app_amount(day(2), &app("B"), 1.0).unwrap();
        store.upsert_app_amount(day(1), &app("A"), 1.0).unwrap();
        store.upsert_app_amount(day(2), &app("C"), 1.0).unwrap();
        store.upsert_app_amount(day(2), &app("B"), 5.0).unwrap();

        let rows = store
            .query(DayRange::through(day(1), day(2)), AppFilter::All)
            .unwrap();
        let names: Vec<_> = rows
            .iter()
            .map(|r| r.app_name.as_ref().unwrap().as_str())
            .collect();
        assert_eq!(names, ["A", "B", "C"]);
    }

    #[test]
    fn query_respects_half_open_range() {
        let mut store = MemoryStore::new();
        for d in 1..=5 {
            store.upsert_daily_total(day(d), f64::from(d)).unwrap();
        }
        let rows = store
            .query(DayRange::new(day(2), day(4)), AppFilter::All)
            .unwrap();
        let days: Vec<_> = rows.iter().map(|r| r.day).collect();
        assert_eq!(days, [day(2), day(3)]);
    }

    #[test]
    fn upsert_rejects_negative_amount() {
        let mut store = MemoryStore::new();
        let err = store.upsert_daily_total(day(1), -1.0).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn get_finds_row_by_key() {
        let mut store = MemoryStore::new();
        store.upsert_app_amount(day(1), &app("LINE"), 7.0).unwrap();
        let row = store.get(&RowKey::app(day(1), app("LINE"))).unwrap();
        assert!(row.is_some());
        assert!(store.get(&RowKey::total(day(1))).unwrap().is_none());
    }

    #[test]
    fn remove_keeps_index_consistent() {
        let mut store = MemoryStore::new();
        store.upsert_app_amount(day(1), &app("A"), 1.0).unwrap();
        store.upsert_app_amount(day(1), &app("B"), 2.0).unwrap();
        store.upsert_app_amount(day(1), &app("C"), 3.0).unwrap();

        assert!(store.remove(&RowKey::app(day(1), app("A"))).is_some());
        store.upsert_app_amount(day(1), &app("C"), 9.0).unwrap();

        assert_eq!(store.len(), 2);
        let c = store.get(&RowKey::app(day(1), app("C"))).unwrap().unwrap();
        assert!((c.amount - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn app_start_date_roundtrip() {
        let mut store = MemoryStore::new();
        assert_eq!(store.app_start_date().unwrap(), None);
        store.set_app_start_date(day(3)).unwrap();
        assert_eq!(store.app_start_date().unwrap(), Some(day(3)));
    }
}
