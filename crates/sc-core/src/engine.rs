//! The aggregation engine.
//!
//! [`Engine`] is the single owner of the event store and of everything
//! derived from it. All reads and writes go through `&self`/`&mut self` on
//! one engine, which serializes them; the engine is deliberately not `Sync`.
//!
//! Aggregates are pulled through query methods that re-read the store on
//! every call. [`Engine::refresh`] computes a full [`AggregateState`]
//! snapshot and pushes it to subscribers when it differs from the last one.
//!
//! Persistence failures never reach callers. A failed write is logged and
//! kept in an in-memory overlay that is merged into every later read; a
//! failed read falls back to the last snapshot.

use std::sync::mpsc::{self, Receiver, Sender};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::advisory::{self, AdvisoryTables};
use crate::aggregate::{
    self, ALL_TIME_TOP_N, CURRENT_TOP_N, SeriesStats, Trend, WEEK_LENGTH,
};
use crate::clock::Clock;
use crate::measure::MeasurementKind;
use crate::session::{ClosedSession, LifecycleEvent, SessionRecorder};
use crate::settings::Settings;
use crate::source::{PermissionGate, SourceError, StaticPermission, UsageSource};
use crate::store::{AppFilter, EventStore, MemoryStore, StoreError};
use crate::types::{
    AppAggregate, AppName, DailySeriesPoint, DayRange, RowKey, UsageEvent, days_before,
    validate_amount,
};

/// Engine tuning, usually loaded from the application config.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub kind: MeasurementKind,
    /// Number of points in the chart series.
    pub week_length: usize,
    pub current_top_n: usize,
    pub all_time_top_n: usize,
    /// Minimum time between periodic refreshes.
    pub refresh_interval: Duration,
    pub tables: AdvisoryTables,
}

impl EngineConfig {
    /// Defaults for `kind`: a 7-day series, top 5 / top 10, hourly refresh.
    pub fn for_kind(kind: MeasurementKind) -> Self {
        Self {
            kind,
            week_length: WEEK_LENGTH,
            current_top_n: CURRENT_TOP_N,
            all_time_top_n: ALL_TIME_TOP_N,
            refresh_interval: Duration::hours(1),
            tables: AdvisoryTables::defaults_for(kind),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::for_kind(MeasurementKind::default())
    }
}

/// A snapshot of every aggregate the UI shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateState {
    pub kind: MeasurementKind,
    pub today: NaiveDate,
    pub today_total: f64,
    pub yesterday_total: f64,
    pub top_apps: Vec<AppAggregate>,
    pub all_time_top_apps: Vec<AppAggregate>,
    pub weekly: Vec<DailySeriesPoint>,
    pub monitoring: bool,
    pub session_open: bool,
    pub has_permission: bool,
    pub app_start_date: NaiveDate,
}

impl AggregateState {
    fn empty(kind: MeasurementKind, today: NaiveDate) -> Self {
        Self {
            kind,
            today,
            today_total: 0.0,
            yesterday_total: 0.0,
            top_apps: Vec::new(),
            all_time_top_apps: Vec::new(),
            weekly: Vec::new(),
            monitoring: false,
            session_open: false,
            has_permission: false,
            app_start_date: today,
        }
    }
}

/// The chart series with its derived numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySummary {
    pub series: Vec<DailySeriesPoint>,
    pub stats: SeriesStats,
    pub trend: Trend,
    pub advice: String,
}

/// Coordinates the event store, the session recorder, and derived aggregates.
pub struct Engine<S> {
    store: S,
    overlay: MemoryStore,
    config: EngineConfig,
    settings: Settings,
    clock: Box<dyn Clock>,
    permission: Box<dyn PermissionGate>,
    recorder: SessionRecorder,
    app_start: NaiveDate,
    state: AggregateState,
    last_refresh: Option<DateTime<Utc>>,
    subscribers: Vec<Sender<AggregateState>>,
}

impl<S: EventStore> Engine<S> {
    /// Creates an engine over `store`.
    ///
    /// Reads the app start date, recording today on first run. Permission
    /// defaults to granted and settings to their defaults.
    pub fn new(mut store: S, config: EngineConfig, clock: impl Clock + 'static) -> Self {
        let today = clock.today();
        let app_start = match store.app_start_date() {
            Ok(Some(day)) => day,
            Ok(None) => {
                if let Err(e) = store.set_app_start_date(today) {
                    tracing::warn!(error = %e, "failed to persist app start date");
                }
                today
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read app start date, using today");
                today
            }
        };
        tracing::debug!(%app_start, kind = %config.kind, "engine created");
        let state = AggregateState::empty(config.kind, today);
        Self {
            store,
            overlay: MemoryStore::new(),
            config,
            settings: Settings::default(),
            clock: Box::new(clock),
            permission: Box::new(StaticPermission(true)),
            recorder: SessionRecorder::new(),
            app_start,
            state,
            last_refresh: None,
            subscribers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_permission(mut self, permission: impl PermissionGate + 'static) -> Self {
        self.permission = Box::new(permission);
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub const fn app_start_date(&self) -> NaiveDate {
        self.app_start
    }

    pub fn has_permission(&self) -> bool {
        self.permission.has_permission()
    }

    pub const fn is_monitoring(&self) -> bool {
        self.settings.monitoring_enabled
    }

    pub const fn session_open(&self) -> bool {
        self.recorder.is_open()
    }

    /// Number of writes held only in memory because persisting them failed.
    pub fn unpersisted_rows(&self) -> usize {
        self.overlay.len()
    }

    // ========== Reads ==========

    /// Rows from the store with unpersisted writes layered on top.
    fn rows(&self, range: DayRange, filter: AppFilter<'_>) -> Result<Vec<UsageEvent>, StoreError> {
        let mut rows = self.store.query(range, filter)?;
        if self.overlay.is_empty() {
            return Ok(rows);
        }
        for pending in self
            .overlay
            .iter()
            .filter(|r| range.contains(r.day) && filter.matches(r))
        {
            let key = pending.key();
            if let Some(existing) = rows.iter_mut().find(|r| r.key() == key) {
                *existing = pending.clone();
            } else {
                rows.push(pending.clone());
            }
        }
        rows.sort_by_key(|r| r.day);
        Ok(rows)
    }

    fn persisted_day_total(&self, day: NaiveDate) -> Result<f64, StoreError> {
        let rows = self.rows(DayRange::single(day), AppFilter::All)?;
        Ok(aggregate::day_total(&rows, day))
    }

    /// Seconds of the open session that count toward today's total.
    fn live_amount(&self) -> f64 {
        if self.config.kind.records_sessions() {
            self.recorder.elapsed_secs(self.clock.now())
        } else {
            0.0
        }
    }

    /// Today's total, including the open session while one is running.
    pub fn today_total(&self) -> f64 {
        let today = self.clock.today();
        match self.persisted_day_total(today) {
            Ok(total) => total + self.live_amount(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read today's total, using last known value");
                self.state.today_total
            }
        }
    }

    /// Yesterday's persisted total.
    pub fn yesterday_total(&self) -> f64 {
        let yesterday = days_before(self.clock.today(), 1);
        self.persisted_day_total(yesterday).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to read yesterday's total, using last known value");
            self.state.yesterday_total
        })
    }

    /// The configured-length series ending today.
    pub fn weekly_series(&self) -> Vec<DailySeriesPoint> {
        self.weekly_series_ending(self.clock.today(), self.config.week_length)
    }

    /// `length` daily points ending at `end`, oldest first.
    ///
    /// Days without data are included with a zero total. If the store cannot
    /// be read, every point is zero.
    pub fn weekly_series_ending(&self, end: NaiveDate, length: usize) -> Vec<DailySeriesPoint> {
        let start = days_before(end, length.saturating_sub(1) as u64);
        let rows = self
            .rows(DayRange::through(start, end), AppFilter::All)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "failed to read weekly rows");
                Vec::new()
            });
        aggregate::weekly_series(&rows, end, length)
    }

    /// Today's top `n` apps.
    pub fn current_top_apps(&self, n: usize) -> Vec<AppAggregate> {
        let range = DayRange::single(self.clock.today());
        match self.rows(range, AppFilter::AppsOnly) {
            Ok(rows) => aggregate::rank_apps(&rows, n),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read today's app rows, using last ranking");
                truncated(&self.state.top_apps, n)
            }
        }
    }

    /// Top `n` apps from the app start date through today.
    pub fn all_time_top_apps(&self, n: usize) -> Vec<AppAggregate> {
        let range = DayRange::through(self.app_start, self.clock.today());
        match self.rows(range, AppFilter::AppsOnly) {
            Ok(rows) => aggregate::rank_apps(&rows, n),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read app rows, using last ranking");
                truncated(&self.state.all_time_top_apps, n)
            }
        }
    }

    /// Series, statistics, trend, and advice for the chart view.
    pub fn weekly_summary(&self) -> WeeklySummary {
        self.summary_for(self.config.week_length)
    }

    /// Like [`Engine::weekly_summary`], over the `length` days ending today.
    pub fn summary_for(&self, length: usize) -> WeeklySummary {
        let series = self.weekly_series_ending(self.clock.today(), length);
        let stats = aggregate::series_stats(&series);
        let trend = aggregate::trend(&series);
        let advice = self
            .config
            .kind
            .weekly_advice_table()
            .tier(stats.average)
            .map(|t| t.message.clone())
            .unwrap_or_default();
        WeeklySummary {
            series,
            stats,
            trend,
            advice,
        }
    }

    // ========== Messages ==========

    /// Body of the daily notification.
    pub fn generate_message(&self) -> String {
        advisory::notification_message(
            self.config.kind,
            self.today_total(),
            &self.config.tables.health,
            self.settings.detox_messages_enabled,
        )
    }

    /// Dashboard health message, comparing with yesterday when it matters.
    pub fn motivation_message(&self) -> String {
        advisory::motivation_message(
            self.config.kind,
            self.today_total(),
            self.yesterday_total(),
            &self.config.tables.health,
        )
    }

    /// Break prompt for today's live total.
    pub fn detox_prompt(&self) -> String {
        self.config
            .kind
            .detox_prompt_table()
            .tier(self.today_total())
            .map(|t| t.message.clone())
            .unwrap_or_default()
    }

    /// Humor message for today, or `None` when humor is turned off.
    pub fn humor_message(&self) -> Option<String> {
        if !self.settings.humor_messages_enabled {
            return None;
        }
        advisory::humor_message(self.config.kind, self.today_total(), &self.config.tables.humor)
    }

    /// When the daily notification should fire.
    ///
    /// `None` when notifications are turned off or permission is not granted.
    pub fn notification_schedule(&self) -> Option<NaiveTime> {
        if self.settings.notifications_enabled && self.has_permission() {
            Some(self.settings.notification_time)
        } else {
            None
        }
    }

    // ========== Writes ==========

    fn persist(&mut self, event: UsageEvent) {
        let key = event.key();
        match self.store.upsert(event.clone()) {
            Ok(()) => {
                self.overlay.remove(&key);
            }
            Err(e) => {
                tracing::warn!(error = %e, day = %key.day, "failed to persist usage row, keeping it in memory");
                if let Err(e) = self.overlay.upsert(event) {
                    tracing::warn!(error = %e, "dropping invalid usage row");
                }
            }
        }
    }

    fn stored_amount(&self, key: &RowKey) -> Option<f64> {
        if let Ok(Some(row)) = self.overlay.get(key) {
            return Some(row.amount);
        }
        match self.store.get(key) {
            Ok(row) => row.map(|r| r.amount),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read current amount");
                None
            }
        }
    }

    fn current_amount(&self, key: &RowKey) -> f64 {
        self.stored_amount(key).unwrap_or(0.0)
    }

    /// Today's total before a new amount is added.
    ///
    /// A day without a total row starts from the sum of its app rows.
    fn current_total(&self, day: NaiveDate) -> f64 {
        self.stored_amount(&RowKey::total(day)).unwrap_or_else(|| {
            self.persisted_day_total(day).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "failed to read app rows, starting total from zero");
                0.0
            })
        })
    }

    /// Adds `amount` to today's row for `app` and to today's total row.
    fn add_usage(&mut self, app: AppName, amount: f64) {
        let day = self.clock.today();
        let now = self.clock.now();
        let app_key = RowKey::app(day, app.clone());

        let new_total = self.current_total(day) + amount;
        let new_app = self.current_amount(&app_key) + amount;

        self.persist(UsageEvent {
            day,
            app_name: Some(app),
            amount: new_app,
            session_amount: amount,
            total_for_day: new_total,
            timestamp: now,
        });
        self.persist(UsageEvent {
            day,
            app_name: None,
            amount: new_total,
            session_amount: amount,
            total_for_day: new_total,
            timestamp: now,
        });
    }

    /// Records a scroll or usage amount for `app`.
    ///
    /// Blank app names and negative or non-finite amounts are dropped with a
    /// warning. Returns whether the amount was recorded.
    pub fn record_amount(&mut self, app: &str, amount: f64) -> bool {
        let app = match AppName::new(app) {
            Ok(app) => app,
            Err(e) => {
                tracing::warn!(error = %e, "dropping usage amount");
                return false;
            }
        };
        if let Err(e) = validate_amount(amount) {
            tracing::warn!(app = %app, error = %e, "dropping usage amount");
            return false;
        }
        tracing::debug!(app = %app, amount, "recording usage amount");
        self.add_usage(app, amount);
        self.publish();
        true
    }

    fn record_session(&mut self, session: ClosedSession) {
        if !self.config.kind.records_sessions() {
            tracing::debug!(app = %session.app, "session length not recorded for distance tracking");
            return;
        }
        self.add_usage(session.app, session.recorded_secs);
    }

    /// Applies a lifecycle transition.
    pub fn handle(&mut self, event: LifecycleEvent) {
        let now = self.clock.now();
        let closed = match event {
            LifecycleEvent::Foreground { app } => {
                self.recorder.open(now, app, self.settings.monitoring_enabled)
            }
            LifecycleEvent::Background | LifecycleEvent::Terminate => self.recorder.close(now),
        };
        if let Some(session) = closed {
            self.record_session(session);
        }
        self.publish();
    }

    /// Turns monitoring on, opening a session if the app is in the foreground.
    pub fn start_monitoring(&mut self, foreground: bool) {
        if self.settings.monitoring_enabled {
            return;
        }
        self.settings.monitoring_enabled = true;
        tracing::info!("monitoring started");
        if foreground {
            self.handle(LifecycleEvent::Foreground { app: None });
        } else {
            self.publish();
        }
    }

    /// Turns monitoring off, closing any open session.
    pub fn stop_monitoring(&mut self) {
        if !self.settings.monitoring_enabled {
            return;
        }
        self.settings.monitoring_enabled = false;
        tracing::info!("monitoring stopped");
        if let Some(session) = self.recorder.close(self.clock.now()) {
            self.record_session(session);
        }
        self.publish();
    }

    /// Replaces the user settings, stopping monitoring if it was turned off.
    pub fn update_settings(&mut self, settings: Settings) {
        let stop = self.settings.monitoring_enabled && !settings.monitoring_enabled;
        let monitoring = self.settings.monitoring_enabled;
        self.settings = Settings {
            monitoring_enabled: monitoring,
            ..settings
        };
        if stop {
            self.stop_monitoring();
        } else if settings.monitoring_enabled {
            self.start_monitoring(false);
        }
    }

    /// Copies rows from `source` into the store, overwriting by key.
    ///
    /// Skipped when permission is denied; local data stays usable. Rows older
    /// than the app start date move the start date back so they count toward
    /// all-time rankings.
    pub fn sync_from(
        &mut self,
        source: &mut dyn UsageSource,
        range: DayRange,
    ) -> Result<usize, SourceError> {
        if !self.has_permission() {
            tracing::info!("usage permission not granted, keeping local data only");
            return Ok(0);
        }
        let events = source.fetch_usage(range)?;
        let count = events.len();
        if let Some(earliest) = events.iter().map(|e| e.day).min() {
            if earliest < self.app_start {
                self.app_start = earliest;
                if let Err(e) = self.store.set_app_start_date(earliest) {
                    tracing::warn!(error = %e, "failed to persist app start date");
                }
            }
        }
        for event in events {
            self.persist(event);
        }
        tracing::info!(count, "synced usage rows");
        self.publish();
        Ok(count)
    }

    // ========== Snapshot & subscriptions ==========

    /// The last computed snapshot.
    pub const fn state(&self) -> &AggregateState {
        &self.state
    }

    /// Receives a snapshot every time the aggregates change.
    pub fn subscribe(&mut self) -> Receiver<AggregateState> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn compute_state(&self) -> AggregateState {
        AggregateState {
            kind: self.config.kind,
            today: self.clock.today(),
            today_total: self.today_total(),
            yesterday_total: self.yesterday_total(),
            top_apps: self.current_top_apps(self.config.current_top_n),
            all_time_top_apps: self.all_time_top_apps(self.config.all_time_top_n),
            weekly: self.weekly_series(),
            monitoring: self.settings.monitoring_enabled,
            session_open: self.recorder.is_open(),
            has_permission: self.has_permission(),
            app_start_date: self.app_start,
        }
    }

    /// Recomputes the snapshot and notifies subscribers when it changed.
    fn publish(&mut self) {
        let state = self.compute_state();
        if state == self.state {
            return;
        }
        self.state = state;
        let snapshot = &self.state;
        self.subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }

    /// Recomputes every aggregate from the store.
    pub fn refresh(&mut self) -> &AggregateState {
        tracing::debug!("refreshing aggregates");
        self.publish();
        self.last_refresh = Some(self.clock.now());
        &self.state
    }

    /// Refreshes when the refresh interval has elapsed. Returns whether it ran.
    pub fn refresh_if_due(&mut self) -> bool {
        let now = self.clock.now();
        let due = self
            .last_refresh
            .is_none_or(|last| now - last >= self.config.refresh_interval);
        if due {
            self.refresh();
        }
        due
    }
}

fn truncated(apps: &[AppAggregate], n: usize) -> Vec<AppAggregate> {
    apps.iter().take(n).cloned().collect()
}
