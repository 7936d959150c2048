//! Foreground session recording.
//!
//! A session is the interval between a foreground transition and the next
//! background, terminate, or monitoring-stopped transition:
//!
//! ```text
//! Idle --foreground (monitoring on)--> Open --background/terminate/stop--> Idle
//! ```
//!
//! Closing a session yields a [`ClosedSession`] only when it lasted at least
//! [`MIN_SESSION_SECS`]; its recorded length is capped at [`MAX_SESSION_SECS`].
//! A foreground transition while a session is already open closes the old
//! session first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::AppName;

/// Sessions shorter than this are discarded.
pub const MIN_SESSION_SECS: f64 = 5.0;

/// Recorded session length never exceeds twelve hours.
pub const MAX_SESSION_SECS: f64 = 43_200.0;

/// App credited when a foreground transition names none.
pub const DEFAULT_APP: &str = "ScrollCounter";

/// A lifecycle transition delivered to the recorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// The tracked context came to the foreground.
    Foreground {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        app: Option<AppName>,
    },
    /// The tracked context went to the background.
    Background,
    /// The process is about to exit.
    Terminate,
}

/// Recorder state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Open { start: DateTime<Utc>, app: AppName },
}

/// A session that passed the length floor.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedSession {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub app: AppName,
    /// Length in seconds after capping.
    pub recorded_secs: f64,
}

/// Applies the floor and cap to a raw session length in seconds.
///
/// Returns `None` for sessions below the floor.
pub fn clamp_session_secs(raw_secs: f64) -> Option<f64> {
    if raw_secs.is_nan() || raw_secs < MIN_SESSION_SECS {
        return None;
    }
    Some(raw_secs.min(MAX_SESSION_SECS))
}

#[allow(clippy::cast_precision_loss)]
fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 1000.0
}

/// Tracks at most one open session.
#[derive(Debug, Clone)]
pub struct SessionRecorder {
    state: SessionState,
}

impl Default for SessionRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRecorder {
    pub const fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    pub const fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open { .. })
    }

    /// Seconds elapsed in the open session, or zero when idle.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> f64 {
        match &self.state {
            SessionState::Idle => 0.0,
            SessionState::Open { start, .. } => seconds_between(*start, now).max(0.0),
        }
    }

    /// Opens a session at `now`.
    ///
    /// Returns the previous session if one was open and long enough to
    /// record. Does nothing when `monitoring` is off.
    pub fn open(
        &mut self,
        now: DateTime<Utc>,
        app: Option<AppName>,
        monitoring: bool,
    ) -> Option<ClosedSession> {
        if !monitoring {
            tracing::debug!("foreground ignored, monitoring is off");
            return None;
        }
        let previous = if self.is_open() {
            tracing::warn!("foreground while a session is open, closing the previous session");
            self.close(now)
        } else {
            None
        };
        let app = app.unwrap_or_else(default_app);
        tracing::info!(app = %app, start = %now, "session opened");
        self.state = SessionState::Open { start: now, app };
        previous
    }

    /// Closes the open session at `now`.
    ///
    /// Returns `None` when idle or when the session was shorter than the floor.
    pub fn close(&mut self, now: DateTime<Utc>) -> Option<ClosedSession> {
        let SessionState::Open { start, app } = std::mem::replace(&mut self.state, SessionState::Idle)
        else {
            return None;
        };
        let raw = seconds_between(start, now);
        let Some(recorded_secs) = clamp_session_secs(raw) else {
            tracing::debug!(app = %app, seconds = raw, "session too short, discarded");
            return None;
        };
        if recorded_secs < raw {
            tracing::warn!(app = %app, seconds = raw, "session capped at twelve hours");
        }
        tracing::info!(app = %app, seconds = recorded_secs, "session closed");
        Some(ClosedSession {
            start,
            end: now,
            app,
            recorded_secs,
        })
    }
}

fn default_app() -> AppName {
    AppName::new(DEFAULT_APP).expect("default app name is not blank")
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap()
    }

    #[test]
    fn short_session_is_discarded() {
        let mut recorder = SessionRecorder::new();
        recorder.open(t0(), None, true);
        assert!(recorder.close(t0() + Duration::seconds(3)).is_none());
        assert!(!recorder.is_open());
    }

    #[test]
    fn session_at_floor_is_recorded() {
        let mut recorder = SessionRecorder::new();
        recorder.open(t0(), None, true);
        let closed = recorder.close(t0() + Duration::seconds(5)).unwrap();
        assert!((closed.recorded_secs - 5.0).abs() < f64::EPSILON);
        assert_eq!(closed.app.as_str(), DEFAULT_APP);
    }

    #[test]
    fn long_session_is_capped() {
        let mut recorder = SessionRecorder::new();
        recorder.open(t0(), None, true);
        let closed = recorder.close(t0() + Duration::seconds(50_000)).unwrap();
        assert!((closed.recorded_secs - MAX_SESSION_SECS).abs() < f64::EPSILON);
    }

    #[test]
    fn open_without_monitoring_does_nothing() {
        let mut recorder = SessionRecorder::new();
        assert!(recorder.open(t0(), None, false).is_none());
        assert!(!recorder.is_open());
        assert!(recorder.close(t0() + Duration::hours(1)).is_none());
    }

    #[test]
    fn reopening_closes_previous_session_first() {
        let mut recorder = SessionRecorder::new();
        let safari = AppName::new("Safari").unwrap();
        recorder.open(t0(), Some(safari.clone()), true);

        let previous = recorder
            .open(t0() + Duration::seconds(60), None, true)
            .unwrap();
        assert_eq!(previous.app, safari);
        assert!((previous.recorded_secs - 60.0).abs() < f64::EPSILON);

        assert!(recorder.is_open());
        assert!((recorder.elapsed_secs(t0() + Duration::seconds(90)) - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn elapsed_is_zero_when_idle_or_clock_moves_back() {
        let mut recorder = SessionRecorder::new();
        assert!(recorder.elapsed_secs(t0()).abs() < f64::EPSILON);
        recorder.open(t0(), None, true);
        assert!(recorder.elapsed_secs(t0() - Duration::seconds(10)).abs() < f64::EPSILON);
    }

    #[test]
    fn clamp_session_secs_bounds() {
        assert_eq!(clamp_session_secs(4.999), None);
        assert_eq!(clamp_session_secs(f64::NAN), None);
        assert_eq!(clamp_session_secs(5.0), Some(5.0));
        assert_eq!(clamp_session_secs(1e9), Some(MAX_SESSION_SECS));
    }

    #[test]
    fn lifecycle_event_json_shape() {
        let event: LifecycleEvent =
            serde_json::from_str(r#"{"event":"foreground","app":"Safari"}"#).unwrap();
        assert_eq!(
            event,
            LifecycleEvent::Foreground {
                app: Some(AppName::new("Safari").unwrap())
            }
        );
        let event: LifecycleEvent = serde_json::from_str(r#"{"event":"background"}"#).unwrap();
        assert_eq!(event, LifecycleEvent::Background);
    }
}
