//! Core type definitions with validation.

use std::fmt;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// An amount was negative.
    #[error("amount must be non-negative, got {value}")]
    NegativeAmount { value: f64 },

    /// An amount was NaN or infinite.
    #[error("amount must be finite, got {value}")]
    NonFiniteAmount { value: f64 },

    /// A setting key was not recognized.
    #[error("unknown setting: {key}")]
    UnknownSetting { key: String },

    /// A setting value could not be parsed.
    #[error("invalid value for {key}: {value}")]
    InvalidSettingValue { key: &'static str, value: String },

    /// A measurement kind string was not recognized.
    #[error("unknown measurement kind: {value}")]
    UnknownMeasurement { value: String },
}

/// Checks that an amount is finite and non-negative.
pub fn validate_amount(value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteAmount { value });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeAmount { value });
    }
    Ok(value)
}

/// Generates a validated string newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new value after trimming and validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                let trimmed = id.trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                if trimmed.len() == id.len() {
                    Ok(Self(id))
                } else {
                    Ok(Self(trimmed.to_string()))
                }
            }

            /// Returns the value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated application name.
    ///
    /// App names are non-empty after trimming. A missing app name on a
    /// [`UsageEvent`] marks the day's total row.
    AppName, "app name"
);

/// One persisted usage amount for a calendar day and an optional app.
///
/// Rows are keyed by `(day, app_name)`. The row with `app_name = None` is the
/// day's total; per-app rows are additional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    /// Calendar day the amount belongs to.
    pub day: NaiveDate,
    /// App the amount was attributed to, or `None` for the day's total.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<AppName>,
    /// Accumulated amount (meters or seconds).
    pub amount: f64,
    /// The most recent increment folded into `amount`.
    #[serde(default)]
    pub session_amount: f64,
    /// The day's total at the time this row was written.
    #[serde(default)]
    pub total_for_day: f64,
    /// When the row was last written.
    pub timestamp: DateTime<Utc>,
}

impl UsageEvent {
    /// Creates a day-total row.
    pub fn total(day: NaiveDate, amount: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            day,
            app_name: None,
            amount,
            session_amount: 0.0,
            total_for_day: amount,
            timestamp,
        }
    }

    /// Creates a per-app row.
    pub fn for_app(day: NaiveDate, app: AppName, amount: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            day,
            app_name: Some(app),
            amount,
            session_amount: 0.0,
            total_for_day: 0.0,
            timestamp,
        }
    }

    /// Whether this is the day's total row.
    pub const fn is_total(&self) -> bool {
        self.app_name.is_none()
    }

    /// The upsert key of this row.
    pub fn key(&self) -> RowKey {
        RowKey {
            day: self.day,
            app: self.app_name.clone(),
        }
    }

    /// Checks the row's invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_amount(self.amount)?;
        validate_amount(self.session_amount)?;
        validate_amount(self.total_for_day)?;
        Ok(())
    }
}

/// Identity of a [`UsageEvent`] row: one calendar day plus an optional app.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey {
    pub day: NaiveDate,
    pub app: Option<AppName>,
}

impl RowKey {
    /// Key of the total row for `day`.
    pub const fn total(day: NaiveDate) -> Self {
        Self { day, app: None }
    }

    /// Key of the per-app row for `day`.
    pub const fn app(day: NaiveDate, app: AppName) -> Self {
        Self {
            day,
            app: Some(app),
        }
    }
}

/// Usage summed for one app over a period. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppAggregate {
    pub name: String,
    pub total: f64,
}

/// One calendar day in a chart series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySeriesPoint {
    pub date: NaiveDate,
    pub total: f64,
    /// Short `M/d` label.
    pub label: String,
}

/// A half-open range of calendar days: `start` inclusive, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DayRange {
    /// Creates a range; an `end` before `start` yields an empty range.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// The range covering exactly `day`.
    pub fn single(day: NaiveDate) -> Self {
        Self::new(day, next_day(day))
    }

    /// The range from `start` through `last`, both inclusive.
    pub fn through(start: NaiveDate, last: NaiveDate) -> Self {
        Self::new(start, next_day(last))
    }

    /// Whether `day` falls inside the range.
    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day < self.end
    }

    /// Whether the range contains no days.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// The day after `day`, saturating at the calendar maximum.
pub fn next_day(day: NaiveDate) -> NaiveDate {
    day.checked_add_days(Days::new(1)).unwrap_or(day)
}

/// The day `n` days before `day`, saturating at the calendar minimum.
pub fn days_before(day: NaiveDate, n: u64) -> NaiveDate {
    day.checked_sub_days(Days::new(n)).unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn app_name_rejects_blank() {
        assert_eq!(
            AppName::new("   "),
            Err(ValidationError::Empty { field: "app name" })
        );
    }

    #[test]
    fn app_name_trims_whitespace() {
        let name = AppName::new("  Safari ").unwrap();
        assert_eq!(name.as_str(), "Safari");
    }

    #[test]
    fn app_name_deserialization_validates() {
        let result: Result<AppName, _> = serde_json::from_str(r#""""#);
        assert!(result.is_err());
    }

    #[test]
    fn validate_amount_rejects_negative_and_nan() {
        assert!(matches!(
            validate_amount(-1.0),
            Err(ValidationError::NegativeAmount { .. })
        ));
        assert!(matches!(
            validate_amount(f64::NAN),
            Err(ValidationError::NonFiniteAmount { .. })
        ));
        assert_eq!(validate_amount(0.0), Ok(0.0));
    }

    #[test]
    fn usage_event_total_has_no_app() {
        let event = UsageEvent::total(day(2025, 1, 1), 10.0, Utc::now());
        assert!(event.is_total());
        assert_eq!(event.key(), RowKey::total(day(2025, 1, 1)));
        assert!((event.total_for_day - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn usage_event_json_omits_missing_app() {
        let event = UsageEvent::total(
            day(2025, 1, 1),
            5.0,
            "2025-01-01T10:00:00Z".parse().unwrap(),
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("app_name"));
        let parsed: UsageEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn day_range_single_contains_only_that_day() {
        let range = DayRange::single(day(2025, 3, 1));
        assert!(range.contains(day(2025, 3, 1)));
        assert!(!range.contains(day(2025, 2, 28)));
        assert!(!range.contains(day(2025, 3, 2)));
    }

    #[test]
    fn day_range_with_inverted_bounds_is_empty() {
        let range = DayRange::new(day(2025, 3, 5), day(2025, 3, 1));
        assert!(range.is_empty());
        assert!(!range.contains(day(2025, 3, 5)));
    }

    #[test]
    fn days_before_crosses_month_boundary() {
        assert_eq!(days_before(day(2025, 3, 2), 6), day(2025, 2, 24));
    }
}
