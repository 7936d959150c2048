//! Advisory messages selected from threshold tables.
//!
//! A table is a list of `(min_value, message)` pairs. The tier for a value is
//! the highest threshold whose `min_value` is at or below it. Tables are scanned
//! from the highest threshold down, so the first match wins.
//!
//! Two tables exist per measurement kind and are never merged:
//! - the health table, used by the daily notification and the detox advice;
//! - the humor table, used for landmark or pastime analogies.
//!
//! Messages may contain `{amount}`, which [`render`] replaces with the
//! formatted value.

use serde::{Deserialize, Serialize};

use crate::measure::MeasurementKind;

/// Placeholder substituted with the formatted amount.
pub const AMOUNT_PLACEHOLDER: &str = "{amount}";

/// One row of a threshold table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub min_value: f64,
    pub message: String,
}

impl Threshold {
    pub fn new(min_value: f64, message: impl Into<String>) -> Self {
        Self {
            min_value,
            message: message.into(),
        }
    }
}

/// A threshold table kept sorted from the highest `min_value` down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Threshold>", into = "Vec<Threshold>")]
pub struct ThresholdTable {
    thresholds: Vec<Threshold>,
}

impl ThresholdTable {
    /// Builds a table, sorting rows descending by `min_value`.
    ///
    /// Rows with a NaN threshold can never match and are discarded.
    pub fn new(mut thresholds: Vec<Threshold>) -> Self {
        thresholds.retain(|t| !t.min_value.is_nan());
        thresholds.sort_by(|a, b| b.min_value.total_cmp(&a.min_value));
        Self { thresholds }
    }

    /// The matching row for `value`, if any.
    pub fn tier(&self, value: f64) -> Option<&Threshold> {
        if value.is_nan() {
            return None;
        }
        self.thresholds.iter().find(|t| t.min_value <= value)
    }

    /// Severity rank of the matching row: 0 is the lowest tier.
    ///
    /// Returns `None` when the value is below every threshold.
    pub fn severity(&self, value: f64) -> Option<usize> {
        let position = self.thresholds.iter().position(|t| t.min_value <= value)?;
        Some(self.thresholds.len() - 1 - position)
    }

    pub fn rows(&self) -> &[Threshold] {
        &self.thresholds
    }

    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }
}

impl From<Vec<Threshold>> for ThresholdTable {
    fn from(thresholds: Vec<Threshold>) -> Self {
        Self::new(thresholds)
    }
}

impl From<ThresholdTable> for Vec<Threshold> {
    fn from(table: ThresholdTable) -> Self {
        table.thresholds
    }
}

/// Selects the message for `value` from an arbitrary list of thresholds.
///
/// The list does not need to be sorted; it is scanned from the highest
/// threshold down and the first row at or below `value` wins.
pub fn advisory_tier(value: f64, thresholds: &[Threshold]) -> Option<&str> {
    if value.is_nan() {
        return None;
    }
    let mut ordered: Vec<&Threshold> = thresholds.iter().collect();
    ordered.sort_by(|a, b| b.min_value.total_cmp(&a.min_value));
    ordered
        .into_iter()
        .find(|t| t.min_value <= value)
        .map(|t| t.message.as_str())
}

/// Replaces the amount placeholder in `message`.
pub fn render(message: &str, formatted_amount: &str) -> String {
    message.replace(AMOUNT_PLACEHOLDER, formatted_amount)
}

/// The pair of independent tables used for one measurement kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryTables {
    pub health: ThresholdTable,
    pub humor: ThresholdTable,
}

impl AdvisoryTables {
    /// Built-in tables for `kind`.
    pub fn defaults_for(kind: MeasurementKind) -> Self {
        Self {
            health: kind.health_table(),
            humor: kind.humor_table(),
        }
    }
}

/// Builds the daily notification body.
///
/// With detox messages disabled the body is a plain summary line; otherwise
/// it is the health-table tier for `today`.
pub fn notification_message(
    kind: MeasurementKind,
    today: f64,
    health: &ThresholdTable,
    detox_enabled: bool,
) -> String {
    let formatted = kind.format(today);
    if !detox_enabled {
        return kind.summary_line(&formatted);
    }
    health.tier(today).map_or_else(
        || kind.summary_line(&formatted),
        |t| render(&t.message, &formatted),
    )
}

/// Builds the dashboard motivation message.
///
/// When today is above yesterday and above the kind's comparison floor, the
/// comparison wins over the table tier.
pub fn motivation_message(
    kind: MeasurementKind,
    today: f64,
    yesterday: f64,
    health: &ThresholdTable,
) -> String {
    if today > yesterday && today > kind.comparison_floor() {
        return kind.more_than_yesterday_line(&kind.format(today - yesterday));
    }
    let formatted = kind.format(today);
    health.tier(today).map_or_else(
        || kind.summary_line(&formatted),
        |t| render(&t.message, &formatted),
    )
}

/// Builds the humor/conversion message, or `None` when nothing matches.
pub fn humor_message(kind: MeasurementKind, value: f64, humor: &ThresholdTable) -> Option<String> {
    humor
        .tier(value)
        .map(|t| render(&t.message, &kind.format(value)))
}
