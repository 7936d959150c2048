//! Rolling aggregates over usage rows.
//!
//! Everything here is a pure function of the rows passed in. Callers fetch
//! rows from the event store on every call, so results always reflect the
//! latest writes.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::types::{AppAggregate, DailySeriesPoint, UsageEvent, days_before};

/// Default number of points in a chart series.
pub const WEEK_LENGTH: usize = 7;

/// Number of points in the month chart.
pub const MONTH_LENGTH: usize = 30;

/// Default size of the current-period leaderboard.
pub const CURRENT_TOP_N: usize = 5;

/// Default size of the all-time leaderboard.
pub const ALL_TIME_TOP_N: usize = 10;

/// Total for `day`.
///
/// The day's total row wins when present. Days that only have per-app rows
/// (for example from an import) fall back to the sum of those rows.
pub fn day_total(rows: &[UsageEvent], day: NaiveDate) -> f64 {
    let mut app_sum = 0.0;
    for row in rows.iter().filter(|r| r.day == day) {
        if row.is_total() {
            return row.amount.max(0.0);
        }
        app_sum += row.amount;
    }
    app_sum.max(0.0)
}

/// Chart label for a day, `M/d`.
pub fn series_label(day: NaiveDate) -> String {
    day.format("%-m/%-d").to_string()
}

/// One point per day for the `length` days ending at `end`, oldest first.
///
/// Days without rows are included with a total of zero.
pub fn weekly_series(rows: &[UsageEvent], end: NaiveDate, length: usize) -> Vec<DailySeriesPoint> {
    (0..length)
        .map(|i| {
            let offset = (length - 1 - i) as u64;
            let date = days_before(end, offset);
            DailySeriesPoint {
                date,
                total: day_total(rows, date),
                label: series_label(date),
            }
        })
        .collect()
}

/// Top `n` apps by summed amount, highest first.
///
/// Total rows are ignored. Ties keep the order in which each app first
/// appears in `rows`.
pub fn rank_apps(rows: &[UsageEvent], n: usize) -> Vec<AppAggregate> {
    let mut order: Vec<AppAggregate> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        let Some(app) = &row.app_name else {
            continue;
        };
        if let Some(&i) = index.get(app.as_str()) {
            order[i].total += row.amount;
        } else {
            index.insert(app.as_str(), order.len());
            order.push(AppAggregate {
                name: app.to_string(),
                total: row.amount,
            });
        }
    }
    // sort_by is stable, which keeps first-seen order for equal totals.
    order.sort_by(|a, b| b.total.total_cmp(&a.total));
    order.truncate(n);
    order
}

/// Leaderboard label for a 1-based rank.
pub fn rank_label(rank: usize) -> String {
    match rank {
        1 => "🥇".to_string(),
        2 => "🥈".to_string(),
        3 => "🥉".to_string(),
        n => format!("#{n}"),
    }
}

/// Summary numbers over a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesStats {
    pub total: f64,
    pub average: f64,
    pub max: f64,
}

#[allow(clippy::cast_precision_loss)]
pub fn series_stats(points: &[DailySeriesPoint]) -> SeriesStats {
    if points.is_empty() {
        return SeriesStats {
            total: 0.0,
            average: 0.0,
            max: 0.0,
        };
    }
    let total: f64 = points.iter().map(|p| p.total).sum();
    let max = points.iter().map(|p| p.total).fold(0.0, f64::max);
    SeriesStats {
        total,
        average: total / points.len() as f64,
        max,
    }
}

/// Direction of usage over a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Increasing => "📈 Usage is trending up",
            Self::Decreasing => "📉 Usage is trending down",
            Self::Stable => "📊 Usage is stable",
            Self::InsufficientData => "Not enough data yet. Keep tracking to see a trend.",
        };
        write!(f, "{s}")
    }
}

/// Compares the mean of the last three points with the first three.
///
/// More than 20% higher is increasing, more than 20% lower is decreasing.
#[allow(clippy::cast_precision_loss)]
pub fn trend(points: &[DailySeriesPoint]) -> Trend {
    if points.len() < 2 {
        return Trend::InsufficientData;
    }
    let window = points.len().min(3);
    let mean = |slice: &[DailySeriesPoint]| {
        slice.iter().map(|p| p.total).sum::<f64>() / slice.len() as f64
    };
    let earlier = mean(&points[..window]);
    let recent = mean(&points[points.len() - window..]);

    if recent > earlier * 1.2 {
        Trend::Increasing
    } else if recent < earlier * 0.8 {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};

    use crate::types::AppName;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn total(d: u32, amount: f64) -> UsageEvent {
        UsageEvent::total(day(d), amount, Utc.with_ymd_and_hms(2025, 1, d, 12, 0, 0).unwrap())
    }

    fn app_row(d: u32, name: &str, amount: f64) -> UsageEvent {
        UsageEvent::for_app(
            day(d),
            AppName::new(name).unwrap(),
            amount,
            Utc.with_ymd_and_hms(2025, 1, d, 12, 0, 0).unwrap(),
        )
    }

    fn point(total: f64) -> DailySeriesPoint {
        DailySeriesPoint {
            date: day(1),
            total,
            label: String::new(),
        }
    }

    #[test]
    fn day_total_prefers_total_row() {
        let rows = vec![
            app_row(10, "Twitter", 1200.0),
            total(10, 2500.0),
            app_row(10, "Instagram", 800.0),
        ];
        assert!((day_total(&rows, day(10)) - 2500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn day_total_falls_back_to_app_rows() {
        let rows = vec![app_row(10, "A", 10.0), app_row(10, "B", 5.0), total(11, 99.0)];
        assert!((day_total(&rows, day(10)) - 15.0).abs() < f64::EPSILON);
        assert!(day_total(&rows, day(12)).abs() < f64::EPSILON);
    }

    #[test]
    fn weekly_series_on_empty_rows_has_seven_zero_points() {
        let series = weekly_series(&[], day(10), WEEK_LENGTH);
        assert_eq!(series.len(), 7);
        assert!(series.iter().all(|p| p.total == 0.0));
        assert_eq!(series[0].date, day(4));
        assert_eq!(series[6].date, day(10));
        assert_eq!(series[0].label, "1/4");
        assert_eq!(series[6].label, "1/10");
    }

    #[test]
    fn weekly_series_is_oldest_first_regardless_of_row_order() {
        let rows = vec![total(10, 3.0), total(8, 1.0), total(9, 2.0)];
        let series = weekly_series(&rows, day(10), 3);
        let totals: Vec<f64> = series.iter().map(|p| p.total).collect();
        assert_eq!(totals, [1.0, 2.0, 3.0]);
        assert!(series.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn rank_apps_excludes_total_rows() {
        let rows = vec![
            total(10, 2500.0),
            app_row(10, "Twitter", 1200.0),
            app_row(10, "Instagram", 800.0),
        ];
        let ranked = rank_apps(&rows, CURRENT_TOP_N);
        assert_eq!(
            ranked,
            vec![
                AppAggregate {
                    name: "Twitter".to_string(),
                    total: 1200.0
                },
                AppAggregate {
                    name: "Instagram".to_string(),
                    total: 800.0
                },
            ]
        );
    }

    #[test]
    fn rank_apps_sums_across_days_and_caps() {
        let rows = vec![
            app_row(1, "A", 1.0),
            app_row(1, "B", 5.0),
            app_row(2, "A", 10.0),
            app_row(2, "C", 3.0),
        ];
        let ranked = rank_apps(&rows, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].name, "A");
        assert!((ranked[0].total - 11.0).abs() < f64::EPSILON);
        assert_eq!(ranked[1].name, "B");
    }

    #[test]
    fn rank_apps_ties_keep_first_seen_order() {
        let rows = vec![app_row(1, "Z", 5.0), app_row(1, "A", 5.0), app_row(1, "M", 5.0)];
        let names: Vec<_> = rank_apps(&rows, 10).into_iter().map(|a| a.name).collect();
        assert_eq!(names, ["Z", "A", "M"]);
    }

    #[test]
    fn rank_apps_without_app_rows_is_empty() {
        assert!(rank_apps(&[total(1, 10.0)], 5).is_empty());
        assert!(rank_apps(&[], 5).is_empty());
    }

    #[test]
    fn rank_labels() {
        assert_eq!(rank_label(1), "🥇");
        assert_eq!(rank_label(3), "🥉");
        assert_eq!(rank_label(4), "#4");
    }

    #[test]
    fn series_stats_over_points() {
        let points = vec![point(1.0), point(5.0), point(3.0)];
        let stats = series_stats(&points);
        assert!((stats.total - 9.0).abs() < f64::EPSILON);
        assert!((stats.average - 3.0).abs() < f64::EPSILON);
        assert!((stats.max - 5.0).abs() < f64::EPSILON);
        assert_eq!(series_stats(&[]).total, 0.0);
    }

    #[test]
    fn trend_classification() {
        let rising: Vec<_> = [1.0, 1.0, 1.0, 2.0, 5.0, 5.0, 5.0].map(point).into();
        assert_eq!(trend(&rising), Trend::Increasing);

        let falling: Vec<_> = [5.0, 5.0, 5.0, 2.0, 1.0, 1.0, 1.0].map(point).into();
        assert_eq!(trend(&falling), Trend::Decreasing);

        let flat: Vec<_> = [3.0; 7].map(point).into();
        assert_eq!(trend(&flat), Trend::Stable);

        assert_eq!(trend(&[point(1.0)]), Trend::InsufficientData);
    }

    #[test]
    fn trend_on_all_zero_series_is_stable() {
        let zeros: Vec<_> = [0.0; 7].map(point).into();
        assert_eq!(trend(&zeros), Trend::Stable);
    }
}
