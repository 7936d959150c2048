//! What is being measured: scroll distance or screen time.
//!
//! Both variants share one engine; the kind decides units, formatting, the
//! comparison floor, and the built-in advisory tables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::advisory::{Threshold, ThresholdTable};
use crate::types::ValidationError;

/// The unit a usage amount is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementKind {
    /// Scroll distance in meters.
    Distance,
    /// Foreground time in seconds.
    #[default]
    Duration,
}

impl MeasurementKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Distance => "distance",
            Self::Duration => "duration",
        }
    }

    /// Whether closed sessions contribute their length to the totals.
    ///
    /// Session lengths are seconds, so they only make sense for `Duration`.
    pub const fn records_sessions(self) -> bool {
        matches!(self, Self::Duration)
    }

    /// Formats an amount for display.
    ///
    /// Distance: `X.Ykm` from 1000 m up, otherwise whole meters.
    /// Duration: `Xh Ym`, `Ym`, or `<1m`.
    pub fn format(self, amount: f64) -> String {
        match self {
            Self::Distance => format_distance(amount),
            Self::Duration => format_duration(amount),
        }
    }

    /// Compact form for tables and chart axes.
    pub fn format_short(self, amount: f64) -> String {
        match self {
            Self::Distance => format_distance(amount),
            Self::Duration => format_duration_short(amount),
        }
    }

    /// Today must exceed this before the comparison with yesterday is shown.
    pub const fn comparison_floor(self) -> f64 {
        match self {
            Self::Distance => 2000.0,
            Self::Duration => 7200.0,
        }
    }

    pub(crate) fn summary_line(self, formatted: &str) -> String {
        match self {
            Self::Distance => format!("Today you scrolled {formatted}."),
            Self::Duration => format!("Today you spent {formatted} on screen."),
        }
    }

    pub(crate) fn more_than_yesterday_line(self, formatted: &str) -> String {
        match self {
            Self::Distance => {
                format!("{formatted} more than yesterday... how about a longer break?")
            }
            Self::Duration => {
                format!("{formatted} more screen time than yesterday... how about a longer break?")
            }
        }
    }

    /// Built-in health table, used for notifications and detox advice.
    pub fn health_table(self) -> ThresholdTable {
        let rows: &[(f64, &str)] = match self {
            Self::Distance => &[
                (42_195.0, "🚨 {amount} of scrolling today, a full marathon... step away from the device and take a break now"),
                (21_098.0, "⚠️ {amount} of scrolling... half a marathon of strain on your fingers and eyes"),
                (10_000.0, "😰 {amount} of scrolling... 25 laps of an athletics track. A long break is recommended"),
                (7_000.0, "💭 {amount} of scrolling... as far as Tokyo Station to Shibuya. Rest your eyes"),
                (5_000.0, "⏰ {amount} of scrolling... a 5k. How about a 30-minute break?"),
                (3_000.0, "🚶 {amount} of scrolling... more screen than a real 3km walk"),
                (1_609.0, "🏃 {amount} of scrolling... a full mile. Why not walk it for real?"),
                (1_000.0, "📱 {amount} of scrolling... one kilometer. Remember to take regular breaks"),
                (634.0, "🏢 {amount} of scrolling... the height of Tokyo Skytree. Rest your neck and eyes"),
                (400.0, "🏃 {amount} of scrolling... one lap of a track. Stand up and stretch"),
                (333.0, "🗼 {amount} of scrolling... the height of Tokyo Tower. Look into the distance for a while"),
                (200.0, "👀 {amount} of scrolling... don't forget to blink, try the 20-20-20 rule"),
                (100.0, "😊 {amount} of scrolling... still a healthy range. Keep it up"),
                (0.0, "✨ {amount} of scrolling... nicely restrained, a balanced digital life!"),
            ],
            Self::Duration => &[
                (28_800.0, "🚨 {amount} on screen today... put the device down and rest now"),
                (21_600.0, "⚠️ {amount} on screen... your eyes have been working all day"),
                (14_400.0, "😰 {amount} on screen... a long break is recommended"),
                (10_800.0, "💭 {amount} on screen... time to rest your eyes"),
                (7_200.0, "⏰ {amount} on screen... how about a 30-minute break?"),
                (3_600.0, "📱 {amount} on screen... remember to take regular breaks"),
                (1_800.0, "👀 {amount} on screen... don't forget to blink, try the 20-20-20 rule"),
                (900.0, "😊 {amount} on screen... still a healthy range"),
                (0.0, "✨ {amount} on screen... nicely restrained!"),
            ],
        };
        table_from(rows)
    }

    /// Built-in humor table with landmark or pastime analogies.
    pub fn humor_table(self) -> ThresholdTable {
        let rows: &[(f64, &str)] = match self {
            Self::Distance => &[
                (42_195.0, "⚠️ A full marathon of scrolling... your fingers must be tired"),
                (21_098.0, "😰 A half marathon of scrolling... time for a break?"),
                (10_000.0, "📱💦 10km travelled by thumb... watch out for digital fatigue"),
                (7_000.0, "🚇😵 Tokyo Station to Shibuya, all on screen"),
                (5_000.0, "⏰ 5km of scrolling... how about a walk outside?"),
                (3_000.0, "🚶 More screen than a real 3km walk"),
                (1_852.0, "⛵ One nautical mile of scrolling... rest your eyes"),
                (1_609.0, "🏃 A mile... running it might be healthier"),
                (1_000.0, "📱🤔 1km of scrolling... isn't that a bit much?"),
                (800.0, "🏃 Two laps of the track... don't forget real exercise"),
                (634.0, "🏢 Skytree-height vertical scroll... how is your neck?"),
                (400.0, "🏃 One lap of the track... stand up and stretch"),
                (333.0, "🗼 Tokyo Tower's worth... change your eye level and rest"),
                (200.0, "🏊 Eight lengths of a pool... are you forgetting to blink?"),
                (110.0, "⚽ A football pitch... how about looking at something green?"),
                (100.0, "🏃 100m of scrolling... still moderate"),
                (50.0, "🏊 One pool length there and back... good pace"),
                (25.0, "😊 A moderate amount of scrolling"),
                (0.0, "✨ Still restrained today... a good habit!"),
            ],
            Self::Duration => &[
                (43_200.0, "🌍 Long enough to fly from Tokyo to Paris"),
                (28_800.0, "💼 A full working day of screen"),
                (21_600.0, "🎬 Three feature films back to back"),
                (10_800.0, "🏔 Enough time to hike up a small mountain"),
                (7_200.0, "🎬 A whole movie's worth of screen time"),
                (5_400.0, "⚽ A football match, half-time included"),
                (3_600.0, "🍳 You could have cooked a proper dinner"),
                (1_800.0, "📺 One sitcom double-bill"),
                (600.0, "☕ About one relaxed coffee break"),
                (0.0, "✨ Barely touched the screen today!"),
            ],
        };
        table_from(rows)
    }

    /// Advice keyed on the weekly daily average.
    pub fn weekly_advice_table(self) -> ThresholdTable {
        let (high, standard) = match self {
            Self::Distance => (8_000.0, 5_000.0),
            Self::Duration => (21_600.0, 10_800.0),
        };
        table_from(&[
            (high, "Usage is on the high side. Regular breaks are recommended."),
            (standard, "A typical amount of usage. Keep this pace."),
            (0.0, "Usage is restrained. Your digital detox is working!"),
        ])
    }

    /// Break prompt offered for today's value.
    pub fn detox_prompt_table(self) -> ThresholdTable {
        let (long_break, short_break) = match self {
            Self::Distance => (5_000.0, 1_000.0),
            Self::Duration => (10_800.0, 3_600.0),
        };
        table_from(&[
            (
                long_break,
                "⏰ Look back over today and step away from the device for 30 minutes.\n🌿 A walk or a book would do.",
            ),
            (
                short_break,
                "📱 Time for a short break!\n👀 20-20-20 rule: every 20 minutes, look 20 feet away for 20 seconds.",
            ),
            (0.0, "😊 Good pace! Keep up the balanced digital life."),
        ])
    }
}

fn table_from(rows: &[(f64, &str)]) -> ThresholdTable {
    ThresholdTable::new(
        rows.iter()
            .map(|(min, message)| Threshold::new(*min, *message))
            .collect(),
    )
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MeasurementKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "distance" => Ok(Self::Distance),
            "duration" => Ok(Self::Duration),
            _ => Err(ValidationError::UnknownMeasurement {
                value: s.to_string(),
            }),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn whole(amount: f64) -> i64 {
    if amount.is_finite() && amount > 0.0 {
        amount.trunc() as i64
    } else {
        0
    }
}

/// Formats meters as `X.Ykm` from 1000 m up, otherwise whole meters.
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.1}km", meters / 1000.0)
    } else {
        format!("{}m", whole(meters))
    }
}

/// Formats seconds as `Xh Ym`, `Ym`, or `<1m`.
pub fn format_duration(seconds: f64) -> String {
    let secs = whole(seconds);
    let hours = secs / 3600;
    let minutes = secs % 3600 / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        "<1m".to_string()
    }
}

/// Formats seconds as `XhYm` or `Ym`.
pub fn format_duration_short(seconds: f64) -> String {
    let secs = whole(seconds);
    let hours = secs / 3600;
    let minutes = secs % 3600 / 60;
    if hours > 0 {
        format!("{hours}h{minutes}m")
    } else {
        format!("{minutes}m")
    }
}
