//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Scroll and screen-time counter.
///
/// Records daily usage per app, ranks apps, and turns totals into
/// digital-detox advice.
#[derive(Debug, Parser)]
#[command(name = "scrollcount", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show today's totals and tracking state.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Record a scroll distance or usage amount for an app.
    Record(RecordArgs),

    /// Drive the session recorder from lifecycle events on stdin.
    ///
    /// One event per line: `foreground [APP]`, `background`, `terminate`,
    /// `start`, `stop`, or `refresh`.
    Monitor,

    /// Show the daily series for the last week with statistics.
    Week {
        /// Show the last 30 days instead.
        #[arg(long)]
        month: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the most-used apps.
    Top(TopArgs),

    /// Show the advisory message for today's total.
    Advise {
        /// Show the humor message instead.
        #[arg(long, conflicts_with = "detox")]
        humor: bool,

        /// Show a break prompt for today's value instead.
        #[arg(long)]
        detox: bool,
    },

    /// Show or change user settings.
    #[command(subcommand)]
    Settings(SettingsAction),

    /// Import usage rows from a JSON Lines file.
    Import {
        /// File with one usage row per line.
        file: PathBuf,
    },
}

/// Arguments for the `record` subcommand.
#[derive(Debug, Clone, Args)]
pub struct RecordArgs {
    /// App the amount belongs to.
    #[arg(long)]
    pub app: String,

    /// Meters scrolled or seconds used, depending on the measurement.
    #[arg(long)]
    pub amount: f64,
}

/// Arguments for the `top` subcommand.
#[derive(Debug, Clone, Args)]
pub struct TopArgs {
    /// Rank from the first day of tracking instead of today.
    #[arg(long)]
    pub all_time: bool,

    /// Number of apps to show.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Settings actions.
#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    /// Print every setting.
    Show,
    /// Change one setting.
    Set {
        /// Setting name, e.g. `monitoring_enabled`.
        key: String,
        /// New value, e.g. `on` or `21:30`.
        value: String,
    },
}
