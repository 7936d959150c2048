//! External collaborators: usage data sources and permission gates.
//!
//! The aggregation engine never talks to a platform API directly. Anything
//! that can produce usage rows implements [`UsageSource`]; anything that can
//! answer "may we read usage data?" implements [`PermissionGate`].

use std::io::BufRead;

use thiserror::Error;

use crate::types::{DayRange, UsageEvent};

/// Errors reported by a [`UsageSource`].
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read usage source: {0}")]
    Io(#[from] std::io::Error),
    #[error("usage source unavailable: {0}")]
    Unavailable(String),
}

/// Something that can report usage rows for a range of days.
pub trait UsageSource {
    fn fetch_usage(&mut self, range: DayRange) -> Result<Vec<UsageEvent>, SourceError>;
}

/// Answers whether usage data may be read from the platform.
///
/// A denied permission is a normal state, not an error.
pub trait PermissionGate {
    fn has_permission(&self) -> bool;
}

/// A gate with a fixed answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticPermission(pub bool);

impl PermissionGate for StaticPermission {
    fn has_permission(&self) -> bool {
        self.0
    }
}

/// Usage rows read from JSON Lines, one [`UsageEvent`] per line.
#[derive(Debug, Clone, Default)]
pub struct JsonlSource {
    events: Vec<UsageEvent>,
    skipped: usize,
}

impl JsonlSource {
    /// Parses every line of `reader`.
    ///
    /// Blank lines are ignored. Lines that fail to parse or that violate row
    /// invariants are skipped with a warning.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, SourceError> {
        let mut source = Self::default();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<UsageEvent>(line) {
                Ok(event) => {
                    if let Err(e) = event.validate() {
                        tracing::warn!(line = line_no + 1, error = %e, "skipping invalid usage row");
                        source.skipped += 1;
                        continue;
                    }
                    source.events.push(event);
                }
                Err(e) => {
                    tracing::warn!(line = line_no + 1, error = %e, "skipping malformed usage row");
                    source.skipped += 1;
                }
            }
        }
        Ok(source)
    }

    /// Number of lines that were dropped.
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Day range spanning every parsed row, if any.
    pub fn span(&self) -> Option<DayRange> {
        let first = self.events.iter().map(|e| e.day).min()?;
        let last = self.events.iter().map(|e| e.day).max()?;
        Some(DayRange::through(first, last))
    }
}

impl UsageSource for JsonlSource {
    fn fetch_usage(&mut self, range: DayRange) -> Result<Vec<UsageEvent>, SourceError> {
        Ok(self
            .events
            .iter()
            .filter(|e| range.contains(e.day))
            .cloned()
            .collect())
    }
}
