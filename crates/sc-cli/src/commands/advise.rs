//! Advise command for the health, notification, humor, and break messages.

use std::io::Write;

use anyhow::Result;
use sc_core::{Engine, EventStore};

use super::open_engine;
use crate::Config;

/// Which message the command prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advice {
    /// Health message plus the scheduled notification.
    Health,
    Humor,
    /// Break prompt for today's value.
    Detox,
}

impl Advice {
    pub const fn from_flags(humor: bool, detox: bool) -> Self {
        match (humor, detox) {
            (true, _) => Self::Humor,
            (false, true) => Self::Detox,
            (false, false) => Self::Health,
        }
    }
}

pub fn run<W: Write>(writer: &mut W, config: &Config, advice: Advice) -> Result<()> {
    let engine = open_engine(config)?;
    render(writer, &engine, advice)
}

pub fn render<W: Write, S: EventStore>(
    writer: &mut W,
    engine: &Engine<S>,
    advice: Advice,
) -> Result<()> {
    match advice {
        Advice::Humor => match engine.humor_message() {
            Some(message) => writeln!(writer, "{message}")?,
            None => writeln!(writer, "Humor messages are turned off.")?,
        },
        Advice::Detox => writeln!(writer, "{}", engine.detox_prompt())?,
        Advice::Health => {
            writeln!(writer, "{}", engine.motivation_message())?;
            if let Some(time) = engine.notification_schedule() {
                writeln!(
                    writer,
                    "Notification at {}: {}",
                    time.format("%H:%M"),
                    engine.generate_message()
                )?;
            }
        }
    }
    Ok(())
}
