//! Scrollcount CLI library.
//!
//! This crate provides the CLI interface for the scroll and screen-time counter.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, RecordArgs, SettingsAction, TopArgs};
pub use config::Config;
