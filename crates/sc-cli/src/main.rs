use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sc_cli::commands::advise::Advice;
use sc_cli::commands::{advise, import, monitor, record, settings, status, top, week};
use sc_cli::{Cli, Commands, Config, SettingsAction};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so command output stays machine-readable
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match command {
        Commands::Status { json } => status::run(&mut out, &config, *json)?,
        Commands::Record(args) => record::run(&mut out, args, &config)?,
        Commands::Monitor => monitor::run(io::stdin().lock(), &mut out, &config)?,
        Commands::Week { month, json } => week::run(&mut out, &config, *month, *json)?,
        Commands::Top(args) => top::run(&mut out, args, &config)?,
        Commands::Advise { humor, detox } => {
            advise::run(&mut out, &config, Advice::from_flags(*humor, *detox))?;
        }
        Commands::Settings(SettingsAction::Show) => settings::show(&mut out, &config)?,
        Commands::Settings(SettingsAction::Set { key, value }) => {
            settings::set(&mut out, &config, key, value)?;
        }
        Commands::Import { file } => import::run(&mut out, &config, file)?,
    }

    Ok(())
}
