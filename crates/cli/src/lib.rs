pub mod commands;

use clap::{Parser, Subcommand};
use pestquote_core::config::{AppConfig, LoadOptions, LogFormat};
use std::process::ExitCode;

use crate::commands::{quote::QuoteArgs, submit::SubmitArgs, CommandResult};

#[derive(Debug, Parser)]
#[command(
    name = "pestquote",
    about = "Pest control lead intake CLI",
    long_about = "Inspect partner pricing, estimate treatment prices, and submit leads to the partner backend.",
    after_help = "Examples:\n  pestquote config\n  pestquote quote --partner p-1 --pest cockroaches --rooms 2\n  pestquote submit --partner p-1 --rooms 2 --phone '+7 900 123-45-67' --name Anna"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Fetch a partner's pricing rules and offered pest types")]
    Pricing {
        #[arg(long, help = "Partner id; falls back to intake.default_partner_id")]
        partner: Option<String>,
    },
    #[command(about = "Estimate the approximate price of a treatment without submitting")]
    Quote(QuoteArgs),
    #[command(about = "Fill the intake form and create a lead")]
    Submit(Box<SubmitArgs>),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Pricing { .. } => "pricing",
            Self::Quote(_) => "quote",
            Self::Submit(_) => "submit",
        }
    }
}

/// Logs go to stderr so stdout stays a single JSON payload.
pub fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed when embedded in a host process.
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => CommandResult { exit_code: 0, output: commands::config::run() },
        command => match AppConfig::load(LoadOptions::default()) {
            Ok(config) => {
                init_logging(&config);
                dispatch(&config, command)
            }
            Err(error) => CommandResult::failure(
                command.name(),
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            ),
        },
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn dispatch(config: &AppConfig, command: Command) -> CommandResult {
    match command {
        Command::Config => CommandResult { exit_code: 0, output: commands::config::run() },
        Command::Pricing { partner } => commands::pricing::run(config, partner.as_deref()),
        Command::Quote(args) => commands::quote::run(config, &args),
        Command::Submit(args) => commands::submit::run(config, &args),
    }
}
