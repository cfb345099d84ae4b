pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "storefront",
    about = "Storefront operator CLI",
    long_about = "Prepare the storefront database and inspect the effective configuration.",
    after_help = concat!(
        "Examples:\n  storefront migrate\n  storefront seed\n  storefront config\n",
        "  storefront sessions purge --max-age-secs 86400"
    )
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load and verify the deterministic demo catalog")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Maintain stored visitor sessions")]
    Sessions {
        #[command(subcommand)]
        command: SessionsCommand,
    },
}

#[derive(Debug, Subcommand)]
enum SessionsCommand {
    #[command(about = "Delete sessions idle longer than the max age")]
    Purge {
        /// Defaults to `session.max_age_secs`.
        #[arg(long, value_name = "SECS")]
        max_age_secs: Option<u64>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => commands::config::run(),
        Command::Sessions { command: SessionsCommand::Purge { max_age_secs } } => {
            commands::sessions::purge(max_age_secs)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
