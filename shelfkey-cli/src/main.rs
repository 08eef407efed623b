//! Shelfkey CLI - rotate the key protecting stored catalog passwords

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{logs, rotate, status};

/// Shelfkey - re-encrypt stored catalog credentials
#[derive(Parser)]
#[command(name = "shelfkey", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-encrypt every stored catalog password under a new algorithm or key
    Rotate {
        /// New encryption algorithm (aes, chacha20)
        algorithm: String,
        /// New encryption key (defaults to the key on file)
        key: Option<String>,
        /// Skip confirmation prompt (required with --json)
        #[arg(long, short)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show encryption settings and how secrets are stored
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Rotate {
            algorithm,
            key,
            yes,
            json,
        } => rotate::run(algorithm, key, yes, json),
        Commands::Status { json } => status::run(json),
        Commands::Logs { command } => logs::run(command),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_rotate_key_is_optional() {
        let cli = Cli::try_parse_from(["shelfkey", "rotate", "chacha20"]).unwrap();
        match cli.command {
            Commands::Rotate { algorithm, key, .. } => {
                assert_eq!(algorithm, "chacha20");
                assert!(key.is_none());
            }
            _ => panic!("expected rotate"),
        }
    }

    #[test]
    fn test_rotate_json_with_yes() {
        let cli = Cli::try_parse_from(["shelfkey", "rotate", "aes", "k2", "--json", "-y"]).unwrap();
        match cli.command {
            Commands::Rotate { yes, json, .. } => {
                assert!(yes);
                assert!(json);
            }
            _ => panic!("expected rotate"),
        }
    }

    #[test]
    fn test_rotate_requires_algorithm() {
        assert!(Cli::try_parse_from(["shelfkey", "rotate"]).is_err());
    }
}
