//! Command-line entry points: the HTTP server plus one-shot commands that run
//! a single workflow and print its JSON response.

pub mod health;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::entities::localized::Language;
use crate::entities::{drug, interaction, search, similar};
use crate::render::json::to_pretty;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "pharmaref", version, about = "Multilingual drug-label reference service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Check connectivity to the label database and AI providers
    Health {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Full drug page with AI summaries
    Lookup {
        name: String,
        /// Output language: en, ar or ku
        #[arg(long, default_value = "en")]
        lang: String,
    },
    /// Label search with regional-name fallback
    Search { query: String },
    /// Pairwise interaction check for two or more drugs
    Interactions {
        #[arg(required = true, num_args = 1..)]
        drugs: Vec<String>,
        #[arg(long, default_value = "en")]
        lang: String,
    },
    /// Same-class drugs and therapeutic alternatives
    Similar {
        name: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
}

/// Printable result of a one-shot command. `success` drives the exit code.
#[derive(Debug)]
pub struct CommandOutput {
    pub text: String,
    pub success: bool,
}

impl CommandOutput {
    fn ok(text: String) -> Self {
        Self {
            text,
            success: true,
        }
    }
}

/// Runs a one-shot command. `serve` is handled by the binary.
pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<CommandOutput> {
    match cli.command {
        Commands::Serve { .. } => anyhow::bail!("serve is not a one-shot command"),
        Commands::Health { json } => {
            let report = health::check(&config).await?;
            let text = if json {
                to_pretty(&report)?
            } else {
                report.to_table()
            };
            Ok(CommandOutput {
                text,
                success: report.all_healthy(),
            })
        }
        Commands::Lookup { name, lang } => {
            let state = AppState::from_config(&config)?;
            let response = drug::lookup(&state, &name, Language::from_code(&lang)).await;
            Ok(CommandOutput::ok(to_pretty(&response)?))
        }
        Commands::Search { query } => {
            let state = AppState::from_config(&config)?;
            let response = search::search(&state.labels, &query).await;
            Ok(CommandOutput::ok(to_pretty(&response)?))
        }
        Commands::Interactions { drugs, lang } => {
            let state = AppState::from_config(&config)?;
            let result =
                interaction::check(&state.labels, &state.ai, &drugs, Language::from_code(&lang))
                    .await;
            Ok(CommandOutput::ok(to_pretty(&result)?))
        }
        Commands::Similar {
            name,
            category,
            limit,
        } => {
            let state = AppState::from_config(&config)?;
            let response = similar::similar(&state.labels, &name, category.as_deref(), limit).await;
            Ok(CommandOutput::ok(to_pretty(&response)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_overrides() {
        let cli = Cli::try_parse_from(["pharmaref", "serve", "--port", "9000"]).unwrap();
        match cli.command {
            Commands::Serve { host, port } => {
                assert_eq!(host, None);
                assert_eq!(port, Some(9000));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn interactions_require_at_least_one_name() {
        assert!(Cli::try_parse_from(["pharmaref", "interactions"]).is_err());
        let cli =
            Cli::try_parse_from(["pharmaref", "interactions", "aspirin", "warfarin", "--lang", "ar"])
                .unwrap();
        match cli.command {
            Commands::Interactions { drugs, lang } => {
                assert_eq!(drugs, vec!["aspirin", "warfarin"]);
                assert_eq!(lang, "ar");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
