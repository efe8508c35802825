use clap::Parser;
use tracing_subscriber::EnvFilter;

use pharmaref::cli::{Cli, CommandOutput, Commands};
use pharmaref::config::AppConfig;

fn init_tracing(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(cli: Cli) -> anyhow::Result<Option<CommandOutput>> {
    let mut config = AppConfig::load()?;
    match cli.command {
        Commands::Serve { host, port } => {
            init_tracing(&config.log_level);
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            pharmaref::server::start_server(config).await?;
            Ok(None)
        }
        command => {
            init_tracing("warn");
            Ok(Some(pharmaref::cli::run(Cli { command }, config).await?))
        }
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(Some(output)) => {
            println!("{}", output.text);
            if output.success {
                std::process::ExitCode::SUCCESS
            } else {
                std::process::ExitCode::from(1)
            }
        }
        Ok(None) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            if let Some(pharma_err) = err.downcast_ref::<pharmaref::error::PharmaError>() {
                eprintln!("Error: {pharma_err}");
            } else {
                eprintln!("Error: {err:#}");
            }
            std::process::ExitCode::from(1)
        }
    }
}
