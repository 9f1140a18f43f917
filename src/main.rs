use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use impact_rating::{
    cli::{execute_command, execute_score, Cli, Command},
    config::{Config, LogFormat},
    service::ImpactService,
    storage::SqliteStorage,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(version = env!("CARGO_PKG_VERSION"), "Impact rating CLI starting...");

    let result = match cli.command {
        Command::Score { input } => execute_score(&input),
        command => {
            let storage = match SqliteStorage::new(&config.database).await {
                Ok(s) => {
                    info!(path = %config.database.path.display(), "Database initialized");
                    s
                }
                Err(e) => {
                    error!(error = %e, "Failed to initialize database");
                    return Err(e.into());
                }
            };

            let service = ImpactService::new(storage);
            execute_command(command, &service).await
        }
    };

    if result.exit_code == 0 {
        println!("{}", result.message);
    } else {
        eprintln!("{}", result.message);
    }
    std::process::exit(result.exit_code);
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
