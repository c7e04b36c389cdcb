use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use greenlabel::cli::{self, Args};
use greenlabel::config::Config;
use greenlabel::db::{Database, LibSqlBackend, ProductStore};
use greenlabel::services::DiscoveryPipeline;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "greenlabel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();
    let (pipeline, store) = match startup(&config).await {
        Ok(started) => started,
        Err(e) => {
            tracing::error!("Startup failed: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = cli::run(&pipeline, args.command).await;
    pipeline.flush().await;
    if let Err(e) = store.sync().await {
        tracing::warn!(error = %e, "Database sync failed");
    }

    let (rendered, code) = match result {
        Ok(output) => (serde_json::to_string_pretty(&output), ExitCode::SUCCESS),
        Err(e) => {
            tracing::error!(code = e.code(), error = %e, "Command failed");
            (serde_json::to_string_pretty(&e.report()), ExitCode::FAILURE)
        }
    };

    match rendered {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render output");
            return ExitCode::FAILURE;
        }
    }
    code
}

async fn startup(config: &Config) -> anyhow::Result<(DiscoveryPipeline, Arc<dyn ProductStore>)> {
    tracing::info!(url = %config.database.url, "Initializing database...");
    let raw_db = Database::new(&config.database)
        .await
        .context("Failed to open product database")?;
    let store: Arc<dyn ProductStore> = Arc::new(LibSqlBackend::new(raw_db));

    let pipeline = DiscoveryPipeline::from_config(config, store.clone())
        .context("Failed to initialize discovery pipeline")?;
    Ok((pipeline, store))
}
