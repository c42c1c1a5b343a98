use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use jobsink_sync::{Config, FetchScheduler, IngestPipeline};
use jobsink_web::AppState;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "jobsink")]
#[command(about = "Job listing ingestion service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the web server and, when enabled, the recurring fetch scheduler.
    Serve,
    /// Run one fetch-and-store pass and exit.
    Fetch,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Fetch => {
            let pipeline = IngestPipeline::from_config(&config).await?;
            let summary = pipeline
                .run_once(&config.search_query, &config.search_location)
                .await?;
            println!(
                "fetch complete: run_id={} fetched={} inserted={}",
                summary.run_id, summary.fetched, summary.inserted
            );
        }
        Commands::Serve => {
            let pipeline = Arc::new(IngestPipeline::from_config(&config).await?);
            let scheduler = FetchScheduler::maybe_start(&config, pipeline.clone()).await?;
            let state = AppState {
                pipeline,
                search_query: config.search_query.clone(),
                search_location: config.search_location.clone(),
            };
            let listener = TcpListener::bind(("0.0.0.0", config.web_port)).await?;
            info!(port = config.web_port, "listening");
            jobsink_web::serve(listener, state, async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?;
            if let Some(scheduler) = scheduler {
                scheduler.stop().await?;
            }
        }
    }

    Ok(())
}
