use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use itube::config::Config;
use itube::constants::DEFAULT_PORT;
use itube::gemini::GeminiGateway;
use itube::orchestrator::Orchestrator;
use itube::relay::RelayClient;
use itube::youtube::YouTubeGateway;
use itube::{chat, web_server};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Commands,
}

// Define the available subcommands
#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the I-Tube web server.
    Start {
        #[arg(long, default_value_t = DEFAULT_PORT, help = "Port for the web server.")]
        port: u16,
    },
    /// Chat with the AI from the terminal.
    Chat {
        #[arg(long, help = "Include related YouTube videos with each answer.")]
        video: bool,
        #[arg(long, help = "Talk to a running I-Tube server instead of calling the APIs directly.")]
        server: Option<String>,
    },
}

// The main entry point of the application, using tokio's async runtime
#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for GEMINI_API_KEY, YOUTUBE_API_KEY)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG environment variable (e.g., RUST_LOG=info,itube=debug)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    info!("I-Tube starting with command: {:?}", cli.command);

    match cli.command {
        Commands::Start { port } => {
            info!("Starting I-Tube on port {}...", port);

            let mut web_server_handle = tokio::spawn(async move {
                if let Err(e) = web_server::start_web_server(port, cli.config).await {
                    error!("Web server failed: {:?}", e);
                }
            });

            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Ctrl-C received, shutting down...");
                }
                res = &mut web_server_handle => {
                    match res {
                        Ok(_) => info!("Web server task completed."),
                        Err(e) if e.is_panic() => error!("Web server task panicked: {:?}", e),
                        Err(e) => error!("Web server task failed: {:?}", e),
                    }
                }
            }

            if !web_server_handle.is_finished() {
                info!("Aborting web server task...");
                web_server_handle.abort();
            }
            info!("Shutdown complete.");
        }
        Commands::Chat { video, server } => {
            let client = reqwest::Client::new();
            let orchestrator = match server {
                Some(url) => {
                    info!("Relaying chat through {}", url);
                    let relay = Arc::new(RelayClient::new(client, url));
                    Orchestrator::new(relay.clone(), relay)
                }
                None => Orchestrator::new(
                    Arc::new(GeminiGateway::from_config(client.clone(), &cli.config)),
                    Arc::new(YouTubeGateway::from_config(client, &cli.config)),
                ),
            };

            chat::run_chat(&orchestrator, video)
                .await
                .context("Chat session failed")?;
        }
    }

    Ok(())
}
