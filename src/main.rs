use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pipehub::config::HubConfig;
use pipehub::server::start_server;

#[derive(Parser)]
#[command(name = "pipehub")]
#[command(version, about = "VFX pipeline dashboard and ticket tracker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the dashboard server (the default)
    Serve {
        /// Override PIPEHUB_PORT
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind all interfaces and allow cross-origin requests
        #[arg(long)]
        dev: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "pipehub=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let (port, dev) = match cli.command {
        Some(Commands::Serve { port, dev }) => (port, dev),
        None => (None, false),
    };

    let mut config = HubConfig::from_env();
    if let Some(port) = port {
        config.port = port;
    }

    start_server(config, dev).await
}
