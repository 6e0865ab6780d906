use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use gearhub::api::{ApiClient, HttpTransport};
use gearhub::catalog::Catalog;
use gearhub::config::ClientConfig;
use gearhub::logging;
use gearhub::session::SessionStore;
use gearhub::state::FileStore;

mod commands;

use commands::{App, Commands};

/// Client for the community gear catalog
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the catalog API (overrides GEARHUB_BACKEND_URL)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Session file (overrides GEARHUB_STATE_PATH)
    #[arg(long, global = true)]
    state_path: Option<PathBuf>,

    /// Log requests and responses
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let diagnostics = logging::create_diagnostics_buffer(200);
    logging::init(args.verbose, diagnostics.clone());

    let config = ClientConfig::from_env()
        .and_then(|c| c.with_backend_url(args.backend_url.clone()))
        .map(|c| c.with_state_path(args.state_path.clone()))
        .context("Invalid configuration")?;
    let transport = HttpTransport::new(&config.backend_url, config.timeout)
        .context("Failed to build HTTP client")?;
    debug!("Using catalog API at {}", transport.base_url());
    let api = ApiClient::new(Arc::new(transport));
    let storage = Arc::new(FileStore::new(&config.state_path));
    debug!("Session file at {}", storage.path().display());

    let mut sessions = SessionStore::new(storage, api.clone());
    if let Err(e) = sessions.restore().await {
        warn!("Could not restore session: {}, continuing logged out", e);
    }

    let mut app = App {
        sessions,
        catalog: Catalog::new(api),
        diagnostics,
    };

    let result = match args.command {
        Commands::Shell => commands::shell(&mut app).await,
        command => commands::run(&mut app, command).await,
    };

    if let Err(e) = result {
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
    Ok(())
}
