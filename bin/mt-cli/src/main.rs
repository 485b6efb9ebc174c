//! MediTurnos command-line client
//!
//! Signs in against the MediTurnos backend and runs the patient, history,
//! review, payment and express-appointment operations. The session is kept
//! in the configured credentials file between invocations.

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use tracing::{debug, info};

use mt_client::{
    ClientConfig, CredentialStorage, FileStorage, MediTurnos, MemoryStorage, SessionObserver,
    TokenStore,
};
use mt_config::{AppConfig, ConfigLoader};

use commands::Command;

#[derive(Parser, Debug)]
#[command(name = "mt-cli")]
#[command(about = "MediTurnos command-line client")]
#[command(version)]
struct Args {
    /// Path of the TOML configuration file
    #[arg(long, env = "MEDITURNOS_CONFIG")]
    config: Option<PathBuf>,

    /// Backend base URL (overrides the configuration file)
    #[arg(long, env = "MEDITURNOS_API_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

/// Tells the user to sign in again when the backend ends the session.
struct PromptLogin;

#[async_trait]
impl SessionObserver for PromptLogin {
    async fn session_expired(&self, login_path: &str) {
        info!(login_path, "Session expired");
        eprintln!("La sesión expiró. Iniciá sesión nuevamente con `mt-cli login`.");
    }
}

#[tokio::main]
async fn main() {
    mt_common::logging::init_logging("mt-cli");

    if let Err(e) = run(Args::parse()).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let loader = match &args.config {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load().context("Failed to load configuration")?;
    if let Some(base_url) = args.base_url {
        config.api.base_url = base_url;
        config.validate()?;
    }

    if let Command::Config = args.command {
        print!("{}", AppConfig::example_toml());
        return Ok(());
    }

    let tokens = TokenStore::from_shared(open_storage(&config));
    let client_config = ClientConfig::new(config.api.base_url.as_str())
        .with_timeout(config.api.timeout())
        .with_login_path(config.api.login_path.as_str())
        .with_user_agent(config.api.user_agent.as_str())
        .with_retry_delay(config.cache.retry_delay());
    debug!(base_url = %client_config.base_url, "Client configured");

    let client = MediTurnos::with_observer(client_config, tokens, Arc::new(PromptLogin))
        .context("Failed to create HTTP client")?;

    let output = commands::execute(&client, args.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn open_storage(config: &AppConfig) -> Arc<dyn CredentialStorage> {
    match config.storage.backend.as_str() {
        "memory" => Arc::new(MemoryStorage::new()),
        _ => {
            let path = config.storage.path();
            debug!(path = %path.display(), "Using file credential storage");
            Arc::new(FileStorage::new(path))
        }
    }
}
