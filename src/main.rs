use anyhow::Result;
use clap::Parser;
use pixy_relay::cli::{Cli, Commands};
use pixy_relay::storage::filesystem::FileSystemStorage;
use pixy_relay::storage::ConversationStorage;
use pixy_relay::{server, utils, ConversationRelay, GeminiClient, RelayError, Settings};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::new()?;
    init_tracing(&settings.logging.level);

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { port } => handle_serve(settings, port).await,
        Commands::Chat {
            storage_dir,
            key,
            reset,
        } => handle_chat(settings, storage_dir, key, reset).await,
    };

    if let Err(e) = &result {
        utils::print_error(&format!("Error: {:#}", e));
    }
    result
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn handle_serve(mut settings: Settings, port: Option<u16>) -> Result<()> {
    if let Some(port) = port {
        settings.server.port = port;
    }

    let api_key = Settings::api_key()?;
    let state = pixy_relay::build_state(&settings, api_key)?;

    if Settings::mail_credentials().is_none() {
        tracing::warn!("EMAIL_USER/EMAIL_PASS not set, /send-email will fail");
    }

    server::start_server(&settings, state).await
}

async fn handle_chat(settings: Settings, storage_dir: String, key: String, reset: bool) -> Result<()> {
    let storage = Arc::new(FileSystemStorage::new(PathBuf::from(storage_dir)).await?);
    if reset {
        storage.clear(&key).await?;
    }

    let gateway = Arc::new(GeminiClient::new(Settings::api_key()?, settings.clone())?);
    let relay = ConversationRelay::from_settings(&settings, gateway, storage);

    utils::print_header("Pixy 🍄");
    utils::print_info("Type a message and press Enter. Ctrl-D to leave.");
    for turn in relay.history(&key).await? {
        utils::print_turn(&turn);
    }

    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        utils::print_prompt("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match relay.send_message(&key, &line, None).await {
            Ok(reply) => utils::print_turn(&pixy_relay::Turn::assistant(reply)),
            Err(RelayError::Upstream(fallback)) => utils::print_error(&fallback),
            Err(e) => return Err(e.into()),
        }
    }

    println!();
    Ok(())
}
