//! Ruster Shield - interactive token security checker
//!
//! Reads chat commands from stdin and prints the bot's reply.
//!
//! Usage:
//!   cargo run --bin ruster_shield             (live GoPlus API)
//!   cargo run --bin ruster_shield -- --offline (built-in chain list, no network)
//!
//! Type `exit` or `quit` to leave.

use ruster_shield::utils::constants::{APP_NAME, APP_VERSION};
use ruster_shield::{BotConfig, CommandRouter, GoPlusClient, InMemoryProvider, SecurityProvider};

use eyre::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so replies stay readable on stdout
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let offline = std::env::args().skip(1).any(|arg| arg == "--offline");
    let config = BotConfig::from_env()?;
    info!("⚙️ Config: {:?}", config);

    let provider: Arc<dyn SecurityProvider> = if offline {
        info!("📴 Offline mode: using built-in chain list");
        Arc::new(InMemoryProvider::with_default_chains())
    } else {
        Arc::new(GoPlusClient::from_config(&config))
    };
    let router = CommandRouter::from_provider(provider, &config);

    let mut stdout = tokio::io::stdout();
    let banner = format!("🛡️ {} v{} 代币安全检查 (输入 exit 退出)\n", APP_NAME, APP_VERSION);
    stdout.write_all(banner.as_bytes()).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break,
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        let reply = router.handle_message(input).await;
        stdout.write_all(reply.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
    }

    info!("👋 Bye");
    Ok(())
}
