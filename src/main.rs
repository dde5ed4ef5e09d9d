//! Sudoku Duel Server
//!
//! WebSocket server pairing players into head-to-head Sudoku sessions.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use sudoku_duel::{GameServer, ServerConfig, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;

    info!("Sudoku Duel Server v{}", VERSION);
    info!("Finish policy: {:?}", config.finish_policy);

    let server = Arc::new(GameServer::new(config));

    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            signal_server.shutdown();
        }
    });

    server.run().await?;

    info!("Server stopped");
    Ok(())
}
