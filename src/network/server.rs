//! WebSocket Game Server
//!
//! Async WebSocket server for puzzle duels. Each connection gets a reader
//! loop and a writer task; every classified message is applied to the
//! shared [`Matchmaker`] under its lock.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::network::matchmaker::Matchmaker;
use crate::network::participant::{Participant, ParticipantId};
use crate::network::protocol::{ClientMessage, Inbound, ServerMessage};
use crate::network::session::FinishPolicy;
use crate::puzzle::generator::{PuzzleSource, SudokuGenerator};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Answer malformed messages with an `error` message.
    pub notify_malformed: bool,
    /// When a decided session ends.
    pub finish_policy: FinishPolicy,
    /// Fixed puzzle seed; `None` seeds from the clock.
    pub puzzle_seed: Option<u64>,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            notify_malformed: true,
            finish_policy: FinishPolicy::FirstSolve,
            puzzle_seed: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables, falling back to defaults
    /// for unset ones.
    ///
    /// - `SUDOKU_BIND_ADDR` (e.g. `127.0.0.1:8080`)
    /// - `SUDOKU_MAX_CONNECTIONS`
    /// - `SUDOKU_NOTIFY_MALFORMED` (`true`/`1` or `false`/`0`)
    /// - `SUDOKU_FINISH_POLICY` (`first` or `both`)
    /// - `SUDOKU_PUZZLE_SEED`
    pub fn from_env() -> Result<Self, GameServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GameServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("SUDOKU_BIND_ADDR") {
            config.bind_addr = addr
                .parse()
                .map_err(|_| GameServerError::Config(format!("invalid SUDOKU_BIND_ADDR: {addr}")))?;
        }
        if let Some(max) = lookup("SUDOKU_MAX_CONNECTIONS") {
            config.max_connections = max
                .parse()
                .map_err(|_| GameServerError::Config(format!("invalid SUDOKU_MAX_CONNECTIONS: {max}")))?;
        }
        if let Some(flag) = lookup("SUDOKU_NOTIFY_MALFORMED") {
            config.notify_malformed = match flag.as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                other => {
                    return Err(GameServerError::Config(format!(
                        "invalid SUDOKU_NOTIFY_MALFORMED: {other}"
                    )))
                }
            };
        }
        if let Some(policy) = lookup("SUDOKU_FINISH_POLICY") {
            config.finish_policy = match policy.as_str() {
                "first" => FinishPolicy::FirstSolve,
                "both" => FinishPolicy::BothSolve,
                other => {
                    return Err(GameServerError::Config(format!(
                        "invalid SUDOKU_FINISH_POLICY: {other}"
                    )))
                }
            };
        }
        if let Some(seed) = lookup("SUDOKU_PUZZLE_SEED") {
            config.puzzle_seed = Some(
                seed.parse()
                    .map_err(|_| GameServerError::Config(format!("invalid SUDOKU_PUZZLE_SEED: {seed}")))?,
            );
        }

        Ok(config)
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Waiting queue and session registry.
    matchmaker: Arc<Mutex<Matchmaker>>,
    /// Open WebSocket connections.
    connections: Arc<AtomicUsize>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server using the built-in generator.
    pub fn new(config: ServerConfig) -> Self {
        let generator = match config.puzzle_seed {
            Some(seed) => SudokuGenerator::new(seed),
            None => SudokuGenerator::from_entropy(),
        };
        info!("Puzzle seed: {}", generator.seed());
        Self::with_puzzle_source(config, Box::new(generator))
    }

    /// Create a game server drawing boards from `puzzles`.
    pub fn with_puzzle_source(config: ServerConfig, puzzles: Box<dyn PuzzleSource>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let matchmaker = Matchmaker::new(puzzles, config.finish_policy);

        Self {
            config,
            matchmaker: Arc::new(Mutex::new(matchmaker)),
            connections: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
        }
    }

    /// Bind the configured address and run until shutdown.
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Accept connections from `listener` until shutdown.
    #[instrument(skip(self, listener))]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!("Game server listening on {}", listener.local_addr()?);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.connections.load(Ordering::Relaxed) >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let matchmaker = self.matchmaker.clone();
        let connections = self.connections.clone();
        let notify_malformed = self.config.notify_malformed;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        connections.fetch_add(1, Ordering::Relaxed);

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    connections.fetch_sub(1, Ordering::Relaxed);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<ServerMessage>();

            let participant = Participant::new(msg_tx.clone());
            let id = participant.id();
            matchmaker.lock().await.add_participant(participant);
            debug!("Client {} registered as {}", addr, id);

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                Self::handle_text(id, &text, &matchmaker, notify_malformed, &msg_tx).await;
                            }
                            Some(Ok(Message::Binary(_))) => {
                                debug!("Ignoring binary frame from {}", id);
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                warn!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            // Cleanup
            sender_task.abort();
            matchmaker.lock().await.remove_participant(id);
            connections.fetch_sub(1, Ordering::Relaxed);

            info!("Client {} cleaned up", addr);
        });
    }

    /// Classify one text frame and apply it.
    ///
    /// Malformed frames never reach the matchmaker; unknown types are
    /// dropped quietly.
    async fn handle_text(
        id: ParticipantId,
        text: &str,
        matchmaker: &Arc<Mutex<Matchmaker>>,
        notify_malformed: bool,
        sender: &mpsc::UnboundedSender<ServerMessage>,
    ) {
        match ClientMessage::classify(text) {
            Ok(Inbound::Message(msg)) => {
                matchmaker.lock().await.dispatch(id, msg);
            }
            Ok(Inbound::Unknown(kind)) => {
                debug!("Ignoring message type {:?} from {}", kind, id);
            }
            Err(e) => {
                warn!("Malformed message from {}: {}", id, e);
                if notify_malformed {
                    let _ = sender.send(ServerMessage::Error {
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }

    /// Get live session count.
    pub async fn session_count(&self) -> usize {
        self.matchmaker.lock().await.session_count()
    }

    /// Get number of participants waiting for an opponent.
    pub async fn queue_size(&self) -> usize {
        self.matchmaker.lock().await.waiting_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzle::difficulty::Difficulty;
    use crate::puzzle::fixtures::{self, FixedSource};
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn start_server(config: ServerConfig) -> (Arc<GameServer>, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(GameServer::with_puzzle_source(
            config,
            Box::new(FixedSource::default()),
        ));
        let running = server.clone();
        tokio::spawn(async move {
            running.serve(listener).await.unwrap();
        });
        (server, addr)
    }

    async fn connect(addr: SocketAddr) -> Client {
        let (ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();
        ws
    }

    async fn send(client: &mut Client, msg: &ClientMessage) {
        client.send(Message::Text(msg.to_json().unwrap())).await.unwrap();
    }

    async fn recv(client: &mut Client) -> ServerMessage {
        loop {
            let frame = timeout(Duration::from_secs(5), client.next())
                .await
                .expect("timed out waiting for server message")
                .expect("connection closed")
                .unwrap();
            if let Message::Text(text) = frame {
                return ServerMessage::from_json(&text).unwrap();
            }
        }
    }

    async fn wait_for<F>(server: &GameServer, check: F)
    where
        F: Fn(usize, usize) -> bool,
    {
        for _ in 0..100 {
            if check(server.queue_size().await, server.session_count().await) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("server never reached expected state");
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.max_connections, 1000);
        assert!(config.notify_malformed);
        assert_eq!(config.finish_policy, FinishPolicy::FirstSolve);
        assert!(config.puzzle_seed.is_none());
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("SUDOKU_BIND_ADDR", "127.0.0.1:9000"),
            ("SUDOKU_MAX_CONNECTIONS", "10"),
            ("SUDOKU_NOTIFY_MALFORMED", "0"),
            ("SUDOKU_FINISH_POLICY", "both"),
            ("SUDOKU_PUZZLE_SEED", "42"),
        ]
        .into_iter()
        .collect();

        let config = ServerConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.max_connections, 10);
        assert!(!config.notify_malformed);
        assert_eq!(config.finish_policy, FinishPolicy::BothSolve);
        assert_eq!(config.puzzle_seed, Some(42));
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let result = ServerConfig::from_lookup(|k| {
            (k == "SUDOKU_FINISH_POLICY").then(|| "sometimes".to_string())
        });
        assert!(matches!(result, Err(GameServerError::Config(_))));

        let result = ServerConfig::from_lookup(|k| {
            (k == "SUDOKU_BIND_ADDR").then(|| "nowhere".to_string())
        });
        assert!(matches!(result, Err(GameServerError::Config(_))));
    }

    #[tokio::test]
    async fn test_server_creation() {
        let server = GameServer::new(ServerConfig {
            puzzle_seed: Some(1),
            ..Default::default()
        });

        assert_eq!(server.connection_count(), 0);
        assert_eq!(server.session_count().await, 0);
        assert_eq!(server.queue_size().await, 0);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_duel_over_websocket() {
        let (server, addr) = start_server(ServerConfig::default()).await;
        let puzzle = fixtures::easy_puzzle();

        let mut a = connect(addr).await;
        let mut b = connect(addr).await;

        send(&mut a, &ClientMessage::Join { difficulty: Difficulty::Easy }).await;
        wait_for(&server, |queued, _| queued == 1).await;
        send(&mut b, &ClientMessage::Join { difficulty: Difficulty::Easy }).await;

        let dealt = ServerMessage::InitialBoard {
            board: puzzle.initial().clone(),
        };
        assert_eq!(recv(&mut a).await, dealt);
        assert_eq!(recv(&mut b).await, dealt);
        assert_eq!(server.session_count().await, 1);

        send(
            &mut a,
            &ClientMessage::UpdateBoard {
                board: puzzle.solution().clone(),
            },
        )
        .await;

        assert_eq!(recv(&mut a).await, ServerMessage::GameOver);
        assert_eq!(
            recv(&mut b).await,
            ServerMessage::UpdateProgressBar { percentage: 100.0 }
        );
        assert_eq!(recv(&mut b).await, ServerMessage::YouLost);

        wait_for(&server, |_, sessions| sessions == 0).await;
        server.shutdown();
    }

    #[tokio::test]
    async fn test_malformed_message_gets_error_and_connection_survives() {
        let (server, addr) = start_server(ServerConfig::default()).await;
        let mut a = connect(addr).await;

        a.send(Message::Text(r#"{"type":"updateBoard","board":[1,2,3]}"#.to_string()))
            .await
            .unwrap();
        assert!(matches!(recv(&mut a).await, ServerMessage::Error { .. }));

        // Unknown types are silently dropped; the connection keeps working.
        a.send(Message::Text(r#"{"type":"chat"}"#.to_string())).await.unwrap();
        send(&mut a, &ClientMessage::Join { difficulty: Difficulty::Hard }).await;
        wait_for(&server, |queued, _| queued == 1).await;

        server.shutdown();
    }

    #[tokio::test]
    async fn test_disconnect_withdraws_from_queue() {
        let (server, addr) = start_server(ServerConfig::default()).await;
        let mut a = connect(addr).await;

        send(&mut a, &ClientMessage::Join { difficulty: Difficulty::Master }).await;
        wait_for(&server, |queued, _| queued == 1).await;

        a.close(None).await.unwrap();
        wait_for(&server, |queued, _| queued == 0).await;

        server.shutdown();
    }
}
