//! Server execution logic.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::domain::{AuthProvider, MessagePusher};
use crate::relay::{
    ConnectionRegistry, MessageRelay, PresenceTracker, RoomManager, TypingCoordinator,
};

use super::{
    handler::{
        http::{get_presence, health_check},
        websocket::websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// WebSocket chat relay server.
///
/// Owns the wiring of the relay components and runs the axum server with
/// graceful shutdown. Component lifecycle is tied to this server: the typing
/// sweeper starts when `run` is called and stops when it returns.
pub struct RelayServer {
    state: Arc<AppState>,
}

impl RelayServer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        registry: Arc<ConnectionRegistry>,
        rooms: Arc<RoomManager>,
        presence: Arc<PresenceTracker>,
        typing: Arc<TypingCoordinator>,
        relay: Arc<MessageRelay>,
        pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            state: Arc::new(AppState {
                auth,
                registry,
                rooms,
                presence,
                typing,
                relay,
                pusher,
            }),
        }
    }

    /// The axum router for this relay, exposed separately so tests can serve
    /// it on an ephemeral port.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/ws", get(websocket_handler))
            .route("/api/health", get(health_check))
            .route("/api/presence/{user_id}", get(get_presence))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the relay server until a shutdown signal arrives.
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let sweeper = self.state.typing.spawn_sweeper();

        let app = self.router();
        let bind_addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

        tracing::info!("Chat relay listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws?user_id=<id>&token=<token>", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        sweeper.abort();
        tracing::info!("Relay shutdown complete");

        Ok(())
    }
}
