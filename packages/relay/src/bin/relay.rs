//! Standalone chat relay binary.
//!
//! Runs the relay with an in-memory message store and a permissive auth
//! gate; a real deployment embeds [`irori_relay::ui::RelayServer`] with the
//! CMS's own storage and authorization collaborators.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin irori-relay
//! cargo run --bin irori-relay -- --host 0.0.0.0 --port 3000
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use irori_relay::{
    infrastructure::{
        auth::OpenAuthProvider, message_pusher::WebSocketMessagePusher,
        storage::InMemoryMessageStore,
    },
    relay::{
        ConnectionRegistry, MessageRelay, PresenceTracker, RoomManager, TypingCoordinator,
        DEFAULT_TYPING_TIMEOUT,
    },
    ui::RelayServer,
};
use irori_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(about = "Real-time chat relay with presence and typing indicators", long_about = None)]
struct Args {
    /// Host address to bind the relay to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the relay to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Seconds a typing indicator lives without a refresh
    #[arg(long, default_value_t = DEFAULT_TYPING_TIMEOUT.as_secs())]
    typing_timeout_secs: u64,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // Initialize dependencies in order:
    // 1. Clock + collaborators (storage, auth)
    // 2. MessagePusher
    // 3. Relay components (registry -> rooms -> presence/typing -> relay)
    // 4. Server
    let clock = Arc::new(SystemClock);
    let store = Arc::new(InMemoryMessageStore::new(clock.clone()));
    let auth = Arc::new(OpenAuthProvider);

    let pusher = Arc::new(WebSocketMessagePusher::new());

    let registry = Arc::new(ConnectionRegistry::new());
    let rooms = Arc::new(RoomManager::new(
        registry.clone(),
        auth.clone(),
        pusher.clone(),
    ));
    let presence = Arc::new(PresenceTracker::new(clock.clone()));
    let typing = Arc::new(TypingCoordinator::new(
        rooms.clone(),
        clock.clone(),
        Duration::from_secs(args.typing_timeout_secs),
    ));
    let relay = Arc::new(MessageRelay::new(
        registry.clone(),
        rooms.clone(),
        typing.clone(),
        store.clone(),
        pusher.clone(),
    ));

    let server = RelayServer::new(auth, registry, rooms, presence, typing, relay, pusher);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Relay error: {}", e);
        std::process::exit(1);
    }
}
