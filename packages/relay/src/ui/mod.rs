//! UI layer: WebSocket/HTTP endpoints and server wiring.

mod handler;
mod server;
mod signal;
mod state;

pub use server::RelayServer;
pub use state::AppState;
