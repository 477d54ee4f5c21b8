// Server module entry
// Listener setup, the accept loop and per-connection serving

pub mod connection;
pub mod listener;

use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::logger;
use crate::routing::Router;

pub use connection::{accept_connection, handle_request};
pub use listener::create_reusable_listener;

/// Shared, read-only state handed to every connection
pub struct ServerState {
    pub config: Config,
    pub router: Router,
}

/// Accept connections until Ctrl+C
pub async fn run(listener: TcpListener, state: Arc<ServerState>) -> std::io::Result<()> {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => accept_connection(stream, peer_addr, &state),
                Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
            },
            _ = tokio::signal::ctrl_c() => {
                logger::log_warning("Shutdown requested, no longer accepting connections");
                return Ok(());
            }
        }
    }
}
