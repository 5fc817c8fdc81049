//! Bridge server: the WebSocket endpoint the editor page connects to.
//!
//! The page half of the bridge (`bridge.js`) opens
//! `ws://127.0.0.1:<bridge port>/bridge`.  The listener runs on its own
//! loopback port, picked by the OS, next to the asset server; the asset
//! server writes that port into the `bridge.js` it hands out.
//!
//! Each accepted connection is upgraded in its own Tokio task and then
//! served by [`RendererLink::serve_session`] until the page goes away.
//!
//! Shutdown follows the same pattern as the asset server: the accept loop
//! polls a shared `AtomicBool` between 200 ms accept timeouts.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::{debug, error, info, warn};

use crate::infrastructure::renderer_link::RendererLink;

/// Path of the bridge WebSocket endpoint.
pub const BRIDGE_PATH: &str = "/bridge";

/// Binds the bridge listener.  Use port `0` to let the OS pick one.
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub async fn bind_bridge(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind the bridge listener on {addr}"))
}

/// Runs the accept loop until `running` is cleared.
///
/// # Errors
///
/// Currently infallible once bound; the `Result` keeps the signature in line
/// with [`bind_bridge`].
pub async fn run_bridge_server(
    listener: TcpListener,
    link: RendererLink,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("bridge listening on ws://{addr}{BRIDGE_PATH}");
    }

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping bridge listener");
            break;
        }

        match timeout(Duration::from_millis(200), listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                let link = link.clone();
                tokio::spawn(async move {
                    handle_connection(stream, peer_addr, link).await;
                });
            }
            Ok(Err(e)) => error!("accept error: {e}"),
            // No connection in the last 200 ms; re-check the flag.
            Err(_) => {}
        }
    }

    Ok(())
}

async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, link: RendererLink) {
    match accept_hdr_async(stream, check_path).await {
        Ok(ws) => {
            debug!("bridge connection from {peer_addr}");
            link.serve_session(ws).await;
        }
        Err(e) => warn!("bridge handshake with {peer_addr} failed: {e}"),
    }
}

/// Only `/bridge` upgrades; anything else is answered with 404.
#[allow(clippy::result_large_err)]
fn check_path(request: &Request, response: Response) -> Result<Response, ErrorResponse> {
    if request.uri().path() == BRIDGE_PATH {
        return Ok(response);
    }
    let mut refusal = ErrorResponse::new(Some(format!("no bridge at {}", request.uri().path())));
    *refusal.status_mut() = StatusCode::NOT_FOUND;
    Err(refusal)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
