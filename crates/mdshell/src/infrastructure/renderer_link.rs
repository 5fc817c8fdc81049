//! RendererLink: the shell side of the `/bridge` WebSocket.
//!
//! One editor page at a time holds a *session*.  The link keeps:
//!
//! - the active session's outbound frame channel (drained by the session task),
//! - a table of pending calls keyed by request id, each holding the oneshot
//!   sender that wakes the caller when the matching reply arrives.
//!
//! ```text
//! console thread                 session task                      page
//!   pull() ──► ReadMarkdown{id} ──► ws.send ───────────────────────► readMarkdown()
//!     ▲                                                                  │
//!     └── oneshot ◄── pending[id] ◄── on_frame ◄── ws.next ◄── Content{id} ┘
//! ```
//!
//! A call fails fast with `NotConnected` when no page has reported `Ready`,
//! with `TimedOut` after the configured call timeout, and with
//! `SessionClosed` when the page goes away mid-call (its pending senders are
//! dropped).  A newer session replaces an older one; the older one is closed.
//!
//! The public async API (`pull_async`, `push_async`) is what the tests use.
//! The [`DocumentBridge`] impl wraps it with `Handle::block_on` for the console
//! thread, which is a plain OS thread outside the runtime.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use mdshell_core::{
    decode_renderer_message, encode_shell_message, LifecycleState, RendererToShell,
    SequenceCounter, ShellToRenderer,
};

use crate::application::content_bridge::{BridgeError, DocumentBridge};
use crate::application::lifecycle::LifecycleHandle;

/// Identifies one WebSocket connection from the editor page.
pub type SessionId = Uuid;

struct ActiveSession {
    id: SessionId,
    outbound: mpsc::UnboundedSender<String>,
    /// Set once the page has sent `Ready` on this connection.
    ready: bool,
}

struct PendingCall {
    session: SessionId,
    reply: oneshot::Sender<RendererToShell>,
}

struct Shared {
    call_timeout: Duration,
    ids: SequenceCounter,
    lifecycle: LifecycleHandle,
    session: Mutex<Option<ActiveSession>>,
    pending: Mutex<HashMap<u64, PendingCall>>,
    /// `true` while a ready page is connected.
    presence: watch::Sender<bool>,
}

/// Cloneable handle on the bridge endpoint.
#[derive(Clone)]
pub struct RendererLink {
    shared: Arc<Shared>,
    runtime: Handle,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RendererLink {
    /// Creates a link with no session.  `runtime` is used by the blocking
    /// [`DocumentBridge`] methods.
    pub fn new(runtime: Handle, lifecycle: LifecycleHandle, call_timeout: Duration) -> Self {
        let (presence, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                call_timeout,
                ids: SequenceCounter::new(),
                lifecycle,
                session: Mutex::new(None),
                pending: Mutex::new(HashMap::new()),
                presence,
            }),
            runtime,
        }
    }

    /// Watches whether a ready editor page is connected.
    pub fn presence(&self) -> watch::Receiver<bool> {
        self.shared.presence.subscribe()
    }

    /// Whether a ready editor page is connected right now.
    pub fn is_ready(&self) -> bool {
        *self.shared.presence.borrow()
    }

    // ── Calls ─────────────────────────────────────────────────────────────────

    /// Fetches the full document from the page.
    ///
    /// # Errors
    ///
    /// See [`BridgeError`]; `Failed` replies become [`BridgeError::Rejected`].
    pub async fn pull_async(&self) -> Result<String, BridgeError> {
        match self.request(|id| ShellToRenderer::ReadMarkdown { id }).await? {
            RendererToShell::Content { content, .. } => Ok(content),
            RendererToShell::Failed { message, .. } => Err(BridgeError::Rejected { message }),
            other => Err(BridgeError::UnexpectedReply {
                expected: "Content",
                got: other.type_name(),
            }),
        }
    }

    /// Replaces the full document in the page.
    ///
    /// # Errors
    ///
    /// See [`BridgeError`]; `Failed` replies become [`BridgeError::Rejected`].
    pub async fn push_async(&self, content: &str) -> Result<(), BridgeError> {
        let content = content.to_string();
        match self
            .request(|id| ShellToRenderer::WriteMarkdown { id, content })
            .await?
        {
            RendererToShell::Written { .. } => Ok(()),
            RendererToShell::Failed { message, .. } => Err(BridgeError::Rejected { message }),
            other => Err(BridgeError::UnexpectedReply {
                expected: "Written",
                got: other.type_name(),
            }),
        }
    }

    /// Sends one request and waits for the reply with the same id.
    async fn request(
        &self,
        build: impl FnOnce(u64) -> ShellToRenderer,
    ) -> Result<RendererToShell, BridgeError> {
        let id = self.shared.ids.next();
        let msg = build(id);
        let kind = msg.type_name();
        let frame = encode_shell_message(&msg).map_err(|e| BridgeError::Encoding(e.to_string()))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        {
            let session = lock(&self.shared.session);
            let session = session
                .as_ref()
                .filter(|s| s.ready)
                .ok_or(BridgeError::NotConnected)?;

            lock(&self.shared.pending).insert(
                id,
                PendingCall {
                    session: session.id,
                    reply: reply_tx,
                },
            );
            let len = frame.len();
            if session.outbound.send(frame).is_err() {
                lock(&self.shared.pending).remove(&id);
                return Err(BridgeError::SessionClosed);
            }
            debug!("session {}: sent {kind} #{id} ({len} bytes)", session.id);
        }

        match timeout(self.shared.call_timeout, reply_rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(BridgeError::SessionClosed),
            Err(_) => {
                lock(&self.shared.pending).remove(&id);
                warn!("{kind} #{id} got no reply within {:?}", self.shared.call_timeout);
                Err(BridgeError::TimedOut {
                    after: self.shared.call_timeout,
                })
            }
        }
    }

    /// Asks the page to close its window, then waits up to `wait` for the
    /// session to go away.  Does nothing when no page is connected.
    pub async fn close_renderer(&self, wait: Duration) {
        let frame = match encode_shell_message(&ShellToRenderer::Close) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("could not encode Close: {e}");
                return;
            }
        };
        let sent = match lock(&self.shared.session).as_ref() {
            Some(session) => session.outbound.send(frame).is_ok(),
            None => false,
        };
        if !sent {
            return;
        }

        let mut presence = self.presence();
        if timeout(wait, presence.wait_for(|ready| !*ready)).await.is_err() {
            debug!("editor page still connected {wait:?} after Close");
        }
    }

    // ── Sessions ──────────────────────────────────────────────────────────────

    /// Serves one editor page connection until it closes or is replaced.
    pub async fn serve_session<S>(&self, ws: WebSocketStream<S>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let session_id = Uuid::new_v4();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

        let previous = lock(&self.shared.session).replace(ActiveSession {
            id: session_id,
            outbound: out_tx,
            ready: false,
        });
        match previous {
            Some(old) => {
                info!("editor session {session_id} replaces {}", old.id);
                if old.ready {
                    self.mark_not_ready();
                }
            }
            None => info!("editor session {session_id} connected"),
        }

        let (mut ws_tx, mut ws_rx) = ws.split();
        loop {
            tokio::select! {
                frame = out_rx.recv() => match frame {
                    Some(text) => {
                        if let Err(e) = ws_tx.send(WsMessage::Text(text)).await {
                            warn!("session {session_id}: send failed: {e}");
                            break;
                        }
                    }
                    // Replaced by a newer session.
                    None => {
                        let _ = ws_tx.close().await;
                        break;
                    }
                },
                incoming = ws_rx.next() => match incoming {
                    Some(Ok(WsMessage::Text(text))) => self.on_frame(session_id, &text),
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("session {session_id}: receive failed: {e}");
                        break;
                    }
                },
            }
        }

        self.detach(session_id);
    }

    fn on_frame(&self, session_id: SessionId, text: &str) {
        let msg = match decode_renderer_message(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("session {session_id}: dropping malformed frame: {e}");
                return;
            }
        };

        match msg {
            RendererToShell::Ready { client } => {
                let is_current = match lock(&self.shared.session).as_mut() {
                    Some(session) if session.id == session_id => {
                        session.ready = true;
                        true
                    }
                    _ => false,
                };
                if is_current {
                    info!(
                        "session {session_id}: editor ready ({})",
                        client.as_deref().unwrap_or("unknown client")
                    );
                    self.shared.lifecycle.advance_or_log(LifecycleState::Ready);
                    self.shared.presence.send_replace(true);
                }
            }
            reply => {
                let call = reply
                    .reply_id()
                    .and_then(|id| lock(&self.shared.pending).remove(&id));
                match call {
                    Some(call) => {
                        debug!(
                            "session {session_id}: {} for #{:?}",
                            reply.type_name(),
                            reply.reply_id()
                        );
                        // The caller may have timed out already.
                        let _ = call.reply.send(reply);
                    }
                    None => debug!(
                        "session {session_id}: dropping {} for unknown request {:?}",
                        reply.type_name(),
                        reply.reply_id()
                    ),
                }
            }
        }
    }

    fn detach(&self, session_id: SessionId) {
        let was_ready = {
            let mut session = lock(&self.shared.session);
            if session.as_ref().map(|s| s.id) == Some(session_id) {
                session.take().map_or(false, |s| s.ready)
            } else {
                false
            }
        };

        let failed = {
            let mut pending = lock(&self.shared.pending);
            let before = pending.len();
            // Dropping the senders wakes each waiter with SessionClosed.
            pending.retain(|_, call| call.session != session_id);
            before - pending.len()
        };

        if was_ready {
            self.mark_not_ready();
        }
        info!("editor session {session_id} ended ({failed} pending calls failed)");
    }

    fn mark_not_ready(&self) {
        self.shared.presence.send_replace(false);
        self.shared
            .lifecycle
            .advance_or_log(LifecycleState::RendererLaunching);
    }
}

impl DocumentBridge for RendererLink {
    fn pull(&self) -> Result<String, BridgeError> {
        self.runtime.block_on(self.pull_async())
    }

    fn push(&self, content: &str) -> Result<(), BridgeError> {
        self.runtime.block_on(self.push_async(content))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
