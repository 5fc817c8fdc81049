//! Shared lifecycle state and the shutdown request channel.
//!
//! Both are `tokio::sync::watch` channels wrapped in small cloneable handles:
//!
//! - [`LifecycleHandle`] publishes the process-wide [`LifecycleState`].  The
//!   renderer link moves it to `Ready` when the page reports in; the console
//!   waits on it instead of sleeping for a fixed time.
//! - [`ShutdownController`] carries the first shutdown request (Quit or an
//!   interrupt) from the console thread to the orchestrator, which then runs
//!   the ordered release of the window and the server.
//!
//! `watch` fits both: there is one current value, readers only care about the
//! latest one, and `send` is synchronous, so the plain OS thread running the
//! console can publish without entering the runtime.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use mdshell_core::{LifecycleError, LifecycleState};

// ── Lifecycle ─────────────────────────────────────────────────────────────────

/// Cloneable handle on the process-wide lifecycle state.
#[derive(Debug, Clone)]
pub struct LifecycleHandle {
    tx: Arc<watch::Sender<LifecycleState>>,
}

impl LifecycleHandle {
    /// Creates a handle in [`LifecycleState::NotStarted`].
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LifecycleState::NotStarted);
        Self { tx: Arc::new(tx) }
    }

    /// The current state.
    pub fn current(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    /// Moves to `next` if the state diagram allows it.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] and leaves the state
    /// untouched when the edge does not exist.
    pub fn advance(&self, next: LifecycleState) -> Result<(), LifecycleError> {
        let mut outcome = Ok(());
        self.tx.send_if_modified(|state| match state.transition(next) {
            Ok(new_state) if new_state != *state => {
                debug!("lifecycle {:?} -> {:?}", *state, new_state);
                *state = new_state;
                true
            }
            Ok(_) => false,
            Err(e) => {
                outcome = Err(e);
                false
            }
        });
        outcome
    }

    /// Like [`advance`](Self::advance) but only logs a rejected transition.
    ///
    /// Used by infrastructure callbacks (page connect/disconnect) that may race
    /// with shutdown, where `Closed` legitimately wins.
    pub fn advance_or_log(&self, next: LifecycleState) {
        if let Err(e) = self.advance(next) {
            debug!("ignored lifecycle update: {e}");
        }
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.tx.subscribe()
    }
}

impl Default for LifecycleHandle {
    fn default() -> Self {
        Self::new()
    }
}

// ── Shutdown ──────────────────────────────────────────────────────────────────

/// Why the shell is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The operator chose Quit in the console menu.
    Quit,
    /// The operator pressed Ctrl+C at the console menu.
    Interrupted,
}

/// One-shot shutdown request shared between the console and the orchestrator.
#[derive(Debug, Clone)]
pub struct ShutdownController {
    tx: Arc<watch::Sender<Option<ShutdownReason>>>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Records a shutdown request.  Only the first request is kept.
    ///
    /// Returns `true` if this call was the first.
    pub fn request(&self, reason: ShutdownReason) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(reason);
            true
        })
    }

    /// The recorded request, if any.
    pub fn requested(&self) -> Option<ShutdownReason> {
        *self.tx.borrow()
    }

    /// Resolves once a shutdown has been requested.
    pub async fn wait(&self) -> ShutdownReason {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let reason = match rx.wait_for(Option::is_some).await {
            Ok(reason) => (*reason).unwrap_or(ShutdownReason::Quit),
            Err(_) => ShutdownReason::Quit,
        };
        reason
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
