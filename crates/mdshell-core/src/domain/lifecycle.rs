//! Process-wide lifecycle of the shell.
//!
//! ```text
//! NotStarted ──► AssetsLocated ──► RendererLaunching ◄──► Ready
//!      │               │                  │                 │
//!      └───────────────┴──────────────────┴─────────────────┴──► Closed
//! ```
//!
//! `Ready` is entered when the editor page sends its `Ready` message over the
//! bridge, not after a fixed delay.  If the page reloads, its WebSocket drops
//! and the state falls back to `RendererLaunching` until the new page reports
//! in.  `Closed` is terminal and reachable from everywhere.

use thiserror::Error;

/// Where the shell is in its startup/shutdown sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    /// Nothing has happened yet.
    #[default]
    NotStarted,
    /// The web bundle directory was found.
    AssetsLocated,
    /// The server is up and a browser window is being opened (or the page is
    /// reconnecting after a reload).
    RendererLaunching,
    /// The page has reported that its bridge functions are installed.
    Ready,
    /// The window was closed or the shell is shutting down.
    Closed,
}

/// Rejected lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("invalid lifecycle transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },
}

impl LifecycleState {
    /// Returns `true` if moving from `self` to `next` is allowed.
    ///
    /// Re-entering the current state is a no-op and always allowed.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (NotStarted, AssetsLocated)
                | (AssetsLocated, RendererLaunching)
                | (RendererLaunching, Ready)
                | (Ready, RendererLaunching)
                | (_, Closed)
        )
    }

    /// Validates and returns the next state.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] when the edge does not
    /// exist in the state diagram.
    pub fn transition(self, next: LifecycleState) -> Result<LifecycleState, LifecycleError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(LifecycleError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// `true` once the page can serve bridge requests.
    pub fn is_ready(self) -> bool {
        self == LifecycleState::Ready
    }
}
