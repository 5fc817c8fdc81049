//! The content bridge contract: `pull` and `push` of the live document.
//!
//! The document lives only in the editor page.  The shell never keeps a copy:
//! every [`DocumentBridge::pull`] asks the page for the whole text and every
//! [`DocumentBridge::push`] replaces the whole text.
//!
//! Both calls are synchronous from the caller's point of view.  The console
//! runs on its own OS thread and simply blocks until the page answers, the
//! call times out, or the call fails.  No call is retried.
//!
//! The production implementation is
//! [`RendererLink`](crate::infrastructure::renderer_link::RendererLink), which
//! talks to the page over the `/bridge` WebSocket.

use std::time::Duration;

use thiserror::Error;

/// Boundary failures of a single bridge call.
///
/// Every variant is recoverable: the caller reports it and carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// No editor page is connected to the bridge.
    #[error("the editor is not connected")]
    NotConnected,

    /// The page disconnected while the call was waiting for its reply.
    #[error("the editor disconnected before replying")]
    SessionClosed,

    /// The page did not reply within the configured call timeout.
    #[error("the editor did not reply within {after:?}")]
    TimedOut { after: Duration },

    /// The page answered with an explicit failure.
    #[error("the editor rejected the request: {message}")]
    Rejected { message: String },

    /// The page answered with a reply of the wrong kind.
    #[error("unexpected reply from the editor: expected {expected}, got {got}")]
    UnexpectedReply {
        expected: &'static str,
        got: &'static str,
    },

    /// The request could not be encoded (for example it is too large).
    #[error("could not encode the request: {0}")]
    Encoding(String),
}

/// Whole-document read/write access to the editor page.
#[cfg_attr(test, mockall::automock)]
pub trait DocumentBridge: Send + Sync {
    /// Returns the full current document.  May be empty.
    fn pull(&self) -> Result<String, BridgeError>;

    /// Replaces the full document with `content`.  Empty content is valid.
    fn push(&self, content: &str) -> Result<(), BridgeError>;
}
