//! JSON message types for the renderer bridge.
//!
//! The editor page and the shell talk over a single WebSocket.  Every frame is
//! a JSON text frame holding one message object.  Requests flow from the shell
//! to the page; replies and the readiness signal flow back.
//!
//! # Message flow
//!
//! ```text
//! Shell    → Renderer:  ShellToRenderer  →  JSON text frame
//! Renderer → Shell:     JSON text frame  →  RendererToShell
//! ```
//!
//! # JSON discriminant
//!
//! Every message is a JSON object with a `"type"` field that identifies the
//! variant.  All other fields sit in the same object:
//!
//! ```json
//! {"type":"WriteMarkdown","id":7,"content":"# Title"}
//! ```
//!
//! # Correlation ids
//!
//! Each request carries an `id` taken from a [`SequenceCounter`].  The page
//! echoes the id in its reply so the shell can wake the caller that is waiting
//! for it, even if replies arrive out of order.
//!
//! [`SequenceCounter`]: super::SequenceCounter

use serde::{Deserialize, Serialize};

// ── Shell → Renderer messages ─────────────────────────────────────────────────

/// All messages the shell sends to the editor page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShellToRenderer {
    /// Asks the page for the full current document as Markdown.
    ///
    /// The page answers with [`RendererToShell::Content`] or
    /// [`RendererToShell::Failed`].
    ReadMarkdown {
        /// Correlation id echoed in the reply.
        id: u64,
    },

    /// Replaces the whole document with `content`.
    ///
    /// An empty string is a valid payload.  The page answers with
    /// [`RendererToShell::Written`] or [`RendererToShell::Failed`].
    WriteMarkdown {
        /// Correlation id echoed in the reply.
        id: u64,
        /// The new document text (Markdown).
        content: String,
    },

    /// Asks the page to close its window.  No reply is expected.
    Close,
}

impl ShellToRenderer {
    /// Returns the correlation id for request messages, `None` for `Close`.
    pub fn request_id(&self) -> Option<u64> {
        match self {
            ShellToRenderer::ReadMarkdown { id } | ShellToRenderer::WriteMarkdown { id, .. } => {
                Some(*id)
            }
            ShellToRenderer::Close => None,
        }
    }

    /// Returns a short type-name string for log messages.
    ///
    /// Used instead of `{:?}` so that document bodies never end up in logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            ShellToRenderer::ReadMarkdown { .. } => "ReadMarkdown",
            ShellToRenderer::WriteMarkdown { .. } => "WriteMarkdown",
            ShellToRenderer::Close => "Close",
        }
    }
}

// ── Renderer → Shell messages ─────────────────────────────────────────────────

/// All messages the editor page sends to the shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RendererToShell {
    /// The page has installed `readMarkdown` / `writeMarkdown` and is ready to
    /// serve requests.  Sent once per WebSocket connection.
    Ready {
        /// Optional free-form client description (usually the user agent).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client: Option<String>,
    },

    /// Reply to `ReadMarkdown`.
    Content {
        /// Correlation id of the request.
        id: u64,
        /// The full document text.  May be empty.
        content: String,
    },

    /// Reply to `WriteMarkdown`: the document was replaced.
    Written {
        /// Correlation id of the request.
        id: u64,
    },

    /// The page could not serve a request.
    Failed {
        /// Correlation id of the request.
        id: u64,
        /// Human-readable reason reported by the page.
        message: String,
    },
}

impl RendererToShell {
    /// Returns the correlation id for replies, `None` for `Ready`.
    pub fn reply_id(&self) -> Option<u64> {
        match self {
            RendererToShell::Ready { .. } => None,
            RendererToShell::Content { id, .. }
            | RendererToShell::Written { id }
            | RendererToShell::Failed { id, .. } => Some(*id),
        }
    }

    /// Returns a short type-name string for log messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            RendererToShell::Ready { .. } => "Ready",
            RendererToShell::Content { .. } => "Content",
            RendererToShell::Written { .. } => "Written",
            RendererToShell::Failed { .. } => "Failed",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
