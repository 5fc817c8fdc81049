//! JSON text-frame codec for the renderer bridge.
//!
//! WebSocket already frames messages, so unlike a raw TCP protocol there is no
//! header or length prefix here: one WebSocket text frame carries exactly one
//! JSON object.  The codec adds two things on top of plain `serde_json`:
//!
//! - a size limit, so a runaway page cannot make the shell buffer an
//!   arbitrarily large document, and
//! - a single [`ProtocolError`] type for the infrastructure layer to log.
//!
//! The encode/decode pairs for the *other* direction
//! ([`decode_shell_message`], [`encode_renderer_message`]) exist for test
//! renderers and tooling that play the page's role.

use thiserror::Error;

use super::messages::{RendererToShell, ShellToRenderer};

/// Largest accepted text frame, in bytes (16 MiB).
///
/// Markdown documents are far smaller in practice; the cap only guards
/// against a misbehaving page.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Errors produced while encoding or decoding bridge frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame is larger than [`MAX_FRAME_BYTES`].
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    /// The frame is not a valid JSON message of the expected direction.
    #[error("malformed bridge message: {0}")]
    Malformed(#[from] serde_json::Error),
}

fn check_size(len: usize) -> Result<(), ProtocolError> {
    if len > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge {
            len,
            max: MAX_FRAME_BYTES,
        });
    }
    Ok(())
}

/// Encodes a shell → renderer message into a JSON text frame.
///
/// # Errors
///
/// Returns [`ProtocolError::FrameTooLarge`] if the encoded frame would exceed
/// [`MAX_FRAME_BYTES`] (for example a huge `WriteMarkdown` payload).
pub fn encode_shell_message(msg: &ShellToRenderer) -> Result<String, ProtocolError> {
    let text = serde_json::to_string(msg)?;
    check_size(text.len())?;
    Ok(text)
}

/// Decodes a renderer → shell JSON text frame.
///
/// # Errors
///
/// Returns [`ProtocolError::FrameTooLarge`] for oversized frames and
/// [`ProtocolError::Malformed`] for anything that is not a known message.
pub fn decode_renderer_message(text: &str) -> Result<RendererToShell, ProtocolError> {
    check_size(text.len())?;
    Ok(serde_json::from_str(text)?)
}

/// Encodes a renderer → shell message (the page's side of the protocol).
pub fn encode_renderer_message(msg: &RendererToShell) -> Result<String, ProtocolError> {
    let text = serde_json::to_string(msg)?;
    check_size(text.len())?;
    Ok(text)
}

/// Decodes a shell → renderer frame (the page's side of the protocol).
pub fn decode_shell_message(text: &str) -> Result<ShellToRenderer, ProtocolError> {
    check_size(text.len())?;
    Ok(serde_json::from_str(text)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
