//! # mdshell-core
//!
//! Shared library for mdshell containing the renderer bridge protocol, the
//! shell lifecycle state machine, web-bundle discovery and the browser launch
//! configuration.
//!
//! This crate has zero dependencies on async runtimes, sockets or OS process
//! APIs.  Everything here can be unit tested without a browser.
//!
//! # Architecture overview (for beginners)
//!
//! mdshell is a desktop shell around a web-based Markdown editor.  The editor
//! runs inside a Chromium window in "app" mode; the shell serves its files from
//! a local HTTP server and offers a text console that can read and replace the
//! document the editor is showing.
//!
//! - **`protocol`** – The JSON messages exchanged with the page over a
//!   WebSocket (`ReadMarkdown`, `WriteMarkdown`, `Content`, ...), plus the
//!   request-id counter used to match replies to requests.
//!
//! - **`domain`** – Pure rules: the lifecycle state machine, the ordered
//!   candidate list used to find the web bundle, and the immutable launch
//!   configuration with its ordered launch strategies.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `mdshell_core::LifecycleState` instead of the full module path.
pub use domain::assets::AssetLocator;
pub use domain::launch::{LaunchConfig, LaunchStrategy, WindowGeometry};
pub use domain::lifecycle::{LifecycleError, LifecycleState};
pub use protocol::codec::{decode_renderer_message, encode_shell_message, ProtocolError};
pub use protocol::messages::{RendererToShell, ShellToRenderer};
pub use protocol::sequence::SequenceCounter;
