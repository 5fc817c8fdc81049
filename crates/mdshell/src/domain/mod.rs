//! Domain layer for mdshell.
//!
//! Plain configuration types with no I/O.  Bridge messages, the lifecycle
//! state machine and launch strategies live in `mdshell-core`; this layer only
//! adds what is specific to the desktop binary.
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, socket or process types
//! - Reading files or environment variables

pub mod config;

pub use config::{BridgeSettings, LaunchSettings, ServerSettings, ShellConfig, WindowSettings};
