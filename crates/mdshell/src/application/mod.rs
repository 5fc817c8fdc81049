//! Application layer for mdshell.
//!
//! The application layer knows *what* the shell does: the order of startup,
//! the console commands, the launch fallback policy and the bridge contract.
//! It delegates *how* to the infrastructure layer through traits.
//!
//! # Responsibilities
//!
//! - The [`DocumentBridge`] contract and its [`BridgeError`] type
//! - The console [`ControlLoop`] (Read / Write / Quit)
//! - The [`WindowLauncher`] ordered-strategy policy
//! - The [`Bootstrap`] startup sequence and ordered shutdown
//! - Shared lifecycle state and the shutdown request channel
//!
//! # What does NOT belong here?
//!
//! - Sockets, HTTP parsing or WebSocket framing (infrastructure)
//! - Spawning browser processes or reading stdin (infrastructure)

pub mod bootstrap;
pub mod content_bridge;
pub mod control_loop;
pub mod launcher;
pub mod lifecycle;

pub use bootstrap::{Bootstrap, ShellServices, StartupOutcome};
pub use content_bridge::{BridgeError, DocumentBridge};
pub use control_loop::{ConsoleEvent, ConsoleInput, ControlLoop, LoopExit};
pub use launcher::{FailedAttempt, LaunchError, LaunchFailure, LaunchReport, WindowHost, WindowLauncher};
pub use lifecycle::{LifecycleHandle, ShutdownController, ShutdownReason};
