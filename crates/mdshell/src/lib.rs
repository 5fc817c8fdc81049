//! mdshell library crate.
//!
//! A desktop shell around a browser-rendered Markdown editor.  The editor runs
//! in a Chromium app window served from a local HTTP server; a text console
//! beside it can read and replace the live document over a WebSocket bridge.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Chromium app window (editor page + eel.js shim + bridge.js)
//!         ↕  HTTP (assets)  +  JSON over WebSocket (bridge port, /bridge)
//! [mdshell]
//!   ├── domain/           ShellConfig (defaults, TOML shape)
//!   ├── application/      DocumentBridge contract, ControlLoop,
//!   │                     WindowLauncher, Bootstrap, lifecycle/shutdown
//!   └── infrastructure/
//!         ├── asset_server/   static files, /eel.js, /bridge.js (tiny_http)
//!         ├── bridge_server/  /bridge WebSocket accept loop
//!         ├── renderer_link/  WebSocket session + pending-call table
//!         ├── browser/        ChromeHost (browser process)
//!         ├── console/        stdin, Ctrl+C, readiness → console events
//!         ├── config_file/    mdshell.toml
//!         └── desktop/        ShellServices wiring
//!         ↕
//! Operator console (stdin / stdout)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain`, `mdshell-core` and traits only; the
//!   concrete server, browser and console are injected.
//! - `infrastructure` implements those traits with `tokio`,
//!   `tokio-tungstenite`, `tiny_http` and OS processes.

/// Domain layer: configuration types.
pub mod domain;

/// Application layer: console, launcher and startup orchestration.
pub mod application;

/// Infrastructure layer: server, bridge session, browser and console I/O.
pub mod infrastructure;
