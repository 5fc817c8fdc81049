//! Shell configuration types.
//!
//! [`ShellConfig`] is the single source of truth for runtime settings.  It is
//! populated in three layers, later layers winning:
//!
//! 1. built-in defaults (this module),
//! 2. the optional `mdshell.toml` file (see `infrastructure::config_file`),
//! 3. command-line flags / environment variables (see `main.rs`).
//!
//! Running the program with no file and no arguments gives exactly the fixed
//! shell: port 8080, a 1200×800 window at (100, 100).
//!
//! # Example file
//!
//! ```toml
//! [server]
//! port = 8080
//!
//! [window]
//! width = 1200
//! height = 800
//!
//! [bridge]
//! call_timeout_secs = 10
//! ```
//!
//! Every field has a serde default, so a partial file (or an empty one) is
//! valid.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use mdshell_core::domain::assets::DEFAULT_ENTRY_FILE;
use mdshell_core::{LaunchConfig, WindowGeometry};

/// All runtime configuration for the shell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShellConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub window: WindowSettings,
    #[serde(default)]
    pub bridge: BridgeSettings,
    #[serde(default)]
    pub launch: LaunchSettings,
}

/// Local HTTP/WebSocket server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Port on `127.0.0.1` that serves the web bundle and the bridge endpoint.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Editor window geometry in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSettings {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_position")]
    pub x: i32,
    #[serde(default = "default_position")]
    pub y: i32,
}

/// Timing of the content bridge and the shutdown sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeSettings {
    /// Longest wait for the page's `Ready` message before the console menu is
    /// shown anyway.
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,
    /// Longest wait for the reply to a single `pull` / `push`.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    /// Time the ordered shutdown gets after Quit before the process is
    /// terminated unconditionally.
    #[serde(default = "default_quit_grace_ms")]
    pub quit_grace_ms: u64,
}

/// Browser launch settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchSettings {
    /// Explicit browser executable.  When absent, well-known Chrome/Chromium
    /// locations are searched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<PathBuf>,
    /// A browser that exits with an error inside this window counts as a
    /// failed launch and the next strategy is tried.
    #[serde(default = "default_startup_probe_ms")]
    pub startup_probe_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_port() -> u16 {
    8080
}
fn default_width() -> u32 {
    1200
}
fn default_height() -> u32 {
    800
}
fn default_position() -> i32 {
    100
}
fn default_ready_timeout_secs() -> u64 {
    30
}
fn default_call_timeout_secs() -> u64 {
    10
}
fn default_quit_grace_ms() -> u64 {
    2000
}
fn default_startup_probe_ms() -> u64 {
    1500
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            x: default_position(),
            y: default_position(),
        }
    }
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            ready_timeout_secs: default_ready_timeout_secs(),
            call_timeout_secs: default_call_timeout_secs(),
            quit_grace_ms: default_quit_grace_ms(),
        }
    }
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            browser: None,
            startup_probe_ms: default_startup_probe_ms(),
        }
    }
}

// ── Derived values ────────────────────────────────────────────────────────────

impl ShellConfig {
    /// The server always binds the loopback interface: the bridge endpoint can
    /// read and replace the document and must not be reachable from the LAN.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, self.server.port))
    }

    pub fn geometry(&self) -> WindowGeometry {
        WindowGeometry {
            width: self.window.width,
            height: self.window.height,
            x: self.window.x,
            y: self.window.y,
        }
    }

    /// Builds the immutable launch configuration (URL + strategy list).
    pub fn launch_config(&self) -> LaunchConfig {
        LaunchConfig::new(self.geometry(), self.server.port, DEFAULT_ENTRY_FILE)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.bridge.ready_timeout_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.bridge.call_timeout_secs)
    }

    pub fn quit_grace(&self) -> Duration {
        Duration::from_millis(self.bridge.quit_grace_ms)
    }

    pub fn startup_probe(&self) -> Duration {
        Duration::from_millis(self.launch.startup_probe_ms)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
