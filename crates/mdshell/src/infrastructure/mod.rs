//! Infrastructure layer for mdshell.
//!
//! Everything that touches the outside world lives here.
//!
//! # Responsibilities
//!
//! - Serving the web bundle (`asset_server`) and the bridge socket
//!   (`bridge_server`) on `127.0.0.1`
//! - Holding the WebSocket session with the editor page
//! - Spawning and watching the browser process
//! - Reading stdin and Ctrl+C for the console
//! - Reading `mdshell.toml`
//!
//! # What does NOT belong here?
//!
//! - Console command semantics or the launch fallback policy (application)
//! - Bridge message definitions (`mdshell-core`)

pub mod asset_server;
pub mod bridge_server;
pub mod browser;
pub mod config_file;
pub mod console;
pub mod desktop;
pub mod renderer_link;

pub use asset_server::{bind_assets, spawn_asset_server, AssetSite};
pub use bridge_server::{bind_bridge, run_bridge_server};
pub use browser::ChromeHost;
pub use config_file::{load_config, ConfigError};
pub use desktop::DesktopServices;
pub use renderer_link::RendererLink;
