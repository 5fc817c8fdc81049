//! DesktopServices: the production [`ShellServices`].
//!
//! Owns the asset server thread, the bridge server task, the renderer link and the console settings,
//! and exposes them to the bootstrap as the four steps it drives.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::application::bootstrap::ShellServices;
use crate::application::content_bridge::DocumentBridge;
use crate::application::lifecycle::{LifecycleHandle, ShutdownController};
use crate::domain::config::ShellConfig;
use crate::infrastructure::console::{spawn_console, ConsoleSettings};
use crate::infrastructure::asset_server::{bind_assets, spawn_asset_server, AssetSite};
use crate::infrastructure::bridge_server::{bind_bridge, run_bridge_server};
use crate::infrastructure::renderer_link::RendererLink;

/// How long the page gets to close its window after `Close`.
const CLOSE_WAIT: Duration = Duration::from_millis(500);

/// How long each server gets to notice the stop flag.
const STOP_WAIT: Duration = Duration::from_secs(1);

pub struct DesktopServices {
    config: ShellConfig,
    entry_file: String,
    runtime: Handle,
    link: RendererLink,
    lifecycle: LifecycleHandle,
    shutdown: ShutdownController,
    running: Arc<AtomicBool>,
    bridge: Mutex<Option<JoinHandle<()>>>,
    assets: Mutex<Option<thread::JoinHandle<()>>>,
}

impl DesktopServices {
    pub fn new(
        config: ShellConfig,
        entry_file: impl Into<String>,
        runtime: Handle,
        link: RendererLink,
        lifecycle: LifecycleHandle,
        shutdown: ShutdownController,
    ) -> Self {
        Self {
            config,
            entry_file: entry_file.into(),
            runtime,
            link,
            lifecycle,
            shutdown,
            running: Arc::new(AtomicBool::new(true)),
            bridge: Mutex::new(None),
            assets: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ShellServices for DesktopServices {
    async fn start_server(&self, web_root: &Path) -> anyhow::Result<()> {
        // Both ports are taken before either server starts.
        let bridge_listener = bind_bridge(SocketAddr::from((Ipv4Addr::LOCALHOST, 0))).await?;
        let bridge_port = bridge_listener.local_addr()?.port();
        let asset_listener = bind_assets(self.config.bind_addr())?;

        let site = AssetSite::new(web_root.to_path_buf(), self.entry_file.clone(), bridge_port);
        let assets = spawn_asset_server(asset_listener, site, Arc::clone(&self.running))?;
        *self.assets.lock().unwrap_or_else(|p| p.into_inner()) = Some(assets);

        let link = self.link.clone();
        let running = Arc::clone(&self.running);
        let task = tokio::spawn(async move {
            if let Err(e) = run_bridge_server(bridge_listener, link, running).await {
                error!("bridge server failed: {e:#}");
            }
        });
        *self.bridge.lock().unwrap_or_else(|p| p.into_inner()) = Some(task);
        Ok(())
    }

    fn start_console(&self) {
        let bridge: Arc<dyn DocumentBridge> = Arc::new(self.link.clone());
        let settings = ConsoleSettings {
            ready_timeout: self.config.ready_timeout(),
            quit_grace: self.config.quit_grace(),
        };
        if let Err(e) = spawn_console(
            &self.runtime,
            bridge,
            self.lifecycle.clone(),
            self.shutdown.clone(),
            settings,
        ) {
            // The window still works without the console.
            error!("could not start the console: {e}");
        }
    }

    async fn close_renderer(&self) {
        self.link.close_renderer(CLOSE_WAIT).await;
    }

    async fn stop_server(&self) {
        self.running.store(false, Ordering::Relaxed);
        let task = self.bridge.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(task) = task {
            if tokio::time::timeout(STOP_WAIT, task).await.is_err() {
                warn!("bridge server did not stop within {STOP_WAIT:?}");
            }
        }

        let assets = self.assets.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(assets) = assets {
            let joined = tokio::task::spawn_blocking(move || assets.join());
            if tokio::time::timeout(STOP_WAIT, joined).await.is_err() {
                warn!("editor server did not stop within {STOP_WAIT:?}");
            }
        }
    }
}
