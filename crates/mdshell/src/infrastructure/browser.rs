//! ChromeHost: opens the editor window as a Chrome/Chromium app window.
//!
//! # Finding the browser
//!
//! 1. the explicit path from `--browser` / `MDSHELL_BROWSER` / `[launch] browser`,
//! 2. well-known executable names on `PATH`,
//! 3. well-known install locations for the current OS.
//!
//! # Startup probe
//!
//! A browser that rejects its flags exits almost immediately, so the child is
//! watched for a short probe window after spawning:
//!
//! - non-zero exit inside the window: [`LaunchError::EarlyExit`], the launcher
//!   moves on to the next strategy;
//! - zero exit inside the window: the URL was handed to an already running
//!   browser instance.  There is no process to wait on, so the host waits for
//!   the editor page to disconnect from the bridge instead;
//! - still running after the window: the window is up; the host waits for the
//!   process to exit.
//!
//! The child is spawned with `kill_on_drop`, so dropping the `open` future
//! (shutdown) closes a window this process started.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use mdshell_core::LaunchStrategy;

use crate::application::launcher::{LaunchError, WindowHost};

/// Executable names searched on `PATH`, in order.
const BROWSER_NAMES: [&str; 6] = [
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
    "msedge",
];

/// A page that drops its bridge connection and comes back within this window
/// was reloaded, not closed.
const RECONNECT_GRACE: Duration = Duration::from_secs(3);

/// [`WindowHost`] backed by a Chromium-family browser process.
pub struct ChromeHost {
    browser: Option<PathBuf>,
    startup_probe: Duration,
    presence: watch::Receiver<bool>,
}

impl ChromeHost {
    /// `presence` reports whether the editor page is connected; it is only
    /// consulted when the launch was handed off to an existing browser.
    pub fn new(
        browser: Option<PathBuf>,
        startup_probe: Duration,
        presence: watch::Receiver<bool>,
    ) -> Self {
        Self {
            browser,
            startup_probe,
            presence,
        }
    }

    fn resolve_browser(&self) -> Result<PathBuf, LaunchError> {
        if let Some(explicit) = &self.browser {
            return Ok(explicit.clone());
        }
        let path_var = std::env::var_os("PATH").unwrap_or_default();
        search_path(&BROWSER_NAMES, &path_var)
            .or_else(|| well_known_locations().into_iter().find(|p| p.is_file()))
            .ok_or_else(|| LaunchError::BrowserNotFound {
                searched: format!("PATH ({}) and standard install locations", BROWSER_NAMES.join(", ")),
            })
    }

    /// Blocks until the editor page has connected and then gone away for
    /// longer than [`RECONNECT_GRACE`].
    async fn wait_for_page_to_leave(&self) {
        let mut presence = self.presence.clone();
        loop {
            if presence.wait_for(|connected| *connected).await.is_err() {
                return;
            }
            if presence.wait_for(|connected| !*connected).await.is_err() {
                return;
            }
            match timeout(RECONNECT_GRACE, presence.wait_for(|connected| *connected)).await {
                Ok(Ok(_)) => debug!("editor page reconnected; still open"),
                _ => return,
            }
        }
    }
}

#[async_trait]
impl WindowHost for ChromeHost {
    async fn open(&self, strategy: &LaunchStrategy) -> Result<(), LaunchError> {
        let program = self.resolve_browser()?;
        let shown = program.display().to_string();
        debug!("launching {shown} {:?}", strategy.args());

        let mut child = Command::new(&program)
            .args(strategy.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LaunchError::Spawn {
                program: shown.clone(),
                reason: e.to_string(),
            })?;

        match timeout(self.startup_probe, child.wait()).await {
            Ok(Ok(status)) if status.success() => {
                info!("{shown} handed the window to a running browser; following the page");
                self.wait_for_page_to_leave().await;
                Ok(())
            }
            Ok(Ok(status)) => Err(LaunchError::EarlyExit {
                status: status.to_string(),
            }),
            Ok(Err(e)) => Err(LaunchError::Spawn {
                program: shown,
                reason: e.to_string(),
            }),
            Err(_) => {
                info!("editor window is up ({}, pid {:?})", strategy.name(), child.id());
                match child.wait().await {
                    Ok(status) if status.success() => {}
                    Ok(status) => warn!("browser exited with {status}"),
                    Err(e) => warn!("lost track of the browser process: {e}"),
                }
                Ok(())
            }
        }
    }
}

/// Looks for the first of `names` in the directories of a `PATH`-style list.
pub fn search_path(names: &[&str], path_var: &OsStr) -> Option<PathBuf> {
    let dirs: Vec<PathBuf> = std::env::split_paths(path_var).collect();
    for name in names {
        for dir in &dirs {
            let candidate = dir.join(executable_name(name));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

fn executable_name(name: &str) -> OsString {
    let mut file = OsString::from(name);
    if cfg!(windows) {
        file.push(".exe");
    }
    file
}

fn well_known_locations() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if cfg!(target_os = "macos") {
        for app in [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
        ] {
            paths.push(PathBuf::from(app));
        }
    } else if cfg!(windows) {
        for var in ["ProgramFiles", "ProgramFiles(x86)", "LocalAppData"] {
            if let Some(base) = std::env::var_os(var) {
                let base = Path::new(&base);
                paths.push(base.join(r"Google\Chrome\Application\chrome.exe"));
                paths.push(base.join(r"Chromium\Application\chrome.exe"));
                paths.push(base.join(r"Microsoft\Edge\Application\msedge.exe"));
            }
        }
    } else {
        for bin in [
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/opt/google/chrome/chrome",
        ] {
            paths.push(PathBuf::from(bin));
        }
    }

    paths
}

// ── Tests ─────────────────────────────────────────────────────────────────────
