//! mdshell entry point.
//!
//! Opens the Markdown editor (a prebuilt web bundle) in a Chromium app window
//! and runs a text console beside it that can read and replace the document.
//!
//! # Usage
//!
//! ```text
//! mdshell [OPTIONS]
//!
//! Options:
//!   --port <PORT>            Local server port [default: 8080]
//!   --config <FILE>          Config file [default: ./mdshell.toml if present]
//!   --browser <PATH>         Browser executable [default: search]
//!   --ready-timeout <SECS>   Wait for the editor before showing the menu [default: 30]
//!   --call-timeout <SECS>    Wait for each read/write reply [default: 10]
//! ```
//!
//! Running with no arguments and no config file gives the fixed shell: port
//! 8080, a 1200×800 window at (100, 100).
//!
//! # Environment variable overrides
//!
//! | Variable                | Flag              |
//! |-------------------------|-------------------|
//! | `MDSHELL_PORT`          | `--port`          |
//! | `MDSHELL_CONFIG`        | `--config`        |
//! | `MDSHELL_BROWSER`       | `--browser`       |
//! | `MDSHELL_READY_TIMEOUT` | `--ready-timeout` |
//! | `MDSHELL_CALL_TIMEOUT`  | `--call-timeout`  |
//!
//! Flags beat the config file, the config file beats the defaults.  Logs go to
//! stderr (`RUST_LOG` sets the level) so they do not interleave with the
//! console menu on stdout.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::runtime::Handle;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mdshell::application::{
    Bootstrap, LifecycleHandle, ShutdownController, StartupOutcome, WindowLauncher,
};
use mdshell::domain::ShellConfig;
use mdshell::infrastructure::{load_config, ChromeHost, DesktopServices, RendererLink};
use mdshell_core::AssetLocator;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Desktop shell for a browser-rendered Markdown editor.
///
/// Every flag is optional; unset flags fall back to the config file and then
/// to the built-in defaults.
#[derive(Debug, Parser)]
#[command(
    name = "mdshell",
    about = "Markdown editor window with a scriptable read/write console",
    version
)]
struct Cli {
    /// Port of the local server on 127.0.0.1.
    #[arg(long, env = "MDSHELL_PORT")]
    port: Option<u16>,

    /// Configuration file (TOML).  Must exist when given.
    #[arg(long, env = "MDSHELL_CONFIG")]
    config: Option<PathBuf>,

    /// Chrome/Chromium executable to use instead of searching for one.
    #[arg(long, env = "MDSHELL_BROWSER")]
    browser: Option<PathBuf>,

    /// Seconds to wait for the editor to report ready before the menu is
    /// shown anyway.
    #[arg(long, env = "MDSHELL_READY_TIMEOUT")]
    ready_timeout: Option<u64>,

    /// Seconds to wait for the editor to answer a read or write.
    #[arg(long, env = "MDSHELL_CALL_TIMEOUT")]
    call_timeout: Option<u64>,
}

impl Cli {
    /// Layers the flags over `config` (file values or defaults).
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting port or call timeout is zero.
    fn into_shell_config(self, mut config: ShellConfig) -> anyhow::Result<ShellConfig> {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(browser) = self.browser {
            config.launch.browser = Some(browser);
        }
        if let Some(secs) = self.ready_timeout {
            config.bridge.ready_timeout_secs = secs;
        }
        if let Some(secs) = self.call_timeout {
            config.bridge.call_timeout_secs = secs;
        }

        anyhow::ensure!(config.server.port != 0, "port must be between 1 and 65535");
        anyhow::ensure!(
            config.bridge.call_timeout_secs != 0,
            "call timeout must be at least one second"
        );
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// 1. Logging to stderr, level from `RUST_LOG` (default `info`).
/// 2. Flags, then `mdshell.toml`, into one [`ShellConfig`].
/// 3. The renderer link, browser host and services are built and handed to
///    [`Bootstrap::run`], which locates the bundle, starts the server and the
///    console, and opens the window.
/// 4. The outcome is reported and the process exits with status 0.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // ── Configuration ─────────────────────────────────────────────────────────
    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("cannot determine the working directory")?;
    let file_config = load_config(cli.config.as_deref(), &cwd)?;
    let config = cli.into_shell_config(file_config)?;

    info!(
        "mdshell starting: port={}, window={}x{}",
        config.server.port, config.window.width, config.window.height
    );
    println!("Starting the Markdown editor...");

    // ── Wiring ────────────────────────────────────────────────────────────────
    let lifecycle = LifecycleHandle::new();
    let shutdown = ShutdownController::new();
    let runtime = Handle::current();

    let link = RendererLink::new(runtime.clone(), lifecycle.clone(), config.call_timeout());
    let launch = config.launch_config();
    let host = ChromeHost::new(
        config.launch.browser.clone(),
        config.startup_probe(),
        link.presence(),
    );
    let launcher = WindowLauncher::new(host);
    let services = DesktopServices::new(
        config.clone(),
        launch.entry_file(),
        runtime,
        link,
        lifecycle.clone(),
        shutdown.clone(),
    );
    let bootstrap = Bootstrap::new(AssetLocator::default(), launch, lifecycle, shutdown);

    println!("Opening the editor window; the console menu starts once the editor is ready.");

    // ── Run ───────────────────────────────────────────────────────────────────
    match bootstrap.run(&cwd, &services, &launcher).await? {
        StartupOutcome::AssetsMissing { searched } => {
            println!("No index.html found in: {searched}");
            println!("Place your web build in the 'build/' directory.");
        }
        StartupOutcome::WindowClosed { strategy } => {
            info!("editor window closed (opened with '{strategy}')");
        }
        StartupOutcome::LaunchFailed(failure) => {
            for attempt in &failure.attempts {
                println!("Launch with '{}' failed: {}", attempt.strategy, attempt.error);
            }
            println!("Check that Chrome or Chromium is installed, or pass --browser.");
        }
        StartupOutcome::ShutdownRequested(reason) => {
            info!("shut down on request ({reason:?})");
        }
    }

    println!("Application closed");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
