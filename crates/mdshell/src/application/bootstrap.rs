//! Bootstrap: the startup sequence and the ordered shutdown.
//!
//! ```text
//! locate assets ──None──► AssetsMissing (nothing launched)
//!      │
//!      ▼
//! start server ─► start console ─► launch window ══╦══ window closed ──► WindowClosed
//!                                                  ╠══ all strategies failed ──► LaunchFailed
//!                                                  ╚══ Quit / Ctrl+C ──► close page, ShutdownRequested
//! ```
//!
//! Each step is a precondition for the next.  Whatever ends the launch step,
//! the server is stopped and the lifecycle is moved to `Closed` before
//! [`Bootstrap::run`] returns.  On a shutdown request the page is asked to
//! close first; only then is the launch future dropped, which kills the
//! browser process it owns.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use mdshell_core::{AssetLocator, LaunchConfig, LifecycleState};

use crate::application::launcher::{LaunchFailure, WindowHost, WindowLauncher};
use crate::application::lifecycle::{LifecycleHandle, ShutdownController, ShutdownReason};

/// Side-effecting services the orchestrator drives.
#[async_trait]
pub trait ShellServices: Send + Sync {
    /// Starts serving `web_root` in the background.  Resolves once the server
    /// is listening.
    async fn start_server(&self, web_root: &Path) -> anyhow::Result<()>;

    /// Starts the console on its own thread.
    fn start_console(&self);

    /// Asks the editor page to close its window.
    async fn close_renderer(&self);

    /// Stops the server.
    async fn stop_server(&self);
}

/// How the startup sequence ended.
#[derive(Debug)]
pub enum StartupOutcome {
    /// No candidate directory holds the entry file.  Nothing was launched.
    AssetsMissing { searched: String },
    /// The window opened and was closed by the user.
    WindowClosed { strategy: String },
    /// Every launch strategy failed.
    LaunchFailed(LaunchFailure),
    /// Quit or Ctrl+C from the console.
    ShutdownRequested(ShutdownReason),
}

/// Wires asset discovery, the server, the console and the window together.
pub struct Bootstrap {
    locator: AssetLocator,
    launch: LaunchConfig,
    lifecycle: LifecycleHandle,
    shutdown: ShutdownController,
}

impl Bootstrap {
    pub fn new(
        locator: AssetLocator,
        launch: LaunchConfig,
        lifecycle: LifecycleHandle,
        shutdown: ShutdownController,
    ) -> Self {
        Self {
            locator,
            launch,
            lifecycle,
            shutdown,
        }
    }

    /// Runs the full startup sequence from `base` and waits for it to end.
    ///
    /// # Errors
    ///
    /// Returns an error only when the server cannot be started (for example
    /// the port is already taken).
    pub async fn run<S, H>(
        &self,
        base: &Path,
        services: &S,
        launcher: &WindowLauncher<H>,
    ) -> anyhow::Result<StartupOutcome>
    where
        S: ShellServices,
        H: WindowHost,
    {
        // ── Step 1: locate the web bundle ─────────────────────────────────────
        let web_root: PathBuf = match self.locator.locate(base) {
            Some(dir) => dir,
            None => {
                warn!(
                    "no {} found in {}",
                    self.locator.entry_file(),
                    self.locator.describe_candidates()
                );
                self.lifecycle.advance_or_log(LifecycleState::Closed);
                return Ok(StartupOutcome::AssetsMissing {
                    searched: self.locator.describe_candidates(),
                });
            }
        };
        info!("serving web bundle from {}", web_root.display());
        self.lifecycle.advance(LifecycleState::AssetsLocated)?;

        // The page may connect as soon as the server listens.
        self.lifecycle.advance(LifecycleState::RendererLaunching)?;

        // ── Step 2: server ────────────────────────────────────────────────────
        if let Err(e) = services.start_server(&web_root).await {
            self.lifecycle.advance_or_log(LifecycleState::Closed);
            return Err(e);
        }

        // ── Step 3: console ───────────────────────────────────────────────────
        services.start_console();

        // ── Step 4: window, raced against a shutdown request ──────────────────
        let outcome = {
            let launch = launcher.launch(self.launch.strategies());
            tokio::pin!(launch);
            tokio::select! {
                result = &mut launch => match result {
                    Ok(report) => StartupOutcome::WindowClosed { strategy: report.strategy },
                    Err(failure) => StartupOutcome::LaunchFailed(failure),
                },
                reason = self.shutdown.wait() => {
                    info!("shutdown requested ({reason:?}); closing the editor window");
                    // The browser stays alive until the page has had its chance.
                    services.close_renderer().await;
                    StartupOutcome::ShutdownRequested(reason)
                }
            }
        };

        // ── Step 5: release ───────────────────────────────────────────────────
        services.stop_server().await;
        self.lifecycle.advance_or_log(LifecycleState::Closed);
        Ok(outcome)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use mdshell_core::LaunchStrategy;

    use crate::application::launcher::LaunchError;

    // ── Test doubles ──────────────────────────────────────────────────────────

    #[derive(Default, Clone)]
    struct RecordingServices {
        calls: Arc<Mutex<Vec<String>>>,
        fail_server: bool,
    }

    impl RecordingServices {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ShellServices for RecordingServices {
        async fn start_server(&self, web_root: &Path) -> anyhow::Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("start_server {}", web_root.file_name().unwrap().to_string_lossy()));
            if self.fail_server {
                anyhow::bail!("address in use");
            }
            Ok(())
        }

        fn start_console(&self) {
            self.calls.lock().unwrap().push("start_console".to_string());
        }

        async fn close_renderer(&self) {
            self.calls.lock().unwrap().push("close_renderer".to_string());
        }

        async fn stop_server(&self) {
            self.calls.lock().unwrap().push("stop_server".to_string());
        }
    }

    /// Host scripted per call: `Ok` closes at once, `Err` fails, `None`
    /// keeps the window open forever.
    struct ScriptedHost {
        attempts: Arc<Mutex<Vec<String>>>,
        result: Option<Result<(), LaunchError>>,
        window_log: Option<Arc<Mutex<Vec<String>>>>,
    }

    impl ScriptedHost {
        fn new(result: Option<Result<(), LaunchError>>) -> Self {
            Self {
                attempts: Arc::new(Mutex::new(Vec::new())),
                result,
                window_log: None,
            }
        }
    }

    /// Stands in for the browser process: records when the open window is
    /// torn down.
    struct OpenWindow(Arc<Mutex<Vec<String>>>);

    impl Drop for OpenWindow {
        fn drop(&mut self) {
            self.0.lock().unwrap().push("window dropped".to_string());
        }
    }

    #[async_trait]
    impl WindowHost for ScriptedHost {
        async fn open(&self, strategy: &LaunchStrategy) -> Result<(), LaunchError> {
            self.attempts.lock().unwrap().push(strategy.name().to_string());
            let _window = self.window_log.clone().map(OpenWindow);
            match &self.result {
                Some(result) => result.clone(),
                None => std::future::pending().await,
            }
        }
    }

    fn bootstrap() -> (Bootstrap, LifecycleHandle, ShutdownController) {
        let lifecycle = LifecycleHandle::new();
        let shutdown = ShutdownController::new();
        let bootstrap = Bootstrap::new(
            AssetLocator::default(),
            LaunchConfig::default(),
            lifecycle.clone(),
            shutdown.clone(),
        );
        (bootstrap, lifecycle, shutdown)
    }

    fn bundle_in(dir: &str) -> tempfile::TempDir {
        let base = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(base.path().join(dir)).unwrap();
        std::fs::write(base.path().join(dir).join("index.html"), "<html></html>").unwrap();
        base
    }

    // ── Tests ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_missing_assets_makes_zero_launch_attempts() {
        // Arrange
        let base = tempfile::tempdir().unwrap();
        let (bootstrap, lifecycle, _) = bootstrap();
        let services = RecordingServices::default();
        let host = ScriptedHost::new(Some(Ok(())));
        let attempts = Arc::clone(&host.attempts);
        let launcher = WindowLauncher::new(host);

        // Act
        let outcome = bootstrap.run(base.path(), &services, &launcher).await.unwrap();

        // Assert
        assert!(matches!(outcome, StartupOutcome::AssetsMissing { .. }));
        assert!(attempts.lock().unwrap().is_empty());
        assert!(services.calls().is_empty());
        assert_eq!(lifecycle.current(), LifecycleState::Closed);
    }

    #[tokio::test]
    async fn test_window_close_stops_server_in_order() {
        // Arrange
        let base = bundle_in("dist");
        let (bootstrap, lifecycle, _) = bootstrap();
        let services = RecordingServices::default();
        let launcher = WindowLauncher::new(ScriptedHost::new(Some(Ok(()))));

        // Act
        let outcome = bootstrap.run(base.path(), &services, &launcher).await.unwrap();

        // Assert
        assert!(matches!(outcome, StartupOutcome::WindowClosed { ref strategy } if strategy == "chrome"));
        assert_eq!(
            services.calls(),
            vec!["start_server dist", "start_console", "stop_server"]
        );
        assert_eq!(lifecycle.current(), LifecycleState::Closed);
    }

    #[tokio::test]
    async fn test_total_launch_failure_is_reported_after_two_attempts() {
        // Arrange
        let base = bundle_in("build");
        let (bootstrap, _, _) = bootstrap();
        let services = RecordingServices::default();
        let host = ScriptedHost::new(Some(Err(LaunchError::BrowserNotFound {
            searched: "PATH".to_string(),
        })));
        let attempts = Arc::clone(&host.attempts);
        let launcher = WindowLauncher::new(host);

        // Act
        let outcome = bootstrap.run(base.path(), &services, &launcher).await.unwrap();

        // Assert
        match outcome {
            StartupOutcome::LaunchFailed(failure) => assert_eq!(failure.attempts.len(), 2),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(*attempts.lock().unwrap(), vec!["chrome", "chrome-app"]);
        assert_eq!(services.calls().last().map(String::as_str), Some("stop_server"));
    }

    #[tokio::test]
    async fn test_shutdown_request_closes_page_then_stops_server() {
        // Arrange: the window never closes on its own
        let base = bundle_in("build");
        let (bootstrap, lifecycle, shutdown) = bootstrap();
        let services = RecordingServices::default();
        let launcher = WindowLauncher::new(ScriptedHost::new(None));

        let requester = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            requester.request(ShutdownReason::Quit);
        });

        // Act
        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            bootstrap.run(base.path(), &services, &launcher),
        )
        .await
        .expect("shutdown must end the launch step")
        .unwrap();

        // Assert
        assert!(matches!(
            outcome,
            StartupOutcome::ShutdownRequested(ShutdownReason::Quit)
        ));
        assert_eq!(
            services.calls(),
            vec![
                "start_server build",
                "start_console",
                "close_renderer",
                "stop_server"
            ]
        );
        assert_eq!(lifecycle.current(), LifecycleState::Closed);
    }

    #[tokio::test]
    async fn test_browser_outlives_close_renderer_on_shutdown() {
        // Arrange: the window log shares the services' call log
        let base = bundle_in("build");
        let (bootstrap, _, shutdown) = bootstrap();
        let services = RecordingServices::default();
        let mut host = ScriptedHost::new(None);
        host.window_log = Some(Arc::clone(&services.calls));
        let launcher = WindowLauncher::new(host);

        let requester = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            requester.request(ShutdownReason::Interrupted);
        });

        // Act
        tokio::time::timeout(
            Duration::from_secs(5),
            bootstrap.run(base.path(), &services, &launcher),
        )
        .await
        .expect("shutdown must end the launch step")
        .unwrap();

        // Assert
        assert_eq!(
            services.calls(),
            vec![
                "start_server build",
                "start_console",
                "close_renderer",
                "window dropped",
                "stop_server"
            ]
        );
    }

    #[tokio::test]
    async fn test_server_failure_is_fatal_and_nothing_launches() {
        // Arrange
        let base = bundle_in("public");
        let (bootstrap, _, _) = bootstrap();
        let services = RecordingServices {
            fail_server: true,
            ..Default::default()
        };
        let host = ScriptedHost::new(Some(Ok(())));
        let attempts = Arc::clone(&host.attempts);
        let launcher = WindowLauncher::new(host);

        // Act
        let result = bootstrap.run(base.path(), &services, &launcher).await;

        // Assert
        assert!(result.is_err());
        assert!(attempts.lock().unwrap().is_empty());
    }
}
