//! WindowLauncher: opens the editor window using an ordered strategy list.
//!
//! Each [`LaunchStrategy`] is one way of starting the window (a flag set for
//! the browser).  The launcher tries them in order and stops at the first one
//! that starts; once a strategy has started, [`WindowLauncher::launch`] does
//! not return until that window is closed.
//!
//! ```text
//! chrome ──fail──► chrome-app ──fail──► LaunchFailure { both errors }
//!   │                  │
//!   ok                 ok
//!   ▼                  ▼
//! (blocks until the window closes) ──► LaunchReport
//! ```
//!
//! There is never a retry of a strategy that already failed and never an
//! attempt beyond the end of the list.
//!
//! # Architecture
//!
//! The launcher depends only on the [`WindowHost`] trait.  The production host
//! (`infrastructure::browser::ChromeHost`) spawns a browser process; tests use
//! a recording double.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use mdshell_core::LaunchStrategy;

/// Why a single strategy failed to open the window.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchError {
    /// No usable browser executable could be found.
    #[error("no Chrome/Chromium executable found (searched: {searched})")]
    BrowserNotFound { searched: String },

    /// The browser process could not be started.
    #[error("failed to start {program}: {reason}")]
    Spawn { program: String, reason: String },

    /// The browser exited with an error while the window was starting.
    #[error("browser exited during startup ({status})")]
    EarlyExit { status: String },
}

/// Something that can open the editor window with a given strategy.
#[async_trait]
pub trait WindowHost: Send + Sync {
    /// Opens the window and resolves once it has been closed.
    ///
    /// # Errors
    ///
    /// Returns a [`LaunchError`] if the window could not be started.  Errors
    /// that happen after a successful start are not launch failures; the host
    /// logs them and returns `Ok(())`.
    async fn open(&self, strategy: &LaunchStrategy) -> Result<(), LaunchError>;
}

/// One failed strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedAttempt {
    pub strategy: String,
    pub error: LaunchError,
}

impl fmt::Display for FailedAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.error)
    }
}

/// Outcome of a launch whose window opened and was later closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchReport {
    /// Name of the strategy that opened the window.
    pub strategy: String,
    /// Strategies that failed before it, in order.
    pub failed_before: Vec<FailedAttempt>,
}

/// Every strategy failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not open the editor window: {}", summarize(.attempts))]
pub struct LaunchFailure {
    /// One entry per strategy tried, in order.
    pub attempts: Vec<FailedAttempt>,
}

fn summarize(attempts: &[FailedAttempt]) -> String {
    if attempts.is_empty() {
        return "no launch strategy configured".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Tries launch strategies in order over a [`WindowHost`].
pub struct WindowLauncher<H: WindowHost> {
    host: H,
}

impl<H: WindowHost> WindowLauncher<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }

    /// Opens the window with the first strategy that works and waits for it
    /// to close.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchFailure`] carrying every `(strategy, error)` pair when
    /// all strategies fail.
    pub async fn launch(&self, strategies: &[LaunchStrategy]) -> Result<LaunchReport, LaunchFailure> {
        let mut failed = Vec::new();

        for strategy in strategies {
            info!(
                "opening editor window with strategy '{}' ({} args)",
                strategy.name(),
                strategy.args().len()
            );
            match self.host.open(strategy).await {
                Ok(()) => {
                    info!("editor window ({}) closed", strategy.name());
                    return Ok(LaunchReport {
                        strategy: strategy.name().to_string(),
                        failed_before: failed,
                    });
                }
                Err(error) => {
                    warn!("launch strategy '{}' failed: {error}", strategy.name());
                    failed.push(FailedAttempt {
                        strategy: strategy.name().to_string(),
                        error,
                    });
                }
            }
        }

        Err(LaunchFailure { attempts: failed })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
