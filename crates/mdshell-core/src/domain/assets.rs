//! Locating the servable web bundle on disk.
//!
//! The editor front end is built separately (e.g. `npm run build`) and the
//! output directory name depends on the toolchain.  The shell looks through a
//! fixed, ordered list of directory names and picks the first one that holds
//! the entry file.  The order gives freshly built output (`build/`) priority
//! over distribution copies and ad-hoc placements, with the working directory
//! itself as the last resort.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Default candidate directories, highest priority first.
pub const DEFAULT_CANDIDATES: [&str; 4] = ["build", "dist", "public", "."];

/// Default entry file that must exist at the root of the bundle.
pub const DEFAULT_ENTRY_FILE: &str = "index.html";

/// Ordered search for the web bundle directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLocator {
    candidates: Vec<PathBuf>,
    entry_file: String,
}

impl AssetLocator {
    /// Builds a locator with a custom candidate list and entry file.
    pub fn new<I, P>(candidates: I, entry_file: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
            entry_file: entry_file.into(),
        }
    }

    /// The candidate directories in priority order.
    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// The entry file name each candidate is checked for.
    pub fn entry_file(&self) -> &str {
        &self.entry_file
    }

    /// Returns the first candidate under `base` that contains the entry file.
    ///
    /// The returned path is `base.join(candidate)`.  Returns `None` when no
    /// candidate qualifies; the caller must then abort startup instead of
    /// serving an undefined directory.
    pub fn locate(&self, base: &Path) -> Option<PathBuf> {
        for candidate in &self.candidates {
            let dir = base.join(candidate);
            let entry = dir.join(&self.entry_file);
            if entry.is_file() {
                debug!("web bundle found in {}", dir.display());
                return Some(dir);
            }
            debug!("no {} in {}", self.entry_file, dir.display());
        }
        None
    }

    /// Human-readable list of the searched candidates, for error messages.
    pub fn describe_candidates(&self) -> String {
        self.candidates
            .iter()
            .map(|c| format!("{}/", c.display()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for AssetLocator {
    fn default() -> Self {
        Self::new(DEFAULT_CANDIDATES, DEFAULT_ENTRY_FILE)
    }
}
