//! Loading `mdshell.toml`.
//!
//! The file is optional.  Without `--config`, `mdshell.toml` in the working
//! directory is used when present and the built-in defaults apply otherwise.
//! An explicitly named file must exist.  A file that exists but does not parse
//! is always an error: silently falling back to defaults would hide a typo in
//! the port or the browser path.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::domain::config::ShellConfig;

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "mdshell.toml";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `--config` named a file that does not exist.
    #[error("config file {path} does not exist")]
    NotFound { path: PathBuf },

    /// A file system I/O error occurred.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Loads the configuration.
///
/// With `explicit = Some(path)` the file must exist; with `None`,
/// [`DEFAULT_CONFIG_FILE`] under `base` is read if present.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] for a missing explicit file,
/// [`ConfigError::Io`] for other read failures and [`ConfigError::Parse`] for
/// malformed TOML.
pub fn load_config(explicit: Option<&Path>, base: &Path) -> Result<ShellConfig, ConfigError> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => (base.join(DEFAULT_CONFIG_FILE), false),
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let cfg: ShellConfig =
                toml::from_str(&content).map_err(|source| ConfigError::Parse {
                    path: path.clone(),
                    source,
                })?;
            info!("loaded configuration from {}", path.display());
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if required {
                return Err(ConfigError::NotFound { path });
            }
            debug!("no {} found; using defaults", path.display());
            Ok(ShellConfig::default())
        }
        Err(source) => Err(ConfigError::Io { path, source }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_default_file_gives_defaults() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();

        // Act
        let cfg = load_config(None, dir.path()).unwrap();

        // Assert
        assert_eq!(cfg, ShellConfig::default());
    }

    #[test]
    fn test_default_file_in_base_is_read() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "[server]\nport = 9090\n",
        )
        .unwrap();

        // Act
        let cfg = load_config(None, dir.path()).unwrap();

        // Assert
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.window.width, 1200);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("custom.toml");

        let result = load_config(Some(missing.as_path()), dir.path());

        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[server]\nport = \"eighty\"\n").unwrap();

        // Act
        let result = load_config(Some(path.as_path()), dir.path());

        // Assert
        match result {
            Err(ConfigError::Parse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_browser_path_is_read_from_launch_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("browser.toml");
        std::fs::write(&path, "[launch]\nbrowser = \"/usr/bin/chromium\"\n").unwrap();

        let cfg = load_config(Some(path.as_path()), dir.path()).unwrap();

        assert_eq!(cfg.launch.browser, Some(PathBuf::from("/usr/bin/chromium")));
        assert_eq!(cfg.launch.startup_probe_ms, 1500);
    }
}
