//! Immutable launch configuration and the ordered browser launch strategies.
//!
//! The editor window is a Chromium-family browser started in application mode
//! (`--app=URL`), which hides tabs, the address bar and the rest of the browser
//! chrome so the page looks like a native application.  A *launch strategy* is
//! one named set of command-line flags for that browser.  The window launcher
//! tries the strategies in order and stops at the first one that starts.
//!
//! The default list has two entries:
//!
//! 1. `chrome` – app mode plus flags that switch off first-run prompts,
//!    extensions, default apps and plugins, and pin the window geometry.
//! 2. `chrome-app` – app mode only, with no other arguments.  Used when the
//!    installed browser rejects one of the primary flags.

/// Window size and on-screen position, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGeometry {
    pub width: u32,
    pub height: u32,
    pub x: i32,
    pub y: i32,
}

impl Default for WindowGeometry {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            x: 100,
            y: 100,
        }
    }
}

/// One named way of opening the editor window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchStrategy {
    name: String,
    args: Vec<String>,
}

impl LaunchStrategy {
    /// Builds a strategy from a name and its complete argument list.
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// The primary strategy: dedicated application shell.
    pub fn app_shell(url: &str, geometry: WindowGeometry) -> Self {
        let args = vec![
            format!("--app={url}"),
            "--disable-web-security".to_string(),
            "--disable-features=VizDisplayCompositor".to_string(),
            "--no-first-run".to_string(),
            "--disable-default-apps".to_string(),
            "--disable-extensions".to_string(),
            "--disable-plugins".to_string(),
            format!("--window-size={},{}", geometry.width, geometry.height),
            format!("--window-position={},{}", geometry.x, geometry.y),
        ];
        Self::new("chrome", args)
    }

    /// The fallback strategy: plain app mode, no custom arguments.
    pub fn app_minimal(url: &str) -> Self {
        Self::new("chrome-app", vec![format!("--app={url}")])
    }

    /// Short name used in logs and error reports.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Browser command-line arguments, in order.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Everything needed to open the editor window.  Built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    port: u16,
    entry_file: String,
    strategies: Vec<LaunchStrategy>,
}

impl LaunchConfig {
    /// Builds a configuration with the default two-step strategy list.
    pub fn new(geometry: WindowGeometry, port: u16, entry_file: impl Into<String>) -> Self {
        let entry_file = entry_file.into();
        let url = app_url(port, &entry_file);
        Self {
            strategies: vec![
                LaunchStrategy::app_shell(&url, geometry),
                LaunchStrategy::app_minimal(&url),
            ],
            port,
            entry_file,
        }
    }

    /// Replaces the strategy list.
    pub fn with_strategies(mut self, strategies: Vec<LaunchStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn entry_file(&self) -> &str {
        &self.entry_file
    }

    /// Strategies in the order they must be tried.
    pub fn strategies(&self) -> &[LaunchStrategy] {
        &self.strategies
    }

    /// The URL the window opens, e.g. `http://localhost:8080/index.html`.
    pub fn app_url(&self) -> String {
        app_url(self.port, &self.entry_file)
    }
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self::new(WindowGeometry::default(), 8080, "index.html")
    }
}

fn app_url(port: u16, entry_file: &str) -> String {
    format!("http://localhost:{port}/{entry_file}")
}
