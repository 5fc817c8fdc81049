//! Asset server: the web bundle and the two page-side scripts.
//!
//! Everything the editor window loads over HTTP comes from one `tiny_http`
//! listener on `127.0.0.1:<port>`:
//!
//! | Request          | Response |
//! |------------------|----------|
//! | `GET /`          | the entry file, with the shim `<script>` injected |
//! | `GET /eel.js`    | the `window.eel` shim, which loads the bridge client |
//! | `GET /bridge.js` | the bridge client, pointed at the bridge port |
//! | `GET /<path>`    | a static file under the web root |
//! | `HEAD` of any    | headers only (`tiny_http` drops the body) |
//! | traversal        | 403 |
//! | anything else    | 404 / 405 |
//!
//! The bridge socket itself lives in [`crate::infrastructure::bridge_server`]
//! on a port of its own.
//!
//! The server runs on a plain thread and answers requests one at a time,
//! polling the shared `running` flag between 200 ms receive timeouts.

use std::fs;
use std::net::{SocketAddr, TcpListener};
use std::path::{Component, Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Context;
use mime_guess::MimeGuess;
use tiny_http::{Header, Method, Response, Server, StatusCode};
use tracing::{debug, info, warn};

/// Path the bridge client is served from.
pub const BRIDGE_SCRIPT_PATH: &str = "/bridge.js";

/// Path the `window.eel` shim is served from.
pub const EEL_SHIM_PATH: &str = "/eel.js";

/// The page half of the bridge protocol, before the port is filled in.
pub const BRIDGE_SCRIPT: &str = include_str!("../../assets/bridge.js");

/// Defines `window.eel` for bundles that only hook up when it exists.
pub const EEL_SHIM: &str = include_str!("../../assets/eel.js");

const PORT_PLACEHOLDER: &str = "__MDSHELL_BRIDGE_PORT__";

const SCRIPT_TAG: &str = "<script src=\"/eel.js\"></script>";

const POLL_INTERVAL: Duration = Duration::from_millis(200);

// ── Replies ───────────────────────────────────────────────────────────────────

/// What the server sends back for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Reply {
    fn ok(content_type: String, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type,
            body,
        }
    }

    fn script(source: &str) -> Self {
        Self::ok(mime_for(Path::new("script.js")), source.as_bytes().to_vec())
    }

    fn error(status: u16, text: &str) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8".to_string(),
            body: format!("{text}\n").into_bytes(),
        }
    }
}

fn mime_for(path: &Path) -> String {
    let mime = MimeGuess::from_path(path).first_or_octet_stream();
    if mime.type_() == mime_guess::mime::TEXT || mime.subtype() == "javascript" {
        format!("{}; charset=utf-8", mime.essence_str())
    } else {
        mime.essence_str().to_string()
    }
}

// ── Site ──────────────────────────────────────────────────────────────────────

/// The files the editor window may load.
#[derive(Debug, Clone)]
pub struct AssetSite {
    web_root: PathBuf,
    entry_file: String,
    bridge_script: String,
}

impl AssetSite {
    /// `bridge_port` is written into the served `bridge.js`.
    pub fn new(web_root: PathBuf, entry_file: impl Into<String>, bridge_port: u16) -> Self {
        Self {
            web_root,
            entry_file: entry_file.into(),
            bridge_script: BRIDGE_SCRIPT.replace(PORT_PLACEHOLDER, &bridge_port.to_string()),
        }
    }

    /// Answers one request.  Reads from the web root but never writes.
    pub fn reply(&self, method: &Method, url: &str) -> Reply {
        if !matches!(method, Method::Get | Method::Head) {
            return Reply::error(405, "Method Not Allowed");
        }

        let path = url.split(['?', '#']).next().unwrap_or_default();
        if !path.starts_with('/') {
            return Reply::error(400, "Bad Request");
        }
        let Some(decoded) = percent_decode(path) else {
            return Reply::error(400, "Bad Request");
        };

        match decoded.as_str() {
            BRIDGE_SCRIPT_PATH => Reply::script(&self.bridge_script),
            EEL_SHIM_PATH => Reply::script(EEL_SHIM),
            "/" => self.serve_file(Path::new(&self.entry_file)),
            other => match relative_path(other) {
                Some(rel) => self.serve_file(&rel),
                None => {
                    warn!("refused path {url}");
                    Reply::error(403, "Forbidden")
                }
            },
        }
    }

    fn serve_file(&self, rel: &Path) -> Reply {
        let full = self.web_root.join(rel);

        // Symlinks must not lead out of the web root either.
        let (Ok(root), Ok(resolved)) = (self.web_root.canonicalize(), full.canonicalize()) else {
            return Reply::error(404, "Not found");
        };
        if !resolved.starts_with(&root) {
            warn!("refusing {} (outside the web root)", full.display());
            return Reply::error(403, "Forbidden");
        }
        if !resolved.is_file() {
            return Reply::error(404, "Not found");
        }

        match fs::read(&resolved) {
            Ok(bytes) if rel == Path::new(&self.entry_file) => {
                let html = String::from_utf8_lossy(&bytes);
                Reply::ok(mime_for(rel), inject_shim_script(&html).into_bytes())
            }
            Ok(bytes) => Reply::ok(mime_for(rel), bytes),
            Err(e) => {
                debug!("cannot read {}: {e}", resolved.display());
                Reply::error(404, "Not found")
            }
        }
    }
}

/// Converts `/a/b.css` into `a/b.css`, refusing anything that could leave the
/// web root.
fn relative_path(url_path: &str) -> Option<PathBuf> {
    let mut rel = PathBuf::new();
    for segment in url_path.split('/').filter(|s| !s.is_empty()) {
        if segment == ".." || segment.contains('\\') || segment.contains(':') {
            return None;
        }
        if segment == "." {
            continue;
        }
        rel.push(segment);
    }
    if rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(rel)
}

fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Inserts the shim `<script>` tag into an HTML document: before `</head>`,
/// else before `</body>`, else at the end.
pub fn inject_shim_script(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let at = lower
        .find("</head>")
        .or_else(|| lower.find("</body>"))
        .unwrap_or(html.len());
    let mut out = String::with_capacity(html.len() + SCRIPT_TAG.len());
    out.push_str(&html[..at]);
    out.push_str(SCRIPT_TAG);
    out.push_str(&html[at..]);
    out
}

// ── Server ────────────────────────────────────────────────────────────────────

/// Binds the asset listener.  Kept separate from [`spawn_asset_server`] so a
/// taken port is reported before the window is launched.
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub fn bind_assets(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    TcpListener::bind(addr).with_context(|| format!("failed to bind the editor server on {addr}"))
}

/// Starts answering requests on a dedicated thread until `running` is
/// cleared.
///
/// # Errors
///
/// Returns an error if `tiny_http` cannot take over the listener or the
/// thread cannot be spawned.
pub fn spawn_asset_server(
    listener: TcpListener,
    site: AssetSite,
    running: Arc<AtomicBool>,
) -> anyhow::Result<JoinHandle<()>> {
    let addr = listener.local_addr().ok();
    let server = Server::from_listener(listener, None)
        .map_err(|e| anyhow::anyhow!("failed to start the editor server: {e}"))?;
    if let Some(addr) = addr {
        info!(
            "editor server listening on http://{addr} (root {})",
            site.web_root.display()
        );
    }

    thread::Builder::new()
        .name("asset-server".to_string())
        .spawn(move || serve(server, site, running))
        .context("failed to spawn the editor server thread")
}

fn serve(server: Server, site: AssetSite, running: Arc<AtomicBool>) {
    while running.load(Ordering::Relaxed) {
        let request = match server.recv_timeout(POLL_INTERVAL) {
            Ok(Some(request)) => request,
            // No request in the last 200 ms; re-check the flag.
            Ok(None) => continue,
            Err(e) => {
                warn!("editor server receive error: {e}");
                continue;
            }
        };

        let reply = site.reply(request.method(), request.url());
        debug!("{} {} -> {}", request.method(), request.url(), reply.status);

        let mut response = Response::from_data(reply.body).with_status_code(StatusCode(reply.status));
        let mut headers = vec![
            ("Content-Type", reply.content_type),
            ("Cache-Control", "no-store".to_string()),
            ("X-Content-Type-Options", "nosniff".to_string()),
        ];
        if reply.status == 405 {
            headers.push(("Allow", "GET, HEAD".to_string()));
        }
        for (name, value) in headers {
            if let Ok(header) = Header::from_bytes(name.as_bytes(), value.as_bytes()) {
                response = response.with_header(header);
            }
        }

        if let Err(e) = request.respond(response) {
            debug!("editor server could not send a response: {e}");
        }
    }
    info!("shutdown flag set; stopping editor server");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// A bundle at `<tmp>/build` with a file next to it that must stay
    /// unreachable.
    fn bundle() -> (tempfile::TempDir, AssetSite) {
        let outer = tempfile::tempdir().unwrap();
        let root = outer.path().join("build");
        fs::create_dir_all(root.join("static/css")).unwrap();
        fs::write(
            root.join("index.html"),
            "<html><head><title>editor</title></head><body></body></html>",
        )
        .unwrap();
        fs::write(root.join("static/css/main.css"), "body{}").unwrap();
        fs::write(outer.path().join("secret.txt"), "outside").unwrap();
        let site = AssetSite::new(root, "index.html", 41234);
        (outer, site)
    }

    fn get(site: &AssetSite, url: &str) -> Reply {
        site.reply(&Method::Get, url)
    }

    // ── Routing ───────────────────────────────────────────────────────────────

    #[test]
    fn test_root_serves_entry_file_with_shim() {
        // Arrange
        let (_dir, site) = bundle();

        // Act
        let reply = get(&site, "/");

        // Assert
        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_type, "text/html; charset=utf-8");
        let html = String::from_utf8(reply.body).unwrap();
        assert!(html.contains("<script src=\"/eel.js\"></script></head>"));
    }

    #[test]
    fn test_query_string_is_ignored() {
        let (_dir, site) = bundle();
        assert_eq!(get(&site, "/static/css/main.css?v=3").body, b"body{}");
    }

    #[test]
    fn test_nested_path_is_relative_to_root() {
        let (_dir, site) = bundle();

        let reply = get(&site, "/static/css/main.css");

        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_type, "text/css; charset=utf-8");
    }

    #[test]
    fn test_traversal_is_forbidden() {
        // Arrange
        let (_dir, site) = bundle();

        // Act / Assert: plain, percent-encoded and backslash forms
        for url in ["/../secret.txt", "/a/../../secret.txt", "/%2e%2e/secret.txt", "/..%5csecret.txt"] {
            let reply = get(&site, url);
            assert_eq!(reply.status, 403, "{url}");
            assert_ne!(reply.body, b"outside");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_out_of_the_root_is_forbidden() {
        // Arrange
        let (dir, site) = bundle();
        std::os::unix::fs::symlink(
            dir.path().join("secret.txt"),
            dir.path().join("build/leak.txt"),
        )
        .unwrap();

        // Act
        let reply = get(&site, "/leak.txt");

        // Assert
        assert_eq!(reply.status, 403);
    }

    #[test]
    fn test_missing_file_and_directories_are_not_found() {
        let (_dir, site) = bundle();
        assert_eq!(get(&site, "/missing.css").status, 404);
        assert_eq!(get(&site, "/static").status, 404);
    }

    #[test]
    fn test_bad_targets_are_bad_requests() {
        let (_dir, site) = bundle();
        assert_eq!(get(&site, "/%zz").status, 400);
        assert_eq!(get(&site, "*").status, 400);
    }

    #[test]
    fn test_other_methods_are_not_allowed() {
        let (_dir, site) = bundle();
        assert_eq!(site.reply(&Method::Post, "/").status, 405);
        assert_eq!(site.reply(&Method::Head, "/").status, 200);
    }

    // ── Scripts ───────────────────────────────────────────────────────────────

    #[test]
    fn test_bridge_script_carries_the_bridge_port() {
        // Arrange
        let (_dir, site) = bundle();

        // Act
        let reply = get(&site, "/bridge.js");

        // Assert
        let script = String::from_utf8(reply.body).unwrap();
        assert!(reply.content_type.contains("javascript"));
        assert!(script.contains("ws://127.0.0.1:41234/bridge"));
        assert!(!script.contains(PORT_PLACEHOLDER));
    }

    #[test]
    fn test_eel_shim_defines_eel_and_loads_the_bridge() {
        let (_dir, site) = bundle();

        let reply = get(&site, "/eel.js");

        let script = String::from_utf8(reply.body).unwrap();
        assert_eq!(reply.status, 200);
        assert!(script.contains("window.eel"));
        assert!(script.contains("expose"));
        assert!(script.contains("/bridge.js"));
    }

    #[test]
    fn test_bridge_script_speaks_the_protocol() {
        for needle in ["ReadMarkdown", "WriteMarkdown", "Ready", "Close", "__mdshellBridge"] {
            assert!(BRIDGE_SCRIPT.contains(needle), "bridge.js lacks {needle}");
        }
    }

    // ── Injection ─────────────────────────────────────────────────────────────

    #[test]
    fn test_script_injected_before_head_close() {
        let out = inject_shim_script("<html><HEAD><title>x</title></HEAD><body></body></html>");
        assert_eq!(
            out,
            "<html><HEAD><title>x</title><script src=\"/eel.js\"></script></HEAD><body></body></html>"
        );
    }

    #[test]
    fn test_script_injected_before_body_close_without_head() {
        let out = inject_shim_script("<body><div id=root></div></body>");
        assert_eq!(
            out,
            "<body><div id=root></div><script src=\"/eel.js\"></script></body>"
        );
    }

    #[test]
    fn test_script_appended_to_fragment() {
        assert_eq!(
            inject_shim_script("<div></div>"),
            "<div></div><script src=\"/eel.js\"></script>"
        );
    }
}
