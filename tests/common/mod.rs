//! Shared utilities for integration testing.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

use archive_mirror::cache::FileCache;
use archive_mirror::config::MirrorConfig;
use archive_mirror::http::HttpServer;
use archive_mirror::lifecycle::Shutdown;

pub const PREFIXES: [&str; 2] = ["http://example.com/", "https://example.com/"];

/// Write a small exported site into a fresh temporary directory.
pub fn fixture_site() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "index.html", concat!(
        "<!DOCTYPE html><html><head>",
        r#"<link rel="stylesheet" href="http://example.com/css/site.css?ver=2">"#,
        r#"<script src="https://example.com/js/app.js"></script>"#,
        "</head><body>",
        r#"<a href="http://example.com/blog/">blog</a>"#,
        r#"<a href="http://other.org/x">elsewhere</a>"#,
        r#"<img src="http://example.com/img/a,b.png" srcset="http://example.com/img/logo.png 1x, http://example.com/img/big.png 2x">"#,
        "</body></html>",
    ));
    write(root, "blog/index.html", "<html><body><p>blog</p></body></html>");
    write(root, "css/site.css?ver=2", "body { color: #222 }\n");
    write(root, "css/copy.css", "body { color: #222 }\n");
    write(root, "js/app.js", "console.log('hi');\n");
    fs::create_dir_all(root.join("old")).unwrap();
    fs::write(
        root.join("old/page.html"),
        b"<html><head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=iso-8859-1\"></head>\
          <body><p title=\"caf\xe9\">caf\xe9</p><template><a href=\"http://example.com/t\">t</a></template></body></html>",
    )
    .unwrap();
    fs::create_dir_all(root.join("img")).unwrap();
    fs::write(root.join("img/a,b.png"), b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR\x00\x00\x00\x01").unwrap();
    dir
}

fn write(root: &Path, path: &str, body: &str) {
    let path = root.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

/// Build the cache for `root` and serve it on an ephemeral port.
pub async fn start_server(root: &Path) -> (SocketAddr, Shutdown) {
    let mut config = MirrorConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.site.public_dir = root.to_path_buf();
    config.site.prefixes = PREFIXES.iter().map(|p| p.to_string()).collect();

    let cache = Arc::new(FileCache::build(root).unwrap());
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config, cache);
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, shutdown)
}

/// HTTP client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
