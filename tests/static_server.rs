//! Integration tests for the CORS static file server.

use adkit::server::{ServerConfig, StaticServer};
use reqwest::{Client, Method, StatusCode};
use std::net::SocketAddr;
use std::path::Path;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

fn local_config(root: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        root: Some(root.to_path_buf()),
        service_name: "Test Server".to_string(),
        open_browser: false,
    }
}

async fn start(root: &Path) -> (SocketAddr, oneshot::Sender<()>, JoinHandle<anyhow::Result<()>>) {
    let server = StaticServer::bind(local_config(root)).await.unwrap();
    let addr = server.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve_with_shutdown(async move {
        let _ = rx.await;
    }));
    (addr, tx, handle)
}

fn assert_cors(resp: &reqwest::Response) {
    let h = resp.headers();
    assert_eq!(h["access-control-allow-origin"], "*");
    assert_eq!(h["access-control-allow-methods"], "GET, POST, OPTIONS");
    assert_eq!(h["access-control-allow-headers"], "Content-Type");
}

#[tokio::test]
async fn test_serves_files_with_cors_and_no_cache() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>dashboard</h1>").unwrap();
    std::fs::write(dir.path().join("data.json"), r#"{"ads": 3}"#).unwrap();

    let (addr, stop, handle) = start(dir.path()).await;
    let client = Client::new();

    let resp = client.get(format!("http://{}/data.json", addr)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_cors(&resp);
    assert_eq!(resp.headers()["cache-control"], "no-cache");
    assert_eq!(resp.text().await.unwrap(), r#"{"ads": 3}"#);

    let resp = client.get(format!("http://{}/", addr)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "<h1>dashboard</h1>");

    drop(client);
    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_options_is_no_content_with_cors() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, stop, handle) = start(dir.path()).await;

    let resp = Client::new()
        .request(Method::OPTIONS, format!("http://{}/anything", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_cors(&resp);
    assert_eq!(resp.headers()["cache-control"], "no-cache");

    drop(resp);
    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_missing_file_still_has_cors() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, stop, handle) = start(dir.path()).await;

    let resp = Client::new()
        .get(format!("http://{}/nope.js", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_cors(&resp);

    drop(resp);
    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_port_in_use_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let first = StaticServer::bind(local_config(dir.path())).await.unwrap();
    let port = first.local_addr().unwrap().port();

    let mut config = local_config(dir.path());
    config.port = port;
    let err = StaticServer::bind(config).await.err().expect("second bind should fail");
    assert!(err.to_string().contains("already in use"), "got: {err}");
}

#[tokio::test]
async fn test_missing_root_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_config(&dir.path().join("not-here"));
    assert!(StaticServer::bind(config).await.is_err());
}
