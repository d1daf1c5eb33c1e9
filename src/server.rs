//! Static file server with permissive CORS, used to preview dashboards locally.

use crate::config::ServerSettings;
use anyhow::{Context, Result};
use axum::extract::{ConnectInfo, Request};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CACHE_CONTROL,
};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{Level, Span};

const BROWSER_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory to serve. `None` serves the current directory.
    pub root: Option<PathBuf>,
    pub service_name: String,
    pub open_browser: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&ServerSettings::default())
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(s: &ServerSettings) -> Self {
        Self {
            host: s.host.clone(),
            port: s.port,
            root: s.root.clone(),
            service_name: s.service_name.clone(),
            open_browser: s.open_browser,
        }
    }
}

/// Every response gets allow-all CORS headers, and any OPTIONS request is
/// answered with 204 before it reaches the inner routes.
pub fn with_cors(router: Router) -> Router {
    router
        .layer(middleware::from_fn(answer_preflight))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
}

async fn answer_preflight(req: Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }
    next.run(req).await
}

/// One INFO span per request carrying method, path and the client address.
fn request_span(req: &Request) -> Span {
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    tracing::info_span!("request", method = %req.method(), uri = %req.uri(), client = %client)
}

/// Files under `root` (index.html for directories), traced, CORS-enabled.
/// Every response, preflights included, is marked `no-cache`.
pub fn static_router(root: &Path) -> Router {
    let files = ServeDir::new(root).append_index_html_on_directories(true);
    let router = Router::new().fallback_service(files).layer(
        TraceLayer::new_for_http()
            .make_span_with(request_span)
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );
    with_cors(router).layer(SetResponseHeaderLayer::overriding(
        CACHE_CONTROL,
        HeaderValue::from_static("no-cache"),
    ))
}

/// A bound listener ready to serve a directory.
pub struct StaticServer {
    config: ServerConfig,
    root: PathBuf,
    listener: TcpListener,
}

impl StaticServer {
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let root = config.root.clone().unwrap_or_else(|| PathBuf::from("."));
        if !root.is_dir() {
            anyhow::bail!("Serving directory {} does not exist", root.display());
        }

        let addr = format!("{}:{}", config.host, config.port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::error!(port = config.port, "port already in use");
                anyhow::bail!(
                    "Port {} is already in use. Try a different port or stop the existing server.",
                    config.port
                );
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to bind to {}", addr)),
        };

        Ok(Self { config, root, listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().context("listener has no local address")
    }

    /// Serve until `signal` resolves, then drain in-flight requests.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let port = self.local_addr()?.port();
        self.print_banner(port);

        if self.config.open_browser {
            let url = format!("http://localhost:{}", port);
            tokio::spawn(async move {
                tokio::time::sleep(BROWSER_DELAY).await;
                if let Err(e) = webbrowser::open(&url) {
                    tracing::warn!(url, error = %e, "failed to open browser");
                }
            });
        }

        tracing::info!(port, root = %self.root.display(), "serving");
        let app = static_router(&self.root);
        let service = app.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(self.listener, service)
            .with_graceful_shutdown(signal)
            .await
            .context("server error")?;

        println!("  Server stopped.");
        Ok(())
    }

    /// Serve until Ctrl+C.
    pub async fn run(self) -> Result<()> {
        self.serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for Ctrl+C: {}", e);
                return;
            }
            println!();
            println!("  Shutting down server...");
        })
        .await
    }

    fn print_banner(&self, port: u16) {
        let name = &self.config.service_name;
        println!();
        println!("  {}", name);
        println!("  {}", "=".repeat(name.chars().count()));
        println!("  Server running at: http://localhost:{}", port);
        if let Some(root) = &self.config.root {
            println!("  Serving files from: {}", root.display());
        }
        println!();
        println!("  Press Ctrl+C to stop the server");
        println!();
    }
}

/// Bind on all interfaces and serve `dir` (or the current directory) until Ctrl+C.
pub async fn quick_serve(port: u16, dir: Option<PathBuf>, service_name: &str) -> Result<()> {
    let config = ServerConfig {
        port,
        root: dir,
        service_name: service_name.to_string(),
        ..ServerConfig::default()
    };
    StaticServer::bind(config).await?.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;

    #[test]
    fn test_request_span_is_info_with_client() {
        let subscriber = tracing_subscriber::fmt().with_max_level(Level::INFO).finish();
        tracing::subscriber::with_default(subscriber, || {
            let mut req = HttpRequest::builder().uri("/index.html").body(Body::empty()).unwrap();
            req.extensions_mut()
                .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 5555))));

            let span = request_span(&req);
            assert!(!span.is_disabled(), "request span should pass an INFO filter");
            let meta = span.metadata().unwrap();
            assert_eq!(*meta.level(), Level::INFO);
            assert!(meta.fields().field("client").is_some());
            assert!(meta.fields().field("uri").is_some());
        });
    }

    #[test]
    fn test_request_span_without_connect_info() {
        let subscriber = tracing_subscriber::fmt().with_max_level(Level::INFO).finish();
        tracing::subscriber::with_default(subscriber, || {
            let req = HttpRequest::builder().uri("/").body(Body::empty()).unwrap();
            assert!(!request_span(&req).is_disabled());
        });
    }
}
