use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{Router, http::StatusCode};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api::{self, AppState};
use crate::config::ServerConfig;

/// Full application: API under `/api` plus the HTTP middleware stack
pub fn app(state: AppState, server: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = usize::try_from(server.request_body_limit_kb)
        .unwrap_or(usize::MAX)
        .saturating_mul(1024);

    Router::new()
        .nest("/api", api::router(state))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            Duration::from_secs(server.request_timeout_seconds.into()),
        ))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

pub async fn run(state: AppState, server: &ServerConfig) -> Result<()> {
    let app = app(state, server);
    let addr: SocketAddr = format!("{}:{}", server.host, server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", server.host, server.port))?;

    #[cfg(feature = "tls")]
    if let (Some(cert), Some(key)) = (&server.tls_cert_path, &server.tls_key_path) {
        let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key)
            .await
            .context("Failed to load TLS certificate")?;
        tracing::info!("Web server running at https://{}", addr);
        axum_server::bind_rustls(addr, tls)
            .serve(app.into_make_service())
            .await
            .context("Web server failed")?;
        return Ok(());
    }

    #[cfg(not(feature = "tls"))]
    if server.tls_cert_path.is_some() || server.tls_key_path.is_some() {
        tracing::warn!(
            "TLS paths configured but built without the `tls` feature; serving plain HTTP"
        );
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Web server running at http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server failed")?;
    Ok(())
}
