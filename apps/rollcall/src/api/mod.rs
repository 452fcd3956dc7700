//! # HTTP API
//!
//! axum router over a shared [`Portal`]. Handlers authenticate the caller,
//! hand the request to the portal on the blocking pool and serialize the
//! result. No business rule lives in this module.
//!
//! Every route sits under `/api` and needs a bearer token, except
//! `/health`, `/api/auth/register`, `/api/auth/login` and
//! `/api/auth/forgot-password`.

mod admin;
mod attendance;
mod auth;
mod company;
pub mod error;
mod extract;
mod leaves;

pub use error::ApiError;
pub use extract::{Caller, Client};

use axum::{Json, Router, extract::State, routing::get};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use rollcall_core::Portal;
use serde_json::{Value, json};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub portal: Arc<Portal>,
    /// Process-wide login limiter.
    pub login_limiter: Arc<DefaultDirectRateLimiter>,
    pub started: Instant,
}

impl AppState {
    pub fn new(portal: Portal, logins_per_minute: NonZeroU32) -> Self {
        Self {
            portal: Arc::new(portal),
            login_limiter: Arc::new(RateLimiter::direct(Quota::per_minute(logins_per_minute))),
            started: Instant::now(),
        }
    }

    /// Run a portal operation on the blocking pool. Store access is synchronous.
    pub async fn call<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Portal) -> rollcall_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let portal = Arc::clone(&self.portal);
        tokio::task::spawn_blocking(move || f(&portal))
            .await
            .map_err(|e| {
                error!(error = %e, "portal task failed");
                ApiError::internal("An unexpected error occurred")
            })?
            .map_err(ApiError::from)
    }
}

/// The full router, with request tracing applied.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth::routes())
        .nest("/attendance", attendance::routes())
        .nest("/breaks", attendance::break_routes())
        .nest("/leaves", leaves::routes())
        .nest("/payroll", leaves::payroll_routes())
        .nest("/audit", admin::audit_routes())
        .nest("/users", admin::user_routes())
        .nest("/admin", admin::routes())
        .nest("/sessions", admin::session_routes())
        .nest("/settings", company::settings_routes())
        .nest("/holidays", company::holiday_routes())
        .nest("/announcements", company::announcement_routes());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "uptime": state.started.elapsed().as_secs(),
    }))
}

/// Bind and serve until Ctrl+C or SIGTERM.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let app = build_router(state);
    if let Ok(addr) = listener.local_addr() {
        info!("Rollcall listening on http://{addr}");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received SIGTERM, shutting down");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
