//! Observability sidecar (A5): health and metrics endpoints shared by both
//! binaries. Explicitly outside the core's invariants — disabling it has no
//! effect on routing correctness (§4.10, §9).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router as AxumRouter};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::json;

/// Shared readiness flag, flipped once the owning binary has finished its own
/// startup (the server's listener bound, the client's stream connected).
#[derive(Default)]
pub struct Readiness(AtomicBool);

impl Readiness {
    /// Marks the process ready to serve.
    pub fn mark_ready(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn is_ready(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Spawns the sidecar HTTP server on `port`. Runs until the process exits;
/// callers typically `tokio::spawn` this alongside the main workload.
pub async fn serve(port: u16, readiness: Arc<Readiness>) -> std::io::Result<()> {
    let recorder_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("installing the global metrics recorder never fails more than once");

    let app = AxumRouter::new()
        .route("/health/live", get(live))
        .route("/health/ready", get(move || ready(readiness.clone())))
        .route("/metrics", get(move || render_metrics(recorder_handle.clone())));

    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    tracing::info!(%addr, "sidecar listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn live() -> Json<serde_json::Value> {
    Json(json!({ "status": "live" }))
}

async fn ready(readiness: Arc<Readiness>) -> (axum::http::StatusCode, Json<serde_json::Value>) {
    if readiness.is_ready() {
        (axum::http::StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not ready" })),
        )
    }
}

async fn render_metrics(handle: metrics_exporter_prometheus::PrometheusHandle) -> String {
    handle.render()
}
