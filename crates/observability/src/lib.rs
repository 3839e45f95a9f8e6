//! # rundfunk-observability
//!
//! Observability-Crate fuer Rundfunk:
//! - Prometheus-kompatible Metriken (`/metrics`)
//! - Structured Logging via tracing-subscriber

pub mod logging;
pub mod metrics;

pub use logging::logging_initialisieren;
pub use metrics::{metrics_router, RundfunkMetrics};

use anyhow::Result;
use std::net::SocketAddr;

/// Startet den Observability-HTTP-Server
///
/// Endpunkte:
/// - `GET /metrics` – Prometheus scrape format
pub async fn observability_server_starten(
    bind_addr: SocketAddr,
    metriken: RundfunkMetrics,
) -> Result<()> {
    let app = metrics_router(metriken);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Observability-Server gestartet");

    axum::serve(listener, app).await?;
    Ok(())
}
