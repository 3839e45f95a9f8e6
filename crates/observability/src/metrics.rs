//! Prometheus-kompatible Metriken fuer Rundfunk
//!
//! Registrierte Metriken:
//! - `rundfunk_connected_sessions` – Gauge: Aktuell verbundene Sessions
//! - `rundfunk_channel_members` – Gauge: Mitglieder im Server-Channel
//! - `rundfunk_broadcasts_total` – Counter: Ausgefuehrte Broadcasts
//! - `rundfunk_broadcast_sends_total` – Counter: Eingereihte Sendevorgaenge
//! - `rundfunk_broadcast_send_failures_total` – Counter: Gescheiterte Sendevorgaenge
//! - `rundfunk_broadcast_encode_failures_total` – Counter: Nicht kodierbare Nachrichten
//!
//! Die Broadcast-Crates selbst kennen keine Metriken; der Server zaehlt
//! anhand der zurueckgegebenen Handles.

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Alle Rundfunk-Prometheus-Metriken
#[derive(Clone)]
pub struct RundfunkMetrics {
    pub registry: Arc<Registry>,

    pub connected_sessions: IntGauge,
    pub channel_members: IntGauge,
    pub broadcasts_total: IntCounter,
    pub broadcast_sends_total: IntCounter,
    pub broadcast_send_failures_total: IntCounter,
    pub broadcast_encode_failures_total: IntCounter,
}

impl RundfunkMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let connected_sessions = IntGauge::with_opts(Opts::new(
            "rundfunk_connected_sessions",
            "Anzahl aktuell verbundener Sessions",
        ))?;
        registry.register(Box::new(connected_sessions.clone()))?;

        let channel_members = IntGauge::with_opts(Opts::new(
            "rundfunk_channel_members",
            "Anzahl Mitglieder im Server-Channel",
        ))?;
        registry.register(Box::new(channel_members.clone()))?;

        let broadcasts_total = IntCounter::with_opts(Opts::new(
            "rundfunk_broadcasts_total",
            "Gesamtanzahl ausgefuehrter Broadcasts",
        ))?;
        registry.register(Box::new(broadcasts_total.clone()))?;

        let broadcast_sends_total = IntCounter::with_opts(Opts::new(
            "rundfunk_broadcast_sends_total",
            "Gesamtanzahl eingereihter Broadcast-Sendevorgaenge",
        ))?;
        registry.register(Box::new(broadcast_sends_total.clone()))?;

        let broadcast_send_failures_total = IntCounter::with_opts(Opts::new(
            "rundfunk_broadcast_send_failures_total",
            "Gesamtanzahl gescheiterter Broadcast-Sendevorgaenge",
        ))?;
        registry.register(Box::new(broadcast_send_failures_total.clone()))?;

        let broadcast_encode_failures_total = IntCounter::with_opts(Opts::new(
            "rundfunk_broadcast_encode_failures_total",
            "Gesamtanzahl nicht kodierbarer Broadcast-Nachrichten",
        ))?;
        registry.register(Box::new(broadcast_encode_failures_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            connected_sessions,
            channel_members,
            broadcasts_total,
            broadcast_sends_total,
            broadcast_send_failures_total,
            broadcast_encode_failures_total,
        })
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: RundfunkMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<RundfunkMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
