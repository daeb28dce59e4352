//! Dependency health for the admin probe.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use crate::{db::Store, realtime::RealtimeHub};

const PING_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseHealth {
    /// `up` or `down`.
    pub status: &'static str,
    /// Round trip of the ping in milliseconds.
    pub response_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebsocketHealth {
    /// `up` or `disabled`.
    pub status: &'static str,
    pub connections: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: OverallStatus,
    pub database: DatabaseHealth,
    pub websocket: WebsocketHealth,
    /// Seconds since the process started serving.
    pub uptime: u64,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

pub struct HealthService {
    store: Arc<dyn Store>,
    hub: Arc<RealtimeHub>,
    started: Instant,
}

impl HealthService {
    pub fn new(store: Arc<dyn Store>, hub: Arc<RealtimeHub>) -> Self {
        Self {
            store,
            hub,
            started: Instant::now(),
        }
    }

    /// Never fails: a broken dependency is reported, not raised.
    pub async fn check(&self) -> HealthReport {
        let start = Instant::now();
        let ping = tokio::time::timeout(PING_TIMEOUT, self.store.ping()).await;
        let response_time = start.elapsed().as_secs_f64() * 1000.0;

        let database = match ping {
            Ok(Ok(())) => DatabaseHealth {
                status: "up",
                response_time,
                error: None,
            },
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Health probe: database ping failed");
                DatabaseHealth {
                    status: "down",
                    response_time,
                    error: Some("database ping failed".to_string()),
                }
            }
            Err(_) => {
                tracing::warn!("Health probe: database ping timed out");
                DatabaseHealth {
                    status: "down",
                    response_time,
                    error: Some("database ping timed out".to_string()),
                }
            }
        };

        let websocket = WebsocketHealth {
            status: if self.hub.is_enabled() { "up" } else { "disabled" },
            connections: self.hub.connection_count(),
        };

        let status = if database.status != "up" {
            OverallStatus::Unhealthy
        } else if !self.hub.is_enabled() {
            OverallStatus::Degraded
        } else {
            OverallStatus::Healthy
        };

        HealthReport {
            status,
            database,
            websocket,
            uptime: self.started.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION"),
            timestamp: Utc::now(),
        }
    }
}
