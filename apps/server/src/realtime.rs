//! Fan-out of committed changes to WebSocket subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shorouk_models::AuditRecord;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::RealtimeConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeEvent {
    /// `<entity_type>.<past tense action>`, e.g. `visit.status_changed`.
    pub event: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub at: DateTime<Utc>,
}

impl RealtimeEvent {
    pub fn from_audit(record: &AuditRecord, at: DateTime<Utc>) -> Self {
        Self {
            event: record.event_name(),
            entity_type: record.entity_type.as_str().to_string(),
            entity_id: record.entity_id,
            at,
        }
    }
}

pub struct RealtimeHub {
    enabled: bool,
    sender: broadcast::Sender<RealtimeEvent>,
    connections: Arc<AtomicUsize>,
}

/// Counts one live subscriber for as long as it is held.
pub struct ConnectionGuard {
    connections: Arc<AtomicUsize>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.connections.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RealtimeHub {
    pub fn new(config: &RealtimeConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            enabled: config.enabled,
            sender,
            connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Publishes to current subscribers. Having none is not an error.
    pub fn publish(&self, event: RealtimeEvent) {
        if !self.enabled {
            return;
        }
        let receivers = self.sender.send(event).unwrap_or(0);
        tracing::trace!(receivers, "Published realtime event");
    }

    pub fn subscribe(&self) -> (broadcast::Receiver<RealtimeEvent>, ConnectionGuard) {
        self.connections.fetch_add(1, Ordering::SeqCst);
        (
            self.sender.subscribe(),
            ConnectionGuard {
                connections: self.connections.clone(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shorouk_models::{AuditAction, EntityType};

    fn event() -> RealtimeEvent {
        let record = AuditRecord::new(AuditAction::Create, EntityType::Patient, Uuid::new_v4());
        RealtimeEvent::from_audit(&record, Utc::now())
    }

    #[tokio::test]
    async fn subscribers_receive_events_and_are_counted() {
        let hub = RealtimeHub::new(&RealtimeConfig::default());
        assert_eq!(hub.connection_count(), 0);

        let (mut rx, guard) = hub.subscribe();
        assert_eq!(hub.connection_count(), 1);

        let sent = event();
        hub.publish(sent.clone());
        assert_eq!(rx.recv().await.unwrap(), sent);
        assert_eq!(sent.event, "patient.created");

        drop(guard);
        assert_eq!(hub.connection_count(), 0);
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let hub = RealtimeHub::new(&RealtimeConfig::default());
        hub.publish(event());
    }

    #[tokio::test]
    async fn disabled_hub_drops_events() {
        let hub = RealtimeHub::new(&RealtimeConfig {
            enabled: false,
            channel_capacity: 4,
        });
        let (mut rx, _guard) = hub.subscribe();
        hub.publish(event());
        assert!(rx.try_recv().is_err());
    }
}
