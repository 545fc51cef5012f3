//! Host-bus implementation
//!
//! [`ServerBus`] wires the core's [`HostBus`] trait to the server's
//! navigation model, config store and notification fan-out.

use crate::navdata::NavModel;
use crate::storage::ConfigStore;
use ankra_core::{
    AnchorError, AnchorTelemetry, EngineStatus, HostBus, Notification, PersistedConfig, Position,
};
use log::info;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast;

/// Server-side host bus: navigation values come from the shared
/// [`NavModel`], notifications are logged and broadcast, configuration is
/// saved through the [`ConfigStore`].
#[derive(Clone)]
pub struct ServerBus {
    nav: NavModel,
    store: Arc<Mutex<ConfigStore>>,
    notify_tx: broadcast::Sender<Notification>,
    last_notification: Arc<RwLock<Option<Notification>>>,
    last_telemetry: Arc<RwLock<AnchorTelemetry>>,
}

impl ServerBus {
    pub fn new(nav: NavModel, store: ConfigStore) -> Self {
        let (notify_tx, _) = broadcast::channel(16);
        ServerBus {
            nav,
            store: Arc::new(Mutex::new(store)),
            notify_tx,
            last_notification: Arc::new(RwLock::new(None)),
            last_telemetry: Arc::new(RwLock::new(AnchorTelemetry::cleared())),
        }
    }

    /// Subscribe to published notifications.
    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notify_tx.subscribe()
    }

    pub fn last_notification(&self) -> Option<Notification> {
        self.last_notification.read().unwrap().clone()
    }

    pub fn last_telemetry(&self) -> AnchorTelemetry {
        self.last_telemetry.read().unwrap().clone()
    }
}

impl HostBus for ServerBus {
    fn current_position(&self) -> Option<Position> {
        self.nav.position()
    }

    fn current_heading_rad(&self) -> Option<f64> {
        self.nav.heading_rad()
    }

    fn propulsion(&self) -> Option<HashMap<String, EngineStatus>> {
        self.nav.propulsion()
    }

    fn publish_notification(&self, notification: &Notification) {
        info!(
            "Notification [{}]: {}",
            notification.severity, notification.message
        );
        *self.last_notification.write().unwrap() = Some(notification.clone());
        // No receivers is fine
        let _ = self.notify_tx.send(notification.clone());
    }

    fn publish_anchor_telemetry(&self, telemetry: &AnchorTelemetry) {
        *self.last_telemetry.write().unwrap() = telemetry.clone();
    }

    fn persist_config(&self, config: &PersistedConfig) -> Result<(), AnchorError> {
        self.store
            .lock()
            .unwrap()
            .save(config)
            .map_err(AnchorError::Persistence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navdata::NavUpdate;
    use ankra_core::Severity;
    use tempfile::TempDir;

    fn bus_in_tempdir() -> (ServerBus, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(Some(dir.path().to_path_buf()));
        (ServerBus::new(NavModel::new(), store), dir)
    }

    #[test]
    fn test_bus_reads_nav_model() {
        let (bus, _dir) = bus_in_tempdir();
        assert_eq!(bus.current_position(), None);

        bus.nav.apply(
            NavUpdate {
                position: Some(Position::new(1.0, 2.0)),
                heading_rad: Some(0.3),
                ..Default::default()
            },
            1_000,
        );

        assert_eq!(bus.current_position(), Some(Position::new(1.0, 2.0)));
        assert_eq!(bus.current_heading_rad(), Some(0.3));
    }

    #[test]
    fn test_notifications_are_recorded_and_broadcast() {
        let (bus, _dir) = bus_in_tempdir();
        let mut rx = bus.subscribe_notifications();

        let notification = Notification::new(Severity::Alarm, "Dragging (150m)");
        bus.publish_notification(&notification);

        assert_eq!(bus.last_notification(), Some(notification.clone()));
        assert_eq!(rx.try_recv().unwrap(), notification);
    }

    #[test]
    fn test_persist_round_trips_through_store() {
        let (bus, _dir) = bus_in_tempdir();
        let persisted = PersistedConfig {
            on: false,
            config: None,
        };
        bus.persist_config(&persisted).unwrap();
        assert_eq!(bus.store.lock().unwrap().load(), Some(persisted));
    }
}
