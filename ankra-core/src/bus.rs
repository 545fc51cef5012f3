//! Host data-bus abstraction
//!
//! The anchor watch consumes a narrow slice of the host's digital-twin
//! bus: current navigation values in, notifications/telemetry/persisted
//! config out. Hosts implement [`HostBus`]; the core never performs I/O
//! itself.

use crate::error::AnchorError;
use crate::geo::Position;
use crate::propulsion::EngineStatus;
use crate::types::{AnchorTelemetry, Notification, PersistedConfig};
use std::collections::HashMap;

/// The contracts the anchor watch needs from its host.
///
/// Publish methods are fire-and-forget: the core relies on no return
/// value and never blocks on them. Only [`HostBus::persist_config`] can
/// fail, and a failure never rolls back in-memory state.
pub trait HostBus {
    /// Most recent vessel position, if any fix is available
    fn current_position(&self) -> Option<Position>;

    /// Most recent true heading in radians, if known
    fn current_heading_rad(&self) -> Option<f64>;

    /// Propulsion telemetry keyed by engine id, if available
    fn propulsion(&self) -> Option<HashMap<String, EngineStatus>>;

    /// Publish an alarm notification
    fn publish_notification(&self, notification: &Notification);

    /// Publish the anchor telemetry mirror for displays
    fn publish_anchor_telemetry(&self, telemetry: &AnchorTelemetry);

    /// Persist the watch configuration across host restarts
    fn persist_config(&self, config: &PersistedConfig) -> Result<(), AnchorError>;
}
