//! Anchor watch session
//!
//! One [`AnchorWatch`] owns the anchor configuration, the volatile alarm
//! state and the no-position watchdog, and runs the evaluation pipeline
//! for every position update. All operations are synchronous and take the
//! current time as epoch milliseconds; the host serializes calls (its
//! event loop and request handlers share one session).

use crate::alarm::{self, AlarmDecision};
use crate::bus::HostBus;
use crate::error::AnchorError;
use crate::geo::Position;
use crate::geofence::{self, Evaluation};
use crate::propulsion::any_engine_running;
use crate::types::{
    AlarmSettings, AlarmState, AnchorConfig, AnchorTelemetry, ContainmentZone, Notification,
    PersistedConfig, Sector, Severity,
};
use crate::watchdog::Watchdog;
use log::{debug, error};

/// An anchor watch session: configuration, alarm state and watchdog for
/// a single vessel and a single anchor.
pub struct AnchorWatch<B: HostBus> {
    bus: B,
    settings: AlarmSettings,
    config: Option<AnchorConfig>,
    alarm: AlarmState,
    watchdog: Option<Watchdog>,
}

impl<B: HostBus> AnchorWatch<B> {
    pub fn new(bus: B, settings: AlarmSettings) -> Self {
        AnchorWatch {
            bus,
            settings,
            config: None,
            alarm: AlarmState::default(),
            watchdog: None,
        }
    }

    pub fn config(&self) -> Option<&AnchorConfig> {
        self.config.as_ref()
    }

    pub fn alarm_state(&self) -> &AlarmState {
        &self.alarm
    }

    pub fn is_watching(&self) -> bool {
        self.alarm.is_watching
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Set the anchor and start watching.
    ///
    /// `position` defaults to the current fix; without either this fails
    /// with [`AnchorError::MissingPosition`] and mutates nothing.
    pub fn drop_anchor(
        &mut self,
        position: Option<Position>,
        radius_m: f64,
        sector: Option<Sector>,
        now_ms: u64,
    ) -> Result<(), AnchorError> {
        let anchor = position
            .or_else(|| self.bus.current_position())
            .ok_or(AnchorError::MissingPosition)?;

        let config = self.settings.config(anchor, radius_m, sector);
        config.validate()?;

        debug!(
            "Anchor dropped at {},{} radius {}m",
            anchor.latitude, anchor.longitude, radius_m
        );
        self.config = Some(config);
        self.start_watching(now_ms);
        self.publish_telemetry(None);
        self.persist()
    }

    /// Change the radius (and optionally the sector) of the active anchor.
    pub fn set_radius(
        &mut self,
        radius_m: f64,
        sector: Option<Sector>,
        now_ms: u64,
    ) -> Result<(), AnchorError> {
        let config = self.config.as_ref().ok_or(AnchorError::NotWatching)?;

        let mut candidate = config.clone();
        candidate.radius_m = radius_m;
        if sector.is_some() {
            candidate.sector = sector;
        }
        candidate.validate()?;

        debug!("Anchor radius set to {}m", radius_m);
        self.config = Some(candidate);
        self.start_watching(now_ms);
        self.publish_telemetry(None);
        self.persist()
    }

    /// Relocate the anchor (manual correction). With a radius and no
    /// active anchor this behaves like [`AnchorWatch::drop_anchor`].
    pub fn set_position(
        &mut self,
        position: Position,
        radius_m: Option<f64>,
        now_ms: u64,
    ) -> Result<(), AnchorError> {
        let Some(config) = self.config.as_ref() else {
            return match radius_m {
                Some(radius) => self.drop_anchor(Some(position), radius, None, now_ms),
                None => Err(AnchorError::NotWatching),
            };
        };

        let mut candidate = config.clone();
        candidate.position = position;
        if let Some(radius) = radius_m {
            candidate.radius_m = radius;
        }
        candidate.validate()?;

        debug!(
            "Anchor position set to {},{}",
            position.latitude, position.longitude
        );
        self.config = Some(candidate);
        self.start_watching(now_ms);
        self.publish_telemetry(None);
        self.persist()
    }

    /// Clear the anchor, stop the watch and return to normal. Idempotent.
    ///
    /// After this returns no watchdog firing or evaluation cycle can run
    /// for the torn-down watch.
    pub fn raise_anchor(&mut self, now_ms: u64) -> Result<(), AnchorError> {
        if self.config.is_none() && !self.alarm.is_watching {
            return Ok(());
        }

        debug!("Raise anchor");
        self.config = None;
        self.watchdog = None;

        if self.alarm.is_watching {
            self.bus
                .publish_notification(&Notification::new(Severity::Normal, "Off"));
        }
        self.alarm.reset(now_ms);

        self.bus.publish_anchor_telemetry(&AnchorTelemetry::cleared());
        self.persist()
    }

    /// Run the evaluation pipeline for a fresh position sample.
    pub fn handle_position_update(
        &mut self,
        position: Position,
        heading_rad: Option<f64>,
        now_ms: u64,
    ) {
        if !self.alarm.is_watching {
            return;
        }
        let Some(config) = self.config.clone() else {
            return;
        };

        if let Some(watchdog) = self.watchdog.as_mut() {
            watchdog.reset(now_ms);
        }

        let eval = geofence::evaluate(&position, heading_rad, &config);
        self.publish_telemetry(Some(&eval));

        let engines_running = self
            .bus
            .propulsion()
            .map(|engines| any_engine_running(&engines))
            .unwrap_or(false);

        let decision = alarm::decide(&eval, engines_running, &config, &mut self.alarm, now_ms);
        self.apply(decision, now_ms);
    }

    /// Fire the no-position warning if the watchdog deadline has passed.
    pub fn poll_watchdog(&mut self, now_ms: u64) {
        let fired = self
            .watchdog
            .as_mut()
            .map_or(false, |watchdog| watchdog.poll(now_ms));
        if !fired {
            return;
        }

        let Some(config) = self.config.clone() else {
            return;
        };
        let decision = alarm::decide_no_position(&config, &mut self.alarm, now_ms);
        self.apply(decision, now_ms);
    }

    /// The next instant the watchdog needs servicing, for the host's
    /// event loop.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.watchdog.as_ref().and_then(|watchdog| watchdog.deadline_ms())
    }

    /// Restore a persisted configuration on host start and resume
    /// watching if the watch was on.
    pub fn start(&mut self, persisted: PersistedConfig, now_ms: u64) -> Result<(), AnchorError> {
        let Some(config) = persisted.config else {
            return Ok(());
        };
        config.validate()?;

        self.config = Some(config);
        if persisted.on {
            self.start_watching(now_ms);
            self.publish_telemetry(None);
        }
        Ok(())
    }

    /// Stop the watch for host shutdown. The configuration is kept so a
    /// later [`AnchorWatch::start`] resumes the identical watch.
    pub fn stop(&mut self, now_ms: u64) {
        if !self.alarm.severity.is_normal() {
            self.bus
                .publish_notification(&Notification::new(Severity::Normal, "Stopped"));
        }
        self.watchdog = None;
        self.alarm.reset(now_ms);
        self.bus.publish_anchor_telemetry(&AnchorTelemetry::cleared());
    }

    /// The state that should be saved for a restart.
    pub fn persisted(&self) -> PersistedConfig {
        PersistedConfig {
            on: self.alarm.is_watching && self.config.is_some(),
            config: self.config.clone(),
        }
    }

    fn start_watching(&mut self, now_ms: u64) {
        // Re-arm the watchdog for the (possibly new) timeout
        self.watchdog = self
            .config
            .as_ref()
            .and_then(|config| config.no_position_timeout_ms())
            .map(|timeout_ms| {
                let mut watchdog = Watchdog::new(timeout_ms);
                watchdog.start(now_ms);
                watchdog
            });

        // Idempotent: a second drop while watching replaces the config
        // but does not re-announce the watch
        if self.alarm.is_watching {
            return;
        }

        self.alarm = AlarmState {
            is_watching: true,
            ..AlarmState::default()
        };
        self.bus
            .publish_notification(&Notification::new(Severity::Normal, "Watching"));
    }

    fn apply(&mut self, decision: AlarmDecision, now_ms: u64) {
        if let Some(notification) = &decision.notification {
            self.bus.publish_notification(notification);
        }
        if decision.raise_anchor {
            // Persistence failure must not stall the override path
            if let Err(e) = self.raise_anchor(now_ms) {
                error!("Engine override raise failed to persist: {}", e);
            }
        }
    }

    fn publish_telemetry(&self, eval: Option<&Evaluation>) {
        let Some(config) = self.config.as_ref() else {
            return;
        };

        let zones = vec![
            ContainmentZone {
                state: Severity::Normal,
                lower: 0.0,
                upper: Some(config.radius_m),
            },
            ContainmentZone {
                state: config.severity,
                lower: config.radius_m,
                upper: None,
            },
        ];

        self.bus.publish_anchor_telemetry(&AnchorTelemetry {
            anchor_position: Some(config.position),
            current_radius_m: eval.map(|e| e.distance_m),
            max_radius_m: Some(config.radius_m),
            bearing_true_rad: eval.map(|e| e.bearing_true_rad),
            apparent_bearing_rad: eval.and_then(|e| e.apparent_bearing_rad),
            zones,
            anchor_state: "on".to_string(),
        });
    }

    fn persist(&self) -> Result<(), AnchorError> {
        // In-memory state stays authoritative even when the save fails;
        // the error is surfaced to request-triggered callers only.
        self.bus.persist_config(&self.persisted()).map_err(|e| {
            error!("Failed to persist anchor configuration: {}", e);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{deg_to_rad, destination_from};
    use crate::propulsion::EngineStatus;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Recording stand-in for the host bus.
    struct FakeBus {
        position: Option<Position>,
        heading_rad: Option<f64>,
        propulsion: Option<HashMap<String, EngineStatus>>,
        fail_persist: bool,
        notifications: RefCell<Vec<Notification>>,
        telemetry: RefCell<Vec<AnchorTelemetry>>,
        persisted: RefCell<Vec<PersistedConfig>>,
    }

    impl FakeBus {
        fn new() -> Self {
            FakeBus {
                position: Some(Position::new(0.0, 0.0)),
                heading_rad: None,
                propulsion: None,
                fail_persist: false,
                notifications: RefCell::new(Vec::new()),
                telemetry: RefCell::new(Vec::new()),
                persisted: RefCell::new(Vec::new()),
            }
        }

        fn last_notification(&self) -> Option<Notification> {
            self.notifications.borrow().last().cloned()
        }

        fn last_persisted(&self) -> Option<PersistedConfig> {
            self.persisted.borrow().last().cloned()
        }
    }

    impl HostBus for FakeBus {
        fn current_position(&self) -> Option<Position> {
            self.position
        }

        fn current_heading_rad(&self) -> Option<f64> {
            self.heading_rad
        }

        fn propulsion(&self) -> Option<HashMap<String, EngineStatus>> {
            self.propulsion.clone()
        }

        fn publish_notification(&self, notification: &Notification) {
            self.notifications.borrow_mut().push(notification.clone());
        }

        fn publish_anchor_telemetry(&self, telemetry: &AnchorTelemetry) {
            self.telemetry.borrow_mut().push(telemetry.clone());
        }

        fn persist_config(&self, config: &PersistedConfig) -> Result<(), AnchorError> {
            if self.fail_persist {
                return Err(AnchorError::Persistence("disk full".to_string()));
            }
            self.persisted.borrow_mut().push(config.clone());
            Ok(())
        }
    }

    fn settings() -> AlarmSettings {
        AlarmSettings {
            severity: Severity::Emergency,
            alarm_repeat_interval_secs: 60.0,
            no_position_timeout_secs: 60.0,
            ..AlarmSettings::default()
        }
    }

    fn watch_with(bus: FakeBus) -> AnchorWatch<FakeBus> {
        AnchorWatch::new(bus, settings())
    }

    fn vessel_at(bearing_deg: f64, distance_m: f64) -> Position {
        destination_from(&Position::new(0.0, 0.0), deg_to_rad(bearing_deg), distance_m)
    }

    #[test]
    fn test_drop_anchor_without_fix_fails() {
        let mut bus = FakeBus::new();
        bus.position = None;
        let mut watch = watch_with(bus);

        let result = watch.drop_anchor(None, 60.0, None, 0);
        assert_eq!(result, Err(AnchorError::MissingPosition));
        assert!(watch.config().is_none());
        assert!(!watch.is_watching());
    }

    #[test]
    fn test_drop_anchor_uses_current_fix() {
        let mut watch = watch_with(FakeBus::new());
        watch.drop_anchor(None, 60.0, None, 0).unwrap();

        let config = watch.config().unwrap();
        assert_eq!(config.position, Position::new(0.0, 0.0));
        assert!(watch.is_watching());
        assert_eq!(
            watch.bus().last_notification().unwrap().message,
            "Watching"
        );
        let persisted = watch.bus().last_persisted().unwrap();
        assert!(persisted.on);
    }

    #[test]
    fn test_drop_anchor_rejects_bad_radius() {
        let mut watch = watch_with(FakeBus::new());
        let result = watch.drop_anchor(None, -5.0, None, 0);
        assert!(matches!(result, Err(AnchorError::InvalidConfig(_))));
        assert!(watch.config().is_none());
    }

    #[test]
    fn test_dragging_raises_configured_severity() {
        let mut watch = watch_with(FakeBus::new());
        watch.drop_anchor(None, 100.0, None, 0).unwrap();

        watch.handle_position_update(vessel_at(90.0, 150.0), None, 1_000);

        assert_eq!(watch.alarm_state().severity, Severity::Emergency);
        let notification = watch.bus().last_notification().unwrap();
        assert_eq!(notification.severity, Severity::Emergency);
        assert!(notification.message.contains("Dragging (150m)"));
    }

    #[test]
    fn test_drag_then_clear_round_trip() {
        let mut watch = watch_with(FakeBus::new());
        watch.drop_anchor(None, 100.0, None, 0).unwrap();

        watch.handle_position_update(vessel_at(90.0, 150.0), None, 1_000);
        watch.handle_position_update(vessel_at(90.0, 50.0), None, 2_000);

        assert_eq!(watch.alarm_state().severity, Severity::Normal);
        assert_eq!(watch.bus().last_notification().unwrap().message, "Watching");
        assert!(watch.is_watching());
    }

    #[test]
    fn test_engine_override_raises_anchor() {
        let mut bus = FakeBus::new();
        let mut engines = HashMap::new();
        engines.insert(
            "port".to_string(),
            EngineStatus {
                revolutions: Some(20.0),
                state: None,
            },
        );
        bus.propulsion = Some(engines);
        let mut watch = watch_with(bus);
        watch.drop_anchor(None, 100.0, None, 0).unwrap();

        watch.handle_position_update(vessel_at(0.0, 150.0), None, 1_000);

        assert!(watch.config().is_none());
        assert!(!watch.is_watching());
        assert_eq!(watch.alarm_state().severity, Severity::Normal);
        let messages: Vec<String> = watch
            .bus()
            .notifications
            .borrow()
            .iter()
            .map(|n| n.message.clone())
            .collect();
        assert!(messages.iter().any(|m| m.contains("Engines on")));
        let persisted = watch.bus().last_persisted().unwrap();
        assert!(!persisted.on);
        assert!(persisted.config.is_none());
    }

    #[test]
    fn test_raise_anchor_is_idempotent() {
        let mut watch = watch_with(FakeBus::new());
        watch.drop_anchor(None, 100.0, None, 0).unwrap();

        watch.raise_anchor(1_000).unwrap();
        let persist_count = watch.bus().persisted.borrow().len();
        watch.raise_anchor(2_000).unwrap();

        assert!(watch.config().is_none());
        assert_eq!(watch.alarm_state().severity, Severity::Normal);
        // Second raise was a no-op
        assert_eq!(watch.bus().persisted.borrow().len(), persist_count);
    }

    #[test]
    fn test_watchdog_warns_after_timeout() {
        let mut watch = watch_with(FakeBus::new());
        watch.drop_anchor(None, 100.0, None, 0).unwrap();
        assert_eq!(watch.next_deadline_ms(), Some(60_000));

        watch.poll_watchdog(59_999);
        assert_eq!(watch.alarm_state().severity, Severity::Normal);

        watch.poll_watchdog(60_000);
        assert_eq!(watch.alarm_state().severity, Severity::Warn);
        assert!(watch
            .bus()
            .last_notification()
            .unwrap()
            .message
            .contains("No position data received for 60 seconds"));
    }

    #[test]
    fn test_position_update_resets_watchdog() {
        let mut watch = watch_with(FakeBus::new());
        watch.drop_anchor(None, 100.0, None, 0).unwrap();

        watch.handle_position_update(vessel_at(0.0, 10.0), None, 30_000);
        assert_eq!(watch.next_deadline_ms(), Some(90_000));

        watch.poll_watchdog(60_000);
        assert_eq!(watch.alarm_state().severity, Severity::Normal);
    }

    #[test]
    fn test_no_evaluation_after_raise() {
        let mut watch = watch_with(FakeBus::new());
        watch.drop_anchor(None, 100.0, None, 0).unwrap();
        watch.raise_anchor(1_000).unwrap();

        let notifications = watch.bus().notifications.borrow().len();
        watch.handle_position_update(vessel_at(0.0, 500.0), None, 2_000);
        watch.poll_watchdog(120_000);

        // Torn-down session: no late alarms
        assert_eq!(watch.bus().notifications.borrow().len(), notifications);
        assert_eq!(watch.alarm_state().severity, Severity::Normal);
    }

    #[test]
    fn test_persist_failure_keeps_memory_state() {
        let mut bus = FakeBus::new();
        bus.fail_persist = true;
        let mut watch = watch_with(bus);

        let result = watch.drop_anchor(None, 100.0, None, 0);
        assert!(matches!(result, Err(AnchorError::Persistence(_))));
        // In-memory state remains authoritative
        assert!(watch.config().is_some());
        assert!(watch.is_watching());
    }

    #[test]
    fn test_set_radius_requires_anchor() {
        let mut watch = watch_with(FakeBus::new());
        assert_eq!(
            watch.set_radius(50.0, None, 0),
            Err(AnchorError::NotWatching)
        );
    }

    #[test]
    fn test_set_radius_updates_active_anchor() {
        let mut watch = watch_with(FakeBus::new());
        watch.drop_anchor(None, 100.0, None, 0).unwrap();
        watch.set_radius(40.0, None, 1_000).unwrap();

        assert_eq!(watch.config().unwrap().radius_m, 40.0);

        // Now 50m out is dragging
        watch.handle_position_update(vessel_at(0.0, 50.0), None, 2_000);
        assert_eq!(watch.alarm_state().severity, Severity::Emergency);
    }

    #[test]
    fn test_set_position_without_anchor_needs_radius() {
        let mut watch = watch_with(FakeBus::new());
        assert_eq!(
            watch.set_position(Position::new(1.0, 1.0), None, 0),
            Err(AnchorError::NotWatching)
        );

        watch
            .set_position(Position::new(1.0, 1.0), Some(75.0), 0)
            .unwrap();
        assert_eq!(watch.config().unwrap().position, Position::new(1.0, 1.0));
        assert!(watch.is_watching());
    }

    #[test]
    fn test_restart_resumes_persisted_watch() {
        let mut watch = watch_with(FakeBus::new());
        watch.drop_anchor(None, 100.0, None, 0).unwrap();
        let persisted = watch.persisted();

        let mut restarted = watch_with(FakeBus::new());
        restarted.start(persisted, 10_000).unwrap();

        assert!(restarted.is_watching());
        assert_eq!(restarted.config().unwrap().radius_m, 100.0);
        assert_eq!(restarted.next_deadline_ms(), Some(70_000));
    }

    #[test]
    fn test_stop_announces_when_alarming() {
        let mut watch = watch_with(FakeBus::new());
        watch.drop_anchor(None, 100.0, None, 0).unwrap();
        watch.handle_position_update(vessel_at(0.0, 150.0), None, 1_000);

        watch.stop(2_000);

        let notification = watch.bus().last_notification().unwrap();
        assert_eq!(notification.severity, Severity::Normal);
        assert_eq!(notification.message, "Stopped");
        assert!(!watch.is_watching());
        // Config is retained for a later restart
        assert!(watch.config().is_some());
    }

    #[test]
    fn test_second_drop_is_idempotent_for_watching() {
        let mut watch = watch_with(FakeBus::new());
        watch.drop_anchor(None, 100.0, None, 0).unwrap();
        watch.drop_anchor(None, 80.0, None, 1_000).unwrap();

        let watching_count = watch
            .bus()
            .notifications
            .borrow()
            .iter()
            .filter(|n| n.message == "Watching")
            .count();
        assert_eq!(watching_count, 1);
        assert_eq!(watch.config().unwrap().radius_m, 80.0);
    }
}
