//! Anchor-watch data model
//!
//! Configuration and alarm-state records owned by the watch session, plus
//! the notification and telemetry payloads published through the host bus.

use crate::error::AnchorError;
use crate::geo::Position;
use serde::{Deserialize, Serialize};

/// Notification severity levels.
///
/// `Normal` is the only non-alarming state; the four others are the
/// configurable levels raised while dragging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Alert,
    Warn,
    Alarm,
    Emergency,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Normal
    }
}

impl Severity {
    pub fn is_normal(&self) -> bool {
        matches!(self, Severity::Normal)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Normal => write!(f, "normal"),
            Severity::Alert => write!(f, "alert"),
            Severity::Warn => write!(f, "warn"),
            Severity::Alarm => write!(f, "alarm"),
            Severity::Emergency => write!(f, "emergency"),
        }
    }
}

/// Angular restriction of the allowed circle to an arc, for anchorages
/// with obstructions on one side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sector {
    /// Center bearing of the arc in degrees, `[0, 360)`
    pub orientation_deg: f64,
    /// Total angular width of the arc in degrees, `[0, 180]`
    pub width_deg: f64,
}

impl Sector {
    pub fn validate(&self) -> Result<(), AnchorError> {
        if !self.orientation_deg.is_finite() || !(0.0..360.0).contains(&self.orientation_deg) {
            return Err(AnchorError::InvalidConfig(format!(
                "sector orientation {} outside [0, 360)",
                self.orientation_deg
            )));
        }
        if !self.width_deg.is_finite() || !(0.0..=180.0).contains(&self.width_deg) {
            return Err(AnchorError::InvalidConfig(format!(
                "sector width {} outside [0, 180]",
                self.width_deg
            )));
        }
        Ok(())
    }
}

/// Per-vessel alarm policy, independent of any particular anchor drop.
///
/// These come from the host's plugin settings and are folded into each
/// [`AnchorConfig`] when the anchor is dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlarmSettings {
    /// Notification level raised while dragging
    pub severity: Severity,
    /// Suppress the alarm and relinquish the watch when engines run
    pub engine_override_enabled: bool,
    /// Seconds between repeated drag notifications; 0 repeats every update
    pub alarm_repeat_interval_secs: f64,
    /// Warn when no position arrives for this many seconds; 0 disables
    pub no_position_timeout_secs: f64,
    /// Distance from the GPS antenna to the bow in meters, projected
    /// along the heading before measuring to the anchor
    pub bow_offset_m: f64,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        AlarmSettings {
            severity: Severity::Emergency,
            engine_override_enabled: true,
            alarm_repeat_interval_secs: 60.0,
            no_position_timeout_secs: 60.0,
            bow_offset_m: 0.0,
        }
    }
}

impl AlarmSettings {
    pub fn validate(&self) -> Result<(), AnchorError> {
        if self.severity.is_normal() {
            return Err(AnchorError::InvalidConfig(
                "alarm severity must not be normal".to_string(),
            ));
        }
        if !self.alarm_repeat_interval_secs.is_finite() || self.alarm_repeat_interval_secs < 0.0 {
            return Err(AnchorError::InvalidConfig(
                "alarm repeat interval must be >= 0".to_string(),
            ));
        }
        if !self.no_position_timeout_secs.is_finite() || self.no_position_timeout_secs < 0.0 {
            return Err(AnchorError::InvalidConfig(
                "no-position timeout must be >= 0".to_string(),
            ));
        }
        if !self.bow_offset_m.is_finite() || self.bow_offset_m < 0.0 {
            return Err(AnchorError::InvalidConfig(
                "bow offset must be >= 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Build an anchor configuration from these settings.
    pub fn config(
        &self,
        position: Position,
        radius_m: f64,
        sector: Option<Sector>,
    ) -> AnchorConfig {
        AnchorConfig {
            position,
            radius_m,
            sector,
            severity: self.severity,
            engine_override_enabled: self.engine_override_enabled,
            alarm_repeat_interval_secs: self.alarm_repeat_interval_secs,
            no_position_timeout_secs: self.no_position_timeout_secs,
            bow_offset_m: self.bow_offset_m,
        }
    }
}

/// The saved anchor: geographic point, allowed radius, optional sector,
/// and the alarm policy in force for this drop.
///
/// Created or replaced wholesale on drop-anchor, deleted on raise-anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorConfig {
    /// Anchor position
    pub position: Position,
    /// Allowed radius around the anchor in meters
    pub radius_m: f64,
    /// Optional angular restriction of the allowed circle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<Sector>,
    /// Level raised while dragging (never `normal`)
    pub severity: Severity,
    pub engine_override_enabled: bool,
    pub alarm_repeat_interval_secs: f64,
    pub no_position_timeout_secs: f64,
    pub bow_offset_m: f64,
}

impl AnchorConfig {
    pub fn validate(&self) -> Result<(), AnchorError> {
        if !self.position.is_valid() {
            return Err(AnchorError::InvalidConfig(format!(
                "malformed anchor position {},{}",
                self.position.latitude, self.position.longitude
            )));
        }
        if !self.radius_m.is_finite() || self.radius_m < 0.0 {
            return Err(AnchorError::InvalidConfig(format!(
                "radius {} must be >= 0",
                self.radius_m
            )));
        }
        if let Some(sector) = &self.sector {
            sector.validate()?;
        }
        if self.severity.is_normal() {
            return Err(AnchorError::InvalidConfig(
                "alarm severity must not be normal".to_string(),
            ));
        }
        Ok(())
    }

    /// Watchdog timeout in milliseconds, or `None` when disabled.
    pub fn no_position_timeout_ms(&self) -> Option<u64> {
        if self.no_position_timeout_secs > 0.0 {
            Some((self.no_position_timeout_secs * 1000.0) as u64)
        } else {
            None
        }
    }
}

/// Volatile alarm state for the active watch.
///
/// Invariant: `is_watching == false` implies `severity == Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmState {
    pub severity: Severity,
    /// Epoch ms of the last severity transition
    pub last_severity_change_ms: u64,
    /// Epoch ms the last non-normal notification was sent, 0 = never
    pub last_alarm_sent_ms: u64,
    pub is_watching: bool,
}

impl Default for AlarmState {
    fn default() -> Self {
        AlarmState {
            severity: Severity::Normal,
            last_severity_change_ms: 0,
            last_alarm_sent_ms: 0,
            is_watching: false,
        }
    }
}

impl AlarmState {
    /// Back to not-watching, severity normal.
    pub fn reset(&mut self, now_ms: u64) {
        if !self.severity.is_normal() {
            self.last_severity_change_ms = now_ms;
        }
        self.severity = Severity::Normal;
        self.last_alarm_sent_ms = 0;
        self.is_watching = false;
    }
}

/// Notification payload published to the host bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub severity: Severity,
    /// Delivery methods requested from the host
    pub method: Vec<String>,
    pub message: String,
}

impl Notification {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Notification {
            severity,
            method: vec!["visual".to_string(), "sound".to_string()],
            message: message.into(),
        }
    }
}

/// A distance band and the severity it maps to, published with the
/// anchor telemetry so displays can render the allowed area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainmentZone {
    pub state: Severity,
    /// Lower distance bound in meters
    pub lower: f64,
    /// Upper distance bound in meters; open-ended if absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
}

/// Mirror of the anchor state published for display purposes.
///
/// All fields are `None`/empty when no anchor is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorTelemetry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_position: Option<Position>,
    /// Current distance from the bow to the anchor in meters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_radius_m: Option<f64>,
    /// Configured alarm radius in meters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_radius_m: Option<f64>,
    /// True bearing from the bow to the anchor, radians
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearing_true_rad: Option<f64>,
    /// Bow-relative bearing to the anchor, radians in (-π, π],
    /// positive to starboard. Display only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apparent_bearing_rad: Option<f64>,
    pub zones: Vec<ContainmentZone>,
    /// "on" while an anchor is set, "off" otherwise
    pub anchor_state: String,
}

impl AnchorTelemetry {
    /// Telemetry published after the anchor is raised.
    pub fn cleared() -> Self {
        AnchorTelemetry {
            anchor_state: "off".to_string(),
            ..Default::default()
        }
    }
}

/// What survives a host restart: whether the watch was on and the full
/// anchor configuration, so a restart resumes the identical watch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedConfig {
    pub on: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<AnchorConfig>,
}
