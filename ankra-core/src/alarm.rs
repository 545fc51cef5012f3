//! Alarm state machine
//!
//! Combines the geofence evaluation with the engine-override policy and
//! the previous alarm state, applies rate limiting, and decides what (if
//! anything) to notify. Pure: the only state it touches is the
//! [`AlarmState`] handed in by the session.

use crate::geofence::Evaluation;
use crate::types::{AlarmState, AnchorConfig, Notification, Severity};

/// Outcome of one alarm-machine step.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmDecision {
    /// Severity after this step
    pub severity: Severity,
    /// Notification to publish, if this step emits one
    pub notification: Option<Notification>,
    /// Engine override tripped: the session must raise the anchor and
    /// relinquish the watch entirely
    pub raise_anchor: bool,
}

/// Run one step of the alarm state machine for a position update.
///
/// Rate limiting applies only while continuously dragging at the same
/// severity; any severity change emits immediately. A repeat interval of
/// zero emits every cycle while dragging.
pub fn decide(
    eval: &Evaluation,
    engines_running: bool,
    config: &AnchorConfig,
    state: &mut AlarmState,
    now_ms: u64,
) -> AlarmDecision {
    let mut raise_anchor = false;

    let (candidate, message) = if !eval.within_area {
        if config.engine_override_enabled && engines_running {
            // Operator is maneuvering: give up the watch instead of
            // suppressing a single cycle.
            raise_anchor = true;
            (
                Severity::Normal,
                "Engines on, alarm disabled.".to_string(),
            )
        } else {
            (
                config.severity,
                format!("Dragging ({}m)", eval.distance_m.round() as i64),
            )
        }
    } else {
        (Severity::Normal, "Watching".to_string())
    };

    emit(candidate, message, config, state, now_ms, raise_anchor)
}

/// Watchdog path: no position received within the configured timeout.
/// Raises `warn` through the same emit/notify machinery, without touching
/// distance or containment.
pub fn decide_no_position(
    config: &AnchorConfig,
    state: &mut AlarmState,
    now_ms: u64,
) -> AlarmDecision {
    let message = format!(
        "No position data received for {} seconds.",
        config.no_position_timeout_secs
    );
    emit(Severity::Warn, message, config, state, now_ms, false)
}

fn emit(
    candidate: Severity,
    message: String,
    config: &AnchorConfig,
    state: &mut AlarmState,
    now_ms: u64,
    raise_anchor: bool,
) -> AlarmDecision {
    let mut emit_update = candidate != state.severity;

    // Still dragging at the same severity: rate-limit repeats
    if !candidate.is_normal() && !emit_update {
        let interval_ms = (config.alarm_repeat_interval_secs * 1000.0) as u64;
        if now_ms.saturating_sub(state.last_alarm_sent_ms) >= interval_ms {
            emit_update = true;
        }
    }

    let notification = if emit_update {
        if candidate != state.severity {
            state.last_severity_change_ms = now_ms;
        }
        state.severity = candidate;
        if !candidate.is_normal() {
            state.last_alarm_sent_ms = now_ms;
        }
        Some(Notification::new(candidate, message))
    } else {
        None
    };

    AlarmDecision {
        severity: state.severity,
        notification,
        raise_anchor,
    }
}
