//! Engine-override policy
//!
//! Reads propulsion telemetry and decides whether the anchor alarm should
//! be suppressed because the vessel is maneuvering under engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Telemetry for a single propulsion engine. Partial by nature; unknown
/// fields are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    /// Shaft revolutions per second
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revolutions: Option<f64>,
    /// Engine state string, e.g. "started" or "stopped"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// True if any engine reports revolutions above zero or a "started" state.
///
/// Total over all inputs: an empty or absent map means we cannot assume
/// the engines are running, so the answer is `false`.
pub fn any_engine_running(propulsion: &HashMap<String, EngineStatus>) -> bool {
    propulsion.values().any(|engine| {
        engine.revolutions.map_or(false, |rpm| rpm > 0.0)
            || engine.state.as_deref() == Some("started")
    })
}
