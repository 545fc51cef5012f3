//! Shared navigation model
//!
//! Holds the most recent position, heading and propulsion telemetry fed
//! over HTTP, and fans out a change signal so the watch runner evaluates
//! once per fresh position sample.

use ankra_core::{EngineStatus, Position};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::watch as watch_channel;

/// One partial navigation update. Absent fields leave the previous value
/// in place, so position, heading and propulsion can arrive separately.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavUpdate {
    pub position: Option<Position>,
    /// True heading in radians
    pub heading_rad: Option<f64>,
    pub propulsion: Option<HashMap<String, EngineStatus>>,
}

#[derive(Debug, Default)]
struct NavInner {
    position: Option<Position>,
    heading_rad: Option<f64>,
    propulsion: Option<HashMap<String, EngineStatus>>,
    /// Epoch ms of the last position sample
    last_fix_ms: u64,
    /// Count of position samples, used as the change signal
    fix_seq: u64,
}

/// Thread-safe navigation state shared between the HTTP layer, the host
/// bus and the watch runner.
#[derive(Clone)]
pub struct NavModel {
    inner: Arc<RwLock<NavInner>>,
    tx: watch_channel::Sender<u64>,
}

impl NavModel {
    pub fn new() -> Self {
        let (tx, _) = watch_channel::channel(0);
        NavModel {
            inner: Arc::new(RwLock::new(NavInner::default())),
            tx,
        }
    }

    /// Merge an update. A fresh position sample wakes subscribers;
    /// heading- or propulsion-only updates do not trigger evaluation.
    pub fn apply(&self, update: NavUpdate, now_ms: u64) {
        let fix_seq = {
            let mut inner = self.inner.write().unwrap();
            if let Some(heading) = update.heading_rad {
                inner.heading_rad = Some(heading);
            }
            if let Some(propulsion) = update.propulsion {
                inner.propulsion = Some(propulsion);
            }
            if let Some(position) = update.position {
                inner.position = Some(position);
                inner.last_fix_ms = now_ms;
                inner.fix_seq += 1;
                Some(inner.fix_seq)
            } else {
                None
            }
        };

        if let Some(seq) = fix_seq {
            let _ = self.tx.send(seq);
        }
    }

    /// Subscribe to position-sample arrivals.
    pub fn subscribe(&self) -> watch_channel::Receiver<u64> {
        self.tx.subscribe()
    }

    pub fn position(&self) -> Option<Position> {
        self.inner.read().unwrap().position
    }

    pub fn heading_rad(&self) -> Option<f64> {
        self.inner.read().unwrap().heading_rad
    }

    pub fn propulsion(&self) -> Option<HashMap<String, EngineStatus>> {
        self.inner.read().unwrap().propulsion.clone()
    }

    pub fn last_fix_ms(&self) -> u64 {
        self.inner.read().unwrap().last_fix_ms
    }
}

impl Default for NavModel {
    fn default() -> Self {
        Self::new()
    }
}
