//! # Ankra Server
//!
//! Anchor-watch alarm server with a REST API.
//!
//! The server hosts a single [`ankra_core::AnchorWatch`] session:
//! - accepts navigation updates (position, heading, propulsion) over HTTP
//! - evaluates the anchor geofence on every position sample
//! - publishes drag notifications and anchor telemetry
//! - persists the anchor configuration across restarts
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     ankra-server                         │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ REST API    │  │ WatchRunner  │  │ ConfigStore     │  │
//! │  │ (axum)      │  │ (event loop) │  │ (JSON on disk)  │  │
//! │  └──────┬──────┘  └──────┬───────┘  └────────┬────────┘  │
//! │         │                │                   │           │
//! │         ▼                ▼                   │           │
//! │  ┌──────────────────────────────────┐        │           │
//! │  │  Arc<Mutex<AnchorWatch>>         │◄───────┘           │
//! │  │  (single serialization point)    │                    │
//! │  └──────────────────────────────────┘                    │
//! │         │                                                │
//! │         ▼                                                │
//! │  ┌──────────────────────────────────┐                    │
//! │  │  ServerBus (implements HostBus)  │                    │
//! │  └──────────────────────────────────┘                    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! HTTP handlers, the navigation event loop and the watchdog all call
//! into the session behind one mutex, so evaluation cycles and
//! configuration operations never interleave.
//!
//! ## REST API
//!
//! | Endpoint | Description |
//! |----------|-------------|
//! | `POST /v1/api/anchor/drop` | Set the anchor, start watching |
//! | `POST /v1/api/anchor/radius` | Change radius/sector |
//! | `POST /v1/api/anchor/position` | Relocate the anchor |
//! | `POST /v1/api/anchor/raise` | Clear the anchor, stop watching |
//! | `GET  /v1/api/anchor` | Current config, alarm state, telemetry |
//! | `POST /v1/api/navigation` | Feed position/heading/propulsion |
//! | `GET  /v1/api/notifications` | Most recent notification |

use ankra_core::{AlarmSettings, Severity};
use clap::Parser;
use std::path::PathBuf;

pub mod bus;
pub mod navdata;
pub mod storage;
pub mod watch;
pub mod web;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current wall-clock time as epoch milliseconds, the time base the core
/// session expects.
pub fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Alarm severity as a command-line value.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum SeverityArg {
    Alert,
    Warn,
    Alarm,
    Emergency,
}

impl From<SeverityArg> for Severity {
    fn from(value: SeverityArg) -> Self {
        match value {
            SeverityArg::Alert => Severity::Alert,
            SeverityArg::Warn => Severity::Warn,
            SeverityArg::Alarm => Severity::Alarm,
            SeverityArg::Emergency => Severity::Emergency,
        }
    }
}

#[derive(Parser, Clone, Debug)]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Port for webserver
    #[arg(short, long, default_value_t = 3199)]
    pub port: u16,

    /// Override the directory where the anchor configuration is persisted
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Notification level raised while dragging
    #[arg(long, value_enum, default_value_t = SeverityArg::Emergency)]
    pub severity: SeverityArg,

    /// Do not relinquish the watch when engines are detected running
    #[arg(long, default_value_t = false)]
    pub no_engine_override: bool,

    /// Seconds between repeated drag notifications; 0 repeats every update
    #[arg(long, default_value_t = 60.0)]
    pub alarm_interval: f64,

    /// Warn when no position is received for this many seconds; 0 disables
    #[arg(long, default_value_t = 60.0)]
    pub position_timeout: f64,

    /// Distance from the GPS antenna to the bow in meters
    #[arg(long, default_value_t = 0.0)]
    pub bow_offset: f64,
}

impl Cli {
    /// The alarm policy folded into each anchor drop.
    pub fn alarm_settings(&self) -> AlarmSettings {
        AlarmSettings {
            severity: self.severity.into(),
            engine_override_enabled: !self.no_engine_override,
            alarm_repeat_interval_secs: self.alarm_interval,
            no_position_timeout_secs: self.position_timeout,
            bow_offset_m: self.bow_offset,
        }
    }
}
