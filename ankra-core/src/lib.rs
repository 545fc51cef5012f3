//! # Ankra Core
//!
//! Platform-independent anchor-watch alarm logic.
//!
//! This crate contains pure geometry and state-machine code with **zero I/O
//! dependencies**: no async runtime, no sockets, no filesystem. Every
//! time-dependent API takes `now` as epoch milliseconds supplied by the
//! caller, which keeps the whole evaluation pipeline deterministic and
//! testable with a simulated clock.
//!
//! ## Architecture
//!
//! `ankra-core` is the shared foundation under any host that can supply a
//! position stream and a notification sink:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ankra-core (platform-independent, no tokio/async deps)     │
//! │  ├── geo/        (haversine, rhumb bearing, projection)     │
//! │  ├── geofence/   (circle & sector containment)              │
//! │  ├── alarm/      (severity state machine, rate limiting)    │
//! │  ├── watchdog/   (no-position timeout, deadline-driven)     │
//! │  ├── watch/      (AnchorWatch session: drop/raise/evaluate) │
//! │  └── HostBus     (abstracts the host data bus)              │
//! └─────────────────────────────────────────────────────────────┘
//!                             ▲
//!                  ┌──────────┴──────────┐
//!                  │  ankra-server       │
//!                  │  (tokio + axum)     │
//!                  └─────────────────────┘
//! ```
//!
//! ## Control flow
//!
//! A position update arrives at the host → the host calls
//! [`AnchorWatch::handle_position_update`] → the watchdog is reset, the
//! geofence evaluator computes distance/bearing/containment, the alarm
//! state machine combines that with the engine-override policy and the
//! previous severity → a [`Notification`] is published on change and the
//! new state persisted through the [`HostBus`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use ankra_core::{AnchorWatch, AlarmSettings, HostBus, Position};
//!
//! fn watch<B: HostBus>(bus: B, now: u64) {
//!     let mut watch = AnchorWatch::new(bus, AlarmSettings::default());
//!     let anchorage = Position::new(59.9, 10.7);
//!     watch.drop_anchor(Some(anchorage), 60.0, None, now).unwrap();
//! }
//! ```

pub mod alarm;
pub mod bus;
pub mod error;
pub mod geo;
pub mod geofence;
pub mod propulsion;
pub mod types;
pub mod watch;
pub mod watchdog;

// Re-export commonly used types
pub use alarm::{decide, decide_no_position, AlarmDecision};
pub use bus::HostBus;
pub use error::{AnchorError, ContainmentFailure};
pub use geo::Position;
pub use geofence::{evaluate, Evaluation};
pub use propulsion::{any_engine_running, EngineStatus};
pub use types::{
    AlarmSettings, AlarmState, AnchorConfig, AnchorTelemetry, ContainmentZone, Notification,
    PersistedConfig, Sector, Severity,
};
pub use watch::AnchorWatch;
pub use watchdog::Watchdog;
