//! Watch runner
//!
//! The event loop that drives the anchor-watch session: it wakes on fresh
//! position samples and on the watchdog deadline, and funnels both
//! through the shared session mutex so evaluation cycles never interleave
//! with HTTP-driven configuration operations.

use crate::bus::ServerBus;
use crate::navdata::NavModel;
use crate::now_ms;
use ankra_core::AnchorWatch;
use log::debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tokio_graceful_shutdown::SubsystemHandle;

/// The single serialization point for all session access.
pub type SharedWatch = Arc<Mutex<AnchorWatch<ServerBus>>>;

/// Wakes the runner when a configuration operation changes the watchdog
/// deadline outside the runner's own loop (the HTTP path). A wake issued
/// while the runner is busy is kept as a permit, so it cannot be lost.
#[derive(Clone, Default)]
pub struct DeadlineWaker(Arc<Notify>);

impl DeadlineWaker {
    pub fn new() -> Self {
        DeadlineWaker(Arc::new(Notify::new()))
    }

    pub fn wake(&self) {
        self.0.notify_one();
    }

    pub async fn notified(&self) {
        self.0.notified().await
    }
}

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Navigation feed closed")]
    FeedClosed,
}

/// Drives an [`AnchorWatch`] from navigation updates and the watchdog
/// deadline.
pub struct WatchRunner {
    watch: SharedWatch,
    nav: NavModel,
    waker: DeadlineWaker,
}

impl WatchRunner {
    pub fn new(watch: SharedWatch, nav: NavModel, waker: DeadlineWaker) -> Self {
        WatchRunner { watch, nav, waker }
    }

    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), WatchError> {
        let mut nav_rx = self.nav.subscribe();

        loop {
            // Sleep until the watchdog needs servicing; effectively
            // forever while no watchdog is armed.
            let sleep_for = {
                let watch = self.watch.lock().unwrap();
                match watch.next_deadline_ms() {
                    Some(deadline) => Duration::from_millis(deadline.saturating_sub(now_ms())),
                    None => Duration::from_secs(3600),
                }
            };

            tokio::select! { biased;
                _ = subsys.on_shutdown_requested() => {
                    debug!("Watch runner shutting down");
                    self.watch.lock().unwrap().stop(now_ms());
                    return Ok(());
                },
                // A config operation re-armed or cleared the watchdog
                // while we were parked on a stale sleep: recompute.
                _ = self.waker.notified() => {},
                changed = nav_rx.changed() => {
                    if changed.is_err() {
                        return Err(WatchError::FeedClosed);
                    }
                    self.on_nav_sample(now_ms());
                },
                _ = tokio::time::sleep(sleep_for) => {
                    self.on_deadline(now_ms());
                },
            }
        }
    }

    /// Evaluate the freshest position sample.
    fn on_nav_sample(&self, now_ms: u64) {
        if let Some(position) = self.nav.position() {
            let heading = self.nav.heading_rad();
            self.watch
                .lock()
                .unwrap()
                .handle_position_update(position, heading, now_ms);
        }
    }

    /// Service the watchdog.
    fn on_deadline(&self, now_ms: u64) {
        self.watch.lock().unwrap().poll_watchdog(now_ms);
    }
}
