//! REST API
//!
//! Thin translators from HTTP requests to anchor-watch operations. No
//! decision logic lives here; handlers lock the shared session, call the
//! core operation and map its result onto a status code.

use crate::bus::ServerBus;
use crate::navdata::{NavModel, NavUpdate};
use crate::now_ms;
use crate::watch::{DeadlineWaker, SharedWatch};
use ankra_core::{
    AlarmState, AnchorConfig, AnchorError, AnchorTelemetry, Notification, Position, Sector,
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use thiserror::Error;
use tokio::{net::TcpListener, sync::broadcast};
use tokio_graceful_shutdown::SubsystemHandle;

const ANCHOR_URI: &str = "/v1/api/anchor";
const DROP_ANCHOR_URI: &str = "/v1/api/anchor/drop";
const SET_RADIUS_URI: &str = "/v1/api/anchor/radius";
const SET_POSITION_URI: &str = "/v1/api/anchor/position";
const RAISE_ANCHOR_URI: &str = "/v1/api/anchor/raise";
const NAVIGATION_URI: &str = "/v1/api/navigation";
const NOTIFICATIONS_URI: &str = "/v1/api/notifications";

#[derive(Error, Debug)]
pub enum WebError {
    #[error("Socket operation failed")]
    Io(#[from] io::Error),
}

/// HTTP front end over the shared watch session.
#[derive(Clone)]
pub struct Web {
    port: u16,
    watch: SharedWatch,
    nav: NavModel,
    bus: ServerBus,
    waker: DeadlineWaker,
    shutdown_tx: broadcast::Sender<()>,
}

impl Web {
    pub fn new(
        port: u16,
        watch: SharedWatch,
        nav: NavModel,
        bus: ServerBus,
        waker: DeadlineWaker,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Web {
            port,
            watch,
            nav,
            bus,
            waker,
            shutdown_tx,
        }
    }

    pub fn router(self) -> Router {
        Router::new()
            .route(ANCHOR_URI, get(get_anchor))
            .route(DROP_ANCHOR_URI, post(drop_anchor))
            .route(SET_RADIUS_URI, post(set_radius))
            .route(SET_POSITION_URI, post(set_position))
            .route(RAISE_ANCHOR_URI, post(raise_anchor))
            .route(NAVIGATION_URI, post(put_navigation))
            .route(NOTIFICATIONS_URI, get(get_notifications))
            .with_state(self)
    }

    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), WebError> {
        let port = self.port;
        let listener =
            TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), port))
                .await
                .map_err(WebError::Io)?;

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let shutdown_tx = self.shutdown_tx.clone();
        let app = self.router();

        info!("Starting HTTP server on port {}", port);

        tokio::select! { biased;
            _ = subsys.on_shutdown_requested() => {
                let _ = shutdown_tx.send(());
            },
            r = axum::serve(listener, app)
                    .with_graceful_shutdown(
                        async move {
                            _ = shutdown_rx.recv().await;
                        }
                    ) => {
                return r.map_err(WebError::Io);
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DropAnchorRequest {
    /// Anchor position; defaults to the current fix
    position: Option<Position>,
    radius: f64,
    sector: Option<Sector>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetRadiusRequest {
    radius: f64,
    sector: Option<Sector>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetPositionRequest {
    position: Position,
    radius: Option<f64>,
}

/// Response body for configuration operations, matching the host
/// plugin convention: COMPLETED or FAILED plus a message.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ActionResponse {
    state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Everything a display needs about the current watch.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnchorStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<AnchorConfig>,
    alarm: AlarmState,
    telemetry: AnchorTelemetry,
}

fn action_result(result: Result<(), AnchorError>) -> (StatusCode, Json<ActionResponse>) {
    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(ActionResponse {
                state: "COMPLETED",
                message: None,
            }),
        ),
        Err(e) => {
            let status = match &e {
                AnchorError::InvalidConfig(_) | AnchorError::MissingPosition => {
                    StatusCode::BAD_REQUEST
                }
                AnchorError::NotWatching => StatusCode::NOT_FOUND,
                AnchorError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(ActionResponse {
                    state: "FAILED",
                    message: Some(e.to_string()),
                }),
            )
        }
    }
}

async fn drop_anchor(
    State(web): State<Web>,
    Json(request): Json<DropAnchorRequest>,
) -> (StatusCode, Json<ActionResponse>) {
    debug!("drop anchor request, radius {}m", request.radius);
    let result = web.watch.lock().unwrap().drop_anchor(
        request.position,
        request.radius,
        request.sector,
        now_ms(),
    );
    // The runner may be parked on a stale sleep; the watchdog deadline
    // just changed under it.
    web.waker.wake();
    action_result(result)
}

async fn set_radius(
    State(web): State<Web>,
    Json(request): Json<SetRadiusRequest>,
) -> (StatusCode, Json<ActionResponse>) {
    debug!("set radius request, {}m", request.radius);
    let result = web
        .watch
        .lock()
        .unwrap()
        .set_radius(request.radius, request.sector, now_ms());
    web.waker.wake();
    action_result(result)
}

async fn set_position(
    State(web): State<Web>,
    Json(request): Json<SetPositionRequest>,
) -> (StatusCode, Json<ActionResponse>) {
    let result =
        web.watch
            .lock()
            .unwrap()
            .set_position(request.position, request.radius, now_ms());
    web.waker.wake();
    action_result(result)
}

async fn raise_anchor(State(web): State<Web>) -> (StatusCode, Json<ActionResponse>) {
    debug!("raise anchor request");
    let result = web.watch.lock().unwrap().raise_anchor(now_ms());
    web.waker.wake();
    action_result(result)
}

async fn get_anchor(State(web): State<Web>) -> Json<AnchorStatus> {
    let (config, alarm) = {
        let watch = web.watch.lock().unwrap();
        (watch.config().cloned(), *watch.alarm_state())
    };
    Json(AnchorStatus {
        config,
        alarm,
        telemetry: web.bus.last_telemetry(),
    })
}

async fn put_navigation(State(web): State<Web>, Json(update): Json<NavUpdate>) -> StatusCode {
    web.nav.apply(update, now_ms());
    StatusCode::OK
}

async fn get_notifications(State(web): State<Web>) -> Json<Option<Notification>> {
    Json(web.bus.last_notification())
}
