//! HTTP surface of the appliance.
//!
//! | Method | Path          | Action                            |
//! |--------|---------------|-----------------------------------|
//! | GET    | `/`           | service banner                    |
//! | GET    | `/network`    | [`NetworkInfoService`]            |
//! | POST   | `/hotspot`    | [`ControlService::start_hotspot`] |
//! | POST   | `/delhotspot` | [`ControlService::delete_hotspot`]|
//! | POST   | `/bridge`     | [`ControlService::setup_bridge`]  |
//! | POST   | `/shutdown`   | [`ControlService::shutdown`]      |

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use netgate_shared::errors::ControlError;
use netgate_shared::{ErrorResponse, MessageResponse, NetworkInfo};

use crate::control::ControlService;
use crate::network::NetworkInfoService;

/// Message returned by `GET /`.
pub const BANNER: &str = "Raspberry Pi Management API";

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// Services shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub network: Arc<NetworkInfoService>,
    pub control: Arc<ControlService>,
}

impl AppState {
    pub fn new(network: NetworkInfoService, control: ControlService) -> Self {
        Self {
            network: Arc::new(network),
            control: Arc::new(control),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/network", get(network))
        .route("/hotspot", post(hotspot))
        .route("/delhotspot", post(delete_hotspot))
        .route("/bridge", post(bridge))
        .route("/shutdown", post(shutdown))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serves `app` until `shutdown` resolves, then drains in-flight requests.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = listener
        .local_addr()
        .context("reading listener address")?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("running HTTP server")?;

    info!("HTTP server stopped");
    Ok(())
}

async fn banner() -> Json<MessageResponse> {
    Json(MessageResponse::new(BANNER))
}

async fn network(State(state): State<AppState>) -> ApiResult<NetworkInfo> {
    match state.network.get_network_info().await {
        Ok(info) => Ok(Json(info)),
        Err(e) => {
            error!("{}: {}", e, e.details());
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(e.to_string()).with_details(e.details())),
            ))
        }
    }
}

async fn hotspot(State(state): State<AppState>) -> ApiResult<MessageResponse> {
    control_reply(state.control.start_hotspot().await, "Hotspot created")
}

async fn delete_hotspot(State(state): State<AppState>) -> ApiResult<MessageResponse> {
    control_reply(state.control.delete_hotspot().await, "Hotspot deleted")
}

async fn bridge(State(state): State<AppState>) -> ApiResult<MessageResponse> {
    control_reply(state.control.setup_bridge().await, "Bridge created")
}

async fn shutdown(State(state): State<AppState>) -> ApiResult<MessageResponse> {
    control_reply(state.control.shutdown().await, "Shutdown initiated")
}

fn control_reply(result: Result<(), ControlError>, message: &str) -> ApiResult<MessageResponse> {
    match result {
        Ok(()) => Ok(Json(MessageResponse::new(message))),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(e.to_string()).with_details(e.details())),
        )),
    }
}
