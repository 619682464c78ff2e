use crate::codec::encode_snapshot;
use crate::config::Config;
use crate::coordinator::{Coordinator, CoordinatorHandle};
use crate::error::AppError;
use crate::session::ws_handler;
use crate::tally::TallyStore;
use axum::{
    Router,
    extract::Extension,
    http::{Method, StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
    routing::get,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub coordinator: CoordinatorHandle,
    pub config: Arc<Config>,
}

impl AppState {
    /// Starts the coordinator task; must be called inside a tokio runtime.
    pub fn new(config: Config) -> Self {
        let store = TallyStore::new(config.categories.iter().cloned());
        let coordinator = Coordinator::new(store).spawn();

        AppState {
            coordinator,
            config: Arc::new(config),
        }
    }
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/votes", get(current_votes))
        .route("/health", get(health))
        .layer(Extension(app_state))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::mirror_request())
                .allow_methods([Method::GET, Method::OPTIONS])
                .allow_headers([CONTENT_TYPE]),
        )
        .fallback(handler_404)
}

async fn current_votes(
    Extension(app_state): Extension<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let tally = app_state.coordinator.snapshot().await?;
    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, "application/json")],
        encode_snapshot(&tally),
    ))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}
