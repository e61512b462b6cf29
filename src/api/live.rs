use axum::{extract::State, response::Json, routing::get, Router};

use super::routes::{require_admin, AppServices};
use crate::error::AppError;
use crate::models::LiveSnapshot;
use crate::services::LiveTrackingService;

pub fn admin_routes(services: &AppServices) -> Router {
    let router = Router::new().route("/", get(snapshot));
    require_admin(router, &services.auth).with_state(services.live.clone())
}

/// Polled by the live dashboard; every call reads fresh numbers
async fn snapshot(State(service): State<LiveTrackingService>) -> Result<Json<LiveSnapshot>, AppError> {
    let snapshot = service.snapshot().await?;
    Ok(Json(snapshot))
}
