use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};

use super::routes::{require_admin, AppServices};
use crate::error::AppError;
use crate::models::{LoginLog, LoginLogQuery, LoginStats};
use crate::services::LoginLogService;

pub fn admin_routes(services: &AppServices) -> Router {
    let router = Router::new()
        .route("/", get(list_logins))
        .route("/stats", get(login_stats));
    require_admin(router, &services.auth).with_state(services.login_logs.clone())
}

#[tracing::instrument(skip(service))]
async fn list_logins(
    State(service): State<LoginLogService>,
    Query(query): Query<LoginLogQuery>,
) -> Result<Json<Vec<LoginLog>>, AppError> {
    let logs = service.list(&query).await?;
    Ok(Json(logs))
}

#[tracing::instrument(skip(service))]
async fn login_stats(State(service): State<LoginLogService>) -> Result<Json<LoginStats>, AppError> {
    let stats = service.stats().await?;
    Ok(Json(stats))
}
