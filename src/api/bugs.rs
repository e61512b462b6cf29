use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;
use validator::Validate;

use super::routes::{require_admin, require_member, AppServices};
use crate::auth::UserSession;
use crate::error::AppError;
use crate::models::{BugNotification, BugQuery, ReportBugRequest, UnreadCount, UpdateBugStatusRequest};
use crate::services::BugNotificationService;

/// Members report problems from any page of the dashboard
pub fn bug_routes(services: &AppServices) -> Router {
    let router = Router::new().route("/", post(report_bug));
    require_member(router, &services.auth).with_state(services.bugs.clone())
}

pub fn admin_routes(services: &AppServices) -> Router {
    let router = Router::new()
        .route("/", get(list_bugs))
        .route("/unread-count", get(unread_count))
        .route("/:bug_id/status", put(update_status))
        .route("/:bug_id/read", post(mark_read));
    require_admin(router, &services.auth).with_state(services.bugs.clone())
}

#[tracing::instrument(skip(service, session, request), fields(user_id = %session.user_id))]
async fn report_bug(
    State(service): State<BugNotificationService>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<ReportBugRequest>, AppError>,
) -> Result<(StatusCode, Json<BugNotification>), AppError> {
    request.validate()?;

    let bug = service.report(Some(session.user_id), request).await?;
    Ok((StatusCode::CREATED, Json(bug)))
}

#[tracing::instrument(skip(service))]
async fn list_bugs(
    State(service): State<BugNotificationService>,
    Query(query): Query<BugQuery>,
) -> Result<Json<Vec<BugNotification>>, AppError> {
    let bugs = service.list(&query).await?;
    Ok(Json(bugs))
}

#[tracing::instrument(skip(service))]
async fn unread_count(
    State(service): State<BugNotificationService>,
) -> Result<Json<UnreadCount>, AppError> {
    let unread = service.unread_count().await?;
    Ok(Json(UnreadCount { unread }))
}

#[tracing::instrument(skip(service))]
async fn update_status(
    State(service): State<BugNotificationService>,
    Path(bug_id): Path<Uuid>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateBugStatusRequest>, AppError>,
) -> Result<Json<BugNotification>, AppError> {
    let bug = service.update_status(bug_id, request.status).await?;
    Ok(Json(bug))
}

#[tracing::instrument(skip(service))]
async fn mark_read(
    State(service): State<BugNotificationService>,
    Path(bug_id): Path<Uuid>,
) -> Result<Json<BugNotification>, AppError> {
    let bug = service.mark_read(bug_id).await?;
    Ok(Json(bug))
}
