use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, put},
    Extension, Router,
};
use axum_extra::extract::WithRejection;

use super::routes::{require_admin, AppServices};
use crate::auth::UserSession;
use crate::error::AppError;
use crate::models::{EmailTemplateStatus, SetTemplateEnabledRequest};
use crate::services::EmailTemplateService;

pub fn admin_routes(services: &AppServices) -> Router {
    let router = Router::new()
        .route("/", get(list_templates))
        .route("/:name", put(set_enabled));
    require_admin(router, &services.auth).with_state(services.email_templates.clone())
}

#[tracing::instrument(skip(service))]
async fn list_templates(
    State(service): State<EmailTemplateService>,
) -> Result<Json<Vec<EmailTemplateStatus>>, AppError> {
    let templates = service.list().await?;
    Ok(Json(templates))
}

#[tracing::instrument(skip(service, session, request), fields(admin_id = %session.user_id))]
async fn set_enabled(
    State(service): State<EmailTemplateService>,
    Extension(session): Extension<UserSession>,
    Path(name): Path<String>,
    WithRejection(Json(request), _): WithRejection<Json<SetTemplateEnabledRequest>, AppError>,
) -> Result<Json<EmailTemplateStatus>, AppError> {
    let status = service
        .set_enabled(&name, request.enabled, Some(session.user_id))
        .await?;
    Ok(Json(status))
}
