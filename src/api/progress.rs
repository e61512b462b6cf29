use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use chrono::NaiveDate;
use uuid::Uuid;
use validator::Validate;

use super::routes::{require_member, require_staff, AppServices, MAX_REQUEST_BYTES};
use crate::auth::UserSession;
use crate::error::AppError;
use crate::models::{
    CheckinHistoryEntry, HistoryQuery, PhotoPosition, PhotoUpload, PhotoUploadResponse,
    ProgressCheckin, UpsertCheckinRequest,
};
use crate::services::ProgressService;

/// Member side of the weekly one-to-one: check-ins, photos and own history
pub fn progress_routes(services: &AppServices) -> Router {
    let router = Router::new()
        .route("/", get(own_history).post(upsert_checkin))
        .route(
            "/photos",
            post(upload_photos).layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES)),
        );
    require_member(router, &services.auth).with_state(services.progress.clone())
}

/// Coaches and admins read any member's history
pub fn coach_routes(services: &AppServices) -> Router {
    let router = Router::new().route("/:user_id", get(member_history));
    require_staff(router, &services.auth).with_state(services.progress.clone())
}

#[tracing::instrument(skip(service, session, request), fields(user_id = %session.user_id))]
async fn upsert_checkin(
    State(service): State<ProgressService>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<UpsertCheckinRequest>, AppError>,
) -> Result<Json<ProgressCheckin>, AppError> {
    request.validate()?;

    let checkin = service.upsert_checkin(session.user_id, request).await?;
    Ok(Json(checkin))
}

/// Multipart form: optional `week_of` (YYYY-MM-DD) plus up to three files named
/// `front`, `side` and `back`
#[tracing::instrument(skip(service, session, multipart), fields(user_id = %session.user_id))]
async fn upload_photos(
    State(service): State<ProgressService>,
    Extension(session): Extension<UserSession>,
    multipart: Multipart,
) -> Result<Json<PhotoUploadResponse>, AppError> {
    let (week_of, photos) = read_photo_form(multipart).await?;

    let response = service
        .upload_photos(session.user_id, week_of, photos)
        .await?;
    Ok(Json(response))
}

#[tracing::instrument(skip(service, session), fields(user_id = %session.user_id))]
async fn own_history(
    State(service): State<ProgressService>,
    Extension(session): Extension<UserSession>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<CheckinHistoryEntry>>, AppError> {
    let history = service.history(session.user_id, query.limit).await?;
    Ok(Json(history))
}

#[tracing::instrument(skip(service, session), fields(coach_id = %session.user_id))]
async fn member_history(
    State(service): State<ProgressService>,
    Extension(session): Extension<UserSession>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<CheckinHistoryEntry>>, AppError> {
    let history = service.history(user_id, query.limit).await?;
    Ok(Json(history))
}

async fn read_photo_form(
    mut multipart: Multipart,
) -> Result<(Option<NaiveDate>, Vec<PhotoUpload>), AppError> {
    let mut week_of = None;
    let mut photos = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "week_of" {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            week_of = Some(parse_week_of(&text)?);
            continue;
        }

        let position = PhotoPosition::parse(&name).ok_or_else(|| {
            AppError::Validation(format!(
                "Unexpected field '{}', expected week_of, front, side or back",
                name
            ))
        })?;
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        photos.push(PhotoUpload {
            position,
            content_type,
            data,
        });
    }

    Ok((week_of, photos))
}

fn parse_week_of(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid week_of '{}', use YYYY-MM-DD", value)))
}
