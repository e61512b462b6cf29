use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use axum_extra::extract::WithRejection;

use super::routes::{require_admin, require_member, AppServices};
use crate::error::AppError;
use crate::models::{EbookChapter, EbookChapterSummary, ImportChapterRequest};
use crate::services::EbookService;

pub fn ebook_routes(services: &AppServices) -> Router {
    let router = Router::new()
        .route("/", get(list_chapters))
        .route("/:slug", get(get_chapter));
    require_member(router, &services.auth).with_state(services.ebooks.clone())
}

pub fn admin_routes(services: &AppServices) -> Router {
    let router = Router::new()
        .route("/import", post(import_chapter))
        .route("/:slug", delete(delete_chapter));
    require_admin(router, &services.auth).with_state(services.ebooks.clone())
}

#[tracing::instrument(skip(service))]
async fn list_chapters(
    State(service): State<EbookService>,
) -> Result<Json<Vec<EbookChapterSummary>>, AppError> {
    let chapters = service.list().await?;
    Ok(Json(chapters))
}

#[tracing::instrument(skip(service))]
async fn get_chapter(
    State(service): State<EbookService>,
    Path(slug): Path<String>,
) -> Result<Json<EbookChapter>, AppError> {
    let chapter = service.get(&slug).await?;
    Ok(Json(chapter))
}

#[tracing::instrument(skip(service, request), fields(slug = %request.slug))]
async fn import_chapter(
    State(service): State<EbookService>,
    WithRejection(Json(request), _): WithRejection<Json<ImportChapterRequest>, AppError>,
) -> Result<(StatusCode, Json<EbookChapter>), AppError> {
    let chapter = service.import(request).await?;
    Ok((StatusCode::CREATED, Json(chapter)))
}

#[tracing::instrument(skip(service))]
async fn delete_chapter(
    State(service): State<EbookService>,
    Path(slug): Path<String>,
) -> Result<StatusCode, AppError> {
    service.delete(&slug).await?;
    Ok(StatusCode::NO_CONTENT)
}
