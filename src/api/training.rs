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
use crate::models::{
    AssignPlanRequest, CreateTrainingSchemaRequest, SchemaAssignment, TrainingSchema,
    TrainingSchemaQuery, UpdateTrainingSchemaRequest,
};
use crate::services::TrainingSchemaService;

pub fn training_routes(services: &AppServices) -> Router {
    let router = Router::new()
        .route("/", get(list_schemas))
        .route("/mine", get(my_schemas))
        .route("/:schema_id", get(get_schema));
    require_member(router, &services.auth).with_state(services.training.clone())
}

pub fn admin_routes(services: &AppServices) -> Router {
    let router = Router::new()
        .route("/", post(create_schema))
        .route("/:schema_id", put(update_schema).delete(deactivate_schema))
        .route("/:schema_id/assign", post(assign_schema));
    require_admin(router, &services.auth).with_state(services.training.clone())
}

#[tracing::instrument(skip(service))]
async fn list_schemas(
    State(service): State<TrainingSchemaService>,
    Query(query): Query<TrainingSchemaQuery>,
) -> Result<Json<Vec<TrainingSchema>>, AppError> {
    let schemas = service.list_schemas(query.level).await?;
    Ok(Json(schemas))
}

#[tracing::instrument(skip(service))]
async fn get_schema(
    State(service): State<TrainingSchemaService>,
    Path(schema_id): Path<Uuid>,
) -> Result<Json<TrainingSchema>, AppError> {
    let schema = service.get_schema(schema_id).await?;
    Ok(Json(schema))
}

#[tracing::instrument(skip(service, session), fields(user_id = %session.user_id))]
async fn my_schemas(
    State(service): State<TrainingSchemaService>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<Vec<TrainingSchema>>, AppError> {
    let schemas = service.schemas_for_user(session.user_id).await?;
    Ok(Json(schemas))
}

#[tracing::instrument(skip(service, request))]
async fn create_schema(
    State(service): State<TrainingSchemaService>,
    WithRejection(Json(request), _): WithRejection<Json<CreateTrainingSchemaRequest>, AppError>,
) -> Result<(StatusCode, Json<TrainingSchema>), AppError> {
    request.validate()?;

    let schema = service.create_schema(request).await?;
    tracing::info!(schema_id = %schema.id, "Created training schema '{}'", schema.name);
    Ok((StatusCode::CREATED, Json(schema)))
}

#[tracing::instrument(skip(service, request))]
async fn update_schema(
    State(service): State<TrainingSchemaService>,
    Path(schema_id): Path<Uuid>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateTrainingSchemaRequest>, AppError>,
) -> Result<Json<TrainingSchema>, AppError> {
    request.validate()?;

    let schema = service.update_schema(schema_id, request).await?;
    Ok(Json(schema))
}

#[tracing::instrument(skip(service))]
async fn deactivate_schema(
    State(service): State<TrainingSchemaService>,
    Path(schema_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service.deactivate_schema(schema_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(service, session, request), fields(admin_id = %session.user_id))]
async fn assign_schema(
    State(service): State<TrainingSchemaService>,
    Extension(session): Extension<UserSession>,
    Path(schema_id): Path<Uuid>,
    WithRejection(Json(request), _): WithRejection<Json<AssignPlanRequest>, AppError>,
) -> Result<(StatusCode, Json<SchemaAssignment>), AppError> {
    let assignment = service
        .assign_schema(schema_id, request.user_id, Some(session.user_id))
        .await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}
