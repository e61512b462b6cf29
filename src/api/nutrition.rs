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
    AssignPlanRequest, CreateNutritionPlanRequest, NutritionPlanQuery, NutritionPlanResponse,
    PlanAssignment, UpdateNutritionPlanRequest,
};
use crate::services::NutritionPlanService;

pub fn nutrition_routes(services: &AppServices) -> Router {
    let router = Router::new()
        .route("/", get(list_plans))
        .route("/mine", get(my_plan))
        .route("/:plan_id", get(get_plan));
    require_member(router, &services.auth).with_state(services.nutrition.clone())
}

pub fn admin_routes(services: &AppServices) -> Router {
    let router = Router::new()
        .route("/", post(create_plan))
        .route("/:plan_id", put(update_plan).delete(deactivate_plan))
        .route("/:plan_id/assign", post(assign_plan));
    require_admin(router, &services.auth).with_state(services.nutrition.clone())
}

/// Active plans, optionally filtered by goal
#[tracing::instrument(skip(service))]
async fn list_plans(
    State(service): State<NutritionPlanService>,
    Query(query): Query<NutritionPlanQuery>,
) -> Result<Json<Vec<NutritionPlanResponse>>, AppError> {
    let plans = service.list_plans(query.goal).await?;
    Ok(Json(plans.into_iter().map(Into::into).collect()))
}

#[tracing::instrument(skip(service))]
async fn get_plan(
    State(service): State<NutritionPlanService>,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<NutritionPlanResponse>, AppError> {
    let plan = service.get_plan(plan_id).await?;
    Ok(Json(plan.into()))
}

/// The plan most recently assigned to the caller, `null` when none
#[tracing::instrument(skip(service, session), fields(user_id = %session.user_id))]
async fn my_plan(
    State(service): State<NutritionPlanService>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<Option<NutritionPlanResponse>>, AppError> {
    let plan = service.current_plan_for_user(session.user_id).await?;
    Ok(Json(plan.map(Into::into)))
}

#[tracing::instrument(skip(service, request))]
async fn create_plan(
    State(service): State<NutritionPlanService>,
    WithRejection(Json(request), _): WithRejection<Json<CreateNutritionPlanRequest>, AppError>,
) -> Result<(StatusCode, Json<NutritionPlanResponse>), AppError> {
    request.validate()?;

    let plan = service.create_plan(request).await?;
    Ok((StatusCode::CREATED, Json(plan.into())))
}

#[tracing::instrument(skip(service, request))]
async fn update_plan(
    State(service): State<NutritionPlanService>,
    Path(plan_id): Path<Uuid>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateNutritionPlanRequest>, AppError>,
) -> Result<Json<NutritionPlanResponse>, AppError> {
    request.validate()?;

    let plan = service.update_plan(plan_id, request).await?;
    Ok(Json(plan.into()))
}

#[tracing::instrument(skip(service))]
async fn deactivate_plan(
    State(service): State<NutritionPlanService>,
    Path(plan_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service.deactivate_plan(plan_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(service, session, request), fields(admin_id = %session.user_id))]
async fn assign_plan(
    State(service): State<NutritionPlanService>,
    Extension(session): Extension<UserSession>,
    Path(plan_id): Path<Uuid>,
    WithRejection(Json(request), _): WithRejection<Json<AssignPlanRequest>, AppError>,
) -> Result<(StatusCode, Json<PlanAssignment>), AppError> {
    let assignment = service
        .assign_plan(plan_id, request.user_id, Some(session.user_id))
        .await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}
