use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, put},
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;
use validator::Validate;

use super::routes::{require_admin, require_member, AppServices};
use crate::auth::{AuthService, UserSession};
use crate::error::AppError;
use crate::models::{Profile, ProfileQuery, SetRoleRequest, UpdateProfileRequest};
use crate::services::ProfileService;

#[derive(Clone)]
pub struct ProfileAppState {
    pub auth_service: AuthService,
    pub profile_service: ProfileService,
}

fn state(services: &AppServices) -> ProfileAppState {
    ProfileAppState {
        auth_service: services.auth.clone(),
        profile_service: services.profiles.clone(),
    }
}

/// The caller's own profile
pub fn profile_routes(services: &AppServices) -> Router {
    let router = Router::new().route("/", get(get_own_profile).put(update_own_profile));
    require_member(router, &services.auth).with_state(state(services))
}

pub fn admin_routes(services: &AppServices) -> Router {
    let router = Router::new()
        .route("/", get(list_profiles))
        .route("/:user_id", get(get_profile))
        .route("/:user_id/role", put(set_role));
    require_admin(router, &services.auth).with_state(state(services))
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
async fn get_own_profile(
    State(state): State<ProfileAppState>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<Profile>, AppError> {
    let profile = state.profile_service.get_profile(session.user_id).await?;
    Ok(Json(profile))
}

#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
async fn update_own_profile(
    State(state): State<ProfileAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateProfileRequest>, AppError>,
) -> Result<Json<Profile>, AppError> {
    request.validate()?;

    let profile = state
        .profile_service
        .update_profile(session.user_id, request)
        .await?;
    Ok(Json(profile))
}

#[tracing::instrument(skip(state))]
async fn list_profiles(
    State(state): State<ProfileAppState>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<Vec<Profile>>, AppError> {
    let profiles = state.profile_service.list_profiles(&query).await?;
    Ok(Json(profiles))
}

#[tracing::instrument(skip(state))]
async fn get_profile(
    State(state): State<ProfileAppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Profile>, AppError> {
    let profile = state.profile_service.get_profile(user_id).await?;
    Ok(Json(profile))
}

/// Change a member's role; the new role applies from their next token refresh
#[tracing::instrument(skip(state, session, request), fields(admin_id = %session.user_id))]
async fn set_role(
    State(state): State<ProfileAppState>,
    Extension(session): Extension<UserSession>,
    Path(user_id): Path<Uuid>,
    WithRejection(Json(request), _): WithRejection<Json<SetRoleRequest>, AppError>,
) -> Result<Json<Profile>, AppError> {
    if user_id == session.user_id {
        return Err(AppError::Validation(
            "Admins cannot change their own role".to_string(),
        ));
    }

    // 404 before touching the role table
    state.profile_service.get_profile(user_id).await?;
    state.auth_service.set_user_role(user_id, &request.role).await?;

    tracing::info!(%user_id, role = request.role.as_str(), "Role changed");
    let profile = state.profile_service.get_profile(user_id).await?;
    Ok(Json(profile))
}
