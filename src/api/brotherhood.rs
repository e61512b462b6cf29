use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;
use validator::Validate;

use super::routes::{require_member, AppServices};
use crate::auth::UserSession;
use crate::error::AppError;
use crate::models::{
    BrotherhoodEvent, BrotherhoodGroup, CreateEventRequest, CreateGroupRequest, EventListQuery,
    EventRsvp, GroupMember, RsvpRequest, TemplateName,
};
use crate::services::email_service::template_vars;
use crate::services::{BrotherhoodService, Mailer};

#[derive(Clone)]
pub struct BrotherhoodAppState {
    pub brotherhood_service: BrotherhoodService,
    pub mailer: Mailer,
    pub public_base_url: String,
}

pub fn brotherhood_routes(services: &AppServices) -> Router {
    let state = BrotherhoodAppState {
        brotherhood_service: services.brotherhood.clone(),
        mailer: services.mailer.clone(),
        public_base_url: services.public_base_url.clone(),
    };

    let router = Router::new()
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/:group_id", get(get_group).delete(delete_group))
        .route("/groups/:group_id/join", post(join_group))
        .route("/groups/:group_id/leave", post(leave_group))
        .route("/groups/:group_id/members", get(list_members))
        .route("/groups/:group_id/events", get(list_events).post(create_event))
        .route("/events/:event_id", get(get_event))
        .route("/events/:event_id/rsvp", post(rsvp));

    require_member(router, &services.auth).with_state(state)
}

#[tracing::instrument(skip(state))]
async fn list_groups(
    State(state): State<BrotherhoodAppState>,
) -> Result<Json<Vec<BrotherhoodGroup>>, AppError> {
    let groups = state.brotherhood_service.list_groups().await?;
    Ok(Json(groups))
}

#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
async fn create_group(
    State(state): State<BrotherhoodAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<CreateGroupRequest>, AppError>,
) -> Result<(StatusCode, Json<BrotherhoodGroup>), AppError> {
    request.validate()?;

    let group = state
        .brotherhood_service
        .create_group(session.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(group)))
}

#[tracing::instrument(skip(state))]
async fn get_group(
    State(state): State<BrotherhoodAppState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<BrotherhoodGroup>, AppError> {
    let group = state.brotherhood_service.get_group(group_id).await?;
    Ok(Json(group))
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
async fn delete_group(
    State(state): State<BrotherhoodAppState>,
    Extension(session): Extension<UserSession>,
    Path(group_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .brotherhood_service
        .delete_group(group_id, session.user_id, session.is_admin())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
async fn join_group(
    State(state): State<BrotherhoodAppState>,
    Extension(session): Extension<UserSession>,
    Path(group_id): Path<Uuid>,
) -> Result<(StatusCode, Json<GroupMember>), AppError> {
    let member = state
        .brotherhood_service
        .join(group_id, session.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(member)))
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
async fn leave_group(
    State(state): State<BrotherhoodAppState>,
    Extension(session): Extension<UserSession>,
    Path(group_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .brotherhood_service
        .leave(group_id, session.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state))]
async fn list_members(
    State(state): State<BrotherhoodAppState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Vec<GroupMember>>, AppError> {
    let members = state.brotherhood_service.members(group_id).await?;
    Ok(Json(members))
}

#[tracing::instrument(skip(state))]
async fn list_events(
    State(state): State<BrotherhoodAppState>,
    Path(group_id): Path<Uuid>,
    Query(query): Query<EventListQuery>,
) -> Result<Json<Vec<BrotherhoodEvent>>, AppError> {
    let events = state
        .brotherhood_service
        .list_events(group_id, query.upcoming_only)
        .await?;
    Ok(Json(events))
}

/// Create an event and let the other members know about it
#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
async fn create_event(
    State(state): State<BrotherhoodAppState>,
    Extension(session): Extension<UserSession>,
    Path(group_id): Path<Uuid>,
    WithRejection(Json(request), _): WithRejection<Json<CreateEventRequest>, AppError>,
) -> Result<(StatusCode, Json<BrotherhoodEvent>), AppError> {
    request.validate()?;

    let event = state
        .brotherhood_service
        .create_event(group_id, session.user_id, request)
        .await?;

    let group = state.brotherhood_service.get_group(group_id).await?;
    let contacts = state
        .brotherhood_service
        .member_contacts(group_id, session.user_id)
        .await?;

    let mailer = state.mailer.clone();
    let event_url = format!(
        "{}/brotherhood/events/{}",
        state.public_base_url, event.id
    );
    let base_vars = template_vars([
        ("group", group.name),
        ("event_title", event.title.clone()),
        ("starts_at", event.starts_at.format("%A %e %B %Y, %H:%M UTC").to_string()),
        ("location", event.location.clone().unwrap_or_else(|| "Online".to_string())),
        ("event_url", event_url),
    ]);

    tokio::spawn(async move {
        for (email, display_name) in contacts {
            let mut vars = base_vars.clone();
            vars.insert("name".to_string(), display_name.unwrap_or_else(|| email.clone()));
            if let Err(e) = mailer
                .send_template(TemplateName::BrotherhoodEvent, &email, &vars)
                .await
            {
                tracing::warn!("Event email to {} failed: {}", email, e);
            }
        }
    });

    Ok((StatusCode::CREATED, Json(event)))
}

#[tracing::instrument(skip(state))]
async fn get_event(
    State(state): State<BrotherhoodAppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<BrotherhoodEvent>, AppError> {
    let event = state.brotherhood_service.get_event(event_id).await?;
    Ok(Json(event))
}

#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
async fn rsvp(
    State(state): State<BrotherhoodAppState>,
    Extension(session): Extension<UserSession>,
    Path(event_id): Path<Uuid>,
    WithRejection(Json(request), _): WithRejection<Json<RsvpRequest>, AppError>,
) -> Result<Json<EventRsvp>, AppError> {
    let rsvp = state
        .brotherhood_service
        .rsvp(event_id, session.user_id, request.status)
        .await?;
    Ok(Json(rsvp))
}
