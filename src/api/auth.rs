use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use axum_extra::{extract::WithRejection, headers::UserAgent, TypedHeader};

use super::routes::{require_member, AppServices};
use crate::auth::{
    extract_bearer_token, AuthError, AuthResponse, AuthService, LoginContext, LoginRequest,
    MessageResponse, RefreshTokenRequest, RegisterRequest, TokenResponse, UserInfo, UserSession,
};
use crate::error::AppError;
use crate::models::TemplateName;
use crate::services::email_service::template_vars;
use crate::services::Mailer;

#[derive(Clone)]
pub struct AuthAppState {
    pub auth_service: AuthService,
    pub mailer: Mailer,
    pub public_base_url: String,
}

/// Authentication routes
pub fn auth_routes(services: &AppServices) -> Router {
    let state = AuthAppState {
        auth_service: services.auth.clone(),
        mailer: services.mailer.clone(),
        public_base_url: services.public_base_url.clone(),
    };

    let protected = require_member(Router::new().route("/me", get(me)), &services.auth);

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh_token))
        .route("/logout", post(logout))
        .merge(protected)
        .with_state(state)
}

/// Register a new member and send the welcome email in the background
#[tracing::instrument(skip(state, request))]
async fn register(
    State(state): State<AuthAppState>,
    WithRejection(Json(request), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> Result<Json<AuthResponse>, AppError> {
    let full_name = request.full_name.clone();
    let response = state.auth_service.register(request).await?;

    let email = response.user.email.clone();
    let vars = template_vars([
        ("name", full_name.unwrap_or_else(|| email.clone())),
        ("dashboard_url", format!("{}/dashboard", state.public_base_url)),
    ]);
    let mailer = state.mailer.clone();
    tokio::spawn(async move {
        if let Err(e) = mailer.send_template(TemplateName::Welcome, &email, &vars).await {
            tracing::warn!("Welcome email to {} failed: {}", email, e);
        }
    });

    Ok(Json(response))
}

/// Login user
#[tracing::instrument(skip(state, headers, user_agent, request))]
async fn login(
    State(state): State<AuthAppState>,
    headers: HeaderMap,
    user_agent: Option<TypedHeader<UserAgent>>,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<Json<AuthResponse>, AppError> {
    let context = LoginContext {
        ip_address: client_ip(&headers),
        user_agent: user_agent.map(|TypedHeader(agent)| agent.as_str().to_string()),
    };

    let response = state.auth_service.login(request, context).await?;
    Ok(Json(response))
}

/// Refresh access token
#[tracing::instrument(skip(state, request))]
async fn refresh_token(
    State(state): State<AuthAppState>,
    WithRejection(Json(request), _): WithRejection<Json<RefreshTokenRequest>, AppError>,
) -> Result<Json<TokenResponse>, AppError> {
    let response = state.auth_service.refresh_token(request).await?;
    Ok(Json(response))
}

/// Logout user
#[tracing::instrument(skip(state, headers))]
async fn logout(
    State(state): State<AuthAppState>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, AppError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or(AuthError::MissingAuthHeader)?;

    let token = extract_bearer_token(auth_header)?;
    let response = state.auth_service.logout(token).await?;
    Ok(Json(response))
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
async fn me(
    State(state): State<AuthAppState>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<UserInfo>, AppError> {
    let info = state.auth_service.user_info(session.user_id).await?;
    Ok(Json(info))
}

/// First hop of `x-forwarded-for`, else `x-real-ip`
fn client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    forwarded
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
        })
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_ip() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers), None);

        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.7"));
        assert_eq!(client_ip(&headers).as_deref(), Some("10.0.0.7"));

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.9"));
    }
}
