use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::WithRejection;
use validator::Validate;

use super::routes::{require_admin, AppServices};
use crate::error::AppError;
use crate::models::{
    CheckoutRequest, CheckoutResponse, PackageQuery, PackageSummary, PaymentWebhook,
    PrelaunchPackage,
};
use crate::services::PackageService;

/// Public checkout for the prelaunch landing page
pub fn package_routes(services: &AppServices) -> Router {
    Router::new()
        .route("/checkout", post(checkout))
        .with_state(services.packages.clone())
}

/// Called by Mollie; the payment id is the only input and is re-fetched from the API
pub fn webhook_routes(services: &AppServices) -> Router {
    Router::new()
        .route("/mollie", post(mollie_webhook))
        .with_state(services.packages.clone())
}

pub fn admin_routes(services: &AppServices) -> Router {
    let router = Router::new()
        .route("/", get(list_packages))
        .route("/summary", get(summary));
    require_admin(router, &services.auth).with_state(services.packages.clone())
}

#[tracing::instrument(skip(service, request), fields(tier = ?request.tier))]
async fn checkout(
    State(service): State<PackageService>,
    WithRejection(Json(request), _): WithRejection<Json<CheckoutRequest>, AppError>,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError> {
    request.validate()?;

    let response = service.checkout(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Always 200 for ids we don't know, so Mollie stops retrying them.
/// Upstream and database failures return 5xx and Mollie retries later.
#[tracing::instrument(skip(service))]
async fn mollie_webhook(
    State(service): State<PackageService>,
    WithRejection(Form(webhook), _): WithRejection<Form<PaymentWebhook>, AppError>,
) -> Result<StatusCode, AppError> {
    let payment_id = webhook.id.trim();
    if payment_id.is_empty() {
        return Err(AppError::Validation("Missing payment id".to_string()));
    }

    service.handle_webhook(payment_id).await?;
    Ok(StatusCode::OK)
}

#[tracing::instrument(skip(service))]
async fn list_packages(
    State(service): State<PackageService>,
    Query(query): Query<PackageQuery>,
) -> Result<Json<Vec<PrelaunchPackage>>, AppError> {
    let packages = service.list(&query).await?;
    Ok(Json(packages))
}

#[tracing::instrument(skip(service))]
async fn summary(State(service): State<PackageService>) -> Result<Json<PackageSummary>, AppError> {
    let summary = service.summary().await?;
    Ok(Json(summary))
}
