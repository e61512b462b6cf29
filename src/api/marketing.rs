use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use axum_extra::extract::WithRejection;
use std::time::Duration;

use super::routes::{require_admin, AppServices};
use crate::error::AppError;
use crate::models::{
    CampaignResult, CampaignSpec, CampaignSummary, LaunchOutcome, LaunchRequest,
    PerformanceQuery, PerformanceReport, VideoPage, VideoQuery,
};
use crate::services::{FacebookAdsClient, YouTubeAdsClient, DEFAULT_LAUNCH_DELAY};

const DEFAULT_PAGE_SIZE: u32 = 25;
const MAX_LAUNCH_DELAY_SECS: u64 = 60;

#[derive(Clone)]
pub struct MarketingAppState {
    pub youtube: YouTubeAdsClient,
    pub facebook: FacebookAdsClient,
}

pub fn admin_routes(services: &AppServices) -> Router {
    let state = MarketingAppState {
        youtube: services.youtube.clone(),
        facebook: services.facebook.clone(),
    };

    let router = Router::new()
        .route("/youtube/videos", get(channel_videos))
        .route("/youtube/performance", get(campaign_performance))
        .route("/facebook/campaigns", get(list_campaigns).post(create_campaign))
        .route("/facebook/campaigns/launch", post(launch_campaigns));
    require_admin(router, &services.auth).with_state(state)
}

#[tracing::instrument(skip(state))]
async fn channel_videos(
    State(state): State<MarketingAppState>,
    Query(query): Query<VideoQuery>,
) -> Result<Json<VideoPage>, AppError> {
    if query.channel_id.trim().is_empty() {
        return Err(AppError::Validation("channel_id is required".to_string()));
    }

    let page = state
        .youtube
        .search_channel_videos(
            query.channel_id.trim(),
            query.page_token.as_deref(),
            query.max_results.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await
        .map_err(AppError::upstream)?;
    Ok(Json(page))
}

#[tracing::instrument(skip(state))]
async fn campaign_performance(
    State(state): State<MarketingAppState>,
    Query(query): Query<PerformanceQuery>,
) -> Result<Json<PerformanceReport>, AppError> {
    if query.end_date < query.start_date {
        return Err(AppError::Validation(
            "end_date must not be before start_date".to_string(),
        ));
    }

    let report = state
        .youtube
        .campaign_performance(query.start_date, query.end_date)
        .await
        .map_err(AppError::upstream)?;
    Ok(Json(report))
}

#[tracing::instrument(skip(state))]
async fn list_campaigns(
    State(state): State<MarketingAppState>,
) -> Result<Json<Vec<CampaignSummary>>, AppError> {
    let campaigns = state
        .facebook
        .list_campaigns()
        .await
        .map_err(AppError::upstream)?;
    Ok(Json(campaigns))
}

#[tracing::instrument(skip(state, spec), fields(campaign = %spec.name))]
async fn create_campaign(
    State(state): State<MarketingAppState>,
    WithRejection(Json(spec), _): WithRejection<Json<CampaignSpec>, AppError>,
) -> Result<(StatusCode, Json<CampaignResult>), AppError> {
    spec.validate().map_err(AppError::Validation)?;

    let result = state
        .facebook
        .create_campaign(&spec)
        .await
        .map_err(AppError::upstream)?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// Create several campaigns one after another. Blocks for the whole sequence.
#[tracing::instrument(skip(state, request), fields(count = request.campaigns.len()))]
async fn launch_campaigns(
    State(state): State<MarketingAppState>,
    WithRejection(Json(request), _): WithRejection<Json<LaunchRequest>, AppError>,
) -> Result<Json<Vec<LaunchOutcome>>, AppError> {
    if request.campaigns.is_empty() {
        return Err(AppError::Validation("No campaigns to launch".to_string()));
    }
    for spec in &request.campaigns {
        spec.validate().map_err(AppError::Validation)?;
    }

    let delay = request
        .delay_seconds
        .map(|secs| Duration::from_secs(secs.min(MAX_LAUNCH_DELAY_SECS)))
        .unwrap_or(DEFAULT_LAUNCH_DELAY);

    let outcomes = state
        .facebook
        .launch_sequence(&request.campaigns, delay)
        .await;
    Ok(Json(outcomes))
}
