use anyhow::Result;
use axum::{middleware, routing::get, Router};
use sqlx::PgPool;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use super::health::health_check;
use super::{
    auth, brotherhood, bugs, ebooks, email_templates, live, login_logs, marketing, nutrition,
    packages, profile, progress, training,
};
use crate::auth::{
    admin_only_middleware, coach_or_admin_middleware, cors_layer, jwt_auth_middleware,
    security_headers_layer, AuthService,
};
use crate::config::Settings;
use crate::services::{
    BrotherhoodService, BugNotificationService, EbookService, EmailTemplateService,
    FacebookAdsClient, LiveTrackingService, LoginLogService, Mailer, MollieClient,
    NutritionPlanService, PackageService, ProfileService, ProgressService, StorageService,
    TrainingSchemaService, YouTubeAdsClient,
};

/// Upper bound for any request body; photo uploads are the largest
pub const MAX_REQUEST_BYTES: usize = 32 * 1024 * 1024;

/// Every service the HTTP layer hands out to its routers
#[derive(Debug, Clone)]
pub struct AppServices {
    pub auth: AuthService,
    pub profiles: ProfileService,
    pub nutrition: NutritionPlanService,
    pub training: TrainingSchemaService,
    pub brotherhood: BrotherhoodService,
    pub packages: PackageService,
    pub email_templates: EmailTemplateService,
    pub mailer: Mailer,
    pub login_logs: LoginLogService,
    pub bugs: BugNotificationService,
    pub progress: ProgressService,
    pub ebooks: EbookService,
    pub youtube: YouTubeAdsClient,
    pub facebook: FacebookAdsClient,
    pub live: LiveTrackingService,
    pub public_base_url: String,
}

impl AppServices {
    pub async fn from_settings(db: PgPool, settings: &Settings) -> Result<Self> {
        let email_templates = EmailTemplateService::new(db.clone());
        let mailer = Mailer::new(settings.smtp.clone(), email_templates.clone())?;
        let mollie = MollieClient::new(&settings.mollie)?;
        let storage = StorageService::from_config(&settings.storage).await;
        let public_base_url = settings.app.public_base_url.clone();

        Ok(Self {
            auth: AuthService::new(db.clone(), &settings.app.jwt_secret),
            profiles: ProfileService::new(db.clone()),
            nutrition: NutritionPlanService::new(db.clone()),
            training: TrainingSchemaService::new(db.clone()),
            brotherhood: BrotherhoodService::new(db.clone()),
            packages: PackageService::new(db.clone(), mollie, mailer.clone(), &public_base_url),
            email_templates,
            mailer,
            login_logs: LoginLogService::new(db.clone()),
            bugs: BugNotificationService::new(db.clone()),
            progress: ProgressService::new(db.clone(), storage),
            ebooks: EbookService::new(db.clone()),
            youtube: YouTubeAdsClient::new(settings.youtube.clone())?,
            facebook: FacebookAdsClient::new(settings.facebook.clone())?,
            live: LiveTrackingService::new(db),
            public_base_url,
        })
    }
}

pub fn create_routes(services: AppServices) -> Router {
    let admin = Router::new()
        .nest("/profiles", profile::admin_routes(&services))
        .nest("/nutrition-plans", nutrition::admin_routes(&services))
        .nest("/training-schemas", training::admin_routes(&services))
        .nest("/packages", packages::admin_routes(&services))
        .nest("/email-templates", email_templates::admin_routes(&services))
        .nest("/login-logs", login_logs::admin_routes(&services))
        .nest("/bugs", bugs::admin_routes(&services))
        .nest("/ebooks", ebooks::admin_routes(&services))
        .nest("/marketing", marketing::admin_routes(&services))
        .nest("/live", live::admin_routes(&services));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth::auth_routes(&services))
        .nest("/api/profile", profile::profile_routes(&services))
        .nest("/api/nutrition-plans", nutrition::nutrition_routes(&services))
        .nest("/api/training-schemas", training::training_routes(&services))
        .nest("/api/brotherhood", brotherhood::brotherhood_routes(&services))
        .nest("/api/packages", packages::package_routes(&services))
        .nest("/api/webhooks", packages::webhook_routes(&services))
        .nest("/api/bugs", bugs::bug_routes(&services))
        .nest("/api/progress", progress::progress_routes(&services))
        .nest("/api/coach/progress", progress::coach_routes(&services))
        .nest("/api/ebooks", ebooks::ebook_routes(&services))
        .nest("/api/admin", admin)
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BYTES))
        .layer(security_headers_layer())
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// Require a valid access token on every route added so far
pub(crate) fn require_member<S>(router: Router<S>, auth_service: &AuthService) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn_with_state(
        auth_service.clone(),
        jwt_auth_middleware,
    ))
}

/// Admin only. The JWT layer is added last so it runs first and the role check sees the session.
pub(crate) fn require_admin<S>(router: Router<S>, auth_service: &AuthService) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let router = router.route_layer(middleware::from_fn(admin_only_middleware));
    require_member(router, auth_service)
}

pub(crate) fn require_staff<S>(router: Router<S>, auth_service: &AuthService) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let router = router.route_layer(middleware::from_fn(coach_or_admin_middleware));
    require_member(router, auth_service)
}
