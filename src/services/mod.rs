// Business logic services and external API clients

pub mod brotherhood_service;
pub mod bug_notification_service;
pub mod ebook_service;
pub mod email_service;
pub mod email_template_service;
pub mod facebook_ads_client;
pub mod live_tracking_service;
pub mod login_log_service;
pub mod mollie_client;
pub mod nutrition_plan_service;
pub mod package_service;
pub mod profile_service;
pub mod progress_service;
pub mod storage_service;
pub mod training_schema_service;
pub mod youtube_ads_client;

pub use brotherhood_service::BrotherhoodService;
pub use bug_notification_service::BugNotificationService;
pub use ebook_service::{extract_chapter, DirectoryImportReport, EbookService, ExtractError};
pub use email_service::{Delivery, EmailError, Mailer};
pub use email_template_service::EmailTemplateService;
pub use facebook_ads_client::{prelaunch_campaigns, FacebookAdsClient, DEFAULT_LAUNCH_DELAY};
pub use live_tracking_service::LiveTrackingService;
pub use login_log_service::LoginLogService;
pub use mollie_client::{MollieClient, MolliePayment, NewPayment};
pub use nutrition_plan_service::NutritionPlanService;
pub use package_service::PackageService;
pub use profile_service::ProfileService;
pub use progress_service::ProgressService;
pub use storage_service::StorageService;
pub use training_schema_service::TrainingSchemaService;
pub use youtube_ads_client::YouTubeAdsClient;
