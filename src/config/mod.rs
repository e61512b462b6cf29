// Configuration loaded from the environment

pub mod app;
pub mod database;
pub mod integrations;
pub mod seeding;

pub use app::AppConfig;
pub use database::{run_migrations, DatabaseConfig};
pub use integrations::{FacebookConfig, MollieConfig, SmtpConfig, StorageConfig, YouTubeConfig};
pub use seeding::DatabaseSeeder;

use anyhow::Result;

/// Every configuration section the service and the seed tool need
#[derive(Debug, Clone)]
pub struct Settings {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub smtp: SmtpConfig,
    pub mollie: MollieConfig,
    pub facebook: FacebookConfig,
    pub youtube: YouTubeConfig,
}

impl Settings {
    /// Load `.env` (if present) and read every section
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            smtp: SmtpConfig::from_env()?,
            mollie: MollieConfig::from_env()?,
            facebook: FacebookConfig::from_env()?,
            youtube: YouTubeConfig::from_env()?,
        })
    }
}
