use anyhow::Result;
use std::env;

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// S3-compatible object storage used for progress photos
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub url_expiry_seconds: u64,
}

impl StorageConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bucket: env::var("STORAGE_BUCKET").unwrap_or_else(|_| "progress-photos".to_string()),
            region: env::var("STORAGE_REGION").unwrap_or_else(|_| "eu-central-1".to_string()),
            endpoint: optional_var("STORAGE_ENDPOINT"),
            url_expiry_seconds: env::var("STORAGE_URL_EXPIRY_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .unwrap_or(3600),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// `None` means mail is logged instead of delivered
    pub host: Option<String>,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

impl SmtpConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: optional_var("SMTP_HOST"),
            port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()
                .unwrap_or(587),
            username: env::var("SMTP_USERNAME").unwrap_or_default(),
            password: env::var("SMTP_PASSWORD").unwrap_or_default(),
            from_email: env::var("SMTP_FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@toptiermen.eu".to_string()),
            from_name: env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "Top Tier Men".to_string()),
        })
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 587,
            username: String::new(),
            password: String::new(),
            from_email: "noreply@toptiermen.eu".to_string(),
            from_name: "Top Tier Men".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MollieConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl MollieConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_key: optional_var("MOLLIE_API_KEY"),
            base_url: env::var("MOLLIE_BASE_URL")
                .unwrap_or_else(|_| "https://api.mollie.com".to_string()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct FacebookConfig {
    pub access_token: Option<String>,
    pub ad_account_id: Option<String>,
    pub page_id: Option<String>,
    pub api_version: String,
    pub base_url: String,
}

impl FacebookConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            access_token: optional_var("FACEBOOK_ACCESS_TOKEN"),
            ad_account_id: optional_var("FACEBOOK_AD_ACCOUNT_ID"),
            page_id: optional_var("FACEBOOK_PAGE_ID"),
            api_version: env::var("FACEBOOK_API_VERSION").unwrap_or_else(|_| "v19.0".to_string()),
            base_url: env::var("FACEBOOK_BASE_URL")
                .unwrap_or_else(|_| "https://graph.facebook.com".to_string()),
        })
    }
}

/// YouTube Data API and Google Ads credentials. Anything missing puts the
/// wrapper into mock mode.
#[derive(Debug, Clone, Default)]
pub struct YouTubeConfig {
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub developer_token: Option<String>,
    pub customer_id: Option<String>,
    pub youtube_base_url: String,
    pub ads_base_url: String,
}

impl YouTubeConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_key: optional_var("YOUTUBE_API_KEY"),
            access_token: optional_var("YOUTUBE_ACCESS_TOKEN"),
            developer_token: optional_var("GOOGLE_ADS_DEVELOPER_TOKEN"),
            customer_id: optional_var("GOOGLE_ADS_CUSTOMER_ID").map(|id| id.replace('-', "")),
            youtube_base_url: env::var("YOUTUBE_BASE_URL")
                .unwrap_or_else(|_| "https://www.googleapis.com".to_string()),
            ads_base_url: env::var("GOOGLE_ADS_BASE_URL")
                .unwrap_or_else(|_| "https://googleads.googleapis.com/v17".to_string()),
        })
    }
}
