use anyhow::{Context, Result};
use std::env;

const DEV_JWT_SECRET: &str = "toptier-dev-secret-change-me";
const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// HTTP server and token settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub log_level: String,
    pub jwt_secret: String,
    /// Externally reachable base URL, used for payment redirect and webhook URLs
    pub public_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let port = match env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got '{}'", raw))?,
            Err(_) => 3000,
        };

        let config = AppConfig {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| DEV_JWT_SECRET.to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
        };

        config.check_secret()?;
        Ok(config)
    }

    fn check_secret(&self) -> Result<()> {
        if self.is_production()
            && (self.jwt_secret == DEV_JWT_SECRET || self.jwt_secret.len() < MIN_PRODUCTION_SECRET_LEN)
        {
            anyhow::bail!(
                "JWT_SECRET must be set to at least {} characters in production",
                MIN_PRODUCTION_SECRET_LEN
            );
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
