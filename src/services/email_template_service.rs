use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{merge_template_settings, EmailTemplateStatus, TemplateName, TemplateSettingRow};

/// On/off switches for transactional mails, editable from the back office
#[derive(Debug, Clone)]
pub struct EmailTemplateService {
    db: PgPool,
}

impl EmailTemplateService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> AppResult<Vec<EmailTemplateStatus>> {
        let rows = sqlx::query_as::<_, TemplateSettingRow>(
            "SELECT template_name, enabled, updated_by, updated_at FROM email_template_settings",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(merge_template_settings(&rows))
    }

    pub async fn set_enabled(&self, name: &str, enabled: bool, admin_id: Option<Uuid>) -> AppResult<EmailTemplateStatus> {
        let template = TemplateName::parse(name)
            .ok_or_else(|| AppError::Validation(format!("Unknown email template '{}'", name)))?;

        let row = sqlx::query_as::<_, TemplateSettingRow>(
            r#"
            INSERT INTO email_template_settings (template_name, enabled, updated_by, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (template_name)
            DO UPDATE SET enabled = EXCLUDED.enabled, updated_by = EXCLUDED.updated_by, updated_at = NOW()
            RETURNING template_name, enabled, updated_by, updated_at
            "#,
        )
        .bind(template.as_str())
        .bind(enabled)
        .bind(admin_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!("Email template '{}' {}", template.as_str(), if enabled { "enabled" } else { "disabled" });

        Ok(EmailTemplateStatus {
            name: template,
            description: template.description(),
            enabled: row.enabled,
            updated_by: row.updated_by,
            updated_at: Some(row.updated_at),
        })
    }

    pub async fn is_enabled(&self, template: TemplateName) -> AppResult<bool> {
        let enabled: Option<bool> =
            sqlx::query_scalar("SELECT enabled FROM email_template_settings WHERE template_name = $1")
                .bind(template.as_str())
                .fetch_optional(&self.db)
                .await?;

        Ok(enabled.unwrap_or(true))
    }
}
