use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Transactional mails the platform knows how to send
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TemplateName {
    Welcome,
    PaymentConfirmation,
    PasswordReset,
    WeeklyCheckinReminder,
    BrotherhoodEvent,
}

impl TemplateName {
    pub const ALL: [TemplateName; 5] = [
        TemplateName::Welcome,
        TemplateName::PaymentConfirmation,
        TemplateName::PasswordReset,
        TemplateName::WeeklyCheckinReminder,
        TemplateName::BrotherhoodEvent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateName::Welcome => "welcome",
            TemplateName::PaymentConfirmation => "payment_confirmation",
            TemplateName::PasswordReset => "password_reset",
            TemplateName::WeeklyCheckinReminder => "weekly_checkin_reminder",
            TemplateName::BrotherhoodEvent => "brotherhood_event",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            TemplateName::Welcome => "Sent after a member registers",
            TemplateName::PaymentConfirmation => "Sent when a prelaunch package payment is paid",
            TemplateName::PasswordReset => "Password reset link",
            TemplateName::WeeklyCheckinReminder => "Reminder to submit the weekly progress check-in",
            TemplateName::BrotherhoodEvent => "Announcement of a new brotherhood event",
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TemplateSettingRow {
    pub template_name: String,
    pub enabled: bool,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailTemplateStatus {
    pub name: TemplateName,
    pub description: &'static str,
    pub enabled: bool,
    pub updated_by: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct SetTemplateEnabledRequest {
    pub enabled: bool,
}

/// Merge stored flags over the known templates. Templates without a stored row are enabled.
pub fn merge_template_settings(rows: &[TemplateSettingRow]) -> Vec<EmailTemplateStatus> {
    TemplateName::ALL
        .iter()
        .map(|name| {
            let row = rows.iter().find(|r| r.template_name == name.as_str());
            EmailTemplateStatus {
                name: *name,
                description: name.description(),
                enabled: row.map(|r| r.enabled).unwrap_or(true),
                updated_by: row.and_then(|r| r.updated_by),
                updated_at: row.map(|r| r.updated_at),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip_names() {
        for name in TemplateName::ALL {
            assert_eq!(TemplateName::parse(name.as_str()), Some(name));
        }
        assert_eq!(TemplateName::parse("newsletter"), None);
    }

    #[test]
    fn test_merge_defaults_to_enabled() {
        let rows = vec![TemplateSettingRow {
            template_name: "welcome".to_string(),
            enabled: false,
            updated_by: None,
            updated_at: Utc::now(),
        }];

        let merged = merge_template_settings(&rows);
        assert_eq!(merged.len(), TemplateName::ALL.len());
        assert!(!merged.iter().find(|t| t.name == TemplateName::Welcome).unwrap().enabled);
        assert!(merged
            .iter()
            .filter(|t| t.name != TemplateName::Welcome)
            .all(|t| t.enabled && t.updated_at.is_none()));
    }
}
