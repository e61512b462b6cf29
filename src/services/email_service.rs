use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::config::SmtpConfig;
use crate::models::TemplateName;
use crate::services::EmailTemplateService;

#[derive(Debug, Clone)]
pub struct EmailTemplate {
    pub subject_template: &'static str,
    pub text_template: &'static str,
    pub html_template: &'static str,
}

/// What happened to a mail handed to [`Mailer::send_template`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// No SMTP host configured, the rendered mail was only logged
    Logged,
    /// Template switched off in the back office
    Skipped,
}

#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Renders the transactional templates and delivers them over SMTP
#[derive(Clone)]
pub struct Mailer {
    templates: HashMap<TemplateName, EmailTemplate>,
    smtp_config: SmtpConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    settings: EmailTemplateService,
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailer")
            .field("smtp_host", &self.smtp_config.host)
            .field("templates", &self.templates.len())
            .finish()
    }
}

impl Mailer {
    pub fn new(smtp_config: SmtpConfig, settings: EmailTemplateService) -> Result<Self, EmailError> {
        let transport = match &smtp_config.host {
            Some(host) => {
                let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                    .map_err(|e| EmailError::SmtpConnectionFailed(e.to_string()))?
                    .port(smtp_config.port);

                if !smtp_config.username.is_empty() {
                    builder = builder.credentials(Credentials::new(
                        smtp_config.username.clone(),
                        smtp_config.password.clone(),
                    ));
                }

                Some(builder.build())
            }
            None => {
                tracing::warn!("SMTP_HOST not set, outgoing mail will only be logged");
                None
            }
        };

        Ok(Self {
            templates: default_templates(),
            smtp_config,
            transport,
            settings,
        })
    }

    /// Render `template` with `vars` and send it to `to`, unless the template is disabled
    pub async fn send_template(
        &self,
        template: TemplateName,
        to: &str,
        vars: &HashMap<String, String>,
    ) -> Result<Delivery, EmailError> {
        let enabled = self
            .settings
            .is_enabled(template)
            .await
            .map_err(|e| EmailError::SettingsUnavailable(e.to_string()))?;

        if !enabled {
            tracing::info!("Email template '{}' is disabled, not sending to {}", template.as_str(), to);
            return Ok(Delivery::Skipped);
        }

        let rendered = self.render(template, vars)?;
        let delivery = self.send_email(to, &rendered).await?;

        tracing::info!("Sent '{}' email to {}", template.as_str(), to);
        Ok(delivery)
    }

    pub fn render(&self, template: TemplateName, vars: &HashMap<String, String>) -> Result<RenderedEmail, EmailError> {
        let template = self
            .templates
            .get(&template)
            .ok_or(EmailError::TemplateNotFound)?;

        Ok(RenderedEmail {
            subject: render_template(template.subject_template, vars),
            text_body: render_template(template.text_template, vars),
            html_body: render_html_template(template.html_template, vars),
        })
    }

    async fn send_email(&self, to_email: &str, email: &RenderedEmail) -> Result<Delivery, EmailError> {
        let Some(transport) = &self.transport else {
            tracing::info!(
                "Mail (not delivered) to: {}, subject: {}\n{}",
                to_email,
                email.subject,
                email.text_body
            );
            return Ok(Delivery::Logged);
        };

        let from: Mailbox = format!("{} <{}>", self.smtp_config.from_name, self.smtp_config.from_email)
            .parse()
            .map_err(|_| EmailError::InvalidEmailAddress(self.smtp_config.from_email.clone()))?;
        let to: Mailbox = to_email
            .parse()
            .map_err(|_| EmailError::InvalidEmailAddress(to_email.to_string()))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(email.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                email.text_body.clone(),
                email.html_body.clone(),
            ))
            .map_err(|e| EmailError::EmailSendingFailed(e.to_string()))?;

        transport
            .send(message)
            .await
            .map_err(|e| EmailError::EmailSendingFailed(e.to_string()))?;

        Ok(Delivery::Sent)
    }
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("placeholder regex is valid"))
}

/// Replace `{{var}}` placeholders. Unknown variables render as an empty string.
pub fn render_template(template: &str, vars: &HashMap<String, String>) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &regex::Captures| {
            vars.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

/// Like `render_template`, with every value HTML-escaped
pub fn render_html_template(template: &str, vars: &HashMap<String, String>) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &regex::Captures| {
            vars.get(&caps[1])
                .map(|value| html_escape::encode_quoted_attribute(value).into_owned())
                .unwrap_or_default()
        })
        .into_owned()
}

fn default_templates() -> HashMap<TemplateName, EmailTemplate> {
    let mut templates = HashMap::new();

    templates.insert(
        TemplateName::Welcome,
        EmailTemplate {
            subject_template: "Welcome to Top Tier Men, {{name}}",
            text_template: include_str!("../templates/email/welcome.txt"),
            html_template: include_str!("../templates/email/welcome.html"),
        },
    );

    templates.insert(
        TemplateName::PaymentConfirmation,
        EmailTemplate {
            subject_template: "Payment received: {{package}} package",
            text_template: include_str!("../templates/email/payment_confirmation.txt"),
            html_template: include_str!("../templates/email/payment_confirmation.html"),
        },
    );

    templates.insert(
        TemplateName::PasswordReset,
        EmailTemplate {
            subject_template: "Reset your Top Tier Men password",
            text_template: include_str!("../templates/email/password_reset.txt"),
            html_template: include_str!("../templates/email/password_reset.html"),
        },
    );

    templates.insert(
        TemplateName::WeeklyCheckinReminder,
        EmailTemplate {
            subject_template: "Time for your weekly check-in",
            text_template: include_str!("../templates/email/weekly_checkin_reminder.txt"),
            html_template: include_str!("../templates/email/weekly_checkin_reminder.html"),
        },
    );

    templates.insert(
        TemplateName::BrotherhoodEvent,
        EmailTemplate {
            subject_template: "New event in {{group}}: {{event_title}}",
            text_template: include_str!("../templates/email/brotherhood_event.txt"),
            html_template: include_str!("../templates/email/brotherhood_event.html"),
        },
    );

    templates
}

/// Build a variables map from `(key, value)` pairs
pub fn template_vars<I, K, V>(pairs: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Email template not found")]
    TemplateNotFound,
    #[error("Could not read template settings: {0}")]
    SettingsUnavailable(String),
    #[error("SMTP connection failed: {0}")]
    SmtpConnectionFailed(String),
    #[error("Email sending failed: {0}")]
    EmailSendingFailed(String),
    #[error("Invalid email address: {0}")]
    InvalidEmailAddress(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_known_and_blanks_unknown() {
        let vars = template_vars([("name", "Rick"), ("package", "Elite")]);
        let rendered = render_template("Hi {{name}}, {{ package }} is yours{{missing}}.", &vars);
        assert_eq!(rendered, "Hi Rick, Elite is yours.");
    }

    #[test]
    fn test_html_values_are_escaped() {
        let vars = template_vars([
            ("name", r#"<a href="https://evil.example">click</a>"#),
            ("dashboard_url", "https://toptiermen.test/dashboard?a=1&b=2"),
        ]);
        let template = &default_templates()[&TemplateName::Welcome];

        let html = render_html_template(template.html_template, &vars);
        assert!(!html.contains("<a href=\"https://evil.example\">"));
        assert!(html.contains("&lt;a href=&quot;https://evil.example&quot;&gt;click&lt;/a&gt;"));

        let text = render_template(template.text_template, &vars);
        assert!(text.contains(r#"<a href="https://evil.example">click</a>"#));
    }

    #[test]
    fn test_every_template_is_registered() {
        let templates = default_templates();
        for name in TemplateName::ALL {
            let template = templates.get(&name).unwrap();
            assert!(!template.text_template.is_empty());
            assert!(template.html_template.contains("<html>"));
        }
    }

    #[test]
    fn test_payment_confirmation_body() {
        let vars = template_vars([
            ("name", "Rick"),
            ("package", "Founder"),
            ("amount", "€497.00"),
            ("payment_id", "tr_WDqYK6vllg"),
        ]);
        let template = &default_templates()[&TemplateName::PaymentConfirmation];
        let body = render_template(template.text_template, &vars);
        assert!(body.contains("€497.00 for the Founder prelaunch package"));
        assert!(body.contains("tr_WDqYK6vllg"));
        assert!(!body.contains("{{"));
    }
}
