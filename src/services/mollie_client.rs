use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::error;
use uuid::Uuid;

use crate::config::MollieConfig;
use crate::models::{format_amount, PaymentStatus};

/// Mollie Payments API v2 client
///
/// API Documentation: https://docs.mollie.com/reference/v2/payments-api
#[derive(Debug, Clone)]
pub struct MollieClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl MollieClient {
    pub fn new(config: &MollieConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .context("MOLLIE_API_KEY is not configured")
    }

    pub async fn create_payment(&self, request: &NewPayment) -> Result<MolliePayment> {
        let body = CreatePaymentBody {
            amount: MollieAmount {
                currency: request.currency.clone(),
                value: format_amount(request.amount_cents),
            },
            description: request.description.clone(),
            redirect_url: request.redirect_url.clone(),
            webhook_url: request.webhook_url.clone(),
            metadata: PaymentMetadata {
                package_id: request.package_id,
            },
        };

        let response = self
            .client
            .post(format!("{}/v2/payments", self.base_url))
            .bearer_auth(self.api_key()?)
            .json(&body)
            .send()
            .await
            .context("Failed to send create payment request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Mollie create payment failed: {} - {}", status, error_text);
            anyhow::bail!("Failed to create payment: {}", status);
        }

        response
            .json::<MolliePayment>()
            .await
            .context("Failed to parse create payment response")
    }

    pub async fn get_payment(&self, payment_id: &str) -> Result<Option<MolliePayment>> {
        let response = self
            .client
            .get(format!(
                "{}/v2/payments/{}",
                self.base_url,
                urlencoding::encode(payment_id)
            ))
            .bearer_auth(self.api_key()?)
            .send()
            .await
            .context("Failed to fetch payment")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Mollie get payment failed: {} - {}", status, error_text);
            anyhow::bail!("Failed to fetch payment {}: {}", payment_id, status);
        }

        let payment = response
            .json::<MolliePayment>()
            .await
            .context("Failed to parse payment")?;

        Ok(Some(payment))
    }
}

/// What the checkout flow asks Mollie for
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub package_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub description: String,
    pub redirect_url: String,
    pub webhook_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentBody {
    amount: MollieAmount,
    description: String,
    redirect_url: String,
    webhook_url: String,
    metadata: PaymentMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MollieAmount {
    pub currency: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentMetadata {
    pub package_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MolliePayment {
    pub id: String,
    pub status: PaymentStatus,
    pub amount: MollieAmount,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(rename = "_links", default)]
    pub links: PaymentLinks,
}

impl MolliePayment {
    pub fn checkout_url(&self) -> Option<&str> {
        self.links.checkout.as_ref().map(|link| link.href.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentLinks {
    #[serde(default)]
    pub checkout: Option<Link>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_deserialization() {
        let json = r#"{
            "resource": "payment",
            "id": "tr_WDqYK6vllg",
            "status": "open",
            "amount": {"currency": "EUR", "value": "197.00"},
            "metadata": {"package_id": "6f1c2b3a-0d4e-4f5a-9b6c-7d8e9f0a1b2c"},
            "_links": {"checkout": {"href": "https://www.mollie.com/checkout/select-method/WDqYK6vllg", "type": "text/html"}}
        }"#;

        let payment: MolliePayment = serde_json::from_str(json).unwrap();
        assert_eq!(payment.status, PaymentStatus::Open);
        assert_eq!(payment.amount.value, "197.00");
        assert!(payment.paid_at.is_none());
        assert_eq!(
            payment.checkout_url(),
            Some("https://www.mollie.com/checkout/select-method/WDqYK6vllg")
        );
    }

    #[test]
    fn test_paid_payment_without_checkout_link() {
        let json = r#"{
            "id": "tr_paid",
            "status": "paid",
            "amount": {"currency": "EUR", "value": "97.00"},
            "paidAt": "2024-03-01T10:15:00+00:00",
            "_links": {}
        }"#;

        let payment: MolliePayment = serde_json::from_str(json).unwrap();
        assert_eq!(payment.status, PaymentStatus::Paid);
        assert!(payment.paid_at.is_some());
        assert!(payment.checkout_url().is_none());
    }

    #[test]
    fn test_create_body_shape() {
        let body = CreatePaymentBody {
            amount: MollieAmount {
                currency: "EUR".to_string(),
                value: format_amount(9_700),
            },
            description: "Top Tier Starter".to_string(),
            redirect_url: "https://toptiermen.eu/bedankt".to_string(),
            webhook_url: "https://toptiermen.eu/api/webhooks/mollie".to_string(),
            metadata: PaymentMetadata { package_id: Uuid::nil() },
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["amount"]["value"], "97.00");
        assert_eq!(value["redirectUrl"], "https://toptiermen.eu/bedankt");
        assert!(value["webhookUrl"].as_str().unwrap().ends_with("/api/webhooks/mollie"));
    }
}
