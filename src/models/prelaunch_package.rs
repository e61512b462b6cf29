use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PackageTier {
    Starter,
    Elite,
    Founder,
}

impl PackageTier {
    pub fn price_cents(&self) -> i64 {
        match self {
            PackageTier::Starter => 9_700,
            PackageTier::Elite => 19_700,
            PackageTier::Founder => 49_700,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PackageTier::Starter => "Top Tier Starter",
            PackageTier::Elite => "Top Tier Elite",
            PackageTier::Founder => "Top Tier Founder",
        }
    }
}

/// Payment states as reported by the payment provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Open,
    Pending,
    Authorized,
    Paid,
    Failed,
    Canceled,
    Expired,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Open => "open",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Authorized => "authorized",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PrelaunchPackage {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub tier: PackageTier,
    pub amount_cents: i64,
    pub currency: String,
    pub payment_id: Option<String>,
    pub payment_status: PaymentStatus,
    pub checkout_url: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 2, max = 120))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    pub tier: PackageTier,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub package_id: Uuid,
    pub payment_id: String,
    pub checkout_url: String,
}

/// Mollie posts `id=tr_xxx` as a form body
#[derive(Debug, Deserialize)]
pub struct PaymentWebhook {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct PackageQuery {
    pub status: Option<PaymentStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct StatusCount {
    pub status: PaymentStatus,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct PackageSummary {
    pub total: i64,
    pub by_status: Vec<StatusCount>,
    pub paid_revenue_cents: i64,
}

/// Format cents as the decimal string Mollie expects, e.g. 9700 -> "97.00"
pub fn format_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{}{}.{:02}", sign, cents / 100, cents % 100)
}

/// Parse a provider decimal amount back into cents
pub fn parse_amount(value: &str) -> Option<i64> {
    let (whole, fraction) = value.split_once('.').unwrap_or((value, "0"));
    if fraction.len() > 2 {
        return None;
    }
    let whole: i64 = whole.parse().ok()?;
    let fraction: i64 = format!("{:0<2}", fraction).parse().ok()?;
    Some(whole * 100 + if value.starts_with('-') { -fraction } else { fraction })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(9_700), "97.00");
        assert_eq!(format_amount(5), "0.05");
        assert_eq!(format_amount(19_750), "197.50");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("97.00"), Some(9_700));
        assert_eq!(parse_amount("197.5"), Some(19_750));
        assert_eq!(parse_amount("12"), Some(1_200));
        assert_eq!(parse_amount("1.234"), None);
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn test_tier_prices() {
        assert_eq!(format_amount(PackageTier::Starter.price_cents()), "97.00");
        assert_eq!(format_amount(PackageTier::Founder.price_cents()), "497.00");
    }
}