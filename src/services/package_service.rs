use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::validation::page_bounds;
use crate::models::{
    format_amount, CheckoutRequest, CheckoutResponse, PackageQuery, PackageSummary, PaymentStatus,
    PrelaunchPackage, StatusCount, TemplateName,
};
use crate::services::email_service::template_vars;
use crate::services::{Mailer, MollieClient, NewPayment};

const PACKAGE_COLUMNS: &str = "id, full_name, email, tier, amount_cents, currency, payment_id, payment_status, checkout_url, paid_at, created_at, updated_at";

/// Prelaunch package sales backed by Mollie payments
#[derive(Debug, Clone)]
pub struct PackageService {
    db: PgPool,
    mollie: MollieClient,
    mailer: Mailer,
    public_base_url: String,
}

impl PackageService {
    pub fn new(db: PgPool, mollie: MollieClient, mailer: Mailer, public_base_url: &str) -> Self {
        Self {
            db,
            mollie,
            mailer,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn checkout(&self, request: CheckoutRequest) -> AppResult<CheckoutResponse> {
        let package_id = Uuid::new_v4();
        let amount_cents = request.tier.price_cents();

        let payment = self
            .mollie
            .create_payment(&NewPayment {
                package_id,
                amount_cents,
                currency: "EUR".to_string(),
                description: format!("{} prelaunch package", request.tier.display_name()),
                redirect_url: format!("{}/prelaunch/thank-you?package={}", self.public_base_url, package_id),
                webhook_url: format!("{}/api/webhooks/mollie", self.public_base_url),
            })
            .await
            .map_err(AppError::upstream)?;

        let checkout_url = payment
            .checkout_url()
            .ok_or_else(|| AppError::Upstream(format!("Payment {} has no checkout link", payment.id)))?
            .to_string();

        sqlx::query(
            "INSERT INTO prelaunch_packages
                 (id, full_name, email, tier, amount_cents, currency, payment_id, payment_status, checkout_url)
             VALUES ($1, $2, $3, $4, $5, 'EUR', $6, $7, $8)",
        )
        .bind(package_id)
        .bind(request.full_name.trim())
        .bind(request.email.trim().to_lowercase())
        .bind(request.tier)
        .bind(amount_cents)
        .bind(&payment.id)
        .bind(payment.status)
        .bind(&checkout_url)
        .execute(&self.db)
        .await?;

        tracing::info!(
            %package_id,
            payment_id = %payment.id,
            "Checkout started for {:?} package (EUR {})",
            request.tier,
            format_amount(amount_cents)
        );

        Ok(CheckoutResponse {
            package_id,
            payment_id: payment.id,
            checkout_url,
        })
    }

    /// Sync one payment from Mollie. Unknown ids are acknowledged and yield `None`.
    pub async fn handle_webhook(&self, payment_id: &str) -> AppResult<Option<PrelaunchPackage>> {
        let Some(package) = self.find_by_payment_id(payment_id).await? else {
            tracing::info!("Webhook for unknown payment {}, ignoring", payment_id);
            return Ok(None);
        };

        let Some(payment) = self
            .mollie
            .get_payment(payment_id)
            .await
            .map_err(AppError::upstream)?
        else {
            tracing::warn!("Payment {} not found at Mollie, ignoring webhook", payment_id);
            return Ok(None);
        };

        let (previous, updated) = self
            .record_payment_status(package.id, payment.status, payment.paid_at)
            .await?;

        tracing::info!(
            package_id = %updated.id,
            "Payment {} moved from {} to {}",
            payment_id,
            previous.as_str(),
            updated.payment_status.as_str()
        );

        if previous != PaymentStatus::Paid && updated.payment_status == PaymentStatus::Paid {
            self.send_confirmation(&updated).await;
        }

        Ok(Some(updated))
    }

    /// Store a new payment status and return the status it replaced. The row is locked
    /// so concurrent webhooks for one payment see each other's transition.
    pub async fn record_payment_status(
        &self,
        package_id: Uuid,
        status: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> AppResult<(PaymentStatus, PrelaunchPackage)> {
        let mut tx = self.db.begin().await?;

        let previous: PaymentStatus =
            sqlx::query_scalar("SELECT payment_status FROM prelaunch_packages WHERE id = $1 FOR UPDATE")
                .bind(package_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AppError::NotFound("Package"))?;

        let sql = format!(
            "UPDATE prelaunch_packages
             SET payment_status = $2,
                 paid_at = COALESCE($3, paid_at),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            PACKAGE_COLUMNS
        );
        let updated = sqlx::query_as::<_, PrelaunchPackage>(&sql)
            .bind(package_id)
            .bind(status)
            .bind(paid_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((previous, updated))
    }

    async fn send_confirmation(&self, package: &PrelaunchPackage) {
        let vars = template_vars([
            ("name", package.full_name.clone()),
            ("package", package.tier.display_name().to_string()),
            ("amount", format!("€{}", format_amount(package.amount_cents))),
            ("payment_id", package.payment_id.clone().unwrap_or_default()),
        ]);

        if let Err(e) = self
            .mailer
            .send_template(TemplateName::PaymentConfirmation, &package.email, &vars)
            .await
        {
            tracing::error!("Failed to send payment confirmation for package {}: {}", package.id, e);
        }
    }

    pub async fn find_by_payment_id(&self, payment_id: &str) -> AppResult<Option<PrelaunchPackage>> {
        let sql = format!("SELECT {} FROM prelaunch_packages WHERE payment_id = $1", PACKAGE_COLUMNS);
        let package = sqlx::query_as::<_, PrelaunchPackage>(&sql)
            .bind(payment_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(package)
    }

    pub async fn list(&self, query: &PackageQuery) -> AppResult<Vec<PrelaunchPackage>> {
        let (limit, offset) = page_bounds(query.limit, query.offset);

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM prelaunch_packages WHERE TRUE", PACKAGE_COLUMNS));

        if let Some(status) = query.status {
            builder.push(" AND payment_status = ");
            builder.push_bind(status);
        }

        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let packages = builder.build_query_as::<PrelaunchPackage>().fetch_all(&self.db).await?;
        Ok(packages)
    }

    pub async fn summary(&self) -> AppResult<PackageSummary> {
        let by_status = sqlx::query_as::<_, StatusCount>(
            "SELECT payment_status AS status, COUNT(*) AS count
             FROM prelaunch_packages
             GROUP BY payment_status
             ORDER BY payment_status",
        )
        .fetch_all(&self.db)
        .await?;

        let paid_revenue_cents: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount_cents), 0)::BIGINT FROM prelaunch_packages WHERE payment_status = 'paid'",
        )
        .fetch_one(&self.db)
        .await?;

        Ok(PackageSummary {
            total: by_status.iter().map(|s| s.count).sum(),
            by_status,
            paid_revenue_cents,
        })
    }
}
