use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::validation::page_bounds;
use crate::models::{BugNotification, BugQuery, BugSeverity, BugStatus, ReportBugRequest};

const BUG_COLUMNS: &str =
    "id, reporter_id, title, description, page_url, severity, status, is_read, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct BugNotificationService {
    db: PgPool,
}

impl BugNotificationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn report(&self, reporter_id: Option<Uuid>, request: ReportBugRequest) -> AppResult<BugNotification> {
        let sql = format!(
            "INSERT INTO bug_notifications (id, reporter_id, title, description, page_url, severity)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            BUG_COLUMNS
        );

        let bug = sqlx::query_as::<_, BugNotification>(&sql)
            .bind(Uuid::new_v4())
            .bind(reporter_id)
            .bind(request.title.trim())
            .bind(request.description)
            .bind(request.page_url)
            .bind(request.severity.unwrap_or(BugSeverity::Medium))
            .fetch_one(&self.db)
            .await?;

        tracing::info!(bug_id = %bug.id, severity = ?bug.severity, "Bug reported: {}", bug.title);
        Ok(bug)
    }

    pub async fn list(&self, query: &BugQuery) -> AppResult<Vec<BugNotification>> {
        let (limit, offset) = page_bounds(query.limit, query.offset);

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM bug_notifications WHERE TRUE", BUG_COLUMNS));

        if let Some(status) = query.status {
            builder.push(" AND status = ");
            builder.push_bind(status);
        }

        if query.unread_only {
            builder.push(" AND NOT is_read");
        }

        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let bugs = builder.build_query_as::<BugNotification>().fetch_all(&self.db).await?;
        Ok(bugs)
    }

    pub async fn update_status(&self, bug_id: Uuid, status: BugStatus) -> AppResult<BugNotification> {
        let sql = format!(
            "UPDATE bug_notifications SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            BUG_COLUMNS
        );

        sqlx::query_as::<_, BugNotification>(&sql)
            .bind(bug_id)
            .bind(status)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AppError::NotFound("Bug notification"))
    }

    pub async fn mark_read(&self, bug_id: Uuid) -> AppResult<BugNotification> {
        let sql = format!(
            "UPDATE bug_notifications SET is_read = TRUE, updated_at = NOW() WHERE id = $1 RETURNING {}",
            BUG_COLUMNS
        );

        sqlx::query_as::<_, BugNotification>(&sql)
            .bind(bug_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AppError::NotFound("Bug notification"))
    }

    pub async fn unread_count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bug_notifications WHERE NOT is_read")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}
