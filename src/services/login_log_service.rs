use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::validation::page_bounds;
use crate::models::{LoginLog, LoginLogQuery, LoginStats};

#[derive(Debug, Clone)]
pub struct LoginLogService {
    db: PgPool,
}

impl LoginLogService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn record(
        &self,
        user_id: Option<Uuid>,
        email: &str,
        success: bool,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO login_logs (id, user_id, email, success, ip_address, user_agent)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(email.trim().to_lowercase())
        .bind(success)
        .bind(ip_address)
        .bind(user_agent)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    pub async fn list(&self, query: &LoginLogQuery) -> AppResult<Vec<LoginLog>> {
        let (limit, offset) = page_bounds(query.limit, query.offset);

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, user_id, email, success, ip_address, user_agent, created_at
             FROM login_logs WHERE TRUE",
        );

        if let Some(email) = query.email.as_deref().filter(|e| !e.trim().is_empty()) {
            builder.push(" AND email ILIKE ");
            builder.push_bind(format!("%{}%", escape_like(email.trim())));
            builder.push(" ESCAPE '\\'");
        }

        if let Some(success) = query.success {
            builder.push(" AND success = ");
            builder.push_bind(success);
        }

        if let Some(since) = query.since {
            builder.push(" AND created_at >= ");
            builder.push_bind(since);
        }

        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let logs = builder.build_query_as::<LoginLog>().fetch_all(&self.db).await?;
        Ok(logs)
    }

    pub async fn stats(&self) -> AppResult<LoginStats> {
        let stats = sqlx::query_as::<_, LoginStats>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE NOT success AND created_at >= NOW() - INTERVAL '24 hours') AS failed_last_24h,
                   COUNT(DISTINCT user_id) FILTER (WHERE success AND created_at >= NOW() - INTERVAL '24 hours') AS unique_users_last_24h
            FROM login_logs
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        Ok(stats)
    }

    pub async fn recent(&self, count: i64) -> AppResult<Vec<LoginLog>> {
        self.list(&LoginLogQuery {
            limit: Some(count),
            ..Default::default()
        })
        .await
    }
}

/// Escape `%`, `_` and the escape character itself for a LIKE pattern
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("jan@example.com"), "jan@example.com");
        assert_eq!(escape_like("100%_off"), "100\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }
}
