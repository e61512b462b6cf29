use chrono::Utc;
use sqlx::{FromRow, PgPool};

use crate::error::AppResult;
use crate::models::LiveSnapshot;
use crate::services::LoginLogService;

const RECENT_LOGINS: i64 = 10;

#[derive(Debug, FromRow)]
struct SnapshotCounters {
    active_members: i64,
    logins_last_hour: i64,
    failed_logins_last_hour: i64,
    open_bugs: i64,
    unread_bug_notifications: i64,
    packages_paid_today: i64,
    revenue_today_cents: i64,
}

/// Numbers behind the admin live dashboard, polled every few seconds
#[derive(Debug, Clone)]
pub struct LiveTrackingService {
    db: PgPool,
    login_logs: LoginLogService,
}

impl LiveTrackingService {
    pub fn new(db: PgPool) -> Self {
        Self {
            login_logs: LoginLogService::new(db.clone()),
            db,
        }
    }

    pub async fn snapshot(&self) -> AppResult<LiveSnapshot> {
        let counters = sqlx::query_as::<_, SnapshotCounters>(
            r#"
            SELECT
                (SELECT COUNT(DISTINCT user_id) FROM login_logs
                 WHERE success AND created_at >= NOW() - INTERVAL '15 minutes') AS active_members,
                (SELECT COUNT(*) FROM login_logs
                 WHERE created_at >= NOW() - INTERVAL '1 hour') AS logins_last_hour,
                (SELECT COUNT(*) FROM login_logs
                 WHERE NOT success AND created_at >= NOW() - INTERVAL '1 hour') AS failed_logins_last_hour,
                (SELECT COUNT(*) FROM bug_notifications
                 WHERE status IN ('open', 'in_progress')) AS open_bugs,
                (SELECT COUNT(*) FROM bug_notifications WHERE NOT is_read) AS unread_bug_notifications,
                (SELECT COUNT(*) FROM prelaunch_packages
                 WHERE payment_status = 'paid' AND paid_at >= date_trunc('day', NOW())) AS packages_paid_today,
                (SELECT COALESCE(SUM(amount_cents), 0)::BIGINT FROM prelaunch_packages
                 WHERE payment_status = 'paid' AND paid_at >= date_trunc('day', NOW())) AS revenue_today_cents
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        let recent_logins = self.login_logs.recent(RECENT_LOGINS).await?;

        Ok(LiveSnapshot {
            generated_at: Utc::now(),
            active_members: counters.active_members,
            logins_last_hour: counters.logins_last_hour,
            failed_logins_last_hour: counters.failed_logins_last_hour,
            open_bugs: counters.open_bugs,
            unread_bug_notifications: counters.unread_bug_notifications,
            packages_paid_today: counters.packages_paid_today,
            revenue_today_cents: counters.revenue_today_cents,
            recent_logins,
        })
    }
}
