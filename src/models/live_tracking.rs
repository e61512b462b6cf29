use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::LoginLog;

/// Point-in-time numbers for the admin live dashboard
#[derive(Debug, Serialize)]
pub struct LiveSnapshot {
    pub generated_at: DateTime<Utc>,
    pub active_members: i64,
    pub logins_last_hour: i64,
    pub failed_logins_last_hour: i64,
    pub open_bugs: i64,
    pub unread_bug_notifications: i64,
    pub packages_paid_today: i64,
    pub revenue_today_cents: i64,
    pub recent_logins: Vec<LoginLog>,
}
