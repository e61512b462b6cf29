use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;
use validator::Validate;

pub const MAX_PHOTOS_PER_CHECKIN: usize = 3;
pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProgressCheckin {
    pub id: Uuid,
    pub user_id: Uuid,
    pub week_start: NaiveDate,
    pub weight_kg: f64,
    pub body_fat_pct: Option<f64>,
    pub waist_cm: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PhotoPosition {
    Front,
    Side,
    Back,
}

impl PhotoPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoPosition::Front => "front",
            PhotoPosition::Side => "side",
            PhotoPosition::Back => "back",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "front" => Some(PhotoPosition::Front),
            "side" => Some(PhotoPosition::Side),
            "back" => Some(PhotoPosition::Back),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProgressPhoto {
    pub id: Uuid,
    pub checkin_id: Uuid,
    pub position: PhotoPosition,
    pub storage_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertCheckinRequest {
    /// Any date in the week; stored as that week's Monday
    pub week_of: Option<NaiveDate>,
    #[validate(range(min = 30.0, max = 350.0))]
    pub weight_kg: f64,
    #[validate(range(min = 2.0, max = 70.0))]
    pub body_fat_pct: Option<f64>,
    #[validate(range(min = 40.0, max = 250.0))]
    pub waist_cm: Option<f64>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// One photo received from the upload form
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub position: PhotoPosition,
    pub content_type: String,
    pub data: bytes::Bytes,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum UploadStepStatus {
    Ok,
    Failed,
    Skipped,
}

/// Line in the upload log shown next to the upload form
#[derive(Debug, Clone, Serialize)]
pub struct UploadLogEntry {
    pub position: Option<PhotoPosition>,
    pub status: UploadStepStatus,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl UploadLogEntry {
    pub fn new(position: Option<PhotoPosition>, status: UploadStepStatus, message: impl Into<String>) -> Self {
        Self {
            position,
            status,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PhotoUploadResponse {
    pub checkin_id: Uuid,
    pub week_start: NaiveDate,
    pub uploaded: usize,
    pub failed: usize,
    pub log: Vec<UploadLogEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignedPhoto {
    pub position: PhotoPosition,
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CheckinHistoryEntry {
    #[serde(flatten)]
    pub checkin: ProgressCheckin,
    /// Weight change versus the previous stored check-in
    pub weight_delta_kg: Option<f64>,
    pub photos: Vec<SignedPhoto>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

/// Monday of the ISO week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// File extension for an accepted image content type
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Weight deltas for check-ins sorted newest first. A check-in only gets a delta
/// when the one before it is from the week directly preceding it.
pub fn weight_deltas(checkins: &[ProgressCheckin]) -> Vec<Option<f64>> {
    checkins
        .iter()
        .enumerate()
        .map(|(i, checkin)| {
            checkins
                .get(i + 1)
                .filter(|previous| checkin.week_start - previous.week_start == Duration::days(7))
                .map(|previous| ((checkin.weight_kg - previous.weight_kg) * 10.0).round() / 10.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkin(week: NaiveDate, weight: f64) -> ProgressCheckin {
        ProgressCheckin {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            week_start: week,
            weight_kg: weight,
            body_fat_pct: None,
            waist_cm: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_week_start_is_monday() {
        let wednesday = NaiveDate::from_ymd_opt(2024, 3, 13).unwrap();
        let monday = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2024, 3, 17).unwrap();

        assert_eq!(week_start(wednesday), monday);
        assert_eq!(week_start(monday), monday);
        assert_eq!(week_start(sunday), monday);
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("image/jpeg"), Some("jpg"));
        assert_eq!(image_extension("image/webp"), Some("webp"));
        assert_eq!(image_extension("application/pdf"), None);
    }

    #[test]
    fn test_weight_deltas_newest_first() {
        let week = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
        let history = vec![
            checkin(week, 88.4),
            checkin(week - Duration::days(7), 89.0),
            checkin(week - Duration::days(14), 90.2),
        ];

        assert_eq!(weight_deltas(&history), vec![Some(-0.6), Some(-1.2), None]);
    }

    #[test]
    fn test_weight_delta_skips_missed_weeks() {
        let week = NaiveDate::from_ymd_opt(2024, 3, 25).unwrap();
        let history = vec![
            checkin(week, 87.0),
            checkin(week - Duration::days(21), 89.0),
            checkin(week - Duration::days(28), 89.5),
        ];

        assert_eq!(weight_deltas(&history), vec![None, Some(-0.5), None]);
    }

    #[test]
    fn test_photo_position_parse() {
        assert_eq!(PhotoPosition::parse("Front"), Some(PhotoPosition::Front));
        assert_eq!(PhotoPosition::parse("top"), None);
    }
}
