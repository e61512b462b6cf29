use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    image_extension, week_start, weight_deltas, CheckinHistoryEntry, PhotoPosition, PhotoUpload,
    PhotoUploadResponse, ProgressCheckin, ProgressPhoto, SignedPhoto, UploadLogEntry,
    UploadStepStatus, UpsertCheckinRequest, MAX_PHOTOS_PER_CHECKIN, MAX_PHOTO_BYTES,
};
use crate::services::StorageService;

const CHECKIN_COLUMNS: &str =
    "id, user_id, week_start, weight_kg, body_fat_pct, waist_cm, notes, created_at, updated_at";

/// Weekly one-to-one check-ins and their progress photos
#[derive(Debug, Clone)]
pub struct ProgressService {
    db: PgPool,
    storage: StorageService,
}

impl ProgressService {
    pub fn new(db: PgPool, storage: StorageService) -> Self {
        Self { db, storage }
    }

    pub async fn upsert_checkin(&self, user_id: Uuid, request: UpsertCheckinRequest) -> AppResult<ProgressCheckin> {
        let week = week_start(request.week_of.unwrap_or_else(|| Utc::now().date_naive()));

        let sql = format!(
            r#"
            INSERT INTO progress_checkins (id, user_id, week_start, weight_kg, body_fat_pct, waist_cm, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, week_start)
            DO UPDATE SET weight_kg = EXCLUDED.weight_kg,
                          body_fat_pct = EXCLUDED.body_fat_pct,
                          waist_cm = EXCLUDED.waist_cm,
                          notes = EXCLUDED.notes,
                          updated_at = NOW()
            RETURNING {}
            "#,
            CHECKIN_COLUMNS
        );

        let checkin = sqlx::query_as::<_, ProgressCheckin>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(week)
            .bind(request.weight_kg)
            .bind(request.body_fat_pct)
            .bind(request.waist_cm)
            .bind(request.notes)
            .fetch_one(&self.db)
            .await?;

        tracing::info!(%user_id, week_start = %week, "Stored weekly check-in");
        Ok(checkin)
    }

    pub async fn find_checkin(&self, user_id: Uuid, week: NaiveDate) -> AppResult<Option<ProgressCheckin>> {
        let sql = format!(
            "SELECT {} FROM progress_checkins WHERE user_id = $1 AND week_start = $2",
            CHECKIN_COLUMNS
        );
        let checkin = sqlx::query_as::<_, ProgressCheckin>(&sql)
            .bind(user_id)
            .bind(week_start(week))
            .fetch_optional(&self.db)
            .await?;
        Ok(checkin)
    }

    /// Upload photos one after another. A failed photo is recorded in the log and the
    /// rest still go through; earlier uploads are kept.
    pub async fn upload_photos(
        &self,
        user_id: Uuid,
        week_of: Option<NaiveDate>,
        photos: Vec<PhotoUpload>,
    ) -> AppResult<PhotoUploadResponse> {
        check_photo_batch(&photos)?;

        let week = week_start(week_of.unwrap_or_else(|| Utc::now().date_naive()));
        let checkin = self
            .find_checkin(user_id, week)
            .await?
            .ok_or(AppError::NotFound("Check-in for this week"))?;

        let mut log = vec![UploadLogEntry::new(
            None,
            UploadStepStatus::Ok,
            format!("Starting upload of {} photo(s) for week of {}", photos.len(), week),
        )];
        let mut uploaded = 0;
        let mut failed = 0;

        for photo in photos {
            let position = photo.position;

            if let Some(reason) = reject_reason(&photo) {
                tracing::warn!(%user_id, "Skipping {} photo: {}", position.as_str(), reason);
                log.push(UploadLogEntry::new(Some(position), UploadStepStatus::Skipped, reason));
                failed += 1;
                continue;
            }

            log.push(UploadLogEntry::new(
                Some(position),
                UploadStepStatus::Ok,
                format!("Uploading {} photo ({} KB)", position.as_str(), photo.data.len() / 1024),
            ));

            let size_bytes = photo.data.len() as i64;
            let stored = match self
                .storage
                .upload_photo(user_id, week, position, &photo.content_type, photo.data)
                .await
            {
                Ok(storage_key) => self
                    .save_photo(checkin.id, position, &storage_key, &photo.content_type, size_bytes)
                    .await
                    .map_err(|e| anyhow::anyhow!(e)),
                Err(e) => Err(e),
            };

            match stored {
                Ok(_) => {
                    uploaded += 1;
                    log.push(UploadLogEntry::new(
                        Some(position),
                        UploadStepStatus::Ok,
                        format!("{} photo stored", position.as_str()),
                    ));
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!(%user_id, "Upload of {} photo failed: {:#}", position.as_str(), e);
                    log.push(UploadLogEntry::new(
                        Some(position),
                        UploadStepStatus::Failed,
                        format!("{} photo failed: {}", position.as_str(), e),
                    ));
                }
            }
        }

        log.push(UploadLogEntry::new(
            None,
            if failed == 0 { UploadStepStatus::Ok } else { UploadStepStatus::Failed },
            format!("Finished: {} uploaded, {} failed", uploaded, failed),
        ));

        Ok(PhotoUploadResponse {
            checkin_id: checkin.id,
            week_start: week,
            uploaded,
            failed,
            log,
        })
    }

    async fn save_photo(
        &self,
        checkin_id: Uuid,
        position: PhotoPosition,
        storage_key: &str,
        content_type: &str,
        size_bytes: i64,
    ) -> AppResult<ProgressPhoto> {
        let photo = sqlx::query_as::<_, ProgressPhoto>(
            r#"
            INSERT INTO progress_photos (id, checkin_id, position, storage_key, content_type, size_bytes)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (checkin_id, position)
            DO UPDATE SET storage_key = EXCLUDED.storage_key,
                          content_type = EXCLUDED.content_type,
                          size_bytes = EXCLUDED.size_bytes,
                          uploaded_at = NOW()
            RETURNING id, checkin_id, position, storage_key, content_type, size_bytes, uploaded_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(checkin_id)
        .bind(position)
        .bind(storage_key)
        .bind(content_type)
        .bind(size_bytes)
        .fetch_one(&self.db)
        .await?;

        Ok(photo)
    }

    /// Newest check-ins first, with presigned photo URLs and the weight change per week
    pub async fn history(&self, user_id: Uuid, limit: Option<i64>) -> AppResult<Vec<CheckinHistoryEntry>> {
        let limit = limit.unwrap_or(12).clamp(1, 52);

        // One extra row so the oldest returned check-in still gets a delta
        let sql = format!(
            "SELECT {} FROM progress_checkins WHERE user_id = $1 ORDER BY week_start DESC LIMIT $2",
            CHECKIN_COLUMNS
        );
        let mut checkins = sqlx::query_as::<_, ProgressCheckin>(&sql)
            .bind(user_id)
            .bind(limit + 1)
            .fetch_all(&self.db)
            .await?;

        let deltas = weight_deltas(&checkins);
        checkins.truncate(limit as usize);

        let ids: Vec<Uuid> = checkins.iter().map(|c| c.id).collect();
        let photos = sqlx::query_as::<_, ProgressPhoto>(
            "SELECT id, checkin_id, position, storage_key, content_type, size_bytes, uploaded_at
             FROM progress_photos WHERE checkin_id = ANY($1)
             ORDER BY position",
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        let mut history = Vec::with_capacity(checkins.len());
        for (checkin, weight_delta_kg) in checkins.into_iter().zip(deltas) {
            let mut signed = Vec::new();
            for photo in photos.iter().filter(|p| p.checkin_id == checkin.id) {
                match self.storage.generate_presigned_url(&photo.storage_key).await {
                    Ok(url) => signed.push(SignedPhoto {
                        position: photo.position,
                        url,
                        uploaded_at: photo.uploaded_at,
                    }),
                    Err(e) => tracing::warn!("Could not sign {}: {:#}", photo.storage_key, e),
                }
            }

            history.push(CheckinHistoryEntry {
                checkin,
                weight_delta_kg,
                photos: signed,
            });
        }

        Ok(history)
    }
}

/// Batch-level rules: at most three photos and one per position
pub fn check_photo_batch(photos: &[PhotoUpload]) -> AppResult<()> {
    if photos.is_empty() {
        return Err(AppError::Validation("No photos in upload".to_string()));
    }

    if photos.len() > MAX_PHOTOS_PER_CHECKIN {
        return Err(AppError::Validation(format!(
            "At most {} photos per check-in",
            MAX_PHOTOS_PER_CHECKIN
        )));
    }

    let mut seen = HashSet::new();
    for photo in photos {
        if !seen.insert(photo.position) {
            return Err(AppError::Validation(format!(
                "Duplicate {} photo",
                photo.position.as_str()
            )));
        }
    }

    Ok(())
}

/// Why a single photo cannot be uploaded, if anything
pub fn reject_reason(photo: &PhotoUpload) -> Option<String> {
    if image_extension(&photo.content_type).is_none() {
        return Some(format!(
            "{} is not supported, use JPEG, PNG or WebP",
            photo.content_type
        ));
    }
    if photo.data.is_empty() {
        return Some("file is empty".to_string());
    }
    if photo.data.len() > MAX_PHOTO_BYTES {
        return Some(format!(
            "file is {} MB, the limit is {} MB",
            photo.data.len() / (1024 * 1024),
            MAX_PHOTO_BYTES / (1024 * 1024)
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn photo(position: PhotoPosition, content_type: &str, size: usize) -> PhotoUpload {
        PhotoUpload {
            position,
            content_type: content_type.to_string(),
            data: bytes::Bytes::from(vec![0u8; size]),
        }
    }

    #[test]
    fn test_batch_limits() {
        let ok = vec![
            photo(PhotoPosition::Front, "image/jpeg", 10),
            photo(PhotoPosition::Side, "image/png", 10),
            photo(PhotoPosition::Back, "image/webp", 10),
        ];
        assert!(check_photo_batch(&ok).is_ok());

        let duplicate = vec![
            photo(PhotoPosition::Front, "image/jpeg", 10),
            photo(PhotoPosition::Front, "image/jpeg", 10),
        ];
        assert_matches!(check_photo_batch(&duplicate), Err(AppError::Validation(_)));
        assert_matches!(check_photo_batch(&[]), Err(AppError::Validation(_)));
    }

    #[test]
    fn test_reject_reason() {
        assert!(reject_reason(&photo(PhotoPosition::Front, "image/jpeg", 1024)).is_none());
        assert!(reject_reason(&photo(PhotoPosition::Front, "image/gif", 1024)).is_some());
        assert!(reject_reason(&photo(PhotoPosition::Front, "image/png", 0)).is_some());
        assert!(reject_reason(&photo(PhotoPosition::Side, "image/png", MAX_PHOTO_BYTES + 1)).is_some());
        assert!(reject_reason(&photo(PhotoPosition::Side, "image/png", MAX_PHOTO_BYTES)).is_none());
    }
}
