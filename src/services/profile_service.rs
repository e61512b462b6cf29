use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::validation::page_bounds;
use crate::models::{Profile, ProfileQuery, UpdateProfileRequest};

const PROFILE_SELECT: &str = r#"
    SELECT p.user_id, u.email, COALESCE(r.role, 'member') AS role,
           p.display_name, p.phone, p.date_of_birth, p.fitness_goal, p.height_cm,
           p.created_at, p.updated_at
    FROM profiles p
    JOIN users u ON u.id = p.user_id
    LEFT JOIN user_roles r ON r.user_id = p.user_id
"#;

#[derive(Debug, Clone)]
pub struct ProfileService {
    db: PgPool,
}

impl ProfileService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get_profile(&self, user_id: Uuid) -> AppResult<Profile> {
        let sql = format!("{} WHERE p.user_id = $1", PROFILE_SELECT);
        sqlx::query_as::<_, Profile>(&sql)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AppError::NotFound("Profile"))
    }

    pub async fn update_profile(&self, user_id: Uuid, request: UpdateProfileRequest) -> AppResult<Profile> {
        let updated = sqlx::query(
            r#"
            UPDATE profiles
            SET display_name = COALESCE($2, display_name),
                phone = COALESCE($3, phone),
                date_of_birth = COALESCE($4, date_of_birth),
                fitness_goal = COALESCE($5, fitness_goal),
                height_cm = COALESCE($6, height_cm),
                updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(request.display_name)
        .bind(request.phone)
        .bind(request.date_of_birth)
        .bind(request.fitness_goal)
        .bind(request.height_cm)
        .execute(&self.db)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Profile"));
        }

        self.get_profile(user_id).await
    }

    /// Admin member listing with optional search on email / display name
    pub async fn list_profiles(&self, query: &ProfileQuery) -> AppResult<Vec<Profile>> {
        let (limit, offset) = page_bounds(query.limit, query.offset);

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(PROFILE_SELECT);
        builder.push(" WHERE TRUE");

        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            builder.push(" AND (u.email ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR p.display_name ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }

        if let Some(role) = &query.role {
            builder.push(" AND COALESCE(r.role, 'member') = ");
            builder.push_bind(role.to_lowercase());
        }

        builder.push(" ORDER BY p.created_at DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let profiles = builder.build_query_as::<Profile>().fetch_all(&self.db).await?;
        Ok(profiles)
    }
}
