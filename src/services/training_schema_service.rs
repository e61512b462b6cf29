use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    validate_training_days, CreateTrainingSchemaRequest, SchemaAssignment, TrainingLevel,
    TrainingSchema, UpdateTrainingSchemaRequest,
};
use crate::services::nutrition_plan_service::unique_name_conflict;

const SCHEMA_COLUMNS: &str = "id, name, description, level, days_per_week, days, is_active, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct TrainingSchemaService {
    db: PgPool,
}

impl TrainingSchemaService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_schemas(&self, level: Option<TrainingLevel>) -> AppResult<Vec<TrainingSchema>> {
        let sql = format!(
            "SELECT {} FROM training_schemas
             WHERE is_active AND ($1::text IS NULL OR level = $1)
             ORDER BY days_per_week, name",
            SCHEMA_COLUMNS
        );

        let schemas = sqlx::query_as::<_, TrainingSchema>(&sql)
            .bind(level)
            .fetch_all(&self.db)
            .await?;

        Ok(schemas)
    }

    pub async fn get_schema(&self, schema_id: Uuid) -> AppResult<TrainingSchema> {
        let sql = format!("SELECT {} FROM training_schemas WHERE id = $1", SCHEMA_COLUMNS);

        sqlx::query_as::<_, TrainingSchema>(&sql)
            .bind(schema_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AppError::NotFound("Training schema"))
    }

    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<TrainingSchema>> {
        let sql = format!("SELECT {} FROM training_schemas WHERE name = $1", SCHEMA_COLUMNS);

        let schema = sqlx::query_as::<_, TrainingSchema>(&sql)
            .bind(name)
            .fetch_optional(&self.db)
            .await?;

        Ok(schema)
    }

    pub async fn create_schema(&self, request: CreateTrainingSchemaRequest) -> AppResult<TrainingSchema> {
        validate_training_days(&request.days).map_err(AppError::Validation)?;

        let sql = format!(
            "INSERT INTO training_schemas (id, name, description, level, days_per_week, days)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            SCHEMA_COLUMNS
        );

        let schema = sqlx::query_as::<_, TrainingSchema>(&sql)
            .bind(Uuid::new_v4())
            .bind(request.name.trim())
            .bind(request.description)
            .bind(request.level)
            .bind(request.days_per_week)
            .bind(Json(request.days))
            .fetch_one(&self.db)
            .await
            .map_err(unique_name_conflict)?;

        tracing::info!(schema_id = %schema.id, "Created training schema '{}'", schema.name);
        Ok(schema)
    }

    pub async fn update_schema(&self, schema_id: Uuid, request: UpdateTrainingSchemaRequest) -> AppResult<TrainingSchema> {
        if let Some(days) = &request.days {
            validate_training_days(days).map_err(AppError::Validation)?;
        }

        let sql = format!(
            "UPDATE training_schemas
             SET name = COALESCE($2, name),
                 description = COALESCE($3, description),
                 level = COALESCE($4, level),
                 days_per_week = COALESCE($5, days_per_week),
                 days = COALESCE($6, days),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            SCHEMA_COLUMNS
        );

        sqlx::query_as::<_, TrainingSchema>(&sql)
            .bind(schema_id)
            .bind(request.name)
            .bind(request.description)
            .bind(request.level)
            .bind(request.days_per_week)
            .bind(request.days.map(Json))
            .fetch_optional(&self.db)
            .await
            .map_err(unique_name_conflict)?
            .ok_or(AppError::NotFound("Training schema"))
    }

    pub async fn deactivate_schema(&self, schema_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE training_schemas SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(schema_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Training schema"));
        }
        Ok(())
    }

    /// Assigning the same schema twice refreshes the assignment date
    pub async fn assign_schema(&self, schema_id: Uuid, user_id: Uuid, assigned_by: Option<Uuid>) -> AppResult<SchemaAssignment> {
        let schema = self.get_schema(schema_id).await?;
        if !schema.is_active {
            return Err(AppError::Validation("Cannot assign an inactive schema".to_string()));
        }

        let assignment = sqlx::query_as::<_, SchemaAssignment>(
            "INSERT INTO training_schema_assignments (id, schema_id, user_id, assigned_by)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (schema_id, user_id)
             DO UPDATE SET assigned_by = EXCLUDED.assigned_by, assigned_at = NOW()
             RETURNING id, schema_id, user_id, assigned_by, assigned_at",
        )
        .bind(Uuid::new_v4())
        .bind(schema_id)
        .bind(user_id)
        .bind(assigned_by)
        .fetch_one(&self.db)
        .await?;

        Ok(assignment)
    }

    pub async fn schemas_for_user(&self, user_id: Uuid) -> AppResult<Vec<TrainingSchema>> {
        let sql = format!(
            "SELECT {} FROM training_schemas
             WHERE id IN (SELECT schema_id FROM training_schema_assignments WHERE user_id = $1)
             ORDER BY name",
            SCHEMA_COLUMNS
        );

        let schemas = sqlx::query_as::<_, TrainingSchema>(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;

        Ok(schemas)
    }
}
