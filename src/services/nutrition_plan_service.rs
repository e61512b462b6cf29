use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    validate_nutrition_days, CreateNutritionPlanRequest, NutritionGoal, NutritionPlan,
    PlanAssignment, UpdateNutritionPlanRequest,
};

const PLAN_COLUMNS: &str = "id, name, description, goal, target_calories, protein_g, carbs_g, fat_g, days, is_active, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NutritionPlanService {
    db: PgPool,
}

impl NutritionPlanService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Active plans, optionally filtered on goal
    pub async fn list_plans(&self, goal: Option<NutritionGoal>) -> AppResult<Vec<NutritionPlan>> {
        let sql = format!(
            "SELECT {} FROM nutrition_plans
             WHERE is_active AND ($1::text IS NULL OR goal = $1)
             ORDER BY name",
            PLAN_COLUMNS
        );

        let plans = sqlx::query_as::<_, NutritionPlan>(&sql)
            .bind(goal.map(|g| g.as_str()))
            .fetch_all(&self.db)
            .await?;

        Ok(plans)
    }

    pub async fn get_plan(&self, plan_id: Uuid) -> AppResult<NutritionPlan> {
        let sql = format!("SELECT {} FROM nutrition_plans WHERE id = $1", PLAN_COLUMNS);

        sqlx::query_as::<_, NutritionPlan>(&sql)
            .bind(plan_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AppError::NotFound("Nutrition plan"))
    }

    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<NutritionPlan>> {
        let sql = format!("SELECT {} FROM nutrition_plans WHERE name = $1", PLAN_COLUMNS);

        let plan = sqlx::query_as::<_, NutritionPlan>(&sql)
            .bind(name)
            .fetch_optional(&self.db)
            .await?;

        Ok(plan)
    }

    pub async fn create_plan(&self, request: CreateNutritionPlanRequest) -> AppResult<NutritionPlan> {
        validate_nutrition_days(&request.days).map_err(AppError::Validation)?;

        let sql = format!(
            "INSERT INTO nutrition_plans
                (id, name, description, goal, target_calories, protein_g, carbs_g, fat_g, days)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {}",
            PLAN_COLUMNS
        );

        let plan = sqlx::query_as::<_, NutritionPlan>(&sql)
            .bind(Uuid::new_v4())
            .bind(request.name.trim())
            .bind(request.description)
            .bind(request.goal)
            .bind(request.target_calories)
            .bind(request.protein_g)
            .bind(request.carbs_g)
            .bind(request.fat_g)
            .bind(Json(request.days))
            .fetch_one(&self.db)
            .await
            .map_err(unique_name_conflict)?;

        tracing::info!(plan_id = %plan.id, "Created nutrition plan '{}'", plan.name);
        Ok(plan)
    }

    pub async fn update_plan(&self, plan_id: Uuid, request: UpdateNutritionPlanRequest) -> AppResult<NutritionPlan> {
        if let Some(days) = &request.days {
            validate_nutrition_days(days).map_err(AppError::Validation)?;
        }

        let sql = format!(
            "UPDATE nutrition_plans
             SET name = COALESCE($2, name),
                 description = COALESCE($3, description),
                 goal = COALESCE($4, goal),
                 target_calories = COALESCE($5, target_calories),
                 protein_g = COALESCE($6, protein_g),
                 carbs_g = COALESCE($7, carbs_g),
                 fat_g = COALESCE($8, fat_g),
                 days = COALESCE($9, days),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            PLAN_COLUMNS
        );

        sqlx::query_as::<_, NutritionPlan>(&sql)
            .bind(plan_id)
            .bind(request.name)
            .bind(request.description)
            .bind(request.goal)
            .bind(request.target_calories)
            .bind(request.protein_g)
            .bind(request.carbs_g)
            .bind(request.fat_g)
            .bind(request.days.map(Json))
            .fetch_optional(&self.db)
            .await
            .map_err(unique_name_conflict)?
            .ok_or(AppError::NotFound("Nutrition plan"))
    }

    /// Soft delete: the plan disappears from listings, assignments keep pointing at it
    pub async fn deactivate_plan(&self, plan_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE nutrition_plans SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(plan_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Nutrition plan"));
        }
        Ok(())
    }

    pub async fn assign_plan(&self, plan_id: Uuid, user_id: Uuid, assigned_by: Option<Uuid>) -> AppResult<PlanAssignment> {
        let plan = self.get_plan(plan_id).await?;
        if !plan.is_active {
            return Err(AppError::Validation("Cannot assign an inactive plan".to_string()));
        }

        let assignment = sqlx::query_as::<_, PlanAssignment>(
            "INSERT INTO nutrition_plan_assignments (id, plan_id, user_id, assigned_by)
             VALUES ($1, $2, $3, $4)
             RETURNING id, plan_id, user_id, assigned_by, assigned_at",
        )
        .bind(Uuid::new_v4())
        .bind(plan_id)
        .bind(user_id)
        .bind(assigned_by)
        .fetch_one(&self.db)
        .await?;

        Ok(assignment)
    }

    /// Most recently assigned plan of a member
    pub async fn current_plan_for_user(&self, user_id: Uuid) -> AppResult<Option<NutritionPlan>> {
        let sql = format!(
            "SELECT {} FROM nutrition_plans
             WHERE id = (
                SELECT plan_id FROM nutrition_plan_assignments
                WHERE user_id = $1 ORDER BY assigned_at DESC LIMIT 1
             )",
            PLAN_COLUMNS
        );

        let plan = sqlx::query_as::<_, NutritionPlan>(&sql)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(plan)
    }
}

pub(crate) fn unique_name_conflict(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AppError::Conflict("A record with this name already exists".to_string());
        }
    }
    AppError::Database(err)
}
