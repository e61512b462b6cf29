use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TrainingLevel {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub name: String,
    pub sets: i32,
    /// Free-form rep scheme, e.g. "8-12" or "AMRAP"
    pub reps: String,
    #[serde(default)]
    pub rest_seconds: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingDay {
    pub day_number: i32,
    pub name: String,
    #[serde(default)]
    pub focus: Option<String>,
    pub exercises: Vec<Exercise>,
}

impl TrainingDay {
    pub fn total_sets(&self) -> i32 {
        self.exercises.iter().map(|e| e.sets).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrainingSchema {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub level: TrainingLevel,
    pub days_per_week: i32,
    pub days: Json<Vec<TrainingDay>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTrainingSchemaRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub description: Option<String>,
    pub level: TrainingLevel,
    #[validate(range(min = 1, max = 7))]
    pub days_per_week: i32,
    pub days: Vec<TrainingDay>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTrainingSchemaRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub level: Option<TrainingLevel>,
    #[validate(range(min = 1, max = 7))]
    pub days_per_week: Option<i32>,
    pub days: Option<Vec<TrainingDay>>,
}

#[derive(Debug, Deserialize)]
pub struct TrainingSchemaQuery {
    pub level: Option<TrainingLevel>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SchemaAssignment {
    pub id: Uuid,
    pub schema_id: Uuid,
    pub user_id: Uuid,
    pub assigned_by: Option<Uuid>,
    pub assigned_at: DateTime<Utc>,
}

/// Day numbers run 1..=n without gaps or duplicates and every exercise has sets
pub fn validate_training_days(days: &[TrainingDay]) -> Result<(), String> {
    if days.is_empty() {
        return Err("A training schema needs at least one day".to_string());
    }

    let mut seen = HashSet::new();
    for day in days {
        if day.day_number < 1 {
            return Err(format!("Day number {} must be at least 1", day.day_number));
        }
        if !seen.insert(day.day_number) {
            return Err(format!("Day number {} appears more than once", day.day_number));
        }
        if day.exercises.is_empty() {
            return Err(format!("Day {} has no exercises", day.day_number));
        }
        if let Some(exercise) = day.exercises.iter().find(|e| e.sets < 1) {
            return Err(format!(
                "Exercise '{}' on day {} needs at least one set",
                exercise.name, day.day_number
            ));
        }
    }

    let expected: HashSet<i32> = (1..=days.len() as i32).collect();
    if seen != expected {
        return Err("Day numbers must run consecutively from 1".to_string());
    }

    Ok(())
}
