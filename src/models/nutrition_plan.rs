use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NutritionGoal {
    Cut,
    Maintain,
    Bulk,
}

impl NutritionGoal {
    pub fn as_str(&self) -> &'static str {
        match self {
            NutritionGoal::Cut => "cut",
            NutritionGoal::Maintain => "maintain",
            NutritionGoal::Bulk => "bulk",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Macros {
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

impl Macros {
    /// Atwater factors: 4 kcal/g protein and carbohydrate, 9 kcal/g fat
    pub fn calories(&self) -> f64 {
        self.protein_g * 4.0 + self.carbs_g * 4.0 + self.fat_g * 9.0
    }

    fn is_valid(&self) -> bool {
        [self.protein_g, self.carbs_g, self.fat_g]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

impl std::ops::Add for Macros {
    type Output = Macros;

    fn add(self, other: Macros) -> Macros {
        Macros {
            protein_g: self.protein_g + other.protein_g,
            carbs_g: self.carbs_g + other.carbs_g,
            fat_g: self.fat_g + other.fat_g,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodItem {
    pub name: String,
    pub amount: String,
    #[serde(flatten)]
    pub macros: Macros,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Meal {
    pub name: String,
    #[serde(default)]
    pub time: Option<String>,
    pub foods: Vec<FoodItem>,
}

impl Meal {
    pub fn totals(&self) -> Macros {
        self.foods
            .iter()
            .fold(Macros::default(), |acc, food| acc + food.macros)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NutritionDay {
    pub day_number: i32,
    pub label: String,
    pub meals: Vec<Meal>,
}

impl NutritionDay {
    pub fn totals(&self) -> Macros {
        self.meals
            .iter()
            .fold(Macros::default(), |acc, meal| acc + meal.totals())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NutritionPlan {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub goal: NutritionGoal,
    pub target_calories: i32,
    pub protein_g: i32,
    pub carbs_g: i32,
    pub fat_g: i32,
    pub days: Json<Vec<NutritionDay>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayTotals {
    pub day_number: i32,
    pub label: String,
    #[serde(flatten)]
    pub macros: Macros,
    pub calories: f64,
}

/// Plan as shown on the member dashboard: the stored plan plus per-day totals
#[derive(Debug, Serialize)]
pub struct NutritionPlanResponse {
    #[serde(flatten)]
    pub plan: NutritionPlan,
    pub day_totals: Vec<DayTotals>,
}

impl From<NutritionPlan> for NutritionPlanResponse {
    fn from(plan: NutritionPlan) -> Self {
        let day_totals = plan
            .days
            .iter()
            .map(|day| {
                let macros = day.totals();
                DayTotals {
                    day_number: day.day_number,
                    label: day.label.clone(),
                    macros,
                    calories: macros.calories(),
                }
            })
            .collect();

        Self { plan, day_totals }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateNutritionPlanRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub description: Option<String>,
    pub goal: NutritionGoal,
    #[validate(range(min = 800, max = 8000))]
    pub target_calories: i32,
    #[validate(range(min = 0))]
    pub protein_g: i32,
    #[validate(range(min = 0))]
    pub carbs_g: i32,
    #[validate(range(min = 0))]
    pub fat_g: i32,
    pub days: Vec<NutritionDay>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateNutritionPlanRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub goal: Option<NutritionGoal>,
    #[validate(range(min = 800, max = 8000))]
    pub target_calories: Option<i32>,
    #[validate(range(min = 0))]
    pub protein_g: Option<i32>,
    #[validate(range(min = 0))]
    pub carbs_g: Option<i32>,
    #[validate(range(min = 0))]
    pub fat_g: Option<i32>,
    pub days: Option<Vec<NutritionDay>>,
}

#[derive(Debug, Deserialize)]
pub struct NutritionPlanQuery {
    pub goal: Option<NutritionGoal>,
}

#[derive(Debug, Deserialize)]
pub struct AssignPlanRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PlanAssignment {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub user_id: Uuid,
    pub assigned_by: Option<Uuid>,
    pub assigned_at: DateTime<Utc>,
}

/// Structural checks the database can't express on the JSON column
pub fn validate_nutrition_days(days: &[NutritionDay]) -> Result<(), String> {
    if days.is_empty() {
        return Err("A nutrition plan needs at least one day".to_string());
    }

    for day in days {
        if day.meals.is_empty() {
            return Err(format!("Day {} has no meals", day.day_number));
        }
        for meal in &day.meals {
            if let Some(food) = meal.foods.iter().find(|f| !f.macros.is_valid()) {
                return Err(format!(
                    "Food '{}' in meal '{}' has negative or invalid macros",
                    food.name, meal.name
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn food(name: &str, p: f64, c: f64, f: f64) -> FoodItem {
        FoodItem {
            name: name.to_string(),
            amount: "100g".to_string(),
            macros: Macros { protein_g: p, carbs_g: c, fat_g: f },
        }
    }

    fn sample_day() -> NutritionDay {
        NutritionDay {
            day_number: 1,
            label: "Training day".to_string(),
            meals: vec![
                Meal {
                    name: "Breakfast".to_string(),
                    time: Some("07:30".to_string()),
                    foods: vec![food("Oats", 13.0, 60.0, 7.0), food("Whey", 24.0, 3.0, 1.5)],
                },
                Meal {
                    name: "Dinner".to_string(),
                    time: None,
                    foods: vec![food("Chicken breast", 31.0, 0.0, 3.6)],
                },
            ],
        }
    }

    #[test]
    fn test_day_totals_and_calories() {
        let totals = sample_day().totals();

        assert_eq!(totals.protein_g, 68.0);
        assert_eq!(totals.carbs_g, 63.0);
        assert!((totals.fat_g - 12.1).abs() < 1e-9);
        assert!((totals.calories() - (68.0 * 4.0 + 63.0 * 4.0 + 12.1 * 9.0)).abs() < 1e-9);
    }

    #[test]
    fn test_validate_days() {
        assert!(validate_nutrition_days(&[]).is_err());
        assert!(validate_nutrition_days(&[sample_day()]).is_ok());

        let mut bad = sample_day();
        bad.meals[0].foods[0].macros.fat_g = -1.0;
        let err = validate_nutrition_days(&[bad]).unwrap_err();
        assert!(err.contains("Oats"));
    }

    #[test]
    fn test_food_item_macros_are_flattened() {
        let json = serde_json::json!({
            "name": "Rice", "amount": "150g", "protein_g": 4.0, "carbs_g": 42.0, "fat_g": 0.4
        });
        let item: FoodItem = serde_json::from_value(json).unwrap();
        assert_eq!(item.macros.carbs_g, 42.0);
    }
}
