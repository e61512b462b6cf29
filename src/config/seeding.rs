use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{AuthService, RegisterRequest, UserRole};
use crate::models::*;
use crate::services::*;

/// Demo content for local development and staging. Every step skips rows that already exist.
pub struct DatabaseSeeder {
    pool: PgPool,
    auth: AuthService,
}

impl DatabaseSeeder {
    pub fn new(pool: PgPool, jwt_secret: &str) -> Self {
        Self {
            auth: AuthService::new(pool.clone(), jwt_secret),
            pool,
        }
    }

    pub async fn seed_all(&self, admin_email: &str, admin_password: &str) -> Result<()> {
        tracing::info!("Starting database seeding...");

        let admin_id = self.seed_admin(admin_email, admin_password).await?;
        self.seed_nutrition_plans().await?;
        self.seed_training_schemas().await?;
        self.seed_brotherhood_groups(admin_id).await?;
        self.seed_email_templates().await?;

        tracing::info!("Database seeding completed!");
        Ok(())
    }

    async fn seed_admin(&self, email: &str, password: &str) -> Result<Uuid> {
        let user_id = match self.auth.get_user_by_email(email).await? {
            Some(user) => user.id,
            None => {
                let response = self
                    .auth
                    .register(RegisterRequest {
                        email: email.to_string(),
                        password: password.to_string(),
                        full_name: Some("Top Tier Admin".to_string()),
                    })
                    .await
                    .context("Failed to create admin account")?;
                tracing::info!("Created admin account {}", email);
                response.user.id
            }
        };

        self.auth.set_user_role(user_id, &UserRole::Admin).await?;
        Ok(user_id)
    }

    async fn seed_nutrition_plans(&self) -> Result<()> {
        let service = NutritionPlanService::new(self.pool.clone());

        for plan in demo_nutrition_plans() {
            if service.find_by_name(&plan.name).await?.is_none() {
                let name = plan.name.clone();
                service.create_plan(plan).await?;
                tracing::info!("Created nutrition plan '{}'", name);
            }
        }

        Ok(())
    }

    async fn seed_training_schemas(&self) -> Result<()> {
        let service = TrainingSchemaService::new(self.pool.clone());

        for schema in demo_training_schemas() {
            if service.find_by_name(&schema.name).await?.is_none() {
                let name = schema.name.clone();
                service.create_schema(schema).await?;
                tracing::info!("Created training schema '{}'", name);
            }
        }

        Ok(())
    }

    async fn seed_brotherhood_groups(&self, owner_id: Uuid) -> Result<()> {
        let service = BrotherhoodService::new(self.pool.clone());

        let groups = [
            ("Early Risers", "5 AM club: check in before sunrise, every day.", Some(50)),
            ("Strength Squad", "Compound lifts, PRs and form checks.", None),
            ("Founders Circle", "Private group for prelaunch founders.", Some(100)),
        ];

        for (name, description, max_members) in groups {
            if service.find_group_by_name(name).await?.is_none() {
                service
                    .create_group(
                        owner_id,
                        CreateGroupRequest {
                            name: name.to_string(),
                            description: Some(description.to_string()),
                            is_private: name == "Founders Circle",
                            max_members,
                        },
                    )
                    .await?;
                tracing::info!("Created brotherhood group '{}'", name);
            }
        }

        Ok(())
    }

    /// Store an explicit row per template so the back office shows who changed what later
    async fn seed_email_templates(&self) -> Result<()> {
        for template in TemplateName::ALL {
            sqlx::query(
                "INSERT INTO email_template_settings (template_name, enabled)
                 VALUES ($1, TRUE)
                 ON CONFLICT (template_name) DO NOTHING",
            )
            .bind(template.as_str())
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }
}

fn food(name: &str, amount: &str, protein_g: f64, carbs_g: f64, fat_g: f64) -> FoodItem {
    FoodItem {
        name: name.to_string(),
        amount: amount.to_string(),
        macros: Macros {
            protein_g,
            carbs_g,
            fat_g,
        },
    }
}

fn meal(name: &str, time: &str, foods: Vec<FoodItem>) -> Meal {
    Meal {
        name: name.to_string(),
        time: Some(time.to_string()),
        foods,
    }
}

fn demo_nutrition_plans() -> Vec<CreateNutritionPlanRequest> {
    let cut_day = NutritionDay {
        day_number: 1,
        label: "Training day".to_string(),
        meals: vec![
            meal(
                "Breakfast",
                "07:30",
                vec![
                    food("Oats", "60 g", 8.0, 36.0, 4.0),
                    food("Skyr", "250 g", 27.5, 10.0, 0.5),
                ],
            ),
            meal(
                "Lunch",
                "12:30",
                vec![
                    food("Chicken breast", "200 g", 46.0, 0.0, 3.0),
                    food("Rice", "75 g dry", 5.5, 58.0, 0.5),
                    food("Broccoli", "150 g", 4.0, 6.0, 0.5),
                ],
            ),
            meal(
                "Dinner",
                "18:30",
                vec![
                    food("Salmon", "150 g", 30.0, 0.0, 19.5),
                    food("Potatoes", "300 g", 6.0, 51.0, 0.3),
                ],
            ),
        ],
    };

    let bulk_day = NutritionDay {
        day_number: 1,
        label: "Training day".to_string(),
        meals: vec![
            meal(
                "Breakfast",
                "07:30",
                vec![
                    food("Eggs", "4 whole", 25.0, 1.5, 20.0),
                    food("Whole grain bread", "4 slices", 14.0, 64.0, 4.0),
                ],
            ),
            meal(
                "Lunch",
                "12:30",
                vec![
                    food("Lean beef mince", "200 g", 42.0, 0.0, 10.0),
                    food("Pasta", "125 g dry", 15.0, 88.0, 2.0),
                ],
            ),
            meal(
                "Dinner",
                "18:30",
                vec![
                    food("Chicken thighs", "250 g", 47.5, 0.0, 20.0),
                    food("Rice", "125 g dry", 9.0, 97.0, 1.0),
                    food("Olive oil", "15 ml", 0.0, 0.0, 14.0),
                ],
            ),
        ],
    };

    vec![
        CreateNutritionPlanRequest {
            name: "Lean Cut 2200".to_string(),
            description: Some("High protein deficit plan for steady fat loss".to_string()),
            goal: NutritionGoal::Cut,
            target_calories: 2_200,
            protein_g: 200,
            carbs_g: 200,
            fat_g: 65,
            days: vec![cut_day],
        },
        CreateNutritionPlanRequest {
            name: "Mass Builder 3200".to_string(),
            description: Some("Surplus plan for lean muscle gain".to_string()),
            goal: NutritionGoal::Bulk,
            target_calories: 3_200,
            protein_g: 190,
            carbs_g: 400,
            fat_g: 90,
            days: vec![bulk_day],
        },
    ]
}

fn exercise(name: &str, sets: i32, reps: &str, rest_seconds: i32) -> Exercise {
    Exercise {
        name: name.to_string(),
        sets,
        reps: reps.to_string(),
        rest_seconds: Some(rest_seconds),
        notes: None,
        video_url: None,
    }
}

fn demo_training_schemas() -> Vec<CreateTrainingSchemaRequest> {
    vec![
        CreateTrainingSchemaRequest {
            name: "Foundation Full Body".to_string(),
            description: Some("Three full body sessions a week for beginners".to_string()),
            level: TrainingLevel::Beginner,
            days_per_week: 3,
            days: vec![
                TrainingDay {
                    day_number: 1,
                    name: "Full Body A".to_string(),
                    focus: Some("Squat pattern".to_string()),
                    exercises: vec![
                        exercise("Goblet squat", 3, "8-12", 90),
                        exercise("Push-up", 3, "AMRAP", 60),
                        exercise("Dumbbell row", 3, "10-12", 60),
                    ],
                },
                TrainingDay {
                    day_number: 2,
                    name: "Full Body B".to_string(),
                    focus: Some("Hinge pattern".to_string()),
                    exercises: vec![
                        exercise("Romanian deadlift", 3, "8-10", 90),
                        exercise("Dumbbell bench press", 3, "8-12", 90),
                        exercise("Lat pulldown", 3, "10-12", 60),
                    ],
                },
                TrainingDay {
                    day_number: 3,
                    name: "Full Body C".to_string(),
                    focus: None,
                    exercises: vec![
                        exercise("Leg press", 3, "10-15", 90),
                        exercise("Overhead press", 3, "8-10", 90),
                        exercise("Plank", 3, "45s", 45),
                    ],
                },
            ],
        },
        CreateTrainingSchemaRequest {
            name: "Upper Lower Strength".to_string(),
            description: Some("Four day upper/lower split focused on the big lifts".to_string()),
            level: TrainingLevel::Intermediate,
            days_per_week: 4,
            days: vec![
                TrainingDay {
                    day_number: 1,
                    name: "Upper Heavy".to_string(),
                    focus: Some("Bench press".to_string()),
                    exercises: vec![
                        exercise("Bench press", 5, "5", 180),
                        exercise("Barbell row", 4, "6-8", 120),
                        exercise("Weighted pull-up", 3, "6-8", 120),
                    ],
                },
                TrainingDay {
                    day_number: 2,
                    name: "Lower Heavy".to_string(),
                    focus: Some("Back squat".to_string()),
                    exercises: vec![
                        exercise("Back squat", 5, "5", 180),
                        exercise("Romanian deadlift", 3, "8", 120),
                        exercise("Walking lunge", 3, "12", 90),
                    ],
                },
                TrainingDay {
                    day_number: 3,
                    name: "Upper Volume".to_string(),
                    focus: None,
                    exercises: vec![
                        exercise("Incline dumbbell press", 4, "8-12", 90),
                        exercise("Cable row", 4, "10-12", 90),
                        exercise("Lateral raise", 3, "12-15", 60),
                    ],
                },
                TrainingDay {
                    day_number: 4,
                    name: "Lower Volume".to_string(),
                    focus: Some("Deadlift".to_string()),
                    exercises: vec![
                        exercise("Deadlift", 3, "5", 180),
                        exercise("Leg press", 3, "10-12", 120),
                        exercise("Hanging leg raise", 3, "10-15", 60),
                    ],
                },
            ],
        },
    ]
}
