// Service tests against a real Postgres. Skipped unless TEST_DATABASE_URL is set;
// every test works on freshly generated emails and names so runs can share a database.

use assert_matches::assert_matches;
use chrono::{Duration, NaiveDate, Utc};
use serde_json::json;
use serial_test::serial;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use toptier::auth::{
    AuthError, AuthService, LoginContext, LoginRequest, RefreshTokenRequest, RegisterRequest,
};
use toptier::config::{run_migrations, MollieConfig, SmtpConfig, StorageConfig};
use toptier::error::AppError;
use toptier::models::{
    BugQuery, BugStatus, CheckoutRequest, CreateEventRequest, CreateGroupRequest,
    CreateNutritionPlanRequest, CreateTrainingSchemaRequest, LoginLogQuery, NutritionGoal,
    PackageTier, PaymentStatus, ReportBugRequest, RsvpStatus, TemplateName, TrainingLevel,
    UpdateTrainingSchemaRequest, UpsertCheckinRequest,
};
use toptier::services::{
    BrotherhoodService, BugNotificationService, EbookService, EmailTemplateService,
    LiveTrackingService, LoginLogService, Mailer, MollieClient, NutritionPlanService,
    PackageService, ProgressService, StorageService, TrainingSchemaService,
};

const PASSWORD: &str = "Str0ng!Passw0rd";

async fn test_pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect to TEST_DATABASE_URL");
    run_migrations(&pool).await.expect("run migrations");
    Some(pool)
}

fn unique_email(prefix: &str) -> String {
    format!("{}-{}@toptiermen.test", prefix, Uuid::new_v4().simple())
}

fn unique_name(prefix: &str) -> String {
    format!("{} {}", prefix, &Uuid::new_v4().simple().to_string()[..8])
}

async fn register(auth: &AuthService, email: &str) -> Uuid {
    let response = auth
        .register(RegisterRequest {
            email: email.to_string(),
            password: PASSWORD.to_string(),
            full_name: Some("Test Member".to_string()),
        })
        .await
        .unwrap();
    response.user.id
}

#[tokio::test]
async fn test_register_login_and_login_log() {
    let Some(pool) = test_pool().await else { return };
    let auth = AuthService::new(pool.clone(), "database_test_secret");
    let logs = LoginLogService::new(pool.clone());

    let email = unique_email("login");
    let user_id = register(&auth, &email).await;

    // Email is matched case-insensitively
    let duplicate = auth
        .register(RegisterRequest {
            email: email.to_uppercase(),
            password: PASSWORD.to_string(),
            full_name: None,
        })
        .await;
    assert_matches!(duplicate, Err(AuthError::EmailAlreadyExists));

    let failed = auth
        .login(
            LoginRequest {
                email: email.clone(),
                password: "Wr0ng!Password".to_string(),
            },
            LoginContext {
                ip_address: Some("203.0.113.7".to_string()),
                user_agent: Some("integration-test".to_string()),
            },
        )
        .await;
    assert_matches!(failed, Err(AuthError::InvalidCredentials));

    let session = auth
        .login(
            LoginRequest {
                email: email.clone(),
                password: PASSWORD.to_string(),
            },
            LoginContext::default(),
        )
        .await
        .unwrap();

    let validated = auth.validate_session(&session.access_token).await.unwrap();
    assert_eq!(validated.user_id, user_id);

    let entries = logs
        .list(&LoginLogQuery {
            email: Some(email.clone()),
            success: None,
            since: None,
            limit: Some(10),
            offset: None,
        })
        .await
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert!(entries.iter().any(|e| e.success && e.user_id == Some(user_id)));
    assert!(entries
        .iter()
        .any(|e| !e.success && e.ip_address.as_deref() == Some("203.0.113.7")));

    // Wildcards in the filter are matched literally
    let wildcard = logs
        .list(&LoginLogQuery {
            email: Some("%".to_string()),
            success: None,
            since: None,
            limit: Some(10),
            offset: None,
        })
        .await
        .unwrap();
    assert!(wildcard.is_empty());

    let stats = logs.stats().await.unwrap();
    assert!(stats.total >= 2);
    assert!(stats.failed_last_24h >= 1);

    // Logged out tokens stop working
    auth.logout(&session.access_token).await.unwrap();
    assert_matches!(
        auth.validate_session(&session.access_token).await,
        Err(AuthError::InvalidToken)
    );
}

#[tokio::test]
async fn test_refresh_token_cannot_act_as_session() {
    let Some(pool) = test_pool().await else { return };
    let auth = AuthService::new(pool.clone(), "database_test_secret");

    let email = unique_email("refresh");
    register(&auth, &email).await;
    let session = auth
        .login(
            LoginRequest {
                email,
                password: PASSWORD.to_string(),
            },
            LoginContext::default(),
        )
        .await
        .unwrap();

    assert_matches!(
        auth.validate_session(&session.refresh_token).await,
        Err(AuthError::InvalidToken)
    );

    // An access token is no refresh token either
    let swapped = auth
        .refresh_token(RefreshTokenRequest {
            refresh_token: session.access_token.clone(),
        })
        .await;
    assert_matches!(swapped, Err(AuthError::InvalidToken));

    let refreshed = auth
        .refresh_token(RefreshTokenRequest {
            refresh_token: session.refresh_token.clone(),
        })
        .await
        .unwrap();
    assert!(auth.validate_session(&refreshed.access_token).await.is_ok());

    auth.logout(&session.access_token).await.unwrap();
    assert_matches!(
        auth.refresh_token(RefreshTokenRequest {
            refresh_token: session.refresh_token.clone(),
        })
        .await,
        Err(AuthError::InvalidToken)
    );
    assert_matches!(
        auth.validate_session(&session.refresh_token).await,
        Err(AuthError::InvalidToken)
    );
}

#[tokio::test]
async fn test_nutrition_plan_assignment() {
    let Some(pool) = test_pool().await else { return };
    let auth = AuthService::new(pool.clone(), "database_test_secret");
    let plans = NutritionPlanService::new(pool.clone());

    let member = register(&auth, &unique_email("nutrition")).await;
    let days = serde_json::from_value(json!([
        {
            "day_number": 1,
            "label": "Training day",
            "meals": [
                {
                    "name": "Breakfast",
                    "time": "07:30",
                    "foods": [
                        { "name": "Oats", "amount": "80 g", "protein_g": 10.0, "carbs_g": 54.0, "fat_g": 6.0 },
                        { "name": "Whey", "amount": "30 g", "protein_g": 24.0, "carbs_g": 2.0, "fat_g": 1.5 }
                    ]
                }
            ]
        }
    ]))
    .unwrap();

    let plan = plans
        .create_plan(CreateNutritionPlanRequest {
            name: unique_name("Lean Cut"),
            description: Some("Moderate deficit".to_string()),
            goal: NutritionGoal::Cut,
            target_calories: 2200,
            protein_g: 180,
            carbs_g: 200,
            fat_g: 70,
            days,
        })
        .await
        .unwrap();
    assert!(plan.is_active);

    assert!(plans.current_plan_for_user(member).await.unwrap().is_none());

    let assignment = plans.assign_plan(plan.id, member, None).await.unwrap();
    assert_eq!(assignment.plan_id, plan.id);

    let current = plans.current_plan_for_user(member).await.unwrap().unwrap();
    assert_eq!(current.id, plan.id);
    assert_eq!(current.days.0.len(), 1);

    plans.deactivate_plan(plan.id).await.unwrap();
    assert_matches!(
        plans.assign_plan(plan.id, member, None).await,
        Err(AppError::Validation(_))
    );
    assert_matches!(
        plans.deactivate_plan(Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    );
}

#[tokio::test]
async fn test_brotherhood_capacity_and_owner_rules() {
    let Some(pool) = test_pool().await else { return };
    let auth = AuthService::new(pool.clone(), "database_test_secret");
    let brotherhood = BrotherhoodService::new(pool.clone());

    let owner = register(&auth, &unique_email("owner")).await;
    let first = register(&auth, &unique_email("first")).await;
    let second = register(&auth, &unique_email("second")).await;

    let group = brotherhood
        .create_group(
            owner,
            CreateGroupRequest {
                name: unique_name("Iron Circle"),
                description: None,
                is_private: false,
                max_members: Some(2),
            },
        )
        .await
        .unwrap();
    assert_eq!(group.member_count, 1);

    brotherhood.join(group.id, first).await.unwrap();
    assert_matches!(
        brotherhood.join(group.id, first).await,
        Err(AppError::Conflict(_))
    );
    assert_matches!(
        brotherhood.join(group.id, second).await,
        Err(AppError::Conflict(_))
    );

    assert_matches!(
        brotherhood.leave(group.id, owner).await,
        Err(AppError::Validation(_))
    );

    brotherhood.leave(group.id, first).await.unwrap();
    brotherhood.join(group.id, second).await.unwrap();

    let members = brotherhood.members(group.id).await.unwrap();
    assert_eq!(members.len(), 2);

    let contacts = brotherhood.member_contacts(group.id, owner).await.unwrap();
    assert_eq!(contacts.len(), 1);

    assert_matches!(
        brotherhood.delete_group(group.id, second, false).await,
        Err(AppError::Forbidden)
    );
    brotherhood.delete_group(group.id, owner, false).await.unwrap();
    assert_matches!(
        brotherhood.get_group(group.id).await,
        Err(AppError::NotFound(_))
    );
}

#[tokio::test]
async fn test_brotherhood_event_rsvp_cap() {
    let Some(pool) = test_pool().await else { return };
    let auth = AuthService::new(pool.clone(), "database_test_secret");
    let brotherhood = BrotherhoodService::new(pool.clone());

    let owner = register(&auth, &unique_email("host")).await;
    let guest = register(&auth, &unique_email("guest")).await;
    let outsider = register(&auth, &unique_email("outsider")).await;

    let group = brotherhood
        .create_group(
            owner,
            CreateGroupRequest {
                name: unique_name("Sunday Lifts"),
                description: None,
                is_private: false,
                max_members: None,
            },
        )
        .await
        .unwrap();
    brotherhood.join(group.id, guest).await.unwrap();

    let starts_at = Utc::now() + Duration::days(7);
    let event_request = |ends_at| CreateEventRequest {
        title: "Deadlift session".to_string(),
        description: None,
        location: Some("Amsterdam".to_string()),
        starts_at,
        ends_at,
        max_attendees: Some(1),
    };

    assert_matches!(
        brotherhood
            .create_event(group.id, owner, event_request(starts_at))
            .await,
        Err(AppError::Validation(_))
    );
    assert_matches!(
        brotherhood
            .create_event(group.id, outsider, event_request(starts_at + Duration::hours(2)))
            .await,
        Err(AppError::Forbidden)
    );

    let event = brotherhood
        .create_event(group.id, owner, event_request(starts_at + Duration::hours(2)))
        .await
        .unwrap();

    brotherhood.rsvp(event.id, owner, RsvpStatus::Going).await.unwrap();
    // Confirming again does not count against the cap
    brotherhood.rsvp(event.id, owner, RsvpStatus::Going).await.unwrap();
    assert_matches!(
        brotherhood.rsvp(event.id, guest, RsvpStatus::Going).await,
        Err(AppError::Conflict(_))
    );
    brotherhood.rsvp(event.id, guest, RsvpStatus::Maybe).await.unwrap();

    brotherhood.rsvp(event.id, owner, RsvpStatus::Declined).await.unwrap();
    brotherhood.rsvp(event.id, guest, RsvpStatus::Going).await.unwrap();
    assert_eq!(brotherhood.get_event(event.id).await.unwrap().going_count, 1);

    // Events disappear with their group
    brotherhood.delete_group(group.id, owner, false).await.unwrap();
    assert_matches!(
        brotherhood.get_event(event.id).await,
        Err(AppError::NotFound(_))
    );
    assert_matches!(
        brotherhood.rsvp(event.id, owner, RsvpStatus::Going).await,
        Err(AppError::NotFound(_))
    );
    assert_matches!(
        brotherhood.join(group.id, outsider).await,
        Err(AppError::NotFound(_))
    );
}

#[tokio::test]
async fn test_concurrent_joins_respect_capacity() {
    let Some(pool) = test_pool().await else { return };
    let auth = AuthService::new(pool.clone(), "database_test_secret");
    let brotherhood = BrotherhoodService::new(pool.clone());

    let owner = register(&auth, &unique_email("cap-owner")).await;
    let first = register(&auth, &unique_email("cap-first")).await;
    let second = register(&auth, &unique_email("cap-second")).await;

    let group = brotherhood
        .create_group(
            owner,
            CreateGroupRequest {
                name: unique_name("Two Man Crew"),
                description: None,
                is_private: true,
                max_members: Some(2),
            },
        )
        .await
        .unwrap();

    let (a, b) = tokio::join!(brotherhood.join(group.id, first), brotherhood.join(group.id, second));
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    assert_eq!(brotherhood.get_group(group.id).await.unwrap().member_count, 2);

    let (c, d) = tokio::join!(brotherhood.join(group.id, owner), brotherhood.join(group.id, owner));
    assert_matches!(c, Err(AppError::Conflict(_)));
    assert_matches!(d, Err(AppError::Conflict(_)));
}

#[tokio::test]
#[serial]
async fn test_bug_notification_workflow() {
    let Some(pool) = test_pool().await else { return };
    let bugs = BugNotificationService::new(pool.clone());

    let unread_before = bugs.unread_count().await.unwrap();

    let bug = bugs
        .report(
            None,
            ReportBugRequest {
                title: unique_name("Checkout button"),
                description: "Nothing happens on mobile Safari".to_string(),
                page_url: Some("/prelaunch".to_string()),
                severity: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(bug.status, BugStatus::Open);
    assert!(!bug.is_read);
    assert_eq!(bugs.unread_count().await.unwrap(), unread_before + 1);

    let unread_query = BugQuery {
        status: None,
        unread_only: true,
        limit: Some(500),
        offset: None,
    };
    assert!(bugs.list(&unread_query).await.unwrap().iter().any(|b| b.id == bug.id));

    let in_progress = bugs.update_status(bug.id, BugStatus::InProgress).await.unwrap();
    assert_eq!(in_progress.status, BugStatus::InProgress);
    let by_status = bugs
        .list(&BugQuery {
            status: Some(BugStatus::InProgress),
            unread_only: false,
            limit: Some(500),
            offset: None,
        })
        .await
        .unwrap();
    assert!(by_status.iter().all(|b| b.status == BugStatus::InProgress));
    assert!(by_status.iter().any(|b| b.id == bug.id));

    let read = bugs.mark_read(bug.id).await.unwrap();
    assert!(read.is_read);
    assert_eq!(bugs.unread_count().await.unwrap(), unread_before);
    assert!(!bugs.list(&unread_query).await.unwrap().iter().any(|b| b.id == bug.id));

    assert_matches!(
        bugs.mark_read(Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    );
    assert_matches!(
        bugs.update_status(Uuid::new_v4(), BugStatus::Closed).await,
        Err(AppError::NotFound(_))
    );
}

#[tokio::test]
#[serial]
async fn test_live_snapshot_counts_activity() {
    let Some(pool) = test_pool().await else { return };
    let auth = AuthService::new(pool.clone(), "database_test_secret");
    let bugs = BugNotificationService::new(pool.clone());
    let live = LiveTrackingService::new(pool.clone());

    let email = unique_email("live");
    register(&auth, &email).await;
    auth.login(
        LoginRequest {
            email: email.clone(),
            password: PASSWORD.to_string(),
        },
        LoginContext::default(),
    )
    .await
    .unwrap();

    let before = live.snapshot().await.unwrap();
    bugs.report(
        None,
        ReportBugRequest {
            title: unique_name("Dashboard chart"),
            description: "Weight chart is empty".to_string(),
            page_url: None,
            severity: None,
        },
    )
    .await
    .unwrap();
    let after = live.snapshot().await.unwrap();

    assert!(before.active_members >= 1);
    assert!(before.logins_last_hour >= 1);
    assert!(before.failed_logins_last_hour <= before.logins_last_hour);
    assert!(!before.recent_logins.is_empty());
    assert!(before.recent_logins.len() <= 10);
    assert_eq!(after.open_bugs, before.open_bugs + 1);
    assert_eq!(after.unread_bug_notifications, before.unread_bug_notifications + 1);
    assert!(after.generated_at >= before.generated_at);
}

#[tokio::test]
async fn test_training_schema_lifecycle() {
    let Some(pool) = test_pool().await else { return };
    let auth = AuthService::new(pool.clone(), "database_test_secret");
    let schemas = TrainingSchemaService::new(pool.clone());

    let member = register(&auth, &unique_email("training")).await;
    let coach = register(&auth, &unique_email("coach")).await;
    let days = serde_json::from_value(json!([
        {
            "day_number": 1,
            "name": "Push",
            "exercises": [{ "name": "Bench press", "sets": 4, "reps": "6-8", "rest_seconds": 120 }]
        },
        {
            "day_number": 2,
            "name": "Pull",
            "exercises": [{ "name": "Barbell row", "sets": 4, "reps": "8-10" }]
        }
    ]))
    .unwrap();

    let name = unique_name("Push Pull");
    let schema = schemas
        .create_schema(CreateTrainingSchemaRequest {
            name: name.clone(),
            description: None,
            level: TrainingLevel::Beginner,
            days_per_week: 2,
            days,
        })
        .await
        .unwrap();
    assert!(schema.is_active);
    assert_eq!(schema.days.0.len(), 2);

    let duplicate = schemas
        .create_schema(CreateTrainingSchemaRequest {
            name: name.clone(),
            description: None,
            level: TrainingLevel::Beginner,
            days_per_week: 2,
            days: schema.days.0.clone(),
        })
        .await;
    assert_matches!(duplicate, Err(AppError::Conflict(_)));

    let gap = schemas
        .create_schema(CreateTrainingSchemaRequest {
            name: unique_name("Broken"),
            description: None,
            level: TrainingLevel::Beginner,
            days_per_week: 1,
            days: vec![],
        })
        .await;
    assert_matches!(gap, Err(AppError::Validation(_)));

    let updated = schemas
        .update_schema(
            schema.id,
            UpdateTrainingSchemaRequest {
                name: None,
                description: Some("Two day split".to_string()),
                level: Some(TrainingLevel::Intermediate),
                days_per_week: None,
                days: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, name);
    assert_eq!(updated.level, TrainingLevel::Intermediate);
    assert_eq!(updated.description.as_deref(), Some("Two day split"));

    let intermediate = schemas.list_schemas(Some(TrainingLevel::Intermediate)).await.unwrap();
    assert!(intermediate.iter().any(|s| s.id == schema.id));
    assert!(intermediate.iter().all(|s| s.level == TrainingLevel::Intermediate));

    let first = schemas.assign_schema(schema.id, member, Some(coach)).await.unwrap();
    let again = schemas.assign_schema(schema.id, member, None).await.unwrap();
    assert_eq!(first.id, again.id);
    assert_eq!(again.assigned_by, None);

    let mine = schemas.schemas_for_user(member).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, schema.id);

    schemas.deactivate_schema(schema.id).await.unwrap();
    assert!(!schemas.list_schemas(None).await.unwrap().iter().any(|s| s.id == schema.id));
    assert_matches!(
        schemas.assign_schema(schema.id, member, None).await,
        Err(AppError::Validation(_))
    );
    assert_matches!(
        schemas
            .update_schema(
                Uuid::new_v4(),
                UpdateTrainingSchemaRequest {
                    name: None,
                    description: None,
                    level: None,
                    days_per_week: None,
                    days: None,
                },
            )
            .await,
        Err(AppError::NotFound(_))
    );
}

#[tokio::test]
#[serial]
async fn test_email_template_toggle() {
    let Some(pool) = test_pool().await else { return };
    let templates = EmailTemplateService::new(pool.clone());

    assert_matches!(
        templates.set_enabled("newsletter", false, None).await,
        Err(AppError::Validation(_))
    );

    let status = templates
        .set_enabled("weekly_checkin_reminder", false, None)
        .await
        .unwrap();
    assert!(!status.enabled);
    assert!(!templates
        .is_enabled(TemplateName::WeeklyCheckinReminder)
        .await
        .unwrap());

    templates
        .set_enabled("weekly_checkin_reminder", true, None)
        .await
        .unwrap();
    assert!(templates
        .is_enabled(TemplateName::WeeklyCheckinReminder)
        .await
        .unwrap());

    let all = templates.list().await.unwrap();
    assert_eq!(all.len(), TemplateName::ALL.len());
}

#[tokio::test]
async fn test_progress_checkins_and_history() {
    let Some(pool) = test_pool().await else { return };
    let auth = AuthService::new(pool.clone(), "database_test_secret");
    let storage = StorageService::from_config(&StorageConfig {
        bucket: "progress-photos-test".to_string(),
        region: "eu-central-1".to_string(),
        endpoint: Some("http://127.0.0.1:9".to_string()),
        url_expiry_seconds: 60,
    })
    .await;
    let progress = ProgressService::new(pool.clone(), storage);

    let member = register(&auth, &unique_email("progress")).await;
    let checkin = |week_of: NaiveDate, weight_kg: f64| UpsertCheckinRequest {
        week_of: Some(week_of),
        weight_kg,
        body_fat_pct: None,
        waist_cm: None,
        notes: None,
    };

    // Wednesday and Friday of the same week land on the same Monday
    let first = progress
        .upsert_checkin(member, checkin(NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(), 92.0))
        .await
        .unwrap();
    assert_eq!(first.week_start, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());

    let replaced = progress
        .upsert_checkin(member, checkin(NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(), 91.4))
        .await
        .unwrap();
    assert_eq!(replaced.id, first.id);

    progress
        .upsert_checkin(member, checkin(NaiveDate::from_ymd_opt(2024, 3, 13).unwrap(), 90.8))
        .await
        .unwrap();

    let history = progress.history(member, None).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(
        history[0].checkin.week_start,
        NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()
    );
    assert_eq!(history[0].weight_delta_kg, Some(-0.6));
    assert_eq!(history[1].weight_delta_kg, None);

    let limited = progress.history(member, Some(1)).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].weight_delta_kg, Some(-0.6));

    // A skipped week leaves the next check-in without a delta
    progress
        .upsert_checkin(member, checkin(NaiveDate::from_ymd_opt(2024, 3, 27).unwrap(), 89.9))
        .await
        .unwrap();
    let history = progress.history(member, None).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].weight_delta_kg, None);
    assert_eq!(history[1].weight_delta_kg, Some(-0.6));
}

#[tokio::test]
async fn test_package_checkout_and_webhook() {
    let Some(pool) = test_pool().await else { return };
    let server = MockServer::start().await;
    let payment_id = format!("tr_{}", Uuid::new_v4().simple());

    Mock::given(method("POST"))
        .and(path("/v2/payments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": payment_id,
            "status": "open",
            "amount": { "currency": "EUR", "value": "97.00" },
            "_links": { "checkout": { "href": "https://www.mollie.com/checkout/test" } }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/v2/payments/{}", payment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": payment_id,
            "status": "paid",
            "amount": { "currency": "EUR", "value": "97.00" },
            "paidAt": "2024-03-01T10:15:00+00:00"
        })))
        .mount(&server)
        .await;

    let mollie = MollieClient::new(&MollieConfig {
        api_key: Some("test_key".to_string()),
        base_url: server.uri(),
    })
    .unwrap();
    let mailer = Mailer::new(SmtpConfig::default(), EmailTemplateService::new(pool.clone())).unwrap();
    let packages = PackageService::new(pool.clone(), mollie, mailer, "https://toptiermen.test");

    let checkout = packages
        .checkout(CheckoutRequest {
            full_name: "Jan de Vries".to_string(),
            email: unique_email("buyer"),
            tier: PackageTier::Starter,
        })
        .await
        .unwrap();
    assert_eq!(checkout.payment_id, payment_id);
    assert_eq!(checkout.checkout_url, "https://www.mollie.com/checkout/test");

    let stored = packages.find_by_payment_id(&payment_id).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Open);
    assert_eq!(stored.amount_cents, 9_700);

    let updated = packages.handle_webhook(&payment_id).await.unwrap().unwrap();
    assert_eq!(updated.payment_status, PaymentStatus::Paid);
    assert!(updated.paid_at.is_some());

    assert!(packages.handle_webhook("tr_unknown").await.unwrap().is_none());

    // Concurrent webhooks for one payment: only one of them sees the move to paid
    let (previous, _) = packages
        .record_payment_status(stored.id, PaymentStatus::Open, None)
        .await
        .unwrap();
    assert_eq!(previous, PaymentStatus::Paid);
    let (first, second) = tokio::join!(
        packages.record_payment_status(stored.id, PaymentStatus::Paid, None),
        packages.record_payment_status(stored.id, PaymentStatus::Paid, None),
    );
    let newly_paid = [first.unwrap().0, second.unwrap().0]
        .iter()
        .filter(|previous| **previous != PaymentStatus::Paid)
        .count();
    assert_eq!(newly_paid, 1);

    let summary = packages.summary().await.unwrap();
    assert!(summary.paid_revenue_cents >= 9_700);
}

#[tokio::test]
async fn test_ebook_directory_import() {
    let Some(pool) = test_pool().await else { return };
    let ebooks = EbookService::new(pool.clone());

    let prefix = Uuid::new_v4().simple().to_string()[..8].to_string();
    let dir = tempfile::tempdir().unwrap();

    std::fs::write(
        dir.path().join(format!("{}-01 Mindset.html", prefix)),
        "<html><head><title>Book</title></head><body><article><h1>Mindset</h1><p>Discipline beats motivation.</p></article></body></html>",
    )
    .unwrap();
    std::fs::write(
        dir.path().join(format!("{}-02_training.html", prefix)),
        "<html><body><article><p>Lift heavy, sleep well.</p></article></body></html>",
    )
    .unwrap();
    std::fs::write(
        dir.path().join(format!("{}-03-broken.html", prefix)),
        "<html><body><div>No chapter here</div></body></html>",
    )
    .unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let report = ebooks.import_directory(dir.path(), None).await.unwrap();

    let mindset = format!("{}-01-mindset", prefix);
    let training = format!("{}-02-training", prefix);
    assert_eq!(report.imported, vec![mindset.clone(), training.clone()]);
    assert_eq!(report.failed.len(), 1);

    let first = ebooks.get(&mindset).await.unwrap();
    assert_eq!(first.title, "Mindset");
    assert_eq!(first.position, 1);
    assert_eq!(first.word_count, 4);

    // No h1 and no <title>: the slug becomes the title
    let second = ebooks.get(&training).await.unwrap();
    assert_eq!(second.title, training.replace('-', " "));
    assert_eq!(second.position, 2);

    ebooks.delete(&mindset).await.unwrap();
    ebooks.delete(&training).await.unwrap();
    assert_matches!(ebooks.get(&mindset).await, Err(AppError::NotFound(_)));
}
