#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc, Weekday};

use trainlog::clock::ManualClock;
use trainlog::db::{create_memory_pool, DbPool};
use trainlog::migrations::run_migrations_for_tests;
use trainlog::models::{
    Exercise, ExerciseDraft, NewUser, Prescription, Template, TemplateDay, User, UserRole,
};
use trainlog::store::SqliteStore;
use trainlog::Trainlog;

pub fn setup_test_db() -> DbPool {
    let pool = create_memory_pool().expect("Failed to create test database");
    run_migrations_for_tests(&pool).expect("Failed to run migrations");
    pool
}

pub struct TestApp {
    pub app: Trainlog<SqliteStore>,
    pub store: SqliteStore,
    pub clock: ManualClock,
}

pub fn create_test_app() -> TestApp {
    let store = SqliteStore::new(setup_test_db());
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 4, 18, 0, 0).unwrap());
    let app = Trainlog::new(store.clone(), Arc::new(clock.clone()));

    TestApp { app, store, clock }
}

pub async fn create_test_user(test: &TestApp, email: &str, role: UserRole) -> User {
    test.app
        .accounts
        .register(NewUser {
            email: email.to_string(),
            password: "password123".to_string(),
            role,
            name: None,
        })
        .await
        .unwrap()
}

pub async fn create_test_exercise(test: &TestApp, name: &str, primary: &str) -> Exercise {
    let admin = match test.app.accounts.user("admin@example.com").await {
        Ok(admin) => admin,
        Err(_) => create_test_user(test, "admin@example.com", UserRole::Admin).await,
    };

    test.app
        .catalog
        .create(
            &admin,
            ExerciseDraft {
                name: name.to_string(),
                primary_muscle: primary.to_string(),
                ..ExerciseDraft::default()
            },
        )
        .await
        .unwrap()
}

pub async fn create_test_template(test: &TestApp, owner: &str, name: &str) -> Template {
    test.app
        .templates
        .create_template(owner, name, "")
        .await
        .unwrap()
}

pub async fn create_test_day(test: &TestApp, template: &Template, weekday: Weekday) -> TemplateDay {
    test.app
        .templates
        .add_day(&template.owner_id, &template.id, weekday, &["chest".to_string()])
        .await
        .unwrap()
}

pub fn prescription(sets: u32, reps: &str, rest: u32) -> Prescription {
    Prescription {
        target_sets: sets,
        target_reps: reps.to_string(),
        custom_reps: None,
        rest_seconds: rest,
    }
}
