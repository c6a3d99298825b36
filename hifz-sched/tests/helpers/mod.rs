//! Shared test fixtures

#![allow(dead_code)]

use axum::body::Body;
use axum::http::Request;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

use hifz_sched::models::{
    Ayah, ProgramVariant, ScaffoldingLevel, User,
};
use hifz_sched::{build_router, AppState};

/// In-memory database. A single pooled connection keeps the schema alive
/// for the whole test.
pub async fn setup_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Should connect to in-memory database");

    hifz_common::db::create_schema(&pool)
        .await
        .expect("Should create schema");

    pool
}

pub fn setup_app(pool: SqlitePool) -> axum::Router {
    build_router(AppState::new(pool))
}

pub fn ts(s: &str) -> DateTime<Utc> {
    hifz_common::time::parse_ts(s).expect("Should parse timestamp")
}

/// A user with the gate passed and STANDARD parameters
pub fn test_user() -> User {
    let now = hifz_common::time::now();
    User {
        id: Uuid::new_v4(),
        email: format!("{}@example.com", Uuid::new_v4()),
        time_budget_minutes: 60,
        fluency_score: Some(80.0),
        fluency_gate_passed: true,
        requires_pre_hifz: false,
        scaffolding_level: ScaffoldingLevel::Standard,
        variant: ProgramVariant::Standard,
        daily_new_target_ayahs: 7,
        review_ratio_target: 70,
        retention_threshold: 0.85,
        backlog_freeze_ratio: 0.8,
        consolidation_retention_floor: 0.77,
        manzil_rotation_days: 30,
        avg_seconds_per_item: 75,
        overdue_cap_seconds: 172_800,
        prior_juz_band: None,
        goal: None,
        has_teacher: true,
        tajwid_confidence: None,
        created_at: now,
        updated_at: now,
    }
}

/// A user still blocked by the fluency gate
pub fn blocked_user() -> User {
    let mut user = test_user();
    user.fluency_gate_passed = false;
    user.requires_pre_hifz = true;
    user.fluency_score = None;
    user
}

pub async fn insert_user(pool: &SqlitePool, user: &User) {
    hifz_sched::db::users::insert(pool, user)
        .await
        .expect("Should insert user");
}

/// Seed `count` ayahs starting at `first_id`, all on one page and juz
pub async fn seed_ayahs(pool: &SqlitePool, first_id: i64, count: i64, page: i64, juz: i64) {
    for i in 0..count {
        let id = first_id + i;
        hifz_sched::db::ayahs::insert(
            pool,
            &Ayah {
                id,
                surah_number: 1 + (id - 1) / 286,
                ayah_number: 1 + (id - 1) % 286,
                juz_number: juz,
                page_number: page,
                hizb_quarter: 1 + (juz - 1) * 8,
                text_uthmani: format!("ayah text {}", id),
            },
        )
        .await
        .expect("Should insert ayah");
    }
}

/// Request with an explicit bearer credential (`<user_id>` or
/// `<user_id>:<email>`)
pub fn bearer_request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json");

    match body {
        Some(body) => builder
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Request authenticated as an existing user
pub fn auth_request(method: &str, uri: &str, user_id: Uuid, body: Option<Value>) -> Request<Body> {
    bearer_request(method, uri, &user_id.to_string(), body)
}

/// Unauthenticated request
pub fn plain_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}
