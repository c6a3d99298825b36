//! Database initialization and schema
//!
//! Creates the relational layout for the scheduling core. Check constraints
//! enforce the entity invariants (event shape by discriminator, enum value
//! sets, counter bounds); unique indexes carry the idempotency keys the
//! write paths rely on:
//! - `(user_id, client_event_id)` — event ingest dedupe
//! - `(user_id, client_session_id)` — idempotent session start
//! - `(user_id, session_date)` — daily session upsert
//! - `(user_id, ayah_id)` — item state upsert / reducer serialization

use crate::Result;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePool::connect(&db_url).await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Apply pragmas and create all tables (idempotent, safe to call repeatedly)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    // Set busy timeout to 5 seconds
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(pool)
        .await?;

    create_users_table(pool).await?;
    create_ayahs_table(pool).await?;
    create_session_runs_table(pool).await?;
    create_review_events_table(pool).await?;
    create_user_item_state_table(pool).await?;
    create_daily_sessions_table(pool).await?;
    create_transition_scores_table(pool).await?;
    create_fluency_gate_tests_table(pool).await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            time_budget_minutes INTEGER NOT NULL DEFAULT 30
                CHECK (time_budget_minutes IN (15, 30, 60, 90)),
            fluency_score REAL
                CHECK (fluency_score IS NULL OR (fluency_score >= 0 AND fluency_score <= 100)),
            fluency_gate_passed INTEGER NOT NULL DEFAULT 0,
            requires_pre_hifz INTEGER NOT NULL DEFAULT 1,
            scaffolding_level TEXT NOT NULL DEFAULT 'STANDARD'
                CHECK (scaffolding_level IN ('BEGINNER', 'STANDARD', 'MINIMAL')),
            variant TEXT NOT NULL DEFAULT 'STANDARD'
                CHECK (variant IN ('CONSERVATIVE', 'STANDARD', 'MOMENTUM')),
            daily_new_target_ayahs INTEGER NOT NULL DEFAULT 7,
            review_ratio_target INTEGER NOT NULL DEFAULT 70,
            retention_threshold REAL NOT NULL DEFAULT 0.85,
            backlog_freeze_ratio REAL NOT NULL DEFAULT 0.8,
            consolidation_retention_floor REAL NOT NULL DEFAULT 0.77,
            manzil_rotation_days INTEGER NOT NULL DEFAULT 30,
            avg_seconds_per_item INTEGER NOT NULL DEFAULT 70,
            overdue_cap_seconds INTEGER NOT NULL DEFAULT 172800,
            prior_juz_band TEXT
                CHECK (prior_juz_band IS NULL OR prior_juz_band IN ('ZERO', 'ONE_TO_FIVE', 'FIVE_PLUS')),
            goal TEXT,
            has_teacher INTEGER NOT NULL DEFAULT 0,
            tajwid_confidence TEXT
                CHECK (tajwid_confidence IS NULL OR tajwid_confidence IN ('LOW', 'MEDIUM', 'HIGH')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_ayahs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ayahs (
            id INTEGER PRIMARY KEY CHECK (id >= 1 AND id <= 6236),
            surah_number INTEGER NOT NULL CHECK (surah_number >= 1 AND surah_number <= 114),
            ayah_number INTEGER NOT NULL CHECK (ayah_number >= 1),
            juz_number INTEGER NOT NULL CHECK (juz_number >= 1 AND juz_number <= 30),
            page_number INTEGER NOT NULL CHECK (page_number >= 1 AND page_number <= 604),
            hizb_quarter INTEGER NOT NULL CHECK (hizb_quarter >= 1 AND hizb_quarter <= 240),
            text_uthmani TEXT NOT NULL,
            UNIQUE (surah_number, ayah_number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_ayahs_page ON ayahs(page_number)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_ayahs_juz ON ayahs(juz_number)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_session_runs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS session_runs (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            client_session_id TEXT,
            mode TEXT NOT NULL CHECK (mode IN ('NORMAL', 'CONSOLIDATION', 'REVIEW_ONLY')),
            warmup_passed INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'ACTIVE'
                CHECK (status IN ('ACTIVE', 'COMPLETED', 'ABANDONED')),
            started_at TEXT NOT NULL,
            ended_at TEXT,
            events_count INTEGER NOT NULL DEFAULT 0,
            minutes_total INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Idempotent start: at most one run per (user, client session id)
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_session_runs_client
        ON session_runs(user_id, client_session_id)
        WHERE client_session_id IS NOT NULL
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_session_runs_user_status ON session_runs(user_id, status)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_review_events_table(pool: &SqlitePool) -> Result<()> {
    // Single tagged table: the discriminator plus per-variant nullable columns,
    // with check constraints enforcing each variant's required fields.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS review_events (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            session_run_id TEXT REFERENCES session_runs(id) ON DELETE SET NULL,
            client_event_id TEXT,
            event_type TEXT NOT NULL
                CHECK (event_type IN ('REVIEW_ATTEMPTED', 'TRANSITION_ATTEMPTED')),
            session_type TEXT
                CHECK (session_type IS NULL OR session_type IN ('SABAQ', 'SABQI', 'MANZIL', 'WARMUP')),
            item_ayah_id INTEGER REFERENCES ayahs(id),
            tier TEXT CHECK (tier IS NULL OR tier IN ('SABAQ', 'SABQI', 'MANZIL')),
            step_type TEXT
                CHECK (step_type IS NULL OR step_type IN ('EXPOSURE', 'GUIDED', 'BLIND', 'LINK')),
            attempt_number INTEGER
                CHECK (attempt_number IS NULL OR (attempt_number >= 1 AND attempt_number <= 3)),
            scaffolding_used INTEGER NOT NULL DEFAULT 0,
            linked_ayah_id INTEGER REFERENCES ayahs(id),
            from_ayah_id INTEGER REFERENCES ayahs(id),
            to_ayah_id INTEGER REFERENCES ayahs(id),
            success INTEGER NOT NULL,
            errors_count INTEGER CHECK (errors_count IS NULL OR errors_count >= 0),
            duration_seconds INTEGER
                CHECK (duration_seconds IS NULL OR duration_seconds > 0),
            error_tags TEXT,
            occurred_at TEXT NOT NULL,
            received_at TEXT NOT NULL,
            CHECK (event_type != 'REVIEW_ATTEMPTED'
                OR (item_ayah_id IS NOT NULL AND tier IS NOT NULL
                    AND errors_count IS NOT NULL AND duration_seconds IS NOT NULL)),
            CHECK (event_type != 'TRANSITION_ATTEMPTED'
                OR (from_ayah_id IS NOT NULL AND to_ayah_id IS NOT NULL)),
            CHECK (step_type IS NULL OR step_type != 'LINK' OR linked_ayah_id IS NOT NULL)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Ingest idempotency key
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_review_events_client
        ON review_events(user_id, client_event_id)
        WHERE client_event_id IS NOT NULL
        "#,
    )
    .execute(pool)
    .await?;

    // Replay ordering per (user, ayah)
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_review_events_item
        ON review_events(user_id, item_ayah_id, occurred_at, id)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_review_events_session ON review_events(session_run_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_review_events_user_time ON review_events(user_id, occurred_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_user_item_state_table(pool: &SqlitePool) -> Result<()> {
    // Sparse per-(user, ayah) learning record: rows exist only once the first
    // event for the pair has been reduced.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_item_state (
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            ayah_id INTEGER NOT NULL REFERENCES ayahs(id),
            status TEXT NOT NULL
                CHECK (status IN ('LEARNING', 'MEMORIZED', 'REVIEWING', 'PAUSED')),
            tier TEXT NOT NULL CHECK (tier IN ('SABAQ', 'SABQI', 'MANZIL')),
            next_review_at TEXT NOT NULL,
            review_interval_seconds INTEGER NOT NULL CHECK (review_interval_seconds > 0),
            interval_checkpoint_index INTEGER NOT NULL
                CHECK (interval_checkpoint_index >= 0 AND interval_checkpoint_index <= 7),
            introduced_at TEXT NOT NULL,
            first_memorized_at TEXT,
            difficulty_score REAL NOT NULL
                CHECK (difficulty_score >= 0.0 AND difficulty_score <= 1.0),
            total_reviews INTEGER NOT NULL DEFAULT 0,
            successful_reviews INTEGER NOT NULL DEFAULT 0,
            lapses INTEGER NOT NULL DEFAULT 0,
            success_streak INTEGER NOT NULL DEFAULT 0,
            consecutive_perfect_days INTEGER NOT NULL DEFAULT 0,
            last_perfect_day TEXT,
            average_duration_seconds REAL NOT NULL DEFAULT 0,
            last_errors_count INTEGER NOT NULL DEFAULT 0,
            last_reviewed_at TEXT,
            last_event_occurred_at TEXT,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (user_id, ayah_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Due-item scan for the queue planner
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_item_state_due
        ON user_item_state(user_id, next_review_at)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_item_state_tier ON user_item_state(user_id, tier)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_daily_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS daily_sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            session_date TEXT NOT NULL,
            mode TEXT NOT NULL CHECK (mode IN ('NORMAL', 'CONSOLIDATION', 'REVIEW_ONLY')),
            retention_score REAL NOT NULL CHECK (retention_score >= 0.0 AND retention_score <= 1.0),
            backlog_minutes_estimate INTEGER NOT NULL DEFAULT 0,
            overdue_days_max INTEGER NOT NULL DEFAULT 0,
            minutes_total INTEGER NOT NULL DEFAULT 0,
            reviews_total INTEGER NOT NULL DEFAULT 0,
            reviews_successful INTEGER NOT NULL DEFAULT 0,
            new_ayahs_memorized INTEGER NOT NULL DEFAULT 0,
            warmup_passed INTEGER NOT NULL DEFAULT 0,
            sabaq_allowed INTEGER NOT NULL DEFAULT 0,
            UNIQUE (user_id, session_date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_transition_scores_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transition_scores (
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            from_ayah_id INTEGER NOT NULL REFERENCES ayahs(id),
            to_ayah_id INTEGER NOT NULL REFERENCES ayahs(id),
            attempt_count INTEGER NOT NULL DEFAULT 0 CHECK (attempt_count >= 0),
            success_count INTEGER NOT NULL DEFAULT 0
                CHECK (success_count >= 0 AND success_count <= attempt_count),
            last_practiced_at TEXT NOT NULL,
            PRIMARY KEY (user_id, from_ayah_id, to_ayah_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_fluency_gate_tests_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fluency_gate_tests (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            status TEXT NOT NULL DEFAULT 'IN_PROGRESS'
                CHECK (status IN ('IN_PROGRESS', 'PASSED', 'FAILED')),
            test_page INTEGER NOT NULL CHECK (test_page >= 1 AND test_page <= 604),
            duration_seconds INTEGER CHECK (duration_seconds IS NULL OR duration_seconds > 0),
            error_count INTEGER CHECK (error_count IS NULL OR error_count >= 0),
            fluency_score REAL
                CHECK (fluency_score IS NULL OR (fluency_score >= 0 AND fluency_score <= 100)),
            started_at TEXT NOT NULL,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_fluency_tests_user ON fluency_gate_tests(user_id, started_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
