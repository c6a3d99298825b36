//! Today-queue planner
//!
//! Request-scoped computation: reads item states, today's events, the last
//! week of daily aggregates and the transition scores, and assembles the
//! day's plan. Nothing here is cached or mutated in place; the session
//! rollup re-runs the same planner at completion time for its snapshot.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use hifz_common::{time, Result};

use crate::db;
use crate::models::transition::{WEAK_MAX_SUCCESS_RATE, WEAK_MIN_ATTEMPTS};
use crate::models::{EventType, ItemStatus, QueueMode, ReviewTier, User, UserItemState};

/// Overdue age (days) beyond which the planner freezes new material
const OVERDUE_FREEZE_DAYS: i64 = 2;

/// How many weak transitions are surfaced, and how many trigger the
/// link-repair recommendation
const WEAK_SURFACE_LIMIT: usize = 10;
const LINK_REPAIR_THRESHOLD: usize = 5;

/// Payload discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    Ok,
    FluencyGateRequired,
}

/// Debt metrics for the day
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DebtMetrics {
    pub due_count: i64,
    pub backlog_minutes_estimate: i64,
    pub overdue_days_max: i64,
    pub freeze_threshold_minutes: i64,
    pub debt_freeze: bool,
}

/// Warm-up gate over the items introduced the prior UTC day
#[derive(Debug, Clone, Serialize)]
pub struct WarmupEval {
    pub passed: bool,
    pub failed: bool,
    pub pending: bool,
    pub passing_ayah_ids: Vec<i64>,
    pub failing_ayah_ids: Vec<i64>,
    pub pending_ayah_ids: Vec<i64>,
}

/// One review-queue entry, risk-ordered
#[derive(Debug, Clone, Serialize)]
pub struct QueueItem {
    pub ayah_id: i64,
    pub tier: ReviewTier,
    pub status: ItemStatus,
    pub next_review_at: DateTime<Utc>,
    pub overdue_seconds: i64,
    pub interval_checkpoint_index: i64,
    pub lapses: i64,
    pub difficulty_score: f64,
    pub last_errors_count: i64,
}

impl QueueItem {
    fn from_state(state: &UserItemState, now: DateTime<Utc>) -> Self {
        QueueItem {
            ayah_id: state.ayah_id,
            tier: state.tier,
            status: state.status,
            next_review_at: state.next_review_at,
            overdue_seconds: state.overdue_seconds(now),
            interval_checkpoint_index: state.interval_checkpoint_index,
            lapses: state.lapses,
            difficulty_score: state.difficulty_score,
            last_errors_count: state.last_errors_count,
        }
    }
}

/// Weak inter-ayah transition surfaced for link repair
#[derive(Debug, Clone, Serialize)]
pub struct WeakTransition {
    pub from_ayah_id: i64,
    pub to_ayah_id: i64,
    pub attempt_count: i64,
    pub success_count: i64,
    pub success_rate: f64,
}

/// New-material task for the day
#[derive(Debug, Clone, Serialize)]
pub struct SabaqTask {
    pub allowed: bool,
    pub target_ayahs: i64,
    pub blocked_reason: BlockedReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockedReason {
    None,
    WarmupFailed,
    ModeReviewOnly,
    WarmupPending,
}

/// Full today-queue payload
#[derive(Debug, Clone, Serialize)]
pub struct TodayQueue {
    pub status: QueueStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'static str>,
    pub mode: QueueMode,
    pub debt: DebtMetrics,
    pub warmup: WarmupEval,
    pub retention_rolling_7d: f64,
    pub sabqi_queue: Vec<QueueItem>,
    pub manzil_queue: Vec<QueueItem>,
    pub weak_transitions: Vec<WeakTransition>,
    pub link_repair_recommended: bool,
    pub sabaq_task: SabaqTask,
}

/// Plan the user's queue for `now`
pub async fn plan_today(pool: &SqlitePool, user: &User, now: DateTime<Utc>) -> Result<TodayQueue> {
    // Step 1: fluency gate guard
    if user.gate_blocked() {
        return Ok(gate_required_payload());
    }

    let states = db::item_states::all_for_user(pool, user.id).await?;

    // Step 2: debt metrics
    let debt = debt_metrics(user, &states, now);

    // Step 3: warm-up over items introduced the prior UTC day
    let warmup = evaluate_warmup(pool, user.id, &states, now).await?;

    // Step 4: rolling 7-day retention
    let retention_rolling_7d = rolling_retention(pool, user.id, now).await?;

    // Step 5: mode selection
    let mode = if debt.debt_freeze || warmup.failed {
        QueueMode::ReviewOnly
    } else if retention_rolling_7d < user.retention_threshold {
        QueueMode::Consolidation
    } else {
        QueueMode::Normal
    };

    // Step 6: Sabqi list (due, non-MANZIL, risk-ordered)
    let mut sabqi: Vec<QueueItem> = states
        .iter()
        .filter(|s| s.is_due(now) && s.tier != ReviewTier::Manzil)
        .map(|s| QueueItem::from_state(s, now))
        .collect();
    sabqi.sort_by(risk_order);

    // Step 7: Manzil rotation
    let manzil = manzil_rotation(user, &states, now);

    // Step 8: weak transitions
    let weak_transitions =
        db::transitions::weak_for_user(pool, user.id, WEAK_MIN_ATTEMPTS, WEAK_MAX_SUCCESS_RATE)
            .await?;
    let link_repair_recommended = weak_transitions.len() > LINK_REPAIR_THRESHOLD;
    let weak_transitions: Vec<WeakTransition> =
        weak_transitions.into_iter().take(WEAK_SURFACE_LIMIT).collect();

    // Step 9: Sabaq task
    let sabaq_task = sabaq_task(user, mode, &warmup);

    Ok(TodayQueue {
        status: QueueStatus::Ok,
        action: None,
        mode,
        debt,
        warmup,
        retention_rolling_7d,
        sabqi_queue: sabqi,
        manzil_queue: manzil,
        weak_transitions,
        link_repair_recommended,
        sabaq_task,
    })
}

fn gate_required_payload() -> TodayQueue {
    TodayQueue {
        status: QueueStatus::FluencyGateRequired,
        action: Some("COMPLETE_FLUENCY_GATE"),
        mode: QueueMode::ReviewOnly,
        debt: DebtMetrics {
            due_count: 0,
            backlog_minutes_estimate: 0,
            overdue_days_max: 0,
            freeze_threshold_minutes: 0,
            debt_freeze: false,
        },
        warmup: WarmupEval {
            passed: true,
            failed: false,
            pending: false,
            passing_ayah_ids: Vec::new(),
            failing_ayah_ids: Vec::new(),
            pending_ayah_ids: Vec::new(),
        },
        retention_rolling_7d: 1.0,
        sabqi_queue: Vec::new(),
        manzil_queue: Vec::new(),
        weak_transitions: Vec::new(),
        link_repair_recommended: false,
        sabaq_task: SabaqTask {
            allowed: false,
            target_ayahs: 0,
            blocked_reason: BlockedReason::None,
        },
    }
}

fn debt_metrics(user: &User, states: &[UserItemState], now: DateTime<Utc>) -> DebtMetrics {
    let due: Vec<&UserItemState> = states.iter().filter(|s| s.is_due(now)).collect();
    let due_count = due.len() as i64;

    let backlog_minutes_estimate = (due_count * user.avg_seconds_per_item + 59) / 60;

    let overdue_days_max = due
        .iter()
        .map(|s| s.next_review_at)
        .min()
        .map(|earliest| (now - earliest).num_seconds().max(0) / 86_400)
        .unwrap_or(0);

    let freeze_threshold_minutes =
        (user.time_budget_minutes as f64 * user.backlog_freeze_ratio).floor() as i64;

    // Strictly greater than the threshold; equality does not freeze
    let debt_freeze = backlog_minutes_estimate > freeze_threshold_minutes
        || overdue_days_max > OVERDUE_FREEZE_DAYS;

    DebtMetrics {
        due_count,
        backlog_minutes_estimate,
        overdue_days_max,
        freeze_threshold_minutes,
        debt_freeze,
    }
}

async fn evaluate_warmup(
    pool: &SqlitePool,
    user_id: Uuid,
    states: &[UserItemState],
    now: DateTime<Utc>,
) -> Result<WarmupEval> {
    let today = time::utc_day(&now);
    let today_start = time::day_start(today);
    let yesterday_start = today_start - Duration::days(1);

    let warmup_set: HashSet<i64> = states
        .iter()
        .filter(|s| s.introduced_at >= yesterday_start && s.introduced_at < today_start)
        .map(|s| s.ayah_id)
        .collect();

    // Vacuously passed when nothing was introduced yesterday
    if warmup_set.is_empty() {
        return Ok(WarmupEval {
            passed: true,
            failed: false,
            pending: false,
            passing_ayah_ids: Vec::new(),
            failing_ayah_ids: Vec::new(),
            pending_ayah_ids: Vec::new(),
        });
    }

    let today_events = db::events::review_events_since(pool, user_id, today_start).await?;

    let mut attempted: HashMap<i64, bool> = HashMap::new();
    for event in &today_events {
        if event.event_type != EventType::ReviewAttempted {
            continue;
        }
        let Some(ayah_id) = event.item_ayah_id else { continue };
        if !warmup_set.contains(&ayah_id) {
            continue;
        }
        let pass = event.success && event.errors_count.unwrap_or(0) <= 1;
        let entry = attempted.entry(ayah_id).or_insert(false);
        *entry = *entry || pass;
    }

    let mut passing = Vec::new();
    let mut failing = Vec::new();
    let mut pending = Vec::new();
    for &ayah_id in &warmup_set {
        match attempted.get(&ayah_id) {
            Some(true) => passing.push(ayah_id),
            Some(false) => failing.push(ayah_id),
            None => pending.push(ayah_id),
        }
    }
    passing.sort_unstable();
    failing.sort_unstable();
    pending.sort_unstable();

    Ok(WarmupEval {
        passed: failing.is_empty() && pending.is_empty(),
        failed: !failing.is_empty(),
        pending: !pending.is_empty(),
        passing_ayah_ids: passing,
        failing_ayah_ids: failing,
        pending_ayah_ids: pending,
    })
}

async fn rolling_retention(pool: &SqlitePool, user_id: Uuid, now: DateTime<Utc>) -> Result<f64> {
    let from_day = time::utc_day(&now) - Duration::days(6);
    let scores = db::daily_sessions::retention_scores_since(pool, user_id, from_day).await?;
    if scores.is_empty() {
        return Ok(1.0);
    }
    Ok(scores.iter().sum::<f64>() / scores.len() as f64)
}

/// Risk comparator: most overdue first, then lapses, difficulty, last errors
fn risk_order(a: &QueueItem, b: &QueueItem) -> Ordering {
    b.overdue_seconds
        .cmp(&a.overdue_seconds)
        .then(b.lapses.cmp(&a.lapses))
        .then(
            b.difficulty_score
                .partial_cmp(&a.difficulty_score)
                .unwrap_or(Ordering::Equal),
        )
        .then(b.last_errors_count.cmp(&a.last_errors_count))
}

fn manzil_rotation(user: &User, states: &[UserItemState], now: DateTime<Utc>) -> Vec<QueueItem> {
    let active: Vec<&UserItemState> = states
        .iter()
        .filter(|s| s.tier == ReviewTier::Manzil && s.status != ItemStatus::Paused)
        .collect();

    let rotation_days = user.manzil_rotation_days.max(1);
    let target = ((active.len() as i64 + rotation_days - 1) / rotation_days).max(1) as usize;

    let mut due: Vec<QueueItem> = active
        .iter()
        .filter(|s| s.is_due(now))
        .map(|s| QueueItem::from_state(s, now))
        .collect();
    due.sort_by(risk_order);

    if due.len() >= target {
        return due;
    }

    // Top up with not-yet-due items so small cohorts still rotate daily
    let due_ids: HashSet<i64> = due.iter().map(|i| i.ayah_id).collect();
    let mut filler: Vec<QueueItem> = active
        .iter()
        .filter(|s| !due_ids.contains(&s.ayah_id))
        .map(|s| QueueItem::from_state(s, now))
        .collect();
    filler.sort_by(risk_order);

    for item in filler {
        if due.len() >= target {
            break;
        }
        due.push(item);
    }

    due
}

fn sabaq_task(user: &User, mode: QueueMode, warmup: &WarmupEval) -> SabaqTask {
    let target_ayahs = match mode {
        QueueMode::Normal => user.daily_new_target_ayahs,
        QueueMode::Consolidation => (user.daily_new_target_ayahs / 2).max(1),
        QueueMode::ReviewOnly => 0,
    };

    let allowed = mode != QueueMode::ReviewOnly && warmup.passed;

    let blocked_reason = if warmup.failed {
        BlockedReason::WarmupFailed
    } else if mode == QueueMode::ReviewOnly {
        BlockedReason::ModeReviewOnly
    } else if warmup.pending {
        BlockedReason::WarmupPending
    } else {
        BlockedReason::None
    };

    SabaqTask {
        allowed,
        target_ayahs,
        blocked_reason,
    }
}
