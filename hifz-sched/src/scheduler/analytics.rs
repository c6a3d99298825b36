//! Analytics read models
//!
//! Pure derivations over stored state: calendar with xp and streaks,
//! achievements, progress, and lifetime stats. Reads never fail on empty
//! data; a new user gets empty collections and zeroed numbers.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use uuid::Uuid;

use hifz_common::{time, Result};

use crate::db;
use crate::models::{ItemStatus, ReviewTier};

/// XP formula weights
const XP_PER_MINUTE: i64 = 2;
const XP_PER_NEW_AYAH: i64 = 10;

// ============================================================================
// Calendar
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub completed: bool,
    pub xp: i64,
    pub minutes_total: i64,
    pub reviews_total: i64,
    pub new_ayahs_memorized: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarView {
    pub month: String,
    pub days: Vec<CalendarDay>,
    pub current_streak: i64,
    pub longest_streak: i64,
}

/// Calendar for a month (`YYYY-MM`), with streaks over the whole history
pub async fn calendar(
    pool: &SqlitePool,
    user_id: Uuid,
    year: i32,
    month: u32,
    now: DateTime<Utc>,
) -> Result<CalendarView> {
    let sessions = db::daily_sessions::for_month(pool, user_id, year, month).await?;

    let days = sessions
        .iter()
        .map(|s| CalendarDay {
            date: s.session_date,
            completed: true,
            xp: s.minutes_total * XP_PER_MINUTE
                + s.reviews_successful
                + s.new_ayahs_memorized * XP_PER_NEW_AYAH,
            minutes_total: s.minutes_total,
            reviews_total: s.reviews_total,
            new_ayahs_memorized: s.new_ayahs_memorized,
        })
        .collect();

    let all_dates = db::daily_sessions::active_dates(pool, user_id).await?;
    let (current_streak, longest_streak) = streaks(&all_dates, time::utc_day(&now));

    Ok(CalendarView {
        month: format!("{:04}-{:02}", year, month),
        days,
        current_streak,
        longest_streak,
    })
}

/// Streaks from consecutive active UTC days. The current streak survives
/// until a full day has been missed (today not yet practiced counts).
pub fn streaks(active_dates: &[NaiveDate], today: NaiveDate) -> (i64, i64) {
    if active_dates.is_empty() {
        return (0, 0);
    }

    let mut sorted = active_dates.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut longest = 1i64;
    let mut run = 1i64;
    let mut last = sorted[0];
    for pair in sorted.windows(2) {
        if time::days_between(pair[0], pair[1]) == 1 {
            run += 1;
        } else {
            run = 1;
        }
        longest = longest.max(run);
        last = pair[1];
    }

    let current = if time::days_between(last, today) <= 1 { run } else { 0 };

    (current, longest)
}

// ============================================================================
// Achievements
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

#[derive(Debug, Clone, Serialize)]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub rarity: Rarity,
    pub earned: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AchievementsView {
    pub achievements: Vec<Achievement>,
    pub earned_count: usize,
}

/// Evaluate the nine fixed badges
pub async fn achievements(
    pool: &SqlitePool,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<AchievementsView> {
    let states = db::item_states::all_for_user(pool, user_id).await?;
    let memorized = states
        .iter()
        .filter(|s| s.status == ItemStatus::Memorized)
        .count() as i64;
    let manzil = states
        .iter()
        .filter(|s| s.tier == ReviewTier::Manzil)
        .count() as i64;

    let active_dates = db::daily_sessions::active_dates(pool, user_id).await?;
    let (current_streak, longest_streak) = streaks(&active_dates, time::utc_day(&now));
    let best_streak = current_streak.max(longest_streak);

    let retention_days = db::daily_sessions::retention_by_date(pool, user_id).await?;
    let perfect_week = has_perfect_week(&retention_days);

    let juz_complete = juz_complete(pool, &states).await?;

    let achievements = vec![
        Achievement {
            id: "first_steps",
            name: "First Steps",
            description: "Memorize your first ayah",
            rarity: Rarity::Common,
            earned: memorized >= 1,
        },
        Achievement {
            id: "ten_ayahs",
            name: "Ten Ayahs",
            description: "Memorize 10 ayahs",
            rarity: Rarity::Common,
            earned: memorized >= 10,
        },
        Achievement {
            id: "week_streak",
            name: "Week of Consistency",
            description: "Practice 7 days in a row",
            rarity: Rarity::Common,
            earned: best_streak >= 7,
        },
        Achievement {
            id: "first_manzil",
            name: "Long-Term Keeper",
            description: "Carry an ayah into the Manzil tier",
            rarity: Rarity::Uncommon,
            earned: manzil >= 1,
        },
        Achievement {
            id: "fifty_ayahs",
            name: "Fifty Ayahs",
            description: "Memorize 50 ayahs",
            rarity: Rarity::Uncommon,
            earned: memorized >= 50,
        },
        Achievement {
            id: "month_streak",
            name: "Month of Consistency",
            description: "Practice 30 days in a row",
            rarity: Rarity::Rare,
            earned: best_streak >= 30,
        },
        Achievement {
            id: "centurion",
            name: "Centurion",
            description: "Memorize 100 ayahs",
            rarity: Rarity::Rare,
            earned: memorized >= 100,
        },
        Achievement {
            id: "perfect_week",
            name: "Perfect Week",
            description: "Seven consecutive days without a single failed review",
            rarity: Rarity::Epic,
            earned: perfect_week,
        },
        Achievement {
            id: "juz_complete",
            name: "Juz Complete",
            description: "Memorize every ayah of a juz",
            rarity: Rarity::Legendary,
            earned: juz_complete,
        },
    ];

    let earned_count = achievements.iter().filter(|a| a.earned).count();
    Ok(AchievementsView {
        achievements,
        earned_count,
    })
}

fn has_perfect_week(retention_days: &[(NaiveDate, f64)]) -> bool {
    let mut sorted = retention_days.to_vec();
    sorted.sort_by_key(|(d, _)| *d);

    let mut run = 0i64;
    let mut prev: Option<NaiveDate> = None;
    for (date, retention) in sorted {
        let perfect = retention >= 1.0;
        let consecutive = prev.map(|p| time::days_between(p, date) == 1).unwrap_or(false);
        run = if perfect {
            if consecutive { run + 1 } else { 1 }
        } else {
            0
        };
        if run >= 7 {
            return true;
        }
        prev = Some(date);
    }
    false
}

async fn juz_complete(
    pool: &SqlitePool,
    states: &[crate::models::UserItemState],
) -> Result<bool> {
    let totals = db::ayahs::juz_totals(pool).await?;
    if totals.is_empty() {
        return Ok(false);
    }

    let memorized_ids: Vec<i64> = states
        .iter()
        .filter(|s| s.status == ItemStatus::Memorized)
        .map(|s| s.ayah_id)
        .collect();
    if memorized_ids.is_empty() {
        return Ok(false);
    }

    let memorized_by_juz = db::ayahs::juz_counts_for_ids(pool, &memorized_ids).await?;
    let totals: HashMap<i64, i64> = totals.into_iter().collect();

    Ok(memorized_by_juz
        .iter()
        .any(|(juz, count)| totals.get(juz).is_some_and(|total| count >= total)))
}

// ============================================================================
// Progress
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ProgressView {
    pub memorized_ayahs: i64,
    pub learning_ayahs: i64,
    pub overall_retention: f64,
    pub checkpoint_distribution: [i64; 8],
    pub weak_transitions: i64,
    pub strong_transitions: i64,
    pub recommendation: String,
}

pub async fn progress(pool: &SqlitePool, user_id: Uuid) -> Result<ProgressView> {
    let states = db::item_states::all_for_user(pool, user_id).await?;

    let memorized_ayahs = states
        .iter()
        .filter(|s| s.status == ItemStatus::Memorized)
        .count() as i64;
    let learning_ayahs = states
        .iter()
        .filter(|s| s.status == ItemStatus::Learning)
        .count() as i64;

    let total_reviews: i64 = states.iter().map(|s| s.total_reviews).sum();
    let successful_reviews: i64 = states.iter().map(|s| s.successful_reviews).sum();
    let overall_retention = if total_reviews == 0 {
        1.0
    } else {
        successful_reviews as f64 / total_reviews as f64
    };

    let mut checkpoint_distribution = [0i64; 8];
    for s in &states {
        let idx = s.interval_checkpoint_index.clamp(0, 7) as usize;
        checkpoint_distribution[idx] += 1;
    }

    let transitions = db::transitions::all_for_user(pool, user_id).await?;
    let weak_transitions = transitions
        .iter()
        .filter(|t| t.attempt_count >= 3 && t.success_rate() < 0.70)
        .count() as i64;
    let strong_transitions = transitions
        .iter()
        .filter(|t| t.attempt_count >= 3 && t.success_rate() >= 0.90)
        .count() as i64;

    let recommendation = recommend(overall_retention, weak_transitions, learning_ayahs);

    Ok(ProgressView {
        memorized_ayahs,
        learning_ayahs,
        overall_retention,
        checkpoint_distribution,
        weak_transitions,
        strong_transitions,
        recommendation,
    })
}

fn recommend(retention: f64, weak_transitions: i64, learning_ayahs: i64) -> String {
    if retention < 0.80 {
        "Retention is slipping. Reduce new material and spend the next sessions consolidating due reviews.".to_string()
    } else if weak_transitions > 5 {
        "Several ayah-to-ayah links are weak. Prioritize link repair before adding new material.".to_string()
    } else if learning_ayahs == 0 {
        "All current items are holding. A good day to introduce new ayahs.".to_string()
    } else {
        "Steady progress. Keep the daily rhythm of warm-up, review, then new material.".to_string()
    }
}

// ============================================================================
// Stats
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct StatsView {
    pub memorized_ayahs: i64,
    pub learning_ayahs: i64,
    pub manzil_ayahs: i64,
    pub total_reviews: i64,
    pub overall_retention: f64,
    pub current_streak: i64,
    pub minutes_last_30_days: i64,
}

pub async fn stats(pool: &SqlitePool, user_id: Uuid, now: DateTime<Utc>) -> Result<StatsView> {
    let states = db::item_states::all_for_user(pool, user_id).await?;

    let memorized_ayahs = states
        .iter()
        .filter(|s| s.status == ItemStatus::Memorized)
        .count() as i64;
    let learning_ayahs = states
        .iter()
        .filter(|s| s.status == ItemStatus::Learning)
        .count() as i64;
    let manzil_ayahs = states
        .iter()
        .filter(|s| s.tier == ReviewTier::Manzil)
        .count() as i64;

    let total_reviews: i64 = states.iter().map(|s| s.total_reviews).sum();
    let successful_reviews: i64 = states.iter().map(|s| s.successful_reviews).sum();
    let overall_retention = if total_reviews == 0 {
        1.0
    } else {
        successful_reviews as f64 / total_reviews as f64
    };

    let active_dates = db::daily_sessions::active_dates(pool, user_id).await?;
    let (current_streak, _) = streaks(&active_dates, time::utc_day(&now));

    let from_day = time::utc_day(&now) - Duration::days(29);
    let minutes_last_30_days =
        db::daily_sessions::minutes_since(pool, user_id, from_day).await?;

    Ok(StatsView {
        memorized_ayahs,
        learning_ayahs,
        manzil_ayahs,
        total_reviews,
        overall_retention,
        current_streak,
        minutes_last_30_days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        time::parse_day(s).unwrap()
    }

    #[test]
    fn test_streaks_empty() {
        assert_eq!(streaks(&[], d("2026-02-11")), (0, 0));
    }

    #[test]
    fn test_streak_includes_today_grace() {
        let dates = [d("2026-02-08"), d("2026-02-09"), d("2026-02-10")];
        // Practiced through yesterday: streak still alive today
        assert_eq!(streaks(&dates, d("2026-02-11")), (3, 3));
        // Two full days missed: current streak gone
        assert_eq!(streaks(&dates, d("2026-02-12")), (0, 3));
    }

    #[test]
    fn test_longest_streak_across_gap() {
        let dates = [
            d("2026-01-01"),
            d("2026-01-02"),
            d("2026-01-03"),
            d("2026-01-10"),
            d("2026-01-11"),
        ];
        let (current, longest) = streaks(&dates, d("2026-01-11"));
        assert_eq!(current, 2);
        assert_eq!(longest, 3);
    }

    #[test]
    fn test_perfect_week_detection() {
        let days: Vec<(NaiveDate, f64)> = (1..=7)
            .map(|i| (d(&format!("2026-02-{:02}", i)), 1.0))
            .collect();
        assert!(has_perfect_week(&days));

        let mut broken = days.clone();
        broken[3].1 = 0.9;
        assert!(!has_perfect_week(&broken));

        // Six days is not enough
        assert!(!has_perfect_week(&days[..6]));
    }

    #[test]
    fn test_perfect_week_requires_consecutive_days() {
        let mut days: Vec<(NaiveDate, f64)> = (1..=6)
            .map(|i| (d(&format!("2026-02-{:02}", i)), 1.0))
            .collect();
        days.push((d("2026-02-08"), 1.0));
        assert!(!has_perfect_week(&days));
    }

    #[test]
    fn test_recommendation_priorities() {
        assert!(recommend(0.7, 0, 5).contains("consolidating"));
        assert!(recommend(0.9, 6, 5).contains("link repair"));
        assert!(recommend(0.9, 0, 0).contains("new ayahs"));
    }
}
