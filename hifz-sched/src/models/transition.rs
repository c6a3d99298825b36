//! Inter-ayah transition strength
//!
//! One row per (user, from, to) pair, updated by LINK-step review events and
//! by explicit transition attempts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Attempts before a transition can be judged weak
pub const WEAK_MIN_ATTEMPTS: i64 = 3;

/// Success rate below which a practiced transition counts as weak
pub const WEAK_MAX_SUCCESS_RATE: f64 = 0.70;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionScore {
    pub user_id: Uuid,
    pub from_ayah_id: i64,
    pub to_ayah_id: i64,
    pub attempt_count: i64,
    pub success_count: i64,
    pub last_practiced_at: DateTime<Utc>,
}

impl TransitionScore {
    pub fn success_rate(&self) -> f64 {
        if self.attempt_count == 0 {
            return 1.0;
        }
        self.success_count as f64 / self.attempt_count as f64
    }

    pub fn is_weak(&self) -> bool {
        self.attempt_count >= WEAK_MIN_ATTEMPTS && self.success_rate() < WEAK_MAX_SUCCESS_RATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn score(attempts: i64, successes: i64) -> TransitionScore {
        TransitionScore {
            user_id: Uuid::nil(),
            from_ayah_id: 1,
            to_ayah_id: 2,
            attempt_count: attempts,
            success_count: successes,
            last_practiced_at: Utc::now(),
        }
    }

    #[test]
    fn test_weak_requires_three_attempts() {
        assert!(!score(2, 0).is_weak());
        assert!(score(3, 2).is_weak());
    }

    #[test]
    fn test_weak_boundary_rate() {
        // 7/10 = 0.70 is not weak; 6/10 is
        assert!(!score(10, 7).is_weak());
        assert!(score(10, 6).is_weak());
    }

    #[test]
    fn test_unpracticed_rate_defaults_high() {
        assert_eq!(score(0, 0).success_rate(), 1.0);
    }
}
