//! Decayed running score per `(event_id, user_id)`.
//!
//! Every accepted batch applies `score * decay + increment` exactly once,
//! so the decay rate is per batch rather than per second: clients that
//! flush more often decay faster. Updates to one key run under that key's
//! lock and are additionally guarded by the stored row version.

use crate::config::ScoringConfig;
use crate::error::AppError;
use crate::models::score::ScoreState;
use crate::store::ScoreStore;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

const LOCK_PRUNE_THRESHOLD: usize = 4096;

type ScoreKey = (String, String);

/// Energy of one observation before it enters the running score.
pub fn sample_contribution(magnitude: f64, step_count: i64, params: &ScoringConfig) -> f64 {
    magnitude.clamp(0.0, params.max_magnitude) + step_count.max(0) as f64 * params.step_weight
}

pub fn decay_step(score: f64, decay: f64, increment: f64) -> f64 {
    score * decay + increment
}

/// Score as shown on read paths when idle decay is enabled: one decay
/// step per full interval elapsed since the last update. Pure in its
/// inputs, so repeated reads never compound.
pub fn decayed_since(
    score: f64,
    last_update_at: DateTime<Utc>,
    now: DateTime<Utc>,
    params: &ScoringConfig,
) -> f64 {
    let Some(interval) = params.idle_decay_interval else {
        return score;
    };
    let interval_ms = interval.as_millis() as i64;
    let elapsed_ms = (now - last_update_at).num_milliseconds();
    if interval_ms <= 0 || elapsed_ms < interval_ms {
        return score;
    }
    let steps = (elapsed_ms / interval_ms).min(i32::MAX as i64) as i32;
    score * params.decay.powi(steps)
}

#[derive(Default)]
struct KeyedLocks {
    locks: Mutex<HashMap<ScoreKey, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    fn lock_for(&self, event_id: &str, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.len() >= LOCK_PRUNE_THRESHOLD {
            // Only the map holds idle locks; anything cloned out is in use.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        locks
            .entry((event_id.to_string(), user_id.to_string()))
            .or_default()
            .clone()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

pub struct ScoreAccumulator {
    params: ScoringConfig,
    locks: KeyedLocks,
}

impl ScoreAccumulator {
    pub fn new(params: ScoringConfig) -> Self {
        Self {
            params,
            locks: KeyedLocks::default(),
        }
    }

    pub fn params(&self) -> &ScoringConfig {
        &self.params
    }

    /// Applies one batch worth of `increment` and returns the stored state.
    pub fn apply<S: ScoreStore + ?Sized>(
        &self,
        store: &S,
        event_id: &str,
        user_id: &str,
        increment: f64,
        at: DateTime<Utc>,
    ) -> Result<ScoreState, AppError> {
        let lock = self.locks.lock_for(event_id, user_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        for attempt in 0..2 {
            let current = store.load_score(event_id, user_id)?;
            let expected_version = current.as_ref().map(|s| s.version);
            let base = current.unwrap_or_else(|| ScoreState::new(event_id, user_id, at));

            let next = ScoreState {
                score: decay_step(base.score, self.params.decay, increment),
                last_update_at: base.last_update_at.max(at),
                version: base.version + 1,
                ..base
            };

            if store.save_score(&next, expected_version)? {
                tracing::debug!(
                    event_id,
                    user_id,
                    score = next.score,
                    version = next.version,
                    "Score updated"
                );
                return Ok(next);
            }
            tracing::warn!(event_id, user_id, attempt, "Score version moved underneath update");
        }

        Err(AppError::Conflict(format!("score {}/{}", event_id, user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Db;
    use chrono::TimeZone;
    use std::cell::Cell;
    use std::time::Duration;

    fn params() -> ScoringConfig {
        ScoringConfig::default()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn contribution_clamps_magnitude_and_weights_steps() {
        let p = params();
        assert_eq!(sample_contribution(2.0, 0, &p), 2.0);
        assert_eq!(sample_contribution(0.0, 1, &p), 3.0);
        assert_eq!(sample_contribution(500.0, 0, &p), p.max_magnitude);
    }

    #[test]
    fn two_batches_decay_once_between() {
        let db = Db::open_in_memory().unwrap();
        let acc = ScoreAccumulator::new(params());
        let first = acc.apply(&db, "ev", "u", 2.0, at(0)).unwrap();
        assert_eq!(first.score, 2.0);
        let second = acc
            .apply(&db, "ev", "u", sample_contribution(0.0, 1, &params()), at(30))
            .unwrap();
        assert!((second.score - 4.96).abs() < 1e-9);
        assert_eq!(second.version, 2);
        assert_eq!(second.last_update_at, at(30));
    }

    #[test]
    fn score_never_drops_below_one_decay_step() {
        let db = Db::open_in_memory().unwrap();
        let acc = ScoreAccumulator::new(params());
        let mut previous = 0.0;
        for (i, inc) in [5.0, 0.0, 0.0, 12.5, 0.0, 0.3].into_iter().enumerate() {
            let state = acc.apply(&db, "ev", "u", inc, at(i as i64)).unwrap();
            assert!(state.score >= previous * params().decay);
            previous = state.score;
        }
    }

    #[test]
    fn idle_decay_is_a_function_of_elapsed_intervals() {
        let mut p = params();
        assert_eq!(decayed_since(10.0, at(0), at(3600), &p), 10.0);

        p.idle_decay_interval = Some(Duration::from_secs(60));
        assert_eq!(decayed_since(10.0, at(0), at(59), &p), 10.0);
        assert!((decayed_since(10.0, at(0), at(60), &p) - 9.8).abs() < 1e-9);
        assert!((decayed_since(10.0, at(0), at(150), &p) - 10.0 * 0.98 * 0.98).abs() < 1e-9);
        // Clock skew never inflates a score.
        assert_eq!(decayed_since(10.0, at(100), at(0), &p), 10.0);
    }

    #[test]
    fn concurrent_batches_for_one_user_are_serialized() {
        let db = Arc::new(Db::open_in_memory().unwrap());
        let acc = Arc::new(ScoreAccumulator::new(params()));
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                let acc = acc.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        acc.apply(db.as_ref(), "ev", "u", 1.0, Utc::now()).unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let state = db.load_score("ev", "u").unwrap().unwrap();
        assert_eq!(state.version, 200);
        // Sum of 200 unit increments under per-batch decay.
        let expected = (1.0 - 0.98f64.powi(200)) / (1.0 - 0.98);
        assert!((state.score - expected).abs() < 1e-6);
    }

    struct AlwaysStale {
        saves: Cell<u32>,
    }

    impl ScoreStore for AlwaysStale {
        fn load_score(&self, _: &str, _: &str) -> Result<Option<ScoreState>, AppError> {
            Ok(None)
        }

        fn save_score(&self, _: &ScoreState, _: Option<i64>) -> Result<bool, AppError> {
            self.saves.set(self.saves.get() + 1);
            Ok(false)
        }

        fn scores_for_event(&self, _: &str) -> Result<Vec<ScoreState>, AppError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn lost_race_retries_once_then_conflicts() {
        let store = AlwaysStale { saves: Cell::new(0) };
        let acc = ScoreAccumulator::new(params());
        let err = acc.apply(&store, "ev", "u", 1.0, at(0)).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.saves.get(), 2);
    }

    #[test]
    fn idle_locks_are_pruned() {
        let locks = KeyedLocks::default();
        for i in 0..LOCK_PRUNE_THRESHOLD {
            locks.lock_for("ev", &format!("u{}", i));
        }
        let held = locks.lock_for("ev", "held");
        assert_eq!(locks.len(), 1);
        drop(held);
    }
}
