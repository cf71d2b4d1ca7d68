//! Ranking of an event's participants.
//!
//! Order is score descending, then `user_id` ascending. Ranks are 1-based
//! and strictly increasing: equal scores never share a rank. The cached
//! top-N is a projection rebuilt from the full score set; a participant's
//! own rank is always computed from fresh scores. When that fresh rank
//! contradicts the served entries the projection is rebuilt on the spot,
//! so one response never shows two users at the same rank.

use crate::cache::SnapshotCache;
use crate::config::{Config, ScoringConfig};
use crate::error::AppError;
use crate::models::leaderboard::*;
use crate::models::score::ScoreState;
use crate::services::accumulator::decayed_since;
use crate::store::{EventCatalog, ProfileDirectory, ScoreStore};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedBoard {
    pub participants: usize,
    pub top: Vec<RankedScore>,
}

pub type LeaderboardCache = SnapshotCache<String, RankedBoard>;

fn standing_order(a: (&str, f64), b: (&str, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0))
}

/// `(user_id, score)` pairs as they should be displayed at `now`.
pub fn displayed_scores(
    states: &[ScoreState],
    now: DateTime<Utc>,
    params: &ScoringConfig,
) -> Vec<(String, f64)> {
    states
        .iter()
        .map(|s| {
            (
                s.user_id.clone(),
                decayed_since(s.score, s.last_update_at, now, params),
            )
        })
        .collect()
}

pub fn rank_scores(mut scores: Vec<(String, f64)>) -> Vec<RankedScore> {
    scores.sort_by(|a, b| standing_order((a.0.as_str(), a.1), (b.0.as_str(), b.1)));
    scores
        .into_iter()
        .enumerate()
        .map(|(i, (user_id, score))| RankedScore {
            rank: i as u32 + 1,
            user_id,
            score,
        })
        .collect()
}

/// Rank of one participant without sorting the whole field.
pub fn rank_of(scores: &[(String, f64)], user_id: &str) -> Option<RankedScore> {
    let (_, score) = scores.iter().find(|(id, _)| id == user_id)?;
    let ahead = scores
        .iter()
        .filter(|(id, s)| standing_order((id.as_str(), *s), (user_id, *score)) == Ordering::Less)
        .count();
    Some(RankedScore {
        rank: ahead as u32 + 1,
        user_id: user_id.to_string(),
        score: *score,
    })
}

/// Whether `me` can sit beside `top` in one response: nobody else holds
/// its rank and it is not listed at a different one.
fn agrees_with(top: &[RankedScore], me: &RankedScore) -> bool {
    top.iter().all(|r| (r.user_id == me.user_id) == (r.rank == me.rank))
}

fn board_from(
    states: &[ScoreState],
    size: usize,
    params: &ScoringConfig,
    now: DateTime<Utc>,
) -> RankedBoard {
    let mut top = rank_scores(displayed_scores(states, now, params));
    top.truncate(size);
    RankedBoard {
        participants: states.len(),
        top,
    }
}

pub fn build_board<S: ScoreStore + ?Sized>(
    store: &S,
    event_id: &str,
    size: usize,
    params: &ScoringConfig,
    now: DateTime<Utc>,
) -> Result<RankedBoard, AppError> {
    let states = store.scores_for_event(event_id)?;
    Ok(board_from(&states, size, params, now))
}

pub fn refresh_board<S: ScoreStore + ?Sized>(
    store: &S,
    cache: &LeaderboardCache,
    config: &Config,
    event_id: &str,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let board = build_board(
        store,
        event_id,
        config.leaderboard.cache_size,
        &config.scoring,
        now,
    )?;
    cache.install(event_id.to_string(), board);
    Ok(())
}

pub fn get_leaderboard<S>(
    store: &S,
    cache: &LeaderboardCache,
    config: &Config,
    event_id: &str,
    query: &LeaderboardQuery,
    now: DateTime<Utc>,
) -> Result<Leaderboard, AppError>
where
    S: EventCatalog + ScoreStore + ProfileDirectory + ?Sized,
{
    if store.event(event_id)?.is_none() {
        return Err(AppError::NotFound(format!("Event {}", event_id)));
    }

    let max_n = config.leaderboard.cache_size;
    let top_n = query
        .top_n
        .unwrap_or(config.leaderboard.default_top_n)
        .clamp(1, max_n);

    let mut snapshot = cache.get_or_build(&event_id.to_string(), || {
        build_board(store, event_id, max_n, &config.scoring, now)
    })?;

    let self_rank = match query.user_id.as_deref() {
        Some(user_id) => {
            let states = store.scores_for_event(event_id)?;
            let me = rank_of(&displayed_scores(&states, now, &config.scoring), user_id);
            if let Some(me) = &me {
                let served = &snapshot.value.top[..snapshot.value.top.len().min(top_n)];
                if !agrees_with(served, me) {
                    tracing::debug!(
                        event_id,
                        user_id,
                        rank = me.rank,
                        "Cached leaderboard contradicts fresh rank, rebuilding"
                    );
                    let board = board_from(&states, max_n, &config.scoring, now);
                    snapshot = cache.install(event_id.to_string(), board);
                }
            }
            me
        }
        None => None,
    };

    let board = &snapshot.value;
    let top = &board.top[..board.top.len().min(top_n)];

    let user_ids: Vec<String> = top.iter().map(|r| r.user_id.clone()).collect();
    let mut profiles = store.profiles(&user_ids)?;

    let entries = top
        .iter()
        .map(|r| {
            let profile = profiles.remove(&r.user_id);
            LeaderboardEntry {
                event_id: event_id.to_string(),
                user_id: r.user_id.clone(),
                score: r.score,
                rank: r.rank,
                display_name: profile.as_ref().map(|p| p.display_name.clone()),
                avatar_ref: profile.and_then(|p| p.avatar_ref),
            }
        })
        .collect();

    Ok(Leaderboard {
        event_id: event_id.to_string(),
        generation: snapshot.generation,
        participants: board.participants,
        entries,
        self_rank,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, f64)]) -> Vec<(String, f64)> {
        pairs.iter().map(|(u, s)| (u.to_string(), *s)).collect()
    }

    #[test]
    fn equal_scores_rank_by_user_id() {
        let ranked = rank_scores(scores(&[("b", 50.0), ("a", 50.0)]));
        assert_eq!(ranked[0].user_id, "a");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].user_id, "b");
        assert_eq!(ranked[1].rank, 2);
    }

    #[test]
    fn ranks_are_dense_and_strict() {
        let ranked = rank_scores(scores(&[
            ("d", 3.0),
            ("a", 9.0),
            ("c", 3.0),
            ("b", 9.0),
            ("e", 0.0),
        ]));
        let order: Vec<_> = ranked.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(order, ["a", "b", "c", "d", "e"]);
        let ranks: Vec<_> = ranked.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn point_lookup_agrees_with_full_sort() {
        let field = scores(&[
            ("m", 12.0),
            ("k", 40.0),
            ("z", 12.0),
            ("a", 1.5),
            ("q", 40.0),
            ("b", 12.0),
        ]);
        let ranked = rank_scores(field.clone());
        for r in &ranked {
            assert_eq!(rank_of(&field, &r.user_id).as_ref(), Some(r));
        }
        assert_eq!(rank_of(&field, "nobody"), None);
    }

    #[test]
    fn fresh_rank_must_match_served_entries() {
        let top = rank_scores(scores(&[("a", 9.0), ("b", 4.0)]));
        let at = |user: &str, rank| RankedScore {
            rank,
            user_id: user.into(),
            score: 1.0,
        };
        assert!(agrees_with(&top, &at("a", 1)));
        assert!(agrees_with(&top, &at("z", 3)));
        assert!(!agrees_with(&top, &at("z", 1)));
        assert!(!agrees_with(&top, &at("b", 3)));
        assert!(!agrees_with(&top, &at("b", 1)));
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let forward = scores(&[("x", 2.0), ("y", 2.0), ("w", 5.0)]);
        let mut backward = forward.clone();
        backward.reverse();
        assert_eq!(rank_scores(forward), rank_scores(backward));
    }
}
