use crate::error::AppError;
use crate::models::event::Event;
use crate::models::leaderboard::Profile;
use crate::models::samples::AcceptedSample;
use crate::models::score::ScoreState;
use crate::models::timeline::Contribution;
use crate::store::{EventCatalog, ProfileDirectory, SampleArchive, SampleSource, ScoreStore};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

const SCHEMA: &str = include_str!("schema.sql");

pub struct Db {
    conn: Mutex<Connection>,
}

impl Db {
    pub fn open(path: &str, busy_timeout: Duration) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Db {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Db {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| AppError::StorageUnavailable("connection lock poisoned".into()))?;
        Ok(f(&conn)?)
    }

    pub fn insert_event(&self, event: &Event) -> Result<(), AppError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO events (id, name, starts_at, ends_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    event.id,
                    event.name,
                    event.starts_at.timestamp_millis(),
                    event.ends_at.map(|t| t.timestamp_millis()),
                ],
            )?;
            Ok(())
        })
    }

    /// Sets `ends_at` unless the event already has one. Returns whether a
    /// row matched the id.
    pub fn close_event(&self, event_id: &str, at: DateTime<Utc>) -> Result<bool, AppError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE events SET ends_at = COALESCE(ends_at, ?2) WHERE id = ?1",
                params![event_id, at.timestamp_millis()],
            )
            .map(|changed| changed == 1)
        })
    }

    #[cfg(test)]
    pub fn upsert_profile(&self, user_id: &str, profile: &Profile) -> Result<(), AppError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO profiles (user_id, display_name, avatar_ref) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET display_name = ?2, avatar_ref = ?3",
                params![user_id, profile.display_name, profile.avatar_ref],
            )?;
            Ok(())
        })
    }
}

fn timestamp(row: &Row<'_>, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    let ms: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ms))
}

fn score_state_from_row(row: &Row<'_>) -> Result<ScoreState, rusqlite::Error> {
    Ok(ScoreState {
        event_id: row.get(0)?,
        user_id: row.get(1)?,
        score: row.get(2)?,
        last_update_at: timestamp(row, 3)?,
        version: row.get(4)?,
    })
}

impl EventCatalog for Db {
    fn event(&self, event_id: &str) -> Result<Option<Event>, AppError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, starts_at, ends_at FROM events WHERE id = ?1",
                params![event_id],
                |row| {
                    let ends_at = match row.get::<_, Option<i64>>(3)? {
                        Some(_) => Some(timestamp(row, 3)?),
                        None => None,
                    };
                    Ok(Event {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        starts_at: timestamp(row, 2)?,
                        ends_at,
                    })
                },
            )
            .optional()
        })
    }
}

impl ScoreStore for Db {
    fn load_score(&self, event_id: &str, user_id: &str) -> Result<Option<ScoreState>, AppError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT event_id, user_id, score, last_update_at, version
                 FROM score_states WHERE event_id = ?1 AND user_id = ?2",
                params![event_id, user_id],
                score_state_from_row,
            )
            .optional()
        })
    }

    fn save_score(
        &self,
        state: &ScoreState,
        expected_version: Option<i64>,
    ) -> Result<bool, AppError> {
        self.with_conn(|conn| {
            let changed = match expected_version {
                None => conn.execute(
                    "INSERT INTO score_states (event_id, user_id, score, last_update_at, version)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(event_id, user_id) DO NOTHING",
                    params![
                        state.event_id,
                        state.user_id,
                        state.score,
                        state.last_update_at.timestamp_millis(),
                        state.version,
                    ],
                )?,
                Some(expected) => conn.execute(
                    "UPDATE score_states SET score = ?3, last_update_at = ?4, version = ?5
                     WHERE event_id = ?1 AND user_id = ?2 AND version = ?6",
                    params![
                        state.event_id,
                        state.user_id,
                        state.score,
                        state.last_update_at.timestamp_millis(),
                        state.version,
                        expected,
                    ],
                )?,
            };
            Ok(changed == 1)
        })
    }

    fn scores_for_event(&self, event_id: &str) -> Result<Vec<ScoreState>, AppError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT event_id, user_id, score, last_update_at, version
                 FROM score_states WHERE event_id = ?1",
            )?;
            let rows = stmt.query_map(params![event_id], score_state_from_row)?;
            rows.collect()
        })
    }
}

impl SampleArchive for Db {
    fn archive(&self, samples: &[AcceptedSample]) -> Result<(), AppError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO motion_samples
                     (id, event_id, user_id, observed_at, magnitude, step_count, contribution)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )?;
                for s in samples {
                    stmt.execute(params![
                        s.id,
                        s.event_id,
                        s.user_id,
                        s.observed_at.timestamp_millis(),
                        s.magnitude,
                        s.step_count,
                        s.contribution,
                    ])?;
                }
            }
            tx.commit()
        })
    }
}

impl SampleSource for Db {
    fn contributions_between(
        &self,
        event_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Contribution>, AppError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT observed_at, contribution FROM motion_samples
                 WHERE event_id = ?1 AND observed_at >= ?2 AND observed_at < ?3",
            )?;
            let rows = stmt.query_map(
                params![event_id, from.timestamp_millis(), to.timestamp_millis()],
                |row| {
                    Ok(Contribution {
                        observed_at: timestamp(row, 0)?,
                        energy: row.get(1)?,
                    })
                },
            )?;
            rows.collect()
        })
    }
}

impl ProfileDirectory for Db {
    fn profiles(&self, user_ids: &[String]) -> Result<HashMap<String, Profile>, AppError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = vec!["?"; user_ids.len()].join(", ");
        let sql = format!(
            "SELECT user_id, display_name, avatar_ref FROM profiles WHERE user_id IN ({})",
            placeholders
        );
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(user_ids.iter()), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    Profile {
                        display_name: row.get(1)?,
                        avatar_ref: row.get(2)?,
                    },
                ))
            })?;
            rows.collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn save_score_rejects_stale_version() {
        let db = Db::open_in_memory().unwrap();
        let mut state = ScoreState::new("ev", "alice", at(0));
        state.version = 1;
        state.score = 2.0;
        assert!(db.save_score(&state, None).unwrap());
        // A second insert for the same key loses the race.
        assert!(!db.save_score(&state, None).unwrap());

        state.version = 2;
        state.score = 4.0;
        assert!(db.save_score(&state, Some(1)).unwrap());
        assert!(!db.save_score(&state, Some(1)).unwrap());

        let loaded = db.load_score("ev", "alice").unwrap().unwrap();
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.score, 4.0);
        assert_eq!(loaded.last_update_at, at(0));
    }

    #[test]
    fn contributions_respect_half_open_range() {
        let db = Db::open_in_memory().unwrap();
        let sample = |id: &str, secs: i64| AcceptedSample {
            id: id.into(),
            event_id: "ev".into(),
            user_id: "u".into(),
            observed_at: at(secs),
            magnitude: 1.0,
            step_count: 0,
            contribution: 1.0,
        };
        db.archive(&[sample("a", 0), sample("b", 59), sample("c", 60)])
            .unwrap();
        let found = db.contributions_between("ev", at(0), at(60)).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|c| c.observed_at < at(60)));
    }

    #[test]
    fn close_event_keeps_first_end() {
        let db = Db::open_in_memory().unwrap();
        db.insert_event(&Event {
            id: "ev".into(),
            name: "Show".into(),
            starts_at: at(0),
            ends_at: None,
        })
        .unwrap();
        assert!(db.close_event("ev", at(100)).unwrap());
        assert!(db.close_event("ev", at(200)).unwrap());
        assert!(!db.close_event("missing", at(200)).unwrap());
        let event = db.event("ev").unwrap().unwrap();
        assert_eq!(event.ends_at, Some(at(100)));
    }

    #[test]
    fn profiles_lookup_skips_unknown_users() {
        let db = Db::open_in_memory().unwrap();
        db.upsert_profile(
            "a",
            &Profile {
                display_name: "Ada".into(),
                avatar_ref: None,
            },
        )
        .unwrap();
        let found = db.profiles(&["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found["a"].display_name, "Ada");
    }
}
