use anyhow::{bail, Context, Result};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub storage_timeout: Duration,
    pub scoring: ScoringConfig,
    pub timeline: TimelineConfig,
    pub leaderboard: LeaderboardConfig,
}

/// Parameters of the per-batch score update.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Multiplier applied once per accepted batch, in (0, 1).
    pub decay: f64,
    pub step_weight: f64,
    pub max_magnitude: f64,
    /// Magnitudes below this with no steps count as "still".
    pub stillness_threshold: f64,
    /// When set, read paths show `score * decay^(idle intervals)`.
    pub idle_decay_interval: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct TimelineConfig {
    pub default_resolution_secs: i64,
    pub min_bucket_secs: i64,
    pub max_bucket_secs: i64,
    pub peak_window_secs: i64,
    pub peak_count: usize,
    pub cache_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct LeaderboardConfig {
    pub cache_size: usize,
    pub cache_ttl: Duration,
    pub refresh_interval: Duration,
    pub default_top_n: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            decay: 0.98,
            step_weight: 3.0,
            max_magnitude: 50.0,
            stillness_threshold: 0.05,
            idle_decay_interval: None,
        }
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            default_resolution_secs: 60,
            min_bucket_secs: 10,
            max_bucket_secs: 600,
            peak_window_secs: 120,
            peak_count: 3,
            cache_ttl: Duration::from_millis(3000),
        }
    }
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            cache_size: 100,
            cache_ttl: Duration::from_millis(3000),
            refresh_interval: Duration::from_secs(5),
            default_top_n: 20,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3001,
            database_path: "crowd-energy.db".into(),
            storage_timeout: Duration::from_millis(5000),
            scoring: ScoringConfig::default(),
            timeline: TimelineConfig::default(),
            leaderboard: LeaderboardConfig::default(),
        }
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

fn env_opt<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        Err(_) => Ok(None),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let scoring = ScoringConfig {
            decay: env_or("SCORE_DECAY", defaults.scoring.decay)?,
            step_weight: env_or("STEP_WEIGHT", defaults.scoring.step_weight)?,
            max_magnitude: env_or("MAX_MAGNITUDE", defaults.scoring.max_magnitude)?,
            stillness_threshold: env_or(
                "STILLNESS_THRESHOLD",
                defaults.scoring.stillness_threshold,
            )?,
            idle_decay_interval: env_opt::<u64>("IDLE_DECAY_INTERVAL_SECS")?
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        };

        let timeline = TimelineConfig {
            default_resolution_secs: env_or(
                "DEFAULT_RESOLUTION_SECS",
                defaults.timeline.default_resolution_secs,
            )?,
            min_bucket_secs: env_or("MIN_BUCKET_SECS", defaults.timeline.min_bucket_secs)?,
            max_bucket_secs: env_or("MAX_BUCKET_SECS", defaults.timeline.max_bucket_secs)?,
            peak_window_secs: env_or("PEAK_WINDOW_SECS", defaults.timeline.peak_window_secs)?,
            peak_count: env_or("PEAK_COUNT", defaults.timeline.peak_count)?,
            cache_ttl: Duration::from_millis(env_or("TIMELINE_CACHE_TTL_MS", 3000u64)?),
        };

        let leaderboard = LeaderboardConfig {
            cache_size: env_or("LEADERBOARD_CACHE_SIZE", defaults.leaderboard.cache_size)?,
            cache_ttl: Duration::from_millis(env_or("LEADERBOARD_CACHE_TTL_MS", 3000u64)?),
            refresh_interval: Duration::from_secs(env_or("REFRESH_INTERVAL_SECS", 5u64)?),
            default_top_n: env_or("DEFAULT_TOP_N", defaults.leaderboard.default_top_n)?,
        };

        let config = Self {
            host: env_or("HOST", defaults.host)?,
            port: env_or("PORT", defaults.port)?,
            database_path: env_or("DATABASE_PATH", defaults.database_path)?,
            storage_timeout: Duration::from_millis(env_or("STORAGE_TIMEOUT_MS", 5000u64)?),
            scoring,
            timeline,
            leaderboard,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let decay = self.scoring.decay;
        if !(decay > 0.0 && decay < 1.0) {
            bail!("SCORE_DECAY must be in (0, 1), got {}", decay);
        }
        if !self.scoring.step_weight.is_finite() || self.scoring.step_weight < 0.0 {
            bail!("STEP_WEIGHT must be a non-negative number");
        }
        if !self.scoring.max_magnitude.is_finite() || self.scoring.max_magnitude <= 0.0 {
            bail!("MAX_MAGNITUDE must be positive");
        }
        let tl = &self.timeline;
        if tl.min_bucket_secs < 1 || tl.min_bucket_secs > tl.max_bucket_secs {
            bail!(
                "bucket range {}..={} seconds is invalid",
                tl.min_bucket_secs,
                tl.max_bucket_secs
            );
        }
        if tl.peak_window_secs < 1 {
            bail!("PEAK_WINDOW_SECS must be at least 1");
        }
        if self.leaderboard.cache_size == 0 {
            bail!("LEADERBOARD_CACHE_SIZE must be at least 1");
        }
        if self.leaderboard.refresh_interval.is_zero() {
            bail!("REFRESH_INTERVAL_SECS must be at least 1");
        }
        Ok(())
    }
}
