use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use superres_core::tiling::{TileGrid, DEFAULT_TILE_COLS, DEFAULT_TILE_ROWS, DEFAULT_UPSCALE};
use superres_pipeline::config::{
    DEFAULT_JOB_RETENTION, DEFAULT_MAX_CONCURRENT_JOBS, DEFAULT_MAX_QUEUED_JOBS,
    DEFAULT_RETENTION_SWEEP,
};
use superres_pipeline::PipelineConfig;

use crate::error::StartupError;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str =
    "superres_worker=debug,superres_pipeline=debug,superres_events=info";

pub const DEFAULT_REQUEST_CHANNEL: &str = "upscale_requests";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub redis_url: String,
    pub database_url: String,
    /// Channel carrying `{topicName, imageURL, imagePath}` requests.
    pub request_channel: String,
    pub upscale_factor: u32,
    pub log_format: LogFormat,
    pub pipeline: PipelineConfig,
}

impl WorkerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                | Default                 |
    /// |------------------------|-------------------------|
    /// | `REDIS_URL`            | required                |
    /// | `DATABASE_URL`         | required                |
    /// | `RESULT_DIR`           | `results`               |
    /// | `PUBLIC_BASE_URL`      | `http://localhost:7001` |
    /// | `TILE_ROWS`            | `3`                     |
    /// | `TILE_COLS`            | `6`                     |
    /// | `UPSCALE_FACTOR`       | `4`                     |
    /// | `MAX_CONCURRENT_JOBS`  | `2`                     |
    /// | `MAX_QUEUED_JOBS`      | `64`                    |
    /// | `JOB_RETENTION_SECS`   | `3600`                  |
    /// | `RETENTION_SWEEP_SECS` | `60`                    |
    /// | `REQUEST_CHANNEL`      | `upscale_requests`      |
    /// | `LOG_FORMAT`           | `pretty` (or `json`)    |
    pub fn from_env() -> Result<Self, StartupError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StartupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let redis_url = required(&lookup, "REDIS_URL")?;
        let database_url = required(&lookup, "DATABASE_URL")?;

        let rows = parse_or(&lookup, "TILE_ROWS", DEFAULT_TILE_ROWS)?;
        let cols = parse_or(&lookup, "TILE_COLS", DEFAULT_TILE_COLS)?;
        let grid = TileGrid::new(rows, cols).map_err(|e| StartupError::Config(e.to_string()))?;

        let upscale_factor = parse_or(&lookup, "UPSCALE_FACTOR", DEFAULT_UPSCALE)?;
        if upscale_factor == 0 {
            return Err(StartupError::Config(
                "UPSCALE_FACTOR must be at least 1".to_string(),
            ));
        }

        let defaults = PipelineConfig::default();
        let pipeline = PipelineConfig {
            grid,
            result_dir: lookup("RESULT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.result_dir),
            public_base_url: lookup("PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url),
            max_concurrent_jobs: parse_or(
                &lookup,
                "MAX_CONCURRENT_JOBS",
                DEFAULT_MAX_CONCURRENT_JOBS,
            )?,
            max_queued_jobs: parse_or(&lookup, "MAX_QUEUED_JOBS", DEFAULT_MAX_QUEUED_JOBS)?,
            job_retention: secs_or(&lookup, "JOB_RETENTION_SECS", DEFAULT_JOB_RETENTION)?,
            retention_sweep: secs_or(&lookup, "RETENTION_SWEEP_SECS", DEFAULT_RETENTION_SWEEP)?,
            key_schema: defaults.key_schema,
        };
        pipeline
            .validate()
            .map_err(|e| StartupError::Config(e.to_string()))?;

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(StartupError::Config(format!(
                    "LOG_FORMAT must be `pretty` or `json`, got `{other}`"
                )))
            }
        };

        Ok(Self {
            redis_url,
            database_url,
            request_channel: lookup("REQUEST_CHANNEL")
                .unwrap_or_else(|| DEFAULT_REQUEST_CHANNEL.to_string()),
            upscale_factor,
            log_format,
            pipeline,
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, StartupError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| StartupError::Config(format!("{key} must be set")))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, StartupError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| StartupError::Config(format!("{key}: {e}"))),
    }
}

fn secs_or<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration, StartupError>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(lookup, key, default.as_secs()).map(Duration::from_secs)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<WorkerConfig, StartupError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_lookup(|key| env.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("REDIS_URL", "redis://localhost:6379"),
        ("DATABASE_URL", "postgres://localhost/superres"),
    ];

    #[test]
    fn defaults_apply_when_only_required_vars_set() {
        let config = load(&REQUIRED).unwrap();
        assert_eq!(config.request_channel, "upscale_requests");
        assert_eq!(config.upscale_factor, 4);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.pipeline.grid, TileGrid::default());
        assert_eq!(config.pipeline.result_dir, PathBuf::from("results"));
        assert_eq!(config.pipeline.public_base_url, "http://localhost:7001");
        assert_eq!(config.pipeline.max_concurrent_jobs, 2);
        assert_eq!(config.pipeline.max_queued_jobs, 64);
        assert_eq!(config.pipeline.job_retention, Duration::from_secs(3600));
        assert_eq!(config.pipeline.retention_sweep, Duration::from_secs(60));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("TILE_ROWS", "1"),
            ("TILE_COLS", "1"),
            ("UPSCALE_FACTOR", "2"),
            ("MAX_CONCURRENT_JOBS", " 8 "),
            ("RESULT_DIR", "/srv/results"),
            ("LOG_FORMAT", "json"),
            ("REQUEST_CHANNEL", "jobs"),
            ("JOB_RETENTION_SECS", "0"),
            ("RETENTION_SWEEP_SECS", "5"),
        ]);
        let config = load(&pairs).unwrap();
        assert_eq!(config.pipeline.grid, TileGrid::single());
        assert_eq!(config.upscale_factor, 2);
        assert_eq!(config.pipeline.max_concurrent_jobs, 8);
        assert_eq!(config.pipeline.result_dir, PathBuf::from("/srv/results"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.request_channel, "jobs");
        assert_eq!(config.pipeline.job_retention, Duration::ZERO);
        assert_eq!(config.pipeline.retention_sweep, Duration::from_secs(5));
    }

    #[test]
    fn missing_redis_url_is_fatal() {
        assert_matches!(
            load(&[("DATABASE_URL", "postgres://x")]),
            Err(StartupError::Config(msg)) if msg.contains("REDIS_URL")
        );
    }

    #[test]
    fn malformed_number_is_fatal() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("TILE_ROWS", "three"));
        assert_matches!(
            load(&pairs),
            Err(StartupError::Config(msg)) if msg.starts_with("TILE_ROWS")
        );
    }

    #[test]
    fn zero_grid_or_factor_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("TILE_COLS", "0"));
        assert_matches!(load(&pairs), Err(StartupError::Config(_)));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("UPSCALE_FACTOR", "0"));
        assert_matches!(load(&pairs), Err(StartupError::Config(_)));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("MAX_CONCURRENT_JOBS", "0"));
        assert_matches!(load(&pairs), Err(StartupError::Config(_)));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("RETENTION_SWEEP_SECS", "0"));
        assert_matches!(load(&pairs), Err(StartupError::Config(_)));
    }

    #[test]
    fn unknown_log_format_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("LOG_FORMAT", "xml"));
        assert_matches!(load(&pairs), Err(StartupError::Config(_)));
    }
}
