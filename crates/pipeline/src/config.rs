use std::path::PathBuf;
use std::time::Duration;

use superres_core::error::CoreError;
use superres_core::keys::KeySchema;
use superres_core::tiling::TileGrid;

/// Default number of jobs processed at the same time.
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 2;

/// Default number of admitted jobs allowed to wait for a worker slot.
pub const DEFAULT_MAX_QUEUED_JOBS: usize = 64;

/// Default time a terminal job stays in memory: 1 hour.
pub const DEFAULT_JOB_RETENTION: Duration = Duration::from_secs(3600);

/// Default period of the retention sweep.
pub const DEFAULT_RETENTION_SWEEP: Duration = Duration::from_secs(60);

/// Runtime settings of the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Tile layout; `1 x 1` processes the whole image in one pass.
    pub grid: TileGrid,
    /// Directory result images are written to.
    pub result_dir: PathBuf,
    /// Base of the public URL results are served under.
    pub public_base_url: String,
    /// Jobs running at once.
    pub max_concurrent_jobs: usize,
    /// Jobs admitted beyond the running ones before `submit` rejects.
    pub max_queued_jobs: usize,
    /// How long a terminal job stays visible to `get` and `list`.
    pub job_retention: Duration,
    /// Period of the sweep that drops expired terminal jobs.
    pub retention_sweep: Duration,
    pub key_schema: KeySchema,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_concurrent_jobs == 0 {
            return Err(CoreError::Validation(
                "max_concurrent_jobs must be at least 1".to_string(),
            ));
        }
        if self.retention_sweep.is_zero() {
            return Err(CoreError::Validation(
                "retention_sweep must be greater than zero".to_string(),
            ));
        }
        if self.public_base_url.trim().is_empty() {
            return Err(CoreError::Validation(
                "public_base_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Upper bound on jobs admitted at once (running plus queued).
    pub fn admission_limit(&self) -> usize {
        self.max_concurrent_jobs + self.max_queued_jobs
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            grid: TileGrid::default(),
            result_dir: PathBuf::from("results"),
            public_base_url: "http://localhost:7001".to_string(),
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            max_queued_jobs: DEFAULT_MAX_QUEUED_JOBS,
            job_retention: DEFAULT_JOB_RETENTION,
            retention_sweep: DEFAULT_RETENTION_SWEEP,
            key_schema: KeySchema::V1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.admission_limit(), 66);
    }

    #[test]
    fn zero_workers_rejected() {
        let config = PipelineConfig {
            max_concurrent_jobs: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_sweep_period_rejected() {
        let config = PipelineConfig {
            retention_sweep: Duration::ZERO,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
