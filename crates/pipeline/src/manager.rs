//! Job lifecycle manager.
//!
//! [`JobManager`] owns the authoritative in-memory record of every job and
//! runs each one as a tracked tokio task:
//!
//! ```text
//! submit ─▶ Created ─▶ (permit) ─▶ Processing ─▶ Completed
//!                                            └─▶ Failed
//! ```
//!
//! Jobs live in a sharded [`DashMap`]; every mutation goes through
//! [`JobManager::apply`], which holds the job's shard lock for one
//! check-and-set so a `close` racing with processing cannot break the
//! forward-only state machine. Work on different jobs never contends.
//!
//! Admission is bounded: at most `max_concurrent_jobs` run at once and at
//! most `max_queued_jobs` more wait for a permit. Beyond that `submit`
//! rejects with [`CoreError::Saturated`].
//!
//! A job's name stays reserved from `submit` until the job reaches a
//! terminal state, whether or not its record has been closed. Terminal
//! records are dropped by [`JobManager::purge_terminal`] once they are
//! older than the retention window.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use superres_core::durable::{AuditLog, DurableStore, PersistenceError};
use superres_core::error::{CoreError, JobError};
use superres_core::job::{Job, JobStatus};
use superres_core::types::{JobId, Timestamp};
use superres_core::upscaler::Upscaler;
use superres_core::validation::validate_submission;
use superres_events::bus::{EventBus, JobEvent, JobEventKind};
use superres_events::messages::{CompletionRecord, TopicMetadata};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::task::TaskTracker;

use crate::config::PipelineConfig;
use crate::notifier::{CompletionNotifier, LocalResultSink, StoredResult};
use crate::progress::ProgressPublisher;
use crate::tile_engine::{decode_source, TileEngine};

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

/// One admitted job. Releases its slot when the job task ends.
#[derive(Debug)]
struct AdmissionSlot {
    admitted: Arc<AtomicUsize>,
}

impl AdmissionSlot {
    fn acquire(admitted: &Arc<AtomicUsize>, limit: usize) -> Result<Self, CoreError> {
        admitted
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < limit).then_some(n + 1)
            })
            .map_err(|_| CoreError::Saturated { limit })?;
        Ok(Self {
            admitted: Arc::clone(admitted),
        })
    }
}

impl Drop for AdmissionSlot {
    fn drop(&mut self) {
        self.admitted.fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

pub struct JobManager {
    jobs: DashMap<JobId, Job>,
    /// Name reservations of jobs that have not reached a terminal state.
    names: DashMap<String, JobId>,
    next_id: AtomicU64,
    admitted: Arc<AtomicUsize>,
    permits: Semaphore,
    config: PipelineConfig,
    engine: TileEngine,
    upscaler: Arc<dyn Upscaler>,
    store: Arc<dyn DurableStore>,
    audit: Arc<dyn AuditLog>,
    publisher: ProgressPublisher,
    notifier: CompletionNotifier,
    bus: Arc<EventBus>,
    tasks: TaskTracker,
}

impl JobManager {
    pub fn new(
        config: PipelineConfig,
        upscaler: Arc<dyn Upscaler>,
        store: Arc<dyn DurableStore>,
        audit: Arc<dyn AuditLog>,
        bus: Arc<EventBus>,
    ) -> Result<Arc<Self>, CoreError> {
        config.validate()?;

        let schema = config.key_schema;
        let sink = LocalResultSink::new(config.result_dir.clone(), config.public_base_url.clone());
        let notifier =
            CompletionNotifier::new(sink, Arc::clone(&store), Arc::clone(&audit), schema);

        Ok(Arc::new(Self {
            jobs: DashMap::new(),
            names: DashMap::new(),
            next_id: AtomicU64::new(1),
            admitted: Arc::new(AtomicUsize::new(0)),
            permits: Semaphore::new(config.max_concurrent_jobs),
            engine: TileEngine::new(config.grid),
            publisher: ProgressPublisher::new(Arc::clone(&store), schema),
            notifier,
            config,
            upscaler,
            store,
            audit,
            bus,
            tasks: TaskTracker::new(),
        }))
    }

    /// Register a job in `Created` and schedule its processing.
    ///
    /// Returns as soon as the job is registered. Checks run in this order
    /// and the first failure is returned: [`CoreError::Validation`] on a
    /// missing name or URL, [`CoreError::DuplicateName`] when a
    /// non-terminal job already owns `name`, [`CoreError::Saturated`] when
    /// the admission limit is reached.
    pub fn submit(
        self: &Arc<Self>,
        name: &str,
        source_url: &str,
        source_path: impl Into<PathBuf>,
    ) -> Result<JobId, CoreError> {
        validate_submission(name, source_url)?;

        let (id, slot) = match self.names.entry(name.to_string()) {
            Entry::Occupied(_) => return Err(CoreError::DuplicateName(name.to_string())),
            Entry::Vacant(vacant) => {
                let slot = AdmissionSlot::acquire(&self.admitted, self.config.admission_limit())?;
                let id = JobId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
                vacant.insert(id);
                (id, slot)
            }
        };

        self.jobs.insert(id, Job::new(id, name, source_url, source_path));
        self.emit(
            id,
            name,
            JobEventKind::StatusChanged {
                status: JobStatus::Created,
            },
        );
        tracing::info!(job_id = %id, topic = name, "Job submitted");

        let manager = Arc::clone(self);
        let name = name.to_string();
        self.tasks.spawn(async move {
            manager.run(id, name, slot).await;
        });

        Ok(id)
    }

    /// Snapshot of the in-memory record.
    pub fn get(&self, id: JobId) -> Result<Job, CoreError> {
        self.snapshot(id).ok_or_else(|| not_found(id))
    }

    /// Drop the in-memory record. Durable projections are left untouched.
    /// A job still in flight runs to its terminal state and keeps its name
    /// reserved until then.
    pub fn close(&self, id: JobId) -> Result<(), CoreError> {
        let (_, job) = self.jobs.remove(&id).ok_or_else(|| not_found(id))?;
        tracing::info!(job_id = %id, topic = %job.name, status = %job.status, "Job closed");
        Ok(())
    }

    /// All in-memory jobs, oldest first.
    pub fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.iter().map(|entry| entry.value().clone()).collect();
        jobs.sort_by_key(|job| job.id);
        jobs
    }

    /// Drop terminal records that finished at or before `cutoff`.
    /// Returns how many were removed.
    pub fn purge_terminal(&self, cutoff: Timestamp) -> usize {
        let mut purged = 0;
        self.jobs.retain(|_, job| {
            let expired = job.status.is_terminal()
                && job.completed_at.is_some_and(|finished| finished <= cutoff);
            if expired {
                purged += 1;
            }
            !expired
        });
        purged
    }

    /// Look a job up in memory, falling back to the durable projections.
    ///
    /// The fallback reads the id index (or the id-derived name when the
    /// index is missing) and then that name's metadata record. Fields the
    /// store does not have come back empty; a job rebuilt with an empty
    /// source path fails with [`JobError::ImageNotFound`] when processed.
    /// The rebuilt job is not inserted into the map.
    pub async fn resolve(&self, id: JobId) -> Job {
        if let Some(job) = self.snapshot(id) {
            return job;
        }

        let schema = self.config.key_schema;
        let derived = match self.store.get(&schema.index_key(id)).await {
            Ok(Some(name)) if !name.is_empty() => name,
            Ok(_) => schema.fallback_topic_name(id),
            Err(e) => {
                tracing::warn!(job_id = %id, error = %e, "Failed to read id index");
                schema.fallback_topic_name(id)
            }
        };

        let meta = match self.store.get(&schema.metadata_key(&derived)).await {
            Ok(Some(raw)) => serde_json::from_str::<TopicMetadata>(&raw).unwrap_or_else(|e| {
                tracing::warn!(
                    job_id = %id,
                    topic = %derived,
                    error = %e,
                    "Unreadable metadata record"
                );
                TopicMetadata::default()
            }),
            Ok(None) => TopicMetadata::default(),
            Err(e) => {
                tracing::warn!(
                    job_id = %id,
                    topic = %derived,
                    error = %e,
                    "Failed to read metadata record"
                );
                TopicMetadata::default()
            }
        };

        let name = if meta.topic_id.is_empty() {
            derived
        } else {
            meta.topic_id
        };
        tracing::debug!(job_id = %id, topic = %name, "Job resolved from durable store");

        Job::new(id, name, meta.image_url, meta.image_path.unwrap_or_default())
    }

    /// Completion records appended to the processed list, oldest first.
    /// Entries that do not parse are skipped.
    pub async fn list_processed(&self) -> Result<Vec<CompletionRecord>, PersistenceError> {
        let raw = self
            .store
            .list(self.config.key_schema.processed_list())
            .await?;

        Ok(raw
            .iter()
            .filter_map(|entry| match serde_json::from_str::<CompletionRecord>(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable processed entry");
                    None
                }
            })
            .collect())
    }

    /// Wait for every submitted job to reach a terminal state.
    pub async fn shutdown(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    fn snapshot(&self, id: JobId) -> Option<Job> {
        self.jobs.get(&id).map(|entry| entry.value().clone())
    }

    /// The single mutation path for a running job.
    ///
    /// Applies `f` to the map entry under its shard lock and refreshes
    /// `local` from it. Once the job has been closed only `local` changes.
    fn apply<F>(&self, local: &mut Job, f: F) -> Result<(), CoreError>
    where
        F: FnOnce(&mut Job) -> Result<(), CoreError>,
    {
        match self.jobs.get_mut(&local.id) {
            Some(mut entry) => {
                f(entry.value_mut())?;
                local.clone_from(entry.value());
            }
            None => f(local)?,
        }
        Ok(())
    }

    /// Free `name` if `id` still holds it.
    fn release_name(&self, name: &str, id: JobId) {
        self.names.remove_if(name, |_, owner| *owner == id);
    }

    fn emit(&self, id: JobId, topic: &str, kind: JobEventKind) {
        self.bus.publish(JobEvent::new(id, topic, kind));
    }

    // -----------------------------------------------------------------------
    // Processing
    // -----------------------------------------------------------------------

    /// `name` is the name reserved at submit. A job closed before it
    /// starts is rebuilt by [`resolve`](Self::resolve) and may carry a
    /// different one.
    async fn run(&self, id: JobId, name: String, _slot: AdmissionSlot) {
        if let Some(job) = self.snapshot(id) {
            self.record_submission(&job).await;
        }

        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                tracing::error!(job_id = %id, error = %e, "Worker pool closed");
                self.release_name(&name, id);
                return;
            }
        };

        let mut job = self.resolve(id).await;
        if let Err(e) = self.apply(&mut job, Job::start) {
            tracing::warn!(job_id = %id, error = %e, "Job could not start");
            self.release_name(&name, id);
            return;
        }
        self.emit(
            id,
            &job.name,
            JobEventKind::StatusChanged {
                status: JobStatus::Processing,
            },
        );
        tracing::info!(job_id = %id, topic = %job.name, "Job processing");

        match self.process(&mut job).await {
            Ok(result) => self.finish(&mut job, &name, result).await,
            Err(e) => self.abandon(&mut job, &name, e).await,
        }
    }

    /// Submission-time projections. Failures are logged only.
    async fn record_submission(&self, job: &Job) {
        let schema = self.config.key_schema;
        let topic = job.name.as_str();

        if let Err(e) = self.store.put(&schema.index_key(job.id), topic).await {
            tracing::error!(job_id = %job.id, topic, error = %e, "Failed to write id index");
        }

        let meta = TopicMetadata::submitted(
            topic,
            &job.source_url,
            job.source_path.to_string_lossy(),
        );
        match serde_json::to_string(&meta) {
            Ok(payload) => {
                if let Err(e) = self.store.put(&schema.metadata_key(topic), &payload).await {
                    tracing::error!(
                        job_id = %job.id,
                        topic,
                        error = %e,
                        "Failed to write submission metadata"
                    );
                }
            }
            Err(e) => tracing::error!(
                job_id = %job.id,
                topic,
                error = %e,
                "Failed to encode submission metadata"
            ),
        }

        self.publisher.reset(topic).await;

        if let Err(e) = self.audit.record_submitted(topic, &job.source_url).await {
            tracing::error!(job_id = %job.id, topic, error = %e, "Failed to insert audit record");
        }
    }

    /// Decode, tile, upscale and store the result.
    ///
    /// Pixel work runs on the blocking pool; tile completions come back in
    /// order over a channel and are reported as they arrive.
    async fn process(&self, job: &mut Job) -> Result<StoredResult, JobError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, usize)>();
        let path = job.source_path.clone();
        let engine = self.engine;
        let upscaler = Arc::clone(&self.upscaler);

        let work = tokio::task::spawn_blocking(move || {
            let image = decode_source(&path)?;
            engine.process(&image, upscaler.as_ref(), |_, done, total| {
                let _ = tx.send((done, total));
            })
        });

        while let Some((done, total)) = rx.recv().await {
            let pct = self.publisher.report(&job.name, done, total).await;
            if let Err(e) = self.apply(job, |j| j.record_progress(pct)) {
                tracing::debug!(job_id = %job.id, error = %e, "Progress not recorded");
            }
            self.emit(job.id, &job.name, JobEventKind::Progress { percent: pct });
        }

        let canvas = work
            .await
            .map_err(|e| JobError::Aborted(e.to_string()))??;

        self.notifier.persist_result(job.id, canvas).await
    }

    async fn finish(&self, job: &mut Job, name: &str, result: StoredResult) {
        let path = result.path.clone();
        let url = result.url.clone();
        if let Err(e) = self.apply(job, |j| j.complete(path, url)) {
            tracing::error!(job_id = %job.id, error = %e, "Job could not complete");
            self.release_name(name, job.id);
            return;
        }
        self.publisher.clear(&job.name).await;
        self.release_name(name, job.id);

        self.emit(
            job.id,
            &job.name,
            JobEventKind::Completed {
                upscaled_url: result.url.clone(),
            },
        );
        tracing::info!(
            job_id = %job.id,
            topic = %job.name,
            upscaled_url = %result.url,
            "Job completed"
        );

        self.notifier.announce(job, &result).await;
    }

    async fn abandon(&self, job: &mut Job, name: &str, error: JobError) {
        let message = error.to_string();
        tracing::warn!(job_id = %job.id, topic = %job.name, error = %message, "Job failed");

        if let Err(e) = self.apply(job, |j| j.fail(message.clone())) {
            tracing::error!(job_id = %job.id, error = %e, "Job could not be marked failed");
            self.release_name(name, job.id);
            return;
        }
        self.publisher.clear(&job.name).await;
        self.release_name(name, job.id);

        self.emit(
            job.id,
            &job.name,
            JobEventKind::Failed {
                error: message.clone(),
            },
        );

        if let Err(e) = self.audit.mark_failed(&job.name, &message).await {
            tracing::error!(
                job_id = %job.id,
                topic = %job.name,
                error = %e,
                "Failed to update audit record"
            );
        }
    }
}

fn not_found(id: JobId) -> CoreError {
    CoreError::NotFound {
        entity: "job",
        id: id.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn admission_slot_is_bounded_and_released_on_drop() {
        let admitted = Arc::new(AtomicUsize::new(0));
        let first = AdmissionSlot::acquire(&admitted, 2).unwrap();
        let _second = AdmissionSlot::acquire(&admitted, 2).unwrap();
        assert_matches!(
            AdmissionSlot::acquire(&admitted, 2),
            Err(CoreError::Saturated { limit: 2 })
        );

        drop(first);
        assert_eq!(admitted.load(Ordering::SeqCst), 1);
        assert!(AdmissionSlot::acquire(&admitted, 2).is_ok());
    }

    #[test]
    fn zero_limit_admits_nothing() {
        let admitted = Arc::new(AtomicUsize::new(0));
        assert_matches!(
            AdmissionSlot::acquire(&admitted, 0),
            Err(CoreError::Saturated { limit: 0 })
        );
        assert_eq!(admitted.load(Ordering::SeqCst), 0);
    }
}
