use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::job::JobStatus;
use crate::models::track::Track;
use crate::services::audio::{AudioSlicer, DecodeError};
use crate::services::identify::TrackIdentifier;
use crate::services::job_store::{JobStore, JobStoreError};
use crate::services::matching::TrackMatcher;
use crate::services::scanner::{ScanEvent, ScanSettings, SegmentScanner};
use crate::services::source::{canonical_source_url, AcquisitionError, AudioSource};

/// Runs identification jobs and records their progress in the job store.
///
/// Each submitted job gets its own tokio task. The task owns the job's
/// record exclusively; pollers only ever read snapshots from the store.
/// There is no way to cancel a running job.
pub struct Pipeline {
    store: Arc<JobStore>,
    source: Arc<dyn AudioSource>,
    audio: Arc<dyn AudioSlicer>,
    identifier: Arc<dyn TrackIdentifier>,
    matcher: TrackMatcher,
    settings: ScanSettings,
    scratch_root: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(
        store: Arc<JobStore>,
        source: Arc<dyn AudioSource>,
        audio: Arc<dyn AudioSlicer>,
        identifier: Arc<dyn TrackIdentifier>,
        matcher: TrackMatcher,
        settings: ScanSettings,
    ) -> Self {
        Self {
            store,
            source,
            audio,
            identifier,
            matcher,
            settings,
            scratch_root: None,
        }
    }

    /// Create job workspaces under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Register a job for `url` and start it in the background.
    ///
    /// Returns as soon as the `queued` record exists.
    pub fn submit(self: &Arc<Self>, url: &str, segment_duration: Option<u64>) -> Uuid {
        let url = canonical_source_url(url);
        let settings = match segment_duration {
            Some(stride) => self.settings.with_segment_duration(stride),
            None => self.settings,
        };

        let job = self.store.create(url.clone(), settings.segment_duration);
        metrics::counter!("set_jobs_submitted_total").increment(1);
        info!(
            job_id = %job.id,
            url = %url,
            segment_duration = settings.segment_duration,
            "Job submitted"
        );

        let pipeline = Arc::clone(self);
        let job_id = job.id;
        tokio::spawn(async move { pipeline.run(job_id, url, settings).await });

        job_id
    }

    /// Drive one job to a terminal status.
    ///
    /// The work itself runs in a nested task so that a panic inside it still
    /// ends the job as `error` instead of leaving it stuck mid-flight.
    pub async fn run(self: Arc<Self>, job_id: Uuid, url: String, settings: ScanSettings) {
        metrics::gauge!("set_jobs_active").increment(1.0);
        let started = Instant::now();

        let worker = {
            let pipeline = Arc::clone(&self);
            tokio::spawn(async move { pipeline.process(job_id, &url, settings).await })
        };

        let outcome = match worker.await {
            Ok(result) => result,
            Err(e) => Err(PipelineError::Aborted(e.to_string())),
        };

        match outcome {
            Ok(tracks) => {
                let count = tracks.len();
                match self
                    .store
                    .transition(job_id, JobStatus::Completed, "Completed!", |job| {
                        job.tracks = tracks
                    }) {
                    Ok(_) => {
                        metrics::counter!("set_jobs_completed_total").increment(1);
                        info!(
                            job_id = %job_id,
                            tracks = count,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Job completed"
                        );
                    }
                    Err(e) => warn!(job_id = %job_id, error = %e, "Could not mark job completed"),
                }
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Job failed");
                metrics::counter!("set_jobs_failed_total").increment(1);
                if let Err(store_err) =
                    self.store
                        .transition(job_id, JobStatus::Error, format!("Error: {}", e), |_| {})
                {
                    warn!(job_id = %job_id, error = %store_err, "Could not mark job failed");
                }
            }
        }

        metrics::histogram!("set_job_processing_seconds").record(started.elapsed().as_secs_f64());
        metrics::gauge!("set_jobs_active").decrement(1.0);
    }

    async fn process(
        &self,
        job_id: Uuid,
        url: &str,
        settings: ScanSettings,
    ) -> Result<Vec<Track>, PipelineError> {
        // Removed on drop, including when this task unwinds.
        let workspace = self.workspace()?;

        self.store
            .transition(job_id, JobStatus::Downloading, "Downloading audio...", |_| {})?;

        let acquired = self.source.acquire(url, workspace.path()).await?;
        info!(
            job_id = %job_id,
            title = %acquired.info.title,
            uploader = %acquired.info.uploader,
            "Audio acquired"
        );

        let duration = self.audio.probe_duration(&acquired.path).await?;

        let info = acquired.info.clone();
        self.store
            .transition(job_id, JobStatus::Processing, "Processing audio...", |job| {
                job.set_info = Some(info);
                job.total_duration = duration;
            })?;

        info!(
            job_id = %job_id,
            duration_seconds = duration,
            samples = settings.sample_count(duration),
            "Scanning set"
        );

        let scanner = SegmentScanner::new(
            self.audio.as_ref(),
            self.identifier.as_ref(),
            &self.matcher,
            settings,
        );

        let store = &self.store;
        let tracks = scanner
            .scan(&acquired.path, duration, workspace.path(), |event| {
                let published = match event {
                    ScanEvent::Sampling {
                        index,
                        total,
                        position,
                    } => store.update(job_id, |job| {
                        job.current_position = position;
                        job.message = format!("Identifying tracks ({}/{})...", index, total);
                    }),
                    ScanEvent::Recorded { position, tracks } => store.update(job_id, |job| {
                        job.current_position = position;
                        job.tracks = tracks.to_vec();
                    }),
                };
                if let Err(e) = published {
                    warn!(job_id = %job_id, error = %e, "Could not publish scan progress");
                }
            })
            .await?;

        Ok(tracks)
    }

    fn workspace(&self) -> Result<TempDir, PipelineError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("set-decoder-");
        let dir = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        dir.map_err(PipelineError::Workspace)
    }
}

/// Failures that end a job as `error`.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Could not create scratch workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error(transparent)]
    Store(#[from] JobStoreError),

    #[error("Job worker aborted: {0}")]
    Aborted(String),
}
