//! Test doubles for the pipeline collaborators

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use uuid::Uuid;

use set_decoder::models::job::{SetInfo, SetJob};
use set_decoder::models::track::SegmentResult;
use set_decoder::services::audio::{AudioSlicer, DecodeError};
use set_decoder::services::identify::TrackIdentifier;
use set_decoder::services::job_store::JobStore;
use set_decoder::services::matching::TrackMatcher;
use set_decoder::services::pipeline::Pipeline;
use set_decoder::services::scanner::ScanSettings;
use set_decoder::services::source::{AcquiredAudio, AcquisitionError, AudioSource};

/// Source that "downloads" by writing a placeholder file into the workspace.
pub struct MockSource {
    outcome: Result<SetInfo, String>,
    /// Workspaces handed to `acquire`, for cleanup assertions.
    pub workspaces: Mutex<Vec<std::path::PathBuf>>,
}

impl MockSource {
    pub fn ok(title: &str, duration: u64) -> Self {
        Self {
            outcome: Ok(SetInfo {
                title: title.to_string(),
                duration,
                uploader: "Test Uploader".to_string(),
            }),
            workspaces: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            outcome: Err(reason.to_string()),
            workspaces: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AudioSource for MockSource {
    async fn acquire(&self, _url: &str, workspace: &Path) -> Result<AcquiredAudio, AcquisitionError> {
        self.workspaces.lock().push(workspace.to_path_buf());
        let info = self
            .outcome
            .clone()
            .map_err(AcquisitionError::Download)?;
        let path = workspace.join("audio.mp3");
        tokio::fs::write(&path, b"ID3").await?;
        Ok(AcquiredAudio { path, info })
    }
}

/// Slicer over a set of fixed length. Samples carry their start (ms) as text.
pub struct FixedSlicer {
    pub duration: u64,
    pub fail_at_ms: Option<u64>,
    /// Report the acquired file as undecodable.
    pub fail_probe: bool,
}

impl FixedSlicer {
    pub fn new(duration: u64) -> Self {
        Self {
            duration,
            fail_at_ms: None,
            fail_probe: false,
        }
    }
}

#[async_trait]
impl AudioSlicer for FixedSlicer {
    async fn probe_duration(&self, path: &Path) -> Result<u64, DecodeError> {
        if self.fail_probe {
            return Err(DecodeError::Unreadable {
                path: path.to_path_buf(),
                reason: "Invalid data found when processing input".to_string(),
            });
        }
        Ok(self.duration)
    }

    async fn extract_sample(
        &self,
        _path: &Path,
        start_ms: u64,
        _end_ms: u64,
        dest: &Path,
    ) -> Result<Vec<u8>, DecodeError> {
        if self.fail_at_ms == Some(start_ms) {
            return Err(DecodeError::Slice {
                start_ms,
                reason: "corrupt frame".to_string(),
            });
        }
        tokio::fs::write(dest, b"sample").await?;
        let bytes = start_ms.to_string().into_bytes();
        tokio::fs::remove_file(dest).await?;
        Ok(bytes)
    }
}

type Script = Box<dyn Fn(u64) -> SegmentResult + Send + Sync>;

/// Identifier that answers from a function of the sample start (seconds).
pub struct ScriptedIdentifier {
    script: Script,
    delay: Duration,
    pub calls: Mutex<Vec<u64>>,
}

impl ScriptedIdentifier {
    pub fn new(script: impl Fn(u64) -> SegmentResult + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl TrackIdentifier for ScriptedIdentifier {
    async fn identify(&self, sample: Vec<u8>, _file_name: &str) -> SegmentResult {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        let start_ms: u64 = String::from_utf8_lossy(&sample).parse().unwrap_or(0);
        let start = start_ms / 1000;
        self.calls.lock().push(start);
        (self.script)(start)
    }
}

/// Identifier whose first call panics.
pub struct PanickingIdentifier;

#[async_trait]
impl TrackIdentifier for PanickingIdentifier {
    async fn identify(&self, _sample: Vec<u8>, _file_name: &str) -> SegmentResult {
        panic!("identifier blew up");
    }
}

/// Pipeline with default scan settings and a private scratch root.
pub fn build_pipeline(
    source: Arc<dyn AudioSource>,
    slicer: Arc<dyn AudioSlicer>,
    identifier: Arc<dyn TrackIdentifier>,
    scratch: &Path,
) -> Arc<Pipeline> {
    Arc::new(
        Pipeline::new(
            Arc::new(JobStore::new()),
            source,
            slicer,
            identifier,
            TrackMatcher::default(),
            ScanSettings::default(),
        )
        .with_scratch_root(scratch),
    )
}

/// Poll the store until the job reaches `completed` or `error`.
pub async fn wait_for_terminal(store: &JobStore, id: Uuid, timeout: Duration) -> Arc<SetJob> {
    let deadline = Instant::now() + timeout;
    loop {
        let job = store.get(id).expect("job should exist");
        if job.status.is_terminal() {
            return job;
        }
        assert!(
            Instant::now() < deadline,
            "job {} still {} after {:?}",
            id,
            job.status,
            timeout
        );
        sleep(Duration::from_millis(10)).await;
    }
}
