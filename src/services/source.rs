//! Source audio acquisition.

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use crate::models::job::SetInfo;

/// Base name of the downloaded set inside a job workspace.
const AUDIO_STEM: &str = "audio";

/// A downloaded set, ready for probing and slicing.
#[derive(Debug, Clone)]
pub struct AcquiredAudio {
    pub path: PathBuf,
    pub info: SetInfo,
}

/// Fetches a set from its URL into a job workspace.
#[async_trait]
pub trait AudioSource: Send + Sync {
    async fn acquire(&self, url: &str, workspace: &Path) -> Result<AcquiredAudio, AcquisitionError>;
}

/// Downloads and transcodes to mp3 through the `yt-dlp` binary.
pub struct YtDlpSource {
    binary: String,
}

#[derive(Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
}

impl YtDlpSource {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl AudioSource for YtDlpSource {
    async fn acquire(&self, url: &str, workspace: &Path) -> Result<AcquiredAudio, AcquisitionError> {
        let template = workspace.join(format!("{}.%(ext)s", AUDIO_STEM));

        debug!(url, binary = %self.binary, "Starting yt-dlp download");

        let output = Command::new(&self.binary)
            .args([
                "--format",
                "bestaudio/best",
                "--extract-audio",
                "--audio-format",
                "mp3",
                "--audio-quality",
                "192K",
                "--no-playlist",
                "--quiet",
                "--no-warnings",
                "--no-simulate",
                "--dump-json",
                "--output",
            ])
            .arg(&template)
            .arg(url)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => AcquisitionError::ToolMissing(self.binary.clone()),
                _ => AcquisitionError::Io(e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AcquisitionError::Download(last_line(&stderr)));
        }

        let info = parse_info(&output.stdout)?;

        let path = workspace.join(format!("{}.mp3", AUDIO_STEM));
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(AcquisitionError::MissingOutput(path));
        }

        Ok(AcquiredAudio { path, info })
    }
}

/// Parse the info JSON yt-dlp prints for the downloaded entry.
fn parse_info(stdout: &[u8]) -> Result<SetInfo, AcquisitionError> {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .rev()
        .find(|l| l.trim_start().starts_with('{'))
        .ok_or_else(|| AcquisitionError::Info("no info JSON on stdout".to_string()))?;

    let info: YtDlpInfo =
        serde_json::from_str(line).map_err(|e| AcquisitionError::Info(e.to_string()))?;

    Ok(SetInfo {
        title: info.title.unwrap_or_else(|| "Unknown".to_string()),
        duration: info.duration.map(|d| d.max(0.0) as u64).unwrap_or(0),
        uploader: info.uploader.unwrap_or_else(|| "Unknown".to_string()),
    })
}

fn last_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("yt-dlp exited with an error")
        .to_string()
}

/// Reduce YouTube URLs to the bare watch URL of their video.
///
/// Playlist, radio and timestamp parameters are dropped so the downloader
/// fetches exactly one video. Other URLs pass through trimmed.
pub fn canonical_source_url(raw: &str) -> String {
    let raw = raw.trim();
    let Ok(parsed) = Url::parse(raw) else {
        return raw.to_string();
    };

    let host = parsed.host_str().unwrap_or_default();
    let is_youtu_be = host.contains("youtu.be");
    if !host.contains("youtube.com") && !is_youtu_be {
        return raw.to_string();
    }

    if let Some((_, video_id)) = parsed.query_pairs().find(|(k, v)| k == "v" && !v.is_empty()) {
        return format!("https://www.youtube.com/watch?v={}", video_id);
    }

    if is_youtu_be {
        let video_id = parsed.path().trim_matches('/');
        if !video_id.is_empty() {
            return format!("https://www.youtube.com/watch?v={}", video_id);
        }
    }

    raw.to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("Downloader not available: {0}")]
    ToolMissing(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Could not read source info: {0}")]
    Info(String),

    #[error("Audio file not found: {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
