//! Duration probing and sample extraction via ffprobe/ffmpeg.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Reads the length of a set and cuts samples out of it.
#[async_trait]
pub trait AudioSlicer: Send + Sync {
    /// Whole seconds of decodable audio.
    async fn probe_duration(&self, path: &Path) -> Result<u64, DecodeError>;

    /// Encode `[start_ms, end_ms)` of `path` into `dest` and return its bytes.
    async fn extract_sample(
        &self,
        path: &Path,
        start_ms: u64,
        end_ms: u64,
        dest: &Path,
    ) -> Result<Vec<u8>, DecodeError>;
}

pub struct FfmpegSlicer {
    ffmpeg: String,
    ffprobe: String,
}

#[derive(Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

impl FfmpegSlicer {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }
}

#[async_trait]
impl AudioSlicer for FfmpegSlicer {
    async fn probe_duration(&self, path: &Path) -> Result<u64, DecodeError> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| tool_error(&self.ffprobe, e))?;

        if !output.status.success() {
            return Err(DecodeError::Unreadable {
                path: path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_probe_duration(&output.stdout)
            .ok_or_else(|| DecodeError::NoDuration(path.to_path_buf()))
    }

    async fn extract_sample(
        &self,
        path: &Path,
        start_ms: u64,
        end_ms: u64,
        dest: &Path,
    ) -> Result<Vec<u8>, DecodeError> {
        let length_ms = end_ms.saturating_sub(start_ms);

        let output = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-y", "-ss"])
            .arg(millis_arg(start_ms))
            .arg("-t")
            .arg(millis_arg(length_ms))
            .arg("-i")
            .arg(path)
            .args(["-vn", "-acodec", "libmp3lame", "-b:a", "128k", "-f", "mp3"])
            .arg(dest)
            .output()
            .await
            .map_err(|e| tool_error(&self.ffmpeg, e))?;

        if !output.status.success() {
            return Err(DecodeError::Slice {
                start_ms,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let bytes = tokio::fs::read(dest).await?;
        tokio::fs::remove_file(dest).await?;
        Ok(bytes)
    }
}

fn tool_error(binary: &str, e: std::io::Error) -> DecodeError {
    match e.kind() {
        std::io::ErrorKind::NotFound => DecodeError::ToolMissing(binary.to_string()),
        _ => DecodeError::Io(e),
    }
}

/// `12345` ms → `"12.345"` seconds, the form ffmpeg expects for `-ss`/`-t`.
fn millis_arg(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

fn parse_probe_duration(stdout: &[u8]) -> Option<u64> {
    let probe: ProbeOutput = serde_json::from_slice(stdout).ok()?;
    let seconds: f64 = probe.format?.duration?.trim().parse().ok()?;
    if seconds.is_finite() && seconds >= 0.0 {
        Some(seconds.floor() as u64)
    } else {
        None
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Decoder not available: {0}")]
    ToolMissing(String),

    #[error("Could not decode {}: {}", .path.display(), .reason)]
    Unreadable { path: PathBuf, reason: String },

    #[error("No duration reported for {}", .0.display())]
    NoDuration(PathBuf),

    #[error("Could not extract sample at {start_ms} ms: {reason}")]
    Slice { start_ms: u64, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
