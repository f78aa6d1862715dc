use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::identify::{DEFAULT_IDENTIFY_TIMEOUT, DEFAULT_RETURN_PROVIDERS};
use crate::services::matching::{
    MatchConfig, KEY_SIMILARITY_THRESHOLD, NOISE_WORDS, TITLE_SIMILARITY_THRESHOLD,
};
use crate::services::scanner::{
    ScanSettings, DEFAULT_GAP_MISS_THRESHOLD, DEFAULT_SAMPLE_LENGTH, DEFAULT_SEGMENT_DURATION,
};

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:8000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// AudD API token
    pub audd_api_token: String,

    /// AudD recognition endpoint
    #[serde(default = "default_audd_endpoint")]
    pub audd_endpoint: String,

    /// Metadata providers requested from AudD (comma-separated)
    #[serde(default = "default_audd_return")]
    pub audd_return: String,

    /// Timeout for one identification request, in seconds
    #[serde(default = "default_identify_timeout_secs")]
    pub identify_timeout_secs: u64,

    /// Default seconds between sample starts
    #[serde(default = "default_segment_duration_secs")]
    pub segment_duration_secs: u64,

    /// Seconds of audio per sample
    #[serde(default = "default_sample_length_secs")]
    pub sample_length_secs: u64,

    /// Consecutive misses before a gap is recorded
    #[serde(default = "default_gap_miss_threshold")]
    pub gap_miss_threshold: u32,

    /// LCS ratio above which two normalized keys are the same track
    #[serde(default = "default_key_similarity_threshold")]
    pub key_similarity_threshold: f64,

    /// LCS ratio above which two normalized titles are the same track
    #[serde(default = "default_title_similarity_threshold")]
    pub title_similarity_threshold: f64,

    /// Words ignored when comparing track names (comma-separated)
    #[serde(default = "default_noise_words")]
    pub noise_words: Vec<String>,

    /// Parent directory for per-job scratch workspaces. System temp dir if unset.
    pub scratch_dir: Option<PathBuf>,

    #[serde(default = "default_yt_dlp_bin")]
    pub yt_dlp_bin: String,

    #[serde(default = "default_ffmpeg_bin")]
    pub ffmpeg_bin: String,

    #[serde(default = "default_ffprobe_bin")]
    pub ffprobe_bin: String,

    /// Request body limit for the API, in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_audd_endpoint() -> String {
    "https://api.audd.io/".to_string()
}

fn default_audd_return() -> String {
    DEFAULT_RETURN_PROVIDERS.to_string()
}

fn default_identify_timeout_secs() -> u64 {
    DEFAULT_IDENTIFY_TIMEOUT.as_secs()
}

fn default_segment_duration_secs() -> u64 {
    DEFAULT_SEGMENT_DURATION
}

fn default_sample_length_secs() -> u64 {
    DEFAULT_SAMPLE_LENGTH
}

fn default_gap_miss_threshold() -> u32 {
    DEFAULT_GAP_MISS_THRESHOLD
}

fn default_key_similarity_threshold() -> f64 {
    KEY_SIMILARITY_THRESHOLD
}

fn default_title_similarity_threshold() -> f64 {
    TITLE_SIMILARITY_THRESHOLD
}

fn default_noise_words() -> Vec<String> {
    NOISE_WORDS.iter().map(|w| w.to_string()).collect()
}

fn default_yt_dlp_bin() -> String {
    "yt-dlp".to_string()
}

fn default_ffmpeg_bin() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_bin() -> String {
    "ffprobe".to_string()
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            segment_duration: self.segment_duration_secs.max(1),
            sample_length: self.sample_length_secs.max(1),
            gap_miss_threshold: self.gap_miss_threshold.max(1),
        }
    }

    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            key_threshold: self.key_similarity_threshold,
            title_threshold: self.title_similarity_threshold,
            noise_words: self.noise_words.clone(),
        }
    }

    pub fn identify_timeout(&self) -> Duration {
        Duration::from_secs(self.identify_timeout_secs)
    }
}
