use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Whether a span of the set was recognized.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrackStatus {
    Identified,
    NotFound,
}

/// Streaming links returned alongside a match.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExternalLinks {
    pub spotify_url: Option<String>,
    pub apple_music_url: Option<String>,
    pub deezer_url: Option<String>,
}

/// Metadata for a recognized sample.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrackMatch {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    #[serde(flatten)]
    pub links: ExternalLinks,
}

/// Answer of the identification service for one sample.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentResult {
    Found(TrackMatch),
    NotFound { error: Option<String> },
}

impl SegmentResult {
    pub fn miss() -> Self {
        SegmentResult::NotFound { error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        SegmentResult::NotFound {
            error: Some(error.into()),
        }
    }
}

/// One span of the set, starting at `timestamp_seconds`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub timestamp: String,
    pub timestamp_seconds: u64,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub spotify_url: Option<String>,
    pub apple_music_url: Option<String>,
    pub deezer_url: Option<String>,
    pub status: TrackStatus,
}

impl Track {
    pub fn identified(timestamp_seconds: u64, matched: &TrackMatch) -> Self {
        Self {
            timestamp: format_timestamp(timestamp_seconds),
            timestamp_seconds,
            title: Some(matched.title.clone()),
            artist: Some(matched.artist.clone()),
            album: matched.album.clone(),
            spotify_url: matched.links.spotify_url.clone(),
            apple_music_url: matched.links.apple_music_url.clone(),
            deezer_url: matched.links.deezer_url.clone(),
            status: TrackStatus::Identified,
        }
    }

    pub fn not_found(timestamp_seconds: u64) -> Self {
        Self {
            timestamp: format_timestamp(timestamp_seconds),
            timestamp_seconds,
            title: None,
            artist: None,
            album: None,
            spotify_url: None,
            apple_music_url: None,
            deezer_url: None,
            status: TrackStatus::NotFound,
        }
    }

    pub fn is_identified(&self) -> bool {
        self.status == TrackStatus::Identified
    }
}

/// Format seconds as `MM:SS`, or `HH:MM:SS` from one hour on.
pub fn format_timestamp(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
