//! AudD fingerprinting adapter.
//!
//! All AudD field names live in this module. Everything downstream works on
//! [`SegmentResult`] and [`TrackMatch`].

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::track::{ExternalLinks, SegmentResult, TrackMatch};

/// Upper bound for one identification round trip.
pub const DEFAULT_IDENTIFY_TIMEOUT: Duration = Duration::from_secs(30);

/// Metadata providers AudD is asked to include in a match.
pub const DEFAULT_RETURN_PROVIDERS: &str = "spotify,apple_music,deezer";

/// Looks up one audio sample.
///
/// Implementations never fail: every provider or transport problem comes
/// back as [`SegmentResult::NotFound`] with the cause in `error`.
#[async_trait]
pub trait TrackIdentifier: Send + Sync {
    async fn identify(&self, sample: Vec<u8>, file_name: &str) -> SegmentResult;
}

/// Client for the AudD recognition API.
pub struct AuddClient {
    http: Client,
    endpoint: String,
    api_token: String,
    providers: String,
}

#[derive(Deserialize)]
struct AuddResponse {
    status: String,
    result: Option<AuddTrack>,
    error: Option<Value>,
}

#[derive(Deserialize)]
struct AuddTrack {
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    spotify: Option<Value>,
    apple_music: Option<Value>,
    deezer: Option<Value>,
}

impl AuddClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_token: impl Into<String>,
        providers: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, IdentifyError> {
        let http = Client::builder()
            .user_agent(concat!("set-decoder/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_token: api_token.into(),
            providers: providers.into(),
        })
    }

    /// Upload a sample and return the match, if AudD recognized it.
    pub async fn lookup(
        &self,
        sample: Vec<u8>,
        file_name: &str,
    ) -> Result<Option<TrackMatch>, IdentifyError> {
        let file = Part::bytes(sample)
            .file_name(file_name.to_string())
            .mime_str("audio/mpeg")?;

        let form = Form::new()
            .text("api_token", self.api_token.clone())
            .text("return", self.providers.clone())
            .part("file", file);

        let response = self.http.post(&self.endpoint).multipart(form).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(IdentifyError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        parse_response(&body)
    }
}

#[async_trait]
impl TrackIdentifier for AuddClient {
    async fn identify(&self, sample: Vec<u8>, file_name: &str) -> SegmentResult {
        match self.lookup(sample, file_name).await {
            Ok(Some(matched)) => {
                debug!(artist = %matched.artist, title = %matched.title, "AudD match");
                SegmentResult::Found(matched)
            }
            Ok(None) => SegmentResult::miss(),
            Err(e) => {
                warn!(sample = file_name, error = %e, "AudD lookup failed");
                SegmentResult::failed(e.to_string())
            }
        }
    }
}

/// Decode an AudD response body.
///
/// `Ok(None)` is a clean "no match"; provider-reported errors are `Err`.
pub fn parse_response(body: &[u8]) -> Result<Option<TrackMatch>, IdentifyError> {
    let response: AuddResponse = serde_json::from_slice(body)?;

    match response.status.as_str() {
        "success" => Ok(response.result.map(into_track_match)),
        "error" => Err(IdentifyError::Provider(describe_error(response.error.as_ref()))),
        other => Err(IdentifyError::Provider(format!("unexpected status '{}'", other))),
    }
}

fn into_track_match(track: AuddTrack) -> TrackMatch {
    let spotify_url = track
        .spotify
        .as_ref()
        .and_then(|s| s.pointer("/external_urls/spotify"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let apple_music_url = track
        .apple_music
        .as_ref()
        .and_then(|a| a.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let deezer_url = track
        .deezer
        .as_ref()
        .and_then(|d| d.get("id"))
        .and_then(|id| match id {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        })
        .map(|id| format!("https://www.deezer.com/track/{}", id));

    TrackMatch {
        title: track.title.unwrap_or_default(),
        artist: track.artist.unwrap_or_default(),
        album: track.album,
        links: ExternalLinks {
            spotify_url,
            apple_music_url,
            deezer_url,
        },
    }
}

fn describe_error(error: Option<&Value>) -> String {
    match error {
        Some(value) => {
            let code = value.get("error_code").and_then(Value::as_i64);
            let message = value.get("error_message").and_then(Value::as_str);
            match (code, message) {
                (Some(code), Some(message)) => format!("#{}: {}", code, message),
                (None, Some(message)) => message.to_string(),
                _ => value.to_string(),
            }
        }
        None => "unspecified provider error".to_string(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IdentifyError {
    #[error("AudD request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AudD returned HTTP {0}")]
    Status(u16),

    #[error("Failed to parse AudD response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("AudD error {0}")]
    Provider(String),
}
