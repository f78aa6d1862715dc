//! Canned identification answers and AudD payloads

#![allow(dead_code)]

use set_decoder::models::track::{ExternalLinks, SegmentResult, TrackMatch};

pub fn track(artist: &str, title: &str) -> TrackMatch {
    TrackMatch {
        artist: artist.to_string(),
        title: title.to_string(),
        album: None,
        links: ExternalLinks::default(),
    }
}

pub fn found(artist: &str, title: &str) -> SegmentResult {
    SegmentResult::Found(track(artist, title))
}

/// Full AudD success body with all three providers.
pub const AUDD_MATCH: &str = r#"{
  "status": "success",
  "result": {
    "artist": "Bicep",
    "title": "Glue",
    "album": "Bicep",
    "release_date": "2017-09-01",
    "label": "Ninja Tune",
    "timecode": "00:42",
    "song_link": "https://lis.tn/Glue",
    "apple_music": { "url": "https://music.apple.com/us/album/glue/1262365394?i=1262365836" },
    "spotify": { "external_urls": { "spotify": "https://open.spotify.com/track/2aJDlirz6v2a4HREki98cP" } },
    "deezer": { "id": 390532012, "link": "https://www.deezer.com/track/390532012" }
  }
}"#;

/// AudD body when the sample was not recognized.
pub const AUDD_NO_MATCH: &str = r#"{"status": "success", "result": null}"#;

/// AudD body for a rejected request.
pub const AUDD_ERROR: &str =
    r#"{"status": "error", "error": {"error_code": 901, "error_message": "Recognition failed: no api_token"}}"#;
