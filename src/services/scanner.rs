//! Sliding-window scan of a set and the track deduplication policy.
//!
//! One sample is cut every `segment_duration` seconds and identified. Results
//! are folded by [`TrackTimeline`]: a match that looks like the currently open
//! track only confirms it, a different match opens a new track, and a run of
//! misses opens a `not_found` gap backdated to where the run began.

use std::path::Path;
use tracing::{debug, info};

use crate::models::track::{SegmentResult, Track};
use crate::services::audio::{AudioSlicer, DecodeError};
use crate::services::identify::TrackIdentifier;
use crate::services::matching::TrackMatcher;

pub const DEFAULT_SEGMENT_DURATION: u64 = 30;
pub const DEFAULT_SAMPLE_LENGTH: u64 = 15;
pub const DEFAULT_GAP_MISS_THRESHOLD: u32 = 2;

/// Window geometry and gap policy of one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    /// Seconds between the starts of consecutive samples.
    pub segment_duration: u64,
    /// Seconds of audio submitted per sample.
    pub sample_length: u64,
    /// Consecutive misses needed before a gap is recorded.
    pub gap_miss_threshold: u32,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            segment_duration: DEFAULT_SEGMENT_DURATION,
            sample_length: DEFAULT_SAMPLE_LENGTH,
            gap_miss_threshold: DEFAULT_GAP_MISS_THRESHOLD,
        }
    }
}

impl ScanSettings {
    pub fn with_segment_duration(self, segment_duration: u64) -> Self {
        Self {
            segment_duration: segment_duration.max(1),
            ..self
        }
    }

    /// Sample start offsets for a set of `duration` seconds.
    ///
    /// Always yields at least `0`, even for sets shorter than one stride.
    pub fn positions(&self, duration: u64) -> impl Iterator<Item = u64> {
        (0..duration.max(1)).step_by(self.segment_duration.max(1) as usize)
    }

    pub fn sample_count(&self, duration: u64) -> u64 {
        duration.max(1).div_ceil(self.segment_duration.max(1))
    }
}

/// Ordered, deduplicated track list built one sample at a time.
pub struct TrackTimeline<'m> {
    matcher: &'m TrackMatcher,
    segment_duration: u64,
    miss_threshold: u32,
    tracks: Vec<Track>,
    consecutive_misses: u32,
}

impl<'m> TrackTimeline<'m> {
    pub fn new(matcher: &'m TrackMatcher, settings: &ScanSettings) -> Self {
        Self {
            matcher,
            segment_duration: settings.segment_duration.max(1),
            miss_threshold: settings.gap_miss_threshold.max(1),
            tracks: Vec::new(),
            consecutive_misses: 0,
        }
    }

    /// Fold the result of the sample starting at `start`.
    ///
    /// Returns the track appended by this sample, if any.
    pub fn record(&mut self, start: u64, result: &SegmentResult) -> Option<&Track> {
        match result {
            SegmentResult::Found(matched) => {
                // A confirmation leaves the miss run open.
                if self.confirms_last(&matched.artist, &matched.title) {
                    return None;
                }
                self.tracks.push(Track::identified(start, matched));
                self.consecutive_misses = 0;
            }
            SegmentResult::NotFound { .. } => {
                self.consecutive_misses = self.consecutive_misses.saturating_add(1);

                let gap_open = self.tracks.last().is_some_and(|t| !t.is_identified());
                if self.consecutive_misses < self.miss_threshold || gap_open {
                    return None;
                }

                let lag = u64::from(self.miss_threshold - 1) * self.segment_duration;
                self.tracks.push(Track::not_found(start.saturating_sub(lag)));
            }
        }
        self.tracks.last()
    }

    fn confirms_last(&self, artist: &str, title: &str) -> bool {
        match self.tracks.last() {
            Some(last) if last.is_identified() => self.matcher.similar(
                last.artist.as_deref().unwrap_or_default(),
                last.title.as_deref().unwrap_or_default(),
                artist,
                title,
            ),
            _ => false,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }
}

/// Progress notifications emitted while scanning.
#[derive(Debug)]
pub enum ScanEvent<'a> {
    /// About to identify sample `index` (1-based) of `total`.
    Sampling { index: u64, total: u64, position: u64 },
    /// The sample at `position` has been folded into `tracks`.
    Recorded { position: u64, tracks: &'a [Track] },
}

/// Drives the sliding window over one set.
pub struct SegmentScanner<'a> {
    audio: &'a dyn AudioSlicer,
    identifier: &'a dyn TrackIdentifier,
    matcher: &'a TrackMatcher,
    settings: ScanSettings,
}

impl<'a> SegmentScanner<'a> {
    pub fn new(
        audio: &'a dyn AudioSlicer,
        identifier: &'a dyn TrackIdentifier,
        matcher: &'a TrackMatcher,
        settings: ScanSettings,
    ) -> Self {
        Self {
            audio,
            identifier,
            matcher,
            settings,
        }
    }

    /// Scan `source` (`duration` seconds long), cutting samples into
    /// `workspace`, and return the final track list.
    ///
    /// Identification failures count as misses. Only a failure to cut a
    /// sample aborts the scan.
    pub async fn scan<F>(
        &self,
        source: &Path,
        duration: u64,
        workspace: &Path,
        mut on_event: F,
    ) -> Result<Vec<Track>, DecodeError>
    where
        F: FnMut(ScanEvent<'_>) + Send,
    {
        let total = self.settings.sample_count(duration);
        let sample_ms = self.settings.sample_length * 1000;
        let limit_ms = if duration == 0 { sample_ms } else { duration * 1000 };
        let mut timeline = TrackTimeline::new(self.matcher, &self.settings);

        for (i, start) in self.settings.positions(duration).enumerate() {
            let index = i as u64 + 1;
            on_event(ScanEvent::Sampling {
                index,
                total,
                position: start,
            });

            let start_ms = start * 1000;
            let end_ms = (start_ms + sample_ms).min(limit_ms);
            let file_name = format!("segment_{}.mp3", i);
            let sample = self
                .audio
                .extract_sample(source, start_ms, end_ms, &workspace.join(&file_name))
                .await?;

            let result = self.identifier.identify(sample, &file_name).await;
            let outcome = match &result {
                SegmentResult::Found(_) => "match",
                SegmentResult::NotFound { error: None } => "miss",
                SegmentResult::NotFound { error: Some(_) } => "error",
            };
            metrics::counter!("segment_identifications_total", "outcome" => outcome).increment(1);
            debug!(start_seconds = start, index, total, outcome, "Sample identified");

            if let Some(track) = timeline.record(start, &result) {
                info!(
                    start_seconds = start,
                    status = %track.status,
                    artist = track.artist.as_deref().unwrap_or("-"),
                    title = track.title.as_deref().unwrap_or("-"),
                    "Track appended"
                );
            }

            on_event(ScanEvent::Recorded {
                position: start,
                tracks: timeline.tracks(),
            });
        }

        Ok(timeline.into_tracks())
    }
}
