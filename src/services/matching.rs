//! Track name normalization and fuzzy "same track" comparison.
//!
//! The fingerprinting provider reports the same song with drifting metadata
//! across consecutive samples of a set: remix credits come and go, featured
//! artists are reordered, bracketed annotations appear on some answers only.
//! Comparison therefore happens on a normalized `"artist - title"` key, with a
//! stricter title-only fallback because artist fields are the noisier half.

use regex::Regex;
use std::sync::OnceLock;

/// Minimum LCS ratio between full normalized keys.
pub const KEY_SIMILARITY_THRESHOLD: f64 = 0.80;

/// Minimum LCS ratio between the title portions of normalized keys.
pub const TITLE_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Version and credit annotations stripped before comparison.
pub const NOISE_WORDS: &[&str] = &[
    "remix",
    "edit",
    "bootleg",
    "mix",
    "version",
    "extended",
    "original",
    "radio",
    "club",
    "dub",
    "instrumental",
    "vip",
    "flip",
    "rework",
    "remaster",
    "remastered",
    "feat",
    "ft",
    "featuring",
    "prod",
    "produced",
];

const KEY_SEPARATOR: &str = " - ";

static PARENTHESIZED: OnceLock<Regex> = OnceLock::new();
static BRACKETED: OnceLock<Regex> = OnceLock::new();
static PUNCTUATION: OnceLock<Regex> = OnceLock::new();

fn parenthesized() -> &'static Regex {
    PARENTHESIZED.get_or_init(|| Regex::new(r"\([^)]*\)").expect("valid regex"))
}

fn bracketed() -> &'static Regex {
    BRACKETED.get_or_init(|| Regex::new(r"\[[^\]]*\]").expect("valid regex"))
}

fn punctuation() -> &'static Regex {
    PUNCTUATION.get_or_init(|| Regex::new(r"[^\w\s]").expect("valid regex"))
}

/// Tunable parts of the comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    pub key_threshold: f64,
    pub title_threshold: f64,
    pub noise_words: Vec<String>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            key_threshold: KEY_SIMILARITY_THRESHOLD,
            title_threshold: TITLE_SIMILARITY_THRESHOLD,
            noise_words: NOISE_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

/// Normalizes track names and decides whether two answers are the same song.
#[derive(Debug, Clone)]
pub struct TrackMatcher {
    key_threshold: f64,
    title_threshold: f64,
    noise: Option<Regex>,
}

impl TrackMatcher {
    pub fn new(config: &MatchConfig) -> Result<Self, regex::Error> {
        let words: Vec<String> = config
            .noise_words
            .iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .map(|w| regex::escape(&w))
            .collect();

        let noise = if words.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(r"\b(?:{})\b", words.join("|")))?)
        };

        Ok(Self {
            key_threshold: config.key_threshold,
            title_threshold: config.title_threshold,
            noise,
        })
    }

    /// Canonical `"artist - title"` key, or an empty string when either
    /// input is empty.
    pub fn normalize(&self, artist: &str, title: &str) -> String {
        if artist.is_empty() || title.is_empty() {
            return String::new();
        }

        let artist = artist.trim().to_lowercase();
        let title = title.trim().to_lowercase();

        let title = parenthesized().replace_all(&title, "");
        let title = bracketed().replace_all(&title, "").into_owned();

        let artist = self.clean_words(&artist);
        let title = self.clean_words(&title);

        format!("{}{}{}", artist, KEY_SEPARATOR, title)
    }

    fn clean_words(&self, text: &str) -> String {
        let without_noise = match &self.noise {
            Some(noise) => noise.replace_all(text, "").into_owned(),
            None => text.to_string(),
        };
        let stripped = punctuation().replace_all(&without_noise, "");
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Whether two (artist, title) pairs name the same underlying track.
    pub fn similar(&self, artist_a: &str, title_a: &str, artist_b: &str, title_b: &str) -> bool {
        let key_a = self.normalize(artist_a, title_a);
        let key_b = self.normalize(artist_b, title_b);

        if key_a.is_empty() || key_b.is_empty() {
            return false;
        }

        if key_a == key_b {
            return true;
        }

        if lcs_ratio(&key_a, &key_b) > self.key_threshold {
            return true;
        }

        lcs_ratio(title_portion(&key_a), title_portion(&key_b)) > self.title_threshold
    }
}

impl Default for TrackMatcher {
    fn default() -> Self {
        TrackMatcher::new(&MatchConfig::default()).expect("default noise words form a valid pattern")
    }
}

/// Text after the last key separator, or the whole key.
fn title_portion(key: &str) -> &str {
    match key.rsplit_once(KEY_SEPARATOR) {
        Some((_, title)) => title,
        None => key,
    }
}

/// `2 * LCS / (|a| + |b|)` over characters, in `[0, 1]`.
///
/// Two empty strings are identical and score 1.0.
pub fn lcs_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    2.0 * prev[b.len()] as f64 / total as f64
}
