//! Core types for listen-harvest

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// One track, artist or playlist entry as returned by the API
///
/// Key order is preserved, so keys appended by the pipeline (`audio_features`,
/// `user`, `playlist`, `time_range`) always come after the API's own fields.
pub type Record = Map<String, Value>;

/// Key under which a normalized record holds its track fields
pub const TRACK_KEY: &str = "track";
/// Key appended by the feature joiner
pub const AUDIO_FEATURES_KEY: &str = "audio_features";
/// Key appended when the token owner's profile is attached
pub const USER_KEY: &str = "user";
/// Key appended when expanding a playlist listing
pub const PLAYLIST_KEY: &str = "playlist";
/// Key appended by top-item pipelines
pub const TIME_RANGE_KEY: &str = "time_range";

/// Snapshot of a client's request counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchStats {
    /// HTTP requests sent, retried attempts included
    pub requests: u64,
    /// 429 responses observed
    pub backoffs: u64,
}

/// Listening period covered by the top-items endpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    /// Several years of data
    LongTerm,
    /// Roughly the last six months
    MediumTerm,
    /// Roughly the last four weeks
    ShortTerm,
}

impl TimeRange {
    /// All time ranges, longest first
    pub const ALL: [TimeRange; 3] = [
        TimeRange::LongTerm,
        TimeRange::MediumTerm,
        TimeRange::ShortTerm,
    ];

    /// Query-string value
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::LongTerm => "long_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::ShortTerm => "short_term",
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity type listed by the top-items endpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopKind {
    /// Top artists
    Artists,
    /// Top tracks
    Tracks,
}

impl TopKind {
    /// Path segment
    pub fn as_str(&self) -> &'static str {
        match self {
            TopKind::Artists => "artists",
            TopKind::Tracks => "tracks",
        }
    }
}

/// Endpoint URLs relative to a base URL
///
/// ```
/// use listen_harvest::types::{Endpoints, TimeRange, TopKind};
///
/// let endpoints = Endpoints::new("https://api.spotify.com/v1/");
/// assert_eq!(endpoints.library(), "https://api.spotify.com/v1/me/tracks");
/// assert_eq!(
///     endpoints.top(TopKind::Tracks, TimeRange::ShortTerm),
///     "https://api.spotify.com/v1/me/top/tracks?time_range=short_term"
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    /// Create endpoints rooted at `base_url` (a trailing slash is ignored)
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Base URL without trailing slash
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Join a path onto the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    /// Token owner's profile
    pub fn me(&self) -> String {
        self.url("me")
    }

    /// Token owner's saved tracks
    pub fn library(&self) -> String {
        self.url("me/tracks")
    }

    /// Token owner's playlists
    pub fn my_playlists(&self) -> String {
        self.url("me/playlists")
    }

    /// Public playlists of another user
    pub fn user_playlists(&self, user_id: &str) -> String {
        self.url(&format!("users/{user_id}/playlists"))
    }

    /// Tracks of one playlist
    pub fn playlist_tracks(&self, playlist_id: &str) -> String {
        self.url(&format!("playlists/{playlist_id}/tracks"))
    }

    /// Top artists or tracks over a time range
    pub fn top(&self, kind: TopKind, time_range: TimeRange) -> String {
        format!(
            "{}?time_range={}",
            self.url(&format!("me/top/{}", kind.as_str())),
            time_range.as_str()
        )
    }

    /// Bulk audio-features lookup
    pub fn audio_features(&self) -> String {
        self.url("audio-features")
    }
}

/// Typed view of one audio-features vector
///
/// Every field is optional: the API omits or nulls fields for tracks it could
/// not analyse.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    /// Track id the vector belongs to
    pub id: Option<String>,
    /// Suitability for dancing (0.0-1.0)
    pub danceability: Option<f64>,
    /// Perceived intensity (0.0-1.0)
    pub energy: Option<f64>,
    /// Pitch class of the key (-1 when undetected)
    pub key: Option<i32>,
    /// Overall loudness in dB
    pub loudness: Option<f64>,
    /// 1 for major, 0 for minor
    pub mode: Option<i32>,
    /// Presence of spoken words (0.0-1.0)
    pub speechiness: Option<f64>,
    /// Confidence the track is acoustic (0.0-1.0)
    pub acousticness: Option<f64>,
    /// Likelihood the track has no vocals (0.0-1.0)
    pub instrumentalness: Option<f64>,
    /// Presence of an audience (0.0-1.0)
    pub liveness: Option<f64>,
    /// Musical positiveness (0.0-1.0)
    pub valence: Option<f64>,
    /// Estimated tempo in BPM
    pub tempo: Option<f64>,
    /// Track length in milliseconds
    pub duration_ms: Option<u64>,
    /// Estimated beats per bar
    pub time_signature: Option<i32>,
}

/// Id of the track held by a normalized record, if any
pub fn track_id(record: &Record) -> Option<&str> {
    record.get(TRACK_KEY)?.get("id")?.as_str()
}

/// When the track was saved or added, for records that carry `added_at`
///
/// # Errors
/// Returns [`Error::Shape`] if `added_at` is present but not an RFC 3339 timestamp.
pub fn added_at(record: &Record) -> Result<Option<DateTime<Utc>>> {
    match record.get("added_at") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| {
                Error::shape(
                    format!("added_at is not an RFC 3339 timestamp: {e}"),
                    Value::String(s.clone()),
                )
            }),
        Some(other) => Err(Error::shape("added_at is not a string", other.clone())),
    }
}

/// Typed audio features of a joined record
///
/// Returns `Ok(None)` when the record has no vector or the API returned `null`
/// for the track.
pub fn audio_features(record: &Record) -> Result<Option<AudioFeatures>> {
    match record.get(AUDIO_FEATURES_KEY) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(AudioFeatures::deserialize(value)?)),
    }
}
