use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use thiserror::Error;

/// Kind of media carried by a `Track`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Subtitle,
}

/// Description of a single selectable track of the content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    /// Identifier of the track, as known by the media endpoint.
    ///
    /// For subtitle tracks, this is also their index among subtitle tracks.
    pub id: u64,
    pub kind: TrackKind,
    /// Human-readable name for that track.
    pub label: String,
    /// Language of that track, empty when unknown.
    pub language: String,
}

/// Information on the loaded content, obtained once when it is loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    duration: f64,
    tracks: Vec<Track>,
    unavailable_subtitles: HashSet<usize>,
}

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Invalid metadata document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid content duration: {0}")]
    InvalidDuration(f64),
}

impl VideoMetadata {
    pub fn new(duration: f64, tracks: Vec<Track>, unavailable_subtitles: HashSet<usize>) -> Self {
        Self {
            duration,
            tracks,
            unavailable_subtitles,
        }
    }

    /// Parse the JSON metadata document sent by the media endpoint.
    ///
    /// Video tracks it may list are ignored.
    pub fn from_json(data: &str) -> Result<Self, MetadataError> {
        let raw: RawMetadata = serde_json::from_str(data)?;
        if raw.duration.is_nan() || raw.duration < 0. {
            return Err(MetadataError::InvalidDuration(raw.duration));
        }
        let tracks = raw
            .tracks
            .into_iter()
            .filter_map(|t| {
                let kind = t.kind.track_kind()?;
                Some(Track {
                    id: t.id,
                    kind,
                    label: t.label,
                    language: t.language.unwrap_or_default(),
                })
            })
            .collect();
        Ok(Self {
            duration: raw.duration,
            tracks,
            unavailable_subtitles: raw.unavailable_subs.into_iter().collect(),
        })
    }

    /// Duration of the whole content, in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(|t| t.kind == TrackKind::Audio)
    }

    /// Subtitle tracks, in the order in which they were announced.
    pub fn subtitle_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(|t| t.kind == TrackKind::Subtitle)
    }

    /// Returns `false` if the subtitle track at that index (among subtitle tracks) cannot be
    /// served by the media endpoint.
    pub fn is_subtitle_available(&self, index: usize) -> bool {
        !self.unavailable_subtitles.contains(&index)
    }

    pub fn has_audio_track(&self, id: u64) -> bool {
        self.audio_tracks().any(|t| t.id == id)
    }
}

#[derive(Deserialize)]
struct RawMetadata {
    duration: f64,
    #[serde(default)]
    tracks: Vec<RawTrack>,
    #[serde(default)]
    unavailable_subs: Vec<usize>,
}

#[derive(Deserialize)]
struct RawTrack {
    id: u64,
    kind: RawTrackKind,
    #[serde(default)]
    label: String,
    #[serde(default)]
    language: Option<String>,
}

/// Track kinds are either sent as a plain name (`"Audio"`) or as a single-key object
/// (`{"Subtitle": true}`).
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTrackKind {
    Name(String),
    Tagged(HashMap<String, serde_json::Value>),
}

impl RawTrackKind {
    fn track_kind(&self) -> Option<TrackKind> {
        let name = match self {
            RawTrackKind::Name(name) => name.as_str(),
            RawTrackKind::Tagged(map) if map.len() == 1 => map.keys().next()?.as_str(),
            RawTrackKind::Tagged(_) => return None,
        };
        match name {
            "Audio" => Some(TrackKind::Audio),
            "Subtitle" => Some(TrackKind::Subtitle),
            _ => None,
        }
    }
}
