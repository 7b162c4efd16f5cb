use thiserror::Error;

use crate::{
    bindings::{MediaType, SubtitleTrackId, TimerId, TimerReason},
    metadata::Track,
    parser::Cue,
    utils::time_ranges::TimeRanges,
};

pub(crate) use channel::{ChannelOperation, ChannelState};

mod channel;

/// Lower-level media buffer for a single `MediaType`, such as a MSE `SourceBuffer`.
///
/// Buffer operations (`append` and `remove`) are asynchronous: their completion has to be
/// reported to the `Dispatcher` through its `on_channel_update_end` method, or their failure
/// through `on_channel_error`.
pub trait ChannelSink {
    /// Time ranges, in seconds, currently buffered.
    fn buffered(&self) -> TimeRanges;

    /// Returns `true` while an operation is being performed by the sink.
    fn is_busy(&self) -> bool;

    /// Start appending the given media data.
    fn append(&mut self, data: Vec<u8>) -> Result<(), ChannelOperationError>;

    /// Start removing buffered data from `start` to `end`, in seconds.
    fn remove(&mut self, start: f64, end: f64) -> Result<(), ChannelOperationError>;

    /// Offset, in seconds, added to the timestamps of the next appended data.
    fn set_timeline_offset(&mut self, offset: f64);
}

/// The element on which the content is played, and its scheduling environment.
pub trait PlaybackSurface {
    /// Current playback position, in seconds.
    fn current_position(&self) -> f64;

    /// Duration of the content, in seconds. Not finite when unknown.
    fn duration(&self) -> f64;

    fn set_duration(&mut self, duration: f64);

    /// Move the playhead to `position`, in seconds.
    fn set_position(&mut self, position: f64);

    /// Create a text track for the given subtitle `Track`.
    fn add_subtitle_track(&mut self, track: &Track) -> SubtitleTrackId;

    /// Replace all cues of the given text track by `cues`.
    fn replace_cues(&mut self, track_id: SubtitleTrackId, cues: &[Cue]);

    /// Start a timer of `delay_ms` milliseconds. Its expiry has to be reported to the
    /// `Dispatcher` through its `on_timer_ended` method.
    fn start_timer(&mut self, delay_ms: f64, reason: TimerReason) -> TimerId;

    fn clear_timer(&mut self, id: TimerId);
}

/// Error encountered synchronously when trying to start an operation on a channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelOperationError {
    #[error("No channel has been created for that media type")]
    NoChannel,
    #[error("Another operation is already pending on that channel")]
    Busy,
    #[error("The operation was rejected: {0}")]
    Rejected(String),
}

/// The two playback channels content is pushed to.
pub(crate) struct MediaChannels<C: ChannelSink> {
    /// Channel for video data.
    /// `None` if not created yet.
    video: Option<ChannelState<C>>,

    /// Channel for audio data.
    /// `None` if not created yet.
    audio: Option<ChannelState<C>>,
}

impl<C: ChannelSink> MediaChannels<C> {
    pub(crate) fn new() -> Self {
        Self {
            video: None,
            audio: None,
        }
    }

    /// Install the given sinks, replacing any previously attached one.
    pub(crate) fn attach(&mut self, video: Option<C>, audio: Option<C>) {
        self.video = video.map(|s| ChannelState::new(MediaType::Video, s));
        self.audio = audio.map(|s| ChannelState::new(MediaType::Audio, s));
    }

    pub(crate) fn reset(&mut self) {
        self.video = None;
        self.audio = None;
    }

    /// Returns `true` if at least one channel exists.
    pub(crate) fn is_attached(&self) -> bool {
        self.video.is_some() || self.audio.is_some()
    }

    pub(crate) fn get(&self, media_type: MediaType) -> Option<&ChannelState<C>> {
        match media_type {
            MediaType::Video => self.video.as_ref(),
            MediaType::Audio => self.audio.as_ref(),
        }
    }

    pub(crate) fn get_mut(&mut self, media_type: MediaType) -> Option<&mut ChannelState<C>> {
        match media_type {
            MediaType::Video => self.video.as_mut(),
            MediaType::Audio => self.audio.as_mut(),
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &ChannelState<C>> {
        self.video.iter().chain(self.audio.iter())
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ChannelState<C>> {
        self.video.iter_mut().chain(self.audio.iter_mut())
    }

    /// Returns `true` if no operation is pending on any existing channel.
    pub(crate) fn all_idle(&self) -> bool {
        self.iter().all(|c| !c.is_busy())
    }

    /// Returns `true` if an operation is pending on at least one channel.
    pub(crate) fn any_busy(&self) -> bool {
        !self.all_idle()
    }

    /// Time ranges for which playable content is buffered: the intersection of both channels if
    /// both contain data, else whichever one does.
    pub(crate) fn primary_coverage(&self) -> TimeRanges {
        let video = self.video.as_ref().map(|c| c.buffered()).unwrap_or_default();
        let audio = self.audio.as_ref().map(|c| c.buffered()).unwrap_or_default();
        match (video.is_empty(), audio.is_empty()) {
            (false, false) => video.intersect(&audio),
            (false, true) => video,
            (true, false) => audio,
            (true, true) => TimeRanges::new(),
        }
    }
}
