use serde::Serialize;

use crate::{
    bindings::TimerId,
    media_element::{ChannelSink, MediaChannels, PlaybackSurface},
    metadata::VideoMetadata,
    requester::{BufferConfiguration, FetchCoordinator, SegmentSource},
};

pub use api::{DebugState, PendingFetchInfo};
use tracks::{AudioSwitch, SubtitleRegistry};

mod api;
mod core;
mod event_listeners;
mod tracks;

#[cfg(test)]
mod tests;

/// The `Dispatcher` is the session object of the player: it owns every piece of state linked to
/// the loaded content and takes all buffering decisions.
///
/// It never blocks: it reacts to events communicated through its event-listener methods
/// (playback events, request and channel operation results, timers) by asking its
/// `SegmentSource`, `ChannelSink`s and `PlaybackSurface` to perform new operations.
pub struct Dispatcher<S: SegmentSource, C: ChannelSink, P: PlaybackSurface> {
    /// Issues and follows fetches of media chunks, until their data is pushed.
    fetcher: FetchCoordinator<S>,

    /// The video and audio channels media data is pushed to.
    channels: MediaChannels<C>,

    /// The element on which the content plays.
    surface: P,

    config: BufferConfiguration,

    /// Metadata of the loaded content. `None` if no content is loaded.
    metadata: Option<VideoMetadata>,

    planner_state: PlannerState,

    /// Timer started to run a follow-up buffer check, if one is scheduled.
    replan_timer: Option<TimerId>,

    /// Set when the playback surface began seeking, until the new position is covered.
    is_seeking: bool,

    /// Id of the audio track whose payloads are pushed to the audio channel.
    audio_track_id: u64,

    /// Progress of the current audio track switch.
    audio_switch: AudioSwitch,

    /// Text tracks created for each available subtitle track.
    subtitles: SubtitleRegistry,
}

/// State of the buffer-planning loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PlannerState {
    /// No buffer check is running.
    Idle,
    /// A buffer check is running.
    Planning,
    /// A buffer check is running and another one was asked in the meantime. A single follow-up
    /// check will be scheduled once it ends.
    PlanningWithReplan,
}
