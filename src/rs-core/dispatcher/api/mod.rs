use serde::Serialize;

use crate::{
    bindings::MediaType,
    media_element::{ChannelSink, MediaChannels, PlaybackSurface},
    metadata::VideoMetadata,
    requester::{BufferConfiguration, FetchCoordinator, FetchStage, LockKey, SegmentSource},
    utils::time_ranges::TimeRanges,
    Logger,
};

use super::{
    tracks::{AudioSwitch, SubtitleRegistry},
    Dispatcher, PlannerState,
};

/// Snapshot of the `Dispatcher`'s state, for debugging purposes.
#[derive(Clone, Debug, Serialize)]
pub struct DebugState {
    pub position: f64,
    /// Duration used for buffering decisions. Serialized as `null` when unknown.
    pub duration: f64,
    pub planner_state: PlannerState,
    pub is_seeking: bool,
    pub audio_track_id: u64,
    pub is_switching_audio_track: bool,
    pub pending_fetches: Vec<PendingFetchInfo>,
    pub held_locks: Vec<LockKey>,
    /// `None` when the corresponding channel does not exist.
    pub video_buffered: Option<TimeRanges>,
    pub audio_buffered: Option<TimeRanges>,
    /// End of the last chunk appended to each channel since it was last emptied.
    pub video_appended_end: Option<f64>,
    pub audio_appended_end: Option<f64>,
    pub config: BufferConfiguration,
}

#[derive(Clone, Debug, Serialize)]
pub struct PendingFetchInfo {
    pub id: u64,
    pub start: f64,
    pub end: f64,
    /// Either `"requesting"`, `"awaiting_channels"` or `"appending"`.
    pub stage: &'static str,
}

/// Methods exposed to the host, to load a content and influence buffering.
///
/// Note that these are not the only methods it should call. There's also "event_listeners",
/// which should be called when particular events happen.
impl<S: SegmentSource, C: ChannelSink, P: PlaybackSurface> Dispatcher<S, C, P> {
    /// Create a new `Dispatcher` fetching content from `source` and playing it on `surface`,
    /// with the default `BufferConfiguration`.
    pub fn new(source: S, surface: P) -> Self {
        Self::with_config(source, surface, BufferConfiguration::default())
    }

    pub fn with_config(source: S, surface: P, config: BufferConfiguration) -> Self {
        Dispatcher {
            fetcher: FetchCoordinator::new(source),
            channels: MediaChannels::new(),
            surface,
            config,
            metadata: None,
            planner_state: PlannerState::Idle,
            replan_timer: None,
            is_seeking: false,
            audio_track_id: 0,
            audio_switch: AudioSwitch::Idle,
            subtitles: SubtitleRegistry::new(),
        }
    }

    /// Load a new content described by `metadata`, stopping the previous one if any.
    ///
    /// If set, playback will start at `starting_position` seconds, e.g. to resume where the
    /// user left off.
    pub fn load_metadata(&mut self, metadata: VideoMetadata, starting_position: Option<f64>) {
        if self.metadata.is_some() {
            self.reset_content();
        }
        Logger::info(&format!(
            "Api: Loading content of {}s ({} track(s))",
            metadata.duration(),
            metadata.tracks().len()
        ));
        if metadata.duration().is_finite() {
            self.surface.set_duration(metadata.duration());
        }
        self.subtitles.register(&metadata, &mut self.surface);
        Logger::debug(&format!(
            "Api: {} subtitle track(s) registered",
            self.subtitles.len()
        ));
        self.audio_track_id = metadata.audio_tracks().next().map_or(0, |t| t.id);
        self.metadata = Some(metadata);
        if let Some(position) = starting_position {
            if position > 0. {
                Logger::info(&format!("Api: Starting at {position}"));
                self.surface.set_position(position);
            }
        }
        self.check_buffer();
    }

    /// Provide the channels media data should be pushed to, replacing previous ones if any.
    pub fn attach_channels(&mut self, video: Option<C>, audio: Option<C>) {
        self.fetcher.cancel_all();
        // New channels start empty, there is nothing left to switch.
        self.audio_switch = AudioSwitch::Idle;
        self.channels.attach(video, audio);
        self.check_buffer();
    }

    /// Select the audio track whose data should be pushed to the audio channel.
    pub fn set_audio_track(&mut self, track_id: u64) {
        self.switch_audio_track(track_id);
    }

    /// Id of the audio track currently pushed to the audio channel.
    pub fn audio_track(&self) -> u64 {
        self.audio_track_id
    }

    /// Stop the current content and free all its associated resources.
    pub fn stop(&mut self) {
        Logger::info("Api: Stopping current content");
        self.reset_content();
        self.channels.reset();
    }

    pub fn config(&self) -> &BufferConfiguration {
        &self.config
    }

    pub fn set_forward_buffer_required(&mut self, value: f64) {
        self.config.forward_buffer_required = value;
        self.check_buffer();
    }

    pub fn set_forward_buffer_optimal(&mut self, value: f64) {
        self.config.forward_buffer_optimal = value;
        self.check_buffer();
    }

    pub fn set_backward_buffer_target(&mut self, value: f64) {
        self.config.backward_buffer_target = value;
        self.check_buffer();
    }

    pub fn set_max_backward_buffer(&mut self, value: f64) {
        self.config.max_backward_buffer = value;
        self.check_buffer();
    }

    pub fn set_min_fetch_gap(&mut self, value: f64) {
        self.config.min_fetch_gap = value;
        self.check_buffer();
    }

    pub fn set_lock_granularity(&mut self, value: f64) {
        self.config.lock_granularity = value;
        self.check_buffer();
    }

    pub fn set_switch_alignment(&mut self, value: f64) {
        self.config.switch_alignment = value;
    }

    pub fn set_switch_position_nudge(&mut self, value: f64) {
        self.config.switch_position_nudge = value;
    }

    pub fn set_discontinuity_tolerance(&mut self, value: f64) {
        self.config.discontinuity_tolerance = value;
    }

    pub fn debug_state(&self) -> DebugState {
        DebugState {
            position: self.surface.current_position(),
            duration: self.content_duration(),
            planner_state: self.planner_state,
            is_seeking: self.is_seeking,
            audio_track_id: self.audio_track_id,
            is_switching_audio_track: self.audio_switch.is_in_progress(),
            pending_fetches: self
                .fetcher
                .pending()
                .iter()
                .map(|p| PendingFetchInfo {
                    id: p.id(),
                    start: p.range().start(),
                    end: p.range().end(),
                    stage: match p.stage() {
                        FetchStage::Requesting { .. } => "requesting",
                        FetchStage::AwaitingChannels(_) => "awaiting_channels",
                        FetchStage::Appending { .. } => "appending",
                    },
                })
                .collect(),
            held_locks: self.fetcher.held_locks(),
            video_buffered: self.channels.get(MediaType::Video).map(|c| c.buffered()),
            audio_buffered: self.channels.get(MediaType::Audio).map(|c| c.buffered()),
            video_appended_end: self
                .channels
                .get(MediaType::Video)
                .and_then(|c| c.last_appended_end()),
            audio_appended_end: self
                .channels
                .get(MediaType::Audio)
                .and_then(|c| c.last_appended_end()),
            config: self.config.clone(),
        }
    }

    /// Forget everything linked to the current content, except the channels.
    fn reset_content(&mut self) {
        self.fetcher.cancel_all();
        if let Some(timer_id) = self.replan_timer.take() {
            self.surface.clear_timer(timer_id);
        }
        self.metadata = None;
        self.subtitles.clear();
        self.audio_switch = AudioSwitch::Idle;
        self.audio_track_id = 0;
        self.is_seeking = false;
        self.planner_state = PlannerState::Idle;
    }
}
