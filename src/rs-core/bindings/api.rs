use crate::{
    dispatcher::Dispatcher, metadata::VideoMetadata, utils::logger::LoggerLevel, wasm_bindgen,
    JsError, Logger,
};

use super::{
    event_listeners::ChunkPlayer,
    js_functions::{LogLevel, MediaType},
    js_host::{JsChannelSink, JsPlaybackSurface, JsSegmentSource},
};

/// Methods exposed to the JavaScript-side.
///
/// Note that these are not the only methods callable by JavaScript. There's
/// also "event_listeners" which as its name point at, should be called when particular
/// events happen.
#[wasm_bindgen]
impl ChunkPlayer {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        ChunkPlayer {
            dispatcher: Dispatcher::new(JsSegmentSource, JsPlaybackSurface),
        }
    }

    /// Load the content described by the given JSON metadata document.
    ///
    /// # Arguments
    ///
    /// * `metadata` - The metadata document, as sent by the media endpoint.
    ///
    /// * `starting_position` - Position, in seconds, at which playback should start, e.g. where
    ///   the user left off.
    pub fn load_metadata(
        &mut self,
        metadata: &str,
        starting_position: Option<f64>,
    ) -> Result<(), JsError> {
        match VideoMetadata::from_json(metadata) {
            Ok(metadata) => {
                self.dispatcher.load_metadata(metadata, starting_position);
                Ok(())
            }
            Err(err) => {
                Logger::error(&format!("Api: Could not load metadata: {err}"));
                Err(JsError::new(&err.to_string()))
            }
        }
    }

    /// To call once the SourceBuffers have been created on the JavaScript-side.
    pub fn attach_source_buffers(&mut self, has_video: bool, has_audio: bool) {
        self.dispatcher.attach_channels(
            has_video.then(|| JsChannelSink::new(MediaType::Video)),
            has_audio.then(|| JsChannelSink::new(MediaType::Audio)),
        );
    }

    pub fn set_audio_track(&mut self, track_id: u64) {
        self.dispatcher.set_audio_track(track_id);
    }

    /// Stop the currently loaded content.
    pub fn stop(&mut self) {
        self.dispatcher.stop();
    }

    pub fn set_log_level(&mut self, level: Option<LogLevel>) {
        Logger::set_logger_level(match level {
            None => LoggerLevel::None,
            Some(LogLevel::Error) => LoggerLevel::Error,
            Some(LogLevel::Warn) => LoggerLevel::Warn,
            Some(LogLevel::Info) => LoggerLevel::Info,
            Some(LogLevel::Debug) => LoggerLevel::Debug,
        });
    }

    pub fn set_forward_buffer_required(&mut self, value: f64) {
        self.dispatcher.set_forward_buffer_required(value);
    }

    pub fn set_forward_buffer_optimal(&mut self, value: f64) {
        self.dispatcher.set_forward_buffer_optimal(value);
    }

    pub fn set_backward_buffer_target(&mut self, value: f64) {
        self.dispatcher.set_backward_buffer_target(value);
    }

    pub fn set_max_backward_buffer(&mut self, value: f64) {
        self.dispatcher.set_max_backward_buffer(value);
    }

    pub fn set_min_fetch_gap(&mut self, value: f64) {
        self.dispatcher.set_min_fetch_gap(value);
    }

    pub fn set_lock_granularity(&mut self, value: f64) {
        self.dispatcher.set_lock_granularity(value);
    }

    pub fn set_switch_alignment(&mut self, value: f64) {
        self.dispatcher.set_switch_alignment(value);
    }

    pub fn set_switch_position_nudge(&mut self, value: f64) {
        self.dispatcher.set_switch_position_nudge(value);
    }

    pub fn set_discontinuity_tolerance(&mut self, value: f64) {
        self.dispatcher.set_discontinuity_tolerance(value);
    }

    /// Returns a JSON snapshot of the player's internal state.
    pub fn debug_state(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.dispatcher.debug_state())
            .map_err(|err| JsError::new(&err.to_string()))
    }
}

impl Default for ChunkPlayer {
    fn default() -> Self {
        Self::new()
    }
}
