use crate::{dispatcher::Dispatcher, wasm_bindgen};

use super::{
    js_functions::{MediaType, PlaybackEvent, RequestErrorReason, RequestId, TimerId, TimerReason},
    js_host::{JsChannelSink, JsPlaybackSurface, JsSegmentSource},
};

/// The `ChunkPlayer` is the player interface exported to the JavaScript-side.
///
/// It wraps a `Dispatcher` relying on JavaScript functions to perform requests, push media data
/// and interact with the media element.
#[wasm_bindgen]
pub struct ChunkPlayer {
    pub(super) dispatcher: Dispatcher<JsSegmentSource, JsChannelSink, JsPlaybackSurface>,
}

/// Methods triggered on JavaScript events by the JavaScript code.
///
/// Those functions are voluntarly written a certain way to put in evidence that
/// those should just be bindings converting to the right types without directly
/// interacting with the `Dispatcher`'s state.
#[wasm_bindgen]
impl ChunkPlayer {
    /// The JS code should call this method on each media element event on which buffering
    /// should be re-evaluated.
    pub fn on_playback_event(&mut self, event: PlaybackEvent) {
        self.dispatcher.on_playback_event(event);
    }

    /// The JS code should call this method each time a request started with `jsFetchRange`
    /// finished with success.
    ///
    /// # Arguments
    ///
    /// * `request_id` - The identifier given by `jsFetchRange` when the request
    ///   was started. This allows the `ChunkPlayer` to identify which request
    ///   is actually finished
    ///
    /// * `data` - The response's body.
    pub fn on_request_finished(&mut self, request_id: RequestId, data: &[u8]) {
        self.dispatcher.on_request_finished(request_id, data);
    }

    /// The JS code should call this method each time a request started with `jsFetchRange`
    /// finished with an error.
    ///
    /// # Arguments
    ///
    /// * `request_id` - The identifier given by `jsFetchRange` when the request
    ///   was started.
    ///
    /// * `reason` - The category of error encountered.
    ///
    /// * `status` - The HTTP status received, if one.
    pub fn on_request_failed(
        &mut self,
        request_id: RequestId,
        reason: RequestErrorReason,
        status: Option<u32>,
    ) {
        self.dispatcher.on_request_failed(request_id, reason, status);
    }

    /// The JS code should call this method when a SourceBuffer emits an `updateend` event.
    ///
    /// # Arguments
    ///
    /// * `media_type` - The `MediaType` of the SourceBuffer which emitted this event.
    pub fn on_source_buffer_update(&mut self, media_type: MediaType) {
        self.dispatcher.on_channel_update_end(media_type);
    }

    /// The JS code should call this method when a SourceBuffer emits an `error` event.
    ///
    /// # Arguments
    ///
    /// * `media_type` - The `MediaType` of the SourceBuffer which emitted this event.
    pub fn on_source_buffer_error(&mut self, media_type: MediaType) {
        self.dispatcher.on_channel_error(media_type);
    }

    /// The JS code should call this method each time a timer started with the `jsTimer`
    /// function finished.
    ///
    /// # Arguments
    ///
    /// * `id` - The `TimerId` given by `jsTimer` when the timer was started.
    ///
    /// * `reason` - The `TimerReason` given by the Rust code when that timer
    ///   was started.
    pub fn on_timer_ended(&mut self, id: TimerId, reason: TimerReason) {
        self.dispatcher.on_timer_ended(id, reason);
    }
}
