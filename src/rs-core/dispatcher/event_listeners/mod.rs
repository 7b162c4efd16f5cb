use crate::{
    bindings::{MediaType, PlaybackEvent, RequestErrorReason, RequestId, TimerId, TimerReason},
    media_element::{ChannelOperation, ChannelSink, PlaybackSurface},
    requester::{RequestOutcome, SegmentSource},
    Logger,
};

use super::Dispatcher;

/// Methods to call when the corresponding event happened on the host.
impl<S: SegmentSource, C: ChannelSink, P: PlaybackSurface> Dispatcher<S, C, P> {
    /// To call on each playback event on which buffering should be re-evaluated.
    pub fn on_playback_event(&mut self, event: PlaybackEvent) {
        Logger::lazy_debug(&|| {
            format!(
                "Event: {:?} at {}",
                event,
                self.surface.current_position()
            )
        });
        if event == PlaybackEvent::Seeking {
            self.is_seeking = true;
            self.fetcher.cancel_all();
            self.on_seek_during_switch();
        }
        self.check_buffer();
    }

    /// To call once a request started through the `SegmentSource` finished with success.
    ///
    /// # Arguments
    ///
    /// * `request_id` - The identifier returned by the `SegmentSource` when the request was
    ///   started.
    ///
    /// * `data` - The response's body.
    pub fn on_request_finished(&mut self, request_id: RequestId, data: &[u8]) {
        match self.fetcher.on_request_success(request_id, data) {
            RequestOutcome::NotFound => {}
            RequestOutcome::DecodeFailed(fetch_id) => {
                self.on_fetch_failed(fetch_id);
                self.check_buffer();
            }
            RequestOutcome::Decoded(_) => {
                self.push_ready_fetches();
                self.check_buffer();
            }
        }
    }

    /// To call once a request started through the `SegmentSource` failed.
    ///
    /// # Arguments
    ///
    /// * `request_id` - The identifier returned by the `SegmentSource` when the request was
    ///   started.
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
        if let Some(fetch_id) = self.fetcher.on_request_failure(request_id, reason, status) {
            self.on_fetch_failed(fetch_id);
            self.check_buffer();
        }
    }

    /// To call once the operation pending on the `media_type` channel ended with success.
    pub fn on_channel_update_end(&mut self, media_type: MediaType) {
        let Some(channel) = self.channels.get_mut(media_type) else {
            Logger::warn(&format!("Event: update on unknown {media_type} channel"));
            return;
        };
        match channel.on_operation_end() {
            Some(ChannelOperation::Append { fetch_id, .. }) => {
                if let Some(fetch) = self.fetcher.on_append_done(fetch_id, media_type) {
                    self.on_fetch_completed(fetch);
                }
            }
            Some(ChannelOperation::Remove { start, end }) => {
                Logger::debug(&format!(
                    "Event: Removed {media_type} data from {start} to {end}"
                ));
            }
            None => {}
        }
        self.on_channels_update();
    }

    /// To call if the operation pending on the `media_type` channel failed.
    pub fn on_channel_error(&mut self, media_type: MediaType) {
        let Some(channel) = self.channels.get_mut(media_type) else {
            return;
        };
        if let Some(ChannelOperation::Append { fetch_id, .. }) = channel.on_operation_error() {
            if self.fetcher.on_append_failed(fetch_id) {
                self.on_fetch_failed(fetch_id);
            }
        }
        self.on_channels_update();
    }

    /// To call once a timer started through the `PlaybackSurface` ended.
    ///
    /// # Arguments
    ///
    /// * `id` - The `TimerId` returned when the timer was started.
    ///
    /// * `reason` - The `TimerReason` given when the timer was started.
    pub fn on_timer_ended(&mut self, id: TimerId, reason: TimerReason) {
        match reason {
            TimerReason::BufferCheck => {
                if self.replan_timer == Some(id) {
                    self.replan_timer = None;
                    self.check_buffer();
                }
            }
        }
    }

    /// Continue what was waiting for a channel operation to end.
    fn on_channels_update(&mut self) {
        self.advance_audio_switch();
        self.push_ready_fetches();
        self.check_buffer();
    }
}
