use crate::{
    media_element::{ChannelOperationError, ChannelSink, PlaybackSurface},
    metadata::Track,
    parser::Cue,
    requester::SegmentSource,
    utils::time_ranges::TimeRanges,
};

use super::js_functions::{
    jsAbortRequest, jsAddCue, jsAddSubtitleTrack, jsAppendBuffer, jsClearCues, jsClearTimer,
    jsFetchRange, jsGetBuffered, jsGetCurrentTime, jsGetDuration, jsIsUpdating, jsRemoveBuffer,
    jsSeek, jsSetMediaSourceDuration, jsSetTimestampOffset, jsTimer, BufferOperationErrorCode,
    JsResult, MediaType, RequestId, SubtitleTrackId, TimerId, TimerReason,
};

/// `SegmentSource` performing requests on the JavaScript-side.
pub struct JsSegmentSource;

impl SegmentSource for JsSegmentSource {
    fn fetch_range(&mut self, start: f64, duration: f64) -> RequestId {
        jsFetchRange(start, duration)
    }

    fn abort(&mut self, request_id: RequestId) -> bool {
        jsAbortRequest(request_id)
    }
}

/// `ChannelSink` backed by the JavaScript SourceBuffer linked to `media_type`.
pub struct JsChannelSink {
    media_type: MediaType,
}

impl JsChannelSink {
    pub fn new(media_type: MediaType) -> Self {
        Self { media_type }
    }
}

impl ChannelSink for JsChannelSink {
    fn buffered(&self) -> TimeRanges {
        TimeRanges::from_flat(&jsGetBuffered(self.media_type))
    }

    fn is_busy(&self) -> bool {
        jsIsUpdating(self.media_type)
    }

    fn append(&mut self, data: Vec<u8>) -> Result<(), ChannelOperationError> {
        jsAppendBuffer(self.media_type, &data)
            .result()
            .map_err(into_channel_error)
    }

    fn remove(&mut self, start: f64, end: f64) -> Result<(), ChannelOperationError> {
        jsRemoveBuffer(self.media_type, start, end)
            .result()
            .map_err(into_channel_error)
    }

    fn set_timeline_offset(&mut self, offset: f64) {
        jsSetTimestampOffset(self.media_type, offset);
    }
}

fn into_channel_error(
    (code, desc): (BufferOperationErrorCode, Option<String>),
) -> ChannelOperationError {
    match code {
        BufferOperationErrorCode::NoSourceBuffer => ChannelOperationError::NoChannel,
        BufferOperationErrorCode::QuotaExceededError => ChannelOperationError::Rejected(
            desc.unwrap_or_else(|| "QuotaExceededError".to_owned()),
        ),
        BufferOperationErrorCode::UnknownError => ChannelOperationError::Rejected(
            desc.unwrap_or_else(|| "Unknown error".to_owned()),
        ),
    }
}

/// `PlaybackSurface` backed by the JavaScript media element and MediaSource.
pub struct JsPlaybackSurface;

impl PlaybackSurface for JsPlaybackSurface {
    fn current_position(&self) -> f64 {
        jsGetCurrentTime()
    }

    fn duration(&self) -> f64 {
        jsGetDuration()
    }

    fn set_duration(&mut self, duration: f64) {
        jsSetMediaSourceDuration(duration);
    }

    fn set_position(&mut self, position: f64) {
        jsSeek(position);
    }

    fn add_subtitle_track(&mut self, track: &Track) -> SubtitleTrackId {
        jsAddSubtitleTrack(&track.label, &track.language)
    }

    fn replace_cues(&mut self, track_id: SubtitleTrackId, cues: &[Cue]) {
        jsClearCues(track_id);
        for cue in cues {
            jsAddCue(track_id, cue.start, cue.end, &cue.text);
        }
    }

    fn start_timer(&mut self, delay_ms: f64, reason: TimerReason) -> TimerId {
        jsTimer(delay_ms, reason)
    }

    fn clear_timer(&mut self, id: TimerId) {
        jsClearTimer(id);
    }
}
