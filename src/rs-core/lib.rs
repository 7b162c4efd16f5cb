use wasm_bindgen::prelude::*;

mod bindings;
mod demuxer;
mod dispatcher;
mod media_element;
mod metadata;
mod parser;
mod requester;
mod utils;

#[cfg(test)]
mod test_utils;

pub use bindings::{
    ChunkPlayer, JsChannelSink, JsPlaybackSurface, JsSegmentSource, MediaType, PlaybackEvent,
    RequestErrorReason, RequestId, SubtitleTrackId, TimerId, TimerReason,
};
pub use demuxer::{ChunkResponse, DecodeError, PayloadKind, TrackPayload};
pub use dispatcher::{DebugState, Dispatcher, PendingFetchInfo, PlannerState};
pub use media_element::{ChannelOperationError, ChannelSink, PlaybackSurface};
pub use metadata::{MetadataError, Track, TrackKind, VideoMetadata};
pub use parser::{parse_cues, Cue};
pub use requester::{BufferConfiguration, FetchId, LockKey, SegmentSource};
pub use utils::{
    logger::{Logger, LoggerLevel},
    time_ranges::{TimeRange, TimeRanges, EPSILON},
};
