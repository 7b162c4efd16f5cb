use crate::wasm_bindgen;
use std::fmt;

/// # js_functions
///
/// This file lists all JavaScript functions that are callable from Rust as well as
/// struct and enumeration used by those functions.

#[wasm_bindgen]
extern "C" {
    // Log the given text in the JavaScript console, with the log level given.
    pub fn jsLog(log_level: LogLevel, log: &str);

    // Starts a timer for the number of milliseconds indicated by the `duration` argument.
    //
    // Once this timer has elapsed, and unless `jsClearTimer` has been called since with
    // the `TimerId` returned by this function, the `on_timer_ended` method of this
    // `ChunkPlayer` will be called with both the corresponding `TimerId` and `reason`.
    pub fn jsTimer(duration: f64, reason: TimerReason) -> TimerId;

    // Clear a timer started with `jsTimer`.
    pub fn jsClearTimer(id: TimerId);

    // Request `duration` seconds of the current content, starting at `start` seconds, from the
    // media endpoint.
    //
    // If and when it finishes with success, the response's body will be communicated through
    // the `on_request_finished` method of this `ChunkPlayer`.
    //
    // If and when it fails, the error will be emitted through the `on_request_failed` method of
    // this `ChunkPlayer`.
    //
    // In both cases, those methods will always be called asynchronously after the
    // `jsFetchRange` call.
    //
    // If the request has been aborted while pending through the `jsAbortRequest` function,
    // none of those methods will be called.
    pub fn jsFetchRange(start: f64, duration: f64) -> RequestId;

    // Abort a request started with `jsFetchRange` based on its `request_id`.
    //
    // After calling this function, you won't get any event linked to that
    // request ever again.
    //
    // Returns `true` if a pending request with the given RequestId was found and aborted,
    // `false` if no pending request was found with that RequestId.
    pub fn jsAbortRequest(request_id: RequestId) -> bool;

    // Get the content of what has been buffered by the SourceBuffer linked to the given
    // `MediaType`, in terms of contiguous time ranges, in seconds.
    //
    // The returned vector should always have an even length as it is organized by couples
    // of f64: the first of which is the start of the contiguous range in seconds and the
    // second the end.
    pub fn jsGetBuffered(media_type: MediaType) -> Vec<f64>;

    // Returns the `updating` attribute of the SourceBuffer linked to the given `MediaType`.
    pub fn jsIsUpdating(media_type: MediaType) -> bool;

    // Append media data to the SourceBuffer linked to the given `MediaType`.
    //
    // This process is asynchronous. You will be notified once the operation succeeded when
    // the `on_source_buffer_update` method of this `ChunkPlayer` is called with the same
    // `MediaType`, or that it failed when `on_source_buffer_error` is called instead.
    pub fn jsAppendBuffer(media_type: MediaType, data: &[u8]) -> BufferOperationResult;

    // Remove media data from the SourceBuffer linked to the given `MediaType`.
    //
    // This process is asynchronous. You will be notified once the operation succeeded when
    // the `on_source_buffer_update` method of this `ChunkPlayer` is called with the same
    // `MediaType`, or that it failed when `on_source_buffer_error` is called instead.
    pub fn jsRemoveBuffer(media_type: MediaType, start: f64, end: f64) -> BufferOperationResult;

    // Update the `timestampOffset` attribute of the SourceBuffer linked to the given
    // `MediaType`.
    pub fn jsSetTimestampOffset(media_type: MediaType, offset: f64);

    // Returns the `currentTime` attribute of the media element.
    pub fn jsGetCurrentTime() -> f64;

    // Returns the `duration` attribute of the MediaSource, `NaN` if unknown.
    pub fn jsGetDuration() -> f64;

    // Update the duration in seconds of the MediaSource attached to this `ChunkPlayer`.
    pub fn jsSetMediaSourceDuration(duration: f64);

    // Move the media element's playhead to the given position, in seconds.
    pub fn jsSeek(position: f64);

    // Create a new subtitles text track on the media element and returns an identifier
    // allowing to refer to it in the other text track functions.
    pub fn jsAddSubtitleTrack(label: &str, language: &str) -> SubtitleTrackId;

    // Remove every cue from the given text track.
    pub fn jsClearCues(track_id: SubtitleTrackId);

    // Add a cue to the given text track.
    pub fn jsAddCue(track_id: SubtitleTrackId, start: f64, end: f64, text: &str);
}

#[wasm_bindgen]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestErrorReason {
    Timeout,
    Status,
    Error,
    Other,
}

impl fmt::Display for RequestErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RequestErrorReason::Timeout => "timeout",
                RequestErrorReason::Status => "bad status",
                RequestErrorReason::Error => "network error",
                RequestErrorReason::Other => "unknown error",
            }
        )
    }
}

/// Errors that can arise when calling the `jsAppendBuffer` or `jsRemoveBuffer` JavaScript
/// functions.
#[wasm_bindgen]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferOperationErrorCode {
    /// The operation failed because no SourceBuffer exists for the given `MediaType`.
    NoSourceBuffer,
    /// The SourceBuffer is full.
    QuotaExceededError,
    /// The operation failed because of an unknown error.
    UnknownError,
}

/// Result of calling the `jsAppendBuffer` or `jsRemoveBuffer` JavaScript functions.
///
/// Creation of a `BufferOperationResult` should only be performed by the JavaScript side
/// through the exposed static constructors.
#[wasm_bindgen]
pub struct BufferOperationResult {
    error: Option<(BufferOperationErrorCode, Option<String>)>,
}

#[wasm_bindgen]
impl BufferOperationResult {
    /// Creates a `BufferOperationResult` indicating success.
    ///
    /// This function should only be called by the JavaScript-side.
    pub fn success() -> Self {
        Self { error: None }
    }

    /// Creates a `BufferOperationResult` indicating failure, with the corresponding
    /// error.
    ///
    /// This function should only be called by the JavaScript-side.
    pub fn error(err: BufferOperationErrorCode, desc: Option<String>) -> Self {
        Self {
            error: Some((err, desc)),
        }
    }
}

impl JsResult<(), BufferOperationErrorCode> for BufferOperationResult {
    /// Basically unwrap and consume the `BufferOperationResult`, converting it into a
    /// Result enum.
    fn result(self) -> Result<(), (BufferOperationErrorCode, Option<String>)> {
        if let Some(err) = self.error {
            Err(err)
        } else {
            Ok(())
        }
    }
}

/// Trait allowing to convert "JavaScript Results" as exposed by the JavaScript functions into
/// `Result` structs more idiomatic to Rust.
pub(crate) trait JsResult<T, E> {
    fn result(self) -> Result<T, (E, Option<String>)>;
}

/// "Reason" associated to a timer started by the `ChunkPlayer`.
///
/// This can then help to identify what the timer was for once resolved.
#[wasm_bindgen]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerReason {
    /// A buffer check was asked while one was already running. A new one
    /// should be performed.
    BufferCheck = 0,
}

/// Levels with which a log can be emitted.
#[wasm_bindgen]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd)]
pub enum LogLevel {
    /// Log level reserved for very important errors and highly unexpected events.
    Error = 0,

    /// Log level reserved for less important errors and unexpected events.
    Warn = 1,

    /// Log level reserved for important events
    Info = 2,

    /// Log level used when debugging. Small-ish yet impactful events should be logged with it.
    Debug = 3,
}

/// Identify a pending request.
pub type RequestId = u32;

/// Identify a pending timer.
pub type TimerId = f64;

/// Identify a subtitles text track created through `jsAddSubtitleTrack`.
pub type SubtitleTrackId = u32;

#[wasm_bindgen]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaType {
    Audio = 0,
    Video = 1,
}

impl fmt::Display for MediaType {
    /// When wanting to display the value, just format Audio as "audio" and
    /// Video as "video"
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                MediaType::Audio => "audio",
                MediaType::Video => "video",
            }
        )
    }
}

/// Media events on which buffering decisions should be re-evaluated.
#[wasm_bindgen]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The HTMLMediaElement's "waiting" event: playback is starved of data.
    Waiting,
    /// The HTMLMediaElement's "timeupdate" event.
    TimeUpdate,
    /// The HTMLMediaElement's "seeking" event.
    Seeking,
    /// The HTMLMediaElement's "ratechange" event.
    RateChange,
    /// The HTMLMediaElement's "loadedmetadata" event.
    LoadedMetadata,
}
