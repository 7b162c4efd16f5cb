use crate::{
    bindings::MediaType,
    requester::FetchId,
    utils::time_ranges::{TimeRanges, EPSILON},
    Logger,
};

use super::{ChannelOperationError, ChannelSink};

/// Abstraction over one of the two media buffers (video or audio) content is pushed to.
///
/// It wraps the `ChannelSink` and keeps track of the single buffer operation which may be
/// pending on it at any time.
pub(crate) struct ChannelState<C: ChannelSink> {
    /// The `MediaType` associated to this channel.
    media_type: MediaType,

    /// The lower-level buffer itself.
    sink: C,

    /// Operation currently being performed on the sink, if one.
    ///
    /// There is never more than one: a new operation is only started once the previous one
    /// has been acknowledged through `on_operation_end`.
    pending_operation: Option<ChannelOperation>,

    /// Highest end time, in seconds, of a chunk appended to this channel since the last time it
    /// was emptied.
    ///
    /// Used to decide whether the next chunk follows the previous one or if the timeline
    /// offset has to be updated.
    last_appended_end: Option<f64>,
}

/// Operation awaiting to be acknowledged by a `ChannelSink`.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ChannelOperation {
    /// Data of the fetch identified by `fetch_id`, ending at `end` seconds, is being appended.
    Append { fetch_id: FetchId, end: f64 },

    /// Buffered data from `start` to `end` seconds is being removed.
    Remove { start: f64, end: f64 },
}

impl<C: ChannelSink> ChannelState<C> {
    pub(super) fn new(media_type: MediaType, sink: C) -> Self {
        Logger::info(&format!("Attaching {} channel", media_type));
        Self {
            media_type,
            sink,
            pending_operation: None,
            last_appended_end: None,
        }
    }

    /// Returns the `MediaType` linked to that channel.
    pub(crate) fn media_type(&self) -> MediaType {
        self.media_type
    }

    /// Returns what is currently buffered in that channel, always read from the sink itself.
    pub(crate) fn buffered(&self) -> TimeRanges {
        self.sink.buffered()
    }

    /// Returns `true` if an operation is pending on that channel, in which case no other can be
    /// started for now.
    pub(crate) fn is_busy(&self) -> bool {
        self.pending_operation.is_some() || self.sink.is_busy()
    }

    pub(crate) fn last_appended_end(&self) -> Option<f64> {
        self.last_appended_end
    }

    /// Forget about previous appends, e.g. after the channel has been emptied.
    pub(crate) fn reset_last_appended_end(&mut self) {
        self.last_appended_end = None;
    }

    pub(crate) fn set_timeline_offset(&mut self, offset: f64) {
        Logger::debug(&format!(
            "Channel {}: setting timeline offset to {}",
            self.media_type, offset
        ));
        self.sink.set_timeline_offset(offset);
    }

    /// Prepare the channel for a chunk starting at `start` seconds, moving its timeline offset
    /// to `start` unless that chunk directly follows the last one appended.
    ///
    /// Returns `true` if the timeline offset was updated.
    pub(crate) fn align_timeline(&mut self, start: f64, tolerance: f64) -> bool {
        let previous_end = self
            .sink
            .buffered()
            .last_end()
            .map(|buffered_end| self.last_appended_end.unwrap_or(buffered_end));
        match previous_end {
            Some(end) if (start - end).abs() <= tolerance.max(EPSILON) => false,
            _ => {
                self.set_timeline_offset(start);
                true
            }
        }
    }

    /// Append a chunk of data belonging to the fetch `fetch_id` and ending at `end` seconds.
    pub(crate) fn append(
        &mut self,
        data: Vec<u8>,
        fetch_id: FetchId,
        end: f64,
    ) -> Result<(), ChannelOperationError> {
        if self.is_busy() {
            return Err(ChannelOperationError::Busy);
        }
        Logger::debug(&format!(
            "Channel {}: appending {} bytes (fetch {})",
            self.media_type,
            data.len(),
            fetch_id
        ));
        self.pending_operation = Some(ChannelOperation::Append { fetch_id, end });
        let res = self.sink.append(data);
        if res.is_err() {
            self.pending_operation = None;
        }
        res
    }

    /// Remove media data from this channel, from `start` to `end` seconds.
    pub(crate) fn remove(&mut self, start: f64, end: f64) -> Result<(), ChannelOperationError> {
        if self.is_busy() {
            return Err(ChannelOperationError::Busy);
        }
        Logger::debug(&format!(
            "Channel {}: removing {} {}",
            self.media_type, start, end
        ));
        self.pending_operation = Some(ChannelOperation::Remove { start, end });
        let res = self.sink.remove(start, end);
        if res.is_err() {
            self.pending_operation = None;
        }
        res
    }

    /// To call once the operation previously started through `append` or `remove` has been
    /// finished by the sink.
    ///
    /// Returns the finished operation, `None` if none was pending.
    pub(crate) fn on_operation_end(&mut self) -> Option<ChannelOperation> {
        let op = self.pending_operation.take();
        if let Some(ChannelOperation::Append { end, .. }) = op {
            self.last_appended_end = Some(self.last_appended_end.map_or(end, |e| e.max(end)));
        }
        op
    }

    /// To call if the operation previously started through `append` or `remove` failed
    /// asynchronously.
    pub(crate) fn on_operation_error(&mut self) -> Option<ChannelOperation> {
        Logger::warn(&format!("Channel {}: operation failed", self.media_type));
        self.pending_operation.take()
    }
}
