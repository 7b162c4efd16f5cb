//! In-memory hosts on which the engine can run natively in tests.

use std::{cell::RefCell, rc::Rc};

use crate::{
    bindings::{RequestId, SubtitleTrackId, TimerId, TimerReason},
    media_element::{ChannelOperationError, ChannelSink, PlaybackSurface},
    metadata::Track,
    parser::Cue,
    requester::SegmentSource,
    utils::time_ranges::TimeRanges,
};

#[derive(Debug, Default)]
pub(crate) struct FakeSourceState {
    /// `(start, duration)` of every fetch, in call order.
    pub(crate) fetched: Vec<(f64, f64)>,
    pub(crate) aborted: Vec<RequestId>,
    next_request_id: RequestId,
}

pub(crate) struct FakeSegmentSource(Rc<RefCell<FakeSourceState>>);

impl FakeSegmentSource {
    pub(crate) fn new() -> (Self, Rc<RefCell<FakeSourceState>>) {
        let state = Rc::new(RefCell::new(FakeSourceState::default()));
        (Self(Rc::clone(&state)), state)
    }
}

impl SegmentSource for FakeSegmentSource {
    fn fetch_range(&mut self, start: f64, duration: f64) -> RequestId {
        let mut state = self.0.borrow_mut();
        state.fetched.push((start, duration));
        let id = state.next_request_id;
        state.next_request_id += 1;
        id
    }

    fn abort(&mut self, request_id: RequestId) -> bool {
        self.0.borrow_mut().aborted.push(request_id);
        true
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeChannelState {
    pub(crate) buffered: TimeRanges,
    pub(crate) appended: Vec<Vec<u8>>,
    pub(crate) removed: Vec<(f64, f64)>,
    pub(crate) timeline_offset: Option<f64>,
    /// Every timeline offset set, in call order.
    pub(crate) offsets: Vec<f64>,
    /// When set, the next operation is synchronously rejected.
    pub(crate) reject_next: bool,
    pub(crate) updating: bool,
}

impl FakeChannelState {
    /// Simulate the end of an append, which led `[start, end)` to be buffered.
    pub(crate) fn complete_append(&mut self, start: f64, end: f64) {
        self.buffered.add(start, end);
        self.updating = false;
    }

    /// Simulate the end of the removal of `[start, end)`.
    pub(crate) fn complete_remove(&mut self, start: f64, end: f64) {
        let mut kept = TimeRanges::new();
        for range in &self.buffered {
            if range.start() < start {
                kept.add(range.start(), range.end().min(start));
            }
            if range.end() > end {
                kept.add(range.start().max(end), range.end());
            }
        }
        self.buffered = kept;
        self.updating = false;
    }
}

pub(crate) struct FakeChannel(Rc<RefCell<FakeChannelState>>);

impl FakeChannel {
    pub(crate) fn new() -> (Self, Rc<RefCell<FakeChannelState>>) {
        let state = Rc::new(RefCell::new(FakeChannelState::default()));
        (Self(Rc::clone(&state)), state)
    }
}

impl ChannelSink for FakeChannel {
    fn buffered(&self) -> TimeRanges {
        self.0.borrow().buffered.clone()
    }

    fn is_busy(&self) -> bool {
        self.0.borrow().updating
    }

    fn append(&mut self, data: Vec<u8>) -> Result<(), ChannelOperationError> {
        let mut state = self.0.borrow_mut();
        if std::mem::take(&mut state.reject_next) {
            return Err(ChannelOperationError::Rejected("QuotaExceededError".to_owned()));
        }
        state.appended.push(data);
        state.updating = true;
        Ok(())
    }

    fn remove(&mut self, start: f64, end: f64) -> Result<(), ChannelOperationError> {
        let mut state = self.0.borrow_mut();
        if std::mem::take(&mut state.reject_next) {
            return Err(ChannelOperationError::Rejected("InvalidStateError".to_owned()));
        }
        state.removed.push((start, end));
        state.updating = true;
        Ok(())
    }

    fn set_timeline_offset(&mut self, offset: f64) {
        let mut state = self.0.borrow_mut();
        state.timeline_offset = Some(offset);
        state.offsets.push(offset);
    }
}

#[derive(Debug)]
pub(crate) struct FakeSurfaceState {
    pub(crate) position: f64,
    pub(crate) duration: f64,
    /// Every position set through `set_position`, in call order.
    pub(crate) seeks: Vec<f64>,
    pub(crate) timers: Vec<(TimerId, TimerReason)>,
    pub(crate) cleared_timers: Vec<TimerId>,
    pub(crate) subtitle_tracks: Vec<Track>,
    pub(crate) cues: Vec<(SubtitleTrackId, Vec<Cue>)>,
    next_timer_id: TimerId,
}

impl Default for FakeSurfaceState {
    fn default() -> Self {
        Self {
            position: 0.,
            duration: f64::NAN,
            seeks: vec![],
            timers: vec![],
            cleared_timers: vec![],
            subtitle_tracks: vec![],
            cues: vec![],
            next_timer_id: 1.,
        }
    }
}

pub(crate) struct FakePlaybackSurface(Rc<RefCell<FakeSurfaceState>>);

impl FakePlaybackSurface {
    pub(crate) fn new() -> (Self, Rc<RefCell<FakeSurfaceState>>) {
        let state = Rc::new(RefCell::new(FakeSurfaceState::default()));
        (Self(Rc::clone(&state)), state)
    }
}

impl PlaybackSurface for FakePlaybackSurface {
    fn current_position(&self) -> f64 {
        self.0.borrow().position
    }

    fn duration(&self) -> f64 {
        self.0.borrow().duration
    }

    fn set_duration(&mut self, duration: f64) {
        self.0.borrow_mut().duration = duration;
    }

    fn set_position(&mut self, position: f64) {
        let mut state = self.0.borrow_mut();
        state.position = position;
        state.seeks.push(position);
    }

    fn add_subtitle_track(&mut self, track: &Track) -> SubtitleTrackId {
        let mut state = self.0.borrow_mut();
        state.subtitle_tracks.push(track.clone());
        state.subtitle_tracks.len() as SubtitleTrackId - 1
    }

    fn replace_cues(&mut self, track_id: SubtitleTrackId, cues: &[Cue]) {
        self.0.borrow_mut().cues.push((track_id, cues.to_vec()));
    }

    fn start_timer(&mut self, _delay_ms: f64, reason: TimerReason) -> TimerId {
        let mut state = self.0.borrow_mut();
        let id = state.next_timer_id;
        state.next_timer_id += 1.;
        state.timers.push((id, reason));
        id
    }

    fn clear_timer(&mut self, id: TimerId) {
        let mut state = self.0.borrow_mut();
        state.timers.retain(|(t, _)| *t != id);
        state.cleared_timers.push(id);
    }
}
