use std::{cell::RefCell, collections::HashSet, rc::Rc};

use super::{Dispatcher, PlannerState};
use crate::{
    bindings::{MediaType, PlaybackEvent, RequestErrorReason, TimerReason},
    demuxer::{ChunkResponse, TrackPayload},
    metadata::{Track, TrackKind, VideoMetadata},
    test_utils::{
        FakeChannel, FakeChannelState, FakePlaybackSurface, FakeSegmentSource, FakeSourceState,
        FakeSurfaceState,
    },
    utils::time_ranges::EPSILON,
};

struct Harness {
    dispatcher: Dispatcher<FakeSegmentSource, FakeChannel, FakePlaybackSurface>,
    source: Rc<RefCell<FakeSourceState>>,
    video: Rc<RefCell<FakeChannelState>>,
    audio: Rc<RefCell<FakeChannelState>>,
    surface: Rc<RefCell<FakeSurfaceState>>,
}

impl Harness {
    /// A `Dispatcher` on which a 120 seconds content has been loaded and both channels attached.
    fn start() -> Self {
        let (source_sink, source) = FakeSegmentSource::new();
        let (surface_sink, surface) = FakePlaybackSurface::new();
        let (video_sink, video) = FakeChannel::new();
        let (audio_sink, audio) = FakeChannel::new();
        let mut dispatcher = Dispatcher::new(source_sink, surface_sink);
        dispatcher.load_metadata(metadata(), None);
        dispatcher.attach_channels(Some(video_sink), Some(audio_sink));
        Self {
            dispatcher,
            source,
            video,
            audio,
            surface,
        }
    }

    fn fetched(&self) -> Vec<(f64, f64)> {
        self.source.borrow().fetched.clone()
    }

    fn set_position(&self, position: f64) {
        self.surface.borrow_mut().position = position;
    }

    /// Simulate both channels finishing to append `[start, end)`.
    fn complete_appends(&mut self, start: f64, end: f64) {
        self.video.borrow_mut().complete_append(start, end);
        self.dispatcher.on_channel_update_end(MediaType::Video);
        self.audio.borrow_mut().complete_append(start, end);
        self.dispatcher.on_channel_update_end(MediaType::Audio);
    }
}

fn track(id: u64, kind: TrackKind, label: &str) -> Track {
    Track {
        id,
        kind,
        label: label.to_owned(),
        language: "en".to_owned(),
    }
}

fn metadata() -> VideoMetadata {
    VideoMetadata::new(
        120.,
        vec![
            track(1, TrackKind::Audio, "Main"),
            track(2, TrackKind::Audio, "Commentary"),
            track(0, TrackKind::Subtitle, "English"),
        ],
        HashSet::new(),
    )
}

fn chunk() -> Vec<u8> {
    ChunkResponse {
        video: vec![b'V'; 64],
        audio_tracks: vec![
            TrackPayload {
                id: 1,
                data: vec![b'A'; 16],
            },
            TrackPayload {
                id: 2,
                data: vec![b'B'; 16],
            },
        ],
        subtitle_tracks: vec![TrackPayload {
            id: 0,
            data: b"00:00:01.000 --> 00:00:03.500\nHello\nWorld\n\n".to_vec(),
        }],
    }
    .encode()
}

#[test]
fn test_bootstrap_issues_a_single_fetch() {
    let mut h = Harness::start();
    assert_eq!(h.surface.borrow().duration, 120.);
    assert_eq!(h.fetched(), vec![(0., 40.)]);

    // Planning again without any new result changes nothing.
    h.dispatcher.on_playback_event(PlaybackEvent::TimeUpdate);
    h.dispatcher.on_playback_event(PlaybackEvent::Waiting);
    assert_eq!(h.fetched(), vec![(0., 40.)]);
}

#[test]
fn test_nothing_fetched_without_channels() {
    let (source_sink, source) = FakeSegmentSource::new();
    let (surface_sink, _surface) = FakePlaybackSurface::new();
    let mut dispatcher: Dispatcher<_, FakeChannel, _> = Dispatcher::new(source_sink, surface_sink);
    dispatcher.load_metadata(metadata(), None);
    dispatcher.on_playback_event(PlaybackEvent::LoadedMetadata);
    assert!(source.borrow().fetched.is_empty());
}

#[test]
fn test_load_metadata() {
    let (source_sink, _source) = FakeSegmentSource::new();
    let (surface_sink, surface) = FakePlaybackSurface::new();
    let mut dispatcher: Dispatcher<_, FakeChannel, _> = Dispatcher::new(source_sink, surface_sink);
    dispatcher.load_metadata(metadata(), Some(42.));
    assert_eq!(dispatcher.audio_track(), 1);
    let surface = surface.borrow();
    assert_eq!(surface.seeks, vec![42.]);
    assert_eq!(surface.subtitle_tracks.len(), 1);
    assert_eq!(surface.subtitle_tracks[0].label, "English");
}

#[test]
fn test_successful_fetch() {
    let mut h = Harness::start();
    h.dispatcher.on_request_finished(0, &chunk());
    assert_eq!(h.video.borrow().appended, vec![vec![b'V'; 64]]);
    assert_eq!(h.audio.borrow().appended, vec![vec![b'A'; 16]]);
    assert_eq!(h.video.borrow().timeline_offset, Some(0.));
    assert_eq!(h.audio.borrow().timeline_offset, Some(0.));

    h.complete_appends(0., 40.);
    let channel = h.dispatcher.channels.get(MediaType::Video).unwrap();
    assert_eq!(channel.last_appended_end(), Some(40.));
    assert!(channel.buffered().covers(0., 40.));

    let state = h.dispatcher.debug_state();
    assert!(state.pending_fetches.is_empty());
    assert!(state.held_locks.is_empty());
    assert_eq!(state.video_appended_end, Some(40.));
    assert_eq!(state.audio_appended_end, Some(40.));

    {
        let surface = h.surface.borrow();
        assert_eq!(surface.cues.len(), 1);
        assert_eq!(surface.cues[0].0, 0);
        assert_eq!(surface.cues[0].1[0].text, "Hello\nWorld");
    }

    // 40 seconds ahead: nothing more to fetch.
    assert_eq!(h.fetched().len(), 1);

    // Less than 20 seconds ahead: the buffer is extended.
    h.set_position(25.);
    h.dispatcher.on_playback_event(PlaybackEvent::TimeUpdate);
    assert_eq!(h.fetched(), vec![(0., 40.), (40., 40.)]);
}

#[test]
fn test_contiguous_fetch_keeps_timeline_offset() {
    let mut h = Harness::start();
    h.dispatcher.on_request_finished(0, &chunk());
    h.complete_appends(0., 40.);
    h.set_position(25.);
    h.dispatcher.on_playback_event(PlaybackEvent::TimeUpdate);
    h.dispatcher.on_request_finished(1, &chunk());
    assert_eq!(h.video.borrow().appended.len(), 2);
    assert_eq!(h.video.borrow().offsets, vec![0.]);
    assert_eq!(h.audio.borrow().offsets, vec![0.]);
}

#[test]
fn test_decode_error_is_cleaned_up() {
    let mut h = Harness::start();
    h.dispatcher.on_request_finished(0, &[1, 2, 3]);
    assert!(h.video.borrow().appended.is_empty());
    // The lock was released, so the next pass could request the same range again.
    assert_eq!(h.fetched(), vec![(0., 40.), (0., 40.)]);
    let state = h.dispatcher.debug_state();
    assert_eq!(state.pending_fetches.len(), 1);
    assert_eq!(state.held_locks.len(), 1);
}

#[test]
fn test_request_failure_is_cleaned_up() {
    let mut h = Harness::start();
    h.dispatcher
        .on_request_failed(0, RequestErrorReason::Status, Some(500));
    assert_eq!(h.fetched(), vec![(0., 40.), (0., 40.)]);
    assert_eq!(h.dispatcher.debug_state().pending_fetches.len(), 1);

    // Unknown requests are ignored.
    h.dispatcher
        .on_request_failed(42, RequestErrorReason::Timeout, None);
    assert_eq!(h.fetched().len(), 2);
}

#[test]
fn test_seeking_cancels_pending_fetches() {
    let mut h = Harness::start();
    h.set_position(90.);
    h.dispatcher.on_playback_event(PlaybackEvent::Seeking);
    assert_eq!(h.source.borrow().aborted, vec![0]);
    assert_eq!(h.fetched(), vec![(0., 40.), (80., 40.)]);
    assert!(h.dispatcher.debug_state().is_seeking);

    // A result for the cancelled request is ignored.
    h.dispatcher.on_request_finished(0, &chunk());
    assert!(h.video.borrow().appended.is_empty());

    h.dispatcher.on_playback_event(PlaybackEvent::TimeUpdate);
    assert!(!h.dispatcher.debug_state().is_seeking);
    assert_eq!(h.fetched().len(), 2);
}

#[test]
fn test_recovery_outside_of_buffer() {
    let mut h = Harness::start();
    h.dispatcher.on_request_finished(0, &chunk());
    h.complete_appends(0., 40.);
    h.set_position(70.);
    h.dispatcher.on_playback_event(PlaybackEvent::Waiting);
    assert_eq!(h.fetched(), vec![(0., 40.), (60., 50.)]);
}

#[test]
fn test_eviction() {
    let mut h = Harness::start();
    h.video.borrow_mut().complete_append(0., 100.);
    h.audio.borrow_mut().complete_append(50., 100.);
    h.set_position(80.);
    h.dispatcher.on_playback_event(PlaybackEvent::TimeUpdate);

    // The audio channel only has 30 seconds behind the position and is left alone.
    assert_eq!(h.video.borrow().removed, vec![(0., 70.)]);
    assert!(h.audio.borrow().removed.is_empty());

    h.video.borrow_mut().complete_remove(0., 70.);
    h.dispatcher.on_channel_update_end(MediaType::Video);
    let earliest = h.video.borrow().buffered.first_start().unwrap();
    assert!(earliest >= 80. - 60. - EPSILON);
    assert_eq!(h.video.borrow().removed.len(), 1);
}

#[test]
fn test_no_eviction_while_busy() {
    let mut h = Harness::start();
    h.dispatcher.on_request_finished(0, &chunk());
    h.video.borrow_mut().complete_append(0., 100.);
    h.audio.borrow_mut().complete_append(0., 100.);
    h.set_position(80.);
    h.dispatcher.on_playback_event(PlaybackEvent::TimeUpdate);
    assert!(h.video.borrow().removed.is_empty());
    assert!(h.audio.borrow().removed.is_empty());
}

#[test]
fn test_audio_track_switch() {
    let mut h = Harness::start();
    h.video.borrow_mut().complete_append(0., 20.);
    h.audio.borrow_mut().complete_append(0., 20.);
    h.set_position(25.);
    h.dispatcher.on_playback_event(PlaybackEvent::TimeUpdate);
    assert_eq!(h.fetched(), vec![(0., 40.), (40., 40.)]);

    h.set_position(27.);
    h.dispatcher.set_audio_track(2);
    assert_eq!(h.dispatcher.audio_track(), 2);
    assert_eq!(h.source.borrow().aborted, vec![0, 1]);
    assert_eq!(h.video.borrow().removed, vec![(0., 20.)]);
    assert_eq!(h.audio.borrow().removed, vec![(0., 20.)]);
    assert_eq!(h.fetched().len(), 2);

    h.video.borrow_mut().complete_remove(0., 20.);
    h.dispatcher.on_channel_update_end(MediaType::Video);
    assert_eq!(h.fetched().len(), 2);
    h.audio.borrow_mut().complete_remove(0., 20.);
    h.dispatcher.on_channel_update_end(MediaType::Audio);

    // A single fetch, aligned on the previous 10 seconds boundary.
    assert_eq!(h.fetched(), vec![(0., 40.), (40., 40.), (20., 40.)]);
    assert_eq!(h.video.borrow().timeline_offset, Some(20.));
    assert_eq!(h.audio.borrow().timeline_offset, Some(20.));

    h.dispatcher.on_request_finished(2, &chunk());
    assert_eq!(h.audio.borrow().appended, vec![vec![b'B'; 16]]);
    assert!(h.surface.borrow().seeks.is_empty());

    h.complete_appends(20., 60.);
    let seeks = h.surface.borrow().seeks.clone();
    assert_eq!(seeks.len(), 1);
    assert!((seeks[0] - 20.3).abs() < 1e-9);
    assert!(!h.dispatcher.debug_state().is_switching_audio_track);
    assert_eq!(h.fetched().len(), 3);
}

/// Switch to audio track 2 at position 27, with 20 seconds buffered. Both channels are left
/// being emptied.
fn start_audio_switch(h: &mut Harness) {
    h.video.borrow_mut().complete_append(0., 20.);
    h.audio.borrow_mut().complete_append(0., 20.);
    h.set_position(25.);
    h.dispatcher.on_playback_event(PlaybackEvent::TimeUpdate);
    h.set_position(27.);
    h.dispatcher.set_audio_track(2);
    assert_eq!(h.fetched(), vec![(0., 40.), (40., 40.)]);
    assert_eq!(h.video.borrow().removed, vec![(0., 20.)]);
}

/// Simulate both channels finishing to empty `[start, end)`.
fn complete_removals(h: &mut Harness, start: f64, end: f64) {
    h.video.borrow_mut().complete_remove(start, end);
    h.dispatcher.on_channel_update_end(MediaType::Video);
    h.audio.borrow_mut().complete_remove(start, end);
    h.dispatcher.on_channel_update_end(MediaType::Audio);
}

#[test]
fn test_seek_while_emptying_channels_for_audio_switch() {
    let mut h = Harness::start();
    start_audio_switch(&mut h);

    h.set_position(90.);
    h.dispatcher.on_playback_event(PlaybackEvent::Seeking);
    assert_eq!(h.fetched().len(), 2);
    assert!(h.dispatcher.debug_state().is_switching_audio_track);

    complete_removals(&mut h, 0., 20.);
    assert_eq!(h.fetched(), vec![(0., 40.), (40., 40.), (90., 30.)]);
    assert_eq!(h.video.borrow().timeline_offset, Some(90.));

    h.dispatcher.on_request_finished(2, &chunk());
    h.complete_appends(90., 120.);
    let seeks = h.surface.borrow().seeks.clone();
    assert_eq!(seeks.len(), 1);
    assert!((seeks[0] - 90.3).abs() < 1e-9);
    let state = h.dispatcher.debug_state();
    assert!(!state.is_switching_audio_track);
    assert!(!state.is_seeking);
}

#[test]
fn test_seek_while_fetching_new_audio_track() {
    let mut h = Harness::start();
    start_audio_switch(&mut h);
    complete_removals(&mut h, 0., 20.);
    assert_eq!(h.fetched().len(), 3);

    h.set_position(90.);
    h.dispatcher.on_playback_event(PlaybackEvent::Seeking);
    assert_eq!(h.source.borrow().aborted, vec![0, 1, 2]);
    assert_eq!(h.fetched(), vec![(0., 40.), (40., 40.), (20., 40.), (90., 30.)]);

    // The cancelled request's result is ignored.
    h.dispatcher.on_request_finished(2, &chunk());
    assert!(h.video.borrow().appended.is_empty());

    h.dispatcher.on_request_finished(3, &chunk());
    h.complete_appends(90., 120.);
    let seeks = h.surface.borrow().seeks.clone();
    assert_eq!(seeks.len(), 1);
    assert!((seeks[0] - 90.3).abs() < 1e-9);
    assert!(!h.dispatcher.debug_state().is_switching_audio_track);
}

#[test]
fn test_failed_audio_switch_fetch_does_not_seek() {
    let mut h = Harness::start();
    start_audio_switch(&mut h);
    complete_removals(&mut h, 0., 20.);
    h.dispatcher
        .on_request_failed(2, RequestErrorReason::Status, Some(404));

    assert!(h.surface.borrow().seeks.is_empty());
    assert!(!h.dispatcher.debug_state().is_switching_audio_track);
    // Regular buffering takes over around the position.
    assert_eq!(h.fetched().last(), Some(&(17., 50.)));
}

#[test]
fn test_append_failure_is_cleaned_up() {
    let mut h = Harness::start();
    h.dispatcher.on_request_finished(0, &chunk());
    assert_eq!(h.video.borrow().appended.len(), 1);

    h.video.borrow_mut().updating = false;
    h.dispatcher.on_channel_error(MediaType::Video);
    // Lock released and entry removed, so the same range is requested again.
    assert_eq!(h.fetched(), vec![(0., 40.), (0., 40.)]);
    let state = h.dispatcher.debug_state();
    assert_eq!(state.pending_fetches.len(), 1);
    assert_eq!(state.pending_fetches[0].id, 1);
    assert_eq!(state.pending_fetches[0].stage, "requesting");
    assert_eq!(state.held_locks.len(), 1);

    // The other channel's append of the failed fetch ending changes nothing.
    h.audio.borrow_mut().complete_append(0., 40.);
    h.dispatcher.on_channel_update_end(MediaType::Audio);
    assert_eq!(h.fetched().len(), 2);
    assert_eq!(h.dispatcher.debug_state().pending_fetches.len(), 1);
}

#[test]
fn test_audio_track_switch_ignores_unknown_or_current_track() {
    let mut h = Harness::start();
    h.dispatcher.set_audio_track(99);
    h.dispatcher.set_audio_track(1);
    assert!(h.source.borrow().aborted.is_empty());
    assert_eq!(h.dispatcher.audio_track(), 1);
    assert!(!h.dispatcher.debug_state().is_switching_audio_track);
}

#[test]
fn test_planner_coalesces_checks() {
    let mut h = Harness::start();
    h.dispatcher.planner_state = PlannerState::Planning;
    h.set_position(25.);
    h.dispatcher.on_playback_event(PlaybackEvent::TimeUpdate);
    h.dispatcher.on_playback_event(PlaybackEvent::RateChange);
    h.dispatcher.on_playback_event(PlaybackEvent::Waiting);
    assert_eq!(h.dispatcher.planner_state, PlannerState::PlanningWithReplan);
    assert_eq!(h.fetched().len(), 1);

    h.dispatcher.finish_planning();
    assert_eq!(h.dispatcher.planner_state, PlannerState::Idle);
    let timers = h.surface.borrow().timers.clone();
    assert_eq!(timers.len(), 1);
    let (timer_id, reason) = timers[0];
    assert_eq!(reason, TimerReason::BufferCheck);

    // A stale timer does nothing.
    h.dispatcher.on_timer_ended(timer_id + 1., TimerReason::BufferCheck);
    assert_eq!(h.fetched().len(), 1);

    h.dispatcher.on_timer_ended(timer_id, TimerReason::BufferCheck);
    assert_eq!(h.fetched().len(), 2);
    assert!(h.dispatcher.replan_timer.is_none());
}

#[test]
fn test_stop() {
    let mut h = Harness::start();
    h.dispatcher.planner_state = PlannerState::PlanningWithReplan;
    h.dispatcher.finish_planning();
    h.dispatcher.stop();
    assert_eq!(h.source.borrow().aborted, vec![0]);
    assert_eq!(h.surface.borrow().cleared_timers.len(), 1);
    let state = h.dispatcher.debug_state();
    assert!(state.pending_fetches.is_empty());
    assert!(state.video_buffered.is_none());
    assert!(state.audio_buffered.is_none());

    // Nothing happens until a new content is loaded.
    h.dispatcher.on_playback_event(PlaybackEvent::TimeUpdate);
    assert_eq!(h.fetched().len(), 1);
}

#[test]
fn test_debug_state_serializes() {
    let h = Harness::start();
    let json = serde_json::to_string(&h.dispatcher.debug_state()).unwrap();
    assert!(json.contains("\"stage\":\"requesting\""));
    assert!(json.contains("\"planner_state\":\"Idle\""));
}
