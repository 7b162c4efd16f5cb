use crate::{
    bindings::{MediaType, TimerReason},
    media_element::{ChannelSink, PlaybackSurface},
    requester::{CompletedFetch, FetchId, SegmentSource},
    utils::time_ranges::{TimeRanges, EPSILON},
    Logger,
};

use super::{Dispatcher, PlannerState};

impl<S: SegmentSource, C: ChannelSink, P: PlaybackSurface> Dispatcher<S, C, P> {
    /// Re-evaluate what should be buffered, fetched or evicted for the current position.
    ///
    /// If a check is already running, a single follow-up check is scheduled for when it ends
    /// instead.
    pub(super) fn check_buffer(&mut self) {
        if self.planner_state != PlannerState::Idle {
            self.planner_state = PlannerState::PlanningWithReplan;
            return;
        }
        self.planner_state = PlannerState::Planning;
        self.plan_buffer();
        self.finish_planning();
    }

    /// Go back to `PlannerState::Idle`, scheduling one more check if some were asked for in the
    /// meantime.
    pub(super) fn finish_planning(&mut self) {
        let replan = self.planner_state == PlannerState::PlanningWithReplan;
        self.planner_state = PlannerState::Idle;
        if replan {
            self.schedule_buffer_check();
        }
    }

    /// Run another `check_buffer` asynchronously, through a timer.
    pub(super) fn schedule_buffer_check(&mut self) {
        if self.replan_timer.is_none() {
            Logger::debug("Core: Scheduling a new buffer check");
            self.replan_timer = Some(self.surface.start_timer(0., TimerReason::BufferCheck));
        }
    }

    /// Duration of the content: the one known by the surface if finite, else the one announced by
    /// the metadata, else `INFINITY`.
    pub(super) fn content_duration(&self) -> f64 {
        let duration = self.surface.duration();
        if duration.is_finite() {
            return duration;
        }
        match &self.metadata {
            Some(m) if m.duration().is_finite() => m.duration(),
            _ => f64::INFINITY,
        }
    }

    /// Time ranges buffered on the channels or being fetched.
    pub(super) fn coverage(&self) -> TimeRanges {
        self.channels
            .primary_coverage()
            .union(&self.fetcher.pending_ranges())
    }

    /// A single pass of the buffering logic.
    fn plan_buffer(&mut self) {
        if self.metadata.is_none() || !self.channels.is_attached() {
            return;
        }
        if self.audio_switch.is_in_progress() {
            Logger::debug("Core: Audio track switch in progress, skipping buffer check");
            return;
        }

        let pos = self.surface.current_position();
        let duration = self.content_duration();
        let coverage = self.coverage();

        let Some(current_range) = coverage.containing_range(pos).copied() else {
            if coverage.is_empty() {
                Logger::info(&format!("Core: Nothing buffered, starting buffering at {pos}"));
            } else {
                Logger::warn(&format!("Core: Position {pos} outside of buffer, recovering"));
            }
            let start = (pos - self.config.backward_buffer_target).max(0.);
            let end = (pos + self.config.forward_buffer_optimal).min(duration);
            self.fetcher
                .try_fetch(start, end, duration, &self.channels, &self.config);
            return;
        };

        let end = current_range.end();
        if end - pos < self.config.forward_buffer_required - EPSILON {
            let fetch_end = (end + self.config.forward_buffer_optimal).min(duration);
            Logger::lazy_debug(&|| {
                format!("Core: {} seconds ahead, extending to {fetch_end}", end - pos)
            });
            self.fetcher
                .try_fetch(end, fetch_end, duration, &self.channels, &self.config);
        }

        self.evict_back_buffer(pos);

        if self.is_seeking && self.coverage().containing_range(pos).is_some() {
            Logger::debug("Core: Seeked position is now covered");
            self.is_seeking = false;
        }
    }

    /// Remove, from each channel independently, data too far behind `pos`.
    ///
    /// Nothing is done while an operation is pending on any channel.
    fn evict_back_buffer(&mut self, pos: f64) {
        if self.channels.any_busy() {
            return;
        }
        let max_backward_buffer = self.config.max_backward_buffer;
        let backward_buffer_target = self.config.backward_buffer_target;
        let min_gap = self.config.min_fetch_gap;
        for channel in self.channels.iter_mut() {
            let Some(earliest) = channel.buffered().first_start() else {
                continue;
            };
            if pos - earliest <= max_backward_buffer + EPSILON {
                continue;
            }
            let removal_end = earliest.max(pos - backward_buffer_target);
            if removal_end - earliest <= min_gap {
                continue;
            }
            Logger::info(&format!(
                "Core: Evicting {} data from {earliest} to {removal_end}",
                channel.media_type()
            ));
            if let Err(err) = channel.remove(earliest, removal_end) {
                Logger::warn(&format!(
                    "Core: Could not evict {} data: {err}",
                    channel.media_type()
                ));
            }
        }
    }

    /// Push decoded responses to the channels, if they are ready to receive them.
    pub(super) fn push_ready_fetches(&mut self) {
        let completed =
            self.fetcher
                .start_ready_appends(&mut self.channels, self.audio_track_id, &self.config);
        for fetch in completed {
            self.on_fetch_completed(fetch);
        }
    }

    /// Handle a fetch whose data has been entirely pushed to the channels.
    pub(super) fn on_fetch_completed(&mut self, fetch: CompletedFetch) {
        Logger::lazy_debug(&|| {
            format!(
                "Core: Fetch {} ({}-{}) done, buffered video: {:?}, audio: {:?}",
                fetch.id,
                fetch.range.start(),
                fetch.range.end(),
                self.channels.get(MediaType::Video).map(|c| c.buffered()),
                self.channels.get(MediaType::Audio).map(|c| c.buffered())
            )
        });
        self.subtitles
            .push_payloads(&fetch.subtitles, &mut self.surface);
        self.on_switch_fetch_ended(fetch.id, true);
    }

    /// Handle a fetch which ended without its data being pushed.
    pub(super) fn on_fetch_failed(&mut self, fetch_id: FetchId) {
        self.on_switch_fetch_ended(fetch_id, false);
    }
}
