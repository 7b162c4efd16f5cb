use serde::Serialize;

const DEFAULT_FORWARD_BUFFER_REQUIRED: f64 = 20.;
const DEFAULT_FORWARD_BUFFER_OPTIMAL: f64 = 40.;
const DEFAULT_BACKWARD_BUFFER_TARGET: f64 = 10.;
const DEFAULT_MAX_BACKWARD_BUFFER: f64 = 60.;
const DEFAULT_MIN_FETCH_GAP: f64 = 0.2;
const DEFAULT_LOCK_GRANULARITY: f64 = 0.25;
const DEFAULT_SWITCH_ALIGNMENT: f64 = 10.;
const DEFAULT_SWITCH_POSITION_NUDGE: f64 = 0.3;
const DEFAULT_DISCONTINUITY_TOLERANCE: f64 = 0.05;

/// Tunables on which both the `FetchCoordinator` and the buffering logic of the `Dispatcher`
/// rely.
///
/// Can be updated at any time through the `Dispatcher`'s setters. All values are in seconds.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BufferConfiguration {
    /// Minimum amount of buffer ahead of the current position under which new data is fetched.
    pub forward_buffer_required: f64,

    /// Amount of buffer, ahead of the current position or of the end of the current buffered
    /// range, requested at once.
    pub forward_buffer_optimal: f64,

    /// Amount of buffer kept behind the current position when evicting old data, and fetched
    /// behind it when (re)starting buffering.
    pub backward_buffer_target: f64,

    /// Amount of buffer behind the current position above which old data is evicted.
    pub max_backward_buffer: f64,

    /// Fetches or removals of that duration or less are not performed.
    pub min_fetch_gap: f64,

    /// Resolution at which fetched ranges are rounded to deduplicate concurrent fetches.
    pub lock_granularity: f64,

    /// Positions after an audio track switch are aligned on a multiple of that value.
    pub switch_alignment: f64,

    /// Offset added to the aligned position once an audio track switch is done, so playback
    /// does not restart on the exact boundary frame.
    pub switch_position_nudge: f64,

    /// Maximum gap between the end of the previously appended chunk and the start of the next
    /// for both to be considered contiguous.
    pub discontinuity_tolerance: f64,
}

impl Default for BufferConfiguration {
    fn default() -> Self {
        Self {
            forward_buffer_required: DEFAULT_FORWARD_BUFFER_REQUIRED,
            forward_buffer_optimal: DEFAULT_FORWARD_BUFFER_OPTIMAL,
            backward_buffer_target: DEFAULT_BACKWARD_BUFFER_TARGET,
            max_backward_buffer: DEFAULT_MAX_BACKWARD_BUFFER,
            min_fetch_gap: DEFAULT_MIN_FETCH_GAP,
            lock_granularity: DEFAULT_LOCK_GRANULARITY,
            switch_alignment: DEFAULT_SWITCH_ALIGNMENT,
            switch_position_nudge: DEFAULT_SWITCH_POSITION_NUDGE,
            discontinuity_tolerance: DEFAULT_DISCONTINUITY_TOLERANCE,
        }
    }
}
