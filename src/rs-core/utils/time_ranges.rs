use std::{
    ops::Index,
    slice::Iter,
};

use serde::Serialize;

/// Tolerance used for every floating-point comparison made on time ranges, in seconds.
pub const EPSILON: f64 = 1e-6;

/// Represent a half-open range of time, from a start to an end, generally in seconds
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TimeRange {
    start: f64,
    end: f64,
}

impl TimeRange {
    /// Create a new `TimeRange` going from `start` (inclusive) to `end` (exclusive).
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Returns the start time of the range
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Returns the end time of the range
    pub fn end(&self) -> f64 {
        self.end
    }

    /// Returns the duration of the range
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Returns `true` if `pos` falls inside that range, with `EPSILON` tolerance on both sides.
    pub fn contains(&self, pos: f64) -> bool {
        pos + EPSILON >= self.start && pos <= self.end + EPSILON
    }
}

/// Abstracts non-contiguous chronological ranges of time, generally expressed in seconds.
///
/// A `TimeRanges` is always kept sorted by start, with no two ranges overlapping or touching
/// (ranges closer than `EPSILON` are coalesced).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TimeRanges {
    ranges: Vec<TimeRange>,
}

impl TimeRanges {
    /// Create a new empty `TimeRanges` object
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a `TimeRanges` from any list of ranges, in any order, sorting and coalescing them.
    ///
    /// Empty or inverted ranges are ignored.
    pub fn merge<I>(ranges: I) -> Self
    where
        I: IntoIterator<Item = TimeRange>,
    {
        let mut sorted: Vec<TimeRange> = ranges.into_iter().filter(|r| r.end > r.start).collect();
        sorted.sort_by(|a, b| a.start.total_cmp(&b.start));

        let mut merged: Vec<TimeRange> = Vec::with_capacity(sorted.len());
        for range in sorted {
            match merged.last_mut() {
                Some(last) if range.start <= last.end + EPSILON => {
                    last.end = last.end.max(range.end);
                }
                _ => merged.push(range),
            }
        }
        Self { ranges: merged }
    }

    /// Build a `TimeRanges` from a flat list of `[start, end, start, end, ...]` values, as
    /// communicated by the JavaScript-side.
    ///
    /// A trailing lone value is ignored.
    pub fn from_flat(flat: &[f64]) -> Self {
        Self::merge(flat.chunks_exact(2).map(|c| TimeRange::new(c[0], c[1])))
    }

    /// Add a range of time to that `TimeRanges` object, merging it with the ranges that are
    /// already there.
    pub fn add(&mut self, start: f64, end: f64) {
        let ranges = std::mem::take(&mut self.ranges);
        *self = Self::merge(ranges.into_iter().chain(std::iter::once(TimeRange::new(start, end))));
    }

    /// Returns the union of this `TimeRanges` and `other`.
    pub fn union(&self, other: &TimeRanges) -> TimeRanges {
        Self::merge(self.ranges.iter().chain(other.ranges.iter()).copied())
    }

    /// Returns the time ranges present in both this `TimeRanges` and `other`.
    ///
    /// Intersections shorter than `EPSILON` are not reported.
    pub fn intersect(&self, other: &TimeRanges) -> TimeRanges {
        let a = &self.ranges;
        let b = &other.ranges;
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            let start = a[i].start.max(b[j].start);
            let end = a[i].end.min(b[j].end);
            if end > start + EPSILON {
                out.push(TimeRange::new(start, end));
            }
            if a[i].end < b[j].end - EPSILON {
                i += 1;
            } else {
                j += 1;
            }
        }
        Self { ranges: out }
    }

    /// Returns `true` if a single contiguous range of this `TimeRanges` fully contains
    /// `[start, end)`, with `EPSILON` tolerance.
    pub fn covers(&self, start: f64, end: f64) -> bool {
        self.ranges
            .iter()
            .any(|r| r.start - EPSILON <= start && r.end + EPSILON >= end)
    }

    /// Returns the first range containing the given position.
    ///
    /// Returns `None` if no range in this `TimeRanges` object contains it.
    pub fn containing_range(&self, pos: f64) -> Option<&TimeRange> {
        self.ranges.iter().find(|r| r.contains(pos))
    }

    /// Returns the number of non-contiguous ranges in this `TimeRanges` object
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Returns the starting time of the range whose index is given in argument.
    ///
    /// Returns `None` if the given index is superior or equal to the number of actual ranges.
    pub fn start(&self, idx: usize) -> Option<f64> {
        self.ranges.get(idx).map(|r| r.start)
    }

    /// Returns the ending time of the range whose index is given in argument.
    ///
    /// Returns `None` if the given index is superior or equal to the number of actual ranges.
    pub fn end(&self, idx: usize) -> Option<f64> {
        self.ranges.get(idx).map(|r| r.end)
    }

    /// Start of the chronologically first range, if one.
    pub fn first_start(&self) -> Option<f64> {
        self.ranges.first().map(|r| r.start)
    }

    /// End of the chronologically last range, if one.
    pub fn last_end(&self) -> Option<f64> {
        self.ranges.last().map(|r| r.end)
    }

    pub fn iter(&self) -> Iter<'_, TimeRange> {
        self.ranges.iter()
    }
}

impl Index<usize> for TimeRanges {
    type Output = TimeRange;
    fn index(&self, index: usize) -> &Self::Output {
        &self.ranges[index]
    }
}

impl<'a> IntoIterator for &'a TimeRanges {
    type Item = &'a TimeRange;
    type IntoIter = Iter<'a, TimeRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

impl FromIterator<TimeRange> for TimeRanges {
    fn from_iter<T: IntoIterator<Item = TimeRange>>(iter: T) -> Self {
        Self::merge(iter)
    }
}
