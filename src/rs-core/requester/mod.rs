use crate::{
    bindings::{MediaType, RequestErrorReason, RequestId},
    demuxer::{ChunkResponse, TrackPayload},
    media_element::{ChannelSink, MediaChannels},
    utils::time_ranges::{TimeRange, TimeRanges, EPSILON},
    Logger,
};

pub use configuration::BufferConfiguration;
pub use lock_set::LockKey;
use lock_set::FetchLockSet;

mod configuration;
mod lock_set;

/// Identify a fetch registered by the `FetchCoordinator`, for its whole lifetime.
pub type FetchId = u64;

/// Where media chunks are fetched from.
///
/// Results are asynchronous: they have to be communicated to the `Dispatcher` through its
/// `on_request_finished` and `on_request_failed` methods.
pub trait SegmentSource {
    /// Request `duration` seconds of content starting at `start` seconds.
    fn fetch_range(&mut self, start: f64, duration: f64) -> RequestId;

    /// Abort a pending request. An aborted request never delivers a result.
    ///
    /// Returns `true` if the request was found and aborted.
    fn abort(&mut self, request_id: RequestId) -> bool;
}

/// Step a `PendingFetch` is at.
#[derive(Debug)]
pub(crate) enum FetchStage {
    /// The request is still pending on the `SegmentSource`.
    Requesting { request_id: RequestId },

    /// The response has been decoded, its payloads wait for every channel to be idle.
    AwaitingChannels(ChunkResponse),

    /// Payloads are being appended to the channels still listed in `remaining`.
    Appending {
        remaining: Vec<MediaType>,
        subtitles: Vec<TrackPayload>,
    },
}

/// A range of content being fetched, then pushed to the channels.
#[derive(Debug)]
pub(crate) struct PendingFetch {
    id: FetchId,
    range: TimeRange,
    lock_key: LockKey,
    stage: FetchStage,
}

impl PendingFetch {
    pub(crate) fn id(&self) -> FetchId {
        self.id
    }

    pub(crate) fn range(&self) -> TimeRange {
        self.range
    }

    pub(crate) fn stage(&self) -> &FetchStage {
        &self.stage
    }
}

/// A fetch whose payloads have all been pushed, and which has been cleaned up.
#[derive(Debug)]
pub(crate) struct CompletedFetch {
    pub(crate) id: FetchId,
    pub(crate) range: TimeRange,
    /// Subtitle payloads of the response, to push to their corresponding text tracks.
    pub(crate) subtitles: Vec<TrackPayload>,
}

/// Result of `FetchCoordinator::on_request_success`.
#[derive(Debug)]
pub(crate) enum RequestOutcome {
    /// The request is not known, it was probably cancelled.
    NotFound,
    /// The response could not be decoded. The corresponding fetch has been cleaned up.
    DecodeFailed(FetchId),
    /// The response was decoded and now awaits to be pushed.
    Decoded(FetchId),
}

/// Issues, deduplicates and cancels range fetches, and pushes their results to the channels.
///
/// Every registered `PendingFetch` goes through exactly one cleanup, whether it succeeds,
/// fails or is cancelled: its entry is removed and its `LockKey` released.
pub(crate) struct FetchCoordinator<S: SegmentSource> {
    source: S,
    pending: Vec<PendingFetch>,
    locks: FetchLockSet,
    next_fetch_id: FetchId,
}

impl<S: SegmentSource> FetchCoordinator<S> {
    pub(crate) fn new(source: S) -> Self {
        Self {
            source,
            pending: vec![],
            locks: FetchLockSet::new(),
            next_fetch_id: 0,
        }
    }

    /// Fetch `[start, end)` unless it is too small, already buffered or pending, or if a fetch
    /// for approximately the same range already exists.
    ///
    /// `duration` is the duration of the content, `INFINITY` if unknown.
    ///
    /// Returns the `FetchId` of the new fetch, `None` if none was started.
    pub(crate) fn try_fetch<C: ChannelSink>(
        &mut self,
        start: f64,
        end: f64,
        duration: f64,
        channels: &MediaChannels<C>,
        config: &BufferConfiguration,
    ) -> Option<FetchId> {
        let start = start.max(0.);
        let end = end.min(duration);
        if end - start <= config.min_fetch_gap + EPSILON {
            Logger::lazy_debug(&|| format!("Fetch: ignoring too small range {start}-{end}"));
            return None;
        }

        let coverage = channels.primary_coverage().union(&self.pending_ranges());
        if coverage.covers(start, end) {
            Logger::lazy_debug(&|| format!("Fetch: {start}-{end} already covered"));
            return None;
        }

        let lock_key = LockKey::new(start, end, config.lock_granularity);
        if !self.locks.acquire(lock_key) {
            Logger::lazy_debug(&|| format!("Fetch: {start}-{end} already locked"));
            return None;
        }

        let id = self.next_fetch_id;
        self.next_fetch_id += 1;
        let request_id = self.source.fetch_range(start, end - start);
        Logger::info(&format!(
            "Fetch: Requesting {start}-{end} (id:{id}, req:{request_id})"
        ));
        self.pending.push(PendingFetch {
            id,
            range: TimeRange::new(start, end),
            lock_key,
            stage: FetchStage::Requesting { request_id },
        });
        Logger::lazy_debug(&|| format!("Fetch: pending ranges {:?}", self.pending_ranges()));
        Some(id)
    }

    /// Every range currently being fetched or pushed, merged.
    pub(crate) fn pending_ranges(&self) -> TimeRanges {
        self.pending.iter().map(|p| p.range).collect()
    }

    pub(crate) fn pending(&self) -> &[PendingFetch] {
        &self.pending
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub(crate) fn held_locks(&self) -> Vec<LockKey> {
        self.locks.keys()
    }

    /// To call when the request `request_id` succeeded, with its response body.
    pub(crate) fn on_request_success(&mut self, request_id: RequestId, data: &[u8]) -> RequestOutcome {
        let Some(idx) = self.find_requesting(request_id) else {
            Logger::debug(&format!("Fetch: Unknown request finished (req:{request_id})"));
            return RequestOutcome::NotFound;
        };
        let fetch_id = self.pending[idx].id;
        match ChunkResponse::parse(data) {
            Ok(response) => {
                Logger::lazy_debug(&|| {
                    format!(
                        "Fetch: Decoded response (id:{fetch_id}, audio:{}, subtitles:{})",
                        response.audio_tracks.len(),
                        response.subtitle_tracks.len()
                    )
                });
                self.pending[idx].stage = FetchStage::AwaitingChannels(response);
                RequestOutcome::Decoded(fetch_id)
            }
            Err(err) => {
                Logger::error(&format!("Fetch: Could not decode response (id:{fetch_id}): {err}"));
                self.clean_up(fetch_id);
                RequestOutcome::DecodeFailed(fetch_id)
            }
        }
    }

    /// To call when the request `request_id` failed.
    ///
    /// Returns the `FetchId` of the fetch which has been cleaned up as a result.
    pub(crate) fn on_request_failure(
        &mut self,
        request_id: RequestId,
        reason: RequestErrorReason,
        status: Option<u32>,
    ) -> Option<FetchId> {
        let idx = self.find_requesting(request_id)?;
        let fetch_id = self.pending[idx].id;
        let range = self.pending[idx].range;
        match status {
            Some(status) => Logger::warn(&format!(
                "Fetch: Request for {}-{} failed ({reason}, status {status})",
                range.start(),
                range.end()
            )),
            None => Logger::warn(&format!(
                "Fetch: Request for {}-{} failed ({reason})",
                range.start(),
                range.end()
            )),
        }
        self.clean_up(fetch_id);
        Some(fetch_id)
    }

    /// Start pushing a decoded response to the channels, if one is awaiting and if every
    /// channel is idle.
    ///
    /// The timeline offset of every attached channel is first realigned on the fetched range's
    /// start if that range does not follow the last appended one.
    ///
    /// Returns the fetches completed right away because there was nothing to append. Fetches
    /// whose append is synchronously rejected are cleaned up and not returned.
    pub(crate) fn start_ready_appends<C: ChannelSink>(
        &mut self,
        channels: &mut MediaChannels<C>,
        audio_track_id: u64,
        config: &BufferConfiguration,
    ) -> Vec<CompletedFetch> {
        let mut completed = vec![];
        while channels.all_idle() {
            let Some(idx) = self
                .pending
                .iter()
                .position(|p| matches!(p.stage, FetchStage::AwaitingChannels(_)))
            else {
                break;
            };
            let fetch_id = self.pending[idx].id;
            let range = self.pending[idx].range;
            let stage = std::mem::replace(
                &mut self.pending[idx].stage,
                FetchStage::Appending {
                    remaining: vec![],
                    subtitles: vec![],
                },
            );
            let FetchStage::AwaitingChannels(response) = stage else {
                continue;
            };
            let ChunkResponse {
                video,
                audio_tracks,
                subtitle_tracks,
            } = response;
            let audio = audio_tracks
                .into_iter()
                .find(|t| t.id == audio_track_id)
                .map(|t| t.data);
            if audio.is_none() && channels.get(MediaType::Audio).is_some() {
                Logger::warn(&format!(
                    "Fetch: No payload for audio track {audio_track_id} (id:{fetch_id})"
                ));
            }

            for channel in channels.iter_mut() {
                if channel.align_timeline(range.start(), config.discontinuity_tolerance) {
                    Logger::info(&format!(
                        "Fetch: {} timeline offset reset to {}",
                        channel.media_type(),
                        range.start()
                    ));
                }
            }

            let mut remaining = vec![];
            let mut failed = false;
            for (media_type, data) in [(MediaType::Video, Some(video)), (MediaType::Audio, audio)] {
                let (Some(channel), Some(data)) = (channels.get_mut(media_type), data) else {
                    continue;
                };
                match channel.append(data, fetch_id, range.end()) {
                    Ok(()) => remaining.push(media_type),
                    Err(err) => {
                        Logger::error(&format!(
                            "Fetch: Could not append {media_type} data (id:{fetch_id}): {err}"
                        ));
                        failed = true;
                    }
                }
            }

            if failed {
                self.clean_up(fetch_id);
            } else if remaining.is_empty() {
                if let Some(done) = self.complete(fetch_id, subtitle_tracks) {
                    completed.push(done);
                }
            } else {
                self.pending[idx].stage = FetchStage::Appending {
                    remaining,
                    subtitles: subtitle_tracks,
                };
            }
        }
        completed
    }

    /// To call once the `media_type` channel finished appending the data of `fetch_id`.
    ///
    /// Returns the fetch if it has no remaining append and is thus completed.
    pub(crate) fn on_append_done(
        &mut self,
        fetch_id: FetchId,
        media_type: MediaType,
    ) -> Option<CompletedFetch> {
        let pending = self.pending.iter_mut().find(|p| p.id == fetch_id)?;
        let FetchStage::Appending { remaining, subtitles } = &mut pending.stage else {
            return None;
        };
        remaining.retain(|m| *m != media_type);
        if !remaining.is_empty() {
            return None;
        }
        let subtitles = std::mem::take(subtitles);
        self.complete(fetch_id, subtitles)
    }

    /// To call if an append of `fetch_id` failed. The fetch is cleaned up.
    pub(crate) fn on_append_failed(&mut self, fetch_id: FetchId) -> bool {
        if self.pending.iter().any(|p| p.id == fetch_id) {
            Logger::warn(&format!("Fetch: Append failed (id:{fetch_id})"));
            self.clean_up(fetch_id);
            true
        } else {
            false
        }
    }

    /// Abort every pending fetch, and forget about them and their locks.
    pub(crate) fn cancel_all(&mut self) {
        if self.pending.is_empty() && self.locks.len() == 0 {
            return;
        }
        Logger::info(&format!("Fetch: Cancelling {} fetch(es)", self.pending.len()));
        for fetch in self.pending.drain(..) {
            if let FetchStage::Requesting { request_id } = fetch.stage {
                Logger::lazy_debug(&|| {
                    format!(
                        "Fetch: Aborting {}-{} (id:{}, req:{request_id})",
                        fetch.range.start(),
                        fetch.range.end(),
                        fetch.id
                    )
                });
                self.source.abort(request_id);
            }
        }
        self.locks.clear();
    }

    fn find_requesting(&self, request_id: RequestId) -> Option<usize> {
        self.pending.iter().position(|p| match p.stage {
            FetchStage::Requesting { request_id: id } => id == request_id,
            _ => false,
        })
    }

    fn complete(&mut self, fetch_id: FetchId, subtitles: Vec<TrackPayload>) -> Option<CompletedFetch> {
        let range = self.clean_up(fetch_id)?;
        Logger::info(&format!(
            "Fetch: Pushed {}-{} (id:{fetch_id})",
            range.start(),
            range.end()
        ));
        Some(CompletedFetch {
            id: fetch_id,
            range,
            subtitles,
        })
    }

    /// Remove the pending entry of `fetch_id` and release its lock.
    fn clean_up(&mut self, fetch_id: FetchId) -> Option<TimeRange> {
        let idx = self.pending.iter().position(|p| p.id == fetch_id)?;
        let fetch = self.pending.remove(idx);
        self.locks.release(&fetch.lock_key);
        Some(fetch.range)
    }
}
