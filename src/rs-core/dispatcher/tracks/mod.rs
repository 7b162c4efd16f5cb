use std::collections::HashMap;

use crate::{
    bindings::SubtitleTrackId,
    demuxer::TrackPayload,
    media_element::{ChannelSink, PlaybackSurface},
    metadata::VideoMetadata,
    parser::parse_cues,
    requester::{FetchId, SegmentSource},
    Logger,
};

use super::Dispatcher;

/// Progress of an audio track switch.
///
/// Switching audio track means emptying both channels and refetching around the current
/// position, as video and audio data always come from the same responses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) enum AudioSwitch {
    /// No switch is happening.
    Idle,

    /// Pending fetches have been cancelled, an operation is still pending on a channel.
    AwaitingIdle { aligned: f64 },

    /// Both channels are being emptied.
    Clearing { aligned: f64 },

    /// Data for the new track, starting at `aligned`, is being fetched.
    Fetching { fetch_id: FetchId, aligned: f64 },
}

impl AudioSwitch {
    pub(super) fn is_in_progress(&self) -> bool {
        !matches!(self, AudioSwitch::Idle)
    }
}

/// Links each available subtitle track, by its index among subtitle tracks, to the text track
/// created for it on the `PlaybackSurface`.
///
/// Populated once when the content's metadata is loaded.
#[derive(Debug, Default)]
pub(super) struct SubtitleRegistry {
    tracks: HashMap<usize, SubtitleTrackId>,
}

impl SubtitleRegistry {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Create a text track for each subtitle track of `metadata` the media endpoint can serve.
    pub(super) fn register(&mut self, metadata: &VideoMetadata, surface: &mut impl PlaybackSurface) {
        for (index, track) in metadata.subtitle_tracks().enumerate() {
            if !metadata.is_subtitle_available(index) {
                Logger::debug(&format!("Tracks: Subtitle track {index} is unavailable"));
                continue;
            }
            if self.tracks.contains_key(&index) {
                continue;
            }
            let track_id = surface.add_subtitle_track(track);
            Logger::info(&format!(
                "Tracks: Registered subtitle track {index} ({}, {})",
                track.label, track.language
            ));
            self.tracks.insert(index, track_id);
        }
    }

    pub(super) fn track_id(&self, index: usize) -> Option<SubtitleTrackId> {
        self.tracks.get(&index).copied()
    }

    pub(super) fn len(&self) -> usize {
        self.tracks.len()
    }

    pub(super) fn clear(&mut self) {
        self.tracks.clear();
    }

    /// Replace the cues of each registered text track with those parsed from its payload.
    pub(super) fn push_payloads(
        &self,
        payloads: &[TrackPayload],
        surface: &mut impl PlaybackSurface,
    ) {
        for payload in payloads {
            let Some(track_id) = usize::try_from(payload.id)
                .ok()
                .and_then(|index| self.track_id(index))
            else {
                Logger::debug(&format!(
                    "Tracks: Ignoring payload of unregistered subtitle track {}",
                    payload.id
                ));
                continue;
            };
            let text = String::from_utf8_lossy(&payload.data);
            let cues = parse_cues(&text);
            Logger::debug(&format!(
                "Tracks: Replacing cues of subtitle track {} ({} cue(s))",
                payload.id,
                cues.len()
            ));
            surface.replace_cues(track_id, &cues);
        }
    }
}

impl<S: SegmentSource, C: ChannelSink, P: PlaybackSurface> Dispatcher<S, C, P> {
    /// Switch the audio track whose data is pushed to the audio channel.
    pub(super) fn switch_audio_track(&mut self, track_id: u64) {
        let Some(metadata) = &self.metadata else {
            Logger::warn("Tracks: Cannot switch audio track: no content loaded");
            return;
        };
        if !metadata.has_audio_track(track_id) {
            Logger::warn(&format!("Tracks: Unknown audio track {track_id}"));
            return;
        }
        if track_id == self.audio_track_id {
            Logger::debug(&format!("Tracks: Audio track {track_id} already selected"));
            return;
        }

        let aligned = self.switch_start();
        Logger::info(&format!(
            "Tracks: Switching to audio track {track_id}, restarting from {aligned}"
        ));
        self.audio_track_id = track_id;
        self.fetcher.cancel_all();
        self.audio_switch = AudioSwitch::AwaitingIdle { aligned };
        self.advance_audio_switch();
    }

    /// Position, aligned on `switch_alignment`, from which data for a new audio track is fetched.
    fn switch_start(&self) -> f64 {
        let pos = self.surface.current_position();
        let alignment = self.config.switch_alignment;
        if alignment > 0. {
            (pos / alignment).floor() * alignment
        } else {
            pos
        }
    }

    /// Move the current audio track switch forward, if the channels allow it.
    pub(super) fn advance_audio_switch(&mut self) {
        loop {
            let state = self.audio_switch;
            match state {
                AudioSwitch::Idle | AudioSwitch::Fetching { .. } => return,
                AudioSwitch::AwaitingIdle { aligned } => {
                    if self.channels.any_busy() {
                        return;
                    }
                    for channel in self.channels.iter_mut() {
                        channel.reset_last_appended_end();
                        let buffered = channel.buffered();
                        let (Some(start), Some(end)) = (buffered.first_start(), buffered.last_end())
                        else {
                            continue;
                        };
                        Logger::debug(&format!(
                            "Tracks: Emptying {} channel ({start}-{end})",
                            channel.media_type()
                        ));
                        if let Err(err) = channel.remove(start, end) {
                            Logger::warn(&format!(
                                "Tracks: Could not empty {} channel: {err}",
                                channel.media_type()
                            ));
                        }
                    }
                    self.audio_switch = AudioSwitch::Clearing { aligned };
                }
                AudioSwitch::Clearing { aligned } => {
                    if self.channels.any_busy() {
                        return;
                    }
                    for channel in self.channels.iter_mut() {
                        channel.set_timeline_offset(aligned);
                    }
                    let duration = self.content_duration();
                    let end = (aligned + self.config.forward_buffer_optimal).min(duration);
                    match self.fetcher.try_fetch(
                        aligned,
                        end,
                        duration,
                        &self.channels,
                        &self.config,
                    ) {
                        Some(fetch_id) => {
                            self.audio_switch = AudioSwitch::Fetching { fetch_id, aligned };
                        }
                        None => {
                            Logger::warn("Tracks: Could not fetch data for the new audio track");
                            self.audio_switch = AudioSwitch::Idle;
                        }
                    }
                    return;
                }
            }
        }
    }

    /// To call when the fetch `fetch_id` ended, `succeeded` being `false` if its data could not
    /// be pushed.
    pub(super) fn on_switch_fetch_ended(&mut self, fetch_id: FetchId, succeeded: bool) {
        let AudioSwitch::Fetching {
            fetch_id: switch_fetch_id,
            aligned,
        } = self.audio_switch
        else {
            return;
        };
        if switch_fetch_id != fetch_id {
            return;
        }
        self.audio_switch = AudioSwitch::Idle;
        if succeeded {
            let position = aligned + self.config.switch_position_nudge;
            Logger::info(&format!("Tracks: Audio track switched, seeking to {position}"));
            self.surface.set_position(position);
        } else {
            Logger::warn("Tracks: Fetch for the new audio track failed");
        }
    }

    /// Restart the current switch, if one, from the position just seeked to.
    ///
    /// Pending fetches are expected to have been cancelled already.
    pub(super) fn on_seek_during_switch(&mut self) {
        let aligned = self.switch_start();
        self.audio_switch = match self.audio_switch {
            AudioSwitch::Idle => return,
            AudioSwitch::AwaitingIdle { .. } => AudioSwitch::AwaitingIdle { aligned },
            // Channels have already been emptied of the previous track's data.
            AudioSwitch::Clearing { .. } | AudioSwitch::Fetching { .. } => {
                AudioSwitch::Clearing { aligned }
            }
        };
        Logger::info(&format!(
            "Tracks: Seeked during audio track switch, restarting from {aligned}"
        ));
        self.advance_audio_switch();
    }
}
