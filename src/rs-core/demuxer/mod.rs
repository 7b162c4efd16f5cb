//! Demultiplexing of the binary chunk responses sent by the media endpoint.
//!
//! A response is laid out as follows, all integers being little-endian:
//!
//! ```text
//! u32            number of audio tracks (0..=100)
//! u32            number of subtitle tracks
//! u64            video payload length (> 0)
//! [u8]           video payload
//! -- repeated for each audio track --
//! u64            track id
//! u64            payload length (> 0)
//! [u8]           payload
//! -- repeated for each subtitle track --
//! u64            track id
//! u64            payload length (> 0)
//! [u8]           payload
//! ```

use thiserror::Error;

/// Maximum number of audio tracks a response may announce.
const MAX_AUDIO_TRACK_COUNT: u32 = 100;

/// Payload linked to a single audio or subtitle track of a `ChunkResponse`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackPayload {
    /// Identifier of the track, as known by the media endpoint.
    pub id: u64,
    /// Raw track data.
    pub data: Vec<u8>,
}

/// Decoded content of a single chunk response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkResponse {
    /// Video payload, ready to be appended to the video channel.
    pub video: Vec<u8>,
    /// One payload per audio track, in response order.
    pub audio_tracks: Vec<TrackPayload>,
    /// One payload per subtitle track, in response order. Their data is UTF-8 cue text.
    pub subtitle_tracks: Vec<TrackPayload>,
}

/// Identify which part of a response a length field belonged to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadKind {
    Video,
    Audio,
    Subtitle,
}

impl std::fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadKind::Video => write!(f, "video"),
            PayloadKind::Audio => write!(f, "audio"),
            PayloadKind::Subtitle => write!(f, "subtitle"),
        }
    }
}

/// Error encountered while decoding a chunk response.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid number of audio tracks: {0}")]
    InvalidCount(u32),
    #[error("Invalid {kind} payload length {length} ({remaining} bytes remaining)")]
    InvalidLength {
        kind: PayloadKind,
        length: u64,
        remaining: usize,
    },
    #[error("Truncated response: needed {needed} bytes at offset {offset}, only {remaining} remaining")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },
}

impl ChunkResponse {
    /// Decode a whole response in a single forward pass.
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = ByteReader::new(data);

        let audio_track_count = reader.read_u32()?;
        if audio_track_count > MAX_AUDIO_TRACK_COUNT {
            return Err(DecodeError::InvalidCount(audio_track_count));
        }
        let subtitle_track_count = reader.read_u32()?;

        let video = reader.read_payload(PayloadKind::Video)?.to_vec();

        // Counts come from the wire, so capacities are bounded by what the buffer could hold.
        let max_entries = reader.remaining() / 16;
        let mut audio_tracks = Vec::with_capacity((audio_track_count as usize).min(max_entries));
        for _ in 0..audio_track_count {
            audio_tracks.push(reader.read_track(PayloadKind::Audio)?);
        }

        let max_entries = reader.remaining() / 16;
        let mut subtitle_tracks =
            Vec::with_capacity((subtitle_track_count as usize).min(max_entries));
        for _ in 0..subtitle_track_count {
            subtitle_tracks.push(reader.read_track(PayloadKind::Subtitle)?);
        }

        Ok(Self {
            video,
            audio_tracks,
            subtitle_tracks,
        })
    }

    /// Serialize this response in the exact layout `parse` reads.
    pub fn encode(&self) -> Vec<u8> {
        let tracks_len: usize = self
            .audio_tracks
            .iter()
            .chain(self.subtitle_tracks.iter())
            .map(|t| 16 + t.data.len())
            .sum();
        let mut out = Vec::with_capacity(16 + self.video.len() + tracks_len);
        out.extend_from_slice(&(self.audio_tracks.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.subtitle_tracks.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.video.len() as u64).to_le_bytes());
        out.extend_from_slice(&self.video);
        for track in self.audio_tracks.iter().chain(self.subtitle_tracks.iter()) {
            out.extend_from_slice(&track.id.to_le_bytes());
            out.extend_from_slice(&(track.data.len() as u64).to_le_bytes());
            out.extend_from_slice(&track.data);
        }
        out
    }

    /// Returns the audio payload linked to the given track id, if present.
    pub fn audio_track(&self, id: u64) -> Option<&TrackPayload> {
        self.audio_tracks.iter().find(|t| t.id == id)
    }
}

/// Forward-only cursor over a response buffer.
struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    #[inline(always)]
    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::Truncated {
                offset: self.offset,
                needed: len,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(bytes))
    }

    fn read_u64(&mut self) -> Result<u64, DecodeError> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(bytes))
    }

    /// Read a `u64` length followed by that many bytes.
    fn read_payload(&mut self, kind: PayloadKind) -> Result<&'a [u8], DecodeError> {
        let length = self.read_u64()?;
        let remaining = self.remaining();
        if length == 0 || length > remaining as u64 {
            return Err(DecodeError::InvalidLength {
                kind,
                length,
                remaining,
            });
        }
        self.take(length as usize)
    }

    fn read_track(&mut self, kind: PayloadKind) -> Result<TrackPayload, DecodeError> {
        let id = self.read_u64()?;
        let data = self.read_payload(kind)?.to_vec();
        Ok(TrackPayload { id, data })
    }
}
