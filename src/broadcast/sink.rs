//! Collaborator interfaces
//!
//! The broadcaster does not speak any wire protocol itself. A protocol
//! implementation (Icecast, Shoutcast, ...) provides a [`BroadcastSink`], and
//! the audio format provides a [`SilenceSource`] for keep-alive frames.

use bytes::{Bytes, BytesMut};

use crate::recording::RecordingMetadata;

/// Outbound side of a broadcaster
///
/// Calls are made from the pacing tick and must not block indefinitely.
/// Connection changes are reported back through
/// [`StateReporter`](super::StateReporter).
pub trait BroadcastSink: Send + Sync {
    /// Push encoded audio bytes to the remote server (fire-and-forget)
    fn push_audio(&self, audio: Bytes);

    /// Update now-playing metadata; `None` clears it
    fn push_metadata(&self, metadata: Option<&RecordingMetadata>);

    /// Close the connection to the remote server
    fn disconnect(&self);
}

/// Generates silent audio in the broadcast format
pub trait SilenceSource: Send + Sync {
    /// Silence covering `duration_ms` milliseconds
    fn generate(&self, duration_ms: u64) -> Bytes;
}

/// Silence built by repeating one pre-encoded silent frame
///
/// The requested duration is rounded up to whole frames so the output is
/// always frame-aligned.
#[derive(Debug, Clone)]
pub struct FrameSilence {
    frame: Bytes,
    frame_duration_ms: u64,
}

impl FrameSilence {
    /// Create from an encoded silent frame and its playout duration
    pub fn new(frame: Bytes, frame_duration_ms: u64) -> Self {
        Self {
            frame,
            frame_duration_ms: frame_duration_ms.max(1),
        }
    }

    /// Number of frames needed to cover `duration_ms`
    pub fn frame_count(&self, duration_ms: u64) -> u64 {
        duration_ms.div_ceil(self.frame_duration_ms)
    }
}

impl SilenceSource for FrameSilence {
    fn generate(&self, duration_ms: u64) -> Bytes {
        let count = self.frame_count(duration_ms) as usize;
        let mut buf = BytesMut::with_capacity(self.frame.len() * count);

        for _ in 0..count {
            buf.extend_from_slice(&self.frame);
        }

        buf.freeze()
    }
}
