//! Audio recording descriptor
//!
//! Metadata for one finished, encoded recording awaiting broadcast. The
//! content itself stays at its location until the recording goes on air.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use bytes::Bytes;

use crate::error::{BroadcastError, Result};

use super::metadata::RecordingMetadata;
use super::replay::PendingReplay;

/// Where a recording's encoded bytes live
#[derive(Debug, Clone)]
pub enum RecordingLocation {
    /// Encoded file on disk, read when the recording becomes active
    File(PathBuf),
    /// Encoded bytes already in memory
    Memory(Bytes),
}

impl RecordingLocation {
    /// Read the full content
    pub fn read(&self) -> Result<Bytes> {
        match self {
            RecordingLocation::File(path) => match std::fs::read(path) {
                Ok(data) => Ok(Bytes::from(data)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(BroadcastError::RecordingNotFound(path.clone()))
                }
                Err(e) => Err(BroadcastError::RecordingRead {
                    path: path.clone(),
                    source: e,
                }),
            },
            RecordingLocation::Memory(data) => Ok(data.clone()),
        }
    }
}

impl std::fmt::Display for RecordingLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordingLocation::File(path) => write!(f, "{}", path.display()),
            RecordingLocation::Memory(data) => write!(f, "<memory {} bytes>", data.len()),
        }
    }
}

/// A finished recording handed to the broadcaster
#[derive(Debug)]
pub struct AudioRecording {
    /// Wall-clock time the recording began
    pub start_time: SystemTime,

    /// Nominal playout duration
    pub length: Duration,

    /// Location of the encoded content
    pub location: RecordingLocation,

    /// Identifiers pushed as now-playing metadata
    pub metadata: RecordingMetadata,

    pending_replay: PendingReplay,
}

impl AudioRecording {
    /// Create a recording with no metadata and no release callback
    pub fn new(start_time: SystemTime, length: Duration, location: RecordingLocation) -> Self {
        Self {
            start_time,
            length,
            location,
            metadata: RecordingMetadata::default(),
            pending_replay: PendingReplay::none(),
        }
    }

    /// Attach now-playing metadata
    pub fn with_metadata(mut self, metadata: RecordingMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Attach the producer's release callback
    pub fn with_pending_replay(mut self, pending_replay: PendingReplay) -> Self {
        self.pending_replay = pending_replay;
        self
    }

    /// Length in whole milliseconds
    pub fn length_ms(&self) -> u64 {
        u64::try_from(self.length.as_millis()).unwrap_or(u64::MAX)
    }

    /// Time at which the hold period ends
    pub fn eligible_at(&self, delay: Duration) -> Option<SystemTime> {
        self.start_time.checked_add(delay)
    }

    /// Whether the hold period has elapsed at `now`
    pub fn is_eligible(&self, delay: Duration, now: SystemTime) -> bool {
        match self.eligible_at(delay) {
            Some(at) => at <= now,
            None => false,
        }
    }

    /// Whether the recording aged out before it could stream
    ///
    /// Age is measured from the end of the hold period. A `None` maximum
    /// age never expires.
    pub fn is_stale(&self, delay: Duration, max_age: Option<Duration>, now: SystemTime) -> bool {
        let Some(max_age) = max_age else {
            return false;
        };

        match self
            .start_time
            .checked_add(delay)
            .and_then(|t| t.checked_add(max_age))
        {
            Some(expiry) => expiry < now,
            None => false,
        }
    }

    /// Run the producer's release callback, consuming the recording
    pub fn release(self) {
        self.pending_replay.release();
    }
}
