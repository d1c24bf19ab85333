//! Statistics for a broadcaster

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::broadcast::BroadcastState;

/// Live counters, updated by the pacing engine
#[derive(Debug, Default)]
pub(crate) struct BroadcastCounters {
    pub streamed: AtomicU64,
    pub aged_off: AtomicU64,
    pub audio_bytes: AtomicU64,
    pub silence_bytes: AtomicU64,
    pub recording_active: AtomicBool,
}

impl BroadcastCounters {
    pub fn streamed(&self) -> u64 {
        self.streamed.load(Ordering::Relaxed)
    }

    pub fn aged_off(&self) -> u64 {
        self.aged_off.load(Ordering::Relaxed)
    }

    pub fn add_audio_bytes(&self, n: usize) {
        self.audio_bytes.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn add_silence_bytes(&self, n: usize) {
        self.silence_bytes.fetch_add(n as u64, Ordering::Relaxed);
    }
}

/// Point-in-time snapshot of a broadcaster
#[derive(Debug, Clone)]
pub struct BroadcasterStats {
    /// Stream name
    pub stream_name: String,
    /// Connection state
    pub state: BroadcastState,
    /// Recordings waiting in the queue
    pub queue_size: usize,
    /// Recordings streamed to the remote server
    pub streamed_count: u64,
    /// Recordings removed for exceeding the age limit
    pub aged_off_count: u64,
    /// Recording audio bytes pushed to the sink
    pub audio_bytes: u64,
    /// Silence bytes pushed to the sink
    pub silence_bytes: u64,
    /// Whether a recording is currently on air
    pub recording_active: bool,
    /// Time since `start()`, if streaming
    pub uptime: Option<Duration>,
}

impl BroadcasterStats {
    /// Total bytes pushed to the sink
    pub fn total_bytes(&self) -> u64 {
        self.audio_bytes + self.silence_bytes
    }

    /// Average outbound bitrate (bits/sec) over the uptime
    pub fn bitrate(&self) -> u64 {
        match self.uptime {
            Some(uptime) if uptime.as_secs() > 0 => (self.total_bytes() * 8) / uptime.as_secs(),
            _ => 0,
        }
    }

    pub(crate) fn snapshot(
        stream_name: &str,
        state: BroadcastState,
        queue_size: usize,
        counters: &BroadcastCounters,
        uptime: Option<Duration>,
    ) -> Self {
        Self {
            stream_name: stream_name.to_string(),
            state,
            queue_size,
            streamed_count: counters.streamed(),
            aged_off_count: counters.aged_off(),
            audio_bytes: counters.audio_bytes.load(Ordering::Relaxed),
            silence_bytes: counters.silence_bytes.load(Ordering::Relaxed),
            recording_active: counters.recording_active.load(Ordering::Relaxed),
            uptime,
        }
    }
}
