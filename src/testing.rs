//! Shared test doubles

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use bytes::Bytes;

use crate::broadcast::{BroadcastSink, SilenceSource};
use crate::recording::{AudioRecording, PendingReplay, RecordingLocation, RecordingMetadata};

/// Byte value used for recording content, distinct from silence
pub const AUDIO_BYTE: u8 = 0xAA;

/// Opt-in log output, e.g. `RUST_LOG=audio_broadcast=trace cargo test`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory recording of `size` bytes
pub fn memory_recording(start: SystemTime, length_ms: u64, size: usize) -> AudioRecording {
    AudioRecording::new(
        start,
        Duration::from_millis(length_ms),
        RecordingLocation::Memory(Bytes::from(vec![AUDIO_BYTE; size])),
    )
}

/// Recording tagged with a `SEQ` identifier
pub fn numbered_recording(seq: usize, start: SystemTime, length_ms: u64, size: usize) -> AudioRecording {
    memory_recording(start, length_ms, size)
        .with_metadata(RecordingMetadata::new().with("SEQ", seq.to_string()))
}

/// Counts release callbacks across recordings
#[derive(Clone, Default)]
pub struct ReleaseCounter(Arc<AtomicUsize>);

impl ReleaseCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, recording: AudioRecording) -> AudioRecording {
        let count = Arc::clone(&self.0);
        recording.with_pending_replay(PendingReplay::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        }))
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Sink that records everything pushed to it
#[derive(Default)]
pub struct CollectingSink {
    pub audio: Mutex<Vec<Bytes>>,
    pub metadata: Mutex<Vec<Option<String>>>,
    pub disconnects: AtomicUsize,
}

impl CollectingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Recording bytes received, excluding silence
    pub fn audio_bytes(&self) -> usize {
        self.audio
            .lock()
            .unwrap()
            .iter()
            .flat_map(|chunk| chunk.iter())
            .filter(|b| **b == AUDIO_BYTE)
            .count()
    }

    /// Sizes of every chunk that carried recording bytes
    pub fn audio_chunks(&self) -> Vec<usize> {
        self.audio
            .lock()
            .unwrap()
            .iter()
            .filter(|chunk| chunk.first() == Some(&AUDIO_BYTE))
            .map(|chunk| chunk.len())
            .collect()
    }

    pub fn metadata_updates(&self) -> Vec<Option<String>> {
        self.metadata.lock().unwrap().clone()
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

impl BroadcastSink for CollectingSink {
    fn push_audio(&self, audio: Bytes) {
        self.audio.lock().unwrap().push(audio);
    }

    fn push_metadata(&self, metadata: Option<&RecordingMetadata>) {
        self.metadata
            .lock()
            .unwrap()
            .push(metadata.map(|m| m.title()));
    }

    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Silence source that logs every requested duration
#[derive(Default)]
pub struct TrackingSilence {
    pub requests: Mutex<Vec<u64>>,
}

impl TrackingSilence {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn requests(&self) -> Vec<u64> {
        self.requests.lock().unwrap().clone()
    }

    pub fn total_ms(&self) -> u64 {
        self.requests().iter().sum()
    }
}

impl SilenceSource for TrackingSilence {
    fn generate(&self, duration_ms: u64) -> Bytes {
        self.requests.lock().unwrap().push(duration_ms);
        // 2000 bytes/sec of zeroes
        Bytes::from(vec![0u8; (duration_ms * 2) as usize])
    }
}
