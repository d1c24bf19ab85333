//! Broadcaster configuration

use std::time::Duration;

/// Default pacing tick interval
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1000);

/// Audio format of the outbound byte stream
///
/// The format determines the constant byte rate the pacing engine holds and
/// the frame size it aligns every chunk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastFormat {
    /// MP3, 16 kbps constant bitrate (144 byte frames, 2000 bytes/sec)
    Mp3,
    /// Any constant-bitrate format described by its byte rate and frame size
    Custom {
        bytes_per_second: u32,
        frame_size: u32,
    },
}

impl BroadcastFormat {
    /// Bytes per second of encoded audio
    pub fn bytes_per_second(&self) -> u32 {
        match self {
            BroadcastFormat::Mp3 => 2000,
            BroadcastFormat::Custom {
                bytes_per_second, ..
            } => *bytes_per_second,
        }
    }

    /// Size of one codec frame in bytes
    pub fn frame_size(&self) -> u32 {
        match self {
            BroadcastFormat::Mp3 => 144,
            BroadcastFormat::Custom { frame_size, .. } => (*frame_size).max(1),
        }
    }
}

/// Broadcaster configuration options
#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    /// Stream name, used in logs and events
    pub name: String,

    /// Hold period after a recording's start time before it may stream
    pub delay: Duration,

    /// Staleness threshold measured from `start_time + delay` (None = never)
    pub maximum_recording_age: Option<Duration>,

    /// Pacing engine tick interval
    pub tick_interval: Duration,

    /// Outbound audio format
    pub format: BroadcastFormat,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            name: String::from("broadcast"),
            delay: Duration::ZERO,
            maximum_recording_age: Some(Duration::from_secs(60)),
            tick_interval: DEFAULT_TICK_INTERVAL,
            format: BroadcastFormat::Mp3,
        }
    }
}

impl BroadcastConfig {
    /// Create a config with the given stream name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the broadcast delay
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the maximum recording age
    pub fn maximum_recording_age(mut self, age: Duration) -> Self {
        self.maximum_recording_age = Some(age);
        self
    }

    /// Never age off queued recordings
    pub fn unlimited_recording_age(mut self) -> Self {
        self.maximum_recording_age = None;
        self
    }

    /// Set the tick interval (clamped to at least 1ms)
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Set the audio format
    pub fn format(mut self, format: BroadcastFormat) -> Self {
        self.format = format;
        self
    }

    /// Tick interval in whole milliseconds
    pub fn tick_interval_ms(&self) -> u64 {
        u64::try_from(self.tick_interval.as_millis()).unwrap_or(u64::MAX).max(1)
    }

    /// Bytes the engine must push per tick to hold the format's byte rate
    pub fn bytes_per_tick(&self) -> u64 {
        self.format.bytes_per_second() as u64 * self.tick_interval_ms() / 1000
    }

    /// Frame size of the configured format
    pub fn frame_size(&self) -> u64 {
        self.format.frame_size() as u64
    }
}
