//! Paced audio broadcasting for recorded clips
//!
//! Streams finished audio recordings to a remote streaming-audio server at a
//! constant, frame-aligned byte rate. Recordings are held for a configurable
//! delay, aged off if they wait too long, and padded with silence to whole
//! tick boundaries. Silence keeps the connection alive when nothing is
//! queued.
//!
//! The wire protocol is not part of this crate: implement [`BroadcastSink`]
//! for the target server and report its connection changes through a
//! [`StateReporter`].
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use bytes::Bytes;
//! use audio_broadcast::{AudioBroadcaster, BroadcastConfig, BroadcastSink, FrameSilence, RecordingMetadata};
//!
//! struct NullSink;
//!
//! impl BroadcastSink for NullSink {
//!     fn push_audio(&self, _audio: Bytes) {}
//!     fn push_metadata(&self, _metadata: Option<&RecordingMetadata>) {}
//!     fn disconnect(&self) {}
//! }
//!
//! # async fn example() -> audio_broadcast::Result<()> {
//! let config = BroadcastConfig::new("county-fire")
//!     .delay(Duration::from_secs(30))
//!     .maximum_recording_age(Duration::from_secs(120));
//! let silence = FrameSilence::new(Bytes::from(vec![0u8; 144]), 72);
//!
//! let broadcaster = AudioBroadcaster::new(config, Arc::new(NullSink), Arc::new(silence));
//! broadcaster.start()?;
//! # Ok(())
//! # }
//! ```

pub mod broadcast;
pub mod config;
pub mod error;
pub mod recording;
pub mod stats;

#[cfg(test)]
pub(crate) mod testing;

pub use broadcast::{
    AudioBroadcaster, BroadcastEvent, BroadcastEventKind, BroadcastListener, BroadcastSink,
    BroadcastState, FrameSilence, SilenceSource, StateReporter,
};
pub use config::{BroadcastConfig, BroadcastFormat};
pub use error::{BroadcastError, Result};
pub use recording::{AudioRecording, PendingReplay, RecordingLocation, RecordingMetadata};
pub use stats::BroadcasterStats;
