//! Recordings awaiting broadcast
//!
//! A producer (typically an audio recorder that closes out encoded clips)
//! hands each finished recording to the broadcaster, which holds it in a
//! FIFO [`RecordingQueue`] until the pacing engine puts it on air.

pub mod descriptor;
pub mod metadata;
pub mod queue;
pub mod replay;

pub use descriptor::{AudioRecording, RecordingLocation};
pub use metadata::RecordingMetadata;
pub use queue::{QueueConsumer, RecordingQueue};
pub use replay::PendingReplay;
