//! Broadcast queue and pacing engine
//!
//! The broadcaster sits between a recorder producing finished audio clips
//! and a protocol-specific sink that pushes bytes to a remote server.
//!
//! # Architecture
//!
//! ```text
//!   recorder threads                    AudioBroadcaster
//!   ────────────────              ┌──────────────────────────┐
//!   ingest(recording) ──────────► │ RecordingQueue (MPSC)    │
//!                                 │ AtomicBroadcastState     │
//!                                 │ PacingEngine ◄── tick ───┼── tokio interval
//!                                 └────────────┬─────────────┘
//!                                              │
//!                        push_audio / push_metadata / disconnect
//!                                              ▼
//!                                        BroadcastSink ──► remote server
//!                                              │
//!                         StateReporter ◄──────┘ (Connected, errors, ...)
//! ```
//!
//! Audio only flows while the state is `Connected`. Leaving `Connected`
//! releases every queued recording; error states also stop the pacing task.

pub mod broadcaster;
pub mod event;
pub(crate) mod pacer;
pub mod sink;
pub mod state;

pub use broadcaster::{AudioBroadcaster, StateReporter};
pub use event::{BroadcastEvent, BroadcastEventKind, BroadcastListener};
pub use sink::{BroadcastSink, FrameSilence, SilenceSource};
pub use state::BroadcastState;
