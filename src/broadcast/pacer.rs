//! Pacing engine
//!
//! Turns a bursty supply of finished recordings into a constant-bitrate,
//! frame-aligned byte stream. The engine runs once per tick:
//!
//! ```text
//!   tick ──► recording on air? ──no──► owed trailing silence ──► load_next()
//!                 │                                                 │
//!                 ▼                                                 ▼
//!        push next due chunk  ◄────────── loaded ───────── evict stale heads,
//!        (frame aligned)                                   take eligible head
//!                                                                   │
//!                                               nothing ──► keep-alive silence
//! ```
//!
//! The required-bytes counter accumulates across ticks rather than resetting,
//! so a late or skipped tick is made up on the next one and the long-run
//! byte rate does not drift.

use std::sync::atomic::Ordering;
use std::time::SystemTime;

use bytes::Bytes;

use crate::config::BroadcastConfig;
use crate::error::BroadcastError;
use crate::recording::{AudioRecording, RecordingQueue};
use crate::stats::BroadcastCounters;

use super::event::{BroadcastEventKind, EventNotifier};
use super::sink::{BroadcastSink, SilenceSource};
use super::state::AtomicBroadcastState;

/// Everything a tick touches outside the engine's own cursor
pub(crate) struct PacingContext<'a> {
    pub config: &'a BroadcastConfig,
    pub queue: &'a RecordingQueue,
    pub state: &'a AtomicBroadcastState,
    pub sink: &'a dyn BroadcastSink,
    pub silence: &'a dyn SilenceSource,
    pub notifier: &'a EventNotifier,
    pub counters: &'a BroadcastCounters,
}

impl PacingContext<'_> {
    fn connected(&self) -> bool {
        self.state.load().is_connected()
    }

    fn push_audio(&self, audio: Bytes) {
        self.counters.add_audio_bytes(audio.len());
        self.sink.push_audio(audio);
    }

    fn push_silence(&self, duration_ms: u64) {
        let silence = self.silence.generate(duration_ms);
        self.counters.add_silence_bytes(silence.len());
        self.sink.push_audio(silence);
    }
}

/// Per-broadcaster pacing cursor
#[derive(Debug, Default)]
pub(crate) struct PacingEngine {
    /// Unsent bytes of the recording on air (None = nothing loaded)
    active: Option<Bytes>,
    bytes_sent: u64,
    bytes_required: u64,
    trailing_silence_ms: u64,
}

impl PacingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any bytes of the current recording remain unsent
    fn has_remaining(&self) -> bool {
        self.active.as_ref().is_some_and(|b| !b.is_empty())
    }

    /// Silence owed once the current recording's bytes run out
    #[cfg(test)]
    pub fn trailing_silence_ms(&self) -> u64 {
        self.trailing_silence_ms
    }

    /// Run one tick
    pub fn tick(&mut self, ctx: &PacingContext<'_>, now: SystemTime) {
        if self.active.is_some() && !ctx.connected() {
            self.abandon();
        }

        let mut silence_sent = false;

        if !self.has_remaining() {
            if self.trailing_silence_ms > 0 {
                tracing::trace!(silence_ms = self.trailing_silence_ms, "Trailing silence");
                ctx.push_silence(self.trailing_silence_ms);
                self.trailing_silence_ms = 0;
                silence_sent = true;
            }

            self.load_next(ctx, now);
        }

        if self.has_remaining() && ctx.connected() {
            self.send_due(ctx);
        } else if !silence_sent {
            ctx.push_silence(ctx.config.tick_interval_ms());
        }

        ctx.counters
            .recording_active
            .store(self.has_remaining(), Ordering::Relaxed);
    }

    /// Drop the recording on air without counting it as streamed
    fn abandon(&mut self) {
        let remaining = self.active.take().map_or(0, |b| b.len());
        tracing::debug!(remaining, "Not connected, recording on air abandoned");

        self.bytes_sent = 0;
        self.bytes_required = 0;
        self.trailing_silence_ms = 0;
    }

    /// Push the frame-aligned chunk due this tick
    fn send_due(&mut self, ctx: &PacingContext<'_>) {
        let Some(buffer) = self.active.as_mut() else {
            return;
        };

        self.bytes_required += ctx.config.bytes_per_tick();
        let due = aligned_due(
            self.bytes_required,
            self.bytes_sent,
            ctx.config.frame_size(),
        );
        let length = (due as usize).min(buffer.len());

        if length == 0 {
            return;
        }

        let chunk = buffer.split_to(length);
        self.bytes_sent += chunk.len() as u64;

        tracing::trace!(
            chunk = chunk.len(),
            sent = self.bytes_sent,
            remaining = buffer.len(),
            "Streaming recording chunk"
        );

        ctx.push_audio(chunk);
    }

    /// Close out the finished recording and try to put the next one on air
    fn load_next(&mut self, ctx: &PacingContext<'_>, now: SystemTime) {
        self.bytes_sent = 0;
        self.bytes_required = 0;

        let mut metadata_clear_owed = false;

        if self.active.take().is_some() {
            ctx.counters.streamed.fetch_add(1, Ordering::Relaxed);
            ctx.notifier.notify(BroadcastEventKind::StreamedCountChanged);
            metadata_clear_owed = true;
        }

        let delay = ctx.config.delay;
        let max_age = ctx.config.maximum_recording_age;

        // Inspect the queue under the consumer lock; release callbacks and
        // events run after it is dropped.
        let (aged_off, next) = {
            let mut consumer = ctx.queue.consumer();
            let mut aged_off = Vec::new();

            while consumer
                .peek()
                .is_some_and(|r| r.is_stale(delay, max_age, now))
            {
                if let Some(recording) = consumer.pop() {
                    aged_off.push(recording);
                }
            }

            let next = if ctx.connected()
                && consumer.peek().is_some_and(|r| r.is_eligible(delay, now))
            {
                consumer.pop()
            } else {
                None
            };

            (aged_off, next)
        };

        for recording in aged_off {
            tracing::warn!(
                recording = %recording.location,
                "Recording exceeded maximum age, removed from queue"
            );
            recording.release();
            ctx.counters.aged_off.fetch_add(1, Ordering::Relaxed);
            ctx.notifier.notify(BroadcastEventKind::AgedOffCountChanged);
        }

        if let Some(recording) = next {
            if self.activate(ctx, &recording) {
                metadata_clear_owed = false;
            }

            recording.release();
            ctx.notifier.notify(BroadcastEventKind::QueueChanged);
        }

        if metadata_clear_owed && ctx.connected() {
            ctx.sink.push_metadata(None);
        }
    }

    /// Load a recording's content and put it on air
    fn activate(&mut self, ctx: &PacingContext<'_>, recording: &AudioRecording) -> bool {
        let content = recording.location.read().and_then(|data| {
            if data.is_empty() {
                Err(BroadcastError::EmptyRecording)
            } else {
                Ok(data)
            }
        });

        match content {
            Ok(data) => {
                tracing::debug!(
                    recording = %recording.location,
                    bytes = data.len(),
                    length_ms = recording.length_ms(),
                    "Recording on air"
                );

                self.active = Some(data);
                self.trailing_silence_ms =
                    trailing_silence_ms(recording.length_ms(), ctx.config.tick_interval_ms());

                if ctx.connected() {
                    ctx.sink.push_metadata(Some(&recording.metadata));
                }

                true
            }
            Err(e) => {
                tracing::error!(
                    recording = %recording.location,
                    error = %e,
                    "Error reading audio recording, skipping"
                );
                false
            }
        }
    }
}

/// Bytes owed this tick, truncated to whole frames
pub(crate) fn aligned_due(required: u64, sent: u64, frame_size: u64) -> u64 {
    let due = required.saturating_sub(sent);
    due - due % frame_size.max(1)
}

/// Silence that rounds a recording's length up to a whole tick
pub(crate) fn trailing_silence_ms(length_ms: u64, tick_ms: u64) -> u64 {
    let tick_ms = tick_ms.max(1);
    (tick_ms - length_ms % tick_ms) % tick_ms
}
