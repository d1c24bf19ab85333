//! Recording queue
//!
//! Unbounded FIFO of recordings awaiting broadcast. Producers append through
//! a lock-free unbounded channel and never block. The consumer side (the
//! pacing engine, or a drain on disconnect) holds the receiver plus a
//! one-slot peeked head, so the head can be inspected before it is removed.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use super::descriptor::AudioRecording;

/// Multi-producer, single-consumer recording queue
pub struct RecordingQueue {
    tx: mpsc::UnboundedSender<AudioRecording>,
    consumer: Mutex<ConsumerState>,
    len: AtomicUsize,
}

struct ConsumerState {
    rx: mpsc::UnboundedReceiver<AudioRecording>,
    head: Option<AudioRecording>,
}

impl RecordingQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            tx,
            consumer: Mutex::new(ConsumerState { rx, head: None }),
            len: AtomicUsize::new(0),
        }
    }

    /// Append a recording to the tail
    ///
    /// Never blocks.
    pub fn push(&self, recording: AudioRecording) {
        // Count before sending so a concurrent pop can never underflow
        self.len.fetch_add(1, Ordering::AcqRel);

        if let Err(mpsc::error::SendError(recording)) = self.tx.send(recording) {
            // Receiver lives as long as the queue; unreachable in practice
            self.len.fetch_sub(1, Ordering::AcqRel);
            recording.release();
        }
    }

    /// Number of queued recordings
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Exclusive access to the consumer end
    pub fn consumer(&self) -> QueueConsumer<'_> {
        QueueConsumer {
            state: self
                .consumer
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
            len: &self.len,
        }
    }

    /// Remove every queued recording, releasing each one
    ///
    /// A release callback that panics is ignored and the drain continues.
    /// Returns the number of recordings removed.
    pub fn drain(&self) -> usize {
        let mut consumer = self.consumer();
        let mut drained = 0;

        while let Some(recording) = consumer.pop() {
            drained += 1;
            if panic::catch_unwind(AssertUnwindSafe(|| recording.release())).is_err() {
                tracing::debug!("Release callback panicked during queue drain");
            }
        }

        drained
    }
}

impl Default for RecordingQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumer end of the queue, held for the duration of one operation
pub struct QueueConsumer<'a> {
    state: MutexGuard<'a, ConsumerState>,
    len: &'a AtomicUsize,
}

impl QueueConsumer<'_> {
    /// Inspect the head without removing it
    pub fn peek(&mut self) -> Option<&AudioRecording> {
        if self.state.head.is_none() {
            self.state.head = self.state.rx.try_recv().ok();
        }

        self.state.head.as_ref()
    }

    /// Remove and return the head
    pub fn pop(&mut self) -> Option<AudioRecording> {
        let head = self.state.head.take();
        let recording = head.or_else(|| self.state.rx.try_recv().ok());

        if recording.is_some() {
            self.len.fetch_sub(1, Ordering::AcqRel);
        }

        recording
    }
}
