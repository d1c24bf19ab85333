//! Audio broadcaster
//!
//! Owns the recording queue, the connection state machine and the periodic
//! pacing task for one outbound stream.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant, SystemTime};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::BroadcastConfig;
use crate::error::{BroadcastError, Result};
use crate::recording::{AudioRecording, RecordingQueue};
use crate::stats::{BroadcastCounters, BroadcasterStats};

use super::event::{BroadcastEventKind, BroadcastListener, EventNotifier};
use super::pacer::{PacingContext, PacingEngine};
use super::sink::{BroadcastSink, SilenceSource};
use super::state::{AtomicBroadcastState, BroadcastState};

/// Streams queued recordings to a [`BroadcastSink`] at a steady byte rate
///
/// Recordings are accepted through [`ingest`](Self::ingest) while the sink
/// is connected, held for the configured delay, then streamed in FIFO order.
/// When nothing is on air, one tick of silence is sent per tick to keep the
/// remote connection open.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use std::time::{Duration, SystemTime};
/// use bytes::Bytes;
/// use audio_broadcast::{
///     AudioBroadcaster, AudioRecording, BroadcastConfig, BroadcastSink, BroadcastState,
///     FrameSilence, RecordingLocation, RecordingMetadata,
/// };
///
/// struct LogSink;
///
/// impl BroadcastSink for LogSink {
///     fn push_audio(&self, audio: Bytes) { println!("{} bytes", audio.len()); }
///     fn push_metadata(&self, metadata: Option<&RecordingMetadata>) { println!("{:?}", metadata); }
///     fn disconnect(&self) {}
/// }
///
/// # async fn example() -> audio_broadcast::Result<()> {
/// let config = BroadcastConfig::new("scanner").delay(Duration::from_secs(5));
/// let silence = FrameSilence::new(Bytes::from(vec![0u8; 144]), 72);
/// let broadcaster = AudioBroadcaster::new(config, Arc::new(LogSink), Arc::new(silence));
///
/// broadcaster.start()?;
/// broadcaster.set_state(BroadcastState::Connected);
///
/// broadcaster.ingest(AudioRecording::new(
///     SystemTime::now(),
///     Duration::from_millis(2500),
///     RecordingLocation::File("/tmp/call-0001.mp3".into()),
/// ));
/// # Ok(())
/// # }
/// ```
pub struct AudioBroadcaster {
    shared: Arc<Shared>,
}

struct Shared {
    name: Arc<str>,
    config: BroadcastConfig,
    sink: Arc<dyn BroadcastSink>,
    silence: Arc<dyn SilenceSource>,
    queue: RecordingQueue,
    state: AtomicBroadcastState,
    notifier: EventNotifier,
    counters: BroadcastCounters,

    /// Set while the pacing task is scheduled
    streaming: AtomicBool,
    /// Re-entrancy guard for the tick body
    processing: AtomicBool,
    engine: Mutex<PacingEngine>,
    task: Mutex<Option<JoinHandle<()>>>,
    started_at: Mutex<Option<Instant>>,
}

impl AudioBroadcaster {
    /// Create a broadcaster in the `Ready` state
    pub fn new(
        config: BroadcastConfig,
        sink: Arc<dyn BroadcastSink>,
        silence: Arc<dyn SilenceSource>,
    ) -> Self {
        let name: Arc<str> = Arc::from(config.name.as_str());

        Self {
            shared: Arc::new(Shared {
                notifier: EventNotifier::new(Arc::clone(&name)),
                name,
                config,
                sink,
                silence,
                queue: RecordingQueue::new(),
                state: AtomicBroadcastState::new(BroadcastState::Ready),
                counters: BroadcastCounters::default(),
                streaming: AtomicBool::new(false),
                processing: AtomicBool::new(false),
                engine: Mutex::new(PacingEngine::new()),
                task: Mutex::new(None),
                started_at: Mutex::new(None),
            }),
        }
    }

    /// Stream name from the configuration
    pub fn stream_name(&self) -> &str {
        &self.shared.name
    }

    pub fn config(&self) -> &BroadcastConfig {
        &self.shared.config
    }

    /// Handle a sink uses to report connection changes
    pub fn state_reporter(&self) -> StateReporter {
        StateReporter {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Start the pacing task on the current tokio runtime
    ///
    /// Has no effect if already streaming.
    pub fn start(&self) -> Result<()> {
        self.shared.start()
    }

    /// Stop the pacing task and disconnect the sink
    ///
    /// Has no effect unless streaming. A tick already running completes.
    pub fn stop(&self) {
        self.shared.stop();
    }

    /// Whether the pacing task is scheduled
    pub fn is_streaming(&self) -> bool {
        self.shared.streaming.load(Ordering::Acquire)
    }

    /// Hand a finished recording to the broadcaster
    ///
    /// Queued while connected; otherwise released immediately. Never blocks.
    pub fn ingest(&self, recording: AudioRecording) {
        self.shared.ingest(recording);
    }

    /// Run one pacing tick now
    ///
    /// Skipped entirely if another tick is still running.
    pub fn tick(&self) {
        self.shared.tick(SystemTime::now());
    }

    #[cfg(test)]
    pub(crate) fn tick_at(&self, now: SystemTime) {
        self.shared.tick(now);
    }

    /// Current connection state
    pub fn state(&self) -> BroadcastState {
        self.shared.state.load()
    }

    /// Update the connection state
    ///
    /// Error states stop the broadcaster and only give way to another error
    /// state or [`reset`](Self::reset). Leaving `Connected` releases every
    /// queued recording.
    pub fn set_state(&self, state: BroadcastState) {
        self.shared.set_state(state, false);
    }

    /// Clear an error state back to `Ready`
    pub fn reset(&self) {
        if self.state().is_error_state() {
            self.shared.set_state(BroadcastState::Ready, true);
        }
    }

    /// Whether a connection attempt is allowed in the current state
    pub fn can_connect(&self) -> bool {
        let state = self.state();
        !state.is_connected() && !state.is_error_state()
    }

    pub fn is_error_state(&self) -> bool {
        self.state().is_error_state()
    }

    /// Recordings waiting to stream
    pub fn queue_size(&self) -> usize {
        self.shared.queue.len()
    }

    /// Recordings streamed to the remote server
    pub fn streamed_count(&self) -> u64 {
        self.shared.counters.streamed()
    }

    /// Recordings removed for exceeding the maximum age
    pub fn aged_off_count(&self) -> u64 {
        self.shared.counters.aged_off()
    }

    pub fn stats(&self) -> BroadcasterStats {
        let started_at = *self
            .shared
            .started_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let uptime = started_at.map(|at| at.elapsed());

        BroadcasterStats::snapshot(
            &self.shared.name,
            self.state(),
            self.queue_size(),
            &self.shared.counters,
            uptime,
        )
    }

    /// Register the event listener, replacing any previous one
    pub fn set_listener(&self, listener: Arc<dyn BroadcastListener>) {
        self.shared.notifier.set_listener(listener);
    }

    pub fn remove_listener(&self) {
        self.shared.notifier.remove_listener();
    }

    /// Stop, release every queued recording and drop the listener
    pub fn dispose(&self) {
        self.shared.stop();
        self.shared.queue.drain();
        self.shared.notifier.remove_listener();
    }
}

impl std::fmt::Debug for AudioBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioBroadcaster")
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .field("streaming", &self.is_streaming())
            .field("queue_size", &self.queue_size())
            .finish()
    }
}

impl Shared {
    fn start(self: &Arc<Self>) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| BroadcastError::NoRuntime)?;

        // Held across the flag swap and spawn so a concurrent stop always
        // finds the handle
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);

        if self
            .streaming
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        *task = Some(runtime.spawn(run_pacing(Arc::downgrade(self), self.config.tick_interval)));
        drop(task);

        *self.started_at.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());

        tracing::info!(
            stream = %self.name,
            interval_ms = self.config.tick_interval_ms(),
            "Broadcaster started"
        );

        Ok(())
    }

    fn stop(&self) {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);

        if self
            .streaming
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        if let Some(task) = task.take() {
            task.abort();
        }
        drop(task);
        *self.started_at.lock().unwrap_or_else(PoisonError::into_inner) = None;

        self.sink.disconnect();

        tracing::info!(stream = %self.name, "Broadcaster stopped");
    }

    fn ingest(&self, recording: AudioRecording) {
        if self.state.load().is_connected() {
            self.queue.push(recording);
            self.notifier.notify(BroadcastEventKind::QueueChanged);
        } else {
            tracing::trace!(stream = %self.name, "Not connected, recording released");
            recording.release();
        }
    }

    fn set_state(&self, state: BroadcastState, force: bool) {
        let Some(previous) = self.state.transition(state, force) else {
            return;
        };

        if matches!(state, BroadcastState::Connected | BroadcastState::Disconnected) {
            tracing::info!(stream = %self.name, status = %state, "Broadcast status");
        } else {
            tracing::debug!(stream = %self.name, from = %previous, to = %state, "Broadcast state changed");
        }

        self.notifier.notify(BroadcastEventKind::StateChanged);

        if state.is_error_state() {
            tracing::error!(stream = %self.name, status = %state, "Broadcast error, stopping");
            self.stop();
        }

        if !self.state.load().is_connected() {
            let drained = self.queue.drain();
            if drained > 0 {
                tracing::debug!(stream = %self.name, drained = drained, "Released queued recordings");
                self.notifier.notify(BroadcastEventKind::QueueChanged);
            }
        }
    }

    fn tick(&self, now: SystemTime) {
        if self
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::trace!(stream = %self.name, "Previous tick still running, skipped");
            return;
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let ctx = PacingContext {
                config: &self.config,
                queue: &self.queue,
                state: &self.state,
                sink: self.sink.as_ref(),
                silence: self.silence.as_ref(),
                notifier: &self.notifier,
                counters: &self.counters,
            };

            self.engine
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .tick(&ctx, now);
        }));

        if let Err(panic) = result {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown".to_string());

            tracing::error!(
                stream = %self.name,
                error = %message,
                "Error while processing audio streaming queue"
            );
        }

        self.processing.store(false, Ordering::Release);
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().unwrap_or_else(PoisonError::into_inner).take() {
            task.abort();
        }
    }
}

/// Periodic pacing loop
///
/// Holds only a weak reference so dropping the broadcaster ends the loop.
async fn run_pacing(shared: Weak<Shared>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let Some(broadcaster) = shared.upgrade() else {
            break;
        };
        broadcaster.tick(SystemTime::now());
    }
}

/// Weak handle for reporting connection state back to a broadcaster
#[derive(Clone)]
pub struct StateReporter {
    shared: Weak<Shared>,
}

impl StateReporter {
    /// Report a new connection state; ignored once the broadcaster is gone
    pub fn set_state(&self, state: BroadcastState) {
        if let Some(shared) = self.shared.upgrade() {
            shared.set_state(state, false);
        }
    }

    /// Current state, or None if the broadcaster was dropped
    pub fn state(&self) -> Option<BroadcastState> {
        self.shared.upgrade().map(|shared| shared.state.load())
    }
}

impl std::fmt::Debug for StateReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateReporter")
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        init_tracing, memory_recording, numbered_recording, CollectingSink, ReleaseCounter,
        TrackingSilence,
    };
    use crate::BroadcastEvent;
    use std::sync::atomic::AtomicUsize;

    fn broadcaster(
        config: BroadcastConfig,
    ) -> (AudioBroadcaster, Arc<CollectingSink>, Arc<TrackingSilence>) {
        init_tracing();
        let sink = CollectingSink::new();
        let silence = TrackingSilence::new();
        let b = AudioBroadcaster::new(config, sink.clone(), silence.clone());
        (b, sink, silence)
    }

    fn unlimited() -> BroadcastConfig {
        BroadcastConfig::new("test").unlimited_recording_age()
    }

    fn event_log(b: &AudioBroadcaster) -> Arc<Mutex<Vec<BroadcastEventKind>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let l = Arc::clone(&log);
        b.set_listener(Arc::new(move |e: &BroadcastEvent| {
            l.lock().unwrap().push(e.kind)
        }));
        log
    }

    #[test]
    fn test_ingest_while_disconnected_releases() {
        let (b, _, _) = broadcaster(unlimited());
        let releases = ReleaseCounter::new();

        b.set_state(BroadcastState::Disconnected);
        b.ingest(releases.track(memory_recording(SystemTime::now(), 1000, 100)));

        assert_eq!(releases.count(), 1);
        assert_eq!(b.queue_size(), 0);
    }

    #[test]
    fn test_ingest_while_connected_queues() {
        let (b, _, _) = broadcaster(unlimited());
        b.set_state(BroadcastState::Connected);
        let events = event_log(&b);

        b.ingest(memory_recording(SystemTime::now(), 1000, 100));

        assert_eq!(b.queue_size(), 1);
        assert_eq!(*events.lock().unwrap(), vec![BroadcastEventKind::QueueChanged]);
    }

    #[test]
    fn test_fifo_across_ticks() {
        let (b, sink, _) = broadcaster(unlimited());
        b.set_state(BroadcastState::Connected);
        let now = SystemTime::now();

        for seq in 0..4 {
            b.ingest(numbered_recording(seq, now, 1000, 1000));
        }
        for _ in 0..5 {
            b.tick_at(now);
        }

        let titles: Vec<_> = sink.metadata_updates().into_iter().flatten().collect();
        assert_eq!(titles, vec!["SEQ:0", "SEQ:1", "SEQ:2", "SEQ:3"]);
        assert_eq!(b.streamed_count(), 4);
    }

    #[test]
    fn test_three_recordings_padded_to_tick() {
        let (b, sink, silence) = broadcaster(unlimited());
        b.set_state(BroadcastState::Connected);
        let now = SystemTime::now();
        let releases = ReleaseCounter::new();

        for _ in 0..3 {
            b.ingest(releases.track(memory_recording(now, 2500, 5000)));
        }

        // Three data ticks each; the trailing silence shares a tick with
        // the next recording's first chunk
        for _ in 0..10 {
            b.tick_at(now);
        }

        assert_eq!(b.streamed_count(), 3);
        assert_eq!(b.queue_size(), 0);
        assert_eq!(releases.count(), 3);
        assert_eq!(sink.audio_bytes(), 15_000);

        // Each recording padded from 2500ms to 3000ms
        assert_eq!(silence.requests(), vec![500, 500, 500]);
        assert_eq!(silence.total_ms(), 1500);
    }

    #[test]
    fn test_stale_recording_aged_off() {
        let (b, sink, _) = broadcaster(
            BroadcastConfig::new("test").maximum_recording_age(Duration::from_secs(30)),
        );
        b.set_state(BroadcastState::Connected);
        let events = event_log(&b);
        let releases = ReleaseCounter::new();
        let now = SystemTime::now();

        b.ingest(releases.track(memory_recording(
            now - Duration::from_secs(3600),
            1000,
            1000,
        )));
        b.tick_at(now);

        assert_eq!(b.aged_off_count(), 1);
        assert_eq!(b.streamed_count(), 0);
        assert_eq!(releases.count(), 1);
        assert_eq!(sink.audio_bytes(), 0);
        assert!(events
            .lock()
            .unwrap()
            .contains(&BroadcastEventKind::AgedOffCountChanged));
    }

    #[test]
    fn test_leaving_connected_drains_queue() {
        let (b, _, _) = broadcaster(unlimited());
        b.set_state(BroadcastState::Connected);
        let releases = ReleaseCounter::new();

        for _ in 0..3 {
            b.ingest(releases.track(memory_recording(SystemTime::now(), 1000, 100)));
        }
        assert_eq!(b.queue_size(), 3);

        b.set_state(BroadcastState::Disconnected);

        assert_eq!(b.queue_size(), 0);
        assert_eq!(releases.count(), 3);
    }

    #[test]
    fn test_release_exactly_once_on_every_path() {
        let (b, _, _) = broadcaster(
            BroadcastConfig::new("test").maximum_recording_age(Duration::from_secs(30)),
        );
        let releases = ReleaseCounter::new();
        let now = SystemTime::now();

        // Rejected
        b.ingest(releases.track(memory_recording(now, 1000, 100)));

        b.set_state(BroadcastState::Connected);
        // Evicted, streamed, skipped, then drained
        b.ingest(releases.track(memory_recording(now - Duration::from_secs(600), 1000, 100)));
        b.ingest(releases.track(memory_recording(now, 1000, 100)));
        b.ingest(releases.track(memory_recording(now, 1000, 0)));
        b.tick_at(now);
        b.tick_at(now);
        b.ingest(releases.track(memory_recording(now + Duration::from_secs(60), 1000, 100)));
        b.set_state(BroadcastState::Disconnected);
        b.dispose();

        assert_eq!(releases.count(), 5);
    }

    #[test]
    fn test_no_recording_audio_after_disconnect() {
        let (b, sink, silence) = broadcaster(unlimited());
        b.set_state(BroadcastState::Connected);
        let now = SystemTime::now();

        b.ingest(memory_recording(now, 5000, 10_000));
        b.tick_at(now);
        assert_eq!(sink.audio_bytes(), 1872);

        b.set_state(BroadcastState::Disconnected);
        b.tick_at(now);
        b.tick_at(now);

        assert_eq!(sink.audio_bytes(), 1872);
        assert_eq!(silence.requests(), vec![1000, 1000]);
        assert_eq!(b.streamed_count(), 0);
        assert!(!b.stats().recording_active);
    }

    #[test]
    fn test_concurrent_start_stop_keeps_task_in_step() {
        let (b, _, _) = broadcaster(unlimited());
        let b = Arc::new(b);
        let runtime = tokio::runtime::Runtime::new().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let b = Arc::clone(&b);
                let handle = runtime.handle().clone();
                std::thread::spawn(move || {
                    let _enter = handle.enter();
                    for _ in 0..50 {
                        if i % 2 == 0 {
                            b.start().unwrap();
                        } else {
                            b.stop();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // A scheduled task exists exactly when streaming
        assert_eq!(b.is_streaming(), b.shared.task.lock().unwrap().is_some());

        b.stop();
        assert!(!b.is_streaming());
        assert!(b.shared.task.lock().unwrap().is_none());
    }

    #[test]
    fn test_set_state_same_is_noop() {
        let (b, _, _) = broadcaster(unlimited());
        let events = event_log(&b);

        b.set_state(BroadcastState::Connecting);
        b.set_state(BroadcastState::Connecting);

        assert_eq!(*events.lock().unwrap(), vec![BroadcastEventKind::StateChanged]);
    }

    #[test]
    fn test_can_connect() {
        let (b, _, _) = broadcaster(unlimited());
        assert!(b.can_connect());

        b.set_state(BroadcastState::Connected);
        assert!(!b.can_connect());

        b.set_state(BroadcastState::Disconnected);
        assert!(b.can_connect());

        b.set_state(BroadcastState::InvalidMountPoint);
        assert!(!b.can_connect());
        assert!(b.is_error_state());
    }

    #[test]
    fn test_error_state_sticky_until_reset() {
        let (b, _, _) = broadcaster(unlimited());

        b.set_state(BroadcastState::InvalidCredentials);
        b.set_state(BroadcastState::Connected);
        assert_eq!(b.state(), BroadcastState::InvalidCredentials);

        b.reset();
        assert_eq!(b.state(), BroadcastState::Ready);

        b.set_state(BroadcastState::Connected);
        assert_eq!(b.state(), BroadcastState::Connected);
    }

    #[test]
    fn test_start_requires_runtime() {
        let (b, _, _) = broadcaster(unlimited());
        assert!(matches!(b.start(), Err(BroadcastError::NoRuntime)));
        assert!(!b.is_streaming());
    }

    #[test]
    fn test_stop_when_not_streaming_is_noop() {
        let (b, sink, _) = broadcaster(unlimited());
        b.stop();
        assert_eq!(sink.disconnect_count(), 0);
    }

    #[tokio::test]
    async fn test_start_stop_idempotent() {
        let (b, sink, _) = broadcaster(unlimited());

        tokio_test::assert_ok!(b.start());
        tokio_test::assert_ok!(b.start());
        assert!(b.is_streaming());
        assert!(b.stats().uptime.is_some());

        b.stop();
        b.stop();
        assert!(!b.is_streaming());
        assert_eq!(sink.disconnect_count(), 1);
        assert!(b.stats().uptime.is_none());
    }

    #[tokio::test]
    async fn test_error_state_stops_streaming() {
        let (b, sink, _) = broadcaster(unlimited());
        b.start().unwrap();
        b.set_state(BroadcastState::Connected);

        b.state_reporter().set_state(BroadcastState::NoServer);

        assert!(!b.is_streaming());
        assert_eq!(sink.disconnect_count(), 1);
        assert_eq!(b.state(), BroadcastState::NoServer);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_ticks_at_interval() {
        let (b, sink, silence) = broadcaster(unlimited());
        b.set_state(BroadcastState::Connected);
        b.ingest(memory_recording(SystemTime::now(), 2000, 4000));

        b.start().unwrap();

        // First tick fires immediately, then once per second
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(sink.audio_chunks(), vec![1872, 2016, 112]);

        b.stop();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(sink.audio_chunks().len(), 3);
        assert!(silence.requests().is_empty());
    }

    #[test]
    fn test_reentrant_tick_skipped() {
        struct ReentrantSink {
            broadcaster: Mutex<Option<Arc<AudioBroadcaster>>>,
            pushes: AtomicUsize,
        }

        impl BroadcastSink for ReentrantSink {
            fn push_audio(&self, _audio: bytes::Bytes) {
                self.pushes.fetch_add(1, Ordering::SeqCst);
                let b = self.broadcaster.lock().unwrap().clone();
                if let Some(b) = b {
                    // Would recurse forever without the guard
                    b.tick();
                }
            }
            fn push_metadata(&self, _metadata: Option<&crate::RecordingMetadata>) {}
            fn disconnect(&self) {}
        }

        let sink = Arc::new(ReentrantSink {
            broadcaster: Mutex::new(None),
            pushes: AtomicUsize::new(0),
        });
        let b = Arc::new(AudioBroadcaster::new(
            unlimited(),
            sink.clone(),
            TrackingSilence::new(),
        ));
        *sink.broadcaster.lock().unwrap() = Some(Arc::clone(&b));

        b.tick();
        assert_eq!(sink.pushes.load(Ordering::SeqCst), 1);

        sink.broadcaster.lock().unwrap().take();
    }

    #[test]
    fn test_panicking_sink_does_not_escape_tick() {
        struct PanicSink;

        impl BroadcastSink for PanicSink {
            fn push_audio(&self, _audio: bytes::Bytes) {
                panic!("sink failure");
            }
            fn push_metadata(&self, _metadata: Option<&crate::RecordingMetadata>) {}
            fn disconnect(&self) {}
        }

        let b = AudioBroadcaster::new(unlimited(), Arc::new(PanicSink), TrackingSilence::new());
        b.tick();
        // Guard was cleared, so the next tick runs (and is caught) too
        b.tick();
    }

    #[test]
    fn test_dispose() {
        let (b, _, _) = broadcaster(unlimited());
        b.set_state(BroadcastState::Connected);
        let events = event_log(&b);
        let releases = ReleaseCounter::new();

        b.ingest(releases.track(memory_recording(SystemTime::now(), 1000, 100)));
        b.ingest(releases.track(memory_recording(SystemTime::now(), 1000, 100)));
        b.dispose();

        assert_eq!(b.queue_size(), 0);
        assert_eq!(releases.count(), 2);

        let before = events.lock().unwrap().len();
        b.set_state(BroadcastState::Disconnected);
        assert_eq!(events.lock().unwrap().len(), before);
    }

    #[test]
    fn test_reporter_outlives_broadcaster() {
        let (b, _, _) = broadcaster(unlimited());
        let reporter = b.state_reporter();

        reporter.set_state(BroadcastState::Connecting);
        assert_eq!(reporter.state(), Some(BroadcastState::Connecting));

        drop(b);
        reporter.set_state(BroadcastState::Connected);
        assert_eq!(reporter.state(), None);
    }

    #[test]
    fn test_stats_snapshot() {
        let (b, _, _) = broadcaster(unlimited());
        b.set_state(BroadcastState::Connected);
        let now = SystemTime::now();

        b.ingest(memory_recording(now, 2500, 5000));
        b.tick_at(now);

        let stats = b.stats();
        assert_eq!(stats.stream_name, "test");
        assert_eq!(stats.state, BroadcastState::Connected);
        assert_eq!(stats.audio_bytes, 1872);
        assert!(stats.recording_active);
        assert_eq!(stats.queue_size, 0);
    }
}
