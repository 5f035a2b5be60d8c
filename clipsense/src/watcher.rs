//! Clipboard watcher: polling, self-write suppression and debounce
//!
//! One tokio task polls the clipboard on a fixed interval. A qualifying
//! change arms a single-slot debounce alarm; a later change replaces the
//! pending content rather than queuing behind it, so each quiet period
//! yields at most one capture, of the most recent text. The capture itself
//! runs on the blocking pool and is awaited inline, which keeps captures
//! strictly sequential. Clipboard reads also go through the blocking pool,
//! and neither reads nor programmatic writes hold the state lock while they
//! touch the OS clipboard.
//!
//! Programmatic writes are recognised two ways: a time window during which
//! polls are skipped, and a content comparison against the last value this
//! process wrote. The comparison holds regardless of timing, so a slow
//! OS pasteboard cannot turn a self-write into a capture. Once the write
//! is read back it stops being special, so the user copying the replaced
//! text again is an ordinary change.

use crate::clipboard::{ClipboardBackend, ClipboardError};
use crate::interface::ClipSenseError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);
pub const DEFAULT_SUPPRESSION_WINDOW: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherConfig {
    pub poll_interval: Duration,
    pub debounce: Duration,
    /// Polls are skipped for this long after a programmatic write
    pub suppression_window: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            debounce: DEFAULT_DEBOUNCE,
            suppression_window: DEFAULT_SUPPRESSION_WINDOW,
        }
    }
}

/// Receives debounced clipboard text. Runs on the blocking pool.
pub trait CaptureSink: Send + Sync + 'static {
    /// Process raw clipboard text; returns the stored clip id, if any
    fn capture(&self, raw: &str) -> Result<Option<String>, ClipSenseError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Debounce alarm
// ─────────────────────────────────────────────────────────────────────────────

/// A single-slot timer carrying a payload. Scheduling replaces whatever
/// was pending.
#[derive(Debug)]
pub struct DebounceAlarm<T> {
    slot: Option<(Instant, T)>,
}

impl<T> Default for DebounceAlarm<T> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<T> DebounceAlarm<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the alarm. Returns true if a pending payload was replaced.
    pub fn schedule(&mut self, deadline: Instant, value: T) -> bool {
        self.slot.replace((deadline, value)).is_some()
    }

    /// Disarm, returning the payload that will no longer fire
    pub fn cancel(&mut self) -> Option<T> {
        self.slot.take().map(|(_, value)| value)
    }

    pub fn is_armed(&self) -> bool {
        self.slot.is_some()
    }

    /// Resolves with the payload once the deadline passes; never resolves
    /// while disarmed. Cancel-safe: dropping the future leaves the alarm armed.
    pub async fn fired(&mut self) -> T {
        let Some(deadline) = self.slot.as_ref().map(|(deadline, _)| *deadline) else {
            return std::future::pending().await;
        };
        tokio::time::sleep_until(deadline).await;
        match self.slot.take() {
            Some((_, value)) => value,
            None => std::future::pending().await,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Watcher
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
struct WatchState {
    /// Last clipboard text seen or written; `None` until a baseline read succeeds
    last_observed: Option<String>,
    /// Text written by this process that has not been read back yet
    last_programmatic: Option<String>,
    /// What the clipboard held before the pending programmatic write; reads
    /// of it mean the write has not propagated yet
    superseded: Option<String>,
    suppressed_until: Option<Instant>,
    /// Bumped on every programmatic write; a read that started under an
    /// older generation is discarded
    generation: u64,
}

struct Inner {
    clipboard: Arc<dyn ClipboardBackend>,
    sink: Arc<dyn CaptureSink>,
    config: WatcherConfig,
    state: Mutex<WatchState>,
}

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub struct ClipboardWatcher {
    inner: Arc<Inner>,
    running: Mutex<Option<Running>>,
}

impl ClipboardWatcher {
    pub fn new(clipboard: Arc<dyn ClipboardBackend>, sink: Arc<dyn CaptureSink>, config: WatcherConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                clipboard,
                sink,
                config,
                state: Mutex::new(WatchState::default()),
            }),
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.inner.config
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Start polling on the current tokio runtime. The clipboard content at
    /// start is the baseline and is not captured. Returns false if the
    /// watcher was already running.
    pub fn start(&self) -> Result<bool, ClipSenseError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ClipSenseError::RuntimeUnavailable(e.to_string()))?;

        let mut running = self.running.lock();
        if running.is_some() {
            return Ok(false);
        }

        self.inner.reset_baseline();

        let cancel = CancellationToken::new();
        let task = runtime.spawn(Arc::clone(&self.inner).run(cancel.clone()));
        *running = Some(Running { cancel, task });

        tracing::info!(
            poll_ms = self.inner.config.poll_interval.as_millis() as u64,
            debounce_ms = self.inner.config.debounce.as_millis() as u64,
            "clipboard watcher started"
        );
        Ok(true)
    }

    /// Stop polling and drop any pending debounce. When this returns, no
    /// capture is in flight and none will start. Returns false if the
    /// watcher was not running.
    pub async fn stop(&self) -> bool {
        let Some(Running { cancel, task }) = self.running.lock().take() else {
            return false;
        };
        cancel.cancel();
        if let Err(e) = task.await {
            if !e.is_cancelled() {
                tracing::error!(error = %e, "clipboard watcher task failed");
            }
        }
        tracing::info!("clipboard watcher stopped");
        true
    }

    /// Write to the clipboard without the watcher capturing it
    pub fn copy_to_clipboard(&self, content: &str) -> Result<(), ClipboardError> {
        self.inner.copy_to_clipboard(content)
    }
}

impl Drop for ClipboardWatcher {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.cancel.cancel();
        }
    }
}

impl Inner {
    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut alarm: DebounceAlarm<String> = DebounceAlarm::new();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                content = alarm.fired() => self.dispatch(content).await,
                _ = ticker.tick() => {
                    if let Some(content) = self.poll_once().await {
                        let replaced = alarm.schedule(Instant::now() + self.config.debounce, content);
                        tracing::debug!(replaced, "clipboard change detected, debounce armed");
                    }
                }
            }
        }

        if alarm.cancel().is_some() {
            tracing::debug!("pending clipboard change dropped on stop");
        }
    }

    fn reset_baseline(&self) {
        let read = self.clipboard.read_text();
        let mut state = self.state.lock();
        *state = WatchState::default();
        match read {
            Ok(text) => state.last_observed = Some(text),
            Err(e) => tracing::warn!(error = %e, "initial clipboard read failed, next successful read becomes the baseline"),
        }
    }

    /// One poll: returns the new text if it qualifies as a user change.
    /// The read runs on the blocking pool without holding the state lock.
    async fn poll_once(&self) -> Option<String> {
        let generation = self.begin_poll()?;

        let clipboard = Arc::clone(&self.clipboard);
        let read = match tokio::task::spawn_blocking(move || clipboard.read_text()).await {
            Ok(read) => read,
            Err(e) => {
                tracing::error!(error = %e, "clipboard read task failed");
                return None;
            }
        };

        self.evaluate(generation, read)
    }

    /// Suppression check before a read. Returns the write generation the
    /// read is taken under, or `None` while polls are suppressed.
    fn begin_poll(&self) -> Option<u64> {
        let mut state = self.state.lock();
        if let Some(until) = state.suppressed_until {
            if Instant::now() < until {
                return None;
            }
            state.suppressed_until = None;
        }
        Some(state.generation)
    }

    /// Apply the change rules to a finished read
    fn evaluate(&self, generation: u64, read: Result<String, ClipboardError>) -> Option<String> {
        let current = match read {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "clipboard read failed, treating as no change");
                return None;
            }
        };

        let mut state = self.state.lock();
        if state.generation != generation {
            // A programmatic write landed while this read was in flight
            return None;
        }

        let Some(last) = state.last_observed.as_deref() else {
            state.last_observed = Some(current);
            return None;
        };

        // Our own write has propagated; the value it replaced is an
        // ordinary clipboard value again
        if state.last_programmatic.as_deref() == Some(current.as_str()) {
            state.last_observed = Some(current);
            state.last_programmatic = None;
            state.superseded = None;
            return None;
        }
        if current == last {
            return None;
        }
        if state.last_programmatic.is_some() && state.superseded.as_deref() == Some(current.as_str()) {
            return None;
        }

        if current.trim().is_empty() {
            return None;
        }

        state.last_observed = Some(current.clone());
        state.last_programmatic = None;
        state.superseded = None;
        Some(current)
    }

    /// The write itself happens outside the state lock
    fn copy_to_clipboard(&self, content: &str) -> Result<(), ClipboardError> {
        let (snapshot, generation) = {
            let mut state = self.state.lock();
            let snapshot = state.clone();
            state.generation += 1;
            state.superseded = state.last_observed.replace(content.to_string());
            state.last_programmatic = Some(content.to_string());
            state.suppressed_until = Some(Instant::now() + self.config.suppression_window);
            (snapshot, state.generation)
        };

        if let Err(e) = self.clipboard.write_text(content) {
            let mut state = self.state.lock();
            if state.generation == generation {
                *state = WatchState { generation, ..snapshot };
            }
            return Err(e);
        }
        tracing::debug!(len = content.len(), "programmatic clipboard write");
        Ok(())
    }

    async fn dispatch(&self, content: String) {
        let sink = Arc::clone(&self.sink);
        match tokio::task::spawn_blocking(move || sink.capture(&content)).await {
            Ok(Ok(Some(id))) => tracing::debug!(id = %id, "clipboard change captured"),
            Ok(Ok(None)) => tracing::debug!("clipboard change not stored"),
            Ok(Err(e)) => tracing::error!(error = %e, "failed to capture clipboard change"),
            Err(e) => tracing::error!(error = %e, "capture task failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;

    struct NullSink;

    impl CaptureSink for NullSink {
        fn capture(&self, _raw: &str) -> Result<Option<String>, ClipSenseError> {
            Ok(None)
        }
    }

    fn inner_with(clipboard: Arc<MemoryClipboard>) -> Inner {
        Inner {
            clipboard,
            sink: Arc::new(NullSink),
            config: WatcherConfig::default(),
            state: Mutex::new(WatchState::default()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_alarm_replaces_pending_value() {
        let mut alarm = DebounceAlarm::new();
        let now = Instant::now();
        assert!(!alarm.schedule(now + Duration::from_millis(100), "first"));
        assert!(alarm.schedule(now + Duration::from_millis(200), "second"));
        assert_eq!(alarm.fired().await, "second");
        assert_eq!(Instant::now(), now + Duration::from_millis(200));
        assert!(!alarm.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_alarm_never_fires() {
        let mut alarm: DebounceAlarm<u8> = DebounceAlarm::new();
        alarm.schedule(Instant::now() + Duration::from_millis(10), 1);
        assert_eq!(alarm.cancel(), Some(1));
        let fired = tokio::time::timeout(Duration::from_secs(5), alarm.fired()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_alarm_survives_dropped_wait() {
        let mut alarm = DebounceAlarm::new();
        alarm.schedule(Instant::now() + Duration::from_millis(100), 7);
        let early = tokio::time::timeout(Duration::from_millis(50), alarm.fired()).await;
        assert!(early.is_err());
        assert!(alarm.is_armed());
        assert_eq!(alarm.fired().await, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_once_rules() {
        let clipboard = Arc::new(MemoryClipboard::new());
        clipboard.set("baseline");
        let inner = inner_with(Arc::clone(&clipboard));
        inner.reset_baseline();

        assert_eq!(inner.poll_once().await, None, "unchanged");

        clipboard.set("   \n");
        assert_eq!(inner.poll_once().await, None, "whitespace only");

        clipboard.set("new text");
        assert_eq!(inner.poll_once().await, Some("new text".to_string()));
        assert_eq!(inner.poll_once().await, None, "already observed");

        clipboard.fail_next_reads(1);
        clipboard.set("after failure");
        assert_eq!(inner.poll_once().await, None, "read error is no change");
        assert_eq!(inner.poll_once().await, Some("after failure".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_programmatic_write_is_not_a_change() {
        let clipboard = Arc::new(MemoryClipboard::new());
        clipboard.set("user text");
        let inner = inner_with(Arc::clone(&clipboard));
        inner.reset_baseline();

        inner.copy_to_clipboard("from app").unwrap();
        assert_eq!(inner.poll_once().await, None, "inside suppression window");

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(inner.poll_once().await, None, "matches last programmatic write");
    }

    #[tokio::test(start_paused = true)]
    async fn test_baseline_adopted_after_failed_start_read() {
        let clipboard = Arc::new(MemoryClipboard::new());
        clipboard.set("existing");
        clipboard.fail_next_reads(1);
        let inner = inner_with(Arc::clone(&clipboard));
        inner.reset_baseline();

        assert_eq!(inner.poll_once().await, None, "first good read is the baseline");
        clipboard.set("fresh");
        assert_eq!(inner.poll_once().await, Some("fresh".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replaced_text_copied_again_is_a_change() {
        let clipboard = Arc::new(MemoryClipboard::new());
        clipboard.set("A");
        let inner = inner_with(Arc::clone(&clipboard));
        inner.reset_baseline();

        inner.copy_to_clipboard("T").unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(inner.poll_once().await, None, "own write read back");

        clipboard.set("A");
        assert_eq!(inner.poll_once().await, Some("A".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replaced_text_ignored_until_write_propagates() {
        let clipboard = Arc::new(MemoryClipboard::new());
        clipboard.set("A");
        clipboard.delay_writes(true);
        let inner = inner_with(Arc::clone(&clipboard));
        inner.reset_baseline();

        inner.copy_to_clipboard("T").unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(inner.poll_once().await, None, "stale pre-write value");

        clipboard.propagate();
        assert_eq!(inner.poll_once().await, None, "own write read back");
        clipboard.set("A");
        assert_eq!(inner.poll_once().await, Some("A".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_overlapping_a_write_is_discarded() {
        let clipboard = Arc::new(MemoryClipboard::new());
        clipboard.set("before");
        let inner = inner_with(Arc::clone(&clipboard));
        inner.reset_baseline();

        let generation = inner.begin_poll().unwrap();
        inner.copy_to_clipboard("written").unwrap();
        assert_eq!(inner.evaluate(generation, Ok("user change".to_string())), None);
        assert_eq!(inner.state.lock().last_observed.as_deref(), Some("written"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_write_restores_state() {
        struct ReadOnly(MemoryClipboard);

        impl ClipboardBackend for ReadOnly {
            fn read_text(&self) -> Result<String, ClipboardError> {
                self.0.read_text()
            }

            fn write_text(&self, _text: &str) -> Result<(), ClipboardError> {
                Err(ClipboardError::Write("denied".to_string()))
            }
        }

        let backend = ReadOnly(MemoryClipboard::new());
        backend.0.set("kept");
        let inner = Inner {
            clipboard: Arc::new(backend),
            sink: Arc::new(NullSink),
            config: WatcherConfig::default(),
            state: Mutex::new(WatchState::default()),
        };
        inner.reset_baseline();

        assert!(inner.copy_to_clipboard("lost").is_err());
        let state = inner.state.lock();
        assert_eq!(state.last_observed.as_deref(), Some("kept"));
        assert!(state.last_programmatic.is_none());
        assert!(state.suppressed_until.is_none());
    }
}
