//! Clipboard access
//!
//! `ClipboardBackend` is the only seam between the core and the OS
//! clipboard. `SystemClipboard` wraps `arboard`; `MemoryClipboard` is an
//! in-process clipboard for headless use and tests, with scripted read
//! failures and delayed propagation of programmatic writes.

use parking_lot::Mutex;
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("Clipboard read failed: {0}")]
    Read(String),
    #[error("Clipboard write failed: {0}")]
    Write(String),
}

/// OS clipboard primitive: plain text in, plain text out
pub trait ClipboardBackend: Send + Sync + 'static {
    /// Current clipboard text. An empty clipboard, or one holding non-text
    /// content, reads as the empty string.
    fn read_text(&self) -> Result<String, ClipboardError>;

    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// System clipboard
// ─────────────────────────────────────────────────────────────────────────────

/// The desktop clipboard via `arboard`. The handle is opened lazily and
/// reopened after a failure.
#[cfg(feature = "system-clipboard")]
pub struct SystemClipboard {
    handle: Mutex<Option<arboard::Clipboard>>,
}

#[cfg(feature = "system-clipboard")]
impl SystemClipboard {
    pub fn new() -> Result<Self, ClipboardError> {
        let clipboard = arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        Ok(Self {
            handle: Mutex::new(Some(clipboard)),
        })
    }

    fn with_handle<T>(
        &self,
        op: impl FnOnce(&mut arboard::Clipboard) -> Result<T, arboard::Error>,
    ) -> Result<T, arboard::Error> {
        let mut guard = self.handle.lock();
        if guard.is_none() {
            *guard = Some(arboard::Clipboard::new()?);
        }
        let Some(clipboard) = guard.as_mut() else {
            return Err(arboard::Error::ClipboardNotSupported);
        };
        let result = op(clipboard);
        if matches!(result, Err(ref e) if !matches!(e, arboard::Error::ContentNotAvailable)) {
            *guard = None;
        }
        result
    }
}

#[cfg(feature = "system-clipboard")]
impl ClipboardBackend for SystemClipboard {
    fn read_text(&self) -> Result<String, ClipboardError> {
        match self.with_handle(|c| c.get_text()) {
            Ok(text) => Ok(text),
            Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
            Err(e) => Err(ClipboardError::Read(e.to_string())),
        }
    }

    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        self.with_handle(|c| c.set_text(text))
            .map_err(|e| ClipboardError::Write(e.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory clipboard
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct MemoryState {
    /// What a read returns
    visible: String,
    /// Programmatic writes not yet visible to readers
    pending: VecDeque<String>,
    /// Number of upcoming reads that fail
    failing_reads: usize,
    /// Hold programmatic writes in `pending` until `propagate` is called
    delay_writes: bool,
    /// Every programmatic write, in order
    writes: Vec<String>,
}

/// Process-local clipboard
#[derive(Default)]
pub struct MemoryClipboard {
    state: Mutex<MemoryState>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a copy made by the user in another application
    pub fn set(&self, text: impl Into<String>) {
        self.state.lock().visible = text.into();
    }

    /// Make the next `n` reads fail
    pub fn fail_next_reads(&self, n: usize) {
        self.state.lock().failing_reads = n;
    }

    /// When enabled, programmatic writes stay invisible to readers until
    /// `propagate` is called, like a slow OS pasteboard.
    pub fn delay_writes(&self, enabled: bool) {
        self.state.lock().delay_writes = enabled;
    }

    /// Make every pending programmatic write visible. Returns true if
    /// anything was pending.
    pub fn propagate(&self) -> bool {
        let mut state = self.state.lock();
        match state.pending.pop_back() {
            Some(latest) => {
                state.pending.clear();
                state.visible = latest;
                true
            }
            None => false,
        }
    }

    /// Programmatic writes received so far
    pub fn writes(&self) -> Vec<String> {
        self.state.lock().writes.clone()
    }
}

impl ClipboardBackend for MemoryClipboard {
    fn read_text(&self) -> Result<String, ClipboardError> {
        let mut state = self.state.lock();
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(ClipboardError::Read("scripted failure".to_string()));
        }
        Ok(state.visible.clone())
    }

    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut state = self.state.lock();
        state.writes.push(text.to_string());
        if state.delay_writes {
            state.pending.push_back(text.to_string());
        } else {
            state.visible = text.to_string();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_clipboard_read_write() {
        let clipboard = MemoryClipboard::new();
        assert_eq!(clipboard.read_text().unwrap(), "");
        clipboard.set("from user");
        assert_eq!(clipboard.read_text().unwrap(), "from user");
        clipboard.write_text("from app").unwrap();
        assert_eq!(clipboard.read_text().unwrap(), "from app");
        assert_eq!(clipboard.writes(), vec!["from app"]);
    }

    #[test]
    fn test_scripted_read_failures() {
        let clipboard = MemoryClipboard::new();
        clipboard.set("x");
        clipboard.fail_next_reads(2);
        assert!(clipboard.read_text().is_err());
        assert!(clipboard.read_text().is_err());
        assert_eq!(clipboard.read_text().unwrap(), "x");
    }

    #[test]
    fn test_delayed_propagation() {
        let clipboard = MemoryClipboard::new();
        clipboard.set("before");
        clipboard.delay_writes(true);
        clipboard.write_text("after").unwrap();
        assert_eq!(clipboard.read_text().unwrap(), "before");
        assert!(clipboard.propagate());
        assert_eq!(clipboard.read_text().unwrap(), "after");
        assert!(!clipboard.propagate());
    }
}
