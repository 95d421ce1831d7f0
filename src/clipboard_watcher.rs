//! Timer-driven clipboard poller.
//!
//! Keeps the last sampled text and notifies the registered callback once
//! per change, on the watcher's own thread. Non-text clipboard content and
//! transient read failures skip the tick; a platform-level clipboard
//! failure is reported through the error callback and the timer keeps
//! running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::debug;

use crate::config::MIN_CLIPBOARD_INTERVAL_MS;

/// Errors raised by watcher configuration calls.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum WatcherError {
    #[error(
        "clipboard polling interval {requested_ms} ms is below the minimum of {} ms",
        MIN_CLIPBOARD_INTERVAL_MS
    )]
    IntervalTooShort { requested_ms: u64 },
}

/// Read-only text access to the platform clipboard.
pub trait ClipboardSampler: Send {
    /// `Ok(None)` when the clipboard holds no text right now (non-text
    /// content or a transient read failure); `Err` when the clipboard
    /// itself is unavailable.
    fn sample(&mut self) -> Result<Option<String>, String>;
}

/// Production sampler backed by arboard. The handle is created lazily and
/// dropped after an unexpected failure so the next tick starts fresh.
#[derive(Default)]
pub struct ArboardSampler {
    clipboard: Option<arboard::Clipboard>,
}

impl ClipboardSampler for ArboardSampler {
    fn sample(&mut self) -> Result<Option<String>, String> {
        let clipboard = match self.clipboard.as_mut() {
            Some(clipboard) => clipboard,
            None => match arboard::Clipboard::new() {
                Ok(clipboard) => self.clipboard.insert(clipboard),
                Err(error) => return Err(format!("clipboard is unavailable: {}", error)),
            },
        };
        match clipboard.get_text() {
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable)
            | Err(arboard::Error::ConversionFailure)
            | Err(arboard::Error::ClipboardOccupied) => Ok(None),
            Err(error) => {
                self.clipboard = None;
                Err(format!("clipboard read failed: {}", error))
            }
        }
    }
}

type ChangeCallback = Arc<dyn Fn(String) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(String) + Send + Sync>;
type SamplerFactory = Box<dyn Fn() -> Box<dyn ClipboardSampler> + Send>;

/// Polls the clipboard on a timer thread and reports text changes.
pub struct ClipboardWatcher {
    interval_ms: u64,
    last_seen: Arc<Mutex<String>>,
    callback: Option<ChangeCallback>,
    error_callback: Option<ErrorCallback>,
    sampler_factory: SamplerFactory,
    stop_flag: Option<Arc<AtomicBool>>,
}

impl ClipboardWatcher {
    /// Creates a watcher polling the system clipboard every `interval_ms`.
    pub fn new(interval_ms: u64) -> Self {
        Self::with_sampler_factory(interval_ms, Box::new(|| Box::<ArboardSampler>::default()))
    }

    /// Creates a watcher with a custom sampler source. Each `start()`
    /// builds a fresh sampler for the new timer thread.
    pub fn with_sampler_factory(interval_ms: u64, sampler_factory: SamplerFactory) -> Self {
        Self {
            interval_ms,
            last_seen: Arc::new(Mutex::new(String::new())),
            callback: None,
            error_callback: None,
            sampler_factory,
            stop_flag: None,
        }
    }

    /// Registers the function invoked with the new text on each change.
    pub fn set_callback(&mut self, callback: impl Fn(String) + Send + Sync + 'static) {
        self.callback = Some(Arc::new(callback));
    }

    /// Registers the sink for platform-level clipboard failures.
    pub fn set_error_callback(&mut self, callback: impl Fn(String) + Send + Sync + 'static) {
        self.error_callback = Some(Arc::new(callback));
    }

    pub fn is_running(&self) -> bool {
        self.stop_flag.is_some()
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Starts the polling timer; the first sample happens immediately.
    /// No-op when already running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        let stop_flag = Arc::new(AtomicBool::new(false));
        let mut ticker = WatcherTicker {
            sampler: (self.sampler_factory)(),
            last_seen: Arc::clone(&self.last_seen),
            callback: self.callback.clone(),
            error_callback: self.error_callback.clone(),
        };
        let interval = Duration::from_millis(self.interval_ms);
        let thread_stop_flag = Arc::clone(&stop_flag);
        thread::spawn(move || {
            while !thread_stop_flag.load(Ordering::SeqCst) {
                ticker.tick();
                thread::sleep(interval);
            }
            debug!("clipboard watcher thread stopped");
        });
        self.stop_flag = Some(stop_flag);
    }

    /// Stops the timer. The last sampled value is retained so a restart
    /// does not re-announce unchanged clipboard contents. No-op when not
    /// running.
    pub fn stop(&mut self) {
        let Some(stop_flag) = self.stop_flag.take() else {
            return;
        };
        // Not joined: the thread winds down on its own after at most one
        // interval, and joining could wedge behind a blocked callback.
        stop_flag.store(true, Ordering::SeqCst);
    }

    /// Changes the polling interval, restarting the timer when running.
    /// Fails below the minimum without touching any state.
    pub fn set_interval(&mut self, interval_ms: u64) -> Result<(), WatcherError> {
        if interval_ms < MIN_CLIPBOARD_INTERVAL_MS {
            return Err(WatcherError::IntervalTooShort {
                requested_ms: interval_ms,
            });
        }
        self.interval_ms = interval_ms;
        if self.is_running() {
            self.stop();
            self.start();
        }
        Ok(())
    }
}

impl Drop for ClipboardWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

struct WatcherTicker {
    sampler: Box<dyn ClipboardSampler>,
    last_seen: Arc<Mutex<String>>,
    callback: Option<ChangeCallback>,
    error_callback: Option<ErrorCallback>,
}

impl WatcherTicker {
    fn tick(&mut self) {
        match self.sampler.sample() {
            Ok(Some(text)) => {
                let changed = {
                    let mut last_seen = self.last_seen.lock().expect("last seen lock poisoned");
                    if *last_seen == text {
                        false
                    } else {
                        *last_seen = text.clone();
                        true
                    }
                };
                if changed {
                    if let Some(callback) = &self.callback {
                        callback(text);
                    }
                }
            }
            Ok(None) => {}
            Err(message) => {
                if let Some(error_callback) = &self.error_callback {
                    error_callback(message);
                }
            }
        }
    }
}
