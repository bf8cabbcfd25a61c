// SPDX-License-Identifier: GPL-3.0-only
//! Worker threads for capture backends
//!
//! A backend runs its preview producer and its photo callback queue on
//! dedicated threads. [`CaptureLoopController`] owns such a thread: it starts
//! it, signals it to stop, and joins it, so that once `stop()` returns no
//! callback from that thread is still running.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Longest a paced loop sleeps before re-checking its stop signal
const STOP_POLL: Duration = Duration::from_millis(10);

/// Action returned by the loop callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// One scheduled iteration of a paced loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Sequence number of this tick, counting only delivered ticks
    pub index: u64,
    /// Ticks skipped because the previous iteration overran
    pub dropped: u64,
}

/// Controller for a worker loop running in a separate thread
pub struct CaptureLoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl CaptureLoopController {
    /// Start a loop that calls `loop_fn` back to back until it returns
    /// [`LoopAction::Stop`] or the controller is stopped.
    ///
    /// `loop_fn` should block for a bounded time per iteration so the stop
    /// signal is observed promptly.
    pub fn start<F>(name: &str, mut loop_fn: F) -> Self
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        info!(name = %name, "Starting capture loop");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    if loop_fn() == LoopAction::Stop {
                        debug!(name = %thread_name, "Loop requested stop");
                        break;
                    }
                }
                debug!(name = %thread_name, "Capture loop thread exiting");
            });

        Self::from_spawn(name, thread_handle, stop_signal)
    }

    /// Start a loop that fires `tick_fn` once per `interval`.
    ///
    /// `init_fn` runs once on the worker thread; if it fails the thread exits
    /// without ticking. When an iteration overruns, the missed ticks are
    /// skipped rather than queued and reported in [`Tick::dropped`].
    pub fn start_paced<S, I, F>(name: &str, interval: Duration, init_fn: I, mut tick_fn: F) -> Self
    where
        S: Send + 'static,
        I: FnOnce() -> Result<S, String> + Send + 'static,
        F: FnMut(&mut S, Tick) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();
        let interval = interval.max(Duration::from_millis(1));

        info!(name = %name, interval_ms = interval.as_millis() as u64, "Starting paced capture loop");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut state = match init_fn() {
                    Ok(state) => state,
                    Err(e) => {
                        warn!(name = %thread_name, error = %e, "Capture loop initialization failed");
                        return;
                    }
                };

                let mut next_deadline = Instant::now();
                let mut index = 0u64;

                while !stop.load(Ordering::SeqCst) {
                    let now = Instant::now();
                    if now < next_deadline {
                        thread::sleep((next_deadline - now).min(STOP_POLL));
                        continue;
                    }

                    let behind = ((now - next_deadline).as_nanos() / interval.as_nanos()) as u64;
                    let advance = u32::try_from(behind + 1).unwrap_or(u32::MAX);
                    next_deadline += interval.saturating_mul(advance);

                    if behind > 0 {
                        trace!(name = %thread_name, dropped = behind, "Skipping late ticks");
                    }

                    let tick = Tick {
                        index,
                        dropped: behind,
                    };
                    index += 1;

                    if tick_fn(&mut state, tick) == LoopAction::Stop {
                        debug!(name = %thread_name, "Loop requested stop");
                        break;
                    }
                }
                debug!(name = %thread_name, ticks = index, "Paced capture loop thread exiting");
            });

        Self::from_spawn(name, thread_handle, stop_signal)
    }

    fn from_spawn(
        name: &str,
        spawned: std::io::Result<JoinHandle<()>>,
        stop_signal: Arc<AtomicBool>,
    ) -> Self {
        let thread_handle = match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(name = %name, error = %e, "Failed to spawn capture loop thread");
                None
            }
        };

        Self {
            thread_handle,
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Check if the loop thread is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop without waiting
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting capture loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread to finish
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending the stop signal
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if handle.thread().id() == thread::current().id() {
                // Stopping from inside the loop; the loop exits on its own.
                return;
            }
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Capture loop thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            self.stop();
        }
    }
}
