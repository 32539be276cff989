//! Pacing and cancellation for the sequential crawl loops
//!
//! This module handles:
//! - The injectable wait policy every pause goes through
//! - Courtesy delays between requests (randomized or fixed)
//! - The shutdown flag checked at loop boundaries

use rand::Rng;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Exit status after a forced quit (128 + SIGINT)
const FORCED_EXIT_CODE: i32 = 130;

/// How the pipeline suspends between requests
///
/// Drivers and the fetcher never sleep directly; they ask the policy, so the
/// suspension mechanism can be swapped without touching driver logic.
pub trait WaitPolicy {
    fn wait(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Suspends on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleep;

impl WaitPolicy for TokioSleep {
    async fn wait(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Records requested pauses and returns immediately
///
/// Clones share the same log, so a caller can keep one handle and inspect
/// the pauses requested through another.
#[derive(Debug, Clone, Default)]
pub struct RecordingWait {
    waits: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingWait {
    pub fn new() -> Self {
        Self::default()
    }

    /// All pauses requested so far, in order
    pub fn recorded(&self) -> Vec<Duration> {
        self.waits
            .lock()
            .map(|waits| waits.clone())
            .unwrap_or_default()
    }
}

impl WaitPolicy for RecordingWait {
    async fn wait(&self, duration: Duration) {
        if let Ok(mut waits) = self.waits.lock() {
            waits.push(duration);
        }
    }
}

/// Pause inserted between consecutive requests of a driver loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourtesyDelay {
    /// Uniformly random within `[min, max]`
    Uniform { min: Duration, max: Duration },

    /// Always the same pause
    Fixed(Duration),
}

impl CourtesyDelay {
    /// Builds a uniform window from millisecond bounds
    pub fn uniform_ms(min_ms: u64, max_ms: u64) -> Self {
        let (low, high) = if min_ms <= max_ms {
            (min_ms, max_ms)
        } else {
            (max_ms, min_ms)
        };
        Self::Uniform {
            min: Duration::from_millis(low),
            max: Duration::from_millis(high),
        }
    }

    pub fn fixed_ms(ms: u64) -> Self {
        Self::Fixed(Duration::from_millis(ms))
    }

    /// Draws the next pause
    pub fn next_delay(&self) -> Duration {
        match *self {
            Self::Fixed(duration) => duration,
            Self::Uniform { min, max } if min == max => min,
            Self::Uniform { min, max } => rand::thread_rng().gen_range(min..=max),
        }
    }
}

/// Cooperative cancellation signal
///
/// Loops check the flag only between units, never mid-fetch.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    triggered: Arc<AtomicBool>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Spawns a task that triggers the flag on Ctrl-C
    ///
    /// A second Ctrl-C exits the process at once, without waiting for the
    /// unit in flight.
    pub fn listen_for_ctrl_c(&self) {
        let flag = self.clone();
        tokio::spawn(async move {
            flag.handle_interrupts(tokio::signal::ctrl_c, || {
                std::process::exit(FORCED_EXIT_CODE)
            })
            .await;
        });
    }

    /// Triggers the flag on the first signal and calls `force_exit` on the second
    async fn handle_interrupts<S, F, X>(&self, mut next_signal: S, force_exit: X)
    where
        S: FnMut() -> F,
        F: Future<Output = std::io::Result<()>>,
        X: FnOnce(),
    {
        if let Err(e) = next_signal().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        tracing::warn!(
            "Interrupt received; stopping after the current unit (Ctrl-C again to quit now)"
        );
        self.trigger();

        match next_signal().await {
            Ok(()) => {
                tracing::error!("Second interrupt received; exiting immediately");
                force_exit();
            }
            Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
        }
    }
}
