//! Configuration Poller
//!
//! Background task that keeps configuration fresh: fetch, publish to the
//! feed, wait a jittered interval, repeat. Failed fetches back off
//! exponentially up to a ceiling.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::PollerConfig;
use crate::configuration::{ConfigurationFeed, ConfigurationRequestor, ConfigurationSource};
use crate::error::Result;
use crate::poller::backoff;

/// Marker for "no run active" and "no fetch time recorded".
const NONE: u64 = 0;

// == Poll Outcome ==
/// What a single poll iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Configuration was still fresh; nothing fetched
    Skipped,
    /// Fetched and broadcast to the feed
    Published,
    /// Fetched, but the poller was stopped before it could publish
    Discarded,
    /// The requestor had nothing to hand back
    Empty,
    /// The fetch failed
    Failed,
}

// == Poller State ==
#[derive(Debug, Default)]
struct PollerState {
    /// Generation of the loop currently allowed to run, or NONE
    active_generation: AtomicU64,
    next_generation: AtomicU64,
    /// Unix ms of the freshest configuration seen, or NONE
    last_fetch_time: AtomicU64,
    consecutive_failures: AtomicU32,
}

impl PollerState {
    fn is_current(&self, generation: u64) -> bool {
        self.active_generation.load(Ordering::SeqCst) == generation
    }

    /// Records a configuration's fetch time unless it is older than the one
    /// already recorded. Future timestamps are clamped to `now_ms`.
    fn record_fetch_time(&self, fetched_at_ms: u64, now_ms: u64) -> bool {
        let accepted = fetched_at_ms.min(now_ms);
        self.last_fetch_time
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current == NONE || fetched_at_ms >= current).then_some(accepted)
            })
            .is_ok()
    }
}

/// Releases the run slot when the loop task ends, however it ends.
struct RunGuard {
    state: Arc<PollerState>,
    generation: u64,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        // A newer start() owns the slot; leave it alone
        let _ = self.state.active_generation.compare_exchange(
            self.generation,
            NONE,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}

// == Configuration Poller ==
/// Periodically fetches configuration and broadcasts it on a
/// [`ConfigurationFeed`].
///
/// `stop` is cooperative: an in-flight fetch or wait is never interrupted,
/// the loop just doesn't begin another iteration.
pub struct ConfigurationPoller {
    requestor: Arc<dyn ConfigurationRequestor>,
    feed: Arc<ConfigurationFeed>,
    config: PollerConfig,
    clock: Arc<dyn Clock>,
    state: Arc<PollerState>,
}

impl ConfigurationPoller {
    // == Constructor ==
    /// Creates a stopped poller and subscribes it to `feed` so configuration
    /// arriving from any source refreshes its last fetch time.
    pub fn new(
        requestor: Arc<dyn ConfigurationRequestor>,
        feed: Arc<ConfigurationFeed>,
        config: PollerConfig,
    ) -> Result<Arc<Self>> {
        Self::with_clock(requestor, feed, config, Arc::new(SystemClock))
    }

    /// Same as [`ConfigurationPoller::new`] with an explicit time source for
    /// freshness checks.
    pub fn with_clock(
        requestor: Arc<dyn ConfigurationRequestor>,
        feed: Arc<ConfigurationFeed>,
        config: PollerConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Arc<Self>> {
        config.validate()?;

        let state = Arc::new(PollerState::default());
        {
            let state = Arc::clone(&state);
            let clock = Arc::clone(&clock);
            feed.add_listener(move |configuration, source| {
                let fetched_at = configuration.fetched_at_ms();
                if !state.record_fetch_time(fetched_at, clock.now_ms()) {
                    debug!(
                        "Ignoring out-of-order configuration from {} fetched at {}",
                        source, fetched_at
                    );
                }
            });
        }

        Ok(Arc::new(Self {
            requestor,
            feed,
            config,
            clock,
            state,
        }))
    }

    // == Start ==
    /// Launches the poll loop on the tokio runtime.
    ///
    /// Returns `None` without doing anything if the poller is already running.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let generation = self.state.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        if self
            .state
            .active_generation
            .compare_exchange(NONE, generation, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Configuration poller already running");
            return None;
        }

        info!(
            "Starting configuration poller: interval={}ms, max_interval={}ms, max_age={}ms",
            self.config.base_polling_interval_ms,
            self.config.max_polling_interval_ms,
            self.config.max_age_ms
        );

        // Owned by the task from here on, so the slot is released even if the
        // task is cancelled before its first poll
        let guard = RunGuard {
            state: Arc::clone(&self.state),
            generation,
        };
        Some(tokio::spawn(Arc::clone(self).run(guard)))
    }

    // == Stop ==
    /// Asks the loop to exit at its next iteration boundary.
    pub fn stop(&self) {
        if self.state.active_generation.swap(NONE, Ordering::SeqCst) != NONE {
            info!("Stopping configuration poller");
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.active_generation.load(Ordering::SeqCst) != NONE
    }

    /// Unix ms of the freshest configuration seen from any source.
    pub fn last_fetch_time(&self) -> Option<u64> {
        match self.state.last_fetch_time.load(Ordering::SeqCst) {
            NONE => None,
            ms => Some(ms),
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.state.consecutive_failures.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    // == Poll Once ==
    /// Runs one iteration's freshness check and fetch.
    ///
    /// A fetched configuration is only published while the poller is running.
    pub async fn poll_once(&self) -> PollOutcome {
        self.poll(None).await
    }

    /// Jittered wait before the next iteration, backed off by the current
    /// failure count.
    pub fn next_wait(&self) -> Duration {
        backoff::next_wait(
            self.consecutive_failures(),
            &self.config,
            &mut rand::thread_rng(),
        )
    }

    // == Internals ==
    async fn run(self: Arc<Self>, guard: RunGuard) {
        let generation = guard.generation;

        while self.state.is_current(generation) {
            self.poll(Some(generation)).await;

            let wait = self.next_wait();
            debug!("Next configuration poll in {}ms", wait.as_millis());
            tokio::time::sleep(wait).await;
        }

        debug!("Configuration poll loop (generation {}) exited", generation);
    }

    async fn poll(&self, generation: Option<u64>) -> PollOutcome {
        if let Some(last) = self.last_fetch_time() {
            let age = self.clock.now_ms().saturating_sub(last);
            if age < self.config.max_age_ms {
                debug!("Configuration is fresh ({}ms old), skipping fetch", age);
                return PollOutcome::Skipped;
            }
        }

        // A panicking requestor is one more failed fetch, not the end of the loop
        let fetched = AssertUnwindSafe(self.requestor.fetch_configuration())
            .catch_unwind()
            .await;

        match fetched {
            Err(panic) => {
                self.record_failure(format_args!("requestor panicked: {}", panic_message(&*panic)));
                PollOutcome::Failed
            }
            Ok(Ok(Some(configuration))) => {
                self.state.consecutive_failures.store(0, Ordering::SeqCst);
                let may_publish = match generation {
                    Some(generation) => self.state.is_current(generation),
                    None => self.is_running(),
                };
                if may_publish {
                    self.feed.broadcast(&configuration, ConfigurationSource::Network);
                    PollOutcome::Published
                } else {
                    debug!("Poller stopped during fetch, discarding configuration");
                    PollOutcome::Discarded
                }
            }
            Ok(Ok(None)) => {
                self.state.consecutive_failures.store(0, Ordering::SeqCst);
                debug!("Requestor returned no configuration");
                PollOutcome::Empty
            }
            Ok(Err(err)) => {
                self.record_failure(err);
                PollOutcome::Failed
            }
        }
    }

    fn record_failure(&self, reason: impl fmt::Display) {
        let failures = self
            .state
            .consecutive_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(n.saturating_add(1))
            })
            .map_or(u32::MAX, |n| n.saturating_add(1));
        warn!(
            "Configuration fetch failed ({} consecutive): {}",
            failures, reason
        );
    }
}

/// Best-effort text of a caught panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

impl fmt::Debug for ConfigurationPoller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationPoller")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .field("last_fetch_time", &self.last_fetch_time())
            .field("consecutive_failures", &self.consecutive_failures())
            .finish()
    }
}
