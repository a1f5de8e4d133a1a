// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Refresh scheduling for the tracked aircraft set.
//!
//! The scheduler runs a single background task that alternates between Idle
//! and Polling. A tracked-set change polls immediately; afterwards a timer
//! re-arms for the configured interval. Because there is only one task and
//! the timer is armed only after a pass completes, overlapping passes are
//! impossible. Refresh requests that arrive while a pass is running are
//! skipped, never queued.
//!
//! Snapshots are published atomically through a watch channel: observers
//! only ever see the complete result of a finished pass.

use std::time::Duration;

use log::{info, warn};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::poller::{Poller, PollerConfig, Snapshot, TrackedAircraft};
use crate::provider::TelemetryFetch;

const REFRESH_BUFFER: usize = 4;

/// Configuration for the refresh scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between automatic refresh passes.
    pub refresh_interval: Duration,
    /// Poller configuration (inter-request spacing).
    pub poller: PollerConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(30),
            poller: PollerConfig::default(),
        }
    }
}

/// Handle to the background refresh task.
///
/// Dropping the handle cancels the task. A pass that is in flight when the
/// scheduler shuts down is allowed to finish its current request but its
/// snapshot is discarded, not published.
pub struct RefreshScheduler {
    tracked_tx: watch::Sender<Vec<TrackedAircraft>>,
    refresh_tx: mpsc::Sender<()>,
    snapshot_rx: watch::Receiver<Snapshot>,
    cancel_token: CancellationToken,
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("cancel_token", &self.cancel_token)
            .finish_non_exhaustive()
    }
}

impl RefreshScheduler {
    /// Spawn the scheduler task with the given fetcher and configuration.
    ///
    /// The scheduler starts idle with an empty tracked set; call
    /// [`set_tracked`](Self::set_tracked) to begin polling.
    #[must_use]
    pub fn spawn<F>(fetcher: F, config: SchedulerConfig) -> Self
    where
        F: TelemetryFetch + Send + Sync + 'static,
    {
        let (tracked_tx, tracked_rx) = watch::channel(Vec::new());
        let (refresh_tx, refresh_rx) = mpsc::channel(REFRESH_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::empty());
        let cancel_token = CancellationToken::new();

        let poller = Poller::new(fetcher, config.poller.clone());
        let task_cancel = cancel_token.clone();
        let refresh_interval = config.refresh_interval;

        tokio::spawn(async move {
            scheduler_loop(
                poller,
                tracked_rx,
                refresh_rx,
                snapshot_tx,
                task_cancel,
                refresh_interval,
            )
            .await;
        });

        Self {
            tracked_tx,
            refresh_tx,
            snapshot_rx,
            cancel_token,
        }
    }

    /// Replace the tracked set.
    ///
    /// The set is state, not an event: it travels over a watch channel, so
    /// rapid successive changes coalesce to the latest value and none is
    /// ever lost. Duplicate tail numbers are dropped (first occurrence
    /// wins). A non-empty set triggers an immediate pass; an empty set
    /// disarms the timer and publishes an empty snapshot.
    pub fn set_tracked(&self, aircraft: Vec<TrackedAircraft>) {
        let _ = self.tracked_tx.send_replace(dedupe(aircraft));
    }

    /// Request a refresh now.
    ///
    /// Behaves like a timer fire: if a pass is already running the request
    /// is skipped rather than queued.
    pub fn trigger_now(&self) {
        if self.refresh_tx.try_send(()).is_err() {
            warn!("Refresh request dropped (scheduler stopped or queue full)");
        }
    }

    /// Subscribe to published snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_rx.clone()
    }

    /// Get the most recently published snapshot.
    #[must_use]
    pub fn latest(&self) -> Snapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Shut down the scheduler.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

fn dedupe(aircraft: Vec<TrackedAircraft>) -> Vec<TrackedAircraft> {
    let mut seen = std::collections::HashSet::new();
    aircraft
        .into_iter()
        .filter(|a| seen.insert(a.tail_number.clone()))
        .collect()
}

async fn scheduler_loop<F: TelemetryFetch>(
    poller: Poller<F>,
    mut tracked_rx: watch::Receiver<Vec<TrackedAircraft>>,
    mut refresh_rx: mpsc::Receiver<()>,
    snapshot_tx: watch::Sender<Snapshot>,
    cancel_token: CancellationToken,
    refresh_interval: Duration,
) {
    let mut tracked: Vec<TrackedAircraft> = Vec::new();
    let mut next_poll: Option<Instant> = None;

    loop {
        let deadline = next_poll.unwrap_or_else(Instant::now);

        let poll_requested = tokio::select! {
            () = cancel_token.cancelled() => {
                info!("Refresh scheduler cancelled");
                return;
            }

            changed = tracked_rx.changed() => match changed {
                Ok(()) => {
                    tracked = tracked_rx.borrow_and_update().clone();
                    if tracked.is_empty() {
                        next_poll = None;
                        let _ = snapshot_tx.send(Snapshot::empty());
                        false
                    } else {
                        true
                    }
                }
                Err(_) => return,
            },

            refresh = refresh_rx.recv() => match refresh {
                Some(()) => !tracked.is_empty(),
                None => return,
            },

            () = tokio::time::sleep_until(deadline), if next_poll.is_some() => true,
        };

        if !poll_requested {
            continue;
        }

        // Polling state. Repeat immediately only when the tracked set
        // changed underneath the running pass.
        loop {
            let snapshot = poller.poll_all(&tracked, &cancel_token).await;

            if cancel_token.is_cancelled() {
                info!("Discarding snapshot completed after cancellation");
                return;
            }

            let _ = snapshot_tx.send(snapshot);

            // Refresh requests that arrived during the pass are skipped
            // (never queued); a tracked-set change re-polls immediately
            // with the latest value.
            while refresh_rx.try_recv().is_ok() {}

            if !tracked_rx.has_changed().unwrap_or(false) {
                break;
            }
            tracked = tracked_rx.borrow_and_update().clone();
            if tracked.is_empty() {
                let _ = snapshot_tx.send(Snapshot::empty());
                break;
            }
        }

        next_poll = if tracked.is_empty() {
            None
        } else {
            Some(Instant::now() + refresh_interval)
        };
    }
}
