use quiesce_core::{AutomationError, ResourceEntry, ResourceExpectation, ResourceTimeline};
use serde_json::json;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::IdleConfig;

/// Where a watch currently stands. Phases move only on poll results; the
/// deadline and cancellation interrupt from outside the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchPhase {
    /// At least one expectation is still unsatisfied.
    Polling,
    /// All expectations satisfied; counting stable polls down.
    Stabilizing { remaining: u32, observed: usize },
    /// Countdown finished.
    Resolved,
}

fn start_countdown(threshold: u32, total: usize) -> WatchPhase {
    if threshold == 0 {
        WatchPhase::Resolved
    } else {
        WatchPhase::Stabilizing {
            remaining: threshold,
            observed: total,
        }
    }
}

/// One poll's worth of progress. An unsatisfied poll leaves the phase
/// untouched, a changed request count restarts the countdown, and only a
/// full run of stable satisfied polls resolves.
fn advance(phase: WatchPhase, all_met: bool, total: usize, threshold: u32) -> WatchPhase {
    if !all_met {
        return phase;
    }
    match phase {
        WatchPhase::Polling => start_countdown(threshold, total),
        WatchPhase::Stabilizing { remaining, observed } => {
            if total != observed {
                start_countdown(threshold, total)
            } else if remaining <= 1 {
                WatchPhase::Resolved
            } else {
                WatchPhase::Stabilizing {
                    remaining: remaining - 1,
                    observed,
                }
            }
        }
        WatchPhase::Resolved => WatchPhase::Resolved,
    }
}

fn phase_label(phase: WatchPhase) -> &'static str {
    match phase {
        WatchPhase::Polling => "polling",
        WatchPhase::Stabilizing { .. } => "stabilizing",
        WatchPhase::Resolved => "resolved",
    }
}

/// Polls a [`ResourceTimeline`] until its asynchronous requests go idle.
///
/// A watch resolves once every expectation is satisfied and the number of
/// asynchronous requests has stayed flat for `idle_threshold` consecutive
/// polls. The first poll runs immediately. The global deadline is absolute:
/// it wins any race, including against a poll that would have resolved the
/// watch.
pub struct ResourceIdleWatcher {
    config: IdleConfig,
    cancel: CancellationToken,
}

impl ResourceIdleWatcher {
    pub fn new(config: IdleConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Watcher wired to an externally owned cancellation token.
    pub fn with_cancellation(config: IdleConfig, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }

    /// Token that aborts this watch when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Resolve once `expectations` are satisfied and the asynchronous request
    /// count has been stable for the configured number of polls.
    ///
    /// An empty slice waits for bare idleness. Expectations match by
    /// substring; one with `number: None` or zero requires a single match.
    /// Timeline read failures surface as-is.
    pub async fn wait_for_resources<T>(
        &self,
        timeline: &T,
        expectations: &[ResourceExpectation],
    ) -> Result<(), AutomationError>
    where
        T: ResourceTimeline + ?Sized,
    {
        let started = Instant::now();
        let deadline = started + self.config.global_timeout;
        let mut next_poll = started;
        let mut phase = WatchPhase::Polling;
        let mut last_snapshot: Vec<ResourceEntry> = Vec::new();
        let mut polls: u32 = 0;

        loop {
            let poll_at = next_poll;
            tokio::select! {
                biased;

                _ = sleep_until(deadline) => {
                    let unmet: Vec<&str> = expectations
                        .iter()
                        .filter(|e| !e.is_met(&last_snapshot))
                        .map(|e| e.name.as_str())
                        .collect();
                    warn!(
                        polls,
                        phase = phase_label(phase),
                        ?unmet,
                        "resource watch timed out"
                    );
                    return Err(AutomationError::timeout_error(format!(
                        "Resources did not go idle within {}ms",
                        self.config.global_timeout.as_millis()
                    ))
                    .with_context(json!({
                        "unmet": unmet,
                        "observed_async_requests": last_snapshot.len(),
                        "polls": polls,
                        "phase": phase_label(phase),
                    })));
                }

                _ = self.cancel.cancelled() => {
                    debug!(polls, "resource watch cancelled");
                    return Err(AutomationError::cancelled(
                        "Resource watch cancelled before resources went idle",
                    ));
                }

                result = async move {
                    sleep_until(poll_at).await;
                    timeline.resources().await
                } => {
                    let snapshot = result?;
                    polls += 1;
                    next_poll = Instant::now() + self.config.poll_interval;

                    let async_requests: Vec<ResourceEntry> = snapshot
                        .into_iter()
                        .filter(|e| e.is_async_request())
                        .collect();
                    let all_met = expectations.iter().all(|e| e.is_met(&async_requests));
                    let total = async_requests.len();

                    let next = advance(phase, all_met, total, self.config.idle_threshold);
                    if next != phase {
                        debug!(poll = polls, requests = total, phase = ?next, "watch phase change");
                    }
                    phase = next;
                    last_snapshot = async_requests;

                    if phase == WatchPhase::Resolved {
                        debug!(
                            polls,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "resources idle"
                        );
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Bare idleness: no named expectations, stability alone resolves.
    pub async fn wait_until_idle<T>(&self, timeline: &T) -> Result<(), AutomationError>
    where
        T: ResourceTimeline + ?Sized,
    {
        self.wait_for_resources(timeline, &[]).await
    }
}
