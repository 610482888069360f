//! Periodic batch status polling feeding a [`ProgressEstimator`].
//!
//! The poller runs until the tracked set becomes empty, the handle is
//! dropped or its cancellation token fires. A failed fetch is logged and
//! retried on the next tick; it never ends the loop.

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ProgressConfig;
use crate::progress::estimator::{JobId, JobState, ProgressEstimator};
use crate::Result;

/// Execution status as reported by the batch backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Finished,
    Failed,
}

/// Availability of the job's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Pending,
    Ready,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStatus {
    pub id: JobId,
    pub run_status: RunStatus,
    pub result_status: ResultStatus,
    #[serde(default)]
    pub message: String,
}

impl BatchStatus {
    /// Collapse the two backend statuses into one job state.
    pub fn job_state(&self) -> JobState {
        match (self.run_status, self.result_status) {
            (RunStatus::Failed, _) | (_, ResultStatus::Error) => JobState::Failed,
            (_, ResultStatus::Ready) => JobState::Completed,
            (RunStatus::Running | RunStatus::Finished, ResultStatus::Pending) => JobState::Running,
            (RunStatus::Pending, ResultStatus::Pending) => JobState::Idle,
        }
    }
}

pub trait BatchStatusSource: Send + Sync {
    fn fetch(&self, ids: &[JobId]) -> impl Future<Output = Result<Vec<BatchStatus>>> + Send;
}

/// One published progress value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub id: JobId,
    pub state: JobState,
    pub percentage: f64,
    pub message: String,
}

/// Caller side of a running poller.
#[derive(Debug)]
pub struct PollerHandle {
    tracked: watch::Sender<BTreeSet<JobId>>,
    updates: watch::Receiver<Vec<ProgressUpdate>>,
    cancel: CancellationToken,
}

impl PollerHandle {
    pub fn set_tracked(&self, ids: impl IntoIterator<Item = JobId>) {
        self.tracked.send_replace(ids.into_iter().collect());
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<ProgressUpdate>> {
        self.updates.clone()
    }

    pub fn latest(&self) -> Vec<ProgressUpdate> {
        self.updates.borrow().clone()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

pub struct ProgressPoller<S> {
    source: S,
    estimator: ProgressEstimator,
    interval: Duration,
    tracked: watch::Receiver<BTreeSet<JobId>>,
    updates: watch::Sender<Vec<ProgressUpdate>>,
    cancel: CancellationToken,
}

impl<S: BatchStatusSource> ProgressPoller<S> {
    pub fn new(source: S, config: &ProgressConfig) -> (Self, PollerHandle) {
        let (tracked_tx, tracked_rx) = watch::channel(BTreeSet::new());
        let (updates_tx, updates_rx) = watch::channel(Vec::new());
        let cancel = CancellationToken::new();
        let poller = Self {
            source,
            estimator: ProgressEstimator::new(config),
            interval: config.poll_interval(),
            tracked: tracked_rx,
            updates: updates_tx,
            cancel: cancel.clone(),
        };
        let handle = PollerHandle {
            tracked: tracked_tx,
            updates: updates_rx,
            cancel,
        };
        (poller, handle)
    }

    /// Poll until tracking stops. Returns the estimator so callers can
    /// inspect final state.
    pub async fn run(mut self) -> ProgressEstimator {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_ms = self.interval.as_millis() as u64, "progress polling started");

        loop {
            let ids: Vec<JobId> = self.tracked.borrow_and_update().iter().copied().collect();
            self.estimator.retain(&ids);
            if ids.is_empty() {
                info!("no tracked jobs; progress polling stopped");
                break;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("progress polling cancelled");
                    break;
                }
                changed = self.tracked.changed() => {
                    if changed.is_err() {
                        info!("poller handle dropped; progress polling stopped");
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            let fetched = tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("progress polling cancelled");
                    break;
                }
                fetched = self.source.fetch(&ids) => fetched,
            };
            match fetched {
                Ok(statuses) => self.publish(&ids, statuses),
                Err(err) => {
                    warn!(error = %err, jobs = ids.len(), "status poll failed; retrying next tick");
                    self.carry_forward();
                }
            }
        }
        self.estimator
    }

    /// Keep running jobs climbing on their last known state when a fetch fails.
    fn carry_forward(&mut self) {
        self.estimator.advance(Instant::now());
        let estimator = &self.estimator;
        let changed = self.updates.send_if_modified(|updates| {
            let mut changed = false;
            for update in updates.iter_mut().filter(|u| u.state == JobState::Running) {
                if let Some(percentage) = estimator.percentage(update.id) {
                    changed |= percentage != update.percentage;
                    update.percentage = percentage;
                }
            }
            changed
        });
        if changed {
            debug!("progress carried forward");
        }
    }

    fn publish(&mut self, ids: &[JobId], statuses: Vec<BatchStatus>) {
        let now = Instant::now();
        let updates: Vec<ProgressUpdate> = statuses
            .into_iter()
            .filter(|status| ids.contains(&status.id))
            .map(|status| {
                let state = status.job_state();
                let percentage = self.estimator.observe(status.id, state, now);
                ProgressUpdate {
                    id: status.id,
                    state,
                    percentage,
                    message: status.message,
                }
            })
            .collect();
        debug!(updates = updates.len(), "progress published");
        self.updates.send_replace(updates);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::Error;

    /// Reports `Running` for the first `running_polls` fetches, then `Ready`.
    /// Fetch numbers listed in `failing` return an error instead.
    struct ScriptedSource {
        calls: Arc<AtomicUsize>,
        running_polls: usize,
        failing: Vec<usize>,
    }

    impl BatchStatusSource for ScriptedSource {
        async fn fetch(&self, ids: &[JobId]) -> Result<Vec<BatchStatus>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(&call) {
                return Err(Error::Polling("backend unavailable".into()));
            }
            let (run_status, result_status) = if call < self.running_polls {
                (RunStatus::Running, ResultStatus::Pending)
            } else {
                (RunStatus::Finished, ResultStatus::Ready)
            };
            Ok(ids
                .iter()
                .map(|id| BatchStatus {
                    id: *id,
                    run_status,
                    result_status,
                    message: String::new(),
                })
                .collect())
        }
    }

    fn source(running_polls: usize, failing: Vec<usize>) -> (ScriptedSource, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            ScriptedSource {
                calls: Arc::clone(&calls),
                running_polls,
                failing,
            },
            calls,
        )
    }

    #[test]
    fn status_pairs_collapse_to_job_states() {
        let status = |run_status, result_status| BatchStatus {
            id: 1,
            run_status,
            result_status,
            message: String::new(),
        };
        assert_eq!(status(RunStatus::Pending, ResultStatus::Pending).job_state(), JobState::Idle);
        assert_eq!(status(RunStatus::Running, ResultStatus::Pending).job_state(), JobState::Running);
        assert_eq!(status(RunStatus::Finished, ResultStatus::Pending).job_state(), JobState::Running);
        assert_eq!(status(RunStatus::Finished, ResultStatus::Ready).job_state(), JobState::Completed);
        assert_eq!(status(RunStatus::Finished, ResultStatus::Error).job_state(), JobState::Failed);
        assert_eq!(status(RunStatus::Failed, ResultStatus::Pending).job_state(), JobState::Failed);
    }

    #[test]
    fn batch_status_reads_snake_case_json() {
        let raw = r#"{"id":3,"run_status":"running","result_status":"pending","message":"queued"}"#;
        let status: BatchStatus = serde_json::from_str(raw).unwrap();
        assert_eq!(status.job_state(), JobState::Running);
        assert_eq!(status.message, "queued");
    }

    #[tokio::test(start_paused = true)]
    async fn progress_climbs_then_completes() {
        let (source, _) = source(3, Vec::new());
        let (poller, handle) = ProgressPoller::new(source, &ProgressConfig::default());
        handle.set_tracked([7]);
        let mut updates = handle.subscribe();
        let task = tokio::spawn(poller.run());

        let mut seen = Vec::new();
        loop {
            updates.changed().await.unwrap();
            let latest = updates.borrow_and_update().clone();
            let update = latest.into_iter().find(|u| u.id == 7).unwrap();
            seen.push(update.percentage);
            if update.state == JobState::Completed {
                break;
            }
        }
        assert!(seen.windows(2).all(|pair| pair[1] >= pair[0]));
        assert_eq!(seen.last(), Some(&100.0));
        assert!(seen[..seen.len() - 1].iter().all(|p| *p <= 99.0));

        handle.set_tracked([]);
        let estimator = task.await.unwrap();
        assert!(estimator.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_tick_is_retried() {
        let (source, calls) = source(10, vec![0]);
        let (poller, handle) = ProgressPoller::new(source, &ProgressConfig::default());
        handle.set_tracked([1]);
        let mut updates = handle.subscribe();
        let task = tokio::spawn(poller.run());

        updates.changed().await.unwrap();
        assert!(calls.load(Ordering::SeqCst) >= 2);
        assert_eq!(handle.latest()[0].state, JobState::Running);

        handle.stop();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn running_job_keeps_climbing_through_a_failed_tick() {
        let (source, calls) = source(10, vec![2]);
        let (poller, handle) = ProgressPoller::new(source, &ProgressConfig::default());
        handle.set_tracked([1]);
        let mut updates = handle.subscribe();
        let task = tokio::spawn(poller.run());

        let mut seen = Vec::new();
        for _ in 0..3 {
            updates.changed().await.unwrap();
            let latest = updates.borrow_and_update().clone();
            assert_eq!(latest[0].state, JobState::Running);
            seen.push(latest[0].percentage);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(seen[1] > seen[0]);
        assert!(seen[2] > seen[1]);

        handle.stop();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn empty_tracked_set_stops_immediately() {
        let (source, calls) = source(1, Vec::new());
        let (poller, _handle) = ProgressPoller::new(source, &ProgressConfig::default());
        poller.run().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
