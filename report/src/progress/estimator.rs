//! Synthetic progress for jobs whose backend only reports coarse states.
//!
//! While a job is running the displayed percentage follows
//! `cap * (1 - exp(-elapsed / tau))`, so it climbs quickly at first and
//! approaches (never reaches) the cap. Completion snaps to 100.
//!
//! Rules per tracked id:
//!
//! - `Idle -> Running` records the start instant; further `Running`
//!   observations keep it.
//! - `Completed` reports 100, `Failed` reports 0. Both are terminal: later
//!   `Running` observations are ignored until an `Idle` resets the record.
//! - `Idle` and unknown ids report 0.
//!
//! A failed job drops back to 0; the last running value is not frozen.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use crate::config::ProgressConfig;

pub type JobId = u64;

pub const COMPLETE: f64 = 100.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobState::Idle => "idle",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressRecord {
    pub started_at: Option<Instant>,
    pub state: JobState,
    pub displayed: f64,
}

impl ProgressRecord {
    fn idle() -> Self {
        Self {
            started_at: None,
            state: JobState::Idle,
            displayed: 0.0,
        }
    }
}

/// Owns the progress map for one status display. Not shared; callers that
/// need a clean slate call [`ProgressEstimator::reset`].
#[derive(Debug, Clone)]
pub struct ProgressEstimator {
    cap: f64,
    tau_secs: f64,
    records: HashMap<JobId, ProgressRecord>,
}

impl Default for ProgressEstimator {
    fn default() -> Self {
        Self::new(&ProgressConfig::default())
    }
}

impl ProgressEstimator {
    pub fn new(config: &ProgressConfig) -> Self {
        Self {
            cap: config.cap.clamp(0.0, COMPLETE),
            tau_secs: config.tau().max(f64::MIN_POSITIVE),
            records: HashMap::new(),
        }
    }

    /// Feed one coarse observation and return the percentage to display.
    pub fn observe(&mut self, id: JobId, state: JobState, now: Instant) -> f64 {
        let Some(record) = self.records.get_mut(&id) else {
            return match state {
                JobState::Completed => COMPLETE,
                JobState::Failed => 0.0,
                JobState::Idle => {
                    self.records.insert(id, ProgressRecord::idle());
                    0.0
                }
                JobState::Running => {
                    debug!(job = id, "job started");
                    self.records.insert(
                        id,
                        ProgressRecord {
                            started_at: Some(now),
                            state: JobState::Running,
                            displayed: 0.0,
                        },
                    );
                    0.0
                }
            };
        };

        match (record.state, state) {
            (_, JobState::Idle) => *record = ProgressRecord::idle(),
            (current, _) if current.is_terminal() => {}
            (JobState::Idle, JobState::Running) => {
                debug!(job = id, "job started");
                record.started_at = Some(now);
                record.state = JobState::Running;
                record.displayed = 0.0;
            }
            (JobState::Running, JobState::Running) => {
                let elapsed = record
                    .started_at
                    .map(|start| now.saturating_duration_since(start).as_secs_f64())
                    .unwrap_or(0.0);
                let next = self.cap * (1.0 - (-elapsed / self.tau_secs).exp());
                record.displayed = record.displayed.max(next.min(self.cap));
            }
            (_, JobState::Completed) => {
                debug!(job = id, "job completed");
                record.state = JobState::Completed;
                record.displayed = COMPLETE;
            }
            (_, JobState::Failed) => {
                debug!(job = id, "job failed");
                record.state = JobState::Failed;
                record.displayed = 0.0;
            }
            // Terminal states matched earlier.
            (_, JobState::Running) => {}
        }
        record.displayed
    }

    /// Re-evaluate every running record at `now` without a new observation.
    pub fn advance(&mut self, now: Instant) {
        let running: Vec<JobId> = self
            .records
            .iter()
            .filter(|(_, record)| record.state == JobState::Running)
            .map(|(id, _)| *id)
            .collect();
        for id in running {
            self.observe(id, JobState::Running, now);
        }
    }

    /// Last displayed percentage, `None` for ids that are not tracked.
    pub fn percentage(&self, id: JobId) -> Option<f64> {
        self.records.get(&id).map(|record| record.displayed)
    }

    pub fn record(&self, id: JobId) -> Option<&ProgressRecord> {
        self.records.get(&id)
    }

    /// Drop records for ids outside `tracked`.
    pub fn retain(&mut self, tracked: &[JobId]) {
        self.records.retain(|id, _| tracked.contains(id));
    }

    pub fn reset(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn secs(start: Instant, s: f64) -> Instant {
        start + Duration::from_secs_f64(s)
    }

    #[test]
    fn running_curve_matches_exponential_approach() {
        let mut estimator = ProgressEstimator::default();
        let t0 = Instant::now();
        assert_eq!(estimator.observe(1, JobState::Idle, t0), 0.0);
        assert_eq!(estimator.observe(1, JobState::Running, t0), 0.0);
        let at_tau = estimator.observe(1, JobState::Running, secs(t0, 2.0));
        let expected = 99.0 * (1.0 - (-1.0f64).exp());
        assert!((at_tau - expected).abs() < 1e-9);
        assert!((at_tau - 62.6).abs() < 0.05);
    }

    #[test]
    fn repeated_running_keeps_start_time() {
        let mut estimator = ProgressEstimator::default();
        let t0 = Instant::now();
        estimator.observe(1, JobState::Running, t0);
        estimator.observe(1, JobState::Running, secs(t0, 1.0));
        assert_eq!(estimator.record(1).unwrap().started_at, Some(t0));
    }

    #[test]
    fn displayed_is_monotonic_and_capped() {
        let mut estimator = ProgressEstimator::default();
        let t0 = Instant::now();
        estimator.observe(9, JobState::Running, t0);
        let mut last = 0.0;
        for step in 1..=400 {
            let value = estimator.observe(9, JobState::Running, secs(t0, step as f64 * 0.25));
            assert!(value >= last);
            assert!(value <= 99.0);
            last = value;
        }
        assert!(last > 98.9);
        // An out-of-order (earlier) timestamp never lowers the display.
        assert_eq!(estimator.observe(9, JobState::Running, secs(t0, 1.0)), last);
    }

    #[test]
    fn completion_and_failure_values() {
        let mut estimator = ProgressEstimator::default();
        let t0 = Instant::now();
        estimator.observe(1, JobState::Running, t0);
        estimator.observe(2, JobState::Running, t0);
        assert_eq!(estimator.observe(1, JobState::Completed, secs(t0, 1.0)), 100.0);
        assert_eq!(estimator.observe(2, JobState::Failed, secs(t0, 5.0)), 0.0);
        assert_eq!(estimator.percentage(2), Some(0.0));
    }

    #[test]
    fn terminal_states_ignore_running_until_idle() {
        let mut estimator = ProgressEstimator::default();
        let t0 = Instant::now();
        estimator.observe(1, JobState::Running, t0);
        estimator.observe(1, JobState::Completed, secs(t0, 1.0));
        assert_eq!(estimator.observe(1, JobState::Running, secs(t0, 2.0)), 100.0);

        assert_eq!(estimator.observe(1, JobState::Idle, secs(t0, 3.0)), 0.0);
        estimator.observe(1, JobState::Running, secs(t0, 4.0));
        assert_eq!(
            estimator.record(1).unwrap().started_at,
            Some(secs(t0, 4.0))
        );
    }

    #[test]
    fn unknown_ids_report_nothing() {
        let mut estimator = ProgressEstimator::default();
        assert_eq!(estimator.percentage(42), None);
        assert_eq!(estimator.observe(42, JobState::Completed, Instant::now()), 100.0);
        assert_eq!(estimator.percentage(42), None);
    }

    #[test]
    fn retain_and_reset_clear_records() {
        let mut estimator = ProgressEstimator::default();
        let t0 = Instant::now();
        for id in 1..=3 {
            estimator.observe(id, JobState::Running, t0);
        }
        estimator.retain(&[2]);
        assert_eq!(estimator.len(), 1);
        assert!(estimator.percentage(2).is_some());
        estimator.reset();
        assert!(estimator.is_empty());
    }

    #[test]
    fn advance_moves_running_records_only() {
        let mut estimator = ProgressEstimator::default();
        let t0 = Instant::now();
        estimator.observe(1, JobState::Running, t0);
        estimator.observe(2, JobState::Idle, t0);
        estimator.advance(secs(t0, 2.0));
        assert!(estimator.percentage(1).unwrap() > 60.0);
        assert_eq!(estimator.percentage(2), Some(0.0));
    }
}
