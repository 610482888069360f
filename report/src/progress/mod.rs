//! Job progress: a local estimator plus the poller that drives it.

pub mod estimator;
pub mod poller;

pub use estimator::{JobId, JobState, ProgressEstimator, ProgressRecord};
pub use poller::{
    BatchStatus, BatchStatusSource, PollerHandle, ProgressPoller, ProgressUpdate, ResultStatus,
    RunStatus,
};
