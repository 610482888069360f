//! Collaborators that supply report inputs.
//!
//! The pipeline only sees the two traits. The file-system stores cover local
//! use and tests: assessments live at `<root>/<id>.json`, raw signal dumps at
//! `<root>/<subject>/<filename>`.

use std::future::Future;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::assessment::AssessmentResult;
use crate::error::Stage;
use crate::signal::RawSignalRecord;
use crate::{Error, Result};

pub trait AssessmentSource: Send + Sync {
    fn assessment(&self, id: &str) -> impl Future<Output = Result<AssessmentResult>> + Send;
}

pub trait SignalSource: Send + Sync {
    fn signal(
        &self,
        subject_id: &str,
        filename: &str,
    ) -> impl Future<Output = Result<RawSignalRecord>> + Send;
}

#[derive(Debug, Clone)]
pub struct FsAssessmentStore {
    root: PathBuf,
}

impl FsAssessmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssessmentSource for FsAssessmentStore {
    async fn assessment(&self, id: &str) -> Result<AssessmentResult> {
        let path = self.root.join(format!("{}.json", path_segment(id)?));
        debug!(path = %path.display(), "loading assessment");
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|err| fetch_error(&path, err))?;
        AssessmentResult::from_json(&raw)
    }
}

#[derive(Debug, Clone)]
pub struct FsSignalStore {
    root: PathBuf,
}

impl FsSignalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SignalSource for FsSignalStore {
    async fn signal(&self, subject_id: &str, filename: &str) -> Result<RawSignalRecord> {
        let path = self
            .root
            .join(path_segment(subject_id)?)
            .join(path_segment(filename)?);
        debug!(path = %path.display(), "loading raw signal");
        let payload = tokio::fs::read(&path)
            .await
            .map_err(|err| fetch_error(&path, err))?;
        Ok(RawSignalRecord::new(subject_id, filename, payload))
    }
}

/// Identifiers become single path components; anything that could walk the
/// tree is refused.
fn path_segment(value: &str) -> Result<&str> {
    let ok = !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\', '\0']);
    if ok {
        Ok(value)
    } else {
        Err(Error::Source {
            stage: Stage::Fetch,
            message: format!("invalid identifier {value:?}"),
        })
    }
}

fn fetch_error(path: &Path, err: std::io::Error) -> Error {
    Error::Source {
        stage: Stage::Fetch,
        message: format!("{}: {err}", path.display()),
    }
}
