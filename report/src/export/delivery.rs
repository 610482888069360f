//! Where finished documents go.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::info;

use crate::{Error, Result};

pub const PDF_MIME: &str = "application/pdf";

/// Outcome of a successful delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub filename: String,
    /// Final location, when the sink writes to the file system.
    pub path: Option<PathBuf>,
    pub bytes: usize,
}

/// "Save these bytes as a named file."
pub trait DeliverySink: Send + Sync {
    fn deliver(
        &self,
        filename: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> impl Future<Output = Result<Delivery>> + Send;
}

/// Writes documents into one directory. Files appear atomically: bytes go to a
/// hidden partial file that is renamed once complete.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<platform data dir>/reports`.
    pub fn platform_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("org", "Bioreport", "Bioreport")
            .ok_or_else(|| Error::Config("unable to determine export directory".into()))?;
        Ok(Self::new(dirs.data_dir().join("reports")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DeliverySink for DirectorySink {
    async fn deliver(&self, filename: &str, mime: &str, bytes: Vec<u8>) -> Result<Delivery> {
        let name = plain_filename(filename)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(name);
        let partial = self.dir.join(format!(".{name}.partial"));
        let len = bytes.len();
        if let Err(err) = tokio::fs::write(&partial, bytes).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(err.into());
        }
        if let Err(err) = tokio::fs::rename(&partial, &path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(err.into());
        }

        info!(path = %path.display(), mime, bytes = len, "document delivered");
        Ok(Delivery {
            filename: name.to_string(),
            path: Some(path),
            bytes: len,
        })
    }
}

/// Keeps delivered documents in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filenames(&self) -> Vec<String> {
        self.files
            .lock()
            .map(|files| files.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default()
    }

    /// Most recent document delivered under `filename`.
    pub fn get(&self, filename: &str) -> Option<Vec<u8>> {
        let files = self.files.lock().ok()?;
        files
            .iter()
            .rev()
            .find(|(name, _)| name == filename)
            .map(|(_, bytes)| bytes.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.files.lock().map(|files| files.is_empty()).unwrap_or(true)
    }
}

impl DeliverySink for MemorySink {
    async fn deliver(&self, filename: &str, _mime: &str, bytes: Vec<u8>) -> Result<Delivery> {
        let name = plain_filename(filename)?.to_string();
        let len = bytes.len();
        self.files
            .lock()
            .map_err(|_| Error::Io(io::Error::other("memory sink poisoned")))?
            .push((name.clone(), bytes));
        Ok(Delivery {
            filename: name,
            path: None,
            bytes: len,
        })
    }
}

/// Reject names that would escape the sink's directory.
fn plain_filename(filename: &str) -> Result<&str> {
    let trimmed = filename.trim();
    let valid = !trimmed.is_empty()
        && trimmed != "."
        && trimmed != ".."
        && !trimmed.contains(['/', '\\', '\0']);
    if valid {
        Ok(trimmed)
    } else {
        Err(Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid output filename {filename:?}"),
        )))
    }
}

/// `YYYYMMDD_HHMMSS` in UTC, for default file names.
pub fn timestamp_slug() -> String {
    use time::{macros::format_description, OffsetDateTime};

    OffsetDateTime::now_utc()
        .format(&format_description!(
            "[year][month][day]_[hour][minute][second]"
        ))
        .unwrap_or_else(|_| "report".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn directory_sink_leaves_only_the_final_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("out"));
        let delivery = sink
            .deliver("report.pdf", PDF_MIME, b"%PDF-1.5".to_vec())
            .await
            .unwrap();

        assert_eq!(delivery.bytes, 8);
        let path = delivery.path.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.5");
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("out"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("report.pdf")]);
    }

    #[tokio::test]
    async fn failed_rename_removes_the_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        // A non-empty directory at the target path makes the rename fail.
        std::fs::create_dir_all(out.join("report.pdf")).unwrap();
        std::fs::write(out.join("report.pdf").join("keep"), b"x").unwrap();

        let sink = DirectorySink::new(&out);
        let result = sink
            .deliver("report.pdf", PDF_MIME, b"%PDF-1.5".to_vec())
            .await;

        assert!(result.is_err());
        let entries: Vec<_> = std::fs::read_dir(&out)
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("report.pdf")]);
    }

    #[tokio::test]
    async fn path_like_names_are_rejected() {
        let sink = MemorySink::new();
        for name in ["", "../escape.pdf", "a/b.pdf", ".."] {
            assert!(sink.deliver(name, PDF_MIME, Vec::new()).await.is_err());
        }
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn memory_sink_returns_latest_copy() {
        let sink = MemorySink::new();
        sink.deliver("a.pdf", PDF_MIME, vec![1]).await.unwrap();
        sink.deliver("a.pdf", PDF_MIME, vec![2]).await.unwrap();
        assert_eq!(sink.get("a.pdf"), Some(vec![2]));
        assert_eq!(sink.filenames(), vec!["a.pdf", "a.pdf"]);
    }

    #[test]
    fn slug_has_date_and_time_parts() {
        let slug = timestamp_slug();
        assert_eq!(slug.len(), 15);
        assert_eq!(slug.as_bytes()[8], b'_');
    }
}
