//! Error types for the report pipeline.

use std::fmt;

use thiserror::Error;

/// Convenience result type for report operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage an error originated from, used for user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Ingest,
    Chart,
    Export,
    Poll,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Fetch => "fetch",
            Stage::Ingest => "ingest",
            Stage::Chart => "chart",
            Stage::Export => "export",
            Stage::Poll => "poll",
        })
    }
}

/// Main error type for the report crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Raw signal payload is structurally unreadable
    #[error("Input format error during {stage}: {message}")]
    InputFormat { stage: Stage, message: String },

    /// Parsing produced zero valid samples
    #[error("Empty signal during {stage}: no valid samples found")]
    EmptySignal { stage: Stage },

    /// A single raster artifact or page failed to render
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// A page failed during document export; nothing was written
    #[error("Export aborted at page {page}: {reason}")]
    ExportAbort { page: usize, reason: String },

    /// Export was cancelled at a page boundary; nothing was written
    #[error("Export cancelled before page {page}")]
    Cancelled { page: usize },

    /// Status fetch failed for one polling tick
    #[error("Polling error: {0}")]
    Polling(String),

    /// An external collaborator (assessment or signal store) failed
    #[error("Source error during {stage}: {message}")]
    Source { stage: Stage, message: String },

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stage the failure belongs to, when one is known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::InputFormat { stage, .. }
            | Error::EmptySignal { stage }
            | Error::Source { stage, .. } => Some(*stage),
            Error::Render(_) => Some(Stage::Chart),
            Error::ExportAbort { .. } | Error::Cancelled { .. } => Some(Stage::Export),
            Error::Polling(_) => Some(Stage::Poll),
            Error::Config(_) | Error::Io(_) => None,
        }
    }
}

/// Failure while rasterizing one chart or page.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("invalid surface size {width}x{height}")]
    SurfaceSize { width: u32, height: u32 },

    #[error("markup rejected: {0}")]
    Markup(String),

    #[error("image encoding failed: {0}")]
    Encode(String),

    #[error("image decoding failed: {0}")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}
