//! Report configuration.
//!
//! Every field has a default so an empty TOML document is a valid config.
//! Sections mirror the pipeline stages:
//!
//! ```toml
//! [ingest]
//! header_lines = 29
//! channel_count = 16
//! sample_cap = 3000
//! comment_marker = "%"
//!
//! [page]
//! dpi = 150
//!
//! [export]
//! failure_policy = "abort"   # or "placeholder"
//!
//! [progress]
//! total_window_secs = 6.0
//! poll_interval_ms = 1000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    pub ingest: IngestConfig,
    pub page: PageGeometry,
    pub export: ExportConfig,
    pub progress: ProgressConfig,
}

impl ReportConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: ReportConfig =
            toml::from_str(raw).map_err(|err| Error::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ingest.channel_count == 0 {
            return Err(Error::Config("ingest.channel_count must be at least 1".into()));
        }
        if self.ingest.sample_cap == 0 {
            return Err(Error::Config("ingest.sample_cap must be at least 1".into()));
        }
        if !(36..=600).contains(&self.page.dpi) {
            return Err(Error::Config(format!(
                "page.dpi {} outside supported range 36..=600",
                self.page.dpi
            )));
        }
        if !(self.progress.total_window_secs.is_finite() && self.progress.total_window_secs > 0.0)
        {
            return Err(Error::Config(
                "progress.total_window_secs must be a positive number".into(),
            ));
        }
        if self.progress.poll_interval_ms == 0 {
            return Err(Error::Config("progress.poll_interval_ms must be non-zero".into()));
        }
        Ok(())
    }
}

/// Raw signal text layout.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    /// Leading lines skipped unconditionally.
    pub header_lines: usize,
    pub channel_count: usize,
    /// Maximum number of valid data lines accumulated.
    pub sample_cap: usize,
    pub comment_marker: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            header_lines: 29,
            channel_count: 16,
            sample_cap: 3000,
            comment_marker: "%".to_string(),
        }
    }
}

/// Physical page geometry. Always portrait A4; only the pixel density varies.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct PageGeometry {
    pub dpi: u32,
}

impl PageGeometry {
    pub const A4_WIDTH_MM: f64 = 210.0;
    pub const A4_HEIGHT_MM: f64 = 297.0;

    pub fn width_px(&self) -> u32 {
        mm_to_px(Self::A4_WIDTH_MM, self.dpi)
    }

    pub fn height_px(&self) -> u32 {
        mm_to_px(Self::A4_HEIGHT_MM, self.dpi)
    }

    /// Page size in PDF points (1/72 in).
    pub fn size_pt(&self) -> (f32, f32) {
        (
            (Self::A4_WIDTH_MM / 25.4 * 72.0) as f32,
            (Self::A4_HEIGHT_MM / 25.4 * 72.0) as f32,
        )
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self { dpi: 150 }
    }
}

fn mm_to_px(mm: f64, dpi: u32) -> u32 {
    (mm / 25.4 * dpi as f64).round() as u32
}

/// What to do when one page fails to rasterize.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the whole export; nothing is delivered.
    #[default]
    Abort,
    /// Substitute a "page unavailable" raster and keep going.
    Placeholder,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProgressConfig {
    /// Synthetic progress approaches the cap over roughly this window.
    pub total_window_secs: f64,
    /// Ceiling for synthetic progress while a job is still running.
    pub cap: f64,
    pub poll_interval_ms: u64,
}

impl ProgressConfig {
    pub fn tau(&self) -> f64 {
        self.total_window_secs / 3.0
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            total_window_secs: 6.0,
            cap: 99.0,
            poll_interval_ms: 1000,
        }
    }
}
