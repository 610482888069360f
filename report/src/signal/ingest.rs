//! Parser for raw multi-channel signal dumps.
//!
//! Layout: a fixed block of header/metadata lines (always skipped), then
//! comma-separated rows `index, ch1, ch2, ..., chC[, extra...]`. Rows that are
//! blank, commented or too short are skipped; a channel value that does not
//! parse is dropped from that channel only. Accumulation stops at the sample
//! cap so oversized dumps cost a bounded amount of work.

use serde::Serialize;
use tracing::debug;

use crate::config::IngestConfig;
use crate::{Error, Result, Stage};

/// Per-channel sample sequences plus the shared time index.
///
/// Every channel has the same length as `time_index` unless individual
/// values were omitted; `stats.omitted_values` counts those.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSignal {
    pub time_index: Vec<f64>,
    pub channels: Vec<Vec<f64>>,
    pub stats: IngestStats,
}

impl ParsedSignal {
    pub fn sample_count(&self) -> usize {
        self.time_index.len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// True when every channel lines up with the time index.
    pub fn is_aligned(&self) -> bool {
        self.channels
            .iter()
            .all(|channel| channel.len() == self.time_index.len())
    }
}

/// Bookkeeping about what the parser skipped, used for the signal page footer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub header_lines_skipped: usize,
    pub blank_lines: u32,
    pub comment_lines: u32,
    pub short_lines: u32,
    pub bad_index_lines: u32,
    pub omitted_values: u32,
    pub cap_reached: bool,
}

impl IngestStats {
    fn log_blank(&mut self) {
        self.blank_lines = self.blank_lines.saturating_add(1);
    }

    fn log_comment(&mut self) {
        self.comment_lines = self.comment_lines.saturating_add(1);
    }

    fn log_short(&mut self) {
        self.short_lines = self.short_lines.saturating_add(1);
    }

    fn log_bad_index(&mut self) {
        self.bad_index_lines = self.bad_index_lines.saturating_add(1);
    }

    fn log_omitted(&mut self) {
        self.omitted_values = self.omitted_values.saturating_add(1);
    }

    pub fn skipped_lines(&self) -> u32 {
        self.blank_lines
            .saturating_add(self.comment_lines)
            .saturating_add(self.short_lines)
            .saturating_add(self.bad_index_lines)
    }

    pub fn is_clean(&self) -> bool {
        self.short_lines == 0 && self.bad_index_lines == 0 && self.omitted_values == 0
    }

    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if self.short_lines > 0 {
            parts.push(format!("short rows ×{}", self.short_lines));
        }
        if self.bad_index_lines > 0 {
            parts.push(format!("bad index ×{}", self.bad_index_lines));
        }
        if self.omitted_values > 0 {
            parts.push(format!("dropped values ×{}", self.omitted_values));
        }
        if self.cap_reached {
            parts.push("sample cap reached".to_string());
        }
        if parts.is_empty() {
            "clean parse".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Configured parser. `parse` is the one-shot convenience wrapper.
#[derive(Debug, Clone, Default)]
pub struct SignalIngestor {
    config: IngestConfig,
}

impl SignalIngestor {
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Validate that a payload is readable text before parsing it.
    pub fn parse_bytes(&self, payload: &[u8]) -> Result<ParsedSignal> {
        if payload.contains(&0) {
            return Err(Error::InputFormat {
                stage: Stage::Ingest,
                message: "payload contains NUL bytes; expected a text dump".into(),
            });
        }
        let text = std::str::from_utf8(payload).map_err(|err| Error::InputFormat {
            stage: Stage::Ingest,
            message: format!("payload is not valid UTF-8 ({err})"),
        })?;
        self.parse(text)
    }

    pub fn parse(&self, raw: &str) -> Result<ParsedSignal> {
        let channel_count = self.config.channel_count;
        let marker = self.config.comment_marker.as_str();

        let mut stats = IngestStats::default();
        let mut time_index = Vec::with_capacity(self.config.sample_cap.min(4096));
        let mut channels: Vec<Vec<f64>> = vec![Vec::new(); channel_count];

        let mut lines = raw.lines();
        for _ in lines.by_ref().take(self.config.header_lines) {
            stats.header_lines_skipped += 1;
        }

        for line in lines {
            if time_index.len() >= self.config.sample_cap {
                stats.cap_reached = true;
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                stats.log_blank();
                continue;
            }
            if !marker.is_empty() && trimmed.starts_with(marker) {
                stats.log_comment();
                continue;
            }

            let fields: Vec<&str> = trimmed.split(',').collect();
            if fields.len() < 1 + channel_count {
                stats.log_short();
                continue;
            }

            let Some(index) = parse_value(fields[0]) else {
                stats.log_bad_index();
                continue;
            };

            time_index.push(index);
            for (channel, field) in channels.iter_mut().zip(&fields[1..=channel_count]) {
                match parse_value(field) {
                    Some(value) => channel.push(value),
                    None => stats.log_omitted(),
                }
            }
        }

        if time_index.is_empty() {
            return Err(Error::EmptySignal {
                stage: Stage::Ingest,
            });
        }

        debug!(
            samples = time_index.len(),
            channels = channel_count,
            skipped = stats.skipped_lines(),
            omitted = stats.omitted_values,
            cap_reached = stats.cap_reached,
            "signal parsed"
        );

        Ok(ParsedSignal {
            time_index,
            channels,
            stats,
        })
    }
}

/// Parse with the default layout (29 header lines, 16 channels, cap 3000).
pub fn parse(raw: &str) -> Result<ParsedSignal> {
    SignalIngestor::default().parse(raw)
}

pub fn parse_bytes(payload: &[u8]) -> Result<ParsedSignal> {
    SignalIngestor::default().parse_bytes(payload)
}

fn parse_value(field: &str) -> Option<f64> {
    field
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
