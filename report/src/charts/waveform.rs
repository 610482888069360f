//! Full-length waveform plots of a single normalized channel.

use crate::charts::line::LineStyle;
use crate::charts::{ChartArtifact, ChartData, ChartKind, ChartRenderer, ChartSpec};

/// Plots every sample of a channel; no windowing or downsampling.
#[derive(Debug, Clone, Default)]
pub struct WaveformRenderer {
    renderer: ChartRenderer,
}

impl WaveformRenderer {
    pub fn new(renderer: ChartRenderer) -> Self {
        Self { renderer }
    }

    /// Fixed unit viewport with point markers drawn over the line.
    pub fn style() -> LineStyle {
        LineStyle {
            y_range: Some((0.0, 1.0)),
            markers: true,
        }
    }

    pub fn render(&self, channel_label: &str, normalized: &[f64]) -> ChartArtifact {
        let spec = ChartSpec::new(format!("Waveform: {channel_label}"))
            .with_axes("Sample", "Normalized amplitude");
        self.renderer.render(
            ChartKind::Waveform,
            &ChartData::Series(normalized.to_vec()),
            &spec,
        )
    }
}
