//! Chart rendering: numeric series and matrices into fixed-size raster artifacts.
//!
//! Each chart is described as SVG markup, drawn on its own disposable
//! [`RenderSurface`](crate::render::RenderSurface) and captured as pixels.
//! Rendering never fails outward: empty input or a rasterization error
//! yields a "no data" placeholder artifact instead.

pub mod bar;
pub mod heatmap;
pub mod line;
pub mod radial;
pub mod ramp;
pub mod svg;
pub mod waveform;

pub use waveform::WaveformRenderer;

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::RenderError;
use crate::render::fonts::FontWeight;
use crate::render::{RasterImage, RenderSurface};
use ramp::{ColorRamp, Viridis};
use svg::{Anchor, SvgCanvas, FRAME, MUTED};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    Line,
    GroupedBar,
    Radial,
    Heatmap,
    Waveform,
    /// Finished image supplied by an external store.
    External,
}

impl ChartKind {
    /// Fixed raster size per kind, in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            ChartKind::Line => (1000, 420),
            ChartKind::Waveform => (1100, 420),
            ChartKind::GroupedBar => (1000, 460),
            ChartKind::Radial => (640, 640),
            ChartKind::Heatmap => (1000, 460),
            ChartKind::External => (800, 600),
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChartKind::Line => "line",
            ChartKind::GroupedBar => "grouped-bar",
            ChartKind::Radial => "radial",
            ChartKind::Heatmap => "heatmap",
            ChartKind::Waveform => "waveform",
            ChartKind::External => "external",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedSeries {
    pub name: String,
    pub values: Vec<f64>,
}

impl NamedSeries {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RadialAxis {
    pub label: String,
    pub value: f64,
}

impl RadialAxis {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// Input data for one chart.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    Series(Vec<f64>),
    Grouped {
        categories: Vec<String>,
        series: Vec<NamedSeries>,
    },
    Radial {
        axes: Vec<RadialAxis>,
        domain: (f64, f64),
    },
    Matrix {
        values: Vec<Vec<f64>>,
        x_range: (f64, f64),
        y_range: (f64, f64),
    },
}

impl ChartData {
    fn values(&self) -> Box<dyn Iterator<Item = f64> + '_> {
        match self {
            ChartData::Series(values) => Box::new(values.iter().copied()),
            ChartData::Grouped { series, .. } => {
                Box::new(series.iter().flat_map(|s| s.values.iter().copied()))
            }
            ChartData::Radial { axes, .. } => Box::new(axes.iter().map(|a| a.value)),
            ChartData::Matrix { values, .. } => Box::new(values.iter().flatten().copied()),
        }
    }

    /// True when there is at least one finite number to plot.
    pub fn has_numeric(&self) -> bool {
        if let ChartData::Grouped { categories, .. } = self {
            if categories.is_empty() {
                return false;
            }
        }
        self.values().any(f64::is_finite)
    }
}

/// Text that accompanies a chart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
}

impl ChartSpec {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_axes(mut self, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        self.x_label = x_label.into();
        self.y_label = y_label.into();
        self
    }
}

/// Summary of the data an artifact was rendered from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceSnapshot {
    pub points: usize,
    pub finite_points: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Hash of the raw input bits; equal inputs give equal digests.
    pub digest: u64,
}

impl SourceSnapshot {
    pub fn of(data: &ChartData) -> Self {
        let mut hasher = DefaultHasher::new();
        let mut points = 0;
        let mut finite_points = 0;
        let mut range: Option<(f64, f64)> = None;
        for value in data.values() {
            points += 1;
            value.to_bits().hash(&mut hasher);
            if value.is_finite() {
                finite_points += 1;
                range = Some(match range {
                    None => (value, value),
                    Some((lo, hi)) => (lo.min(value), hi.max(value)),
                });
            }
        }
        Self {
            points,
            finite_points,
            min: range.map(|r| r.0),
            max: range.map(|r| r.1),
            digest: hasher.finish(),
        }
    }

    pub fn empty() -> Self {
        Self {
            points: 0,
            finite_points: 0,
            min: None,
            max: None,
            digest: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartDescriptor {
    pub id: Uuid,
    pub title: String,
    pub kind: ChartKind,
    pub source: SourceSnapshot,
    /// Set when the artifact is a stand-in for data that could not be drawn.
    pub placeholder: bool,
}

/// A finished chart image. Immutable; clones share the pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartArtifact {
    descriptor: Arc<ChartDescriptor>,
    image: RasterImage,
}

impl ChartArtifact {
    /// Wrap an image produced elsewhere, e.g. a stored scan or photo.
    pub fn external(title: impl Into<String>, image: RasterImage) -> Self {
        Self {
            descriptor: Arc::new(ChartDescriptor {
                id: Uuid::new_v4(),
                title: title.into(),
                kind: ChartKind::External,
                source: SourceSnapshot::empty(),
                placeholder: false,
            }),
            image,
        }
    }

    /// "No data" stand-in sized for `kind`. Infallible: falls back to a flat
    /// fill if even the placeholder markup cannot be drawn.
    pub fn placeholder(kind: ChartKind, title: &str, source: SourceSnapshot) -> Self {
        let (width, height) = kind.dimensions();
        let image = render_markup(
            &format!("placeholder:{title}"),
            &placeholder_markup(title, width, height),
            width,
            height,
        )
        .unwrap_or_else(|err| {
            warn!(chart = title, error = %err, "placeholder markup failed; using flat fill");
            RasterImage::blank(width, height)
        });
        Self {
            descriptor: Arc::new(ChartDescriptor {
                id: Uuid::new_v4(),
                title: title.to_string(),
                kind,
                source,
                placeholder: true,
            }),
            image,
        }
    }

    pub fn descriptor(&self) -> &ChartDescriptor {
        &self.descriptor
    }

    pub fn image(&self) -> &RasterImage {
        &self.image
    }

    pub fn is_placeholder(&self) -> bool {
        self.descriptor.placeholder
    }
}

/// Renders chart data into artifacts using a configurable color ramp.
#[derive(Clone)]
pub struct ChartRenderer {
    ramp: Arc<dyn ColorRamp>,
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self {
            ramp: Arc::new(Viridis),
        }
    }
}

impl fmt::Debug for ChartRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartRenderer").finish_non_exhaustive()
    }
}

impl ChartRenderer {
    pub fn with_ramp(ramp: Arc<dyn ColorRamp>) -> Self {
        Self { ramp }
    }

    pub fn render(&self, kind: ChartKind, data: &ChartData, spec: &ChartSpec) -> ChartArtifact {
        let source = SourceSnapshot::of(data);
        if !data.has_numeric() {
            debug!(chart = %spec.title, %kind, "no numeric data; rendering placeholder");
            return ChartArtifact::placeholder(kind, &spec.title, source);
        }

        match self.try_render(kind, data, spec) {
            Ok(image) => ChartArtifact {
                descriptor: Arc::new(ChartDescriptor {
                    id: Uuid::new_v4(),
                    title: spec.title.clone(),
                    kind,
                    source,
                    placeholder: false,
                }),
                image,
            },
            Err(err) => {
                warn!(chart = %spec.title, %kind, error = %err, "chart render failed; using placeholder");
                ChartArtifact::placeholder(kind, &spec.title, source)
            }
        }
    }

    pub fn try_render(
        &self,
        kind: ChartKind,
        data: &ChartData,
        spec: &ChartSpec,
    ) -> Result<RasterImage, RenderError> {
        let (width, height) = kind.dimensions();
        let markup = match (kind, data) {
            (ChartKind::Line, ChartData::Series(values)) => {
                line::markup(values, spec, line::LineStyle::default(), width, height)
            }
            (ChartKind::Waveform, ChartData::Series(values)) => {
                line::markup(values, spec, WaveformRenderer::style(), width, height)
            }
            (ChartKind::GroupedBar, ChartData::Grouped { categories, series }) => {
                bar::markup(categories, series, spec, width, height)
            }
            (ChartKind::Radial, ChartData::Radial { axes, domain }) => {
                radial::markup(axes, *domain, spec, width, height)
            }
            (
                ChartKind::Heatmap,
                ChartData::Matrix {
                    values,
                    x_range,
                    y_range,
                },
            ) => heatmap::markup(
                values,
                &heatmap::HeatmapAxes {
                    x_range: *x_range,
                    y_range: *y_range,
                },
                self.ramp.as_ref(),
                spec,
                width,
                height,
            ),
            (kind, _) => {
                return Err(RenderError::Other(format!(
                    "data shape does not match chart kind {kind}"
                )))
            }
        };
        render_markup(&format!("chart:{}", spec.title), &markup, width, height)
    }
}

/// Draw markup on a fresh surface and capture it; the surface is dropped on return.
fn render_markup(
    label: &str,
    markup: &str,
    width: u32,
    height: u32,
) -> Result<RasterImage, RenderError> {
    let mut surface = RenderSurface::acquire(label, width, height)?;
    surface.draw_svg(markup)?;
    Ok(surface.capture())
}

fn placeholder_markup(title: &str, width: u32, height: u32) -> String {
    let mut canvas = SvgCanvas::new(width as f64, height as f64);
    canvas.rect(0.0, 0.0, canvas.width(), canvas.height(), "#f3f4f6");
    canvas.rect_outline(8.0, 8.0, canvas.width() - 16.0, canvas.height() - 16.0, FRAME, 2.0);
    canvas.text(
        canvas.width() / 2.0,
        canvas.height() / 2.0 - 10.0,
        title,
        22.0,
        Anchor::Middle,
        FontWeight::SemiBold,
        MUTED,
    );
    canvas.text(
        canvas.width() / 2.0,
        canvas.height() / 2.0 + 24.0,
        "No data",
        18.0,
        Anchor::Middle,
        FontWeight::Regular,
        MUTED,
    );
    canvas.finish()
}
