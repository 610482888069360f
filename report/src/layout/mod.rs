//! Fixed-template page descriptions and their composed markup.

pub mod compose;

pub use compose::PageComposer;

use crate::charts::ChartArtifact;
use crate::config::PageGeometry;

/// Content for one report page. Page order is the order of the slice handed
/// to [`PageComposer::compose`].
#[derive(Debug, Clone, PartialEq)]
pub struct PageSpec {
    pub header: String,
    /// Key/value pairs laid out in a two-column grid.
    pub fields: Vec<(String, String)>,
    pub notes: Option<String>,
    pub artifacts: Vec<ChartArtifact>,
    pub chart_columns: usize,
}

impl PageSpec {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            fields: Vec::new(),
            notes: None,
            artifacts: Vec::new(),
            chart_columns: 1,
        }
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn artifact(mut self, artifact: ChartArtifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn artifacts(mut self, artifacts: impl IntoIterator<Item = ChartArtifact>) -> Self {
        self.artifacts.extend(artifacts);
        self
    }

    pub fn columns(mut self, columns: usize) -> Self {
        self.chart_columns = columns;
        self
    }
}

/// A composed page: complete SVG markup in layout units, ready to rasterize.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    /// Zero-based position in the document.
    pub index: usize,
    pub header: String,
    pub svg: String,
    pub geometry: PageGeometry,
}
