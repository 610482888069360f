//! Page composition.
//!
//! Every page uses the same portrait template, authored in 150 dpi layout
//! units and scaled by the rasterizer to the configured density:
//!
//! ```text
//! +--------------------------------------+
//! | header band                          |
//! +--------------------------------------+
//! | key   value       | key   value      |   field grid, two columns
//! | key   value       | key   value      |
//! +--------------------------------------+
//! | notes (wrapped, line-limited)        |
//! +--------------------------------------+
//! | chart | chart                        |   chart grid, clipped cells
//! | chart | chart                        |
//! +--------------------------------------+
//! | footer                  page n of m  |
//! +--------------------------------------+
//! ```
//!
//! Content that does not fit is clipped or truncated. Nothing reflows onto
//! another page.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::{debug, warn};

use crate::charts::svg::{Anchor, SvgCanvas, FRAME, GRID, INK, MUTED};
use crate::charts::{ChartArtifact, ChartKind};
use crate::config::PageGeometry;
use crate::error::RenderError;
use crate::layout::{PageSpec, RenderedPage};
use crate::render::fonts::{self, FontWeight};

pub const LAYOUT_WIDTH: f64 = 1240.0;
pub const LAYOUT_HEIGHT: f64 = 1754.0;

const MARGIN: f64 = 72.0;
const HEADER_BAND: f64 = 150.0;
const HEADER_SIZE: f64 = 40.0;
const HEADER_FILL: &str = "#1f2a44";

const FIELD_TOP: f64 = HEADER_BAND + 40.0;
const FIELD_ROW: f64 = 46.0;
const FIELD_GUTTER: f64 = 40.0;
const FIELD_KEY_WIDTH: f64 = 210.0;
pub const MAX_FIELD_ROWS: usize = 8;

const NOTES_SIZE: f64 = 20.0;
pub const MAX_NOTE_LINES: usize = 12;

const FOOTER_LINE: f64 = LAYOUT_HEIGHT - 80.0;
const CHART_GAP: f64 = 24.0;
const MIN_CHART_CELL: f64 = 180.0;
const MAX_CHART_COLUMNS: usize = 3;

#[derive(Debug, Clone, Copy, Default)]
pub struct PageComposer {
    geometry: PageGeometry,
}

impl PageComposer {
    pub fn new(geometry: PageGeometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> PageGeometry {
        self.geometry
    }

    /// One rendered page per spec, in input order.
    pub fn compose(&self, pages: &[PageSpec]) -> Vec<RenderedPage> {
        let total = pages.len();
        pages
            .iter()
            .enumerate()
            .map(|(index, spec)| self.compose_page(index, total, spec))
            .collect()
    }

    fn compose_page(&self, index: usize, total: usize, spec: &PageSpec) -> RenderedPage {
        let mut canvas = SvgCanvas::new(LAYOUT_WIDTH, LAYOUT_HEIGHT);
        let content_w = LAYOUT_WIDTH - 2.0 * MARGIN;

        draw_header(&mut canvas, &spec.header, content_w);
        let mut cursor = draw_fields(&mut canvas, index, &spec.fields, content_w);
        if let Some(notes) = spec.notes.as_deref().filter(|n| !n.trim().is_empty()) {
            cursor = draw_notes(&mut canvas, index, notes, cursor + 24.0, content_w);
        }
        draw_charts(&mut canvas, index, spec, cursor + 32.0, content_w);
        draw_footer(&mut canvas, index, total);

        debug!(
            page = index + 1,
            fields = spec.fields.len(),
            charts = spec.artifacts.len(),
            "page composed"
        );
        RenderedPage {
            index,
            header: spec.header.clone(),
            svg: canvas.finish(),
            geometry: self.geometry,
        }
    }
}

fn draw_header(canvas: &mut SvgCanvas, header: &str, content_w: f64) {
    canvas.rect(0.0, 0.0, LAYOUT_WIDTH, HEADER_BAND, HEADER_FILL);
    let shown = fonts::truncate(header, HEADER_SIZE, FontWeight::Bold, content_w);
    canvas.text(
        MARGIN,
        HEADER_BAND / 2.0 + HEADER_SIZE * 0.35,
        shown,
        HEADER_SIZE,
        Anchor::Start,
        FontWeight::Bold,
        "#ffffff",
    );
}

/// Returns the y coordinate just below the grid.
fn draw_fields(
    canvas: &mut SvgCanvas,
    page: usize,
    fields: &[(String, String)],
    content_w: f64,
) -> f64 {
    if fields.is_empty() {
        return FIELD_TOP;
    }
    let capacity = MAX_FIELD_ROWS * 2;
    if fields.len() > capacity {
        warn!(
            page = page + 1,
            fields = fields.len(),
            shown = capacity,
            "field grid overflow clipped"
        );
    }

    let column_w = (content_w - FIELD_GUTTER) / 2.0;
    let value_w = column_w - FIELD_KEY_WIDTH - 8.0;
    let shown = &fields[..fields.len().min(capacity)];
    for (idx, (key, value)) in shown.iter().enumerate() {
        let x = MARGIN + (idx % 2) as f64 * (column_w + FIELD_GUTTER);
        let row_top = FIELD_TOP + (idx / 2) as f64 * FIELD_ROW;
        let baseline = row_top + FIELD_ROW * 0.62;
        canvas.text(
            x,
            baseline,
            fonts::truncate(key, 18.0, FontWeight::Regular, FIELD_KEY_WIDTH - 8.0),
            18.0,
            Anchor::Start,
            FontWeight::Regular,
            MUTED,
        );
        canvas.text(
            x + FIELD_KEY_WIDTH,
            baseline,
            fonts::truncate(value, 20.0, FontWeight::SemiBold, value_w),
            20.0,
            Anchor::Start,
            FontWeight::SemiBold,
            INK,
        );
        canvas.line(x, row_top + FIELD_ROW, x + column_w, row_top + FIELD_ROW, GRID, 1.0);
    }
    FIELD_TOP + shown.len().div_ceil(2) as f64 * FIELD_ROW
}

/// Wrapped notes block inside a tinted, clipped box. Returns the y below it.
fn draw_notes(canvas: &mut SvgCanvas, page: usize, notes: &str, top: f64, content_w: f64) -> f64 {
    let padding = 20.0;
    let metrics = fonts::metrics(NOTES_SIZE);
    let mut lines = fonts::wrap(notes, NOTES_SIZE, FontWeight::Regular, content_w - 2.0 * padding);
    if lines.len() > MAX_NOTE_LINES {
        warn!(
            page = page + 1,
            lines = lines.len(),
            shown = MAX_NOTE_LINES,
            "notes truncated"
        );
        lines.truncate(MAX_NOTE_LINES);
    }

    let height = padding * 2.0 + metrics.line_h * lines.len() as f64;
    let clip_id = format!("p{page}-notes");
    canvas.rect(MARGIN, top, content_w, height, "#f4f6fa");
    canvas.clip_rect(&clip_id, MARGIN, top, content_w, height);
    canvas.open_clip_group(&clip_id);
    for (idx, line) in lines.iter().enumerate() {
        canvas.text(
            MARGIN + padding,
            top + padding + metrics.asc + metrics.line_h * idx as f64,
            line,
            NOTES_SIZE,
            Anchor::Start,
            FontWeight::Regular,
            INK,
        );
    }
    canvas.close_group();
    top + height
}

fn draw_charts(canvas: &mut SvgCanvas, page: usize, spec: &PageSpec, top: f64, content_w: f64) {
    if spec.artifacts.is_empty() {
        return;
    }
    let columns = spec.chart_columns.clamp(1, MAX_CHART_COLUMNS);
    let available_h = FOOTER_LINE - 24.0 - top;
    let max_rows = ((available_h + CHART_GAP) / (MIN_CHART_CELL + CHART_GAP)).floor() as usize;
    let wanted_rows = spec.artifacts.len().div_ceil(columns);
    let rows = wanted_rows.min(max_rows);
    if rows == 0 {
        warn!(page = page + 1, charts = spec.artifacts.len(), "no room for charts");
        return;
    }
    let shown = (rows * columns).min(spec.artifacts.len());
    if shown < spec.artifacts.len() {
        warn!(
            page = page + 1,
            charts = spec.artifacts.len(),
            shown,
            "chart grid overflow clipped"
        );
    }

    let cell_w = (content_w - CHART_GAP * (columns - 1) as f64) / columns as f64;
    let cell_h = (available_h - CHART_GAP * (rows - 1) as f64) / rows as f64;
    for (slot, artifact) in spec.artifacts.iter().take(shown).enumerate() {
        let x = MARGIN + (slot % columns) as f64 * (cell_w + CHART_GAP);
        let y = top + (slot / columns) as f64 * (cell_h + CHART_GAP);
        let clip_id = format!("p{page}-c{slot}");
        canvas.clip_rect(&clip_id, x, y, cell_w, cell_h);
        canvas.open_clip_group(&clip_id);
        draw_artifact(canvas, artifact, x, y, cell_w, cell_h);
        canvas.close_group();
    }
}

/// External images get a caption; rendered charts carry their own title.
fn draw_artifact(canvas: &mut SvgCanvas, artifact: &ChartArtifact, x: f64, y: f64, w: f64, h: f64) {
    let captioned = artifact.descriptor().kind == ChartKind::External;
    let caption_h = if captioned { 30.0 } else { 0.0 };

    match png_data_url(artifact) {
        Ok(href) => canvas.image(x, y, w, h - caption_h, &href),
        Err(err) => {
            warn!(chart = %artifact.descriptor().title, error = %err, "chart could not be embedded");
            canvas.rect(x, y, w, h - caption_h, "#f3f4f6");
            canvas.text(
                x + w / 2.0,
                y + (h - caption_h) / 2.0,
                "Image unavailable",
                18.0,
                Anchor::Middle,
                FontWeight::Regular,
                MUTED,
            );
        }
    }
    if captioned {
        let title = fonts::truncate(&artifact.descriptor().title, 16.0, FontWeight::Regular, w);
        canvas.text(
            x + w / 2.0,
            y + h - 8.0,
            title,
            16.0,
            Anchor::Middle,
            FontWeight::Regular,
            MUTED,
        );
    }
    canvas.rect_outline(x, y, w, h - caption_h, FRAME, 1.0);
}

fn png_data_url(artifact: &ChartArtifact) -> Result<String, RenderError> {
    let png = artifact.image().to_png()?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}

fn draw_footer(canvas: &mut SvgCanvas, index: usize, total: usize) {
    canvas.line(MARGIN, FOOTER_LINE, LAYOUT_WIDTH - MARGIN, FOOTER_LINE, GRID, 1.0);
    canvas.text(
        LAYOUT_WIDTH - MARGIN,
        FOOTER_LINE + 36.0,
        &format!("Page {} of {}", index + 1, total),
        16.0,
        Anchor::End,
        FontWeight::Regular,
        MUTED,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RasterImage;

    fn chart(title: &str) -> ChartArtifact {
        ChartArtifact::external(title, RasterImage::blank(40, 30))
    }

    #[test]
    fn output_preserves_count_and_order() {
        let pages = vec![
            PageSpec::new("Summary"),
            PageSpec::new("Signal analysis"),
            PageSpec::new("Recommendation"),
        ];
        let rendered = PageComposer::default().compose(&pages);
        assert_eq!(rendered.len(), 3);
        for (idx, page) in rendered.iter().enumerate() {
            assert_eq!(page.index, idx);
            assert_eq!(page.header, pages[idx].header);
            assert!(page.svg.contains(&format!("Page {} of 3", idx + 1)));
        }
    }

    #[test]
    fn header_text_is_escaped() {
        let rendered = PageComposer::default().compose(&[PageSpec::new("A & B <test>")]);
        assert!(rendered[0].svg.contains("A &amp; B &lt;test&gt;"));
    }

    #[test]
    fn fields_beyond_the_grid_are_dropped() {
        let mut spec = PageSpec::new("Fields");
        for idx in 0..(MAX_FIELD_ROWS * 2 + 3) {
            spec = spec.field(format!("key{idx:02}"), format!("value{idx:02}"));
        }
        let svg = &PageComposer::default().compose(&[spec])[0].svg;
        assert!(svg.contains("key15"));
        assert!(!svg.contains("key16"));
    }

    #[test]
    fn long_notes_are_truncated_to_line_limit() {
        let notes = "Rest well and repeat the assessment. ".repeat(200);
        let svg = &PageComposer::default().compose(&[PageSpec::new("Notes").notes(notes)])[0].svg;
        let clip = "clip-path='url(#p0-notes)'>";
        let start = svg.find(clip).unwrap() + clip.len();
        let end = start + svg[start..].find("</g>").unwrap();
        assert_eq!(svg[start..end].matches("<text").count(), MAX_NOTE_LINES);
    }

    #[test]
    fn each_chart_gets_its_own_clip_path() {
        let spec = PageSpec::new("Charts")
            .columns(2)
            .artifacts((0..4).map(|i| chart(&format!("scan {i}"))));
        let svg = &PageComposer::default().compose(&[spec])[0].svg;
        for slot in 0..4 {
            assert!(svg.contains(&format!("<clipPath id='p0-c{slot}'>")));
        }
        assert_eq!(svg.matches("data:image/png;base64,").count(), 4);
        assert!(svg.contains("scan 3"));
    }

    #[test]
    fn chart_overflow_is_clipped_not_paginated() {
        let spec = PageSpec::new("Crowded").artifacts((0..20).map(|i| chart(&format!("c{i}"))));
        let rendered = PageComposer::default().compose(&[spec]);
        assert_eq!(rendered.len(), 1);
        let embedded = rendered[0].svg.matches("<image").count();
        assert!(embedded > 0 && embedded < 20);
    }
}
