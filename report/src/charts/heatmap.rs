//! Heatmaps: a matrix mapped through a color ramp, with a legend bar.
//!
//! `values[row][col]`; row 0 is drawn at the bottom so frequency-like axes
//! read upwards. Normalization spans the whole matrix.

use crate::charts::ramp::{matrix_range, unit_value, ColorRamp};
use crate::charts::svg::{draw_axes, Anchor, PlotArea, SvgCanvas, FRAME, MUTED};
use crate::charts::ChartSpec;
use crate::core::format::format_tick;
use crate::render::fonts::FontWeight;

const LEGEND_SPACE: f64 = 110.0;
const LEGEND_STEPS: usize = 64;
const MISSING_CELL: &str = "#d1d5db";

pub struct HeatmapAxes {
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
}

pub fn markup(
    values: &[Vec<f64>],
    axes: &HeatmapAxes,
    ramp: &dyn ColorRamp,
    spec: &ChartSpec,
    width: u32,
    height: u32,
) -> String {
    let mut canvas = SvgCanvas::new(width as f64, height as f64);
    let area = PlotArea::inset(canvas.width(), canvas.height(), LEGEND_SPACE);
    let range = matrix_range(values).unwrap_or((0.0, 1.0));

    let rows = values.len().max(1);
    let cols = values.iter().map(Vec::len).max().unwrap_or(0).max(1);
    let cell_w = area.width / cols as f64;
    let cell_h = area.height / rows as f64;

    for (row_idx, row) in values.iter().enumerate() {
        let y = area.bottom() - cell_h * (row_idx + 1) as f64;
        for (col_idx, value) in row.iter().enumerate() {
            let fill = if value.is_finite() {
                ramp.color(unit_value(*value, range)).hex()
            } else {
                MISSING_CELL.to_string()
            };
            // Slight overlap hides hairline seams between antialiased cells.
            canvas.rect(
                area.left + cell_w * col_idx as f64,
                y,
                cell_w + 0.6,
                cell_h + 0.6,
                &fill,
            );
        }
    }

    draw_axes(
        &mut canvas,
        area,
        &spec.title,
        Some((axes.x_range, spec.x_label.as_str())),
        (axes.y_range, spec.y_label.as_str()),
    );
    draw_legend(&mut canvas, area, range, ramp);

    canvas.finish()
}

/// Vertical legend bar to the right of the plot, min at the bottom.
fn draw_legend(canvas: &mut SvgCanvas, area: PlotArea, range: (f64, f64), ramp: &dyn ColorRamp) {
    let x = area.right() + 28.0;
    let bar_w = 22.0;
    let step_h = area.height / LEGEND_STEPS as f64;

    for step in 0..LEGEND_STEPS {
        let t = (step as f64 + 0.5) / LEGEND_STEPS as f64;
        let y = area.bottom() - step_h * (step + 1) as f64;
        canvas.rect(x, y, bar_w, step_h + 0.6, &ramp.color(t).hex());
    }
    canvas.rect_outline(x, area.top, bar_w, area.height, FRAME, 1.0);

    canvas.text(
        x + bar_w + 8.0,
        area.top + 12.0,
        &format_tick(range.1),
        13.0,
        Anchor::Start,
        FontWeight::Regular,
        MUTED,
    );
    canvas.text(
        x + bar_w + 8.0,
        area.bottom(),
        &format_tick(range.0),
        13.0,
        Anchor::Start,
        FontWeight::Regular,
        MUTED,
    );
}
