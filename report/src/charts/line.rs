//! Single-series line plots against an index axis.

use crate::charts::svg::{draw_axes, PlotArea, SvgCanvas};
use crate::charts::ChartSpec;
use crate::signal::normalize::finite_range;

pub const LINE_COLOR: &str = "#2563eb";
pub const MARKER_COLOR: &str = "#1e3a8a";

#[derive(Clone, Copy, Debug, Default)]
pub struct LineStyle {
    /// Fixed vertical viewport; `None` scales to the data range.
    pub y_range: Option<(f64, f64)>,
    /// Draw a point marker on every sample, above the line.
    pub markers: bool,
}

pub fn markup(values: &[f64], spec: &ChartSpec, style: LineStyle, width: u32, height: u32) -> String {
    let mut canvas = SvgCanvas::new(width as f64, height as f64);
    let area = PlotArea::inset(canvas.width(), canvas.height(), 0.0);

    let y_range = style
        .y_range
        .or_else(|| finite_range(values).map(pad_range))
        .unwrap_or((0.0, 1.0));
    let last_index = values.len().saturating_sub(1).max(1) as f64;
    let x_range = (0.0, last_index);

    draw_axes(
        &mut canvas,
        area,
        &spec.title,
        Some((x_range, spec.x_label.as_str())),
        (y_range, spec.y_label.as_str()),
    );

    // Non-finite samples break the line into separate runs.
    let mut runs: Vec<Vec<(f64, f64)>> = vec![Vec::new()];
    for (idx, value) in values.iter().enumerate() {
        if value.is_finite() {
            let clamped = value.clamp(y_range.0.min(y_range.1), y_range.0.max(y_range.1));
            if let Some(run) = runs.last_mut() {
                run.push((area.x(idx as f64, x_range), area.y(clamped, y_range)));
            }
        } else if runs.last().is_some_and(|run| !run.is_empty()) {
            runs.push(Vec::new());
        }
    }

    let stroke_w = if values.len() > 1500 { 1.2 } else { 2.0 };
    for run in &runs {
        canvas.polyline(run, LINE_COLOR, stroke_w);
    }

    if style.markers {
        let radius = marker_radius(values.len());
        for run in &runs {
            for (x, y) in run {
                canvas.circle(*x, *y, radius, MARKER_COLOR);
            }
        }
    }

    canvas.finish()
}

/// Flat series get a symmetric band so the line sits mid-plot.
fn pad_range((min, max): (f64, f64)) -> (f64, f64) {
    if (max - min).abs() < f64::EPSILON {
        (min - 1.0, max + 1.0)
    } else {
        (min, max)
    }
}

fn marker_radius(samples: usize) -> f64 {
    match samples {
        0..=60 => 4.0,
        61..=400 => 2.5,
        401..=1500 => 1.5,
        _ => 0.9,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ChartSpec {
        ChartSpec::new("Series").with_axes("Sample", "Value")
    }

    #[test]
    fn markers_are_drawn_after_the_line() {
        let style = LineStyle {
            y_range: Some((0.0, 1.0)),
            markers: true,
        };
        let svg = markup(&[0.0, 0.5, 1.0], &spec(), style, 600, 300);
        let line_at = svg.find("<polyline").unwrap();
        let marker_at = svg.find("<circle").unwrap();
        assert!(marker_at > line_at);
        assert_eq!(svg.matches("<circle").count(), 3);
    }

    #[test]
    fn gaps_split_the_polyline() {
        let values = [1.0, 2.0, f64::NAN, 3.0, 4.0];
        let svg = markup(&values, &spec(), LineStyle::default(), 600, 300);
        assert_eq!(svg.matches("<polyline").count(), 2);
    }

    #[test]
    fn flat_series_still_renders() {
        let svg = markup(&[5.0; 10], &spec(), LineStyle::default(), 600, 300);
        assert!(svg.contains("<polyline"));
    }
}
