//! Grouped bar charts: one group per category, one bar per named series.

use crate::charts::svg::{draw_axes, Anchor, PlotArea, SvgCanvas, INK, MUTED};
use crate::charts::{ChartSpec, NamedSeries};
use crate::render::fonts::{self, FontWeight};

pub const PALETTE: [&str; 6] = [
    "#2563eb", "#f59e0b", "#10b981", "#ef4444", "#8b5cf6", "#0ea5e9",
];

pub fn markup(
    categories: &[String],
    series: &[NamedSeries],
    spec: &ChartSpec,
    width: u32,
    height: u32,
) -> String {
    let mut canvas = SvgCanvas::new(width as f64, height as f64);
    let area = PlotArea::inset(canvas.width(), canvas.height(), 0.0);

    let finite = series
        .iter()
        .flat_map(|s| s.values.iter().copied())
        .filter(|v| v.is_finite());
    let (lo, hi) = finite.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let y_range = if (hi - lo).abs() < f64::EPSILON {
        (lo, lo + 1.0)
    } else {
        (lo, hi * 1.08)
    };

    draw_axes(
        &mut canvas,
        area,
        &spec.title,
        None,
        (y_range, spec.y_label.as_str()),
    );

    let groups = categories.len().max(1) as f64;
    let group_w = area.width / groups;
    let bars = series.len().max(1) as f64;
    let bar_w = (group_w * 0.78) / bars;
    let baseline = area.y(0.0f64.clamp(y_range.0, y_range.1), y_range);

    for (cat_idx, category) in categories.iter().enumerate() {
        let group_left = area.left + group_w * cat_idx as f64 + group_w * 0.11;
        for (series_idx, named) in series.iter().enumerate() {
            let Some(value) = named.values.get(cat_idx).copied().filter(|v| v.is_finite()) else {
                continue;
            };
            let top = area.y(value, y_range);
            let x = group_left + bar_w * series_idx as f64;
            let color = PALETTE[series_idx % PALETTE.len()];
            canvas.rect(x, top.min(baseline), bar_w * 0.92, (baseline - top).abs(), color);
        }

        let label_size = if group_w < 48.0 { 12.0 } else { 14.0 };
        let label = fonts::truncate(category, label_size, FontWeight::Regular, group_w - 2.0);
        canvas.text(
            area.left + group_w * (cat_idx as f64 + 0.5),
            area.bottom() + 22.0,
            label,
            label_size,
            Anchor::Middle,
            FontWeight::Regular,
            MUTED,
        );
    }

    if !spec.x_label.is_empty() {
        canvas.text(
            area.left + area.width / 2.0,
            area.bottom() + 50.0,
            &spec.x_label,
            15.0,
            Anchor::Middle,
            FontWeight::Regular,
            MUTED,
        );
    }

    draw_legend(&mut canvas, area, series);
    canvas.finish()
}

/// Shared legend, right-aligned above the plot area.
fn draw_legend(canvas: &mut SvgCanvas, area: PlotArea, series: &[NamedSeries]) {
    let mut right = area.right();
    for (idx, named) in series.iter().enumerate().rev() {
        let label_w = fonts::text_width(&named.name, 14.0, FontWeight::Regular);
        let x = right - label_w;
        canvas.text(x, 40.0, &named.name, 14.0, Anchor::Start, FontWeight::Regular, INK);
        canvas.rect(x - 20.0, 29.0, 14.0, 14.0, PALETTE[idx % PALETTE.len()]);
        right = x - 36.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_one_bar_per_finite_value_and_legend_swatch() {
        let categories = vec!["Fp1".to_string(), "Fp2".to_string()];
        let series = vec![
            NamedSeries::new("Mean", vec![0.4, 0.6]),
            NamedSeries::new("SD", vec![0.1, f64::NAN]),
        ];
        let svg = markup(&categories, &series, &ChartSpec::new("Channels"), 800, 400);
        for color in &PALETTE[..2] {
            assert!(svg.contains(color));
        }
        // Background + legend swatches + three bars.
        let bars = svg.matches("<rect").count() - svg.matches("fill='none'").count();
        assert_eq!(bars, 1 + 2 + 3);
    }

    #[test]
    fn negative_values_hang_below_baseline() {
        let categories = vec!["A".to_string()];
        let series = vec![NamedSeries::new("delta", vec![-2.0])];
        let svg = markup(&categories, &series, &ChartSpec::new("Delta"), 400, 300);
        assert!(svg.contains("#2563eb"));
    }
}
