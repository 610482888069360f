//! Radial (spider) charts over a fixed set of named axes.

use std::f64::consts::PI;

use crate::charts::svg::{Anchor, SvgCanvas, FRAME, GRID, INK, MUTED};
use crate::charts::{ChartSpec, RadialAxis};
use crate::core::format::format_tick;
use crate::render::fonts::FontWeight;

const FILL: &str = "#2563eb";

pub fn markup(
    axes: &[RadialAxis],
    domain: (f64, f64),
    spec: &ChartSpec,
    width: u32,
    height: u32,
) -> String {
    let mut canvas = SvgCanvas::new(width as f64, height as f64);
    canvas.text(
        28.0,
        34.0,
        &spec.title,
        22.0,
        Anchor::Start,
        FontWeight::SemiBold,
        INK,
    );

    let cx = canvas.width() / 2.0;
    let cy = canvas.height() / 2.0 + 18.0;
    let radius = (canvas.width().min(canvas.height()) / 2.0 - 96.0).max(20.0);
    let count = axes.len().max(1);

    let vertex = |idx: usize, fraction: f64| {
        let angle = -PI / 2.0 + 2.0 * PI * idx as f64 / count as f64;
        (
            cx + radius * fraction * angle.cos(),
            cy + radius * fraction * angle.sin(),
        )
    };

    for ring in 1..=4 {
        let fraction = ring as f64 / 4.0;
        let outline: Vec<(f64, f64)> = (0..count).map(|idx| vertex(idx, fraction)).collect();
        canvas.polygon(&outline, "none", 0.0, GRID);
        let label_value = domain.0 + (domain.1 - domain.0) * fraction;
        canvas.text(
            cx + 6.0,
            cy - radius * fraction + 14.0,
            &format_tick(label_value),
            12.0,
            Anchor::Start,
            FontWeight::Regular,
            MUTED,
        );
    }

    for (idx, axis) in axes.iter().enumerate() {
        let (x, y) = vertex(idx, 1.0);
        canvas.line(cx, cy, x, y, FRAME, 1.0);
        let (lx, ly) = vertex(idx, 1.16);
        let anchor = if (lx - cx).abs() < 4.0 {
            Anchor::Middle
        } else if lx > cx {
            Anchor::Start
        } else {
            Anchor::End
        };
        canvas.text(lx, ly + 6.0, &axis.label, 16.0, anchor, FontWeight::SemiBold, INK);
    }

    let shape: Vec<(f64, f64)> = axes
        .iter()
        .enumerate()
        .map(|(idx, axis)| vertex(idx, scaled(axis.value, domain)))
        .collect();
    canvas.polygon(&shape, FILL, 0.28, FILL);
    for (x, y) in &shape {
        canvas.circle(*x, *y, 4.0, FILL);
    }

    canvas.finish()
}

/// Position of `value` within the shared domain, clamped to `[0, 1]`.
/// Missing values collapse to the center.
pub fn scaled(value: f64, (min, max): (f64, f64)) -> f64 {
    let span = max - min;
    if !value.is_finite() || span <= 0.0 {
        return 0.0;
    }
    ((value - min) / span).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axes() -> Vec<RadialAxis> {
        vec![
            RadialAxis::new("Attention", 80.0),
            RadialAxis::new("Relaxation", 55.0),
            RadialAxis::new("Fatigue", 30.0),
            RadialAxis::new("Stress", 120.0),
        ]
    }

    #[test]
    fn values_are_clamped_to_domain() {
        assert_eq!(scaled(120.0, (0.0, 100.0)), 1.0);
        assert_eq!(scaled(-5.0, (0.0, 100.0)), 0.0);
        assert_eq!(scaled(f64::NAN, (0.0, 100.0)), 0.0);
        assert!((scaled(55.0, (0.0, 100.0)) - 0.55).abs() < 1e-12);
    }

    #[test]
    fn closed_polygon_and_one_label_per_axis() {
        let svg = markup(&axes(), (0.0, 100.0), &ChartSpec::new("Profile"), 640, 640);
        // Four grid rings plus the value shape.
        assert_eq!(svg.matches("<polygon").count(), 5);
        for axis in axes() {
            assert!(svg.contains(&axis.label));
        }
    }
}
