//! Color ramps for heatmaps.
//!
//! A ramp maps `t ∈ [0, 1]` to a color. Any implementation must be monotonic
//! in perceived lightness and stay within the 8-bit range; exact hues are
//! free to change.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    /// Relative luminance (Rec. 709 weights) on the 0–255 scale.
    pub fn luminance(&self) -> f64 {
        0.2126 * self.0 as f64 + 0.7152 * self.1 as f64 + 0.0722 * self.2 as f64
    }
}

pub trait ColorRamp: Send + Sync {
    fn color(&self, t: f64) -> Rgb;
}

/// Viridis-like ramp, piecewise linear through five anchor colors.
#[derive(Clone, Copy, Debug, Default)]
pub struct Viridis;

const VIRIDIS_STOPS: [(u8, u8, u8); 5] = [
    (68, 1, 84),
    (59, 82, 139),
    (33, 145, 140),
    (94, 201, 98),
    (253, 231, 37),
];

impl ColorRamp for Viridis {
    fn color(&self, t: f64) -> Rgb {
        interpolate(&VIRIDIS_STOPS, t)
    }
}

/// Dark to light gray, useful for print-only reports.
#[derive(Clone, Copy, Debug, Default)]
pub struct Grayscale;

impl ColorRamp for Grayscale {
    fn color(&self, t: f64) -> Rgb {
        interpolate(&[(24, 24, 24), (245, 245, 245)], t)
    }
}

fn interpolate(stops: &[(u8, u8, u8)], t: f64) -> Rgb {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    if stops.len() == 1 {
        let (r, g, b) = stops[0];
        return Rgb(r, g, b);
    }
    let segments = (stops.len() - 1) as f64;
    let position = t * segments;
    let idx = (position.floor() as usize).min(stops.len() - 2);
    let local = position - idx as f64;
    let (a, b) = (stops[idx], stops[idx + 1]);
    let mix = |from: u8, to: u8| (from as f64 + (to as f64 - from as f64) * local).round() as u8;
    Rgb(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// Whole-matrix min-max scaling over finite cells.
pub fn matrix_range(matrix: &[Vec<f64>]) -> Option<(f64, f64)> {
    matrix
        .iter()
        .flatten()
        .copied()
        .filter(|value| value.is_finite())
        .fold(None, |acc, value| match acc {
            None => Some((value, value)),
            Some((min, max)) => Some((min.min(value), max.max(value))),
        })
}

pub fn unit_value(value: f64, (min, max): (f64, f64)) -> f64 {
    let span = max - min;
    if span <= 0.0 || !span.is_finite() {
        0.0
    } else {
        ((value - min) / span).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_monotonic(ramp: &dyn ColorRamp) {
        let mut previous = f64::NEG_INFINITY;
        for step in 0..=200 {
            let luminance = ramp.color(step as f64 / 200.0).luminance();
            assert!(
                luminance + 0.75 >= previous,
                "luminance dropped at step {step}: {luminance} < {previous}"
            );
            previous = previous.max(luminance);
        }
    }

    #[test]
    fn viridis_is_monotonic_in_luminance() {
        assert_monotonic(&Viridis);
    }

    #[test]
    fn grayscale_is_monotonic_in_luminance() {
        assert_monotonic(&Grayscale);
    }

    #[test]
    fn out_of_range_inputs_clamp_to_ends() {
        assert_eq!(Viridis.color(-3.0), Viridis.color(0.0));
        assert_eq!(Viridis.color(7.0), Viridis.color(1.0));
        assert_eq!(Viridis.color(f64::NAN), Viridis.color(0.0));
        assert_eq!(Viridis.color(1.0), Rgb(253, 231, 37));
    }

    #[test]
    fn matrix_range_skips_non_finite() {
        let matrix = vec![vec![1.0, f64::NAN], vec![-2.0, 5.0]];
        assert_eq!(matrix_range(&matrix), Some((-2.0, 5.0)));
        assert_eq!(matrix_range(&[]), None);
        assert_eq!(unit_value(5.0, (5.0, 5.0)), 0.0);
    }
}
