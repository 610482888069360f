//! Formatting helpers for presenting values on report pages and chart axes.

/// Placeholder shown for missing or non-finite values.
pub const MISSING: &str = "—";

pub fn format_number(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return MISSING.to_string();
    }
    format!("{value:.decimals$}")
}

pub fn format_percent(fraction: f64) -> String {
    if !fraction.is_finite() {
        return MISSING.to_string();
    }
    format!("{:.0}%", fraction * 100.0)
}

pub fn format_score(value: f64) -> String {
    if !value.is_finite() {
        return MISSING.to_string();
    }
    format!("{value:.0} / 100")
}

pub fn format_optional(value: Option<f64>, decimals: usize, unit: &str) -> String {
    match value {
        Some(v) if v.is_finite() => {
            let number = format_number(v, decimals);
            if unit.is_empty() {
                number
            } else {
                format!("{number} {unit}")
            }
        }
        _ => MISSING.to_string(),
    }
}

/// Compact tick label: integers without decimals, small ranges with two.
pub fn format_tick(value: f64) -> String {
    if !value.is_finite() {
        return MISSING.to_string();
    }
    if value.fract().abs() < 1e-9 && value.abs() < 1e6 {
        format!("{value:.0}")
    } else if value.abs() >= 100.0 {
        format!("{value:.0}")
    } else if value.abs() >= 10.0 {
        format!("{value:.1}")
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_values_render_as_dash() {
        assert_eq!(format_number(f64::NAN, 2), MISSING);
        assert_eq!(format_percent(f64::INFINITY), MISSING);
        assert_eq!(format_optional(None, 1, "bpm"), MISSING);
    }

    #[test]
    fn ticks_pick_precision_by_magnitude() {
        assert_eq!(format_tick(3000.0), "3000");
        assert_eq!(format_tick(0.5), "0.50");
        assert_eq!(format_tick(12.34), "12.3");
        assert_eq!(format_tick(-40.0), "-40");
    }

    #[test]
    fn optional_values_carry_units() {
        assert_eq!(format_optional(Some(72.0), 0, "bpm"), "72 bpm");
        assert_eq!(format_optional(Some(36.54), 1, ""), "36.5");
    }
}
