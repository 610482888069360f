//! Per-channel min-max scaling into `[0, 1]`.

/// Normalize every channel independently. Pure; safe to call repeatedly.
pub fn normalize(channels: &[Vec<f64>]) -> Vec<Vec<f64>> {
    channels.iter().map(|channel| normalize_channel(channel)).collect()
}

/// `(v - min) / (max - min)` for one channel.
///
/// A channel with zero range maps to all zeros. Non-finite samples are
/// ignored when finding the range and map to zero.
pub fn normalize_channel(values: &[f64]) -> Vec<f64> {
    let Some((min, max)) = finite_range(values) else {
        return vec![0.0; values.len()];
    };
    let range = max - min;
    if range <= 0.0 || !range.is_finite() {
        return vec![0.0; values.len()];
    }

    values
        .iter()
        .map(|value| {
            if value.is_finite() {
                ((value - min) / range).clamp(0.0, 1.0)
            } else {
                0.0
            }
        })
        .collect()
}

/// Min and max over finite values, `None` when there are none.
pub fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|value| value.is_finite())
        .fold(None, |acc, value| match acc {
            None => Some((value, value)),
            Some((min, max)) => Some((min.min(value), max.max(value))),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_channel_normalizes_to_zeros() {
        assert_eq!(normalize_channel(&[5.0, 5.0, 5.0, 5.0]), vec![0.0; 4]);
    }

    #[test]
    fn values_land_in_unit_range() {
        let channels = vec![
            vec![-120.5, 30.0, 4.25, 1e6, -3.0],
            vec![0.001, 0.002, 0.0015],
            vec![7.0],
            Vec::new(),
        ];
        for channel in normalize(&channels) {
            for value in channel {
                assert!((0.0..=1.0).contains(&value), "value {value} out of range");
            }
        }
    }

    #[test]
    fn extremes_map_to_bounds() {
        let normalized = normalize_channel(&[2.0, 4.0, 6.0]);
        assert_eq!(normalized, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn unit_range_input_is_unchanged() {
        let input = vec![0.0, 0.25, 0.5, 0.75, 1.0, 0.1];
        let output = normalize_channel(&input);
        for (a, b) in input.iter().zip(&output) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn normalizing_twice_is_stable() {
        let once = normalize_channel(&[3.0, -1.0, 8.0, 2.5]);
        let twice = normalize_channel(&once);
        for (a, b) in once.iter().zip(&twice) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn non_finite_samples_do_not_poison_channel() {
        let normalized = normalize_channel(&[1.0, f64::NAN, 3.0, f64::INFINITY]);
        assert_eq!(normalized, vec![0.0, 0.0, 1.0, 0.0]);
    }
}
