//! Short-time power spectrum of one channel, the input for the heatmap.
//!
//! A Hann-windowed DFT is evaluated per frame; the bin count stays small
//! (`window / 2`) so a direct DFT is cheap enough at the sample cap.

use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumConfig {
    pub window: usize,
    pub hop: usize,
    pub sample_rate_hz: f64,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            window: 128,
            hop: 32,
            sample_rate_hz: 125.0,
        }
    }
}

/// Power in dB, `power_db[bin][frame]`; row 0 is the lowest frequency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spectrogram {
    pub power_db: Vec<Vec<f64>>,
    pub frequencies_hz: Vec<f64>,
    pub frame_times_s: Vec<f64>,
}

impl Spectrogram {
    pub fn is_empty(&self) -> bool {
        self.power_db.is_empty() || self.frame_times_s.is_empty()
    }
}

const MIN_WINDOW: usize = 8;
const POWER_FLOOR: f64 = 1e-12;

pub fn spectrogram(samples: &[f64], config: SpectrumConfig) -> Spectrogram {
    let window = effective_window(samples.len(), config.window);
    if window < MIN_WINDOW {
        return Spectrogram::default();
    }
    let hop = config.hop.clamp(1, window);
    let bins = window / 2;
    let taper = hann(window);

    let mut power_db = vec![Vec::new(); bins];
    let mut frame_times_s = Vec::new();

    let mut start = 0;
    while start + window <= samples.len() {
        let frame = &samples[start..start + window];
        let mean = frame.iter().filter(|v| v.is_finite()).sum::<f64>() / window as f64;

        for (bin, row) in power_db.iter_mut().enumerate() {
            let (mut re, mut im) = (0.0, 0.0);
            for (n, (value, weight)) in frame.iter().zip(&taper).enumerate() {
                let centered = if value.is_finite() { value - mean } else { 0.0 };
                let phase = 2.0 * PI * bin as f64 * n as f64 / window as f64;
                re += centered * weight * phase.cos();
                im -= centered * weight * phase.sin();
            }
            let power = (re * re + im * im) / window as f64;
            row.push(10.0 * power.max(POWER_FLOOR).log10());
        }

        frame_times_s.push((start + window / 2) as f64 / config.sample_rate_hz);
        start += hop;
    }

    let frequencies_hz = (0..bins)
        .map(|bin| bin as f64 * config.sample_rate_hz / window as f64)
        .collect();

    Spectrogram {
        power_db,
        frequencies_hz,
        frame_times_s,
    }
}

/// Shrink the window to the largest power of two that fits short recordings.
fn effective_window(len: usize, requested: usize) -> usize {
    let requested = requested.max(MIN_WINDOW);
    if len >= requested {
        return requested;
    }
    if len < MIN_WINDOW {
        return 0;
    }
    1 << (usize::BITS - 1 - len.leading_zeros())
}

fn hann(len: usize) -> Vec<f64> {
    if len < 2 {
        return vec![1.0; len];
    }
    (0..len)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f64 / (len - 1) as f64).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_tone_peaks_at_its_bin() {
        let rate = 128.0;
        let samples: Vec<f64> = (0..512)
            .map(|n| (2.0 * PI * 16.0 * n as f64 / rate).sin())
            .collect();
        let spec = spectrogram(
            &samples,
            SpectrumConfig {
                window: 64,
                hop: 32,
                sample_rate_hz: rate,
            },
        );

        assert_eq!(spec.power_db.len(), 32);
        assert_eq!(spec.frame_times_s.len(), (512 - 64) / 32 + 1);

        let frame = 3;
        let peak_bin = (0..spec.power_db.len())
            .max_by(|a, b| spec.power_db[*a][frame].total_cmp(&spec.power_db[*b][frame]))
            .unwrap();
        assert!((spec.frequencies_hz[peak_bin] - 16.0).abs() < 1e-9);
    }

    #[test]
    fn too_short_input_gives_empty_matrix() {
        assert!(spectrogram(&[1.0, 2.0, 3.0], SpectrumConfig::default()).is_empty());
    }

    #[test]
    fn short_input_shrinks_window() {
        let samples = vec![0.5; 40];
        let spec = spectrogram(&samples, SpectrumConfig::default());
        assert_eq!(spec.power_db.len(), 16);
        assert!(!spec.is_empty());
        assert!(spec.power_db.iter().flatten().all(|v| v.is_finite()));
    }
}
