//! Summary statistics per channel, used by the channel overview bar chart.

use serde::Serialize;

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct ChannelSummary {
    pub mean: f64,
    pub sd: f64,
    pub rms: f64,
}

impl ChannelSummary {
    pub fn from_samples(values: &[f64]) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return Self::default();
        }

        let mean_value = mean(&finite);

        Self {
            mean: mean_value,
            sd: std_dev(&finite, mean_value),
            rms: rms(&finite),
        }
    }
}

pub fn summarize(channels: &[Vec<f64>]) -> Vec<ChannelSummary> {
    channels
        .iter()
        .map(|channel| ChannelSummary::from_samples(channel))
        .collect()
}

fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        0.0
    } else {
        data.iter().sum::<f64>() / data.len() as f64
    }
}

fn rms(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    (data.iter().map(|v| v * v).sum::<f64>() / data.len() as f64).sqrt()
}

fn std_dev(data: &[f64], mean: f64) -> f64 {
    let n = data.len();
    if n < 2 {
        return 0.0;
    }
    let variance = data
        .iter()
        .map(|value| {
            let diff = value - mean;
            diff * diff
        })
        .sum::<f64>()
        / (n as f64 - 1.0);
    variance.sqrt()
}
