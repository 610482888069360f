use rand::{rngs::StdRng, Rng, SeedableRng};
use report::config::IngestConfig;
use report::signal::stats::summarize;
use report::signal::{normalize, parse, SignalIngestor};
use report::{Error, Stage};

fn header() -> String {
    (0..29).map(|n| format!("%OpenBCI header {n}\n")).collect()
}

fn row(index: usize, values: &[f64]) -> String {
    let cells: Vec<String> = values.iter().map(|v| format!("{v}")).collect();
    format!("{index}, {}, 0.0, 0.0\n", cells.join(", "))
}

#[test]
fn twenty_five_rows_give_twenty_five_samples_per_channel() {
    let mut raw = header();
    for i in 0..25 {
        raw.push_str(&row(i, &[i as f64; 16]));
    }
    let parsed = parse(&raw).unwrap();
    assert_eq!(parsed.sample_count(), 25);
    assert_eq!(parsed.channel_count(), 16);
    assert!(parsed.channels.iter().all(|channel| channel.len() == 25));
    assert!(parsed.stats.is_clean());
}

#[test]
fn noisy_dump_normalizes_into_unit_range() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut raw = header();
    for i in 0..500 {
        let values: Vec<f64> = (0..16).map(|_| rng.gen_range(-200.0..200.0)).collect();
        raw.push_str(&row(i, &values));
        if i % 50 == 0 {
            raw.push_str("% marker\n\n");
        }
    }

    let parsed = parse(&raw).unwrap();
    assert_eq!(parsed.sample_count(), 500);
    assert_eq!(parsed.stats.comment_lines, 10);
    assert_eq!(parsed.stats.blank_lines, 10);

    let normalized = normalize(&parsed.channels);
    for channel in &normalized {
        assert!(channel.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(channel.iter().any(|v| *v == 0.0));
        assert!(channel.iter().any(|v| *v == 1.0));
    }
    let summaries = summarize(&normalized);
    assert_eq!(summaries.len(), 16);
}

#[test]
fn oversized_dump_stops_at_sample_cap() {
    let config = IngestConfig {
        sample_cap: 100,
        ..IngestConfig::default()
    };
    let mut raw = header();
    for i in 0..1000 {
        raw.push_str(&row(i, &[1.0; 16]));
    }
    let parsed = SignalIngestor::new(config).parse(&raw).unwrap();
    assert_eq!(parsed.sample_count(), 100);
    assert!(parsed.stats.cap_reached);
}

#[test]
fn header_only_dump_is_empty_signal() {
    let err = parse(&header()).unwrap_err();
    assert!(matches!(
        err,
        Error::EmptySignal {
            stage: Stage::Ingest
        }
    ));
}

#[test]
fn garbled_value_is_dropped_from_its_channel_only() {
    let mut raw = header();
    raw.push_str(&row(0, &[1.0; 16]));
    raw.push_str("1, x, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2\n");
    let parsed = parse(&raw).unwrap();
    assert_eq!(parsed.sample_count(), 2);
    assert_eq!(parsed.channels[0].len(), 1);
    assert_eq!(parsed.channels[1].len(), 2);
    assert_eq!(parsed.stats.omitted_values, 1);
    assert!(!parsed.is_aligned());
}
