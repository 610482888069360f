//! Assessment results as delivered by the scoring backend.

use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime};

use crate::charts::RadialAxis;
use crate::core::format::{format_optional, format_score, MISSING};
use crate::error::Stage;
use crate::{Error, Result};

/// Shared 0–100 domain of every sub-score.
pub const SCORE_DOMAIN: (f64, f64) = (0.0, 100.0);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub attention: f64,
    pub relaxation: f64,
    pub fatigue: f64,
    pub stress: f64,
}

impl SubScores {
    pub fn labelled(&self) -> [(&'static str, f64); 4] {
        [
            ("Attention", self.attention),
            ("Relaxation", self.relaxation),
            ("Fatigue", self.fatigue),
            ("Stress", self.stress),
        ]
    }

    pub fn radial_axes(&self) -> Vec<RadialAxis> {
        self.labelled()
            .into_iter()
            .map(|(label, value)| RadialAxis::new(label, value))
            .collect()
    }

    /// Unweighted wellbeing index: fatigue and stress count inversely.
    pub fn composite(&self) -> f64 {
        let parts = [
            self.attention,
            self.relaxation,
            100.0 - self.fatigue,
            100.0 - self.stress,
        ];
        let finite: Vec<f64> = parts.into_iter().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return f64::NAN;
        }
        (finite.iter().sum::<f64>() / finite.len() as f64).clamp(SCORE_DOMAIN.0, SCORE_DOMAIN.1)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vitals {
    pub heart_rate_bpm: Option<f64>,
    pub spo2_percent: Option<f64>,
    pub systolic_mmhg: Option<f64>,
    pub diastolic_mmhg: Option<f64>,
    pub temperature_c: Option<f64>,
}

impl Vitals {
    pub fn is_empty(&self) -> bool {
        *self == Vitals::default()
    }

    pub fn blood_pressure(&self) -> String {
        match (self.systolic_mmhg, self.diastolic_mmhg) {
            (Some(sys), Some(dia)) if sys.is_finite() && dia.is_finite() => {
                format!("{sys:.0}/{dia:.0} mmHg")
            }
            _ => MISSING.to_string(),
        }
    }

    pub fn fields(&self) -> Vec<(String, String)> {
        vec![
            (
                "Heart rate".into(),
                format_optional(self.heart_rate_bpm, 0, "bpm"),
            ),
            ("SpO2".into(), format_optional(self.spo2_percent, 0, "%")),
            ("Blood pressure".into(), self.blood_pressure()),
            (
                "Temperature".into(),
                format_optional(self.temperature_c, 1, "°C"),
            ),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub id: String,
    pub subject_id: String,
    #[serde(default)]
    pub subject_name: Option<String>,
    pub session_id: String,
    /// RFC 3339 time the recording was made.
    pub recorded_at: String,
    /// RFC 3339 time scoring finished.
    #[serde(default)]
    pub assessed_at: Option<String>,
    pub scores: SubScores,
    /// Backend composite; derived from the sub-scores when absent.
    #[serde(default)]
    pub composite: Option<f64>,
    #[serde(default)]
    pub vitals: Vitals,
    #[serde(default)]
    pub recommendation: String,
    /// Raw signal file for this session, relative to the subject's folder.
    #[serde(default)]
    pub signal_file: Option<String>,
}

impl AssessmentResult {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|err| Error::Source {
            stage: Stage::Fetch,
            message: format!("invalid assessment record: {err}"),
        })
    }

    pub fn composite_score(&self) -> f64 {
        self.composite
            .filter(|v| v.is_finite())
            .unwrap_or_else(|| self.scores.composite())
    }

    pub fn recorded_time(&self) -> Option<OffsetDateTime> {
        parse_rfc3339(&self.recorded_at)
    }

    pub fn subject_label(&self) -> String {
        match self.subject_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => format!("{name} ({})", self.subject_id),
            _ => self.subject_id.clone(),
        }
    }

    /// Identification and score fields for the summary page.
    pub fn summary_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("Subject".to_string(), self.subject_label()),
            ("Session".to_string(), self.session_id.clone()),
            ("Recorded".to_string(), format_timestamp(&self.recorded_at)),
            (
                "Assessed".to_string(),
                self.assessed_at
                    .as_deref()
                    .map(format_timestamp)
                    .unwrap_or_else(|| MISSING.to_string()),
            ),
            ("Composite".to_string(), format_score(self.composite_score())),
            ("Assessment".to_string(), self.id.clone()),
        ];
        fields.extend(
            self.scores
                .labelled()
                .into_iter()
                .map(|(label, value)| (label.to_string(), format_score(value))),
        );
        fields
    }
}

fn parse_rfc3339(raw: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339).ok()
}

/// `2025-03-14 · 09:30 UTC` for RFC 3339 input; otherwise the date part and
/// `HH:MM` are cut out of the raw text as-is.
pub fn format_timestamp(raw: &str) -> String {
    if let Some(parsed) = parse_rfc3339(raw) {
        let utc = parsed.to_offset(time::UtcOffset::UTC);
        let date = utc.format(&format_description!("[year]-[month]-[day]"));
        let clock = utc.format(&format_description!("[hour]:[minute]"));
        if let (Ok(date), Ok(clock)) = (date, clock) {
            return format!("{date} · {clock} UTC");
        }
    }

    let raw = raw.trim();
    if raw.is_empty() {
        return MISSING.to_string();
    }
    let (date, time_segment) = raw.split_once('T').unwrap_or((raw, ""));
    let clock: String = time_segment
        .split(['.', 'Z', '+'])
        .next()
        .unwrap_or(time_segment)
        .chars()
        .take(5)
        .collect();
    if clock.is_empty() {
        date.to_string()
    } else {
        format!("{date} · {clock}")
    }
}

/// Score band used in headlines.
pub fn score_band(score: f64) -> &'static str {
    match score {
        s if !s.is_finite() => "Unscored",
        s if s >= 75.0 => "Good",
        s if s >= 50.0 => "Fair",
        _ => "Needs attention",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "id": "a-17",
        "subject_id": "S001",
        "subject_name": "Ada",
        "session_id": "sess-3",
        "recorded_at": "2025-03-14T09:30:12+01:00",
        "scores": { "attention": 80, "relaxation": 60, "fatigue": 30, "stress": 50 },
        "vitals": { "heart_rate_bpm": 72, "systolic_mmhg": 118, "diastolic_mmhg": 76 },
        "recommendation": "Keep a regular sleep schedule."
    }"#;

    #[test]
    fn parses_minimal_record_with_defaults() {
        let record = AssessmentResult::from_json(SAMPLE).unwrap();
        assert_eq!(record.subject_label(), "Ada (S001)");
        assert_eq!(record.composite, None);
        assert_eq!(record.vitals.spo2_percent, None);
        assert!(record.signal_file.is_none());
        assert_eq!(
            record.recorded_time().map(|t| t.to_offset(time::UtcOffset::UTC).hour()),
            Some(8)
        );
    }

    #[test]
    fn composite_falls_back_to_sub_scores() {
        let record = AssessmentResult::from_json(SAMPLE).unwrap();
        // (80 + 60 + 70 + 50) / 4
        assert_eq!(record.composite_score(), 65.0);
        let mut explicit = record.clone();
        explicit.composite = Some(91.0);
        assert_eq!(explicit.composite_score(), 91.0);
    }

    #[test]
    fn vitals_render_missing_values_as_dash() {
        let record = AssessmentResult::from_json(SAMPLE).unwrap();
        let fields = record.vitals.fields();
        assert_eq!(fields[0].1, "72 bpm");
        assert_eq!(fields[1].1, MISSING);
        assert_eq!(fields[2].1, "118/76 mmHg");
    }

    #[test]
    fn timestamps_format_in_utc() {
        assert_eq!(
            format_timestamp("2025-03-14T09:30:12+01:00"),
            "2025-03-14 · 08:30 UTC"
        );
        assert_eq!(format_timestamp("2025-03-14T09:30"), "2025-03-14 · 09:30");
        assert_eq!(format_timestamp(""), MISSING);
    }

    #[test]
    fn malformed_json_is_a_fetch_error() {
        let err = AssessmentResult::from_json("{").unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Fetch));
    }

    #[test]
    fn summary_fields_include_every_sub_score() {
        let record = AssessmentResult::from_json(SAMPLE).unwrap();
        let fields = record.summary_fields();
        for label in ["Attention", "Relaxation", "Fatigue", "Stress"] {
            assert!(fields.iter().any(|(key, _)| key == label));
        }
        assert!(fields.iter().any(|(_, value)| value == "65 / 100"));
    }
}
