//! End-to-end report assembly.
//!
//! A report is always three pages:
//!
//! 1. Assessment summary: identification, scores, vitals, score charts.
//! 2. Signal analysis: ingest quality, waveform, channel overview, spectrum.
//! 3. Recommendation: free text plus any attached images.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::assessment::{score_band, AssessmentResult, SCORE_DOMAIN};
use crate::charts::{
    ChartArtifact, ChartData, ChartKind, ChartRenderer, ChartSpec, NamedSeries, WaveformRenderer,
};
use crate::config::ReportConfig;
use crate::core::format::{format_number, format_score, MISSING};
use crate::export::delivery::timestamp_slug;
use crate::export::{Delivery, DeliverySink, DocumentExporter};
use crate::layout::{PageComposer, PageSpec, RenderedPage};
use crate::signal::spectrum::{spectrogram, SpectrumConfig};
use crate::signal::stats::summarize;
use crate::signal::{normalize, ParsedSignal, RawSignalRecord, SignalIngestor};
use crate::sources::{AssessmentSource, SignalSource};
use crate::Result;

pub const PAGE_HEADERS: [&str; 3] = ["Assessment summary", "Signal analysis", "Recommendation"];

/// Which raw signal file belongs to the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalRef {
    pub subject_id: String,
    pub filename: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReportRequest {
    pub assessment_id: String,
    /// Fetched alongside the assessment when known up front; otherwise the
    /// assessment's own `signal_file` is used.
    pub signal: Option<SignalRef>,
    /// Finished images from an external store, shown on the last page.
    pub attachments: Vec<ChartArtifact>,
    /// Output name; defaults to `report-<subject>-<timestamp>.pdf`.
    pub filename: Option<String>,
}

impl ReportRequest {
    pub fn new(assessment_id: impl Into<String>) -> Self {
        Self {
            assessment_id: assessment_id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct PreparedReport {
    pub assessment: AssessmentResult,
    pub pages: Vec<PageSpec>,
}

pub struct ReportPipeline<A, S> {
    assessments: A,
    signals: S,
    config: ReportConfig,
    charts: ChartRenderer,
    spectrum: SpectrumConfig,
}

impl<A: AssessmentSource, S: SignalSource> ReportPipeline<A, S> {
    pub fn new(assessments: A, signals: S, config: ReportConfig) -> Self {
        Self {
            assessments,
            signals,
            config,
            charts: ChartRenderer::default(),
            spectrum: SpectrumConfig::default(),
        }
    }

    pub fn with_renderer(mut self, charts: ChartRenderer) -> Self {
        self.charts = charts;
        self
    }

    pub fn with_spectrum(mut self, spectrum: SpectrumConfig) -> Self {
        self.spectrum = spectrum;
        self
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Fetch inputs and build the page specs.
    pub async fn prepare(&self, request: ReportRequest) -> Result<PreparedReport> {
        let (assessment, raw) = match &request.signal {
            Some(signal) => {
                let (assessment, raw) = futures::try_join!(
                    self.assessments.assessment(&request.assessment_id),
                    self.signals.signal(&signal.subject_id, &signal.filename),
                )?;
                (assessment, Some(raw))
            }
            None => {
                let assessment = self.assessments.assessment(&request.assessment_id).await?;
                let raw = match assessment.signal_file.as_deref() {
                    Some(file) => Some(self.signals.signal(&assessment.subject_id, file).await?),
                    None => None,
                };
                (assessment, raw)
            }
        };
        debug!(
            assessment = %assessment.id,
            signal = raw.as_ref().map(|r| r.filename.as_str()).unwrap_or(MISSING),
            "inputs fetched"
        );

        let builder = PageBuilder {
            config: &self.config,
            charts: &self.charts,
            spectrum: self.spectrum,
        };
        let pages = builder.build(&assessment, raw.as_ref(), request.attachments)?;
        Ok(PreparedReport { assessment, pages })
    }

    pub fn compose(&self, pages: &[PageSpec]) -> Vec<RenderedPage> {
        PageComposer::new(self.config.page).compose(pages)
    }

    /// Fetch, build, compose and export one report into `sink`.
    pub async fn generate<D: DeliverySink>(
        &self,
        request: ReportRequest,
        sink: &D,
        cancel: CancellationToken,
    ) -> Result<Delivery> {
        let filename = request.filename.clone();
        let prepared = self.prepare(request).await?;
        let filename = filename.unwrap_or_else(|| default_filename(&prepared.assessment));
        let rendered = self.compose(&prepared.pages);

        let exporter = DocumentExporter::new(&self.config.export).with_cancellation(cancel);
        let delivery = exporter.export(&rendered, &filename, sink).await?;
        info!(
            assessment = %prepared.assessment.id,
            pages = rendered.len(),
            file = %delivery.filename,
            "report generated"
        );
        Ok(delivery)
    }
}

/// Builds the three page specs from already fetched inputs.
pub struct PageBuilder<'a> {
    pub config: &'a ReportConfig,
    pub charts: &'a ChartRenderer,
    pub spectrum: SpectrumConfig,
}

impl PageBuilder<'_> {
    pub fn build(
        &self,
        assessment: &AssessmentResult,
        raw: Option<&RawSignalRecord>,
        attachments: Vec<ChartArtifact>,
    ) -> Result<Vec<PageSpec>> {
        let parsed = raw
            .map(|record| SignalIngestor::new(self.config.ingest.clone()).parse_bytes(&record.payload))
            .transpose()?;
        if let Some(parsed) = &parsed {
            debug!(
                samples = parsed.sample_count(),
                channels = parsed.channel_count(),
                quality = %parsed.stats.summary(),
                "signal ingested"
            );
        }

        Ok(vec![
            self.summary_page(assessment),
            self.signal_page(raw, parsed.as_ref()),
            recommendation_page(assessment, attachments),
        ])
    }

    fn summary_page(&self, assessment: &AssessmentResult) -> PageSpec {
        let composite = assessment.composite_score();
        let radial = self.charts.render(
            ChartKind::Radial,
            &ChartData::Radial {
                axes: assessment.scores.radial_axes(),
                domain: SCORE_DOMAIN,
            },
            &ChartSpec::new("Score profile"),
        );
        let (categories, values): (Vec<String>, Vec<f64>) = assessment
            .scores
            .labelled()
            .into_iter()
            .map(|(label, value)| (label.to_string(), value))
            .unzip();
        let bars = self.charts.render(
            ChartKind::GroupedBar,
            &ChartData::Grouped {
                categories,
                series: vec![NamedSeries::new("Score", values)],
            },
            &ChartSpec::new("Sub-scores").with_axes("", "Score"),
        );

        let mut page = PageSpec::new(PAGE_HEADERS[0])
            .notes(format!(
                "Overall: {} ({}).",
                score_band(composite),
                format_score(composite)
            ))
            .artifact(radial)
            .artifact(bars)
            .columns(1);
        page.fields = assessment.summary_fields();
        page.fields.extend(assessment.vitals.fields());
        page
    }

    fn signal_page(&self, raw: Option<&RawSignalRecord>, parsed: Option<&ParsedSignal>) -> PageSpec {
        let page = PageSpec::new(PAGE_HEADERS[1]).columns(1);
        let Some(parsed) = parsed else {
            return page
                .field("Source file", MISSING)
                .notes("No signal recording is attached to this assessment.")
                .artifacts(self.signal_charts(&[], &[]));
        };

        let duration_s = parsed.sample_count() as f64 / self.spectrum.sample_rate_hz;
        let mut page = page
            .field(
                "Source file",
                raw.map(|r| r.filename.as_str()).unwrap_or(MISSING),
            )
            .field("Samples", parsed.sample_count().to_string())
            .field("Channels", parsed.channel_count().to_string())
            .field("Duration", format!("{} s", format_number(duration_s, 1)))
            .field("Parse quality", parsed.stats.summary())
            .field("Skipped lines", parsed.stats.skipped_lines().to_string());
        if !parsed.is_aligned() {
            page = page.notes(format!(
                "{} channel values could not be read and were left out; affected channels are shorter than the time axis.",
                parsed.stats.omitted_values
            ));
        }
        page.artifacts(self.signal_charts(&parsed.channels, &normalize(&parsed.channels)))
    }

    /// Waveform of the first channel, per-channel overview and spectrum.
    fn signal_charts(&self, raw: &[Vec<f64>], normalized: &[Vec<f64>]) -> Vec<ChartArtifact> {
        let first = normalized.first().map(Vec::as_slice).unwrap_or(&[]);
        let waveform = WaveformRenderer::new(self.charts.clone()).render("channel 1", first);

        let summaries = summarize(normalized);
        let categories: Vec<String> = (1..=summaries.len()).map(|n| format!("Ch{n}")).collect();
        let overview = self.charts.render(
            ChartKind::GroupedBar,
            &ChartData::Grouped {
                categories,
                series: vec![
                    NamedSeries::new("Mean", summaries.iter().map(|s| s.mean).collect()),
                    NamedSeries::new("SD", summaries.iter().map(|s| s.sd).collect()),
                    NamedSeries::new("RMS", summaries.iter().map(|s| s.rms).collect()),
                ],
            },
            &ChartSpec::new("Channel overview (normalized)").with_axes("Channel", "Level"),
        );

        let spectrum = spectrogram(raw.first().map(Vec::as_slice).unwrap_or(&[]), self.spectrum);
        let x_max = spectrum.frame_times_s.last().copied().unwrap_or(1.0);
        let y_max = spectrum.frequencies_hz.last().copied().unwrap_or(1.0);
        let heatmap = self.charts.render(
            ChartKind::Heatmap,
            &ChartData::Matrix {
                values: spectrum.power_db,
                x_range: (0.0, x_max),
                y_range: (0.0, y_max),
            },
            &ChartSpec::new("Spectrum, channel 1 (dB)").with_axes("Time (s)", "Frequency (Hz)"),
        );

        vec![waveform, overview, heatmap]
    }
}

fn recommendation_page(assessment: &AssessmentResult, attachments: Vec<ChartArtifact>) -> PageSpec {
    let text = assessment.recommendation.trim();
    PageSpec::new(PAGE_HEADERS[2])
        .field("Subject", assessment.subject_label())
        .field("Session", assessment.session_id.clone())
        .field("Composite", format_score(assessment.composite_score()))
        .field("Attachments", attachments.len().to_string())
        .notes(if text.is_empty() {
            "No recommendation provided."
        } else {
            text
        })
        .artifacts(attachments)
        .columns(2)
}

/// `report-<subject>-<YYYYMMDD_HHMMSS>.pdf`, with the subject reduced to
/// file-name-safe characters.
pub fn default_filename(assessment: &AssessmentResult) -> String {
    let subject: String = assessment
        .subject_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("report-{subject}-{}.pdf", timestamp_slug())
}
