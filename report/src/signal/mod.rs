//! Raw signal ingestion and numeric preparation.

pub mod ingest;
pub mod normalize;
pub mod spectrum;
pub mod stats;

pub use ingest::{parse, parse_bytes, IngestStats, ParsedSignal, SignalIngestor};
pub use normalize::{normalize, normalize_channel};

use serde::{Deserialize, Serialize};

/// One raw signal dump as fetched from the signal store. Lives for a single request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawSignalRecord {
    pub subject_id: String,
    pub filename: String,
    #[serde(with = "payload_text")]
    pub payload: Vec<u8>,
}

impl RawSignalRecord {
    pub fn new(subject_id: impl Into<String>, filename: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            subject_id: subject_id.into(),
            filename: filename.into(),
            payload,
        }
    }
}

/// Payloads travel as text in JSON envelopes; invalid UTF-8 is caught later by ingest.
mod payload_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(payload: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(payload))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        String::deserialize(deserializer).map(String::into_bytes)
    }
}
