//! Payload normalization for both collaborators.
//!
//! Upstream workflows answer in a handful of shapes. Each is one variant of
//! an untagged enum so shape handling stays here and the join only ever sees
//! a canonical `Vec`. A body that matches no shape is treated as an empty
//! dataset, never as an error.

use crate::models::{ClassifiedRecord, RawMessageRecord};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(alias = "emails", alias = "data")]
    output: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassifiedPayload {
    /// `[{"output": [...]}, ...]` as emitted by the workflow engine.
    Nested(Vec<Envelope>),
    Bare(Vec<Value>),
    Wrapped(Envelope),
}

impl ClassifiedPayload {
    fn into_items(self) -> Vec<Value> {
        match self {
            ClassifiedPayload::Nested(envelopes) => {
                envelopes.into_iter().flat_map(|e| e.output).collect()
            }
            ClassifiedPayload::Bare(items) => items,
            ClassifiedPayload::Wrapped(envelope) => envelope.output,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(alias = "emails", alias = "output", alias = "data")]
    messages: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPayload {
    Bare(Vec<Value>),
    Wrapped(RawEnvelope),
}

impl RawPayload {
    fn into_items(self) -> Vec<Value> {
        match self {
            RawPayload::Bare(items) => items,
            RawPayload::Wrapped(envelope) => envelope.messages,
        }
    }
}

pub fn parse_classified(body: &[u8]) -> Vec<ClassifiedRecord> {
    match serde_json::from_slice::<ClassifiedPayload>(body) {
        Ok(payload) => decode_items(payload.into_items(), "classification"),
        Err(e) => {
            warn!(source_name = "classification", error = %e, "malformed payload, using empty set");
            Vec::new()
        }
    }
}

pub fn parse_raw(body: &[u8]) -> Vec<RawMessageRecord> {
    match serde_json::from_slice::<RawPayload>(body) {
        Ok(payload) => decode_items(payload.into_items(), "raw_sync"),
        Err(e) => {
            warn!(source_name = "raw_sync", error = %e, "malformed payload, using empty set");
            Vec::new()
        }
    }
}

fn decode_items<T: DeserializeOwned>(items: Vec<Value>, source_name: &str) -> Vec<T> {
    let total = items.len();
    let records: Vec<T> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(source_name, index, error = %e, "skipping invalid element");
                None
            }
        })
        .collect();

    if records.len() < total {
        debug!(source_name, kept = records.len(), total, "dropped invalid elements");
    }
    records
}
