//! Invocation payloads for each function
//!
//! The workflow hands stage outputs to the next stage mostly unchanged; the
//! wrappers here only strip the envelopes the state machine adds.

use aws_lambda_events::event::s3::S3Event;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use taa_core::{FileDate, SegmentRecord};
use taa_runtime::csv_generator::CsvOutput;
use taa_runtime::ObjectLocation;

/// Map-state item for the CSV generator
#[derive(Debug, Clone, Deserialize)]
pub struct CsvGeneratorEvent {
    #[serde(rename = "Input")]
    pub input: SegmentRecord,
}

/// One entry of the Map-state result list handed to the spreadsheet generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvResultEnvelope {
    #[serde(rename = "Payload")]
    pub payload: CsvOutput,
}

impl CsvResultEnvelope {
    pub fn unwrap_all(envelopes: Vec<CsvResultEnvelope>) -> Vec<CsvOutput> {
        envelopes.into_iter().map(|e| e.payload).collect()
    }
}

/// Alert-path cleanup request
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupEvent {
    pub file_date: FileDate,
}

/// Decode an object key as S3 puts it in event notifications
///
/// Spaces arrive as `+` and everything else reserved as `%XX`.
pub fn decode_object_key(key: &str) -> String {
    let spaced = key.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Objects named by an S3 notification, in record order
pub fn event_locations(event: &S3Event) -> Vec<ObjectLocation> {
    event
        .records
        .iter()
        .filter_map(|record| {
            let bucket = record.s3.bucket.name.as_deref()?;
            let key = record.s3.object.key.as_deref()?;
            Some(ObjectLocation::new(bucket, decode_object_key(key)))
        })
        .collect()
}
