//! Data contracts between pipeline stages
//!
//! These types are serialized into workflow state, so field names follow
//! the workflow definition rather than Rust conventions.

use crate::dates::{DateField, FileDate, RunDate};
use crate::frame::Cell;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Invocation event for the trigger stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub year: DateField,
    pub month: DateField,
    pub day: DateField,
}

impl TriggerEvent {
    pub fn run_date(&self) -> Result<RunDate> {
        RunDate::from_fields(&self.year, &self.month, &self.day)
    }
}

/// Input handed to the downstream workflow
///
/// Carries exactly one key per horizon, in horizon order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerPayload {
    pub bucket_name: String,
    pub key: Vec<String>,
    pub file_date: FileDate,
}

/// One fan-out record produced by the parser, consumed by the CSV generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    #[serde(rename = "File_date", alias = "file_date")]
    pub file_date: FileDate,

    /// GL code exactly as it appeared in the query output (number or text)
    #[serde(rename = "GL_Code", alias = "GL_CODE")]
    pub gl_code: serde_json::Value,

    pub data_path: String,
}

impl SegmentRecord {
    /// GL code rendered for keys and sheet names
    pub fn gl_code_label(&self) -> String {
        Cell::from_json(&self.gl_code).label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trigger_payload_wire_format() {
        let payload = TriggerPayload {
            bucket_name: "bucket".to_string(),
            key: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            file_date: "080523".parse().unwrap(),
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({"bucket_name": "bucket", "key": ["a", "b", "c"], "file_date": "080523"})
        );
    }

    #[test]
    fn test_trigger_event_accepts_mixed_field_types() {
        let event: TriggerEvent =
            serde_json::from_value(json!({"year": "2023", "month": 8, "day": "5"})).unwrap();
        assert_eq!(event.run_date().unwrap().file_date().to_string(), "080523");
    }

    #[test]
    fn test_segment_record_field_names() {
        let record: SegmentRecord = serde_json::from_value(json!({
            "File_date": "080523",
            "GL_Code": 4100,
            "data_path": "processing/gl_codes/4100/data.json"
        }))
        .unwrap();
        assert_eq!(record.gl_code_label(), "4100");

        let text_code = SegmentRecord {
            gl_code: json!("A-17"),
            ..record
        };
        assert_eq!(text_code.gl_code_label(), "A-17");

        let float_code = SegmentRecord {
            gl_code: json!(4100.0),
            ..text_code
        };
        assert_eq!(float_code.gl_code_label(), "4100");
    }
}
