//! Builders for events and frames

use serde_json::{json, Value};
use taa_core::{Cell, Frame};

/// Builder for trigger events
///
/// Produces `{"year", "month", "day"}`; fields can be given as numbers or
/// strings, or left out.
pub struct TriggerEventBuilder {
    year: Option<Value>,
    month: Option<Value>,
    day: Option<Value>,
}

impl Default for TriggerEventBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerEventBuilder {
    pub fn new() -> Self {
        Self {
            year: Some(json!(2024)),
            month: Some(json!(1)),
            day: Some(json!(9)),
        }
    }

    pub fn date(mut self, year: i64, month: i64, day: i64) -> Self {
        self.year = Some(json!(year));
        self.month = Some(json!(month));
        self.day = Some(json!(day));
        self
    }

    /// Send the fields as strings, the way the scheduler does
    pub fn as_strings(mut self) -> Self {
        for field in [&mut self.year, &mut self.month, &mut self.day] {
            if let Some(value) = field.take() {
                let text = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                *field = Some(Value::String(text));
            }
        }
        self
    }

    pub fn without_day(mut self) -> Self {
        self.day = None;
        self
    }

    pub fn build(self) -> Value {
        let mut event = serde_json::Map::new();
        for (name, value) in [("year", self.year), ("month", self.month), ("day", self.day)] {
            if let Some(value) = value {
                event.insert(name.to_string(), value);
            }
        }
        Value::Object(event)
    }
}

/// Builder for frames given row by row
pub struct FrameBuilder {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl FrameBuilder {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_columns(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, cells: Vec<Cell>) -> Self {
        self.rows.push(cells);
        self
    }

    /// Panics when a row does not match the header
    pub fn build(self) -> Frame {
        Frame::from_rows(self.columns, self.rows).expect("rows must match the header")
    }
}
