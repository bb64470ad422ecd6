//! Shape an uploaded sheet for the warehouse

use crate::dates::RunDate;
use crate::frame::{Cell, Frame};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Partition stamped onto every loaded row; also the delete-then-insert key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoadPartition {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl LoadPartition {
    /// Partition column names, in the order they are appended
    pub const COLUMNS: [&'static str; 3] = ["YYYY", "MM", "DD"];

    pub fn from_date(date: &RunDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }

    /// Values matching [`Self::COLUMNS`]
    pub fn values(&self) -> [i64; 3] {
        [self.year as i64, self.month as i64, self.day as i64]
    }
}

impl fmt::Display for LoadPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Warehouse column name for a sheet header
///
/// Uppercases, then rewrites unit suffixes (` (%)` to `_PCT`, ` ($)` dropped),
/// then turns remaining spaces into underscores.
pub fn normalize_column_name(name: &str) -> String {
    name.to_uppercase()
        .replace(" (%)", "_PCT")
        .replace(" ($)", "")
        .replace(' ', "_")
}

/// Rows whose first column mentions this are subtotal lines
const TOTAL_MARKER: &str = "Total";

/// Normalize names, drop subtotal rows and stamp the partition columns
pub fn prepare_for_load(mut frame: Frame, partition: &LoadPartition) -> Frame {
    frame.rename_columns(normalize_column_name);
    frame.retain_rows(|row| {
        !row.first()
            .map(|c| c.to_string().contains(TOTAL_MARKER))
            .unwrap_or(false)
    });
    for (name, value) in LoadPartition::COLUMNS.iter().zip(partition.values()) {
        frame.add_constant_column(name, Cell::Int(value));
    }
    frame
}
