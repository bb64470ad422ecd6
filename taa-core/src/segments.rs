//! Per-segment fan-out rules
//!
//! The three horizon query results are merged row-wise on `(GL Code, ALFA_ID)`.
//! Each distinct GL code becomes one segment with its own value lists, its
//! own sheet in the final workbook, and one Table Properties row.

use crate::dates::{Horizon, HORIZONS};
use crate::frame::{Cell, Frame};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

pub const GL_CODE_COLUMN: &str = "GL Code";
pub const ALFA_ID_COLUMN: &str = "ALFA_ID";
pub const CUSIP_COLUMN: &str = "ck.Cusip";

/// Columns the horizon results are merged on
pub const JOIN_KEYS: [&str; 2] = [GL_CODE_COLUMN, ALFA_ID_COLUMN];

/// Position of the model row inside the purchase template
pub const MODEL_ROW: usize = 3;

/// Cells per horizon pass when filling a segment sheet
const CELLS_PER_HORIZON: usize = 12;

pub fn final_dollars_column(horizon: Horizon) -> String {
    format!("FinalDollars_h{}", horizon)
}

pub fn segment_sheet_name(gl_code: &str) -> String {
    format!("InvestPctSeg{}", gl_code)
}

/// Final dollar values of one GL code, one list per horizon
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentValues {
    pub values_h1: Vec<Option<f64>>,
    pub values_h2: Vec<Option<f64>>,
    pub values_h3: Vec<Option<f64>>,
}

impl SegmentValues {
    fn horizons(&self) -> [&[Option<f64>]; 3] {
        [&self.values_h1, &self.values_h2, &self.values_h3]
    }
}

/// Left-join the three horizon results on [`JOIN_KEYS`]
pub fn merge_horizons(results: &[Frame; 3]) -> Result<Frame> {
    let [h1, h2, h3] = results;
    h1.left_join(h2, &JOIN_KEYS)?.left_join(h3, &JOIN_KEYS)
}

/// Value lists for one GL code, in merged row order
pub fn segment_values(merged: &Frame, gl_code: &Cell) -> Result<SegmentValues> {
    let rows = merged.filter_eq(GL_CODE_COLUMN, gl_code)?;
    let [h1, h2, h3] = HORIZONS;
    Ok(SegmentValues {
        values_h1: horizon_values(&rows, h1)?,
        values_h2: horizon_values(&rows, h2)?,
        values_h3: horizon_values(&rows, h3)?,
    })
}

fn horizon_values(rows: &Frame, horizon: Horizon) -> Result<Vec<Option<f64>>> {
    let name = final_dollars_column(horizon);
    rows.column(&name)?
        .into_iter()
        .map(|cell| match cell {
            Cell::Empty => Ok(None),
            c if c.is_numeric() => Ok(c.as_f64()),
            other => Err(Error::InvalidInput(format!(
                "{} holds non-numeric value {:?}",
                name,
                other.to_string()
            ))),
        })
        .collect()
}

/// Append the Table Properties row describing one segment sheet
pub fn append_table_properties(table: &mut Frame, gl_code: &str) {
    let sheet = segment_sheet_name(gl_code);
    table.push_record(&[
        ("Name", Cell::text(sheet.clone())),
        ("SheetName", Cell::text(sheet)),
        ("ModuleGroup", Cell::text("Asset")),
        ("IndexType", Cell::text("ProjectionYearAndMonth")),
        ("DataType", Cell::text("Real")),
        ("Description", Cell::text("TAA/SAA for Invest%")),
        ("DisplayWidth", Cell::Int(12)),
        ("DisplayDecimals", Cell::Int(10)),
    ]);
}

/// Expand the purchase template with one model-row copy per ALFA id
///
/// Copies are appended after the existing rows with `ck.Cusip` set to the
/// id; the model row itself is removed.
pub fn expand_template(template: &Frame, alfa_ids: &[Cell]) -> Result<Frame> {
    let cusip = template.require_column(CUSIP_COLUMN)?;
    let model = template
        .row(MODEL_ROW)
        .ok_or_else(|| {
            Error::InvalidInput(format!(
                "template has {} rows, model row {} is missing",
                template.len(),
                MODEL_ROW
            ))
        })?
        .to_vec();

    let mut expanded = template.clone();
    for id in alfa_ids {
        let mut row = model.clone();
        row[cusip] = id.clone();
        expanded.push_row(row)?;
    }
    expanded.remove_row(MODEL_ROW);
    Ok(expanded)
}

/// Fill the edited template with one segment's values
///
/// Data row `i` lives at template row `MODEL_ROW + i`. Its empty cells are
/// filled in three passes, left to right: up to 12 with the horizon 1
/// value, up to 12 with the horizon 2 value, and every remaining one with
/// the horizon 3 value. A missing value fills nothing, leaving those cells
/// to the next pass.
pub fn fill_segment_sheet(template: &Frame, values: &SegmentValues) -> Result<Frame> {
    let mut sheet = template.clone();
    let limits = [Some(CELLS_PER_HORIZON), Some(CELLS_PER_HORIZON), None];

    for (list, limit) in values.horizons().into_iter().zip(limits) {
        for (i, value) in list.iter().enumerate() {
            let row_idx = MODEL_ROW + i;
            let rows = sheet.len();
            let row = sheet.row_mut(row_idx).ok_or_else(|| {
                Error::InvalidInput(format!(
                    "template has {} rows, value {} needs row {}",
                    rows, i, row_idx
                ))
            })?;

            let Some(value) = value else { continue };
            let limit = limit.unwrap_or(usize::MAX);
            row.iter_mut()
                .filter(|c| c.is_empty())
                .take(limit)
                .for_each(|c| *c = Cell::from(*value));
        }
    }

    Ok(sheet)
}
