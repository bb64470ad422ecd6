//! Spreadsheet codec
//!
//! Reading goes through `calamine` (first worksheet only, first row is the
//! header). Writing goes through `rust_xlsxwriter`, one worksheet per frame.

use crate::frame::{Cell, Frame};
use crate::{Error, Result};
use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use rust_xlsxwriter::{Workbook, XlsxError};
use std::io::Cursor;

/// Excel's limit on worksheet name length
pub const MAX_SHEET_NAME_LEN: usize = 31;

impl From<XlsxError> for Error {
    fn from(e: XlsxError) -> Self {
        Error::Spreadsheet(e.to_string())
    }
}

impl From<calamine::Error> for Error {
    fn from(e: calamine::Error) -> Self {
        Error::Spreadsheet(e.to_string())
    }
}

/// Decode the first worksheet of an `.xlsx`/`.xls` document
pub fn read_first_sheet(bytes: Vec<u8>) -> Result<Frame> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::Spreadsheet("workbook has no worksheets".to_string()))??;

    let mut rows = range.rows();
    let columns: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|d| d.to_string()).collect(),
        None => return Ok(Frame::default()),
    };

    let body = rows
        .map(|row| row.iter().map(to_cell).collect())
        .collect();
    Frame::from_rows(columns, body)
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::from(*f),
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => data
            .as_datetime()
            .map(Cell::DateTime)
            .unwrap_or_else(|| Cell::Text(data.to_string())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) | Data::Empty => Cell::Empty,
    }
}

/// Worksheet name Excel will accept
pub fn sheet_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME_LEN)
        .collect()
}

/// Encode frames as one `.xlsx` document, sheets in the given order
pub fn write_workbook(sheets: &[(&str, &Frame)]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();

    for (name, frame) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name(name))?;

        for (col, header) in frame.columns().iter().enumerate() {
            worksheet.write_string(0, col_index(col)?, header)?;
        }

        for (r, row) in frame.rows().iter().enumerate() {
            let row_num = u32::try_from(r + 1)
                .map_err(|_| Error::Spreadsheet(format!("row {} out of range", r + 1)))?;
            for (c, cell) in row.iter().enumerate() {
                let col = col_index(c)?;
                match cell {
                    Cell::Empty => {}
                    Cell::Int(i) => {
                        worksheet.write_number(row_num, col, *i as f64)?;
                    }
                    Cell::Float(f) => {
                        worksheet.write_number(row_num, col, *f)?;
                    }
                    Cell::Bool(b) => {
                        worksheet.write_boolean(row_num, col, *b)?;
                    }
                    Cell::Text(_) | Cell::DateTime(_) => {
                        worksheet.write_string(row_num, col, cell.to_string())?;
                    }
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn col_index(col: usize) -> Result<u16> {
    u16::try_from(col).map_err(|_| Error::Spreadsheet(format!("column {} out of range", col)))
}
