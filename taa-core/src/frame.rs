//! Minimal in-memory table
//!
//! Every stage works on small, fully materialised tables (a few thousand
//! rows at most), so a row-major `Vec<Vec<Cell>>` is enough. Cells keep
//! the type they were read with; CSV input is typed by content the same
//! way a dataframe reader would.

use crate::{Error, Result};
use chrono::NaiveDateTime;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A single typed value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Type a raw CSV field by its content
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Cell::Empty;
        }
        if let Ok(i) = raw.parse::<i64>() {
            return Cell::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_nan() {
                return Cell::Empty;
            }
            return Cell::Float(f);
        }
        match raw {
            "True" | "TRUE" | "true" => Cell::Bool(true),
            "False" | "FALSE" | "false" => Cell::Bool(false),
            _ => Cell::Text(raw.to_string()),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Cell::Int(_) | Cell::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// JSON rendering used when values leave the table
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Empty => Value::Null,
            Cell::Int(i) => Value::from(*i),
            Cell::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Bool(b) => Value::Bool(*b),
            Cell::Text(s) => Value::String(s.clone()),
            Cell::DateTime(dt) => Value::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Empty,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => n
                .as_i64()
                .map(Cell::Int)
                .or_else(|| n.as_f64().map(Cell::Float))
                .unwrap_or(Cell::Empty),
            Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }

    /// Stable textual form, used for joins, uniqueness and key names
    ///
    /// Integral floats render like integers so `4100` and `4100.0` agree.
    pub fn label(&self) -> String {
        match self {
            Cell::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(v) => {
                if v.fract() == 0.0 && v.abs() < 1e15 {
                    write!(f, "{:.1}", v)
                } else {
                    write!(f, "{}", v)
                }
            }
            Cell::Bool(true) => f.write_str("True"),
            Cell::Bool(false) => f.write_str("False"),
            Cell::Text(s) => f.write_str(s),
            Cell::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        if v.is_nan() {
            Cell::Empty
        } else {
            Cell::Float(v)
        }
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Int(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

/// Ordered columns and row-major cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Frame {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        let mut frame = Self::new(columns);
        for row in rows {
            frame.push_row(row)?;
        }
        Ok(frame)
    }

    /// Decode CSV with a header row
    pub fn from_csv(bytes: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(bytes);

        let columns = reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>();

        let mut frame = Self::new(columns);
        for record in reader.records() {
            let record = record?;
            frame
                .rows
                .push(record.iter().map(Cell::parse).collect());
        }
        Ok(frame)
    }

    /// Encode as CSV with a header row
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|c| c.to_string()))?;
        }
        writer
            .into_inner()
            .map_err(|e| Error::Csv(e.to_string()))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&[Cell]> {
        self.rows.get(index).map(|r| r.as_slice())
    }

    pub fn row_mut(&mut self, index: usize) -> Option<&mut Vec<Cell>> {
        self.rows.get_mut(index)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))
    }

    /// All cells of one column, in row order
    pub fn column(&self, name: &str) -> Result<Vec<&Cell>> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Distinct values of a column in order of first appearance
    pub fn unique(&self, name: &str) -> Result<Vec<Cell>> {
        let idx = self.require_column(name)?;
        let mut seen = HashSet::new();
        Ok(self
            .rows
            .iter()
            .map(|r| &r[idx])
            .filter(|c| seen.insert(c.label()))
            .cloned()
            .collect())
    }

    /// Rows whose `name` column equals `value`
    pub fn filter_eq(&self, name: &str, value: &Cell) -> Result<Frame> {
        let idx = self.require_column(name)?;
        let key = value.label();
        Ok(Frame {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|r| r[idx].label() == key)
                .cloned()
                .collect(),
        })
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::InvalidInput(format!(
                "row has {} cells but frame has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Append a row given by column name
    ///
    /// Columns missing from the record are left empty; columns unknown to
    /// the frame are added, with existing rows left empty.
    pub fn push_record(&mut self, record: &[(&str, Cell)]) {
        for (name, _) in record {
            if self.column_index(name).is_none() {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(Cell::Empty);
                }
            }
        }
        let mut row = vec![Cell::Empty; self.columns.len()];
        for (name, cell) in record {
            if let Some(idx) = self.column_index(name) {
                row[idx] = cell.clone();
            }
        }
        self.rows.push(row);
    }

    pub fn remove_row(&mut self, index: usize) -> Option<Vec<Cell>> {
        if index < self.rows.len() {
            Some(self.rows.remove(index))
        } else {
            None
        }
    }

    pub fn retain_rows(&mut self, mut keep: impl FnMut(&[Cell]) -> bool) {
        self.rows.retain(|r| keep(r));
    }

    pub fn rename_columns(&mut self, mut rename: impl FnMut(&str) -> String) {
        for column in &mut self.columns {
            *column = rename(column);
        }
    }

    /// Append a column holding the same value on every row
    pub fn add_constant_column(&mut self, name: &str, value: Cell) {
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(value.clone());
        }
    }

    /// Left join on equal key columns
    ///
    /// Every left row is kept; a left row matching several right rows is
    /// repeated once per match. Non-key columns present on both sides are
    /// suffixed `_x` (left) and `_y` (right).
    pub fn left_join(&self, right: &Frame, on: &[&str]) -> Result<Frame> {
        let left_keys = on
            .iter()
            .map(|k| self.require_column(k))
            .collect::<Result<Vec<_>>>()?;
        let right_keys = on
            .iter()
            .map(|k| right.require_column(k))
            .collect::<Result<Vec<_>>>()?;

        let right_values: Vec<usize> = (0..right.columns.len())
            .filter(|i| !right_keys.contains(i))
            .collect();

        let overlapping: HashSet<&str> = right_values
            .iter()
            .map(|i| right.columns[*i].as_str())
            .filter(|name| !on.contains(name) && self.column_index(name).is_some())
            .collect();

        let mut columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                if overlapping.contains(c.as_str()) {
                    format!("{}_x", c)
                } else {
                    c.clone()
                }
            })
            .collect();
        columns.extend(right_values.iter().map(|i| {
            let c = &right.columns[*i];
            if overlapping.contains(c.as_str()) {
                format!("{}_y", c)
            } else {
                c.clone()
            }
        }));

        let mut index: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
        for (row_idx, row) in right.rows.iter().enumerate() {
            let key = right_keys.iter().map(|i| row[*i].label()).collect();
            index.entry(key).or_default().push(row_idx);
        }

        let mut rows = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let key: Vec<String> = left_keys.iter().map(|i| row[*i].label()).collect();
            match index.get(&key) {
                Some(matches) => {
                    for m in matches {
                        let mut joined = row.clone();
                        joined.extend(right_values.iter().map(|i| right.rows[*m][*i].clone()));
                        rows.push(joined);
                    }
                }
                None => {
                    let mut joined = row.clone();
                    joined.extend(std::iter::repeat(Cell::Empty).take(right_values.len()));
                    rows.push(joined);
                }
            }
        }

        Ok(Frame { columns, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(csv: &str) -> Frame {
        Frame::from_csv(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_cell_parse_types() {
        assert_eq!(Cell::parse(""), Cell::Empty);
        assert_eq!(Cell::parse("42"), Cell::Int(42));
        assert_eq!(Cell::parse("-1.5"), Cell::Float(-1.5));
        assert_eq!(Cell::parse("True"), Cell::Bool(true));
        assert_eq!(Cell::parse("NaN"), Cell::Empty);
        assert_eq!(Cell::parse("ABC123"), Cell::text("ABC123"));
    }

    #[test]
    fn test_csv_round_trip_preserves_shape() {
        let f = frame("GL Code,ALFA_ID,FinalDollars_h1\n4100,A1,1.25\n4200,A2,\n");
        assert_eq!(f.columns(), &["GL Code", "ALFA_ID", "FinalDollars_h1"]);
        assert_eq!(f.len(), 2);
        assert_eq!(f.rows()[1][2], Cell::Empty);

        let again = Frame::from_csv(&f.to_csv().unwrap()).unwrap();
        assert_eq!(again, f);
    }

    #[test]
    fn test_integral_float_is_written_with_decimal() {
        assert_eq!(Cell::Float(2.0).to_string(), "2.0");
        assert_eq!(Cell::Float(2.5).to_string(), "2.5");
    }

    #[test]
    fn test_unique_preserves_first_appearance_order() {
        let f = frame("k\n3\n1\n3\n2\n1\n");
        assert_eq!(
            f.unique("k").unwrap(),
            vec![Cell::Int(3), Cell::Int(1), Cell::Int(2)]
        );
    }

    #[test]
    fn test_left_join_keeps_unmatched_rows() {
        let left = frame("GL Code,ALFA_ID,FinalDollars_h1\n1,A,10\n1,B,11\n2,C,12\n");
        let right = frame("GL Code,ALFA_ID,FinalDollars_h2\n1,A,20\n2,C,22\n");

        let joined = left.left_join(&right, &["GL Code", "ALFA_ID"]).unwrap();
        assert_eq!(
            joined.columns(),
            &["GL Code", "ALFA_ID", "FinalDollars_h1", "FinalDollars_h2"]
        );
        assert_eq!(joined.len(), 3);
        assert_eq!(joined.rows()[0][3], Cell::Int(20));
        assert_eq!(joined.rows()[1][3], Cell::Empty);
        assert_eq!(joined.rows()[2][3], Cell::Int(22));
    }

    #[test]
    fn test_left_join_suffixes_overlapping_columns() {
        let left = frame("id,v\n1,a\n");
        let right = frame("id,v\n1,b\n");
        let joined = left.left_join(&right, &["id"]).unwrap();
        assert_eq!(joined.columns(), &["id", "v_x", "v_y"]);
    }

    #[test]
    fn test_left_join_requires_key_columns() {
        let left = frame("id,v\n1,a\n");
        let right = frame("other,v\n1,b\n");
        assert!(matches!(
            left.left_join(&right, &["id"]),
            Err(Error::MissingColumn(c)) if c == "id"
        ));
    }

    #[test]
    fn test_push_record_adds_new_columns() {
        let mut f = frame("Name,DataType\nBase,Real\n");
        f.push_record(&[("Name", Cell::text("Seg1")), ("DisplayWidth", Cell::Int(12))]);

        assert_eq!(f.columns(), &["Name", "DataType", "DisplayWidth"]);
        assert_eq!(f.rows()[0][2], Cell::Empty);
        assert_eq!(f.rows()[1], vec![Cell::text("Seg1"), Cell::Empty, Cell::Int(12)]);
    }

    #[test]
    fn test_push_row_checks_width() {
        let mut f = Frame::new(vec!["a".to_string()]);
        assert!(f.push_row(vec![Cell::Int(1), Cell::Int(2)]).is_err());
    }

    #[test]
    fn test_filter_eq_matches_integral_floats() {
        let f = Frame::from_rows(
            vec!["k".to_string()],
            vec![vec![Cell::Float(7.0)], vec![Cell::Int(8)]],
        )
        .unwrap();
        assert_eq!(f.filter_eq("k", &Cell::Int(7)).unwrap().len(), 1);
    }
}
