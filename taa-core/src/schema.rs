//! Schema descriptors and structural validation for warehouse loads
//!
//! A schema descriptor is a JSON object mapping column name to type name,
//! in declaration order:
//!
//! ```json
//! {"Segment": "object", "Purchase Spread (%)": "float64", "Count": "int64"}
//! ```
//!
//! Uploaded sheets are typed column by column (see [`infer_column_types`])
//! and must match the descriptor exactly: same names, same types, same order.

use crate::frame::{Cell, Frame};
use crate::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Column type as inferred from sheet contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Int,
    Float,
    Bool,
    DateTime,
    Text,
}

impl ColumnType {
    /// Canonical dataframe dtype name
    pub fn dtype_name(self) -> &'static str {
        match self {
            ColumnType::Int => "int64",
            ColumnType::Float => "float64",
            ColumnType::Bool => "bool",
            ColumnType::DateTime => "datetime64[ns]",
            ColumnType::Text => "object",
        }
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "int64" | "integer" => Ok(ColumnType::Int),
            "float" | "float64" | "double" => Ok(ColumnType::Float),
            "bool" | "boolean" => Ok(ColumnType::Bool),
            "datetime" | "datetime64[ns]" | "timestamp" => Ok(ColumnType::DateTime),
            "string" | "str" | "object" | "text" => Ok(ColumnType::Text),
            other => Err(Error::InvalidInput(format!(
                "unknown column type {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dtype_name())
    }
}

/// Declared columns, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptor {
    columns: Vec<(String, ColumnType)>,
}

impl SchemaDescriptor {
    pub fn new(columns: Vec<(String, ColumnType)>) -> Self {
        Self { columns }
    }

    /// Parse a descriptor document
    ///
    /// Relies on `serde_json`'s `preserve_order` so object key order is the
    /// declaration order.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        let object = value.as_object().ok_or_else(|| {
            Error::InvalidInput("schema descriptor must be a JSON object".to_string())
        })?;

        let columns = object
            .iter()
            .map(|(name, ty)| {
                let ty = ty.as_str().ok_or_else(|| {
                    Error::InvalidInput(format!("type of column {:?} must be a string", name))
                })?;
                Ok((name.clone(), ty.parse()?))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[(String, ColumnType)] {
        &self.columns
    }

    fn type_of(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| *t)
    }

    /// Check inferred columns against this descriptor
    ///
    /// Conditions are reported in a fixed order: missing columns, then
    /// unexpected columns, then type mismatches, then ordering.
    pub fn validate(&self, inferred: &[(String, ColumnType)]) -> std::result::Result<(), SchemaViolation> {
        let missing: Vec<String> = self
            .columns
            .iter()
            .filter(|(name, _)| !inferred.iter().any(|(n, _)| n == name))
            .map(|(name, _)| name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(SchemaViolation::MissingColumns(missing));
        }

        let unexpected: Vec<String> = inferred
            .iter()
            .filter(|(name, _)| self.type_of(name).is_none())
            .map(|(name, _)| name.clone())
            .collect();
        if !unexpected.is_empty() {
            return Err(SchemaViolation::UnexpectedColumns(unexpected));
        }

        let mismatched: Vec<TypeMismatch> = inferred
            .iter()
            .filter_map(|(name, found)| {
                let expected = self.type_of(name)?;
                (expected != *found).then(|| TypeMismatch {
                    column: name.clone(),
                    expected,
                    found: *found,
                })
            })
            .collect();
        if !mismatched.is_empty() {
            return Err(SchemaViolation::TypeMismatch(mismatched));
        }

        let expected: Vec<String> = self.columns.iter().map(|(n, _)| n.clone()).collect();
        let found: Vec<String> = inferred.iter().map(|(n, _)| n.clone()).collect();
        if expected != found {
            return Err(SchemaViolation::OrderMismatch { expected, found });
        }

        Ok(())
    }
}

/// One column whose inferred type differs from its declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMismatch {
    pub column: String,
    pub expected: ColumnType,
    pub found: ColumnType,
}

impl fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (expected {}, found {})",
            self.column, self.expected, self.found
        )
    }
}

/// Structural divergence between a sheet and its descriptor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaViolation {
    #[error("Missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Unexpected columns: {}", .0.join(", "))]
    UnexpectedColumns(Vec<String>),

    #[error("Type mismatch: {}", join_mismatches(.0))]
    TypeMismatch(Vec<TypeMismatch>),

    #[error("Column order mismatch: expected [{}], found [{}]", .expected.join(", "), .found.join(", "))]
    OrderMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
}

fn join_mismatches(mismatches: &[TypeMismatch]) -> String {
    mismatches
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl SchemaViolation {
    /// Names of the offending columns
    pub fn columns(&self) -> Vec<String> {
        match self {
            SchemaViolation::MissingColumns(c) | SchemaViolation::UnexpectedColumns(c) => c.clone(),
            SchemaViolation::TypeMismatch(m) => m.iter().map(|m| m.column.clone()).collect(),
            SchemaViolation::OrderMismatch { expected, found } => expected
                .iter()
                .zip(found.iter())
                .filter(|(e, f)| e != f)
                .map(|(_, f)| f.clone())
                .collect(),
        }
    }
}

/// Infer one type per column the way a dataframe reader would
///
/// - only numbers, all integral, no blanks: `int64`
/// - only numbers otherwise (blanks become NaN): `float64`
/// - a column with no values at all: `float64`
/// - only booleans, no blanks: `bool`
/// - only date-times (blanks allowed): `datetime64[ns]`
/// - anything else: `object`
pub fn infer_column_types(frame: &Frame) -> Vec<(String, ColumnType)> {
    frame
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells = frame.rows().iter().map(|r| &r[idx]);
            (name.clone(), infer_type(cells))
        })
        .collect()
}

fn infer_type<'a>(cells: impl Iterator<Item = &'a Cell>) -> ColumnType {
    let mut blanks = false;
    let mut ints = 0usize;
    let mut fractional = 0usize;
    let mut bools = 0usize;
    let mut datetimes = 0usize;
    let mut other = 0usize;

    for cell in cells {
        match cell {
            Cell::Empty => blanks = true,
            Cell::Int(_) => ints += 1,
            Cell::Float(f) if f.fract() == 0.0 => ints += 1,
            Cell::Float(_) => fractional += 1,
            Cell::Bool(_) => bools += 1,
            Cell::DateTime(_) => datetimes += 1,
            Cell::Text(_) => other += 1,
        }
    }

    let numeric = ints + fractional;
    let total = numeric + bools + datetimes + other;

    if total == 0 {
        ColumnType::Float
    } else if numeric == total {
        if fractional == 0 && !blanks {
            ColumnType::Int
        } else {
            ColumnType::Float
        }
    } else if bools == total && !blanks {
        ColumnType::Bool
    } else if datetimes == total {
        ColumnType::DateTime
    } else {
        ColumnType::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(columns: &[(&str, ColumnType)]) -> Vec<(String, ColumnType)> {
        columns.iter().map(|(n, t)| (n.to_string(), *t)).collect()
    }

    #[test]
    fn test_matching_schema_passes() {
        let schema = SchemaDescriptor::new(cols(&[("A", ColumnType::Int), ("B", ColumnType::Text)]));
        let inferred = cols(&[("A", ColumnType::Int), ("B", ColumnType::Text)]);
        assert!(schema.validate(&inferred).is_ok());
    }

    #[test]
    fn test_missing_column_is_named() {
        let schema = SchemaDescriptor::new(cols(&[
            ("A", ColumnType::Int),
            ("B", ColumnType::Text),
            ("C", ColumnType::Float),
        ]));
        let inferred = cols(&[("A", ColumnType::Int), ("B", ColumnType::Text)]);

        let err = schema.validate(&inferred).unwrap_err();
        assert_eq!(err, SchemaViolation::MissingColumns(vec!["C".to_string()]));
        assert_eq!(err.columns(), vec!["C".to_string()]);
    }

    #[test]
    fn test_unexpected_column_is_named() {
        let schema = SchemaDescriptor::new(cols(&[("A", ColumnType::Int), ("B", ColumnType::Text)]));
        let inferred = cols(&[
            ("A", ColumnType::Int),
            ("B", ColumnType::Text),
            ("D", ColumnType::Int),
        ]);

        let err = schema.validate(&inferred).unwrap_err();
        assert_eq!(err, SchemaViolation::UnexpectedColumns(vec!["D".to_string()]));
    }

    #[test]
    fn test_type_mismatch_is_named() {
        let schema = SchemaDescriptor::new(cols(&[("A", ColumnType::Int), ("B", ColumnType::Text)]));
        let inferred = cols(&[("A", ColumnType::Float), ("B", ColumnType::Text)]);

        let err = schema.validate(&inferred).unwrap_err();
        assert_eq!(err.columns(), vec!["A".to_string()]);
        assert!(err.to_string().contains("expected int64, found float64"));
    }

    #[test]
    fn test_order_mismatch() {
        let schema = SchemaDescriptor::new(cols(&[("A", ColumnType::Int), ("B", ColumnType::Text)]));
        let inferred = cols(&[("B", ColumnType::Text), ("A", ColumnType::Int)]);

        assert!(matches!(
            schema.validate(&inferred),
            Err(SchemaViolation::OrderMismatch { .. })
        ));
    }

    #[test]
    fn test_descriptor_preserves_declaration_order() {
        let schema =
            SchemaDescriptor::from_json(br#"{"Zeta": "int", "Alpha": "object", "Mid": "float64"}"#)
                .unwrap();
        let names: Vec<&str> = schema.columns().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
        assert_eq!(schema.columns()[1].1, ColumnType::Text);
    }

    #[test]
    fn test_descriptor_rejects_unknown_type() {
        assert!(SchemaDescriptor::from_json(br#"{"A": "decimal(10,2)"}"#).is_err());
        assert!(SchemaDescriptor::from_json(br#"["A"]"#).is_err());
    }

    #[test]
    fn test_inference_rules() {
        let frame = Frame::from_rows(
            ["ints", "floats", "gappy", "text", "flags"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            vec![
                vec![Cell::Float(1.0), Cell::Float(1.5), Cell::Int(1), Cell::text("a"), Cell::Bool(true)],
                vec![Cell::Int(2), Cell::Int(2), Cell::Empty, Cell::Int(3), Cell::Bool(false)],
            ],
        )
        .unwrap();

        let types: Vec<ColumnType> = infer_column_types(&frame).into_iter().map(|(_, t)| t).collect();
        assert_eq!(
            types,
            vec![
                ColumnType::Int,
                ColumnType::Float,
                ColumnType::Float,
                ColumnType::Text,
                ColumnType::Bool
            ]
        );
    }
}
