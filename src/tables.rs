//! Tables
//!
//! Input data arrives as named-column tables. Typed readers (customers,
//! probabilities) look columns up by name and report a [`SchemaError`] when a
//! column is absent or holds the wrong kind of value.

use std::{collections::BTreeMap, io};

use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading or validating an input table.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A required column is not present.
    #[error("{table} table is missing required column `{column}`")]
    MissingColumn {
        /// Table being read
        table: &'static str,

        /// Name of the missing column
        column: &'static str,
    },

    /// A row does not have one cell per column.
    #[error("row {row} has {found} cells, expected {expected}")]
    RowWidth {
        /// Zero-based row index
        row: usize,

        /// Number of columns in the table
        expected: usize,

        /// Number of cells supplied
        found: usize,
    },

    /// A record lacks a column that the first record defined.
    #[error("record {row} is missing column `{column}`")]
    MissingValue {
        /// Zero-based record index
        row: usize,

        /// Column absent from the record
        column: String,
    },

    /// A record has a column that the first record did not define.
    #[error("record {row} has unexpected column `{column}`")]
    UnexpectedColumn {
        /// Zero-based record index
        row: usize,

        /// Column not present in the first record
        column: String,
    },

    /// A cell holds the wrong kind of value for its column.
    #[error("{table} row {row}: column `{column}` expected {expected}, found {found}")]
    InvalidType {
        /// Table being read
        table: &'static str,

        /// Zero-based row index
        row: usize,

        /// Column name
        column: &'static str,

        /// Expected kind of value
        expected: &'static str,

        /// Kind of value found
        found: &'static str,
    },

    /// A probability is not a finite number in `[0, 1]`.
    #[error("{table} row {row}: column `{column}` value {value} is outside [0, 1]")]
    OutOfRange {
        /// Table being read
        table: &'static str,

        /// Zero-based row index
        row: usize,

        /// Column name
        column: &'static str,

        /// Offending value
        value: f64,
    },

    /// A key column contains the same value twice.
    #[error("{table} table has duplicate key {key}")]
    DuplicateKey {
        /// Table being read
        table: &'static str,

        /// Duplicated key, rendered
        key: String,
    },

    /// The table has no rows.
    #[error("{table} table is empty")]
    Empty {
        /// Table being read
        table: &'static str,
    },

    /// JSON parsing error
    #[error("failed to parse JSON table: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("failed to parse YAML table: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// CSV parsing error, including records with the wrong number of fields
    #[error("failed to parse CSV table: {0}")]
    Csv(#[from] csv::Error),
}

/// A single table value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    /// Whole number
    Integer(i64),

    /// Floating point number
    Float(f64),

    /// Text
    Text(String),
}

impl Cell {
    /// Name of the kind of value held, for error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            Cell::Integer(_) => "integer",
            Cell::Float(_) => "float",
            Cell::Text(_) => "text",
        }
    }

    /// The value as an integer, if it is one.
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Cell::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// The value as a float. Integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Cell::Integer(value) => value.to_f64(),
            Cell::Float(value) => Some(*value),
            Cell::Text(_) => None,
        }
    }

    /// The value as a categorical label. Integers are rendered as text.
    pub fn as_label(&self) -> Option<String> {
        match self {
            Cell::Integer(value) => Some(value.to_string()),
            Cell::Text(value) => Some(value.clone()),
            Cell::Float(_) => None,
        }
    }
}

impl Cell {
    /// Infer a cell from a raw text field: integers first, then finite floats,
    /// otherwise text.
    pub fn infer(raw: &str) -> Self {
        if let Ok(value) = raw.parse::<i64>() {
            return Cell::Integer(value);
        }

        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => Cell::Float(value),
            _ => Cell::Text(raw.to_string()),
        }
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Integer(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

/// A record as supplied by JSON or YAML collaborators.
pub type Record = BTreeMap<String, Cell>;

/// Named-column table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Create an empty table with the given column names.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::RowWidth`] if the row does not have one cell per column.
    pub fn push_row(&mut self, row: impl IntoIterator<Item = Cell>) -> Result<(), SchemaError> {
        let row: Vec<Cell> = row.into_iter().collect();

        if row.len() != self.columns.len() {
            return Err(SchemaError::RowWidth {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }

        self.rows.push(row);

        Ok(())
    }

    /// Build a table from records. Columns are taken from the first record and
    /// every other record must have exactly the same keys.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if the records do not share the same columns.
    pub fn from_records(records: Vec<Record>) -> Result<Self, SchemaError> {
        let columns: Vec<String> = records
            .first()
            .map(|record| record.keys().cloned().collect())
            .unwrap_or_default();

        let mut table = Table::new(columns);

        for (row, mut record) in records.into_iter().enumerate() {
            let mut cells = Vec::with_capacity(table.columns.len());

            for column in &table.columns {
                let cell = record
                    .remove(column)
                    .ok_or_else(|| SchemaError::MissingValue {
                        row,
                        column: column.clone(),
                    })?;

                cells.push(cell);
            }

            if let Some(column) = record.into_keys().next() {
                return Err(SchemaError::UnexpectedColumn { row, column });
            }

            table.rows.push(cells);
        }

        Ok(table)
    }

    /// Parse a JSON array of records.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if the JSON is malformed or the records disagree on columns.
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let records: Vec<Record> = serde_json::from_str(json)?;

        Self::from_records(records)
    }

    /// Parse a YAML sequence of records.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if the YAML is malformed or the records disagree on columns.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SchemaError> {
        let records: Vec<Record> = serde_norway::from_str(yaml)?;

        Self::from_records(records)
    }

    /// Read CSV with a header row. Column order follows the header and every
    /// field is inferred with [`Cell::infer`].
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Csv`] if the CSV is malformed or a record does not
    /// have one field per header.
    pub fn from_csv_reader(reader: impl io::Read) -> Result<Self, SchemaError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut table = Table::new(reader.headers()?.iter());

        for record in reader.records() {
            table.push_row(record?.iter().map(Cell::infer))?;
        }

        Ok(table)
    }

    /// Parse CSV text with a header row.
    ///
    /// # Errors
    ///
    /// As [`Table::from_csv_reader`].
    pub fn from_csv_str(csv: &str) -> Result<Self, SchemaError> {
        Self::from_csv_reader(csv.as_bytes())
    }

    /// Column names, in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Iterate over the rows.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Locate a required column by name.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MissingColumn`] if there is no such column.
    pub fn column(&self, table: &'static str, name: &'static str) -> Result<Column, SchemaError> {
        self.columns
            .iter()
            .position(|column| column == name)
            .map(|idx| Column { table, name, idx })
            .ok_or(SchemaError::MissingColumn {
                table,
                column: name,
            })
    }
}

/// A resolved column used to read typed values out of rows.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    table: &'static str,
    name: &'static str,
    idx: usize,
}

impl Column {
    fn cell<'r>(&self, row_idx: usize, row: &'r [Cell]) -> Result<&'r Cell, SchemaError> {
        row.get(self.idx).ok_or(SchemaError::RowWidth {
            row: row_idx,
            expected: self.idx + 1,
            found: row.len(),
        })
    }

    fn invalid(&self, row: usize, expected: &'static str, cell: &Cell) -> SchemaError {
        SchemaError::InvalidType {
            table: self.table,
            row,
            column: self.name,
            expected,
            found: cell.kind(),
        }
    }

    /// Read an integer cell.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidType`] if the cell is not an integer.
    pub fn integer(&self, row_idx: usize, row: &[Cell]) -> Result<i64, SchemaError> {
        let cell = self.cell(row_idx, row)?;

        cell.as_integer()
            .ok_or_else(|| self.invalid(row_idx, "integer", cell))
    }

    /// Read a categorical label (text or integer).
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidType`] if the cell is a float.
    pub fn label(&self, row_idx: usize, row: &[Cell]) -> Result<String, SchemaError> {
        let cell = self.cell(row_idx, row)?;

        cell.as_label()
            .ok_or_else(|| self.invalid(row_idx, "text", cell))
    }

    /// Read a probability, which must be a finite number in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidType`] for text cells and
    /// [`SchemaError::OutOfRange`] for values outside `[0, 1]`.
    pub fn probability(&self, row_idx: usize, row: &[Cell]) -> Result<f64, SchemaError> {
        let cell = self.cell(row_idx, row)?;
        let value = cell
            .as_float()
            .ok_or_else(|| self.invalid(row_idx, "float", cell))?;

        if !(0.0..=1.0).contains(&value) {
            return Err(SchemaError::OutOfRange {
                table: self.table,
                row: row_idx,
                column: self.name,
                value,
            });
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn push_row_rejects_wrong_width() {
        let mut table = Table::new(["a", "b"]);

        let result = table.push_row([Cell::from(1_i64)]);

        assert!(matches!(
            result,
            Err(SchemaError::RowWidth {
                row: 0,
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn json_records_become_rows() -> TestResult {
        let table = Table::from_json_str(
            r#"[
                {"customer_id": 1, "age_cat": "age20~34", "freq_cat": "freq0"},
                {"customer_id": 2, "age_cat": "age35~49", "freq_cat": "freq1"}
            ]"#,
        )?;

        assert_eq!(table.len(), 2);

        let id = table.column("customers", "customer_id")?;
        let ids: Vec<i64> = table
            .rows()
            .enumerate()
            .map(|(idx, row)| id.integer(idx, row))
            .collect::<Result<_, _>>()?;

        assert_eq!(ids, vec![1, 2]);

        Ok(())
    }

    #[test]
    fn yaml_records_become_rows() -> TestResult {
        let table = Table::from_yaml_str(
            "- age_cat: age~19\n  freq_cat: freq0\n  segment_id: 1\n  prob_dm1: 0.1\n  prob_dm2: 0.2\n  prob_dm3: 1\n",
        )?;

        let segment = table.column("probabilities", "segment_id")?;
        let prob = table.column("probabilities", "prob_dm3")?;
        let row = table.rows().next().ok_or("expected a row")?;

        assert_eq!(segment.label(0, row)?, "1");
        assert!((prob.probability(0, row)? - 1.0).abs() < f64::EPSILON);

        Ok(())
    }

    #[test]
    fn records_must_share_columns() {
        let missing = Table::from_json_str(r#"[{"a": 1, "b": 2}, {"a": 3}]"#);
        let extra = Table::from_json_str(r#"[{"a": 1}, {"a": 3, "c": 4}]"#);

        assert!(matches!(missing, Err(SchemaError::MissingValue { row: 1, .. })));
        assert!(matches!(
            extra,
            Err(SchemaError::UnexpectedColumn { row: 1, .. })
        ));
    }

    #[test]
    fn missing_column_is_reported_by_name() {
        let table = Table::new(["customer_id"]);

        let result = table.column("customers", "age_cat");

        assert!(matches!(
            result,
            Err(SchemaError::MissingColumn {
                table: "customers",
                column: "age_cat"
            })
        ));
    }

    #[test]
    fn typed_reads_reject_wrong_kinds() -> TestResult {
        let mut table = Table::new(["customer_id", "prob_dm1"]);
        table.push_row([Cell::from("abc"), Cell::from(1.5)])?;

        let id = table.column("customers", "customer_id")?;
        let prob = table.column("probabilities", "prob_dm1")?;
        let row = table.rows().next().ok_or("expected a row")?;

        assert!(matches!(
            id.integer(0, row),
            Err(SchemaError::InvalidType {
                expected: "integer",
                found: "text",
                ..
            })
        ));
        assert!(matches!(
            prob.probability(0, row),
            Err(SchemaError::OutOfRange { .. })
        ));

        Ok(())
    }

    #[test]
    fn csv_fields_are_inferred_by_content() -> TestResult {
        let table = Table::from_csv_str(
            "age_cat,freq_cat,segment_id,prob_dm1,prob_dm2,prob_dm3\nage20~34, freq0 ,3,0.05,1,NaN\n",
        )?;

        assert_eq!(table.columns().first().map(String::as_str), Some("age_cat"));

        let row = table.rows().next().ok_or("expected a row")?;

        assert_eq!(
            row,
            &[
                Cell::from("age20~34"),
                Cell::from("freq0"),
                Cell::from(3_i64),
                Cell::from(0.05),
                Cell::from(1_i64),
                Cell::from("NaN"),
            ]
        );

        // A non-finite probability stays text and is rejected as the wrong kind.
        let prob = table.column("probabilities", "prob_dm3")?;
        assert!(matches!(
            prob.probability(0, row),
            Err(SchemaError::InvalidType { found: "text", .. })
        ));

        Ok(())
    }

    #[test]
    fn csv_records_must_match_the_header() {
        let result = Table::from_csv_str("customer_id,age_cat,freq_cat\n1,young\n");

        assert!(matches!(result, Err(SchemaError::Csv(_))));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            Table::from_json_str("{not json"),
            Err(SchemaError::Json(_))
        ));
    }
}
