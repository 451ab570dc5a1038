//! Rectangular table assembled from extracted rows.

use std::borrow::Cow;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{Error, FieldMapping};

/// One extracted value.
///
/// Serializes as a bare JSON number, string or `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Absent,
}

impl Cell {
    pub fn is_absent(&self) -> bool {
        matches!(self, Cell::Absent)
    }

    /// Text form used by delimited writers; absent cells are empty.
    pub fn to_field(&self) -> Cow<'_, str> {
        match self {
            Cell::Number(n) => Cow::Owned(n.to_string()),
            Cell::Text(s) => Cow::Borrowed(s),
            Cell::Absent => Cow::Borrowed(""),
        }
    }
}

impl From<Option<String>> for Cell {
    fn from(value: Option<String>) -> Self {
        value.map_or(Cell::Absent, Cell::Text)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// Cells of one item, aligned with the expanded header.
pub type Row = Vec<Cell>;

/// Receiver of the header and the rows of one run, in encounter order.
pub trait TableSink {
    /// Write the expanded header derived from `mapping`. Called once.
    fn write_header(&mut self, mapping: &FieldMapping) -> Result<(), Error>;

    /// Append one data row.
    fn write_row(&mut self, row: Row) -> Result<(), Error>;
}

/// In-memory table: a header and rows of equal width.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }
}

impl TableSink for Table {
    fn write_header(&mut self, mapping: &FieldMapping) -> Result<(), Error> {
        if !self.header.is_empty() {
            return Err(Error::InvalidInput("header already written".into()));
        }
        self.header = mapping.header();
        Ok(())
    }

    fn write_row(&mut self, row: Row) -> Result<(), Error> {
        if row.len() != self.header.len() {
            return Err(Error::RowWidth { expected: self.header.len(), actual: row.len() });
        }
        self.rows.push(row);
        Ok(())
    }
}
