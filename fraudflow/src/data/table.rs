//! Raw tabular data.
//!
//! A [`RawTable`] holds named columns of raw string cells with explicit
//! missing markers. Row order is source order and is preserved by every
//! operation here; nothing downstream may reorder rows except the seeded
//! split.

use crate::errors::{SchemaError, TableParseError};
use std::io::Read;

/// Cell spellings parsed as missing, compared case-insensitively after
/// trimming.
const MISSING_TOKENS: [&str; 6] = ["na", "n/a", "#n/a", "nan", "null", "none"];

/// A table of raw string cells with explicit missing markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Creates an empty table with the given column names.
    pub fn new(columns: Vec<String>) -> Result<Self, SchemaError> {
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].contains(column) {
                return Err(SchemaError::DuplicateColumn {
                    column: column.clone(),
                });
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Appends a row. The row must match the table width.
    pub fn push_row(&mut self, row: Vec<Option<String>>) -> Result<(), SchemaError> {
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

    /// Returns the column names in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the position of a column, if present.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Returns the rows in order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    /// Returns a cell, `None` when the value is missing.
    ///
    /// # Panics
    ///
    /// Panics when the indices are out of range.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows[row][col].as_deref()
    }

    /// Returns one column's cells in row order.
    ///
    /// # Panics
    ///
    /// Panics when the index is out of range.
    #[must_use]
    pub fn column(&self, col: usize) -> Vec<Option<&str>> {
        self.rows.iter().map(|row| row[col].as_deref()).collect()
    }

    /// Parses a CSV document. The first record is the header; empty cells and
    /// the usual NA spellings parse as missing.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, TableParseError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let mut table = Self::new(headers.iter().map(str::to_string).collect())?;

        for record in csv_reader.records() {
            let record = record?;
            table.push_row(record.iter().map(parse_cell).collect())?;
        }

        Ok(table)
    }

    /// Renders the table as CSV bytes. Missing cells render as empty.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
        }
        writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }

    /// Concatenates tables row-wise over the column union.
    ///
    /// Columns keep first-seen order across the inputs; cells for columns a
    /// source lacks are missing.
    pub fn concat(tables: Vec<Self>) -> Result<Self, SchemaError> {
        let mut columns: Vec<String> = Vec::new();
        for table in &tables {
            for column in table.columns() {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }

        let mut combined = Self::new(columns.clone())?;
        for table in tables {
            let mapping: Vec<Option<usize>> =
                columns.iter().map(|c| table.column_index(c)).collect();
            for row in table.rows {
                let widened = mapping
                    .iter()
                    .map(|idx| idx.and_then(|i| row[i].clone()))
                    .collect();
                combined.push_row(widened)?;
            }
        }

        Ok(combined)
    }

    /// Drops every row containing at least one missing value.
    ///
    /// Returns the cleaned table and the number of rows removed.
    #[must_use]
    pub fn drop_missing(self) -> (Self, usize) {
        let before = self.rows.len();
        let rows: Vec<Vec<Option<String>>> = self
            .rows
            .into_iter()
            .filter(|row| row.iter().all(Option::is_some))
            .collect();
        let dropped = before - rows.len();

        (
            Self {
                columns: self.columns,
                rows,
            },
            dropped,
        )
    }
}

/// Returns true if the token spells a missing value.
#[must_use]
pub fn is_missing(token: &str) -> bool {
    let trimmed = token.trim();
    trimmed.is_empty()
        || MISSING_TOKENS.contains(&trimmed.to_ascii_lowercase().as_str())
}

fn parse_cell(token: &str) -> Option<String> {
    if is_missing(token) {
        None
    } else {
        Some(token.to_string())
    }
}
