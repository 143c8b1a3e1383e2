//! In-memory tabular dataset
//!
//! A [`DataFrame`] is an ordered table of named columns holding loosely typed
//! [`Cell`] values. It is owned by the orchestrator for the lifetime of one
//! analysis run; the only mutators are the preprocessor (imputation, nulling,
//! row drops) and the reload after foreign code has run against the data.
//!
//! Cell types are sniffed per value (int → float → bool → text), the same
//! ladder a profiling pass uses; authoritative column semantics come from the
//! schema inferencer, not from the sniff.

use crate::{Error, Result};
use std::fmt;

/// A single table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Missing value
    Null,
    /// Numeric value (integers are widened to f64)
    Number(f64),
    /// Boolean value
    Bool(bool),
    /// Free text
    Text(String),
}

impl Cell {
    /// Parse a raw field into a cell, sniffing the narrowest matching type.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Null;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            #[allow(clippy::cast_precision_loss)]
            return Self::Number(i as f64);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return Self::Number(f);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => Self::Text(trimmed.to_string()),
        }
    }

    /// Numeric view of the cell, if it has one.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Whether the cell is missing.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Number(n) => {
                // Keep integral values free of a trailing ".0" so CSV
                // round-trips stay stable.
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 9_007_199_254_740_992.0 {
                    #[allow(clippy::cast_possible_truncation)]
                    let i = *n as i64;
                    write!(f, "{i}")
                } else {
                    write!(f, "{n}")
                }
            }
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(t) => write!(f, "{t}"),
        }
    }
}

/// One named column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    cells: Vec<Cell>,
}

impl Column {
    /// Column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cells in row order.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

/// Ordered table of typed columns.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    columns: Vec<Column>,
    num_rows: usize,
}

impl DataFrame {
    /// Build a frame from a header and row-major cells.
    ///
    /// # Errors
    /// Returns `Error::InvalidInput` if the header is empty or any row width
    /// differs from the header width.
    pub fn from_rows(header: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        if header.is_empty() {
            return Err(Error::InvalidInput("header has no columns".to_string()));
        }
        let width = header.len();
        let mut columns: Vec<Column> = header
            .into_iter()
            .map(|name| Column {
                name,
                cells: Vec::with_capacity(rows.len()),
            })
            .collect();
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(Error::InvalidInput(format!(
                    "row {i} has {} fields, expected {width}",
                    row.len()
                )));
            }
            for (col, cell) in columns.iter_mut().zip(row) {
                col.cells.push(cell);
            }
        }
        let num_rows = columns[0].cells.len();
        Ok(Self { columns, num_rows })
    }

    /// Parse a frame from CSV text (first record is the header).
    ///
    /// # Errors
    /// Returns an error on CSV syntax errors or an empty header.
    pub fn from_csv_str(text: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());
        let header: Vec<String> = reader
            .headers()
            .map_err(|e| Error::InvalidInput(format!("bad CSV header: {e}")))?
            .iter()
            .map(str::to_string)
            .collect();
        let width = header.len();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| Error::InvalidInput(format!("bad CSV record: {e}")))?;
            let mut row: Vec<Cell> = record.iter().map(Cell::parse).collect();
            // Flexible readers may hand back short rows; pad with nulls.
            row.resize(width, Cell::Null);
            rows.push(row);
        }
        Self::from_rows(header, rows)
    }

    /// Number of rows.
    #[must_use]
    pub const fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of columns.
    #[must_use]
    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    /// Column names in table order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Position of a column by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Cell at (row, column index).
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.columns.get(col).and_then(|c| c.cells.get(row))
    }

    /// Overwrite a cell.
    ///
    /// # Errors
    /// Returns `Error::InvalidInput` when the position is out of bounds.
    pub fn set_cell(&mut self, row: usize, col: usize, value: Cell) -> Result<()> {
        let column = self
            .columns
            .get_mut(col)
            .ok_or_else(|| Error::InvalidInput(format!("column index {col} out of bounds")))?;
        let slot = column
            .cells
            .get_mut(row)
            .ok_or_else(|| Error::InvalidInput(format!("row index {row} out of bounds")))?;
        *slot = value;
        Ok(())
    }

    /// Numeric view of a column: one entry per row, `None` where the cell is
    /// missing or non-numeric.
    ///
    /// # Errors
    /// Returns `Error::InvalidInput` for an unknown column name.
    pub fn numeric_values(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let column = self
            .column(name)
            .ok_or_else(|| Error::InvalidInput(format!("unknown column '{name}'")))?;
        Ok(column.cells.iter().map(Cell::as_number).collect())
    }

    /// Remove the rows at the given indices (any order, duplicates ignored).
    pub fn drop_rows(&mut self, indices: &[usize]) {
        if indices.is_empty() {
            return;
        }
        let mut keep = vec![true; self.num_rows];
        for &i in indices {
            if i < self.num_rows {
                keep[i] = false;
            }
        }
        for column in &mut self.columns {
            let mut it = keep.iter();
            column.cells.retain(|_| *it.next().unwrap_or(&true));
        }
        self.num_rows = self.columns.first().map_or(0, |c| c.cells.len());
    }

    /// Render the header plus the first `k` rows as CSV text, the sample
    /// handed to schema inference.
    #[must_use]
    pub fn sample_csv(&self, k: usize) -> String {
        self.csv_rows(k.min(self.num_rows))
    }

    /// Render the whole frame as CSV text.
    #[must_use]
    pub fn to_csv_string(&self) -> String {
        self.csv_rows(self.num_rows)
    }

    fn csv_rows(&self, rows: usize) -> String {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let header: Vec<&str> = self.column_names();
        // Writing to a Vec<u8> cannot fail.
        let _ = writer.write_record(&header);
        for row in 0..rows {
            let record: Vec<String> = self
                .columns
                .iter()
                .map(|c| c.cells[row].to_string())
                .collect();
            let _ = writer.write_record(&record);
        }
        let bytes = writer.into_inner().unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
