//! Preprocessor
//!
//! Cleans the frame in a fixed order: mean-impute missing numeric values,
//! null values strictly below the inferred logical minimum, then drop every
//! row still missing a value in a stats-eligible column. Imputation runs
//! before invalidity nulling so an imputed value below the minimum is
//! re-nulled, counted as out-of-range and dropped. Applying the preprocessor
//! to its own output is a no-op.

use crate::frame::{Cell, DataFrame};
use crate::schema::{stats_eligible_numeric, ColumnMetadata};
use crate::stats::mean;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Quantitative change log produced by one preprocessing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessingLog {
    /// Rows removed because a stats-eligible value was still missing
    pub dropped_rows: usize,
    /// Values nulled for falling strictly below the logical minimum
    pub out_of_range_by_column: BTreeMap<String, usize>,
}

impl PreprocessingLog {
    /// Whether the pass changed nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.dropped_rows == 0 && self.out_of_range_by_column.values().all(|&n| n == 0)
    }
}

/// Run the preprocessing pass over the frame in place.
///
/// # Errors
/// Returns an error only when metadata names a column absent from the frame.
pub fn preprocess(
    frame: &mut DataFrame,
    metadata: &[ColumnMetadata],
) -> Result<PreprocessingLog> {
    let eligible = stats_eligible_numeric(metadata);
    let mut log = PreprocessingLog::default();

    // Step 1: mean imputation per eligible column.
    for column in &eligible {
        let col_idx = match frame.column_index(&column.name) {
            Some(i) => i,
            None => {
                return Err(crate::Error::InvalidInput(format!(
                    "metadata references unknown column '{}'",
                    column.name
                )))
            }
        };
        let values = frame.numeric_values(&column.name)?;
        let present: Vec<f64> = values.iter().copied().flatten().collect();
        if present.is_empty() {
            continue; // Nothing to impute from; the rows drop in step 3.
        }
        let fill = mean(&present);
        for (row, value) in values.iter().enumerate() {
            if value.is_none() {
                frame.set_cell(row, col_idx, Cell::Number(fill))?;
            }
        }
    }

    // Step 2: null values strictly below the logical minimum.
    for column in &eligible {
        let Some(min) = column.min_value else {
            log.out_of_range_by_column.insert(column.name.clone(), 0);
            continue;
        };
        let col_idx = frame.column_index(&column.name).unwrap_or_default();
        let values = frame.numeric_values(&column.name)?;
        let mut nulled = 0;
        for (row, value) in values.iter().enumerate() {
            if matches!(value, Some(v) if *v < min) {
                frame.set_cell(row, col_idx, Cell::Null)?;
                nulled += 1;
            }
        }
        log.out_of_range_by_column.insert(column.name.clone(), nulled);
    }

    // Step 3: drop rows still missing a value in any eligible column.
    let mut to_drop = Vec::new();
    for row in 0..frame.num_rows() {
        let incomplete = eligible.iter().any(|column| {
            frame
                .column_index(&column.name)
                .and_then(|col| frame.cell(row, col))
                .is_some_and(Cell::is_null)
        });
        if incomplete {
            to_drop.push(row);
        }
    }
    log.dropped_rows = to_drop.len();
    frame.drop_rows(&to_drop);

    info!(
        dropped_rows = log.dropped_rows,
        out_of_range = log.out_of_range_by_column.values().sum::<usize>(),
        rows_remaining = frame.num_rows(),
        "preprocessing complete"
    );
    Ok(log)
}
