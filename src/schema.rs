//! Schema inference
//!
//! Sends the header plus a small row sample to the model and receives
//! per-column semantic metadata. This is the only stage whose failure aborts
//! the run: without column metadata no statistics are possible, so there is
//! no retry and no fallback here.

use crate::frame::DataFrame;
use crate::model::{parse_arguments, Contract, ModelClient, ModelRequest, SchemaInference};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Instruction for the schema-inference call.
const SCHEMA_INSTRUCTION: &str = "Analyze the initial lines of the provided dataset. \
The first line is the header, followed by a small portion of the data. \
Extract the column names from the header and infer each column's data type from its values and name. \
Estimate the logical minimum value for numeric columns based on the column name. \
Determine whether each column suits descriptive statistics: numerical or continuous data is preferred, \
identifiers and purely categorical data are not. \
Valid types are integer, float, datetime, string, boolean and object.";

/// Inferred data type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Whole numbers
    Integer,
    /// Real numbers
    Float,
    /// Dates and timestamps
    Datetime,
    /// Free text
    String,
    /// True/false
    Boolean,
    /// Anything else
    Object,
}

impl ColumnType {
    /// Whether the type participates in numeric analyses.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

/// Per-column semantic metadata, produced once by schema inference and
/// immutable afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMetadata {
    /// Column name
    pub name: String,
    /// Inferred data type
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// What the column signifies
    #[serde(default)]
    pub description: String,
    /// Logical minimum (numeric types only)
    #[serde(default)]
    pub min_value: Option<f64>,
    /// Whether the column suits descriptive statistics
    #[serde(rename = "stats", default)]
    pub stats_eligible: bool,
}

impl ColumnMetadata {
    /// Whether the column participates in numeric analyses: flagged eligible
    /// and actually numeric. This is the single filter used by statistics,
    /// preprocessing and the fixed battery.
    #[must_use]
    pub const fn is_stats_numeric(&self) -> bool {
        self.stats_eligible && self.column_type.is_numeric()
    }
}

/// The stats-eligible numeric columns, in metadata order.
#[must_use]
pub fn stats_eligible_numeric(metadata: &[ColumnMetadata]) -> Vec<&ColumnMetadata> {
    metadata.iter().filter(|m| m.is_stats_numeric()).collect()
}

/// Infer column metadata from a sample of the frame.
///
/// # Errors
/// Returns `Error::SchemaInference` when the remote call fails, the response
/// violates the contract, or the metadata list is empty. Fatal for the run.
pub fn infer_schema(
    client: &dyn ModelClient,
    frame: &DataFrame,
    sample_rows: usize,
) -> Result<Vec<ColumnMetadata>> {
    let request = ModelRequest::new(
        SCHEMA_INSTRUCTION,
        frame.sample_csv(sample_rows),
        Contract::SchemaInference,
    );
    let arguments = client
        .request(&request)
        .map_err(|e| Error::SchemaInference(e.to_string()))?;
    let response: SchemaInference = parse_arguments(Contract::SchemaInference, &arguments)
        .map_err(|e| Error::SchemaInference(e.to_string()))?;
    let mut metadata = response.column_metadata;
    if metadata.is_empty() {
        return Err(Error::SchemaInference(
            "model returned no column metadata".to_string(),
        ));
    }
    for column in &mut metadata {
        // Invariant: min_value is only meaningful for numeric types.
        if column.min_value.is_some() && !column.column_type.is_numeric() {
            warn!(
                column = %column.name,
                column_type = ?column.column_type,
                "discarding min_value on non-numeric column"
            );
            column.min_value = None;
        }
    }
    info!(
        columns = metadata.len(),
        eligible = stats_eligible_numeric(&metadata).len(),
        "schema inference complete"
    );
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Scripted(serde_json::Value);

    impl ModelClient for Scripted {
        fn request(&self, _request: &ModelRequest) -> Result<serde_json::Value> {
            Ok(self.0.clone())
        }
    }

    fn frame() -> DataFrame {
        DataFrame::from_csv_str("id,age\n1,30\n2,41\n").unwrap()
    }

    #[test]
    fn parses_metadata_and_applies_min_value_invariant() {
        let client = Scripted(json!({
            "column_metadata": [
                { "name": "id", "type": "string", "description": "identifier", "min_value": 0, "stats": false },
                { "name": "age", "type": "integer", "description": "age in years", "min_value": 0, "stats": true }
            ]
        }));
        let metadata = infer_schema(&client, &frame(), 10).unwrap();
        assert_eq!(metadata.len(), 2);
        // String column had a min_value; the invariant strips it.
        assert_eq!(metadata[0].min_value, None);
        assert_eq!(metadata[1].min_value, Some(0.0));
        assert!(metadata[1].is_stats_numeric());
        assert!(!metadata[0].is_stats_numeric());
    }

    #[test]
    fn empty_metadata_is_fatal() {
        let client = Scripted(json!({ "column_metadata": [] }));
        assert!(matches!(
            infer_schema(&client, &frame(), 10),
            Err(Error::SchemaInference(_))
        ));
    }

    #[test]
    fn malformed_response_is_fatal() {
        let client = Scripted(json!({ "columns": "nope" }));
        assert!(matches!(
            infer_schema(&client, &frame(), 10),
            Err(Error::SchemaInference(_))
        ));
    }

    #[test]
    fn eligibility_filter_excludes_non_numeric_even_if_flagged() {
        let metadata = vec![
            ColumnMetadata {
                name: "notes".to_string(),
                column_type: ColumnType::String,
                description: String::new(),
                min_value: None,
                stats_eligible: true,
            },
            ColumnMetadata {
                name: "price".to_string(),
                column_type: ColumnType::Float,
                description: String::new(),
                min_value: Some(0.0),
                stats_eligible: true,
            },
        ];
        let eligible = stats_eligible_numeric(&metadata);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].name, "price");
    }
}
