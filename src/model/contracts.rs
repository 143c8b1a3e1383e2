//! Named structured-output contracts
//!
//! A closed set of tagged contract variants, one per model interaction, each
//! with a typed response struct whose required fields are checked at parse
//! time. The function-calling schema sent with each request mirrors the
//! typed struct so the model is steered toward the shape we will accept.

use crate::schema::ColumnMetadata;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// The closed set of model-call contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contract {
    /// Per-column semantic metadata from a row sample
    SchemaInference,
    /// Dataset title/introduction/summary plus suggested open-ended analyses
    SummaryAndNextSteps,
    /// Model-authored analysis code with a declared output artifact
    CodeForAnalysis,
    /// Interpretation of a produced chart image
    ImageFeedback,
    /// Final narrative across all gathered facts
    Narrative,
}

impl Contract {
    /// Wire name of the contract, also used as the function-call target.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SchemaInference => "schema-inference",
            Self::SummaryAndNextSteps => "summary-and-next-steps",
            Self::CodeForAnalysis => "code-for-analysis",
            Self::ImageFeedback => "image-feedback",
            Self::Narrative => "narrative",
        }
    }

    /// Function-calling schema describing the contract's required fields.
    #[must_use]
    pub fn function_schema(self) -> Value {
        match self {
            Self::SchemaInference => json!([{
                "name": self.name(),
                "description": "Identify each column's name, data type, description, logical minimum value inferred from the column name, and whether it suits descriptive statistics",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "column_metadata": {
                            "type": "array",
                            "description": "Metadata for each column",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "name": { "type": "string", "description": "Name of the column" },
                                    "type": { "type": "string", "description": "Inferred data type: integer, float, datetime, string, boolean or object" },
                                    "description": { "type": "string", "description": "Brief description of what this column signifies" },
                                    "min_value": { "type": "number", "description": "Logical minimum value this column could take (e.g. age >= 0); numeric types only" },
                                    "stats": { "type": "boolean", "description": "Whether the column suits descriptive statistics; identifiers and purely categorical data do not" }
                                },
                                "required": ["name", "type", "description", "stats"]
                            },
                            "minItems": 1
                        }
                    },
                    "required": ["column_metadata"]
                }
            }]),
            Self::SummaryAndNextSteps => json!([{
                "name": self.name(),
                "description": "Produce a title, introduction and summary for the dataset, and state which open-ended analyses apply with a prompt for each",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "description": "Concise title for the dataset analysis" },
                        "introduction": { "type": "string", "description": "Short overview of the dataset, its structure and purpose" },
                        "summary": { "type": "string", "description": "Key observations drawn from the descriptive statistics" },
                        "time_series": Self::suggested_analysis_schema("time-series analysis"),
                        "geospatial": Self::suggested_analysis_schema("geospatial analysis"),
                        "network": Self::suggested_analysis_schema("network/graph analysis"),
                    },
                    "required": ["title", "introduction", "summary", "time_series", "geospatial", "network"]
                }
            }]),
            Self::CodeForAnalysis => json!([{
                "name": self.name(),
                "description": "Respond with python code for the given prompt; no comment blocks, only code",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "python_code": { "type": "string", "description": "Python code executable programmatically for the given prompt; the dataset is available as a dataframe named 'df'" },
                        "output_file": { "type": "string", "description": "Name of the PNG file the code saves its chart to" },
                        "title": { "type": "string", "description": "Short title for the analysis" },
                        "rationale": { "type": "string", "description": "Rationale for choosing this analysis" }
                    },
                    "required": ["python_code", "output_file", "title", "rationale"]
                }
            }]),
            Self::ImageFeedback => json!([{
                "name": self.name(),
                "description": "From the given chart image, provide inference, insights and recommendations",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "inference": { "type": "string", "description": "What the chart shows" },
                        "insights": { "type": "string", "description": "Noteworthy patterns or anomalies" },
                        "recommendations": { "type": "string", "description": "Suggested follow-up actions" }
                    },
                    "required": ["inference", "insights", "recommendations"]
                }
            }]),
            Self::Narrative => json!([{
                "name": self.name(),
                "description": "Synthesize a narrative over the preprocessing log, correlation pairs, outlier ranges and cluster counts",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "preprocessing": { "type": "string", "description": "Prose on data cleaning and its impact" },
                        "correlation": { "type": "string", "description": "Prose on notable correlations" },
                        "outliers": { "type": "string", "description": "Prose on detected outliers" },
                        "cluster": { "type": "string", "description": "Prose on the cluster structure" },
                        "summary": { "type": "string", "description": "Overall findings" }
                    },
                    "required": ["preprocessing", "correlation", "outliers", "cluster", "summary"]
                }
            }]),
        }
    }

    fn suggested_analysis_schema(kind: &str) -> Value {
        json!({
            "type": "object",
            "description": format!("Whether {kind} applies to this dataset, and the prompt to run if it does"),
            "properties": {
                "isavailable": { "type": "boolean" },
                "prompt": { "type": "string" }
            },
            "required": ["isavailable", "prompt"]
        })
    }
}

/// Response payload for [`Contract::SchemaInference`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaInference {
    /// One entry per source column, in column order
    pub column_metadata: Vec<ColumnMetadata>,
}

/// One suggested open-ended analysis dimension.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestedAnalysis {
    /// Whether the dimension applies to this dataset
    pub isavailable: bool,
    /// Prompt to feed the generate-execute loop when it applies
    #[serde(default)]
    pub prompt: String,
}

/// Response payload for [`Contract::SummaryAndNextSteps`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryAndNextSteps {
    /// Concise dataset title
    pub title: String,
    /// Dataset overview prose
    pub introduction: String,
    /// Observations from the descriptive statistics
    pub summary: String,
    /// Time-series analysis suggestion
    pub time_series: SuggestedAnalysis,
    /// Geospatial analysis suggestion
    pub geospatial: SuggestedAnalysis,
    /// Network analysis suggestion
    pub network: SuggestedAnalysis,
}

impl SummaryAndNextSteps {
    /// Suggested analyses that the model marked available, in fixed order.
    #[must_use]
    pub fn available_prompts(&self) -> Vec<&SuggestedAnalysis> {
        [&self.time_series, &self.geospatial, &self.network]
            .into_iter()
            .filter(|s| s.isavailable && !s.prompt.trim().is_empty())
            .collect()
    }
}

/// Response payload for [`Contract::CodeForAnalysis`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeForAnalysis {
    /// Code fragment to execute against the dataset binding
    pub python_code: String,
    /// Declared output artifact the fragment writes
    pub output_file: String,
    /// Analysis title
    pub title: String,
    /// Rationale for the chosen analysis
    pub rationale: String,
}

/// Response payload for [`Contract::ImageFeedback`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageFeedback {
    /// What the chart shows
    pub inference: String,
    /// Noteworthy patterns
    pub insights: String,
    /// Follow-up actions (wire field is plural)
    #[serde(rename = "recommendations")]
    pub recommendation: String,
}

/// Response payload for [`Contract::Narrative`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NarrativeText {
    /// Prose on preprocessing
    #[serde(default)]
    pub preprocessing: String,
    /// Prose on correlations
    #[serde(default)]
    pub correlation: String,
    /// Prose on outliers
    #[serde(default)]
    pub outliers: String,
    /// Prose on clustering
    #[serde(default)]
    pub cluster: String,
    /// Overall findings
    #[serde(default)]
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_names_are_stable() {
        assert_eq!(Contract::SchemaInference.name(), "schema-inference");
        assert_eq!(Contract::SummaryAndNextSteps.name(), "summary-and-next-steps");
        assert_eq!(Contract::CodeForAnalysis.name(), "code-for-analysis");
        assert_eq!(Contract::ImageFeedback.name(), "image-feedback");
        assert_eq!(Contract::Narrative.name(), "narrative");
    }

    #[test]
    fn schemas_declare_their_function_name() {
        for contract in [
            Contract::SchemaInference,
            Contract::SummaryAndNextSteps,
            Contract::CodeForAnalysis,
            Contract::ImageFeedback,
            Contract::Narrative,
        ] {
            let schema = contract.function_schema();
            assert_eq!(schema[0]["name"], contract.name());
            assert!(schema[0]["parameters"]["required"].is_array());
        }
    }

    #[test]
    fn image_feedback_maps_plural_wire_field() {
        let parsed: ImageFeedback = serde_json::from_value(json!({
            "inference": "a", "insights": "b", "recommendations": "c"
        }))
        .unwrap();
        assert_eq!(parsed.recommendation, "c");
    }

    #[test]
    fn available_prompts_respects_flags_and_order() {
        let steps = SummaryAndNextSteps {
            title: String::new(),
            introduction: String::new(),
            summary: String::new(),
            time_series: SuggestedAnalysis { isavailable: true, prompt: "trend".to_string() },
            geospatial: SuggestedAnalysis { isavailable: false, prompt: "map".to_string() },
            network: SuggestedAnalysis { isavailable: true, prompt: "  ".to_string() },
        };
        let available = steps.available_prompts();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].prompt, "trend");
    }
}
