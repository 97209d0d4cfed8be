//! Analysis record returned by the analysis model
//!
//! The model is asked for structured JSON, but the payload is still checked
//! here on receipt: every required top-level field must be present before
//! anything is handed to the session or the renderer.

use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level fields the analysis payload must carry
pub(crate) const REQUIRED_FIELDS: [&str; 5] = [
    "transcription",
    "trendingKeywords",
    "titles",
    "descriptions",
    "thumbnailConcept",
];

/// Structured content extracted from one video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnalysisResult {
    /// Full transcript, not time-coded
    pub(crate) transcription: String,
    /// Keywords in the order the model ranked them
    pub(crate) trending_keywords: Vec<String>,
    #[serde(default)]
    pub(crate) sources: Vec<Source>,
    pub(crate) titles: Vec<TitleOption>,
    pub(crate) descriptions: Descriptions,
    pub(crate) thumbnail_concept: ThumbnailConcept,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Source {
    pub(crate) title: String,
    pub(crate) uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TitleOption {
    pub(crate) text: String,
    /// 1 is best; not guaranteed unique or contiguous
    pub(crate) rank: u32,
    pub(crate) reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Descriptions {
    pub(crate) youtube: String,
    pub(crate) instagram: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ThumbnailConcept {
    pub(crate) idea: String,
    /// Passed verbatim to the thumbnail model
    pub(crate) prompt: String,
}

impl AnalysisResult {
    /// Parse and validate the JSON text produced by the analysis model.
    #[cfg(test)]
    pub(crate) fn from_json(text: &str) -> Result<Self, GatewayError> {
        Self::from_value(parse_payload(text)?)
    }

    /// Validate an already parsed analysis payload.
    pub(crate) fn from_value(mut value: Value) -> Result<Self, GatewayError> {
        let object = value.as_object_mut().ok_or_else(|| {
            GatewayError::InvalidResponse("Analysis payload is not a JSON object".into())
        })?;

        if let Some(missing) = REQUIRED_FIELDS
            .iter()
            .find(|field| object.get(**field).filter(|v| !v.is_null()).is_none())
        {
            return Err(GatewayError::MissingField(*missing));
        }

        // `sources` is optional; an explicit null means "none"
        if object.get("sources").is_some_and(Value::is_null) {
            object.remove("sources");
        }

        serde_json::from_value(value).map_err(|e| {
            GatewayError::InvalidResponse(format!("Analysis does not match schema: {}", e))
        })
    }

    /// Title options ordered for display, ascending by rank.
    ///
    /// Ties keep the order the model returned them in.
    pub(crate) fn titles_by_rank(&self) -> Vec<&TitleOption> {
        let mut titles: Vec<&TitleOption> = self.titles.iter().collect();
        titles.sort_by_key(|title| title.rank);
        titles
    }
}

/// Parse the model's text as JSON without validating its shape
pub(crate) fn parse_payload(text: &str) -> Result<Value, GatewayError> {
    serde_json::from_str(text)
        .map_err(|e| GatewayError::InvalidResponse(format!("Analysis is not valid JSON: {}", e)))
}

/// Whether the payload carries a non-null `sources` field
pub(crate) fn declares_sources(value: &Value) -> bool {
    value.get("sources").is_some_and(|sources| !sources.is_null())
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_parse_complete_payload() {
        let analysis = sample_analysis();
        assert_eq!(analysis.titles.len(), 5);
        assert_eq!(analysis.trending_keywords[0], "tiny house");
        assert_eq!(analysis.sources.len(), 1);
        assert!(analysis.descriptions.instagram.contains("#tinyhouse"));
        assert!(analysis.thumbnail_concept.prompt.starts_with("a builder"));
    }

    #[test]
    fn test_each_required_field_is_enforced() {
        for field in REQUIRED_FIELDS {
            let json = sample_json_without(field);
            match AnalysisResult::from_json(&json) {
                Err(GatewayError::MissingField(name)) => assert_eq!(name, field),
                other => panic!("expected missing {} to fail, got {:?}", field, other),
            }
        }
    }

    #[test]
    fn test_null_required_field_counts_as_missing() {
        let mut value: Value = serde_json::from_str(SAMPLE_JSON).unwrap();
        value["transcription"] = Value::Null;
        assert!(matches!(
            AnalysisResult::from_json(&value.to_string()),
            Err(GatewayError::MissingField("transcription"))
        ));
    }

    #[test]
    fn test_sources_default_to_empty() {
        let analysis = AnalysisResult::from_json(&sample_json_without("sources")).unwrap();
        assert!(analysis.sources.is_empty());

        let mut value: Value = serde_json::from_str(SAMPLE_JSON).unwrap();
        value["sources"] = Value::Null;
        let analysis = AnalysisResult::from_json(&value.to_string()).unwrap();
        assert!(analysis.sources.is_empty());
    }

    #[test]
    fn test_declares_sources() {
        assert!(declares_sources(&parse_payload(SAMPLE_JSON).unwrap()));
        assert!(declares_sources(&serde_json::json!({ "sources": [] })));
        assert!(!declares_sources(&serde_json::json!({ "sources": null })));
        assert!(!declares_sources(&parse_payload(&sample_json_without("sources")).unwrap()));
    }

    #[test]
    fn test_nested_shape_mismatch_is_invalid_response() {
        let mut value: Value = serde_json::from_str(SAMPLE_JSON).unwrap();
        value["descriptions"] = serde_json::json!({ "youtube": "only one" });
        assert!(matches!(
            AnalysisResult::from_json(&value.to_string()),
            Err(GatewayError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_non_json_and_non_object_payloads() {
        assert!(matches!(
            AnalysisResult::from_json("Sure! Here is your analysis"),
            Err(GatewayError::InvalidResponse(_))
        ));
        assert!(matches!(
            AnalysisResult::from_json("[1, 2, 3]"),
            Err(GatewayError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_titles_sorted_ascending_by_rank() {
        let analysis = sample_analysis();
        let ranks: Vec<u32> = analysis.titles_by_rank().iter().map(|t| t.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
        // Stored order is untouched
        assert_eq!(analysis.titles[0].rank, 3);
    }

    #[test]
    fn test_duplicate_and_sparse_ranks_are_kept() {
        let mut analysis = sample_analysis();
        analysis.titles = vec![
            TitleOption { text: "a".into(), rank: 3, reasoning: String::new() },
            TitleOption { text: "b".into(), rank: 1, reasoning: String::new() },
            TitleOption { text: "c".into(), rank: 5, reasoning: String::new() },
            TitleOption { text: "d".into(), rank: 1, reasoning: String::new() },
        ];
        let texts: Vec<&str> = analysis
            .titles_by_rank()
            .iter()
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(texts, vec!["b", "d", "a", "c"]);
    }
}
