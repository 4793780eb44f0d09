//! Data model for the opportunity analysis flow.

use serde::{Deserialize, Serialize};

use crate::llm_client::GroundingCitation;

/// News category the consultant selects before each request. Closed set;
/// the prompt embeds the Traditional-Chinese label verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsCategory {
    Expansion,
    Finance,
    Domestic,
    Trends,
}

impl NewsCategory {
    /// Label sent to the model and used for fallback search URLs.
    pub fn label(self) -> &'static str {
        match self {
            NewsCategory::Expansion => "集團合併、擴編、辦公室購置、土地買賣",
            NewsCategory::Finance => "金融財經、股市相關",
            NewsCategory::Domestic => "國內時事",
            NewsCategory::Trends => "趨勢產業發展",
        }
    }
}

/// One parsed unit of news-derived sales intelligence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityItem {
    /// Unique within a single result set, not across requests.
    pub id: String,
    pub title: String,
    pub source: String,
    /// Practicality index, expected 1–10 but not enforced.
    pub score: i32,
    #[serde(rename = "isESG")]
    pub is_esg: bool,
    pub summary: String,
    pub analysis: String,
    /// Never empty; an unusable URL is replaced by a search link.
    pub url: String,
}

/// Top-level output of one analysis request. Constructed fresh per request;
/// nothing is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub items: Vec<OpportunityItem>,
    pub citations: Vec<GroundingCitation>,
    /// Set only on the degraded fallback path, for diagnostic display.
    #[serde(rename = "rawText", skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_deserializes_from_snake_case() {
        let category: NewsCategory = serde_json::from_str(r#""expansion""#).unwrap();
        assert_eq!(category, NewsCategory::Expansion);

        let category: NewsCategory = serde_json::from_str(r#""trends""#).unwrap();
        assert_eq!(category, NewsCategory::Trends);
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        assert!(serde_json::from_str::<NewsCategory>(r#""sports""#).is_err());
    }

    #[test]
    fn test_item_serializes_with_exact_esg_key() {
        let item = OpportunityItem {
            id: "news-0-1".to_string(),
            title: "title".to_string(),
            source: "source".to_string(),
            score: 7,
            is_esg: true,
            summary: String::new(),
            analysis: String::new(),
            url: "https://example.com/a".to_string(),
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["isESG"], true);
        assert!(json.get("is_esg").is_none());
    }

    #[test]
    fn test_raw_text_is_omitted_when_absent() {
        let result = AnalysisResult {
            items: vec![],
            citations: vec![],
            raw_text: None,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("rawText").is_none());
    }
}
