//! Prompt construction for the search-grounded news analysis call.
//!
//! The grammar requested here is bit-significant: the sentinel and the seven
//! field tags must match `parser.rs` exactly.

use chrono::Utc;
use chrono_tz::Asia::Taipei;

use super::models::NewsCategory;

/// Delimiter between item blocks in the model's reply.
pub const ITEM_DELIMITER: &str = "|||ITEM|||";

/// Labeled fields each item block must carry, in order.
pub const FIELD_TAGS: [&str; 7] = [
    "TITLE", "SOURCE", "SCORE", "ESG", "SUMMARY", "ANALYSIS", "URL",
];

/// News analysis prompt template. Replace `{current_time}` and `{category}`
/// before sending.
///
/// A line-oriented text grammar instead of JSON: the google_search tool path
/// degrades structured-output fidelity, so we trade a small parsing burden
/// for reliable extraction.
pub const NEWS_PROMPT_TEMPLATE: &str = r#"Role: Professional Office Furniture Sales Consultant.
Current Time: {current_time} (Taipei Time).
Task: Search for [Taiwan Domestic] news within the last 48 hours related to "{category}".

Goal: Identify news that indicates a need for office furniture (e.g., expansion, relocation, new offices, huge profits, new projects).

Format Requirements:
You MUST return the response in a strictly structured format so I can parse it programmatically.
Separate each news item with the delimiter "|||ITEM|||".

For each news item, provide the following fields:
TITLE: [News Headline]
SOURCE: [Source Name, e.g., Yahoo, UDN, MoneyDJ]
SCORE: [Practicality Index 1-10, just the number]
ESG: [Yes/No - Is this related to ESG, Green Procurement, or RSG?]
SUMMARY: [Brief summary of the event]
ANALYSIS: [Sales Analysis: Why is this a furniture sales opportunity? Be specific about products like ergonomic chairs, partitions, conference tables.]
URL: [The URL of the source. If you found it via search, copy it here. If NOT found, strictly write 'null']

Search Constraints:
1. Focus on Taiwan market.
2. Look for keywords: "RSG", "Green Procurement" (綠色採購), "Expansion" (擴編), "New Office" (新辦公室).
3. Find at least 4-6 distinct opportunities.

Example Output Format:
|||ITEM|||
TITLE: 台積電擴大高雄投資
SOURCE: 經濟日報
SCORE: 10
ESG: Yes
SUMMARY: 台積電宣布高雄廠增設第三座2奈米廠...
ANALYSIS: 新廠房意味著大量辦公空間需求，建議鎖定其行政大樓規劃，推銷高階人體工學椅與綠色環保家具。
URL: https://money.udn.com/...
|||ITEM|||
..."#;

/// Renders the full prompt for a category at the current Taipei time.
pub fn build_news_prompt(category: NewsCategory) -> String {
    let now = Utc::now().with_timezone(&Taipei);
    build_news_prompt_at(category, &now.format("%Y/%m/%d %H:%M:%S").to_string())
}

/// Pure core of prompt construction, deterministic given a rendered time.
pub fn build_news_prompt_at(category: NewsCategory, current_time: &str) -> String {
    NEWS_PROMPT_TEMPLATE
        .replace("{current_time}", current_time)
        .replace("{category}", category.label())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_time_and_category_label() {
        let prompt = build_news_prompt_at(NewsCategory::Finance, "2025/11/03 09:15:00");

        assert!(prompt.contains("Current Time: 2025/11/03 09:15:00 (Taipei Time)"));
        assert!(prompt.contains("金融財經、股市相關"));
        assert!(!prompt.contains("{current_time}"));
        assert!(!prompt.contains("{category}"));
    }

    #[test]
    fn test_prompt_requests_the_sentinel_grammar() {
        let prompt = build_news_prompt_at(NewsCategory::Expansion, "2025/11/03 09:15:00");

        assert!(prompt.contains(ITEM_DELIMITER));

        // All seven tags appear as labeled lines, in the documented order.
        let mut last = 0;
        for tag in FIELD_TAGS {
            let needle = format!("\n{tag}:");
            let pos = prompt[last..]
                .find(&needle)
                .unwrap_or_else(|| panic!("tag {tag} missing or out of order"));
            last += pos + needle.len();
        }
    }

    #[test]
    fn test_prompt_demands_literal_null_for_unverified_urls() {
        let prompt = build_news_prompt_at(NewsCategory::Domestic, "2025/11/03 09:15:00");
        assert!(prompt.contains("strictly write 'null'"));
    }

    #[test]
    fn test_prompt_pins_scope_and_count() {
        let prompt = build_news_prompt_at(NewsCategory::Trends, "2025/11/03 09:15:00");
        assert!(prompt.contains("last 48 hours"));
        assert!(prompt.contains("Taiwan market"));
        assert!(prompt.contains("4-6 distinct opportunities"));
    }
}
