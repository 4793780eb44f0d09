//! Response ingestor: turns the model's delimiter-separated free text into
//! typed opportunity records.
//!
//! Every field is extracted independently and carries its own default
//! policy, so one malformed block never poisons its siblings. The grammar
//! handled here must match `prompts::NEWS_PROMPT_TEMPLATE` exactly.

use chrono::Utc;
use tracing::{debug, warn};

use crate::llm_client::GroundingCitation;

use super::models::{AnalysisResult, NewsCategory, OpportunityItem};
use super::prompts::ITEM_DELIMITER;

/// Placeholder source for items the model returned without one.
const DEFAULT_SOURCE: &str = "網路新聞";
/// Neutral midpoint used when the score is missing or non-numeric.
/// Empirical constant from production behavior; do not re-derive.
const DEFAULT_SCORE: i32 = 5;
/// Anything shorter than this is not a usable URL. Covers "null", "n/a",
/// "-" and similar non-answers; empirical constant, do not re-derive.
const MIN_URL_CHARS: usize = 5;
/// Affirmative tokens for the ESG flag. Fixed list; do not silently extend.
const ESG_AFFIRMATIVE: [&str; 3] = ["yes", "是", "true"];

const FALLBACK_ID: &str = "fallback";
const FALLBACK_TITLE: &str = "今日市場快訊摘要";
const FALLBACK_SOURCE: &str = "綜合分析";
const FALLBACK_ANALYSIS: &str = "請參考上方摘要內容進行業務判斷。";

/// Parses one model reply into an ordered item list plus the citations,
/// passed through untouched.
pub fn parse_response(
    raw_text: &str,
    category: NewsCategory,
    citations: Vec<GroundingCitation>,
) -> AnalysisResult {
    parse_response_at(raw_text, category, citations, Utc::now().timestamp_millis())
}

/// Deterministic core of the ingestor; `stamp` feeds item id generation and
/// is fixed for the whole call, so ids are unique within one result set.
fn parse_response_at(
    raw_text: &str,
    category: NewsCategory,
    citations: Vec<GroundingCitation>,
    stamp: i64,
) -> AnalysisResult {
    let mut items = Vec::new();

    let segments = raw_text
        .split(ITEM_DELIMITER)
        .filter(|segment| !segment.trim().is_empty());

    for (index, segment) in segments.enumerate() {
        match parse_segment(segment, index, stamp) {
            Some(item) => items.push(item),
            None => warn!("Skipping item block without a usable title: {segment:.60}"),
        }
    }

    // The model produced text but nothing matched the grammar: surface the
    // whole reply as a single card so the caller never renders a blank
    // success state.
    if items.is_empty() && !raw_text.is_empty() {
        debug!("No items extracted from non-empty reply, synthesizing fallback card");
        items.push(fallback_item(raw_text, category));
        return AnalysisResult {
            items,
            citations,
            raw_text: Some(raw_text.to_string()),
        };
    }

    AnalysisResult {
        items,
        citations,
        raw_text: None,
    }
}

/// Extracts one item from one block. Returns `None` when the block has no
/// title after normalization; partial items are never emitted.
fn parse_segment(segment: &str, index: usize, stamp: i64) -> Option<OpportunityItem> {
    // Markdown bold crops up on titles when the model gets emphatic.
    let title = extract_field(segment, "TITLE").replace("**", "");
    if title.is_empty() {
        return None;
    }

    let source = non_empty_or(extract_field(segment, "SOURCE"), DEFAULT_SOURCE);
    let score = parse_score(&extract_field(segment, "SCORE"));
    let is_esg = parse_esg_flag(&extract_field(segment, "ESG"));
    let summary = extract_field(segment, "SUMMARY");
    let analysis = extract_field(segment, "ANALYSIS");
    let url = ensure_url(extract_field(segment, "URL"), &title, &source);

    Some(OpportunityItem {
        id: format!("news-{index}-{stamp}"),
        title,
        source,
        score,
        is_esg,
        summary,
        analysis,
        url,
    })
}

/// Finds the line starting with `tag:` (case-insensitive) and captures
/// everything up to the next all-uppercase `LABEL:` line or the end of the
/// block, so values may span multiple lines.
fn extract_field(segment: &str, tag: &str) -> String {
    let mut lines = segment.lines();
    let mut found = false;
    let mut value_lines: Vec<&str> = Vec::new();

    for line in lines.by_ref() {
        if let Some(rest) = strip_tag(line, tag) {
            value_lines.push(rest);
            found = true;
            break;
        }
    }
    if !found {
        return String::new();
    }

    for line in lines {
        if is_label_line(line) {
            break;
        }
        value_lines.push(line);
    }

    value_lines.join("\n").trim().to_string()
}

/// Matches `TAG:` at the start of a line (leading whitespace tolerated),
/// case-insensitively, with optional whitespace before the colon. Returns
/// the remainder of the line.
fn strip_tag<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
    let line = line.trim_start();
    let head = line.get(..tag.len())?;
    if !head.eq_ignore_ascii_case(tag) {
        return None;
    }
    line[tag.len()..].trim_start().strip_prefix(':')
}

/// A line that opens a new field: one or more uppercase ASCII letters
/// immediately followed by a colon.
fn is_label_line(line: &str) -> bool {
    match line.find(':') {
        Some(colon) => colon > 0 && line[..colon].chars().all(|c| c.is_ascii_uppercase()),
        None => false,
    }
}

fn non_empty_or(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}

/// Leading-integer score coercion: "8 分" parses as 8, anything without a
/// leading integer falls back to the neutral midpoint.
fn parse_score(value: &str) -> i32 {
    let trimmed = value.trim();
    let end = trimmed
        .char_indices()
        .take_while(|&(i, c)| c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+')))
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
    trimmed[..end].parse().unwrap_or(DEFAULT_SCORE)
}

/// Loose multi-language affirmative detector for the ESG flag.
fn parse_esg_flag(value: &str) -> bool {
    let lowered = value.to_lowercase();
    ESG_AFFIRMATIVE.iter().any(|token| lowered.contains(token))
}

/// Guarantees a usable URL: a missing value, the literal token "null", or
/// anything under `MIN_URL_CHARS` characters becomes a search link built
/// from title and source, so the card always offers one click to the story.
fn ensure_url(url: String, title: &str, source: &str) -> String {
    if url.is_empty() || url.eq_ignore_ascii_case("null") || url.chars().count() < MIN_URL_CHARS {
        search_url(&format!("{title} {source}"))
    } else {
        url
    }
}

fn search_url(query: &str) -> String {
    format!("https://www.google.com/search?q={}", urlencoding::encode(query))
}

fn fallback_item(raw_text: &str, category: NewsCategory) -> OpportunityItem {
    OpportunityItem {
        id: FALLBACK_ID.to_string(),
        title: FALLBACK_TITLE.to_string(),
        source: FALLBACK_SOURCE.to_string(),
        score: DEFAULT_SCORE,
        is_esg: false,
        summary: raw_text.to_string(),
        analysis: FALLBACK_ANALYSIS.to_string(),
        url: search_url(&format!("{} 新聞", category.label())),
    }
}
