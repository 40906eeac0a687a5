//! Best-effort recovery of reasoning text from plain assistant content.
//!
//! Some providers put their thinking channel straight into `content` using
//! ad-hoc textual conventions instead of a dedicated response field. The
//! extractor tries an ordered list of matchers and takes the first hit: tag
//! pairs before line-prefixed markers. Every matcher is pure and total, so
//! running extraction can never fail a turn; text without any marker passes
//! through untouched.

/// Marker set tried during extraction, in priority order. The defaults
/// cover the conventions observed in the wild; callers can substitute
/// their own list.
#[derive(Debug, Clone)]
pub struct ReasoningMarkers {
    /// Open/close tag pairs, e.g. `<think>` / `</think>`.
    pub tag_pairs: Vec<(String, String)>,
    /// Line prefixes terminated by a blank line or end of text.
    pub line_prefixes: Vec<String>,
}

impl Default for ReasoningMarkers {
    fn default() -> Self {
        let tag = |open: &str, close: &str| (open.to_string(), close.to_string());
        Self {
            tag_pairs: vec![
                tag("<think>", "</think>"),
                tag("<thinking>", "</thinking>"),
                tag("<reasoning>", "</reasoning>"),
                tag("<思考>", "</思考>"),
            ],
            line_prefixes: vec![
                "reasoning:".to_string(),
                "thought:".to_string(),
                "思考：".to_string(),
                "思考:".to_string(),
            ],
        }
    }
}

/// Try to split `content` into `(reasoning, remaining content)`.
///
/// Returns `None` when no marker matches. The remaining content is `None`
/// when removing the reasoning leaves nothing visible. Running extraction
/// on already-cleaned content is a no-op.
pub fn extract_reasoning(
    content: &str,
    markers: &ReasoningMarkers,
) -> Option<(String, Option<String>)> {
    for (open, close) in &markers.tag_pairs {
        if let Some(hit) = match_tag_pair(content, open, close) {
            return Some(hit);
        }
    }

    for prefix in &markers.line_prefixes {
        if let Some(hit) = match_line_prefix(content, prefix) {
            return Some(hit);
        }
    }

    None
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn match_tag_pair(content: &str, open: &str, close: &str) -> Option<(String, Option<String>)> {
    let start = content.find(open)?;
    let after_open = start + open.len();
    let close_offset = content[after_open..].find(close)?;
    let close_start = after_open + close_offset;

    let reasoning = non_empty(&content[after_open..close_start])?;

    let mut cleaned = String::new();
    cleaned.push_str(&content[..start]);
    cleaned.push_str(&content[close_start + close.len()..]);

    Some((reasoning, non_empty(&cleaned)))
}

fn match_line_prefix(content: &str, prefix: &str) -> Option<(String, Option<String>)> {
    let trimmed = content.trim_start();

    let head = trimmed.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }

    // Reasoning runs from after the prefix until the first blank line
    let body = &trimmed[prefix.len()..];
    let mut reasoning_lines = Vec::new();
    let mut consumed = 0;

    for line in body.split('\n') {
        consumed += line.len() + 1;
        if !reasoning_lines.is_empty() && line.trim().is_empty() {
            break;
        }
        reasoning_lines.push(line.trim());
    }

    let reasoning = non_empty(&reasoning_lines.join("\n"))?;
    let remaining = body.get(consumed..).unwrap_or("");
    Some((reasoning, non_empty(remaining)))
}
