mod openai;
mod gemini;
mod cloudflare;
mod chain;

#[cfg(test)]
pub(crate) mod testing;

pub use openai::OpenAiService;
pub use gemini::GeminiService;
pub use cloudflare::CloudflareService;
pub use chain::{ServiceChain, build_service_chain};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::image_data::ImageData;

/// Title and caption returned together by the combined query.
///
/// Either side may be missing when the model only answered part of the
/// request. An empty string is kept as-is so callers can decide whether
/// it counts as an answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleCaption {
    pub title: Option<String>,
    #[serde(alias = "description")]
    pub caption: Option<String>,
}

/// Trait for AI vision services.
///
/// Implement this trait to add a custom AI backend. The library ships with
/// three implementations: [`OpenAiService`], [`GeminiService`], and
/// [`CloudflareService`], plus [`ServiceChain`] which fails over between them.
///
/// # Example
///
/// ```rust,no_run
/// use ai_image_queries::ai::{AiService, OpenAiService};
/// use ai_image_queries::image_data::ImageData;
///
/// # async fn example() -> anyhow::Result<()> {
/// let service = OpenAiService::new("sk-...".into(), "gpt-4o-mini".into());
/// let image = ImageData::new("base64data".into(), "image/jpeg".into());
/// let text = service.complete(&image, "Describe this image").await?;
/// println!("{text}");
/// # Ok(())
/// # }
/// ```
#[async_trait::async_trait]
pub trait AiService: Send + Sync {
    /// The display name of this service (e.g., "OpenAI", "Gemini").
    fn name(&self) -> &str;
    /// Send the image with a prompt and return the model's raw text answer.
    async fn complete(&self, image: &ImageData, prompt: &str) -> Result<String>;
}

/// Prompt for the combined title + caption query.
pub const TITLE_CAPTION_PROMPT: &str = r#"Analyze this image and return a JSON object with the following fields:

{
  "title": "A short, compelling title for this image (3 to 6 words)",
  "caption": "A one or two sentence caption describing the image"
}

Rules:
- "title": No trailing punctuation. Think of it as a headline.
- "caption": Describe the scene, subject, mood, and context like a magazine caption.

Return ONLY the JSON object, no markdown formatting, no code blocks, no extra text."#;

/// Trim whitespace and a single pair of wrapping quotes from a model answer.
pub fn clean_text(text: &str) -> String {
    let trimmed = text.trim();
    let unquoted = [('"', '"'), ('\'', '\''), ('“', '”'), ('`', '`')]
        .iter()
        .find_map(|&(open, close)| {
            trimmed
                .strip_prefix(open)
                .and_then(|rest| rest.strip_suffix(close))
        })
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}

/// Parse a title answer: first non-empty line, without a label or trailing period.
pub fn parse_title(text: &str) -> Result<String> {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    let line = strip_label(line, "title");
    let title = clean_text(line).trim_end_matches('.').trim().to_string();
    if title.is_empty() {
        anyhow::bail!("AI returned an empty title");
    }
    Ok(title)
}

/// Parse a free-text answer (caption, semantic description).
pub fn parse_text(text: &str) -> Result<String> {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        anyhow::bail!("AI returned an empty response");
    }
    Ok(cleaned)
}

/// Parse a tag list answer.
///
/// Accepts comma- or newline-separated lists, including bulleted or hashtag
/// styles. Tags are lowercased and de-duplicated in first-seen order.
pub fn parse_tags(text: &str) -> Result<Vec<String>> {
    let text = strip_label(text.trim(), "tags");
    let mut tags: Vec<String> = Vec::new();

    for raw in text.split([',', '\n']) {
        let tag = raw
            .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '*' | '•' | '#'))
            .trim();
        let tag = clean_text(tag).to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    if tags.is_empty() {
        anyhow::bail!("AI returned no tags");
    }
    Ok(tags)
}

/// Strip a leading `label:` prefix, case-insensitively.
fn strip_label<'a>(text: &'a str, label: &str) -> &'a str {
    match text.split_once(':') {
        Some((head, rest)) if head.trim().eq_ignore_ascii_case(label) => rest.trim(),
        _ => text,
    }
}

/// Parse raw AI response text into a [`TitleCaption`].
///
/// Handles common AI quirks: markdown code fences, trailing commas,
/// and multiple JSON candidates in the response. Tries several extraction
/// strategies before failing. At least one of the two fields must be present.
pub fn parse_title_caption(text: &str) -> Result<TitleCaption> {
    log::debug!("Raw AI response:\n{text}");

    let cleaned = text.trim();

    let candidates = extract_json_candidates(cleaned);

    for candidate in &candidates {
        if let Ok(result) = serde_json::from_str::<TitleCaption>(candidate) {
            if result.title.is_some() || result.caption.is_some() {
                return Ok(result);
            }
        }

        // Trailing commas are a common AI quirk
        let fixed = fix_trailing_commas(candidate);
        if let Ok(result) = serde_json::from_str::<TitleCaption>(&fixed) {
            if result.title.is_some() || result.caption.is_some() {
                return Ok(result);
            }
        }
    }

    if let Some(candidate) = candidates.first() {
        match serde_json::from_str::<serde_json::Value>(candidate) {
            Ok(val) => {
                log::warn!("AI response is valid JSON but doesn't match expected schema");
                log::debug!("Parsed value: {val:#}");
                if let Some(result) = value_to_title_caption(&val) {
                    return Ok(result);
                }
            }
            Err(e) => {
                log::warn!("Failed to parse AI response as JSON: {e}");
            }
        }
    }

    anyhow::bail!("Could not parse AI response as a title/caption JSON object")
}

/// Extract possible JSON object strings from AI response text.
fn extract_json_candidates(text: &str) -> Vec<String> {
    let mut candidates = Vec::new();

    // Markdown code fences (```json ... ``` or ``` ... ```)
    if text.contains("```") {
        let stripped = text
            .lines()
            .skip_while(|l| !l.trim().starts_with("```"))
            .skip(1)
            .take_while(|l| !l.trim().starts_with("```"))
            .collect::<Vec<_>>()
            .join("\n");
        if !stripped.is_empty() {
            candidates.push(stripped);
        }
    }

    // Outermost { ... }
    if let Some(start) = text.find('{') {
        if let Some(end) = text.rfind('}') {
            if end > start {
                let extracted = text[start..=end].to_string();
                candidates.push(extracted.clone());

                let fixed = fix_unquoted_values(&extracted);
                if fixed != extracted {
                    candidates.push(fixed);
                }
            }
        }
    }

    candidates.push(text.to_string());

    candidates
}

/// Quote bare string values in malformed JSON, e.g. `"title": Sunset Pier,`.
fn fix_unquoted_values(text: &str) -> String {
    use std::fmt::Write;

    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escape_next = false;

    while let Some(c) = chars.next() {
        if escape_next {
            result.push(c);
            escape_next = false;
            continue;
        }
        if c == '\\' && in_string {
            result.push(c);
            escape_next = true;
            continue;
        }
        if c == '"' {
            in_string = !in_string;
            result.push(c);
            continue;
        }

        if !in_string && c == ':' {
            result.push(c);

            while let Some(&next) = chars.peek() {
                if next == ' ' || next == '\t' {
                    result.push(next);
                    chars.next();
                } else {
                    break;
                }
            }

            if let Some(&next) = chars.peek() {
                // null/true/false, numbers, strings, objects and arrays are left alone
                if next != '"' && next != '{' && next != '[' && next != 'n'
                    && next != 't' && next != 'f' && !next.is_ascii_digit() && next != '-'
                {
                    let mut value = String::new();
                    while let Some(&vc) = chars.peek() {
                        if vc == ',' || vc == '}' || vc == '\n' {
                            break;
                        }
                        value.push(vc);
                        chars.next();
                    }
                    let escaped = value.trim_end().replace('"', "\\\"");
                    let _ = write!(result, "\"{escaped}\"");
                }
            }
            continue;
        }

        result.push(c);
    }

    result
}

/// Fix trailing commas in JSON (e.g. {"a": 1,} or ["a",])
fn fix_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escape_next = false;

    while let Some(c) = chars.next() {
        if escape_next {
            result.push(c);
            escape_next = false;
            continue;
        }
        if c == '\\' && in_string {
            result.push(c);
            escape_next = true;
            continue;
        }
        if c == '"' {
            in_string = !in_string;
            result.push(c);
            continue;
        }
        if !in_string && c == ',' {
            let rest: String = chars.clone().collect();
            let trimmed = rest.trim_start();
            if trimmed.starts_with('}') || trimmed.starts_with(']') {
                continue;
            }
        }
        result.push(c);
    }
    result
}

/// Pull title/caption out of a generic JSON value, accepting non-string scalars.
fn value_to_title_caption(val: &serde_json::Value) -> Option<TitleCaption> {
    let obj = val.as_object()?;
    let field = |keys: &[&str]| {
        keys.iter().find_map(|k| match obj.get(*k)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Array(items) => {
                let parts: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
                (!parts.is_empty()).then(|| parts.join(" "))
            }
            _ => None,
        })
    };

    let result = TitleCaption {
        title: field(&["title", "Title"]),
        caption: field(&["caption", "Caption", "description"]),
    };

    if result.title.is_some() || result.caption.is_some() {
        Some(result)
    } else {
        None
    }
}
