//! Lenient hashtag parsing for model replies.
//!
//! Tags are cosmetic, so anything unparseable yields an empty list
//! instead of an error.

use serde_json::Value;

/// Extract hashtags from a reply that should be a JSON array of strings.
///
/// Accepts a bare array, an array inside a markdown code fence, or an
/// array embedded in surrounding prose.
pub fn parse_hashtags(reply: &str) -> Vec<String> {
    let Some(values) = find_array(reply) else {
        return Vec::new();
    };

    let mut tags: Vec<String> = Vec::new();
    for value in values {
        let Value::String(raw) = value else {
            continue;
        };
        let word = raw.trim().trim_start_matches('#').trim();
        if word.is_empty() {
            continue;
        }
        let tag = format!("#{}", word.split_whitespace().collect::<String>());
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

fn find_array(reply: &str) -> Option<Vec<Value>> {
    let trimmed = reply.trim();
    if let Ok(Value::Array(values)) = serde_json::from_str::<Value>(trimmed) {
        return Some(values);
    }

    let start = trimmed.find('[')?;
    let end = trimmed.rfind(']')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&trimmed[start..=end]) {
        Ok(Value::Array(values)) => Some(values),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_array() {
        assert_eq!(
            parse_hashtags(r##"["#sunset", "#ocean"]"##),
            vec!["#sunset", "#ocean"]
        );
    }

    #[test]
    fn test_fenced_array_and_missing_hash() {
        let reply = "```json\n[\"sunset\", \"golden hour\", \"#sunset\"]\n```";
        assert_eq!(parse_hashtags(reply), vec!["#sunset", "#goldenhour"]);
    }

    #[test]
    fn test_array_inside_prose() {
        let reply = r##"Sure! Here you go: ["#beach", 42, null, ""] hope that helps"##;
        assert_eq!(parse_hashtags(reply), vec!["#beach"]);
    }

    #[test]
    fn test_garbage_yields_empty() {
        assert!(parse_hashtags("no tags today").is_empty());
        assert!(parse_hashtags("] backwards [").is_empty());
        assert!(parse_hashtags(r#"{"tags": "nope"}"#).is_empty());
        assert!(parse_hashtags("[\"unterminated").is_empty());
        assert!(parse_hashtags("").is_empty());
    }
}
