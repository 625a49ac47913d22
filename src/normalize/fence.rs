const FENCE: &str = "```";

/// Remove a Markdown code fence (with or without a language tag) around the
/// payload, plus surrounding whitespace.
///
/// Handles a missing closing fence (truncated output) and prose before or after
/// the fenced block. Text that already starts with a JSON bracket is returned
/// trimmed, even if a string inside it happens to contain backticks.
pub fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed;
    }

    match trimmed.find(FENCE) {
        Some(open) => fenced_body(&trimmed[open + FENCE.len()..]).trim(),
        None => trimmed,
    }
}

/// Body of a fence whose opening marker has already been consumed.
fn fenced_body(after_open: &str) -> &str {
    let tag_len = after_open
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'-' || *b == b'_')
        .count();
    let body = &after_open[tag_len..];

    match body.rfind(FENCE) {
        Some(close) => &body[..close],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_tagged_fence() {
        assert_eq!(strip_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn strips_untagged_fence() {
        assert_eq!(strip_fences("  ```\n[1,2]\n```  \n"), "[1,2]");
    }

    #[test]
    fn tag_glued_to_payload() {
        assert_eq!(strip_fences("```JSON{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn missing_closing_fence() {
        assert_eq!(strip_fences("```json\n{\"a\":[1,"), "{\"a\":[1,");
    }

    #[test]
    fn prose_around_fence() {
        let text = "Here is the extraction:\n```json\n{\"a\":1}\n```\nLet me know if you need more.";
        assert_eq!(strip_fences(text), "{\"a\":1}");
    }

    #[test]
    fn unfenced_text_is_only_trimmed() {
        assert_eq!(strip_fences("\n {\"t\":\"use ``` here\"} \n"), "{\"t\":\"use ``` here\"}");
    }

    #[test]
    fn empty_fence_is_empty() {
        assert_eq!(strip_fences("```json\n```"), "");
        assert_eq!(strip_fences("   "), "");
    }
}
