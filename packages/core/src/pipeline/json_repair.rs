//! JSON-shape recovery for noisy completion-provider responses (§4.D).
//!
//! `complete_json` must always return a valid `T`. Providers routinely wrap
//! JSON in prose or markdown fences ("Here's the result:\n```json\n{...}```")
//! or truncate mid-response under token limits. Recovery policy: locate the
//! longest balanced JSON object/array in the body and parse that; if it's
//! still not a valid `T`, fall back to `T::default()` rather than fail.

use serde::de::DeserializeOwned;

/// Parse `raw` as `T`, repairing through the longest-balanced-JSON
/// strategy on failure, and falling back to `T::default()` if recovery
/// still doesn't produce a valid `T`.
pub fn repair_and_parse<T: DeserializeOwned + Default>(raw: &str) -> T {
    if let Ok(value) = serde_json::from_str::<T>(raw) {
        return value;
    }

    match longest_balanced_json(raw) {
        Some(candidate) => serde_json::from_str::<T>(&candidate).unwrap_or_default(),
        None => T::default(),
    }
}

/// Scan `text` for every balanced `{...}` or `[...]` span (respecting
/// string literals and escape sequences so braces inside quoted strings
/// don't throw off the balance count) and return the longest one found.
pub fn longest_balanced_json(text: &str) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut best: Option<(usize, usize)> = None; // (start, end) char indices, end exclusive

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '{' || c == '[' {
            if let Some(end) = matching_close(&chars, i) {
                let len = end - i;
                let better = match best {
                    Some((s, e)) => len > e - s,
                    None => true,
                };
                if better {
                    best = Some((i, end));
                }
            }
        }
        i += 1;
    }

    best.map(|(s, e)| chars[s..e].iter().collect())
}

/// Given an opening brace/bracket at `start`, find the index just past
/// its matching close, or `None` if the span never balances before the
/// input ends.
fn matching_close(chars: &[char], start: usize) -> Option<usize> {
    let open = chars[start];
    let close = match open {
        '{' => '}',
        '[' => ']',
        _ => return None,
    };

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &c) in chars[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Default, PartialEq)]
    struct Actions {
        #[serde(default)]
        actions: Vec<String>,
    }

    #[test]
    fn parses_clean_json_directly() {
        let raw = r#"{"actions": ["a", "b"]}"#;
        let parsed: Actions = repair_and_parse(raw);
        assert_eq!(parsed.actions, vec!["a", "b"]);
    }

    #[test]
    fn repairs_json_wrapped_in_prose_and_markdown_fence() {
        let raw = "Sure thing! Here's the result:\n```json\n{\"actions\": [\"a\"]}\n```\nLet me know if you need more.";
        let parsed: Actions = repair_and_parse(raw);
        assert_eq!(parsed.actions, vec!["a"]);
    }

    #[test]
    fn falls_back_to_default_on_unrecoverable_garbage() {
        let raw = "the model rambled without ever producing json";
        let parsed: Actions = repair_and_parse(raw);
        assert_eq!(parsed, Actions::default());
    }

    #[test]
    fn longest_balanced_json_ignores_braces_inside_strings() {
        let raw = r#"noise {"a": "looks like a } brace"} trailing"#;
        let found = longest_balanced_json(raw).unwrap();
        assert_eq!(found, r#"{"a": "looks like a } brace"}"#);
    }

    #[test]
    fn longest_balanced_json_prefers_the_longer_of_two_spans() {
        let raw = r#"{"short":1} and then {"longer": {"nested": true}}"#;
        let found = longest_balanced_json(raw).unwrap();
        assert_eq!(found, r#"{"longer": {"nested": true}}"#);
    }

    #[test]
    fn unbalanced_input_yields_no_span() {
        assert_eq!(longest_balanced_json("{\"truncated\": [1, 2,"), None);
    }
}
