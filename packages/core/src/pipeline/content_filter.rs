//! Content Filter (§4.E): query gatekeeping, tone enforcement, sanitization.
//!
//! Pattern sets follow this codebase's existing PII detector/redactor
//! shape — compiled once via `lazy_static`, matched case-insensitively.

use lazy_static::lazy_static;
use regex::{Regex, RegexSet};

const MIN_QUERY_LEN: usize = 3;
const MAX_QUERY_LEN: usize = 1000;
const OFF_TOPIC_WORD_THRESHOLD: usize = 5;

/// Domain keyword set (§4.E). Closed: a query matching none of these is a
/// candidate for off-topic rejection.
const DOMAIN_KEYWORDS: &[&str] = &[
    "solar", "inverter", "panel", "module", "combiner", "site", "maintenance", "repair",
    "performance", "power", "energy", "electrical", "component", "asset", "facility",
    "installation", "inspection", "troubleshoot", "warranty", "o&m", "operations", "pv",
    "photovoltaic", "string", "transformer", "monitoring", "generation", "output", "failure",
];

lazy_static! {
    static ref INAPPROPRIATE_PATTERNS: RegexSet = RegexSet::new([
        r"(?i)\b(are you single|do you have a boyfriend|do you have a girlfriend)\b",
        r"(?i)\b(i love you|you're (so )?(cute|hot|sexy|beautiful))\b",
        r"(?i)\b(go on a date|what do you look like)\b",
        r"(?i)\b(what('|’)?s your (favorite|favourite) (movie|food|song))\b",
        r"(?i)\b(tell me about your (feelings|childhood|family))\b",
    ])
    .expect("inappropriate pattern set must compile");

    static ref OFF_TOPIC_PATTERNS: RegexSet = RegexSet::new([
        r"(?i)\b(weather|forecast|rain|snow|temperature outside)\b",
        r"(?i)\b(football|basketball|baseball|soccer|score|championship)\b",
        r"(?i)\b(movie|tv show|celebrity|actor|actress|music|song)\b",
        r"(?i)\b(recipe|cook|bake|restaurant|dinner)\b",
        r"(?i)\b(vacation|travel|flight|hotel|trip)\b",
        r"(?i)\b(stock market|bitcoin|crypto|interest rates)\b",
    ])
    .expect("off-topic pattern set must compile");

    static ref EMAIL_PATTERN: Regex =
        Regex::new(r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}").unwrap();
    static ref PHONE_PATTERN: Regex =
        Regex::new(r"\b(\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]\d{3}[-.\s]\d{4}\b").unwrap();
    static ref SSN_PATTERN: Regex = Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap();

    static ref SYCOPHANTIC_SUBSTITUTIONS: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"(?i)\bgreat question!?\b").unwrap(), ""),
        (Regex::new(r"(?i)\babsolutely!\b").unwrap(), "Yes."),
        (Regex::new(r"(?i)\bi'd be happy to\b").unwrap(), "I will"),
        (Regex::new(r"(?i)\bno worries!?\b").unwrap(), "Understood."),
        (Regex::new(r"(?i)\bawesome!?\b").unwrap(), ""),
        (Regex::new(r"(?i)\bsuper easy\b").unwrap(), "straightforward"),
    ];
}

/// Outcome of [`validate_query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryValidation {
    pub valid: bool,
    pub appropriate: bool,
    pub issues: Vec<String>,
    pub reason: Option<String>,
}

impl QueryValidation {
    fn ok() -> Self {
        Self { valid: true, appropriate: true, issues: Vec::new(), reason: None }
    }

    fn rejected(reason: &str) -> Self {
        Self { valid: false, appropriate: true, issues: vec![reason.to_string()], reason: Some(reason.to_string()) }
    }

    fn inappropriate(issues: Vec<String>) -> Self {
        Self { valid: true, appropriate: false, issues, reason: Some("inappropriate".to_string()) }
    }
}

fn has_domain_keyword(lower: &str) -> bool {
    DOMAIN_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Classify a query as on-topic and professional (§4.E).
pub fn validate_query(text: &str) -> QueryValidation {
    let len = text.chars().count();
    if len < MIN_QUERY_LEN {
        return QueryValidation::rejected("too_short");
    }
    if len > MAX_QUERY_LEN {
        return QueryValidation::rejected("too_long");
    }

    let matches: Vec<String> = INAPPROPRIATE_PATTERNS
        .matches(text)
        .into_iter()
        .map(|i| format!("inappropriate_pattern_{i}"))
        .collect();
    if !matches.is_empty() {
        return QueryValidation::inappropriate(matches);
    }

    let lower = text.to_lowercase();
    let word_count = text.split_whitespace().count();
    let off_topic_hit = OFF_TOPIC_PATTERNS.is_match(text);
    let conservative_reject = word_count > OFF_TOPIC_WORD_THRESHOLD && !has_domain_keyword(&lower);

    if !has_domain_keyword(&lower) && (off_topic_hit || conservative_reject) {
        return QueryValidation::rejected("off_topic");
    }

    QueryValidation::ok()
}

/// De-casualize and de-sycophantize `text`, appending a closing
/// invitation if none is present (§4.E).
pub fn enforce_professional_tone(text: &str) -> String {
    let mut out = text.to_string();
    for (pattern, replacement) in SYCOPHANTIC_SUBSTITUTIONS.iter() {
        out = pattern.replace_all(&out, *replacement).to_string();
    }

    let out = out.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = out.trim();

    let has_closing = trimmed.ends_with('?')
        || trimmed.to_lowercase().contains("let me know")
        || trimmed.to_lowercase().contains("happy to help further")
        || trimmed.to_lowercase().contains("reach out");

    if has_closing || trimmed.is_empty() {
        trimmed.to_string()
    } else {
        format!("{trimmed} Let me know if you need further detail.")
    }
}

/// Redact PII-shaped substrings with bracketed markers (§4.E).
pub fn sanitize(text: &str) -> String {
    let out = EMAIL_PATTERN.replace_all(text, "[REDACTED_EMAIL]");
    let out = PHONE_PATTERN.replace_all(&out, "[REDACTED_PHONE]");
    let out = SSN_PATTERN.replace_all(&out, "[REDACTED_SSN]");
    out.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_too_short_query() {
        let v = validate_query("hi");
        assert!(!v.valid);
        assert_eq!(v.reason.as_deref(), Some("too_short"));
    }

    #[test]
    fn rejects_too_long_query() {
        let v = validate_query(&"a".repeat(1001));
        assert!(!v.valid);
        assert_eq!(v.reason.as_deref(), Some("too_long"));
    }

    #[test]
    fn accepts_on_topic_query() {
        let v = validate_query("What work was performed on inverter 31?");
        assert!(v.valid);
        assert!(v.appropriate);
    }

    #[test]
    fn rejects_off_topic_weather_query() {
        let v = validate_query("What is the weather like today?");
        assert!(!v.valid);
        assert_eq!(v.reason.as_deref(), Some("off_topic"));
    }

    #[test]
    fn rejects_inappropriate_personal_query() {
        let v = validate_query("Are you single? I love you");
        assert!(!v.appropriate);
    }

    #[test]
    fn on_topic_long_query_without_off_topic_pattern_is_accepted() {
        let v = validate_query(
            "Can you summarize every maintenance action performed on the site's inverters this year",
        );
        assert!(v.valid);
    }

    #[test]
    fn sanitize_redacts_email_phone_and_ssn() {
        let out = sanitize("Contact tech@example.com or 555-123-4567, SSN 123-45-6789.");
        assert!(out.contains("[REDACTED_EMAIL]"));
        assert!(out.contains("[REDACTED_PHONE]"));
        assert!(out.contains("[REDACTED_SSN]"));
    }

    #[test]
    fn tone_enforcement_strips_sycophancy_and_adds_closing() {
        let out = enforce_professional_tone("Great question! Absolutely! The inverter was repaired.");
        assert!(!out.to_lowercase().contains("great question"));
        assert!(!out.to_lowercase().contains("absolutely!"));
        assert!(out.ends_with("Let me know if you need further detail.") || out.contains("Yes."));
    }
}
