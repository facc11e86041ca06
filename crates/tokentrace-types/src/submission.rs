use crate::{Error, Result, SamplingConfig};
use serde::{Deserialize, Serialize};

/// Longest prompt forwarded to the backend, in characters
pub const MAX_PROMPT_CHARS: usize = 10_000;

/// Body of a prompt submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub prompt: String,
    pub sampling: SamplingConfig,
}

impl SubmitRequest {
    /// Sanitize the prompt and validate the sampling configuration.
    /// Only requests built here are ever sent.
    pub fn new(prompt: &str, sampling: SamplingConfig) -> Result<Self> {
        sampling.validate()?;
        Ok(Self {
            prompt: sanitize_prompt(prompt)?,
            sampling,
        })
    }
}

/// Make a prompt safe to transmit.
///
/// Strips control characters (tab, line feed and carriage return survive),
/// byte-order marks and zero-width characters, turns smart quotes into ASCII
/// quotes, trims, and caps the length at `MAX_PROMPT_CHARS`.
pub fn sanitize_prompt(prompt: &str) -> Result<String> {
    let cleaned: String = prompt
        .chars()
        .filter(|c| !is_stripped(*c))
        .map(normalize_quote)
        .collect();

    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyPrompt);
    }

    Ok(trimmed.chars().take(MAX_PROMPT_CHARS).collect())
}

fn is_stripped(c: char) -> bool {
    matches!(
        c,
        '\u{0000}'..='\u{0008}'
            | '\u{000B}'
            | '\u{000C}'
            | '\u{000E}'..='\u{001F}'
            | '\u{007F}'..='\u{009F}'
            | '\u{FEFF}'
            | '\u{200B}'
            | '\u{200C}'
            | '\u{200D}'
            | '\u{2060}'
    )
}

fn normalize_quote(c: char) -> char {
    match c {
        '\u{201C}' | '\u{201D}' => '"',
        '\u{2018}' | '\u{2019}' => '\'',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_control_and_zero_width() {
        let sanitized = sanitize_prompt("\u{FEFF}Hel\u{0007}lo\u{200B} world\u{007F}").unwrap();
        assert_eq!(sanitized, "Hello world");
    }

    #[test]
    fn test_keeps_newlines_and_tabs() {
        let sanitized = sanitize_prompt("line one\n\tline two").unwrap();
        assert_eq!(sanitized, "line one\n\tline two");
    }

    #[test]
    fn test_normalizes_smart_quotes() {
        let sanitized = sanitize_prompt("\u{201C}quoted\u{201D} and \u{2018}single\u{2019}").unwrap();
        assert_eq!(sanitized, "\"quoted\" and 'single'");
    }

    #[test]
    fn test_rejects_empty_after_sanitization() {
        assert_eq!(sanitize_prompt("  \u{200B}\u{0001} "), Err(Error::EmptyPrompt));
    }

    #[test]
    fn test_caps_length() {
        let long = "ab".repeat(MAX_PROMPT_CHARS);
        let sanitized = sanitize_prompt(&long).unwrap();
        assert_eq!(sanitized.chars().count(), MAX_PROMPT_CHARS);
    }

    #[test]
    fn test_submit_request_validates_sampling() {
        assert!(SubmitRequest::new("hi", SamplingConfig::top_p(2.0)).is_err());
        let request = SubmitRequest::new(" hi ", SamplingConfig::greedy()).unwrap();
        assert_eq!(request.prompt, "hi");
    }
}
