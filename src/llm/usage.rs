//! Token usage reported by (or estimated for) a backend response.

use std::fmt;

/// Rough characters-per-token ratio for English text and code.
const CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    /// True when the counts were derived from text length rather than
    /// reported by the server. Estimated usage is never priced.
    pub estimated: bool,
}

impl Usage {
    pub fn reported(prompt_tokens: u64, completion_tokens: u64, total_tokens: Option<u64>) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: total_tokens.unwrap_or(prompt_tokens + completion_tokens),
            estimated: false,
        }
    }

    /// Estimate usage from the prompt and completion text.
    pub fn estimate(prompt: &str, completion: &str) -> Self {
        let prompt_tokens = estimate_tokens(prompt);
        let completion_tokens = estimate_tokens(completion);
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            estimated: true,
        }
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.estimated { "~" } else { "" };
        write!(
            f,
            "{m}{} prompt + {m}{} completion = {m}{} tokens",
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens,
            m = marker
        )?;
        if self.estimated {
            write!(f, " (estimated)")?;
        }
        Ok(())
    }
}

fn estimate_tokens(text: &str) -> u64 {
    text.chars().count().div_ceil(CHARS_PER_TOKEN) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reported_total_defaults_to_sum() {
        let usage = Usage::reported(100, 20, None);
        assert_eq!(usage.total_tokens, 120);
        assert!(!usage.estimated);
        assert_eq!(Usage::reported(100, 20, Some(125)).total_tokens, 125);
    }

    #[test]
    fn test_estimate_rounds_up() {
        let usage = Usage::estimate("abcde", "");
        assert_eq!(usage.prompt_tokens, 2);
        assert_eq!(usage.completion_tokens, 0);
        assert!(usage.estimated);
    }

    #[test]
    fn test_display_marks_estimates() {
        assert_eq!(
            Usage::reported(10, 5, None).to_string(),
            "10 prompt + 5 completion = 15 tokens"
        );
        assert!(Usage::estimate("abcd", "ab").to_string().ends_with("(estimated)"));
    }
}
