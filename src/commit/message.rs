//! Commit message parsing and formatting.

use std::fmt;

use crate::error::ReviewError;

/// A commit message split the way `git commit -m <subject> -m <body>` needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMessage {
    pub subject: String,
    pub body: Option<String>,
}

impl CommitMessage {
    /// Split model or editor output into subject and body.
    ///
    /// The subject is the first non-empty line. The body is everything after
    /// it, minus one separating blank line and trailing whitespace. A Markdown
    /// code fence wrapping the whole message is removed first.
    pub fn parse(text: &str) -> Result<Self, ReviewError> {
        let text = strip_code_fence(text);
        let lines: Vec<&str> = text.lines().collect();

        let Some(subject_idx) = lines.iter().position(|l| !l.trim().is_empty()) else {
            return Err(ReviewError::EmptySubject);
        };
        let subject = lines[subject_idx].trim().to_string();

        let mut body_lines = &lines[subject_idx + 1..];
        if body_lines.first().is_some_and(|l| l.trim().is_empty()) {
            body_lines = &body_lines[1..];
        }
        let body = body_lines.join("\n").trim_end().to_string();

        Ok(Self {
            subject,
            body: (!body.trim().is_empty()).then_some(body),
        })
    }

    /// Full message text: subject, blank line, body.
    pub fn format(&self) -> String {
        match &self.body {
            Some(body) => format!("{}\n\n{}", self.subject, body),
            None => self.subject.clone(),
        }
    }
}

impl fmt::Display for CommitMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") || !trimmed.ends_with("```") || trimmed.len() < 6 {
        return text;
    }
    let inner = &trimmed[3..trimmed.len() - 3];
    // Drop an info string such as ```text on the opening fence.
    match inner.split_once('\n') {
        Some((info, rest)) if !info.trim().contains(' ') => rest,
        _ => inner,
    }
}

/// Insert `Topic: <topic>` right after the subject line unless the subject's
/// paragraph already carries a Topic line.
///
/// Returns the trimmed text unchanged when `topic` is empty.
pub fn ensure_topic_line(text: &str, topic: Option<&str>) -> String {
    let Some(topic) = topic.map(str::trim).filter(|t| !t.is_empty()) else {
        return text.trim().to_string();
    };

    let lines: Vec<&str> = text.lines().collect();
    let Some(subject_idx) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return text.trim().to_string();
    };

    let has_topic = lines[subject_idx + 1..]
        .iter()
        .take_while(|l| !l.trim().is_empty())
        .any(|l| l.trim().to_lowercase().starts_with("topic:"));
    if has_topic {
        return text.trim().to_string();
    }

    let topic_line = format!("Topic: {}", topic);
    let mut out: Vec<&str> = Vec::with_capacity(lines.len() + 1);
    out.extend_from_slice(&lines[..=subject_idx]);
    out.push(&topic_line);
    out.extend_from_slice(&lines[subject_idx + 1..]);
    out.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subject_and_body() {
        let message = CommitMessage::parse("\n\nfeat(cli): add -m flag\n\nCHANGES:\n- one\n- two\n\n").unwrap();
        assert_eq!(message.subject, "feat(cli): add -m flag");
        assert_eq!(message.body.as_deref(), Some("CHANGES:\n- one\n- two"));
    }

    #[test]
    fn test_parse_subject_only() {
        let message = CommitMessage::parse("fix: typo").unwrap();
        assert_eq!(message.subject, "fix: typo");
        assert!(message.body.is_none());
        assert_eq!(message.format(), "fix: typo");
    }

    #[test]
    fn test_parse_keeps_body_without_blank_separator() {
        let message = CommitMessage::parse("fix: a\nTopic: b\n\nbody").unwrap();
        assert_eq!(message.body.as_deref(), Some("Topic: b\n\nbody"));
    }

    #[test]
    fn test_parse_empty_is_error() {
        assert!(matches!(CommitMessage::parse("  \n\n "), Err(ReviewError::EmptySubject)));
    }

    #[test]
    fn test_parse_strips_code_fence() {
        let message = CommitMessage::parse("```text\nchore: bump deps\n\nbody\n```").unwrap();
        assert_eq!(message.subject, "chore: bump deps");
        assert_eq!(message.body.as_deref(), Some("body"));
    }

    #[test]
    fn test_format_round_trip() {
        let message = CommitMessage {
            subject: "feat: x".to_string(),
            body: Some("line".to_string()),
        };
        assert_eq!(message.format(), "feat: x\n\nline");
        assert_eq!(CommitMessage::parse(&message.format()).unwrap(), message);
    }

    #[test]
    fn test_ensure_topic_inserts_after_subject() {
        let out = ensure_topic_line("feat: x\n\nbody", Some("billing"));
        assert_eq!(out, "feat: x\nTopic: billing\n\nbody");
    }

    #[test]
    fn test_ensure_topic_keeps_existing() {
        let text = "feat: x\ntopic: Billing\n\nbody";
        assert_eq!(ensure_topic_line(text, Some("billing")), text);
    }

    #[test]
    fn test_ensure_topic_ignores_topic_in_later_paragraph() {
        let out = ensure_topic_line("feat: x\n\nTopic: elsewhere", Some("billing"));
        assert!(out.starts_with("feat: x\nTopic: billing\n"));
    }

    #[test]
    fn test_ensure_topic_without_topic_trims() {
        assert_eq!(ensure_topic_line("  feat: x\n", None), "feat: x");
        assert_eq!(ensure_topic_line("feat: x", Some("  ")), "feat: x");
    }
}
