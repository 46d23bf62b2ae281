//! OpenAI-compatible chat-completions wire format, spoken by both the cloud
//! API and Ollama's `/v1/chat/completions` endpoint.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Usage;
use crate::error::BackendError;
use crate::prompt::Prompt;

#[derive(Serialize, Debug)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    model: Option<String>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct WireUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

/// Parsed completion.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ChatReply {
    pub text: String,
    /// Model name echoed by the server, when present.
    pub model: Option<String>,
    pub usage: Option<Usage>,
}

/// Send one chat-completion request.
pub(crate) async fn post_chat(
    client: &Client,
    url: &str,
    api_key: Option<&str>,
    model: &str,
    prompt: &Prompt,
    timeout: Duration,
) -> Result<ChatReply, BackendError> {
    let request = ChatRequest {
        model,
        messages: vec![
            Message {
                role: "system",
                content: &prompt.system,
            },
            Message {
                role: "user",
                content: &prompt.user,
            },
        ],
        stream: false,
    };

    debug!(
        url = %url,
        model = %model,
        prompt_len = prompt.user.len(),
        "Sending chat-completion request"
    );

    let mut builder = client.post(url).timeout(timeout).json(&request);
    if let Some(key) = api_key {
        builder = builder.bearer_auth(key);
    }

    let secs = timeout.as_secs();
    let response = builder
        .send()
        .await
        .map_err(|e| map_transport_error(e, secs))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(BackendError::Http {
            status: status.as_u16(),
            body: body.trim().to_string(),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| map_transport_error(e, secs))?;
    parse_reply(&body)
}

fn map_transport_error(e: reqwest::Error, secs: u64) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout { secs }
    } else {
        BackendError::Network(e.to_string())
    }
}

fn parse_reply(body: &str) -> Result<ChatReply, BackendError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| BackendError::InvalidResponse(format!("{}: {}", e, truncate(body, 200))))?;

    let text = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| BackendError::InvalidResponse("No completion text in response".to_string()))?;

    let usage = parsed.usage.and_then(|u| match (u.prompt_tokens, u.completion_tokens) {
        (Some(p), Some(c)) => Some(Usage::reported(p, c, u.total_tokens)),
        _ => None,
    });

    Ok(ChatReply {
        text,
        model: parsed.model,
        usage,
    })
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply_with_usage() {
        let body = r#"{
            "model": "gpt-5-mini-2025",
            "choices": [{"message": {"role": "assistant", "content": "  feat: add x\n\nbody  "}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150}
        }"#;
        let reply = parse_reply(body).unwrap();
        assert_eq!(reply.text, "feat: add x\n\nbody");
        assert_eq!(reply.model.as_deref(), Some("gpt-5-mini-2025"));
        assert_eq!(reply.usage, Some(Usage::reported(120, 30, Some(150))));
    }

    #[test]
    fn test_parse_reply_without_usage() {
        let body = r#"{"choices": [{"message": {"content": "fix: y"}}]}"#;
        let reply = parse_reply(body).unwrap();
        assert_eq!(reply.text, "fix: y");
        assert!(reply.usage.is_none());
    }

    #[test]
    fn test_parse_reply_partial_usage_is_dropped() {
        let body = r#"{"choices": [{"message": {"content": "fix: y"}}], "usage": {"prompt_tokens": 3}}"#;
        assert!(parse_reply(body).unwrap().usage.is_none());
    }

    #[test]
    fn test_parse_reply_empty_choices() {
        let err = parse_reply(r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, BackendError::InvalidResponse(_)));
    }

    #[test]
    fn test_parse_reply_blank_content() {
        let err = parse_reply(r#"{"choices": [{"message": {"content": "   "}}]}"#).unwrap_err();
        assert!(matches!(err, BackendError::InvalidResponse(_)));
    }

    #[test]
    fn test_parse_reply_not_json() {
        let err = parse_reply("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, BackendError::InvalidResponse(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_request_serialization() {
        let prompt = Prompt {
            system: "sys".to_string(),
            user: "usr".to_string(),
        };
        let request = ChatRequest {
            model: "m",
            messages: vec![
                Message { role: "system", content: &prompt.system },
                Message { role: "user", content: &prompt.user },
            ],
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "usr");
    }
}
