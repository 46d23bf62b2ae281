//! Cloud chat-completion backend (OpenAI-compatible).

use std::env;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use super::chat::post_chat;
use super::retry::{RetryPolicy, retry_with_backoff};
use super::{Backend, BackendKind, BackendResponse};
use crate::config::Config;
use crate::error::BackendError;
use crate::prompt::Prompt;

pub struct RemoteBackend {
    client: Client,
    url: String,
    model: String,
    api_key: String,
    timeout: Duration,
    policy: RetryPolicy,
}

impl RemoteBackend {
    pub fn new(
        url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            model: model.into(),
            api_key: api_key.into(),
            timeout,
            policy: RetryPolicy::default(),
        }
    }

    /// Build from configuration, reading the API key from the environment
    /// variable named by `api_key_env_name`.
    pub fn from_config(config: &Config) -> Result<Self, BackendError> {
        let api_key = env::var(&config.api_key_env_name)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| BackendError::AuthError {
                env_var: config.api_key_env_name.clone(),
            })?;

        Ok(Self::new(
            config.api_url.clone(),
            config.api_model.clone(),
            api_key,
            config.request_timeout(),
        )
        .with_retry_policy(RetryPolicy::with_max_attempts(config.max_attempts)))
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Error to report once every attempt failed transiently.
///
/// Only connection failures become [`BackendError::BackendUnavailable`]; a
/// server that kept answering 5xx or 429, or kept timing out, is reported
/// with its last error unchanged.
fn exhausted(error: BackendError, attempts: u32) -> BackendError {
    match error {
        BackendError::Network(reason) => BackendError::BackendUnavailable {
            attempts,
            last_error: reason,
        },
        other => {
            warn!("Giving up after {} attempt(s): {}", attempts, other);
            other
        }
    }
}

#[async_trait]
impl Backend for RemoteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    async fn send(&self, prompt: &Prompt) -> Result<BackendResponse, BackendError> {
        let started = Instant::now();

        let reply = retry_with_backoff(
            &self.policy,
            || post_chat(&self.client, &self.url, Some(self.api_key.as_str()), &self.model, prompt, self.timeout),
            BackendError::is_transient,
            exhausted,
        )
        .await?;

        let elapsed = started.elapsed();
        info!("Remote inference took {:.2}s", elapsed.as_secs_f64());
        if let Some(served) = &reply.model
            && *served != self.model
        {
            debug!("Requested model {} was served as {}", self.model, served);
        }

        Ok(BackendResponse {
            text: reply.text,
            backend: BackendKind::Remote,
            model: self.model.clone(),
            usage: reply.usage,
            elapsed,
        })
    }
}
