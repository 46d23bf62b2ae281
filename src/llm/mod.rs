//! Inference backends: a cloud chat-completion API and a local Ollama server.

mod chat;
pub mod local;
pub mod remote;
pub mod retry;
pub mod usage;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

pub use local::{LocalBackend, OllamaCli, ServerControl};
pub use remote::RemoteBackend;
pub use retry::RetryPolicy;
pub use usage::Usage;

use crate::config::Config;
use crate::error::BackendError;
use crate::prompt::Prompt;

/// Which inference backend serves the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Remote,
    Local,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Remote => "Remote API",
            BackendKind::Local => "Local (Ollama)",
        }
    }

    /// Spelling used in the config file and `default_backend`.
    pub fn config_name(&self) -> &'static str {
        match self {
            BackendKind::Remote => "api",
            BackendKind::Local => "local",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "api" | "remote" => Ok(BackendKind::Remote),
            "local" | "ollama" => Ok(BackendKind::Local),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// A completed generation.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    pub text: String,
    pub backend: BackendKind,
    /// Configured model name, used for pricing lookups.
    pub model: String,
    pub usage: Option<Usage>,
    /// Wall time spent on inference, excluding server startup.
    pub elapsed: Duration,
}

/// An inference backend.
///
/// Each implementation owns its retry and timeout policy.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn model(&self) -> String;

    /// Send the prompt and return the generated text.
    async fn send(&self, prompt: &Prompt) -> Result<BackendResponse, BackendError>;
}

/// Resolve the backend for this invocation: `--local`/`--api` win over the
/// configured default.
pub fn select_backend(local: bool, api: bool, config: &Config) -> BackendKind {
    match (local, api) {
        (true, _) => BackendKind::Local,
        (_, true) => BackendKind::Remote,
        _ => config.default_backend,
    }
}

/// Construct the backend for `kind` from configuration.
///
/// The remote backend reads its API key here, so a missing key fails before
/// any network activity.
pub fn build_backend(kind: BackendKind, config: &Config) -> Result<Box<dyn Backend>, BackendError> {
    let backend: Box<dyn Backend> = match kind {
        BackendKind::Remote => Box::new(RemoteBackend::from_config(config)?),
        BackendKind::Local => Box::new(LocalBackend::from_config(config)),
    };
    info!("Using {} backend with model {}", backend.kind(), backend.model());
    Ok(backend)
}
