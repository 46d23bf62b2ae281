//! Local inference through an Ollama server.
//!
//! The server is health-checked first. When it is down and autostart is
//! enabled, `ollama serve` is launched detached and polled until ready. The
//! request itself is sent once, without retries.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::chat::post_chat;
use super::{Backend, BackendKind, BackendResponse, Usage};
use crate::config::Config;
use crate::error::BackendError;
use crate::prompt::Prompt;

const OLLAMA_BIN: &str = "ollama";
const HEALTH_TIMEOUT: Duration = Duration::from_millis(250);
const READY_POLL_INTERVAL: Duration = Duration::from_millis(150);

/// Lifecycle of the local server process and its models.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServerControl: Send + Sync {
    /// Whether the server binary can be found on `PATH`.
    fn is_installed(&self) -> bool;

    /// Launch the server detached from this process.
    async fn start(&self) -> Result<(), BackendError>;

    /// Make sure `model` is present locally, pulling it if needed.
    async fn ensure_model(&self, model: &str);

    /// Unload `model` from memory. Best effort.
    async fn unload(&self, model: &str);
}

/// [`ServerControl`] backed by the `ollama` CLI.
pub struct OllamaCli;

#[async_trait]
impl ServerControl for OllamaCli {
    fn is_installed(&self) -> bool {
        which::which(OLLAMA_BIN).is_ok()
    }

    async fn start(&self) -> Result<(), BackendError> {
        let mut command = if cfg!(windows) {
            // Own console window so the server outlives this process.
            let mut c = std::process::Command::new("cmd");
            c.args(["/c", "start", "Ollama Server", OLLAMA_BIN, "serve"]);
            c
        } else {
            let mut c = std::process::Command::new(OLLAMA_BIN);
            c.arg("serve");
            c
        };

        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(drop)
            .map_err(|e| BackendError::ServerStart(format!("failed to run '{} serve': {}", OLLAMA_BIN, e)))
    }

    async fn ensure_model(&self, model: &str) {
        if !self.is_installed() {
            return;
        }

        let listed = match Command::new(OLLAMA_BIN).arg("list").output().await {
            Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout).into_owned(),
            Ok(output) => {
                warn!("'ollama list' failed: {}", String::from_utf8_lossy(&output.stderr).trim());
                return;
            }
            Err(e) => {
                warn!("Failed to run 'ollama list': {}", e);
                return;
            }
        };

        if model_is_listed(&listed, model) {
            debug!("Model {} already present", model);
            return;
        }

        println!("Pulling model {}...", model);
        match Command::new(OLLAMA_BIN).args(["pull", model]).status().await {
            Ok(status) if status.success() => info!("Pulled model {}", model),
            Ok(status) => warn!("'ollama pull {}' exited with {}", model, status),
            Err(e) => warn!("Failed to run 'ollama pull {}': {}", model, e),
        }
    }

    async fn unload(&self, model: &str) {
        if !self.is_installed() {
            return;
        }
        match Command::new(OLLAMA_BIN)
            .args(["stop", model])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
        {
            Ok(_) => debug!("Unloaded model {}", model),
            Err(e) => debug!("Failed to unload model {}: {}", model, e),
        }
    }
}

/// Whether `ollama list` output names `model` in its first column.
///
/// A model requested without a tag matches the `:latest` entry.
fn model_is_listed(listing: &str, model: &str) -> bool {
    let wanted = if model.contains(':') {
        model.to_string()
    } else {
        format!("{}:latest", model)
    };

    listing
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .any(|name| name == model || name == wanted)
}

pub struct LocalBackend<S: ServerControl = OllamaCli> {
    client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
    autostart: bool,
    start_timeout: Duration,
    server: S,
}

impl LocalBackend<OllamaCli> {
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.ollama_base_url, &config.local_model, config.local_timeout(), OllamaCli)
            .with_autostart(config.local_autostart, config.local_start_timeout())
    }
}

impl<S: ServerControl> LocalBackend<S> {
    pub fn new(base_url: &str, model: impl Into<String>, timeout: Duration, server: S) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            timeout,
            autostart: true,
            start_timeout: Duration::from_secs(12),
            server,
        }
    }

    pub fn with_autostart(mut self, enabled: bool, start_timeout: Duration) -> Self {
        self.autostart = enabled;
        self.start_timeout = start_timeout;
        self
    }

    fn unavailable(&self, reason: impl Into<String>) -> BackendError {
        BackendError::BackendUnavailable {
            attempts: 1,
            last_error: reason.into(),
        }
    }

    /// Quick health check against the model listing endpoint.
    async fn is_up(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).timeout(HEALTH_TIMEOUT).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Health check failed: {}", e);
                false
            }
        }
    }

    async fn wait_until_ready(&self) -> bool {
        let deadline = tokio::time::Instant::now() + self.start_timeout;
        while tokio::time::Instant::now() < deadline {
            if self.is_up().await {
                return true;
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
        self.is_up().await
    }

    /// Make sure the server answers, starting it when allowed.
    async fn ensure_running(&self) -> Result<(), BackendError> {
        if self.is_up().await {
            debug!("Local server is up at {}", self.base_url);
            return Ok(());
        }

        if !self.autostart {
            return Err(self.unavailable(format!(
                "no server at {} and local_autostart is disabled",
                self.base_url
            )));
        }

        if !self.server.is_installed() {
            return Err(self.unavailable(format!(
                "no server at {} and '{}' was not found on PATH",
                self.base_url, OLLAMA_BIN
            )));
        }

        println!("Starting local inference server...");
        let started = Instant::now();
        self.server.start().await?;

        if !self.wait_until_ready().await {
            return Err(self.unavailable(format!(
                "server at {} did not become ready within {}s",
                self.base_url,
                self.start_timeout.as_secs_f64()
            )));
        }

        info!("Local server ready after {:.2}s", started.elapsed().as_secs_f64());
        Ok(())
    }
}

#[async_trait]
impl<S: ServerControl> Backend for LocalBackend<S> {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    async fn send(&self, prompt: &Prompt) -> Result<BackendResponse, BackendError> {
        self.ensure_running().await?;
        self.server.ensure_model(&self.model).await;

        let url = format!("{}/v1/chat/completions", self.base_url);
        let started = Instant::now();
        let result = post_chat(&self.client, &url, None, &self.model, prompt, self.timeout).await;
        let elapsed = started.elapsed();

        self.server.unload(&self.model).await;

        let reply = result.map_err(|e| match e {
            BackendError::Network(reason) => self.unavailable(reason),
            other => other,
        })?;

        info!("Local inference took {:.2}s", elapsed.as_secs_f64());

        let usage = reply.usage.unwrap_or_else(|| {
            Usage::estimate(&format!("{}\n{}", prompt.system, prompt.user), &reply.text)
        });

        Ok(BackendResponse {
            text: reply.text,
            backend: BackendKind::Local,
            model: self.model.clone(),
            usage: Some(usage),
            elapsed,
        })
    }
}
