//! Configuration loaded once at startup from a `key=value` text file.
//!
//! The file format is deliberately forgiving: blank lines and lines starting
//! with `#` or `;` are ignored, `[section]` headers are accepted and ignored,
//! and values may be wrapped in quotes. Unknown keys are logged and skipped.

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::llm::BackendKind;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "GITAI_CONFIG";

/// Config file name inside the config directory.
const CONFIG_FILE_NAME: &str = "config.txt";
const PROMPT_FILE_NAME: &str = "prompt.txt";
const PRICING_FILE_NAME: &str = "pricing.json";

/// Lines per terminal "page" used to size the default budget.
const LINES_PER_PAGE: usize = 60;
const MAX_DIFF_PAGES: usize = 6;

/// Immutable process-wide configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub api_model: String,
    pub api_key_env_name: String,
    pub local_model: String,
    pub ollama_base_url: String,
    pub default_backend: BackendKind,
    pub max_diff_lines: usize,
    pub max_local_changed_lines: usize,
    pub request_timeout_secs: u64,
    pub local_timeout_secs: u64,
    pub max_attempts: u32,
    pub local_autostart: bool,
    pub local_start_timeout_secs: u64,
    pub prompt_file: Option<PathBuf>,
    pub pricing_file: Option<PathBuf>,
    /// Directory holding the config file; sibling prompt/pricing files are
    /// looked up here when not configured explicitly.
    pub config_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            api_model: "gpt-5-mini".to_string(),
            api_key_env_name: "OPENAI_API_KEY".to_string(),
            local_model: "gpt-oss:20b".to_string(),
            ollama_base_url: "http://localhost:11434".to_string(),
            default_backend: BackendKind::Remote,
            max_diff_lines: LINES_PER_PAGE * MAX_DIFF_PAGES,
            max_local_changed_lines: LINES_PER_PAGE * MAX_DIFF_PAGES,
            request_timeout_secs: 90,
            local_timeout_secs: 180,
            max_attempts: 3,
            local_autostart: true,
            local_start_timeout_secs: 12,
            prompt_file: None,
            pricing_file: None,
            config_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from the resolved location.
    ///
    /// Resolution order: `explicit` (from `--config`), then the
    /// `GITAI_CONFIG` environment variable, then the platform config
    /// directory. An explicitly named file must exist; a missing default file
    /// yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match named_config_path(explicit) {
            Some(path) => Self::load_from_path(&path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load_from_path(&path),
                Some(path) => {
                    debug!("No config file at {}, using defaults", path.display());
                    Ok(Self {
                        config_dir: path.parent().map(Path::to_path_buf),
                        ..Self::default()
                    })
                }
                None => Ok(Self::default()),
            },
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::parse(&content)?;
        config.config_dir = path.parent().map(Path::to_path_buf);
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse `key=value` text on top of the defaults.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Invalid {
                    key: line.to_string(),
                    line: line_no,
                    reason: "expected key=value".to_string(),
                });
            };

            let key = key.trim().to_lowercase();
            let value = unquote(value.trim());
            config.apply(&key, value, line_no)?;
        }

        Ok(config)
    }

    fn apply(&mut self, key: &str, value: &str, line: usize) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::Invalid {
            key: key.to_string(),
            line,
            reason: reason.to_string(),
        };

        match key {
            "api_url" => self.api_url = non_empty(value).ok_or_else(|| invalid("must not be empty"))?,
            "api_model" => {
                self.api_model = non_empty(value).ok_or_else(|| invalid("must not be empty"))?
            }
            "api_key_env_name" => {
                self.api_key_env_name =
                    non_empty(value).ok_or_else(|| invalid("must not be empty"))?
            }
            "local_model" => {
                self.local_model = non_empty(value).ok_or_else(|| invalid("must not be empty"))?
            }
            "ollama_base_url" => {
                self.ollama_base_url = non_empty(value)
                    .map(|v| v.trim_end_matches('/').to_string())
                    .ok_or_else(|| invalid("must not be empty"))?
            }
            "default_backend" => {
                self.default_backend = value
                    .parse()
                    .map_err(|_| invalid("expected 'api' or 'local'"))?
            }
            "max_diff_lines" => self.max_diff_lines = parse_budget(value).map_err(|r| invalid(&r))?,
            "max_local_changed_lines" => {
                self.max_local_changed_lines = parse_budget(value).map_err(|r| invalid(&r))?
            }
            "request_timeout_secs" => {
                self.request_timeout_secs = parse_positive(value).map_err(|r| invalid(&r))?
            }
            "local_timeout_secs" => {
                self.local_timeout_secs = parse_positive(value).map_err(|r| invalid(&r))?
            }
            "local_start_timeout_secs" => {
                self.local_start_timeout_secs = parse_positive(value).map_err(|r| invalid(&r))?
            }
            "max_attempts" => {
                let attempts = parse_positive(value).map_err(|r| invalid(&r))?;
                self.max_attempts =
                    u32::try_from(attempts).map_err(|_| invalid("value is too large"))?;
            }
            "local_autostart" => {
                self.local_autostart = parse_bool(value).ok_or_else(|| invalid("expected true or false"))?
            }
            "prompt_file" => self.prompt_file = non_empty(value).map(PathBuf::from),
            "pricing_file" => self.pricing_file = non_empty(value).map(PathBuf::from),
            other => warn!("Ignoring unknown config key '{}' at line {}", other, line),
        }

        Ok(())
    }

    /// Line budget for the reducer, depending on the active backend.
    pub fn budget_for(&self, kind: BackendKind) -> usize {
        match kind {
            BackendKind::Remote => self.max_diff_lines,
            BackendKind::Local => self.max_local_changed_lines,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn local_timeout(&self) -> Duration {
        Duration::from_secs(self.local_timeout_secs)
    }

    pub fn local_start_timeout(&self) -> Duration {
        Duration::from_secs(self.local_start_timeout_secs)
    }

    /// Template path: explicit `prompt_file`, or `prompt.txt` next to the
    /// config file when it exists.
    ///
    /// Returns `(path, explicit)`; an explicit path that cannot be read is a
    /// hard error for the caller.
    pub fn template_path(&self) -> Option<(PathBuf, bool)> {
        self.sibling_or_explicit(self.prompt_file.as_ref(), PROMPT_FILE_NAME)
    }

    /// Pricing table path, resolved like [`Config::template_path`].
    pub fn pricing_path(&self) -> Option<(PathBuf, bool)> {
        self.sibling_or_explicit(self.pricing_file.as_ref(), PRICING_FILE_NAME)
    }

    fn sibling_or_explicit(&self, explicit: Option<&PathBuf>, name: &str) -> Option<(PathBuf, bool)> {
        if let Some(path) = explicit {
            let resolved = match (&self.config_dir, path.is_relative()) {
                (Some(dir), true) => dir.join(path),
                _ => path.clone(),
            };
            return Some((resolved, true));
        }

        let sibling = self.config_dir.as_ref()?.join(name);
        sibling.exists().then_some((sibling, false))
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "api_url = {}", self.api_url)?;
        writeln!(f, "api_model = {}", self.api_model)?;
        writeln!(f, "api_key_env_name = {}", self.api_key_env_name)?;
        writeln!(f, "local_model = {}", self.local_model)?;
        writeln!(f, "ollama_base_url = {}", self.ollama_base_url)?;
        writeln!(f, "default_backend = {}", self.default_backend.config_name())?;
        writeln!(f, "max_diff_lines = {}", self.max_diff_lines)?;
        writeln!(f, "max_local_changed_lines = {}", self.max_local_changed_lines)?;
        writeln!(f, "request_timeout_secs = {}", self.request_timeout_secs)?;
        writeln!(f, "local_timeout_secs = {}", self.local_timeout_secs)?;
        writeln!(f, "max_attempts = {}", self.max_attempts)?;
        writeln!(f, "local_autostart = {}", self.local_autostart)?;
        write!(f, "local_start_timeout_secs = {}", self.local_start_timeout_secs)
    }
}

/// Config file named by `--config` or `GITAI_CONFIG`, if any.
fn named_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| env::var_os(CONFIG_ENV_VAR).filter(|v| !v.is_empty()).map(PathBuf::from))
}

/// The config file [`Config::load`] reads, resolved the same way.
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    named_config_path(explicit).or_else(default_config_path)
}

/// Default config file location: `<config dir>/gitai/config.txt`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gitai").join(CONFIG_FILE_NAME))
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2
        && ((bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\''))
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_budget(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("budget must be at least 1 line".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{}' is not a non-negative integer", value)),
    }
}

fn parse_positive(value: &str) -> Result<u64, String> {
    match value.parse::<u64>() {
        Ok(0) => Err("must be greater than zero".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{}' is not a non-negative integer", value)),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}
