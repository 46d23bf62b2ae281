//! Error types for gitai modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from collecting the staged diff.
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("Not a git repository (or any parent directory): {0}")]
    NotARepository(String),

    #[error("No staged changes. Run: git add <files>")]
    NoStagedChanges,

    #[error("git failed while collecting the staged diff: {0}")]
    Git(#[source] git2::Error),
}

/// Errors from loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for '{key}' at line {line}: {reason}")]
    Invalid {
        key: String,
        line: usize,
        reason: String,
    },

    #[error("Failed to parse pricing file {path}: {reason}")]
    Pricing { path: PathBuf, reason: String },
}

/// Errors from loading the prompt template or building the prompt.
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Prompt template {path} could not be read: {source}")]
    MissingTemplate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Prompt template is missing the required placeholder {{{placeholder}}}")]
    TemplateError { placeholder: &'static str },
}

/// Errors from the inference backends.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error(
        "Environment variable '{env_var}' is not set. Set it or change 'api_key_env_name' in the config file"
    )]
    AuthError { env_var: String },

    #[error("Backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Backend request timed out after {secs} seconds")]
    Timeout { secs: u64 },

    #[error("Backend connection error: {0}")]
    Network(String),

    #[error("Backend unavailable after {attempts} attempt(s): {last_error}")]
    BackendUnavailable { attempts: u32, last_error: String },

    #[error("Backend returned an unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Failed to start local inference server: {0}")]
    ServerStart(String),
}

impl BackendError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Network failures, timeouts, rate limiting and server-side errors are
    /// transient; authentication and validation failures are not.
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Network(_) | BackendError::Timeout { .. } => true,
            BackendError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Errors from the review workflow and the final commit.
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Failed to read or write the review prompt: {0}")]
    Io(#[source] std::io::Error),

    #[error("Editor '{editor}' failed: {reason}")]
    Editor { editor: String, reason: String },

    #[error("Empty commit subject from model output")]
    EmptySubject,

    #[error("git commit failed: {0}")]
    CommitFailed(String),
}

/// Any failure of a `gitai commit` run.
#[derive(Error, Debug)]
pub enum GitaiError {
    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Review(#[from] ReviewError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(BackendError::Network("refused".into()).is_transient());
        assert!(BackendError::Timeout { secs: 90 }.is_transient());
        assert!(BackendError::Http { status: 500, body: String::new() }.is_transient());
        assert!(BackendError::Http { status: 503, body: String::new() }.is_transient());
        assert!(BackendError::Http { status: 429, body: String::new() }.is_transient());

        assert!(!BackendError::Http { status: 401, body: String::new() }.is_transient());
        assert!(!BackendError::Http { status: 400, body: String::new() }.is_transient());
        assert!(!BackendError::AuthError { env_var: "OPENAI_API_KEY".into() }.is_transient());
        assert!(!BackendError::InvalidResponse("no choices".into()).is_transient());
    }

    #[test]
    fn test_template_error_names_placeholder() {
        let err = PromptError::TemplateError { placeholder: "diff_content" };
        assert_eq!(
            err.to_string(),
            "Prompt template is missing the required placeholder {diff_content}"
        );
    }

    #[test]
    fn test_auth_error_names_env_var() {
        let err = BackendError::AuthError { env_var: "MY_KEY".into() };
        assert!(err.to_string().contains("'MY_KEY'"));
    }
}
