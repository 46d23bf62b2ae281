//! External editor for revising a draft commit message.

use std::env;
use std::fs;
use std::io::Write;
use std::process::Command;

use tracing::debug;

use crate::error::ReviewError;

/// Appended to the draft so the user knows how editing works.
const EDIT_HINT: &str = "\n\n# Edit the commit message above. Lines starting with '#' are ignored.\n# An empty message aborts the commit.\n";

/// Opens text for editing and returns the revised text.
#[cfg_attr(test, mockall::automock)]
pub trait Editor {
    fn edit(&self, initial: &str) -> Result<String, ReviewError>;
}

/// Runs the user's editor on a temporary file and blocks until it exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalEditor {
    command: String,
}

impl ExternalEditor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Editor from `GIT_EDITOR`, `VISUAL` or `EDITOR`, falling back to
    /// `notepad` on Windows and `vi` elsewhere.
    pub fn from_env() -> Self {
        let command = ["GIT_EDITOR", "VISUAL", "EDITOR"]
            .iter()
            .filter_map(|var| env::var(var).ok())
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
            .unwrap_or_else(|| if cfg!(windows) { "notepad" } else { "vi" }.to_string());
        Self::new(command)
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    fn failure(&self, reason: impl Into<String>) -> ReviewError {
        ReviewError::Editor {
            editor: self.command.clone(),
            reason: reason.into(),
        }
    }
}

impl Editor for ExternalEditor {
    fn edit(&self, initial: &str) -> Result<String, ReviewError> {
        let mut file = tempfile::Builder::new()
            .prefix("gitai-")
            .suffix(".COMMIT_EDITMSG")
            .tempfile()
            .map_err(ReviewError::Io)?;
        file.write_all(initial.as_bytes()).map_err(ReviewError::Io)?;
        file.write_all(EDIT_HINT.as_bytes()).map_err(ReviewError::Io)?;
        file.flush().map_err(ReviewError::Io)?;

        // Editor values such as "code --wait" carry arguments.
        let mut parts = self.command.split_whitespace();
        let program = parts.next().ok_or_else(|| self.failure("empty editor command"))?;

        debug!("Opening {} with {}", file.path().display(), self.command);
        let status = Command::new(program)
            .args(parts)
            .arg(file.path())
            .status()
            .map_err(|e| self.failure(e.to_string()))?;

        if !status.success() {
            return Err(self.failure(format!("exited with {}", status)));
        }

        fs::read_to_string(file.path()).map_err(ReviewError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env_prefers_git_editor() {
        temp_env::with_vars(
            [
                ("GIT_EDITOR", Some("nano")),
                ("VISUAL", Some("code --wait")),
                ("EDITOR", Some("vim")),
            ],
            || assert_eq!(ExternalEditor::from_env().command(), "nano"),
        );
    }

    #[test]
    #[serial]
    fn test_from_env_skips_blank_values() {
        temp_env::with_vars(
            [("GIT_EDITOR", Some(" ")), ("VISUAL", None), ("EDITOR", Some("vim"))],
            || assert_eq!(ExternalEditor::from_env().command(), "vim"),
        );
    }

    #[test]
    #[serial]
    fn test_from_env_fallback() {
        temp_env::with_vars(
            [("GIT_EDITOR", None::<&str>), ("VISUAL", None), ("EDITOR", None)],
            || {
                let expected = if cfg!(windows) { "notepad" } else { "vi" };
                assert_eq!(ExternalEditor::from_env().command(), expected);
            },
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_noop_editor_returns_draft_with_hint() {
        // `true` exits immediately without touching the file.
        let text = ExternalEditor::new("true").edit("feat: x").unwrap();
        assert!(text.starts_with("feat: x\n\n# Edit the commit message"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_editor_is_an_error() {
        let err = ExternalEditor::new("false").edit("feat: x").unwrap_err();
        assert!(matches!(err, ReviewError::Editor { ref editor, .. } if editor == "false"));
    }

    #[test]
    fn test_missing_editor_binary_is_an_error() {
        let err = ExternalEditor::new("gitai-no-such-editor-binary").edit("x").unwrap_err();
        assert!(matches!(err, ReviewError::Editor { .. }));
    }
}
