//! Prompt templates: the built-in default and user-supplied files.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::Config;
use crate::error::PromptError;

pub const FILES_LIST: &str = "files_list";
pub const MANUAL_BLOCK: &str = "manual_block";
pub const DIFF_CONTENT: &str = "diff_content";
pub const MANUAL_RULES: &str = "manual_rules";

/// Placeholders every template must contain.
pub const REQUIRED_PLACEHOLDERS: [&str; 3] = [FILES_LIST, MANUAL_BLOCK, DIFF_CONTENT];

const DEFAULT_TEMPLATE: &str = "\
You are an expert software engineer.

Write a Conventional Commit message based on the STAGED DIFF.

Rules:
- Output ONLY the commit message (no commentary, no extra text).
- Subject line: <type>(<optional scope>): <imperative summary>, max 72 chars.
{manual_rules}- Blank line after the subject line (and after Topic line if present).
- Total number of code lines added and removed.
- Blank line.
- Then write the body under the heading \"CHANGES:\" with 2-8 concise bullet points describing what changed and why.
- Then include a section titled \"Files changed:\" at the VERY END listing all changed files.

Files:
{files_list}
{manual_block}
STAGED DIFF:
{diff_content}";

/// A prompt template with `{placeholder}` tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    text: String,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl Template {
    /// Validate and wrap template text.
    pub fn parse(text: impl Into<String>) -> Result<Self, PromptError> {
        let template = Self {
            text: text.into().trim().to_string(),
        };
        template.validate()?;
        Ok(template)
    }

    /// Read a template file.
    pub fn from_file(path: &Path) -> Result<Self, PromptError> {
        let text = fs::read_to_string(path).map_err(|source| PromptError::MissingTemplate {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded prompt template from {}", path.display());
        Self::parse(text)
    }

    /// Load the template the configuration points at, or the built-in one
    /// when no template file is configured or present.
    pub fn load(config: &Config) -> Result<Self, PromptError> {
        match config.template_path() {
            Some((path, _)) => Self::from_file(&path),
            None => {
                debug!("Using built-in prompt template");
                Ok(Self::default())
            }
        }
    }

    /// Fail with the first required placeholder that is missing.
    pub fn validate(&self) -> Result<(), PromptError> {
        match REQUIRED_PLACEHOLDERS
            .iter()
            .find(|name| !self.text.contains(&format!("{{{}}}", name)))
        {
            Some(&placeholder) => Err(PromptError::TemplateError { placeholder }),
            None => Ok(()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Substitute every known placeholder in a single left-to-right pass.
    ///
    /// Substituted values are copied verbatim and never scanned again, so a
    /// diff that happens to contain `{files_list}` stays as written. Braces
    /// that do not form a known placeholder are kept.
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(
            self.text.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>(),
        );
        let mut rest = self.text.as_str();

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start + 1..];

            let hit = values.iter().find_map(|(name, value)| {
                tail.strip_prefix(name)
                    .and_then(|after| after.strip_prefix('}'))
                    .map(|after| (*value, after))
            });

            match hit {
                Some((value, after)) => {
                    out.push_str(value);
                    rest = after;
                }
                None => {
                    out.push('{');
                    rest = tail;
                }
            }
        }

        out.push_str(rest);
        out
    }
}
