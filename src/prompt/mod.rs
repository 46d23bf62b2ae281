//! Prompt construction for commit message generation.

pub mod sanitize;
pub mod template;

pub use template::Template;

use crate::diff::quote_path;
use crate::error::PromptError;
use template::{DIFF_CONTENT, FILES_LIST, MANUAL_BLOCK, MANUAL_RULES};

/// System message sent ahead of the rendered template.
pub const SYSTEM_PROMPT: &str = "You write precise, technical git commit messages.";

const MANUAL_RULES_TEXT: &str = "\
- You MUST include a one-line 'Topic:' line immediately AFTER the subject line.
- Format exactly: Topic: <manual_topic>
";

/// A fully rendered prompt, ready to dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Inputs to a prompt: template, changed files, optional manual context and
/// the already reduced diff text.
#[derive(Debug, Clone, Copy)]
pub struct PromptRequest<'a> {
    pub template: &'a Template,
    pub files: &'a [String],
    pub manual_context: Option<&'a str>,
    pub diff: &'a str,
}

impl<'a> PromptRequest<'a> {
    pub fn new(template: &'a Template, files: &'a [String], diff: &'a str) -> Self {
        Self {
            template,
            files,
            manual_context: None,
            diff,
        }
    }

    pub fn with_manual_context(mut self, context: Option<&'a str>) -> Self {
        self.manual_context = context;
        self
    }

    /// Render the prompt. Fails if the template lacks a required placeholder.
    pub fn build(&self) -> Result<Prompt, PromptError> {
        self.template.validate()?;

        let topic = self
            .manual_context
            .map(|c| sanitize::sanitize(c).trim().to_string())
            .filter(|c| !c.is_empty());

        let (rules, block) = match &topic {
            Some(topic) => (
                MANUAL_RULES_TEXT.to_string(),
                format!("\nManual commit message topic:\n{}\n", topic),
            ),
            None => (String::new(), String::new()),
        };

        let files_list = self
            .files
            .iter()
            .map(|f| sanitize::sanitize(&quote_path(f)))
            .collect::<Vec<_>>()
            .join("\n");
        let diff = sanitize::sanitize(self.diff);

        let user = self.template.render(&[
            (MANUAL_RULES, rules.as_str()),
            (FILES_LIST, files_list.as_str()),
            (MANUAL_BLOCK, block.as_str()),
            (DIFF_CONTENT, diff.as_str()),
        ]);

        Ok(Prompt {
            system: SYSTEM_PROMPT.to_string(),
            user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files() -> Vec<String> {
        vec!["src/main.rs".to_string(), "README.md".to_string()]
    }

    #[test]
    fn test_build_includes_every_file_and_the_diff() {
        let template = Template::default();
        let files = files();
        let prompt = PromptRequest::new(&template, &files, "+fn main() {}").build().unwrap();

        assert_eq!(prompt.system, SYSTEM_PROMPT);
        assert!(prompt.user.contains("Files:\nsrc/main.rs\nREADME.md"));
        assert!(prompt.user.contains("STAGED DIFF:\n+fn main() {}"));
        assert!(!prompt.user.contains("Topic:"));
    }

    #[test]
    fn test_unusual_paths_are_quoted_on_one_line() {
        let template = Template::default();
        let files = vec!["weird\nname.txt".to_string(), "b.rs".to_string()];
        let prompt = PromptRequest::new(&template, &files, "+x").build().unwrap();

        assert!(prompt.user.contains("Files:\n\"weird\\nname.txt\"\nb.rs"));
    }

    #[test]
    fn test_build_leaves_no_placeholder_tokens() {
        let template = Template::default();
        let files = files();
        let prompt = PromptRequest::new(&template, &files, "+x")
            .with_manual_context(Some("billing"))
            .build()
            .unwrap();

        for name in ["{files_list}", "{manual_block}", "{diff_content}", "{manual_rules}"] {
            assert!(!prompt.user.contains(name), "{name} left in prompt");
        }
    }

    #[test]
    fn test_manual_context_adds_rules_and_block() {
        let template = Template::default();
        let files = files();
        let prompt = PromptRequest::new(&template, &files, "+x")
            .with_manual_context(Some("  payment retries  "))
            .build()
            .unwrap();

        assert!(prompt.user.contains("Format exactly: Topic: <manual_topic>"));
        assert!(prompt.user.contains("Manual commit message topic:\npayment retries\n"));
    }

    #[test]
    fn test_blank_manual_context_is_ignored() {
        let template = Template::default();
        let files = files();
        let prompt = PromptRequest::new(&template, &files, "+x")
            .with_manual_context(Some("   "))
            .build()
            .unwrap();
        assert!(!prompt.user.contains("Manual commit message topic"));
    }

    #[test]
    fn test_diff_is_sanitized() {
        let template = Template::default();
        let files = files();
        let prompt = PromptRequest::new(&template, &files, "\x1b[32m+green\x1b[0m")
            .build()
            .unwrap();
        assert!(prompt.user.contains("+green"));
        assert!(!prompt.user.contains('\x1b'));
    }
}
