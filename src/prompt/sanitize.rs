//! Cleanup of untrusted text (diff content, manual context) before it is
//! placed in a prompt.

use std::sync::LazyLock;

use regex_lite::Regex;

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b(?:\[[0-?]*[ -/]*[@-~]|\][^\x07\x1b\n]*(?:\x07|\x1b\\)|[@-Z\\-_])")
        .expect("Invalid regex")
});

/// Remove ANSI escape sequences (CSI, OSC and two-byte escapes).
pub fn remove_ansi_escapes(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

/// Remove control characters except newline and tab.
pub fn remove_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Sanitize text for a prompt. Never adds or removes newlines, so line
/// counts stay as the reducer computed them.
pub fn sanitize(text: &str) -> String {
    // ANSI first: the escape byte is itself a control character.
    remove_control_chars(&remove_ansi_escapes(text))
}
