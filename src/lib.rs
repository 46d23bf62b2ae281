//! gitai - A CLI tool that drafts Conventional Commit messages from the
//! staged diff.
//!
//! # Overview
//!
//! gitai reads the staged changes with git2, reduces them to a line budget,
//! asks a cloud chat-completion API or a local Ollama server for a commit
//! message, and lets the user accept, edit or reject the draft before
//! running `git commit`.

pub mod commit;
pub mod config;
pub mod cost;
pub mod diff;
pub mod error;
pub mod git;
pub mod llm;
pub mod prompt;
pub mod review;

// Re-export commonly used types
pub use commit::{CommitMessage, run_commit};
pub use config::Config;
pub use diff::{DiffRecord, ReduceOptions, ReducedDiff};
pub use error::{BackendError, CollectError, ConfigError, GitaiError, PromptError, ReviewError};
pub use llm::{Backend, BackendKind, BackendResponse};
pub use review::{Outcome, ReviewDecision, ReviewSession};
