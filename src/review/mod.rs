//! Interactive review of a drafted commit message.
//!
//! ```text
//! Proposed --y--> Accepted
//! Proposed --n--> Rejected
//! Proposed --e--> Editing --non-empty--> Accepted
//!                         --empty------> Rejected
//! ```

pub mod editor;

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub use editor::{Editor, ExternalEditor};

use crate::commit::CommitMessage;
use crate::error::ReviewError;
use crate::git::commit_staged;

const PROMPT: &str = "Accept this commit message? [y]es/[n]o/[e]dit [y/N/e]: ";

/// How the review ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    Accept(CommitMessage),
    Reject,
    EditAccept(CommitMessage),
    EditReject,
}

/// Final result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Committed(CommitMessage),
    Rejected,
}

/// Creates the commit once a message is accepted.
#[cfg_attr(test, mockall::automock)]
pub trait Committer {
    fn commit(&self, message: &CommitMessage) -> Result<(), ReviewError>;
}

/// Commits through `git commit` in a repository's working directory.
#[derive(Debug, Clone)]
pub struct GitCommitter {
    workdir: PathBuf,
    started: Arc<AtomicBool>,
}

impl GitCommitter {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            started: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share `flag`, which is raised just before `git commit` runs.
    pub fn with_started_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.started = flag;
        self
    }

    /// Whether `git commit` has been started.
    pub fn started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

impl Committer for GitCommitter {
    fn commit(&self, message: &CommitMessage) -> Result<(), ReviewError> {
        self.started.store(true, Ordering::SeqCst);
        commit_staged(&self.workdir, &message.subject, message.body.as_deref())
    }
}

/// What to tell the user on Ctrl-C. Once `git commit` is running the commit
/// may already exist.
pub fn interrupt_message(commit_started: bool) -> &'static str {
    if commit_started {
        "Interrupted."
    } else {
        "Interrupted. Nothing was committed."
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Proposed,
    Editing,
}

/// Drives the accept/reject/edit prompt over injected streams.
pub struct ReviewSession<R: BufRead, W: Write, E: Editor> {
    input: R,
    output: W,
    editor: E,
}

impl<R: BufRead, W: Write, E: Editor> ReviewSession<R, W, E> {
    pub fn new(input: R, output: W, editor: E) -> Self {
        Self { input, output, editor }
    }

    /// Ask the user about `draft` until a decision is reached.
    ///
    /// End of input counts as a rejection. Unrecognised answers re-prompt.
    pub fn review(&mut self, draft: &str) -> Result<ReviewDecision, ReviewError> {
        let mut state = State::Proposed;

        loop {
            match state {
                State::Proposed => {
                    write!(self.output, "{}", PROMPT).map_err(ReviewError::Io)?;
                    self.output.flush().map_err(ReviewError::Io)?;

                    let mut answer = String::new();
                    let read = self.input.read_line(&mut answer).map_err(ReviewError::Io)?;
                    if read == 0 {
                        writeln!(self.output).map_err(ReviewError::Io)?;
                        return Ok(ReviewDecision::Reject);
                    }

                    match answer.trim().to_lowercase().as_str() {
                        "y" | "yes" => return Ok(ReviewDecision::Accept(CommitMessage::parse(draft)?)),
                        "n" | "no" | "" => return Ok(ReviewDecision::Reject),
                        "e" | "edit" => state = State::Editing,
                        other => {
                            writeln!(self.output, "Unrecognised answer '{}'. Please answer y, n or e.", other)
                                .map_err(ReviewError::Io)?;
                        }
                    }
                }
                State::Editing => {
                    let edited = self.editor.edit(draft)?;
                    let cleaned = strip_comments(&edited);
                    if cleaned.is_empty() {
                        return Ok(ReviewDecision::EditReject);
                    }
                    return Ok(ReviewDecision::EditAccept(CommitMessage::parse(&cleaned)?));
                }
            }
        }
    }
}

/// Commit when the decision accepts a message.
pub fn apply_decision<C: Committer + ?Sized>(
    decision: ReviewDecision,
    committer: &C,
) -> Result<Outcome, ReviewError> {
    match decision {
        ReviewDecision::Accept(message) | ReviewDecision::EditAccept(message) => {
            committer.commit(&message)?;
            Ok(Outcome::Committed(message))
        }
        ReviewDecision::Reject | ReviewDecision::EditReject => Ok(Outcome::Rejected),
    }
}

/// Drop `#` comment lines and trailing whitespace, as git's `strip` cleanup does.
pub fn strip_comments(text: &str) -> String {
    text.lines()
        .filter(|line| !line.starts_with('#'))
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
