//! Git operations: staged diff collection with git2 and committing through
//! the git CLI.

pub mod commit;
pub mod staged;

pub use commit::commit_staged;
pub use staged::{collect_staged, open_repository};
