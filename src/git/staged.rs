//! Staged diff collection using git2.

use std::path::Path;

use git2::{Delta, DiffDelta, DiffFindOptions, DiffFormat, DiffOptions, ErrorCode, Repository, Tree};
use tracing::debug;

use crate::diff::{ChangeKind, DiffLine, DiffRecord, FileDiff, Hunk, LineKind, synthesize_header};
use crate::error::CollectError;

/// Unchanged lines git includes around each change.
const CONTEXT_LINES: u32 = 3;

/// Open the repository containing `path`, searching parent directories.
///
/// Bare repositories are rejected since there is no index to commit from.
pub fn open_repository(path: &Path) -> Result<Repository, CollectError> {
    let repo = Repository::discover(path).map_err(|e| match e.code() {
        ErrorCode::NotFound => CollectError::NotARepository(path.display().to_string()),
        _ => CollectError::Git(e),
    })?;

    if repo.is_bare() {
        return Err(CollectError::NotARepository(format!(
            "{} (bare repository)",
            path.display()
        )));
    }

    Ok(repo)
}

/// Resolve the HEAD tree.
///
/// Returns `Ok(None)` for a repository without commits, so the first commit
/// diffs against the empty tree.
fn resolve_head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, CollectError> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(CollectError::Git(e)),
    };

    let tree = head_ref.peel_to_tree().map_err(CollectError::Git)?;
    Ok(Some(tree))
}

/// Collect the staged changes (HEAD tree against the index).
///
/// Unstaged and untracked files are never included. Returns
/// [`CollectError::NoStagedChanges`] when the index matches HEAD.
pub fn collect_staged(repo: &Repository) -> Result<DiffRecord, CollectError> {
    let head_tree = resolve_head_tree(repo)?;

    let mut opts = DiffOptions::new();
    opts.context_lines(CONTEXT_LINES);
    let mut diff = repo
        .diff_tree_to_index(head_tree.as_ref(), None, Some(&mut opts))
        .map_err(CollectError::Git)?;

    let mut find = DiffFindOptions::new();
    find.renames(true);
    diff.find_similar(Some(&mut find)).map_err(CollectError::Git)?;

    if diff.deltas().len() == 0 {
        return Err(CollectError::NoStagedChanges);
    }

    let mut files: Vec<FileDiff> = Vec::new();

    diff.print(DiffFormat::Patch, |delta, _hunk, line| {
        let raw = String::from_utf8_lossy(line.content());
        let content = raw.strip_suffix('\n').unwrap_or(&raw);

        match line.origin() {
            'F' => files.push(file_from_delta(&delta, content)),
            'H' => {
                if let Some(file) = files.last_mut() {
                    file.hunks.push(Hunk {
                        header: content.to_string(),
                        lines: Vec::new(),
                    });
                }
            }
            origin @ ('+' | '-' | ' ') => {
                let kind = match origin {
                    '+' => LineKind::Add,
                    '-' => LineKind::Remove,
                    _ => LineKind::Context,
                };
                if let Some(hunk) = files.last_mut().and_then(|f| f.hunks.last_mut()) {
                    hunk.lines.push(DiffLine::new(kind, content));
                }
            }
            'B' => {
                if let Some(file) = files.last_mut() {
                    file.binary = true;
                    file.header.push(content.to_string());
                }
            }
            // End-of-file newline markers carry no content.
            _ => {}
        }
        true
    })
    .map_err(CollectError::Git)?;

    let record = DiffRecord::new(files);
    debug!(
        "Collected {} staged file(s), {} line(s), +{} -{}",
        record.files.len(),
        record.line_count(),
        record.additions(),
        record.deletions()
    );
    Ok(record)
}

fn file_from_delta(delta: &DiffDelta<'_>, header: &str) -> FileDiff {
    let kind = match delta.status() {
        Delta::Added => ChangeKind::Added,
        Delta::Deleted => ChangeKind::Deleted,
        Delta::Renamed => ChangeKind::Renamed,
        _ => ChangeKind::Modified,
    };

    let new_path = delta.new_file().path().map(|p| p.to_string_lossy().to_string());
    let old_path = delta.old_file().path().map(|p| p.to_string_lossy().to_string());

    let (path, old_path) = match kind {
        ChangeKind::Renamed => (new_path.clone().or_else(|| old_path.clone()).unwrap_or_default(), old_path),
        _ => (new_path.or(old_path).unwrap_or_default(), None),
    };

    let mut header: Vec<String> = header.lines().map(str::to_string).collect();
    if header.is_empty() {
        header = synthesize_header(&path, old_path.as_deref(), kind);
    }

    FileDiff {
        binary: delta.flags().is_binary(),
        path,
        old_path,
        kind,
        header,
        hunks: Vec::new(),
    }
}
