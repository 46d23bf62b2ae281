//! Line-budget reduction of the staged diff.
//!
//! Reduction is applied in stages, each only when the previous one left the
//! diff over budget:
//!
//! 1. collapse noise files (binary, lock, generated, minified) to a marker;
//! 2. collapse long runs of unchanged context around each change;
//! 3. truncate every file to a share of the budget proportional to its size;
//! 4. drop whole files, largest change first, and list them in a final note.
//!
//! The file list is never reduced: [`ReducedDiff::files`] always carries every
//! changed path. Output is a pure function of the input record and options.

use tracing::debug;

use super::noise::{self, NoiseReason};
use super::{DiffRecord, FileDiff, LineKind, quote_path};

/// Context lines kept on each side of a change when collapsing context.
pub const CONTEXT_WINDOW: usize = 1;

/// Smallest allowance that still leaves room for the first header line and a
/// truncation marker.
pub const MIN_FILE_LINES: usize = 2;

/// Budget and shape of the reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReduceOptions {
    /// Maximum number of lines in the reduced diff text.
    pub budget: usize,
    /// Drop every context line up front, keeping only headers and changes.
    pub changes_only: bool,
}

impl ReduceOptions {
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            changes_only: false,
        }
    }

    pub fn changes_only(mut self) -> Self {
        self.changes_only = true;
        self
    }
}

/// Result of reducing a [`DiffRecord`] to fit a line budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReducedDiff {
    /// Reduced unified diff text, at most `budget` lines.
    pub text: String,
    /// Every changed path, in diff order, regardless of elision.
    pub files: Vec<String>,
    /// Paths whose content was dropped entirely in the final stage.
    pub omitted_files: Vec<String>,
    /// Lines in the unreduced diff.
    pub total_lines: usize,
    /// Lines in `text`.
    pub emitted_lines: usize,
    /// Whether any content was removed or replaced by a marker.
    pub truncated: bool,
}

/// Rendered lines of one file while it is being reduced.
#[derive(Debug, Clone)]
struct Block {
    path: String,
    /// Added plus removed lines in the unreduced file; drives drop priority.
    changed_lines: usize,
    lines: Vec<String>,
    /// Already reduced to title plus marker; nothing left to trim.
    collapsed: bool,
}

impl Block {
    fn len(&self) -> usize {
        self.lines.len()
    }
}

/// Reduce `record` so that its rendered text fits `options.budget` lines.
pub fn reduce(record: &DiffRecord, options: &ReduceOptions) -> ReducedDiff {
    let files = record.paths();
    let total_lines = record.line_count();
    let budget = options.budget;

    let working: Vec<FileDiff> = if options.changes_only {
        record.files.iter().map(strip_context).collect()
    } else {
        record.files.clone()
    };

    let mut blocks: Vec<Block> = working
        .iter()
        .zip(&record.files)
        .map(|(file, original)| Block {
            path: file.path.clone(),
            changed_lines: original.changed_lines(),
            lines: file.render_lines(),
            collapsed: false,
        })
        .collect();

    if sum_lines(&blocks) > budget {
        collapse_noise(&working, &mut blocks);
        debug!("After noise collapse: {} lines", sum_lines(&blocks));
    }

    if sum_lines(&blocks) > budget && !options.changes_only {
        collapse_context(&working, &mut blocks);
        debug!("After context collapse: {} lines", sum_lines(&blocks));
    }

    if sum_lines(&blocks) > budget {
        truncate_proportionally(&mut blocks, budget);
        debug!("After proportional truncation: {} lines", sum_lines(&blocks));
    }

    let omitted_files = drop_largest(&mut blocks, budget);

    let mut lines: Vec<String> = blocks.into_iter().flat_map(|b| b.lines).collect();
    if !omitted_files.is_empty() && budget > 0 {
        let names: Vec<_> = omitted_files.iter().map(|p| quote_path(p)).collect();
        lines.push(format!("[... omitted files: {} ...]", names.join(", ")));
    }

    let text = lines.join("\n");
    let truncated = text != record.render();

    ReducedDiff {
        emitted_lines: lines.len(),
        text,
        files,
        omitted_files,
        total_lines,
        truncated,
    }
}

fn sum_lines(blocks: &[Block]) -> usize {
    blocks.iter().map(Block::len).sum()
}

/// Remove every context line, keeping headers, hunk headers and changes.
fn strip_context(file: &FileDiff) -> FileDiff {
    let mut stripped = file.clone();
    for hunk in &mut stripped.hunks {
        hunk.lines.retain(|l| l.kind != LineKind::Context);
    }
    stripped
}

fn collapsed_lines(file: &FileDiff, marker: String) -> Vec<String> {
    vec![file.title_line(), marker]
}

fn noise_label(reason: NoiseReason) -> &'static str {
    match reason {
        NoiseReason::Binary => "binary file",
        NoiseReason::LockFile => "lock file",
        NoiseReason::Generated => "generated file",
        NoiseReason::Minified => "minified file",
    }
}

fn collapse_noise(files: &[FileDiff], blocks: &mut [Block]) {
    for (file, block) in files.iter().zip(blocks.iter_mut()) {
        if block.len() <= MIN_FILE_LINES {
            continue;
        }
        if let Some(reason) = noise::classify(file) {
            let omitted = block.len() - 1;
            debug!("Collapsing {} ({}) to a marker", file.path, noise_label(reason));
            block.lines = collapsed_lines(
                file,
                format!("[... {} lines omitted ({}) ...]", omitted, noise_label(reason)),
            );
            block.collapsed = true;
        }
    }
}

fn collapse_context(files: &[FileDiff], blocks: &mut [Block]) {
    for (file, block) in files.iter().zip(blocks.iter_mut()) {
        if block.collapsed {
            continue;
        }
        block.lines = render_with_context_window(file, CONTEXT_WINDOW);
    }
}

/// Render a file keeping at most `window` context lines next to each change.
///
/// Leading and trailing context beyond the window is dropped silently; an
/// interior run long enough to be worth shortening is replaced by its edges
/// and a marker counting the hidden lines.
fn render_with_context_window(file: &FileDiff, window: usize) -> Vec<String> {
    let mut out: Vec<String> = file.header.clone();

    for hunk in &file.hunks {
        out.push(hunk.header.clone());

        let changes: Vec<usize> = hunk
            .lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.is_change())
            .map(|(i, _)| i)
            .collect();

        let (Some(&first), Some(&last)) = (changes.first(), changes.last()) else {
            continue;
        };

        let lead_start = first.saturating_sub(window);
        let trail_end = (last + 1 + window).min(hunk.lines.len());

        let mut i = lead_start;
        while i < trail_end {
            let line = &hunk.lines[i];
            if line.is_change() {
                out.push(line.render());
                i += 1;
                continue;
            }

            let run_end = hunk.lines[i..trail_end]
                .iter()
                .position(|l| l.is_change())
                .map_or(trail_end, |offset| i + offset);
            let run_len = run_end - i;

            if run_end < trail_end && i > lead_start && run_len > 2 * window + 1 {
                out.extend(hunk.lines[i..i + window].iter().map(|l| l.render()));
                out.push(format!("[... {} unchanged lines ...]", run_len - 2 * window));
                out.extend(hunk.lines[run_end - window..run_end].iter().map(|l| l.render()));
            } else {
                out.extend(hunk.lines[i..run_end].iter().map(|l| l.render()));
            }
            i = run_end;
        }
    }

    out
}

/// Give each file `floor(budget * len / total)` lines.
///
/// The mapping is monotonic in file size and the allowances sum to at most
/// `budget`. Files whose allowance cannot hold a header and a marker are
/// collapsed; the final stage resolves any overflow that causes.
fn truncate_proportionally(blocks: &mut [Block], budget: usize) {
    let total = sum_lines(blocks);
    if total == 0 {
        return;
    }

    for block in blocks.iter_mut() {
        let len = block.len();
        let allowance = ((budget as u128 * len as u128) / total as u128) as usize;
        if len <= allowance || block.collapsed {
            continue;
        }

        if allowance >= MIN_FILE_LINES {
            let keep = allowance - 1;
            let omitted = len - keep;
            block.lines.truncate(keep);
            block.lines.push(format!("[... {} lines omitted ...]", omitted));
        } else if len > MIN_FILE_LINES {
            let title = block.lines[0].clone();
            let omitted = len - 1;
            block.lines = vec![title, format!("[... {} lines omitted ...]", omitted)];
            block.collapsed = true;
        }
    }
}

/// Drop whole files, largest change first, until the blocks plus
/// the omitted-files note fit the budget. Returns the dropped paths in diff
/// order.
fn drop_largest(blocks: &mut Vec<Block>, budget: usize) -> Vec<String> {
    let mut order: Vec<usize> = (0..blocks.len()).collect();
    order.sort_by(|&a, &b| {
        blocks[b]
            .changed_lines
            .cmp(&blocks[a].changed_lines)
            .then_with(|| blocks[a].path.cmp(&blocks[b].path))
    });

    let mut dropped = vec![false; blocks.len()];
    let mut used = sum_lines(blocks);
    let mut any_dropped = false;

    for idx in order {
        let note = usize::from(any_dropped);
        if used + note <= budget {
            break;
        }
        used -= blocks[idx].len();
        dropped[idx] = true;
        any_dropped = true;
        debug!("Dropping {} from the diff to fit the budget", blocks[idx].path);
    }

    let mut omitted = Vec::new();
    let mut kept = Vec::with_capacity(blocks.len());
    for (block, was_dropped) in blocks.drain(..).zip(dropped) {
        if was_dropped {
            omitted.push(block.path);
        } else {
            kept.push(block);
        }
    }
    *blocks = kept;
    omitted
}
