//! Staged diff data model and budget-driven reduction.

pub mod noise;
pub mod reduce;

use std::borrow::Cow;
use std::fmt;

pub use reduce::{ReduceOptions, ReducedDiff, reduce};

/// Kind of change applied to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "Added"),
            ChangeKind::Modified => write!(f, "Modified"),
            ChangeKind::Deleted => write!(f, "Deleted"),
            ChangeKind::Renamed => write!(f, "Renamed"),
        }
    }
}

/// Tag of a single line inside a hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Context,
    Add,
    Remove,
}

impl LineKind {
    fn prefix(self) -> char {
        match self {
            LineKind::Context => ' ',
            LineKind::Add => '+',
            LineKind::Remove => '-',
        }
    }
}

/// A single line of hunk content, without its trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: LineKind,
    pub content: String,
}

impl DiffLine {
    pub fn new(kind: LineKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }

    pub fn render(&self) -> String {
        format!("{}{}", self.kind.prefix(), self.content)
    }

    pub fn is_change(&self) -> bool {
        self.kind != LineKind::Context
    }
}

/// A hunk: its `@@ ... @@` header and the lines beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub header: String,
    pub lines: Vec<DiffLine>,
}

/// All staged changes to a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: String,
    /// Previous path for renames.
    pub old_path: Option<String>,
    pub kind: ChangeKind,
    pub binary: bool,
    /// Header lines as git prints them (`diff --git`, `index`, `---`, `+++`).
    pub header: Vec<String>,
    pub hunks: Vec<Hunk>,
}

impl FileDiff {
    /// Create a file entry with a synthesized `git diff` style header.
    pub fn new(path: impl Into<String>, kind: ChangeKind) -> Self {
        let path = path.into();
        let header = synthesize_header(&path, None, kind);
        Self {
            path,
            old_path: None,
            kind,
            binary: false,
            header,
            hunks: Vec::new(),
        }
    }

    /// Number of added plus removed lines.
    pub fn changed_lines(&self) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| &h.lines)
            .filter(|l| l.is_change())
            .count()
    }

    /// Number of lines this file occupies once rendered.
    pub fn line_count(&self) -> usize {
        self.header.len()
            + self
                .hunks
                .iter()
                .map(|h| 1 + h.lines.len())
                .sum::<usize>()
    }

    /// Render as unified diff lines.
    pub fn render_lines(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.line_count());
        out.extend(self.header.iter().cloned());
        for hunk in &self.hunks {
            out.push(hunk.header.clone());
            out.extend(hunk.lines.iter().map(DiffLine::render));
        }
        out
    }

    /// First header line, used when the body of the file is elided.
    pub fn title_line(&self) -> String {
        self.header
            .first()
            .cloned()
            .unwrap_or_else(|| {
                format!(
                    "diff --git {} {}",
                    quote_path(&format!("a/{}", self.path)),
                    quote_path(&format!("b/{}", self.path))
                )
            })
    }
}

/// The staged diff: an ordered sequence of file changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffRecord {
    pub files: Vec<FileDiff>,
}

impl DiffRecord {
    pub fn new(files: Vec<FileDiff>) -> Self {
        Self { files }
    }

    /// Every changed path, in diff order.
    pub fn paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    pub fn line_count(&self) -> usize {
        self.files.iter().map(FileDiff::line_count).sum()
    }

    pub fn additions(&self) -> usize {
        self.count_lines(LineKind::Add)
    }

    pub fn deletions(&self) -> usize {
        self.count_lines(LineKind::Remove)
    }

    fn count_lines(&self, kind: LineKind) -> usize {
        self.files
            .iter()
            .flat_map(|f| &f.hunks)
            .flat_map(|h| &h.lines)
            .filter(|l| l.kind == kind)
            .count()
    }

    /// Render the full diff as text.
    pub fn render(&self) -> String {
        self.files
            .iter()
            .flat_map(FileDiff::render_lines)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Build the header lines git would print for a change without an index line.
pub fn synthesize_header(path: &str, old_path: Option<&str>, kind: ChangeKind) -> Vec<String> {
    let old = old_path.unwrap_or(path);
    let a = quote_path(&format!("a/{}", old)).into_owned();
    let b = quote_path(&format!("b/{}", path)).into_owned();
    let mut header = vec![format!("diff --git {} {}", a, b)];
    match kind {
        ChangeKind::Added => {
            header.push("new file mode 100644".to_string());
            header.push("--- /dev/null".to_string());
            header.push(format!("+++ {}", b));
        }
        ChangeKind::Deleted => {
            header.push("deleted file mode 100644".to_string());
            header.push(format!("--- {}", a));
            header.push("+++ /dev/null".to_string());
        }
        ChangeKind::Renamed => {
            header.push(format!("rename from {}", quote_path(old)));
            header.push(format!("rename to {}", quote_path(path)));
        }
        ChangeKind::Modified => {
            header.push(format!("--- {}", a));
            header.push(format!("+++ {}", b));
        }
    }
    header
}

/// Quote `path` the way git quotes unusual names in diff headers, so that it
/// always renders on a single line.
///
/// Paths without control characters, `"` or `\` are returned unchanged.
pub fn quote_path(path: &str) -> Cow<'_, str> {
    if !path.chars().any(|c| c.is_control() || c == '"' || c == '\\') {
        return Cow::Borrowed(path);
    }

    let mut out = String::with_capacity(path.len() + 2);
    out.push('"');
    for c in path.chars() {
        match c {
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\x0b' => out.push_str("\\v"),
            '\x0c' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if c.is_control() => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    out.push_str(&format!("\\{:03o}", byte));
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
    Cow::Owned(out)
}
