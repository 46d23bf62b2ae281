//! Heuristics for files whose content carries little signal for a commit
//! message: binaries, lock files, minified bundles and generated sources.

use super::FileDiff;

/// Exact file names treated as lock files.
const LOCK_FILES: &[&str] = &[
    "Cargo.lock",
    "package-lock.json",
    "npm-shrinkwrap.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lockb",
    "poetry.lock",
    "Pipfile.lock",
    "uv.lock",
    "Gemfile.lock",
    "composer.lock",
    "go.sum",
    "flake.lock",
    "mix.lock",
    "pubspec.lock",
    "Podfile.lock",
];

/// Suffixes of generated or minified artifacts.
const GENERATED_SUFFIXES: &[&str] = &[
    ".lock",
    ".min.js",
    ".min.css",
    ".map",
    ".pb.go",
    "_pb2.py",
    ".pb.rs",
    ".g.dart",
    ".designer.cs",
    ".snap",
];

/// Directory segments whose contents are build output or vendored code.
const GENERATED_DIRS: &[&str] = &["node_modules", "vendor", "dist", "build", "target", "generated"];

/// Average line length above which a file is treated as minified.
const MINIFIED_AVG_LINE_LEN: usize = 300;

/// Why a file was classified as noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseReason {
    Binary,
    LockFile,
    Generated,
    Minified,
}

/// Classify a file, returning `None` for ordinary source files.
pub fn classify(file: &FileDiff) -> Option<NoiseReason> {
    if file.binary {
        return Some(NoiseReason::Binary);
    }

    let path = file.path.as_str();
    let name = path.rsplit('/').next().unwrap_or(path);

    if LOCK_FILES.contains(&name) {
        return Some(NoiseReason::LockFile);
    }

    if GENERATED_SUFFIXES.iter().any(|s| name.ends_with(s))
        || path
            .split('/')
            .rev()
            .skip(1)
            .any(|segment| GENERATED_DIRS.contains(&segment))
    {
        return Some(NoiseReason::Generated);
    }

    if average_line_len(file) > MINIFIED_AVG_LINE_LEN {
        return Some(NoiseReason::Minified);
    }

    None
}

fn average_line_len(file: &FileDiff) -> usize {
    let (total, count) = file
        .hunks
        .iter()
        .flat_map(|h| &h.lines)
        .fold((0usize, 0usize), |(total, count), line| {
            (total + line.content.len(), count + 1)
        });

    if count == 0 { 0 } else { total / count }
}
