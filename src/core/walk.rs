use std::fs;
use std::path::{Path, PathBuf};

/// Directory names never descended into.
pub const SKIP_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".venv",
    "venv",
    ".mypy_cache",
    ".pytest_cache",
    ".ruff_cache",
    ".tox",
    "dist",
    "build",
    "target",
    ".next",
    "coverage",
];

pub fn is_skipped_dir(name: &str) -> bool {
    SKIP_DIRS.contains(&name)
}

/// Collect files under `root` whose extension is in `extensions` (any file
/// when `extensions` is empty), sorted by path. Unreadable directories are skipped; symlinked directories are not
/// followed.
pub fn collect_files(root: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    fn recurse(dir: &Path, extensions: &[&str], out: &mut Vec<PathBuf>) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
                if is_skipped_dir(name) {
                    continue;
                }
                recurse(&path, extensions, out);
            } else if path.is_file()
                && (extensions.is_empty()
                    || path
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| extensions.contains(&e)))
            {
                out.push(path);
            }
        }
    }

    let mut out = Vec::new();
    if root.is_dir() {
        recurse(root, extensions, &mut out);
    }
    out.sort();
    out
}

/// Files across several roots. Roots keep their given order; files are
/// sorted within each root. A file reachable from two roots is listed once.
pub fn collect_across(roots: &[PathBuf], extensions: &[&str]) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = Vec::new();
    for root in roots {
        for file in collect_files(root, extensions) {
            if !out.contains(&file) {
                out.push(file);
            }
        }
    }
    out
}

/// Render `path` relative to `root` with forward slashes.
pub fn display_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
