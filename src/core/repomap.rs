use crate::core::walk;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct RepoMap {
    pub manifests: BTreeMap<String, String>, // relative path -> ecosystem
    pub entry_points: Vec<String>,
    pub stack_hints: Vec<String>,
}

const MANIFEST_TYPES: &[(&str, &str)] = &[
    ("pyproject.toml", "python"),
    ("requirements.txt", "python"),
    ("setup.py", "python"),
    ("alembic.ini", "alembic"),
    ("package.json", "node"),
    ("docker-compose.yml", "docker"),
    ("Makefile", "make"),
];

const ENTRY_CANDIDATES: &[&str] = &[
    "main.py",
    "manage.py",
    "app/main.py",
    "src/main.py",
    "frontend/src/main.tsx",
    "frontend/src/index.tsx",
    "frontend/src/main.ts",
];

/// Library names looked for in manifest text, with the hint they produce.
const STACK_MARKERS: &[(&str, &str)] = &[
    ("fastapi", "fastapi"),
    ("flask", "flask"),
    ("django", "django"),
    ("sqlalchemy", "sqlalchemy"),
    ("alembic", "alembic"),
    ("pydantic", "pydantic"),
    ("\"react\"", "react"),
    ("\"next\"", "nextjs"),
    ("\"vue\"", "vue"),
    ("\"typescript\"", "typescript"),
];

/// Manifests, entry points and stack hints at `root` and under each of
/// `sub_roots` (for split `backend/` + `frontend/` layouts).
pub fn generate_map(root: &Path, sub_roots: &[String]) -> RepoMap {
    let mut map = RepoMap::default();
    let mut prefixes = vec![String::new()];
    prefixes.extend(sub_roots.iter().map(|r| format!("{}/", r.trim_end_matches('/'))));

    for prefix in &prefixes {
        for (file, mtype) in MANIFEST_TYPES {
            let rel = format!("{}{}", prefix, file);
            let full = root.join(&rel);
            if !full.is_file() {
                continue;
            }
            map.manifests.insert(rel, mtype.to_string());
            let text = fs::read_to_string(&full).unwrap_or_default().to_lowercase();
            for (marker, hint) in STACK_MARKERS {
                if text.contains(marker) && !map.stack_hints.iter().any(|h| h == hint) {
                    map.stack_hints.push(hint.to_string());
                }
            }
        }
        for entry in ENTRY_CANDIDATES {
            let rel = format!("{}{}", prefix, entry);
            if root.join(&rel).is_file() && !map.entry_points.contains(&rel) {
                map.entry_points.push(rel);
            }
        }
    }

    map.entry_points.sort();
    map.stack_hints.sort();
    map
}

/// Indented directory listing, directories first, `max_depth` levels deep.
/// Denylisted directories and dotfiles are left out.
pub fn project_tree(root: &Path, max_depth: usize) -> Vec<String> {
    fn recurse(dir: &Path, depth: usize, max_depth: usize, out: &mut Vec<String>) {
        if depth >= max_depth {
            return;
        }
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            match entry.file_type() {
                Ok(t) if t.is_dir() => {
                    if !walk::is_skipped_dir(&name) {
                        dirs.push(name);
                    }
                }
                Ok(t) if t.is_file() => files.push(name),
                _ => {}
            }
        }
        dirs.sort();
        files.sort();

        let indent = "  ".repeat(depth);
        for name in dirs {
            out.push(format!("{}{}/", indent, name));
            recurse(&dir.join(&name), depth + 1, max_depth, out);
        }
        for name in files {
            out.push(format!("{}{}", indent, name));
        }
    }

    let mut out = Vec::new();
    recurse(root, 0, max_depth, &mut out);
    out
}
