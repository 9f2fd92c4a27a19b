//! Markdown spec parsing: declared tables, file paths and code idioms.

use crate::core::error::SpecgateError;
use crate::plugins::conventions::{LEGACY_COLUMN_RE, MODERN_COLUMN_RE};
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// Top-level directories a backticked string must start with to count as a
/// file path.
pub const KNOWN_PATH_ROOTS: &[&str] = &[
    "app", "backend", "frontend", "src", "tests", "alembic", "migrations", "scripts",
];

static TABLE_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{3}\s+`([^`]+)`").unwrap());
static HEADER_ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\|\s*column\s*\|").unwrap());
static SEPARATOR_ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\|[\s:|-]*-[\s:|-]*$").unwrap());
static BACKTICK_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"`((?:{})/[^`\s]+)`",
        KNOWN_PATH_ROOTS.join("|")
    ))
    .unwrap()
});
static COMMENT_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\s*((?:[\w.-]+/)+[\w.-]+\.py)\b").unwrap());
static UUID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\buuid").unwrap());
static ULID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bulid").unwrap());

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SpecColumn {
    pub name: String,
    pub declared_type: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SpecTable {
    pub name: String,
    pub columns: Vec<SpecColumn>,
}

impl SpecTable {
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct SpecIdioms {
    pub uses_legacy_idiom: bool,
    pub uses_modern_idiom: bool,
    pub mentions_uuid_only: bool,
    pub mentions_ulid: bool,
}

impl SpecIdioms {
    pub fn legacy_only(&self) -> bool {
        self.uses_legacy_idiom && !self.uses_modern_idiom
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SpecDocument {
    /// Declared tables in first-seen order.
    pub tables: Vec<SpecTable>,
    pub paths: Vec<String>,
    pub idioms: SpecIdioms,
}

impl SpecDocument {
    pub fn parse(text: &str) -> Self {
        Self {
            tables: parse_tables(text),
            paths: extract_paths(text),
            idioms: detect_idioms(text),
        }
    }

    pub fn load(path: &Path) -> Result<Self, SpecgateError> {
        let text = fs::read_to_string(path).map_err(|e| {
            SpecgateError::InputReadError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Ok(Self::parse(&text))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableState {
    Idle,
    AwaitingSeparator,
    Capturing,
}

fn strip_cell(cell: &str) -> String {
    cell.trim().trim_matches('`').trim().to_string()
}

/// Column tables declared under ``### `name` `` headings.
///
/// A table appears in the result once its `| Column | ...` header row is
/// seen, so headings that only name files do not become tables.
pub fn parse_tables(text: &str) -> Vec<SpecTable> {
    let mut tables: Vec<SpecTable> = Vec::new();
    let mut current: Option<usize> = None;
    let mut pending: Option<String> = None;
    let mut state = TableState::Idle;

    for line in text.lines() {
        let trimmed = line.trim();

        if let Some(cap) = TABLE_HEADING_RE.captures(trimmed) {
            pending = Some(cap[1].trim().to_string());
            current = None;
            state = TableState::Idle;
            continue;
        }

        match state {
            TableState::Idle => {
                if HEADER_ROW_RE.is_match(trimmed) {
                    if let Some(name) = pending.as_deref() {
                        let idx = match tables.iter().position(|t| t.name == name) {
                            Some(idx) => idx,
                            None => {
                                tables.push(SpecTable {
                                    name: name.to_string(),
                                    columns: Vec::new(),
                                });
                                tables.len() - 1
                            }
                        };
                        current = Some(idx);
                        state = TableState::AwaitingSeparator;
                    }
                }
            }
            TableState::AwaitingSeparator => {
                state = if SEPARATOR_ROW_RE.is_match(trimmed) {
                    TableState::Capturing
                } else {
                    TableState::Idle
                };
            }
            TableState::Capturing => {
                if trimmed.is_empty() {
                    continue;
                }
                if !trimmed.starts_with('|') {
                    current = None;
                    pending = None;
                    state = TableState::Idle;
                    continue;
                }
                if HEADER_ROW_RE.is_match(trimmed) {
                    continue;
                }
                let cells: Vec<&str> = trimmed.trim_matches('|').split('|').collect();
                let name = strip_cell(cells.first().copied().unwrap_or(""));
                if name.is_empty() || name.starts_with('-') {
                    continue;
                }
                let declared_type = strip_cell(cells.get(1).copied().unwrap_or(""));
                if let Some(idx) = current {
                    tables[idx].columns.push(SpecColumn {
                        name,
                        declared_type,
                    });
                }
            }
        }
    }
    tables
}

/// File paths mentioned in backticks or in `# dir/file.py` comments,
/// deduplicated in order of first appearance.
pub fn extract_paths(text: &str) -> Vec<String> {
    let mut hits: Vec<(usize, String)> = BACKTICK_PATH_RE
        .captures_iter(text)
        .chain(COMMENT_PATH_RE.captures_iter(text))
        .filter_map(|cap| cap.get(1))
        .map(|m| (m.start(), m.as_str().trim_end_matches(['.', ',', ':']).to_string()))
        .collect();
    hits.sort_by_key(|(pos, _)| *pos);

    let mut paths: Vec<String> = Vec::new();
    for (_, path) in hits {
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    paths
}

pub fn detect_idioms(text: &str) -> SpecIdioms {
    let mut idioms = SpecIdioms::default();
    let mut fence: Option<bool> = None;

    for line in text.lines() {
        let trimmed = line.trim_start();
        if let Some(tag) = trimmed.strip_prefix("```") {
            fence = match fence {
                Some(_) => None,
                None => {
                    let tag = tag.trim().to_ascii_lowercase();
                    Some(tag == "python" || tag == "py")
                }
            };
            continue;
        }
        if fence == Some(true) {
            idioms.uses_legacy_idiom |= LEGACY_COLUMN_RE.is_match(line);
            idioms.uses_modern_idiom |= MODERN_COLUMN_RE.is_match(line);
        }
    }

    idioms.mentions_ulid = ULID_RE.is_match(text);
    idioms.mentions_uuid_only = UUID_RE.is_match(text) && !idioms.mentions_ulid;
    idioms
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = r#"# Feature: projects

### `projects`

Stores projects.

| Column | Type | Notes |
|--------|------|-------|
| `id` | `Integer` | pk |
| `owner_id` | `ForeignKey(users.id)` | |

| `title` | String | blank line above is fine |
| | ignored | |
| --- | --- | --- |
Trailing prose ends the table.
| `stray` | String | |

### `app/models/project.py`

Just a file heading.

### `tags`
| column | type |
|:--|:--|
| name | String |
"#;

    #[test]
    fn table_state_machine() {
        let tables = parse_tables(SPEC);
        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["projects", "tags"]);

        let cols: Vec<&str> = tables[0].column_names().collect();
        assert_eq!(cols, vec!["id", "owner_id", "title"]);
        assert_eq!(tables[0].columns[1].declared_type, "ForeignKey(users.id)");
        assert_eq!(tables[1].columns[0].name, "name");
    }

    #[test]
    fn header_without_separator_is_not_captured() {
        let tables = parse_tables("### `a`\n| Column | Type |\n| x | y |\n");
        assert_eq!(tables.len(), 1);
        assert!(tables[0].columns.is_empty());
    }

    #[test]
    fn repeated_header_row_is_not_a_column() {
        let text = "### `users`\n| Column | Type |\n|---|---|\n| id | Integer |\n| Column | Type |\n|---|---|\n| email | String |\n";
        let tables = parse_tables(text);
        let cols: Vec<&str> = tables[0].column_names().collect();
        assert_eq!(cols, vec!["id", "email"]);
    }

    #[test]
    fn paths_are_deduplicated_in_order() {
        let text = "See `app/models/project.py` and `docs/readme.md`.\n\
                    ```python\n# app/services/projects.py\n```\n\
                    Again `app/models/project.py`, then `frontend/src/App.tsx`.";
        assert_eq!(
            extract_paths(text),
            vec![
                "app/models/project.py",
                "app/services/projects.py",
                "frontend/src/App.tsx",
            ]
        );
    }

    #[test]
    fn idioms_only_count_inside_python_fences() {
        let text = "Use `mapped_column(` everywhere.\n\
                    ```python\nid = Column(Integer, primary_key=True)\n```\n\
                    ```ts\nconst x = mapped_column(1)\n```\n";
        let idioms = detect_idioms(text);
        assert!(idioms.uses_legacy_idiom);
        assert!(!idioms.uses_modern_idiom);
        assert!(idioms.legacy_only());
    }

    #[test]
    fn mapped_column_is_not_legacy() {
        let idioms = detect_idioms("```py\nname: Mapped[str] = mapped_column(String)\n```");
        assert!(idioms.uses_modern_idiom);
        assert!(!idioms.uses_legacy_idiom);
    }

    #[test]
    fn uuid_only_is_document_wide() {
        assert!(detect_idioms("Primary keys are UUIDs.").mentions_uuid_only);
        let both = detect_idioms("UUID in the API, ULID in storage.");
        assert!(both.mentions_ulid);
        assert!(!both.mentions_uuid_only);
    }
}
