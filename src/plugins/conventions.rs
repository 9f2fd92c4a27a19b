//! Codebase convention detection over the model and mixin directories.
//!
//! Every file in those directories is counted, not only Python sources.

use crate::core::walk;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub(crate) static LEGACY_COLUMN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bColumn\(").unwrap());
pub(crate) static MODERN_COLUMN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bmapped_column\(").unwrap());

pub const ULID_MIXINS: &[&str] = &["ULIDMixin", "UlidMixin", "ULIDPrimaryKeyMixin"];
pub const UUID_MIXINS: &[&str] = &["UUIDMixin", "UuidMixin", "UUIDPrimaryKeyMixin"];
pub const GENERIC_ID_MIXINS: &[&str] = &["IDMixin"];
pub const TIMESTAMP_MIXINS: &[&str] = &["TimestampMixin", "TimestampsMixin", "AuditMixin"];

static MIXIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    let names: Vec<&str> = ULID_MIXINS
        .iter()
        .chain(UUID_MIXINS)
        .chain(GENERIC_ID_MIXINS)
        .chain(TIMESTAMP_MIXINS)
        .copied()
        .collect();
    Regex::new(&format!(r"\b({})\b", names.join("|"))).unwrap()
});

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ColumnIdiom {
    Legacy,
    Modern,
}

impl ColumnIdiom {
    pub fn constructor(self) -> &'static str {
        match self {
            Self::Legacy => "Column(",
            Self::Modern => "mapped_column(",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdType {
    Ulid,
    Uuid,
    #[default]
    Unknown,
}

impl IdType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ulid => "ulid",
            Self::Uuid => "uuid",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CodebaseConventions {
    pub legacy_column_count: usize,
    pub modern_column_count: usize,
    pub dominant_idiom: Option<ColumnIdiom>,
    pub id_mixins: Vec<String>,
    pub timestamp_mixins: Vec<String>,
    pub id_type: IdType,
}

pub fn detect_conventions(dirs: &[PathBuf]) -> CodebaseConventions {
    let files = walk::collect_across(dirs, &[]);
    let sources: Vec<String> = files.iter().filter_map(|f| read_source(f)).collect();
    detect_in_sources(sources.iter().map(String::as_str))
}

fn read_source(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) => {
            log::debug!("conventions: skipping {}: {}", path.display(), e);
            None
        }
    }
}

pub fn detect_in_sources<'a>(sources: impl IntoIterator<Item = &'a str>) -> CodebaseConventions {
    let mut conv = CodebaseConventions::default();
    let mut seen: Vec<&'a str> = Vec::new();

    for text in sources {
        conv.legacy_column_count += LEGACY_COLUMN_RE.find_iter(text).count();
        conv.modern_column_count += MODERN_COLUMN_RE.find_iter(text).count();
        for m in MIXIN_RE.find_iter(text) {
            if !seen.contains(&m.as_str()) {
                seen.push(m.as_str());
            }
        }
    }

    conv.dominant_idiom = match conv.legacy_column_count.cmp(&conv.modern_column_count) {
        std::cmp::Ordering::Greater => Some(ColumnIdiom::Legacy),
        std::cmp::Ordering::Less => Some(ColumnIdiom::Modern),
        std::cmp::Ordering::Equal => None,
    };

    let present = |list: &[&str]| -> Vec<String> {
        list.iter()
            .filter(|k| seen.contains(*k))
            .map(|k| k.to_string())
            .collect()
    };
    conv.id_mixins = [ULID_MIXINS, UUID_MIXINS, GENERIC_ID_MIXINS]
        .iter()
        .flat_map(|l| present(*l))
        .collect();
    conv.timestamp_mixins = present(TIMESTAMP_MIXINS);

    conv.id_type = if ULID_MIXINS.iter().any(|k| seen.contains(k)) {
        IdType::Ulid
    } else if UUID_MIXINS.iter().any(|k| seen.contains(k)) {
        IdType::Uuid
    } else {
        IdType::Unknown
    };
    conv
}
