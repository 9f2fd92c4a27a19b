//! Extracted-model and report types shared by the extractors, verifiers and
//! the grounding reporter.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

/// One column-like member of a source type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Column {
    pub attribute_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_key_target: Option<String>,
    /// Persisted column name when it differs from the attribute name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_name_override: Option<String>,
}

impl Column {
    pub fn new(attribute_name: impl Into<String>) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            declared_type_name: None,
            foreign_key_target: None,
            db_name_override: None,
        }
    }

    /// Name the column has in the database.
    pub fn persisted_name(&self) -> &str {
        self.db_name_override
            .as_deref()
            .unwrap_or(&self.attribute_name)
    }

    /// True if `name` is either the attribute or the persisted name.
    pub fn answers_to(&self, name: &str) -> bool {
        self.attribute_name == name || self.db_name_override.as_deref() == Some(name)
    }
}

/// A class definition as it appears in one source file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceType {
    pub name: String,
    pub base_type_names: Vec<String>,
    pub own_columns: BTreeMap<String, Column>,
    pub declared_table_name: Option<String>,
    pub source_file: String,
}

/// A mapped type flattened over its inheritance chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedTable {
    pub table_name: String,
    pub type_name: String,
    pub source_file: String,
    pub columns: BTreeMap<String, Column>,
}

impl ResolvedTable {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.values().any(|c| c.answers_to(name))
    }

    pub fn attribute_names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    /// `(attribute, target)` for every column carrying a foreign key.
    pub fn foreign_keys(&self) -> Vec<(&str, &str)> {
        self.columns
            .values()
            .filter_map(|c| {
                c.foreign_key_target
                    .as_deref()
                    .map(|t| (c.attribute_name.as_str(), t))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MigrationTable {
    pub name: String,
    pub column_names: BTreeSet<String>,
    pub source_file: String,
}

pub type ModelMap = BTreeMap<String, ResolvedTable>;
pub type MigrationMap = BTreeMap<String, MigrationTable>;

/// Atomic verifier outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckResult {
    pub check: String,
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn pass(check: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            passed: true,
            detail: detail.into(),
        }
    }

    pub fn fail(check: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            passed: false,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    ColumnsToAdd,
    UndocumentedColumns,
    AssociationTable,
    NewTable,
    ConventionMismatch,
    IdConventionMismatch,
    MissingPath,
}

/// Atomic grounding outcome. Advisory only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Warning {
    pub fn new(kind: WarningKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            table: None,
            columns: Vec::new(),
            path: None,
        }
    }

    pub fn with_table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }
}

/// `sha256:<hex>` over the canonical JSON of the resolved model map. Two runs
/// over an unchanged tree produce the same digest.
pub fn model_digest(models: &ModelMap) -> String {
    let canonical = serde_json::to_vec(models).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    format!("sha256:{:x}", hasher.finalize())
}
