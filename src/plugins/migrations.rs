//! Migration Ledger Extractor.
//!
//! Scans Alembic-style scripts for `op.create_table(...)` and folds them
//! into one table → column-set map. Files are applied in lexicographic
//! order, so the ledger is the history's end state (assuming the scripts are
//! monotonic, which is not checked).
//!
//! Modelled operations: `create_table`, `drop_table`, `add_column` and
//! `drop_column`, either with the table as first argument or inside a
//! `with op.batch_alter_table("t") as batch_op:` block. Operations inside
//! `downgrade` functions are ignored, otherwise every script would undo
//! itself.

use crate::core::error::SourceParseError;
use crate::core::model::{MigrationMap, MigrationTable};
use crate::core::python::{self, COLUMN_CONSTRUCTORS, ParsedModule};
use crate::core::walk;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tree_sitter::Node;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOp {
    CreateTable { table: String, columns: Vec<String> },
    AddColumn { table: String, column: String },
    DropColumn { table: String, column: String },
    DropTable { table: String },
}

#[derive(Debug, Default, Clone)]
pub struct MigrationLedger {
    pub tables: MigrationMap,
    pub skipped_files: Vec<String>,
}

pub fn extract_migrations(project_root: &Path, dirs: &[PathBuf]) -> MigrationLedger {
    let mut ledger = MigrationLedger::default();
    for dir in dirs {
        let files = walk::collect_files(dir, &["py"]);
        if !files.is_empty() {
            log::debug!("migration scan: {} files in {}", files.len(), dir.display());
        }
        for file in files {
            let rel = walk::display_relative(project_root, &file);
            match ops_in_file(&file) {
                Ok(ops) => ledger.apply(&ops, &rel),
                Err(e) => {
                    log::debug!("skipping {}: {}", rel, e);
                    ledger.skipped_files.push(rel);
                }
            }
        }
    }
    ledger
}

pub fn ops_in_file(path: &Path) -> Result<Vec<LedgerOp>, SourceParseError> {
    let module = python::parse_file(path)?;
    Ok(ops_in_module(&module))
}

/// Upgrade-side schema operations in source order. Calls whose table name
/// is not a string literal are ignored.
pub fn ops_in_module(module: &ParsedModule) -> Vec<LedgerOp> {
    let src = module.source.as_str();
    let mut ops = Vec::new();

    for call in python::calls_in(module.root()) {
        // Only namespaced calls: `op.create_table`, not a local helper.
        let Some(namespace) = python::callee_namespace(call, src) else {
            continue;
        };
        let Some(name) = python::callee_name(call, src) else {
            continue;
        };
        if enclosing_function(call, src).is_some_and(|f| f.starts_with("downgrade")) {
            continue;
        }
        let args = python::call_args(call, src);
        let (table, rest) = match batch_table(call, namespace, src) {
            Some(table) => (table, &args.positional[..]),
            None => {
                let Some(table) = args
                    .positional
                    .first()
                    .and_then(|n| python::string_value(*n, src))
                else {
                    continue;
                };
                (table, &args.positional[1..])
            }
        };

        match name {
            "create_table" => {
                let columns = rest
                    .iter()
                    .filter(|a| python::is_call_to(**a, src, COLUMN_CONSTRUCTORS))
                    .filter_map(|a| python::leading_string_arg(*a, src))
                    .collect();
                ops.push(LedgerOp::CreateTable { table, columns });
            }
            "add_column" => {
                let column = rest
                    .first()
                    .filter(|a| python::is_call_to(**a, src, COLUMN_CONSTRUCTORS))
                    .and_then(|a| python::leading_string_arg(*a, src));
                if let Some(column) = column {
                    ops.push(LedgerOp::AddColumn { table, column });
                }
            }
            "drop_column" => {
                if let Some(column) = rest.first().and_then(|a| python::string_value(*a, src)) {
                    ops.push(LedgerOp::DropColumn { table, column });
                }
            }
            "drop_table" => ops.push(LedgerOp::DropTable { table }),
            _ => {}
        }
    }
    ops
}

fn enclosing_function<'s>(node: Node<'_>, src: &'s str) -> Option<&'s str> {
    let mut current = node.parent();
    while let Some(n) = current {
        if n.kind() == "function_definition" {
            return n
                .child_by_field_name("name")
                .map(|name| python::node_text(name, src));
        }
        current = n.parent();
    }
    None
}

/// Table bound to `alias` by an enclosing
/// `with op.batch_alter_table("t") as alias:` block.
fn batch_table(node: Node<'_>, alias: &str, src: &str) -> Option<String> {
    let mut current = node.parent();
    while let Some(n) = current {
        if n.kind() == "with_statement" {
            let items = python::named_children(n)
                .into_iter()
                .filter(|c| c.kind() == "with_clause")
                .flat_map(python::named_children);
            for item in items {
                let Some(pattern) = python::named_children(item)
                    .into_iter()
                    .find(|c| c.kind() == "as_pattern")
                else {
                    continue;
                };
                let bound = pattern
                    .child_by_field_name("alias")
                    .map(|a| python::node_text(a, src).trim());
                if bound != Some(alias) {
                    continue;
                }
                let target = python::named_children(pattern).into_iter().next()?;
                if python::is_call_to(target, src, &["batch_alter_table"]) {
                    return python::leading_string_arg(target, src);
                }
            }
        }
        if n.kind() == "function_definition" {
            return None;
        }
        current = n.parent();
    }
    None
}

impl MigrationLedger {
    pub fn apply(&mut self, ops: &[LedgerOp], source_file: &str) {
        for op in ops {
            match op {
                LedgerOp::CreateTable { table, columns } => {
                    self.tables.insert(
                        table.clone(),
                        MigrationTable {
                            name: table.clone(),
                            column_names: columns.iter().cloned().collect(),
                            source_file: source_file.to_string(),
                        },
                    );
                }
                LedgerOp::AddColumn { table, column } => {
                    self.tables
                        .entry(table.clone())
                        .or_insert_with(|| MigrationTable {
                            name: table.clone(),
                            column_names: BTreeSet::new(),
                            source_file: source_file.to_string(),
                        })
                        .column_names
                        .insert(column.clone());
                }
                LedgerOp::DropColumn { table, column } => {
                    if let Some(entry) = self.tables.get_mut(table) {
                        entry.column_names.remove(column);
                    }
                }
                LedgerOp::DropTable { table } => {
                    self.tables.remove(table);
                }
            }
        }
    }
}
