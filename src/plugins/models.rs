//! Source Model Extractor.
//!
//! Builds a symbol table of every top-level class in the model and mixin
//! directories, then flattens each mapped class (one carrying
//! `__tablename__`) over its base classes.

use crate::core::error::SourceParseError;
use crate::core::model::{Column, ModelMap, ResolvedTable, SourceType};
use crate::core::python::{
    self, COLUMN_CONSTRUCTORS, FOREIGN_KEY_CONSTRUCTOR, ParsedModule, named_children,
};
use crate::core::walk;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tree_sitter::Node;

pub const TABLE_NAME_MARKER: &str = "__tablename__";

/// All classes found in one extraction run, keyed by class name.
#[derive(Debug, Default, Clone)]
pub struct ModelIndex {
    pub types: FxHashMap<String, SourceType>,
    /// Relative paths of files that were unreadable or unparsable.
    pub skipped_files: Vec<String>,
}

/// Parse every Python file under `dirs`. Never fails: a bad file is recorded
/// in `skipped_files` and contributes nothing.
pub fn extract_models(project_root: &Path, dirs: &[PathBuf]) -> ModelIndex {
    let mut index = ModelIndex::default();
    let files = walk::collect_across(dirs, &["py"]);
    log::debug!("model scan: {} python files", files.len());

    for file in files {
        let rel = walk::display_relative(project_root, &file);
        match extract_file(&file, &rel) {
            Ok(types) => {
                for ty in types {
                    index.types.insert(ty.name.clone(), ty);
                }
            }
            Err(e) => {
                log::debug!("skipping {}: {}", rel, e);
                index.skipped_files.push(rel);
            }
        }
    }
    index
}

pub fn extract_file(path: &Path, rel: &str) -> Result<Vec<SourceType>, SourceParseError> {
    let module = python::parse_file(path)?;
    Ok(types_in_module(&module, rel))
}

/// Top-level classes of a parsed module, including decorated ones.
pub fn types_in_module(module: &ParsedModule, rel: &str) -> Vec<SourceType> {
    let mut out = Vec::new();
    for stmt in named_children(module.root()) {
        let class = match stmt.kind() {
            "class_definition" => stmt,
            "decorated_definition" => match stmt.child_by_field_name("definition") {
                Some(def) if def.kind() == "class_definition" => def,
                _ => continue,
            },
            _ => continue,
        };
        if let Some(ty) = source_type(class, module, rel) {
            out.push(ty);
        }
    }
    out
}

fn source_type(class: Node<'_>, module: &ParsedModule, rel: &str) -> Option<SourceType> {
    let src = module.source.as_str();
    let name = module.text(class.child_by_field_name("name")?).to_string();

    let base_type_names = class
        .child_by_field_name("superclasses")
        .map(|list| {
            named_children(list)
                .into_iter()
                .filter(|b| b.kind() != "keyword_argument")
                .filter_map(|b| python::expr_name(b, src))
                .collect()
        })
        .unwrap_or_default();

    let mut ty = SourceType {
        name,
        base_type_names,
        own_columns: BTreeMap::new(),
        declared_table_name: None,
        source_file: rel.to_string(),
    };

    let Some(body) = class.child_by_field_name("body") else {
        return Some(ty);
    };
    for stmt in named_children(body) {
        let Some((left, right, annotation)) = python::as_assignment(stmt) else {
            continue;
        };
        if left.kind() != "identifier" {
            continue;
        }
        let attr = module.text(left);
        let Some(right) = right else {
            continue;
        };

        if attr == TABLE_NAME_MARKER {
            if let Some(table) = python::string_value(right, src) {
                ty.declared_table_name = Some(table);
            }
            continue;
        }

        if python::is_call_to(right, src, COLUMN_CONSTRUCTORS) {
            let column = column_from_call(attr, right, annotation, src);
            ty.own_columns.insert(column.attribute_name.clone(), column);
        }
    }
    Some(ty)
}

fn column_from_call(
    attr: &str,
    call: Node<'_>,
    annotation: Option<Node<'_>>,
    src: &str,
) -> Column {
    let mut column = Column::new(attr);
    let args = python::call_args(call, src);

    for (i, arg) in args.positional.iter().enumerate() {
        if i == 0 {
            if let Some(name) = python::string_value(*arg, src) {
                column.db_name_override = Some(name);
                continue;
            }
        }
        if python::is_call_to(*arg, src, &[FOREIGN_KEY_CONSTRUCTOR]) {
            if column.foreign_key_target.is_none() {
                column.foreign_key_target = python::leading_string_arg(*arg, src);
            }
            continue;
        }
        if column.declared_type_name.is_none() {
            column.declared_type_name = python::expr_name(*arg, src);
        }
    }

    for (_, value) in &args.keywords {
        if column.foreign_key_target.is_none()
            && python::is_call_to(*value, src, &[FOREIGN_KEY_CONSTRUCTOR])
        {
            column.foreign_key_target = python::leading_string_arg(*value, src);
        }
    }

    if column.declared_type_name.is_none() {
        column.declared_type_name =
            annotation.and_then(|a| python::mapped_annotation_type(a, src));
    }
    column
}

impl ModelIndex {
    /// Columns of `type_name` merged over its bases. A type already in
    /// `visited` contributes nothing, which both breaks cycles and keeps a
    /// diamond's shared base from re-applying its columns over an override.
    pub fn resolve_columns(
        &self,
        type_name: &str,
        visited: &mut FxHashSet<String>,
    ) -> BTreeMap<String, Column> {
        if !visited.insert(type_name.to_string()) {
            return BTreeMap::new();
        }
        let Some(ty) = self.types.get(type_name) else {
            return BTreeMap::new();
        };

        let mut merged = BTreeMap::new();
        for base in &ty.base_type_names {
            merged.extend(self.resolve_columns(base, visited));
        }
        merged.extend(ty.own_columns.clone());
        merged
    }

    /// One `ResolvedTable` per mapped class, keyed by table name. When two
    /// classes declare the same table the one whose name sorts last wins.
    pub fn resolve_tables(&self) -> ModelMap {
        let mut names: Vec<&String> = self.types.keys().collect();
        names.sort();

        let mut out = ModelMap::new();
        for name in names {
            let ty = &self.types[name];
            let Some(table) = ty.declared_table_name.as_ref() else {
                continue;
            };
            let mut visited = FxHashSet::default();
            let columns = self.resolve_columns(name, &mut visited);
            out.insert(
                table.clone(),
                ResolvedTable {
                    table_name: table.clone(),
                    type_name: ty.name.clone(),
                    source_file: ty.source_file.clone(),
                    columns,
                },
            );
        }
        out
    }

    /// Class names present anywhere in the index.
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.keys().cloned().collect();
        names.sort();
        names
    }
}
