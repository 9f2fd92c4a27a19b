//! Spec grounding.
//!
//! Compares what a Markdown spec claims against the extracted models,
//! migrations and codebase conventions. Every finding is a `Warning`; none
//! of them affects the exit code.

use crate::core::config::GateConfig;
use crate::core::model::{MigrationMap, ModelMap, Severity, Warning, WarningKind};
use crate::core::output;
use crate::plugins::context::{ContextBuilder, ContextStats};
use crate::plugins::conventions::{self, CodebaseConventions, ColumnIdiom, IdType};
use crate::plugins::spec::SpecDocument;
use crate::plugins::{migrations, models};
use serde::Serialize;
use std::path::Path;

/// Columns every mapped table inherits; never reported as undocumented.
pub const BASELINE_COLUMNS: &[&str] = &["id", "created_at", "updated_at"];

const MAX_LISTED: usize = 20;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct GroundStats {
    pub spec_tables: usize,
    pub spec_paths: usize,
    pub model_tables: usize,
    pub migration_tables: usize,
    pub info: usize,
    pub warn: usize,
    pub error: usize,
    pub skipped_files: Vec<String>,
    pub context: ContextStats,
}

#[derive(Debug, Serialize)]
pub struct GroundReport {
    pub warnings: Vec<Warning>,
    pub codebase_context: String,
    pub stats: GroundStats,
}

pub fn run_ground(spec: &SpecDocument, project_root: &Path, config: &GateConfig) -> GroundReport {
    let source_dirs = config.source_dirs(project_root);
    let index = models::extract_models(project_root, &source_dirs);
    let ledger = migrations::extract_migrations(project_root, &config.migration_paths(project_root));
    let model_map = index.resolve_tables();
    let conventions = conventions::detect_conventions(&source_dirs);
    log::debug!(
        "ground: {} spec tables, {} spec paths, dominant idiom {:?}, id type {}",
        spec.tables.len(),
        spec.paths.len(),
        conventions.dominant_idiom,
        conventions.id_type.as_str()
    );

    let warnings = ground_spec(
        spec,
        &model_map,
        &ledger.tables,
        &conventions,
        project_root,
        &config.path_roots,
    );
    let context = ContextBuilder::new(project_root, config).build(&model_map, &ledger.tables, &conventions);

    let mut skipped_files = index.skipped_files;
    skipped_files.extend(ledger.skipped_files);
    let count = |s: Severity| warnings.iter().filter(|w| w.severity == s).count();
    let stats = GroundStats {
        spec_tables: spec.tables.len(),
        spec_paths: spec.paths.len(),
        model_tables: model_map.len(),
        migration_tables: ledger.tables.len(),
        info: count(Severity::Info),
        warn: count(Severity::Warn),
        error: count(Severity::Error),
        skipped_files,
        context: context.stats,
    };

    GroundReport {
        warnings,
        codebase_context: context.text,
        stats,
    }
}

pub fn ground_spec(
    spec: &SpecDocument,
    models: &ModelMap,
    migrations: &MigrationMap,
    conventions: &CodebaseConventions,
    project_root: &Path,
    path_roots: &[String],
) -> Vec<Warning> {
    let mut warnings = Vec::new();

    for table in &spec.tables {
        let name = table.name.as_str();
        if let Some(resolved) = models.get(name) {
            let to_add: Vec<String> = table
                .column_names()
                .filter(|c| !resolved.has_column(c))
                .map(str::to_string)
                .collect();
            if !to_add.is_empty() {
                warnings.push(
                    Warning::new(
                        WarningKind::ColumnsToAdd,
                        Severity::Info,
                        format!(
                            "Table '{}' exists ({}); spec adds columns {}",
                            name,
                            resolved.source_file,
                            output::name_list(&to_add, MAX_LISTED)
                        ),
                    )
                    .with_table(name)
                    .with_columns(to_add),
                );
            }

            let undocumented: Vec<String> = resolved
                .columns
                .values()
                .filter(|c| !BASELINE_COLUMNS.contains(&c.attribute_name.as_str()))
                .filter(|c| !table.column_names().any(|s| c.answers_to(s)))
                .map(|c| c.attribute_name.clone())
                .collect();
            if !undocumented.is_empty() {
                warnings.push(
                    Warning::new(
                        WarningKind::UndocumentedColumns,
                        Severity::Info,
                        format!(
                            "Table '{}' has columns the spec does not mention: {}",
                            name,
                            output::name_list(&undocumented, MAX_LISTED)
                        ),
                    )
                    .with_table(name)
                    .with_columns(undocumented),
                );
            }
        } else if let Some(m) = migrations.get(name) {
            warnings.push(
                Warning::new(
                    WarningKind::AssociationTable,
                    Severity::Info,
                    format!(
                        "Table '{}' exists only in migrations ({}); treat it as an association table",
                        name, m.source_file
                    ),
                )
                .with_table(name),
            );
        } else {
            warnings.push(
                Warning::new(
                    WarningKind::NewTable,
                    Severity::Info,
                    format!("Table '{}' does not exist yet; it will be created", name),
                )
                .with_table(name),
            );
        }
    }

    if spec.idioms.legacy_only() && conventions.dominant_idiom == Some(ColumnIdiom::Modern) {
        warnings.push(Warning::new(
            WarningKind::ConventionMismatch,
            Severity::Error,
            format!(
                "Spec code uses Column( but the codebase uses mapped_column( ({} vs {} occurrences)",
                conventions.modern_column_count, conventions.legacy_column_count
            ),
        ));
    }

    if spec.idioms.mentions_uuid_only && conventions.id_type == IdType::Ulid {
        warnings.push(Warning::new(
            WarningKind::IdConventionMismatch,
            Severity::Error,
            format!(
                "Spec uses UUID identifiers but the codebase uses ULID ({})",
                conventions.id_mixins.join(", ")
            ),
        ));
    }

    for path in &spec.paths {
        if !path_exists(project_root, path_roots, path) {
            warnings.push(
                Warning::new(
                    WarningKind::MissingPath,
                    Severity::Warn,
                    format!(
                        "Path '{}' not found under the project root or {}",
                        path,
                        path_roots
                            .iter()
                            .map(|r| format!("{}/", r))
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                )
                .with_path(path),
            );
        }
    }

    warnings
}

fn path_exists(project_root: &Path, path_roots: &[String], path: &str) -> bool {
    project_root.join(path).exists()
        || path_roots
            .iter()
            .any(|root| project_root.join(root).join(path).exists())
}
