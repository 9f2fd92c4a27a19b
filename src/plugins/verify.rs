//! Contract Verifier.
//!
//! Diffs a contract against the resolved model map and the migration ledger.
//! Every check becomes one `CheckResult`; the report passes only if all of
//! them do, and vacuously when the contract declares nothing checkable.

use crate::core::config::GateConfig;
use crate::core::error::SpecgateError;
use crate::core::model::{self, CheckResult, MigrationMap, ModelMap};
use crate::core::output;
use crate::plugins::contract::{Contract, Entity, Relationship, RelationshipKind};
use crate::plugins::{migrations, models};
use serde::Serialize;
use std::path::Path;

const MAX_LISTED: usize = 40;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct VerifySummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize)]
pub struct ExtractionStats {
    pub model_tables: usize,
    pub migration_tables: usize,
    pub skipped_files: Vec<String>,
    pub model_digest: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyReport {
    pub passed: bool,
    pub results: Vec<CheckResult>,
    pub summary: VerifySummary,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub extraction: Option<ExtractionStats>,
}

impl VerifyReport {
    pub fn from_results(results: Vec<CheckResult>) -> Self {
        let passed_count = results.iter().filter(|r| r.passed).count();
        let summary = VerifySummary {
            total: results.len(),
            passed: passed_count,
            failed: results.len() - passed_count,
        };
        Self {
            passed: summary.failed == 0,
            results,
            summary,
            extraction: None,
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.passed { 0 } else { 1 }
    }
}

/// Extract models and migrations under `project_root`, then check `contract`.
pub fn run_verify(
    contract: &Contract,
    project_root: &Path,
    config: &GateConfig,
) -> Result<VerifyReport, SpecgateError> {
    let index = models::extract_models(project_root, &config.source_dirs(project_root));
    let ledger = migrations::extract_migrations(project_root, &config.migration_paths(project_root));
    let model_map = index.resolve_tables();
    log::debug!(
        "verify: {} model tables, {} migration tables",
        model_map.len(),
        ledger.tables.len()
    );

    let mut skipped_files = index.skipped_files;
    skipped_files.extend(ledger.skipped_files);

    let mut report = VerifyReport::from_results(verify_contract(contract, &model_map, &ledger.tables));
    report.extraction = Some(ExtractionStats {
        model_tables: model_map.len(),
        migration_tables: ledger.tables.len(),
        skipped_files,
        model_digest: model::model_digest(&model_map),
    });
    Ok(report)
}

pub fn verify_contract(
    contract: &Contract,
    models: &ModelMap,
    migrations: &MigrationMap,
) -> Vec<CheckResult> {
    let mut results = Vec::new();
    for entity in &contract.entities {
        check_entity(entity, models, migrations, &mut results);
    }
    for rel in &contract.relationships {
        results.push(check_relationship(rel, models, migrations));
    }
    results
}

fn known_tables(models: &ModelMap, migrations: &MigrationMap) -> Vec<String> {
    let mut names: Vec<String> = models.keys().chain(migrations.keys()).cloned().collect();
    names.sort();
    names.dedup();
    names
}

fn check_entity(
    entity: &Entity,
    models: &ModelMap,
    migrations: &MigrationMap,
    results: &mut Vec<CheckResult>,
) {
    let Some(table) = entity.table.as_deref() else {
        return;
    };

    let label = format!("Table exists: {}", table);
    if models.contains_key(table) {
        results.push(CheckResult::pass(
            label,
            format!("Mapped by {}", models[table].type_name),
        ));
    } else if let Some(m) = migrations.get(table) {
        results.push(CheckResult::pass(
            label,
            format!("Created in migration {}", m.source_file),
        ));
    } else {
        results.push(CheckResult::fail(
            label,
            format!(
                "Table '{}' not found in models or migrations. Known tables: {}",
                table,
                output::name_list(&known_tables(models, migrations), MAX_LISTED)
            ),
        ));
        return;
    }

    let Some(resolved) = models.get(table) else {
        return;
    };
    for field in &entity.key_fields {
        let label = format!("Key field: {}.{}", table, field);
        match resolved.columns.values().find(|c| c.answers_to(field)) {
            Some(col) if col.attribute_name == *field => {
                results.push(CheckResult::pass(label, format!("Column '{}' present", field)));
            }
            Some(col) => results.push(CheckResult::pass(
                label,
                format!(
                    "Column '{}' present as attribute '{}'",
                    field, col.attribute_name
                ),
            )),
            None => results.push(CheckResult::fail(
                label,
                format!(
                    "Column '{}' not found on table '{}'. Known columns: {}",
                    field,
                    table,
                    output::name_list(&resolved.attribute_names(), MAX_LISTED)
                ),
            )),
        }
    }
}

fn check_relationship(
    rel: &Relationship,
    models: &ModelMap,
    migrations: &MigrationMap,
) -> CheckResult {
    let via = rel.via.as_deref().unwrap_or("");
    let label = format!(
        "Relationship: {} -> {} ({} via {})",
        rel.from_table,
        rel.to_table,
        rel.kind.as_str(),
        if via.is_empty() { "-" } else { via }
    );

    if rel.kind == RelationshipKind::ManyToMany {
        if via.is_empty() {
            return CheckResult::fail(label, "many_to_many relationship declares no 'via' table");
        }
        if models.contains_key(via) || migrations.contains_key(via) {
            return CheckResult::pass(label, format!("Association table '{}' exists", via));
        }
        return CheckResult::fail(
            label,
            format!(
                "Association table '{}' not found. Known tables: {}",
                via,
                output::name_list(&known_tables(models, migrations), MAX_LISTED)
            ),
        );
    }

    let Some(source) = models.get(&rel.from_table) else {
        return CheckResult::fail(
            label,
            format!(
                "Source table '{}' has no mapped model; cannot verify relationship",
                rel.from_table
            ),
        );
    };

    if !via.is_empty() && source.has_column(via) {
        return CheckResult::pass(
            label,
            format!("Column '{}' exists on '{}'", via, rel.from_table),
        );
    }

    let fk = source.columns.values().find(|c| {
        c.foreign_key_target
            .as_deref()
            .is_some_and(|t| t.contains(rel.to_table.as_str()))
    });
    match fk {
        Some(col) => CheckResult::pass(
            label,
            format!(
                "Column '{}' references '{}'",
                col.attribute_name,
                col.foreign_key_target.as_deref().unwrap_or_default()
            ),
        ),
        None => CheckResult::fail(
            label,
            format!(
                "No column '{}' and no foreign key to '{}' on '{}'. Known columns: {}",
                via,
                rel.to_table,
                rel.from_table,
                output::name_list(&source.attribute_names(), MAX_LISTED)
            ),
        ),
    }
}
