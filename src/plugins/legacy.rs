//! Legacy Existence Verifier.
//!
//! AST-free checks for contracts whose entities are plain files, functions,
//! or database declarations that cannot be verified automatically. Stricter
//! than the contract verifier about coverage: a contract that declares
//! nothing fails.

use crate::core::model::CheckResult;
use crate::plugins::contract::{Contract, Entity, EntityKind};
use crate::plugins::verify::VerifyReport;
use std::fs;
use std::path::{Path, PathBuf};

pub const COVERAGE_CHECK: &str = "Entity coverage";

pub fn run_legacy_verify(contract: &Contract, project_root: &Path) -> VerifyReport {
    VerifyReport::from_results(verify_existence(contract, project_root))
}

pub fn verify_existence(contract: &Contract, project_root: &Path) -> Vec<CheckResult> {
    if contract.entities.is_empty() {
        return vec![CheckResult::fail(
            COVERAGE_CHECK,
            "Contract declares no entities; every feature must declare verifiable artifacts",
        )];
    }
    contract
        .entities
        .iter()
        .map(|e| check_entity(e, project_root))
        .collect()
}

fn check_entity(entity: &Entity, project_root: &Path) -> CheckResult {
    let kind = entity.effective_kind();
    match kind {
        EntityKind::File => check_file(entity, project_root),
        EntityKind::Function => check_function(entity, project_root),
        EntityKind::Database => {
            if entity.path.is_some() {
                check_function(entity, project_root)
            } else {
                CheckResult::pass(
                    format!("Database: {}", entity.label()),
                    "Declared database entity; not verifiable by automated check",
                )
            }
        }
    }
}

fn is_placeholder(segment: &str) -> bool {
    (segment.contains('<') && segment.contains('>'))
        || (segment.contains('{') && segment.contains('}'))
        || (segment.contains('[') && segment.contains(']'))
}

/// Segments before the first placeholder segment, or `None` if the path has
/// no placeholder.
fn static_prefix(path: &str) -> Option<PathBuf> {
    let segments: Vec<&str> = path.split('/').collect();
    let first = segments.iter().position(|s| is_placeholder(s))?;
    Some(segments[..first].iter().filter(|s| !s.is_empty()).collect())
}

fn check_file(entity: &Entity, project_root: &Path) -> CheckResult {
    let path = entity.locator();
    let label = format!("File: {}", path);
    if path.is_empty() {
        return CheckResult::fail(label, "File entity declares no path");
    }

    if let Some(prefix) = static_prefix(path) {
        let parent = project_root.join(&prefix);
        let shown = prefix.to_string_lossy().replace('\\', "/");
        return if parent.is_dir() {
            CheckResult::pass(
                label,
                format!(
                    "Parameterized path '{}': parent directory '{}' exists",
                    path, shown
                ),
            )
        } else {
            CheckResult::fail(
                label,
                format!(
                    "Parameterized path '{}': parent directory '{}' does not exist",
                    path, shown
                ),
            )
        };
    }

    if project_root.join(path).exists() {
        CheckResult::pass(label, format!("'{}' exists", path))
    } else {
        CheckResult::fail(label, format!("'{}' does not exist", path))
    }
}

/// Split `file.py:symbol`; an explicit `function` field wins over the suffix.
fn function_target(entity: &Entity) -> (String, Option<String>) {
    let locator = entity.locator();
    let (file, suffix) = match locator.split_once(':') {
        Some((file, symbol)) if !symbol.is_empty() => (file, Some(symbol.to_string())),
        Some((file, _)) => (file, None),
        None => (locator, None),
    };
    let symbol = entity.function.clone().filter(|f| !f.is_empty()).or(suffix);
    (file.to_string(), symbol)
}

fn check_function(entity: &Entity, project_root: &Path) -> CheckResult {
    let (file, symbol) = function_target(entity);
    let label = match &symbol {
        Some(s) => format!("Function: {}:{}", file, s),
        None => format!("Function: {}", file),
    };
    if file.is_empty() {
        return CheckResult::fail(label, "Function entity declares no file");
    }

    let full = project_root.join(&file);
    if !full.is_file() {
        return CheckResult::fail(label, format!("File '{}' does not exist", file));
    }
    let Some(symbol) = symbol else {
        return CheckResult::pass(label, format!("File '{}' exists", file));
    };

    match fs::read_to_string(&full) {
        Ok(text) if text.contains(&symbol) => {
            CheckResult::pass(label, format!("'{}' found in '{}'", symbol, file))
        }
        Ok(_) => CheckResult::fail(label, format!("'{}' not found in '{}'", symbol, file)),
        Err(e) => CheckResult::fail(label, format!("Cannot read '{}': {}", file, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(raw: &str) -> Contract {
        Contract::from_json_str(raw).unwrap()
    }

    #[test]
    fn empty_entities_is_a_hard_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let report = run_legacy_verify(&contract(r#"{"entities": []}"#), tmp.path());
        assert!(!report.passed);
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].check, COVERAGE_CHECK);
    }

    #[test]
    fn parameterized_path_checks_static_prefix() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join(".speed/defects")).unwrap();
        let c = contract(r#"{"entities":[{"type":"file","path":".speed/defects/<name>/state.json"}]}"#);
        let report = run_legacy_verify(&c, tmp.path());
        assert!(report.passed, "{:?}", report.results);
        let detail = &report.results[0].detail;
        assert!(detail.contains("Parameterized path"));
        assert!(detail.contains("'.speed/defects'"));
    }

    #[test]
    fn placeholder_styles_are_recognized() {
        assert_eq!(static_prefix("a/{id}/b"), Some(PathBuf::from("a")));
        assert_eq!(static_prefix("a/b/[slug].tsx"), Some(PathBuf::from("a/b")));
        assert_eq!(static_prefix("<root>/x"), Some(PathBuf::new()));
        assert_eq!(static_prefix("a/b/c.py"), None);
    }

    #[test]
    fn missing_parameterized_parent_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let c = contract(r#"{"entities":[{"type":"file","path":"data/{id}/x.json"}]}"#);
        assert!(!run_legacy_verify(&c, tmp.path()).passed);
    }

    #[test]
    fn function_symbol_is_a_substring_check() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("app/services")).unwrap();
        fs::write(
            tmp.path().join("app/services/auth.py"),
            "def login(user):\n    return True\n",
        )
        .unwrap();
        let c = contract(
            r#"{"entities":[
                {"path":"app/services/auth.py:login"},
                {"type":"function","path":"app/services/auth.py","function":"logout"},
                {"type":"function","path":"app/services/missing.py","function":"login"}]}"#,
        );
        let results = verify_existence(&c, tmp.path());
        assert!(results[0].passed);
        assert!(!results[1].passed);
        assert!(!results[2].passed);
    }

    #[test]
    fn database_entities_are_advisory_unless_pathed() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("schema.sql"), "CREATE TABLE users();").unwrap();
        let c = contract(
            r#"{"entities":[
                {"name":"users table","table":"users"},
                {"type":"database","path":"schema.sql","function":"CREATE TABLE users"},
                {"type":"database","path":"absent.sql"}]}"#,
        );
        let results = verify_existence(&c, tmp.path());
        assert!(results[0].passed);
        assert!(results[0].detail.contains("not verifiable by automated check"));
        assert!(results[1].passed);
        assert!(!results[2].passed);
    }

    #[test]
    fn bare_filename_is_treated_as_file() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("README.md"), "hi").unwrap();
        let c = contract(r#"{"entities":[{"path":"README.md"},{"path":"CHANGELOG.md"}]}"#);
        let results = verify_existence(&c, tmp.path());
        assert!(results[0].check.starts_with("File:"));
        assert!(results[0].passed);
        assert!(!results[1].passed);
    }
}
