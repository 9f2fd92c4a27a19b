//! Run configuration.
//!
//! Resolved as: built-in defaults, then `specgate.toml` (or `--config`),
//! then the `SPECGATE_CONTEXT_TOKENS` override for the token budget.

use crate::core::error::SpecgateError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "specgate.toml";
pub const TOKEN_BUDGET_ENV: &str = "SPECGATE_CONTEXT_TOKENS";
pub const DEFAULT_TOKEN_BUDGET: usize = 8000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    /// Directories holding mapped model classes.
    pub model_dirs: Vec<String>,
    /// Directories holding mixins and declarative bases.
    pub mixin_dirs: Vec<String>,
    /// Migration script directories, scanned in this order.
    pub migration_dirs: Vec<String>,
    /// Alternate roots under which spec-declared paths may live.
    pub path_roots: Vec<String>,
    /// Directories summarized in the context document, in priority order.
    pub context_dirs: Vec<String>,
    pub context_token_budget: usize,
    pub tree_depth: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            model_dirs: vec![
                "app/models".to_string(),
                "backend/app/models".to_string(),
                "src/models".to_string(),
            ],
            mixin_dirs: vec![
                "app/db".to_string(),
                "app/core".to_string(),
                "backend/app/db".to_string(),
                "backend/app/core".to_string(),
            ],
            migration_dirs: vec![
                "alembic/versions".to_string(),
                "migrations/versions".to_string(),
                "backend/alembic/versions".to_string(),
            ],
            path_roots: vec!["backend".to_string(), "frontend".to_string()],
            context_dirs: vec![
                "app/models".to_string(),
                "app/schemas".to_string(),
                "app/services".to_string(),
                "app/api".to_string(),
                "app/core".to_string(),
                "backend/app/models".to_string(),
                "backend/app/schemas".to_string(),
                "backend/app/services".to_string(),
                "backend/app/api".to_string(),
            ],
            context_token_budget: DEFAULT_TOKEN_BUDGET,
            tree_depth: 3,
        }
    }
}

impl GateConfig {
    /// Load configuration for a project. An explicit path must exist; the
    /// implicit `<project_root>/specgate.toml` is optional.
    pub fn load(project_root: &Path, explicit: Option<&Path>) -> Result<Self, SpecgateError> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => {
                let implicit = project_root.join(CONFIG_FILE_NAME);
                implicit.is_file().then_some(implicit)
            }
        };

        let mut config = match path {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };

        let env_value = std::env::var(TOKEN_BUDGET_ENV).ok();
        config.context_token_budget =
            token_budget_override(env_value.as_deref(), config.context_token_budget);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, SpecgateError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            SpecgateError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
            .map_err(|e| SpecgateError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Model and mixin directories joined onto the project root, models first.
    pub fn source_dirs(&self, project_root: &Path) -> Vec<PathBuf> {
        self.model_dirs
            .iter()
            .chain(self.mixin_dirs.iter())
            .map(|d| project_root.join(d))
            .collect()
    }

    pub fn migration_paths(&self, project_root: &Path) -> Vec<PathBuf> {
        self.migration_dirs
            .iter()
            .map(|d| project_root.join(d))
            .collect()
    }
}

/// Apply the env override: a positive integer wins, anything else keeps
/// `fallback`.
pub fn token_budget_override(raw: Option<&str>, fallback: usize) -> usize {
    raw.and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(fallback)
}
