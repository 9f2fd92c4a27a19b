//! Context document for downstream planning.
//!
//! Sections are emitted in a fixed order. The first four are always
//! present; the structural extracts that follow are admitted file by file
//! while the token budget lasts, first come first served. A file that does
//! not fit degrades to a one-line mention, and a smaller file after it may
//! still be admitted.

use crate::core::config::GateConfig;
use crate::core::model::{MigrationMap, ModelMap};
use crate::core::repomap::{self, RepoMap};
use crate::core::walk;
use crate::plugins::conventions::CodebaseConventions;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub const STRUCTURE_EXTENSIONS: &[&str] = &["py", "ts", "tsx"];

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ContextStats {
    pub budget_tokens: usize,
    pub used_tokens: usize,
    pub included_files: usize,
    pub omitted_files: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BuiltContext {
    pub text: String,
    pub stats: ContextStats,
}

pub struct ContextBuilder<'a> {
    project_root: &'a Path,
    config: &'a GateConfig,
}

/// Approximate token count used for budgeting.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

/// Lines that describe a file's shape: classes, functions, decorators,
/// table names and TypeScript exports.
pub fn structural_lines(source: &str) -> Vec<&str> {
    source
        .lines()
        .filter(|line| {
            let t = line.trim_start();
            t.starts_with("class ")
                || t.starts_with("def ")
                || t.starts_with("async def ")
                || t.starts_with('@')
                || t.starts_with("__tablename__")
                || t.starts_with("export ")
        })
        .map(str::trim_end)
        .collect()
}

impl<'a> ContextBuilder<'a> {
    pub fn new(project_root: &'a Path, config: &'a GateConfig) -> Self {
        Self {
            project_root,
            config,
        }
    }

    pub fn build(
        &self,
        models: &ModelMap,
        migrations: &MigrationMap,
        conventions: &CodebaseConventions,
    ) -> BuiltContext {
        let repo = repomap::generate_map(self.project_root, &self.config.path_roots);

        let mut text = String::new();
        render_conventions(&mut text, conventions, &repo);
        render_models(&mut text, models);
        render_associations(&mut text, models, migrations);
        self.render_tree(&mut text);

        let budget = self.config.context_token_budget;
        let mut remaining = budget.saturating_sub(estimate_tokens(&text));
        log::debug!(
            "context: fixed sections use {} of {} tokens",
            budget - remaining,
            budget
        );

        let mut stats = ContextStats {
            budget_tokens: budget,
            ..ContextStats::default()
        };
        text.push_str("## Structure\n");
        for dir in &self.config.context_dirs {
            let full = self.project_root.join(dir);
            if !full.is_dir() {
                continue;
            }
            for file in walk::collect_files(&full, STRUCTURE_EXTENSIONS) {
                let rel = walk::display_relative(self.project_root, &file);
                let Ok(source) = fs::read_to_string(&file) else {
                    log::debug!("context: unreadable {}", rel);
                    continue;
                };
                let lines = structural_lines(&source);
                if lines.is_empty() {
                    continue;
                }
                let block = format!("### {}\n{}\n\n", rel, lines.join("\n"));
                let cost = estimate_tokens(&block);
                if cost <= remaining {
                    remaining -= cost;
                    stats.included_files += 1;
                    text.push_str(&block);
                } else {
                    log::debug!("context: omit {} ({} tokens, {} left)", rel, cost, remaining);
                    let _ = writeln!(text, "- {} (omitted: token budget)", rel);
                    stats.omitted_files.push(rel);
                }
            }
        }

        stats.used_tokens = estimate_tokens(&text);
        BuiltContext { text, stats }
    }

    fn render_tree(&self, out: &mut String) {
        out.push_str("## Project tree\n```\n");
        for line in repomap::project_tree(self.project_root, self.config.tree_depth) {
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str("```\n\n");
    }
}

fn render_conventions(out: &mut String, conv: &CodebaseConventions, repo: &RepoMap) {
    out.push_str("## Codebase conventions\n");
    match conv.dominant_idiom {
        Some(idiom) => {
            let _ = writeln!(
                out,
                "- Column idiom: {} (Column( x{}, mapped_column( x{})",
                idiom.constructor(),
                conv.legacy_column_count,
                conv.modern_column_count
            );
        }
        None => {
            let _ = writeln!(
                out,
                "- Column idiom: no dominant idiom (Column( x{}, mapped_column( x{})",
                conv.legacy_column_count, conv.modern_column_count
            );
        }
    }
    let _ = writeln!(out, "- ID type: {}", conv.id_type.as_str());
    if !conv.id_mixins.is_empty() {
        let _ = writeln!(out, "- ID mixins: {}", conv.id_mixins.join(", "));
    }
    if !conv.timestamp_mixins.is_empty() {
        let _ = writeln!(out, "- Timestamp mixins: {}", conv.timestamp_mixins.join(", "));
    }
    if !repo.manifests.is_empty() {
        let manifests: Vec<String> = repo
            .manifests
            .iter()
            .map(|(path, kind)| format!("{} ({})", path, kind))
            .collect();
        let _ = writeln!(out, "- Manifests: {}", manifests.join(", "));
    }
    if !repo.entry_points.is_empty() {
        let _ = writeln!(out, "- Entry points: {}", repo.entry_points.join(", "));
    }
    if !repo.stack_hints.is_empty() {
        let _ = writeln!(out, "- Stack: {}", repo.stack_hints.join(", "));
    }
    out.push('\n');
}

fn render_models(out: &mut String, models: &ModelMap) {
    out.push_str("## Model tables\n");
    if models.is_empty() {
        out.push_str("(none)\n");
    }
    for (name, table) in models {
        let _ = writeln!(out, "### {} ({}, {})", name, table.type_name, table.source_file);
        for col in table.columns.values() {
            let mut line = format!("- {}", col.attribute_name);
            if col.persisted_name() != col.attribute_name {
                let _ = write!(line, " [db: {}]", col.persisted_name());
            }
            if let Some(ty) = &col.declared_type_name {
                let _ = write!(line, ": {}", ty);
            }
            if let Some(fk) = &col.foreign_key_target {
                let _ = write!(line, " -> {}", fk);
            }
            out.push_str(&line);
            out.push('\n');
        }
        let fks = table.foreign_keys();
        if !fks.is_empty() {
            let rendered: Vec<String> = fks
                .iter()
                .map(|(col, target)| format!("{} -> {}", col, target))
                .collect();
            let _ = writeln!(out, "Foreign keys: {}", rendered.join(", "));
        }
    }
    out.push('\n');
}

fn render_associations(out: &mut String, models: &ModelMap, migrations: &MigrationMap) {
    out.push_str("## Association tables\n");
    let mut any = false;
    for (name, table) in migrations {
        if models.contains_key(name) {
            continue;
        }
        any = true;
        let cols: Vec<&str> = table.column_names.iter().map(String::as_str).collect();
        let _ = writeln!(out, "- {} ({}): {}", name, table.source_file, cols.join(", "));
    }
    if !any {
        out.push_str("(none)\n");
    }
    out.push('\n');
}
