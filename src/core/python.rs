//! Python syntax layer over tree-sitter.
//!
//! Only the handful of shapes the extractors need: class definitions,
//! assignments, calls, string literals and dotted names.

use crate::core::error::SourceParseError;
use std::fs;
use std::path::Path;
use tree_sitter::{Language, Node, Parser, Tree};

/// Callees that declare a mapped column.
pub const COLUMN_CONSTRUCTORS: &[&str] = &["Column", "mapped_column"];
pub const FOREIGN_KEY_CONSTRUCTOR: &str = "ForeignKey";

pub struct ParsedModule {
    pub source: String,
    pub tree: Tree,
}

impl ParsedModule {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn text(&self, node: Node<'_>) -> &str {
        node_text(node, &self.source)
    }
}

pub fn parse_file(path: &Path) -> Result<ParsedModule, SourceParseError> {
    let source = fs::read_to_string(path).map_err(|source| SourceParseError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_source(source, path)
}

/// Parse a module. Trees containing any error or missing node are rejected
/// so partial drafts never leak half-read classes into the model map.
pub fn parse_source(source: String, path: &Path) -> Result<ParsedModule, SourceParseError> {
    let mut parser = Parser::new();
    let language: Language = tree_sitter_python::LANGUAGE.into();
    parser
        .set_language(&language)
        .map_err(|e| SourceParseError::Grammar(e.to_string()))?;
    let tree = parser
        .parse(&source, None)
        .ok_or_else(|| SourceParseError::Syntax(path.to_path_buf()))?;
    if tree.root_node().has_error() {
        return Err(SourceParseError::Syntax(path.to_path_buf()));
    }
    Ok(ParsedModule { source, tree })
}

pub fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.byte_range()).unwrap_or("")
}

pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect()
}

/// Value of a plain string literal. f-strings and concatenations yield `None`.
pub fn string_value(node: Node<'_>, source: &str) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    let children = named_children(node);
    if children.iter().any(|c| c.kind() == "interpolation") {
        return None;
    }
    if children.iter().any(|c| c.kind() == "string_start") {
        let value = children
            .iter()
            .filter(|c| c.kind() == "string_content")
            .map(|c| node_text(*c, source))
            .collect::<String>();
        return Some(value);
    }
    Some(strip_quotes(node_text(node, source)).to_string())
}

fn strip_quotes(raw: &str) -> &str {
    let body = raw.trim_start_matches(|c: char| "rRbBuU".contains(c));
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if body.len() >= quote.len() * 2 && body.starts_with(quote) && body.ends_with(quote) {
            return &body[quote.len()..body.len() - quote.len()];
        }
    }
    body
}

/// Name a callee is called by: `Column` for both `Column(...)` and
/// `sa.Column(...)`.
pub fn callee_name<'s>(call: Node<'_>, source: &'s str) -> Option<&'s str> {
    if call.kind() != "call" {
        return None;
    }
    let function = call.child_by_field_name("function")?;
    match function.kind() {
        "identifier" => Some(node_text(function, source)),
        "attribute" => function
            .child_by_field_name("attribute")
            .map(|a| node_text(a, source)),
        _ => None,
    }
}

/// Namespace of an attribute call, e.g. `op` in `op.create_table(...)`.
pub fn callee_namespace<'s>(call: Node<'_>, source: &'s str) -> Option<&'s str> {
    let function = call.child_by_field_name("function")?;
    if function.kind() != "attribute" {
        return None;
    }
    function
        .child_by_field_name("object")
        .map(|o| node_text(o, source))
}

pub fn is_call_to(node: Node<'_>, source: &str, names: &[&str]) -> bool {
    callee_name(node, source).is_some_and(|n| names.contains(&n))
}

/// Call arguments split into positional and keyword `(name, value)` pairs.
pub struct CallArgs<'t> {
    pub positional: Vec<Node<'t>>,
    pub keywords: Vec<(String, Node<'t>)>,
}

pub fn call_args<'t>(call: Node<'t>, source: &str) -> CallArgs<'t> {
    let mut args = CallArgs {
        positional: Vec::new(),
        keywords: Vec::new(),
    };
    let Some(list) = call.child_by_field_name("arguments") else {
        return args;
    };
    if list.kind() != "argument_list" {
        return args;
    }
    for child in named_children(list) {
        match child.kind() {
            "keyword_argument" => {
                let name = child
                    .child_by_field_name("name")
                    .map(|n| node_text(n, source).to_string())
                    .unwrap_or_default();
                if let Some(value) = child.child_by_field_name("value") {
                    args.keywords.push((name, value));
                }
            }
            "list_splat" | "dictionary_splat" => {}
            _ => args.positional.push(child),
        }
    }
    args
}

/// First string literal among a call's positional arguments, if it is the
/// very first argument.
pub fn leading_string_arg(call: Node<'_>, source: &str) -> Option<String> {
    let args = call_args(call, source);
    args.positional
        .first()
        .and_then(|first| string_value(*first, source))
}

/// Short name of an expression used as a type or base: `String` for
/// `String`, `sa.String` and `String(255)`; `Base` for `db.Base`.
pub fn expr_name(node: Node<'_>, source: &str) -> Option<String> {
    match node.kind() {
        "identifier" => Some(node_text(node, source).to_string()),
        "attribute" => node
            .child_by_field_name("attribute")
            .map(|a| node_text(a, source).to_string()),
        "call" => callee_name(node, source).map(str::to_string),
        "subscript" => node
            .child_by_field_name("value")
            .and_then(|v| expr_name(v, source)),
        _ => None,
    }
}

/// Innermost type name of a `Mapped[...]` annotation:
/// `Mapped[str]` → `str`, `Mapped[Optional[int]]` → `int`.
pub fn mapped_annotation_type(annotation: Node<'_>, source: &str) -> Option<String> {
    let mut node = annotation;
    if node.kind() == "type" {
        node = *named_children(node).first()?;
    }
    // Generic annotations parse as `generic_type` in newer grammars and as
    // `subscript` in older ones.
    let mut peeled = false;
    loop {
        match node.kind() {
            "subscript" => {
                node = node.child_by_field_name("subscript")?;
                peeled = true;
            }
            "generic_type" => {
                let params = named_children(node)
                    .into_iter()
                    .find(|c| c.kind() == "type_parameter")?;
                node = *named_children(params).first()?;
                if node.kind() == "type" {
                    node = *named_children(node).first()?;
                }
                peeled = true;
            }
            _ => break,
        }
    }
    if !peeled {
        return None;
    }
    expr_name(node, source)
}

/// Every `call` node under `root`, in source order.
pub fn calls_in<'t>(root: Node<'t>) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.kind() == "call" {
            out.push(node);
        }
        let children = named_children(node);
        stack.extend(children.into_iter().rev());
    }
    out
}

/// `(left, right, annotation)` if `stmt` is an `expression_statement`
/// wrapping a simple assignment.
pub fn as_assignment<'t>(stmt: Node<'t>) -> Option<(Node<'t>, Option<Node<'t>>, Option<Node<'t>>)> {
    let assignment = if stmt.kind() == "assignment" {
        stmt
    } else if stmt.kind() == "expression_statement" {
        named_children(stmt)
            .into_iter()
            .find(|c| c.kind() == "assignment")?
    } else {
        return None;
    };
    let left = assignment.child_by_field_name("left")?;
    Some((
        left,
        assignment.child_by_field_name("right"),
        assignment.child_by_field_name("type"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(src: &str) -> ParsedModule {
        parse_source(src.to_string(), &PathBuf::from("t.py")).expect("parses")
    }

    #[test]
    fn string_values_strip_quotes_and_prefixes() {
        let m = parse("a = 'x'\nb = \"users\"\nc = r'raw'\nd = f'{a}'\n");
        let values: Vec<Option<String>> = named_children(m.root())
            .into_iter()
            .filter_map(|s| as_assignment(s))
            .map(|(_, right, _)| right.and_then(|r| string_value(r, &m.source)))
            .collect();
        assert_eq!(
            values,
            vec![
                Some("x".to_string()),
                Some("users".to_string()),
                Some("raw".to_string()),
                None
            ]
        );
    }

    #[test]
    fn callee_names_ignore_namespace() {
        let m = parse("x = sa.Column(Integer)\ny = mapped_column()\n");
        let names: Vec<&str> = calls_in(m.root())
            .into_iter()
            .filter_map(|c| callee_name(c, &m.source))
            .collect();
        assert_eq!(names, vec!["Column", "mapped_column"]);
    }

    #[test]
    fn syntax_errors_are_rejected() {
        let err = parse_source("class Broken(:\n    pass\n".to_string(), &PathBuf::from("b.py"));
        assert!(matches!(err, Err(SourceParseError::Syntax(_))));
    }

    #[test]
    fn mapped_annotation_unwraps_optional() {
        let m = parse("a: Mapped[Optional[int]] = mapped_column()\nb: Mapped[str] = mapped_column()\n");
        let types: Vec<Option<String>> = named_children(m.root())
            .into_iter()
            .filter_map(|s| as_assignment(s))
            .map(|(_, _, ann)| ann.and_then(|a| mapped_annotation_type(a, &m.source)))
            .collect();
        assert_eq!(types, vec![Some("int".to_string()), Some("str".to_string())]);
    }
}
