//! Compact output rendering helpers for report details.
//!
//! Keeps diagnostic strings bounded when a target tree has hundreds of
//! tables or columns.

/// One-line rendering of a check detail: whitespace runs become single
/// spaces and anything past `limit` characters is replaced by `...`.
pub fn compact_line(detail: &str, limit: usize) -> String {
    let mut line = String::with_capacity(detail.len().min(limit.saturating_add(3)));
    for word in detail.split_whitespace() {
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if let Some((cut, _)) = line.char_indices().nth(limit) {
        line.truncate(cut);
        line.push_str("...");
    }
    line
}

/// Render names as a quoted, bracketed list, e.g. `["id", "email"]`,
/// showing at most `max_items` entries.
pub fn name_list<S: AsRef<str>>(names: &[S], max_items: usize) -> String {
    let shown = names
        .iter()
        .take(max_items)
        .map(|n| format!("\"{}\"", n.as_ref()))
        .collect::<Vec<_>>()
        .join(", ");
    if names.len() > max_items {
        format!("[{}, ...] (+{} more)", shown, names.len() - max_items)
    } else {
        format!("[{}]", shown)
    }
}
