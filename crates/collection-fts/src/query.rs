//! FTS5 match expression building.

use crate::config::QuerySyntax;
use regex::Regex;
use std::sync::LazyLock;

/// Characters that make a bare FTS5 term ambiguous or invalid.
static FTS5_SPECIAL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[-._"():*^+]"#).expect("valid FTS5 special char pattern"));

/// Escape a term for FTS5 queries.
///
/// Terms containing special characters are wrapped in quotes.
pub fn escape_fts5_term(term: &str) -> String {
    if FTS5_SPECIAL_CHARS.is_match(term) {
        let escaped = term.replace('"', "\"\"");
        format!("\"{}\"", escaped)
    } else {
        term.to_string()
    }
}

/// Build a prefix-matching FTS5 query from free text.
///
/// - "hello world" → `hello* OR world*`
/// - "v1.5" → `"v1.5"*`
/// - "Foo-Bar" → `"foo-bar"*`
pub fn build_prefix_query(search_term: &str) -> String {
    search_term
        .to_lowercase()
        .split_whitespace()
        .map(|term| format!("{}*", escape_fts5_term(term)))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Turn a caller's query into the expression bound to `MATCH`.
///
/// Returns `None` when there is nothing to search for.
pub fn build_match_expression(query: &str, syntax: QuerySyntax) -> Option<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return None;
    }
    match syntax {
        QuerySyntax::Raw => Some(query.to_string()),
        QuerySyntax::Prefix => Some(build_prefix_query(trimmed)),
    }
}
