use std::sync::OnceLock;

use regex::Regex;

const MUTATING_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "create", "alter", "drop", "replace", "truncate", "attach",
    "detach", "pragma", "vacuum", "reindex", "analyze", "begin", "commit", "rollback",
];

/// Matches either a single-quoted literal (with `''` escapes) or a bare `?` marker.
fn literal_or_placeholder_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"'(?:[^']|'')*'|\?").expect("placeholder regex should compile")
    })
}

/// Counts positional `?` markers outside string literals.
#[must_use]
pub fn count_placeholders(sql: &str) -> usize {
    literal_or_placeholder_regex()
        .find_iter(sql)
        .filter(|found| found.as_str() == "?")
        .count()
}

fn without_literals(sql: &str) -> String {
    literal_or_placeholder_regex()
        .replace_all(sql, |captures: &regex::Captures<'_>| {
            if &captures[0] == "?" {
                "?".to_string()
            } else {
                "''".to_string()
            }
        })
        .into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOnlyViolation {
    Empty,
    MultiStatement,
    Mutating(String),
    Unsupported(String),
}

impl std::fmt::Display for ReadOnlyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("statement is empty"),
            Self::MultiStatement => f.write_str("statement contains more than one SQL statement"),
            Self::Mutating(keyword) => write!(f, "statement uses mutating keyword `{keyword}`"),
            Self::Unsupported(keyword) => {
                write!(f, "statement starts with `{keyword}`; only SELECT and WITH are allowed")
            }
        }
    }
}

/// Single SELECT / WITH ... SELECT statement with no mutating keywords.
pub fn ensure_read_only(sql: &str) -> Result<(), ReadOnlyViolation> {
    let stripped = without_literals(sql);
    let mut candidate = stripped.trim();
    while let Some(rest) = candidate.strip_suffix(';') {
        candidate = rest.trim_end();
    }
    if candidate.is_empty() {
        return Err(ReadOnlyViolation::Empty);
    }
    if candidate.contains(';') {
        return Err(ReadOnlyViolation::MultiStatement);
    }

    let normalized = candidate.to_ascii_lowercase();
    let mut tokens = normalized
        .split(|ch: char| !ch.is_ascii_alphanumeric() && ch != '_')
        .filter(|token| !token.is_empty());
    let leading = tokens.next().unwrap_or("unknown");
    if let Some(keyword) = std::iter::once(leading)
        .chain(tokens)
        .find(|token| MUTATING_KEYWORDS.contains(token))
    {
        return Err(ReadOnlyViolation::Mutating(keyword.to_string()));
    }
    if leading != "select" && leading != "with" {
        return Err(ReadOnlyViolation::Unsupported(leading.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ReadOnlyViolation, count_placeholders, ensure_read_only};

    #[test]
    fn placeholders_inside_literals_are_not_counted() {
        assert_eq!(count_placeholders("SELECT 1 WHERE a = ? AND b = 'why?'"), 1);
        assert_eq!(count_placeholders("SELECT 'it''s ?' , ?, ?"), 2);
        assert_eq!(count_placeholders("SELECT 1"), 0);
    }

    #[test]
    fn accepts_select_and_cte_statements() {
        assert!(ensure_read_only("SELECT 1").is_ok());
        assert!(ensure_read_only("WITH cfg AS (SELECT ? AS p) SELECT p FROM cfg;").is_ok());
        assert!(ensure_read_only("SELECT 1 WHERE region != 'Drop; Corporate'").is_ok());
    }

    #[test]
    fn rejects_mutation_and_multi_statement_sql() {
        assert_eq!(
            ensure_read_only("DELETE FROM margin_base"),
            Err(ReadOnlyViolation::Mutating("delete".to_string()))
        );
        assert_eq!(
            ensure_read_only("SELECT 1; SELECT 2"),
            Err(ReadOnlyViolation::MultiStatement)
        );
        assert_eq!(ensure_read_only("  ;  "), Err(ReadOnlyViolation::Empty));
        assert_eq!(
            ensure_read_only("VALUES (1)"),
            Err(ReadOnlyViolation::Unsupported("values".to_string()))
        );
    }
}
