//! SQL text helpers for catalog predicates.

/// Predicate that matches every row.
pub const TRUE: &str = "TRUE";

/// Predicate that matches no row.
pub const FALSE: &str = "FALSE";

/// Collation used for exact, byte-wise name comparison.
pub const BINARY_COLLATION: &str = "utf8mb4_bin";

/// Quote `value` as a SQL string literal.
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x1a' => out.push_str("\\Z"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

/// `column IN ('a','b')`, relying on the column's own collation.
pub fn in_list<I, S>(column: &str, values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let values = values
        .into_iter()
        .map(|v| quote_string(v.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    format!("{column} IN ({values})")
}

/// Byte-exact comparison, independent of the column's collation.
pub fn case_sensitive_compare(column: &str, value: &str) -> String {
    format!(
        "STRCMP(CONVERT({column} USING utf8mb4) COLLATE {BINARY_COLLATION}, {}) = 0",
        quote_string(value)
    )
}

/// Conjunction of `parts`; `TRUE` parts are dropped and no parts yields `TRUE`.
pub fn and_all<I>(parts: I) -> String
where
    I: IntoIterator<Item = String>,
{
    join(parts.into_iter().filter(|p| p != TRUE).collect(), "AND", TRUE)
}

/// Disjunction of `parts`; no parts yields `FALSE`.
pub fn or_any<I>(parts: I) -> String
where
    I: IntoIterator<Item = String>,
{
    join(parts.into_iter().collect(), "OR", FALSE)
}

pub fn not(predicate: &str) -> String {
    format!("NOT ({predicate})")
}

fn join(parts: Vec<String>, op: &str, empty: &str) -> String {
    match parts.len() {
        0 => empty.to_string(),
        1 => parts.into_iter().next().unwrap_or_default(),
        _ => parts
            .iter()
            .map(|p| format!("({p})"))
            .collect::<Vec<_>>()
            .join(&format!(" {op} ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quote_string() {
        assert_eq!(quote_string("db"), "'db'");
        assert_eq!(quote_string("it's"), "'it\\'s'");
        assert_eq!(quote_string("a\\b"), "'a\\\\b'");
        assert_eq!(quote_string("x\ny"), "'x\\ny'");
    }

    #[test]
    fn test_in_list() {
        assert_eq!(in_list("TABLE_NAME", ["a", "b"]), "TABLE_NAME IN ('a','b')");
    }

    #[test]
    fn test_case_sensitive_compare() {
        assert_eq!(
            case_sensitive_compare("SCHEMA_NAME", "Db"),
            "STRCMP(CONVERT(SCHEMA_NAME USING utf8mb4) COLLATE utf8mb4_bin, 'Db') = 0"
        );
    }

    #[test]
    fn test_and_all() {
        assert_eq!(and_all(Vec::new()), "TRUE");
        assert_eq!(and_all(vec!["TRUE".to_string(), "a".to_string()]), "a");
        assert_eq!(and_all(vec!["a".to_string(), "b".to_string()]), "(a) AND (b)");
    }

    #[test]
    fn test_or_any() {
        assert_eq!(or_any(Vec::new()), "FALSE");
        assert_eq!(or_any(vec!["a".to_string()]), "a");
        assert_eq!(or_any(vec!["a".to_string(), "b".to_string()]), "(a) OR (b)");
    }
}
