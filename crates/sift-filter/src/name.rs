//! Parsing of qualified object names.
//!
//! Names are dot separated. A part may be wrapped in backticks to carry dots or
//! other special characters, with a doubled backtick standing for a literal one:
//! `` `my.db`.`it``s` `` is schema `my.db`, object ``it`s``.

use crate::error::FilterError;

/// Split `spec` into its identifier parts.
pub fn split_identifiers(spec: &str) -> Result<Vec<String>, FilterError> {
    let mut parts = Vec::new();
    let mut chars = spec.trim().chars().peekable();

    loop {
        let mut part = String::new();
        let at_end;

        if chars.peek() == Some(&'`') {
            chars.next();
            loop {
                match chars.next() {
                    Some('`') if chars.peek() == Some(&'`') => {
                        chars.next();
                        part.push('`');
                    }
                    Some('`') => break,
                    Some(c) => part.push(c),
                    None => {
                        return Err(FilterError::invalid_name(
                            spec,
                            "unterminated quoted identifier",
                        ));
                    }
                }
            }
            at_end = match chars.next() {
                None => true,
                Some('.') => false,
                Some(c) => {
                    return Err(FilterError::invalid_name(
                        spec,
                        format!("unexpected character '{c}' after quoted identifier"),
                    ));
                }
            };
        } else {
            loop {
                match chars.next() {
                    None => {
                        at_end = true;
                        break;
                    }
                    Some('.') => {
                        at_end = false;
                        break;
                    }
                    Some('`') => {
                        return Err(FilterError::invalid_name(
                            spec,
                            "backtick inside an unquoted identifier",
                        ));
                    }
                    Some(c) => part.push(c),
                }
            }
        }

        if part.is_empty() {
            return Err(FilterError::invalid_name(spec, "empty identifier"));
        }
        parts.push(part);

        if at_end {
            return Ok(parts);
        }
    }
}

/// Parse a schema name: either a raw name or a single backtick-quoted identifier.
pub fn parse_schema(spec: &str) -> Result<String, FilterError> {
    if spec.trim_start().starts_with('`') {
        let mut parts = split_identifiers(spec)?;
        if parts.len() != 1 {
            return Err(FilterError::invalid_name(
                spec,
                "expected a single schema name",
            ));
        }
        return Ok(parts.remove(0));
    }
    if spec.trim().is_empty() {
        return Err(FilterError::invalid_name(spec, "empty identifier"));
    }
    Ok(spec.to_string())
}

/// Parse `schema.object`.
pub fn parse_object(spec: &str) -> Result<(String, String), FilterError> {
    let parts = split_identifiers(spec)?;
    match <[String; 2]>::try_from(parts) {
        Ok([schema, object]) => Ok((schema, object)),
        Err(_) => Err(FilterError::invalid_name(
            spec,
            "expected 'schema.object'",
        )),
    }
}

/// Parse `schema.table` or `schema.table.trigger`.
pub fn parse_trigger(spec: &str) -> Result<(String, String, Option<String>), FilterError> {
    let mut parts = split_identifiers(spec)?.into_iter();
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(schema), Some(table), trigger, None) => Ok((schema, table, trigger)),
        _ => Err(FilterError::invalid_name(
            spec,
            "expected 'schema.table' or 'schema.table.trigger'",
        )),
    }
}
