//! Parsing of account specifications.

use crate::error::FilterError;
use sift_core::Account;
use std::iter::Peekable;
use std::str::Chars;

/// Parse `user`, `user@host` or a quoted form such as `'user'@'host'`.
///
/// Parts may be quoted with `'`, `"` or `` ` ``; inside quotes the quote
/// character is escaped by doubling it or, for `'` and `"`, with a backslash.
/// An account without a host covers every host of the user.
pub fn parse_account(spec: &str) -> Result<Account, FilterError> {
    let trimmed = spec.trim();
    if trimmed.is_empty() {
        return Err(FilterError::invalid_account(spec, "empty account"));
    }

    let mut chars = trimmed.chars().peekable();
    let user = read_part(spec, &mut chars)?;

    let host = match chars.next() {
        None => None,
        Some('@') => {
            if chars.peek().is_none() {
                return Err(FilterError::invalid_account(spec, "missing host after '@'"));
            }
            Some(read_part(spec, &mut chars)?)
        }
        Some(c) => {
            return Err(FilterError::invalid_account(
                spec,
                format!("unexpected character '{c}'"),
            ));
        }
    };

    if let Some(c) = chars.next() {
        return Err(FilterError::invalid_account(
            spec,
            format!("unexpected character '{c}' after host"),
        ));
    }

    Ok(Account { user, host })
}

fn read_part(spec: &str, chars: &mut Peekable<Chars<'_>>) -> Result<String, FilterError> {
    let mut part = String::new();

    match chars.peek().copied() {
        Some(quote @ ('\'' | '"' | '`')) => {
            chars.next();
            loop {
                match chars.next() {
                    Some(c) if c == quote && chars.peek() == Some(&quote) => {
                        chars.next();
                        part.push(quote);
                    }
                    Some(c) if c == quote => break,
                    Some('\\') if quote != '`' => match chars.next() {
                        Some(escaped) => part.push(escaped),
                        None => {
                            return Err(FilterError::invalid_account(spec, "dangling escape"));
                        }
                    },
                    Some(c) => part.push(c),
                    None => {
                        return Err(FilterError::invalid_account(spec, "unterminated quote"));
                    }
                }
            }
            Ok(part)
        }
        _ => {
            while let Some(&c) = chars.peek() {
                match c {
                    '@' => break,
                    '\'' | '"' | '`' => {
                        return Err(FilterError::invalid_account(
                            spec,
                            "quote inside an unquoted name",
                        ));
                    }
                    _ => {
                        part.push(c);
                        chars.next();
                    }
                }
            }
            if part.is_empty() {
                return Err(FilterError::invalid_account(spec, "empty user name"));
            }
            Ok(part)
        }
    }
}
