use std::fmt;

use serde::{Deserialize, Serialize};

/// Header tokens skipped when they appear as a line's first field.
pub const HEADER_TOKENS: &[&str] = &["supplier", "suppliers", "name", "names"];

/// One record name to look up. Always trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Returns `None` when the trimmed value is empty.
    pub fn new(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Turns line-oriented, comma-delimited text into identifiers, in input order.
///
/// Only the first field of each line is used. Blank lines and header lines
/// are skipped. Duplicates are kept.
pub fn parse_identifiers(text: &str) -> Vec<Identifier> {
    text.lines()
        .filter_map(|line| {
            let field = first_field(line);
            if is_header(&field) {
                return None;
            }
            Identifier::new(&field)
        })
        .collect()
}

fn is_header(field: &str) -> bool {
    let trimmed = field.trim();
    HEADER_TOKENS
        .iter()
        .any(|token| token.eq_ignore_ascii_case(trimmed))
}

/// First field of a CSV line. A quoted field may contain commas; `""` is an
/// escaped quote.
fn first_field(line: &str) -> String {
    let line = line.trim_start();
    let Some(rest) = line.strip_prefix('"') else {
        return line.split(',').next().unwrap_or_default().to_string();
    };

    let mut field = String::with_capacity(rest.len());
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            if chars.peek() == Some(&'"') {
                field.push('"');
                chars.next();
            } else {
                break;
            }
        } else {
            field.push(c);
        }
    }
    field
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_first_field_keeps_commas() {
        assert_eq!(first_field(r#""Acme, Inc.",DE"#), "Acme, Inc.");
        assert_eq!(first_field(r#""Say ""hi""",x"#), r#"Say "hi""#);
    }

    #[test]
    fn unquoted_first_field_stops_at_comma() {
        assert_eq!(first_field("Bio Farm,NL,2024"), "Bio Farm");
        assert_eq!(first_field("Solo"), "Solo");
    }

    #[test]
    fn identifier_rejects_blank() {
        assert!(Identifier::new("   ").is_none());
        assert_eq!(Identifier::new("  x ").unwrap().as_str(), "x");
    }
}
