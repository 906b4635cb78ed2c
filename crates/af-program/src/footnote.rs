//! Footnotes: typed literal values referenced positionally by the code section

use crate::error::ParseError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

static FOOTNOTE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^«([A-Za-z][A-Za-z0-9_]*)»\s*(.*)$").expect("footnote pattern is valid")
});

static TYPE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("type name pattern is valid"));

/// Check a literal type name against `[A-Za-z][A-Za-z0-9_]*`
#[inline]
#[must_use]
pub fn is_valid_type_name(name: &str) -> bool {
    TYPE_NAME.is_match(name)
}

/// One `«type» value` entry of a blueprint's footnote section
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footnote {
    /// Declared literal type
    pub type_name: String,
    /// Literal text, verbatim
    pub value: String,
}

impl Footnote {
    /// Create a footnote
    #[inline]
    #[must_use]
    pub fn new(type_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            value: value.into(),
        }
    }

    /// Parse the first line of a footnote entry
    ///
    /// # Errors
    /// Returns [`ParseError::MalformedFootnote`] if the line does not match
    /// `«TypeName» value`
    pub fn parse_line(line: &str, line_number: usize) -> Result<Self, ParseError> {
        let trimmed = line.trim();
        let caps = FOOTNOTE_LINE
            .captures(trimmed)
            .ok_or_else(|| ParseError::MalformedFootnote {
                line: line_number,
                text: trimmed.to_string(),
            })?;
        let value = caps.get(2).map_or("", |m| m.as_str()).trim();
        Ok(Self::new(&caps[1], value))
    }
}

impl Display for Footnote {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            write!(f, "«{}»", self.type_name)
        } else {
            write!(f, "«{}» {}", self.type_name, self.value)
        }
    }
}

/// Parse a whole footnote section
///
/// Blank lines are skipped. Lines that do not start with `«` continue the
/// value of the previous entry. `first_line` is the 1-based line number of
/// the section within the blueprint, used for error reporting.
pub(crate) fn parse_section(section: &[&str], first_line: usize) -> Result<Vec<Footnote>, ParseError> {
    let mut footnotes: Vec<Footnote> = Vec::new();

    for (offset, line) in section.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with('«') {
            footnotes.push(Footnote::parse_line(trimmed, first_line + offset)?);
        } else if let Some(last) = footnotes.last_mut() {
            if !last.value.is_empty() {
                last.value.push('\n');
            }
            last.value.push_str(trimmed);
        } else {
            return Err(ParseError::MalformedFootnote {
                line: first_line + offset,
                text: trimmed.to_string(),
            });
        }
    }

    Ok(footnotes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_line() {
        let fnote = Footnote::parse_line("«int» 12", 1).unwrap();
        assert_eq!(fnote, Footnote::new("int", "12"));
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let fnote = Footnote::parse_line("   «float»   -3.5  ", 4).unwrap();
        assert_eq!(fnote.value, "-3.5");
    }

    #[test]
    fn rejects_bad_type_names() {
        assert!(Footnote::parse_line("«9lives» 3", 2).is_err());
        assert!(Footnote::parse_line("«» 3", 2).is_err());
        assert!(Footnote::parse_line("«in t» 3", 2).is_err());
        assert!(Footnote::parse_line("int 3", 2).is_err());
    }

    #[test]
    fn empty_value_is_allowed() {
        let fnote = Footnote::parse_line("«name»", 1).unwrap();
        assert_eq!(fnote.value, "");
        assert_eq!(fnote.to_string(), "«name»");
    }

    #[test]
    fn continuation_lines_extend_previous_value() {
        let lines = ["«code» block {", "do a }", "", "«int» 7"];
        let notes = parse_section(&lines, 3).unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].value, "block {\ndo a }");
        assert_eq!(notes[1], Footnote::new("int", "7"));
    }

    #[test]
    fn type_name_check() {
        assert!(is_valid_type_name("int"));
        assert!(is_valid_type_name("Vec_3"));
        assert!(!is_valid_type_name("_int"));
        assert!(!is_valid_type_name(""));
    }
}
