//! Blueprint parser
//!
//! A blueprint is a code section followed by a footnote section. The
//! footnote section starts at the first line whose first non-blank
//! character is `«`. The code section must hold exactly one root point.

use crate::error::ParseError;
use crate::footnote::{self, is_valid_type_name, Footnote};
use crate::point::{Literal, Point};
use std::collections::{HashMap, VecDeque};

/// Parsed blueprint before it is wrapped in a program
#[derive(Debug)]
pub(crate) struct ParsedBlueprint {
    pub(crate) root: Point,
    pub(crate) unused_footnotes: Vec<Footnote>,
}

/// Parse blueprint text into a linked point tree
pub(crate) fn parse_blueprint(text: &str) -> Result<ParsedBlueprint, ParseError> {
    let lines: Vec<&str> = text.lines().collect();
    let split = lines
        .iter()
        .position(|line| line.trim_start().starts_with('«'))
        .unwrap_or(lines.len());

    let code = lines[..split].join("\n");
    let notes = footnote::parse_section(&lines[split..], split + 1)?;

    let mut root = parse_code(&code)?;
    let unused_footnotes = link_footnotes(&mut root, notes)?;

    Ok(ParsedBlueprint {
        root,
        unused_footnotes,
    })
}

/// Parse a code section (no footnotes) into an unlinked point tree
pub(crate) fn parse_code(code: &str) -> Result<Point, ParseError> {
    let tokens = tokenize(code);
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut cursor = Cursor {
        tokens: &tokens,
        pos: 0,
    };
    let root = cursor.point()?;

    if cursor.pos < tokens.len() {
        return Err(ParseError::TrailingCode(tokens[cursor.pos..].join(" ")));
    }
    Ok(root)
}

/// Split code into words, treating braces as their own tokens
fn tokenize(code: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for ch in code.chars() {
        match ch {
            '{' | '}' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(ch.to_string());
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

struct Cursor<'a> {
    tokens: &'a [String],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn next(&mut self) -> Option<&'a str> {
        let tokens = self.tokens;
        let token = tokens.get(self.pos)?;
        self.pos += 1;
        Some(token.as_str())
    }

    fn peek(&self) -> Option<&'a str> {
        let tokens = self.tokens;
        tokens.get(self.pos).map(String::as_str)
    }

    fn unexpected(&self, token: &str) -> ParseError {
        ParseError::UnexpectedToken {
            token: token.to_string(),
            position: self.pos.saturating_sub(1),
        }
    }

    fn point(&mut self) -> Result<Point, ParseError> {
        let keyword = self.next().ok_or_else(|| ParseError::UnexpectedEnd {
            after: String::new(),
        })?;

        match keyword {
            "block" => self.block(),
            "do" => Ok(Point::Instruction(self.name("do")?)),
            "ref" => Ok(Point::Reference(self.name("ref")?)),
            "value" => self.literal(),
            other => Err(self.unexpected(other)),
        }
    }

    fn block(&mut self) -> Result<Point, ParseError> {
        let opened_at = self.pos;
        match self.next() {
            Some("{") => {}
            Some(other) => return Err(self.unexpected(other)),
            None => {
                return Err(ParseError::UnexpectedEnd {
                    after: "block".to_string(),
                })
            }
        }

        let mut contents = Vec::new();
        loop {
            match self.peek() {
                Some("}") => {
                    self.pos += 1;
                    return Ok(Point::block(contents));
                }
                Some(_) => contents.push(self.point()?),
                None => return Err(ParseError::UnterminatedBlock { position: opened_at }),
            }
        }
    }

    fn name(&mut self, keyword: &str) -> Result<String, ParseError> {
        match self.next() {
            Some(tok) if tok == "{" || tok == "}" || tok.starts_with('«') => {
                Err(self.unexpected(tok))
            }
            Some(tok) => Ok(tok.to_string()),
            None => Err(ParseError::UnexpectedEnd {
                after: keyword.to_string(),
            }),
        }
    }

    fn literal(&mut self) -> Result<Point, ParseError> {
        let tag = self.next().ok_or_else(|| ParseError::UnexpectedEnd {
            after: "value".to_string(),
        })?;
        let type_name = tag
            .strip_prefix('«')
            .and_then(|rest| rest.strip_suffix('»'))
            .ok_or_else(|| ParseError::UnexpectedToken {
                token: tag.to_string(),
                position: self.pos - 1,
            })?;
        if !is_valid_type_name(type_name) {
            return Err(ParseError::InvalidTypeName(type_name.to_string()));
        }
        Ok(Point::Literal(Literal::new(type_name, String::new())))
    }
}

/// Link each `value «T»` (pre-order) to the next unused `«T»` footnote
///
/// Returns the footnotes no placeholder claimed, in their original order.
fn link_footnotes(root: &mut Point, notes: Vec<Footnote>) -> Result<Vec<Footnote>, ParseError> {
    let mut queues: HashMap<String, VecDeque<usize>> = HashMap::new();
    for (i, note) in notes.iter().enumerate() {
        queues.entry(note.type_name.clone()).or_default().push_back(i);
    }

    let mut used = vec![false; notes.len()];
    link_point(root, &notes, &mut queues, &mut used)?;

    Ok(notes
        .into_iter()
        .zip(used)
        .filter_map(|(note, was_used)| (!was_used).then_some(note))
        .collect())
}

fn link_point(
    point: &mut Point,
    notes: &[Footnote],
    queues: &mut HashMap<String, VecDeque<usize>>,
    used: &mut [bool],
) -> Result<(), ParseError> {
    match point {
        Point::Block(block) => {
            let mut contents = std::mem::take(block).into_contents();
            for child in &mut contents {
                link_point(child, notes, queues, used)?;
            }
            *point = Point::block(contents);
        }
        Point::Literal(lit) => {
            let idx = queues
                .get_mut(&lit.type_name)
                .and_then(VecDeque::pop_front)
                .ok_or_else(|| ParseError::MissingFootnote {
                    type_name: lit.type_name.clone(),
                })?;
            used[idx] = true;
            lit.value = notes[idx].value.clone();
        }
        Point::Instruction(_) | Point::Reference(_) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizer_splits_braces() {
        assert_eq!(
            tokenize("block{do a \n do b}"),
            vec!["block", "{", "do", "a", "do", "b", "}"]
        );
    }

    #[test]
    fn parses_nested_blocks() {
        let parsed = parse_blueprint("block { do a block { ref x } }").unwrap();
        assert_eq!(parsed.root.points(), 4);
        assert!(parsed.unused_footnotes.is_empty());
    }

    #[test]
    fn links_footnotes_per_type_in_order() {
        let parsed = parse_blueprint(
            "block { value «int» value «bool» value «int» }\n«int» 1\n«bool» true\n«int» 2\n«int» 3",
        )
        .unwrap();
        let lits: Vec<_> = parsed.root.footnotes();
        assert_eq!(lits[0], Footnote::new("int", "1"));
        assert_eq!(lits[1], Footnote::new("bool", "true"));
        assert_eq!(lits[2], Footnote::new("int", "2"));
        assert_eq!(parsed.unused_footnotes, vec![Footnote::new("int", "3")]);
    }

    #[test]
    fn rejects_bad_code() {
        assert_eq!(parse_blueprint("").unwrap_err(), ParseError::Empty);
        assert!(matches!(
            parse_blueprint("block { do a").unwrap_err(),
            ParseError::UnterminatedBlock { .. }
        ));
        assert!(matches!(
            parse_blueprint("do a do b").unwrap_err(),
            ParseError::TrailingCode(_)
        ));
        assert!(matches!(
            parse_blueprint("jump a").unwrap_err(),
            ParseError::UnexpectedToken { .. }
        ));
        assert!(matches!(
            parse_blueprint("do").unwrap_err(),
            ParseError::UnexpectedEnd { .. }
        ));
        assert!(matches!(
            parse_blueprint("value int\n«int» 3").unwrap_err(),
            ParseError::UnexpectedToken { .. }
        ));
    }

    #[test]
    fn rejects_missing_footnote() {
        assert_eq!(
            parse_blueprint("value «int»").unwrap_err(),
            ParseError::MissingFootnote {
                type_name: "int".to_string()
            }
        );
    }

    #[test]
    fn rejects_malformed_footnote_line() {
        let err = parse_blueprint("value «int»\n«int» 4\n«1nt» 5").unwrap_err();
        assert_eq!(
            err,
            ParseError::MalformedFootnote {
                line: 3,
                text: "«1nt» 5".to_string()
            }
        );
    }
}
