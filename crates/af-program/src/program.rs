//! Parsed blueprints
//!
//! A [`Program`] is an immutable point tree plus the footnotes no
//! placeholder claimed. Every structural edit returns a new program and
//! leaves the receiver untouched.

use crate::error::{ParseError, ProgramError};
use crate::footnote::Footnote;
use crate::parser::parse_blueprint;
use crate::point::Point;
use crate::types::TypeRegistry;
use rand::{Rng, RngCore};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Program: root point plus unused footnotes
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    root: Point,
    unused_footnotes: Vec<Footnote>,
}

impl Program {
    /// Parse blueprint text
    ///
    /// # Errors
    /// Returns [`ParseError`] if the code section or a footnote line does
    /// not follow the grammar, or a placeholder has no footnote
    pub fn parse(blueprint: &str) -> Result<Self, ParseError> {
        let parsed = parse_blueprint(blueprint)?;
        Ok(Self {
            root: parsed.root,
            unused_footnotes: parsed.unused_footnotes,
        })
    }

    /// Wrap a point tree with no unused footnotes
    #[inline]
    #[must_use]
    pub fn from_point(root: Point) -> Self {
        Self {
            root,
            unused_footnotes: Vec::new(),
        }
    }

    /// The empty program `block {}`
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::from_point(Point::empty_block())
    }

    /// Replace the unused footnotes
    #[must_use]
    pub fn with_unused_footnotes(mut self, footnotes: Vec<Footnote>) -> Self {
        self.unused_footnotes = footnotes;
        self
    }

    /// Append footnotes to the unused pool
    pub fn append_unused_footnotes<I>(&mut self, footnotes: I)
    where
        I: IntoIterator<Item = Footnote>,
    {
        self.unused_footnotes.extend(footnotes);
    }

    /// Root point
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Point {
        &self.root
    }

    /// Number of points in the tree
    #[inline]
    #[must_use]
    pub fn points(&self) -> usize {
        self.root.points()
    }

    /// Point at 1-based pre-order index
    ///
    /// # Errors
    /// Returns [`ProgramError::IndexOutOfRange`] outside `1..=points`
    pub fn point(&self, index: usize) -> Result<&Point, ProgramError> {
        self.root.get(index).ok_or(ProgramError::IndexOutOfRange {
            index,
            points: self.points(),
        })
    }

    /// Subtree rooted at `index` as a standalone program
    ///
    /// # Errors
    /// Returns [`ProgramError::IndexOutOfRange`] outside `1..=points`
    pub fn subtree(&self, index: usize) -> Result<Program, ProgramError> {
        self.point(index).map(|p| Program::from_point(p.clone()))
    }

    /// New program with point `index` removed from its parent block
    ///
    /// Deleting the root yields `block {}`. Unused footnotes are kept.
    ///
    /// # Errors
    /// Returns [`ProgramError::IndexOutOfRange`] outside `1..=points`
    pub fn delete_point(&self, index: usize) -> Result<Program, ProgramError> {
        self.point(index)?;
        let root = if index == 1 {
            Point::empty_block()
        } else {
            self.root.deleted(index).ok_or(ProgramError::IndexOutOfRange {
                index,
                points: self.points(),
            })?
        };
        Ok(self.with_root(root))
    }

    /// New program with the subtree at `index` replaced by `replacement`
    ///
    /// # Errors
    /// Returns [`ProgramError::IndexOutOfRange`] outside `1..=points`
    pub fn replace_point(&self, index: usize, replacement: &Point) -> Result<Program, ProgramError> {
        let root = self
            .root
            .replaced(index, replacement)
            .ok_or(ProgramError::IndexOutOfRange {
                index,
                points: self.points(),
            })?;
        Ok(self.with_root(root))
    }

    /// Like [`Program::replace_point`], taking the replacement as blueprint text
    ///
    /// # Errors
    /// Returns [`ProgramError::Parse`] if the text does not parse, or
    /// [`ProgramError::IndexOutOfRange`] outside `1..=points`
    pub fn replace_point_with_blueprint(
        &self,
        index: usize,
        blueprint: &str,
    ) -> Result<Program, ProgramError> {
        let replacement = Program::parse(blueprint)?;
        let mut child = self.replace_point(index, &replacement.root)?;
        child.append_unused_footnotes(replacement.unused_footnotes);
        Ok(child)
    }

    /// Independent copy
    ///
    /// Programs own their whole tree, so this is a plain clone.
    #[inline]
    #[must_use]
    pub fn deep_copy(&self) -> Program {
        self.clone()
    }

    /// Top-level slots of the tree
    ///
    /// The contents of a block root, or the root itself otherwise.
    #[must_use]
    pub fn backbone(&self) -> &[Point] {
        match &self.root {
            Point::Block(block) => block.contents(),
            other => std::slice::from_ref(other),
        }
    }

    /// Footnotes no placeholder refers to
    #[inline]
    #[must_use]
    pub fn unused_footnotes(&self) -> &[Footnote] {
        &self.unused_footnotes
    }

    /// Every footnote: used ones in traversal order, then unused
    #[must_use]
    pub fn footnotes(&self) -> Vec<Footnote> {
        let mut notes = self.root.footnotes();
        notes.extend(self.unused_footnotes.iter().cloned());
        notes
    }

    /// Indented code section, one point per line
    #[must_use]
    pub fn code_section(&self) -> String {
        let mut out = String::new();
        self.root.write_code(&mut out, 0);
        out.trim_end().to_string()
    }

    /// Footnote section, one entry per line
    #[must_use]
    pub fn footnote_section(&self) -> String {
        self.footnotes()
            .iter()
            .map(Footnote::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Full blueprint text
    #[must_use]
    pub fn blueprint(&self) -> String {
        let notes = self.footnote_section();
        if notes.is_empty() {
            self.code_section()
        } else {
            format!("{}\n{}", self.code_section(), notes)
        }
    }

    /// New program with every literal (used and unused) rewritten by `f`
    #[must_use]
    pub fn map_literals<F>(&self, mut f: F) -> Program
    where
        F: FnMut(&str, &str) -> String,
    {
        let root = self.root.map_literals(&mut |lit| f(&lit.type_name, &lit.value));
        let unused = self
            .unused_footnotes
            .iter()
            .map(|note| Footnote::new(note.type_name.clone(), f(&note.type_name, &note.value)))
            .collect();
        Program { root, unused_footnotes: unused }
    }

    /// Blend this program with `other`, slot by slot
    ///
    /// Blocks blend their children pairwise (extra children of `self` are
    /// kept as they are), literals of the same type blend through the
    /// registry, and any other pair picks one side at random. The child
    /// keeps this program's unused footnotes.
    #[must_use]
    pub fn blending_crossover(
        &self,
        other: &Program,
        types: &TypeRegistry,
        rng: &mut dyn RngCore,
    ) -> Program {
        let root = blend_points(&self.root, &other.root, types, rng);
        Program {
            root,
            unused_footnotes: self.unused_footnotes.clone(),
        }
    }

    fn with_root(&self, root: Point) -> Program {
        Program {
            root,
            unused_footnotes: self.unused_footnotes.clone(),
        }
    }
}

fn blend_points(a: &Point, b: &Point, types: &TypeRegistry, rng: &mut dyn RngCore) -> Point {
    match (a, b) {
        (Point::Block(x), Point::Block(y)) => {
            let contents = x
                .contents()
                .iter()
                .enumerate()
                .map(|(i, child)| match y.contents().get(i) {
                    Some(partner) => blend_points(child, partner, types, rng),
                    None => child.clone(),
                })
                .collect();
            Point::block(contents)
        }
        (Point::Literal(x), Point::Literal(y)) if x.type_name == y.type_name => {
            let value = types.blend(&x.type_name, &x.value, &y.value, rng);
            Point::literal(x.type_name.clone(), value)
        }
        _ => {
            if rng.gen_bool(0.5) {
                a.clone()
            } else {
                b.clone()
            }
        }
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::empty()
    }
}

impl FromStr for Program {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Program::parse(s)
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.blueprint())
    }
}

impl Serialize for Program {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.blueprint())
    }
}

impl<'de> Deserialize<'de> for Program {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Program::parse(&text).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SAMPLE: &str = "block {\n  do int_add\n  block {\n    ref x\n    value «int»\n  }\n  value «bool»\n}\n«int» 7\n«bool» false\n«float» 2.5";

    #[test]
    fn blueprint_round_trip() {
        let program = Program::parse(SAMPLE).unwrap();
        assert_eq!(program.points(), 6);
        assert_eq!(program.blueprint(), SAMPLE);
        assert_eq!(program.unused_footnotes(), &[Footnote::new("float", "2.5")]);
    }

    #[test]
    fn point_lookup_and_range_errors() {
        let program = Program::parse(SAMPLE).unwrap();
        assert_eq!(program.point(2).unwrap(), &Point::instruction("int_add"));
        assert_eq!(
            program.point(7).unwrap_err(),
            ProgramError::IndexOutOfRange { index: 7, points: 6 }
        );
        assert!(program.point(0).is_err());
    }

    #[test]
    fn delete_keeps_receiver_and_unused_footnotes() {
        let program = Program::parse(SAMPLE).unwrap();
        let child = program.delete_point(3).unwrap();
        assert_eq!(child.points(), 3);
        assert_eq!(program.points(), 6);
        assert_eq!(
            child.blueprint(),
            "block {\n  do int_add\n  value «bool»\n}\n«bool» false\n«float» 2.5"
        );
    }

    #[test]
    fn deleting_root_leaves_empty_block() {
        let program = Program::parse(SAMPLE).unwrap();
        let child = program.delete_point(1).unwrap();
        assert_eq!(child.code_section(), "block {}");
        assert!(program.delete_point(42).unwrap_err().is_index_error());
    }

    #[test]
    fn replace_with_blueprint_carries_footnotes() {
        let program = Program::parse(SAMPLE).unwrap();
        let child = program
            .replace_point_with_blueprint(2, "value «int»\n«int» -1")
            .unwrap();
        assert_eq!(child.point(2).unwrap(), &Point::literal("int", "-1"));
        assert_eq!(child.footnotes()[0], Footnote::new("int", "-1"));
        assert!(matches!(
            program.replace_point_with_blueprint(2, "block {"),
            Err(ProgramError::Parse(_))
        ));
    }

    #[test]
    fn backbone_of_leaf_root_is_itself() {
        let program = Program::parse("do a").unwrap();
        assert_eq!(program.backbone(), &[Point::instruction("a")]);
        let program = Program::parse(SAMPLE).unwrap();
        assert_eq!(program.backbone().len(), 3);
    }

    #[test]
    fn map_literals_rewrites_used_and_unused() {
        let program = Program::parse(SAMPLE).unwrap();
        let child = program.map_literals(|type_name, value| format!("{value}{type_name}"));
        assert_eq!(child.code_section(), program.code_section());
        assert_eq!(
            child.footnotes(),
            vec![
                Footnote::new("int", "7int"),
                Footnote::new("bool", "falsebool"),
                Footnote::new("float", "2.5float"),
            ]
        );
    }

    #[test]
    fn blending_keeps_receiver_shape() {
        let a = Program::parse("block { value «int» do a do b }\n«int» 0").unwrap();
        let b = Program::parse("block { value «int» }\n«int» 10").unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let child = a.blending_crossover(&b, &TypeRegistry::with_builtins(), &mut rng);
        assert_eq!(child.points(), 4);
        let v: i64 = child.footnotes()[0].value.parse().unwrap();
        assert!((0..=10).contains(&v));
    }

    #[test]
    fn display_and_from_str_agree() {
        let program: Program = SAMPLE.parse().unwrap();
        assert_eq!(program.to_string(), SAMPLE);
        assert_eq!(Program::default().to_string(), "block {}");
    }
}
