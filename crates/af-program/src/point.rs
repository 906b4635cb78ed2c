//! Program points
//!
//! A program is a rooted tree of [`Point`]s numbered `1..=N` in pre-order
//! (root = 1). Blocks cache their subtree size so that the point count is
//! O(1) and lookup by index only walks one root-to-point path.

use crate::footnote::Footnote;

/// One addressable node of a program tree
#[derive(Debug, Clone, PartialEq)]
pub enum Point {
    /// `block { ... }`
    Block(Block),
    /// `do name`
    Instruction(String),
    /// `ref name`
    Reference(String),
    /// `value «type»`, linked to its footnote
    Literal(Literal),
}

/// Interior node holding an ordered sequence of child points
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    contents: Vec<Point>,
    points: usize,
}

impl Block {
    /// Create block from its contents
    #[must_use]
    pub fn new(contents: Vec<Point>) -> Self {
        let points = 1 + contents.iter().map(Point::points).sum::<usize>();
        Self { contents, points }
    }

    /// Empty block (`block {}`)
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Child points
    #[inline]
    #[must_use]
    pub fn contents(&self) -> &[Point] {
        &self.contents
    }

    /// Take ownership of the child points
    #[inline]
    #[must_use]
    pub fn into_contents(self) -> Vec<Point> {
        self.contents
    }

    /// Points in this subtree, including the block itself
    #[inline]
    #[must_use]
    pub fn points(&self) -> usize {
        self.points
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::empty()
    }
}

/// Literal reference plus the footnote value it was linked to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    /// Declared literal type
    pub type_name: String,
    /// Literal text, verbatim from the footnote
    pub value: String,
}

impl Literal {
    /// Create literal
    #[inline]
    #[must_use]
    pub fn new(type_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            value: value.into(),
        }
    }

    /// Footnote entry for this literal
    #[inline]
    #[must_use]
    pub fn footnote(&self) -> Footnote {
        Footnote::new(self.type_name.clone(), self.value.clone())
    }
}

impl Point {
    /// `block {}`
    #[inline]
    #[must_use]
    pub fn empty_block() -> Self {
        Point::Block(Block::empty())
    }

    /// Block point from contents
    #[inline]
    #[must_use]
    pub fn block(contents: Vec<Point>) -> Self {
        Point::Block(Block::new(contents))
    }

    /// `do name`
    #[inline]
    #[must_use]
    pub fn instruction(name: impl Into<String>) -> Self {
        Point::Instruction(name.into())
    }

    /// `ref name`
    #[inline]
    #[must_use]
    pub fn reference(name: impl Into<String>) -> Self {
        Point::Reference(name.into())
    }

    /// `value «type»` linked to `value`
    #[inline]
    #[must_use]
    pub fn literal(type_name: impl Into<String>, value: impl Into<String>) -> Self {
        Point::Literal(Literal::new(type_name, value))
    }

    /// Number of points in this subtree
    #[inline]
    #[must_use]
    pub fn points(&self) -> usize {
        match self {
            Point::Block(block) => block.points(),
            _ => 1,
        }
    }

    /// Check whether this is a block
    #[inline]
    #[must_use]
    pub fn is_block(&self) -> bool {
        matches!(self, Point::Block(_))
    }

    /// Child points (empty for leaves)
    #[inline]
    #[must_use]
    pub fn contents(&self) -> &[Point] {
        match self {
            Point::Block(block) => block.contents(),
            _ => &[],
        }
    }

    /// Point at a 1-based pre-order index within this subtree
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Point> {
        if index == 0 || index > self.points() {
            return None;
        }
        let mut current = self;
        let mut local = index;
        loop {
            if local == 1 {
                return Some(current);
            }
            let (child, child_local) = locate_child(current.contents(), local - 1)?;
            current = &current.contents()[child];
            local = child_local;
        }
    }

    /// Copy of this subtree with the point at `index` replaced
    ///
    /// Returns `None` if `index` is outside the subtree.
    #[must_use]
    pub fn replaced(&self, index: usize, replacement: &Point) -> Option<Point> {
        if index == 0 || index > self.points() {
            return None;
        }
        if index == 1 {
            return Some(replacement.clone());
        }
        let (child, child_local) = locate_child(self.contents(), index - 1)?;
        let mut contents = self.contents().to_vec();
        contents[child] = contents[child].replaced(child_local, replacement)?;
        Some(Point::block(contents))
    }

    /// Copy of this subtree with the point at `index` removed from its parent
    ///
    /// Returns `None` for `index == 1` (a point cannot remove itself) or an
    /// index outside the subtree.
    #[must_use]
    pub fn deleted(&self, index: usize) -> Option<Point> {
        if index <= 1 || index > self.points() {
            return None;
        }
        let (child, child_local) = locate_child(self.contents(), index - 1)?;
        let mut contents = self.contents().to_vec();
        if child_local == 1 {
            contents.remove(child);
        } else {
            contents[child] = contents[child].deleted(child_local)?;
        }
        Some(Point::block(contents))
    }

    /// Pre-order iterator over this subtree
    #[inline]
    #[must_use]
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }

    /// Footnotes referenced by this subtree, in traversal order
    #[must_use]
    pub fn footnotes(&self) -> Vec<Footnote> {
        self.iter()
            .filter_map(|p| match p {
                Point::Literal(lit) => Some(lit.footnote()),
                _ => None,
            })
            .collect()
    }

    /// Copy of this subtree with every literal value rewritten
    #[must_use]
    pub fn map_literals<F>(&self, f: &mut F) -> Point
    where
        F: FnMut(&Literal) -> String,
    {
        match self {
            Point::Block(block) => Point::block(
                block
                    .contents()
                    .iter()
                    .map(|child| child.map_literals(f))
                    .collect(),
            ),
            Point::Literal(lit) => Point::literal(lit.type_name.clone(), f(lit)),
            other => other.clone(),
        }
    }

    /// Single-line rendering of the code of this subtree
    #[must_use]
    pub fn compact(&self) -> String {
        match self {
            Point::Block(block) if block.contents().is_empty() => "block {}".to_string(),
            Point::Block(block) => {
                let inner: Vec<String> = block.contents().iter().map(Point::compact).collect();
                format!("block {{ {} }}", inner.join(" "))
            }
            Point::Instruction(name) => format!("do {name}"),
            Point::Reference(name) => format!("ref {name}"),
            Point::Literal(lit) => format!("value «{}»", lit.type_name),
        }
    }

    /// Write the indented code of this subtree, one point per line
    pub(crate) fn write_code(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        out.push_str(&indent);
        match self {
            Point::Block(block) if block.contents().is_empty() => out.push_str("block {}"),
            Point::Block(block) => {
                out.push_str("block {\n");
                for child in block.contents() {
                    child.write_code(out, depth + 1);
                }
                out.push_str(&indent);
                out.push('}');
            }
            Point::Instruction(name) => {
                out.push_str("do ");
                out.push_str(name);
            }
            Point::Reference(name) => {
                out.push_str("ref ");
                out.push_str(name);
            }
            Point::Literal(lit) => {
                out.push_str("value «");
                out.push_str(&lit.type_name);
                out.push('»');
            }
        }
        out.push('\n');
    }

    /// Blueprint text for this subtree on its own: code then its footnotes
    #[must_use]
    pub fn blueprint(&self) -> String {
        let mut out = String::new();
        self.write_code(&mut out, 0);
        let mut text = out.trim_end().to_string();
        for note in self.footnotes() {
            text.push('\n');
            text.push_str(&note.to_string());
        }
        text
    }
}

/// Find which child holds the point at `offset` (1-based, counted from the
/// first child) and its index local to that child
fn locate_child(contents: &[Point], offset: usize) -> Option<(usize, usize)> {
    let mut remaining = offset;
    for (i, child) in contents.iter().enumerate() {
        let size = child.points();
        if remaining <= size {
            return Some((i, remaining));
        }
        remaining -= size;
    }
    None
}

/// Pre-order traversal of a point tree
#[derive(Debug)]
pub struct PreOrder<'a> {
    stack: Vec<&'a Point>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a Point;

    fn next(&mut self) -> Option<Self::Item> {
        let point = self.stack.pop()?;
        self.stack.extend(point.contents().iter().rev());
        Some(point)
    }
}
