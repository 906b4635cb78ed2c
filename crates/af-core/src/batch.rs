//! Batches: ordered groups of answers moving through a stage together

use crate::answer::{Answer, AnswerId};
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

/// Ordered collection of answers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Batch(Vec<Answer>);

impl Batch {
    /// Create empty batch
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Create empty batch with room for `capacity` answers
    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    /// Identifiers, in order
    #[must_use]
    pub fn ids(&self) -> Vec<AnswerId> {
        self.0.iter().map(Answer::id).collect()
    }

    /// Blueprints, in order
    #[must_use]
    pub fn blueprints(&self) -> Vec<String> {
        self.0.iter().map(Answer::blueprint).collect()
    }

    /// Take the answers out
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Vec<Answer> {
        self.0
    }
}

impl Deref for Batch {
    type Target = Vec<Answer>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Batch {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<Answer>> for Batch {
    fn from(answers: Vec<Answer>) -> Self {
        Self(answers)
    }
}

impl FromIterator<Answer> for Batch {
    fn from_iter<I: IntoIterator<Item = Answer>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Batch {
    type Item = Answer;
    type IntoIter = std::vec::IntoIter<Answer>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Answer;
    type IntoIter = std::slice::Iter<'a, Answer>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Extend<Answer> for Batch {
    fn extend<I: IntoIterator<Item = Answer>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}
