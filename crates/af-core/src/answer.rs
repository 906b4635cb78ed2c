//! Answers: programs with scores, lineage and tags
//!
//! An answer is immutable after creation except for score assignment,
//! tag edits and the identifiers a persistence collaborator stamps on it.

use crate::error::ArgumentError;
use af_program::{ParseError, Point, Program, ProgramError};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use ulid::Ulid;

static KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("key pattern is valid"));

/// Check a score or tag key against `[A-Za-z_][A-Za-z0-9_]*`
#[inline]
#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    KEY.is_match(key)
}

fn checked_key(key: &str) -> Result<String, ArgumentError> {
    if is_valid_key(key) {
        Ok(key.to_string())
    } else {
        Err(ArgumentError::InvalidKey(key.to_string()))
    }
}

/// Default category used to group answers for blending
pub const DEFAULT_LANGUAGE: &str = "nudge";

/// Unique answer identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnswerId(pub Ulid);

impl AnswerId {
    /// Generate new answer ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for AnswerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnswerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Candidate solution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    id: AnswerId,
    program: Program,
    scores: BTreeMap<String, f64>,
    progress: u64,
    ancestors: Vec<AnswerId>,
    tags: BTreeSet<String>,
    timestamp: DateTime<Utc>,
    language: String,
    external_id: Option<String>,
    external_revision: Option<String>,
}

impl Answer {
    /// Wrap a program as a fresh answer with progress 0
    #[must_use]
    pub fn new(program: Program) -> Self {
        Self {
            id: AnswerId::new(),
            program,
            scores: BTreeMap::new(),
            progress: 0,
            ancestors: Vec::new(),
            tags: BTreeSet::new(),
            timestamp: Utc::now(),
            language: DEFAULT_LANGUAGE.to_string(),
            external_id: None,
            external_revision: None,
        }
    }

    /// Parse a blueprint into a fresh answer
    ///
    /// # Errors
    /// Returns [`ParseError`] if the blueprint does not parse
    pub fn parse(blueprint: &str) -> Result<Self, ParseError> {
        Program::parse(blueprint).map(Self::new)
    }

    /// Set generation counter
    #[inline]
    #[must_use]
    pub fn with_progress(mut self, progress: u64) -> Self {
        self.progress = progress;
        self
    }

    /// Set parent identifiers
    #[inline]
    #[must_use]
    pub fn with_ancestors(mut self, ancestors: Vec<AnswerId>) -> Self {
        self.ancestors = ancestors;
        self
    }

    /// Set category
    #[inline]
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Child of `parents`: progress one past the furthest parent, same
    /// language as the first
    #[must_use]
    pub fn offspring(program: Program, parents: &[&Answer]) -> Self {
        let progress = parents.iter().map(|p| p.progress).max().map_or(0, |p| p + 1);
        let language = parents
            .first()
            .map_or(DEFAULT_LANGUAGE, |p| p.language.as_str())
            .to_string();
        Self::new(program)
            .with_progress(progress)
            .with_ancestors(parents.iter().map(|p| p.id).collect())
            .with_language(language)
    }

    /// Identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> AnswerId {
        self.id
    }

    /// Genome
    #[inline]
    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Blueprint text of the genome
    #[must_use]
    pub fn blueprint(&self) -> String {
        self.program.blueprint()
    }

    /// Point count of the genome
    #[inline]
    #[must_use]
    pub fn points(&self) -> usize {
        self.program.points()
    }

    /// Generation counter
    #[inline]
    #[must_use]
    pub fn progress(&self) -> u64 {
        self.progress
    }

    /// Parent identifiers
    #[inline]
    #[must_use]
    pub fn ancestors(&self) -> &[AnswerId] {
        &self.ancestors
    }

    /// Creation time
    #[inline]
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Category used for blending
    #[inline]
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// All scores
    #[inline]
    #[must_use]
    pub fn scores(&self) -> &BTreeMap<String, f64> {
        &self.scores
    }

    /// Score for one criterion
    #[inline]
    #[must_use]
    pub fn score(&self, criterion: &str) -> Option<f64> {
        self.scores.get(criterion).copied()
    }

    /// Assign a score, overwriting any previous value
    ///
    /// # Errors
    /// Returns [`ArgumentError::InvalidKey`] for a non identifier-like name
    pub fn set_score(&mut self, criterion: &str, value: f64) -> Result<(), ArgumentError> {
        self.scores.insert(checked_key(criterion)?, value);
        Ok(())
    }

    /// Criteria with a score, sorted
    #[must_use]
    pub fn known_criteria(&self) -> Vec<&str> {
        self.scores.keys().map(String::as_str).collect()
    }

    /// Scores in the given order, `None` where missing
    #[must_use]
    pub fn score_vector<S: AsRef<str>>(&self, ordering: &[S]) -> Vec<Option<f64>> {
        ordering.iter().map(|k| self.score(k.as_ref())).collect()
    }

    /// Check whether `other` dominates this answer on `criteria`
    ///
    /// Lower is better. Returns true only when both answers know the same
    /// subset of `criteria`, every score of this answer is at least the
    /// other's, and at least one is strictly greater. A missing score on
    /// either side makes the answers incomparable.
    #[must_use]
    pub fn dominated_by<S: AsRef<str>>(&self, other: &Answer, criteria: &[S]) -> bool {
        let mine: BTreeSet<&str> = criteria
            .iter()
            .map(AsRef::<str>::as_ref)
            .filter(|c| self.scores.contains_key(*c))
            .collect();
        let theirs: BTreeSet<&str> = criteria
            .iter()
            .map(AsRef::<str>::as_ref)
            .filter(|c| other.scores.contains_key(*c))
            .collect();
        if mine != theirs {
            return false;
        }

        let mut could_be_identical = true;
        for criterion in criteria {
            let (Some(my_score), Some(other_score)) =
                (self.score(criterion.as_ref()), other.score(criterion.as_ref()))
            else {
                return false;
            };
            if my_score < other_score {
                return false;
            }
            could_be_identical = could_be_identical && my_score == other_score;
        }
        !could_be_identical
    }

    /// [`Answer::dominated_by`] over this answer's known criteria
    #[must_use]
    pub fn dominated_by_known(&self, other: &Answer) -> bool {
        let criteria: Vec<String> = self.scores.keys().cloned().collect();
        self.dominated_by(other, &criteria)
    }

    /// Labels
    #[inline]
    #[must_use]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Check for a label
    #[inline]
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Add a label; returns false if it was already present
    ///
    /// # Errors
    /// Returns [`ArgumentError::InvalidKey`] for a non identifier-like label
    pub fn add_tag(&mut self, tag: &str) -> Result<bool, ArgumentError> {
        Ok(self.tags.insert(checked_key(tag)?))
    }

    /// Remove a label; returns whether it was present
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(tag)
    }

    /// Genome with point `index` deleted, or a copy if the index is invalid
    #[must_use]
    pub fn delete_point_or_clone(&self, index: usize) -> Program {
        self.program.delete_point(index).unwrap_or_else(|err| {
            tracing::debug!(answer = %self.id, error = %err, "delete fell back to clone");
            self.program.deep_copy()
        })
    }

    /// Genome with point `index` replaced, or a copy if the index is invalid
    #[must_use]
    pub fn replace_point_or_clone(&self, index: usize, replacement: &Point) -> Program {
        self.program
            .replace_point(index, replacement)
            .unwrap_or_else(|err| {
                tracing::debug!(answer = %self.id, error = %err, "replace fell back to clone");
                self.program.deep_copy()
            })
    }

    /// Like [`Answer::replace_point_or_clone`], with the replacement given
    /// as blueprint text
    ///
    /// # Errors
    /// Returns [`ArgumentError::UnparseableReplacement`] if the text does
    /// not parse
    pub fn replace_point_or_clone_with_blueprint(
        &self,
        index: usize,
        blueprint: &str,
    ) -> Result<Program, ArgumentError> {
        match self.program.replace_point_with_blueprint(index, blueprint) {
            Ok(child) => Ok(child),
            Err(ProgramError::Parse(err)) => Err(ArgumentError::UnparseableReplacement(err)),
            Err(err @ ProgramError::IndexOutOfRange { .. }) => {
                tracing::debug!(answer = %self.id, error = %err, "replace fell back to clone");
                Ok(self.program.deep_copy())
            }
        }
    }

    /// Identifier assigned by a persistence collaborator
    #[inline]
    #[must_use]
    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    /// Revision assigned by a persistence collaborator
    #[inline]
    #[must_use]
    pub fn external_revision(&self) -> Option<&str> {
        self.external_revision.as_deref()
    }

    /// Record where a store saved this answer
    pub fn set_external(&mut self, id: impl Into<String>, revision: impl Into<String>) {
        self.external_id = Some(id.into());
        self.external_revision = Some(revision.into());
    }

    /// Serialisable snapshot for persistence collaborators
    #[must_use]
    pub fn record(&self) -> AnswerRecord {
        AnswerRecord {
            id: self.id,
            blueprint: self.blueprint(),
            tags: self.tags.clone(),
            scores: self.scores.clone(),
            timestamp: self.timestamp,
            progress: self.progress,
            ancestors: self.ancestors.clone(),
            language: self.language.clone(),
        }
    }
}

/// Persisted form of an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// Answer identifier
    pub id: AnswerId,
    /// Blueprint text
    pub blueprint: String,
    /// Labels
    pub tags: BTreeSet<String>,
    /// Scores by criterion
    pub scores: BTreeMap<String, f64>,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Generation counter
    pub progress: u64,
    /// Parent identifiers
    pub ancestors: Vec<AnswerId>,
    /// Category
    pub language: String,
}
