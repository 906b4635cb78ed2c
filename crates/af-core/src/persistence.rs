//! Persistence boundary
//!
//! Stores receive whole batches. An answer without an external identifier
//! is inserted and gets one; an answer that carries one is an update and
//! must present the revision the store currently holds.

use crate::answer::{Answer, AnswerRecord};
use crate::error::StoreError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Outcome of saving one answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveReceipt {
    /// Identifier the store filed the answer under
    pub external_id: String,
    /// Revision now held by the store
    pub revision: String,
    /// `true` for a fresh document, `false` for an update
    pub inserted: bool,
}

/// Document store for answers
pub trait AnswerStore {
    /// Save every answer, writing the assigned identifiers and revisions
    /// back into them
    ///
    /// # Errors
    /// Returns [`StoreError`] when an update is stale or names an unknown
    /// document; no answer is saved in that case
    fn bulk_save(&mut self, answers: &mut [Answer]) -> Result<Vec<SaveReceipt>, StoreError>;

    /// Load the record saved under `external_id`
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] for an unknown identifier
    fn load(&self, external_id: &str) -> Result<AnswerRecord, StoreError>;
}

#[derive(Debug, Clone)]
struct Document {
    generation: u64,
    revision: String,
    body: serde_json::Value,
}

/// In-process [`AnswerStore`] holding JSON documents
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: IndexMap<String, Document>,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Current revision of a document
    #[must_use]
    pub fn revision(&self, external_id: &str) -> Option<&str> {
        self.documents.get(external_id).map(|d| d.revision.as_str())
    }

    fn check(&self, answer: &Answer) -> Result<(), StoreError> {
        let Some(id) = answer.external_id() else {
            return Ok(());
        };
        let document = self
            .documents
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if answer.external_revision() != Some(document.revision.as_str()) {
            return Err(StoreError::Conflict {
                id: id.to_string(),
                held: answer.external_revision().map(str::to_string),
                current: document.revision.clone(),
            });
        }
        Ok(())
    }
}

impl AnswerStore for MemoryStore {
    fn bulk_save(&mut self, answers: &mut [Answer]) -> Result<Vec<SaveReceipt>, StoreError> {
        for answer in answers.iter() {
            self.check(answer)?;
        }

        let mut receipts = Vec::with_capacity(answers.len());
        for answer in answers.iter_mut() {
            let body = serde_json::to_value(answer.record())?;
            let (external_id, inserted) = match answer.external_id() {
                Some(id) => (id.to_string(), false),
                None => (answer.id().to_string(), true),
            };
            let generation = self
                .documents
                .get(&external_id)
                .map_or(1, |d| d.generation + 1);
            let revision = format!("{generation}-{}", Ulid::new());
            self.documents.insert(
                external_id.clone(),
                Document {
                    generation,
                    revision: revision.clone(),
                    body,
                },
            );
            answer.set_external(external_id.clone(), revision.clone());
            receipts.push(SaveReceipt {
                external_id,
                revision,
                inserted,
            });
        }

        let inserted = receipts.iter().filter(|r| r.inserted).count();
        tracing::debug!(
            inserted,
            updated = receipts.len() - inserted,
            "answers saved"
        );
        Ok(receipts)
    }

    fn load(&self, external_id: &str) -> Result<AnswerRecord, StoreError> {
        let document = self
            .documents
            .get(external_id)
            .ok_or_else(|| StoreError::NotFound(external_id.to_string()))?;
        Ok(serde_json::from_value(document.body.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_then_update_bumps_revision() {
        let mut store = MemoryStore::new();
        let mut answers = vec![Answer::parse("do a").unwrap(), Answer::parse("ref x").unwrap()];

        let first = store.bulk_save(&mut answers).unwrap();
        assert_eq!(store.len(), 2);
        assert!(first.iter().all(|r| r.inserted && r.revision.starts_with("1-")));
        assert_eq!(answers[0].external_id(), Some(first[0].external_id.as_str()));

        answers[0].set_score("error", 2.5).unwrap();
        let second = store.bulk_save(&mut answers[..1]).unwrap();
        assert!(!second[0].inserted);
        assert!(second[0].revision.starts_with("2-"));
        assert_eq!(store.len(), 2);

        let record = store.load(&second[0].external_id).unwrap();
        assert_eq!(record.scores.get("error"), Some(&2.5));
        assert_eq!(record.blueprint, "do a");
    }

    #[test]
    fn stale_revision_conflicts_without_saving() {
        let mut store = MemoryStore::new();
        let mut answers = vec![Answer::parse("do a").unwrap()];
        store.bulk_save(&mut answers).unwrap();

        let mut stale = answers.clone();
        store.bulk_save(&mut answers).unwrap();
        let current = store.revision(answers[0].external_id().unwrap()).unwrap().to_string();

        stale.push(Answer::parse("do b").unwrap());
        let err = store.bulk_save(&mut stale).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { current: ref c, .. } if *c == current));
        assert_eq!(store.len(), 1);
        assert!(stale[1].external_id().is_none());
    }

    #[test]
    fn missing_document() {
        let store = MemoryStore::new();
        assert!(matches!(store.load("nope"), Err(StoreError::NotFound(_))));
    }
}
