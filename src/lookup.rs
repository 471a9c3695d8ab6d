//! Headword <-> document id tables.
//!
//! Built once, in lockstep with the document matrix (same id space), then
//! shared read-only by the query engine and the cross-validator.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SimsError};
use crate::utils::normalizer::nfc;

/// What to do when a headword string occurs twice in the corpus
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// last occurrence wins; earlier documents stay in the matrix but are
    /// no longer reachable by name
    #[default]
    Overwrite,
    /// abort the build
    Reject,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadwordLookup {
    by_word: HashMap<String, u32>,
    by_id: Vec<String>,
}

impl HeadwordLookup {
    /// One pass over the headwords in document id order.
    pub fn build<I, S>(headwords: I, policy: DuplicatePolicy) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut lookup = HeadwordLookup::default();
        let mut shadowed = 0usize;
        for (id, head) in headwords.into_iter().enumerate() {
            let word = nfc(head.as_ref()).into_owned();
            if let Some(prev) = lookup.by_word.insert(word.clone(), id as u32) {
                if policy == DuplicatePolicy::Reject {
                    return Err(SimsError::DuplicateHeadword {
                        word,
                        first: prev as usize,
                        second: id,
                    });
                }
                shadowed += 1;
                tracing::debug!(%word, prev, id, "duplicate headword, keeping the later document");
            }
            lookup.by_id.push(word);
        }
        if shadowed > 0 {
            warn!(shadowed, "duplicate headwords shadow earlier documents");
        }
        info!(headwords = lookup.by_id.len(), "headword lookup built");
        Ok(lookup)
    }

    /// Reassemble from the two persisted tables.
    pub fn from_tables(by_word: HashMap<String, u32>, by_id: Vec<String>) -> Result<Self> {
        for (word, &id) in &by_word {
            match by_id.get(id as usize) {
                Some(w) if w == word => {}
                Some(w) => {
                    return Err(SimsError::format(
                        "headword lookup",
                        id as usize + 1,
                        format!("id {id} maps to {word:?} but the id table says {w:?}"),
                    ))
                }
                None => {
                    return Err(SimsError::OutOfRange {
                        id: id as usize,
                        len: by_id.len(),
                    })
                }
            }
        }
        Ok(HeadwordLookup { by_word, by_id })
    }

    pub fn into_tables(self) -> (HashMap<String, u32>, Vec<String>) {
        (self.by_word, self.by_id)
    }

    pub fn word_table(&self) -> &HashMap<String, u32> {
        &self.by_word
    }

    pub fn id_table(&self) -> &[String] {
        &self.by_id
    }

    /// Exact lookup; the caller applies NFC first
    #[inline]
    pub fn lookup_by_word(&self, word: &str) -> Option<u32> {
        self.by_word.get(word).copied()
    }

    /// NFC-normalize `word`, then look it up
    #[inline]
    pub fn lookup_normalized(&self, word: &str) -> Option<u32> {
        self.lookup_by_word(&nfc(word))
    }

    pub fn lookup_by_id(&self, id: usize) -> Result<&str> {
        self.by_id
            .get(id)
            .map(|w| w.as_str())
            .ok_or(SimsError::OutOfRange {
                id,
                len: self.by_id.len(),
            })
    }

    /// number of documents
    #[inline]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Headwords reachable by name, in document id order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.by_id
            .iter()
            .enumerate()
            .filter(|(id, w)| self.by_word.get(w.as_str()) == Some(&(*id as u32)))
            .map(|(id, w)| (id as u32, w.as_str()))
    }

    /// Document ids whose headword was overwritten by a later duplicate
    pub fn shadowed(&self) -> Vec<u32> {
        self.by_id
            .iter()
            .enumerate()
            .filter(|(id, w)| self.by_word.get(w.as_str()) != Some(&(*id as u32)))
            .map(|(id, _)| id as u32)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bidirectional() {
        let lookup = HeadwordLookup::build(["amicus", "hostis", "\u{03C6}\u{03AF}\u{03BB}\u{03BF}\u{03C2}"], DuplicatePolicy::Overwrite).unwrap();
        assert_eq!(lookup.lookup_by_word("hostis"), Some(1));
        assert_eq!(lookup.lookup_by_id(1).unwrap(), "hostis");
        assert_eq!(lookup.lookup_by_word("nemo"), None);
        assert!(matches!(lookup.lookup_by_id(3), Err(SimsError::OutOfRange { id: 3, len: 3 })));
    }

    #[test]
    fn lookup_is_normalization_sensitive() {
        let lookup = HeadwordLookup::build(["\u{03AC}"], DuplicatePolicy::Overwrite).unwrap();
        let decomposed = "\u{03B1}\u{0301}";
        assert_eq!(lookup.lookup_by_word(decomposed), None);
        assert_eq!(lookup.lookup_normalized(decomposed), Some(0));
    }

    #[test]
    fn last_write_wins_and_is_reported() {
        let lookup = HeadwordLookup::build(["a", "b", "a"], DuplicatePolicy::Overwrite).unwrap();
        assert_eq!(lookup.len(), 3);
        assert_eq!(lookup.lookup_by_word("a"), Some(2));
        assert_eq!(lookup.lookup_by_id(0).unwrap(), "a");
        assert_eq!(lookup.shadowed(), vec![0]);
        assert_eq!(lookup.iter().collect::<Vec<_>>(), vec![(1, "b"), (2, "a")]);
    }

    #[test]
    fn reject_policy_aborts() {
        let err = HeadwordLookup::build(["a", "b", "a"], DuplicatePolicy::Reject).unwrap_err();
        assert!(matches!(err, SimsError::DuplicateHeadword { first: 0, second: 2, .. }));
    }

    #[test]
    fn tables_roundtrip_and_validate() {
        let lookup = HeadwordLookup::build(["x", "y"], DuplicatePolicy::Overwrite).unwrap();
        let (by_word, by_id) = lookup.clone().into_tables();
        assert_eq!(HeadwordLookup::from_tables(by_word.clone(), by_id).unwrap(), lookup);

        let bad = HeadwordLookup::from_tables(by_word, vec!["x".to_string()]);
        assert!(bad.is_err());
    }
}
