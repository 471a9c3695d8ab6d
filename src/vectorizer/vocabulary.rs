use indexmap::IndexSet;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, SimsError};
use crate::utils::math::vector::ZeroSpVec;

/// Raw bag-of-words: term id -> occurrence count in one document
pub type RawVector = ZeroSpVec<u32>;

/// Term table with per-term document frequency.
///
/// The position of a term in `terms` is its id, so ids are dense and
/// assigned in first-seen order. Once assigned an id never changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vocabulary {
    terms: IndexSet<Box<str>>,
    /// documents containing term `i` at least once
    doc_freq: Vec<u64>,
    /// total documents seen during the build (N)
    doc_num: u64,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single pass over the corpus.
    ///
    /// A term's document frequency is incremented once per document it
    /// appears in, however often it repeats there. Empty documents are legal.
    /// A token that is empty or contains whitespace makes the document
    /// malformed and aborts the build.
    pub fn build<D, T>(corpus: &[D]) -> Result<Self>
    where
        D: AsRef<[T]>,
        T: AsRef<str>,
    {
        let mut vocab = Vocabulary::new();
        // doc index + 1 of the last document that counted the term
        let mut last_seen: Vec<usize> = Vec::new();

        for (doc, tokens) in corpus.iter().enumerate() {
            for token in tokens.as_ref() {
                let token = token.as_ref();
                check_token(doc, token)?;
                let (id, inserted) = vocab.terms.insert_full(Box::from(token));
                if inserted {
                    vocab.doc_freq.push(0);
                    last_seen.push(0);
                }
                if last_seen[id] != doc + 1 {
                    last_seen[id] = doc + 1;
                    vocab.doc_freq[id] += 1;
                }
            }
        }
        vocab.doc_num = corpus.len() as u64;
        vocab.terms.shrink_to_fit();

        info!(
            documents = vocab.doc_num,
            terms = vocab.len(),
            "vocabulary built"
        );
        Ok(vocab)
    }

    /// number of distinct terms (term-id cardinality)
    #[inline]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    #[inline]
    pub fn doc_num(&self) -> u64 {
        self.doc_num
    }

    #[inline]
    pub fn id_of(&self, term: &str) -> Option<u32> {
        self.terms.get_index_of(term).map(|i| i as u32)
    }

    #[inline]
    pub fn term(&self, id: u32) -> Option<&str> {
        self.terms.get_index(id as usize).map(|t| t.as_ref())
    }

    #[inline]
    pub fn doc_freq(&self, id: u32) -> Option<u64> {
        self.doc_freq.get(id as usize).copied()
    }

    /// Iterate `(id, term, df)` in id order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str, u64)> + '_ {
        self.terms
            .iter()
            .zip(self.doc_freq.iter())
            .enumerate()
            .map(|(i, (t, &df))| (i as u32, t.as_ref(), df))
    }

    /// Raw term-count vector of one document.
    /// Tokens unknown to the vocabulary are ignored.
    pub fn doc2bow<T: AsRef<str>>(&self, tokens: &[T]) -> RawVector {
        let mut inds = Vec::with_capacity(tokens.len());
        for token in tokens {
            if let Some(id) = self.id_of(token.as_ref()) {
                inds.push(id);
            }
        }
        let vals = vec![1u32; inds.len()];
        let mut bow = ZeroSpVec::from_parts(self.len(), inds, vals);
        bow.shrink_to_fit();
        bow
    }

    /// `doc2bow` for every document, in parallel
    pub fn doc2bow_all<D, T>(&self, corpus: &[D]) -> Vec<RawVector>
    where
        D: AsRef<[T]> + Sync,
        T: AsRef<str> + Sync,
    {
        corpus
            .par_iter()
            .map(|doc| self.doc2bow(doc.as_ref()))
            .collect()
    }

    /// Structural consistency of a deserialized table
    pub(crate) fn check(&self) -> Result<()> {
        if self.doc_freq.len() != self.terms.len() {
            return Err(SimsError::DimensionMismatch {
                what: "vocabulary document frequencies",
                expected: self.terms.len(),
                found: self.doc_freq.len(),
            });
        }
        if let Some(pos) = self
            .doc_freq
            .iter()
            .position(|&df| df == 0 || df > self.doc_num)
        {
            return Err(SimsError::format(
                "vocabulary",
                pos + 1,
                format!("document frequency {} outside 1..={}", self.doc_freq[pos], self.doc_num),
            ));
        }
        Ok(())
    }
}

fn check_token(doc: usize, token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(SimsError::MalformedDocument {
            doc,
            reason: "empty token".to_string(),
        });
    }
    if token.chars().any(char::is_whitespace) {
        return Err(SimsError::MalformedDocument {
            doc,
            reason: format!("token {token:?} contains whitespace"),
        });
    }
    Ok(())
}
