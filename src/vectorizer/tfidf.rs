use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::math::vector::ZeroSpVec;
use crate::vectorizer::vocabulary::{RawVector, Vocabulary};

/// TF-IDF weighted document vector
pub type WeightVector = ZeroSpVec<f64>;

/// TF-IDF weighting strategy.
///
/// Implementors only decide how a raw count and a document frequency
/// turn into factors; vector plumbing lives in `IDFVector`.
pub trait TFIDFEngine {
    /// term frequency factor for a raw in-document count (count >= 1)
    fn tf(count: u32) -> f64;
    /// inverse document frequency for a term seen in `doc_freq` of `doc_num` documents
    fn idf(doc_num: u64, doc_freq: u64) -> f64;
}

/// Textbook weighting: `count * ln(N / df)`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTFIDFEngine;

impl TFIDFEngine for DefaultTFIDFEngine {
    #[inline]
    fn tf(count: u32) -> f64 {
        count as f64
    }

    #[inline]
    fn idf(doc_num: u64, doc_freq: u64) -> f64 {
        if doc_freq == 0 || doc_num == 0 {
            return 0.0;
        }
        (doc_num as f64 / doc_freq as f64).ln()
    }
}

/// Sublinear tf: `(1 + ln(count)) * ln(N / df)`
#[derive(Debug, Clone, Copy, Default)]
pub struct SublinearTFIDFEngine;

impl TFIDFEngine for SublinearTFIDFEngine {
    #[inline]
    fn tf(count: u32) -> f64 {
        if count == 0 {
            0.0
        } else {
            1.0 + (count as f64).ln()
        }
    }

    #[inline]
    fn idf(doc_num: u64, doc_freq: u64) -> f64 {
        DefaultTFIDFEngine::idf(doc_num, doc_freq)
    }
}

/// Selects the engine at runtime (configuration side)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TfScheme {
    #[default]
    Raw,
    Log,
}

/// IDF cache: one factor per term id, computed once per vocabulary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IDFVector {
    pub idf_vec: Vec<f64>,
    pub doc_num: u64,
}

impl IDFVector {
    pub fn from_vocabulary<E: TFIDFEngine>(vocab: &Vocabulary) -> Self {
        let doc_num = vocab.doc_num();
        IDFVector {
            idf_vec: vocab.iter().map(|(_, _, df)| E::idf(doc_num, df)).collect(),
            doc_num,
        }
    }

    /// Weight one raw vector. Pure: the vocabulary is not touched.
    ///
    /// Term ids outside the cache cannot occur for vectors built by the same
    /// vocabulary; they are dropped. With `prune` set, zero weights (terms in
    /// every document) are removed to keep the vector sparse.
    pub fn transform<E: TFIDFEngine>(&self, raw: &RawVector, prune: bool) -> WeightVector {
        let idf = &self.idf_vec;
        let mut out = ZeroSpVec::with_capacity(raw.len(), raw.nnz());
        for (i, count) in raw.raw_iter() {
            let Some(&factor) = idf.get(i) else {
                continue;
            };
            let w = E::tf(count) * factor;
            if prune && w == 0.0 {
                continue;
            }
            out.raw_push(i as u32, w);
        }
        out
    }

    /// `transform` across the corpus, in parallel
    pub fn transform_all<E: TFIDFEngine>(&self, raws: &[RawVector], prune: bool) -> Vec<WeightVector> {
        raws.par_iter().map(|raw| self.transform::<E>(raw, prune)).collect()
    }

    /// Runtime-dispatched `from_vocabulary`
    pub fn from_vocabulary_with(scheme: TfScheme, vocab: &Vocabulary) -> Self {
        match scheme {
            TfScheme::Raw => Self::from_vocabulary::<DefaultTFIDFEngine>(vocab),
            TfScheme::Log => Self::from_vocabulary::<SublinearTFIDFEngine>(vocab),
        }
    }

    /// Runtime-dispatched `transform_all`
    pub fn transform_all_with(&self, scheme: TfScheme, raws: &[RawVector], prune: bool) -> Vec<WeightVector> {
        match scheme {
            TfScheme::Raw => self.transform_all::<DefaultTFIDFEngine>(raws, prune),
            TfScheme::Log => self.transform_all::<SublinearTFIDFEngine>(raws, prune),
        }
    }
}

/// One-shot transform against a vocabulary with the default engine
pub fn transform(raw: &RawVector, vocab: &Vocabulary) -> WeightVector {
    IDFVector::from_vocabulary::<DefaultTFIDFEngine>(vocab).transform::<DefaultTFIDFEngine>(raw, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Vocabulary, Vec<RawVector>) {
        let docs = vec![vec!["cat", "animal"], vec!["dog", "animal"], vec!["cat", "dog"]];
        let vocab = Vocabulary::build(&docs).unwrap();
        let raws = vocab.doc2bow_all(&docs);
        (vocab, raws)
    }

    #[test]
    fn idf_matches_ln_n_over_df() {
        let (vocab, raws) = sample();
        let w = transform(&raws[0], &vocab);
        let expected = (3.0f64 / 2.0).ln();
        assert_eq!(w.indices(), &[0, 1]);
        for &v in w.values() {
            assert!((v - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn term_in_every_document_weighs_zero() {
        let docs = vec![vec!["the", "a", "the", "the"], vec!["the", "b"]];
        let vocab = Vocabulary::build(&docs).unwrap();
        let raws = vocab.doc2bow_all(&docs);
        let idf = IDFVector::from_vocabulary::<DefaultTFIDFEngine>(&vocab);
        assert_eq!(idf.idf_vec[0], 0.0);

        let kept = idf.transform::<DefaultTFIDFEngine>(&raws[0], false);
        assert_eq!(kept.get(0), Some(0.0));
        let pruned = idf.transform::<DefaultTFIDFEngine>(&raws[0], true);
        assert_eq!(pruned.indices(), &[1]);
    }

    #[test]
    fn raw_count_scales_weight() {
        let docs = vec![vec!["x", "x", "x"], vec!["y"]];
        let vocab = Vocabulary::build(&docs).unwrap();
        let raws = vocab.doc2bow_all(&docs);
        let idf = IDFVector::from_vocabulary::<DefaultTFIDFEngine>(&vocab);
        let w = idf.transform::<DefaultTFIDFEngine>(&raws[0], true);
        assert!((w.values()[0] - 3.0 * 2f64.ln()).abs() < 1e-12);

        let s = idf.transform::<SublinearTFIDFEngine>(&raws[0], true);
        assert!((s.values()[0] - (1.0 + 3f64.ln()) * 2f64.ln()).abs() < 1e-12);
    }
}
