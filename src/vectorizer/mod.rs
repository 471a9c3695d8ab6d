pub mod corpus;
pub mod evaluate;
pub mod matrix;
pub mod serde;
pub mod tfidf;
pub mod vocabulary;

use tracing::{info, info_span};

use crate::config::Config;
use crate::error::{Result, SimsError};
use crate::lookup::HeadwordLookup;
use crate::vectorizer::corpus::{split_records, CorpusRecord};
use crate::vectorizer::evaluate::index::SimilarityIndex;
use crate::vectorizer::matrix::DocumentMatrix;
use crate::vectorizer::tfidf::IDFVector;
use crate::vectorizer::vocabulary::Vocabulary;

/// Everything one batch build produces.
///
/// `lookup` and `index` share one document id space. The weighted matrix
/// lives inside `index`; `SimilarityIndex::write_market` persists it.
#[derive(Debug)]
pub struct BuiltIndex {
    pub vocabulary: Vocabulary,
    pub lookup: HeadwordLookup,
    pub index: SimilarityIndex,
}

/// Batch build from corpus records, in document id order.
///
/// headwords -> lookup, tokens -> vocabulary -> raw counts -> TF-IDF ->
/// matrix -> similarity index. Any failure aborts the whole build.
pub fn build_index(records: Vec<CorpusRecord>, config: &Config) -> Result<BuiltIndex> {
    let _span = info_span!("build_index", documents = records.len()).entered();
    let (headwords, corpus) = split_records(records);

    let lookup = HeadwordLookup::build(&headwords, config.headwords.on_duplicate)?;
    let vocabulary = Vocabulary::build(&corpus)?;
    let raws = vocabulary.doc2bow_all(&corpus);
    drop(corpus);

    let idf = IDFVector::from_vocabulary_with(config.index.tf, &vocabulary);
    let weighted = idf.transform_all_with(config.index.tf, &raws, config.index.prune_zero_weights);
    let matrix = DocumentMatrix::new(weighted, vocabulary.len())?;
    if matrix.len() != lookup.len() {
        return Err(SimsError::DimensionMismatch {
            what: "matrix rows vs headwords",
            expected: lookup.len(),
            found: matrix.len(),
        });
    }
    info!(
        documents = matrix.len(),
        terms = matrix.n_terms(),
        nnz = matrix.nnz(),
        "document matrix built"
    );

    let index = SimilarityIndex::build(matrix, config.index.shard_size);
    Ok(BuiltIndex {
        vocabulary,
        lookup,
        index,
    })
}
