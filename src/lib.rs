//! This crate is a headword similarity engine: TF-IDF vectors over dictionary
//! definitions, ranked against each other by cosine similarity.

pub mod config;
pub mod engine;
pub mod error;
pub mod glossary;
pub mod lookup;
pub mod query;
pub mod store;
pub mod synset;
pub mod utils;
pub mod vectorizer;

/// Error type and result alias
/// `SimsError` covers corrupt artifacts, sequencing mistakes, out-of-range ids
/// and construction-time inconsistencies.
/// Missing headwords and unresolved synonym pairs are *not* errors.
pub use error::{Result, SimsError};

/// Query Engine
/// The top-level session type of this crate.
/// It holds the headword lookup, the similarity index and, optionally, a
/// glossary of display definitions, all shared read-only behind `Arc`.
///
/// An `Engine` is created from a fresh build (`Engine::from_built`) or from
/// a data directory (`Engine::load`). Operations on a part that has not been
/// provided fail with `SimsError::NotReady`.
pub use engine::Engine;

/// Batch Index Build
/// `build_index` turns corpus records into a `BuiltIndex`:
/// - The vocabulary with per-term document frequencies
/// - The headword lookup
/// - The TF-IDF document matrix
/// - The sharded similarity index
///
/// Every part shares one document id space.
pub use vectorizer::{build_index, BuiltIndex};

/// Corpus records and the flat dictionary reader
pub use vectorizer::corpus::{read_flat_dictionary, CorpusRecord};

/// Vocabulary
/// Bidirectional term <-> id table with document frequencies.
/// Ids are dense and assigned in first-seen order.
pub use vectorizer::vocabulary::Vocabulary;

/// TF IDF Calculation Engine Trait
/// A trait that defines how raw counts and document frequencies become
/// weights.
/// `DefaultTFIDFEngine` computes `count * ln(N / df)`,
/// `SublinearTFIDFEngine` uses `1 + ln(count)` as the tf factor.
pub use vectorizer::tfidf::{DefaultTFIDFEngine, IDFVector, SublinearTFIDFEngine, TFIDFEngine, TfScheme};

/// Document Matrix
/// One sparse TF-IDF row per document, serialized as Matrix Market
/// coordinate text.
pub use vectorizer::matrix::DocumentMatrix;

/// Similarity Index
/// Sharded cosine similarity with deterministic ranking
/// (score descending, document id ascending).
pub use vectorizer::evaluate::index::SimilarityIndex;

/// Search Hits and Hit Entry structures
/// - `Hits`: a ranked neighbour list, self excluded
/// - `HitEntry`: one (document id, score) entry
/// - `RankMap`: id -> rank position for O(1) reciprocal rank lookups
pub use vectorizer::evaluate::scoring::{HitEntry, Hits, RankMap};

pub use config::Config;
pub use glossary::Glossary;
pub use lookup::{DuplicatePolicy, HeadwordLookup};
pub use query::{export_translations, QueryHit, QueryOutcome, Script, ScriptFilter, TranslateDirection};
pub use store::ArtifactStore;
pub use synset::validate::{CancelFlag, CrossValidator, PairReport, ValidationSummary};
pub use synset::{parse_synsets, PairKey, SynPair, SynPairSet, SynsetRecord};
