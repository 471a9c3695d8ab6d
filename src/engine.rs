use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use std::sync::Arc;

use tracing::debug_span;

use crate::error::{Result, SimsError};
use crate::glossary::Glossary;
use crate::lookup::HeadwordLookup;
use crate::query::{filter_ranked, QueryOutcome, ScriptFilter};
use crate::store::ArtifactStore;
use crate::synset::validate::{CancelFlag, CrossValidator, ValidationSummary};
use crate::synset::SynPairSet;
use crate::utils::normalizer::nfc;
use crate::vectorizer::evaluate::index::SimilarityIndex;
use crate::vectorizer::evaluate::scoring::Hits;
use crate::vectorizer::BuiltIndex;

/// A query session over a built or loaded index.
///
/// Parts are shared read-only and cheap to clone; an engine can be handed
/// to several threads. Operations needing a part that is missing fail with
/// `NotReady`.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    lookup: Option<Arc<HeadwordLookup>>,
    index: Option<Arc<SimilarityIndex>>,
    glossary: Option<Arc<Glossary>>,
}

impl Engine {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_built(built: BuiltIndex) -> Self {
        Engine {
            lookup: Some(Arc::new(built.lookup)),
            index: Some(Arc::new(built.index)),
            glossary: None,
        }
    }

    pub fn from_parts(lookup: HeadwordLookup, index: SimilarityIndex) -> Result<Self> {
        if lookup.len() != index.len() {
            return Err(SimsError::DimensionMismatch {
                what: "headwords vs indexed documents",
                expected: lookup.len(),
                found: index.len(),
            });
        }
        Ok(Engine {
            lookup: Some(Arc::new(lookup)),
            index: Some(Arc::new(index)),
            glossary: None,
        })
    }

    /// Lookup tables and similarity index from a data directory.
    pub fn load(store: &ArtifactStore) -> Result<Self> {
        Self::from_parts(store.load_lookup()?, store.load_index()?)
    }

    pub fn with_glossary(mut self, glossary: Glossary) -> Self {
        self.glossary = Some(Arc::new(glossary));
        self
    }

    /// Read a `headword<TAB>gloss` file and attach it.
    pub fn with_glossary_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let glossary = Glossary::read_flat(BufReader::new(File::open(path)?))?;
        Ok(self.with_glossary(glossary))
    }

    pub fn lookup(&self) -> Result<&HeadwordLookup> {
        self.lookup.as_deref().ok_or(SimsError::NotReady("headword lookup"))
    }

    pub fn index(&self) -> Result<&SimilarityIndex> {
        self.index.as_deref().ok_or(SimsError::NotReady("similarity index"))
    }

    pub fn glossary(&self) -> Option<&Glossary> {
        self.glossary.as_deref()
    }

    /// Top `top_k` headwords similar to `word`, optionally restricted to one
    /// script.
    pub fn query(&self, word: &str, top_k: usize, script: ScriptFilter) -> Result<QueryOutcome> {
        self.query_with(word, top_k, |candidate| script.map_or(true, |s| s.matches(candidate)))
    }

    /// `query` with an arbitrary candidate predicate, applied after ranking.
    pub fn query_with<F>(&self, word: &str, top_k: usize, filter: F) -> Result<QueryOutcome>
    where
        F: Fn(&str) -> bool,
    {
        let lookup = self.lookup()?;
        let index = self.index()?;
        let word = nfc(word);
        let _span = debug_span!("query", word = %word, top_k).entered();

        let Some(doc) = lookup.lookup_by_word(&word) else {
            return Ok(QueryOutcome::NotIndexed(word.into_owned()));
        };
        let ranked = index.ranked(doc as usize)?;
        let hits = filter_ranked(ranked, lookup, self.glossary(), top_k, filter)?;
        Ok(QueryOutcome::Hits(hits))
    }

    /// Full ranked neighbour list of document `doc`
    pub fn ranked(&self, doc: usize) -> Result<Hits> {
        self.index()?.ranked(doc)
    }

    /// Cosine similarity of two headwords; `None` if either is not indexed
    pub fn similarity(&self, a: &str, b: &str) -> Result<Option<f64>> {
        let lookup = self.lookup()?;
        let index = self.index()?;
        match (lookup.lookup_normalized(a), lookup.lookup_normalized(b)) {
            (Some(a), Some(b)) => index.similarity(a as usize, b as usize).map(Some),
            _ => Ok(None),
        }
    }

    pub fn cross_validate<W: Write>(
        &self,
        pairs: &SynPairSet,
        writer: W,
        cancel: &CancelFlag,
    ) -> Result<ValidationSummary> {
        CrossValidator::new(self.lookup()?, self.index()?).run(pairs, writer, cancel)
    }
}
