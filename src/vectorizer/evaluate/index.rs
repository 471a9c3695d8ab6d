use std::io::Write;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug_span, info};

use crate::error::{Result, SimsError};
use crate::utils::sort::top_k_in_place;
use crate::vectorizer::evaluate::scoring::Hits;
use crate::vectorizer::evaluate::shard::{cosine, MemoryShards, Shard, ShardSource};
use crate::vectorizer::matrix::{write_market_header, write_market_row, DocumentMatrix};
use crate::vectorizer::tfidf::WeightVector;

/// Pairwise cosine similarity over the document matrix.
///
/// Documents are split into fixed-size shards. Every query scans all shards
/// in parallel, keeps a partial top-k per shard and merges them; the ranked
/// output does not depend on the shard size. Norms are computed once at
/// build time. The index is read-only and can be queried from many threads.
#[derive(Debug)]
pub struct SimilarityIndex {
    n_terms: usize,
    shard_size: usize,
    norms: Vec<f64>,
    shards: Box<dyn ShardSource>,
}

impl SimilarityIndex {
    /// Build an in-memory index.
    /// `shard_size == 0` keeps the whole matrix in a single block.
    pub fn build(matrix: DocumentMatrix, shard_size: usize) -> Self {
        let n_terms = matrix.n_terms();
        let n_docs = matrix.len();
        let shard_size = effective_shard_size(shard_size, n_docs);

        let mut docs = matrix.into_docs();
        let mut blocks: Vec<Vec<WeightVector>> = Vec::with_capacity(n_docs.div_ceil(shard_size));
        while !docs.is_empty() {
            let rest = docs.split_off(docs.len().min(shard_size));
            blocks.push(std::mem::replace(&mut docs, rest));
        }
        let shards: Vec<Shard> = blocks
            .into_par_iter()
            .enumerate()
            .map(|(i, block)| Shard::new((i * shard_size) as u32, block))
            .collect();
        let norms = shards.iter().flat_map(|s| s.norms.iter().copied()).collect();

        info!(
            documents = n_docs,
            terms = n_terms,
            shards = shards.len(),
            shard_size,
            "similarity index built"
        );
        SimilarityIndex {
            n_terms,
            shard_size,
            norms,
            shards: Box::new(MemoryShards::new(shards)),
        }
    }

    /// Reassemble an index from persisted parts.
    pub fn from_parts(
        n_terms: usize,
        shard_size: usize,
        norms: Vec<f64>,
        shards: Box<dyn ShardSource>,
    ) -> Result<Self> {
        let shard_size = effective_shard_size(shard_size, norms.len());
        let expected = norms.len().div_ceil(shard_size);
        if shards.shard_count() != expected {
            return Err(SimsError::DimensionMismatch {
                what: "shard count",
                expected,
                found: shards.shard_count(),
            });
        }
        Ok(SimilarityIndex {
            n_terms,
            shard_size,
            norms,
            shards,
        })
    }

    /// number of documents
    #[inline]
    pub fn len(&self) -> usize {
        self.norms.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.norms.is_empty()
    }

    #[inline]
    pub fn n_terms(&self) -> usize {
        self.n_terms
    }

    #[inline]
    pub fn shard_size(&self) -> usize {
        self.shard_size
    }

    #[inline]
    pub fn shard_count(&self) -> usize {
        self.shards.shard_count()
    }

    #[inline]
    pub fn norms(&self) -> &[f64] {
        &self.norms
    }

    pub fn shard_source(&self) -> &dyn ShardSource {
        self.shards.as_ref()
    }

    /// Shard `shard`, checked against this index's layout and norms.
    pub fn load_shard(&self, shard: usize) -> Result<Arc<Shard>> {
        let loaded = self.shards.load(shard)?;
        loaded.check_layout(shard, self.shard_size, &self.norms)?;
        Ok(loaded)
    }

    /// Load and check every shard up front.
    pub fn check_shards(&self) -> Result<()> {
        (0..self.shard_count()).try_for_each(|i| self.load_shard(i).map(drop))
    }

    #[inline]
    fn check_id(&self, doc: usize) -> Result<()> {
        if doc >= self.len() {
            return Err(SimsError::OutOfRange {
                id: doc,
                len: self.len(),
            });
        }
        Ok(())
    }

    /// Matrix Market text of the indexed documents, written shard by shard
    /// so no second copy of the matrix is assembled.
    pub fn write_market<W: Write>(&self, mut w: W) -> Result<()> {
        let nnz = (0..self.shard_count())
            .map(|i| self.load_shard(i).map(|s| s.docs.iter().map(|d| d.nnz()).sum::<usize>()))
            .sum::<Result<usize>>()?;
        write_market_header(&mut w, self.len(), self.n_terms, nnz)?;
        for i in 0..self.shard_count() {
            let shard = self.load_shard(i)?;
            for (offset, doc) in shard.docs.iter().enumerate() {
                write_market_row(&mut w, shard.start as usize + offset, doc)?;
            }
        }
        w.flush()?;
        Ok(())
    }

    /// Copy every row back out into a `DocumentMatrix`.
    pub fn to_matrix(&self) -> Result<DocumentMatrix> {
        let mut docs = Vec::with_capacity(self.len());
        for i in 0..self.shard_count() {
            docs.extend(self.load_shard(i)?.docs.iter().cloned());
        }
        DocumentMatrix::new(docs, self.n_terms)
    }

    /// TF-IDF vector of one document (loads its shard)
    pub fn vector(&self, doc: usize) -> Result<WeightVector> {
        self.check_id(doc)?;
        let shard = self.load_shard(doc / self.shard_size)?;
        shard.get(doc).cloned().ok_or(SimsError::DimensionMismatch {
            what: "shard coverage",
            expected: doc,
            found: shard.start as usize + shard.len(),
        })
    }

    /// Cosine similarity of two documents. Symmetric; 1 for a non-zero
    /// document against itself, 0 when either vector is all zero.
    pub fn similarity(&self, a: usize, b: usize) -> Result<f64> {
        let va = self.vector(a)?;
        let vb = if a == b { va.clone() } else { self.vector(b)? };
        Ok(cosine(va.dot(&vb), self.norms[a], self.norms[b]))
    }

    /// Best `k` neighbours of `query`, excluding itself.
    pub fn top_k(&self, query: usize, k: usize) -> Result<Hits> {
        self.check_id(query)?;
        let _span = debug_span!("top_k", query, k).entered();

        let qv = self.vector(query)?;
        let q_norm = self.norms[query];
        let mut dense = vec![0.0; self.n_terms];
        qv.scatter_into(&mut dense);

        let partials = (0..self.shards.shard_count())
            .into_par_iter()
            .map(|i| {
                let shard = self.load_shard(i)?;
                Ok(shard.search(query as u32, &dense, q_norm, k))
            })
            .collect::<Result<Vec<_>>>()?;

        // final reduction: combine, re-rank, truncate
        let mut merged: Vec<(u32, f64)> = partials.into_iter().flatten().collect();
        top_k_in_place(&mut merged, k);
        Ok(Hits::from_ranked(query as u32, merged))
    }

    /// Full ranked list of every other document
    pub fn ranked(&self, query: usize) -> Result<Hits> {
        self.top_k(query, self.len().saturating_sub(1))
    }
}

#[inline]
fn effective_shard_size(shard_size: usize, n_docs: usize) -> usize {
    if shard_size == 0 {
        n_docs.max(1)
    } else {
        shard_size
    }
}
