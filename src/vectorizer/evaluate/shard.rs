use std::fmt::Debug;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SimsError};
use crate::utils::sort::top_k_in_place;
use crate::vectorizer::tfidf::WeightVector;

/// A contiguous block of documents `start..start + docs.len()` with their
/// precomputed L2 norms. Each shard is independently loadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shard {
    pub start: u32,
    pub docs: Vec<WeightVector>,
    pub norms: Vec<f64>,
}

impl Shard {
    pub fn new(start: u32, docs: Vec<WeightVector>) -> Self {
        let norms = docs.iter().map(|d| d.norm()).collect();
        Shard { start, docs, norms }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    #[inline]
    pub fn contains(&self, doc: usize) -> bool {
        let start = self.start as usize;
        doc >= start && doc < start + self.docs.len()
    }

    #[inline]
    pub fn get(&self, doc: usize) -> Option<&WeightVector> {
        if self.contains(doc) {
            self.docs.get(doc - self.start as usize)
        } else {
            None
        }
    }

    /// Check that this is block `shard` of an index whose per-document norms
    /// are `norms`: right start, right document count, matching norms.
    pub fn check_layout(&self, shard: usize, shard_size: usize, norms: &[f64]) -> Result<()> {
        let start = shard * shard_size;
        let expected_len = shard_size.min(norms.len().saturating_sub(start));
        if self.start as usize != start {
            return Err(SimsError::format(
                "shard",
                shard + 1,
                format!("starts at document {}, expected {start}", self.start),
            ));
        }
        if self.docs.len() != expected_len || self.norms.len() != expected_len {
            return Err(SimsError::format(
                "shard",
                shard + 1,
                format!(
                    "holds {} documents and {} norms, expected {expected_len}",
                    self.docs.len(),
                    self.norms.len()
                ),
            ));
        }
        if norms.get(start..start + expected_len) != Some(self.norms.as_slice()) {
            return Err(SimsError::format("shard", shard + 1, "norms disagree with the index"));
        }
        Ok(())
    }

    /// Partial top-k of this block against a query scattered into `dense`.
    ///
    /// The query document is skipped. Zero-norm documents on either side
    /// score 0 instead of NaN.
    pub fn search(&self, query: u32, dense: &[f64], query_norm: f64, k: usize) -> Vec<(u32, f64)> {
        let mut scored: Vec<(u32, f64)> = self
            .docs
            .iter()
            .zip(self.norms.iter())
            .enumerate()
            .filter_map(|(offset, (doc, &norm))| {
                let id = self.start + offset as u32;
                if id == query {
                    return None;
                }
                Some((id, cosine(doc.dot_dense(dense), query_norm, norm)))
            })
            .collect();
        top_k_in_place(&mut scored, k);
        scored
    }
}

/// `dot / (|a| * |b|)`, zero when either norm is zero, clamped to [-1, 1]
#[inline]
pub fn cosine(dot: f64, norm_a: f64, norm_b: f64) -> f64 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Where shards come from. Implementations must hand out shard `i`
/// covering documents `i * shard_size ..`; `SimilarityIndex` checks every
/// shard it receives with `Shard::check_layout`.
pub trait ShardSource: Debug + Send + Sync {
    fn shard_count(&self) -> usize;
    fn load(&self, shard: usize) -> Result<Arc<Shard>>;
}

/// All shards resident in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryShards {
    shards: Vec<Arc<Shard>>,
}

impl MemoryShards {
    pub fn new(shards: Vec<Shard>) -> Self {
        MemoryShards {
            shards: shards.into_iter().map(Arc::new).collect(),
        }
    }
}

impl ShardSource for MemoryShards {
    #[inline]
    fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn load(&self, shard: usize) -> Result<Arc<Shard>> {
        self.shards
            .get(shard)
            .cloned()
            .ok_or(SimsError::OutOfRange {
                id: shard,
                len: self.shards.len(),
            })
    }
}

/// One CBOR file per shard, read on demand so only the shards in flight
/// occupy memory.
#[derive(Debug, Clone)]
pub struct DiskShards {
    dir: PathBuf,
    files: Vec<String>,
}

impl DiskShards {
    pub fn new(dir: impl Into<PathBuf>, files: Vec<String>) -> Self {
        DiskShards {
            dir: dir.into(),
            files,
        }
    }

    /// Canonical file name of shard `i`
    pub fn file_name(shard: usize) -> String {
        format!("shard-{shard:05}.cbor")
    }
}

impl ShardSource for DiskShards {
    #[inline]
    fn shard_count(&self) -> usize {
        self.files.len()
    }

    fn load(&self, shard: usize) -> Result<Arc<Shard>> {
        let name = self.files.get(shard).ok_or(SimsError::OutOfRange {
            id: shard,
            len: self.files.len(),
        })?;
        let path = self.dir.join(name);
        debug!(path = %path.display(), "loading shard");
        let reader = BufReader::new(File::open(&path)?);
        let loaded: Shard = serde_cbor::from_reader(reader)?;
        Ok(Arc::new(loaded))
    }
}
