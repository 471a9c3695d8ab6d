use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::vectorizer::evaluate::index::SimilarityIndex;
use crate::vectorizer::evaluate::shard::{DiskShards, MemoryShards, Shard};

/// How the shards of a persisted index are stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ShardStorage {
    /// every shard inside the index file
    Embedded(Vec<Shard>),
    /// one file per shard, relative to `dir`
    Files { dir: String, files: Vec<String> },
}

/// Serializable form of `SimilarityIndex`.
///
/// Holds everything needed to answer queries (norms, shard layout and the
/// weighted shards or their file names), so loading never re-derives
/// TF-IDF weights from text.
/// Turn it into a live index with `into_similarity_index`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityIndexData {
    pub n_terms: usize,
    pub shard_size: usize,
    pub norms: Vec<f64>,
    pub shards: ShardStorage,
}

impl SimilarityIndexData {
    /// Snapshot of `index` with all shards embedded
    pub fn embedded(index: &SimilarityIndex) -> Result<Self> {
        let shards = (0..index.shard_count())
            .map(|i| index.load_shard(i).map(|s| s.as_ref().clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::with_storage(index, ShardStorage::Embedded(shards)))
    }

    /// Snapshot of `index` pointing at shard files under `dir`
    pub fn with_files(index: &SimilarityIndex, dir: &str, files: Vec<String>) -> Self {
        Self::with_storage(
            index,
            ShardStorage::Files {
                dir: dir.to_string(),
                files,
            },
        )
    }

    fn with_storage(index: &SimilarityIndex, shards: ShardStorage) -> Self {
        SimilarityIndexData {
            n_terms: index.n_terms(),
            shard_size: index.shard_size(),
            norms: index.norms().to_vec(),
            shards,
        }
    }

    /// `base` resolves relative shard directories.
    pub fn into_similarity_index(self, base: &Path) -> Result<SimilarityIndex> {
        match self.shards {
            ShardStorage::Embedded(shards) => {
                let index = SimilarityIndex::from_parts(
                    self.n_terms,
                    self.shard_size,
                    self.norms,
                    Box::new(MemoryShards::new(shards)),
                )?;
                // already in memory, so a bad layout is reported here rather than per query
                index.check_shards()?;
                Ok(index)
            }
            ShardStorage::Files { dir, files } => {
                let source = DiskShards::new(base.join(dir), files);
                SimilarityIndex::from_parts(self.n_terms, self.shard_size, self.norms, Box::new(source))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::math::vector::ZeroSpVec;
    use crate::vectorizer::matrix::DocumentMatrix;

    fn index(shard_size: usize) -> SimilarityIndex {
        let docs = vec![
            ZeroSpVec::from_parts(3, vec![0, 1], vec![1.0, 2.0]),
            ZeroSpVec::from_parts(3, vec![1, 2], vec![0.5, 0.5]),
            ZeroSpVec::from_parts(3, vec![2], vec![3.0]),
        ];
        SimilarityIndex::build(DocumentMatrix::new(docs, 3).unwrap(), shard_size)
    }

    #[test]
    fn embedded_roundtrip_answers_the_same() {
        let original = index(2);
        let data = SimilarityIndexData::embedded(&original).unwrap();
        let bytes = serde_cbor::to_vec(&data).unwrap();
        let back: SimilarityIndexData = serde_cbor::from_slice(&bytes).unwrap();
        let restored = back.into_similarity_index(Path::new(".")).unwrap();
        for q in 0..3 {
            assert_eq!(restored.ranked(q).unwrap(), original.ranked(q).unwrap());
        }
    }

    #[test]
    fn rejects_truncated_embedded_shard() {
        let mut data = SimilarityIndexData::embedded(&index(2)).unwrap();
        if let ShardStorage::Embedded(shards) = &mut data.shards {
            shards[0].docs.pop();
            shards[0].norms.pop();
        }
        assert!(matches!(
            data.into_similarity_index(Path::new(".")),
            Err(crate::error::SimsError::Format { .. })
        ));
    }

    #[test]
    fn rejects_gapped_embedded_layout() {
        let mut data = SimilarityIndexData::embedded(&index(1)).unwrap();
        if let ShardStorage::Embedded(shards) = &mut data.shards {
            shards.remove(1);
        }
        assert!(data.into_similarity_index(Path::new(".")).is_err());
    }
}
