//! On-disk artifacts of a build, all under one data directory.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::Result;
use crate::lookup::HeadwordLookup;
use crate::vectorizer::evaluate::index::SimilarityIndex;
use crate::vectorizer::evaluate::shard::DiskShards;
use crate::vectorizer::matrix::DocumentMatrix;
use crate::vectorizer::serde::SimilarityIndexData;
use crate::vectorizer::vocabulary::Vocabulary;
use crate::vectorizer::BuiltIndex;

pub const VOCABULARY_FILE: &str = "vocabulary.cbor";
pub const LOOKUP_WORD_FILE: &str = "lookup_word.cbor";
pub const LOOKUP_ID_FILE: &str = "lookup_id.cbor";
pub const MATRIX_FILE: &str = "corpus.mm";
pub const INDEX_FILE: &str = "sims.index";
pub const SHARD_DIR: &str = "shards";

/// Artifact directory. Every write goes to a temp file in the same
/// directory and is renamed into place.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ArtifactStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Persist every artifact of `built`.
    pub fn save(&self, built: &BuiltIndex, on_disk_shards: bool) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        self.save_vocabulary(&built.vocabulary)?;
        self.save_lookup(&built.lookup)?;
        self.save_matrix(&built.index)?;
        self.save_index(&built.index, on_disk_shards)?;
        info!(dir = %self.dir.display(), on_disk_shards, "artifacts saved");
        Ok(())
    }

    pub fn save_vocabulary(&self, vocab: &Vocabulary) -> Result<()> {
        write_cbor(&self.path(VOCABULARY_FILE), vocab)
    }

    pub fn load_vocabulary(&self) -> Result<Vocabulary> {
        let vocab: Vocabulary = read_cbor(&self.path(VOCABULARY_FILE))?;
        vocab.check()?;
        Ok(vocab)
    }

    pub fn save_lookup(&self, lookup: &HeadwordLookup) -> Result<()> {
        write_cbor(&self.path(LOOKUP_WORD_FILE), lookup.word_table())?;
        write_cbor(&self.path(LOOKUP_ID_FILE), &lookup.id_table())
    }

    pub fn load_lookup(&self) -> Result<HeadwordLookup> {
        let by_word: HashMap<String, u32> = read_cbor(&self.path(LOOKUP_WORD_FILE))?;
        let by_id: Vec<String> = read_cbor(&self.path(LOOKUP_ID_FILE))?;
        HeadwordLookup::from_tables(by_word, by_id)
    }

    /// Matrix Market text of the weighted documents held by `index`
    pub fn save_matrix(&self, index: &SimilarityIndex) -> Result<()> {
        write_atomic(&self.path(MATRIX_FILE), |w| index.write_market(w))
    }

    /// The matrix must have one row per headword id, so the lookup is read
    /// first and bounds the row count.
    pub fn load_matrix(&self) -> Result<DocumentMatrix> {
        let n_docs = self.load_lookup()?.len();
        DocumentMatrix::read_market_expecting(BufReader::new(File::open(self.path(MATRIX_FILE))?), n_docs)
    }

    /// Index metadata, plus one file per shard when `on_disk_shards`.
    pub fn save_index(&self, index: &SimilarityIndex, on_disk_shards: bool) -> Result<()> {
        let data = if on_disk_shards {
            let shard_dir = self.path(SHARD_DIR);
            fs::create_dir_all(&shard_dir)?;
            let mut files = Vec::with_capacity(index.shard_count());
            for i in 0..index.shard_count() {
                let name = DiskShards::file_name(i);
                write_cbor(&shard_dir.join(&name), index.load_shard(i)?.as_ref())?;
                files.push(name);
            }
            SimilarityIndexData::with_files(index, SHARD_DIR, files)
        } else {
            SimilarityIndexData::embedded(index)?
        };
        write_cbor(&self.path(INDEX_FILE), &data)
    }

    pub fn load_index(&self) -> Result<SimilarityIndex> {
        let data: SimilarityIndexData = read_cbor(&self.path(INDEX_FILE))?;
        let index = data.into_similarity_index(&self.dir)?;
        info!(documents = index.len(), shards = index.shard_count(), "similarity index loaded");
        Ok(index)
    }
}

fn write_atomic<F>(path: &Path, f: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&NamedTempFile>) -> Result<()>,
{
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let temp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = BufWriter::new(&temp);
        f(&mut writer)?;
        writer.flush()?;
    }
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn write_cbor<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    write_atomic(path, |w| Ok(serde_cbor::to_writer(w, value)?))
}

fn read_cbor<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_cbor::from_reader(reader)?)
}
