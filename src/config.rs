use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::lookup::DuplicatePolicy;
use crate::vectorizer::tfidf::TfScheme;

/// Runtime settings, read from TOML. Every field has a default, so an empty
/// file (or no file) is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub index: IndexConfig,
    pub headwords: HeadwordConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// flat dictionary, `headword<TAB>definition`
    pub dict: PathBuf,
    /// display glosses, `headword<TAB>gloss`
    pub full_defs: PathBuf,
    /// artifact directory
    pub data_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            dict: PathBuf::from("dict/dict.flat.txt"),
            full_defs: PathBuf::from("dict/full-defs.flat.txt"),
            data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// documents per shard, 0 = one block
    pub shard_size: usize,
    pub prune_zero_weights: bool,
    pub tf: TfScheme,
    /// one file per shard under `data_dir/shards/` instead of embedding
    pub on_disk_shards: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            shard_size: 0,
            prune_zero_weights: true,
            tf: TfScheme::Raw,
            on_disk_shards: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadwordConfig {
    pub on_duplicate: DuplicatePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub results: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig { results: 25 }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading config");
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.index.prune_zero_weights);
        assert_eq!(config.query.results, 25);
        assert_eq!(config.headwords.on_duplicate, DuplicatePolicy::Overwrite);
    }

    #[test]
    fn partial_sections_override() {
        let config = Config::from_toml_str(
            r#"
            [paths]
            data_dir = "/tmp/sims"

            [index]
            shard_size = 512
            tf = "log"
            on_disk_shards = true

            [headwords]
            on_duplicate = "reject"
            "#,
        )
        .unwrap();
        assert_eq!(config.paths.data_dir, PathBuf::from("/tmp/sims"));
        assert_eq!(config.paths.dict, PathBuf::from("dict/dict.flat.txt"));
        assert_eq!(config.index.shard_size, 512);
        assert_eq!(config.index.tf, TfScheme::Log);
        assert!(config.index.on_disk_shards);
        assert!(config.index.prune_zero_weights);
        assert_eq!(config.headwords.on_duplicate, DuplicatePolicy::Reject);
    }

    #[test]
    fn unknown_tf_scheme_is_rejected() {
        assert!(Config::from_toml_str("[index]\ntf = \"bm25\"\n").is_err());
    }
}
