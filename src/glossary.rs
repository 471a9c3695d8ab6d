use std::collections::HashMap;
use std::io::BufRead;

use tracing::debug;

use crate::error::{Result, SimsError};
use crate::utils::normalizer::{nfc, nfc_owned};

/// Display definitions keyed by NFC headword. Only consulted when
/// printing query results; ranking never reads it.
#[derive(Debug, Clone, Default)]
pub struct Glossary {
    entries: HashMap<String, String>,
}

impl Glossary {
    /// `headword<TAB>gloss` per line, later lines overwrite earlier ones.
    pub fn read_flat<R: BufRead>(reader: R) -> Result<Self> {
        let mut entries = HashMap::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }
            let (head, gloss) = line.split_once('\t').ok_or_else(|| {
                SimsError::format("glossary", lineno + 1, "expected `headword<TAB>gloss`")
            })?;
            entries.insert(nfc_owned(head), gloss.trim().to_string());
        }
        debug!(entries = entries.len(), "glossary loaded");
        Ok(Glossary { entries })
    }

    pub fn insert(&mut self, headword: &str, gloss: impl Into<String>) {
        self.entries.insert(nfc_owned(headword), gloss.into());
    }

    pub fn get(&self, word: &str) -> Option<&str> {
        self.entries.get(nfc(word).as_ref()).map(|g| g.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
