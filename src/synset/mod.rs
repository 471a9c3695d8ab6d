//! Synonym-group declarations and the pairs they imply.
//!
//! Parsing accumulates pairs into a mutable map; `SynPairSet` is the frozen
//! result handed to the cross-validator.

pub mod validate;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::BufRead;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::Result;
use crate::utils::normalizer::nfc_owned;

static SYNSET_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^<synset no="(\d+)">"#).unwrap());
static MEMBER_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<grcword>(.+?)</grcword>").unwrap());

/// One declared synonym group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynsetRecord {
    pub id: u32,
    pub members: Vec<String>,
}

impl SynsetRecord {
    /// Members are NFC-normalized.
    pub fn new<I, S>(id: u32, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        SynsetRecord {
            id,
            members: members.into_iter().map(|m| nfc_owned(m.as_ref())).collect(),
        }
    }

    /// Parse one declaration line; `None` for lines that are not synsets.
    pub fn parse_line(line: &str) -> Option<Self> {
        let caps = SYNSET_TAG.captures(line)?;
        // digits only; overflow means not a usable id
        let id = caps[1].parse::<u32>().ok()?;
        let members = MEMBER_TAG
            .captures_iter(line)
            .map(|c| c[1].to_string())
            .collect::<Vec<_>>();
        Some(SynsetRecord::new(id, members))
    }
}

/// Read every synset line from a declaration stream.
pub fn parse_synsets<R: BufRead>(reader: R) -> Result<Vec<SynsetRecord>> {
    let mut records = Vec::new();
    let mut skipped = 0usize;
    for line in reader.lines() {
        let line = line?;
        match SynsetRecord::parse_line(&line) {
            Some(r) => records.push(r),
            None => skipped += 1,
        }
    }
    debug!(synsets = records.len(), skipped, "parsed synset declarations");
    Ok(records)
}

/// Order-independent pair of headwords, `a <= b` by code point
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey {
    a: String,
    b: String,
}

impl PairKey {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        let (x, y) = (x.into(), y.into());
        if x <= y {
            PairKey { a: x, b: y }
        } else {
            PairKey { a: y, b: x }
        }
    }

    #[inline]
    pub fn a(&self) -> &str {
        &self.a
    }

    #[inline]
    pub fn b(&self) -> &str {
        &self.b
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.a, self.b)
    }
}

/// A pair and every synset that asserts it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynPair {
    pub key: PairKey,
    pub synsets: BTreeSet<u32>,
}

/// Frozen pair set, ascending by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynPairSet {
    pairs: Vec<SynPair>,
}

impl SynPairSet {
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = SynsetRecord>,
    {
        let mut acc: BTreeMap<PairKey, BTreeSet<u32>> = BTreeMap::new();
        for record in records {
            let members = &record.members;
            for (i, x) in members.iter().enumerate() {
                for y in &members[i + 1..] {
                    if x == y {
                        continue;
                    }
                    acc.entry(PairKey::new(x.as_str(), y.as_str()))
                        .or_default()
                        .insert(record.id);
                }
            }
        }
        SynPairSet {
            pairs: acc
                .into_iter()
                .map(|(key, synsets)| SynPair { key, synsets })
                .collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SynPair> {
        self.pairs.iter()
    }

    pub fn pairs(&self) -> &[SynPair] {
        &self.pairs
    }
}
