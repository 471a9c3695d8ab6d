use std::fmt::{self, Debug, Display};

use serde::{Deserialize, Serialize};

use crate::utils::sort::rank_cmp;

/// One ranked neighbour
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitEntry {
    /// document id
    pub id: u32,
    /// cosine similarity to the query document
    pub score: f64,
}

/// Ranked neighbour list of one query document.
///
/// Ordered by descending score, ties by ascending id. The query document
/// itself never appears.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Hits {
    pub query: u32,
    pub list: Vec<HitEntry>,
}

impl Hits {
    /// Wrap an already ranked list
    pub(crate) fn from_ranked(query: u32, ranked: Vec<(u32, f64)>) -> Self {
        debug_assert!(ranked.windows(2).all(|w| rank_cmp(&w[0], &w[1]).is_lt()));
        Hits {
            query,
            list: ranked
                .into_iter()
                .map(|(id, score)| HitEntry { id, score })
                .collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, HitEntry> {
        self.list.iter()
    }

    pub fn truncate(&mut self, k: usize) {
        self.list.truncate(k);
    }

    /// 0-based position of `id`, linear scan
    pub fn position_of(&self, id: u32) -> Option<usize> {
        self.list.iter().position(|h| h.id == id)
    }

    /// id -> position lookup table over `n_docs` ids
    pub fn rank_map(&self, n_docs: usize) -> RankMap {
        let mut positions = vec![RankMap::ABSENT; n_docs];
        for (rank, hit) in self.list.iter().enumerate() {
            if let Some(slot) = positions.get_mut(hit.id as usize) {
                *slot = rank as u32;
            }
        }
        RankMap { positions }
    }
}

impl IntoIterator for Hits {
    type Item = HitEntry;
    type IntoIter = std::vec::IntoIter<HitEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.into_iter()
    }
}

impl Debug for Hits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Hits(query={}) [", self.query)?;
            for hit in &self.list {
                writeln!(f, "    {}: {:.6}", hit.id, hit.score)?;
            }
            write!(f, "]")
        } else {
            f.debug_list()
                .entries(self.list.iter().map(|h| (h.id, h.score)))
                .finish()
        }
    }
}

impl Display for Hits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (rank, hit) in self.list.iter().enumerate() {
            writeln!(f, "{rank}\t{}\t{:.3}", hit.id, hit.score)?;
        }
        Ok(())
    }
}

/// Precomputed id -> rank position for one ranked list, O(1) lookups.
#[derive(Debug, Clone)]
pub struct RankMap {
    positions: Vec<u32>,
}

impl RankMap {
    const ABSENT: u32 = u32::MAX;

    #[inline]
    pub fn rank_of(&self, id: u32) -> Option<usize> {
        match self.positions.get(id as usize) {
            Some(&p) if p != Self::ABSENT => Some(p as usize),
            _ => None,
        }
    }
}
