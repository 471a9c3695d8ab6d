pub mod math;
pub mod serde;

use std::fmt::{self, Debug};

use num::Num;

use crate::utils::sort::radix_sort_u32_soa;

/// ZeroSpVec is a sparse vector that treats zero elements as implicit.
///
/// Non-zero entries are kept as two parallel arrays (`inds` / `vals`),
/// struct-of-arrays style. `len` is the logical dimension.
///
/// Invariant: `inds` is strictly ascending and every index is `< len`.
#[derive(Clone, PartialEq)]
pub struct ZeroSpVec<N>
where
    N: Num,
{
    len: usize,
    inds: Vec<u32>,
    vals: Vec<N>,
}

impl<N> ZeroSpVec<N>
where
    N: Num + Copy,
{
    #[inline]
    pub fn new() -> Self {
        ZeroSpVec {
            len: 0,
            inds: Vec::new(),
            vals: Vec::new(),
        }
    }

    /// Empty vector of logical dimension `len`
    #[inline]
    pub fn with_len(len: usize) -> Self {
        ZeroSpVec {
            len,
            inds: Vec::new(),
            vals: Vec::new(),
        }
    }

    #[inline]
    pub fn with_capacity(len: usize, nnz_cap: usize) -> Self {
        ZeroSpVec {
            len,
            inds: Vec::with_capacity(nnz_cap),
            vals: Vec::with_capacity(nnz_cap),
        }
    }

    /// Build from unordered `(index, value)` parts.
    /// Indices are sorted, duplicates summed and zeros dropped.
    ///
    /// # Panics
    /// if `inds` and `vals` differ in length or an index is `>= len`
    pub fn from_parts(len: usize, mut inds: Vec<u32>, mut vals: Vec<N>) -> Self {
        assert_eq!(inds.len(), vals.len());
        radix_sort_u32_soa(&mut inds, &mut vals);

        let mut out = ZeroSpVec::with_capacity(len, inds.len());
        for (ind, val) in inds.into_iter().zip(vals) {
            assert!((ind as usize) < len, "index {ind} out of dimension {len}");
            match out.inds.last() {
                Some(&last) if last == ind => {
                    // 同じindexは加算
                    if let Some(slot) = out.vals.last_mut() {
                        *slot = *slot + val;
                    }
                }
                _ => {
                    out.inds.push(ind);
                    out.vals.push(val);
                }
            }
        }
        out.prune_zeros();
        out
    }

    /// Dense vector into sparse form
    pub fn from_vec(vec: Vec<N>) -> Self {
        let mut out = ZeroSpVec::with_len(0);
        for elem in vec {
            out.push(elem);
        }
        out
    }

    /// Append one logical element at position `len`.
    #[inline]
    pub fn push(&mut self, elem: N) {
        if elem != N::zero() {
            self.inds.push(self.len as u32);
            self.vals.push(elem);
        }
        self.len += 1;
    }

    /// Append a non-zero entry without touching `len`.
    /// Caller guarantees `index` is above every stored index and `< len`.
    #[inline]
    pub(crate) fn raw_push(&mut self, index: u32, value: N) {
        debug_assert!(self.inds.last().map_or(true, |&last| last < index));
        debug_assert!((index as usize) < self.len);
        self.inds.push(index);
        self.vals.push(value);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// number of stored (non-zero) entries
    #[inline]
    pub fn nnz(&self) -> usize {
        self.inds.len()
    }

    #[inline]
    pub fn shrink_to_fit(&mut self) {
        self.inds.shrink_to_fit();
        self.vals.shrink_to_fit();
    }

    /// Value at logical `index`, zero when not stored, None past `len`
    #[inline]
    pub fn get(&self, index: usize) -> Option<N> {
        if index >= self.len {
            return None;
        }
        match self.inds.binary_search(&(index as u32)) {
            Ok(pos) => Some(self.vals[pos]),
            Err(_) => Some(N::zero()),
        }
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.inds
    }

    #[inline]
    pub fn values(&self) -> &[N] {
        &self.vals
    }

    /// Iterate stored entries as `(index, value)`, indices ascending
    #[inline]
    pub fn raw_iter(&self) -> impl ExactSizeIterator<Item = (usize, N)> + '_ {
        self.inds
            .iter()
            .zip(self.vals.iter())
            .map(|(&i, &v)| (i as usize, v))
    }

    /// Map every stored value; the result keeps the same sparsity pattern
    /// until `prune_zeros` is called.
    pub fn map_values<M, F>(&self, mut f: F) -> ZeroSpVec<M>
    where
        M: Num + Copy,
        F: FnMut(usize, N) -> M,
    {
        ZeroSpVec {
            len: self.len,
            inds: self.inds.clone(),
            vals: self
                .inds
                .iter()
                .zip(self.vals.iter())
                .map(|(&i, &v)| f(i as usize, v))
                .collect(),
        }
    }

    /// Drop explicitly stored zeros
    pub fn prune_zeros(&mut self) {
        let zero = N::zero();
        let mut w = 0;
        for r in 0..self.inds.len() {
            if self.vals[r] != zero {
                self.inds[w] = self.inds[r];
                self.vals[w] = self.vals[r];
                w += 1;
            }
        }
        self.inds.truncate(w);
        self.vals.truncate(w);
    }
}

impl<N> Default for ZeroSpVec<N>
where
    N: Num + Copy,
{
    #[inline]
    fn default() -> Self {
        ZeroSpVec::new()
    }
}

impl<N: Num + Copy + Debug> Debug for ZeroSpVec<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            // dense表示
            f.debug_list()
                .entries((0..self.len).filter_map(|i| self.get(i)))
                .finish()
        } else {
            write!(f, "ZeroSpVec(len={}, ", self.len)?;
            f.debug_map().entries(self.raw_iter()).finish()?;
            write!(f, ")")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_skips_zeros_but_grows_len() {
        let v = ZeroSpVec::from_vec(vec![0u32, 3, 0, 0, 7]);
        assert_eq!(v.len(), 5);
        assert_eq!(v.nnz(), 2);
        assert_eq!(v.indices(), &[1, 4]);
        assert_eq!(v.get(2), Some(0));
        assert_eq!(v.get(4), Some(7));
        assert_eq!(v.get(5), None);
    }

    #[test]
    fn from_parts_sorts_merges_and_prunes() {
        let v = ZeroSpVec::from_parts(10, vec![7, 2, 7, 5, 2], vec![1i64, 4, 2, 0, -4]);
        // 2: 4 + -4 = 0 -> pruned, 5: 0 -> pruned
        assert_eq!(v.indices(), &[7]);
        assert_eq!(v.values(), &[3]);
        assert_eq!(v.len(), 10);
    }

    #[test]
    #[should_panic]
    fn from_parts_rejects_index_past_len() {
        let _ = ZeroSpVec::from_parts(3, vec![3], vec![1u32]);
    }

    #[test]
    fn map_values_then_prune() {
        let v = ZeroSpVec::from_parts(4, vec![0, 1, 3], vec![1u32, 2, 3]);
        let mut w = v.map_values(|i, c| if i == 1 { 0.0 } else { c as f64 * 0.5 });
        assert_eq!(w.nnz(), 3);
        w.prune_zeros();
        assert_eq!(w.indices(), &[0, 3]);
        assert_eq!(w.values(), &[0.5, 1.5]);
    }
}
