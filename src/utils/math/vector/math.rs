use std::cmp::Ordering;

use num::Num;

use super::ZeroSpVec;

impl<N> ZeroSpVec<N>
where
    N: Num + Copy + Into<f64>,
{
    /// Dot product by merge-joining the two index lists.
    ///
    /// # Arguments
    /// * `other` - other vector of the same dimension
    #[inline]
    pub fn dot(&self, other: &Self) -> f64 {
        debug_assert_eq!(
            self.len(),
            other.len(),
            "Vectors must be of the same length to compute dot product."
        );

        let (a_inds, a_vals) = (self.indices(), self.values());
        let (b_inds, b_vals) = (other.indices(), other.values());
        let mut result = 0_f64;
        let mut i = 0;
        let mut j = 0;
        while i < a_inds.len() && j < b_inds.len() {
            match a_inds[i].cmp(&b_inds[j]) {
                Ordering::Equal => {
                    result += a_vals[i].into() * b_vals[j].into();
                    i += 1;
                    j += 1;
                }
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
            }
        }
        result
    }

    /// Dot product against a dense slice, O(nnz)
    #[inline]
    pub fn dot_dense(&self, dense: &[f64]) -> f64 {
        self.raw_iter()
            .map(|(i, v)| dense.get(i).copied().unwrap_or(0.0) * v.into())
            .sum()
    }

    /// Write the stored entries into a dense buffer (assumed zeroed).
    #[inline]
    pub fn scatter_into(&self, dense: &mut [f64]) {
        for (i, v) in self.raw_iter() {
            if let Some(slot) = dense.get_mut(i) {
                *slot = v.into();
            }
        }
    }

    /// Undo `scatter_into`, touching only this vector's indices.
    #[inline]
    pub fn unscatter_from(&self, dense: &mut [f64]) {
        for &i in self.indices() {
            if let Some(slot) = dense.get_mut(i as usize) {
                *slot = 0.0;
            }
        }
    }

    #[inline]
    pub fn norm_sq(&self) -> f64 {
        self.values()
            .iter()
            .map(|&v| {
                let v: f64 = v.into();
                v * v
            })
            .sum()
    }

    /// L2 norm
    #[inline]
    pub fn norm(&self) -> f64 {
        self.norm_sq().sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_and_norm() {
        let a = ZeroSpVec::from_parts(6, vec![0, 2, 5], vec![1.0, 2.0, 3.0]);
        let b = ZeroSpVec::from_parts(6, vec![2, 3, 5], vec![4.0, 9.0, 1.0]);
        assert_eq!(a.dot(&b), 2.0 * 4.0 + 3.0 * 1.0);
        assert_eq!(a.dot(&b), b.dot(&a));
        assert_eq!(a.norm_sq(), 14.0);
    }

    #[test]
    fn dense_scatter_roundtrip() {
        let a = ZeroSpVec::from_parts(4, vec![1, 3], vec![2.0, 5.0]);
        let b = ZeroSpVec::from_parts(4, vec![0, 3], vec![7.0, 2.0]);
        let mut dense = vec![0.0; 4];
        a.scatter_into(&mut dense);
        assert_eq!(b.dot_dense(&dense), a.dot(&b));
        a.unscatter_from(&mut dense);
        assert!(dense.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn empty_vector_has_zero_norm() {
        let v: ZeroSpVec<f64> = ZeroSpVec::with_len(3);
        assert_eq!(v.norm(), 0.0);
        assert_eq!(v.dot(&v), 0.0);
    }
}
