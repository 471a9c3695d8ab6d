use std::cmp::Ordering;

/// Radix sort for SoA (inds/vals) keyed by u32.
/// - Sorts by inds ascending, stable
/// - Reorders vals accordingly
///
/// Complexity: 4 passes, each O(n + 256)
pub fn radix_sort_u32_soa<N: Copy>(inds: &mut [u32], vals: &mut [N]) {
    assert_eq!(inds.len(), vals.len());
    let n = inds.len();
    if n <= 1 {
        return;
    }

    // Small sizes: insertion sort beats allocating scratch.
    if n <= 32 {
        insertion_sort_u32_soa(inds, vals);
        return;
    }

    let mut src_inds = inds.to_vec();
    let mut src_vals = vals.to_vec();
    let mut dst_inds = vec![0u32; n];
    let mut dst_vals = src_vals.clone();

    // LSD, one byte per pass
    for shift in [0u32, 8, 16, 24] {
        let mut count = [0usize; 256];
        for &k in &src_inds {
            count[((k >> shift) & 0xFF) as usize] += 1;
        }
        // all keys share this byte, nothing to move
        if count.iter().any(|&c| c == n) {
            continue;
        }

        let mut sum = 0usize;
        for c in count.iter_mut() {
            let tmp = *c;
            *c = sum;
            sum += tmp;
        }

        for idx in 0..n {
            let k = src_inds[idx];
            let b = ((k >> shift) & 0xFF) as usize;
            let pos = count[b];
            count[b] = pos + 1;
            dst_inds[pos] = k;
            dst_vals[pos] = src_vals[idx];
        }

        std::mem::swap(&mut src_inds, &mut dst_inds);
        std::mem::swap(&mut src_vals, &mut dst_vals);
    }

    inds.copy_from_slice(&src_inds);
    vals.copy_from_slice(&src_vals);
}

/// Tiny insertion sort for small n (SoA).
#[inline]
fn insertion_sort_u32_soa<N: Copy>(inds: &mut [u32], vals: &mut [N]) {
    for i in 1..inds.len() {
        let mut j = i;
        while j > 0 && inds[j] < inds[j - 1] {
            inds.swap(j, j - 1);
            vals.swap(j, j - 1);
            j -= 1;
        }
    }
}

/// Ranking order: score descending, then document id ascending.
///
/// Scores are compared with `total_cmp`, so the order is total even for
/// values that are not finite.
#[inline]
pub fn rank_cmp(a: &(u32, f64), b: &(u32, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

/// Keep the best `k` entries of `list` in ranking order.
///
/// Partial selection first so a shard holding many more documents than `k`
/// only fully sorts the survivors.
pub fn top_k_in_place(list: &mut Vec<(u32, f64)>, k: usize) {
    if k == 0 {
        list.clear();
        return;
    }
    if list.len() > k {
        list.select_nth_unstable_by(k - 1, rank_cmp);
        list.truncate(k);
    }
    list.sort_unstable_by(rank_cmp);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline_stable_sort<N: Copy>(inds: &[u32], vals: &[N]) -> (Vec<u32>, Vec<N>) {
        let mut pairs: Vec<(u32, usize, N)> = inds
            .iter()
            .copied()
            .enumerate()
            .map(|(i, k)| (k, i, vals[i]))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        pairs.into_iter().map(|(k, _, v)| (k, v)).unzip()
    }

    /// tiny deterministic PRNG (xorshift32)
    struct Rng(u32);
    impl Rng {
        fn next_u32(&mut self) -> u32 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            self.0 = x;
            x
        }
    }

    #[test]
    fn radix_sort_matches_baseline_many_sizes() {
        let mut rng = Rng(0x1234_5678);
        for &n in &[0usize, 1, 2, 31, 32, 33, 64, 129, 1024] {
            let mut inds: Vec<u32> = (0..n).map(|_| rng.next_u32() & 0x00FF_FFFF).collect();
            let mut vals: Vec<u32> = (0..n as u32).collect();
            let (base_k, base_v) = baseline_stable_sort(&inds, &vals);

            radix_sort_u32_soa(&mut inds, &mut vals);

            assert_eq!(inds, base_k, "keys mismatch at n={n}");
            assert_eq!(vals, base_v, "vals mismatch at n={n}");
        }
    }

    #[test]
    fn radix_sort_extremes() {
        let mut inds = vec![0u32, u32::MAX, 1, u32::MAX - 1, 0, 2, u32::MAX];
        inds.extend((0..40).rev());
        let mut vals: Vec<usize> = (0..inds.len()).collect();
        let (base_k, base_v) = baseline_stable_sort(&inds, &vals);
        radix_sort_u32_soa(&mut inds, &mut vals);
        assert_eq!(inds, base_k);
        assert_eq!(vals, base_v);
    }

    #[test]
    fn rank_order_breaks_ties_by_id() {
        let mut list = vec![(4, 0.5), (1, 0.9), (3, 0.5), (0, 0.1), (2, 0.5)];
        top_k_in_place(&mut list, 3);
        assert_eq!(list, vec![(1, 0.9), (2, 0.5), (3, 0.5)]);
    }

    #[test]
    fn top_k_larger_than_list_sorts_everything() {
        let mut list = vec![(2, 0.0), (0, 0.0), (1, 1.0)];
        top_k_in_place(&mut list, 10);
        assert_eq!(list, vec![(1, 1.0), (0, 0.0), (2, 0.0)]);
        top_k_in_place(&mut list, 0);
        assert!(list.is_empty());
    }
}
