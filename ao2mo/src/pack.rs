use nalgebra::DMatrix;

/// Packed-pair index arithmetic for symmetric tensor axes.
///
/// An unordered index pair (p, q) with p >= q is stored at the packed offset
/// p*(p+1)/2 + q, row-major over the lower triangle. The arithmetic is the
/// same whether the axis runs over AO or MO indices, or over packed AO pairs
/// themselves (the 8-fold pair-of-pairs layout).

/// Number of unique unordered pairs over a dimension of size `n`.
pub const fn pair_count(n: usize) -> usize {
    n * (n + 1) / 2
}

/// Packed offset of the unordered pair `(p, q)`.
#[inline(always)]
pub const fn composite_index(p: usize, q: usize) -> usize {
    if p >= q {
        p * (p + 1) / 2 + q
    } else {
        q * (q + 1) / 2 + p
    }
}

/// The pair `(p, q)` with `p >= q` stored at packed offset `pq`.
pub fn split_index(pq: usize) -> (usize, usize) {
    let mut p = (((8 * pq + 1) as f64).sqrt() as usize + 1) / 2;
    // the float square root can land one row off near row boundaries
    while pair_count(p) > pq {
        p -= 1;
    }
    while pair_count(p + 1) <= pq {
        p += 1;
    }
    (p, pq - pair_count(p))
}

/// Pack the lower triangle of a symmetric matrix into a flat array.
pub fn pack_tril(m: &DMatrix<f64>) -> Vec<f64> {
    debug_assert_eq!(m.nrows(), m.ncols());
    let mut packed = Vec::with_capacity(pair_count(m.nrows()));
    for p in 0..m.nrows() {
        for q in 0..=p {
            packed.push(m[(p, q)]);
        }
    }
    packed
}

/// Expand a packed lower triangle back into the full symmetric matrix.
pub fn unpack_tril(packed: &[f64], n: usize) -> DMatrix<f64> {
    debug_assert_eq!(packed.len(), pair_count(n));
    DMatrix::from_fn(n, n, |p, q| packed[composite_index(p, q)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_counts() {
        assert_eq!(pair_count(0), 0);
        assert_eq!(pair_count(1), 1);
        assert_eq!(pair_count(10), 55);
    }

    #[test]
    fn composite_and_split_round_trip() {
        for pq in 0..pair_count(12) {
            let (p, q) = split_index(pq);
            assert!(p >= q);
            assert_eq!(composite_index(p, q), pq);
            assert_eq!(composite_index(q, p), pq);
        }
    }

    #[test]
    fn tril_round_trip() {
        let m = DMatrix::from_fn(6, 6, |i, j| (i * 6 + j) as f64);
        let sym = &m + m.transpose();

        let packed = pack_tril(&sym);
        assert_eq!(packed.len(), pair_count(6));
        assert_eq!(unpack_tril(&packed, 6), sym);
    }
}
