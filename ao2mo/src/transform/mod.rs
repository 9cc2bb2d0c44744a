//! AO-to-MO transformation of two-electron integrals.
//!
//! The transformation runs in two stages: [`half_transform`] contracts the
//! (ij) pair of `(ij|kl)` into MO space, [`second_half_transform`] contracts
//! the remaining (kl) pair of the intermediate. [`general`] wires the stages
//! together for four independent orbital sets; [`full`] is the single-set
//! shorthand.

mod half;
mod second;

pub use half::half_transform;
pub use second::second_half_transform;

use nalgebra::DMatrix;

use crate::eri::AoEri;
use crate::error::{Ao2moError, Result};
use crate::symmetry::classify;

/// Caller-owned knobs of the transformation. No ambient state: every call
/// gets the configuration passed in.
#[derive(Clone, Debug)]
pub struct TransformConfig {
    /// AO pairs per chunk in the blocked contraction loops. A cache/memory
    /// trade-off only; any positive value produces the same numbers.
    pub block_size: usize,
    /// Two coefficient matrices closer than this element-wise count as the
    /// same orbital set when deciding whether a pair can be compacted. Too
    /// loose a value would compact near-degenerate orbital sets.
    pub identity_tol: f64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            block_size: 56,
            identity_tol: 1e-12,
        }
    }
}

/// Transform `(ij|kl)` with the same orbital set on all four indices.
///
/// With `compact` the result keeps 4-fold permutation symmetry: both axes
/// are packed MO pairs. Without it both axes are plain `nmo * nmo` products.
pub fn full(
    eri: &AoEri,
    mo_coeff: &DMatrix<f64>,
    compact: bool,
    config: &TransformConfig,
) -> Result<DMatrix<f64>> {
    general(eri, (mo_coeff, mo_coeff, mo_coeff, mo_coeff), compact, config)
}

/// Transform `(ij|kl)` with four independent orbital sets.
///
/// The (ij) and (kl) pairs are classified independently: a pair whose two
/// sets are identical (and `compact` is requested) comes back packed over
/// unordered MO pairs, otherwise as the plain product of the two widths.
/// Zero-width orbital sets short-circuit to an explicitly shaped empty
/// result before any contraction runs.
pub fn general(
    eri: &AoEri,
    mo_coeffs: (&DMatrix<f64>, &DMatrix<f64>, &DMatrix<f64>, &DMatrix<f64>),
    compact: bool,
    config: &TransformConfig,
) -> Result<DMatrix<f64>> {
    let (mo_i, mo_j, mo_k, mo_l) = mo_coeffs;
    for mo in [mo_i, mo_j, mo_k, mo_l] {
        if mo.nrows() != eri.nao() {
            return Err(Ao2moError::shape(format!(
                "coefficient matrix has {} rows, AO basis has {} functions",
                mo.nrows(),
                eri.nao()
            )));
        }
    }

    let ij_sym = classify(mo_i, mo_j, compact, config.identity_tol);
    let kl_sym = classify(mo_k, mo_l, compact, config.identity_tol);
    let nij_pair = ij_sym.pair_count(mo_i.ncols(), mo_j.ncols());
    let nkl_pair = kl_sym.pair_count(mo_k.ncols(), mo_l.ncols());
    log::debug!(
        "general transform: ij {ij_sym:?} ({nij_pair} pairs), kl {kl_sym:?} ({nkl_pair} pairs)"
    );

    // zero-sized operands trip some dense-algebra backends; hand back the
    // shaped empty result instead
    if nij_pair == 0 || nkl_pair == 0 {
        return Ok(DMatrix::zeros(nij_pair, nkl_pair));
    }

    let eri_half = half_transform(eri, mo_i, mo_j, compact, config)?;
    second_half_transform(&eri_half, mo_k, mo_l, compact, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eri::{restore, AoStorage};
    use crate::pack::split_index;
    use crate::symmetry::AoSymmetry;
    use crate::testing::synthetic_eri;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_eri(nao: usize, storage: AoStorage, seed: u64) -> AoEri {
        let mut rng = StdRng::seed_from_u64(seed);
        synthetic_eri(nao, storage, move |_, _, _, _| rng.gen_range(-1.0..1.0))
    }

    fn random_coeffs(nao: usize, nmo: usize, seed: u64) -> DMatrix<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        DMatrix::from_fn(nao, nmo, |_, _| rng.gen_range(-1.0..1.0))
    }

    /// Plain quadruple-loop reference transform, no symmetry anywhere.
    fn naive_plain(
        eri: &AoEri,
        mos: (&DMatrix<f64>, &DMatrix<f64>, &DMatrix<f64>, &DMatrix<f64>),
    ) -> DMatrix<f64> {
        let nao = eri.nao();
        let ao = restore(AoSymmetry::S1, eri).unwrap();
        let (mo_i, mo_j, mo_k, mo_l) = mos;
        let (ni, nj, nk, nl) = (mo_i.ncols(), mo_j.ncols(), mo_k.ncols(), mo_l.ncols());

        let mut out = DMatrix::zeros(ni * nj, nk * nl);
        for (i, j, k, l) in itertools::iproduct!(0..ni, 0..nj, 0..nk, 0..nl) {
            let mut acc = 0.0;
            for (p, q, r, s) in itertools::iproduct!(0..nao, 0..nao, 0..nao, 0..nao) {
                acc += mo_i[(p, i)]
                    * mo_j[(q, j)]
                    * mo_k[(r, k)]
                    * mo_l[(s, l)]
                    * ao[((p * nao + q) * nao + r) * nao + s];
            }
            out[(i * nj + j, k * nl + l)] = acc;
        }
        out
    }

    #[test]
    fn literal_shape_contract() {
        let config = TransformConfig::default();
        let eri = random_eri(5, AoStorage::EightFold, 1);
        let m1 = random_coeffs(5, 10, 11);
        let m2 = random_coeffs(5, 8, 12);
        let m3 = random_coeffs(5, 6, 13);
        let m4 = random_coeffs(5, 4, 14);

        let shape = |mos, compact| general(&eri, mos, compact, &config).unwrap().shape();
        assert_eq!(shape((&m1, &m2, &m3, &m4), true), (80, 24));
        assert_eq!(shape((&m1, &m2, &m3, &m3), true), (80, 21));
        assert_eq!(shape((&m1, &m2, &m3, &m3), false), (80, 36));
        assert_eq!(shape((&m1, &m1, &m2, &m2), true), (55, 36));
        assert_eq!(shape((&m1, &m2, &m1, &m2), true), (80, 80));

        assert_eq!(full(&eri, &m1, true, &config).unwrap().shape(), (55, 55));
        assert_eq!(full(&eri, &m1, false, &config).unwrap().shape(), (100, 100));
    }

    #[test]
    fn half_transform_shapes() {
        let config = TransformConfig::default();
        let eri = random_eri(7, AoStorage::EightFold, 2);
        let m1 = random_coeffs(7, 10, 21);
        let m2 = random_coeffs(7, 8, 22);

        let half = half_transform(&eri, &m1, &m2, true, &config).unwrap();
        assert_eq!(half.shape(), (80, 28));
        let half = half_transform(&eri, &m1, &m1, true, &config).unwrap();
        assert_eq!(half.shape(), (55, 28));
        let half = half_transform(&eri, &m1, &m1, false, &config).unwrap();
        assert_eq!(half.shape(), (100, 28));
    }

    #[test]
    fn agrees_with_naive_reference() {
        let config = TransformConfig::default();
        let mo_i = random_coeffs(4, 3, 31);
        let mo_j = random_coeffs(4, 2, 32);
        let mo_k = random_coeffs(4, 4, 33);
        let mo_l = random_coeffs(4, 2, 34);

        for storage in [AoStorage::EightFold, AoStorage::FourFold] {
            let eri = random_eri(4, storage, 3);
            let expected = naive_plain(&eri, (&mo_i, &mo_j, &mo_k, &mo_l));
            let got = general(&eri, (&mo_i, &mo_j, &mo_k, &mo_l), false, &config).unwrap();
            assert_relative_eq!(got, expected, epsilon = 1e-10);
        }
    }

    #[test]
    fn four_fold_and_eight_fold_storages_agree() {
        let config = TransformConfig::default();
        let eri8 = random_eri(4, AoStorage::EightFold, 5);
        let eri4 = AoEri::new(restore(AoSymmetry::S4, &eri8).unwrap(), 4).unwrap();
        let mo = random_coeffs(4, 3, 51);

        let from8 = full(&eri8, &mo, true, &config).unwrap();
        let from4 = full(&eri4, &mo, true, &config).unwrap();
        assert_relative_eq!(from8, from4, epsilon = 1e-12);
    }

    #[test]
    fn compaction_changes_layout_not_values() {
        let config = TransformConfig::default();
        let eri = random_eri(4, AoStorage::EightFold, 7);
        let mo = random_coeffs(4, 3, 71);

        let packed = full(&eri, &mo, true, &config).unwrap();
        let plain = full(&eri, &mo, false, &config).unwrap();
        assert_eq!(packed.shape(), (6, 6));
        assert_eq!(plain.shape(), (9, 9));

        for ij in 0..6 {
            let (i, j) = split_index(ij);
            for kl in 0..6 {
                let (k, l) = split_index(kl);
                let value = packed[(ij, kl)];
                for (a, b) in [(i, j), (j, i)] {
                    for (c, d) in [(k, l), (l, k)] {
                        assert_relative_eq!(plain[(a * 3 + b, c * 3 + d)], value, epsilon = 1e-10);
                    }
                }
            }
        }
    }

    #[test]
    fn identity_orbitals_reproduce_the_ao_integrals() {
        let config = TransformConfig::default();
        let eri = random_eri(4, AoStorage::EightFold, 9);
        let identity = DMatrix::identity(4, 4);

        let result = full(&eri, &identity, true, &config).unwrap();
        assert_eq!(result.shape(), (10, 10));
        for pq in 0..10 {
            for rs in 0..10 {
                assert_relative_eq!(result[(pq, rs)], eri.element(pq, rs), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn zero_width_orbital_set_yields_shaped_empty_result() {
        let config = TransformConfig::default();
        let eri = random_eri(4, AoStorage::EightFold, 13);
        let mo = random_coeffs(4, 3, 131);
        let empty = DMatrix::<f64>::zeros(4, 0);

        let result = general(&eri, (&mo, &mo, &empty, &mo), true, &config).unwrap();
        assert_eq!(result.shape(), (6, 0));

        let result = general(&eri, (&empty, &mo, &mo, &mo), false, &config).unwrap();
        assert_eq!(result.shape(), (0, 9));
    }

    #[test]
    fn sliced_orbital_sets_match_the_full_transform() {
        let config = TransformConfig::default();
        let eri = random_eri(4, AoStorage::EightFold, 15);
        let mo = random_coeffs(4, 4, 151);
        let lower = mo.columns(0, 2).into_owned();
        let upper = mo.columns(2, 2).into_owned();

        let whole = full(&eri, &mo, false, &config).unwrap();
        let cross = general(&eri, (&lower, &upper, &upper, &lower), false, &config).unwrap();
        assert_eq!(cross.shape(), (4, 4));

        for (i, j, k, l) in itertools::iproduct!(0..2, 0..2, 0..2, 0..2) {
            assert_relative_eq!(
                cross[(i * 2 + j, k * 2 + l)],
                whole[(i * 4 + (2 + j), (2 + k) * 4 + l)],
                epsilon = 1e-10
            );
        }
    }

    #[test]
    fn block_size_never_changes_the_numbers() {
        let eri = random_eri(5, AoStorage::EightFold, 19);
        let mo = random_coeffs(5, 4, 191);

        let reference = full(&eri, &mo, true, &TransformConfig::default()).unwrap();
        for block_size in [1, 2, 7, 1000] {
            let config = TransformConfig {
                block_size,
                ..TransformConfig::default()
            };
            let result = full(&eri, &mo, true, &config).unwrap();
            assert_relative_eq!(result, reference, epsilon = 1e-13);
        }
    }

    #[test]
    fn mismatched_coefficient_rows_fail_fast() {
        let config = TransformConfig::default();
        let eri = random_eri(4, AoStorage::EightFold, 23);
        let bad = random_coeffs(5, 3, 231);

        assert!(matches!(
            general(&eri, (&bad, &bad, &bad, &bad), true, &config),
            Err(Ao2moError::InvalidShape { .. })
        ));
        assert!(matches!(
            half_transform(&eri, &bad, &bad, true, &config),
            Err(Ao2moError::InvalidShape { .. })
        ));
    }
}
