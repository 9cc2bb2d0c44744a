use std::fmt;
use std::str::FromStr;

use nalgebra::DMatrix;

use crate::error::Ao2moError;
use crate::pack::pair_count;

/// Permutation symmetry of one MO index pair of the result tensor.
///
/// `Compacted` stores only the unique unordered pairs of one orbital set;
/// `Full` keeps the plain Cartesian product of two (possibly different)
/// sets. The (ij) and (kl) pairs of `(ij|kl)` are classified independently.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PairSymmetry {
    Compacted,
    Full,
}

impl PairSymmetry {
    /// Row (or column) count of the result axis for this pair.
    pub fn pair_count(self, nmo_a: usize, nmo_b: usize) -> usize {
        match self {
            Self::Compacted => pair_count(nmo_a),
            Self::Full => nmo_a * nmo_b,
        }
    }

    /// Visit the MO-pair entries of a contracted `nmo_a x nmo_b` slice in
    /// packing order, handing each (packed offset, value) to `f`.
    pub(crate) fn for_each_pair(self, x: &DMatrix<f64>, mut f: impl FnMut(usize, f64)) {
        match self {
            Self::Compacted => {
                let mut idx = 0;
                for i in 0..x.nrows() {
                    for j in 0..=i {
                        f(idx, x[(i, j)]);
                        idx += 1;
                    }
                }
            }
            Self::Full => {
                for i in 0..x.nrows() {
                    for j in 0..x.ncols() {
                        f(i * x.ncols() + j, x[(i, j)]);
                    }
                }
            }
        }
    }
}

/// Whether two coefficient matrices describe the same orbital set: the same
/// allocation, or shape-equal and element-wise within `tol`.
pub fn coeffs_identical(a: &DMatrix<f64>, b: &DMatrix<f64>, tol: f64) -> bool {
    std::ptr::eq(a, b)
        || (a.shape() == b.shape() && a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= tol))
}

/// Classify one index pair of the result tensor. `Compacted` requires both
/// the caller asking for compaction and the two orbital sets being
/// identical.
pub fn classify(a: &DMatrix<f64>, b: &DMatrix<f64>, compact: bool, tol: f64) -> PairSymmetry {
    if compact && coeffs_identical(a, b, tol) {
        PairSymmetry::Compacted
    } else {
        PairSymmetry::Full
    }
}

/// Dense kernel used to contract one symmetric AO slice with a coefficient
/// pair. A closed enum chosen once per call; the hot loop stays monomorphic.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MultKernel {
    /// Both sides use the same square coefficient set and the product is
    /// symmetric.
    SymmetricSquare,
    /// Different sets, left one no wider than the right; contract the left
    /// side first to keep the intermediate narrow.
    AsymmetricLeftNarrow,
    /// Different sets, right one narrower; contract it first.
    AsymmetricRightNarrow,
}

impl MultKernel {
    pub(crate) fn select(sym: PairSymmetry, nmo_a: usize, nmo_b: usize) -> Self {
        match sym {
            PairSymmetry::Compacted => Self::SymmetricSquare,
            PairSymmetry::Full if nmo_a <= nmo_b => Self::AsymmetricLeftNarrow,
            PairSymmetry::Full => Self::AsymmetricRightNarrow,
        }
    }

    /// `mo_a^T * slice * mo_b` with the multiplication order this kernel
    /// stands for. `slice` is a symmetric `nao x nao` AO block.
    pub(crate) fn apply(
        self,
        slice: &DMatrix<f64>,
        mo_a: &DMatrix<f64>,
        mo_b: &DMatrix<f64>,
    ) -> DMatrix<f64> {
        match self {
            Self::SymmetricSquare => mo_a.tr_mul(&(slice * mo_a)),
            Self::AsymmetricLeftNarrow => mo_a.tr_mul(slice) * mo_b,
            Self::AsymmetricRightNarrow => mo_a.tr_mul(&(slice * mo_b)),
        }
    }
}

/// Packing label of an AO integral array on the external interface.
///
/// The anti-symmetrized variants are accepted by the parser so callers get a
/// typed value back, but every point of use rejects them with
/// [`Ao2moError::UnsupportedSymmetry`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AoSymmetry {
    /// No permutation symmetry, plain rank-4 layout.
    S1,
    /// Packed over (ij) and (kl) separately.
    S4,
    /// Additionally packed over the (ij) <-> (kl) exchange.
    S8,
    A4ij,
    A4kl,
    A2ij,
    A2kl,
}

impl AoSymmetry {
    pub fn is_antisymmetric(self) -> bool {
        matches!(self, Self::A4ij | Self::A4kl | Self::A2ij | Self::A2kl)
    }
}

impl fmt::Display for AoSymmetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::S1 => "s1",
            Self::S4 => "s4",
            Self::S8 => "s8",
            Self::A4ij => "a4ij",
            Self::A4kl => "a4kl",
            Self::A2ij => "a2ij",
            Self::A2kl => "a2kl",
        };
        write!(f, "{label}")
    }
}

impl FromStr for AoSymmetry {
    type Err = Ao2moError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" | "s1" => Ok(Self::S1),
            "4" | "s4" => Ok(Self::S4),
            "8" | "s8" => Ok(Self::S8),
            "a4ij" => Ok(Self::A4ij),
            "a4kl" => Ok(Self::A4kl),
            "a2ij" => Ok(Self::A2ij),
            "a2kl" => Ok(Self::A2kl),
            other => Err(Ao2moError::UnknownSymmetry(other.to_string())),
        }
    }
}
