use nalgebra::DMatrix;

use crate::error::{Ao2moError, Result};
use crate::pack::{composite_index, pair_count, split_index};
use crate::symmetry::AoSymmetry;

/// Physical storage of an AO two-electron integral array.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AoStorage {
    /// `nao_pair * nao_pair` elements: packed over both index pairs, the
    /// outer pair-of-pairs exchange not compressed.
    FourFold,
    /// `nao_pair * (nao_pair + 1) / 2` elements: fully packed.
    EightFold,
}

/// AO two-electron integrals `(pq|rs)` over `nao` basis functions, stored in
/// one of the two packed layouts. The layout is detected from the element
/// count alone; any other size is rejected outright.
pub struct AoEri {
    data: Vec<f64>,
    nao: usize,
    storage: AoStorage,
}

impl AoEri {
    pub fn new(data: Vec<f64>, nao: usize) -> Result<Self> {
        let npair = pair_count(nao);
        let storage = if data.len() == npair * npair {
            AoStorage::FourFold
        } else if data.len() == pair_count(npair) {
            AoStorage::EightFold
        } else {
            return Err(Ao2moError::shape(format!(
                "AO integral array of {} elements matches neither 4-fold ({}) nor 8-fold ({}) packing for nao = {}",
                data.len(),
                npair * npair,
                pair_count(npair),
                nao
            )));
        };
        log::debug!("detected {storage:?} AO integral storage for nao = {nao}");
        Ok(Self { data, nao, storage })
    }

    pub fn nao(&self) -> usize {
        self.nao
    }

    pub fn nao_pair(&self) -> usize {
        pair_count(self.nao)
    }

    pub fn storage(&self) -> AoStorage {
        self.storage
    }

    /// `(pq|rs)` for two packed pair offsets.
    #[inline(always)]
    pub fn element(&self, pq: usize, rs: usize) -> f64 {
        match self.storage {
            AoStorage::FourFold => self.data[pq * self.nao_pair() + rs],
            // pair offsets pack the same way index pairs do
            AoStorage::EightFold => self.data[composite_index(pq, rs)],
        }
    }

    /// The symmetric `nao x nao` slice `(..|rs)` for a fixed packed pair.
    pub fn pair_matrix(&self, rs: usize) -> DMatrix<f64> {
        DMatrix::from_fn(self.nao, self.nao, |p, q| {
            self.element(composite_index(p, q), rs)
        })
    }
}

/// Re-pack AO integrals into the requested storage.
///
/// `s8` and `s4` return the packed layouts accepted by [`AoEri::new`]; `s1`
/// returns the plain rank-4 layout flattened row-major as
/// `((p*nao + q)*nao + r)*nao + s`. Packing a 4-fold source down to `s8`
/// relies on the physical `(pq) <-> (rs)` exchange symmetry of real-orbital
/// integrals.
pub fn restore(target: AoSymmetry, eri: &AoEri) -> Result<Vec<f64>> {
    let nao = eri.nao();
    let npair = eri.nao_pair();
    match target {
        AoSymmetry::S8 => {
            let mut out = Vec::with_capacity(pair_count(npair));
            for pq in 0..npair {
                for rs in 0..=pq {
                    out.push(eri.element(pq, rs));
                }
            }
            Ok(out)
        }
        AoSymmetry::S4 => {
            let mut out = vec![0.0; npair * npair];
            for (pq, rs) in itertools::iproduct!(0..npair, 0..npair) {
                out[pq * npair + rs] = eri.element(pq, rs);
            }
            Ok(out)
        }
        AoSymmetry::S1 => {
            let mut out = vec![0.0; nao.pow(4)];
            for pq in 0..npair {
                let (p, q) = split_index(pq);
                for rs in 0..npair {
                    let (r, s) = split_index(rs);
                    let value = eri.element(pq, rs);
                    out[((p * nao + q) * nao + r) * nao + s] = value;
                    out[((q * nao + p) * nao + r) * nao + s] = value;
                    out[((p * nao + q) * nao + s) * nao + r] = value;
                    out[((q * nao + p) * nao + s) * nao + r] = value;
                }
            }
            Ok(out)
        }
        sym => Err(Ao2moError::UnsupportedSymmetry(sym)),
    }
}
