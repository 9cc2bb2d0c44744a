use nalgebra::DMatrix;

use super::TransformConfig;
use crate::error::{Ao2moError, Result};
use crate::pack::{composite_index, pair_count};
use crate::symmetry::{classify, MultKernel};

/// Contract the remaining (kl) pair of the half-transformed intermediate.
///
/// `half` is the `(nij_pair, nao_pair)` stage-1 result: its column axis is
/// always AO-pair-packed (the intermediate is never 8-fold). Rows are
/// independent, so the block loop mirrors stage 1 with the roles of the two
/// axes swapped: each chunk of rows is contracted into a disjoint row slab
/// of the `(nij_pair, nkl_pair)` result.
pub fn second_half_transform(
    half: &DMatrix<f64>,
    mo_c: &DMatrix<f64>,
    mo_d: &DMatrix<f64>,
    compact: bool,
    config: &TransformConfig,
) -> Result<DMatrix<f64>> {
    let nao = mo_c.nrows();
    if mo_d.nrows() != nao {
        return Err(Ao2moError::shape(format!(
            "coefficient matrices with {} and {} rows disagree on the AO dimension",
            nao,
            mo_d.nrows()
        )));
    }
    if half.ncols() != pair_count(nao) {
        return Err(Ao2moError::shape(format!(
            "half-transformed intermediate has {} AO-pair columns, expected {} for nao = {}",
            half.ncols(),
            pair_count(nao),
            nao
        )));
    }

    let sym = classify(mo_c, mo_d, compact, config.identity_tol);
    let kernel = MultKernel::select(sym, mo_c.ncols(), mo_d.ncols());
    let nkl_pair = sym.pair_count(mo_c.ncols(), mo_d.ncols());
    let nij_pair = half.nrows();
    log::trace!("second half transform: {kernel:?}, {nij_pair} rows to {nkl_pair} MO pairs");

    if nij_pair == 0 || nkl_pair == 0 {
        return Ok(DMatrix::zeros(nij_pair, nkl_pair));
    }

    let block = config.block_size.max(1);
    let contract_block = |blk0: usize, blk1: usize| -> DMatrix<f64> {
        let mut slab = DMatrix::zeros(blk1 - blk0, nkl_pair);
        for row in blk0..blk1 {
            let slice =
                DMatrix::from_fn(nao, nao, |r, s| half[(row, composite_index(r, s))]);
            let y = kernel.apply(&slice, mo_c, mo_d);
            sym.for_each_pair(&y, |col, value| slab[(row - blk0, col)] = value);
        }
        slab
    };

    let mut out = DMatrix::zeros(nij_pair, nkl_pair);

    #[cfg(feature = "rayon")]
    {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};

        let slabs = (0..nij_pair)
            .step_by(block)
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|blk0| {
                let blk1 = (blk0 + block).min(nij_pair);
                (blk0, contract_block(blk0, blk1))
            })
            .collect::<Vec<_>>();

        for (blk0, slab) in slabs {
            out.view_mut((blk0, 0), slab.shape()).copy_from(&slab);
        }
    }

    #[cfg(not(feature = "rayon"))]
    for blk0 in (0..nij_pair).step_by(block) {
        let blk1 = (blk0 + block).min(nij_pair);
        let slab = contract_block(blk0, blk1);
        out.view_mut((blk0, 0), slab.shape()).copy_from(&slab);
    }

    Ok(out)
}
