use nalgebra::DMatrix;

use super::TransformConfig;
use crate::eri::AoEri;
use crate::error::{Ao2moError, Result};
use crate::symmetry::{classify, MultKernel};

/// Contract the (ij) pair of `(ij|kl)` into MO space.
///
/// Returns a `(nij_pair, nao_pair)` matrix: rows are MO pairs packed
/// according to the classified pair symmetry, columns are still packed AO
/// pairs. The AO-pair axis is processed in `block_size` chunks; chunks are
/// independent and each writes a disjoint column slab exactly once, so the
/// `rayon` feature contracts them in parallel.
pub fn half_transform(
    eri: &AoEri,
    mo_a: &DMatrix<f64>,
    mo_b: &DMatrix<f64>,
    compact: bool,
    config: &TransformConfig,
) -> Result<DMatrix<f64>> {
    let nao = eri.nao();
    if mo_a.nrows() != nao || mo_b.nrows() != nao {
        return Err(Ao2moError::shape(format!(
            "coefficient matrices with {} and {} rows do not match the AO dimension {}",
            mo_a.nrows(),
            mo_b.nrows(),
            nao
        )));
    }

    let sym = classify(mo_a, mo_b, compact, config.identity_tol);
    let kernel = MultKernel::select(sym, mo_a.ncols(), mo_b.ncols());
    let nij_pair = sym.pair_count(mo_a.ncols(), mo_b.ncols());
    let nao_pair = eri.nao_pair();
    log::trace!("half transform: {kernel:?}, {nij_pair} MO pairs over {nao_pair} AO pairs");

    if nij_pair == 0 {
        return Ok(DMatrix::zeros(0, nao_pair));
    }

    let block = config.block_size.max(1);
    let contract_block = |blk0: usize, blk1: usize| -> DMatrix<f64> {
        let mut slab = DMatrix::zeros(nij_pair, blk1 - blk0);
        for rs in blk0..blk1 {
            let slice = eri.pair_matrix(rs);
            let x = kernel.apply(&slice, mo_a, mo_b);
            sym.for_each_pair(&x, |row, value| slab[(row, rs - blk0)] = value);
        }
        slab
    };

    let mut out = DMatrix::zeros(nij_pair, nao_pair);

    #[cfg(feature = "rayon")]
    {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};

        let slabs = (0..nao_pair)
            .step_by(block)
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|blk0| {
                let blk1 = (blk0 + block).min(nao_pair);
                (blk0, contract_block(blk0, blk1))
            })
            .collect::<Vec<_>>();

        for (blk0, slab) in slabs {
            out.view_mut((0, blk0), slab.shape()).copy_from(&slab);
        }
    }

    #[cfg(not(feature = "rayon"))]
    for blk0 in (0..nao_pair).step_by(block) {
        let blk1 = (blk0 + block).min(nao_pair);
        let slab = contract_block(blk0, blk1);
        out.view_mut((0, blk0), slab.shape()).copy_from(&slab);
    }

    Ok(out)
}
