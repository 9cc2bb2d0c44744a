use nalgebra::DMatrix;
use serde::Deserialize;

use crate::eri::AoEri;
use crate::error::Ao2moError;

/// Packed AO integrals in an input file. The packing (4-fold or 8-fold) is
/// detected from the element count when converting to [`AoEri`].
#[derive(Deserialize)]
pub struct ConfigIntegrals {
    pub nao: usize,
    pub data: Vec<f64>,
}

impl TryFrom<ConfigIntegrals> for AoEri {
    type Error = Ao2moError;

    fn try_from(value: ConfigIntegrals) -> Result<Self, Self::Error> {
        AoEri::new(value.data, value.nao)
    }
}

/// An orbital coefficient matrix in an input file: one row per AO, one
/// column per MO.
#[derive(Deserialize)]
pub struct ConfigOrbitals(Vec<Vec<f64>>);

impl TryFrom<ConfigOrbitals> for DMatrix<f64> {
    type Error = Ao2moError;

    fn try_from(value: ConfigOrbitals) -> Result<Self, Self::Error> {
        let ConfigOrbitals(rows) = value;
        let ncols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != ncols) {
            return Err(Ao2moError::shape(
                "orbital coefficient rows have unequal lengths",
            ));
        }
        Ok(DMatrix::from_fn(rows.len(), ncols, |i, j| rows[i][j]))
    }
}
