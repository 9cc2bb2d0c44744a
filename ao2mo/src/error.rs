use thiserror::Error;

use crate::symmetry::AoSymmetry;

/// Errors of the integral transformation. All of them are fatal for the
/// call: the transformation is a pure function of fixed inputs, so there is
/// nothing to retry.
#[derive(Debug, Error)]
pub enum Ao2moError {
    /// An input array whose size matches neither accepted packed form, or a
    /// coefficient matrix inconsistent with the AO dimension.
    #[error("invalid shape: {context}")]
    InvalidShape { context: String },

    /// Anti-symmetrized AO packings exist on the interface but have no
    /// implementation; failing fast beats producing wrong numbers.
    #[error("AO symmetry {0} is not implemented")]
    UnsupportedSymmetry(AoSymmetry),

    /// A symmetry label that names no known packing at all.
    #[error("unknown AO symmetry label {0:?}")]
    UnknownSymmetry(String),
}

impl Ao2moError {
    pub(crate) fn shape(context: impl Into<String>) -> Self {
        Self::InvalidShape {
            context: context.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Ao2moError>;
