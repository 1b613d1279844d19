use super::{EquilibriumState, LinearSystemAdapter, TangentProvider};
use crate::StrError;
use russell_lab::{mat_inverse, mat_vec_mul, Matrix, Vector};
use russell_sparse::{CooMatrix, Sym};

/// Implements the linear system adapter with a dense inverse matrix
///
/// This adapter is convenient for small systems (e.g., reduced models and verification problems).
/// Large systems should use [crate::solver::SparseLinearSystem].
pub struct DenseLinearSystem {
    /// Holds the assembled tangent matrix
    kk: CooMatrix,

    /// Holds the inverse of the tangent matrix
    kk_inv: Matrix,

    /// Indicates that the inverse has been computed
    factorized: bool,
}

impl DenseLinearSystem {
    /// Allocates a new instance
    pub fn new(n_equation: usize, nnz_sup: usize) -> Result<Self, StrError> {
        Ok(DenseLinearSystem {
            kk: CooMatrix::new(n_equation, n_equation, nnz_sup, Sym::No)?,
            kk_inv: Matrix::new(n_equation, n_equation),
            factorized: false,
        })
    }

    /// Returns the last assembled tangent matrix as a dense matrix
    pub fn tangent_as_dense(&self) -> Matrix {
        self.kk.as_dense()
    }
}

impl LinearSystemAdapter for DenseLinearSystem {
    fn reform(
        &mut self,
        tangent: &mut dyn TangentProvider,
        uu: &Vector,
        state: &EquilibriumState,
        rhs_correction: Option<&mut Vector>,
    ) -> Result<(), StrError> {
        self.factorized = false;
        self.kk.reset();
        tangent.tangent(&mut self.kk, uu, state)?;
        if let Some(rr) = rhs_correction {
            rr.fill(0.0);
            tangent.rhs_correction(rr, uu, state)?;
        }
        let kk_dense = self.kk.as_dense();
        mat_inverse(&mut self.kk_inv, &kk_dense)?;
        self.factorized = true;
        Ok(())
    }

    fn solve(&mut self, x: &mut Vector, rhs: &Vector) -> Result<(), StrError> {
        if !self.factorized {
            return Err("the tangent matrix must be reformed before solving");
        }
        mat_vec_mul(x, 1.0, &self.kk_inv, rhs)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
