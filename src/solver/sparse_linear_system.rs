use super::{EquilibriumState, LinearSystemAdapter, TangentProvider};
use crate::base::Config;
use crate::StrError;
use russell_lab::Vector;
use russell_sparse::{LinSolParams, LinSolver, SparseMatrix, Sym};

/// Implements the linear system adapter with a sparse direct solver
pub struct SparseLinearSystem<'a> {
    /// Total number of global equations
    pub n_equation: usize,

    /// Holds the supremum of the number of nonzero values (nnz) in the global matrix
    ///
    /// **Note:** The tangent provider reports this value because the elements share equations
    /// and only the provider knows how many local matrices are assembled into the global one.
    pub nnz_sup: usize,

    /// Holds the global tangent matrix K
    pub kk: SparseMatrix,

    /// Holds the linear solver
    pub solver: LinSolver<'a>,

    /// Holds the parameters of the linear solver
    params: LinSolParams,

    /// Indicates that the matrix has been factorized
    factorized: bool,
}

impl<'a> SparseLinearSystem<'a> {
    /// Allocates a new instance
    pub fn new(config: &Config, n_equation: usize, nnz_sup: usize) -> Result<Self, StrError> {
        Ok(SparseLinearSystem {
            n_equation,
            nnz_sup,
            kk: SparseMatrix::new_coo(n_equation, n_equation, nnz_sup, Sym::No)?,
            solver: LinSolver::new(config.lin_sol_genie)?,
            params: config.lin_sol_params,
            factorized: false,
        })
    }
}

impl<'a> LinearSystemAdapter for SparseLinearSystem<'a> {
    fn reform(
        &mut self,
        tangent: &mut dyn TangentProvider,
        uu: &Vector,
        state: &EquilibriumState,
        rhs_correction: Option<&mut Vector>,
    ) -> Result<(), StrError> {
        if tangent.nnz_sup() > self.nnz_sup {
            return Err("the number of non-zeros of the tangent exceeds the allocated nnz_sup");
        }

        // assemble the global tangent matrix
        let kk_coo = self.kk.get_coo_mut()?;
        kk_coo.reset();
        tangent.tangent(kk_coo, uu, state)?;

        // right-hand side correction
        if let Some(rr) = rhs_correction {
            rr.fill(0.0);
            tangent.rhs_correction(rr, uu, state)?;
        }

        // factorize the global tangent matrix
        self.factorized = false;
        self.solver.actual.factorize(&mut self.kk, Some(self.params))?;
        self.factorized = true;
        Ok(())
    }

    fn solve(&mut self, x: &mut Vector, rhs: &Vector) -> Result<(), StrError> {
        if !self.factorized {
            return Err("the tangent matrix must be reformed before solving");
        }
        self.solver.actual.solve(x, rhs, self.params.verbose)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
