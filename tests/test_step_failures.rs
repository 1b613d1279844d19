use qnsolve::prelude::*;
use qnsolve::solver::samples::{CubicSpringModel, NanModel};
use qnsolve::StrError;

#[test]
fn test_iteration_cap() -> Result<(), StrError> {
    let mut config = Config::new(Physics::Solid);
    config.set_tol_all(1e-10)?.set_n_max_iterations(2)?;
    let mut model = CubicSpringModel::new(10.0);
    let partition = EquationPartition::single(Field::Displacement, 1);
    let mut solver = EquilibriumSolver::new(&config, partition)?;
    let mut lin_sys = DenseLinearSystem::new(1, 1)?;
    let mut state = EquilibriumState::new(1);
    let outcome = solver.solve_step(&mut model, &mut lin_sys, &mut state, 0.5)?;
    assert_eq!(outcome, StepOutcome::NotConverged(NonConvergence::IterationLimit));
    assert_eq!(solver.counters().n_iterations, 2);
    assert_eq!(state.uu[0], 0.0);
    assert_eq!(state.t, 0.0);
    assert_eq!(solver.log().outcomes(), &[outcome]);
    Ok(())
}

#[test]
fn test_corrupted_residual() -> Result<(), StrError> {
    let config = Config::new(Physics::Solid);
    let mut model = NanModel::new();
    let partition = EquationPartition::single(Field::Displacement, 1);
    let mut solver = EquilibriumSolver::new(&config, partition)?;
    let mut lin_sys = DenseLinearSystem::new(1, 1)?;
    let mut state = EquilibriumState::new(1);
    let outcome = solver.solve_step(&mut model, &mut lin_sys, &mut state, 1.0)?;
    assert_eq!(outcome, StepOutcome::Corrupted);
    assert_eq!(solver.counters().n_iterations, 0);
    assert_eq!(state.uu[0], 0.0);
    assert_eq!(state.t, 0.0);
    Ok(())
}
