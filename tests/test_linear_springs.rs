use qnsolve::prelude::*;
use qnsolve::solver::samples::LinearSpringModel;
use qnsolve::solver::{SolverEvent, Verdict};
use qnsolve::StrError;
use russell_lab::vec_approx_eq;

// Two springs in series with loads on both nodes
#[test]
fn test_linear_springs() -> Result<(), StrError> {
    //         k₀ = 1         k₁ = 1
    //   |-/\/\/\/\/\-(0)-/\/\/\/\/\-(1)
    //                 → f₀ = 1       → f₁ = 1
    //
    //  K = [ 2 -1 ]   f = [ 1 ]   u = [ 2 ]
    //      [-1  1 ]       [ 1 ]       [ 3 ]
    let mut model = LinearSpringModel::new(&[[2.0, -1.0], [-1.0, 1.0]], &[1.0, 1.0]);

    // solver
    let config = Config::new(Physics::Solid);
    let partition = EquationPartition::single(Field::Displacement, 2);
    let mut solver = EquilibriumSolver::new(&config, partition)?;
    let mut lin_sys = SparseLinearSystem::new(&config, 2, 4)?;
    let mut state = EquilibriumState::new(2);

    // first step: converges in one iteration
    let outcome = solver.solve_step(&mut model, &mut lin_sys, &mut state, 1.0)?;
    assert_eq!(outcome, StepOutcome::Converged);
    vec_approx_eq(&state.uu, &[2.0, 3.0], 1e-13);
    assert_eq!(solver.counters().n_iterations, 1);
    assert_eq!(solver.counters().n_reformations, 1);
    assert_eq!(solver.counters().n_updates, 0);

    // second step: the loads are already balanced
    let outcome = solver.solve_step(&mut model, &mut lin_sys, &mut state, 1.0)?;
    assert_eq!(outcome, StepOutcome::Converged);
    vec_approx_eq(&state.uu, &[2.0, 3.0], 1e-13);
    assert_eq!(solver.counters().n_iterations, 1);
    assert_eq!(solver.log().records[1].verdict, Verdict::ConvergedTrivial);
    assert!(solver
        .log()
        .events
        .iter()
        .any(|e| matches!(e, SolverEvent::NoForceActing { step: 1, .. })));

    // totals
    assert_eq!(state.n_step, 2);
    assert_eq!(state.t, 2.0);
    assert_eq!(solver.counters().total_iterations, 2);
    assert_eq!(solver.counters().n_converged_steps, 2);
    Ok(())
}

// The same springs with increasing stiffness (and loads) must converge in one iteration
#[test]
fn test_linear_springs_stiff() -> Result<(), StrError> {
    //  K = [ 2 -1 ] ⋅ E   f = [ 1 ] ⋅ E   u = [ 2 ]
    //      [-1  1 ]           [ 1 ]           [ 3 ]
    let config = Config::new(Physics::Solid);
    for scale in [1.0, 1e6, 1e9] {
        let mut model = LinearSpringModel::new(
            &[[2.0 * scale, -1.0 * scale], [-1.0 * scale, 1.0 * scale]],
            &[1.0 * scale, 1.0 * scale],
        );
        let partition = EquationPartition::single(Field::Displacement, 2);
        let mut solver = EquilibriumSolver::new(&config, partition)?;
        let mut lin_sys = DenseLinearSystem::new(2, 4)?;
        let mut state = EquilibriumState::new(2);
        let outcome = solver.solve_step(&mut model, &mut lin_sys, &mut state, 1.0)?;
        assert_eq!(outcome, StepOutcome::Converged);
        assert_eq!(solver.counters().n_iterations, 1);
        assert_eq!(solver.counters().n_updates, 0);
        vec_approx_eq(&state.uu, &[2.0, 3.0], 1e-12);
    }
    Ok(())
}
