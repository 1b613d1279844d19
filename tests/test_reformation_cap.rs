use qnsolve::prelude::*;
use qnsolve::solver::samples::DivergingModel;
use qnsolve::solver::ReformReason;
use qnsolve::StrError;

// Always-diverging system: R = 1 + u with K = 1
#[test]
fn test_reformation_cap() -> Result<(), StrError> {
    let mut config = Config::new(Physics::Solid);
    config.set_line_search(0.0, 5)?;
    let mut model = DivergingModel::new();
    let partition = EquationPartition::single(Field::Displacement, 1);
    let mut solver = EquilibriumSolver::new(&config, partition)?;
    let mut lin_sys = DenseLinearSystem::new(1, 1)?;
    let mut state = EquilibriumState::new(1);

    // the step fails (no infinite loop)
    let outcome = solver.solve_step(&mut model, &mut lin_sys, &mut state, 1.0)?;
    assert_eq!(outcome, StepOutcome::NotConverged(NonConvergence::ReformationLimit));
    assert_eq!(solver.counters().n_reformations, config.max_reformations);
    assert_eq!(solver.counters().n_failed_steps, 1);

    // the state is left at the beginning of the step
    assert_eq!(state.uu[0], 0.0);
    assert_eq!(state.t, 0.0);
    assert_eq!(state.n_step, 0);

    // the baseline is reset at each divergence-triggered reformation
    let records = &solver.log().records;
    for i in 1..records.len() {
        assert!(records[i].norms.energy.initial > records[i - 1].norms.energy.initial);
        assert_eq!(records[i].norms.energy.initial, records[i - 1].norms.energy.current);
    }
    let reasons: Vec<_> = solver.log().reformations().iter().map(|(_, _, r)| *r).collect();
    assert_eq!(reasons[0], ReformReason::Initial);
    assert!(reasons[1..].iter().all(|r| *r == ReformReason::Diverging));
    Ok(())
}
