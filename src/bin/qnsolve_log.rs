use qnsolve::solver::{SolverEvent, SolverLog, StepOutcome};
use qnsolve::util::ConvergenceHistory;
use qnsolve::StrError;
use structopt::StructOpt;

/// Command line options
#[derive(StructOpt, Debug)]
#[structopt(
    name = "qnsolve_log",
    about = "Prints the summary of a solver log and optionally draws the convergence graphs"
)]
struct Options {
    /// Path of the JSON file with the solver log
    log_path: String,

    /// Directory for the SVG files with the convergence graphs (no graphs if omitted)
    #[structopt(short, long)]
    graphs: Option<String>,
}

fn main() -> Result<(), StrError> {
    // parse options
    let options = Options::from_args();

    // load data
    let log = SolverLog::read_json(&options.log_path)?;

    // summary
    println!("{:>6} {:>10} {:>13} {:>15}  {}", "step", "iterations", "reformations", "rhs evaluations", "outcome");
    let mut n_converged = 0;
    for event in &log.events {
        if let SolverEvent::StepFinished {
            step,
            n_iterations,
            n_reformations,
            outcome,
        } = event
        {
            let n_rhs = log.step_records(*step).last().map(|r| r.n_rhs).unwrap_or(0);
            println!(
                "{:>6} {:>10} {:>13} {:>15}  {:?}",
                step + 1,
                n_iterations,
                n_reformations,
                n_rhs,
                outcome
            );
            if *outcome == StepOutcome::Converged {
                n_converged += 1;
            }
        }
    }
    let reformations = log.reformations();
    println!("\nconverged steps      : {}", n_converged);
    println!("total iterations     : {}", log.records.len());
    println!("total reformations   : {}", reformations.len());

    // graphs
    if let Some(out_dir) = &options.graphs {
        for event in &log.events {
            if let SolverEvent::StepFinished { step, outcome, .. } = event {
                if *outcome != StepOutcome::Converged {
                    continue;
                }
                let history = ConvergenceHistory::new(&log, *step)?;
                let path = format!("{}/convergence_step_{}.svg", out_dir, step + 1);
                history.draw(&path)?;
                println!("{}", path);
            }
        }
    }
    Ok(())
}
