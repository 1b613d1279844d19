use crate::base::Field;
use crate::solver::SolverLog;
use crate::StrError;
use plotpy::{Curve, Plot};

/// Defines the smallest ratio drawn on the logarithmic axis
const MIN_RATIO: f64 = 1e-30;

/// Holds the normalized convergence norms (current / initial) of a step
pub struct ConvergenceHistory {
    /// Step number
    pub step: usize,

    /// Iteration numbers
    pub iterations: Vec<f64>,

    /// Residual ratios
    pub residual: Vec<f64>,

    /// Energy ratios
    pub energy: Vec<f64>,

    /// Increment ratios of each participating field
    pub fields: Vec<(Field, Vec<f64>)>,
}

impl ConvergenceHistory {
    /// Extracts the history of a step from the log
    ///
    /// If the step has been attempted more than once, only the last attempt is considered.
    pub fn new(log: &SolverLog, step: usize) -> Result<Self, StrError> {
        let all = log.step_records(step);
        let start = all.iter().rposition(|r| r.iteration == 1).unwrap_or(0);
        let records = &all[start..];
        if records.len() == 0 {
            return Err("the log has no records for the given step");
        }
        let mut history = ConvergenceHistory {
            step,
            iterations: Vec::with_capacity(records.len()),
            residual: Vec::with_capacity(records.len()),
            energy: Vec::with_capacity(records.len()),
            fields: records[0]
                .norms
                .fields
                .iter()
                .map(|(field, _)| (*field, Vec::with_capacity(records.len())))
                .collect(),
        };
        for record in records {
            let norms = &record.norms;
            history.iterations.push(record.iteration as f64);
            history.residual.push(ratio(norms.residual.current, norms.residual.initial));
            history.energy.push(ratio(norms.energy.current, norms.energy.initial));
            for (field, values) in &mut history.fields {
                let entry = norms.fields.iter().find(|(f, _)| *f == *field).map(|(_, e)| e);
                values.push(match entry {
                    Some(e) => ratio(e.current, e.initial),
                    None => MIN_RATIO,
                });
            }
        }
        Ok(history)
    }

    /// Draws the history with a logarithmic y-axis and saves the figure
    pub fn draw<P>(&self, full_path: &P) -> Result<(), StrError>
    where
        P: AsRef<std::ffi::OsStr> + ?Sized,
    {
        let mut plot = Plot::new();
        let mut curve_residual = Curve::new();
        let mut curve_energy = Curve::new();
        curve_residual
            .set_label("residual")
            .set_line_color("#1a1a1a")
            .set_marker_style("o");
        curve_energy
            .set_label("energy")
            .set_line_color("#cd0000")
            .set_line_style("--")
            .set_marker_style("s");
        curve_residual.draw(&self.iterations, &self.residual);
        curve_energy.draw(&self.iterations, &self.energy);
        plot.add(&curve_residual).add(&curve_energy);
        let markers = ["^", "v", "d", "x"];
        for (field, values) in &self.fields {
            let mut curve = Curve::new();
            curve
                .set_label(field.name())
                .set_line_style(":")
                .set_marker_style(markers[field.index()]);
            curve.draw(&self.iterations, values);
            plot.add(&curve);
        }
        plot.set_log_y(true)
            .set_title(&format!("step {}", self.step + 1))
            .grid_labels_legend("iteration", "current / initial")
            .set_figure_size_points(600.0, 400.0)
            .save(full_path)?;
        Ok(())
    }
}

/// Returns the ratio current / initial (or current if initial is zero) clipped to the drawable range
fn ratio(current: f64, initial: f64) -> f64 {
    let value = if initial > 0.0 { current / initial } else { current };
    f64::max(value, MIN_RATIO)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
