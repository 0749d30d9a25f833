//! Flux variability analysis
use indexmap::IndexMap;
use log::{debug, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::analysis::fba::{solve_optimal, FluxSolution};
use crate::analysis::{worker_pool, AnalysisError};
use crate::configuration::Solver;
use crate::metabolic_model::model::Model;
use crate::optimize::constraint::Constraint;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;

/// Id of the constraint holding the objective near its optimum
pub(crate) const OBJECTIVE_FLOOR: &str = "fva_objective_floor";

/// Minimum and maximum feasible flux of a reaction
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FluxRange {
    pub minimum: f64,
    pub maximum: f64,
}

impl FluxRange {
    /// Midpoint of the range
    pub fn midpoint(&self) -> f64 {
        (self.minimum + self.maximum) / 2f64
    }

    pub fn width(&self) -> f64 {
        self.maximum - self.minimum
    }
}

/// Constrain the problem objective to stay within `fraction_of_optimum` of its optimum
///
/// For maximization the objective must be at least `optimum - (1 - fraction) * |optimum|`,
/// for minimization at most `optimum + (1 - fraction) * |optimum|`. Returns the optimum.
pub(crate) fn constrain_objective(
    problem: &mut Problem,
    fraction_of_optimum: f64,
    tolerance: f64,
    solver: Solver,
) -> Result<f64, AnalysisError> {
    if !(0f64..=1f64).contains(&fraction_of_optimum) {
        return Err(AnalysisError::InvalidArgument(format!(
            "fraction_of_optimum must be in [0, 1], got {}",
            fraction_of_optimum
        )));
    }
    let optimum = solve_optimal(problem, solver)?.objective_value;
    let slack = (1f64 - fraction_of_optimum) * optimum.abs() + tolerance;
    let (variables, coefficients): (Vec<usize>, Vec<f64>) = problem
        .objective()
        .terms()
        .iter()
        .map(|t| (t.variable, t.coefficient))
        .unzip();
    let (lower_bound, upper_bound) = match problem.objective().sense() {
        ObjectiveSense::Maximize => (optimum - slack, f64::INFINITY),
        ObjectiveSense::Minimize => (f64::NEG_INFINITY, optimum + slack),
    };
    problem.remove_constraint(OBJECTIVE_FLOOR);
    problem.add_constraint(
        OBJECTIVE_FLOOR,
        Constraint::new_inequality(&variables, &coefficients, lower_bound, upper_bound),
    )?;
    debug!(
        "Objective constrained to [{}, {}] (optimum {})",
        lower_bound, upper_bound, optimum
    );
    Ok(optimum)
}

/// Minimize and maximize every variable of the problem in turn
///
/// Returns, for each variable in problem order, the minimizing and the maximizing solution,
/// or the error of whichever of the two could not be solved. The work is spread over
/// `processes` threads, each task solves its own copy of the problem.
pub(crate) fn extreme_solutions(
    problem: &Problem,
    processes: usize,
    solver: Solver,
) -> Result<Vec<Result<(FluxSolution, FluxSolution), AnalysisError>>, AnalysisError> {
    let ids: Vec<String> = problem.variables().keys().cloned().collect();
    let pool = worker_pool(processes)?;
    Ok(pool.install(|| {
        ids.par_iter()
            .map(|id| -> Result<(FluxSolution, FluxSolution), AnalysisError> {
                let mut local = problem.clone();
                local.set_single_objective(id, ObjectiveSense::Minimize)?;
                let minimum = solve_optimal(&local, solver)?;
                local.update_objective_sense(ObjectiveSense::Maximize);
                let maximum = solve_optimal(&local, solver)?;
                Ok((minimum, maximum))
            })
            .collect()
    }))
}

/// Run flux variability analysis over all reactions of the model
///
/// The model objective is held at `fraction_of_optimum` of its optimum while each reaction
/// is minimized and maximized. The analysis fails if the objective itself can't be
/// optimized. A reaction whose minimum or maximum has no optimum (e.g. it is unbounded) gets
/// the error in place of its range, the other reactions are unaffected.
pub fn flux_variability_analysis(
    model: &Model,
    fraction_of_optimum: f64,
    processes: usize,
    solver: Solver,
) -> Result<IndexMap<String, Result<FluxRange, AnalysisError>>, AnalysisError> {
    let tolerance = crate::configuration::current().tolerance;
    let mut problem = model.to_problem()?;
    constrain_objective(&mut problem, fraction_of_optimum, tolerance, solver)?;
    let extremes = extreme_solutions(&problem, processes, solver)?;
    Ok(model
        .reactions
        .keys()
        .zip(extremes)
        .map(|(id, extreme)| {
            let range = extreme.map(|(minimum, maximum)| FluxRange {
                minimum: minimum.objective_value,
                maximum: maximum.objective_value,
            });
            if let Err(err) = &range {
                warn!("No flux range for {}: {}", id, err);
            }
            (id.clone(), range)
        })
        .collect())
}
