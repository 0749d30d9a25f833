//! Flux balance analysis, with optional loop removal
use indexmap::IndexMap;
use log::{debug, warn};

use crate::analysis::AnalysisError;
use crate::configuration::Solver;
use crate::metabolic_model::model::Model;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;

/// Optimal flux distribution of a model
#[derive(Clone, Debug, PartialEq)]
pub struct FluxSolution {
    /// Value of the model objective
    pub objective_value: f64,
    /// Flux through every reaction, keyed by reaction id, in model order
    pub fluxes: IndexMap<String, f64>,
}

impl FluxSolution {
    /// Flux through a reaction, 0 for unknown reactions
    pub fn flux(&self, reaction_id: &str) -> f64 {
        self.fluxes.get(reaction_id).copied().unwrap_or(0f64)
    }
}

/// Solve a problem, turning anything but an optimal solution into an error
pub(crate) fn solve_optimal(problem: &Problem, solver: Solver) -> Result<FluxSolution, AnalysisError> {
    let solution = problem.solve(&solver)?;
    if !solution.is_optimal() {
        return Err(AnalysisError::NotOptimal(solution.status));
    }
    match (solution.objective_value, solution.variable_values) {
        (Some(objective_value), Some(fluxes)) => Ok(FluxSolution {
            objective_value,
            fluxes,
        }),
        _ => Err(AnalysisError::NotOptimal(solution.status)),
    }
}

/// Run flux balance analysis on the model objective
pub fn fba(model: &Model, solver: Solver) -> Result<FluxSolution, AnalysisError> {
    if model.objective.is_empty() {
        return Err(AnalysisError::InvalidArgument(
            "model has no objective".to_string(),
        ));
    }
    solve_optimal(&model.to_problem()?, solver)
}

/// Run flux balance analysis and remove thermodynamically infeasible loops from the result
///
/// Implements CycleFreeFlux: with boundary reactions and the objective reactions fixed to
/// their FBA values, and every internal reaction restricted to the direction (and at most the
/// magnitude) of its FBA flux, the total internal flux is minimized. The objective value is
/// unchanged. If the second problem can't be solved the plain FBA solution is returned.
pub fn loopless_fba(model: &Model, solver: Solver) -> Result<FluxSolution, AnalysisError> {
    let solution = fba(model, solver)?;
    let mut problem = model.to_problem()?;
    problem.remove_all_objective_terms();
    problem.update_objective_sense(ObjectiveSense::Minimize);

    for (index, reaction) in model.reactions.values().enumerate() {
        let flux = solution.flux(&reaction.id);
        if reaction.is_boundary() || model.objective.contains_key(&reaction.id) {
            problem.update_variable_bounds(&reaction.id, flux, flux)?;
        } else if flux >= 0f64 {
            let lower = reaction.lower_bound.max(0f64).min(flux);
            problem.update_variable_bounds(&reaction.id, lower, flux)?;
            problem.add_new_linear_objective_term(index, 1f64)?;
        } else {
            let upper = reaction.upper_bound.min(0f64).max(flux);
            problem.update_variable_bounds(&reaction.id, flux, upper)?;
            problem.add_new_linear_objective_term(index, -1f64)?;
        }
    }

    match solve_optimal(&problem, solver) {
        Ok(loopless) => {
            debug!(
                "Removed {:.6} units of loop flux",
                total_flux(&solution) - total_flux(&loopless)
            );
            Ok(FluxSolution {
                objective_value: solution.objective_value,
                fluxes: loopless.fluxes,
            })
        }
        Err(err) => {
            warn!("Loop removal failed ({}), keeping the FBA solution", err);
            Ok(solution)
        }
    }
}

fn total_flux(solution: &FluxSolution) -> f64 {
    solution.fluxes.values().map(|v| v.abs()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic_model::model::tests::toy_model;
    use crate::metabolic_model::reaction::ReactionBuilder;
    use approx::assert_abs_diff_eq;

    #[test]
    fn toy_model_growth() {
        let model = toy_model();
        for solver in [Solver::Microlp, Solver::Clarabel] {
            let solution = fba(&model, solver).unwrap();
            assert_abs_diff_eq!(solution.objective_value, 10., epsilon = 1e-5);
            assert_abs_diff_eq!(solution.flux("BIOMASS"), 10., epsilon = 1e-5);
            assert_abs_diff_eq!(
                solution.flux("R1") + solution.flux("R3"),
                10.,
                epsilon = 1e-5
            );
        }
    }

    #[test]
    fn infeasible_model() {
        let mut model = toy_model();
        // Force more biomass than can be produced from the uptake
        model.set_reaction_bounds("BIOMASS", 20., 1000.).unwrap();
        assert_eq!(
            fba(&model, Solver::Microlp),
            Err(AnalysisError::NotOptimal(
                crate::optimize::OptimizationStatus::Infeasible
            ))
        );
    }

    #[test]
    fn no_objective() {
        let mut model = toy_model();
        model.objective.clear();
        assert!(matches!(
            fba(&model, Solver::Microlp),
            Err(AnalysisError::InvalidArgument(_))
        ));
    }

    #[test]
    fn loops_are_removed() {
        let mut model = toy_model();
        // b <-> d <-> b forms a cycle that FBA may fill with arbitrary flux
        let mut forward = IndexMap::new();
        forward.insert("b".to_string(), -1.);
        forward.insert("d".to_string(), 1.);
        let mut backward = IndexMap::new();
        backward.insert("d".to_string(), -1.);
        backward.insert("b".to_string(), 1.);
        model
            .add_reaction(
                ReactionBuilder::default()
                    .id("LOOP1")
                    .metabolites(forward)
                    .lower_bound(0.)
                    .upper_bound(1000.)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        model
            .add_reaction(
                ReactionBuilder::default()
                    .id("LOOP2")
                    .metabolites(backward)
                    .lower_bound(0.)
                    .upper_bound(1000.)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let solution = loopless_fba(&model, Solver::Microlp).unwrap();
        assert_abs_diff_eq!(solution.objective_value, 10., epsilon = 1e-6);
        assert_abs_diff_eq!(solution.flux("LOOP1"), 0., epsilon = 1e-6);
        assert_abs_diff_eq!(solution.flux("LOOP2"), 0., epsilon = 1e-6);
        assert_abs_diff_eq!(solution.flux("BIOMASS"), 10., epsilon = 1e-6);
    }
}
