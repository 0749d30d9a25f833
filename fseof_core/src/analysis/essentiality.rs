//! Reaction essentiality by single reaction knock-out
use indexmap::IndexMap;
use log::debug;
use rayon::prelude::*;

use crate::analysis::fba::fba;
use crate::analysis::{worker_pool, AnalysisError};
use crate::configuration::Solver;
use crate::metabolic_model::model::Model;

/// Check whether knocking out a reaction stops growth
///
/// The reaction is knocked out on a copy of the model and the model objective maximized.
/// The reaction is essential if the knock-out model can't be optimized for any reason, or
/// if the growth it reaches is below `threshold * maximal_growth`. Only an unknown
/// `reaction_id` is an error.
pub fn is_essential(
    model: &Model,
    reaction_id: &str,
    maximal_growth: f64,
    threshold: f64,
    solver: Solver,
) -> Result<bool, AnalysisError> {
    let mut knock_out = model.clone();
    knock_out.knock_out_reaction(reaction_id)?;
    let essential = match fba(&knock_out, solver) {
        Ok(solution) => solution.objective_value < threshold * maximal_growth,
        Err(err) => {
            debug!("Knock-out of {} failed: {}", reaction_id, err);
            true
        }
    };
    Ok(essential)
}

/// Check the essentiality of several reactions, spread over `processes` threads
pub fn essential_reactions(
    model: &Model,
    reaction_ids: &[String],
    threshold: f64,
    processes: usize,
    solver: Solver,
) -> Result<IndexMap<String, bool>, AnalysisError> {
    if !(0f64..=1f64).contains(&threshold) {
        return Err(AnalysisError::InvalidArgument(format!(
            "essentiality threshold must be in [0, 1], got {}",
            threshold
        )));
    }
    let maximal_growth = fba(model, solver)?.objective_value;
    let pool = worker_pool(processes)?;
    pool.install(|| {
        reaction_ids
            .par_iter()
            .map(|id| -> Result<(String, bool), AnalysisError> {
                Ok((
                    id.clone(),
                    is_essential(model, id, maximal_growth, threshold, solver)?,
                ))
            })
            .collect::<Result<Vec<_>, _>>()
    })
    .map(|checked| checked.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic_model::model::tests::toy_model;

    #[test]
    fn single_knock_outs() {
        let model = toy_model();
        // The only uptake, growth stops entirely
        assert!(is_essential(&model, "EX_a", 10., 0.5, Solver::Microlp).unwrap());
        // R3 can carry the flux of R1
        assert!(!is_essential(&model, "R1", 10., 0.5, Solver::Microlp).unwrap());
    }

    #[test]
    fn threshold_matters() {
        let mut model = toy_model();
        model.set_reaction_bounds("R3", 0., 4.).unwrap();
        // Without R1 and R2 only 4 of 10 units of growth remain
        assert!(is_essential(&model, "R1", 10., 0.5, Solver::Microlp).unwrap());
        assert!(!is_essential(&model, "R1", 10., 0.3, Solver::Microlp).unwrap());
    }

    #[test]
    fn infeasible_knock_out_is_essential() {
        let mut model = toy_model();
        model.set_reaction_bounds("BIOMASS", 1., 1000.).unwrap();
        assert!(is_essential(&model, "EX_a", 10., 0.5, Solver::Microlp).unwrap());
    }

    #[test]
    fn failed_knock_out_is_essential() {
        let mut model = toy_model();
        // Not a solver status, the knock-out can't be solved at all
        model.objective.clear();
        assert!(is_essential(&model, "R1", 10., 0.5, Solver::Microlp).unwrap());
        assert!(is_essential(&model, "R1", 10., 0.5, Solver::Clarabel).unwrap());
    }

    #[test]
    fn many_reactions() {
        let model = toy_model();
        let ids = model.reaction_ids();
        let essential = essential_reactions(&model, &ids, 0.5, 2, Solver::Microlp).unwrap();
        assert_eq!(
            essential.keys().cloned().collect::<Vec<_>>(),
            model.reaction_ids()
        );
        assert!(essential["EX_a"]);
        assert!(essential["BIOMASS"]);
        assert!(!essential["R2"]);
        assert!(!essential["R3"]);
    }

    #[test]
    fn unknown_reaction() {
        let model = toy_model();
        assert!(matches!(
            is_essential(&model, "NOPE", 10., 0.5, Solver::Microlp),
            Err(AnalysisError::Model(_))
        ));
    }
}
