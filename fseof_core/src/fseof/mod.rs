//! Flux scanning based on enforced objective flux
//!
//! A sink for the target metabolite is added to the model and a lower bound on it is stepped
//! from a low to a high fraction of its theoretical maximum. At every step biomass is
//! maximized and the reaction fluxes are measured by FBA, FVA or flux sampling. Reactions
//! whose flux grows with the enforced product flux are up-regulation targets, reactions whose
//! flux shrinks are down-regulation targets.
//!
//! ```no_run
//! use fseof_core::fseof::{Fseof, FseofOptions};
//! use fseof_core::metabolic_model::model::Model;
//!
//! let model = Model::read_json("model.json").unwrap();
//! let fseof = Fseof::new(&model, "BIOMASS", "succ_c").unwrap();
//! let table = fseof.run(&FseofOptions::fvseof(10, true, 4)).unwrap();
//! table.write_csv("targets.csv").unwrap();
//! ```
pub mod aggregate;
pub mod report;
pub mod schedule;
pub mod step;

use derive_builder::Builder;
use indexmap::IndexMap;
use log::{info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::analysis::essentiality::essential_reactions;
use crate::analysis::AnalysisError;
use crate::configuration::Solver;
use crate::fseof::aggregate::{classify, slope};
use crate::fseof::report::{ReportError, TargetRow, TargetTable};
use crate::fseof::schedule::{theoretical_max_yield, BoundSchedule, ScheduleKind};
use crate::fseof::step::{StepContext, StepFailure, StepMode};
use crate::metabolic_model::model::{Model, ModelError};
use crate::optimize::objective::ObjectiveSense;

/// Suffix of the product sink reaction added to the model
pub const SINK_SUFFIX: &str = "_fseof_sink";

/// Settings of a single sweep
#[derive(Builder, Clone, Debug, PartialEq, Serialize)]
pub struct FseofOptions {
    /// Number of bounds of a linear schedule
    #[builder(default = "10")]
    pub n_steps: usize,
    /// Fraction of the maximal yield enforced at the first step
    #[builder(default = "0.0")]
    pub fraction_low: f64,
    /// Fraction of the maximal yield enforced at the last step
    #[builder(default = "0.9")]
    pub fraction_high: f64,
    #[builder(default)]
    pub schedule: ScheduleKind,
    #[builder(default)]
    pub mode: StepMode,
    /// Check whether the found targets are essential for growth
    #[builder(default = "false")]
    pub check_essentiality: bool,
}

impl Default for FseofOptions {
    fn default() -> Self {
        FseofOptions {
            n_steps: 10,
            fraction_low: 0.0,
            fraction_high: 0.9,
            schedule: ScheduleKind::Linear,
            mode: StepMode::default(),
            check_essentiality: false,
        }
    }
}

impl FseofOptions {
    /// FVSEOF (with `fva`) or FSEOF: the bounds `i / n_steps * max_yield` for `i` in
    /// `0..n_steps`, i.e. a linear schedule from 0 to `(n_steps - 1) / n_steps`
    pub fn fvseof(n_steps: usize, fva: bool, fva_n_processes: usize) -> Self {
        let mode = if fva {
            StepMode::Fva {
                fraction_of_optimum: 0.95,
                processes: fva_n_processes,
            }
        } else {
            StepMode::Fba { loopless: true }
        };
        FseofOptions {
            n_steps,
            fraction_high: n_steps.saturating_sub(1) as f64 / n_steps.max(1) as f64,
            mode,
            ..FseofOptions::default()
        }
    }

    /// FSEOF_FS: `n` flux samples at a low and at a high fraction of the maximal yield
    pub fn fseof_fs(fraction_low: f64, fraction_high: f64, n: usize) -> Self {
        FseofOptions {
            n_steps: 2,
            fraction_low,
            fraction_high,
            schedule: ScheduleKind::TwoPoint,
            mode: StepMode::Sampling {
                n_samples: n,
                thinning: 100,
                fraction_of_optimum: 0.95,
                seed: None,
            },
            check_essentiality: false,
        }
    }

    /// Processes used for the parallel parts of the run
    fn processes(&self) -> usize {
        match self.mode {
            StepMode::Fva { processes, .. } => processes,
            _ => crate::configuration::current().processes,
        }
    }
}

/// Target identification for one model, biomass reaction and product
#[derive(Clone, Debug)]
pub struct Fseof {
    model: Model,
    biomass_reaction_id: String,
    target_metabolite_id: String,
    sink_id: String,
    max_yield: f64,
    essential_reaction_threshold: f64,
    solver: Solver,
    tolerance: f64,
}

impl Fseof {
    /// Prepare a sweep, adding the product sink to a copy of `model` and computing the
    /// theoretical maximal yield of the product
    pub fn new(
        model: &Model,
        biomass_reaction_id: &str,
        target_metabolite_id: &str,
    ) -> Result<Self, FseofError> {
        if !model.reactions.contains_key(biomass_reaction_id) {
            return Err(FseofError::BiomassReactionNotFound(
                biomass_reaction_id.to_string(),
            ));
        }
        if !model.metabolites.contains_key(target_metabolite_id) {
            return Err(FseofError::TargetMetaboliteNotFound(
                target_metabolite_id.to_string(),
            ));
        }
        let config = crate::configuration::current();
        let mut model = model.clone();
        let sink_id = model.add_sink_reaction(target_metabolite_id, SINK_SUFFIX)?;
        model.set_objective(biomass_reaction_id, ObjectiveSense::Maximize)?;
        let max_yield = theoretical_max_yield(&model, &sink_id, config.solver, config.tolerance)?;
        Ok(Fseof {
            model,
            biomass_reaction_id: biomass_reaction_id.to_string(),
            target_metabolite_id: target_metabolite_id.to_string(),
            sink_id,
            max_yield,
            essential_reaction_threshold: 0.5,
            solver: config.solver,
            tolerance: config.tolerance,
        })
    }

    /// Fraction of the maximal growth below which a knock-out counts as essential
    pub fn essential_reaction_threshold(mut self, threshold: f64) -> Result<Self, FseofError> {
        if !(0f64..=1f64).contains(&threshold) {
            return Err(FseofError::InvalidOptions(format!(
                "essential_reaction_threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        self.essential_reaction_threshold = threshold;
        Ok(self)
    }

    /// Use another solver, the maximal yield is recomputed with it
    pub fn solver(mut self, solver: Solver) -> Result<Self, FseofError> {
        if solver != self.solver {
            self.max_yield = theoretical_max_yield(&self.model, &self.sink_id, solver, self.tolerance)?;
            self.solver = solver;
        }
        Ok(self)
    }

    pub fn max_yield(&self) -> f64 {
        self.max_yield
    }

    pub fn sink_id(&self) -> &str {
        &self.sink_id
    }

    pub fn target_metabolite_id(&self) -> &str {
        &self.target_metabolite_id
    }

    /// The model with the product sink added
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Run the sweep and classify every reaction of the model
    ///
    /// Options are checked before anything is solved. Steps that can't be solved are
    /// recorded in the table and leave their values missing.
    pub fn run(&self, options: &FseofOptions) -> Result<TargetTable, FseofError> {
        options.mode.validate().map_err(FseofError::InvalidOptions)?;
        let schedule = BoundSchedule::new(
            options.schedule,
            self.max_yield,
            options.n_steps,
            options.fraction_low,
            options.fraction_high,
        )?;
        info!(
            "Sweeping {} over {} bounds with {:?}",
            self.sink_id,
            schedule.len(),
            options.mode
        );

        let context = StepContext {
            model: &self.model,
            biomass_id: &self.biomass_reaction_id,
            sink_id: &self.sink_id,
            mode: options.mode,
            solver: self.solver,
        };
        let mut statistics: Vec<Option<IndexMap<String, f64>>> = Vec::with_capacity(schedule.len());
        let mut failures = Vec::new();
        for (step, bound) in schedule.iter().enumerate() {
            info!("Step {}/{}, bound {}", step + 1, schedule.len(), bound);
            match context.run(step, bound) {
                Ok(result) => {
                    for (reaction_id, reason) in result.failures() {
                        warn!("Step {} (bound {}): no value for {}: {}", step, bound, reaction_id, reason);
                        failures.push(StepFailure {
                            step,
                            bound,
                            reaction_id: Some(reaction_id),
                            reason,
                        });
                    }
                    statistics.push(Some(result.statistic()));
                }
                Err(err) => {
                    warn!("Step {} (bound {}) failed: {}", step, bound, err);
                    failures.push(StepFailure {
                        step,
                        bound,
                        reaction_id: None,
                        reason: err.to_string(),
                    });
                    statistics.push(None);
                }
            }
        }

        let mut rows: Vec<TargetRow> = self
            .model
            .reactions
            .values()
            .filter(|reaction| reaction.id != self.sink_id)
            .map(|reaction| {
                let values: Vec<Option<f64>> = statistics
                    .iter()
                    .map(|step| step.as_ref().and_then(|s| s.get(&reaction.id).copied()))
                    .collect();
                let low = values.first().copied().flatten();
                let high = values.last().copied().flatten();
                TargetRow {
                    reaction_id: reaction.id.clone(),
                    reaction_name: reaction.name.clone(),
                    gene_reaction_rule: reaction.gene_reaction_rule.clone(),
                    classification: classify(low, high, self.tolerance),
                    slope: slope(schedule.bounds(), &values),
                    change: low.zip(high).map(|(l, h)| h - l),
                    values,
                    low,
                    high,
                    essential: None,
                }
            })
            .collect();

        if options.check_essentiality {
            let targets: Vec<String> = rows
                .iter()
                .filter(|row| row.is_target())
                .map(|row| row.reaction_id.clone())
                .collect();
            info!("Checking essentiality of {} targets", targets.len());
            let essential = essential_reactions(
                &self.model,
                &targets,
                self.essential_reaction_threshold,
                options.processes(),
                self.solver,
            )?;
            for row in rows.iter_mut() {
                row.essential = essential.get(&row.reaction_id).copied();
            }
        }

        let table = TargetTable::new(schedule, rows, failures);
        info!(
            "Found {} targets, {} of {} steps failed",
            table.targets().count(),
            table.failures.len(),
            table.schedule.len()
        );
        Ok(table)
    }
}

/// Errors that stop a sweep
#[derive(Error, Debug)]
pub enum FseofError {
    #[error("Biomass reaction {0} is not in the model")]
    BiomassReactionNotFound(String),
    #[error("Target metabolite {0} is not in the model")]
    TargetMetaboliteNotFound(String),
    /// The maximal yield of the product could not be computed
    #[error("Unable to compute the maximal yield: {0}")]
    InfeasibleBaseline(String),
    #[error("The model can't produce through {sink}, maximal yield is {max_yield}")]
    NoProduction { sink: String, max_yield: f64 },
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fseof::aggregate::{Classification, ExclusionReason, TargetType};
    use crate::metabolic_model::model::tests::toy_model;
    use approx::assert_abs_diff_eq;

    /// Toy model where b is the product: the R1/R2 route makes b, the R3 route doesn't
    fn toy_fseof() -> Fseof {
        Fseof::new(&toy_model(), "BIOMASS", "b").unwrap()
    }

    #[test]
    fn setup() {
        let fseof = toy_fseof();
        assert_eq!(fseof.sink_id(), "b_fseof_sink");
        assert_abs_diff_eq!(fseof.max_yield(), 10., epsilon = 1e-6);
        assert!(fseof.model().reactions.contains_key("b_fseof_sink"));
        assert!(matches!(
            Fseof::new(&toy_model(), "GROWTH", "b"),
            Err(FseofError::BiomassReactionNotFound(_))
        ));
        assert!(matches!(
            Fseof::new(&toy_model(), "BIOMASS", "z"),
            Err(FseofError::TargetMetaboliteNotFound(_))
        ));
    }

    #[test]
    fn fvseof_targets() {
        let table = toy_fseof()
            .run(&FseofOptions::fvseof(5, true, 1))
            .unwrap();
        assert!(table.failures.is_empty());
        assert_eq!(table.rows.len(), 5);
        assert_eq!(table.bounds().len(), 5);
        for (bound, expected) in table.bounds().iter().zip([0., 2., 4., 6., 8.]) {
            assert_abs_diff_eq!(*bound, expected, epsilon = 1e-9);
        }
        let r1 = table.row("R1").unwrap();
        assert_eq!(r1.classification, Classification::Target(TargetType::Up));
        assert_abs_diff_eq!(r1.low.unwrap(), 5., epsilon = 1e-5);
        assert_abs_diff_eq!(r1.high.unwrap(), 9., epsilon = 1e-5);
        assert_eq!(
            table.row("R3").unwrap().classification,
            Classification::Target(TargetType::Down)
        );
        assert_eq!(
            table.row("BIOMASS").unwrap().classification,
            Classification::Target(TargetType::Down)
        );
        assert!(table.row("BIOMASS").unwrap().slope.unwrap() < 0.);
        assert!(table.row("b_fseof_sink").is_none());
    }

    #[test]
    fn essentiality_of_targets() {
        let options = FseofOptions {
            check_essentiality: true,
            ..FseofOptions::fvseof(4, false, 1)
        };
        let table = toy_fseof().run(&options).unwrap();
        for row in &table.rows {
            assert_eq!(row.essential.is_some(), row.is_target());
        }
        assert_eq!(table.row("BIOMASS").unwrap().essential, Some(true));
        // Either route from a to c can carry all the flux
        for id in ["R1", "R2", "R3"] {
            let row = table.row(id).unwrap();
            if row.is_target() {
                assert_eq!(row.essential, Some(false));
            }
        }
    }

    #[test]
    fn invalid_options_rejected() {
        let fseof = toy_fseof();
        let options = FseofOptionsBuilder::default()
            .fraction_low(0.8)
            .fraction_high(0.2)
            .build()
            .unwrap();
        assert!(matches!(
            fseof.run(&options),
            Err(FseofError::InvalidOptions(_))
        ));
        let options = FseofOptionsBuilder::default().n_steps(0).build().unwrap();
        assert!(matches!(
            fseof.run(&options),
            Err(FseofError::InvalidOptions(_))
        ));
        let options = FseofOptionsBuilder::default()
            .mode(StepMode::Fva {
                fraction_of_optimum: 0.95,
                processes: 0,
            })
            .build()
            .unwrap();
        assert!(matches!(
            fseof.run(&options),
            Err(FseofError::InvalidOptions(_))
        ));
        assert!(matches!(
            fseof.clone().essential_reaction_threshold(2.0),
            Err(FseofError::InvalidOptions(_))
        ));
    }

    #[test]
    fn builder_defaults() {
        assert_eq!(
            FseofOptionsBuilder::default().build().unwrap(),
            FseofOptions::default()
        );
    }

    #[test]
    fn failed_steps_are_recorded() {
        let mut model = toy_model();
        // An unbounded reaction makes every FVA problem for it unbounded
        let mut stoichiometry = IndexMap::new();
        stoichiometry.insert("d".to_string(), 1.);
        model
            .add_reaction(
                crate::metabolic_model::reaction::ReactionBuilder::default()
                    .id("LEAK")
                    .metabolites(stoichiometry)
                    .lower_bound(0.)
                    .upper_bound(f64::INFINITY)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        model.add_sink_reaction("d", "_out").unwrap();
        model.set_reaction_bounds("d_out", 0., f64::INFINITY).unwrap();

        let fseof = Fseof::new(&model, "BIOMASS", "b").unwrap();
        let table = fseof.run(&FseofOptions::fvseof(3, true, 1)).unwrap();
        // Both unbounded reactions fail at every step, nothing else does
        assert_eq!(table.failures.len(), 6);
        for failure in &table.failures {
            let id = failure.reaction_id.as_deref().unwrap();
            assert!(id == "LEAK" || id == "d_out");
        }
        assert_eq!(
            table.failures.iter().map(|f| f.step).collect::<Vec<_>>(),
            vec![0, 0, 1, 1, 2, 2]
        );
        for id in ["LEAK", "d_out"] {
            let row = table.row(id).unwrap();
            assert!(row.values.iter().all(|v| v.is_none()));
            assert_eq!(
                row.classification,
                Classification::Excluded(ExclusionReason::MissingData)
            );
        }
        let r1 = table.row("R1").unwrap();
        assert!(r1.values.iter().all(|v| v.is_some()));
        assert_abs_diff_eq!(r1.low.unwrap(), 5., epsilon = 1e-5);
        assert_abs_diff_eq!(r1.high.unwrap(), 25. / 3., epsilon = 1e-5);
        assert_eq!(r1.classification, Classification::Target(TargetType::Up));
        assert_eq!(
            table.row("BIOMASS").unwrap().classification,
            Classification::Target(TargetType::Down)
        );

        // FBA never looks at the leak and succeeds
        let table = fseof.run(&FseofOptions::fvseof(3, false, 1)).unwrap();
        assert!(table.failures.is_empty());
    }

    #[test]
    fn fseof_fs_two_points() {
        let options = FseofOptions {
            mode: StepMode::Sampling {
                n_samples: 30,
                thinning: 10,
                fraction_of_optimum: 0.95,
                seed: Some(5),
            },
            ..FseofOptions::fseof_fs(0.1, 0.9, 30)
        };
        let fseof = toy_fseof();
        let table = fseof.run(&options).unwrap();
        assert_eq!(table.schedule.len(), 2);
        assert_eq!(
            table.row("BIOMASS").unwrap().classification,
            Classification::Target(TargetType::Down)
        );
        let again = fseof.run(&options).unwrap();
        let classes = |t: &TargetTable| {
            t.rows
                .iter()
                .map(|r| (r.reaction_id.clone(), r.classification))
                .collect::<Vec<_>>()
        };
        assert_eq!(classes(&table), classes(&again));
    }
}
