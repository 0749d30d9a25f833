//! One step of a sweep: enforce a product bound and measure the fluxes
use indexmap::IndexMap;
use log::debug;
use serde::Serialize;

use crate::analysis::fba::{fba, loopless_fba};
use crate::analysis::fva::{flux_variability_analysis, FluxRange};
use crate::analysis::sampling::{FluxSamples, HitAndRunSampler};
use crate::analysis::AnalysisError;
use crate::configuration::Solver;
use crate::metabolic_model::model::Model;
use crate::optimize::objective::ObjectiveSense;

/// How fluxes are measured at every step
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum StepMode {
    /// A single (optionally loop free) flux balance solution
    Fba { loopless: bool },
    /// Flux ranges with biomass at `fraction_of_optimum` of its optimum, reduced to their
    /// midpoints
    Fva {
        fraction_of_optimum: f64,
        processes: usize,
    },
    /// Hit-and-run samples with biomass at `fraction_of_optimum` of its optimum, reduced
    /// to their means
    Sampling {
        n_samples: usize,
        thinning: usize,
        fraction_of_optimum: f64,
        seed: Option<u64>,
    },
}

impl Default for StepMode {
    fn default() -> Self {
        StepMode::Fva {
            fraction_of_optimum: 0.95,
            processes: 1,
        }
    }
}

impl StepMode {
    /// Check the settings, returning a description of the first problem found
    pub(crate) fn validate(&self) -> Result<(), String> {
        let fraction_ok = |f: f64| f.is_finite() && (0f64..=1f64).contains(&f);
        match *self {
            StepMode::Fba { .. } => Ok(()),
            StepMode::Fva {
                fraction_of_optimum,
                processes,
            } => {
                if !fraction_ok(fraction_of_optimum) {
                    return Err(format!(
                        "fraction_of_optimum must be within [0, 1], got {}",
                        fraction_of_optimum
                    ));
                }
                if processes < 1 {
                    return Err("processes must be at least 1".to_string());
                }
                Ok(())
            }
            StepMode::Sampling {
                n_samples,
                thinning,
                fraction_of_optimum,
                ..
            } => {
                if !fraction_ok(fraction_of_optimum) {
                    return Err(format!(
                        "fraction_of_optimum must be within [0, 1], got {}",
                        fraction_of_optimum
                    ));
                }
                if n_samples < 1 {
                    return Err("n_samples must be at least 1".to_string());
                }
                if thinning < 1 {
                    return Err("thinning must be at least 1".to_string());
                }
                Ok(())
            }
        }
    }
}

/// Fluxes measured at one step
#[derive(Clone, Debug, PartialEq)]
pub enum FluxResult {
    Values(IndexMap<String, f64>),
    /// Range of every reaction, or why it could not be determined
    Ranges(IndexMap<String, Result<FluxRange, AnalysisError>>),
    Samples(FluxSamples),
}

impl FluxResult {
    /// One number per reaction: the flux, the midpoint of the range or the sample mean
    ///
    /// Reactions without a range are left out.
    pub fn statistic(&self) -> IndexMap<String, f64> {
        match self {
            FluxResult::Values(values) => values.clone(),
            FluxResult::Ranges(ranges) => ranges
                .iter()
                .filter_map(|(id, range)| range.as_ref().ok().map(|r| (id.clone(), r.midpoint())))
                .collect(),
            FluxResult::Samples(samples) => samples.mean(),
        }
    }

    /// Reactions that got no value in this step, with the reason
    pub fn failures(&self) -> Vec<(String, String)> {
        match self {
            FluxResult::Ranges(ranges) => ranges
                .iter()
                .filter_map(|(id, range)| {
                    range.as_ref().err().map(|err| (id.clone(), err.to_string()))
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// A step, or a single reaction within a step, that produced no flux
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepFailure {
    /// Index of the step in the schedule
    pub step: usize,
    pub bound: f64,
    /// The reaction without a value, `None` when the whole step failed
    pub reaction_id: Option<String>,
    pub reason: String,
}

/// Everything a step needs besides the bound
#[derive(Clone, Debug)]
pub(crate) struct StepContext<'a> {
    pub model: &'a Model,
    pub biomass_id: &'a str,
    pub sink_id: &'a str,
    pub mode: StepMode,
    pub solver: Solver,
}

impl StepContext<'_> {
    /// Measure the fluxes with the product sink forced to at least `bound`
    ///
    /// Works on its own copy of the model, nothing carries over to the next step.
    pub fn run(&self, step: usize, bound: f64) -> Result<FluxResult, AnalysisError> {
        let mut model = self.model.clone();
        model.set_objective(self.biomass_id, ObjectiveSense::Maximize)?;
        model.set_reaction_lower_bound(self.sink_id, bound)?;
        debug!("Step {}: {} >= {}", step, self.sink_id, bound);

        let result = match self.mode {
            StepMode::Fba { loopless: true } => {
                FluxResult::Values(loopless_fba(&model, self.solver)?.fluxes)
            }
            StepMode::Fba { loopless: false } => FluxResult::Values(fba(&model, self.solver)?.fluxes),
            StepMode::Fva {
                fraction_of_optimum,
                processes,
            } => FluxResult::Ranges(flux_variability_analysis(
                &model,
                fraction_of_optimum,
                processes,
                self.solver,
            )?),
            StepMode::Sampling {
                n_samples,
                thinning,
                fraction_of_optimum,
                seed,
            } => {
                let sampler = HitAndRunSampler {
                    n_samples,
                    thinning,
                    // Every step gets its own stream, reproducible from the run seed
                    seed: seed.map(|s| s.wrapping_add(step as u64)),
                    solver: self.solver,
                    ..HitAndRunSampler::default()
                };
                FluxResult::Samples(sampler.sample_model(&model, fraction_of_optimum)?)
            }
        };
        Ok(result)
    }
}
