//! Bounds enforced on the product sink during a sweep
use log::info;
use serde::Serialize;

use crate::analysis::fba::solve_optimal;
use crate::analysis::AnalysisError;
use crate::configuration::Solver;
use crate::fseof::FseofError;
use crate::metabolic_model::model::Model;
use crate::optimize::objective::ObjectiveSense;

/// How bounds are spread between the low and the high fraction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum ScheduleKind {
    /// `n_steps` evenly spaced bounds starting at the low fraction
    #[default]
    Linear,
    /// Exactly two bounds, at the low and at the high fraction
    TwoPoint,
}

/// Ordered, strictly increasing sequence of enforced product bounds
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoundSchedule {
    max_yield: f64,
    fractions: Vec<f64>,
    bounds: Vec<f64>,
}

impl BoundSchedule {
    /// `bound_i = (fraction_low + i * (fraction_high - fraction_low) / (n_steps - 1)) * max_yield`
    /// for `i` in `0..n_steps`, so the first bound is at `fraction_low` and the last at
    /// `fraction_high`
    pub fn linear(
        max_yield: f64,
        n_steps: usize,
        fraction_low: f64,
        fraction_high: f64,
    ) -> Result<Self, FseofError> {
        if n_steps < 2 {
            return Err(FseofError::InvalidOptions(format!(
                "n_steps must be at least 2, got {}",
                n_steps
            )));
        }
        validate_fractions(fraction_low, fraction_high)?;
        let width = (fraction_high - fraction_low) / (n_steps - 1) as f64;
        let fractions = (0..n_steps)
            .map(|i| {
                if i == n_steps - 1 {
                    fraction_high
                } else {
                    fraction_low + i as f64 * width
                }
            })
            .collect();
        Self::from_fractions(max_yield, fractions)
    }

    /// The bounds `[fraction_low * max_yield, fraction_high * max_yield]`
    pub fn two_point(
        max_yield: f64,
        fraction_low: f64,
        fraction_high: f64,
    ) -> Result<Self, FseofError> {
        validate_fractions(fraction_low, fraction_high)?;
        Self::from_fractions(max_yield, vec![fraction_low, fraction_high])
    }

    /// Build the schedule of the given kind
    pub fn new(
        kind: ScheduleKind,
        max_yield: f64,
        n_steps: usize,
        fraction_low: f64,
        fraction_high: f64,
    ) -> Result<Self, FseofError> {
        match kind {
            ScheduleKind::Linear => Self::linear(max_yield, n_steps, fraction_low, fraction_high),
            ScheduleKind::TwoPoint => Self::two_point(max_yield, fraction_low, fraction_high),
        }
    }

    fn from_fractions(max_yield: f64, fractions: Vec<f64>) -> Result<Self, FseofError> {
        if !max_yield.is_finite() || max_yield <= 0f64 {
            return Err(FseofError::InvalidOptions(format!(
                "maximal yield must be positive and finite, got {}",
                max_yield
            )));
        }
        let bounds = fractions.iter().map(|f| f * max_yield).collect();
        Ok(BoundSchedule {
            max_yield,
            fractions,
            bounds,
        })
    }

    pub fn max_yield(&self) -> f64 {
        self.max_yield
    }

    pub fn fractions(&self) -> &[f64] {
        &self.fractions
    }

    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Iterate over the bounds, can be called any number of times
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.bounds.iter().copied()
    }
}

/// Check `0 <= fraction_low < fraction_high <= 1`
pub(crate) fn validate_fractions(fraction_low: f64, fraction_high: f64) -> Result<(), FseofError> {
    let in_range = |f: f64| f.is_finite() && (0f64..=1f64).contains(&f);
    if !in_range(fraction_low) || !in_range(fraction_high) {
        return Err(FseofError::InvalidOptions(format!(
            "fractions must be within [0, 1], got {} and {}",
            fraction_low, fraction_high
        )));
    }
    if fraction_low >= fraction_high {
        return Err(FseofError::InvalidOptions(format!(
            "fraction_low ({}) must be smaller than fraction_high ({})",
            fraction_low, fraction_high
        )));
    }
    Ok(())
}

/// Maximal flux through the product sink, found by maximizing the sink alone
///
/// A model without an optimum here can't be swept at all, and neither can one that can't
/// make the product.
pub fn theoretical_max_yield(
    model: &Model,
    sink_id: &str,
    solver: Solver,
    tolerance: f64,
) -> Result<f64, FseofError> {
    let mut problem = model.to_problem()?;
    problem
        .set_single_objective(sink_id, ObjectiveSense::Maximize)
        .map_err(|err| FseofError::Model(err.into()))?;
    let max_yield = match solve_optimal(&problem, solver) {
        Ok(solution) => solution.objective_value,
        Err(AnalysisError::NotOptimal(status)) => {
            return Err(FseofError::InfeasibleBaseline(format!(
                "maximizing {} is {}",
                sink_id, status
            )))
        }
        Err(err) => return Err(FseofError::InfeasibleBaseline(err.to_string())),
    };
    if max_yield <= tolerance {
        return Err(FseofError::NoProduction {
            sink: sink_id.to_string(),
            max_yield,
        });
    }
    info!("Theoretical maximal yield of {} is {}", sink_id, max_yield);
    Ok(max_yield)
}
