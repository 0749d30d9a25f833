//! Hit-and-run flux sampling
//!
//! Samples are drawn uniformly (in the limit) from the flux polytope
//! `{v : S v = 0, lb <= v <= ub, l <= a'v <= u}`. The walk starts at the mean of the
//! warm-up points (the minimizing and maximizing solution of every reaction), moves along
//! random directions inside the null space of the equality constraints and picks a uniform
//! step along the feasible segment of each direction.
use indexmap::IndexMap;
use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

use crate::analysis::fva::{constrain_objective, extreme_solutions};
use crate::analysis::AnalysisError;
use crate::configuration::Solver;
use crate::metabolic_model::model::Model;
use crate::optimize::constraint::Constraint;
use crate::optimize::problem::Problem;

/// Relative size below which an eigenvalue of `A'A` counts as zero
const NULL_SPACE_TOLERANCE: f64 = 1e-10;
/// Direction components below this are treated as zero in the line search
const DIRECTION_EPSILON: f64 = 1e-12;

/// Flux samples, one row per sample and one column per reaction
#[derive(Clone, Debug, PartialEq)]
pub struct FluxSamples {
    reaction_ids: Vec<String>,
    samples: DMatrix<f64>,
}

impl FluxSamples {
    pub fn reaction_ids(&self) -> &[String] {
        &self.reaction_ids
    }

    pub fn samples(&self) -> &DMatrix<f64> {
        &self.samples
    }

    pub fn n_samples(&self) -> usize {
        self.samples.nrows()
    }

    /// All sampled values of a reaction
    pub fn reaction(&self, id: &str) -> Option<Vec<f64>> {
        let column = self.reaction_ids.iter().position(|r| r == id)?;
        Some(self.samples.column(column).iter().copied().collect())
    }

    /// Mean sampled flux of every reaction
    pub fn mean(&self) -> IndexMap<String, f64> {
        self.reaction_ids
            .iter()
            .enumerate()
            .map(|(j, id)| (id.clone(), self.samples.column(j).mean()))
            .collect()
    }
}

/// Settings for the hit-and-run sampler
#[derive(Clone, Debug, PartialEq)]
pub struct HitAndRunSampler {
    /// Number of samples returned
    pub n_samples: usize,
    /// Number of steps taken between two returned samples
    pub thinning: usize,
    /// Seed for the random number generator, a random seed is drawn when None
    pub seed: Option<u64>,
    /// Threads used for the warm-up optimizations
    pub processes: usize,
    pub solver: Solver,
    pub tolerance: f64,
}

impl Default for HitAndRunSampler {
    fn default() -> Self {
        let config = crate::configuration::current();
        HitAndRunSampler {
            n_samples: 100,
            thinning: 100,
            seed: None,
            processes: config.processes,
            solver: config.solver,
            tolerance: config.tolerance,
        }
    }
}

impl HitAndRunSampler {
    /// Sample the fluxes of a model, with the model objective held at `fraction_of_optimum`
    /// of its optimum (a fraction of 0 leaves only the sign of the objective constrained)
    pub fn sample_model(
        &self,
        model: &Model,
        fraction_of_optimum: f64,
    ) -> Result<FluxSamples, AnalysisError> {
        let mut problem = model.to_problem()?;
        if !problem.objective().terms().is_empty() {
            constrain_objective(&mut problem, fraction_of_optimum, self.tolerance, self.solver)?;
        }
        self.sample(&problem)
    }

    /// Sample the feasible region of a linear problem, the objective is ignored
    pub fn sample(&self, problem: &Problem) -> Result<FluxSamples, AnalysisError> {
        if self.n_samples == 0 || self.thinning == 0 {
            return Err(AnalysisError::InvalidArgument(
                "n_samples and thinning must be at least 1".to_string(),
            ));
        }
        let n = problem.num_variables();
        let reaction_ids: Vec<String> = problem.variables().keys().cloned().collect();
        let lower: Vec<f64> = problem.variables().values().map(|v| v.lower_bound).collect();
        let upper: Vec<f64> = problem.variables().values().map(|v| v.upper_bound).collect();

        let warmup = extreme_solutions(problem, self.processes, self.solver)?
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        let mut center = DVector::<f64>::zeros(n);
        let mut fixed = vec![false; n];
        for (j, (minimum, maximum)) in warmup.iter().enumerate() {
            let low = DVector::from_iterator(n, minimum.fluxes.values().copied());
            let high = DVector::from_iterator(n, maximum.fluxes.values().copied());
            center += low + high;
            fixed[j] = maximum.objective_value - minimum.objective_value <= self.tolerance;
        }
        center /= (2 * n.max(1)) as f64;

        let basis = Self::direction_basis(problem, &fixed);
        debug!(
            "Sampling space has dimension {} ({} variables)",
            basis.ncols(),
            n
        );

        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let inequalities: Vec<(&Constraint, f64, f64)> = problem
            .constraints()
            .values()
            .filter_map(|c| match c {
                Constraint::Inequality {
                    lower_bound,
                    upper_bound,
                    ..
                } if !c.terms().is_empty() => Some((c, *lower_bound, *upper_bound)),
                _ => None,
            })
            .collect();

        let mut samples = DMatrix::<f64>::zeros(self.n_samples, n);
        let mut point = center;
        for i in 0..self.n_samples {
            for _ in 0..self.thinning {
                if basis.ncols() == 0 {
                    break;
                }
                let step: DVector<f64> =
                    DVector::from_fn(basis.ncols(), |_, _| rng.sample(StandardNormal));
                let mut direction = &basis * step;
                let norm = direction.norm();
                if norm <= DIRECTION_EPSILON {
                    continue;
                }
                direction /= norm;
                let Some((t_min, t_max)) =
                    Self::feasible_segment(&point, &direction, &lower, &upper, &inequalities)
                else {
                    continue;
                };
                let t = rng.gen_range(t_min..=t_max);
                point.axpy(t, &direction, 1f64);
                for j in 0..n {
                    point[j] = point[j].clamp(lower[j], upper[j]);
                }
            }
            samples.set_row(i, &point.transpose());
        }
        info!(
            "Drew {} samples over {} reactions",
            self.n_samples,
            reaction_ids.len()
        );
        Ok(FluxSamples {
            reaction_ids,
            samples,
        })
    }

    /// Orthonormal basis of the directions that keep every equality constraint and every
    /// fixed variable unchanged
    fn direction_basis(problem: &Problem, fixed: &[bool]) -> DMatrix<f64> {
        let n = problem.num_variables();
        let mut rows: Vec<Vec<(usize, f64)>> = problem
            .constraints()
            .values()
            .filter_map(|c| match c {
                Constraint::Equality { terms, .. } => {
                    Some(terms.iter().map(|t| (t.variable, t.coefficient)).collect())
                }
                Constraint::Inequality {
                    terms,
                    lower_bound,
                    upper_bound,
                } if lower_bound == upper_bound => {
                    Some(terms.iter().map(|t| (t.variable, t.coefficient)).collect())
                }
                _ => None,
            })
            .collect();
        rows.extend(
            fixed
                .iter()
                .enumerate()
                .filter(|(_, is_fixed)| **is_fixed)
                .map(|(j, _)| vec![(j, 1f64)]),
        );

        let mut a = DMatrix::<f64>::zeros(rows.len(), n);
        for (i, row) in rows.iter().enumerate() {
            for &(j, coefficient) in row {
                a[(i, j)] += coefficient;
            }
        }
        // The null space of A is the eigenspace of A'A for eigenvalue zero
        let eigen = (a.transpose() * &a).symmetric_eigen();
        let scale = eigen
            .eigenvalues
            .iter()
            .fold(1f64, |acc, value| acc.max(value.abs()));
        let columns: Vec<DVector<f64>> = eigen
            .eigenvalues
            .iter()
            .enumerate()
            .filter(|(_, value)| value.abs() <= NULL_SPACE_TOLERANCE * scale)
            .map(|(j, _)| eigen.eigenvectors.column(j).into_owned())
            .collect();
        if columns.is_empty() {
            DMatrix::zeros(n, 0)
        } else {
            DMatrix::from_columns(&columns)
        }
    }

    /// Range of `t` for which `point + t * direction` stays inside the bounds and the
    /// inequality constraints, None if the segment is empty or unbounded
    fn feasible_segment(
        point: &DVector<f64>,
        direction: &DVector<f64>,
        lower: &[f64],
        upper: &[f64],
        inequalities: &[(&Constraint, f64, f64)],
    ) -> Option<(f64, f64)> {
        let mut t_min = f64::NEG_INFINITY;
        let mut t_max = f64::INFINITY;
        let mut restrict = |value: f64, slope: f64, low: f64, high: f64| {
            if slope.abs() <= DIRECTION_EPSILON {
                return;
            }
            let (a, b) = ((low - value) / slope, (high - value) / slope);
            let (a, b) = if slope > 0f64 { (a, b) } else { (b, a) };
            t_min = t_min.max(a);
            t_max = t_max.min(b);
        };
        for j in 0..point.len() {
            restrict(point[j], direction[j], lower[j], upper[j]);
        }
        for (constraint, low, high) in inequalities {
            restrict(
                constraint.activity(point.as_slice()),
                constraint.activity(direction.as_slice()),
                *low,
                *high,
            );
        }
        if t_min.is_finite() && t_max.is_finite() && t_max > t_min {
            Some((t_min, t_max))
        } else {
            None
        }
    }
}
