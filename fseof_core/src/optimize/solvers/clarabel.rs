//! Implements a solver interface for Clarabel
//!
//! Clarabel solves conic programs of the form
//! `min 1/2 x'Px + q'x  s.t.  Ax + s = b, s in K`, a linear program maps onto it with
//! `P = 0`, equalities in the zero cone and inequalities in the nonnegative cone.
use ::clarabel::algebra::CscMatrix;
use ::clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use indexmap::IndexMap;

use crate::configuration::Solver;
use crate::optimize::constraint::Constraint;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{LinearSolver, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Interior point backend
#[derive(Clone, Debug, Default)]
pub struct ClarabelSolver {}

/// A sparse row `a` with right hand side `b`
type Row = (Vec<(usize, f64)>, f64);

impl ClarabelSolver {
    /// Split the problem into rows for the zero cone (`a'x = b`) and rows for the
    /// nonnegative cone (`a'x <= b`)
    ///
    /// Returns None if a constant row is violated, meaning the problem is infeasible.
    fn conic_rows(problem: &Problem) -> Option<(Vec<Row>, Vec<Row>)> {
        let mut equalities: Vec<Row> = Vec::new();
        let mut inequalities: Vec<Row> = Vec::new();

        for constraint in problem.constraints().values() {
            if constraint.terms().is_empty() {
                if constraint.constant_row_holds() {
                    continue;
                }
                return None;
            }
            let entries: Vec<(usize, f64)> = constraint
                .terms()
                .iter()
                .map(|t| (t.variable, t.coefficient))
                .collect();
            match constraint {
                Constraint::Equality { equals, .. } => equalities.push((entries, *equals)),
                Constraint::Inequality {
                    lower_bound,
                    upper_bound,
                    ..
                } => {
                    if lower_bound == upper_bound {
                        equalities.push((entries, *lower_bound));
                        continue;
                    }
                    if upper_bound.is_finite() {
                        inequalities.push((entries.clone(), *upper_bound));
                    }
                    if lower_bound.is_finite() {
                        let negated = entries.iter().map(|(c, v)| (*c, -v)).collect();
                        inequalities.push((negated, -lower_bound));
                    }
                }
            }
        }

        for variable in problem.variables().values() {
            if variable.is_fixed() {
                equalities.push((vec![(variable.index, 1.)], variable.lower_bound));
                continue;
            }
            if variable.upper_bound.is_finite() {
                inequalities.push((vec![(variable.index, 1.)], variable.upper_bound));
            }
            if variable.lower_bound.is_finite() {
                inequalities.push((vec![(variable.index, -1.)], -variable.lower_bound));
            }
        }
        Some((equalities, inequalities))
    }

    /// Assemble rows into a compressed sparse column matrix, summing repeated entries
    fn to_csc(rows: &[&Row], num_columns: usize) -> CscMatrix<f64> {
        let mut columns: Vec<Vec<(usize, f64)>> = vec![Vec::new(); num_columns];
        for (row_index, (entries, _)) in rows.iter().enumerate() {
            for &(column, value) in entries {
                if value == 0f64 {
                    continue;
                }
                match columns[column].last_mut() {
                    Some((last_row, last_value)) if *last_row == row_index => *last_value += value,
                    _ => columns[column].push((row_index, value)),
                }
            }
        }
        let mut colptr = Vec::with_capacity(num_columns + 1);
        let mut rowval = Vec::new();
        let mut nzval = Vec::new();
        colptr.push(0);
        for column in columns {
            for (row, value) in column {
                rowval.push(row);
                nzval.push(value);
            }
            colptr.push(rowval.len());
        }
        CscMatrix::new(rows.len(), num_columns, colptr, rowval, nzval)
    }

    #[allow(unreachable_patterns)]
    fn status(status: &SolverStatus) -> OptimizationStatus {
        match status {
            SolverStatus::Solved => OptimizationStatus::Optimal,
            SolverStatus::AlmostSolved => OptimizationStatus::AlmostOptimal,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                OptimizationStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                OptimizationStatus::Unbounded
            }
            SolverStatus::MaxIterations
            | SolverStatus::MaxTime
            | SolverStatus::InsufficientProgress => OptimizationStatus::SolverHalted,
            SolverStatus::NumericalError => OptimizationStatus::NumericalError,
            _ => OptimizationStatus::Unoptimized,
        }
    }
}

impl LinearSolver for ClarabelSolver {
    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        let n = problem.num_variables();
        let Some((equalities, inequalities)) = Self::conic_rows(problem) else {
            return Ok(ProblemSolution::without_values(OptimizationStatus::Infeasible));
        };
        if equalities.is_empty() && inequalities.is_empty() {
            return Err(SolverError::UnsupportedProblem {
                solver: Solver::Clarabel,
                message: "problem has no constraints or finite bounds".to_string(),
            });
        }

        let sign = match problem.objective().sense() {
            ObjectiveSense::Maximize => -1f64,
            ObjectiveSense::Minimize => 1f64,
        };
        let q: Vec<f64> = problem
            .objective()
            .dense_coefficients(n)
            .into_iter()
            .map(|c| sign * c)
            .collect();
        let p = CscMatrix::new(n, n, vec![0; n + 1], Vec::new(), Vec::new());
        let rows: Vec<&Row> = equalities.iter().chain(inequalities.iter()).collect();
        let a = Self::to_csc(&rows, n);
        let b: Vec<f64> = rows.iter().map(|(_, rhs)| *rhs).collect();

        let mut cones: Vec<SupportedConeT<f64>> = Vec::new();
        if !equalities.is_empty() {
            cones.push(SupportedConeT::ZeroConeT(equalities.len()));
        }
        if !inequalities.is_empty() {
            cones.push(SupportedConeT::NonnegativeConeT(inequalities.len()));
        }

        let settings = DefaultSettingsBuilder::default()
            .verbose(false)
            .build()
            .map_err(|err| SolverError::Backend {
                solver: Solver::Clarabel,
                message: err.to_string(),
            })?;
        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();

        let status = Self::status(&solver.solution.status);
        match status {
            OptimizationStatus::Optimal | OptimizationStatus::AlmostOptimal => {
                let values = solver.solution.x.clone();
                let variable_values: IndexMap<String, f64> = problem
                    .variables()
                    .keys()
                    .cloned()
                    .zip(values.iter().copied())
                    .collect();
                Ok(ProblemSolution {
                    status,
                    objective_value: Some(problem.objective().evaluate(&values)),
                    variable_values: Some(variable_values),
                })
            }
            _ => Ok(ProblemSolution::without_values(status)),
        }
    }
}
