//! Solver interface for the microlp simplex solver
use ::microlp::{ComparisonOp, LinearExpr, OptimizationDirection};
use indexmap::IndexMap;

use crate::configuration::Solver;
use crate::optimize::constraint::{Constraint, ConstraintTerm};
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{LinearSolver, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Dense simplex backend, exact enough for the small and medium models used in strain design
#[derive(Clone, Debug, Default)]
pub struct MicrolpSolver {}

impl MicrolpSolver {
    fn linear_expr(variables: &[::microlp::Variable], terms: &[ConstraintTerm]) -> LinearExpr {
        let mut expr = LinearExpr::empty();
        for term in terms {
            expr.add(variables[term.variable], term.coefficient);
        }
        expr
    }
}

impl LinearSolver for MicrolpSolver {
    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        let direction = match problem.objective().sense() {
            ObjectiveSense::Maximize => OptimizationDirection::Maximize,
            ObjectiveSense::Minimize => OptimizationDirection::Minimize,
        };
        let mut lp = ::microlp::Problem::new(direction);
        let objective = problem.objective().dense_coefficients(problem.num_variables());
        let variables: Vec<::microlp::Variable> = problem
            .variables()
            .values()
            .map(|v| lp.add_var(objective[v.index], (v.lower_bound, v.upper_bound)))
            .collect();

        for constraint in problem.constraints().values() {
            // Rows without terms only constrain a constant
            if constraint.terms().is_empty() {
                if constraint.constant_row_holds() {
                    continue;
                }
                return Ok(ProblemSolution::without_values(OptimizationStatus::Infeasible));
            }
            match constraint {
                Constraint::Equality { terms, equals } => {
                    lp.add_constraint(
                        Self::linear_expr(&variables, terms),
                        ComparisonOp::Eq,
                        *equals,
                    );
                }
                Constraint::Inequality {
                    terms,
                    lower_bound,
                    upper_bound,
                } => {
                    if lower_bound.is_finite() {
                        lp.add_constraint(
                            Self::linear_expr(&variables, terms),
                            ComparisonOp::Ge,
                            *lower_bound,
                        );
                    }
                    if upper_bound.is_finite() {
                        lp.add_constraint(
                            Self::linear_expr(&variables, terms),
                            ComparisonOp::Le,
                            *upper_bound,
                        );
                    }
                }
            }
        }

        match lp.solve() {
            Ok(solution) => {
                let values: Vec<f64> = variables.iter().map(|v| solution[*v]).collect();
                let variable_values: IndexMap<String, f64> = problem
                    .variables()
                    .keys()
                    .cloned()
                    .zip(values.iter().copied())
                    .collect();
                Ok(ProblemSolution {
                    status: OptimizationStatus::Optimal,
                    objective_value: Some(problem.objective().evaluate(&values)),
                    variable_values: Some(variable_values),
                })
            }
            Err(::microlp::Error::Infeasible) => {
                Ok(ProblemSolution::without_values(OptimizationStatus::Infeasible))
            }
            Err(::microlp::Error::Unbounded) => {
                Ok(ProblemSolution::without_values(OptimizationStatus::Unbounded))
            }
            #[allow(unreachable_patterns)]
            Err(err) => Err(SolverError::Backend {
                solver: Solver::Microlp,
                message: err.to_string(),
            }),
        }
    }
}
