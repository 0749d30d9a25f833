//! Solver backends for linear programs
pub mod clarabel;
pub mod microlp;

use thiserror::Error;

use crate::configuration::Solver;
use crate::optimize::problem::Problem;
use crate::optimize::ProblemSolution;

/// Interface shared by all linear program backends
///
/// Solvers only read the problem, so a single solver value can be shared between threads
/// as long as every thread works on its own [`Problem`].
pub trait LinearSolver: Send + Sync {
    /// Solve the problem
    ///
    /// Infeasible or unbounded problems are not errors, they are reported through the
    /// status of the returned [`ProblemSolution`]. Errors are reserved for problems the
    /// backend can't accept or internal backend failures.
    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError>;
}

impl LinearSolver for Solver {
    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        match self {
            Solver::Microlp => self::microlp::MicrolpSolver::default().solve(problem),
            Solver::Clarabel => self::clarabel::ClarabelSolver::default().solve(problem),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("The {solver} backend failed: {message}")]
    Backend { solver: Solver, message: String },
    #[error("The problem can't be handled by the {solver} backend: {message}")]
    UnsupportedProblem { solver: Solver, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::OptimizationStatus;
    use approx::assert_abs_diff_eq;

    /// max 3x + 2y st x + y <= 4, x + 3y <= 6, 0 <= x <= 3, y >= 0
    fn small_problem() -> Problem {
        let mut problem = Problem::new_maximization();
        problem.add_new_variable("x", 0., 3.).unwrap();
        problem.add_new_variable("y", 0., f64::INFINITY).unwrap();
        problem
            .add_new_inequality_constraint_by_id("c1", &["x", "y"], &[1., 1.], f64::NEG_INFINITY, 4.)
            .unwrap();
        problem
            .add_new_inequality_constraint_by_id("c2", &["x", "y"], &[1., 3.], f64::NEG_INFINITY, 6.)
            .unwrap();
        problem.add_new_linear_objective_term_by_id("x", 3.).unwrap();
        problem.add_new_linear_objective_term_by_id("y", 2.).unwrap();
        problem
    }

    fn infeasible_problem() -> Problem {
        let mut problem = Problem::new_maximization();
        problem.add_new_variable("x", 0., 1.).unwrap();
        problem
            .add_new_equality_constraint_by_id("impossible", &["x"], &[1.], 5.)
            .unwrap();
        problem.add_new_linear_objective_term_by_id("x", 1.).unwrap();
        problem
    }

    #[test]
    fn backends_agree_on_optimum() {
        for solver in [Solver::Microlp, Solver::Clarabel] {
            let solution = small_problem().solve(&solver).unwrap();
            assert!(solution.is_optimal(), "{} did not solve", solver);
            assert_abs_diff_eq!(solution.objective_value.unwrap(), 11., epsilon = 1e-5);
            assert_abs_diff_eq!(solution.value("x").unwrap(), 3., epsilon = 1e-5);
            assert_abs_diff_eq!(solution.value("y").unwrap(), 1., epsilon = 1e-5);
        }
    }

    #[test]
    fn backends_report_infeasibility() {
        for solver in [Solver::Microlp, Solver::Clarabel] {
            let solution = infeasible_problem().solve(&solver).unwrap();
            assert_eq!(solution.status, OptimizationStatus::Infeasible, "{}", solver);
            assert!(solution.variable_values.is_none());
        }
    }
}
