//! Module for constructing and solving optimization problems

pub mod constraint;
pub mod objective;
pub mod problem;
pub mod solvers;
pub mod variable;

use indexmap::IndexMap;

/// Struct representing the solution to an optimization problem
#[derive(Clone, Debug, PartialEq)]
pub struct ProblemSolution {
    /// The status of the optimization problem, representing if the optimization was
    /// completed successfully
    pub status: OptimizationStatus,
    /// Optimized value of the objective
    ///
    /// Some(f64) if the optimization was completed successfully, None otherwise
    pub objective_value: Option<f64>,
    /// Values of the variables at the optimum,
    ///
    /// Some(IndexMap), keyed by variable id, with values corresponding to variable
    /// values at optimum if the problem could be solved, None otherwise
    pub variable_values: Option<IndexMap<String, f64>>,
}

impl ProblemSolution {
    /// Solution without values, for problems that could not be solved
    pub fn without_values(status: OptimizationStatus) -> Self {
        ProblemSolution {
            status,
            objective_value: None,
            variable_values: None,
        }
    }

    /// Whether the solution is optimal (or close enough to it)
    pub fn is_optimal(&self) -> bool {
        matches!(
            self.status,
            OptimizationStatus::Optimal | OptimizationStatus::AlmostOptimal
        )
    }

    /// Value of a single variable, None if the problem was not solved or the variable
    /// doesn't exist
    pub fn value(&self, id: &str) -> Option<f64> {
        self.variable_values.as_ref()?.get(id).copied()
    }
}

/// Status of an optimization problem
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OptimizationStatus {
    /// Problem has not yet attempted to be optimized
    Unoptimized,
    /// Problem has been optimized
    Optimal,
    /// Problem can't be optimized because objective value is not bounded
    Unbounded,
    /// Problem can't be solved because it is infeasible (conflicting constraints)
    Infeasible,
    /// An approximate solution has been found
    AlmostOptimal,
    /// A numerical error occurred during solving
    NumericalError,
    /// The solver hit the maximum allowed iterations, or max time, or made insufficient progress
    SolverHalted,
}

impl std::fmt::Display for OptimizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OptimizationStatus::Unoptimized => "unoptimized",
            OptimizationStatus::Optimal => "optimal",
            OptimizationStatus::Unbounded => "unbounded",
            OptimizationStatus::Infeasible => "infeasible",
            OptimizationStatus::AlmostOptimal => "almost optimal",
            OptimizationStatus::NumericalError => "numerical error",
            OptimizationStatus::SolverHalted => "solver halted",
        };
        write!(f, "{}", name)
    }
}
