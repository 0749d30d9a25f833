//! Provides struct representing an optimization problem
use indexmap::IndexMap;
use thiserror::Error;

use crate::optimize::constraint::Constraint;
use crate::optimize::objective::{Objective, ObjectiveSense};
use crate::optimize::solvers::{LinearSolver, SolverError};
use crate::optimize::variable::Variable;
use crate::optimize::ProblemSolution;

/// A linear optimization problem
///
/// Problems are plain values: cloning one gives an independent copy which can be
/// modified (bounds, objective, extra constraints) without affecting the original.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    /// Objective to optimize
    objective: Objective,
    /// Variables of the optimization problem, keyed by id
    variables: IndexMap<String, Variable>,
    /// Constraints of the optimization problem, keyed by id
    constraints: IndexMap<String, Constraint>,
}

impl Problem {
    // region Creation Functions
    /// Create a new optimization problem
    pub fn new(objective_sense: ObjectiveSense) -> Self {
        Self {
            objective: Objective::new(objective_sense),
            variables: IndexMap::new(),
            constraints: IndexMap::new(),
        }
    }

    /// Create a new maximization problem
    pub fn new_maximization() -> Self {
        Self::new(ObjectiveSense::Maximize)
    }

    /// Create a new minimization problem
    pub fn new_minimization() -> Self {
        Self::new(ObjectiveSense::Minimize)
    }
    // endregion Creation Functions

    // region Accessors
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn variables(&self) -> &IndexMap<String, Variable> {
        &self.variables
    }

    pub fn constraints(&self) -> &IndexMap<String, Constraint> {
        &self.constraints
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Index of a variable
    pub fn variable_index(&self, id: &str) -> Result<usize, ProblemError> {
        self.variables
            .get_index_of(id)
            .ok_or_else(|| ProblemError::NonExistentVariable(id.to_string()))
    }
    // endregion Accessors

    /// Update the objective sense of the problem
    pub fn update_objective_sense(&mut self, sense: ObjectiveSense) {
        self.objective.set_sense(sense);
    }

    // region Adding Variables
    /// Create a new continuous variable and add it to the problem, returning its index
    pub fn add_new_variable(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<usize, ProblemError> {
        if self.variables.contains_key(id) {
            return Err(ProblemError::VariableIdAlreadyExists(id.to_string()));
        }
        Self::validate_bounds(id, lower_bound, upper_bound)?;
        let index = self.variables.len();
        self.variables
            .insert(id.to_string(), Variable::new(id, index, lower_bound, upper_bound));
        Ok(index)
    }
    // endregion Adding Variables

    // region Adding Constraints
    /// Add a constraint to the problem
    pub fn add_constraint(&mut self, id: &str, constraint: Constraint) -> Result<(), ProblemError> {
        if self.constraints.contains_key(id) {
            return Err(ProblemError::ConstraintAlreadyExists(id.to_string()));
        }
        if let Constraint::Inequality {
            lower_bound,
            upper_bound,
            ..
        } = constraint
        {
            if lower_bound > upper_bound {
                return Err(ProblemError::InvalidConstraintBounds(id.to_string()));
            }
        }
        if constraint
            .terms()
            .iter()
            .any(|t| t.variable >= self.variables.len())
        {
            return Err(ProblemError::NonExistentVariablesInConstraint(id.to_string()));
        }
        self.constraints.insert(id.to_string(), constraint);
        Ok(())
    }

    /// Create a new equality constraint using variable ids, and add it to the problem
    pub fn add_new_equality_constraint_by_id(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), ProblemError> {
        let indices = self.indices_of(variables)?;
        self.add_constraint(id, Constraint::new_equality(&indices, coefficients, equals))
    }

    /// Create a new inequality constraint using variable ids, and add it to the problem
    pub fn add_new_inequality_constraint_by_id(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        let indices = self.indices_of(variables)?;
        self.add_constraint(
            id,
            Constraint::new_inequality(&indices, coefficients, lower_bound, upper_bound),
        )
    }

    /// Remove a constraint (by id) from the problem
    pub fn remove_constraint(&mut self, constraint_id: &str) -> Option<Constraint> {
        self.constraints.shift_remove(constraint_id)
    }
    // endregion Adding Constraints

    // region Objective
    /// Add a new linear term to the objective using the variable id
    pub fn add_new_linear_objective_term_by_id(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        let index = self
            .variables
            .get_index_of(variable_id)
            .ok_or_else(|| ProblemError::NonExistentVariablesInObjective(variable_id.to_string()))?;
        self.objective.add_term(index, coefficient);
        Ok(())
    }

    /// Add a new linear term to the objective using the variable index
    pub fn add_new_linear_objective_term(
        &mut self,
        variable: usize,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        if variable >= self.variables.len() {
            return Err(ProblemError::NonExistentVariablesInObjective(format!(
                "index {}",
                variable
            )));
        }
        self.objective.add_term(variable, coefficient);
        Ok(())
    }

    /// Remove all terms from the objective
    pub fn remove_all_objective_terms(&mut self) {
        self.objective.remove_all_terms();
    }

    /// Replace the objective with a single variable
    pub fn set_single_objective(
        &mut self,
        variable_id: &str,
        sense: ObjectiveSense,
    ) -> Result<(), ProblemError> {
        self.remove_all_objective_terms();
        self.update_objective_sense(sense);
        self.add_new_linear_objective_term_by_id(variable_id, 1.)
    }
    // endregion Objective

    // region update variable bounds
    /// Update the bounds of a variable
    pub fn update_variable_bounds(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        Self::validate_bounds(id, lower_bound, upper_bound)?;
        match self.variables.get_mut(id) {
            Some(var) => {
                var.lower_bound = lower_bound;
                var.upper_bound = upper_bound;
                Ok(())
            }
            None => Err(ProblemError::NonExistentVariable(id.to_string())),
        }
    }
    // endregion update variable bounds

    /// Solve the problem with the given solver
    pub fn solve<S: LinearSolver + ?Sized>(&self, solver: &S) -> Result<ProblemSolution, SolverError> {
        log::debug!(
            "Solving problem with {} variables and {} constraints",
            self.num_variables(),
            self.num_constraints()
        );
        solver.solve(self)
    }

    /// Check that a point satisfies all bounds and constraints up to `tolerance`
    pub fn is_feasible(&self, values: &[f64], tolerance: f64) -> bool {
        if values.len() != self.variables.len() {
            return false;
        }
        let bounds_ok = self.variables.values().all(|v| {
            let x = values[v.index];
            x >= v.lower_bound - tolerance && x <= v.upper_bound + tolerance
        });
        bounds_ok
            && self.constraints.values().all(|c| {
                let activity = c.activity(values);
                match c {
                    Constraint::Equality { equals, .. } => (activity - equals).abs() <= tolerance,
                    Constraint::Inequality {
                        lower_bound,
                        upper_bound,
                        ..
                    } => activity >= lower_bound - tolerance && activity <= upper_bound + tolerance,
                }
            })
    }

    fn indices_of(&self, variables: &[&str]) -> Result<Vec<usize>, ProblemError> {
        variables
            .iter()
            .map(|id| {
                self.variables
                    .get_index_of(*id)
                    .ok_or_else(|| ProblemError::NonExistentVariablesInConstraint(id.to_string()))
            })
            .collect()
    }

    fn validate_bounds(id: &str, lower_bound: f64, upper_bound: f64) -> Result<(), ProblemError> {
        if lower_bound > upper_bound || lower_bound.is_nan() || upper_bound.is_nan() {
            return Err(ProblemError::InvalidVariableBounds(id.to_string()));
        }
        Ok(())
    }
}

/// Errors associated with the Problem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    /// Error when trying to add a variable with the same id as an existing variable
    #[error("Tried to add a variable with the same id as an existing variable: {0}")]
    VariableIdAlreadyExists(String),
    /// Error when trying to add variable with invalid bounds
    #[error("Tried to give variable {0} a lower_bound>upper_bound")]
    InvalidVariableBounds(String),
    /// Error when trying to add a constraint with the same id as an existing constraint
    #[error("Tried to add a constraint with the same id as an existing constraint: {0}")]
    ConstraintAlreadyExists(String),
    /// Error when trying to add a constraint with invalid bounds
    #[error("Tried to add inequality constraint {0} with lower_bound > upper_bound")]
    InvalidConstraintBounds(String),
    /// Error when trying to add a constraint that contains variables not in the problem
    #[error("Constraint refers to a variable not in the problem: {0}")]
    NonExistentVariablesInConstraint(String),
    /// Error when trying to add an objective term which includes variables not in the problem
    #[error("Objective term refers to a variable not in the problem: {0}")]
    NonExistentVariablesInObjective(String),
    /// Error when trying to perform an update on a variable that doesn't exist
    #[error("Tried to access a variable that doesn't exist: {0}")]
    NonExistentVariable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_problem() {
        let max_problem = Problem::new_maximization();
        assert_eq!(max_problem.objective.sense(), ObjectiveSense::Maximize);

        let min_problem = Problem::new_minimization();
        assert_eq!(min_problem.objective.sense(), ObjectiveSense::Minimize);
    }

    #[test]
    fn update_objective_sense() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);
        problem.update_objective_sense(ObjectiveSense::Minimize);
        assert_eq!(problem.objective.sense(), ObjectiveSense::Minimize);
    }

    #[test]
    fn add_variables() {
        let mut problem = Problem::new_maximization();
        assert_eq!(problem.add_new_variable("x", 64., 100.).unwrap(), 0);
        assert_eq!(problem.add_new_variable("y", 0., 1.).unwrap(), 1);
        let x = problem.variables.get("x").unwrap();
        assert_eq!(x.index, 0);
        assert_eq!((x.lower_bound, x.upper_bound), (64., 100.));
        assert_eq!(
            problem.add_new_variable("x", 0., 1.),
            Err(ProblemError::VariableIdAlreadyExists("x".to_string()))
        );
    }

    #[test]
    fn add_bad_variable() {
        let mut problem = Problem::new_maximization();
        let res = problem.add_new_variable("x", 100., 64.);
        assert_eq!(res, Err(ProblemError::InvalidVariableBounds("x".to_string())));
    }

    #[test]
    fn add_constraint() {
        let mut problem = Problem::new_maximization();
        problem.add_new_variable("x", 64., 100.).unwrap();
        problem.add_new_variable("y", 64., 100.).unwrap();

        problem
            .add_new_equality_constraint_by_id("balance", &["x", "y"], &[2., 3.], 200.)
            .unwrap();
        match problem.constraints.get("balance").unwrap() {
            Constraint::Equality { equals, .. } => assert_eq!(*equals, 200.),
            Constraint::Inequality { .. } => panic!("Incorrect constraint type added"),
        }

        problem
            .add_new_inequality_constraint_by_id("limit", &["x", "y"], &[2., 3.], 100., 200.)
            .unwrap();
        assert_eq!(problem.num_constraints(), 2);
        assert!(problem.remove_constraint("limit").is_some());
        assert_eq!(problem.num_constraints(), 1);
    }

    #[test]
    fn add_bad_constraint() {
        let mut problem = Problem::new_maximization();
        problem.add_new_variable("x", 64., 100.).unwrap();
        problem.add_new_variable("y", 64., 100.).unwrap();

        assert_eq!(
            problem.add_new_inequality_constraint_by_id("bad", &["x", "y"], &[2., 3.], 200., 100.),
            Err(ProblemError::InvalidConstraintBounds("bad".to_string()))
        );
        assert_eq!(
            problem.add_new_equality_constraint_by_id("missing", &["x", "z"], &[1., 1.], 0.),
            Err(ProblemError::NonExistentVariablesInConstraint("z".to_string()))
        );
    }

    #[test]
    fn clone_is_independent() {
        let mut problem = Problem::new_maximization();
        problem.add_new_variable("x", 0., 10.).unwrap();
        let mut copy = problem.clone();
        copy.update_variable_bounds("x", 5., 5.).unwrap();
        assert_eq!(problem.variables["x"].lower_bound, 0.);
        assert!(copy.variables["x"].is_fixed());
    }

    #[test]
    fn feasibility_check() {
        let mut problem = Problem::new_maximization();
        problem.add_new_variable("x", 0., 10.).unwrap();
        problem.add_new_variable("y", 0., 10.).unwrap();
        problem
            .add_new_equality_constraint_by_id("sum", &["x", "y"], &[1., 1.], 4.)
            .unwrap();
        assert!(problem.is_feasible(&[1., 3.], 1e-9));
        assert!(!problem.is_feasible(&[1., 2.], 1e-9));
        assert!(!problem.is_feasible(&[-1., 5.], 1e-9));
    }
}
