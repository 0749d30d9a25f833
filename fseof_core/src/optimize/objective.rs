//! Provides struct for representing an optimization problem's objective

/// Represents the (linear) objective of an optimization problem
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    /// Terms included in the objective (See [`ObjectiveTerm`])
    terms: Vec<ObjectiveTerm>,
    /// Sense of the objective (maximize, or minimize), see [`ObjectiveSense`]
    sense: ObjectiveSense,
}

impl Objective {
    /// Create a new empty objective, with a given sense
    pub fn new(sense: ObjectiveSense) -> Self {
        Self {
            terms: Vec::new(),
            sense,
        }
    }

    /// Create a new empty maximization objective
    pub fn new_maximize() -> Self {
        Self::new(ObjectiveSense::Maximize)
    }

    /// Create a new empty minimization objective
    pub fn new_minimize() -> Self {
        Self::new(ObjectiveSense::Minimize)
    }

    /// Sense of the objective
    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    /// Change the sense of the objective
    pub fn set_sense(&mut self, sense: ObjectiveSense) {
        self.sense = sense;
    }

    /// Terms of the objective
    pub fn terms(&self) -> &[ObjectiveTerm] {
        &self.terms
    }

    /// Add a new linear term to the objective
    pub fn add_term(&mut self, variable: usize, coefficient: f64) {
        self.terms.push(ObjectiveTerm {
            variable,
            coefficient,
        });
    }

    /// Remove all terms from the objective
    pub fn remove_all_terms(&mut self) {
        self.terms.clear();
    }

    /// Objective coefficients as a dense vector of length `num_variables`,
    /// repeated terms for a variable are summed
    pub fn dense_coefficients(&self, num_variables: usize) -> Vec<f64> {
        let mut coefficients = vec![0f64; num_variables];
        for term in &self.terms {
            if term.variable < num_variables {
                coefficients[term.variable] += term.coefficient;
            }
        }
        coefficients
    }

    /// Evaluate the objective at a point
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|t| t.coefficient * values.get(t.variable).copied().unwrap_or(0f64))
            .sum()
    }
}

/// Represents the sense of the objective, whether it should be maximized or minimized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSense {
    /// The objective should be minimized
    Minimize,
    /// The objective should be maximized
    Maximize,
}

/// A linear term in the objective, `coefficient * variable`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectiveTerm {
    /// Index of the variable in the problem
    pub variable: usize,
    /// Coefficient for the variable
    pub coefficient: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_coefficients_sum_repeats() {
        let mut objective = Objective::new_maximize();
        objective.add_term(0, 1.);
        objective.add_term(2, 3.);
        objective.add_term(0, 0.5);
        assert_eq!(objective.dense_coefficients(3), vec![1.5, 0., 3.]);
        assert_eq!(objective.evaluate(&[2., 10., 1.]), 6.);
        objective.remove_all_terms();
        assert!(objective.terms().is_empty());
    }
}
