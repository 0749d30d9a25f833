//! Provides struct for representing a constraint in an optimization problem
use std::fmt::{Display, Formatter};

/// Represents a linear constraint in an optimization problem
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Represents an equality constraint, where `terms` = `equals`
    Equality {
        /// Linear terms which are added together, see [`ConstraintTerm`] for more
        terms: Vec<ConstraintTerm>,
        /// The right hand side of the equality constraint
        equals: f64,
    },
    /// Represents an inequality constraint, `lower_bound` <= `terms` <= `upper_bound`
    Inequality {
        /// Linear terms which are added together, see [`ConstraintTerm`] for more
        terms: Vec<ConstraintTerm>,
        /// The lowest value the sum of the terms can take, may be `f64::NEG_INFINITY`
        lower_bound: f64,
        /// The highest value the sum of the terms can take, may be `f64::INFINITY`
        upper_bound: f64,
    },
}

impl Constraint {
    /// Create a new equality constraint from variable indices and coefficients
    pub fn new_equality(variables: &[usize], coefficients: &[f64], equals: f64) -> Self {
        Constraint::Equality {
            terms: Constraint::zip_into_terms(variables, coefficients),
            equals,
        }
    }

    /// Create a new inequality constraint from variable indices and coefficients
    pub fn new_inequality(
        variables: &[usize],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Self {
        Constraint::Inequality {
            terms: Constraint::zip_into_terms(variables, coefficients),
            lower_bound,
            upper_bound,
        }
    }

    /// Terms of the constraint
    pub fn terms(&self) -> &[ConstraintTerm] {
        match self {
            Constraint::Equality { terms, .. } => terms,
            Constraint::Inequality { terms, .. } => terms,
        }
    }

    /// Evaluate the left hand side at a point
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.terms()
            .iter()
            .map(|t| t.coefficient * values.get(t.variable).copied().unwrap_or(0f64))
            .sum()
    }

    /// Whether a constraint without terms holds, its left hand side is the constant zero
    pub fn constant_row_holds(&self) -> bool {
        match self {
            Constraint::Equality { equals, .. } => *equals == 0f64,
            Constraint::Inequality {
                lower_bound,
                upper_bound,
                ..
            } => *lower_bound <= 0f64 && *upper_bound >= 0f64,
        }
    }

    /// Take a slice of variable indices, and a slice of coefficients and zip
    /// them together into a vec of ConstraintTerms
    fn zip_into_terms(variables: &[usize], coefficients: &[f64]) -> Vec<ConstraintTerm> {
        variables
            .iter()
            .zip(coefficients)
            .map(|(var, coef)| ConstraintTerm {
                variable: *var,
                coefficient: *coef,
            })
            .collect()
    }

    /// Convert a slice of terms into a String representation
    fn terms_to_string(terms: &[ConstraintTerm]) -> String {
        if terms.is_empty() {
            return "0".to_string();
        }
        terms
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Constraint::Equality { terms, equals } => {
                write!(f, "{} = {}", Self::terms_to_string(terms), equals)
            }
            Constraint::Inequality {
                terms,
                lower_bound,
                upper_bound,
            } => write!(
                f,
                "{} <= {} <= {}",
                lower_bound,
                Self::terms_to_string(terms),
                upper_bound
            ),
        }
    }
}

/// Represents a single term in a constraint, specifically
/// represents the multiplication of the `variable` by the `coefficient`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintTerm {
    /// Index of the variable in the problem
    pub variable: usize,
    /// The coefficient for the variable
    pub coefficient: f64,
}

impl Display for ConstraintTerm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}*x{}", self.coefficient, self.variable)
    }
}
