//! Module providing representation of optimization problem variables
use std::fmt::{Display, Formatter};

/// A continuous variable of a linear program
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Used to identify the variable, for variables created from a model this is the
    /// reaction id
    pub id: String,
    /// Position of the variable in the problem (column of the constraint matrix)
    pub index: usize,
    /// Lowest value the variable can take, may be `f64::NEG_INFINITY`
    pub lower_bound: f64,
    /// Highest value the variable can take, may be `f64::INFINITY`
    pub upper_bound: f64,
}

impl Variable {
    pub(crate) fn new(id: &str, index: usize, lower_bound: f64, upper_bound: f64) -> Variable {
        Variable {
            id: id.to_string(),
            index,
            lower_bound,
            upper_bound,
        }
    }

    /// Whether the variable is fixed to a single value
    pub fn is_fixed(&self) -> bool {
        self.lower_bound == self.upper_bound
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <= {} <= {}", self.lower_bound, self.id, self.upper_bound)
    }
}
