//! Process wide defaults, used whenever a run does not override them
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::{LazyLock, RwLock};

use serde::Serialize;

pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

#[derive(Clone, Debug)]
pub struct Configuration {
    /// Lower bound given to reactions built without an explicit one
    pub lower_bound: f64,
    /// Upper bound given to reactions built without an explicit one
    pub upper_bound: f64,
    /// Absolute tolerance used when comparing fluxes
    pub tolerance: f64,
    /// Backend used to solve linear programs
    pub solver: Solver,
    /// Number of worker threads for FVA and essentiality checks
    pub processes: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            lower_bound: -1000.,
            upper_bound: 1000.,
            tolerance: 1e-07,
            solver: Solver::Microlp,
            processes: 1,
        }
    }
}

/// Get a copy of the current configuration
///
/// A poisoned lock falls back to the default configuration.
pub fn current() -> Configuration {
    CONFIGURATION
        .read()
        .map(|config| config.clone())
        .unwrap_or_default()
}

/// Enum used to specify the solver backend
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Solver {
    /// Use the microlp dense simplex solver
    #[default]
    Microlp,
    /// Use the Clarabel interior point solver
    Clarabel,
}

impl Display for Solver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Solver::Microlp => write!(f, "microlp"),
            Solver::Clarabel => write!(f, "clarabel"),
        }
    }
}

impl FromStr for Solver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "microlp" | "minilp" => Ok(Solver::Microlp),
            "clarabel" => Ok(Solver::Clarabel),
            other => Err(format!(
                "unknown solver '{}', expected one of: microlp, clarabel",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solver_names() {
        assert_eq!("microlp".parse::<Solver>().unwrap(), Solver::Microlp);
        assert_eq!("Clarabel".parse::<Solver>().unwrap(), Solver::Clarabel);
        assert!("glpk".parse::<Solver>().is_err());
        assert_eq!(Solver::Clarabel.to_string(), "clarabel");
    }

    #[test]
    fn defaults() {
        let config = Configuration::default();
        assert_eq!(config.solver, Solver::Microlp);
        assert_eq!(config.processes, 1);
        assert!(config.lower_bound < 0. && config.upper_bound > 0.);
    }
}
