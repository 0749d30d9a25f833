//! Constraint based analyses used by the sweeps: flux balance analysis, flux variability
//! analysis, flux sampling and reaction essentiality
pub mod essentiality;
pub mod fba;
pub mod fva;
pub mod sampling;

use thiserror::Error;

use crate::metabolic_model::model::ModelError;
use crate::optimize::problem::ProblemError;
use crate::optimize::solvers::SolverError;
use crate::optimize::OptimizationStatus;

/// Errors raised by the analyses
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Problem(#[from] ProblemError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    /// The optimization finished without an optimal solution
    #[error("Optimization did not reach an optimum, status: {0}")]
    NotOptimal(OptimizationStatus),
    #[error("Unable to start worker threads: {0}")]
    ThreadPool(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Build a rayon pool with `processes` worker threads
pub(crate) fn worker_pool(processes: usize) -> Result<rayon::ThreadPool, AnalysisError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(processes.max(1))
        .build()
        .map_err(|err| AnalysisError::ThreadPool(err.to_string()))
}
