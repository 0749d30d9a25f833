use std::str::FromStr;

use fseof_core::configuration::Solver;
use fseof_core::fseof::report::TargetRow;
use fseof_core::fseof::step::StepMode;
use fseof_core::fseof::{Fseof, FseofOptions};
use fseof_core::metabolic_model::model::Model;
use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

/// One reaction of the result table
#[pyclass(name = "TargetRow", frozen)]
struct PyTargetRow {
    #[pyo3(get)]
    reaction_id: String,
    #[pyo3(get)]
    reaction_name: Option<String>,
    #[pyo3(get)]
    gene_reaction_rule: Option<String>,
    /// "up", "down" or None for excluded reactions
    #[pyo3(get)]
    target_type: Option<String>,
    #[pyo3(get)]
    exclusion: Option<String>,
    #[pyo3(get)]
    values: Vec<Option<f64>>,
    #[pyo3(get)]
    low: Option<f64>,
    #[pyo3(get)]
    high: Option<f64>,
    #[pyo3(get)]
    slope: Option<f64>,
    #[pyo3(get)]
    change: Option<f64>,
    #[pyo3(get)]
    essential: Option<bool>,
}

#[pymethods]
impl PyTargetRow {
    fn __repr__(&self) -> String {
        format!(
            "TargetRow(reaction_id={:?}, target_type={:?}, slope={:?}, essential={:?})",
            self.reaction_id, self.target_type, self.slope, self.essential
        )
    }
}

impl From<&TargetRow> for PyTargetRow {
    fn from(row: &TargetRow) -> Self {
        PyTargetRow {
            reaction_id: row.reaction_id.clone(),
            reaction_name: row.reaction_name.clone(),
            gene_reaction_rule: row.gene_reaction_rule.clone(),
            target_type: row.classification.target_type().map(|t| t.to_string()),
            exclusion: row.classification.exclusion().map(|e| e.to_string()),
            values: row.values.clone(),
            low: row.low,
            high: row.high,
            slope: row.slope,
            change: row.change,
            essential: row.essential,
        }
    }
}

/// Sweep options for the arguments of `run`
///
/// Fractions and essentiality left unset fall back to the defaults of the chosen method:
/// FSEOF_FS (`n` given) sweeps from 0.1 to 0.2 of the maximum yield and checks the
/// essentiality of its targets, FVSEOF/FSEOF sweeps `n_steps` equal bounds from 0 up to
/// `(n_steps - 1) / n_steps` without it.
#[allow(clippy::too_many_arguments)]
fn sweep_options(
    n_steps: usize,
    fraction_low: Option<f64>,
    fraction_high: Option<f64>,
    fva: bool,
    fva_n_processes: usize,
    n: Option<usize>,
    check_essentiality: Option<bool>,
    seed: Option<u64>,
) -> FseofOptions {
    let mut options = match n {
        Some(n) => {
            let mut options = FseofOptions::fseof_fs(
                fraction_low.unwrap_or(0.1),
                fraction_high.unwrap_or(0.2),
                n,
            );
            options.check_essentiality = true;
            options
        }
        None => {
            let defaults = FseofOptions::fvseof(n_steps, fva, fva_n_processes);
            FseofOptions {
                fraction_low: fraction_low.unwrap_or(defaults.fraction_low),
                fraction_high: fraction_high.unwrap_or(defaults.fraction_high),
                ..defaults
            }
        }
    };
    if let StepMode::Sampling { seed: s, .. } = &mut options.mode {
        *s = seed;
    }
    if let Some(check) = check_essentiality {
        options.check_essentiality = check;
    }
    options
}

/// Run FVSEOF/FSEOF (default) or, when `n` is given, FSEOF_FS with `n` flux samples
/// per bound
///
/// Unset `fraction_low`, `fraction_high` and `check_essentiality` default per method:
/// 0.1, 0.2 and True for FSEOF_FS, 0.0, `(n_steps - 1) / n_steps` and False otherwise.
#[pyfunction]
#[pyo3(signature = (
    model_path,
    biomass_reaction_id,
    target_metabolite_id,
    n_steps = 10,
    fraction_low = None,
    fraction_high = None,
    fva = true,
    fva_n_processes = 1,
    n = None,
    check_essentiality = None,
    essential_reaction_threshold = 0.5,
    solver = "microlp",
    seed = None,
))]
#[allow(clippy::too_many_arguments)]
fn run(
    py: Python<'_>,
    model_path: &str,
    biomass_reaction_id: &str,
    target_metabolite_id: &str,
    n_steps: usize,
    fraction_low: Option<f64>,
    fraction_high: Option<f64>,
    fva: bool,
    fva_n_processes: usize,
    n: Option<usize>,
    check_essentiality: Option<bool>,
    essential_reaction_threshold: f64,
    solver: &str,
    seed: Option<u64>,
) -> PyResult<Vec<PyTargetRow>> {
    let solver = Solver::from_str(solver).map_err(PyValueError::new_err)?;
    let model = Model::read_json(model_path).map_err(|err| PyIOError::new_err(err.to_string()))?;
    let options = sweep_options(
        n_steps,
        fraction_low,
        fraction_high,
        fva,
        fva_n_processes,
        n,
        check_essentiality,
        seed,
    );

    let table = py
        .allow_threads(|| {
            Fseof::new(&model, biomass_reaction_id, target_metabolite_id)?
                .solver(solver)?
                .essential_reaction_threshold(essential_reaction_threshold)?
                .run(&options)
        })
        .map_err(|err| PyRuntimeError::new_err(err.to_string()))?;
    Ok(table.rows.iter().map(PyTargetRow::from).collect())
}

/// A Python module implemented in Rust. The name of this function must match
/// the `lib.name` setting in the `Cargo.toml`, else Python will not be able to
/// import the module.
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(run, m)?)?;
    m.add_class::<PyTargetRow>()?;
    Ok(())
}
