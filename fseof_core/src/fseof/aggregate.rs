//! Classification of reactions by the trend of their flux over the sweep
use std::fmt::{Display, Formatter};

use serde::Serialize;

/// Direction in which a reaction should be regulated
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Up,
    Down,
}

/// Why a reaction is not a target
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// A reference step has no value for the reaction
    MissingData,
    /// The reaction carries no flux at a reference step
    ZeroFlux,
    /// The flux changes direction between the reference steps
    SignChange,
    /// The flux is the same at both reference steps
    Unchanged,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Target(TargetType),
    Excluded(ExclusionReason),
}

impl Classification {
    pub fn target_type(&self) -> Option<TargetType> {
        match self {
            Classification::Target(target) => Some(*target),
            Classification::Excluded(_) => None,
        }
    }

    pub fn exclusion(&self) -> Option<ExclusionReason> {
        match self {
            Classification::Target(_) => None,
            Classification::Excluded(reason) => Some(*reason),
        }
    }

    pub fn is_target(&self) -> bool {
        matches!(self, Classification::Target(_))
    }

    /// Position in the report: up targets, then down targets, then the rest
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Classification::Target(TargetType::Up) => 0,
            Classification::Target(TargetType::Down) => 1,
            Classification::Excluded(_) => 2,
        }
    }
}

impl Display for TargetType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetType::Up => write!(f, "up"),
            TargetType::Down => write!(f, "down"),
        }
    }
}

impl Display for ExclusionReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            ExclusionReason::MissingData => "missing_data",
            ExclusionReason::ZeroFlux => "zero_flux",
            ExclusionReason::SignChange => "sign_change",
            ExclusionReason::Unchanged => "unchanged",
        };
        write!(f, "{}", reason)
    }
}

impl Display for Classification {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Classification::Target(target) => write!(f, "{}", target),
            Classification::Excluded(reason) => write!(f, "excluded ({})", reason),
        }
    }
}

/// Classify a reaction from its statistic at the low and the high reference step
///
/// Both values must be nonzero (beyond `tolerance`) and of the same sign. A flux whose
/// magnitude grows is an up target, one whose magnitude shrinks is a down target, and
/// equal magnitudes are excluded.
pub fn classify(low: Option<f64>, high: Option<f64>, tolerance: f64) -> Classification {
    let (Some(low), Some(high)) = (low, high) else {
        return Classification::Excluded(ExclusionReason::MissingData);
    };
    if low.abs() <= tolerance || high.abs() <= tolerance {
        return Classification::Excluded(ExclusionReason::ZeroFlux);
    }
    if low.signum() != high.signum() {
        return Classification::Excluded(ExclusionReason::SignChange);
    }
    let change = high.abs() - low.abs();
    if change.abs() <= tolerance {
        Classification::Excluded(ExclusionReason::Unchanged)
    } else if change > 0f64 {
        Classification::Target(TargetType::Up)
    } else {
        Classification::Target(TargetType::Down)
    }
}

/// Least squares slope of `values` against `bounds`, skipping missing values
///
/// None when fewer than two distinct bounds have a value.
pub fn slope(bounds: &[f64], values: &[Option<f64>]) -> Option<f64> {
    let points: Vec<(f64, f64)> = bounds
        .iter()
        .zip(values)
        .filter_map(|(x, y)| y.map(|y| (*x, y)))
        .collect();
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let (covariance, variance) = points.iter().fold((0f64, 0f64), |(c, v), (x, y)| {
        (c + (x - mean_x) * (y - mean_y), v + (x - mean_x).powi(2))
    });
    if variance <= f64::EPSILON {
        return None;
    }
    Some(covariance / variance)
}
