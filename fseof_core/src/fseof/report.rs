//! Result table of a sweep
use std::cmp::Ordering;
use std::fs::File;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::fseof::aggregate::{Classification, TargetType};
use crate::fseof::schedule::BoundSchedule;
use crate::fseof::step::StepFailure;

/// One reaction of the report
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TargetRow {
    pub reaction_id: String,
    pub reaction_name: Option<String>,
    pub gene_reaction_rule: Option<String>,
    pub classification: Classification,
    /// Statistic at every step, None where the step failed
    pub values: Vec<Option<f64>>,
    /// Statistic at the first step
    pub low: Option<f64>,
    /// Statistic at the last step
    pub high: Option<f64>,
    /// Least squares slope of the statistic against the enforced bound
    pub slope: Option<f64>,
    /// `high - low`
    pub change: Option<f64>,
    /// None when essentiality was not checked
    pub essential: Option<bool>,
}

impl TargetRow {
    pub fn is_target(&self) -> bool {
        self.classification.is_target()
    }

    pub fn target_type(&self) -> Option<TargetType> {
        self.classification.target_type()
    }

    fn ordering(&self, other: &Self) -> Ordering {
        let magnitude = |row: &TargetRow| {
            row.slope
                .or(row.change)
                .map(f64::abs)
                .unwrap_or(f64::NEG_INFINITY)
        };
        self.classification
            .rank()
            .cmp(&other.classification.rank())
            .then_with(|| magnitude(other).total_cmp(&magnitude(self)))
            .then_with(|| self.reaction_id.cmp(&other.reaction_id))
    }
}

/// Every reaction of the model with its trend, plus the schedule and failed steps
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TargetTable {
    pub schedule: BoundSchedule,
    pub rows: Vec<TargetRow>,
    pub failures: Vec<StepFailure>,
}

impl TargetTable {
    /// Build the table, sorting rows with up targets first, then down targets, then
    /// excluded reactions, each group by decreasing absolute slope
    pub fn new(schedule: BoundSchedule, mut rows: Vec<TargetRow>, failures: Vec<StepFailure>) -> Self {
        rows.sort_by(|a, b| a.ordering(b));
        TargetTable {
            schedule,
            rows,
            failures,
        }
    }

    pub fn bounds(&self) -> &[f64] {
        self.schedule.bounds()
    }

    /// Rows classified as up or down targets
    pub fn targets(&self) -> impl Iterator<Item = &TargetRow> {
        self.rows.iter().filter(|row| row.is_target())
    }

    pub fn targets_of_type(&self, target_type: TargetType) -> impl Iterator<Item = &TargetRow> {
        self.rows
            .iter()
            .filter(move |row| row.target_type() == Some(target_type))
    }

    pub fn row(&self, reaction_id: &str) -> Option<&TargetRow> {
        self.rows.iter().find(|row| row.reaction_id == reaction_id)
    }

    fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = [
            "reaction_id",
            "reaction_name",
            "target_type",
            "exclusion",
            "slope",
            "change",
            "essential",
            "gene_reaction_rule",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        header.extend((0..self.schedule.len()).map(|i| format!("step_{}", i)));
        header
    }

    fn write_records<W: std::io::Write>(&self, writer: &mut csv::Writer<W>) -> Result<(), ReportError> {
        let cell = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();
        writer.write_record(self.header())?;
        for row in &self.rows {
            let mut record = vec![
                row.reaction_id.clone(),
                row.reaction_name.clone().unwrap_or_default(),
                row.classification
                    .target_type()
                    .map(|t| t.to_string())
                    .unwrap_or_default(),
                row.classification
                    .exclusion()
                    .map(|e| e.to_string())
                    .unwrap_or_default(),
                cell(row.slope),
                cell(row.change),
                row.essential.map(|e| e.to_string()).unwrap_or_default(),
                row.gene_reaction_rule.clone().unwrap_or_default(),
            ];
            record.extend(row.values.iter().map(|v| cell(*v)));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the table as CSV, missing values are empty cells
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), ReportError> {
        let mut writer = csv::Writer::from_writer(File::create(path)?);
        self.write_records(&mut writer)
    }

    pub fn to_csv_string(&self) -> Result<String, ReportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        self.write_records(&mut writer)?;
        let bytes = writer
            .into_inner()
            .map_err(|err| ReportError::Io(err.into_error()))?;
        String::from_utf8(bytes).map_err(|err| ReportError::Encoding(err.to_string()))
    }
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Unable to write csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("Unable to write report: {0}")]
    Io(#[from] std::io::Error),
    #[error("Report is not valid UTF-8: {0}")]
    Encoding(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fseof::aggregate::ExclusionReason;

    fn row(id: &str, classification: Classification, slope: Option<f64>) -> TargetRow {
        TargetRow {
            reaction_id: id.to_string(),
            reaction_name: Some(format!("{} name", id)),
            gene_reaction_rule: None,
            classification,
            values: vec![Some(1.), None],
            low: Some(1.),
            high: None,
            slope,
            change: Some(0.5),
            essential: None,
        }
    }

    fn table() -> TargetTable {
        let schedule = BoundSchedule::two_point(2., 0.0, 1.0).unwrap();
        let rows = vec![
            row(
                "X",
                Classification::Excluded(ExclusionReason::MissingData),
                None,
            ),
            row("D", Classification::Target(TargetType::Down), Some(-3.)),
            row("U1", Classification::Target(TargetType::Up), Some(0.5)),
            row("U2", Classification::Target(TargetType::Up), Some(2.)),
        ];
        TargetTable::new(schedule, rows, Vec::new())
    }

    #[test]
    fn rows_are_sorted() {
        let table = table();
        let ids: Vec<&str> = table.rows.iter().map(|r| r.reaction_id.as_str()).collect();
        assert_eq!(ids, vec!["U2", "U1", "D", "X"]);
    }

    #[test]
    fn target_filters() {
        let table = table();
        assert_eq!(table.targets().count(), 3);
        assert_eq!(table.targets_of_type(TargetType::Down).count(), 1);
        assert!(table.row("X").is_some_and(|r| !r.is_target()));
    }

    #[test]
    fn csv_output() {
        let csv = table().to_csv_string().unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "reaction_id,reaction_name,target_type,exclusion,slope,change,essential,gene_reaction_rule,step_0,step_1"
        );
        assert_eq!(lines.next().unwrap(), "U2,U2 name,up,,2,0.5,,,1,");
        assert_eq!(
            csv.lines().last().unwrap(),
            "X,X name,,missing_data,,0.5,,,1,"
        );
    }

    #[test]
    fn csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("targets.csv");
        table().write_csv(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, table().to_csv_string().unwrap());
    }
}
