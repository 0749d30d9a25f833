use std::path::PathBuf;

use approx::assert_abs_diff_eq;
use fseof_core::configuration::Solver;
use fseof_core::fseof::aggregate::{Classification, ExclusionReason, TargetType};
use fseof_core::fseof::step::StepMode;
use fseof_core::fseof::{Fseof, FseofError, FseofOptions, FseofOptionsBuilder};
use fseof_core::metabolic_model::model::Model;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn production_model() -> Model {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_data")
        .join("test_models")
        .join("toy_production.json");
    Model::read_json(path).unwrap()
}

fn production_fseof() -> Fseof {
    Fseof::new(&production_model(), "BIOMASS", "prod_c").unwrap()
}

fn target_type(classification: Classification) -> Option<TargetType> {
    classification.target_type()
}

#[test]
fn fvseof_finds_up_and_down_targets() {
    init_logging();
    let fseof = production_fseof();
    assert_abs_diff_eq!(fseof.max_yield(), 10., epsilon = 1e-6);

    let table = fseof.run(&FseofOptions::fvseof(5, true, 2)).unwrap();
    assert!(table.failures.is_empty());
    assert_eq!(table.bounds().len(), 5);

    for id in ["R_up", "PROD", "GLCt"] {
        let row = table.row(id).unwrap();
        assert_eq!(target_type(row.classification), Some(TargetType::Up), "{}", id);
    }
    for id in ["R_down", "BIOMASS"] {
        let row = table.row(id).unwrap();
        assert_eq!(target_type(row.classification), Some(TargetType::Down), "{}", id);
    }
    // Glucose uptake is negative and grows in magnitude
    assert_eq!(
        target_type(table.row("EX_glc").unwrap().classification),
        Some(TargetType::Up)
    );

    let r_up = table.row("R_up").unwrap();
    assert_abs_diff_eq!(r_up.low.unwrap(), 0.25, epsilon = 1e-5);
    assert_abs_diff_eq!(r_up.high.unwrap(), 8.05, epsilon = 1e-5);
    assert_eq!(r_up.gene_reaction_rule.as_deref(), Some("g_up1 or g_up2"));
    assert_eq!(r_up.essential, None);

    // Up targets come first
    assert_eq!(
        table.rows[0].classification,
        Classification::Target(TargetType::Up)
    );
}

#[test]
fn fseof_with_fba_and_essentiality() {
    init_logging();
    let options = FseofOptionsBuilder::default()
        .n_steps(3)
        .fraction_low(0.1)
        .mode(StepMode::Fba { loopless: true })
        .check_essentiality(true)
        .build()
        .unwrap();
    let table = production_fseof().run(&options).unwrap();

    let r_up = table.row("R_up").unwrap();
    assert_eq!(r_up.classification, Classification::Target(TargetType::Up));
    assert_abs_diff_eq!(r_up.slope.unwrap(), 1., epsilon = 1e-6);
    assert_eq!(r_up.essential, Some(false));

    let r_down = table.row("R_down").unwrap();
    assert_eq!(r_down.classification, Classification::Target(TargetType::Down));
    assert_abs_diff_eq!(r_down.slope.unwrap(), -1., epsilon = 1e-6);
    assert_eq!(r_down.essential, Some(true));

    let uptake = table.row("GLCt").unwrap();
    assert_eq!(
        uptake.classification,
        Classification::Excluded(ExclusionReason::Unchanged)
    );
    assert_eq!(uptake.essential, None);
}

#[test]
fn fseof_fs_is_reproducible() {
    init_logging();
    let options = FseofOptions {
        mode: StepMode::Sampling {
            n_samples: 40,
            thinning: 20,
            fraction_of_optimum: 0.95,
            seed: Some(1234),
        },
        ..FseofOptions::fseof_fs(0.1, 0.9, 40)
    };
    let fseof = production_fseof();
    let first = fseof.run(&options).unwrap();
    let second = fseof.run(&options).unwrap();
    assert_eq!(first, second);

    assert_eq!(
        target_type(first.row("R_up").unwrap().classification),
        Some(TargetType::Up)
    );
    assert_eq!(
        target_type(first.row("R_down").unwrap().classification),
        Some(TargetType::Down)
    );
}

#[test]
fn solvers_agree() {
    init_logging();
    let options = FseofOptions::fvseof(4, true, 1);
    let simplex = production_fseof().run(&options).unwrap();
    let interior = production_fseof()
        .solver(Solver::Clarabel)
        .unwrap()
        .run(&options)
        .unwrap();
    for row in &simplex.rows {
        let other = interior.row(&row.reaction_id).unwrap();
        assert_eq!(row.classification, other.classification);
        assert_abs_diff_eq!(row.slope.unwrap(), other.slope.unwrap(), epsilon = 1e-4);
    }
}

#[test]
fn report_outputs() {
    init_logging();
    let table = production_fseof()
        .run(&FseofOptions::fvseof(3, true, 1))
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("targets.csv");
    table.write_csv(&path).unwrap();
    let csv = std::fs::read_to_string(&path).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "reaction_id,reaction_name,target_type,exclusion,slope,change,essential,gene_reaction_rule,step_0,step_1,step_2"
    );
    assert_eq!(lines.count(), 6);
    assert!(csv.contains("R_up,Precursor synthesis,up,"));

    let json = serde_json::to_value(&table).unwrap();
    assert_eq!(json["rows"].as_array().unwrap().len(), 6);
    assert_eq!(json["failures"].as_array().unwrap().len(), 0);
}

#[test]
fn configuration_errors() {
    let model = production_model();
    assert!(matches!(
        Fseof::new(&model, "BIOMASS", "not_a_metabolite"),
        Err(FseofError::TargetMetaboliteNotFound(_))
    ));
    let fseof = Fseof::new(&model, "BIOMASS", "prod_c").unwrap();
    assert!(matches!(
        fseof.run(&FseofOptions::fseof_fs(0.5, 0.2, 10)),
        Err(FseofError::InvalidOptions(_))
    ));
    assert!(matches!(
        fseof.run(&FseofOptions::fseof_fs(0.1, 0.2, 0)),
        Err(FseofError::InvalidOptions(_))
    ));

    // A product nothing makes can't be swept
    let mut model = production_model();
    model.knock_out_reaction("PROD").unwrap();
    assert!(matches!(
        Fseof::new(&model, "BIOMASS", "prod_c"),
        Err(FseofError::NoProduction { .. })
    ));
}
