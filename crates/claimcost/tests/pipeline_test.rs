//! End-to-end pipeline tests over CSV fixtures in a temp directory.

use claimcost::model::{FittedPipeline, GbdtConfig};
use claimcost::output::ComplianceVerdict;
use claimcost::{ClaimCostPipeline, PipelineConfig, PipelinePaths};
use rstest::rstest;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const N_CLAIMS: usize = 60;

/// Write the three raw extracts. Claims cost more for fire and theft, with
/// serious third-party injuries and with late reporting.
fn write_raw(dir: &Path, with_race: bool) {
    let raw = dir.join("data").join("raw");
    fs::create_dir_all(&raw).unwrap();

    let types = ["Collision", "Theft", "Fire", "Vandalism"];
    let mut claims = String::from(
        "Claim_ID,Policy_ID,Accident_Date,FNOL_Date,Settlement_Date,Claim_Type,\
         Estimated_Claim_Amount,Ultimate_Claim_Amount,Status\n",
    );
    let mut third_party = String::from("Claim_ID,TP_ID,TP_Injury_Severity\n");
    for i in 0..N_CLAIMS {
        let claim_type = types[(i * 3 + i / 4) % 4];
        let delay = (i * 7) % 20;
        let severity = ["Minor", "Serious", "Fatal"][i % 3];
        let has_tp = i % 2 == 0;

        let mut amount = match claim_type {
            "Fire" => 12_000.0,
            "Theft" => 5_000.0,
            "Collision" => 2_000.0,
            _ => 600.0,
        } + 50.0 * delay as f64;
        if has_tp {
            amount *= 1.0 + 0.1 * [1.0, 5.0, 10.0][i % 3];
        }
        // A handful of open claims without a final cost.
        let ultimate = if i % 17 == 16 {
            String::new()
        } else {
            format!("{amount:.2}")
        };

        writeln!(
            claims,
            "C{i:03},P{:03},2023-03-01,2023-03-{:02},2023-09-01,{claim_type},{:.2},{ultimate},Closed",
            i % 40,
            1 + delay,
            amount * 0.9
        )
        .unwrap();
        if has_tp {
            writeln!(third_party, "C{i:03},T{i:03},{severity}").unwrap();
        }
    }

    let mut policyholder = String::from(if with_race {
        "Policy_ID,Customer_ID,Age_of_Driver,Policy_Start_Date,Race\n"
    } else {
        "Policy_ID,Customer_ID,Age_of_Driver,Policy_Start_Date\n"
    });
    for p in 0..40 {
        let age = if p % 9 == 0 {
            String::new()
        } else {
            (20 + (p * 13) % 50).to_string()
        };
        write!(policyholder, "P{p:03},K{p:03},{age},2022-01-{:02}", 1 + p % 28).unwrap();
        if with_race {
            write!(policyholder, ",{}", ["A", "B"][p % 2]).unwrap();
        }
        policyholder.push('\n');
    }

    fs::write(raw.join("claims.csv"), claims).unwrap();
    fs::write(raw.join("policyholder.csv"), policyholder).unwrap();
    fs::write(raw.join("third_party.csv"), third_party).unwrap();
}

fn config(root: &Path) -> PipelineConfig {
    let mut config = PipelineConfig {
        paths: PipelinePaths::rooted_at(root),
        ..Default::default()
    };
    config.trainer.gbdt = GbdtConfig {
        n_estimators: 25,
        max_depth: 3,
        ..Default::default()
    };
    config
}

#[test]
fn test_run_all_writes_every_artifact() {
    let dir = tempfile::tempdir().unwrap();
    write_raw(dir.path(), false);
    let config = config(dir.path());
    let paths = config.paths.clone();

    let mut rounds = Vec::new();
    let outcome = ClaimCostPipeline::new(config)
        .run_all(|done, total| rounds.push((done, total)))
        .unwrap();

    for path in [
        &paths.abt,
        &paths.model,
        &paths.report,
        &paths.figure,
        &paths.feature_importance,
        &paths.metrics,
    ] {
        assert!(path.exists(), "missing {}", path.display());
    }
    assert_eq!(rounds.len(), 25);
    assert_eq!(rounds.last(), Some(&(25, 25)));

    // Rows 16, 33 and 50 have no target.
    assert_eq!(outcome.build.dropped_missing_target, 3);
    assert_eq!(outcome.build.output_rows, N_CLAIMS - 3);
    assert_eq!(outcome.training.split.test.len(), 12);

    let explanation = &outcome.explanation;
    assert!(explanation.verdict().is_pass());
    assert_eq!(explanation.top_drivers().len(), 5);
    assert!(
        explanation
            .top_drivers()
            .windows(2)
            .all(|w| w[0].mean_abs_attribution >= w[1].mean_abs_attribution)
    );
    assert_eq!(
        explanation.attributions.dim(),
        (N_CLAIMS - 3, explanation.feature_names.len())
    );

    let report = fs::read_to_string(&paths.report).unwrap();
    assert!(report.contains("[PASS]"));
    assert!(report.contains("## 2. Top 5 Cost Drivers (SHAP Analysis)"));
    assert!(report.contains(&paths.figure.display().to_string()));
    let leaky = ["Settlement_Date", "Estimated_Claim_Amount"];
    assert!(
        explanation
            .feature_names
            .iter()
            .all(|f| !leaky.contains(&f.as_str()))
    );
}

#[test]
fn test_saved_model_reproduces_explanation() {
    let dir = tempfile::tempdir().unwrap();
    write_raw(dir.path(), false);
    let pipeline = ClaimCostPipeline::new(config(dir.path()));

    pipeline.run_build_dataset().unwrap();
    let trained = pipeline.run_train(|_, _| {}).unwrap();
    let loaded = FittedPipeline::load(&pipeline.config().paths.model).unwrap();

    assert_eq!(loaded.model(), trained.pipeline.model());
    assert_eq!(loaded.metrics(), Some(&trained.metrics));

    let explanation = pipeline.run_explain().unwrap();
    let predictions = loaded
        .predict_log(
            claimcost::data::Abt::read_csv(&pipeline.config().paths.abt)
                .unwrap()
                .frame(),
        )
        .unwrap();
    for (i, prediction) in predictions.iter().enumerate() {
        let total = explanation.attributions.row(i).sum() + explanation.base_value;
        assert!((total - prediction).abs() < 1e-9);
    }
}

#[rstest]
#[case(true)]
#[case(false)]
fn test_compliance_verdict_follows_features(#[case] with_race: bool) {
    let dir = tempfile::tempdir().unwrap();
    write_raw(dir.path(), with_race);
    let pipeline = ClaimCostPipeline::new(config(dir.path()));

    let outcome = pipeline.run_all(|_, _| {}).unwrap();
    let report = fs::read_to_string(&pipeline.config().paths.report).unwrap();

    if with_race {
        assert_eq!(
            outcome.explanation.verdict(),
            &ComplianceVerdict::Warning(vec!["Race".to_string()])
        );
        assert!(report.contains(
            "[WARNING] The following prohibited variables were found in the model features: Race"
        ));
    } else {
        assert!(outcome.explanation.verdict().is_pass());
        assert!(report.contains("[PASS]"));
    }
}

#[test]
fn test_missing_raw_file_fails_build() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = ClaimCostPipeline::new(config(dir.path()));
    assert!(pipeline.run_build_dataset().is_err());
}
