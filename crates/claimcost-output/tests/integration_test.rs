//! Integration tests for the compliance report workflow.

use approx::assert_relative_eq;
use claimcost_output::{
    ComplianceConfig, DriverRanking, ExportFormat, Exporter, ReportBuilder, SummaryPlot,
    check_compliance,
};
use ndarray::Array2;
use rstest::rstest;

fn feature_names() -> Vec<String> {
    [
        "Age_of_Driver",
        "Days_to_Report",
        "TP_Severity_Score",
        "Claim_Type_Fire",
        "Claim_Type_Theft",
        "Region_North",
        "Vehicle_Age",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Attributions whose column `j` has magnitude roughly `j + 1`, so the last
/// column is the strongest driver.
fn attributions(n_rows: usize) -> Array2<f64> {
    Array2::from_shape_fn((n_rows, 7), |(i, j)| {
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        sign * (j as f64 + 1.0) * 0.1
    })
}

#[test]
fn test_full_report_workflow() {
    let names = feature_names();
    let phi = attributions(20);
    let x = Array2::from_shape_fn((20, 7), |(i, j)| (i * j) as f64);
    let config = ComplianceConfig::default();

    let verdict = check_compliance(&names, &config);
    let ranking = DriverRanking::from_attributions(&names, &phi).unwrap();
    let top = ranking.top(config.top_drivers);

    assert_eq!(top.len(), 5);
    assert_eq!(top[0].feature, "Vehicle_Age");
    assert_relative_eq!(top[0].mean_abs_attribution, 0.7, epsilon = 1e-12);

    let dir = tempfile::tempdir().unwrap();
    let figure = dir.path().join("reports").join("figures").join("shap_summary_plot.png");
    SummaryPlot::new(&names, &phi, &x)
        .unwrap()
        .render(top, &figure, 400, 300)
        .unwrap();
    assert!(figure.exists());

    let report = ReportBuilder::new()
        .verdict(verdict)
        .drivers(top)
        .figure_path(&figure)
        .build();
    let report_path = dir.path().join("reports").join("compliance_report.md");
    report.write(&report_path).unwrap();

    let markdown = std::fs::read_to_string(&report_path).unwrap();
    assert!(markdown.starts_with("# Model Explainability & Compliance Report\n"));
    assert!(markdown.contains("[PASS]"));
    assert!(markdown.contains("## 2. Top 5 Cost Drivers (SHAP Analysis)"));
    assert!(markdown.contains("- **Vehicle_Age**: Average impact (SHAP value) of 0.7000"));
    assert_eq!(markdown.matches("- **").count(), 5);

    let importance = dir.path().join("reports").join("feature_importance.csv");
    ranking.export_to_file(&importance, ExportFormat::Csv).unwrap();
    let csv = std::fs::read_to_string(&importance).unwrap();
    assert_eq!(csv.lines().count(), 8);
}

#[rstest]
#[case(&["Race"], "Race")]
#[case(&["Religion", "Race"], "Race, Religion")]
#[case(&["Political_Affiliation"], "Political_Affiliation")]
fn test_prohibited_feature_produces_warning(#[case] extra: &[&str], #[case] listed: &str) {
    let mut names = feature_names();
    names.extend(extra.iter().map(|s| s.to_string()));

    let verdict = check_compliance(&names, &ComplianceConfig::default());
    assert!(!verdict.is_pass());

    let report = ReportBuilder::new().verdict(verdict).build();
    let expected = format!(
        "[WARNING] The following prohibited variables were found in the model features: {listed}\n"
    );
    assert!(report.to_markdown().contains(&expected));
}

#[test]
fn test_fewer_features_than_top_n() {
    let names = vec!["Age_of_Driver".to_string(), "Days_to_Report".to_string()];
    let phi = Array2::from_elem((4, 2), 0.5);
    let ranking = DriverRanking::from_attributions(&names, &phi).unwrap();

    let report = ReportBuilder::new().drivers(ranking.top(5)).build();
    assert_eq!(report.drivers.len(), 2);
    assert!(report.to_markdown().contains("## 2. Top 2 Cost Drivers"));
}
