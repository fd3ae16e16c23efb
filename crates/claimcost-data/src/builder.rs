//! ABT construction.
//!
//! The builder runs a fixed sequence of steps over the raw tables. Each step
//! sees the output of the previous one, so the order below is part of the
//! contract:
//!
//! 1. left-join policyholders on `Policy_ID` (many-to-one)
//! 2. left-join third parties on `Claim_ID`, filling "no third party"
//! 3. drop rows without a target
//! 4. drop leakage columns
//! 5. median-impute driver age
//! 6. derive `Days_to_Report`
//! 7. derive `Policy_Tenure` when a policy start date exists
//! 8. score third-party injury severity
//! 9. derive the log target

use crate::abt::{Abt, is_numeric};
use crate::dates::day_difference;
use crate::error::{DataError, Result};
use crate::raw::{RawTables, has_column, require_columns};
use crate::schema::*;
use crate::severity::SeverityScale;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const ROW_INDEX: &str = "__row_index";
const MATCH_FLAG: &str = "__matched";
const JOIN_SUFFIX: &str = "_right";

/// Configuration for the dataset builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Lookup used for `TP_Severity_Score`.
    pub severity: SeverityScale,

    /// Columns removed unconditionally because they leak post-resolution
    /// information.
    pub leakage_columns: Vec<String>,

    /// Fill value for text third-party columns on claims without a third party.
    pub no_third_party_label: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            severity: SeverityScale::default(),
            leakage_columns: LEAKAGE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            no_third_party_label: "None".to_string(),
        }
    }
}

/// Effect of each builder step, for logging and inspection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildSummary {
    /// Claims before any filtering.
    pub input_claims: usize,
    /// Claims without a matching policy.
    pub unmatched_claims: usize,
    /// Claims without a third-party record.
    pub claims_without_third_party: usize,
    /// Rows dropped because the target was null.
    pub dropped_missing_target: usize,
    /// Leakage columns that were present and removed.
    pub dropped_leakage_columns: Vec<String>,
    /// Median used for driver age and how many values it filled.
    pub driver_age_imputation: Option<AgeImputation>,
    /// Whether `Policy_Tenure` could be derived.
    pub policy_tenure_derived: bool,
    /// Whether `TP_Severity_Score` could be derived.
    pub severity_scored: bool,
    /// Rows in the final ABT.
    pub output_rows: usize,
}

/// Median imputation applied to `Age_of_Driver`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgeImputation {
    /// Median of the non-null ages after filtering.
    pub median: f64,
    /// Number of nulls replaced.
    pub imputed: usize,
}

/// Builds the analytical base table from the raw tables.
#[derive(Debug, Clone, Default)]
pub struct DatasetBuilder {
    config: DatasetConfig,
}

impl DatasetBuilder {
    /// Create a builder with a custom configuration.
    pub const fn with_config(config: DatasetConfig) -> Self {
        Self { config }
    }

    /// Builder configuration.
    pub const fn config(&self) -> &DatasetConfig {
        &self.config
    }

    /// Run every step and return the ABT together with a summary of what
    /// each step did.
    pub fn build(&self, raw: &RawTables) -> Result<(Abt, BuildSummary)> {
        let mut summary = BuildSummary {
            input_claims: raw.claims.height(),
            ..Default::default()
        };

        info!("Merging data...");
        let (df, unmatched) = self.join_policyholders(&raw.claims, &raw.policyholder)?;
        summary.unmatched_claims = unmatched;

        let (df, without_tp) = self.join_third_party(df, &raw.third_party)?;
        summary.claims_without_third_party = without_tp;

        info!("Cleaning and filtering...");
        let (df, dropped) = self.drop_missing_target(df)?;
        summary.dropped_missing_target = dropped;

        let (df, leaked) = self.drop_leakage_columns(df)?;
        summary.dropped_leakage_columns = leaked;

        let (df, imputation) = self.impute_driver_age(df)?;
        summary.driver_age_imputation = imputation;

        info!("Engineering features...");
        let df = self.derive_days_to_report(df)?;

        let (df, tenure) = self.derive_policy_tenure(df)?;
        summary.policy_tenure_derived = tenure;

        let (df, scored) = self.derive_severity_score(df)?;
        summary.severity_scored = scored;

        let df = self.derive_log_target(df)?;
        summary.output_rows = df.height();

        info!(rows = df.height(), columns = df.width(), "ABT built");
        Ok((Abt::new(df)?, summary))
    }

    /// Step 1: left-join policyholders onto claims.
    ///
    /// The policyholder key must be unique. Claims with no matching policy
    /// are kept with null policyholder fields and counted.
    pub fn join_policyholders(
        &self,
        claims: &DataFrame,
        policyholder: &DataFrame,
    ) -> Result<(DataFrame, usize)> {
        require_columns(claims, "claims", &[CLAIM_ID, POLICY_ID])?;
        require_columns(policyholder, "policyholder", &[POLICY_ID])?;

        let duplicates = duplicate_keys(policyholder, POLICY_ID)?;
        if duplicates > 0 {
            return Err(DataError::CardinalityViolation {
                table: "policyholder".to_string(),
                key: POLICY_ID.to_string(),
                duplicates,
            });
        }

        let flagged = policyholder
            .clone()
            .lazy()
            .with_column(lit(true).alias(MATCH_FLAG));
        let joined = ordered_left_join(claims, flagged, POLICY_ID)?;

        let unmatched = joined.column(MATCH_FLAG)?.null_count();
        let joined = joined.drop(MATCH_FLAG)?;

        if unmatched > 0 {
            warn!("{unmatched} claims did not find a matching policy");
        } else {
            info!("Verification: all claims successfully mapped to a policy");
        }

        Ok((joined, unmatched))
    }

    /// Step 2: left-join third parties and encode "no third party".
    ///
    /// Every third-party column other than the key is filled on unmatched
    /// rows: text with the configured label, numbers with zero.
    pub fn join_third_party(
        &self,
        df: DataFrame,
        third_party: &DataFrame,
    ) -> Result<(DataFrame, usize)> {
        require_columns(&df, "claims", &[CLAIM_ID])?;
        require_columns(third_party, "third_party", &[CLAIM_ID])?;

        let duplicates = duplicate_keys(third_party, CLAIM_ID)?;
        if duplicates > 0 {
            warn!("{duplicates} duplicate {CLAIM_ID} rows in third-party data; claims will fan out");
        }

        // Third-party columns that collide with existing names come back suffixed.
        let tp_columns: Vec<(String, DataType)> = third_party
            .get_columns()
            .iter()
            .filter(|c| c.name().as_str() != CLAIM_ID)
            .map(|c| {
                let name = c.name().as_str();
                let joined_name = if has_column(&df, name) {
                    format!("{name}{JOIN_SUFFIX}")
                } else {
                    name.to_string()
                };
                (joined_name, c.dtype().clone())
            })
            .collect();

        let flagged = third_party
            .clone()
            .lazy()
            .with_column(lit(true).alias(MATCH_FLAG));
        let joined = ordered_left_join(&df, flagged, CLAIM_ID)?;
        let without_tp = joined.column(MATCH_FLAG)?.null_count();
        let joined = joined.drop(MATCH_FLAG)?;

        let fills: Vec<Expr> = tp_columns
            .iter()
            .filter_map(|(name, dtype)| match dtype {
                DataType::String => Some(
                    col(name.as_str())
                        .fill_null(lit(self.config.no_third_party_label.clone()))
                        .alias(name.as_str()),
                ),
                dt if is_numeric(dt) => {
                    Some(col(name.as_str()).fill_null(lit(0)).alias(name.as_str()))
                }
                _ => None,
            })
            .collect();

        let filled = if fills.is_empty() {
            joined
        } else {
            joined.lazy().with_columns(fills).collect()?
        };

        info!(
            "{without_tp} claims have no third-party record; filled {} third-party columns",
            tp_columns.len()
        );

        Ok((filled, without_tp))
    }

    /// Step 3: drop rows whose target is null.
    pub fn drop_missing_target(&self, df: DataFrame) -> Result<(DataFrame, usize)> {
        require_columns(&df, "merged claims", &[ULTIMATE_CLAIM_AMOUNT])?;
        let dtype = df.column(ULTIMATE_CLAIM_AMOUNT)?.dtype().clone();
        if !is_numeric(&dtype) {
            return Err(DataError::UnexpectedDtype {
                column: ULTIMATE_CLAIM_AMOUNT.to_string(),
                dtype: dtype.to_string(),
            });
        }

        let before = df.height();
        let filtered = df
            .lazy()
            .filter(col(ULTIMATE_CLAIM_AMOUNT).is_not_null())
            .collect()?;
        let dropped = before - filtered.height();

        info!("Dropped {dropped} rows with null {ULTIMATE_CLAIM_AMOUNT}");
        Ok((filtered, dropped))
    }

    /// Step 4: remove leakage columns that are present.
    pub fn drop_leakage_columns(&self, mut df: DataFrame) -> Result<(DataFrame, Vec<String>)> {
        let mut dropped = Vec::new();
        for column in &self.config.leakage_columns {
            if has_column(&df, column) {
                df = df.drop(column)?;
                dropped.push(column.clone());
            }
        }

        if !dropped.is_empty() {
            info!("Dropped leakage columns: {}", dropped.join(", "));
        }
        Ok((df, dropped))
    }

    /// Step 5: fill missing driver ages with the median of the remaining rows.
    pub fn impute_driver_age(&self, df: DataFrame) -> Result<(DataFrame, Option<AgeImputation>)> {
        if !has_column(&df, AGE_OF_DRIVER) {
            info!("Note: {AGE_OF_DRIVER} not found. Skipping age imputation.");
            return Ok((df, None));
        }

        let ages = df.column(AGE_OF_DRIVER)?;
        if !is_numeric(ages.dtype()) {
            return Err(DataError::UnexpectedDtype {
                column: AGE_OF_DRIVER.to_string(),
                dtype: ages.dtype().to_string(),
            });
        }

        let imputed = ages.null_count();
        let Some(median) = ages.as_materialized_series().median() else {
            warn!("{AGE_OF_DRIVER} has no observed values; leaving it unimputed");
            return Ok((df, None));
        };

        let df = if imputed > 0 {
            df.lazy()
                .with_column(
                    col(AGE_OF_DRIVER)
                        .cast(DataType::Float64)
                        .fill_null(lit(median))
                        .alias(AGE_OF_DRIVER),
                )
                .collect()?
        } else {
            df
        };

        info!("Imputed {imputed} missing {AGE_OF_DRIVER} values with median: {median}");
        Ok((df, Some(AgeImputation { median, imputed })))
    }

    /// Step 6: whole days between accident and first notice of loss.
    pub fn derive_days_to_report(&self, mut df: DataFrame) -> Result<DataFrame> {
        require_columns(&df, "merged claims", &[FNOL_DATE, ACCIDENT_DATE])?;
        let days = day_difference(&df, FNOL_DATE, ACCIDENT_DATE)?;
        df.with_column(Column::new(DAYS_TO_REPORT.into(), days))?;
        Ok(df)
    }

    /// Step 7: whole days between policy start and accident, when possible.
    pub fn derive_policy_tenure(&self, mut df: DataFrame) -> Result<(DataFrame, bool)> {
        if !has_column(&df, POLICY_START_DATE) {
            info!("Note: {POLICY_START_DATE} not found. Skipping {POLICY_TENURE} calculation.");
            return Ok((df, false));
        }

        let tenure = day_difference(&df, ACCIDENT_DATE, POLICY_START_DATE)?;
        df.with_column(Column::new(POLICY_TENURE.into(), tenure))?;
        Ok((df, true))
    }

    /// Step 8: ordinal score for the third-party injury label.
    pub fn derive_severity_score(&self, mut df: DataFrame) -> Result<(DataFrame, bool)> {
        if !has_column(&df, TP_INJURY_SEVERITY) {
            info!("Note: {TP_INJURY_SEVERITY} not found. Skipping {TP_SEVERITY_SCORE}.");
            return Ok((df, false));
        }

        let labels = df.column(TP_INJURY_SEVERITY)?.cast(&DataType::String)?;
        let scale = &self.config.severity;
        let mut unmapped = 0usize;
        let scores: Vec<f64> = labels
            .str()?
            .into_iter()
            .map(|label| {
                if label.is_some_and(|l| !scale.contains(l)) {
                    unmapped += 1;
                }
                scale.score(label)
            })
            .collect();

        if unmapped > 0 {
            info!(
                "{unmapped} {TP_INJURY_SEVERITY} labels outside the severity scale scored as {}",
                scale.fallback
            );
        }

        df.with_column(Column::new(TP_SEVERITY_SCORE.into(), scores))?;
        Ok((df, true))
    }

    /// Step 9: `ln(1 + target)`.
    pub fn derive_log_target(&self, mut df: DataFrame) -> Result<DataFrame> {
        let target = df.column(ULTIMATE_CLAIM_AMOUNT)?.cast(&DataType::Float64)?;
        let log_target: Vec<Option<f64>> = target
            .f64()?
            .into_iter()
            .map(|v| v.map(f64::ln_1p))
            .collect();

        df.with_column(Column::new(LOG_ULTIMATE_CLAIM_AMOUNT.into(), log_target))?;
        Ok(df)
    }
}

/// Rows beyond the first for each key value.
fn duplicate_keys(df: &DataFrame, key: &str) -> Result<usize> {
    let unique = df.column(key)?.as_materialized_series().n_unique()?;
    Ok(df.height().saturating_sub(unique))
}

/// Left join that keeps the left table's row order.
fn ordered_left_join(left: &DataFrame, right: LazyFrame, key: &str) -> Result<DataFrame> {
    let joined = left
        .clone()
        .lazy()
        .with_row_index(ROW_INDEX, None)
        .join(right, [col(key)], [col(key)], JoinArgs::new(JoinType::Left))
        .sort([ROW_INDEX], Default::default())
        .collect()?;
    Ok(joined.drop(ROW_INDEX)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> DatasetBuilder {
        DatasetBuilder::default()
    }

    #[test]
    fn test_policy_join_counts_unmatched() {
        let claims = df!(
            "Claim_ID" => ["C1", "C2", "C3"],
            "Policy_ID" => ["P1", "P9", "P1"]
        )
        .unwrap();
        let policies = df!(
            "Policy_ID" => ["P1", "P2"],
            "Customer_ID" => ["K1", "K2"]
        )
        .unwrap();

        let (joined, unmatched) = builder().join_policyholders(&claims, &policies).unwrap();
        assert_eq!(unmatched, 1);
        assert_eq!(joined.height(), 3);
        assert!(!has_column(&joined, MATCH_FLAG));

        let claim_ids: Vec<_> = joined.column("Claim_ID").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(claim_ids, vec![Some("C1"), Some("C2"), Some("C3")]);

        let customers: Vec<_> = joined.column("Customer_ID").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(customers, vec![Some("K1"), None, Some("K1")]);
    }

    #[test]
    fn test_policy_join_rejects_duplicate_policy() {
        let claims = df!("Claim_ID" => ["C1"], "Policy_ID" => ["P1"]).unwrap();
        let policies = df!("Policy_ID" => ["P1", "P1"], "Customer_ID" => ["K1", "K2"]).unwrap();

        let err = builder().join_policyholders(&claims, &policies).unwrap_err();
        assert!(matches!(err, DataError::CardinalityViolation { duplicates: 1, .. }));
    }

    #[test]
    fn test_third_party_fill() {
        let claims = df!("Claim_ID" => ["C1", "C2"], "Policy_ID" => ["P1", "P2"]).unwrap();
        let tp = df!(
            "Claim_ID" => ["C1"],
            "TP_ID" => ["T1"],
            "TP_Injury_Severity" => ["Serious"],
            "TP_Vehicle_Value" => [12_000.0]
        )
        .unwrap();

        let (joined, without) = builder().join_third_party(claims, &tp).unwrap();
        assert_eq!(without, 1);

        let severity: Vec<_> = joined
            .column("TP_Injury_Severity")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(severity, vec![Some("Serious"), Some("None")]);

        let values: Vec<_> = joined
            .column("TP_Vehicle_Value")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![Some(12_000.0), Some(0.0)]);
    }

    #[test]
    fn test_drop_missing_target() {
        let df = df!(
            "Claim_ID" => ["C1", "C2", "C3"],
            "Ultimate_Claim_Amount" => [Some(10.0), None, Some(30.0)]
        )
        .unwrap();

        let (filtered, dropped) = builder().drop_missing_target(df).unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(filtered.height(), 2);
        assert_eq!(filtered.column("Ultimate_Claim_Amount").unwrap().null_count(), 0);
    }

    #[test]
    fn test_drop_missing_target_requires_column() {
        let df = df!("Claim_ID" => ["C1"]).unwrap();
        let err = builder().drop_missing_target(df).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { ref column, .. } if column == ULTIMATE_CLAIM_AMOUNT));
    }

    #[test]
    fn test_drop_leakage_columns() {
        let df = df!(
            "Claim_ID" => ["C1"],
            "Settlement_Date" => ["2023-03-01"],
            "Estimated_Claim_Amount" => [900.0]
        )
        .unwrap();

        let (df, dropped) = builder().drop_leakage_columns(df).unwrap();
        assert_eq!(dropped, vec!["Settlement_Date", "Estimated_Claim_Amount"]);
        assert_eq!(df.width(), 1);
    }

    #[test]
    fn test_impute_driver_age_with_median() {
        let df = df!("Age_of_Driver" => [Some(20.0), None, Some(40.0), Some(60.0)]).unwrap();

        let (df, imputation) = builder().impute_driver_age(df).unwrap();
        let imputation = imputation.unwrap();
        assert_eq!(imputation.median, 40.0);
        assert_eq!(imputation.imputed, 1);

        let ages: Vec<_> = df.column("Age_of_Driver").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(ages, vec![Some(20.0), Some(40.0), Some(40.0), Some(60.0)]);
    }

    #[test]
    fn test_policy_tenure_skipped_without_start_date() {
        let df = df!("Accident_Date" => ["2023-01-01"]).unwrap();
        let (df, derived) = builder().derive_policy_tenure(df).unwrap();
        assert!(!derived);
        assert!(!has_column(&df, POLICY_TENURE));
    }

    #[test]
    fn test_log_target() {
        let df = df!("Ultimate_Claim_Amount" => [0.0, 99.0]).unwrap();
        let df = builder().derive_log_target(df).unwrap();
        let logs: Vec<_> = df
            .column(LOG_ULTIMATE_CLAIM_AMOUNT)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(logs, vec![Some(0.0), Some(100.0_f64.ln())]);
    }
}
