//! Column names shared by the raw tables and the ABT.
//!
//! The raw CSV headers are part of the input contract, so they live here as
//! constants rather than being spelled out at each use site.

/// Claim identifier (claims, third-party).
pub const CLAIM_ID: &str = "Claim_ID";
/// Policy identifier (claims, policyholder).
pub const POLICY_ID: &str = "Policy_ID";
/// Customer identifier (policyholder).
pub const CUSTOMER_ID: &str = "Customer_ID";
/// Third-party identifier.
pub const TP_ID: &str = "TP_ID";

/// Date of the accident.
pub const ACCIDENT_DATE: &str = "Accident_Date";
/// First notice of loss date.
pub const FNOL_DATE: &str = "FNOL_Date";
/// Policy inception date (optional).
pub const POLICY_START_DATE: &str = "Policy_Start_Date";
/// Settlement date, only known after resolution.
pub const SETTLEMENT_DATE: &str = "Settlement_Date";

/// Ultimate cost of the claim, the supervised target.
pub const ULTIMATE_CLAIM_AMOUNT: &str = "Ultimate_Claim_Amount";
/// Pre-settlement reserve estimate, only known after resolution.
pub const ESTIMATED_CLAIM_AMOUNT: &str = "Estimated_Claim_Amount";
/// Claim status.
pub const STATUS: &str = "Status";
/// Driver age (policyholder).
pub const AGE_OF_DRIVER: &str = "Age_of_Driver";
/// Third-party injury severity label.
pub const TP_INJURY_SEVERITY: &str = "TP_Injury_Severity";

/// Derived: days between accident and first notice of loss.
pub const DAYS_TO_REPORT: &str = "Days_to_Report";
/// Derived: days between policy start and accident.
pub const POLICY_TENURE: &str = "Policy_Tenure";
/// Derived: ordinal third-party injury score.
pub const TP_SEVERITY_SCORE: &str = "TP_Severity_Score";
/// Derived: `ln(1 + Ultimate_Claim_Amount)`.
pub const LOG_ULTIMATE_CLAIM_AMOUNT: &str = "Log_Ultimate_Claim_Amount";

/// Columns that are only populated once a claim is resolved.
pub const LEAKAGE_COLUMNS: [&str; 2] = [SETTLEMENT_DATE, ESTIMATED_CLAIM_AMOUNT];
