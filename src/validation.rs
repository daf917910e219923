//! Validation System - Rule/Policy Separation
//!
//! Rules produce structured violations about the extracted plan data.
//! Policy decides whether they block the conversion. Values are never
//! rewritten here; codes pass through untyped either way.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::extract::SourceFeature;
use crate::skeleton::SUPPORTED_SRS;

pub const MAX_PLAN_NAME_CHARS: usize = 100;

pub const PLAN_ART_CODES: &[&str] = &[
    "1000", "10000", "10001", "3000", "4000", "40000", "40001", "40002", "5000", "7000", "9999",
];

pub const RECHTSSTAND_CODES: &[&str] = &["1000", "2000", "3000", "4000"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    Block,
    #[default]
    Warn,
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
}

impl ValidationResult {
    pub fn failure(violations: Vec<ValidationViolation>) -> Self {
        Self { valid: false, violations }
    }

    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }
}

/// What a rule gets to look at
pub struct PlanInput<'a> {
    pub feature: &'a SourceFeature,
    pub srs_name: &'a str,
}

/// Validation rule trait - produces violations
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn validate(&self, input: &PlanInput<'_>) -> Vec<ValidationViolation>;
}

fn warning(rule: &str, message: &str, expected: String, actual: &str, fix: &str) -> ValidationViolation {
    ValidationViolation {
        rule: rule.to_string(),
        severity: ViolationSeverity::Warning,
        message: message.to_string(),
        expected: Some(expected),
        actual: Some(actual.to_string()),
        remediation: vec![fix.to_string()],
    }
}

// --- Concrete Rules ---

/// xPlanBox only accepts a restricted character set in plan names
pub struct PlanNameCharsetRule;

impl PlanNameCharsetRule {
    fn allowed(c: char) -> bool {
        c.is_ascii_alphanumeric()
            || c.is_whitespace()
            || matches!(c, '.' | '(' | ')' | '_' | '-' | 'ä' | 'ü' | 'ö' | 'Ä' | 'Ü' | 'Ö' | 'ß')
    }
}

impl ValidationRule for PlanNameCharsetRule {
    fn name(&self) -> &'static str { "plan_name_charset" }

    fn validate(&self, input: &PlanInput<'_>) -> Vec<ValidationViolation> {
        let bad: String = input.feature.name.chars().filter(|c| !Self::allowed(*c)).collect();
        if bad.is_empty() {
            return vec![];
        }
        vec![warning(
            self.name(),
            "Plan name contains characters xPlanBox rejects",
            "A-Z a-z 0-9 . ( ) _ - ä ü ö Ä Ü Ö ß and spaces".to_string(),
            &bad,
            "Remove or replace the listed characters",
        )]
    }
}

pub struct PlanNameLengthRule;

impl ValidationRule for PlanNameLengthRule {
    fn name(&self) -> &'static str { "plan_name_length" }

    fn validate(&self, input: &PlanInput<'_>) -> Vec<ValidationViolation> {
        let len = input.feature.name.chars().count();
        if len <= MAX_PLAN_NAME_CHARS {
            return vec![];
        }
        vec![warning(
            self.name(),
            "Plan name too long for xPlanBox",
            format!("at most {} characters", MAX_PLAN_NAME_CHARS),
            &format!("{} characters", len),
            "Shorten the plan name",
        )]
    }
}

pub struct AgsFormatRule;

impl ValidationRule for AgsFormatRule {
    fn name(&self) -> &'static str { "ags_format" }

    fn validate(&self, input: &PlanInput<'_>) -> Vec<ValidationViolation> {
        let ags = &input.feature.ags;
        if ags.len() == 8 && ags.chars().all(|c| c.is_ascii_digit()) {
            return vec![];
        }
        vec![warning(
            self.name(),
            "Municipality key is not an 8-digit AGS",
            "8 digits".to_string(),
            ags,
            "Use the 8-digit Amtlicher Gemeindeschlüssel",
        )]
    }
}

/// Checks a code field against its enumeration
pub struct CodeListRule {
    name: &'static str,
    codes: &'static [&'static str],
    field: fn(&SourceFeature) -> &str,
}

impl CodeListRule {
    pub fn plan_art() -> Self {
        Self { name: "plan_art", codes: PLAN_ART_CODES, field: |f| f.plan_art.as_str() }
    }

    pub fn rechtsstand() -> Self {
        Self { name: "rechtsstand", codes: RECHTSSTAND_CODES, field: |f| f.rechtsstand.as_str() }
    }
}

impl ValidationRule for CodeListRule {
    fn name(&self) -> &'static str { self.name }

    fn validate(&self, input: &PlanInput<'_>) -> Vec<ValidationViolation> {
        let value = (self.field)(input.feature);
        if self.codes.contains(&value) {
            return vec![];
        }
        vec![warning(
            self.name(),
            "Code is not in the XPlanung code list",
            self.codes.join(", "),
            value,
            "Pick a code from the list",
        )]
    }
}

pub struct ResolutionDateRule;

impl ValidationRule for ResolutionDateRule {
    fn name(&self) -> &'static str { "resolution_date" }

    fn validate(&self, input: &PlanInput<'_>) -> Vec<ValidationViolation> {
        let date = &input.feature.aufstellungsbeschluss_datum;
        if date.is_empty() || NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok() {
            return vec![];
        }
        vec![warning(
            self.name(),
            "Resolution date is not an ISO date",
            "YYYY-MM-DD".to_string(),
            date,
            "Export the date field as YYYY-MM-DD",
        )]
    }
}

pub struct SrsNameRule;

impl ValidationRule for SrsNameRule {
    fn name(&self) -> &'static str { "srs_name" }

    fn validate(&self, input: &PlanInput<'_>) -> Vec<ValidationViolation> {
        if SUPPORTED_SRS.contains(&input.srs_name) {
            return vec![];
        }
        vec![ValidationViolation {
            rule: self.name().to_string(),
            severity: ViolationSeverity::Error,
            message: "Unsupported coordinate reference system".to_string(),
            expected: Some(SUPPORTED_SRS.join(", ")),
            actual: Some(input.srs_name.to_string()),
            remediation: vec!["Configure one of the supported EPSG codes".to_string()],
        }]
    }
}

/// Validator orchestrates rules and applies policy
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(PlanNameCharsetRule),
                Box::new(PlanNameLengthRule),
                Box::new(AgsFormatRule),
                Box::new(CodeListRule::plan_art()),
                Box::new(CodeListRule::rechtsstand()),
                Box::new(ResolutionDateRule),
                Box::new(SrsNameRule),
            ],
        }
    }

    pub fn validate(&self, input: &PlanInput<'_>, mode: FailureMode) -> ValidationResult {
        let mut all_violations = vec![];

        for rule in &self.rules {
            all_violations.extend(rule.validate(input));
        }

        for v in &all_violations {
            match mode {
                FailureMode::Log => tracing::info!(rule = %v.rule, actual = ?v.actual, "{}", v.message),
                _ => tracing::warn!(rule = %v.rule, actual = ?v.actual, "{}", v.message),
            }
        }

        let result = ValidationResult { valid: true, violations: all_violations };

        match mode {
            FailureMode::Block if result.has_errors() => ValidationResult::failure(result.violations),
            FailureMode::Block | FailureMode::Warn | FailureMode::Log => result,
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
