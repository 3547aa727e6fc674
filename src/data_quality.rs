// ✅ Data Quality Engine - diagnostics for a merged budget dataset
//
// Nothing here blocks the pipeline. Each check turns one of the engine's
// local degradations (unmatched unit labels, unusable populations, CPI gaps,
// unsplittable mixed records, broken hierarchy links) into a reviewable issue
// before any chart is drawn.

use crate::budget::{BudgetRecord, Classification};
use crate::entities::UnitRegistry;
use crate::error::EngineWarning;
use crate::inflation::CpiIndex;
use crate::merge::structural_warnings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// QUALITY ISSUES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Critical, // Figures derived from this data are wrong (e.g. per-capita forced to 0)
    Warning,  // Data is excluded or left unadjusted
    Info,     // Data is usable but looks odd
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub severity: Severity,
    /// Record id, unit name or year the issue is about
    pub subject: String,
    pub field: String,
    pub issue: String,
    pub recommendation: String,
}

// ============================================================================
// QUALITY REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub record_count: usize,
    pub unit_count: usize,
    pub unmatched_records: usize,
    /// Units to keep out of ranked comparisons
    pub suspect_units: Vec<String>,
    pub missing_cpi_years: Vec<i32>,
    pub issues: Vec<QualityIssue>,
}

impl QualityReport {
    pub fn summary(&self) -> String {
        format!(
            "{} records, {} units: {} issues ({} critical), {} unmatched records, {} suspect units",
            self.record_count,
            self.unit_count,
            self.issues.len(),
            self.count(Severity::Critical),
            self.unmatched_records,
            self.suspect_units.len()
        )
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn has_critical_issues(&self) -> bool {
        self.count(Severity::Critical) > 0
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

// ============================================================================
// DATA QUALITY ENGINE
// ============================================================================

pub struct DataQualityEngine {
    /// Slack allowed outside 0-1 for allocation fractions
    allocation_tolerance: f64,
}

impl DataQualityEngine {
    pub fn new() -> Self {
        DataQualityEngine {
            allocation_tolerance: 1e-9,
        }
    }

    pub fn assess(
        &self,
        records: &[BudgetRecord],
        registry: &UnitRegistry,
        cpi: &CpiIndex,
        base_year: i32,
    ) -> QualityReport {
        let mut issues = Vec::new();
        let mut unmatched_records = 0;
        let mut matched_units = BTreeSet::new();
        let mut missing_cpi_years = BTreeSet::new();

        if !cpi.contains_year(base_year) {
            missing_cpi_years.insert(base_year);
        }

        for record in records {
            match registry.resolve_position(&record.administrative_unit_label) {
                Ok(position) => {
                    matched_units.insert(position);
                }
                Err(_) => {
                    unmatched_records += 1;
                    issues.push(QualityIssue {
                        severity: Severity::Warning,
                        subject: record.id.clone(),
                        field: "administrativeUnit".to_string(),
                        issue: format!("Unknown administrative unit '{}'", record.administrative_unit_label),
                        recommendation: "Add the unit to the registry or an alias for this label".to_string(),
                    });
                }
            }

            if !cpi.contains_year(record.fiscal_year) {
                missing_cpi_years.insert(record.fiscal_year);
            }

            issues.extend(self.check_record(record));
        }

        issues.extend(structural_warnings(records).into_iter().filter_map(structural_issue));

        let mut suspect_units = Vec::new();
        for (position, unit) in registry.units().iter().enumerate() {
            if unit.has_valid_population() {
                continue;
            }
            suspect_units.push(unit.name.clone());

            // Only critical when records actually divide by it
            let severity = if matched_units.contains(&position) {
                Severity::Critical
            } else {
                Severity::Info
            };
            issues.push(QualityIssue {
                severity,
                subject: unit.name.clone(),
                field: "population".to_string(),
                issue: format!("Population {} cannot be used for per-capita figures", unit.population),
                recommendation: "Exclude this unit from ranked comparisons until the population is fixed"
                    .to_string(),
            });
        }

        for year in &missing_cpi_years {
            issues.push(QualityIssue {
                severity: Severity::Warning,
                subject: year.to_string(),
                field: "cpi".to_string(),
                issue: format!("No CPI value for {}; amounts stay in nominal dollars", year),
                recommendation: "Extend the CPI series to cover every fiscal year".to_string(),
            });
        }

        issues.sort_by(|a, b| a.severity.cmp(&b.severity));

        QualityReport {
            record_count: records.len(),
            unit_count: registry.len(),
            unmatched_records,
            suspect_units,
            missing_cpi_years: missing_cpi_years.into_iter().collect(),
            issues,
        }
    }

    fn check_record(&self, record: &BudgetRecord) -> Vec<QualityIssue> {
        let mut issues = Vec::new();
        let issue = |severity, field: &str, text: String, recommendation: &str| QualityIssue {
            severity,
            subject: record.id.clone(),
            field: field.to_string(),
            issue: text,
            recommendation: recommendation.to_string(),
        };

        if record.classification == Classification::Mixed
            && record.capital_expense.is_none()
            && record.operating_expense.is_none()
        {
            issues.push(issue(
                Severity::Warning,
                "classification",
                "Mixed record has neither capital nor operating expense".to_string(),
                "Add the capital/operating split to the classification overlay",
            ));
        }

        if record.total_expense < 0.0 {
            issues.push(issue(
                Severity::Warning,
                "totalExpense",
                format!("Negative expense {:.2}", record.total_expense),
                "Verify the parsed amount",
            ));
        }

        let a = record.allocation_fraction;
        if a < -self.allocation_tolerance || a > 1.0 + self.allocation_tolerance {
            issues.push(issue(
                Severity::Info,
                "allocation",
                format!("Allocation {} is outside 0-1", a),
                "Allocation is a share of the parent budget",
            ));
        }

        issues
    }
}

fn structural_issue(warning: EngineWarning) -> Option<QualityIssue> {
    match warning {
        EngineWarning::DuplicateRecordId { id, fiscal_year } => Some(QualityIssue {
            severity: Severity::Warning,
            subject: id,
            field: "id".to_string(),
            issue: format!("Id appears more than once in fiscal year {}; totals count every copy", fiscal_year),
            recommendation: "Remove the repeated record from one of the source documents".to_string(),
        }),
        EngineWarning::DanglingParent { id, parent_id } => Some(QualityIssue {
            severity: Severity::Warning,
            subject: id,
            field: "parentId".to_string(),
            issue: format!("Parent '{}' is not in the same fiscal year", parent_id),
            recommendation: "Record is neither top-level nor reachable from one; fix the parent id".to_string(),
        }),
        EngineWarning::UnitNotFound { .. }
        | EngineWarning::MissingCpiData { .. }
        | EngineWarning::InvalidPopulation { .. } => None,
    }
}

impl Default for DataQualityEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
