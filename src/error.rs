// 🚨 Error Taxonomy - fatal errors vs local degradations
//
// BudgetError aborts the operation that raised it (merge, index construction).
// A merge aborts only on an unreadable document or a parent cycle.
// EngineWarning never aborts: the numeric functions return a fallback value and
// hand the warning back (or log it) so the pipeline keeps producing output.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// FATAL ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BudgetError {
    /// A source document could not be read as a budget document
    #[error("source document #{index} ({document}) is missing data: {reason}")]
    MissingSourceData {
        index: usize,
        document: String,
        reason: String,
    },

    /// Walking parent links from this record came back to a record already seen
    #[error("parent chain of record '{0}' revisits itself")]
    HierarchyCycle(String),

    #[error("CPI index has more than one entry for year {0}")]
    DuplicateCpiYear(i32),

    #[error("CPI index value for year {year} must be positive, got {value}")]
    InvalidCpiValue { year: i32, value: f64 },
}

// ============================================================================
// NON-FATAL WARNINGS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum EngineWarning {
    /// Record label matched no administrative unit; excluded from unit views
    #[error("record '{record_id}' has unknown administrative unit '{label}'")]
    UnitNotFound { record_id: String, label: String },

    /// Inflation adjustment skipped, original amount kept
    #[error("CPI data not found for year {from_year} or {to_year}")]
    MissingCpiData { from_year: i32, to_year: i32 },

    /// Per-capita value forced to 0 for this unit
    #[error("invalid population {population} for {unit}")]
    InvalidPopulation { unit: String, population: i64 },

    /// Same id twice in one fiscal year; both records kept, lookups see the first
    #[error("duplicate budget record id '{id}' in fiscal year {fiscal_year}")]
    DuplicateRecordId { id: String, fiscal_year: i32 },

    /// Parent id not found in the record's fiscal year; the record has no root
    #[error("record '{id}' references unknown parent '{parent_id}'")]
    DanglingParent { id: String, parent_id: String },
}

impl EngineWarning {
    /// Emit this warning through the `log` facade
    pub fn log(&self) {
        log::warn!("{}", self);
    }
}
