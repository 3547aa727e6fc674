// 💵 Inflation Normalizer - constant-dollar conversion via CPI
//
// adjusted = amount * (index[to_year] / index[from_year])
//
// A single direct ratio, no chaining. A year missing from the index is not
// interpolated: the amount comes back unchanged with a MissingCpiData warning.

use crate::error::{BudgetError, EngineWarning};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// CPI PROVIDER DOCUMENT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpiDataPoint {
    pub year: i32,
    pub value: f64,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpiData {
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub data_source: String,
    #[serde(default)]
    pub data_source_url: String,
    pub base_year: i32,
    pub annual_data: Vec<CpiDataPoint>,
}

// ============================================================================
// CPI INDEX
// ============================================================================

/// Validated CPI series: one positive value per year plus a base year
#[derive(Debug, Clone, PartialEq)]
pub struct CpiIndex {
    base_year: i32,
    values: BTreeMap<i32, f64>,
}

impl CpiIndex {
    /// Build from `(year, value)` points. Rejects duplicate years and
    /// non-positive values so lookups can divide safely.
    pub fn new<I>(base_year: i32, points: I) -> Result<Self, BudgetError>
    where
        I: IntoIterator<Item = (i32, f64)>,
    {
        let mut values = BTreeMap::new();

        for (year, value) in points {
            if value <= 0.0 || !value.is_finite() {
                return Err(BudgetError::InvalidCpiValue { year, value });
            }
            if values.insert(year, value).is_some() {
                return Err(BudgetError::DuplicateCpiYear(year));
            }
        }

        Ok(CpiIndex { base_year, values })
    }

    pub fn base_year(&self) -> i32 {
        self.base_year
    }

    pub fn value_for(&self, year: i32) -> Option<f64> {
        self.values.get(&year).copied()
    }

    pub fn contains_year(&self, year: i32) -> bool {
        self.values.contains_key(&year)
    }

    /// Years in ascending order
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Convert `amount` from `from_year` dollars to `to_year` dollars
    pub fn adjust(&self, amount: f64, from_year: i32, to_year: i32) -> f64 {
        adjust(amount, from_year, to_year, self)
    }

    /// Convert to the index's base year
    pub fn to_base_year(&self, amount: f64, from_year: i32) -> f64 {
        adjust(amount, from_year, self.base_year, self)
    }
}

impl TryFrom<CpiData> for CpiIndex {
    type Error = BudgetError;

    fn try_from(data: CpiData) -> Result<Self, Self::Error> {
        CpiIndex::new(
            data.base_year,
            data.annual_data.into_iter().map(|p| (p.year, p.value)),
        )
    }
}

// ============================================================================
// ADJUSTMENT
// ============================================================================

/// Adjustment outcome; `warning` is set when the amount was left unadjusted
#[derive(Debug, Clone, PartialEq)]
pub struct Adjusted {
    pub amount: f64,
    pub warning: Option<EngineWarning>,
}

/// Adjust without logging; the caller decides what to do with the warning
pub fn adjust_with_warning(amount: f64, from_year: i32, to_year: i32, cpi: &CpiIndex) -> Adjusted {
    match (cpi.value_for(from_year), cpi.value_for(to_year)) {
        (Some(from_value), Some(to_value)) => Adjusted {
            amount: amount * (to_value / from_value),
            warning: None,
        },
        _ => Adjusted {
            amount,
            warning: Some(EngineWarning::MissingCpiData { from_year, to_year }),
        },
    }
}

/// Adjust `amount` from `from_year` to `to_year` dollars.
///
/// Missing CPI data is logged and the original amount returned.
pub fn adjust(amount: f64, from_year: i32, to_year: i32, cpi: &CpiIndex) -> f64 {
    let adjusted = adjust_with_warning(amount, from_year, to_year, cpi);
    if let Some(warning) = &adjusted.warning {
        warning.log();
    }
    adjusted.amount
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cpi() -> CpiIndex {
        CpiIndex::new(
            2024,
            vec![(2024, 100.0), (2023, 98.0), (2022, 96.0), (2021, 94.0), (2020, 92.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_adjust_to_base_year() {
        let cpi = CpiIndex::new(2024, vec![(2020, 92.0), (2024, 100.0)]).unwrap();

        let adjusted = adjust(92_000.0, 2020, 2024, &cpi);
        assert!((adjusted - 100_000.0).abs() < 1e-6);
        assert!((cpi.to_base_year(92_000.0, 2020) - 100_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_adjust_same_year_is_noop() {
        let cpi = sample_cpi();

        for year in cpi.years().collect::<Vec<_>>() {
            assert_eq!(adjust(12_345.67, year, year, &cpi), 12_345.67);
        }
    }

    #[test]
    fn test_adjust_backwards() {
        let cpi = sample_cpi();

        let adjusted = cpi.adjust(100_000.0, 2024, 2020);
        assert!((adjusted - 92_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_year_returns_original_amount() {
        let cpi = sample_cpi();

        let adjusted = adjust_with_warning(5_000.0, 2015, 2024, &cpi);
        assert_eq!(adjusted.amount, 5_000.0);
        assert_eq!(
            adjusted.warning,
            Some(EngineWarning::MissingCpiData {
                from_year: 2015,
                to_year: 2024,
            })
        );

        assert_eq!(adjust(5_000.0, 2020, 2030, &cpi), 5_000.0);
    }

    #[test]
    fn test_duplicate_year_rejected() {
        let err = CpiIndex::new(2024, vec![(2024, 100.0), (2024, 101.0)]).unwrap_err();
        assert_eq!(err, BudgetError::DuplicateCpiYear(2024));
    }

    #[test]
    fn test_non_positive_value_rejected() {
        let err = CpiIndex::new(2024, vec![(2024, 100.0), (2020, 0.0)]).unwrap_err();
        assert_eq!(err, BudgetError::InvalidCpiValue { year: 2020, value: 0.0 });
    }

    #[test]
    fn test_from_cpi_document() {
        let json = r#"{
            "lastUpdated": "2024-04-09",
            "dataSource": "Bureau of Labor Statistics",
            "dataSourceUrl": "https://www.bls.gov/cpi/",
            "baseYear": 2024,
            "annualData": [
                {"year": 2024, "value": 100, "notes": "Base year"},
                {"year": 2020, "value": 92, "notes": "Four years ago"}
            ]
        }"#;

        let data: CpiData = serde_json::from_str(json).unwrap();
        let cpi = CpiIndex::try_from(data).unwrap();

        assert_eq!(cpi.base_year(), 2024);
        assert_eq!(cpi.len(), 2);
        assert_eq!(cpi.value_for(2020), Some(92.0));
        assert!(!cpi.contains_year(2021));
    }
}
